//! Command results, rendered as text or JSON

use serde::Serialize;
use std::fmt::{self, Write as _};

use crate::build_id::NoteOrigin;
use crate::domain::{BuildId, FileType, ProgHeader};
use crate::mapping::Mapping;

/// One note, as listed by the `notes` command
#[derive(Debug, Clone, Serialize)]
pub struct NoteEntry {
    pub origin: NoteOrigin,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u32,
    pub desc_size: usize,
    /// Hex-encoded descriptor
    pub desc: String,
}

/// Result of one CLI command
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Report {
    BuildId {
        file: String,
        build_id: Option<BuildId>,
    },
    Notes {
        file: String,
        notes: Vec<NoteEntry>,
    },
    TextSegment {
        file: String,
        segment: Option<ProgHeader>,
    },
    Base {
        file: String,
        file_type: FileType,
        mapping: Mapping,
        segment: Option<ProgHeader>,
        base: i64,
        /// `addr - base`, when an address was given
        symbol_address: Option<u64>,
    },
    Segments {
        file: String,
        offset: u64,
        size: u64,
        segments: Vec<ProgHeader>,
    },
}

impl Report {
    /// Render as pretty-printed JSON
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// True when the command found nothing (no build id, no segment, ...)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::BuildId { build_id, .. } => build_id.is_none(),
            Self::Notes { notes, .. } => notes.is_empty(),
            Self::TextSegment { segment, .. } => segment.is_none(),
            Self::Base { .. } => false,
            Self::Segments { segments, .. } => segments.is_empty(),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildId { file, build_id } => match build_id {
                Some(id) => write!(f, "{id}"),
                None => write!(f, "{file}: no build id"),
            },
            Self::Notes { file, notes } => {
                if notes.is_empty() {
                    return write!(f, "{file}: no notes");
                }
                for (i, note) in notes.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(
                        f,
                        "{:<32} {:<10} type={:<#6x} size={:<4} {}",
                        note.origin.to_string(),
                        note.name,
                        note.kind,
                        note.desc_size,
                        note.desc
                    )?;
                }
                Ok(())
            }
            Self::TextSegment { file, segment } => match segment {
                Some(ph) => write!(f, "{ph}"),
                None => write!(f, "{file}: no executable segment holds .text"),
            },
            Self::Base { file_type, mapping, segment, base, symbol_address, .. } => {
                writeln!(
                    f,
                    "{file_type} mapping 0x{:x}-0x{:x} offset 0x{:x}",
                    mapping.start, mapping.limit, mapping.offset
                )?;
                match segment {
                    Some(ph) => writeln!(f, "segment {ph}")?,
                    None => writeln!(f, "segment <none>")?,
                }
                write!(f, "base {base:#x} ({base})")?;
                if let Some(sym) = symbol_address {
                    write!(f, "\nsymbol address 0x{sym:x}")?;
                }
                Ok(())
            }
            Self::Segments { file, offset, size, segments } => {
                if segments.is_empty() {
                    return write!(
                        f,
                        "{file}: no load segment inside mapping offset 0x{offset:x} size 0x{size:x}"
                    );
                }
                let lines: Vec<String> = segments.iter().map(ToString::to_string).collect();
                write!(f, "{}", lines.join("\n"))
            }
        }
    }
}

/// Lowercase hex encoding of a byte slice
#[must_use]
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
