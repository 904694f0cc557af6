//! GNU build-id extraction
//!
//! The build-id note is normally found twice in a linked binary: as the
//! `.note.gnu.build-id` section and inside the `PT_NOTE` segment that covers
//! it. Stripped binaries may only keep the segment; relocatable objects only
//! have the section. Both are scanned, segments first.

use log::debug;
use serde::Serialize;
use std::fmt;

use crate::domain::{BuildId, ElfMetaError, ProgHeader};
use crate::elf_file::ElfFile;
use crate::notes::{parse_notes, Note};

/// Alignment assumed for note segments that declare none
const DEFAULT_NOTE_ALIGNMENT: u64 = 4;

/// Where a note region lives in the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NoteOrigin {
    /// `PT_NOTE` program header, by index in the program header table
    Segment { index: usize },
    /// `SHT_NOTE` section, by name
    Section { name: String },
}

impl fmt::Display for NoteOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Segment { index } => write!(f, "segment #{index}"),
            Self::Section { name } => write!(f, "section {name}"),
        }
    }
}

/// A note-bearing segment or section, ready to be decoded
#[derive(Debug, Clone)]
pub struct NoteRegion<'data> {
    pub origin: NoteOrigin,
    pub offset: u64,
    pub alignment: u64,
    pub data: &'data [u8],
}

impl NoteRegion<'_> {
    fn end(&self) -> u64 {
        self.offset.saturating_add(self.data.len() as u64)
    }

    fn covers(&self, other: &NoteRegion<'_>) -> bool {
        self.offset <= other.offset && other.end() <= self.end()
    }
}

/// All note regions of a file: `PT_NOTE` segments, then `SHT_NOTE` sections
///
/// A section lying entirely inside an already listed segment is the same
/// bytes seen through the section table and is left out. Regions running
/// past the end of a truncated file only hold the bytes that exist.
#[must_use]
pub fn note_regions<'data>(file: &ElfFile<'data>) -> Vec<NoteRegion<'data>> {
    let mut regions = Vec::new();

    for (index, ph) in file.program_headers().iter().enumerate().filter(|(_, p)| p.is_note()) {
        regions.push(NoteRegion {
            origin: NoteOrigin::Segment { index },
            offset: ph.offset,
            alignment: segment_alignment(ph),
            data: file.segment_data_in_file(ph),
        });
    }
    let segment_count = regions.len();

    for section in file.sections().iter().filter(|s| s.is_note()) {
        let region = NoteRegion {
            origin: NoteOrigin::Section { name: section.name.clone() },
            offset: section.offset,
            alignment: section.addralign,
            data: file.section_data_in_file(section),
        };
        if regions[..segment_count].iter().any(|seg| seg.covers(&region)) {
            debug!("Skipping {}: already covered by a note segment", region.origin);
            continue;
        }
        regions.push(region);
    }

    regions
}

fn segment_alignment(ph: &ProgHeader) -> u64 {
    if ph.align == 0 {
        DEFAULT_NOTE_ALIGNMENT
    } else {
        ph.align
    }
}

/// Decode every note in the file, tagged with the region it came from
///
/// # Errors
/// Returns the first note parsing error.
pub fn read_notes(file: &ElfFile<'_>) -> Result<Vec<(NoteOrigin, Note)>, ElfMetaError> {
    let endian = file.header().endian;
    let mut all = Vec::new();
    for region in note_regions(file) {
        let notes = parse_notes(region.data, region.alignment, endian)?;
        all.extend(notes.into_iter().map(|note| (region.origin.clone(), note)));
    }
    Ok(all)
}

/// Return the GNU build-id of an ELF binary
///
/// Returns `Ok(None)` if the file carries no build-id note.
///
/// # Errors
/// Returns an error if a note region is malformed, or if more than one
/// distinct build-id note is present.
pub fn get_build_id(file: &ElfFile<'_>) -> Result<Option<BuildId>, ElfMetaError> {
    let mut found: Option<(NoteOrigin, Note)> = None;

    for (origin, note) in read_notes(file)? {
        if !note.is_gnu_build_id() {
            continue;
        }
        if let Some((first, _)) = &found {
            debug!("Second build id note in {origin}, first was in {first}");
            return Err(ElfMetaError::AmbiguousBuildId);
        }
        found = Some((origin, note));
    }

    Ok(found.map(|(origin, note)| {
        debug!("Found build id in {origin}");
        BuildId::from(note.desc)
    }))
}
