//! Structured error types for elfmeta
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::ProgHeader;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElfMetaError {
    #[error("truncated note header ({read} of 12 bytes)")]
    TruncatedNoteHeader { read: usize },

    #[error("note name too long ({0} bytes)")]
    NoteNameTooLong(u64),

    #[error("missing note name (want {0} bytes)")]
    MissingNoteName(u32),

    #[error("missing {0} bytes of padding after note name")]
    MissingNamePadding(u64),

    #[error("note desc too long ({0} bytes)")]
    NoteDescTooLong(u64),

    #[error("missing desc (want {want} bytes, got {got})")]
    MissingNoteDesc { want: u32, got: usize },

    #[error("invalid note alignment {0}, must be a power of two")]
    InvalidNoteAlignment(u64),

    #[error("multiple build ids found, don't know which to use")]
    AmbiguousBuildId,

    #[error("don't know how to handle mapping offset 0x{0:x} for a relocatable object")]
    UnsupportedMappingOffset(u64),

    #[error(
        "don't know how to handle EXEC segment: {segment} start=0x{start:x} limit=0x{limit:x} offset=0x{offset:x}"
    )]
    UnsupportedExecMapping { segment: ProgHeader, start: u64, limit: u64, offset: u64 },

    #[error("don't know how to handle file header type 0x{0:x}")]
    UnsupportedFileType(u16),

    #[error("no program header matches file offset 0x{0:x}")]
    NoProgHeaderForOffset(u64),

    #[error(
        "found second program header ({second}) that matches file offset 0x{file_offset:x}, \
         first program header is {first}. Does first program segment contain uninitialized data?"
    )]
    AmbiguousProgHeader { first: ProgHeader, second: ProgHeader, file_offset: u64 },

    #[error("{what} at 0x{offset:x} (size 0x{size:x}) lies outside the file")]
    DataOutOfBounds { what: String, offset: u64, size: u64 },

    #[error("not an ELF file (detected {0})")]
    NotElf(String),

    #[error("invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("failed to parse ELF file: {0}")]
    Parse(#[from] object::read::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_error_display() {
        let err = ElfMetaError::NoteNameTooLong(0x10_0001);
        assert_eq!(err.to_string(), "note name too long (1048577 bytes)");
    }

    #[test]
    fn test_ambiguous_prog_header_names_both() {
        let first = ProgHeader { offset: 0x1000, vaddr: 0x40_1000, memsz: 0x800, ..Default::default() };
        let second = ProgHeader { offset: 0x1400, vaddr: 0x40_2400, memsz: 0x100, ..Default::default() };
        let err = ElfMetaError::AmbiguousProgHeader { first, second, file_offset: 0x1450 };

        let msg = err.to_string();
        assert!(msg.contains("vaddr=0x401000"));
        assert!(msg.contains("vaddr=0x402400"));
        assert!(msg.contains("0x1450"));
    }

    #[test]
    fn test_exec_mapping_error_carries_bounds() {
        let err = ElfMetaError::UnsupportedExecMapping {
            segment: ProgHeader { vaddr: 0xffff_ffff_8020_0000, ..Default::default() },
            start: 0x1000,
            limit: 0x2000,
            offset: 0x3000,
        };
        let msg = err.to_string();
        assert!(msg.contains("vaddr=0xffffffff80200000"));
        assert!(msg.contains("start=0x1000 limit=0x2000 offset=0x3000"));
    }
}
