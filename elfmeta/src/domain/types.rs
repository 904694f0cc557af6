//! Core domain types
//!
//! These mirror the ELF structures the rest of the crate reasons about. They
//! are plain values copied out of the parsed file, so every computation over
//! them is free of lifetimes and of the `object` crate's generic header types.

use object::elf;
use object::Endianness;
use serde::{Serialize, Serializer};
use std::fmt;

/// Object file type, from the `e_type` field of the ELF file header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// `ET_REL`: relocatable object, no absolute link-time addresses
    Rel,
    /// `ET_EXEC`: fixed-address executable (or a kernel image)
    Exec,
    /// `ET_DYN`: shared object or position-independent executable
    Dyn,
    /// Anything else (`ET_CORE`, OS/processor specific values)
    Other(u16),
}

impl FileType {
    #[must_use]
    pub fn from_e_type(e_type: u16) -> Self {
        match e_type {
            elf::ET_REL => Self::Rel,
            elf::ET_EXEC => Self::Exec,
            elf::ET_DYN => Self::Dyn,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rel => write!(f, "ET_REL"),
            Self::Exec => write!(f, "ET_EXEC"),
            Self::Dyn => write!(f, "ET_DYN"),
            Self::Other(other) => write!(f, "ET_{other:#x}"),
        }
    }
}

impl Serialize for FileType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The parts of the ELF file header this crate needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub kind: FileType,
    /// Byte order of every multi-byte field in the file, notes included
    pub endian: Endianness,
    pub is_64: bool,
    pub machine: u16,
}

/// Program header (segment) entry
///
/// Field semantics follow the ELF specification; `p_type` and `flags` are
/// compared against the `PT_*` and `PF_*` constants in [`object::elf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProgHeader {
    #[serde(serialize_with = "serialize_segment_type")]
    pub p_type: u32,
    pub flags: u32,
    /// Offset in the file where the segment data begins
    pub offset: u64,
    /// Virtual address the first byte of the segment is linked at
    pub vaddr: u64,
    pub paddr: u64,
    /// Size of the segment in the file
    pub filesz: u64,
    /// Size of the segment in memory, including zero-filled data
    pub memsz: u64,
    pub align: u64,
}

impl ProgHeader {
    #[must_use]
    pub fn is_load(&self) -> bool {
        self.p_type == elf::PT_LOAD
    }

    #[must_use]
    pub fn is_note(&self) -> bool {
        self.p_type == elf::PT_NOTE
    }

    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.flags & elf::PF_X != 0
    }

    /// Check if a virtual address falls within `[vaddr, vaddr + memsz)`
    #[must_use]
    pub fn contains_vaddr(&self, addr: u64) -> bool {
        addr >= self.vaddr && addr - self.vaddr < self.memsz
    }

    /// Check if a file offset falls within `[offset, offset + memsz)`
    ///
    /// The range ends at `memsz`, not `filesz`: a mapping of the segment
    /// covers its zero-filled tail too.
    #[must_use]
    pub fn contains_file_offset(&self, file_offset: u64) -> bool {
        file_offset >= self.offset && file_offset - self.offset < self.memsz
    }
}

impl fmt::Display for ProgHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{} {} off=0x{:x} vaddr=0x{:x} paddr=0x{:x} filesz=0x{:x} memsz=0x{:x} align=0x{:x}}}",
            segment_type_name(self.p_type),
            SegmentFlags(self.flags),
            self.offset,
            self.vaddr,
            self.paddr,
            self.filesz,
            self.memsz,
            self.align
        )
    }
}

fn segment_type_name(p_type: u32) -> String {
    match p_type {
        elf::PT_NULL => "PT_NULL".to_string(),
        elf::PT_LOAD => "PT_LOAD".to_string(),
        elf::PT_DYNAMIC => "PT_DYNAMIC".to_string(),
        elf::PT_INTERP => "PT_INTERP".to_string(),
        elf::PT_NOTE => "PT_NOTE".to_string(),
        elf::PT_SHLIB => "PT_SHLIB".to_string(),
        elf::PT_PHDR => "PT_PHDR".to_string(),
        elf::PT_TLS => "PT_TLS".to_string(),
        elf::PT_GNU_EH_FRAME => "PT_GNU_EH_FRAME".to_string(),
        elf::PT_GNU_STACK => "PT_GNU_STACK".to_string(),
        elf::PT_GNU_RELRO => "PT_GNU_RELRO".to_string(),
        other => format!("PT_{other:#x}"),
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)] // signature fixed by serde
fn serialize_segment_type<S: Serializer>(p_type: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&segment_type_name(*p_type))
}

/// `R W X` permission triple, rendered the way `readelf -l` does
struct SegmentFlags(u32);

impl fmt::Display for SegmentFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = |mask: u32, c: char| if self.0 & mask != 0 { c } else { '-' };
        write!(f, "{}{}{}", bit(elf::PF_R, 'R'), bit(elf::PF_W, 'W'), bit(elf::PF_X, 'X'))
    }
}

/// Section header entry, with its name already resolved
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SectionHeader {
    pub name: String,
    pub sh_type: u32,
    pub flags: u64,
    pub addr: u64,
    pub offset: u64,
    pub size: u64,
    pub addralign: u64,
}

impl SectionHeader {
    #[must_use]
    pub fn is_note(&self) -> bool {
        self.sh_type == elf::SHT_NOTE
    }

    /// `SHT_NOBITS` sections (`.bss` and friends) occupy no file space
    #[must_use]
    pub fn has_file_data(&self) -> bool {
        self.sh_type != elf::SHT_NOBITS
    }
}

/// GNU build identifier: the raw descriptor bytes of the build-id note
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildId(Vec<u8>);

impl BuildId {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for BuildId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for BuildId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
