//! ELF container access
//!
//! Parsing of the container itself is left to the `object` crate. This module
//! copies the headers it reports into the crate's own [`FileHeader`],
//! [`ProgHeader`] and [`SectionHeader`] values, and hands out bounds-checked
//! slices of segment and section contents.

use log::debug;
use object::elf::{FileHeader32, FileHeader64};
use object::read::elf::{FileHeader as _, ProgramHeader as _, SectionHeader as _};
use object::{Endianness, FileKind};

use crate::domain::{ElfMetaError, FileHeader, FileType, ProgHeader, SectionHeader};

/// A parsed ELF image borrowed from a byte buffer
#[derive(Debug, Clone)]
pub struct ElfFile<'data> {
    data: &'data [u8],
    header: FileHeader,
    progs: Vec<ProgHeader>,
    sections: Vec<SectionHeader>,
}

impl<'data> ElfFile<'data> {
    /// Parse an ELF32 or ELF64 image in either byte order
    ///
    /// # Errors
    /// Returns an error if the data is not an ELF file or its header, program
    /// header table or section header table is malformed.
    pub fn parse(data: &'data [u8]) -> Result<Self, ElfMetaError> {
        match FileKind::parse(data)? {
            FileKind::Elf32 => Self::parse_as::<FileHeader32<Endianness>>(data, false),
            FileKind::Elf64 => Self::parse_as::<FileHeader64<Endianness>>(data, true),
            other => Err(ElfMetaError::NotElf(format!("{other:?}"))),
        }
    }

    fn parse_as<Elf>(data: &'data [u8], is_64: bool) -> Result<Self, ElfMetaError>
    where
        Elf: object::read::elf::FileHeader<Endian = Endianness>,
    {
        let elf = Elf::parse(data)?;
        let endian = elf.endian()?;

        let header = FileHeader {
            kind: FileType::from_e_type(elf.e_type(endian)),
            endian,
            is_64,
            machine: elf.e_machine(endian),
        };

        let progs: Vec<ProgHeader> = elf
            .program_headers(endian, data)?
            .iter()
            .map(|p| ProgHeader {
                p_type: p.p_type(endian),
                flags: p.p_flags(endian),
                offset: p.p_offset(endian).into(),
                vaddr: p.p_vaddr(endian).into(),
                paddr: p.p_paddr(endian).into(),
                filesz: p.p_filesz(endian).into(),
                memsz: p.p_memsz(endian).into(),
                align: p.p_align(endian).into(),
            })
            .collect();

        let table = elf.sections(endian, data)?;
        let sections = table
            .iter()
            .map(|s| {
                let name = table.section_name(endian, s)?;
                Ok(SectionHeader {
                    name: String::from_utf8_lossy(name).into_owned(),
                    sh_type: s.sh_type(endian),
                    flags: s.sh_flags(endian).into(),
                    addr: s.sh_addr(endian).into(),
                    offset: s.sh_offset(endian).into(),
                    size: s.sh_size(endian).into(),
                    addralign: s.sh_addralign(endian).into(),
                })
            })
            .collect::<Result<Vec<_>, ElfMetaError>>()?;

        debug!(
            "Parsed {} {} image: {} program headers, {} sections",
            if is_64 { "ELF64" } else { "ELF32" },
            header.kind,
            progs.len(),
            sections.len()
        );

        Ok(Self { data, header, progs, sections })
    }

    #[must_use]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    #[must_use]
    pub fn program_headers(&self) -> &[ProgHeader] {
        &self.progs
    }

    #[must_use]
    pub fn sections(&self) -> &[SectionHeader] {
        &self.sections
    }

    /// First section with the given name
    #[must_use]
    pub fn section_by_name(&self, name: &str) -> Option<&SectionHeader> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// File contents of a segment (`filesz` bytes at `offset`)
    ///
    /// # Errors
    /// Returns [`ElfMetaError::DataOutOfBounds`] if the range is not inside the file.
    pub fn segment_data(&self, ph: &ProgHeader) -> Result<&'data [u8], ElfMetaError> {
        self.range("segment", ph.offset, ph.filesz)
    }

    /// File contents of a section, empty for `SHT_NOBITS`
    ///
    /// # Errors
    /// Returns [`ElfMetaError::DataOutOfBounds`] if the range is not inside the file.
    pub fn section_data(&self, section: &SectionHeader) -> Result<&'data [u8], ElfMetaError> {
        if !section.has_file_data() {
            return Ok(&[]);
        }
        self.range(&format!("section {}", section.name), section.offset, section.size)
    }

    /// File contents of a segment, cut short at end of file
    ///
    /// A segment lying past the end of a truncated file yields an empty slice.
    #[must_use]
    pub fn segment_data_in_file(&self, ph: &ProgHeader) -> &'data [u8] {
        self.clamped_range(ph.offset, ph.filesz)
    }

    /// File contents of a section, cut short at end of file
    #[must_use]
    pub fn section_data_in_file(&self, section: &SectionHeader) -> &'data [u8] {
        if !section.has_file_data() {
            return &[];
        }
        self.clamped_range(section.offset, section.size)
    }

    fn clamped_range(&self, offset: u64, size: u64) -> &'data [u8] {
        let len = self.data.len();
        let start = usize::try_from(offset).map_or(len, |start| start.min(len));
        let end = usize::try_from(size)
            .ok()
            .and_then(|size| start.checked_add(size))
            .map_or(len, |end| end.min(len));
        if (end - start) as u64 != size {
            debug!(
                "Range at 0x{offset:x} (size 0x{size:x}) cut to 0x{:x} bytes at end of file",
                end - start
            );
        }
        &self.data[start..end]
    }

    fn range(&self, what: &str, offset: u64, size: u64) -> Result<&'data [u8], ElfMetaError> {
        let out_of_bounds =
            || ElfMetaError::DataOutOfBounds { what: what.to_string(), offset, size };
        let start = usize::try_from(offset).map_err(|_| out_of_bounds())?;
        let len = usize::try_from(size).map_err(|_| out_of_bounds())?;
        let end = start.checked_add(len).ok_or_else(out_of_bounds)?;
        self.data.get(start..end).ok_or_else(out_of_bounds)
    }
}
