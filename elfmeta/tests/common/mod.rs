//! Synthetic ELF images for integration tests
//!
//! Builds just enough of an ELF file for `object` to accept it: file header,
//! program header table, section contents, `.shstrtab` and section header
//! table. Both ELF64 and ELF32 in either byte order are supported.

#![allow(dead_code)]

use object::elf;

/// Where a segment's file range comes from
pub enum SegmentData {
    /// Same file range as the section with this index (in builder order)
    Section(usize),
    /// Own bytes, appended to the file
    Bytes(Vec<u8>),
    /// Explicit offset and file size, nothing is written
    Range { offset: u64, filesz: u64 },
}

pub struct SegmentDef {
    pub p_type: u32,
    pub flags: u32,
    pub vaddr: u64,
    /// Defaults to the file size
    pub memsz: Option<u64>,
    pub align: u64,
    pub data: SegmentData,
}

pub struct SectionDef {
    pub name: String,
    pub sh_type: u32,
    pub addr: u64,
    pub addralign: u64,
    pub data: Vec<u8>,
}

pub struct ElfBuilder {
    e_type: u16,
    is_64: bool,
    big_endian: bool,
    sections: Vec<SectionDef>,
    segments: Vec<SegmentDef>,
}

impl ElfBuilder {
    /// Little-endian ELF64 image of the given type
    pub fn new(e_type: u16) -> Self {
        Self { e_type, is_64: true, big_endian: false, sections: Vec::new(), segments: Vec::new() }
    }

    /// Big-endian ELF32 image of the given type
    pub fn new_elf32_be(e_type: u16) -> Self {
        Self { e_type, is_64: false, big_endian: true, sections: Vec::new(), segments: Vec::new() }
    }

    pub fn big_endian(&self) -> bool {
        self.big_endian
    }

    pub fn section(mut self, name: &str, sh_type: u32, addr: u64, addralign: u64, data: Vec<u8>) -> Self {
        self.sections.push(SectionDef { name: name.to_string(), sh_type, addr, addralign, data });
        self
    }

    pub fn segment(mut self, segment: SegmentDef) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let (ehsize, phentsize, shentsize) = if self.is_64 { (64, 56, 64) } else { (52, 32, 40) };
        let phoff = ehsize;
        let mut out = vec![0u8; ehsize + phentsize * self.segments.len()];

        let mut section_offsets = Vec::new();
        for section in &self.sections {
            align(&mut out, 8);
            section_offsets.push(out.len() as u64);
            out.extend_from_slice(&section.data);
        }

        let mut segment_ranges = Vec::new();
        for segment in &self.segments {
            let range = match &segment.data {
                SegmentData::Section(index) => {
                    (section_offsets[*index], self.sections[*index].data.len() as u64)
                }
                SegmentData::Bytes(bytes) => {
                    align(&mut out, 8);
                    let offset = out.len() as u64;
                    out.extend_from_slice(bytes);
                    (offset, bytes.len() as u64)
                }
                SegmentData::Range { offset, filesz } => (*offset, *filesz),
            };
            segment_ranges.push(range);
        }

        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::new();
        for section in &self.sections {
            name_offsets.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(section.name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".shstrtab\0");
        align(&mut out, 8);
        let shstrtab_offset = out.len() as u64;
        out.extend_from_slice(&shstrtab);

        align(&mut out, 8);
        let shoff = out.len() as u64;
        let shnum = self.sections.len() + 2;

        let mut w = Writer::new(self.is_64, self.big_endian);
        // SHN_UNDEF
        w.bytes(&vec![0u8; shentsize]);
        for (i, section) in self.sections.iter().enumerate() {
            w.shdr(
                name_offsets[i],
                section.sh_type,
                elf::SHF_ALLOC.into(),
                section.addr,
                section_offsets[i],
                section.data.len() as u64,
                section.addralign,
            );
        }
        w.shdr(shstrtab_name, elf::SHT_STRTAB, 0, 0, shstrtab_offset, shstrtab.len() as u64, 1);
        out.extend_from_slice(&w.buf);

        let mut w = Writer::new(self.is_64, self.big_endian);
        for (segment, (offset, filesz)) in self.segments.iter().zip(&segment_ranges) {
            w.phdr(
                segment.p_type,
                segment.flags,
                *offset,
                segment.vaddr,
                *filesz,
                segment.memsz.unwrap_or(*filesz),
                segment.align,
            );
        }
        out[phoff..phoff + w.buf.len()].copy_from_slice(&w.buf);

        let mut w = Writer::new(self.is_64, self.big_endian);
        w.bytes(&[0x7f, b'E', b'L', b'F']);
        w.bytes(&[
            if self.is_64 { elf::ELFCLASS64 } else { elf::ELFCLASS32 },
            if self.big_endian { elf::ELFDATA2MSB } else { elf::ELFDATA2LSB },
            elf::EV_CURRENT,
            elf::ELFOSABI_SYSV,
        ]);
        w.bytes(&[0u8; 8]);
        w.u16(self.e_type);
        w.u16(if self.is_64 { elf::EM_X86_64 } else { elf::EM_PPC });
        w.u32(elf::EV_CURRENT.into());
        w.word(0); // e_entry
        w.word(phoff as u64);
        w.word(shoff);
        w.u32(0); // e_flags
        w.u16(ehsize as u16);
        w.u16(phentsize as u16);
        w.u16(self.segments.len() as u16);
        w.u16(shentsize as u16);
        w.u16(shnum as u16);
        w.u16((shnum - 1) as u16);
        assert_eq!(w.buf.len(), ehsize);
        out[..ehsize].copy_from_slice(&w.buf);

        out
    }
}

fn align(out: &mut Vec<u8>, to: usize) {
    while out.len() % to != 0 {
        out.push(0);
    }
}

struct Writer {
    is_64: bool,
    big_endian: bool,
    buf: Vec<u8>,
}

impl Writer {
    fn new(is_64: bool, big_endian: bool) -> Self {
        Self { is_64, big_endian, buf: Vec::new() }
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn u16(&mut self, v: u16) {
        let b = if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        self.bytes(&b);
    }

    fn u32(&mut self, v: u32) {
        let b = if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        self.bytes(&b);
    }

    fn u64(&mut self, v: u64) {
        let b = if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        self.bytes(&b);
    }

    /// Address-sized field
    fn word(&mut self, v: u64) {
        if self.is_64 {
            self.u64(v);
        } else {
            self.u32(v as u32);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn phdr(&mut self, p_type: u32, flags: u32, offset: u64, vaddr: u64, filesz: u64, memsz: u64, align: u64) {
        if self.is_64 {
            self.u32(p_type);
            self.u32(flags);
            self.u64(offset);
            self.u64(vaddr);
            self.u64(vaddr);
            self.u64(filesz);
            self.u64(memsz);
            self.u64(align);
        } else {
            self.u32(p_type);
            self.word(offset);
            self.word(vaddr);
            self.word(vaddr);
            self.word(filesz);
            self.word(memsz);
            self.u32(flags);
            self.word(align);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn shdr(&mut self, name: u32, sh_type: u32, flags: u64, addr: u64, offset: u64, size: u64, addralign: u64) {
        self.u32(name);
        self.u32(sh_type);
        self.word(flags);
        self.word(addr);
        self.word(offset);
        self.word(size);
        self.u32(0); // sh_link
        self.u32(0); // sh_info
        self.word(addralign);
        self.word(0); // sh_entsize
    }
}

/// Encode one note record, padded to `alignment`
pub fn note(big_endian: bool, name: &str, kind: u32, desc: &[u8], alignment: usize) -> Vec<u8> {
    let u32_bytes = |v: u32| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
    let mut out = Vec::new();
    out.extend_from_slice(&u32_bytes(name.len() as u32 + 1));
    out.extend_from_slice(&u32_bytes(desc.len() as u32));
    out.extend_from_slice(&u32_bytes(kind));
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    align(&mut out, alignment);
    out.extend_from_slice(desc);
    align(&mut out, alignment);
    out
}

/// A GNU build-id note with the given id
pub fn build_id_note(big_endian: bool, id: &[u8]) -> Vec<u8> {
    note(big_endian, "GNU", elf::NT_GNU_BUILD_ID, id, 4)
}

/// A typical position-independent executable: note segment over the
/// build-id section, a read-only load segment and an executable one.
pub fn pie_with_build_id(id: &[u8]) -> Vec<u8> {
    ElfBuilder::new(elf::ET_DYN)
        .section(".note.gnu.build-id", elf::SHT_NOTE, 0x238, 4, build_id_note(false, id))
        .section(".text", elf::SHT_PROGBITS, 0x1040, 16, vec![0xc3; 0x40])
        .segment(SegmentDef {
            p_type: elf::PT_LOAD,
            flags: elf::PF_R,
            vaddr: 0,
            memsz: Some(0x1000),
            align: 0x1000,
            data: SegmentData::Range { offset: 0, filesz: 0x1000 },
        })
        .segment(SegmentDef {
            p_type: elf::PT_LOAD,
            flags: elf::PF_R | elf::PF_X,
            vaddr: 0x1000,
            memsz: Some(0x1000),
            align: 0x1000,
            data: SegmentData::Range { offset: 0x1000, filesz: 0x1000 },
        })
        .segment(SegmentDef {
            p_type: elf::PT_NOTE,
            flags: elf::PF_R,
            vaddr: 0x238,
            memsz: None,
            align: 4,
            data: SegmentData::Section(0),
        })
        .build()
}
