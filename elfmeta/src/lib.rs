//! # elfmeta - ELF Identity and Address Mapping Metadata
//!
//! elfmeta extracts the metadata a profiler or symbolizer needs to tie a
//! sampled program counter back to the right binary and symbol:
//!
//! - the GNU **build id**, to match a binary with its debug info
//! - the **base address**, to translate runtime addresses into the addresses
//!   symbols are linked at
//! - the **load segment** backing `.text`, a runtime mapping, or a file offset
//!
//! ## Architecture Overview
//!
//! ```text
//!           raw ELF bytes
//!                │
//!                ▼
//!      ┌──────────────────┐
//!      │     elf_file     │  object crate: headers, sections, segments
//!      └────────┬─────────┘
//!               │
//!      ┌────────┴─────────────────────────────┐
//!      ▼                                      ▼
//! ┌──────────┐   ┌──────────┐        ┌──────────────┐   ┌──────────┐
//! │  notes   │──▶│ build_id │        │   segments   │──▶│   base   │
//! └──────────┘   └──────────┘        └──────────────┘   └──────────┘
//!                                            ▲                ▲
//!                                            └──── mapping ───┘
//! ```
//!
//! ## Module Structure
//!
//! - [`notes`]: decode a `SHT_NOTE`/`PT_NOTE` byte stream into records
//! - [`build_id`]: find the single `"GNU"` build-id note of a file
//! - [`base`]: base address for `ET_EXEC`, `ET_DYN`, `ET_REL` and kernel mappings
//! - [`segments`]: `.text` segment, segments inside a mapping, segment for an offset
//! - [`mapping`]: runtime mapping descriptor, parsed from `/proc/<pid>/maps` lines
//! - [`elf_file`]: bounds-checked view of an ELF image
//! - [`domain`]: header types and [`ElfMetaError`](domain::ElfMetaError)
//! - [`cli`], [`report`]: the `elfmeta` command-line front end
//!
//! ## Typical Usage
//!
//! ```rust,ignore
//! let data = std::fs::read("/usr/lib/libc.so.6")?;
//! let elf = ElfFile::parse(&data)?;
//!
//! let build_id = get_build_id(&elf)?;
//!
//! let mapping: Mapping = "7f3c1a028000-7f3c1a1bd000 r-xp 00028000 fe:01 42 /usr/lib/libc.so.6".parse()?;
//! let segments = program_headers_for_mapping(elf.program_headers(), mapping.offset, mapping.size());
//! let segment = header_for_file_offset(&segments, mapping.file_offset(pc))?;
//! let base = mapping.base(elf.header().kind, Some(segment), None)?;
//! let symbol_address = pc.wrapping_add_signed(-base);
//! ```
//!
//! Every operation is a pure function of its inputs. Nothing is cached and
//! nothing is shared, so all of it can be called from any thread.

pub mod base;
pub mod build_id;
pub mod cli;
pub mod domain;
pub mod elf_file;
pub mod mapping;
pub mod notes;
pub mod report;
pub mod segments;

pub use base::get_base;
pub use build_id::get_build_id;
pub use domain::{BuildId, ElfMetaError, FileHeader, FileType, ProgHeader, SectionHeader};
pub use elf_file::ElfFile;
pub use mapping::Mapping;
pub use notes::{parse_notes, Note};
pub use segments::{find_text_prog_header, header_for_file_offset, program_headers_for_mapping};
