//! Command implementations
//!
//! Each command reads the file, runs the library operation and returns a
//! [`Report`]; printing is left to `main`.

use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::Path;

use super::args::{Command, MappingArgs};
use crate::base::KERNEL_SPACE_START;
use crate::build_id::{get_build_id, read_notes};
use crate::domain::ProgHeader;
use crate::elf_file::ElfFile;
use crate::mapping::Mapping;
use crate::report::{hex, NoteEntry, Report};
use crate::segments::{find_text_prog_header, header_for_file_offset, program_headers_for_mapping};

/// Run one command
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or if the library
/// operation fails.
pub fn execute(command: &Command) -> Result<Report> {
    match command {
        Command::BuildId { file } => build_id(file),
        Command::Notes { file } => notes(file),
        Command::TextSegment { file } => text_segment(file),
        Command::Base { file, mapping, stext, addr } => base(file, mapping, *stext, *addr),
        Command::Segments { file, offset, size } => segments(file, *offset, *size),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn parse_elf<'data>(path: &Path, data: &'data [u8]) -> Result<ElfFile<'data>> {
    ElfFile::parse(data).with_context(|| format!("Failed to parse {}", path.display()))
}

fn display_name(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn build_id(path: &Path) -> Result<Report> {
    let data = read_file(path)?;
    let elf = parse_elf(path, &data)?;
    let build_id = get_build_id(&elf).context("Failed to read build id")?;
    Ok(Report::BuildId { file: display_name(path), build_id })
}

fn notes(path: &Path) -> Result<Report> {
    let data = read_file(path)?;
    let elf = parse_elf(path, &data)?;
    let notes = read_notes(&elf)
        .context("Failed to read notes")?
        .into_iter()
        .map(|(origin, note)| NoteEntry {
            origin,
            name: note.name,
            kind: note.kind,
            desc_size: note.desc.len(),
            desc: hex(&note.desc),
        })
        .collect();
    Ok(Report::Notes { file: display_name(path), notes })
}

fn text_segment(path: &Path) -> Result<Report> {
    let data = read_file(path)?;
    let elf = parse_elf(path, &data)?;
    let segment = find_text_prog_header(&elf).copied();
    Ok(Report::TextSegment { file: display_name(path), segment })
}

fn base(path: &Path, args: &MappingArgs, stext: Option<u64>, addr: Option<u64>) -> Result<Report> {
    let mapping = mapping_from_args(args)?;
    let data = read_file(path)?;
    let elf = parse_elf(path, &data)?;
    let file_type = elf.header().kind;

    let segment = select_load_segment(&elf, &mapping, stext, addr)?.copied();
    let base = mapping.base(file_type, segment.as_ref(), stext).context("Failed to compute base")?;
    let symbol_address = addr.map(|a| a.wrapping_add_signed(base.wrapping_neg()));

    Ok(Report::Base {
        file: display_name(path),
        file_type,
        mapping,
        segment,
        base,
        symbol_address,
    })
}

fn mapping_from_args(args: &MappingArgs) -> Result<Mapping> {
    if let Some(line) = &args.mapping {
        return line.parse().context("Failed to parse --mapping");
    }
    let start = args.start.context("Missing required argument: --start or --mapping")?;
    Ok(Mapping { start, limit: args.limit, offset: args.offset })
}

/// Pick the load segment backing a mapping
///
/// User-space mappings are matched against the program headers by file
/// offset and size, narrowed down by the address being symbolized if several
/// segments fit. Kernel mappings, and mappings no segment fits in, use the
/// segment holding `.text`.
fn select_load_segment<'a>(
    elf: &'a ElfFile<'_>,
    mapping: &Mapping,
    stext: Option<u64>,
    addr: Option<u64>,
) -> Result<Option<&'a ProgHeader>> {
    if !is_user_space(mapping, stext) {
        info!("Treating mapping as a kernel mapping, using the .text segment");
        return Ok(find_text_prog_header(elf));
    }

    let headers = program_headers_for_mapping(elf.program_headers(), mapping.offset, mapping.size());
    match headers.as_slice() {
        [] => {
            info!(
                "No program header inside mapping offset 0x{:x} size 0x{:x}, using the .text segment",
                mapping.offset,
                mapping.size()
            );
            Ok(find_text_prog_header(elf))
        }
        [only] => Ok(Some(*only)),
        _ => {
            let file_offset = mapping.file_offset(addr.unwrap_or(mapping.start));
            let header = header_for_file_offset(&headers, file_offset)
                .context("Mapping covers several program headers")?;
            Ok(Some(header))
        }
    }
}

/// Same classification `get_base` applies to `ET_EXEC` mappings
fn is_user_space(mapping: &Mapping, stext: Option<u64>) -> bool {
    stext.is_none() && mapping.start > 0 && mapping.start < KERNEL_SPACE_START
}

fn segments(path: &Path, offset: u64, size: u64) -> Result<Report> {
    let data = read_file(path)?;
    let elf = parse_elf(path, &data)?;
    let segments =
        program_headers_for_mapping(elf.program_headers(), offset, size).into_iter().copied().collect();
    Ok(Report::Segments { file: display_name(path), offset, size, segments })
}
