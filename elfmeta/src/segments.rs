//! Program segment lookup
//!
//! Three independent questions about `PT_LOAD` segments:
//! - which one holds `.text` ([`find_text_prog_header`])
//! - which ones a runtime mapping covers ([`program_headers_for_mapping`])
//! - which one holds a file offset ([`header_for_file_offset`])
//!
//! A symbolizer usually chains the last two: narrow the segments down to the
//! mapping, then pick the one holding the sampled address's file offset.

use log::trace;

use crate::domain::{ElfMetaError, ProgHeader};
use crate::elf_file::ElfFile;

/// Page size assumed for the loader that produced the mapping
///
/// 4KB on virtually all architectures we care about. Should another page size
/// show up, it has to be guessed from the ELF machine type.
const PAGE_SIZE: u64 = 4096;
const PAGE_OFFSET_MASK: u64 = PAGE_SIZE - 1;
const PAGE_MASK: u64 = !PAGE_OFFSET_MASK;

/// Find the executable `PT_LOAD` segment containing the `.text` section
///
/// Returns `None` if there is no `.text` section or no segment contains it.
#[must_use]
pub fn find_text_prog_header<'a>(file: &'a ElfFile<'_>) -> Option<&'a ProgHeader> {
    file.sections().iter().filter(|s| s.name == ".text").find_map(|text| {
        file.program_headers()
            .iter()
            .find(|p| p.is_load() && p.is_executable() && p.contains_vaddr(text.addr))
    })
}

/// Program headers fully contained in a runtime mapping
///
/// The mapping starts at file offset `pgoff` and is `memsz` bytes long. When
/// several segments fit, the one whose page-aligned memory footprint is
/// exactly `memsz` is preferred; if that does not single one out, all
/// candidates are returned.
#[must_use]
pub fn program_headers_for_mapping(
    headers: &[ProgHeader],
    pgoff: u64,
    memsz: u64,
) -> Vec<&ProgHeader> {
    let mapping_end = pgoff.saturating_add(memsz);
    let candidates: Vec<&ProgHeader> = headers
        .iter()
        .filter(|p| {
            let Some(end) = p.offset.checked_add(p.memsz) else {
                return false;
            };
            // The segment must be fully included in the mapping.
            if !(p.is_load() && pgoff <= p.offset && end <= mapping_end) {
                return false;
            }
            let aligned_offset = p.offset.saturating_sub(p.vaddr & PAGE_OFFSET_MASK);
            aligned_offset <= pgoff
        })
        .collect();

    // The size heuristic below only makes sense for page-sized mappings.
    if candidates.len() < 2 || memsz % PAGE_SIZE != 0 {
        return candidates;
    }

    let exact: Vec<&ProgHeader> =
        candidates.iter().copied().filter(|h| page_aligned_size(h) == memsz).collect();
    if let [only] = exact.as_slice() {
        trace!("Mapping of size 0x{memsz:x} narrowed to segment {only}");
        return vec![*only];
    }
    candidates
}

/// Minimum page-aligned mapping size needed to hold a segment
fn page_aligned_size(ph: &ProgHeader) -> u64 {
    (ph.vaddr.wrapping_add(ph.memsz).wrapping_add(PAGE_SIZE - 1) & PAGE_MASK)
        .wrapping_sub(ph.vaddr & PAGE_MASK)
}

/// Find the unique program header whose `[offset, offset + memsz)` range
/// contains `file_offset`
///
/// # Errors
/// Returns an error if no header matches, or if two headers match. The latter
/// happens when small segments share a page and one that is not the last
/// carries uninitialized data.
pub fn header_for_file_offset<'a>(
    headers: &[&'a ProgHeader],
    file_offset: u64,
) -> Result<&'a ProgHeader, ElfMetaError> {
    let mut found: Option<&'a ProgHeader> = None;
    for &h in headers {
        if !h.contains_file_offset(file_offset) {
            continue;
        }
        if let Some(first) = found {
            return Err(ElfMetaError::AmbiguousProgHeader {
                first: *first,
                second: *h,
                file_offset,
            });
        }
        found = Some(h);
    }
    found.ok_or(ElfMetaError::NoProgHeaderForOffset(file_offset))
}
