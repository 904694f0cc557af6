//! Base address resolution
//!
//! A sampled address is observed in a runtime mapping `[start, limit)` that
//! maps the binary from file offset `offset`. The base computed here is the
//! difference between runtime addresses and the addresses symbols are linked
//! at, so that `symbol_address = runtime_address - base`.
//!
//! All arithmetic wraps: a negative base such as `-_stext` is the expected
//! outcome for a kernel remapped to address zero.
//!
//! ## Kernel images
//!
//! An `ET_EXEC` mapped at zero or outside the user half of the address space,
//! or for which the caller supplied the `_stext` offset, is treated as a
//! kernel image. Kernels are mapped in several ways depending on who produced the
//! mapping, and each known way is a rule in [`KERNEL_RULES`], tried in order:
//!
//! ```text
//! segment-at-mapping-origin    VADDR == start - offset           base = offset
//! zero-remap                   start == 0, limit != 0            base = -_stext (or -VADDR)
//! relocated-kernel             VADDR <= start < limit,           base = start - _stext (or - VADDR)
//!                              offset in {0, PPC64 PAGE_OFFSET, start}
//! zero-remap-with-page-offset  start not page aligned,           base = start - _stext
//!                              _stext page-congruent with start
//! ```
//!
//! Example values for a relocated kernel:
//!
//! ```text
//!       VADDR=0xffffffff80200000
//! stextOffset=0xffffffff80200198
//!       Start=0xffffffff83200000
//!       Limit=0xffffffff84200000
//!      Offset=0 (0xc000000000000000 for PowerPC64, == Start for an ASLR kernel)
//! ```

use log::debug;

use crate::domain::{ElfMetaError, FileType, ProgHeader};

const PAGE_SIZE: u64 = 4096;

/// `PAGE_OFFSET` of the PowerPC64 kernel, see `arch/powerpc/Kconfig`
pub const PAGE_OFFSET_PPC64: u64 = 0xc000_0000_0000_0000;

/// Lowest kernel-half address in the canonical 64-bit split
pub const KERNEL_SPACE_START: u64 = 0x8000_0000_0000_0000;

/// Inputs the kernel rules look at
#[derive(Debug, Clone, Copy)]
pub struct KernelMapping<'a> {
    pub segment: &'a ProgHeader,
    pub stext_offset: Option<u64>,
    pub start: u64,
    pub limit: u64,
    pub offset: u64,
}

impl KernelMapping<'_> {
    /// `_stext`, if known and on the same in-page offset as `start`
    ///
    /// perf reports the address of `_stext` as the mapping start. Tools that
    /// already corrected for that produce a start with a different in-page
    /// offset, in which case `_stext` must not be used again.
    fn congruent_stext(&self) -> Option<u64> {
        self.stext_offset.filter(|stext| stext % PAGE_SIZE == self.start % PAGE_SIZE)
    }
}

/// One known kernel mapping layout: when it applies and what base it yields
pub struct KernelRule {
    pub name: &'static str,
    pub applies: fn(&KernelMapping<'_>) -> bool,
    pub base: fn(&KernelMapping<'_>) -> u64,
}

/// Kernel mapping layouts, in priority order
pub static KERNEL_RULES: [KernelRule; 4] = [
    KernelRule {
        name: "segment-at-mapping-origin",
        applies: |k| k.segment.vaddr == k.start.wrapping_sub(k.offset),
        base: |k| k.offset,
    },
    // ChromeOS remaps its kernel to 0. Nothing else should come down here.
    //       VADDR=0xffffffff80200000
    // stextOffset=0xffffffff80200198
    KernelRule {
        name: "zero-remap",
        applies: |k| k.start == 0 && k.limit != 0,
        base: |k| k.stext_offset.unwrap_or(k.segment.vaddr).wrapping_neg(),
    },
    KernelRule {
        name: "relocated-kernel",
        applies: |k| {
            k.start >= k.segment.vaddr
                && k.limit > k.start
                && (k.offset == 0 || k.offset == PAGE_OFFSET_PPC64 || k.offset == k.start)
        },
        base: |k| k.start.wrapping_sub(k.congruent_stext().unwrap_or(k.segment.vaddr)),
    },
    // ChromeOS again, remapped to 0 + start % PAGE_SIZE.
    //       start=0x198 limit=0x2f9fffff offset=0
    //       VADDR=0xffffffff81000000
    // stextOffset=0xffffffff81000198
    KernelRule {
        name: "zero-remap-with-page-offset",
        applies: |k| k.start % PAGE_SIZE != 0 && k.congruent_stext().is_some(),
        base: |k| k.start.wrapping_sub(k.congruent_stext().unwrap_or(k.segment.vaddr)),
    },
];

/// Determine the base to subtract from runtime addresses
///
/// `load_segment` is the `PT_LOAD` segment backing the mapping, when the
/// caller identified one. `stext_offset` is the address of the kernel's
/// `_stext` symbol (`nm vmlinux | grep _stext`), when known.
///
/// # Errors
/// Returns an error for a relocatable object mapped at a nonzero offset, for
/// a kernel mapping that matches none of [`KERNEL_RULES`], and for file types
/// other than `ET_EXEC`, `ET_DYN` and `ET_REL`.
#[allow(clippy::cast_possible_wrap)] // the base is a two's complement offset
pub fn get_base(
    file_type: FileType,
    load_segment: Option<&ProgHeader>,
    stext_offset: Option<u64>,
    start: u64,
    limit: u64,
    offset: u64,
) -> Result<i64, ElfMetaError> {
    let base = base_address(file_type, load_segment, stext_offset, start, limit, offset)?;
    debug!(
        "{file_type} mapping start=0x{start:x} limit=0x{limit:x} offset=0x{offset:x}: base=0x{base:x}"
    );
    Ok(base as i64)
}

fn base_address(
    file_type: FileType,
    load_segment: Option<&ProgHeader>,
    stext_offset: Option<u64>,
    start: u64,
    limit: u64,
    offset: u64,
) -> Result<u64, ElfMetaError> {
    if start == 0 && offset == 0 && (limit == u64::MAX || limit == 0) {
        // Some tools introduce a fake mapping spanning the entire address
        // space. Its addresses are already adjusted.
        return Ok(0);
    }

    match file_type {
        FileType::Exec => {
            let Some(segment) = load_segment else {
                // Fixed-address executable, no adjustment.
                return Ok(0);
            };
            if stext_offset.is_none() && start > 0 && start < KERNEL_SPACE_START {
                // Regular user-mode executable. A missing _stext alone does not
                // rule out a kernel (the caller may skip the symbol scan), hence
                // the address-space check.
                return Ok(segment_relative_base(segment, start, offset));
            }
            kernel_base(&KernelMapping { segment, stext_offset, start, limit, offset })
        }
        FileType::Rel => {
            if offset != 0 {
                return Err(ElfMetaError::UnsupportedMappingOffset(offset));
            }
            Ok(start)
        }
        FileType::Dyn => Ok(match load_segment {
            // Runtime address x maps to file offset x - start + offset.
            None => start.wrapping_sub(offset),
            Some(segment) => segment_relative_base(segment, start, offset),
        }),
        FileType::Other(e_type) => Err(ElfMetaError::UnsupportedFileType(e_type)),
    }
}

/// Base for a mapping of `segment`
///
/// Runtime address `x` maps to file offset `fx = x - start + offset`, and file
/// offset `fx` maps to symbol address `sx = fx - segment.offset + segment.vaddr`.
fn segment_relative_base(segment: &ProgHeader, start: u64, offset: u64) -> u64 {
    start.wrapping_sub(offset).wrapping_add(segment.offset).wrapping_sub(segment.vaddr)
}

fn kernel_base(mapping: &KernelMapping<'_>) -> Result<u64, ElfMetaError> {
    for rule in &KERNEL_RULES {
        if (rule.applies)(mapping) {
            debug!("Kernel mapping matched rule {}", rule.name);
            return Ok((rule.base)(mapping));
        }
    }
    Err(ElfMetaError::UnsupportedExecMapping {
        segment: *mapping.segment,
        start: mapping.start,
        limit: mapping.limit,
        offset: mapping.offset,
    })
}
