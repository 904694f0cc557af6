//! Runtime mapping descriptors
//!
//! A mapping is what a profiler observed for a binary: the virtual range
//! `[start, limit)` and the file offset mapped at `start`. Discovering the
//! mappings of a live process is up to the caller; this module only parses
//! the textual `/proc/<pid>/maps` form when the caller has one.

use serde::Serialize;
use std::str::FromStr;

use crate::base::get_base;
use crate::domain::{ElfMetaError, FileType, ProgHeader};

/// Memory mapping of a binary in an address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mapping {
    pub start: u64,
    pub limit: u64,
    /// File offset mapped at `start`
    pub offset: u64,
}

impl Mapping {
    /// Check if an address falls within this mapping
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.limit
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.limit.saturating_sub(self.start)
    }

    /// File offset of a runtime address inside this mapping
    #[must_use]
    pub fn file_offset(&self, addr: u64) -> u64 {
        addr.wrapping_sub(self.start).wrapping_add(self.offset)
    }

    /// Base to subtract from addresses in this mapping, see [`get_base`]
    ///
    /// # Errors
    /// Same as [`get_base`].
    pub fn base(
        &self,
        file_type: FileType,
        load_segment: Option<&ProgHeader>,
        stext_offset: Option<u64>,
    ) -> Result<i64, ElfMetaError> {
        get_base(file_type, load_segment, stext_offset, self.start, self.limit, self.offset)
    }
}

impl FromStr for Mapping {
    type Err = ElfMetaError;

    /// Parse one `/proc/<pid>/maps` line: "start-end perms offset dev inode [pathname]"
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let invalid = |what: &str| ElfMetaError::InvalidMapping(format!("{what} in {line:?}"));

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            return Err(invalid("too few fields"));
        }
        let (start, end) = parts[0].split_once('-').ok_or_else(|| invalid("no address range"))?;
        let start = u64::from_str_radix(start, 16).map_err(|_| invalid("bad range start"))?;
        let limit = u64::from_str_radix(end, 16).map_err(|_| invalid("bad range end"))?;
        let offset = u64::from_str_radix(parts[2], 16).map_err(|_| invalid("bad offset"))?;
        if limit < start {
            return Err(invalid("range end before start"));
        }

        Ok(Self { start, limit, offset })
    }
}
