//! CLI argument definitions

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "elfmeta",
    about = "Inspect ELF build ids and map runtime addresses back to a binary",
    after_help = "\
EXAMPLES:
    elfmeta build-id /usr/lib/libc.so.6
    elfmeta base ./app --mapping '55f3a2b4c000-55f3a2b5f000 r-xp 00001000 fe:01 42 ./app'
    elfmeta base vmlinux --start 0xffffffff83200000 --limit 0xffffffff84200000 --stext 0xffffffff80200198
    elfmeta segments ./app --offset 0x1000 --size 0x13000"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the GNU build id
    BuildId {
        /// ELF file to inspect
        file: PathBuf,
    },

    /// List every note in the note segments and note sections
    Notes {
        /// ELF file to inspect
        file: PathBuf,
    },

    /// Print the executable load segment holding .text
    TextSegment {
        /// ELF file to inspect
        file: PathBuf,
    },

    /// Compute the base address for a runtime mapping of the file
    Base {
        /// ELF file the mapping belongs to
        file: PathBuf,

        #[command(flatten)]
        mapping: MappingArgs,

        /// Address of the kernel's _stext symbol, for kernel images
        #[arg(long, value_parser = parse_u64)]
        stext: Option<u64>,

        /// Runtime address to translate to a symbol address
        #[arg(long, value_parser = parse_u64)]
        addr: Option<u64>,
    },

    /// List the load segments contained in a mapping
    Segments {
        /// ELF file to inspect
        file: PathBuf,

        /// File offset of the mapping
        #[arg(long, value_parser = parse_u64)]
        offset: u64,

        /// Size of the mapping in bytes
        #[arg(long, value_parser = parse_u64)]
        size: u64,
    },
}

/// A mapping, either as a `/proc/<pid>/maps` line or as raw bounds
#[derive(ClapArgs)]
pub struct MappingArgs {
    /// One line of /proc/<pid>/maps
    #[arg(long, value_name = "LINE", conflicts_with_all = ["start", "limit", "offset"])]
    pub mapping: Option<String>,

    /// Start address of the mapping
    #[arg(long, value_parser = parse_u64, required_unless_present = "mapping")]
    pub start: Option<u64>,

    /// End address of the mapping (exclusive)
    #[arg(long, value_parser = parse_u64, default_value = "0")]
    pub limit: u64,

    /// File offset mapped at the start address
    #[arg(long, value_parser = parse_u64, default_value = "0")]
    pub offset: u64,
}

/// Parse a number given in hex (`0x` prefix) or decimal
///
/// # Errors
/// Returns a message suitable for clap if the value is not a valid number.
pub fn parse_u64(value: &str) -> Result<u64, String> {
    let value = value.trim().replace('_', "");
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid number {value:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u64() {
        assert_eq!(parse_u64("0x1000"), Ok(0x1000));
        assert_eq!(parse_u64("0XFFFF_FFFF_8020_0000"), Ok(0xffff_ffff_8020_0000));
        assert_eq!(parse_u64("4096"), Ok(4096));
        assert!(parse_u64("0xg").is_err());
        assert!(parse_u64("-1").is_err());
    }

    #[test]
    fn test_base_with_maps_line() {
        let args = Args::try_parse_from([
            "elfmeta",
            "base",
            "./app",
            "--mapping",
            "00402000-0050f000 r-xp 00002000 fe:01 1 ./app",
            "--json",
        ])
        .unwrap();
        assert!(args.json);
        let Command::Base { mapping, stext, .. } = args.command else {
            panic!("expected base command");
        };
        assert!(mapping.mapping.is_some());
        assert_eq!(stext, None);
    }

    #[test]
    fn test_base_with_raw_bounds() {
        let args = Args::try_parse_from([
            "elfmeta", "base", "vmlinux", "--start", "0x198", "--limit", "0x2f9fffff", "--stext",
            "0xffffffff81000198",
        ])
        .unwrap();
        let Command::Base { mapping, stext, .. } = args.command else {
            panic!("expected base command");
        };
        assert_eq!(mapping.start, Some(0x198));
        assert_eq!(mapping.limit, 0x2f9f_ffff);
        assert_eq!(mapping.offset, 0);
        assert_eq!(stext, Some(0xffff_ffff_8100_0198));
    }

    #[test]
    fn test_base_requires_a_mapping() {
        assert!(Args::try_parse_from(["elfmeta", "base", "./app"]).is_err());
    }
}
