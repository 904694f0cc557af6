//! Domain model for elfmeta
//!
//! This module contains core domain types and errors that provide:
//! - Read-only views of ELF file, program and section headers
//! - Self-documenting function signatures
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{BuildId, FileHeader, FileType, ProgHeader, SectionHeader};

pub use errors::ElfMetaError;
