//! Crate-wide error taxonomy.
//!
//! Every fallible operation surfaces one of these variants; there is no
//! global error state and no silent recovery (the lone exception being the
//! drop of all-zero trailing directory records at load time).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening, reading, or mutating a WAD archive.
#[derive(Error, Debug)]
pub enum WadError {
    /// Underlying I/O failure - propagated unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Header magic was neither `IWAD` nor `PWAD`.
    #[error("not a WAD file")]
    NotAWad,

    /// The path did not resolve to a file.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The OS denied read or write access.
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// A numeric field fell outside its permitted range (u32 offset
    /// arithmetic overflow, oversized payloads, and the like).
    #[error("value out of range: {0}")]
    OutOfRange(&'static str),

    /// A caller-supplied entry index does not address the directory.
    #[error("entry index {index} out of range (directory holds {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// An entry name is empty, too long, or contains disallowed bytes.
    #[error("invalid entry name {0:?}")]
    InvalidName(String),

    /// The operation is not available on this container variant.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// An entry's offset/size pair points past the end of the archive.
    #[error("entry {name} ({offset}+{size}) exceeds archive extent ({extent})")]
    EntryOutOfExtent {
        name: String,
        offset: u32,
        size: u32,
        extent: u64,
    },
}
