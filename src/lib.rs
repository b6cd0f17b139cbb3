//! WAD archive container engine.
//!
//! Reads, edits, and creates the `IWAD`/`PWAD` archives used by classic
//! Doom-engine games: a 12-byte header, a packed content region of payload
//! bytes, and a trailing directory of 16-byte records.
//!
//! * [`WadFile`] - random-access file on disk, mutated in place
//! * [`WadBuffer`] - whole archive in memory, serialized on demand
//! * [`WadMap`] - read-only entry index built from a stream
//!
//! All three satisfy the [`Wad`] trait. Payloads are opaque bytes; parsing
//! map geometry, textures, or sounds out of them is a consumer's job.
//!
//! ```no_run
//! use yawad::{Wad, WadFile};
//!
//! # fn main() -> Result<(), yawad::WadError> {
//! let mut wad = WadFile::create("fresh.wad")?;
//! wad.add_data("LUMP01", &[0xAA, 0xBB, 0xCC])?;
//! wad.add_marker("F_END")?;
//!
//! let (index, entry) = wad.find_first("LUMP01").unwrap();
//! assert_eq!(index, 0);
//! assert_eq!(wad.read_entry(&entry)?, [0xAA, 0xBB, 0xCC]);
//! # Ok(())
//! # }
//! ```
//!
//! Appending thousands of entries one call at a time rewrites the
//! directory every time; batch through [`WadFile::adder`] to pay for one
//! rewrite at the end of the scope.

mod buffer;
mod container;
mod entry;
mod error;
mod file;
mod header;
mod map;
pub mod name;

pub use buffer::WadBuffer;
pub use container::Wad;
pub use entry::WadEntry;
pub use error::WadError;
pub use file::{Adder, WadFile};
pub use header::{WadType, DIR_ENTRY_LEN, HEADER_LEN};
pub use map::WadMap;
