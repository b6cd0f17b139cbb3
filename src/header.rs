//! The 12-byte archive header.
//!
//! ```text
//! offset 0: magic = "IWAD" | "PWAD"   (4 ASCII bytes, no terminator)
//! offset 4: entry_count               (u32, little-endian)
//! offset 8: directory_offset          (u32, little-endian)
//! ```

use std::io::{Read, Write};

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};

use crate::error::WadError;

/// Size (in bytes) of the archive header.
pub const HEADER_LEN: u32 = 12;

/// Size (in bytes) of one directory entry.
pub const DIR_ENTRY_LEN: u32 = 16;

/// Archive kind, distinguished only by the 4-byte magic.
///
/// IWADs carry full base game data; PWADs are patches applied on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WadType {
    Iwad,
    Pwad,
}

impl WadType {
    /// The 4 ASCII magic bytes for this kind.
    pub fn magic(self) -> [u8; 4] {
        match self {
            WadType::Iwad => *b"IWAD",
            WadType::Pwad => *b"PWAD",
        }
    }

    /// Recognize magic bytes; `None` for anything that is not a WAD.
    pub fn from_magic(magic: &[u8; 4]) -> Option<WadType> {
        match magic {
            b"IWAD" => Some(WadType::Iwad),
            b"PWAD" => Some(WadType::Pwad),
            _ => None,
        }
    }
}

/// Read and validate a header: `(type, entry_count, directory_offset)`.
pub(crate) fn read_header(r: &mut impl Read) -> Result<(WadType, u32, u32), WadError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    let wad_type = WadType::from_magic(&magic).ok_or(WadError::NotAWad)?;
    let entry_count = r.read_u32::<LE>()?;
    let directory_offset = r.read_u32::<LE>()?;
    Ok((wad_type, entry_count, directory_offset))
}

/// Write a complete 12-byte header.
pub(crate) fn write_header(
    w: &mut impl Write,
    wad_type: WadType,
    entry_count: u32,
    directory_offset: u32,
) -> Result<(), WadError> {
    w.write_all(&wad_type.magic())?;
    w.write_u32::<LE>(entry_count)?;
    w.write_u32::<LE>(directory_offset)?;
    Ok(())
}

/// Guard against u32 overflow of `directory_offset + 16 * entry_count`.
/// Offsets are unsigned on disk; an archive whose directory end cannot be
/// expressed in 32 bits must be refused before any bytes are written.
pub(crate) fn check_directory_extent(
    directory_offset: u32,
    entry_count: usize,
) -> Result<(), WadError> {
    let count = u32::try_from(entry_count).map_err(|_| WadError::OutOfRange("entry count"))?;
    let dir_len = count
        .checked_mul(DIR_ENTRY_LEN)
        .ok_or(WadError::OutOfRange("directory length"))?;
    directory_offset
        .checked_add(dir_len)
        .ok_or(WadError::OutOfRange("directory end"))?;
    Ok(())
}
