//! Directory entries.
//!
//! One entry is 16 bytes on disk: `[offset: u32 LE][size: u32 LE][name: 8]`.
//! Entries are plain values; containers own the authoritative sequence and
//! hand out copies, so a held copy can go stale across mutations.

use std::borrow::Cow;
use std::fmt;

use crate::error::WadError;
use crate::name;

/// A single named payload descriptor inside the archive directory.
///
/// `size == 0` marks a *marker* entry: a named position in the directory
/// whose offset is conventionally where a future payload would begin, but
/// may be anything.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WadEntry {
    /// Byte position of the payload start within the archive.
    pub offset: u32,
    /// Payload length in bytes.
    pub size: u32,
    /// Canonical 8-byte name, NUL-padded.
    pub(crate) name: [u8; 8],
}

impl WadEntry {
    /// Build an entry with a validated, canonicalized name.
    pub fn new(entry_name: &str, offset: u32, size: u32) -> Result<WadEntry, WadError> {
        Ok(WadEntry {
            offset,
            size,
            name: name::canonicalize(entry_name)?,
        })
    }

    /// Decode one 16-byte directory record. Names are accepted leniently;
    /// validation only applies when entries are created, not loaded.
    pub fn from_bytes(bytes: &[u8; 16]) -> WadEntry {
        WadEntry {
            offset: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            size: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            name: bytes[8..16].try_into().unwrap(),
        }
    }

    /// Encode into the 16-byte on-disk record.
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0..4].copy_from_slice(&self.offset.to_le_bytes());
        out[4..8].copy_from_slice(&self.size.to_le_bytes());
        out[8..16].copy_from_slice(&self.name);
        out
    }

    /// The logical name: on-disk bytes trimmed at the first NUL.
    pub fn name(&self) -> Cow<'_, str> {
        name::decode(&self.name)
    }

    /// The raw canonical 8-byte name form.
    pub fn name_bytes(&self) -> &[u8; 8] {
        &self.name
    }

    /// A copy of this entry carrying a different (validated) name.
    pub fn with_name(&self, entry_name: &str) -> Result<WadEntry, WadError> {
        Ok(WadEntry {
            name: name::canonicalize(entry_name)?,
            ..*self
        })
    }

    /// `true` for zero-size marker entries (`F_START`, map names, ...).
    pub fn is_marker(&self) -> bool {
        self.size == 0
    }

    /// An all-zero record: empty name and zero size. Some tools round the
    /// directory up to a block boundary with these; they are dropped at
    /// load time.
    pub(crate) fn is_null_record(&self) -> bool {
        self.size == 0 && self.name[0] == 0
    }
}

impl fmt::Debug for WadEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WadEntry")
            .field("name", &self.name())
            .field("offset", &self.offset)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_round_trip() {
        let entry = WadEntry::new("LUMP01", 12, 3).unwrap();
        let bytes = entry.to_bytes();
        assert_eq!(
            bytes,
            [12, 0, 0, 0, 3, 0, 0, 0, b'L', b'U', b'M', b'P', b'0', b'1', 0, 0]
        );
        assert_eq!(WadEntry::from_bytes(&bytes), entry);
    }

    #[test]
    fn name_is_canonicalized() {
        let entry = WadEntry::new("lump", 0, 0).unwrap();
        assert_eq!(entry.name_bytes(), b"LUMP\0\0\0\0");
        assert_eq!(entry.name(), "LUMP");
    }

    #[test]
    fn invalid_name_is_refused() {
        assert!(matches!(
            WadEntry::new("bad name", 0, 0),
            Err(WadError::InvalidName(_))
        ));
    }

    #[test]
    fn marker_and_null_record_predicates() {
        let marker = WadEntry::new("P_START", 4096, 0).unwrap();
        assert!(marker.is_marker());
        assert!(!marker.is_null_record());

        let null = WadEntry::from_bytes(&[0u8; 16]);
        assert!(null.is_null_record());

        // lenient load: a weird on-disk name is kept, not a null record
        let mut raw = [0u8; 16];
        raw[8] = b'x';
        assert!(!WadEntry::from_bytes(&raw).is_null_record());
    }

    #[test]
    fn rename_keeps_offsets() {
        let entry = WadEntry::new("OLD", 77, 5).unwrap();
        let renamed = entry.with_name("new").unwrap();
        assert_eq!(renamed.offset, 77);
        assert_eq!(renamed.size, 5);
        assert_eq!(renamed.name(), "NEW");
    }
}
