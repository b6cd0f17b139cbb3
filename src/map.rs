//! Read-only directory map.
//!
//! Indexes an archive from a sequential stream: the content region is
//! skipped, only the directory is kept, and the source is not retained.
//! Payload reads and mutations are unsupported; callers reopen their own
//! source using the offsets and sizes the entries carry.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::container::Wad;
use crate::entry::WadEntry;
use crate::error::WadError;
use crate::header::{self, WadType, HEADER_LEN};

/// A mapping of WAD entries with no payload access.
#[derive(Debug, Clone)]
pub struct WadMap {
    wad_type: WadType,
    entries: Vec<WadEntry>,
    directory_offset: u32,
}

impl WadMap {
    /// Index an archive from a sequential byte source. The content region
    /// is read and discarded; the stream is left positioned at its end.
    pub fn from_reader(mut r: impl Read) -> Result<WadMap, WadError> {
        let (wad_type, count, directory_offset) = header::read_header(&mut r)?;
        let content_len = directory_offset
            .checked_sub(HEADER_LEN)
            .ok_or(WadError::OutOfRange("directory offset"))? as u64;

        let skipped = io::copy(&mut (&mut r).take(content_len), &mut io::sink())?;
        if skipped < content_len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "content region cut short",
            )
            .into());
        }

        let mut entries = Vec::new();
        let mut record = [0u8; 16];
        for _ in 0..count {
            r.read_exact(&mut record)?;
            let entry = WadEntry::from_bytes(&record);
            if !entry.is_null_record() {
                entries.push(entry);
            }
        }

        Ok(WadMap {
            wad_type,
            entries,
            directory_offset,
        })
    }

    /// Index an archive file without keeping it open.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<WadMap, WadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => WadError::FileNotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => WadError::PermissionDenied(path.to_path_buf()),
            _ => WadError::Io(e),
        })?;
        WadMap::from_reader(BufReader::new(file))
    }

    /// Directory as a read-only slice.
    pub fn entries(&self) -> &[WadEntry] {
        &self.entries
    }
}

const NO_SOURCE: &str = "wad map does not retain its source";
const READ_ONLY: &str = "wad map is read-only";

impl Wad for WadMap {
    fn wad_type(&self) -> WadType {
        self.wad_type
    }

    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn entry(&self, index: usize) -> WadEntry {
        self.entries[index]
    }

    fn directory_offset(&self) -> u32 {
        self.directory_offset
    }

    fn read_entry(&self, _entry: &WadEntry) -> Result<Vec<u8>, WadError> {
        Err(WadError::Unsupported(NO_SOURCE))
    }

    fn add_data_at(
        &mut self,
        _index: usize,
        _entry_name: &str,
        _data: &[u8],
    ) -> Result<WadEntry, WadError> {
        Err(WadError::Unsupported(READ_ONLY))
    }

    fn remove(&mut self, _index: usize) -> Result<WadEntry, WadError> {
        Err(WadError::Unsupported(READ_ONLY))
    }

    fn delete(&mut self, _index: usize) -> Result<WadEntry, WadError> {
        Err(WadError::Unsupported(READ_ONLY))
    }

    fn rename(&mut self, _index: usize, _new_name: &str) -> Result<(), WadError> {
        Err(WadError::Unsupported(READ_ONLY))
    }

    fn replace(&mut self, _index: usize, _data: &[u8]) -> Result<(), WadError> {
        Err(WadError::Unsupported(READ_ONLY))
    }

    fn set_entries(&mut self, _entries: &[WadEntry]) -> Result<(), WadError> {
        Err(WadError::Unsupported(READ_ONLY))
    }

    fn splice(&mut self, _start: usize, _entries: &[WadEntry]) -> Result<(), WadError> {
        Err(WadError::Unsupported(READ_ONLY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::WadBuffer;
    use std::io::Cursor;

    fn sample_image() -> Vec<u8> {
        let mut wad = WadBuffer::new(WadType::Iwad);
        wad.add_data("PLAYPAL", &[1u8; 768]).unwrap();
        wad.add_marker("E1M1").unwrap();
        wad.add_data("THINGS", &[2u8; 20]).unwrap();
        wad.to_bytes()
    }

    #[test]
    fn indexes_entries_from_a_stream() {
        let map = WadMap::from_reader(Cursor::new(sample_image())).unwrap();
        assert!(map.is_iwad());
        assert_eq!(map.entry_count(), 3);
        assert_eq!(map.directory_offset(), 12 + 768 + 20);
        assert_eq!(map.entry(0).name(), "PLAYPAL");
        assert_eq!(map.entry(0).offset, 12);
        assert_eq!(map.entry(0).size, 768);
        assert_eq!(map.find_first("THINGS").unwrap().0, 2);
    }

    #[test]
    fn leaves_stream_at_directory_end() {
        let mut image = sample_image();
        image.extend_from_slice(b"trailer");
        let mut cursor = Cursor::new(image);
        WadMap::from_reader(&mut cursor).unwrap();

        let mut rest = Vec::new();
        cursor.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"trailer");
    }

    #[test]
    fn entries_carry_what_a_caller_needs_to_reopen() {
        let image = sample_image();
        let map = WadMap::from_reader(Cursor::new(&image[..])).unwrap();
        let (_, things) = map.find_first("THINGS").unwrap();

        // the map cannot read for us...
        assert!(matches!(
            map.read_entry(&things),
            Err(WadError::Unsupported(_))
        ));

        // ...but its offsets address the source bytes just fine
        let start = things.offset as usize;
        let end = start + things.size as usize;
        assert_eq!(&image[start..end], &[2u8; 20][..]);
    }

    #[test]
    fn every_mutation_is_unsupported() {
        let mut map = WadMap::from_reader(Cursor::new(sample_image())).unwrap();
        let entry = map.entry(0);

        assert!(matches!(map.add_data("X", b"x"), Err(WadError::Unsupported(_))));
        assert!(matches!(map.add_marker("X"), Err(WadError::Unsupported(_))));
        assert!(matches!(map.remove(0), Err(WadError::Unsupported(_))));
        assert!(matches!(map.delete(0), Err(WadError::Unsupported(_))));
        assert!(matches!(map.rename(0, "Y"), Err(WadError::Unsupported(_))));
        assert!(matches!(map.replace(0, b"z"), Err(WadError::Unsupported(_))));
        assert!(matches!(map.set_entries(&[entry]), Err(WadError::Unsupported(_))));
        assert!(matches!(map.splice(0, &[entry]), Err(WadError::Unsupported(_))));

        // nothing changed
        assert_eq!(map.entry_count(), 3);
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let image = sample_image();
        assert!(WadMap::from_reader(Cursor::new(&image[..40])).is_err());
    }

    #[test]
    fn from_path_does_not_keep_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapped.wad");
        std::fs::write(&path, sample_image()).unwrap();

        let map = WadMap::from_path(&path).unwrap();
        assert_eq!(map.entry_count(), 3);

        // the source can be removed out from under the map
        std::fs::remove_file(&path).unwrap();
        assert_eq!(map.entry(2).name(), "THINGS");
    }
}
