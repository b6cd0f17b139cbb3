//! In-memory WAD container.
//!
//! The content region lives in one growable buffer laid out exactly as on
//! disk (buffer byte 0 is archive offset 12), so saving is a straight
//! serialization: header, content, directory. Bulk mutation is cheap; no
//! I/O happens until the buffer is written out.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use crate::container::Wad;
use crate::entry::WadEntry;
use crate::error::WadError;
use crate::header::{self, check_directory_extent, WadType, HEADER_LEN};

/// A whole WAD archive held in memory.
#[derive(Debug, Clone)]
pub struct WadBuffer {
    wad_type: WadType,
    /// Content region; index 0 corresponds to archive offset 12.
    content: Vec<u8>,
    entries: Vec<WadEntry>,
    /// Always `12 + content.len()`; kept as a checked u32 so growth past
    /// u32 addressing is refused rather than wrapped.
    directory_offset: u32,
}

impl WadBuffer {
    /// A fresh, empty archive of the given kind.
    pub fn new(wad_type: WadType) -> WadBuffer {
        WadBuffer {
            wad_type,
            content: Vec::new(),
            entries: Vec::new(),
            directory_offset: HEADER_LEN,
        }
    }

    /// Parse a complete archive image.
    pub fn from_bytes(data: &[u8]) -> Result<WadBuffer, WadError> {
        WadBuffer::from_reader(data)
    }

    /// Read a complete archive from a sequential byte source.
    pub fn from_reader(mut r: impl Read) -> Result<WadBuffer, WadError> {
        let (wad_type, count, directory_offset) = header::read_header(&mut r)?;
        let content_len = directory_offset
            .checked_sub(HEADER_LEN)
            .ok_or(WadError::OutOfRange("directory offset"))? as usize;

        let mut content = Vec::new();
        (&mut r).take(content_len as u64).read_to_end(&mut content)?;
        if content.len() < content_len {
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
            // tolerate directories padded out with all-zero records
            if !entry.is_null_record() {
                entries.push(entry);
            }
        }

        Ok(WadBuffer {
            wad_type,
            content,
            entries,
            directory_offset,
        })
    }

    /// Build a trimmed archive holding copies of `entries` from another
    /// container. Offsets are recomputed for the new layout.
    pub fn extract<S: Wad + ?Sized>(
        source: &S,
        entries: &[WadEntry],
    ) -> Result<WadBuffer, WadError> {
        let mut out = WadBuffer::new(WadType::Pwad);
        for entry in entries {
            let data = source.read_entry(entry)?;
            out.add_data(&entry.name(), &data)?;
        }
        Ok(out)
    }

    /// Directory as a read-only slice.
    pub fn entries(&self) -> &[WadEntry] {
        &self.entries
    }

    /// Change the archive kind; takes effect on the next save.
    pub fn set_wad_type(&mut self, wad_type: WadType) {
        self.wad_type = wad_type;
    }

    /// Serialize the archive: header, content region, directory.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + self.content.len() + 16 * self.entries.len());
        out.extend_from_slice(&self.wad_type.magic());
        out.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.directory_offset.to_le_bytes());
        out.extend_from_slice(&self.content);
        for entry in &self.entries {
            out.extend_from_slice(&entry.to_bytes());
        }
        out
    }

    /// Write the archive image to a sink.
    pub fn write_to(&self, w: &mut impl Write) -> Result<(), WadError> {
        header::write_header(w, self.wad_type, self.entries.len() as u32, self.directory_offset)?;
        w.write_all(&self.content)?;
        for entry in &self.entries {
            w.write_all(&entry.to_bytes())?;
        }
        Ok(())
    }

    /// Write the archive image to a file, replacing any existing one.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), WadError> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), WadError> {
        if index >= self.entries.len() {
            return Err(WadError::IndexOutOfBounds {
                index,
                len: self.entries.len(),
            });
        }
        Ok(())
    }

    /// Resolve an entry's payload to a content-buffer range.
    fn content_range(&self, entry: &WadEntry) -> Result<std::ops::Range<usize>, WadError> {
        let end = entry.offset as u64 + entry.size as u64;
        if entry.offset < HEADER_LEN || end > self.directory_offset as u64 {
            return Err(WadError::EntryOutOfExtent {
                name: entry.name().into_owned(),
                offset: entry.offset,
                size: entry.size,
                extent: self.directory_offset as u64,
            });
        }
        let start = (entry.offset - HEADER_LEN) as usize;
        Ok(start..start + entry.size as usize)
    }
}

impl Wad for WadBuffer {
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

    fn read_entry(&self, entry: &WadEntry) -> Result<Vec<u8>, WadError> {
        if entry.size == 0 {
            return Ok(Vec::new());
        }
        Ok(self.content[self.content_range(entry)?].to_vec())
    }

    fn add_data_at(
        &mut self,
        index: usize,
        entry_name: &str,
        data: &[u8],
    ) -> Result<WadEntry, WadError> {
        if index > self.entries.len() {
            return Err(WadError::IndexOutOfBounds {
                index,
                len: self.entries.len(),
            });
        }
        let size = u32::try_from(data.len()).map_err(|_| WadError::OutOfRange("payload size"))?;
        let offset = self.directory_offset;
        let new_offset = offset
            .checked_add(size)
            .ok_or(WadError::OutOfRange("directory offset"))?;
        check_directory_extent(new_offset, self.entries.len() + 1)?;

        let entry = WadEntry::new(entry_name, offset, size)?;
        self.content.extend_from_slice(data);
        self.entries.insert(index, entry);
        self.directory_offset = new_offset;
        Ok(entry)
    }

    fn remove(&mut self, index: usize) -> Result<WadEntry, WadError> {
        self.check_index(index)?;
        Ok(self.entries.remove(index))
    }

    fn delete(&mut self, index: usize) -> Result<WadEntry, WadError> {
        self.check_index(index)?;
        let entry = self.entries[index];
        if entry.size > 0 {
            let range = self.content_range(&entry)?;
            self.content.drain(range);
            self.directory_offset -= entry.size;
            for e in &mut self.entries {
                if e.offset > entry.offset {
                    e.offset -= entry.size;
                }
            }
        }
        self.entries.remove(index);
        Ok(entry)
    }

    fn rename(&mut self, index: usize, new_name: &str) -> Result<(), WadError> {
        self.check_index(index)?;
        self.entries[index] = self.entries[index].with_name(new_name)?;
        Ok(())
    }

    fn replace(&mut self, index: usize, data: &[u8]) -> Result<(), WadError> {
        self.check_index(index)?;
        let entry = self.entries[index];
        if data.len() as u64 == entry.size as u64 {
            if entry.size > 0 {
                let range = self.content_range(&entry)?;
                self.content[range].copy_from_slice(data);
            }
            return Ok(());
        }
        let entry_name = entry.name().into_owned();
        self.delete(index)?;
        self.add_data_at(index, &entry_name, data)?;
        Ok(())
    }

    fn set_entries(&mut self, entries: &[WadEntry]) -> Result<(), WadError> {
        check_directory_extent(self.directory_offset, entries.len())?;
        self.entries = entries.to_vec();
        Ok(())
    }

    fn splice(&mut self, start: usize, entries: &[WadEntry]) -> Result<(), WadError> {
        let grown = self.entries.len().max(start.saturating_add(entries.len()));
        check_directory_extent(self.directory_offset, grown)?;
        for (i, entry) in entries.iter().enumerate() {
            match self.entries.get_mut(start + i) {
                Some(slot) => *slot = *entry,
                None => self.entries.push(*entry),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_archive_is_a_bare_header() {
        let wad = WadBuffer::new(WadType::Pwad);
        assert_eq!(wad.entry_count(), 0);
        assert_eq!(wad.directory_offset(), 12);
        assert_eq!(wad.content_length(), 0);
        assert_eq!(wad.to_bytes(), b"PWAD\x00\x00\x00\x00\x0c\x00\x00\x00");
    }

    #[test]
    fn add_lays_payload_and_directory_out_on_disk() {
        let mut wad = WadBuffer::new(WadType::Pwad);
        let entry = wad.add_data("LUMP01", &[0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(entry.offset, 12);
        assert_eq!(entry.size, 3);
        assert_eq!(wad.directory_offset(), 15);

        let bytes = wad.to_bytes();
        assert_eq!(&bytes[0..4], b"PWAD");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 15);
        assert_eq!(&bytes[12..15], &[0xAA, 0xBB, 0xCC]);
        assert_eq!(
            &bytes[15..31],
            &[12, 0, 0, 0, 3, 0, 0, 0, b'L', b'U', b'M', b'P', b'0', b'1', 0, 0]
        );
    }

    #[test]
    fn unmutated_archive_round_trips_byte_identical() {
        let mut wad = WadBuffer::new(WadType::Iwad);
        wad.add_data("A", b"aaaa").unwrap();
        wad.add_marker("MARK").unwrap();
        wad.add_data("B", b"bb").unwrap();
        let image = wad.to_bytes();

        let reloaded = WadBuffer::from_bytes(&image).unwrap();
        assert_eq!(reloaded.to_bytes(), image);
        assert!(reloaded.is_iwad());
    }

    #[test]
    fn delete_slides_trailing_content_down() {
        let mut wad = WadBuffer::new(WadType::Pwad);
        wad.add_data("A", b"aaaa").unwrap();
        wad.add_data("B", b"bbbb").unwrap();
        wad.add_data("C", b"cccc").unwrap();

        let gone = wad.delete(0).unwrap();
        assert_eq!(gone.name(), "A");
        assert_eq!(wad.entry_count(), 2);
        assert_eq!(wad.entry(0).name(), "B");
        assert_eq!(wad.entry(0).offset, 12);
        assert_eq!(wad.entry(1).name(), "C");
        assert_eq!(wad.entry(1).offset, 16);
        assert_eq!(wad.directory_offset(), 20);
        assert_eq!(wad.read_at(0).unwrap(), b"bbbb");
    }

    #[test]
    fn remove_leaves_payload_hole() {
        let mut wad = WadBuffer::new(WadType::Pwad);
        wad.add_data("A", b"aaaa").unwrap();
        wad.add_data("B", b"bbbb").unwrap();

        wad.remove(0).unwrap();
        assert_eq!(wad.entry_count(), 1);
        // the hole is not reclaimed, offsets stay put
        assert_eq!(wad.directory_offset(), 20);
        assert_eq!(wad.entry(0).offset, 16);
        assert_eq!(wad.read_at(0).unwrap(), b"bbbb");
    }

    #[test]
    fn replace_same_size_overwrites_in_place() {
        let mut wad = WadBuffer::new(WadType::Pwad);
        wad.add_data("A", b"aaaa").unwrap();
        wad.add_data("B", b"bbbb").unwrap();

        wad.replace(0, b"zzzz").unwrap();
        assert_eq!(wad.entry(0).offset, 12);
        assert_eq!(wad.read_at(0).unwrap(), b"zzzz");
        assert_eq!(wad.read_at(1).unwrap(), b"bbbb");
    }

    #[test]
    fn replace_with_size_change_readds_at_same_index() {
        let mut wad = WadBuffer::new(WadType::Pwad);
        wad.add_data("A", &[7u8; 10]).unwrap();
        wad.add_data("B", b"bbbb").unwrap();

        wad.replace(0, &[9u8; 15]).unwrap();
        assert_eq!(wad.entry_count(), 2);
        assert_eq!(wad.entry(0).name(), "A");
        assert_eq!(wad.entry(0).size, 15);
        assert_eq!(wad.read_at(0).unwrap(), vec![9u8; 15]);
        // B slid down when A's old payload was reclaimed
        assert_eq!(wad.entry(1).offset, 12);
        assert_eq!(wad.read_at(1).unwrap(), b"bbbb");
    }

    #[test]
    fn markers_take_no_content_space() {
        let mut wad = WadBuffer::new(WadType::Pwad);
        wad.add_data("A", b"aaaa").unwrap();
        let marker = wad.add_marker("E1M1").unwrap();
        assert_eq!(marker.size, 0);
        assert_eq!(marker.offset, 16);
        assert_eq!(wad.directory_offset(), 16);
        assert_eq!(wad.read_at(1).unwrap(), b"");
    }

    #[test]
    fn splice_overwrites_then_appends() {
        let mut wad = WadBuffer::new(WadType::Pwad);
        wad.add_data("A", b"aa").unwrap();
        wad.add_data("B", b"bb").unwrap();

        let x = WadEntry::new("X", 12, 2).unwrap();
        let y = WadEntry::new("Y", 14, 2).unwrap();
        let z = WadEntry::new("Z", 12, 0).unwrap();
        wad.splice(1, &[x, y, z]).unwrap();

        let names: Vec<String> = wad.iter().map(|e| e.name().into_owned()).collect();
        assert_eq!(names, ["A", "X", "Y", "Z"]);
    }

    #[test]
    fn set_entries_replaces_directory_wholesale() {
        let mut wad = WadBuffer::new(WadType::Pwad);
        wad.add_data("A", b"aa").unwrap();
        wad.add_data("B", b"bb").unwrap();

        let only = WadEntry::new("B", 14, 2).unwrap();
        wad.set_entries(&[only]).unwrap();
        assert_eq!(wad.entry_count(), 1);
        // content kept; the surviving entry still reads its bytes
        assert_eq!(wad.read_at(0).unwrap(), b"bb");
    }

    #[test]
    fn trailing_null_records_are_dropped_on_load() {
        let mut image = Vec::new();
        image.extend_from_slice(b"PWAD");
        image.extend_from_slice(&3u32.to_le_bytes());
        image.extend_from_slice(&14u32.to_le_bytes());
        image.extend_from_slice(b"xy"); // content
        image.extend_from_slice(&WadEntry::new("REAL", 12, 2).unwrap().to_bytes());
        image.extend_from_slice(&[0u8; 32]); // two padding records

        let wad = WadBuffer::from_bytes(&image).unwrap();
        assert_eq!(wad.entry_count(), 1);
        assert_eq!(wad.entry(0).name(), "REAL");
    }

    #[test]
    fn entry_past_extent_fails_to_read() {
        let mut wad = WadBuffer::new(WadType::Pwad);
        wad.add_data("A", b"aa").unwrap();
        let bogus = WadEntry::new("BOGUS", 12, 400).unwrap();
        wad.set_entries(&[bogus]).unwrap();
        assert!(matches!(
            wad.read_at(0),
            Err(WadError::EntryOutOfExtent { extent: 14, .. })
        ));
    }

    #[test]
    fn truncated_image_is_rejected() {
        let mut wad = WadBuffer::new(WadType::Pwad);
        wad.add_data("A", b"aaaa").unwrap();
        let image = wad.to_bytes();
        assert!(WadBuffer::from_bytes(&image[..image.len() - 1]).is_err());
        assert!(WadBuffer::from_bytes(&image[..13]).is_err());
    }

    #[test]
    fn extract_builds_trimmed_archive() {
        let mut src = WadBuffer::new(WadType::Iwad);
        src.add_data("KEEP1", b"11").unwrap();
        src.add_data("DROP", b"xx").unwrap();
        src.add_data("KEEP2", b"2222").unwrap();

        let picked = [src.entry(0), src.entry(2)];
        let out = WadBuffer::extract(&src, &picked).unwrap();
        assert!(out.is_pwad());
        assert_eq!(out.entry_count(), 2);
        assert_eq!(out.read_at(0).unwrap(), b"11");
        assert_eq!(out.read_at(1).unwrap(), b"2222");
        assert_eq!(out.entry(1).offset, 14);
    }

    #[test]
    fn large_directory_with_known_map_payload() {
        let mut wad = WadBuffer::new(WadType::Pwad);
        for i in 0..40 {
            wad.add_data(&format!("LUMP{i:02}"), &[i as u8; 8]).unwrap();
        }
        wad.add_marker("MAP01").unwrap();
        wad.add_data("MAP02", &vec![0x55u8; 250_034]).unwrap();
        for i in 0..40 {
            wad.add_data(&format!("TAIL{i:02}"), &[i as u8; 4]).unwrap();
        }

        assert_eq!(wad.entry_count(), 82);
        assert!(wad.find_first("MAP01").is_some());
        assert!(wad.find_first("MAP08").is_none());
        assert_eq!(wad.read_by_name("MAP02").unwrap().unwrap().len(), 250_034);
    }
}
