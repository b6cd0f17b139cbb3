//! File-backed WAD container.
//!
//! Random access to an archive on disk: payloads are written the moment an
//! add runs, the header and directory are rewritten when the mutation
//! returns. Small edits are cheap; bulk appends should go through
//! [`Adder`], which defers the directory rewrite to the end of its scope.
//! Not safe for concurrent use - one writer, external synchronization.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian as LE, WriteBytesExt};

use crate::container::Wad;
use crate::entry::WadEntry;
use crate::error::WadError;
use crate::header::{self, check_directory_extent, WadType, DIR_ENTRY_LEN, HEADER_LEN};
use crate::name;

/// Copy buffer for sliding content during [`Wad::delete`].
const SLIDE_BUF_LEN: usize = 64 * 1024;

/// A WAD archive opened for in-place editing.
///
/// The container owns its read-write handle exclusively for its lifetime;
/// the handle is released on drop.
#[derive(Debug)]
pub struct WadFile {
    file: File,
    path: PathBuf,
    wad_type: WadType,
    entries: Vec<WadEntry>,
    directory_offset: u32,
}

impl WadFile {
    /// Open an existing archive with read+write access.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<WadFile, WadError> {
        let path = path.as_ref();

        /*----------- 1. open with read+write access ---------------------*/
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => WadError::FileNotFound(path.to_path_buf()),
                io::ErrorKind::PermissionDenied => WadError::PermissionDenied(path.to_path_buf()),
                _ => WadError::Io(e),
            })?;

        /*----------- 2. read and validate header ------------------------*/
        let mut f = &file;
        f.seek(SeekFrom::Start(0))?;
        let (wad_type, count, directory_offset) = header::read_header(&mut f)?;

        /*----------- 3. read directory entries --------------------------*/
        f.seek(SeekFrom::Start(directory_offset as u64))?;
        let mut entries = Vec::new();
        let mut record = [0u8; 16];
        for _ in 0..count {
            f.read_exact(&mut record)?;
            let entry = WadEntry::from_bytes(&record);
            // tolerate directories padded out with all-zero records
            if !entry.is_null_record() {
                entries.push(entry);
            }
        }

        Ok(WadFile {
            file,
            path: path.to_path_buf(),
            wad_type,
            entries,
            directory_offset,
        })
    }

    /// Create a fresh, empty PWAD at `path` (replacing any existing file)
    /// and open it for editing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<WadFile, WadError> {
        let path = path.as_ref();
        {
            let mut f = File::create(path)?;
            header::write_header(&mut f, WadType::Pwad, 0, HEADER_LEN)?;
        }
        WadFile::open(path)
    }

    /// Create a new archive at `target` holding copies of `entries` from
    /// another container, in order. Names and payloads are preserved,
    /// offsets recomputed. Overwrites `target`.
    pub fn extract<P, S>(target: P, source: &S, entries: &[WadEntry]) -> Result<WadFile, WadError>
    where
        P: AsRef<Path>,
        S: Wad + ?Sized,
    {
        let mut out = WadFile::create(target)?;
        let mut adder = out.adder();
        for entry in entries {
            let data = source.read_entry(entry)?;
            adder.add_data(&entry.name(), &data)?;
        }
        adder.finish()?;
        Ok(out)
    }

    /// The path this archive was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory as a read-only slice.
    pub fn entries(&self) -> &[WadEntry] {
        &self.entries
    }

    /// Rewrite the archive magic in place.
    pub fn set_wad_type(&mut self, wad_type: WadType) -> Result<(), WadError> {
        let mut f = &self.file;
        f.seek(SeekFrom::Start(0))?;
        f.write_all(&wad_type.magic())?;
        self.wad_type = wad_type;
        Ok(())
    }

    /// Insert a directory record with an explicit offset and size, writing
    /// no payload bytes. The offsets can reference anywhere in the
    /// archive, so exercise caution.
    pub fn add_entry_at(
        &mut self,
        index: usize,
        entry_name: &str,
        offset: u32,
        size: u32,
    ) -> Result<WadEntry, WadError> {
        if index > self.entries.len() {
            return Err(WadError::IndexOutOfBounds {
                index,
                len: self.entries.len(),
            });
        }
        check_directory_extent(self.directory_offset, self.entries.len() + 1)?;
        let entry = WadEntry::new(entry_name, offset, size)?;
        self.entries.insert(index, entry);
        self.flush_entries()?;
        Ok(entry)
    }

    /// Append a payload streamed from `source` (up to `max_len` bytes when
    /// given) as a new entry at directory position `index`.
    pub fn add_stream_at(
        &mut self,
        index: usize,
        entry_name: &str,
        source: &mut dyn Read,
        max_len: Option<u64>,
    ) -> Result<WadEntry, WadError> {
        self.ingest_at(index, entry_name, source, max_len, true)
    }

    /// Append a streamed payload at the end of the directory.
    pub fn add_stream(
        &mut self,
        entry_name: &str,
        source: &mut dyn Read,
        max_len: Option<u64>,
    ) -> Result<WadEntry, WadError> {
        self.ingest_at(self.entries.len(), entry_name, source, max_len, true)
    }

    /// Begin a bulk-add scope. Every `add_*` on the returned guard writes
    /// payload bytes immediately but defers the directory rewrite; the
    /// single flush runs in [`Adder::finish`] (or on drop, best effort).
    pub fn adder(&mut self) -> Adder<'_> {
        Adder {
            wad: self,
            finished: false,
        }
    }

    /// Write the header and the directory out to the file, truncating any
    /// stale trailing bytes left by a previously larger directory.
    pub fn flush_entries(&mut self) -> Result<(), WadError> {
        let mut f = &self.file;
        f.seek(SeekFrom::Start(4))?;
        f.write_u32::<LE>(self.entries.len() as u32)?;
        f.write_u32::<LE>(self.directory_offset)?;

        f.seek(SeekFrom::Start(self.directory_offset as u64))?;
        for entry in &self.entries {
            f.write_all(&entry.to_bytes())?;
        }
        let end = f.stream_position()?;
        if end < self.file.metadata()?.len() {
            self.file.set_len(end)?;
        }
        Ok(())
    }

    /// Payload ingestion shared by the direct adds and the [`Adder`]:
    /// stream bytes to the current directory offset, then record the entry.
    fn ingest_at(
        &mut self,
        index: usize,
        entry_name: &str,
        source: &mut dyn Read,
        max_len: Option<u64>,
        flush: bool,
    ) -> Result<WadEntry, WadError> {
        if index > self.entries.len() {
            return Err(WadError::IndexOutOfBounds {
                index,
                len: self.entries.len(),
            });
        }
        let name8 = name::canonicalize(entry_name)?;

        let offset = self.directory_offset;
        let mut f = &self.file;
        f.seek(SeekFrom::Start(offset as u64))?;

        // one past u32::MAX so an oversized source is detected, not clipped
        let limit = max_len.unwrap_or(u64::MAX).min(u32::MAX as u64 + 1);
        let written = io::copy(&mut source.take(limit), &mut f)?;
        let size = u32::try_from(written).map_err(|_| WadError::OutOfRange("payload size"))?;

        let new_offset = offset
            .checked_add(size)
            .ok_or(WadError::OutOfRange("directory offset"))?;
        check_directory_extent(new_offset, self.entries.len() + 1)?;

        let entry = WadEntry {
            offset,
            size,
            name: name8,
        };
        self.directory_offset = new_offset;
        self.entries.insert(index, entry);
        if flush {
            self.flush_entries()?;
        }
        Ok(entry)
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
}

impl Wad for WadFile {
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
        let extent = self.file.metadata()?.len();
        let end = entry.offset as u64 + entry.size as u64;
        if end > extent {
            return Err(WadError::EntryOutOfExtent {
                name: entry.name().into_owned(),
                offset: entry.offset,
                size: entry.size,
                extent,
            });
        }
        let mut f = &self.file;
        f.seek(SeekFrom::Start(entry.offset as u64))?;
        let mut buf = vec![0u8; entry.size as usize];
        f.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn add_data_at(
        &mut self,
        index: usize,
        entry_name: &str,
        data: &[u8],
    ) -> Result<WadEntry, WadError> {
        u32::try_from(data.len()).map_err(|_| WadError::OutOfRange("payload size"))?;
        self.ingest_at(index, entry_name, &mut &data[..], None, true)
    }

    fn remove(&mut self, index: usize) -> Result<WadEntry, WadError> {
        self.check_index(index)?;
        let entry = self.entries.remove(index);
        self.flush_entries()?;
        Ok(entry)
    }

    fn delete(&mut self, index: usize) -> Result<WadEntry, WadError> {
        self.check_index(index)?;
        let entry = self.entries[index];

        if entry.size > 0 {
            let end = entry.offset as u64 + entry.size as u64;
            if entry.offset < HEADER_LEN || end > self.directory_offset as u64 {
                return Err(WadError::EntryOutOfExtent {
                    name: entry.name().into_owned(),
                    offset: entry.offset,
                    size: entry.size,
                    extent: self.directory_offset as u64,
                });
            }

            // slide [offset+size, directory_offset) down over the payload;
            // source stays ahead of destination, chunks never overlap
            let mut buf = vec![0u8; SLIDE_BUF_LEN];
            let mut dst = entry.offset as u64;
            let mut src = end;
            let dir_end = self.directory_offset as u64;
            let mut f = &self.file;
            while src < dir_end {
                let amount = ((dir_end - src) as usize).min(buf.len());
                f.seek(SeekFrom::Start(src))?;
                f.read_exact(&mut buf[..amount])?;
                f.seek(SeekFrom::Start(dst))?;
                f.write_all(&buf[..amount])?;
                src += amount as u64;
                dst += amount as u64;
            }

            self.directory_offset -= entry.size;
            for e in &mut self.entries {
                if e.offset > entry.offset {
                    e.offset -= entry.size;
                }
            }
        }

        self.entries.remove(index);
        self.flush_entries()?;
        Ok(entry)
    }

    fn rename(&mut self, index: usize, new_name: &str) -> Result<(), WadError> {
        self.check_index(index)?;
        let renamed = self.entries[index].with_name(new_name)?;
        self.entries[index] = renamed;

        // only the name cell of the record changes; header stays put
        let pos = self.directory_offset as u64 + DIR_ENTRY_LEN as u64 * index as u64 + 8;
        let mut f = &self.file;
        f.seek(SeekFrom::Start(pos))?;
        f.write_all(renamed.name_bytes())?;
        Ok(())
    }

    fn replace(&mut self, index: usize, data: &[u8]) -> Result<(), WadError> {
        self.check_index(index)?;
        let entry = self.entries[index];

        if data.len() as u64 == entry.size as u64 {
            if entry.size > 0 {
                let mut f = &self.file;
                f.seek(SeekFrom::Start(entry.offset as u64))?;
                f.write_all(data)?;
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
        self.flush_entries()
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
        self.flush_entries()
    }

    // bulk copy through the adder: one directory flush for the whole batch
    fn add_from_at(
        &mut self,
        index: usize,
        source: &dyn Wad,
        entries: &[WadEntry],
    ) -> Result<(), WadError> {
        let mut adder = self.adder();
        for (i, entry) in entries.iter().enumerate() {
            let data = source.read_entry(entry)?;
            adder.add_data_at(index + i, &entry.name(), &data)?;
        }
        adder.finish()
    }
}

/// Bulk-add guard for [`WadFile`].
///
/// Appends write their payload bytes immediately but leave the on-disk
/// header and directory untouched until the scope ends, eliminating the
/// per-append directory rewrite. [`finish`](Adder::finish) performs the
/// one flush and surfaces its errors; dropping the guard without finishing
/// still flushes, best effort. The `&mut` borrow makes nesting impossible.
///
/// While the guard is live the on-disk directory is stale: a crash inside
/// the scope leaves the archive header pointing at overwritten records.
#[derive(Debug)]
pub struct Adder<'a> {
    wad: &'a mut WadFile,
    finished: bool,
}

impl Adder<'_> {
    /// Append `data` as a new entry at the end of the directory.
    pub fn add_data(&mut self, entry_name: &str, data: &[u8]) -> Result<WadEntry, WadError> {
        let index = self.wad.entries.len();
        self.add_data_at(index, entry_name, data)
    }

    /// Append `data` as a new entry at directory position `index`.
    pub fn add_data_at(
        &mut self,
        index: usize,
        entry_name: &str,
        data: &[u8],
    ) -> Result<WadEntry, WadError> {
        u32::try_from(data.len()).map_err(|_| WadError::OutOfRange("payload size"))?;
        self.wad.ingest_at(index, entry_name, &mut &data[..], None, false)
    }

    /// Append a streamed payload at the end of the directory.
    pub fn add_stream(
        &mut self,
        entry_name: &str,
        source: &mut dyn Read,
        max_len: Option<u64>,
    ) -> Result<WadEntry, WadError> {
        let index = self.wad.entries.len();
        self.wad.ingest_at(index, entry_name, source, max_len, false)
    }

    /// Append a zero-size marker entry.
    pub fn add_marker(&mut self, entry_name: &str) -> Result<WadEntry, WadError> {
        self.add_data(entry_name, &[])
    }

    /// Insert a zero-size marker entry at directory position `index`.
    pub fn add_marker_at(&mut self, index: usize, entry_name: &str) -> Result<WadEntry, WadError> {
        self.add_data_at(index, entry_name, &[])
    }

    /// Append a directory record with an explicit offset and size, writing
    /// no payload bytes.
    pub fn add_entry(
        &mut self,
        entry_name: &str,
        offset: u32,
        size: u32,
    ) -> Result<WadEntry, WadError> {
        check_directory_extent(self.wad.directory_offset, self.wad.entries.len() + 1)?;
        let entry = WadEntry::new(entry_name, offset, size)?;
        self.wad.entries.push(entry);
        Ok(entry)
    }

    /// Copy `entries` (names and payloads) from another archive.
    pub fn add_from(&mut self, source: &dyn Wad, entries: &[WadEntry]) -> Result<(), WadError> {
        for entry in entries {
            let data = source.read_entry(entry)?;
            self.add_data(&entry.name(), &data)?;
        }
        Ok(())
    }

    /// End the scope: write the header and directory once.
    pub fn finish(mut self) -> Result<(), WadError> {
        self.finished = true;
        self.wad.flush_entries()
    }
}

impl Drop for Adder<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.wad.flush_entries();
        }
    }
}

/*=======================================================================*/
/*                                Tests                                  */
/*=======================================================================*/
