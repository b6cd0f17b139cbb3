//! The abstract container contract.
//!
//! Three concrete containers satisfy it:
//!
//! * [`WadFile`](crate::WadFile)   - random-access file, in-place edits
//! * [`WadBuffer`](crate::WadBuffer) - whole archive in memory
//! * [`WadMap`](crate::WadMap)    - read-only directory built from a stream
//!
//! Operations a variant cannot honor return [`WadError::Unsupported`]
//! instead of inheriting a no-op. Name searches are case-sensitive exact
//! matches on the canonical 8-byte form; duplicate names are permitted and
//! meaningful (map markers, `F_START`/`F_END` fences), so nothing here
//! deduplicates.

use std::io::Cursor;

use crate::entry::WadEntry;
use crate::error::WadError;
use crate::header::{WadType, HEADER_LEN};
use crate::name;

/// Common contract of every WAD container.
///
/// After any public mutation returns, the persisted header/directory and
/// the in-memory entry sequence agree - except inside a bulk-add scope
/// ([`Adder`](crate::Adder)), which defers the directory write to its end.
pub trait Wad {
    /// The archive kind (IWAD or PWAD).
    fn wad_type(&self) -> WadType;

    /// Number of directory entries.
    fn entry_count(&self) -> usize;

    /// The entry at `index`.
    ///
    /// # Panics
    /// Panics when `index` is out of bounds; use [`Wad::map_entries`] or
    /// bounds-checked reads for fallible access.
    fn entry(&self, index: usize) -> WadEntry;

    /// Byte position where the directory begins (content region ends).
    fn directory_offset(&self) -> u32;

    /// Read an entry's payload bytes.
    ///
    /// The entry is trusted for its offset/size only; reading with an entry
    /// obtained from a *different* archive reads whatever those offsets
    /// happen to address here.
    fn read_entry(&self, entry: &WadEntry) -> Result<Vec<u8>, WadError>;

    // ------------------------------------------------------------------ //
    // Mutation primitives (per-implementation)
    // ------------------------------------------------------------------ //

    /// Append `data` as a new entry at directory position `index`
    /// (`index == entry_count()` appends at the end); later entries shift
    /// down one slot. Payload bytes land at the current directory offset.
    fn add_data_at(&mut self, index: usize, entry_name: &str, data: &[u8])
        -> Result<WadEntry, WadError>;

    /// Detach the entry at `index` from the directory without reclaiming
    /// its payload bytes, which stay as an unreferenced hole.
    fn remove(&mut self, index: usize) -> Result<WadEntry, WadError>;

    /// Remove the entry at `index` *and* reclaim its payload by sliding
    /// the trailing content region down, rewriting affected offsets.
    fn delete(&mut self, index: usize) -> Result<WadEntry, WadError>;

    /// Give the entry at `index` a new (validated) name.
    fn rename(&mut self, index: usize, new_name: &str) -> Result<(), WadError>;

    /// Replace the payload of the entry at `index`. Equal-size payloads are
    /// overwritten in place; a size change re-adds the entry at the same
    /// index (its offset may move).
    fn replace(&mut self, index: usize, data: &[u8]) -> Result<(), WadError>;

    /// Replace the whole directory with `entries`. Offsets and sizes are
    /// taken as given; no payload bytes move.
    fn set_entries(&mut self, entries: &[WadEntry]) -> Result<(), WadError>;

    /// Overwrite directory slots starting at `start` with `entries`;
    /// slots past the current end are appended.
    fn splice(&mut self, start: usize, entries: &[WadEntry]) -> Result<(), WadError>;

    // ------------------------------------------------------------------ //
    // Provided: enumeration
    // ------------------------------------------------------------------ //

    /// `true` when the archive magic is `IWAD`.
    fn is_iwad(&self) -> bool {
        self.wad_type() == WadType::Iwad
    }

    /// `true` when the archive magic is `PWAD`.
    fn is_pwad(&self) -> bool {
        self.wad_type() == WadType::Pwad
    }

    /// Occupied size of the content region in bytes.
    fn content_length(&self) -> u32 {
        self.directory_offset() - HEADER_LEN
    }

    /// Iterate over the directory in order.
    fn iter(&self) -> Box<dyn Iterator<Item = WadEntry> + '_> {
        Box::new((0..self.entry_count()).map(move |i| self.entry(i)))
    }

    /// An ordered snapshot of every entry.
    fn entries(&self) -> Vec<WadEntry> {
        self.iter().collect()
    }

    /// A contiguous snapshot of entries starting at `start`, clipped to the
    /// directory bounds: overshooting returns fewer (possibly zero)
    /// entries, never an error. Negative starts are unrepresentable.
    fn map_entries(&self, start: usize, max_len: usize) -> Vec<WadEntry> {
        let len = self.entry_count();
        if start >= len {
            return Vec::new();
        }
        let end = start.saturating_add(max_len).min(len);
        (start..end).map(|i| self.entry(i)).collect()
    }

    // ------------------------------------------------------------------ //
    // Provided: search
    // ------------------------------------------------------------------ //

    /// First entry named `entry_name`, scanning from `start`.
    fn find_first_from(&self, entry_name: &str, start: usize) -> Option<(usize, WadEntry)> {
        let query = name::pad8(entry_name)?;
        (start..self.entry_count())
            .map(|i| (i, self.entry(i)))
            .find(|(_, e)| e.name == query)
    }

    /// First entry named `entry_name`.
    fn find_first(&self, entry_name: &str) -> Option<(usize, WadEntry)> {
        self.find_first_from(entry_name, 0)
    }

    /// The `n`-th (zero-indexed) entry named `entry_name`.
    fn find_nth(&self, entry_name: &str, n: usize) -> Option<(usize, WadEntry)> {
        let query = name::pad8(entry_name)?;
        (0..self.entry_count())
            .map(|i| (i, self.entry(i)))
            .filter(|(_, e)| e.name == query)
            .nth(n)
    }

    /// The last entry named `entry_name`. WAD load order lets the last
    /// occurrence of a resource win, so this scan retains the final match.
    fn find_last(&self, entry_name: &str) -> Option<(usize, WadEntry)> {
        let query = name::pad8(entry_name)?;
        let mut found = None;
        for i in 0..self.entry_count() {
            let e = self.entry(i);
            if e.name == query {
                found = Some((i, e));
            }
        }
        found
    }

    /// Directory indices of every entry named `entry_name`.
    fn indices_of(&self, entry_name: &str) -> Vec<usize> {
        let Some(query) = name::pad8(entry_name) else {
            return Vec::new();
        };
        (0..self.entry_count())
            .filter(|&i| self.entry(i).name == query)
            .collect()
    }

    /// Index of the last entry named `entry_name`, if any.
    fn last_index_of(&self, entry_name: &str) -> Option<usize> {
        self.find_last(entry_name).map(|(i, _)| i)
    }

    /// `true` when any entry carries `entry_name`.
    fn contains(&self, entry_name: &str) -> bool {
        self.find_first(entry_name).is_some()
    }

    /// `true` when any entry at or past `start` carries `entry_name`.
    fn contains_from(&self, entry_name: &str, start: usize) -> bool {
        self.find_first_from(entry_name, start).is_some()
    }

    // ------------------------------------------------------------------ //
    // Provided: reads
    // ------------------------------------------------------------------ //

    /// Payload bytes of the entry at `index`.
    fn read_at(&self, index: usize) -> Result<Vec<u8>, WadError> {
        if index >= self.entry_count() {
            return Err(WadError::IndexOutOfBounds {
                index,
                len: self.entry_count(),
            });
        }
        self.read_entry(&self.entry(index))
    }

    /// Payload bytes of the first entry named `entry_name`; `None` when
    /// the name is absent.
    fn read_by_name(&self, entry_name: &str) -> Result<Option<Vec<u8>>, WadError> {
        self.read_by_name_from(entry_name, 0)
    }

    /// Payload bytes of the first entry named `entry_name` at or past
    /// `start`; `None` when the name is absent.
    fn read_by_name_from(
        &self,
        entry_name: &str,
        start: usize,
    ) -> Result<Option<Vec<u8>>, WadError> {
        match self.find_first_from(entry_name, start) {
            Some((_, entry)) => Ok(Some(self.read_entry(&entry)?)),
            None => Ok(None),
        }
    }

    /// An owned byte source delivering exactly `entry.size` bytes starting
    /// at `entry.offset`. The source does not pin the container: it stays
    /// valid across later mutations.
    fn open_entry(&self, entry: &WadEntry) -> Result<Cursor<Vec<u8>>, WadError> {
        Ok(Cursor::new(self.read_entry(entry)?))
    }

    /// Byte source for the entry at `index`.
    fn open_at(&self, index: usize) -> Result<Cursor<Vec<u8>>, WadError> {
        Ok(Cursor::new(self.read_at(index)?))
    }

    /// Byte source for the first entry named `entry_name`, if present.
    fn open_by_name(&self, entry_name: &str) -> Result<Option<Cursor<Vec<u8>>>, WadError> {
        Ok(self.read_by_name(entry_name)?.map(Cursor::new))
    }

    // ------------------------------------------------------------------ //
    // Provided: mutation conveniences
    // ------------------------------------------------------------------ //

    /// Append `data` as a new entry at the end of the directory.
    fn add_data(&mut self, entry_name: &str, data: &[u8]) -> Result<WadEntry, WadError> {
        self.add_data_at(self.entry_count(), entry_name, data)
    }

    /// Append a zero-size marker entry at the end of the directory.
    fn add_marker(&mut self, entry_name: &str) -> Result<WadEntry, WadError> {
        self.add_data(entry_name, &[])
    }

    /// Insert a zero-size marker entry at directory position `index`.
    fn add_marker_at(&mut self, index: usize, entry_name: &str) -> Result<WadEntry, WadError> {
        self.add_data_at(index, entry_name, &[])
    }

    /// Copy `entries` (names and payloads) from another archive, appending
    /// them here in order. Offsets are recomputed.
    fn add_from(&mut self, source: &dyn Wad, entries: &[WadEntry]) -> Result<(), WadError> {
        self.add_from_at(self.entry_count(), source, entries)
    }

    /// Copy `entries` from another archive, inserting from `index` on.
    fn add_from_at(
        &mut self,
        index: usize,
        source: &dyn Wad,
        entries: &[WadEntry],
    ) -> Result<(), WadError> {
        for (i, entry) in entries.iter().enumerate() {
            let data = source.read_entry(entry)?;
            self.add_data_at(index + i, &entry.name(), &data)?;
        }
        Ok(())
    }
}
