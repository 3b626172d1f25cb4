//! The contiguous block store (spec §4.3, §6): append-only segment files,
//! rolled at a configured size threshold, addressed by [`Locator`].
//!
//! Two independent instances of [`SegmentedStore`] exist in a running node:
//! one opened over `blocks/block%05d.bin` for committed blocks, one over
//! `blocks/revert%05d.bin` for reverse deltas. Both share the same framing
//! (`[magic:4][length:4][payload]`) and roll threshold; only the filename
//! prefix differs.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::locator::Locator;

/// Identifies this as Thunderbolt network data, the same way Bitcoin's
/// block files are magic-prefixed so a misdirected read fails fast instead
/// of silently parsing garbage.
pub const MAGIC: u32 = 0xD9B4_BEF9;

const FRAME_HEADER_LEN: u64 = 8; // 4-byte magic + 4-byte length

fn segment_file_name(prefix: &str, segment: u32) -> String {
    format!("{}{:05}.bin", prefix, segment)
}

/// An append-only, segmented, randomly-readable byte store.
pub struct SegmentedStore {
    dir: PathBuf,
    prefix: &'static str,
    roll_threshold: u64,
    current_segment: u32,
    current_file: File,
    current_len: u64,
}

impl SegmentedStore {
    /// Opens (creating if necessary) the store rooted at `dir`, continuing
    /// from the highest-numbered existing segment, or starting a fresh
    /// segment 0 if `dir` is empty.
    pub fn open(dir: &Path, prefix: &'static str, roll_threshold: u64) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;

        let highest_existing = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| {
                name.strip_prefix(prefix)
                    .and_then(|rest| rest.strip_suffix(".bin"))
                    .and_then(|digits| digits.parse::<u32>().ok())
            })
            .max();

        let current_segment = highest_existing.unwrap_or(0);
        let path = dir.join(segment_file_name(prefix, current_segment));
        let current_file = OpenOptions::new().create(true).read(true).append(true).open(&path)?;
        let current_len = current_file.metadata()?.len();

        Ok(SegmentedStore {
            dir: dir.to_path_buf(),
            prefix,
            roll_threshold,
            current_segment,
            current_file,
            current_len,
        })
    }

    /// Appends `payload`, rolling to a new segment first if the record
    /// would push the current segment past `roll_threshold`. Rolling
    /// fsyncs the segment being closed.
    pub fn append(&mut self, payload: &[u8]) -> Result<Locator, StoreError> {
        let record_len = FRAME_HEADER_LEN + payload.len() as u64;

        if self.current_len > 0 && self.current_len + record_len > self.roll_threshold {
            self.roll()?;
        }

        let offset = self.current_len;
        self.current_file.write_all(&MAGIC.to_be_bytes())?;
        self.current_file.write_all(&(payload.len() as u32).to_be_bytes())?;
        self.current_file.write_all(payload)?;
        self.current_len += record_len;

        Ok(Locator {
            segment: self.current_segment,
            offset,
            length: payload.len() as u32,
        })
    }

    fn roll(&mut self) -> Result<(), StoreError> {
        self.current_file.sync_all()?;
        self.current_segment += 1;
        self.current_len = 0;
        let path = self.dir.join(segment_file_name(self.prefix, self.current_segment));
        self.current_file = OpenOptions::new().create(true).read(true).append(true).open(path)?;
        Ok(())
    }

    /// Random-access read of a previously returned [`Locator`]. Re-validates
    /// the frame's magic and length against what the locator claims, so a
    /// corrupted or mismatched locator surfaces as [`StoreError::Corrupt`]
    /// rather than returning the wrong bytes.
    pub fn read(&self, locator: Locator) -> Result<Vec<u8>, StoreError> {
        let path = self.dir.join(segment_file_name(self.prefix, locator.segment));
        let mut file = File::open(&path)?;
        file.seek(SeekFrom::Start(locator.offset))?;

        let mut magic_bytes = [0u8; 4];
        file.read_exact(&mut magic_bytes)?;
        if u32::from_be_bytes(magic_bytes) != MAGIC {
            return Err(StoreError::Corrupt("block store record has the wrong magic"));
        }

        let mut length_bytes = [0u8; 4];
        file.read_exact(&mut length_bytes)?;
        let length = u32::from_be_bytes(length_bytes);
        if length != locator.length {
            return Err(StoreError::Corrupt("block store record length does not match its locator"));
        }

        let mut payload = vec![0u8; length as usize];
        file.read_exact(&mut payload)?;
        Ok(payload)
    }

    /// Fsyncs the segment currently being appended to. The persistence
    /// service calls this after every committed block so a crash cannot
    /// leave a block durably referenced by metadata but absent from disk.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.current_file.sync_all().map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_read_round_trips() {
        let dir = tempdir::TempDir::new("thunderbolt-block-store").unwrap();
        let mut store = SegmentedStore::open(dir.path(), "block", 128 * 1024 * 1024).unwrap();

        let locator = store.append(b"hello block").unwrap();
        assert_eq!(store.read(locator).unwrap(), b"hello block");
    }

    #[test]
    fn rolls_to_a_new_segment_past_the_threshold() {
        let dir = tempdir::TempDir::new("thunderbolt-block-store").unwrap();
        // A tiny threshold forces every append after the first into its own segment.
        let mut store = SegmentedStore::open(dir.path(), "block", 16).unwrap();

        let first = store.append(b"aaaaaaaaaa").unwrap();
        let second = store.append(b"bbbbbbbbbb").unwrap();

        assert_eq!(first.segment, 0);
        assert_eq!(second.segment, 1);
        assert_eq!(store.read(first).unwrap(), b"aaaaaaaaaa");
        assert_eq!(store.read(second).unwrap(), b"bbbbbbbbbb");
    }

    #[test]
    fn reopening_continues_from_the_highest_segment() {
        let dir = tempdir::TempDir::new("thunderbolt-block-store").unwrap();
        {
            let mut store = SegmentedStore::open(dir.path(), "block", 16).unwrap();
            store.append(b"aaaaaaaaaa").unwrap();
            store.append(b"bbbbbbbbbb").unwrap();
        }

        let mut reopened = SegmentedStore::open(dir.path(), "block", 16).unwrap();
        let locator = reopened.append(b"cccccccccc").unwrap();
        assert_eq!(locator.segment, 1);
    }

    #[test]
    fn mismatched_locator_length_is_reported_as_corrupt() {
        let dir = tempdir::TempDir::new("thunderbolt-block-store").unwrap();
        let mut store = SegmentedStore::open(dir.path(), "block", 128 * 1024 * 1024).unwrap();
        let mut locator = store.append(b"hello block").unwrap();
        locator.length = 3;
        assert!(matches!(store.read(locator), Err(StoreError::Corrupt(_))));
    }
}
