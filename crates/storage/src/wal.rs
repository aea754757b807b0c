// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only write-ahead log.
//!
//! Entries are newline-delimited JSON, tagged with a monotonic `seq`. The
//! log keeps an in-memory backlog for the `next_unprocessed`/`mark_processed`
//! cursor used by a live process; `entries_after` re-reads the file directly
//! and is what a fresh process uses to catch up after a restart.
//!
//! Corruption (a line that fails to parse, including invalid UTF-8) is only
//! ever handled at [`Wal::open`]: the valid prefix is kept, the original
//! file is rotated to `.bak` (keeping up to three generations), and a clean
//! file is written in its place. A corrupt line appended after `open` while
//! the log is live does not affect the in-memory backlog at all — it simply
//! sits unread in the file until the next `open`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::StorageError;

const FLUSH_THRESHOLD: u64 = 100;
const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry<T> {
    pub seq: u64,
    pub event: T,
}

pub struct Wal<T> {
    path: PathBuf,
    writer: BufWriter<File>,
    write_seq: u64,
    processed_seq: u64,
    read_cursor: u64,
    entries: Vec<WalEntry<T>>,
    unflushed: u64,
    last_flush: Instant,
}

impl<T> Wal<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Open (creating if absent) the WAL at `path`. `processed_seq` is the
    /// caller's checkpoint — typically the seq recorded in the last
    /// snapshot — and becomes the starting point for `next_unprocessed`.
    pub fn open(path: impl AsRef<Path>, processed_seq: u64) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let (entries, needs_rewrite) = if path.exists() {
            Self::read_valid_prefix(&path)?
        } else {
            (Vec::new(), false)
        };

        if needs_rewrite {
            Self::rotate_backups(&path)?;
            fs::rename(&path, path.with_extension("bak"))?;
            Self::write_clean(&path, &entries)?;
        }

        let write_seq = entries.last().map(|e| e.seq).unwrap_or(0);

        let writer = BufWriter::new(OpenOptions::new().create(true).append(true).open(&path)?);

        Ok(Self {
            path,
            writer,
            write_seq,
            processed_seq,
            read_cursor: processed_seq,
            entries,
            unflushed: 0,
            last_flush: Instant::now(),
        })
    }

    /// Read the valid prefix of `path`. Returns `(entries, needs_rewrite)`
    /// where `needs_rewrite` is true iff parsing stopped before the end of
    /// the file (corruption was found).
    fn read_valid_prefix(path: &Path) -> Result<(Vec<WalEntry<T>>, bool), StorageError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => return Ok((entries, true)),
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WalEntry<T>>(&line) {
                Ok(entry) => entries.push(entry),
                Err(_) => return Ok((entries, true)),
            }
        }

        Ok((entries, false))
    }

    fn rotate_backups(path: &Path) -> Result<(), StorageError> {
        let bak = path.with_extension("bak");
        let bak2 = path.with_extension("bak.2");
        let bak3 = path.with_extension("bak.3");

        let _ = fs::remove_file(&bak3);
        if bak2.exists() {
            fs::rename(&bak2, &bak3)?;
        }
        if bak.exists() {
            fs::rename(&bak, &bak2)?;
        }
        Ok(())
    }

    fn write_clean(path: &Path, entries: &[WalEntry<T>]) -> Result<(), StorageError> {
        let mut writer = BufWriter::new(File::create(path)?);
        for entry in entries {
            let line = serde_json::to_string(entry)?;
            writeln!(writer, "{line}")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Append `event`, assigning it the next sequence number. Buffered —
    /// call [`Wal::flush`] (or let [`Wal::needs_flush`] drive one) to make
    /// it durable.
    pub fn append(&mut self, event: &T) -> Result<u64, StorageError> {
        let seq = self.write_seq + 1;
        let entry = WalEntry { seq, event: event.clone() };
        let line = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{line}")?;
        self.entries.push(entry);
        self.write_seq = seq;
        self.unflushed += 1;
        Ok(seq)
    }

    pub fn flush(&mut self) -> Result<(), StorageError> {
        self.writer.flush()?;
        self.unflushed = 0;
        self.last_flush = Instant::now();
        Ok(())
    }

    pub fn needs_flush(&self) -> bool {
        self.unflushed >= FLUSH_THRESHOLD || self.last_flush.elapsed() >= FLUSH_INTERVAL
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    /// Hand out the next entry past `processed_seq`/`mark_processed`'s
    /// cursor from the in-memory backlog, or `None` if caught up.
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry<T>>, StorageError> {
        let next_seq = self.read_cursor + 1;
        match self.entries.iter().find(|e| e.seq == next_seq) {
            Some(entry) => {
                self.read_cursor = next_seq;
                Ok(Some(entry.clone()))
            }
            None => Ok(None),
        }
    }

    pub fn mark_processed(&mut self, seq: u64) {
        if seq > self.processed_seq {
            self.processed_seq = seq;
        }
    }

    /// Re-read the file from disk, returning entries with `seq > after_seq`
    /// in order, stopping at (not including) the first corrupt line.
    pub fn entries_after(&self, after_seq: u64) -> Result<Vec<WalEntry<T>>, StorageError> {
        let (entries, _) = Self::read_valid_prefix(&self.path)?;
        Ok(entries.into_iter().filter(|e| e.seq > after_seq).collect())
    }

    /// Drop entries with `seq < keep_from` from both the in-memory backlog
    /// and the on-disk file. Used after a snapshot checkpoint makes the
    /// earlier log entries redundant.
    pub fn truncate_before(&mut self, keep_from: u64) -> Result<(), StorageError> {
        self.entries.retain(|e| e.seq >= keep_from);
        Self::write_clean(&self.path, &self.entries)?;
        self.writer = BufWriter::new(OpenOptions::new().create(true).append(true).open(&self.path)?);
        Ok(())
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
