// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic zstd-compressed checkpoints of the materialized event table.
//!
//! A snapshot lets `EventStore::open` skip replaying the full WAL history:
//! it loads the most recent snapshot, then replays only the WAL entries
//! written after the snapshot's `seq`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use devteam_core::EventId;

use crate::error::StorageError;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct SnapshotFile<V> {
    seq: u64,
    table: BTreeMap<EventId, V>,
}

/// Write `table` (as it stood after WAL seq `seq`) to `path`, zstd-compressed.
pub fn write<V: Serialize>(path: impl AsRef<Path>, seq: u64, table: &BTreeMap<EventId, V>) -> Result<(), StorageError> {
    let path = path.as_ref();
    let tmp = tmp_path(path);

    let file = File::create(&tmp)?;
    let writer = BufWriter::new(file);
    let encoder = zstd::Encoder::new(writer, ZSTD_LEVEL).map_err(|e| StorageError::Snapshot(e.to_string()))?;
    let mut encoder = encoder.auto_finish();
    serde_json::to_writer(&mut encoder, &SnapshotFileRef { seq, table })?;
    drop(encoder);

    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a previously-written snapshot, returning `(seq, table)`. Returns
/// `(0, empty table)` if no snapshot exists yet.
pub fn read<V: DeserializeOwned>(path: impl AsRef<Path>) -> Result<(u64, BTreeMap<EventId, V>), StorageError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok((0, BTreeMap::new()));
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let decoder = zstd::Decoder::new(reader).map_err(|e| StorageError::Snapshot(e.to_string()))?;
    let snapshot: SnapshotFile<V> = serde_json::from_reader(decoder)?;
    Ok((snapshot.seq, snapshot.table))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[derive(serde::Serialize)]
struct SnapshotFileRef<'a, V> {
    seq: u64,
    table: &'a BTreeMap<EventId, V>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_zstd() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.zst");

        let mut table = BTreeMap::new();
        table.insert(EventId::new(), "value-one".to_string());
        table.insert(EventId::new(), "value-two".to_string());

        write(&path, 42, &table).unwrap();
        let (seq, loaded): (u64, BTreeMap<EventId, String>) = read(&path).unwrap();

        assert_eq!(seq, 42);
        assert_eq!(loaded, table);
    }

    #[test]
    fn missing_snapshot_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.zst");

        let (seq, table): (u64, BTreeMap<EventId, String>) = read(&path).unwrap();
        assert_eq!(seq, 0);
        assert!(table.is_empty());
    }

    #[test]
    fn write_is_atomic_via_rename() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.zst");
        let table: BTreeMap<EventId, String> = BTreeMap::new();

        write(&path, 1, &table).unwrap();
        assert!(path.exists());
        assert!(!tmp_path(&path).exists());
    }
}
