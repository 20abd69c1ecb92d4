//! Memory persistence: the snapshot hook and an SQLite snapshot store.
//!
//! A brain externalizes only the slots registered as persistent through
//! [`crate::BrainProfile::persistent_memory`]. Each becomes one entry of a
//! [`MemorySnapshot`], keyed by the slot's stable name, holding the JSON value
//! and the remaining TTL.
//!
//! [`SnapshotStore`] keeps one snapshot per entity in SQLite:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS brain_snapshots (
//!     entity_id  TEXT PRIMARY KEY,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```
//!
//! JSON inside a BLOB keeps the schema stable when slots are added or
//! removed; an optional CRC-32 detects save corruption.

use std::any::Any;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{BrainError, Result};
use crate::memory::{ErasedValue, MemoryValue};
use crate::metrics;
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Snapshot hook
// ---------------------------------------------------------------------------

/// One externalized memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedMemory {
    /// Encoded value.
    pub value: serde_json::Value,
    /// Remaining ticks, `None` for memories that never expire.
    pub ttl: Option<u64>,
}

/// Persistent slot contents of one brain, keyed by slot name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Slot name → saved memory.
    pub entries: BTreeMap<String, SavedMemory>,
}

impl MemorySnapshot {
    /// Number of saved memories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Encoder/decoder pair for one persistent slot, monomorphized over the
/// slot's value type.
#[derive(Clone, Copy)]
pub(crate) struct SlotCodec {
    encode: fn(&dyn Any) -> Option<serde_json::Result<serde_json::Value>>,
    decode: fn(serde_json::Value) -> serde_json::Result<Box<dyn ErasedValue>>,
}

impl SlotCodec {
    pub(crate) fn of<T: MemoryValue + Serialize + DeserializeOwned>() -> Self {
        Self {
            encode: encode_as::<T>,
            decode: decode_as::<T>,
        }
    }

    /// `None` when the stored value is not a `T`.
    pub(crate) fn encode(&self, value: &dyn Any) -> Option<serde_json::Result<serde_json::Value>> {
        (self.encode)(value)
    }

    pub(crate) fn decode(&self, json: serde_json::Value) -> serde_json::Result<Box<dyn ErasedValue>> {
        (self.decode)(json)
    }
}

fn encode_as<T: Serialize + 'static>(value: &dyn Any) -> Option<serde_json::Result<serde_json::Value>> {
    value.downcast_ref::<T>().map(serde_json::to_value)
}

fn decode_as<T: MemoryValue + DeserializeOwned>(json: serde_json::Value) -> serde_json::Result<Box<dyn ErasedValue>> {
    let value: T = serde_json::from_value(json)?;
    Ok(Box::new(value))
}

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// Basic CRC-32 (ISO 3309 / ITU-T V.42) computation.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS brain_snapshots (
    entity_id  TEXT PRIMARY KEY,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

/// Handle to an open SQLite database of [`MemorySnapshot`]s.
///
/// ```no_run
/// # use synapse_core::persistence::{MemorySnapshot, SnapshotStore};
/// # use synapse_core::config::PersistenceConfig;
/// # use synapse_core::types::EntityId;
/// let store = SnapshotStore::open("world_save.db", &PersistenceConfig::default())?;
/// let entity = EntityId::new();
/// store.save(&entity, &MemorySnapshot::default())?;
/// let loaded = store.load(&entity)?;
/// # Ok::<(), synapse_core::error::BrainError>(())
/// ```
pub struct SnapshotStore {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SnapshotStore {
    /// Open (or create) an SQLite database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;
        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "Snapshot store opened"
        );

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Save (upsert) an entity's snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Serialization`] if JSON encoding fails, or
    /// [`BrainError::Database`] on SQLite failures.
    pub fn save(&self, entity_id: &EntityId, snapshot: &MemorySnapshot) -> Result<()> {
        let start = Instant::now();
        let json = serde_json::to_vec(snapshot).map_err(|e| BrainError::Serialization(e.to_string()))?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));

        self.conn.execute(
            "INSERT INTO brain_snapshots (entity_id, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(entity_id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![entity_id.0.to_string(), json, Utc::now().to_rfc3339(), checksum],
        )?;

        metrics::counters().snapshots_saved.fetch_add(1, Ordering::Relaxed);
        debug!(
            entity = %entity_id,
            memories = snapshot.len(),
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved brain snapshot"
        );
        Ok(())
    }

    /// Load an entity's snapshot; `None` if nothing was saved for it.
    ///
    /// A checksum mismatch is logged but the data is still returned.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Serialization`] if JSON decoding fails, or
    /// [`BrainError::Database`] on SQLite failures.
    pub fn load(&self, entity_id: &EntityId) -> Result<Option<MemorySnapshot>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT data, checksum FROM brain_snapshots WHERE entity_id = ?1")?;
        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![entity_id.0.to_string()], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((data, stored_checksum)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(
                        entity = %entity_id,
                        expected = %expected,
                        actual = %actual,
                        "Checksum mismatch, possible save corruption"
                    );
                }
            }
        }

        let snapshot = serde_json::from_slice(&data).map_err(|e| BrainError::Serialization(e.to_string()))?;
        Ok(Some(snapshot))
    }

    /// Delete an entity's snapshot. Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Database`] on SQLite failures.
    pub fn delete(&self, entity_id: &EntityId) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM brain_snapshots WHERE entity_id = ?1",
            params![entity_id.0.to_string()],
        )?;
        Ok(deleted > 0)
    }

    /// All entities with a saved snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Database`] on SQLite failures.
    pub fn list_entities(&self) -> Result<Vec<EntityId>> {
        let mut stmt = self.conn.prepare_cached("SELECT entity_id FROM brain_snapshots")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut entities = Vec::new();
        for row in rows {
            let id_str = row?;
            match uuid::Uuid::parse_str(&id_str) {
                Ok(uuid) => entities.push(EntityId(uuid)),
                Err(_) => warn!(id = %id_str, "Skipping row with invalid UUID"),
            }
        }
        Ok(entities)
    }

    /// Number of stored snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Database`] on SQLite failures.
    pub fn entity_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM brain_snapshots", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Database`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;

        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Snapshot backup completed"
        );
        Ok(())
    }

    /// Back up to `<db>.bak.1`, shifting older backups up and dropping any
    /// beyond `backup_count`. Returns the number of backups on disk.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Database`] on SQLite failures and
    /// [`BrainError::Io`] if an old backup cannot be moved.
    pub fn rotate_backups(&self) -> Result<u32> {
        let keep = self.config.backup_count;
        if keep == 0 {
            return Ok(0);
        }
        let numbered = |n: u32| {
            let mut name = self.db_path.clone().into_os_string();
            name.push(format!(".bak.{n}"));
            PathBuf::from(name)
        };

        let oldest = numbered(keep);
        if oldest.exists() {
            std::fs::remove_file(&oldest)?;
        }
        for n in (1..keep).rev() {
            let from = numbered(n);
            if from.exists() {
                std::fs::rename(&from, numbered(n + 1))?;
            }
        }
        self.backup(numbered(1))?;
        Ok((1..=keep).filter(|&n| numbered(n).exists()).count().try_into().unwrap_or(keep))
    }

    /// Path to the database file (`:memory:` for in-memory stores).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> MemorySnapshot {
        let mut snapshot = MemorySnapshot::default();
        snapshot.entries.insert(
            "home".to_string(),
            SavedMemory {
                value: serde_json::json!({"x": 1.0, "y": 2.0, "z": 0.0}),
                ttl: None,
            },
        );
        snapshot.entries.insert(
            "angry_at".to_string(),
            SavedMemory {
                value: serde_json::json!("someone"),
                ttl: Some(40),
            },
        );
        snapshot
    }

    #[test]
    fn crc32_known_value() {
        // Reference value for "123456789".
        assert_eq!(crc32_compute(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn save_load_delete_in_memory() {
        let store = SnapshotStore::open_in_memory(&PersistenceConfig::default()).expect("open");
        let entity = EntityId::new();
        assert!(store.load(&entity).expect("load").is_none());

        let snapshot = sample_snapshot();
        store.save(&entity, &snapshot).expect("save");
        assert_eq!(store.load(&entity).expect("load"), Some(snapshot));
        assert_eq!(store.entity_count().expect("count"), 1);
        assert_eq!(store.list_entities().expect("list"), vec![entity]);

        assert!(store.delete(&entity).expect("delete"));
        assert!(!store.delete(&entity).expect("delete again"));
        assert_eq!(store.entity_count().expect("count"), 0);
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let store = SnapshotStore::open_in_memory(&PersistenceConfig::default()).expect("open");
        let entity = EntityId::new();
        store.save(&entity, &sample_snapshot()).expect("save");
        store.save(&entity, &MemorySnapshot::default()).expect("save again");
        assert_eq!(store.load(&entity).expect("load"), Some(MemorySnapshot::default()));
        assert_eq!(store.entity_count().expect("count"), 1);
    }

    #[test]
    fn on_disk_store_and_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("snapshots.db");
        let store = SnapshotStore::open(&db_path, &PersistenceConfig::default()).expect("open");
        let entity = EntityId::new();
        store.save(&entity, &sample_snapshot()).expect("save");

        let backup_path = dir.path().join("snapshots.backup.db");
        store.backup(&backup_path).expect("backup");
        let restored = SnapshotStore::open(&backup_path, &PersistenceConfig::default()).expect("open backup");
        assert_eq!(restored.load(&entity).expect("load"), Some(sample_snapshot()));
    }

    #[test]
    fn rotated_backups_are_capped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("snapshots.db");
        let config = PersistenceConfig {
            backup_count: 2,
            ..PersistenceConfig::default()
        };
        let store = SnapshotStore::open(&db_path, &config).expect("open");

        assert_eq!(store.rotate_backups().expect("first"), 1);
        assert_eq!(store.rotate_backups().expect("second"), 2);
        assert_eq!(store.rotate_backups().expect("third"), 2);
        assert!(dir.path().join("snapshots.db.bak.2").exists());
        assert!(!dir.path().join("snapshots.db.bak.3").exists());
    }
}
