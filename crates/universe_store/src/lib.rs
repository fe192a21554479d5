//! Persistence for the UNIVERSE engine: a write-through `Store` contract
//! with in-memory and SQLite backends.
//!
//! Blobs are bincode with an explicit `generation_version` tag, so struct
//! reordering is a version bump rather than silent corruption. Every
//! backend must round-trip byte-identical state.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use universe_core::{Message, Probe, Sector, SimEvent, StarSystem, Structure, Uid};

mod mem;
mod sqlite;

pub use mem::MemStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("codec: {0}")]
    Codec(String),
    #[error("generation version mismatch: stored {found}, engine {expected}")]
    VersionMismatch { found: u32, expected: u32 },
}

/// Universe metadata, the `meta` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub seed: u64,
    pub tick: u64,
    pub generation_version: u32,
}

/// The persistence contract the engine host programs against.
pub trait Store {
    fn save_meta(&mut self, meta: &Meta) -> Result<(), StoreError>;
    fn load_meta(&self) -> Result<Option<Meta>, StoreError>;

    /// Save a sector atomically: the sector row and every system row land
    /// together or not at all.
    fn save_sector(
        &mut self,
        sector: Sector,
        generated_tick: u64,
        systems: &[StarSystem],
    ) -> Result<(), StoreError>;
    /// Stored system count, or `None` for a missing sector.
    fn sector_exists(&self, sector: Sector) -> Result<Option<usize>, StoreError>;
    fn load_sector(&self, sector: Sector) -> Result<Option<Vec<StarSystem>>, StoreError>;
    fn list_sectors(&self) -> Result<Vec<(Sector, u64)>, StoreError>;

    fn save_probe(&mut self, probe: &Probe) -> Result<(), StoreError>;
    fn load_probe(&self, id: Uid) -> Result<Option<Probe>, StoreError>;
    fn list_probes(&self) -> Result<Vec<Probe>, StoreError>;

    // History tables, append-only.
    fn append_event(&mut self, event: &SimEvent) -> Result<(), StoreError>;
    fn append_message(&mut self, message: &Message) -> Result<(), StoreError>;
    fn append_structure(&mut self, structure: &Structure) -> Result<(), StoreError>;
}

/// Opaque blob framing shared by every backend.
#[derive(Serialize, Deserialize)]
struct VersionedBlob<T> {
    generation_version: u32,
    payload: T,
}

pub(crate) fn encode<T: Serialize>(payload: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(&VersionedBlob {
        generation_version: universe_core::GENERATION_VERSION,
        payload,
    })
    .map_err(|e| StoreError::Codec(e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    let blob: VersionedBlob<T> =
        bincode::deserialize(bytes).map_err(|e| StoreError::Codec(e.to_string()))?;
    if blob.generation_version != universe_core::GENERATION_VERSION {
        return Err(StoreError::VersionMismatch {
            found: blob.generation_version,
            expected: universe_core::GENERATION_VERSION,
        });
    }
    Ok(blob.payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use universe_core::{generate_sector, Engine};

    fn backends() -> Vec<Box<dyn Store>> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("universe.db");
        let sqlite = SqliteStore::open(&path).unwrap();
        // Leak the tempdir so the sqlite file outlives this helper.
        std::mem::forget(dir);
        vec![Box::new(MemStore::default()), Box::new(sqlite)]
    }

    #[test]
    fn meta_round_trips() {
        for mut store in backends() {
            assert!(store.load_meta().unwrap().is_none());
            let meta = Meta {
                seed: 42,
                tick: 1_234,
                generation_version: universe_core::GENERATION_VERSION,
            };
            store.save_meta(&meta).unwrap();
            assert_eq!(store.load_meta().unwrap(), Some(meta));

            // Overwrite wins.
            let newer = Meta { tick: 2_000, ..meta };
            store.save_meta(&newer).unwrap();
            assert_eq!(store.load_meta().unwrap(), Some(newer));
        }
    }

    #[test]
    fn sector_round_trips_byte_identical() {
        for mut store in backends() {
            let sector = Sector(3, -1, 7);
            let systems = generate_sector(42, sector);
            assert_eq!(store.sector_exists(sector).unwrap(), None);

            store.save_sector(sector, 17, &systems).unwrap();
            assert_eq!(store.sector_exists(sector).unwrap(), Some(systems.len()));

            let loaded = store.load_sector(sector).unwrap().unwrap();
            assert_eq!(
                bincode::serialize(&loaded).unwrap(),
                bincode::serialize(&systems).unwrap()
            );
            assert_eq!(store.list_sectors().unwrap(), vec![(sector, 17)]);
        }
    }

    #[test]
    fn probe_round_trips() {
        for mut store in backends() {
            let engine = Engine::new(42);
            let probe = engine.universe.probes[0].clone();
            assert!(store.load_probe(probe.id).unwrap().is_none());

            store.save_probe(&probe).unwrap();
            let loaded = store.load_probe(probe.id).unwrap().unwrap();
            assert_eq!(loaded, probe);
            assert_eq!(store.list_probes().unwrap(), vec![probe]);
        }
    }

    #[test]
    fn history_appends() {
        for mut store in backends() {
            let engine = Engine::new(42);
            let probe = &engine.universe.probes[0];
            store
                .append_event(&SimEvent {
                    kind: universe_core::SimEventKind::Discovery,
                    subtype: 0,
                    probe_id: probe.id,
                    system_id: probe.system_id,
                    tick: 9,
                    description: "test".to_string(),
                    severity: 0.0,
                })
                .unwrap();
            store
                .append_message(&Message {
                    id: 0,
                    from: probe.id,
                    to: probe.id,
                    body: "note to self".to_string(),
                    sent_tick: 1,
                    arrival_tick: 2,
                    status: universe_core::MessageStatus::Delivered,
                })
                .unwrap();
        }
    }

    #[test]
    fn version_mismatch_is_detected() {
        let blob = bincode::serialize(&VersionedBlob {
            generation_version: universe_core::GENERATION_VERSION + 1,
            payload: 7u32,
        })
        .unwrap();
        let result: Result<u32, _> = decode(&blob);
        assert!(matches!(result, Err(StoreError::VersionMismatch { .. })));
    }

    #[test]
    fn uid_keys_render_as_32_hex_chars() {
        let uid = Uid { hi: 0xdead, lo: 0xbeef };
        assert_eq!(uid.to_hex().len(), 32);
        assert_eq!(uid.to_hex(), "000000000000dead000000000000beef");
    }
}
