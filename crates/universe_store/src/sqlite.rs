//! SQLite backend over the five-table layout:
//! `meta`, `sectors`, `systems`, `probes`, plus append-only history.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use universe_core::{Message, Probe, Sector, SimEvent, StarSystem, Structure, Uid};

use crate::{decode, encode, Meta, Store, StoreError};

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (
                 key TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS sectors (
                 x INTEGER NOT NULL,
                 y INTEGER NOT NULL,
                 z INTEGER NOT NULL,
                 generated_tick INTEGER NOT NULL,
                 data BLOB NOT NULL,
                 system_count INTEGER NOT NULL,
                 PRIMARY KEY (x, y, z)
             );
             CREATE TABLE IF NOT EXISTS systems (
                 id TEXT PRIMARY KEY,
                 sector_x INTEGER NOT NULL,
                 sector_y INTEGER NOT NULL,
                 sector_z INTEGER NOT NULL,
                 data BLOB NOT NULL
             );
             CREATE TABLE IF NOT EXISTS probes (
                 id TEXT PRIMARY KEY,
                 parent_id TEXT NOT NULL,
                 generation INTEGER NOT NULL,
                 data BLOB NOT NULL
             );
             CREATE TABLE IF NOT EXISTS events (
                 seq INTEGER PRIMARY KEY AUTOINCREMENT,
                 tick INTEGER NOT NULL,
                 data BLOB NOT NULL
             );
             CREATE TABLE IF NOT EXISTS messages (
                 seq INTEGER PRIMARY KEY AUTOINCREMENT,
                 tick INTEGER NOT NULL,
                 data BLOB NOT NULL
             );
             CREATE TABLE IF NOT EXISTS structures (
                 seq INTEGER PRIMARY KEY AUTOINCREMENT,
                 tick INTEGER NOT NULL,
                 data BLOB NOT NULL
             );",
        )?;
        Ok(SqliteStore { conn })
    }

    fn meta_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn set_meta_value(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

fn parse_u64(value: &str, key: &str) -> Result<u64, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::Codec(format!("meta.{key} is not a u64: {value}")))
}

impl Store for SqliteStore {
    fn save_meta(&mut self, meta: &Meta) -> Result<(), StoreError> {
        self.set_meta_value("seed", &meta.seed.to_string())?;
        self.set_meta_value("tick", &meta.tick.to_string())?;
        self.set_meta_value("generation_version", &meta.generation_version.to_string())?;
        Ok(())
    }

    fn load_meta(&self) -> Result<Option<Meta>, StoreError> {
        let (Some(seed), Some(tick), Some(version)) = (
            self.meta_value("seed")?,
            self.meta_value("tick")?,
            self.meta_value("generation_version")?,
        ) else {
            return Ok(None);
        };
        #[allow(clippy::cast_possible_truncation)]
        let generation_version = parse_u64(&version, "generation_version")? as u32;
        Ok(Some(Meta {
            seed: parse_u64(&seed, "seed")?,
            tick: parse_u64(&tick, "tick")?,
            generation_version,
        }))
    }

    fn save_sector(
        &mut self,
        sector: Sector,
        generated_tick: u64,
        systems: &[StarSystem],
    ) -> Result<(), StoreError> {
        let blob = encode(&systems.to_vec())?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO sectors (x, y, z, generated_tick, data, system_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(x, y, z) DO UPDATE SET
                 generated_tick = excluded.generated_tick,
                 data = excluded.data,
                 system_count = excluded.system_count",
            params![
                sector.0,
                sector.1,
                sector.2,
                generated_tick as i64,
                blob,
                systems.len() as i64
            ],
        )?;
        for system in systems {
            let system_blob = encode(system)?;
            tx.execute(
                "INSERT INTO systems (id, sector_x, sector_y, sector_z, data)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET data = excluded.data",
                params![system.id.to_hex(), sector.0, sector.1, sector.2, system_blob],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn sector_exists(&self, sector: Sector) -> Result<Option<usize>, StoreError> {
        let count: Option<i64> = self
            .conn
            .query_row(
                "SELECT system_count FROM sectors WHERE x = ?1 AND y = ?2 AND z = ?3",
                params![sector.0, sector.1, sector.2],
                |row| row.get(0),
            )
            .optional()?;
        #[allow(clippy::cast_sign_loss)]
        Ok(count.map(|c| c as usize))
    }

    fn load_sector(&self, sector: Sector) -> Result<Option<Vec<StarSystem>>, StoreError> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT data FROM sectors WHERE x = ?1 AND y = ?2 AND z = ?3",
                params![sector.0, sector.1, sector.2],
                |row| row.get(0),
            )
            .optional()?;
        match blob {
            Some(blob) => Ok(Some(decode(&blob)?)),
            None => Ok(None),
        }
    }

    fn list_sectors(&self) -> Result<Vec<(Sector, u64)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT x, y, z, generated_tick FROM sectors ORDER BY x, y, z")?;
        let rows = stmt.query_map([], |row| {
            let tick: i64 = row.get(3)?;
            #[allow(clippy::cast_sign_loss)]
            Ok((Sector(row.get(0)?, row.get(1)?, row.get(2)?), tick as u64))
        })?;
        let mut sectors = Vec::new();
        for row in rows {
            sectors.push(row?);
        }
        Ok(sectors)
    }

    fn save_probe(&mut self, probe: &Probe) -> Result<(), StoreError> {
        let blob = encode(probe)?;
        self.conn.execute(
            "INSERT INTO probes (id, parent_id, generation, data)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 parent_id = excluded.parent_id,
                 generation = excluded.generation,
                 data = excluded.data",
            params![
                probe.id.to_hex(),
                probe.parent_id.to_hex(),
                i64::from(probe.generation),
                blob
            ],
        )?;
        Ok(())
    }

    fn load_probe(&self, id: Uid) -> Result<Option<Probe>, StoreError> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT data FROM probes WHERE id = ?1",
                [id.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        match blob {
            Some(blob) => Ok(Some(decode(&blob)?)),
            None => Ok(None),
        }
    }

    fn list_probes(&self) -> Result<Vec<Probe>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT data FROM probes ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;
        let mut probes = Vec::new();
        for row in rows {
            probes.push(decode(&row?)?);
        }
        Ok(probes)
    }

    fn append_event(&mut self, event: &SimEvent) -> Result<(), StoreError> {
        let blob = encode(event)?;
        self.conn.execute(
            "INSERT INTO events (tick, data) VALUES (?1, ?2)",
            params![event.tick as i64, blob],
        )?;
        Ok(())
    }

    fn append_message(&mut self, message: &Message) -> Result<(), StoreError> {
        let blob = encode(message)?;
        self.conn.execute(
            "INSERT INTO messages (tick, data) VALUES (?1, ?2)",
            params![message.sent_tick as i64, blob],
        )?;
        Ok(())
    }

    fn append_structure(&mut self, structure: &Structure) -> Result<(), StoreError> {
        let blob = encode(structure)?;
        let tick = structure.completed_tick.unwrap_or(0);
        self.conn.execute(
            "INSERT INTO structures (tick, data) VALUES (?1, ?2)",
            params![tick as i64, blob],
        )?;
        Ok(())
    }
}
