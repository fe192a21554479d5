//! In-memory store: the default backend for `--db`-less sessions and
//! tests. Values are held as encoded blobs so both backends exercise the
//! same codec path.

use std::collections::BTreeMap;

use universe_core::{Message, Probe, Sector, SimEvent, StarSystem, Structure, Uid};

use crate::{decode, encode, Meta, Store, StoreError};

#[derive(Debug, Default)]
pub struct MemStore {
    meta: Option<Meta>,
    sectors: BTreeMap<Sector, (u64, Vec<u8>, usize)>,
    probes: BTreeMap<String, Vec<u8>>,
    events: Vec<Vec<u8>>,
    messages: Vec<Vec<u8>>,
    structures: Vec<Vec<u8>>,
}

impl Store for MemStore {
    fn save_meta(&mut self, meta: &Meta) -> Result<(), StoreError> {
        self.meta = Some(*meta);
        Ok(())
    }

    fn load_meta(&self) -> Result<Option<Meta>, StoreError> {
        Ok(self.meta)
    }

    fn save_sector(
        &mut self,
        sector: Sector,
        generated_tick: u64,
        systems: &[StarSystem],
    ) -> Result<(), StoreError> {
        let blob = encode(&systems.to_vec())?;
        self.sectors
            .insert(sector, (generated_tick, blob, systems.len()));
        Ok(())
    }

    fn sector_exists(&self, sector: Sector) -> Result<Option<usize>, StoreError> {
        Ok(self.sectors.get(&sector).map(|(_, _, count)| *count))
    }

    fn load_sector(&self, sector: Sector) -> Result<Option<Vec<StarSystem>>, StoreError> {
        match self.sectors.get(&sector) {
            Some((_, blob, _)) => Ok(Some(decode(blob)?)),
            None => Ok(None),
        }
    }

    fn list_sectors(&self) -> Result<Vec<(Sector, u64)>, StoreError> {
        Ok(self
            .sectors
            .iter()
            .map(|(sector, (tick, _, _))| (*sector, *tick))
            .collect())
    }

    fn save_probe(&mut self, probe: &Probe) -> Result<(), StoreError> {
        self.probes.insert(probe.id.to_hex(), encode(probe)?);
        Ok(())
    }

    fn load_probe(&self, id: Uid) -> Result<Option<Probe>, StoreError> {
        match self.probes.get(&id.to_hex()) {
            Some(blob) => Ok(Some(decode(blob)?)),
            None => Ok(None),
        }
    }

    fn list_probes(&self) -> Result<Vec<Probe>, StoreError> {
        self.probes.values().map(|blob| decode(blob)).collect()
    }

    fn append_event(&mut self, event: &SimEvent) -> Result<(), StoreError> {
        self.events.push(encode(event)?);
        Ok(())
    }

    fn append_message(&mut self, message: &Message) -> Result<(), StoreError> {
        self.messages.push(encode(message)?);
        Ok(())
    }

    fn append_structure(&mut self, structure: &Structure) -> Result<(), StoreError> {
        self.structures.push(encode(structure)?);
        Ok(())
    }
}
