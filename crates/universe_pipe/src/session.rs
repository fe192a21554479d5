//! The command session: one engine, one store, one JSON line in, one JSON
//! line out.

use serde_json::{json, Value};
use universe_core::{travel_scan, Engine, Uid};
use universe_store::{Meta, Store};

use crate::observe;
use crate::protocol::{
    parse_actions, parse_request, ProtocolError, Request, MAX_RESPONSE_BYTES,
};

pub struct Session {
    pub engine: Engine,
    store: Box<dyn Store>,
}

impl Session {
    pub fn new(engine: Engine, store: Box<dyn Store>) -> Self {
        Session { engine, store }
    }

    /// Emitted once on start-up, before any command is read.
    pub fn ready_banner(&self) -> String {
        json!({
            "ok": true,
            "ready": true,
            "seed": self.engine.universe.seed,
            "tick": self.engine.universe.tick,
        })
        .to_string()
    }

    pub fn running(&self) -> bool {
        self.engine.universe.running
    }

    /// Handle one request line and produce exactly one response line.
    /// Never panics, never terminates the engine; failures become
    /// `{"ok":false,"error":...}`.
    pub fn handle_line(&mut self, line: &str) -> String {
        let response = match parse_request(line) {
            Ok(request) => self.dispatch(request).unwrap_or_else(error_response),
            Err(error) => error_response(error),
        };
        let rendered = response.to_string();
        if rendered.len() > MAX_RESPONSE_BYTES {
            tracing::warn!(bytes = rendered.len(), "response exceeded cap");
            return error_response(ProtocolError::Capacity(format!(
                "response exceeds {MAX_RESPONSE_BYTES} bytes"
            )))
            .to_string();
        }
        rendered
    }

    #[allow(clippy::too_many_lines)]
    fn dispatch(&mut self, request: Request) -> Result<Value, ProtocolError> {
        match request {
            Request::Tick { actions } => {
                let actions = parse_actions(actions)?;
                let report = self.engine.step(&actions);
                Ok(json!({
                    "ok": true,
                    "tick": report.tick,
                    "observations": observe::observations(&self.engine, &report.results),
                }))
            }
            Request::Status => Ok(json!({
                "ok": true,
                "tick": self.engine.universe.tick,
                "seed": self.engine.universe.seed,
                "generation_version": self.engine.universe.generation_version,
                "probes": self.engine.universe.probes.len(),
                "running": self.engine.universe.running,
                "sectors_materialised": self.engine.sectors.len(),
                "systems_explored": self.engine.visited_systems.len(),
            })),
            Request::Metrics => {
                let metrics = serde_json::to_value(&self.engine.metrics)
                    .map_err(|e| ProtocolError::Parse(e.to_string()))?;
                Ok(json!({ "ok": true, "metrics": metrics }))
            }
            Request::Inject { event } => {
                let injection = event.into_injection()?;
                let queued = self
                    .engine
                    .inject(injection)
                    .map_err(ProtocolError::Capacity)?;
                Ok(json!({ "ok": true, "queued": queued }))
            }
            Request::Snapshot { tag } => {
                let snapshot = self
                    .engine
                    .take_snapshot(&tag)
                    .map_err(ProtocolError::Capacity)?;
                Ok(json!({ "ok": true, "snapshot": tag, "tick": snapshot.tick }))
            }
            Request::Restore { tag } => {
                let tick = self
                    .engine
                    .restore_snapshot(&tag)
                    .map_err(ProtocolError::NotFound)?;
                Ok(json!({ "ok": true, "restored": tag, "tick": tick }))
            }
            Request::Config { key, value } => {
                let numeric = value.as_f64().or_else(|| {
                    value.as_str().and_then(|raw| raw.parse::<f64>().ok())
                });
                let Some(numeric) = numeric else {
                    return Err(ProtocolError::InvalidArgument(format!(
                        "config value for '{key}' is not numeric"
                    )));
                };
                let raw = value.to_string();
                self.engine
                    .set_config(&key, &raw, numeric)
                    .map_err(ProtocolError::InvalidArgument)?;
                Ok(json!({ "ok": true, "key": key, "value": numeric }))
            }
            Request::Save => self.save(),
            Request::Load => self.load(),
            Request::Scan { probe, max } => {
                let uid: Uid = probe
                    .parse()
                    .map_err(|e: String| ProtocolError::InvalidArgument(e))?;
                let Some(subject) = self.engine.universe.probe(uid).cloned() else {
                    return Err(ProtocolError::NotFound(format!("probe {probe}")));
                };
                self.engine.ensure_neighbourhood(subject.sector);
                let contacts = travel_scan(&subject, self.engine.sectors.values().flatten(), max);
                let contacts: Vec<Value> = contacts
                    .iter()
                    .map(|entry| {
                        json!({
                            "system_id": entry.system_id.to_string(),
                            "star_class": serde_json::to_value(entry.star_class)
                                .unwrap_or(Value::Null),
                            "distance_ly": entry.distance_ly,
                        })
                    })
                    .collect();
                Ok(json!({ "ok": true, "contacts": contacts }))
            }
            Request::Scenario { events } => {
                let mut scheduled = Vec::with_capacity(events.len());
                for spec in events {
                    scheduled.push(spec.into_scheduled()?);
                }
                let total = self
                    .engine
                    .schedule(scheduled)
                    .map_err(ProtocolError::Capacity)?;
                Ok(json!({ "ok": true, "scheduled": total }))
            }
            Request::Lineage => {
                let lineage: Vec<Value> = self
                    .engine
                    .lineage
                    .iter()
                    .map(|entry| {
                        json!({
                            "parent_id": entry.parent_id.to_string(),
                            "child_id": entry.child_id.to_string(),
                            "birth_tick": entry.birth_tick,
                            "generation": entry.generation,
                        })
                    })
                    .collect();
                Ok(json!({ "ok": true, "lineage": lineage }))
            }
            Request::History { from, to } => {
                let to = to.unwrap_or(u64::MAX);
                let events: Vec<Value> = self
                    .engine
                    .replay(from, to)
                    .iter()
                    .map(|event| {
                        json!({
                            "kind": serde_json::to_value(event.kind).unwrap_or(Value::Null),
                            "subtype": event.subtype,
                            "probe_id": event.probe_id.to_string(),
                            "system_id": event.system_id.to_string(),
                            "tick": event.tick,
                            "description": event.description,
                            "severity": event.severity,
                        })
                    })
                    .collect();
                Ok(json!({ "ok": true, "events": events }))
            }
            Request::Quit => {
                self.engine.universe.running = false;
                Ok(json!({ "ok": true, "stopped": true }))
            }
        }
    }

    fn save(&mut self) -> Result<Value, ProtocolError> {
        let tick = self.engine.universe.tick;
        self.store.save_meta(&Meta {
            seed: self.engine.universe.seed,
            tick,
            generation_version: self.engine.universe.generation_version,
        })?;
        let sectors: Vec<_> = self
            .engine
            .sectors
            .iter()
            .map(|(sector, systems)| (*sector, systems.clone()))
            .collect();
        for (sector, systems) in &sectors {
            self.store.save_sector(*sector, tick, systems)?;
        }
        for probe in &self.engine.universe.probes {
            self.store.save_probe(probe)?;
        }
        Ok(json!({
            "ok": true,
            "saved": true,
            "tick": tick,
            "sectors": sectors.len(),
            "probes": self.engine.universe.probes.len(),
        }))
    }

    fn load(&mut self) -> Result<Value, ProtocolError> {
        let Some(meta) = self.store.load_meta()? else {
            return Err(ProtocolError::NotFound("no saved universe".to_string()));
        };
        let probes = self.store.list_probes()?;
        let mut sectors = Vec::new();
        for (sector, _) in self.store.list_sectors()? {
            if let Some(systems) = self.store.load_sector(sector)? {
                sectors.push((sector, systems));
            }
        }
        self.engine = Engine::from_saved(meta.seed, meta.tick, probes, sectors);
        Ok(json!({
            "ok": true,
            "loaded": true,
            "tick": meta.tick,
            "probes": self.engine.universe.probes.len(),
        }))
    }
}

fn error_response(error: ProtocolError) -> Value {
    json!({ "ok": false, "error": error.to_string() })
}
