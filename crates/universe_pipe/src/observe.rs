//! Observation assembly: the full per-probe world view returned by `tick`.

use serde_json::{json, Value};
use universe_core::{
    beacons_in_system, inbox, ActionOutcome, Engine, LocationKind, Probe, ResourceKind,
    StarSystem, TradeStatus, Uid,
};

/// How many trailing events each observation carries.
const RECENT_EVENTS: usize = 5;

fn enum_str<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn uid_str(uid: Uid) -> Value {
    if uid.is_zero() {
        Value::Null
    } else {
        Value::String(uid.to_string())
    }
}

fn vec3(v: universe_core::Vec3) -> Value {
    json!({ "x": v.x, "y": v.y, "z": v.z })
}

fn resources_map(resources: &[f64; universe_core::RESOURCE_COUNT]) -> Value {
    let mut map = serde_json::Map::new();
    for kind in ResourceKind::ALL {
        map.insert(kind.label().to_string(), json!(resources[kind.index()]));
    }
    Value::Object(map)
}

/// One observation per probe, in universe order.
pub fn observations(engine: &Engine, results: &[(Uid, ActionOutcome)]) -> Value {
    let observations: Vec<Value> = engine
        .universe
        .probes
        .iter()
        .map(|probe| observe_probe(engine, probe, results))
        .collect();
    Value::Array(observations)
}

#[allow(clippy::too_many_lines)]
fn observe_probe(engine: &Engine, probe: &Probe, results: &[(Uid, ActionOutcome)]) -> Value {
    let action_result = results
        .iter()
        .find(|(id, _)| *id == probe.id)
        .map(|(_, outcome)| {
            json!({
                "success": outcome.success,
                "completed": outcome.completed,
                "error": outcome.error,
                "recipients": outcome.recipients,
            })
        })
        .unwrap_or(Value::Null);

    let recent_events: Vec<Value> = engine
        .events
        .log
        .iter()
        .filter(|event| event.probe_id == probe.id)
        .rev()
        .take(RECENT_EVENTS)
        .map(|event| {
            json!({
                "kind": enum_str(&event.kind),
                "subtype": event.subtype,
                "tick": event.tick,
                "description": event.description,
                "severity": event.severity,
            })
        })
        .collect();

    let in_system = probe.location != LocationKind::Interstellar;
    let system = if in_system {
        engine
            .system(probe.system_id)
            .map_or(Value::Null, observe_system)
    } else {
        Value::Null
    };

    let nearby: Vec<Value> = engine
        .universe
        .probes
        .iter()
        .filter(|other| other.id != probe.id)
        .filter_map(|other| {
            let distance_ly = probe.position.distance(other.position);
            (distance_ly <= probe.rates.sensor_range_ly).then(|| {
                json!({
                    "id": uid_str(other.id),
                    "name": other.name,
                    "status": enum_str(&other.status),
                    "distance_ly": distance_ly,
                })
            })
        })
        .collect();

    let inbox_entries: Vec<Value> = inbox(&engine.comms, probe.id)
        .into_iter()
        .map(|message| {
            json!({
                "from": uid_str(message.from),
                "body": message.body,
                "sent_tick": message.sent_tick,
                "arrival_tick": message.arrival_tick,
            })
        })
        .collect();

    let beacons: Vec<Value> = if in_system {
        beacons_in_system(&engine.comms, probe.system_id)
            .into_iter()
            .map(|beacon| {
                json!({
                    "from": uid_str(beacon.from),
                    "text": beacon.text,
                    "placed_tick": beacon.placed_tick,
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    let structures: Vec<Value> = engine
        .society
        .structures
        .iter()
        .filter(|s| in_system && s.system_id == probe.system_id)
        .map(|s| {
            json!({
                "id": s.id,
                "kind": enum_str(&s.kind),
                "builders": s.builders.iter().map(|b| uid_str(*b)).collect::<Vec<_>>(),
                "progress": s.progress_ticks / s.required_ticks,
                "completed": s.completed,
            })
        })
        .collect();

    let trades: Vec<Value> = engine
        .society
        .trades
        .iter()
        .filter(|t| {
            (t.from == probe.id || t.to == probe.id)
                && matches!(t.status, TradeStatus::Pending | TradeStatus::InTransit)
        })
        .map(|t| {
            json!({
                "id": t.id,
                "from": uid_str(t.from),
                "to": uid_str(t.to),
                "resource": enum_str(&t.resource),
                "amount_kg": t.amount_kg,
                "arrival_tick": t.arrival_tick,
                "status": enum_str(&t.status),
            })
        })
        .collect();

    let claims: Vec<Value> = engine
        .society
        .claims
        .iter()
        .filter(|c| in_system && c.system_id == probe.system_id)
        .map(|c| {
            json!({
                "system_id": uid_str(c.system_id),
                "owner": uid_str(c.owner),
                "claimed_tick": c.claimed_tick,
            })
        })
        .collect();

    let proposals: Vec<Value> = engine
        .society
        .proposals
        .iter()
        .filter(|p| p.resolved.is_none())
        .map(|p| {
            json!({
                "id": p.id,
                "proposer": uid_str(p.proposer),
                "text": p.text,
                "deadline_tick": p.deadline_tick,
                "votes_for": p.votes_for,
                "votes_against": p.votes_against,
            })
        })
        .collect();

    let trust: Vec<Value> = probe
        .relationships
        .iter()
        .map(|r| {
            json!({
                "other": uid_str(r.other),
                "trust": r.trust,
                "disposition": enum_str(&r.disposition),
            })
        })
        .collect();

    let threats: Vec<Value> = engine
        .events
        .pending_hazards
        .iter()
        .filter(|h| h.probe_id == probe.id)
        .map(|h| {
            json!({
                "kind": enum_str(&h.kind),
                "severity": h.severity,
                "ticks_until_strike": h.strike_tick.saturating_sub(engine.universe.tick),
            })
        })
        .collect();

    let relays: Vec<Value> = engine
        .comms
        .relays
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "system_id": uid_str(r.system_id),
                "position": vec3(r.position),
                "range_ly": r.range_ly,
            })
        })
        .collect();

    json!({
        "id": probe.id.to_string(),
        "name": probe.name,
        "status": enum_str(&probe.status),
        "generation": probe.generation,
        "parent_id": uid_str(probe.parent_id),
        "hull": probe.hull,
        "energy_j": probe.energy_j,
        "fuel_kg": probe.fuel_kg,
        "mass_kg": probe.mass_kg,
        "location": enum_str(&probe.location),
        "sector": [probe.sector.0, probe.sector.1, probe.sector.2],
        "system_id": uid_str(probe.system_id),
        "body_id": uid_str(probe.body_id),
        "position": vec3(probe.position),
        "heading": vec3(probe.heading),
        "speed_c": probe.speed_c,
        "travel_remaining_ly": probe.travel_remaining_ly,
        "estimated_arrival_ticks": if probe.status == universe_core::ProbeStatus::Traveling {
            json!(engine.estimated_travel_ticks(probe, probe.travel_remaining_ly))
        } else {
            Value::Null
        },
        "tech": probe.tech,
        "resources": resources_map(&probe.resources),
        "capabilities": {
            "max_speed_c": probe.rates.max_speed_c,
            "mining_rate": probe.rates.mining_rate,
            "sensor_range_ly": probe.rates.sensor_range_ly,
            "comm_range_ly": probe.rates.comm_range_ly,
            "compute_capacity": probe.rates.compute_capacity,
            "energy_generation_j": probe.rates.energy_generation_j,
            "build_rate": probe.rates.build_rate,
            "research_rate": probe.rates.research_rate,
        },
        "action_result": action_result,
        "recent_events": recent_events,
        "replication": engine.replication.get(&probe.id).map_or(Value::Null, |r| {
            json!({
                "progress": r.progress,
                "elapsed": r.elapsed,
                "total": r.total,
                "consciousness_forked": r.consciousness_forked,
            })
        }),
        "research": engine.research.get(&probe.id).map_or(Value::Null, |r| {
            json!({
                "domain": enum_str(&r.domain),
                "ticks_done": r.ticks_done,
                "ticks_required": r.ticks_required,
            })
        }),
        "system": system,
        "nearby_probes": nearby,
        "inbox": inbox_entries,
        "beacons": beacons,
        "structures": structures,
        "trades": trades,
        "claims": claims,
        "proposals": proposals,
        "trust": trust,
        "threats": threats,
        "relays": relays,
    })
}

fn observe_system(system: &StarSystem) -> Value {
    let stars: Vec<Value> = system
        .stars
        .iter()
        .map(|star| {
            json!({
                "id": star.id.to_string(),
                "name": star.name,
                "class": enum_str(&star.class),
                "mass_solar": star.mass_solar,
                "luminosity_solar": star.luminosity_solar,
                "temperature_k": star.temperature_k,
            })
        })
        .collect();
    let planets: Vec<Value> = system
        .planets
        .iter()
        .map(|planet| {
            json!({
                "id": planet.id.to_string(),
                "name": planet.name,
                "type": enum_str(&planet.kind),
                "mass_earth": planet.mass_earth,
                "orbital_radius_au": planet.orbital_radius_au,
                "surface_temp_k": planet.surface_temp_k,
                "water_coverage": planet.water_coverage,
                "habitability": planet.habitability,
                "resources": resources_map(&planet.resources),
                "surveyed": planet.surveyed,
            })
        })
        .collect();
    json!({
        "id": system.id.to_string(),
        "name": system.name,
        "sector": [system.sector.0, system.sector.1, system.sector.2],
        "position": vec3(system.position),
        "visited": system.visited,
        "stars": stars,
        "planets": planets,
    })
}
