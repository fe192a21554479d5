//! Light-delayed messaging, beacons, and relay routing.
//!
//! Relays extend reach, not speed: the light delay is always computed from
//! the straight-line sender→target distance, whatever path the reachability
//! check found.

use serde::{Deserialize, Serialize};

use crate::actuator::ActionOutcome;
use crate::engine::Engine;
use crate::travel::TICKS_PER_CYCLE;
use crate::types::{Beacon, Message, MessageStatus, Probe, ProbeStatus, Relay, Uid};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommsState {
    pub messages: Vec<Message>,
    pub beacons: Vec<Beacon>,
    pub relays: Vec<Relay>,
    pub next_message_id: u64,
    pub next_beacon_id: u64,
}

/// Shortest reachable distance from `from` to `to` over the relay graph, or
/// `None` when unreachable. Direct range short-circuits.
pub fn comm_check_reachable(from: &Probe, to: &Probe, relays: &[Relay]) -> Option<f64> {
    let direct = from.position.distance(to.position);
    if direct <= from.rates.comm_range_ly {
        return Some(direct);
    }

    // Dijkstra over the relay graph. Node n < relays.len() is a relay;
    // node relays.len() is the target.
    let target = relays.len();
    let mut dist: Vec<f64> = vec![f64::INFINITY; relays.len() + 1];
    let mut done: Vec<bool> = vec![false; relays.len() + 1];

    for (i, relay) in relays.iter().enumerate() {
        let hop = from.position.distance(relay.position);
        if hop <= from.rates.comm_range_ly {
            dist[i] = hop;
        }
    }

    loop {
        let mut current = None;
        let mut best = f64::INFINITY;
        for (i, &d) in dist.iter().enumerate() {
            if !done[i] && d < best {
                best = d;
                current = Some(i);
            }
        }
        let Some(current) = current else {
            return None;
        };
        if current == target {
            return Some(dist[target]);
        }
        done[current] = true;

        let relay = &relays[current];
        for (next, other) in relays.iter().enumerate() {
            if done[next] {
                continue;
            }
            let hop = relay.position.distance(other.position);
            if hop <= relay.range_ly && dist[current] + hop < dist[next] {
                dist[next] = dist[current] + hop;
            }
        }
        let hop = relay.position.distance(to.position);
        if hop <= relay.range_ly && dist[current] + hop < dist[target] {
            dist[target] = dist[current] + hop;
        }
    }
}

/// Flip every due in-transit message to Delivered.
pub(crate) fn deliver_messages(comms: &mut CommsState, tick: u64) {
    for message in &mut comms.messages {
        if message.status == MessageStatus::InTransit && message.arrival_tick <= tick {
            message.status = MessageStatus::Delivered;
        }
    }
}

/// Delivered messages addressed to a probe.
pub fn inbox(comms: &CommsState, probe_id: Uid) -> Vec<&Message> {
    comms
        .messages
        .iter()
        .filter(|m| m.to == probe_id && m.status == MessageStatus::Delivered)
        .collect()
}

/// Beacons anchored to a system, visible to any probe present there.
pub fn beacons_in_system(comms: &CommsState, system_id: Uid) -> Vec<&Beacon> {
    comms
        .beacons
        .iter()
        .filter(|b| b.system_id == system_id)
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn light_delay_ticks(distance_ly: f64) -> u64 {
    (distance_ly * TICKS_PER_CYCLE).round() as u64
}

impl Engine {
    /// Targeted send, or a broadcast when `to` is the zero UID.
    pub(crate) fn send_message(&mut self, index: usize, to: Uid, text: &str) -> ActionOutcome {
        if to.is_zero() {
            return self.broadcast(index, text);
        }
        let energy = self.params.message_energy_j;
        if self.universe.probes[index].energy_j < energy {
            return ActionOutcome::fail("insufficient energy to transmit");
        }
        let from = self.universe.probes[index].clone();
        let Some(target) = self.universe.probe(to) else {
            return ActionOutcome::fail(format!("unknown probe {to}"));
        };
        if comm_check_reachable(&from, target, &self.comms.relays).is_none() {
            return ActionOutcome::fail("target out of comm range and no relay path");
        }

        let distance = from.position.distance(target.position);
        let tick = self.universe.tick;
        self.universe.probes[index].energy_j -= energy;
        let id = self.comms.next_message_id;
        self.comms.next_message_id += 1;
        self.comms.messages.push(Message {
            id,
            from: from.id,
            to,
            body: text.to_string(),
            sent_tick: tick,
            arrival_tick: tick + light_delay_ticks(distance),
            status: MessageStatus::InTransit,
        });
        ActionOutcome::ok()
    }

    /// Broadcast to every probe within direct comm range (relays do not
    /// extend broadcasts). Succeeds even with zero recipients; the outcome
    /// reports how many copies were queued.
    fn broadcast(&mut self, index: usize, text: &str) -> ActionOutcome {
        let energy = self.params.broadcast_energy_j;
        if self.universe.probes[index].energy_j < energy {
            return ActionOutcome::fail("insufficient energy to broadcast");
        }
        let from = self.universe.probes[index].clone();
        let tick = self.universe.tick;

        let recipients: Vec<(Uid, f64)> = self
            .universe
            .probes
            .iter()
            .filter(|p| p.id != from.id && p.status != ProbeStatus::Destroyed)
            .filter_map(|p| {
                let distance = from.position.distance(p.position);
                (distance <= from.rates.comm_range_ly).then_some((p.id, distance))
            })
            .collect();
        let queued = recipients.len() as u32;

        self.universe.probes[index].energy_j -= energy;
        for (to, distance) in recipients {
            let id = self.comms.next_message_id;
            self.comms.next_message_id += 1;
            self.comms.messages.push(Message {
                id,
                from: from.id,
                to,
                body: text.to_string(),
                sent_tick: tick,
                arrival_tick: tick + light_delay_ticks(distance),
                status: MessageStatus::InTransit,
            });
        }
        ActionOutcome::ok_with_recipients(queued)
    }

    /// Anchor a fire-and-forget beacon to the probe's current system.
    pub(crate) fn place_beacon(&mut self, index: usize, text: &str) -> ActionOutcome {
        let probe = &self.universe.probes[index];
        if probe.location == crate::types::LocationKind::Interstellar {
            return ActionOutcome::fail("beacons must be anchored to a system");
        }
        let (system_id, probe_id) = (probe.system_id, probe.id);
        let tick = self.universe.tick;
        let id = self.comms.next_beacon_id;
        self.comms.next_beacon_id += 1;
        self.comms.beacons.push(Beacon {
            id,
            system_id,
            from: probe_id,
            text: text.to_string(),
            placed_tick: tick,
        });
        ActionOutcome::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::test_fixtures;
    use crate::types::Vec3;

    fn probe_at(engine: &mut Engine, x: f64) -> Uid {
        test_fixtures::spawn_probe_at(engine, Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn direct_range_short_circuits() {
        let mut engine = Engine::new(42);
        let a = probe_at(&mut engine, 0.0);
        let b = probe_at(&mut engine, 10.0);
        let from = engine.universe.probe(a).unwrap();
        let to = engine.universe.probe(b).unwrap();
        // Default comm tech gives 30 ly of direct range.
        let reach = comm_check_reachable(from, to, &[]);
        assert!((reach.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn relay_bridges_unreachable_pair() {
        let mut engine = Engine::new(42);
        let a = probe_at(&mut engine, 0.0);
        let b = probe_at(&mut engine, 60.0);
        // Out of direct range (30 ly); relays at 25 and 45 bridge the gap.
        let relays = vec![
            Relay {
                id: 0,
                system_id: Uid::ZERO,
                position: Vec3::new(25.0, 0.0, 0.0),
                range_ly: 20.0,
            },
            Relay {
                id: 1,
                system_id: Uid::ZERO,
                position: Vec3::new(45.0, 0.0, 0.0),
                range_ly: 20.0,
            },
        ];
        let from = engine.universe.probe(a).unwrap();
        let to = engine.universe.probe(b).unwrap();
        assert!(comm_check_reachable(from, to, &[]).is_none());
        let via = comm_check_reachable(from, to, &relays).unwrap();
        assert!((via - 60.0).abs() < 1e-6);
    }

    #[test]
    fn message_delay_is_straight_line_light_time() {
        let mut engine = Engine::new(42);
        let a = probe_at(&mut engine, 0.0);
        let b = probe_at(&mut engine, 2.0);
        let index = engine.universe.probe_index(a).unwrap();
        let outcome = engine.send_message(index, b, "hello out there");
        assert!(outcome.success, "{outcome:?}");

        let message = engine.comms.messages.last().unwrap();
        assert_eq!(message.status, MessageStatus::InTransit);
        assert_eq!(message.arrival_tick, engine.universe.tick + 730);

        // Not delivered until the light cone catches up.
        deliver_messages(&mut engine.comms, engine.universe.tick + 729);
        assert!(inbox(&engine.comms, b).is_empty());
        deliver_messages(&mut engine.comms, engine.universe.tick + 730);
        assert_eq!(inbox(&engine.comms, b).len(), 1);
    }

    #[test]
    fn message_charges_energy_and_checks_reach() {
        let mut engine = Engine::new(42);
        let a = probe_at(&mut engine, 0.0);
        let b = probe_at(&mut engine, 500.0);
        let index = engine.universe.probe_index(a).unwrap();
        let energy_before = engine.universe.probes[index].energy_j;
        let outcome = engine.send_message(index, b, "void");
        assert!(!outcome.success, "500 ly is far outside range");
        assert!(
            (engine.universe.probes[index].energy_j - energy_before).abs() < f64::EPSILON,
            "rejection must not charge energy"
        );
    }

    #[test]
    fn broadcast_reaches_only_direct_range() {
        let mut engine = Engine::new(42);
        // Pin the seed probe so the expected recipient count is exact.
        engine.universe.probes[0].position = Vec3::new(1.0, 0.0, 0.0);
        let a = probe_at(&mut engine, 0.0);
        let _near = probe_at(&mut engine, 5.0);
        let _far = probe_at(&mut engine, 200.0);
        let index = engine.universe.probe_index(a).unwrap();
        let before = engine.comms.messages.len();
        let outcome = engine.send_message(index, Uid::ZERO, "anyone?");
        assert!(outcome.success);
        // The seed probe plus the near probe are in range; the far one is not.
        assert_eq!(engine.comms.messages.len() - before, 2);
        assert_eq!(outcome.recipients, Some(2), "broadcast reports queued count");
    }

    #[test]
    fn broadcast_with_no_one_in_range_reports_zero() {
        let mut engine = Engine::new(42);
        engine.universe.probes[0].position = Vec3::new(9_000.0, 0.0, 0.0);
        let a = probe_at(&mut engine, 0.0);
        let index = engine.universe.probe_index(a).unwrap();
        let outcome = engine.send_message(index, Uid::ZERO, "echo");
        assert!(outcome.success);
        assert_eq!(outcome.recipients, Some(0));
        // Targeted sends never report a recipient count.
        let b = probe_at(&mut engine, 1.0);
        let index = engine.universe.probe_index(a).unwrap();
        let outcome = engine.send_message(index, b, "direct");
        assert!(outcome.success);
        assert_eq!(outcome.recipients, None);
    }

    #[test]
    fn beacon_visible_in_system_only() {
        let mut engine = Engine::new(42);
        let probe_id = engine.universe.probes[0].id;
        let system_id = engine.universe.probes[0].system_id;
        let index = engine.universe.probe_index(probe_id).unwrap();
        assert!(engine.place_beacon(index, "waypoint alpha").success);
        assert_eq!(beacons_in_system(&engine.comms, system_id).len(), 1);
        assert!(beacons_in_system(&engine.comms, Uid { hi: 1, lo: 1 }).is_empty());
    }
}
