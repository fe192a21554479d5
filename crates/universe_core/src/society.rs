//! Trust, trades, territory, shared construction, voting, tech sharing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::actuator::ActionOutcome;
use crate::engine::Engine;
use crate::personality::{self, DriftEvent};
use crate::types::{
    clamp_signed, Claim, Disposition, LocationKind, MAX_BUILDERS, ProbeStatus, Proposal, Relay,
    ResourceKind, Structure, StructureKind, TechDomain, Trade, TradeStatus, Uid,
};

// Trust deltas applied by the owning subsystem.
pub const TRUST_TRADE: f64 = 0.05;
pub const TRUST_SHARED_DISCOVERY: f64 = 0.03;
pub const TRUST_TECH_SHARE: f64 = 0.08;
pub const TRUST_COLLAB_BUILD: f64 = 0.06;
pub const TRUST_TRESPASS: f64 = -0.10;
pub const TRUST_POLITICAL: f64 = -0.05;

/// Ticks from proposal to deadline.
pub const VOTE_WINDOW_TICKS: u64 = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocietyState {
    pub trades: Vec<Trade>,
    pub claims: Vec<Claim>,
    pub structures: Vec<Structure>,
    pub proposals: Vec<Proposal>,
    pub next_trade_id: u64,
    pub next_structure_id: u64,
    pub next_proposal_id: u64,
    /// (probe, system) pairs already charged for the current incursion.
    pub trespass_marks: BTreeSet<(Uid, Uid)>,
}

/// Disposition is a pure function of trust.
pub fn disposition_for(trust: f64) -> Disposition {
    if trust > 0.5 {
        Disposition::Friendly
    } else if trust > 0.2 {
        Disposition::PositiveNeutral
    } else if trust > -0.2 {
        Disposition::Neutral
    } else if trust > -0.5 {
        Disposition::Wary
    } else {
        Disposition::Hostile
    }
}

impl Engine {
    /// Symmetric trust update; relationships are created on first
    /// interaction.
    pub(crate) fn update_trust(&mut self, a: Uid, b: Uid, delta: f64) {
        if a == b {
            return;
        }
        for (subject, other) in [(a, b), (b, a)] {
            let Some(probe) = self.universe.probe_mut(subject) else {
                continue;
            };
            let rel = match probe.relationships.iter_mut().find(|r| r.other == other) {
                Some(rel) => rel,
                None => {
                    probe.relationships.push(crate::types::Relationship {
                        other,
                        trust: 0.0,
                        disposition: Disposition::Neutral,
                    });
                    probe.relationships.last_mut().unwrap()
                }
            };
            rel.trust = clamp_signed(rel.trust + delta);
            rel.disposition = disposition_for(rel.trust);
        }
    }

    // -- Trades -----------------------------------------------------------

    /// Debit the sender now; the shipment arrives this tick in-system, or
    /// after the inter-system delay otherwise.
    pub(crate) fn begin_trade(
        &mut self,
        index: usize,
        to: Uid,
        resource: ResourceKind,
        amount_kg: f64,
    ) -> ActionOutcome {
        if amount_kg <= 0.0 {
            return ActionOutcome::fail("trade amount must be positive");
        }
        let from_id = self.universe.probes[index].id;
        if to == from_id {
            return ActionOutcome::fail("cannot trade with oneself");
        }
        let Some(target) = self.universe.probe(to) else {
            return ActionOutcome::fail(format!("unknown probe {to}"));
        };
        if target.status == ProbeStatus::Destroyed {
            return ActionOutcome::fail("trade target is destroyed");
        }
        let same_system = target.location != LocationKind::Interstellar
            && target.system_id == self.universe.probes[index].system_id
            && self.universe.probes[index].location != LocationKind::Interstellar;
        if self.universe.probes[index].resource(resource) < amount_kg {
            return ActionOutcome::fail(format!("insufficient {} to send", resource.label()));
        }

        let tick = self.universe.tick;
        let arrival_tick = if same_system {
            tick
        } else {
            tick + self.params.trade_intersystem_delay
        };
        let probe = &mut self.universe.probes[index];
        probe.resources[resource.index()] -= amount_kg;
        probe.mass_kg = (probe.mass_kg - amount_kg).max(0.0);

        let id = self.society.next_trade_id;
        self.society.next_trade_id += 1;
        self.society.trades.push(Trade {
            id,
            from: from_id,
            to,
            resource,
            amount_kg,
            sent_tick: tick,
            arrival_tick,
            status: TradeStatus::InTransit,
        });
        ActionOutcome::pending()
    }

    /// Deliver due shipments. A delivery credits the receiver exactly what
    /// the sender paid; a dead receiver refunds the sender instead.
    pub(crate) fn trade_delivery_tick(&mut self) {
        let tick = self.universe.tick;
        let due: Vec<Trade> = self
            .society
            .trades
            .iter()
            .filter(|t| t.status == TradeStatus::InTransit && t.arrival_tick <= tick)
            .cloned()
            .collect();

        for trade in due {
            let receiver_alive = self
                .universe
                .probe(trade.to)
                .is_some_and(|p| p.status != ProbeStatus::Destroyed);
            let new_status = if receiver_alive {
                let receiver = self.universe.probe_mut(trade.to).unwrap();
                receiver.resources[trade.resource.index()] += trade.amount_kg;
                receiver.mass_kg += trade.amount_kg;
                self.update_trust(trade.from, trade.to, TRUST_TRADE);
                TradeStatus::Delivered
            } else {
                // Conservation: the shipment returns to the sender.
                if let Some(sender) = self.universe.probe_mut(trade.from) {
                    sender.resources[trade.resource.index()] += trade.amount_kg;
                    sender.mass_kg += trade.amount_kg;
                }
                TradeStatus::Cancelled
            };
            if let Some(stored) = self.society.trades.iter_mut().find(|t| t.id == trade.id) {
                stored.status = new_status;
            }
        }
    }

    // -- Territory --------------------------------------------------------

    pub(crate) fn claim_system(&mut self, index: usize) -> ActionOutcome {
        let probe = &self.universe.probes[index];
        if probe.location == LocationKind::Interstellar {
            return ActionOutcome::fail("must be in a system to claim it");
        }
        let (probe_id, system_id) = (probe.id, probe.system_id);
        if let Some(existing) = self
            .society
            .claims
            .iter()
            .find(|c| c.system_id == system_id)
        {
            return if existing.owner == probe_id {
                ActionOutcome::fail("system already claimed by this probe")
            } else {
                ActionOutcome::fail("system is claimed by another probe")
            };
        }
        let tick = self.universe.tick;
        self.society.claims.push(Claim {
            system_id,
            owner: probe_id,
            claimed_tick: tick,
        });
        ActionOutcome::ok()
    }

    pub(crate) fn revoke_claim(&mut self, index: usize) -> ActionOutcome {
        let probe = &self.universe.probes[index];
        let (probe_id, system_id) = (probe.id, probe.system_id);
        let before = self.society.claims.len();
        self.society
            .claims
            .retain(|c| !(c.system_id == system_id && c.owner == probe_id));
        if self.society.claims.len() == before {
            return ActionOutcome::fail("no claim held on this system");
        }
        ActionOutcome::ok()
    }

    /// Charge the trespass penalty once per entry into a claimed system.
    pub(crate) fn trespass_tick(&mut self) {
        let incursions: Vec<(Uid, Uid, Uid)> = self
            .universe
            .probes
            .iter()
            .filter(|p| {
                p.status != ProbeStatus::Destroyed && p.location != LocationKind::Interstellar
            })
            .filter_map(|p| {
                self.society
                    .claims
                    .iter()
                    .find(|c| c.system_id == p.system_id && c.owner != p.id)
                    .map(|c| (p.id, p.system_id, c.owner))
            })
            .collect();

        // Marks reset once the probe leaves the claimed system.
        let current: BTreeSet<(Uid, Uid)> = incursions
            .iter()
            .map(|(probe, system, _)| (*probe, *system))
            .collect();
        self.society
            .trespass_marks
            .retain(|mark| current.contains(mark));

        for (probe_id, system_id, owner) in incursions {
            if self.society.trespass_marks.insert((probe_id, system_id)) {
                self.update_trust(probe_id, owner, TRUST_TRESPASS);
            }
        }
    }

    // -- Shared construction ----------------------------------------------

    /// Start a structure, or join a compatible one already underway in this
    /// system (diminishing returns cap out at four collaborators).
    pub(crate) fn begin_build(&mut self, index: usize, kind: StructureKind) -> ActionOutcome {
        let probe = &self.universe.probes[index];
        if probe.location == LocationKind::Interstellar {
            return ActionOutcome::fail("must be in a system to build");
        }
        let (probe_id, system_id, position) = (probe.id, probe.system_id, probe.position);

        if let Some(site) = self
            .society
            .structures
            .iter_mut()
            .find(|s| !s.completed && s.system_id == system_id && s.kind == kind)
        {
            if site.builders.contains(&probe_id) {
                return ActionOutcome::pending();
            }
            if site.builders.len() >= MAX_BUILDERS {
                return ActionOutcome::fail("construction crew is full");
            }
            site.builders.push(probe_id);
            self.universe.probes[index].status = ProbeStatus::Building;
            return ActionOutcome::pending();
        }

        let cost = kind.cost();
        for (kind_index, required) in cost.iter().enumerate() {
            if self.universe.probes[index].resources[kind_index] < *required {
                return ActionOutcome::fail(format!(
                    "insufficient {} to begin construction",
                    ResourceKind::ALL[kind_index].label()
                ));
            }
        }
        let probe = &mut self.universe.probes[index];
        for (kind_index, required) in cost.iter().enumerate() {
            probe.resources[kind_index] -= required;
        }
        probe.status = ProbeStatus::Building;

        let id = self.society.next_structure_id;
        self.society.next_structure_id += 1;
        self.society.structures.push(Structure {
            id,
            kind,
            system_id,
            position,
            builders: smallvec::smallvec![probe_id],
            progress_ticks: 0.0,
            required_ticks: kind.base_ticks(),
            completed: false,
            completed_tick: None,
        });
        ActionOutcome::pending()
    }

    /// Advance construction; completions release builders, bond them, and
    /// register relay satellites with the comm network.
    pub(crate) fn build_tick(&mut self) {
        let tick = self.universe.tick;
        let max_memories = self.params.max_memories;
        let relay_range = self.params.relay_range_ly;
        let mut completed: Vec<usize> = Vec::new();

        for (structure_index, structure) in self.society.structures.iter_mut().enumerate() {
            if structure.completed {
                continue;
            }
            let live_builders = structure
                .builders
                .iter()
                .filter(|id| {
                    self.universe
                        .probes
                        .iter()
                        .any(|p| p.id == **id && p.status != ProbeStatus::Destroyed)
                })
                .count();
            if live_builders == 0 {
                continue;
            }
            // Diminishing returns on extra hands.
            let rate = 1.0 + 0.6 * (live_builders as f64 - 1.0);
            structure.progress_ticks += rate;
            if structure.progress_ticks >= structure.required_ticks {
                structure.completed = true;
                structure.completed_tick = Some(tick);
                completed.push(structure_index);
            }
        }

        for structure_index in completed {
            let structure = self.society.structures[structure_index].clone();
            if structure.kind == StructureKind::RelaySatellite {
                let id = self.comms.relays.len() as u64;
                self.comms.relays.push(Relay {
                    id,
                    system_id: structure.system_id,
                    position: structure.position,
                    range_ly: relay_range,
                });
            }
            for builder_id in structure.builders.iter() {
                if let Some(probe) = self.universe.probe_mut(*builder_id) {
                    if probe.status == ProbeStatus::Building {
                        probe.status = ProbeStatus::Active;
                    }
                    personality::apply_drift(probe, DriftEvent::SuccessfulBuild);
                    personality::record_memory(
                        probe,
                        tick,
                        format!("We finished the {:?} together", structure.kind),
                        0.7,
                        max_memories,
                    );
                }
            }
            for (i, a) in structure.builders.iter().enumerate() {
                for b in structure.builders.iter().skip(i + 1) {
                    self.update_trust(*a, *b, TRUST_COLLAB_BUILD);
                }
            }
        }
    }

    // -- Voting -----------------------------------------------------------

    pub(crate) fn propose(&mut self, index: usize, text: &str) -> ActionOutcome {
        if text.is_empty() {
            return ActionOutcome::fail("proposal text is empty");
        }
        let proposer = self.universe.probes[index].id;
        let tick = self.universe.tick;
        let id = self.society.next_proposal_id;
        self.society.next_proposal_id += 1;
        self.society.proposals.push(Proposal {
            id,
            proposer,
            text: text.to_string(),
            proposed_tick: tick,
            deadline_tick: tick + VOTE_WINDOW_TICKS,
            votes: Vec::new(),
            votes_for: 0,
            votes_against: 0,
            resolved: None,
        });
        ActionOutcome::ok()
    }

    pub(crate) fn cast_vote(
        &mut self,
        index: usize,
        proposal_id: u64,
        in_favor: bool,
    ) -> ActionOutcome {
        let voter = self.universe.probes[index].id;
        let tick = self.universe.tick;
        let Some(proposal) = self
            .society
            .proposals
            .iter_mut()
            .find(|p| p.id == proposal_id)
        else {
            return ActionOutcome::fail(format!("unknown proposal {proposal_id}"));
        };
        if proposal.resolved.is_some() || tick >= proposal.deadline_tick {
            return ActionOutcome::fail("voting has closed");
        }
        if proposal.votes.iter().any(|(id, _)| *id == voter) {
            return ActionOutcome::fail("already voted");
        }
        proposal.votes.push((voter, in_favor));
        if in_favor {
            proposal.votes_for += 1;
        } else {
            proposal.votes_against += 1;
        }
        ActionOutcome::ok()
    }

    /// Resolve proposals at their deadline: strict majority passes, ties
    /// fail, and voters on opposite sides lose a little regard for each
    /// other.
    pub(crate) fn vote_tick(&mut self) {
        let tick = self.universe.tick;
        let mut disagreements: Vec<(Uid, Uid)> = Vec::new();

        for proposal in &mut self.society.proposals {
            if proposal.resolved.is_some() || tick < proposal.deadline_tick {
                continue;
            }
            proposal.resolved = Some(proposal.votes_for > proposal.votes_against);
            for (i, (a, a_vote)) in proposal.votes.iter().enumerate() {
                for (b, b_vote) in proposal.votes.iter().skip(i + 1) {
                    if a_vote != b_vote {
                        disagreements.push((*a, *b));
                    }
                }
            }
        }
        for (a, b) in disagreements {
            self.update_trust(a, b, TRUST_POLITICAL);
        }
    }

    // -- Tech sharing -----------------------------------------------------

    /// Bump the receiver to the sender's level when strictly higher, and
    /// discount any later research at or below the shared level.
    pub(crate) fn share_tech(&mut self, index: usize, to: Uid, domain: TechDomain) -> ActionOutcome {
        let from = self.universe.probes[index].clone();
        if to == from.id {
            return ActionOutcome::fail("cannot share tech with oneself");
        }
        let Some(target) = self.universe.probe(to) else {
            return ActionOutcome::fail(format!("unknown probe {to}"));
        };
        if target.status == ProbeStatus::Destroyed {
            return ActionOutcome::fail("target is destroyed");
        }
        if crate::comms::comm_check_reachable(&from, target, &self.comms.relays).is_none() {
            return ActionOutcome::fail("target out of comm range and no relay path");
        }
        let sender_level = from.tech[domain.index()];
        let receiver_level = target.tech[domain.index()];
        if sender_level <= receiver_level {
            return ActionOutcome::fail("receiver already knows as much");
        }
        let receiver = self.universe.probe_mut(to).unwrap();
        receiver.tech[domain.index()] = sender_level;
        receiver.tech_shared[domain.index()] = sender_level;
        receiver.recompute_rates();
        self.update_trust(from.id, to, TRUST_TECH_SHARE);
        ActionOutcome::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::test_fixtures;
    use crate::types::Vec3;

    fn two_probe_engine() -> (Engine, Uid, Uid) {
        let mut engine = Engine::new(42);
        let a = engine.universe.probes[0].id;
        let b = test_fixtures::spawn_probe_at(&mut engine, Vec3::new(1.0, 0.0, 0.0));
        (engine, a, b)
    }

    #[test]
    fn trust_updates_are_symmetric_and_clamped() {
        let (mut engine, a, b) = two_probe_engine();
        for _ in 0..30 {
            engine.update_trust(a, b, 0.1);
        }
        let trust_ab = engine.universe.probe(a).unwrap().trust_with(b).unwrap();
        let trust_ba = engine.universe.probe(b).unwrap().trust_with(a).unwrap();
        assert!((trust_ab - 1.0).abs() < 1e-9, "clamped at +1");
        assert!((trust_ab - trust_ba).abs() < 1e-12, "symmetric");
    }

    #[test]
    fn disposition_tracks_trust_buckets() {
        assert_eq!(disposition_for(0.9), Disposition::Friendly);
        assert_eq!(disposition_for(0.51), Disposition::Friendly);
        assert_eq!(disposition_for(0.5), Disposition::PositiveNeutral);
        assert_eq!(disposition_for(0.3), Disposition::PositiveNeutral);
        assert_eq!(disposition_for(0.2), Disposition::Neutral);
        assert_eq!(disposition_for(0.0), Disposition::Neutral);
        assert_eq!(disposition_for(-0.2), Disposition::Wary);
        assert_eq!(disposition_for(-0.3), Disposition::Wary);
        assert_eq!(disposition_for(-0.5), Disposition::Hostile);
        assert_eq!(disposition_for(-0.6), Disposition::Hostile);
    }

    #[test]
    fn same_system_trade_delivers_same_tick() {
        let (mut engine, a, b) = two_probe_engine();
        let index = engine.universe.probe_index(a).unwrap();
        engine.universe.probes[index].resources[ResourceKind::Iron.index()] = 1_000.0;

        let sender_before = 1_000.0;
        let receiver_before = engine.universe.probe(b).unwrap().resource(ResourceKind::Iron);

        let outcome = engine.begin_trade(index, b, ResourceKind::Iron, 400.0);
        assert!(outcome.success, "{outcome:?}");
        // Debit is immediate.
        assert!(
            (engine.universe.probe(a).unwrap().resource(ResourceKind::Iron)
                - (sender_before - 400.0))
                .abs()
                < 1e-9
        );

        engine.trade_delivery_tick();
        let receiver_after = engine.universe.probe(b).unwrap().resource(ResourceKind::Iron);
        assert!((receiver_after - receiver_before - 400.0).abs() < 1e-9, "conserved");
        assert_eq!(
            engine.society.trades[0].status,
            TradeStatus::Delivered
        );
        // Successful trade builds trust both ways.
        assert!(engine.universe.probe(a).unwrap().trust_with(b).unwrap() > 0.0);
    }

    #[test]
    fn intersystem_trade_waits_for_transit() {
        let (mut engine, a, b) = two_probe_engine();
        let index = engine.universe.probe_index(a).unwrap();
        engine.universe.probes[index].resources[ResourceKind::Water.index()] = 500.0;
        // Move the receiver to a different system.
        let other_system = Uid { hi: 77, lo: 78 };
        engine.universe.probe_mut(b).unwrap().system_id = other_system;

        assert!(engine.begin_trade(index, b, ResourceKind::Water, 100.0).success);
        let trade = engine.society.trades.last().unwrap();
        assert_eq!(
            trade.arrival_tick,
            engine.universe.tick + engine.params.trade_intersystem_delay
        );

        engine.trade_delivery_tick();
        assert_eq!(
            engine.society.trades[0].status,
            TradeStatus::InTransit,
            "not yet due"
        );
        engine.universe.tick += engine.params.trade_intersystem_delay;
        engine.trade_delivery_tick();
        assert_eq!(engine.society.trades[0].status, TradeStatus::Delivered);
    }

    #[test]
    fn overdraw_trade_rejected() {
        let (mut engine, a, b) = two_probe_engine();
        let index = engine.universe.probe_index(a).unwrap();
        engine.universe.probes[index].resources[ResourceKind::Iron.index()] = 10.0;
        let outcome = engine.begin_trade(index, b, ResourceKind::Iron, 400.0);
        assert!(!outcome.success);
        assert!(
            (engine.universe.probes[index].resource(ResourceKind::Iron) - 10.0).abs() < 1e-9,
            "rejection must not debit"
        );
    }

    #[test]
    fn single_claim_per_system_and_trespass_once_per_entry() {
        let (mut engine, a, b) = two_probe_engine();
        let index_a = engine.universe.probe_index(a).unwrap();
        let index_b = engine.universe.probe_index(b).unwrap();
        let system = engine.universe.probes[index_a].system_id;
        engine.universe.probes[index_b].system_id = system;
        engine.universe.probes[index_b].location = LocationKind::InSystem;

        assert!(engine.claim_system(index_a).success);
        assert!(!engine.claim_system(index_b).success, "one owner per system");

        engine.trespass_tick();
        let trust_once = engine.universe.probe(b).unwrap().trust_with(a).unwrap();
        assert!((trust_once - TRUST_TRESPASS).abs() < 1e-9);

        // Staying put does not recharge the penalty.
        engine.trespass_tick();
        let trust_still = engine.universe.probe(b).unwrap().trust_with(a).unwrap();
        assert!((trust_still - trust_once).abs() < 1e-12);

        // Leaving and re-entering charges again.
        engine.universe.probe_mut(b).unwrap().system_id = Uid { hi: 5, lo: 5 };
        engine.trespass_tick();
        engine.universe.probe_mut(b).unwrap().system_id = system;
        engine.trespass_tick();
        let trust_again = engine.universe.probe(b).unwrap().trust_with(a).unwrap();
        assert!((trust_again - 2.0 * TRUST_TRESPASS).abs() < 1e-9);
    }

    #[test]
    fn collaborative_build_is_faster_and_registers_relay() {
        let (mut engine, a, b) = two_probe_engine();
        let index_a = engine.universe.probe_index(a).unwrap();
        let index_b = engine.universe.probe_index(b).unwrap();
        let system = engine.universe.probes[index_a].system_id;
        engine.universe.probes[index_b].system_id = system;
        engine.universe.probes[index_b].location = LocationKind::InSystem;
        for index in [index_a, index_b] {
            engine.universe.probes[index].resources = [100_000.0; crate::types::RESOURCE_COUNT];
        }

        assert!(engine
            .begin_build(index_a, StructureKind::RelaySatellite)
            .success);
        assert!(engine
            .begin_build(index_b, StructureKind::RelaySatellite)
            .success);
        assert_eq!(engine.society.structures.len(), 1, "second builder joins");
        assert_eq!(engine.society.structures[0].builders.len(), 2);

        let mut ticks = 0u32;
        while !engine.society.structures[0].completed {
            engine.universe.tick += 1;
            engine.build_tick();
            ticks += 1;
            assert!(ticks < 1_000, "build never completed");
        }
        // Two builders at rate 1.6: 60 / 1.6 → 38 ticks, well under solo 60.
        assert!(ticks < 60, "collaboration should beat the solo budget: {ticks}");
        assert_eq!(engine.comms.relays.len(), 1, "relay auto-registered");
        assert!(
            engine.universe.probe(a).unwrap().trust_with(b).unwrap() > 0.0,
            "collaboration builds trust"
        );
        assert_eq!(
            engine.universe.probe(a).unwrap().status,
            ProbeStatus::Active,
            "builders released"
        );
    }

    #[test]
    fn votes_resolve_strict_majority_ties_fail() {
        let (mut engine, a, b) = two_probe_engine();
        let c = test_fixtures::spawn_probe_at(&mut engine, Vec3::new(2.0, 0.0, 0.0));
        let index_a = engine.universe.probe_index(a).unwrap();

        assert!(engine.propose(index_a, "survey the carbon world first").success);
        let proposal_id = engine.society.proposals[0].id;

        let index_b = engine.universe.probe_index(b).unwrap();
        let index_c = engine.universe.probe_index(c).unwrap();
        assert!(engine.cast_vote(index_a, proposal_id, true).success);
        assert!(engine.cast_vote(index_b, proposal_id, false).success);
        assert!(!engine.cast_vote(index_b, proposal_id, true).success, "one vote per voter");
        assert!(engine.cast_vote(index_c, proposal_id, true).success);

        engine.universe.tick += VOTE_WINDOW_TICKS;
        engine.vote_tick();
        assert_eq!(engine.society.proposals[0].resolved, Some(true));
        // Disagreement costs regard.
        assert!(engine.universe.probe(a).unwrap().trust_with(b).unwrap() < 0.0);

        // A tied proposal fails.
        let index_a = engine.universe.probe_index(a).unwrap();
        assert!(engine.propose(index_a, "abandon the relay program").success);
        let tied = engine.society.proposals[1].id;
        let index_b = engine.universe.probe_index(b).unwrap();
        assert!(engine.cast_vote(index_a, tied, true).success);
        assert!(engine.cast_vote(index_b, tied, false).success);
        engine.universe.tick += VOTE_WINDOW_TICKS;
        engine.vote_tick();
        assert_eq!(engine.society.proposals[1].resolved, Some(false));
    }

    #[test]
    fn tech_share_bumps_to_sender_level_only_upward() {
        let (mut engine, a, b) = two_probe_engine();
        let index_a = engine.universe.probe_index(a).unwrap();
        engine.universe.probes[index_a].tech[TechDomain::Mining.index()] = 9;
        engine.universe.probes[index_a].recompute_rates();

        assert!(engine.share_tech(index_a, b, TechDomain::Mining).success);
        let receiver = engine.universe.probe(b).unwrap();
        assert_eq!(receiver.tech[TechDomain::Mining.index()], 9);
        assert_eq!(receiver.tech_shared[TechDomain::Mining.index()], 9);
        assert!(engine.universe.probe(a).unwrap().trust_with(b).unwrap() > 0.05);

        // Sharing downward is refused.
        let outcome = engine.share_tech(index_a, b, TechDomain::Mining);
        assert!(!outcome.success);
    }
}
