//! Probe action validation and execution.
//!
//! Rejections are total: a refused action mutates nothing and charges
//! nothing. `completed == false` means the action is valid but spans
//! multiple ticks and should be re-issued.

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::personality::{self, DriftEvent};
use crate::types::{
    LocationKind, ProbeStatus, ResourceKind, Sector, StructureKind, TechDomain, Uid,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    NavigateToBody { body: Uid },
    EnterOrbit { body: Uid },
    Land,
    Launch,
    Survey { level: u8 },
    Mine { resource: ResourceKind },
    Wait,
    Repair,
    TravelToSystem { system: Uid, sector: Sector },
    Replicate,
    /// A zero target UID broadcasts to every probe in direct comm range.
    SendMessage { to: Uid, text: String },
    PlaceBeacon { text: String },
    BuildStructure { kind: StructureKind },
    Trade { to: Uid, resource: ResourceKind, amount_kg: f64 },
    ClaimSystem,
    RevokeClaim,
    Propose { text: String },
    Vote { proposal: u64, in_favor: bool },
    Research { domain: TechDomain },
    ShareTech { to: Uid, domain: TechDomain },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub completed: bool,
    pub error: Option<String>,
    /// Broadcasts report how many light-delayed copies were queued.
    pub recipients: Option<u32>,
}

impl ActionOutcome {
    pub fn ok() -> Self {
        ActionOutcome {
            success: true,
            completed: true,
            error: None,
            recipients: None,
        }
    }

    pub fn ok_with_recipients(count: u32) -> Self {
        ActionOutcome {
            recipients: Some(count),
            ..Self::ok()
        }
    }

    pub fn pending() -> Self {
        ActionOutcome {
            success: true,
            completed: false,
            error: None,
            recipients: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        ActionOutcome {
            success: false,
            completed: false,
            error: Some(message.into()),
            recipients: None,
        }
    }
}

/// Tsiolkovsky-flavoured gravity-well fuel cost: base × √mass.
pub(crate) fn gravity_well_fuel(base_kg: f64, mass_earth: f64) -> f64 {
    base_kg * mass_earth.max(0.01).sqrt()
}

impl Engine {
    /// Validate and execute one action for one probe. The probe must exist.
    pub fn execute_action(&mut self, probe_id: Uid, action: &Action) -> ActionOutcome {
        let Some(index) = self.universe.probe_index(probe_id) else {
            return ActionOutcome::fail(format!("unknown probe {probe_id}"));
        };

        match self.universe.probes[index].status {
            ProbeStatus::Destroyed => return ActionOutcome::fail("probe is destroyed"),
            ProbeStatus::Dormant => {
                if !matches!(action, Action::Wait) {
                    return ActionOutcome::fail("probe is dormant");
                }
            }
            ProbeStatus::Traveling => {
                if !matches!(action, Action::Wait) {
                    return ActionOutcome::fail("only wait is valid while traveling");
                }
            }
            ProbeStatus::Replicating => {
                if !matches!(action, Action::Wait) {
                    return ActionOutcome::fail("replication in progress");
                }
            }
            _ => {}
        }

        // Mining status is transient; any new instruction clears it.
        if self.universe.probes[index].status == ProbeStatus::Mining
            && !matches!(action, Action::Mine { .. })
        {
            self.universe.probes[index].status = ProbeStatus::Active;
        }

        match action {
            Action::Wait => ActionOutcome::ok(),
            Action::NavigateToBody { body } => self.navigate_to_body(index, *body),
            Action::EnterOrbit { body } => self.enter_orbit(index, *body),
            Action::Land => self.land(index),
            Action::Launch => self.launch(index),
            Action::Survey { level } => self.survey(index, *level),
            Action::Mine { resource } => self.mine(index, *resource),
            Action::Repair => self.repair(index),
            Action::TravelToSystem { system, sector } => self.begin_travel(index, *system, *sector),
            Action::Replicate => self.begin_replication(index),
            Action::SendMessage { to, text } => self.send_message(index, *to, text),
            Action::PlaceBeacon { text } => self.place_beacon(index, text),
            Action::BuildStructure { kind } => self.begin_build(index, *kind),
            Action::Trade {
                to,
                resource,
                amount_kg,
            } => self.begin_trade(index, *to, *resource, *amount_kg),
            Action::ClaimSystem => self.claim_system(index),
            Action::RevokeClaim => self.revoke_claim(index),
            Action::Propose { text } => self.propose(index, text),
            Action::Vote { proposal, in_favor } => self.cast_vote(index, *proposal, *in_favor),
            Action::Research { domain } => self.begin_research(index, *domain),
            Action::ShareTech { to, domain } => self.share_tech(index, *to, *domain),
        }
    }

    fn navigate_to_body(&mut self, index: usize, body: Uid) -> ActionOutcome {
        let probe = &self.universe.probes[index];
        if probe.location == LocationKind::Interstellar {
            return ActionOutcome::fail("cannot navigate while interstellar");
        }
        if probe.fuel_kg < self.params.nav_fuel_kg {
            return ActionOutcome::fail("insufficient fuel");
        }
        let system_id = probe.system_id;
        let Some(system) = self.system(system_id) else {
            return ActionOutcome::fail("current system not materialised");
        };
        if system.planet(body).is_none() {
            return ActionOutcome::fail(format!("no such body {body} in system"));
        }
        let nav_fuel = self.params.nav_fuel_kg;
        let probe = &mut self.universe.probes[index];
        probe.fuel_kg -= nav_fuel;
        probe.body_id = body;
        probe.location = LocationKind::InSystem;
        ActionOutcome::ok()
    }

    fn enter_orbit(&mut self, index: usize, body: Uid) -> ActionOutcome {
        let probe = &self.universe.probes[index];
        if !matches!(
            probe.location,
            LocationKind::InSystem | LocationKind::Orbiting
        ) {
            return ActionOutcome::fail("must be in-system to enter orbit");
        }
        let system_id = probe.system_id;
        let Some(system) = self.system(system_id) else {
            return ActionOutcome::fail("current system not materialised");
        };
        let Some(planet) = system.planet(body) else {
            return ActionOutcome::fail(format!("no such body {body} in system"));
        };
        let fuel = gravity_well_fuel(self.params.orbit_fuel_base_kg, planet.mass_earth);
        let probe = &mut self.universe.probes[index];
        if probe.fuel_kg < fuel {
            return ActionOutcome::fail("insufficient fuel for orbital insertion");
        }
        probe.fuel_kg -= fuel;
        probe.body_id = body;
        probe.location = LocationKind::Orbiting;
        ActionOutcome::ok()
    }

    fn land(&mut self, index: usize) -> ActionOutcome {
        let probe = &self.universe.probes[index];
        if probe.location != LocationKind::Orbiting {
            return ActionOutcome::fail("must be orbiting to land");
        }
        let (system_id, body_id) = (probe.system_id, probe.body_id);
        let Some(planet) = self.system(system_id).and_then(|s| s.planet(body_id)) else {
            return ActionOutcome::fail("orbited body not found");
        };
        if !planet.kind.landable() {
            return ActionOutcome::fail("cannot land on a gas or ice giant");
        }
        let fuel = gravity_well_fuel(self.params.orbit_fuel_base_kg, planet.mass_earth);
        let probe = &mut self.universe.probes[index];
        if probe.fuel_kg < fuel {
            return ActionOutcome::fail("insufficient fuel for descent");
        }
        probe.fuel_kg -= fuel;
        probe.location = LocationKind::Landed;
        ActionOutcome::ok()
    }

    fn launch(&mut self, index: usize) -> ActionOutcome {
        let probe = &self.universe.probes[index];
        if probe.location != LocationKind::Landed {
            return ActionOutcome::fail("must be landed to launch");
        }
        let (system_id, body_id) = (probe.system_id, probe.body_id);
        let Some(planet) = self.system(system_id).and_then(|s| s.planet(body_id)) else {
            return ActionOutcome::fail("landed body not found");
        };
        let fuel = gravity_well_fuel(self.params.launch_fuel_base_kg, planet.mass_earth);
        let probe = &mut self.universe.probes[index];
        if probe.fuel_kg < fuel {
            return ActionOutcome::fail("insufficient fuel to reach orbit");
        }
        probe.fuel_kg -= fuel;
        probe.location = LocationKind::Orbiting;
        ActionOutcome::ok()
    }

    #[allow(clippy::too_many_lines)]
    fn survey(&mut self, index: usize, level: u8) -> ActionOutcome {
        if usize::from(level) >= crate::types::SURVEY_LEVELS {
            return ActionOutcome::fail(format!("survey level {level} out of range"));
        }
        let probe = &self.universe.probes[index];
        let location_ok = if level == 4 {
            probe.location == LocationKind::Landed
        } else {
            matches!(probe.location, LocationKind::Orbiting | LocationKind::Landed)
        };
        if !location_ok {
            return ActionOutcome::fail(if level == 4 {
                "survey level 4 requires being landed"
            } else {
                "survey requires orbiting or landed"
            });
        }
        if probe.energy_j < self.params.survey_energy_j {
            return ActionOutcome::fail("insufficient energy for survey");
        }
        let (system_id, body_id) = (probe.system_id, probe.body_id);
        let Some(planet) = self.system(system_id).and_then(|s| s.planet(body_id)) else {
            return ActionOutcome::fail("no body to survey");
        };
        if planet.surveyed[usize::from(level)] {
            return ActionOutcome::fail(format!("survey level {level} already complete"));
        }
        if level > 0 && !planet.surveyed[usize::from(level) - 1] {
            return ActionOutcome::fail(format!("survey level {} not yet complete", level - 1));
        }

        let required = self.params.survey_ticks[usize::from(level)];
        let energy = self.params.survey_energy_j;
        let tick = self.universe.tick;
        let probe_id = self.universe.probes[index].id;

        let probe = &mut self.universe.probes[index];
        probe.energy_j -= energy;
        let ticks_done = match &mut probe.survey {
            Some(progress) if progress.body == body_id && progress.level == level => {
                progress.ticks_done += 1;
                progress.ticks_done
            }
            _ => {
                probe.survey = Some(crate::types::SurveyProgress {
                    body: body_id,
                    level,
                    ticks_done: 1,
                });
                1
            }
        };

        if ticks_done < required {
            return ActionOutcome::pending();
        }

        // Survey complete: flip the flag, record the discoverer.
        self.universe.probes[index].survey = None;
        let max_memories = self.params.max_memories;
        if let Some(planet) = self.system_mut(system_id).and_then(|s| s.planet_mut(body_id)) {
            planet.surveyed[usize::from(level)] = true;
            if planet.discovered_by.is_zero() {
                planet.discovered_by = probe_id;
                planet.discovered_tick = tick;
            }
            if level == 4 {
                if let Some(artifact) = &mut planet.artifact {
                    artifact.discovered = true;
                }
            }
        }
        let planet_name = self
            .system(system_id)
            .and_then(|s| s.planet(body_id))
            .map_or_else(String::new, |p| p.name.clone());
        let probe = &mut self.universe.probes[index];
        personality::apply_drift(probe, DriftEvent::SurveyComplete);
        personality::record_memory(
            probe,
            tick,
            format!("Completed level-{level} survey of {planet_name}"),
            0.4,
            max_memories,
        );
        ActionOutcome::ok()
    }

    fn mine(&mut self, index: usize, resource: ResourceKind) -> ActionOutcome {
        let probe = &self.universe.probes[index];
        if probe.location != LocationKind::Landed {
            return ActionOutcome::fail("mining requires being landed");
        }
        if probe.energy_j < self.params.mine_energy_j {
            return ActionOutcome::fail("insufficient energy for mining");
        }
        let (system_id, body_id) = (probe.system_id, probe.body_id);
        let Some(planet) = self.system(system_id).and_then(|s| s.planet(body_id)) else {
            return ActionOutcome::fail("no body to mine");
        };
        let abundance = planet.resources[resource.index()];
        if abundance <= 0.0 {
            return ActionOutcome::fail(format!("no {} present", resource.label()));
        }
        let mass_earth = planet.mass_earth;
        let mining_rate = self.universe.probes[index].rates.mining_rate;
        let yield_kg =
            self.params.mine_base_kg * mining_rate * abundance / mass_earth.max(0.01).sqrt();
        let energy = self.params.mine_energy_j;

        // Extraction depletes the body imperceptibly.
        if let Some(planet) = self.system_mut(system_id).and_then(|s| s.planet_mut(body_id)) {
            planet.resources[resource.index()] = (abundance - yield_kg * 1.0e-9).max(0.0);
        }
        let probe = &mut self.universe.probes[index];
        probe.energy_j -= energy;
        probe.resources[resource.index()] += yield_kg;
        probe.mass_kg += yield_kg;
        probe.status = ProbeStatus::Mining;
        personality::apply_drift(probe, DriftEvent::MiningComplete);
        ActionOutcome::ok()
    }

    fn repair(&mut self, index: usize) -> ActionOutcome {
        let iron_needed = self.params.repair_iron_kg;
        let energy_needed = self.params.repair_energy_j;
        let hull_gain = self.params.repair_hull;
        let probe = &mut self.universe.probes[index];
        if probe.hull >= 1.0 {
            return ActionOutcome::fail("hull already intact");
        }
        if probe.resource(ResourceKind::Iron) < iron_needed {
            return ActionOutcome::fail("insufficient iron for repair");
        }
        if probe.energy_j < energy_needed {
            return ActionOutcome::fail("insufficient energy for repair");
        }
        probe.resources[ResourceKind::Iron.index()] -= iron_needed;
        probe.energy_j -= energy_needed;
        probe.hull = (probe.hull + hull_gain).min(1.0);
        if probe.status == ProbeStatus::Damaged && probe.hull >= 0.25 {
            probe.status = ProbeStatus::Active;
        }
        personality::apply_drift(probe, DriftEvent::Repair);
        ActionOutcome::ok()
    }
}
