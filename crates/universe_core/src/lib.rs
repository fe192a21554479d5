//! `universe_core` — deterministic galaxy-simulation tick engine.
//!
//! No IO, no network, no wall clock. All randomness flows through the
//! engine-owned seeded stream; sector generation uses coordinate-derived
//! substreams so lazy materialisation never perturbs the main stream.

mod actuator;
mod comms;
mod engine;
mod events;
mod gen;
mod personality;
mod replicate;
mod rng;
mod scenario;
mod society;
mod travel;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use actuator::{Action, ActionOutcome};
pub use comms::{beacons_in_system, comm_check_reachable, inbox, CommsState};
pub use engine::{Engine, TickReport};
pub use events::{alien_life, events_deterministic_check, EventState};
pub use gen::{generate_sector, habitable_zone, MAX_SYSTEMS_PER_SECTOR};
pub use personality::{most_vivid, vivid_count, DriftEvent};
pub use replicate::CONSCIOUSNESS_FORK_PROGRESS;
pub use rng::EngineRng;
pub use scenario::{
    snapshot_matches, Injection, MetricsSnapshot, ScheduledInjection, Snapshot,
};
pub use society::{disposition_for, SocietyState, VOTE_WINDOW_TICKS};
pub use travel::{lorentz_factor, travel_scan, ScanEntry, TravelOrder, TICKS_PER_CYCLE};
pub use types::*;
