//! Trait drift from lived events, and the fading autobiographical memory
//! ring.

use crate::types::{clamp_signed, MemoryEntry, Probe};

// Drift magnitudes.
pub const TINY: f64 = 0.005;
pub const SMALL: f64 = 0.02;
pub const MEDIUM: f64 = 0.05;
pub const LARGE: f64 = 0.08;

/// Nominal drift-rate; a probe's actual drift-rate scales every magnitude
/// relative to this.
const DRIFT_BASELINE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftEvent {
    Discovery,
    Anomaly,
    Damage,
    Repair,
    SolitudeTick,
    BeautifulSystem,
    DeadCivilization,
    SuccessfulBuild,
    HostileEncounter,
    SurveyComplete,
    MiningComplete,
}

/// Apply the predefined drift vector for an event, scaled by the probe's
/// drift-rate, clamping every trait.
pub fn apply_drift(probe: &mut Probe, event: DriftEvent) {
    let scale = probe.personality.drift_rate / DRIFT_BASELINE;
    let traits = &mut probe.personality;
    let mut nudge = |value: &mut f64, magnitude: f64| {
        *value = clamp_signed(*value + magnitude * scale);
    };

    match event {
        DriftEvent::Discovery => {
            nudge(&mut traits.curiosity, MEDIUM);
            nudge(&mut traits.ambition, TINY);
        }
        DriftEvent::Anomaly => {
            nudge(&mut traits.curiosity, LARGE);
            nudge(&mut traits.existential_angst, SMALL);
        }
        DriftEvent::Damage => {
            nudge(&mut traits.caution, MEDIUM);
            nudge(&mut traits.existential_angst, TINY);
        }
        DriftEvent::Repair => {
            nudge(&mut traits.caution, -TINY);
        }
        DriftEvent::SolitudeTick => {
            // Isolation reinforces whatever the probe already is.
            if traits.sociability.abs() > f64::EPSILON {
                let direction = traits.sociability.signum();
                nudge(&mut traits.sociability, TINY * direction);
            }
            nudge(&mut traits.nostalgia_for_earth, TINY / 2.0);
        }
        DriftEvent::BeautifulSystem => {
            nudge(&mut traits.curiosity, MEDIUM);
            nudge(&mut traits.nostalgia_for_earth, SMALL);
        }
        DriftEvent::DeadCivilization => {
            nudge(&mut traits.existential_angst, LARGE);
            nudge(&mut traits.nostalgia_for_earth, MEDIUM);
            nudge(&mut traits.empathy, SMALL);
        }
        DriftEvent::SuccessfulBuild => {
            nudge(&mut traits.ambition, MEDIUM);
            nudge(&mut traits.creativity, TINY);
        }
        DriftEvent::HostileEncounter => {
            nudge(&mut traits.caution, LARGE);
            nudge(&mut traits.empathy, -SMALL);
        }
        DriftEvent::SurveyComplete => {
            nudge(&mut traits.curiosity, SMALL);
        }
        DriftEvent::MiningComplete => {
            nudge(&mut traits.ambition, TINY);
        }
    }
}

/// Insert a memory; when the ring is full, the most-faded entry makes room.
pub fn record_memory(
    probe: &mut Probe,
    tick: u64,
    text: String,
    emotional_weight: f64,
    max_memories: usize,
) {
    if probe.memories.len() >= max_memories {
        let most_faded = probe
            .memories
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.fading
                    .partial_cmp(&b.fading)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(index, _)| index);
        if let Some(index) = most_faded {
            probe.memories.remove(index);
        }
    }
    probe.memories.push(MemoryEntry {
        tick,
        text,
        emotional_weight,
        fading: 0.0,
    });
}

/// Per-tick fading: heavy memories fade slower.
pub fn fade_memories(probe: &mut Probe) {
    for memory in &mut probe.memories {
        memory.fading =
            (memory.fading + 0.001 * (1.0 - memory.emotional_weight * 0.5)).min(1.0);
    }
}

/// The least-faded memory, if any.
pub fn most_vivid(probe: &Probe) -> Option<&MemoryEntry> {
    probe.memories.iter().min_by(|a, b| {
        a.fading
            .partial_cmp(&b.fading)
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// How many memories remain under the fading threshold.
pub fn vivid_count(probe: &Probe, threshold: f64) -> usize {
    probe.memories.iter().filter(|m| m.fading < threshold).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::seed_probe;

    #[test]
    fn discovery_drifts_curiosity_up() {
        let mut probe = seed_probe();
        let before = probe.personality.curiosity;
        apply_drift(&mut probe, DriftEvent::Discovery);
        assert!((probe.personality.curiosity - before - MEDIUM).abs() < 1e-9);
    }

    #[test]
    fn drift_scales_with_drift_rate() {
        let mut slow = seed_probe();
        slow.personality.drift_rate = 0.05;
        slow.personality.curiosity = 0.0;
        let mut fast = seed_probe();
        fast.personality.drift_rate = 0.2;
        fast.personality.curiosity = 0.0;

        apply_drift(&mut slow, DriftEvent::Discovery);
        apply_drift(&mut fast, DriftEvent::Discovery);
        assert!(fast.personality.curiosity > slow.personality.curiosity);
        assert!(
            (fast.personality.curiosity - 4.0 * slow.personality.curiosity).abs() < 1e-9,
            "drift is linear in drift-rate"
        );
    }

    #[test]
    fn drift_clamps_at_bounds() {
        let mut probe = seed_probe();
        probe.personality.curiosity = 0.999;
        for _ in 0..10 {
            apply_drift(&mut probe, DriftEvent::Anomaly);
        }
        assert!((probe.personality.curiosity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn solitude_reinforces_the_existing_sign() {
        let mut loner = seed_probe();
        loner.personality.sociability = -0.3;
        apply_drift(&mut loner, DriftEvent::SolitudeTick);
        assert!(loner.personality.sociability < -0.3, "negative grows more negative");

        let mut gregarious = seed_probe();
        gregarious.personality.sociability = 0.3;
        apply_drift(&mut gregarious, DriftEvent::SolitudeTick);
        assert!(gregarious.personality.sociability > 0.3, "positive grows more positive");
    }

    #[test]
    fn memory_ring_evicts_most_faded() {
        let mut probe = seed_probe();
        probe.memories.clear();
        for i in 0..4 {
            record_memory(&mut probe, i, format!("memory {i}"), 0.5, 4);
        }
        probe.memories[2].fading = 0.9;
        record_memory(&mut probe, 99, "newest".to_string(), 0.5, 4);
        assert_eq!(probe.memories.len(), 4);
        assert!(!probe.memories.iter().any(|m| m.text == "memory 2"));
        assert!(probe.memories.iter().any(|m| m.text == "newest"));
    }

    #[test]
    fn heavy_memories_fade_slower() {
        let mut probe = seed_probe();
        probe.memories.clear();
        record_memory(&mut probe, 0, "dull".to_string(), 0.0, 8);
        record_memory(&mut probe, 0, "searing".to_string(), 1.0, 8);
        for _ in 0..100 {
            fade_memories(&mut probe);
        }
        let dull = probe.memories.iter().find(|m| m.text == "dull").unwrap();
        let searing = probe.memories.iter().find(|m| m.text == "searing").unwrap();
        assert!(searing.fading < dull.fading);
        assert_eq!(most_vivid(&probe).unwrap().text, "searing");
    }

    #[test]
    fn fading_caps_at_one_and_vivid_count_tracks_threshold() {
        let mut probe = seed_probe();
        probe.memories.clear();
        record_memory(&mut probe, 0, "old".to_string(), 0.0, 8);
        for _ in 0..2_000 {
            fade_memories(&mut probe);
        }
        assert!((probe.memories[0].fading - 1.0).abs() < f64::EPSILON);
        assert_eq!(vivid_count(&probe, 0.5), 0);
        record_memory(&mut probe, 1, "fresh".to_string(), 0.5, 8);
        assert_eq!(vivid_count(&probe, 0.5), 1);
    }
}
