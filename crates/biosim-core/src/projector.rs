//! Derived state projector: playback state in, render snapshot out.
//!
//! [`project`] is a pure function. It performs no I/O, draws no random
//! numbers, and returns the same snapshot for the same `(topic, state)` pair.
//! Randomness only ever enters through counters, at tick time.

use biosim_types::{AdvancePolicy, PhaseSummary, RenderSnapshot};

use crate::derive;
use crate::state::PlaybackState;
use crate::topic::{Phase, Topic};

/// Compute the render snapshot for a topic in a given state.
pub fn project(topic: &Topic, state: &PlaybackState) -> RenderSnapshot {
    let phase_count = topic.phase_count();
    // The engine keeps the index in range; clamp anyway so a hand-built
    // state cannot make projection index out of bounds.
    let index = state.phase_index.min(phase_count.saturating_sub(1));
    let phase = topic
        .phase(index)
        .map_or_else(|| empty_summary(index), |p| summarize(index, p));

    let derived = derive::evaluate_all(
        topic.derived(),
        &state.counters,
        index,
        state.elapsed_ticks,
    );

    let recent_phases = state
        .recent
        .iter()
        .filter_map(|i| topic.phase(*i))
        .map(|p| p.label.clone())
        .collect();

    RenderSnapshot {
        topic_id: topic.id().to_owned(),
        topic_name: topic.name().to_owned(),
        policy: topic.policy(),
        running: state.running,
        completed: topic.policy() == AdvancePolicy::Terminal
            && state.running
            && index == phase_count.saturating_sub(1),
        phase_count,
        phase,
        counters: state.counters.as_map().clone(),
        derived,
        elapsed_ticks: state.elapsed_ticks,
        recent_phases,
    }
}

fn summarize(index: u32, phase: &Phase) -> PhaseSummary {
    PhaseSummary {
        index,
        name: phase.name.clone(),
        label: phase.label.clone(),
        description: phase.description.clone(),
        dwell_ms: phase.dwell_ms,
        details: phase.details.clone(),
    }
}

fn empty_summary(index: u32) -> PhaseSummary {
    PhaseSummary {
        index,
        name: String::new(),
        label: String::new(),
        description: String::new(),
        dwell_ms: 0,
        details: Vec::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::derive::{Derived, Expr};
    use crate::effects::CounterSpec;

    fn topic() -> Topic {
        Topic::builder("reflex-arc", "Reflex Arc")
            .phase(Phase::new("stimulus", "Stimulus Detection", "Receptor fires", 800))
            .phase(Phase::new("sensory", "Sensory Neuron", "Impulse travels", 800))
            .phase(Phase::new("motor", "Motor Response", "Hand withdraws", 800))
            .policy(AdvancePolicy::Terminal)
            .counter(CounterSpec::new("reaction_ms", 0.0))
            .derive(Derived::new("impulse_position", Expr::PhaseIndex * 20.0))
            .history(3)
            .build()
            .unwrap()
    }

    #[test]
    fn projects_initial_state() {
        let topic = topic();
        let state = PlaybackState::initial(&topic);
        let snap = project(&topic, &state);
        assert_eq!(snap.topic_id, "reflex-arc");
        assert_eq!(snap.phase.index, 0);
        assert_eq!(snap.phase.label, "Stimulus Detection");
        assert_eq!(snap.phase_count, 3);
        assert_eq!(snap.counter("reaction_ms"), Some(0.0));
        assert_eq!(snap.derived_value("impulse_position"), Some(0.0));
        assert!(!snap.running);
        assert!(!snap.completed);
        assert!(snap.recent_phases.is_empty());
    }

    #[test]
    fn projection_is_deterministic() {
        let topic = topic();
        let mut state = PlaybackState::initial(&topic);
        state.running = true;
        state.phase_index = 1;
        state.elapsed_ticks = 1;
        state.remember(1, 3);
        assert_eq!(project(&topic, &state), project(&topic, &state));
        let snap = project(&topic, &state);
        assert_eq!(snap.derived_value("impulse_position"), Some(20.0));
        assert_eq!(snap.recent_phases, vec!["Sensory Neuron".to_owned()]);
    }

    #[test]
    fn terminal_last_phase_is_completed() {
        let topic = topic();
        let mut state = PlaybackState::initial(&topic);
        state.running = true;
        state.phase_index = 2;
        state.elapsed_ticks = 2;
        assert!(project(&topic, &state).completed);
    }

    #[test]
    fn single_phase_terminal_completes_once_running() {
        let topic = Topic::builder("still", "Still")
            .policy(AdvancePolicy::Terminal)
            .phase(Phase::new("only", "Only", "", 1000))
            .build()
            .unwrap();
        let mut state = PlaybackState::initial(&topic);
        assert!(!project(&topic, &state).completed);
        state.running = true;
        assert!(project(&topic, &state).completed);
    }

    #[test]
    fn out_of_range_index_is_clamped() {
        let topic = topic();
        let mut state = PlaybackState::initial(&topic);
        state.phase_index = 99;
        let snap = project(&topic, &state);
        assert_eq!(snap.phase.index, 2);
    }
}
