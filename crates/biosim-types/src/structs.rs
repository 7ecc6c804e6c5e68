//! Render snapshots and catalog records.
//!
//! [`RenderSnapshot`] is the only thing a view ever reads from a playback.
//! [`Chapter`] and [`SimulationMeta`] describe the static catalog that the
//! shell uses for navigation; the engine only ever looks them up.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AdvancePolicy, SimulationKind};

// ---------------------------------------------------------------------------
// Render snapshot
// ---------------------------------------------------------------------------

/// Read-only description of the active phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PhaseSummary {
    /// Position of the phase within the topic's phase table (0-based).
    pub index: u32,
    /// Stable machine name (unique within the topic).
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// One-sentence description shown under the label.
    pub description: String,
    /// How long the phase stays active before the clock advances.
    #[ts(type = "number")]
    pub dwell_ms: u64,
    /// Free-form detail lines (enzymes, genotypes, functions, ...).
    pub details: Vec<String>,
}

/// Point-in-time view data derived from a playback.
///
/// Recomputed on every tick and on every reset. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RenderSnapshot {
    /// Identifier of the topic being played.
    pub topic_id: String,
    /// Display name of the topic.
    pub topic_name: String,
    /// Declared advance policy of the topic.
    pub policy: AdvancePolicy,
    /// Whether the playback clock is enabled.
    pub running: bool,
    /// Whether a terminal topic has reached its final phase.
    pub completed: bool,
    /// Number of phases in the topic.
    pub phase_count: u32,
    /// The active phase.
    pub phase: PhaseSummary,
    /// Current counter values keyed by counter name.
    pub counters: BTreeMap<String, f64>,
    /// Derived quantities keyed by name, computed from the counters.
    pub derived: BTreeMap<String, f64>,
    /// Clock ticks applied since the playback last started.
    #[ts(type = "number")]
    pub elapsed_ticks: u64,
    /// Labels of the most recently entered phases, oldest first.
    pub recent_phases: Vec<String>,
}

impl RenderSnapshot {
    /// Look up a counter value by name.
    pub fn counter(&self, name: &str) -> Option<f64> {
        self.counters.get(name).copied()
    }

    /// Look up a derived quantity by name.
    pub fn derived_value(&self, name: &str) -> Option<f64> {
        self.derived.get(name).copied()
    }
}

// ---------------------------------------------------------------------------
// Catalog records
// ---------------------------------------------------------------------------

/// A curriculum chapter grouping several simulations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Chapter {
    /// Chapter number (1-based).
    pub id: u32,
    /// Chapter title.
    pub title: String,
    /// Short chapter description.
    pub description: String,
    /// Topic headings covered by the chapter.
    pub topics: Vec<String>,
}

/// Catalog metadata for one simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationMeta {
    /// Stable identifier, shared with the topic id of the phase table.
    pub id: String,
    /// Chapter this simulation belongs to.
    pub chapter_id: u32,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Presentation style.
    pub kind: SimulationKind,
    /// Suggested study time, free text (e.g. "12 min").
    pub duration: String,
    /// Difficulty rating from 1 (easy) to 5 (hard).
    pub difficulty: u8,
    /// Key points to remember.
    pub key_points: Vec<String>,
}
