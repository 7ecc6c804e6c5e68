//! Enumeration types shared between the engine and the view.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Advance policy
// ---------------------------------------------------------------------------

/// What happens to the phase index when the clock ticks.
///
/// The policy is declared per topic and never inferred from the phase table.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AdvancePolicy {
    /// Wrap from the last phase back to the first.
    #[default]
    Cyclic,
    /// Stop at the last phase; further ticks leave the index unchanged.
    Terminal,
    /// Select any phase uniformly at random on each tick.
    Random,
}

impl AdvancePolicy {
    /// Return the lowercase name used in configuration and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cyclic => "cyclic",
            Self::Terminal => "terminal",
            Self::Random => "random",
        }
    }
}

impl core::fmt::Display for AdvancePolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Catalog classification
// ---------------------------------------------------------------------------

/// How a catalog entry presents itself to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum SimulationKind {
    /// A timed, self-running visualisation.
    Simulation,
    /// A guided experiment with discrete generations or trials.
    Experiment,
    /// A free-form explorable model.
    Interactive,
}
