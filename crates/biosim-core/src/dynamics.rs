//! Per-topic update rules that do not fit declarative effects.
//!
//! Most topics are pure data: phase entry effects and per-tick effects cover
//! increments, caps, toggles, and random perturbations. A few need branching
//! formulas (a predator population that shrinks only when it exceeds what its
//! prey can carry). Those topics attach a [`TopicDynamics`] implementation,
//! which the engine calls once per tick after all effects have been applied.

use rand::RngCore;

use crate::effects::Counters;

/// Mutable view of playback state handed to [`TopicDynamics::step`].
pub struct StepContext<'a> {
    /// Index of the phase that was just left.
    pub previous_index: u32,
    /// Index of the phase that was just entered.
    pub phase_index: u32,
    /// Name of the phase that was just entered.
    pub phase_name: &'a str,
    /// Ticks applied since the playback started, including this one.
    pub elapsed_ticks: u64,
    /// Counters after this tick's effects.
    pub counters: &'a mut Counters,
    /// Injected random source.
    pub rng: &'a mut dyn RngCore,
}

impl core::fmt::Debug for StepContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StepContext")
            .field("previous_index", &self.previous_index)
            .field("phase_index", &self.phase_index)
            .field("phase_name", &self.phase_name)
            .field("elapsed_ticks", &self.elapsed_ticks)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

/// A formula-based update rule run once per tick.
///
/// Implementations must only write counters the topic declares; the engine
/// re-applies counter bounds and rounding after the call.
pub trait TopicDynamics: core::fmt::Debug + Send + Sync {
    /// Update counters for the tick that just entered `ctx.phase_index`.
    fn step(&self, ctx: &mut StepContext<'_>);

    /// Counter names this rule reads or writes, checked when the topic is
    /// built.
    fn counters(&self) -> &[&'static str];
}
