//! Timer-free playback engine.
//!
//! [`PlaybackEngine`] is the deterministic core that the async driver in
//! [`crate::playback`] wraps. It owns a topic, a [`PhaseClock`], the mutable
//! [`PlaybackState`], and the injected random source. Every transition is a
//! plain method call, so tests can drive it tick by tick without a runtime.
//!
//! # Tick order
//!
//! 1. advance the clock under the topic's policy
//! 2. increment `elapsed_ticks`
//! 3. apply the entered phase's entry effects
//! 4. apply the topic's per-tick effects
//! 5. run the dynamics rule, if any
//! 6. settle counters (rounding, then bounds)
//! 7. record the entered phase in the history

use std::sync::Arc;
use std::time::Duration;

use biosim_types::RenderSnapshot;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use tracing::debug;

use crate::clock::{Advance, ClockError, PhaseClock};
use crate::dynamics::StepContext;
use crate::effects::apply_effects;
use crate::projector::project;
use crate::state::PlaybackState;
use crate::topic::{Topic, TopicError};

/// What a call to [`PlaybackEngine::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The clock entered a phase and counters were updated.
    Advanced {
        /// Index before the tick.
        from: u32,
        /// Index after the tick.
        to: u32,
        /// Whether a cyclic topic wrapped back to the start of its rotation.
        wrapped: bool,
    },
    /// A terminal topic is parked on its last phase; nothing changed.
    Halted {
        /// The last phase index.
        at: u32,
    },
    /// The engine is stopped; nothing changed.
    Idle,
}

/// Deterministic playback state machine for one topic.
pub struct PlaybackEngine {
    topic: Arc<Topic>,
    clock: PhaseClock,
    state: PlaybackState,
    rng: Box<dyn RngCore + Send>,
}

impl core::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("topic", &self.topic.id())
            .field("clock", &self.clock)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl PlaybackEngine {
    /// Create a stopped engine seeded from the operating system.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::EmptyPhaseTable`] if the topic has no phases or
    /// [`TopicError::InvalidLeadIn`] if its lead-in covers every phase.
    /// Topics built through the builder never do either.
    pub fn new(topic: Arc<Topic>) -> Result<Self, TopicError> {
        Self::with_rng(topic, Box::new(SmallRng::from_os_rng()))
    }

    /// Create a stopped engine with a deterministic seed.
    ///
    /// # Errors
    ///
    /// See [`PlaybackEngine::new`].
    pub fn seeded(topic: Arc<Topic>, seed: u64) -> Result<Self, TopicError> {
        Self::with_rng(topic, Box::new(SmallRng::seed_from_u64(seed)))
    }

    /// Create a stopped engine drawing randomness from `rng`.
    ///
    /// # Errors
    ///
    /// See [`PlaybackEngine::new`].
    pub fn with_rng(topic: Arc<Topic>, rng: Box<dyn RngCore + Send>) -> Result<Self, TopicError> {
        let clock = PhaseClock::new(topic.phase_count(), topic.policy())
            .and_then(|clock| clock.with_lead_in(topic.lead_in()))
            .map_err(|err| match err {
                ClockError::LeadInTooLong { lead_in, len } => TopicError::InvalidLeadIn {
                    topic: topic.id().to_owned(),
                    lead_in,
                    phases: usize::try_from(len).unwrap_or(usize::MAX),
                },
                ClockError::EmptyPhaseTable | ClockError::IndexOutOfBounds { .. } => {
                    TopicError::EmptyPhaseTable {
                        topic: topic.id().to_owned(),
                    }
                }
            })?;
        let state = PlaybackState::initial(&topic);
        Ok(Self {
            topic,
            clock,
            state,
            rng,
        })
    }

    /// The topic being played.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Shared handle to the topic.
    pub fn topic_arc(&self) -> Arc<Topic> {
        Arc::clone(&self.topic)
    }

    /// Current state.
    pub const fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Whether the clock is enabled.
    pub const fn is_running(&self) -> bool {
        self.state.running
    }

    /// Whether a terminal topic is parked on its last phase.
    pub fn is_halted(&self) -> bool {
        self.clock.is_halted()
    }

    /// Enable the clock. Returns `false` if it was already running.
    pub const fn start(&mut self) -> bool {
        if self.state.running {
            return false;
        }
        self.state.running = true;
        true
    }

    /// Disable the clock and return to the initial state.
    ///
    /// Returns `false` if the engine was already stopped.
    pub fn stop(&mut self) -> bool {
        let was_running = self.state.running;
        self.reset();
        was_running
    }

    /// Return to the stopped initial state.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.state = PlaybackState::initial(&self.topic);
    }

    /// Dwell of the active phase.
    pub fn current_dwell(&self) -> Duration {
        self.topic
            .phase(self.clock.index())
            .map_or(Duration::ZERO, crate::topic::Phase::dwell)
    }

    /// Apply one tick.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.running {
            return TickOutcome::Idle;
        }

        let (from, to, wrapped) = match self.clock.advance(&mut *self.rng) {
            Advance::Halted { at } => return TickOutcome::Halted { at },
            Advance::Moved { from, to, wrapped } => (from, to, wrapped),
        };

        self.state.phase_index = to;
        self.state.elapsed_ticks = self.state.elapsed_ticks.saturating_add(1);

        let topic = Arc::clone(&self.topic);
        let specs = topic.counters();
        if let Some(phase) = topic.phase(to) {
            apply_effects(&phase.effects, specs, &mut self.state.counters, &mut *self.rng);
        }
        apply_effects(
            topic.tick_effects(),
            specs,
            &mut self.state.counters,
            &mut *self.rng,
        );

        if let Some(dynamics) = topic.dynamics() {
            let phase_name = topic.phase(to).map_or("", |p| p.name.as_str());
            let mut ctx = StepContext {
                previous_index: from,
                phase_index: to,
                phase_name,
                elapsed_ticks: self.state.elapsed_ticks,
                counters: &mut self.state.counters,
                rng: &mut *self.rng,
            };
            dynamics.step(&mut ctx);
        }

        self.state.counters.settle(specs);
        self.state.remember(to, topic.history_len());

        debug!(
            topic = topic.id(),
            from,
            to,
            wrapped,
            elapsed_ticks = self.state.elapsed_ticks,
            "Phase advanced"
        );

        TickOutcome::Advanced { from, to, wrapped }
    }

    /// Project the current state into a render snapshot.
    pub fn snapshot(&self) -> RenderSnapshot {
        project(&self.topic, &self.state)
    }
}
