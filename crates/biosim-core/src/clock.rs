//! Phase clock: the cursor that walks a topic's phase table.
//!
//! The clock is the single source of truth for which phase is active. It
//! knows nothing about timers or counters; it only answers "where does the
//! next tick land?" under the topic's declared [`AdvancePolicy`].
//!
//! # Design Principles
//!
//! - The index is always in `0..phase_count`. Construction rejects empty
//!   tables so that invariant holds from the first observation.
//! - Wrapping, clamping, and random selection are explicit policies; the
//!   clock never guesses from the shape of the table.
//! - Index arithmetic is checked; nothing silently overflows.

use biosim_types::AdvancePolicy;
use rand::{Rng, RngCore};

/// Errors that can occur during clock construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// The phase table is empty.
    #[error("phase clock needs at least one phase")]
    EmptyPhaseTable,

    /// A restored index lies outside the phase table.
    #[error("phase index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        /// Requested index.
        index: u32,
        /// Number of phases.
        len: u32,
    },

    /// The lead-in covers the whole phase table.
    #[error("lead-in of {lead_in} leaves no phase to revisit (len {len})")]
    LeadInTooLong {
        /// Requested lead-in.
        lead_in: u32,
        /// Number of phases.
        len: u32,
    },
}

/// Where a tick moved the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The clock entered a new phase (possibly the same index under the
    /// random policy).
    Moved {
        /// Index before the tick.
        from: u32,
        /// Index after the tick.
        to: u32,
        /// Whether a cyclic clock passed from the last phase back to the
        /// first phase after the lead-in.
        wrapped: bool,
    },
    /// A terminal clock is parked on its last phase.
    Halted {
        /// The last phase index.
        at: u32,
    },
}

/// Cursor over a phase table.
///
/// Phases below `lead_in` are visited only from the start or after a reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseClock {
    index: u32,
    len: u32,
    policy: AdvancePolicy,
    lead_in: u32,
}

impl PhaseClock {
    /// Create a clock at phase 0.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::EmptyPhaseTable`] if `len` is zero.
    pub const fn new(len: u32, policy: AdvancePolicy) -> Result<Self, ClockError> {
        if len == 0 {
            return Err(ClockError::EmptyPhaseTable);
        }
        Ok(Self {
            index: 0,
            len,
            policy,
            lead_in: 0,
        })
    }

    /// Create a clock at an explicit index (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::EmptyPhaseTable`] if `len` is zero, or
    /// [`ClockError::IndexOutOfBounds`] if `index >= len`.
    pub const fn from_parts(index: u32, len: u32, policy: AdvancePolicy) -> Result<Self, ClockError> {
        if len == 0 {
            return Err(ClockError::EmptyPhaseTable);
        }
        if index >= len {
            return Err(ClockError::IndexOutOfBounds { index, len });
        }
        Ok(Self {
            index,
            len,
            policy,
            lead_in: 0,
        })
    }

    /// Keep the first `lead_in` phases out of the cyclic and random rotation.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::LeadInTooLong`] if `lead_in >= len`.
    pub const fn with_lead_in(mut self, lead_in: u32) -> Result<Self, ClockError> {
        if lead_in >= self.len {
            return Err(ClockError::LeadInTooLong {
                lead_in,
                len: self.len,
            });
        }
        self.lead_in = lead_in;
        Ok(self)
    }

    /// Current phase index.
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Number of phases.
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// Always false; kept for API symmetry with collections.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Declared policy.
    pub const fn policy(&self) -> AdvancePolicy {
        self.policy
    }

    /// First index of the rotation.
    pub const fn lead_in(&self) -> u32 {
        self.lead_in
    }

    /// Index of the last phase.
    pub const fn last(&self) -> u32 {
        self.len.saturating_sub(1)
    }

    /// Whether a terminal clock can no longer move.
    pub fn is_halted(&self) -> bool {
        self.policy == AdvancePolicy::Terminal && self.index == self.last()
    }

    /// Move to the next phase under the declared policy.
    ///
    /// The random source is only consulted by [`AdvancePolicy::Random`].
    pub fn advance(&mut self, rng: &mut dyn RngCore) -> Advance {
        let from = self.index;
        match self.policy {
            AdvancePolicy::Cyclic => {
                let next = from.checked_add(1).unwrap_or(0);
                let wrapped = next >= self.len;
                self.index = if wrapped { self.lead_in } else { next };
                Advance::Moved {
                    from,
                    to: self.index,
                    wrapped,
                }
            }
            AdvancePolicy::Terminal => {
                if from >= self.last() {
                    self.index = self.last();
                    return Advance::Halted { at: self.index };
                }
                self.index = from.saturating_add(1);
                Advance::Moved {
                    from,
                    to: self.index,
                    wrapped: false,
                }
            }
            AdvancePolicy::Random => {
                self.index = rng.random_range(self.lead_in..self.len);
                Advance::Moved {
                    from,
                    to: self.index,
                    wrapped: false,
                }
            }
        }
    }

    /// Return to phase 0.
    pub const fn reset(&mut self) {
        self.index = 0;
    }
}
