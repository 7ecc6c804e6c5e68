//! Mutable per-instance playback state.

use std::collections::VecDeque;

use crate::effects::Counters;
use crate::topic::Topic;

/// Everything that changes while a topic plays.
///
/// While `running` is false the state is always the topic's initial state:
/// phase 0, initial counters, no elapsed ticks, empty history.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    /// Whether the clock is enabled.
    pub running: bool,
    /// Active phase index, always `< topic.phase_count()`.
    pub phase_index: u32,
    /// Current counter values.
    pub counters: Counters,
    /// Ticks applied since the playback started.
    pub elapsed_ticks: u64,
    /// Indices of the most recently entered phases, oldest first.
    pub recent: VecDeque<u32>,
}

impl PlaybackState {
    /// The stopped, initial state of a topic.
    pub fn initial(topic: &Topic) -> Self {
        Self {
            running: false,
            phase_index: 0,
            counters: Counters::from_specs(topic.counters()),
            elapsed_ticks: 0,
            recent: VecDeque::with_capacity(topic.history_len()),
        }
    }

    /// Record an entered phase, keeping at most `limit` entries.
    pub fn remember(&mut self, index: u32, limit: usize) {
        if limit == 0 {
            return;
        }
        while self.recent.len() >= limit {
            let _ = self.recent.pop_front();
        }
        self.recent.push_back(index);
    }

    /// Whether this state equals the topic's initial state, ignoring the
    /// `running` flag.
    pub fn is_pristine(&self, topic: &Topic) -> bool {
        let initial = Self::initial(topic);
        self.phase_index == initial.phase_index
            && self.counters == initial.counters
            && self.elapsed_ticks == 0
            && self.recent.is_empty()
    }
}
