//! Async playback driver.
//!
//! A [`Playback`] wraps a [`PlaybackEngine`] with a tokio timer so a topic
//! animates on its own. The driver is a chained single-shot timer: it sleeps
//! for the dwell of the phase that is active *now*, ticks once, then reads the
//! next dwell. There is never more than one pending timer per instance.
//!
//! # Cancellation
//!
//! The engine and an epoch counter sit behind one lock. Stopping bumps the
//! epoch and resets the engine while holding that lock, and the driver
//! re-checks the epoch under the same lock before every tick. Once
//! [`Playback::set_running`]`(false)` returns, no tick from an earlier run can
//! be applied. Dropping a [`Playback`] has the same effect.
//!
//! # Observation
//!
//! [`Playback::snapshot`] projects the current state on demand, and
//! [`Playback::subscribe`] hands out a `watch` receiver that is updated after
//! every tick and every reset.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use biosim_types::{PlaybackId, RenderSnapshot};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::engine::{PlaybackEngine, TickOutcome};
use crate::topic::{Topic, TopicError};

/// Errors raised by the async driver.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// The topic could not be played.
    #[error("invalid topic: {source}")]
    Topic {
        /// The underlying topic error.
        #[from]
        source: TopicError,
    },

    /// Playback settings are out of range.
    #[error("invalid playback settings: {reason}")]
    InvalidSettings {
        /// Explanation.
        reason: String,
    },

    /// The clock was started outside a tokio runtime.
    #[error("playback requires a running tokio runtime")]
    NoRuntime,
}

/// Driver tuning, loaded from the `playback` config section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaybackSettings {
    /// Multiplier applied to every phase dwell (1.0 = real time).
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// Shortest sleep the driver will schedule, in milliseconds.
    #[serde(default = "default_min_dwell_ms")]
    pub min_dwell_ms: u64,

    /// Seed for the random source. `None` seeds from the operating system.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            time_scale: default_time_scale(),
            min_dwell_ms: default_min_dwell_ms(),
            seed: None,
        }
    }
}

impl PlaybackSettings {
    /// Check that the settings can schedule timers.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidSettings`] if `time_scale` is not a
    /// positive finite number or `min_dwell_ms` is zero.
    pub fn validate(&self) -> Result<(), PlaybackError> {
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return Err(PlaybackError::InvalidSettings {
                reason: format!("time_scale must be positive, got {}", self.time_scale),
            });
        }
        if self.min_dwell_ms == 0 {
            return Err(PlaybackError::InvalidSettings {
                reason: "min_dwell_ms must be positive".to_owned(),
            });
        }
        Ok(())
    }

    /// Real sleep for a phase with the given dwell.
    ///
    /// Returns the scaled duration and whether the floor was applied.
    pub fn scaled(&self, dwell: Duration) -> (Duration, bool) {
        let floor = Duration::from_millis(self.min_dwell_ms);
        let scaled = Duration::try_from_secs_f64(dwell.as_secs_f64() * self.time_scale)
            .unwrap_or(Duration::MAX);
        if scaled < floor {
            (floor, true)
        } else {
            (scaled, false)
        }
    }
}

const fn default_time_scale() -> f64 {
    1.0
}

const fn default_min_dwell_ms() -> u64 {
    10
}

struct Inner {
    engine: PlaybackEngine,
    epoch: u64,
    task: Option<JoinHandle<()>>,
    started_at: Option<DateTime<Utc>>,
}

struct Shared {
    id: PlaybackId,
    settings: PlaybackSettings,
    inner: Mutex<Inner>,
    snapshots: watch::Sender<RenderSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A self-driving playback of one topic.
pub struct Playback {
    shared: Arc<Shared>,
}

impl core::fmt::Debug for Playback {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Playback")
            .field("id", &self.shared.id)
            .field("settings", &self.shared.settings)
            .finish_non_exhaustive()
    }
}

impl Playback {
    /// Create a stopped playback for `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidSettings`] for unusable settings, or
    /// [`PlaybackError::Topic`] if the topic cannot be played.
    pub fn new(topic: Arc<Topic>, settings: PlaybackSettings) -> Result<Self, PlaybackError> {
        settings.validate()?;
        let engine = match settings.seed {
            Some(seed) => PlaybackEngine::seeded(topic, seed)?,
            None => PlaybackEngine::new(topic)?,
        };
        Ok(Self::from_engine(engine, settings))
    }

    /// Wrap an existing engine. The engine is stopped first.
    pub fn from_engine(mut engine: PlaybackEngine, settings: PlaybackSettings) -> Self {
        let _ = engine.stop();
        let (snapshots, _rx) = watch::channel(engine.snapshot());
        let id = PlaybackId::new();
        debug!(playback_id = %id, topic = engine.topic().id(), "Playback created");
        Self {
            shared: Arc::new(Shared {
                id,
                settings,
                inner: Mutex::new(Inner {
                    engine,
                    epoch: 0,
                    task: None,
                    started_at: None,
                }),
                snapshots,
            }),
        }
    }

    /// Instance identifier used in log fields.
    pub fn id(&self) -> PlaybackId {
        self.shared.id
    }

    /// Driver settings.
    pub fn settings(&self) -> &PlaybackSettings {
        &self.shared.settings
    }

    /// Whether the clock is enabled.
    pub fn is_running(&self) -> bool {
        self.shared.lock().engine.is_running()
    }

    /// When the current run started, if running.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.shared.lock().started_at
    }

    /// Current render snapshot.
    pub fn snapshot(&self) -> RenderSnapshot {
        self.shared.lock().engine.snapshot()
    }

    /// Receiver that observes every tick and reset.
    pub fn subscribe(&self) -> watch::Receiver<RenderSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Enable or disable the clock. Idempotent in both directions.
    ///
    /// Disabling resets the state and cancels the pending timer before
    /// returning.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::NoRuntime`] when enabling outside a tokio
    /// runtime. The playback stays stopped in that case.
    pub fn set_running(&self, running: bool) -> Result<(), PlaybackError> {
        if running {
            self.start()
        } else {
            self.stop();
            Ok(())
        }
    }

    fn start(&self) -> Result<(), PlaybackError> {
        let handle = Handle::try_current().map_err(|_err| PlaybackError::NoRuntime)?;
        let mut inner = self.shared.lock();
        if !inner.engine.start() {
            return Ok(());
        }
        let now = Utc::now();
        inner.started_at = Some(now);
        let epoch = inner.epoch;
        let topic = inner.engine.topic().id().to_owned();
        let span = info_span!("playback", playback_id = %self.shared.id, topic = %topic);
        let task = handle.spawn(drive(Arc::clone(&self.shared), epoch).instrument(span));
        inner.task = Some(task);
        let snapshot = inner.engine.snapshot();
        self.shared.snapshots.send_replace(snapshot);
        info!(
            playback_id = %self.shared.id,
            topic = %topic,
            started_at = %now,
            "Playback started"
        );
        Ok(())
    }

    fn stop(&self) {
        let mut inner = self.shared.lock();
        halt(&mut inner);
        let was_running = inner.engine.stop();
        let snapshot = inner.engine.snapshot();
        self.shared.snapshots.send_replace(snapshot);
        if was_running {
            info!(
                playback_id = %self.shared.id,
                topic = inner.engine.topic().id(),
                "Playback stopped"
            );
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        halt(&mut inner);
    }
}

/// Invalidate the running epoch and cancel its timer.
fn halt(inner: &mut Inner) {
    inner.epoch = inner.epoch.wrapping_add(1);
    inner.started_at = None;
    if let Some(task) = inner.task.take() {
        task.abort();
    }
}

/// Chained single-shot timer loop for one epoch.
async fn drive(shared: Arc<Shared>, epoch: u64) {
    loop {
        let sleep_for = {
            let inner = shared.lock();
            if inner.epoch != epoch || !inner.engine.is_running() {
                return;
            }
            let dwell = inner.engine.current_dwell();
            let (sleep_for, floored) = shared.settings.scaled(dwell);
            if floored {
                warn!(
                    dwell_ms = u64::try_from(dwell.as_millis()).unwrap_or(u64::MAX),
                    min_dwell_ms = shared.settings.min_dwell_ms,
                    "Scaled dwell below minimum, using floor"
                );
            }
            sleep_for
        };

        tokio::time::sleep(sleep_for).await;

        let mut inner = shared.lock();
        if inner.epoch != epoch {
            return;
        }
        let outcome = inner.engine.tick();
        let snapshot = inner.engine.snapshot();
        let halted = inner.engine.is_halted();
        shared.snapshots.send_replace(snapshot);
        match outcome {
            TickOutcome::Idle | TickOutcome::Halted { .. } => return,
            TickOutcome::Advanced { .. } if halted => {
                info!(
                    elapsed_ticks = inner.engine.state().elapsed_ticks,
                    "Terminal phase reached"
                );
                inner.task = None;
                return;
            }
            TickOutcome::Advanced { .. } => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = PlaybackSettings::default();
        assert_eq!(settings.time_scale, 1.0);
        assert_eq!(settings.min_dwell_ms, 10);
        assert_eq!(settings.seed, None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_time_scale() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let settings = PlaybackSettings {
                time_scale: bad,
                ..PlaybackSettings::default()
            };
            assert!(matches!(
                settings.validate(),
                Err(PlaybackError::InvalidSettings { .. })
            ));
        }
    }

    #[test]
    fn rejects_zero_dwell_floor() {
        let settings = PlaybackSettings {
            min_dwell_ms: 0,
            ..PlaybackSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(PlaybackError::InvalidSettings { .. })
        ));
    }

    #[test]
    fn scaling_applies_floor() {
        let settings = PlaybackSettings {
            time_scale: 0.001,
            min_dwell_ms: 50,
            seed: None,
        };
        assert_eq!(
            settings.scaled(Duration::from_millis(2000)),
            (Duration::from_millis(50), true)
        );
        let settings = PlaybackSettings {
            time_scale: 0.5,
            ..settings
        };
        assert_eq!(
            settings.scaled(Duration::from_millis(2000)),
            (Duration::from_millis(1000), false)
        );
    }
}
