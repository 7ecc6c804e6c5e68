//! Phase tables, playback clock, and snapshot projection for the BioSim
//! engine.
//!
//! A topic is an ordered list of timed phases. Playing it means walking the
//! list on a timer, updating a few counters on every step, and rendering a
//! snapshot the view can draw.
//!
//! # Modules
//!
//! - [`topic`] -- Phase tables and their validating builder.
//! - [`effects`] -- Counter declarations and per-phase effect directives.
//! - [`derive`] -- Derived quantities computed from counters.
//! - [`dynamics`] -- [`TopicDynamics`] hook for formula-based updates.
//! - [`clock`] -- Phase cursor with cyclic, terminal, and random policies.
//! - [`state`] -- Mutable per-instance playback state.
//! - [`engine`] -- Deterministic, timer-free playback state machine.
//! - [`projector`] -- Pure state-to-snapshot projection.
//! - [`playback`] -- Async driver with a chained single-shot timer.
//! - [`catalog`] -- Read-only chapter and simulation metadata.
//! - [`config`] -- Configuration loading from `biosim-config.yaml`.
//! - [`topics`] -- The nineteen built-in topics.
//!
//! [`TopicDynamics`]: dynamics::TopicDynamics

pub mod catalog;
pub mod clock;
pub mod config;
pub mod derive;
pub mod dynamics;
pub mod effects;
pub mod engine;
pub mod playback;
pub mod projector;
pub mod state;
pub mod topic;
pub mod topics;

pub use engine::{PlaybackEngine, TickOutcome};
pub use playback::{Playback, PlaybackError, PlaybackSettings};
pub use topic::{Phase, Topic, TopicBuilder, TopicError};
pub use topics::{LibraryError, TopicLibrary};
