//! Shared type definitions for the BioSim playback engine.
//!
//! Everything a presentation layer needs to draw a running simulation lives
//! here. Types flow downstream to `TypeScript` via `ts-rs` so the browser view
//! renders exactly what the engine produces.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for playback instances
//! - [`enums`] -- Advance policies and catalog classifications
//! - [`structs`] -- Render snapshots and read-only catalog records

pub mod enums;
pub mod ids;
pub mod structs;

pub use enums::{AdvancePolicy, SimulationKind};
pub use ids::PlaybackId;
pub use structs::{Chapter, PhaseSummary, RenderSnapshot, SimulationMeta};
