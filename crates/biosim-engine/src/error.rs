//! Error types for the playback binary.
//!
//! [`EngineError`] wraps every failure mode of startup and playback so
//! `main` can propagate with `?`.

/// Top-level error for the playback binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: biosim_core::config::ConfigError,
    },

    /// The bundled catalog could not be loaded.
    #[error("catalog error: {source}")]
    Catalog {
        /// The underlying catalog error.
        #[from]
        source: biosim_core::catalog::CatalogError,
    },

    /// The requested topic is unknown or malformed.
    #[error("library error: {source}")]
    Library {
        /// The underlying library error.
        #[from]
        source: biosim_core::LibraryError,
    },

    /// The playback driver refused to start.
    #[error("playback error: {source}")]
    Playback {
        /// The underlying playback error.
        #[from]
        source: biosim_core::PlaybackError,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
