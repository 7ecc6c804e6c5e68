//! Built-in topic library.
//!
//! Nineteen phase tables, one per animated simulation, keyed by the same
//! identifiers a catalog uses and grouped by chapter:
//!
//! - [`life_processes`] -- photosynthesis through mitosis
//! - [`control`] -- reflex arc, brain regions, tropisms
//! - [`reproduction`] -- pollination, the human cycle, asexual strategies
//! - [`heredity`] -- Mendel's crosses, inheritance, genetic engineering,
//!   natural selection
//! - [`environment`] -- food chains, ecosystem balance, pollution

pub mod control;
pub mod environment;
pub mod heredity;
pub mod life_processes;
pub mod reproduction;

use std::sync::Arc;

use crate::topic::{Topic, TopicError};

/// Errors raised by the topic library.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// No topic with the given identifier exists.
    #[error("simulation not found: {id}")]
    UnknownTopic {
        /// The requested identifier.
        id: String,
    },

    /// A built-in table failed validation.
    #[error("built-in topic is invalid: {source}")]
    Topic {
        /// The underlying validation error.
        #[from]
        source: TopicError,
    },
}

/// An ordered, immutable set of topics addressable by identifier.
#[derive(Debug, Clone, Default)]
pub struct TopicLibrary {
    topics: Vec<Arc<Topic>>,
}

impl TopicLibrary {
    /// Build every built-in topic.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::Topic`] if a table fails validation.
    pub fn builtin() -> Result<Self, LibraryError> {
        let mut topics = life_processes::all()?;
        topics.extend(control::all()?);
        topics.extend(reproduction::all()?);
        topics.extend(heredity::all()?);
        topics.extend(environment::all()?);
        Ok(Self { topics })
    }

    /// Wrap host-supplied topics.
    pub const fn new(topics: Vec<Arc<Topic>>) -> Self {
        Self { topics }
    }

    /// Resolve a topic by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::UnknownTopic`] if no topic has that id.
    pub fn get(&self, id: &str) -> Result<Arc<Topic>, LibraryError> {
        self.topics
            .iter()
            .find(|t| t.id() == id)
            .map(Arc::clone)
            .ok_or_else(|| LibraryError::UnknownTopic { id: id.to_owned() })
    }

    /// Identifiers in library order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(|t| t.id())
    }

    /// All topics in library order.
    pub fn topics(&self) -> &[Arc<Topic>] {
        &self.topics
    }

    /// Number of topics.
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Whether the library is empty.
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
