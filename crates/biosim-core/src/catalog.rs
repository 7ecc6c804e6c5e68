//! Read-only chapter and simulation metadata.
//!
//! The engine never owns catalog data; hosts supply it through a
//! [`CatalogProvider`]. [`StaticCatalog`] is the in-memory implementation,
//! built from records or loaded from a YAML document.

use std::path::Path;

use biosim_types::{Chapter, SimulationMeta};
use serde::Deserialize;

/// Errors raised while loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Failed to read the catalog file from disk.
    #[error("failed to read catalog file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The catalog document is not valid YAML or has the wrong shape.
    #[error("failed to parse catalog YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        #[from]
        source: serde_yml::Error,
    },

    /// A simulation refers to a chapter that does not exist.
    #[error("simulation {simulation} refers to unknown chapter {chapter_id}")]
    UnknownChapter {
        /// Simulation identifier.
        simulation: String,
        /// Missing chapter number.
        chapter_id: u32,
    },

    /// Two records share an identifier.
    #[error("catalog declares {id} more than once")]
    Duplicate {
        /// The duplicated identifier.
        id: String,
    },
}

/// Lookup interface for catalog metadata.
pub trait CatalogProvider: Send + Sync {
    /// Chapter by number.
    fn chapter(&self, id: u32) -> Option<&Chapter>;

    /// Simulation by identifier.
    fn simulation(&self, id: &str) -> Option<&SimulationMeta>;

    /// Simulations of a chapter, in catalog order.
    fn simulations_in(&self, chapter_id: u32) -> Vec<&SimulationMeta>;
}

/// In-memory catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StaticCatalog {
    #[serde(default)]
    chapters: Vec<Chapter>,
    #[serde(default)]
    simulations: Vec<SimulationMeta>,
}

impl StaticCatalog {
    /// Build a catalog from host-supplied records.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Duplicate`] or [`CatalogError::UnknownChapter`]
    /// for inconsistent records.
    pub fn new(
        chapters: Vec<Chapter>,
        simulations: Vec<SimulationMeta>,
    ) -> Result<Self, CatalogError> {
        let catalog = Self {
            chapters,
            simulations,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse a catalog from YAML with top-level `chapters` and `simulations`
    /// lists.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Yaml`] for malformed input, or a consistency
    /// error as in [`StaticCatalog::new`].
    pub fn parse(yaml: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_yml::from_str(yaml)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, otherwise as
    /// [`StaticCatalog::parse`].
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// All chapters in order.
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// All simulations in order.
    pub fn simulations(&self) -> &[SimulationMeta] {
        &self.simulations
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = std::collections::BTreeSet::new();
        for chapter in &self.chapters {
            if !seen.insert(format!("chapter {}", chapter.id)) {
                return Err(CatalogError::Duplicate {
                    id: format!("chapter {}", chapter.id),
                });
            }
        }
        for sim in &self.simulations {
            if !seen.insert(sim.id.clone()) {
                return Err(CatalogError::Duplicate { id: sim.id.clone() });
            }
            if self.chapter(sim.chapter_id).is_none() {
                return Err(CatalogError::UnknownChapter {
                    simulation: sim.id.clone(),
                    chapter_id: sim.chapter_id,
                });
            }
        }
        Ok(())
    }
}

impl CatalogProvider for StaticCatalog {
    fn chapter(&self, id: u32) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    fn simulation(&self, id: &str) -> Option<&SimulationMeta> {
        self.simulations.iter().find(|s| s.id == id)
    }

    fn simulations_in(&self, chapter_id: u32) -> Vec<&SimulationMeta> {
        self.simulations
            .iter()
            .filter(|s| s.chapter_id == chapter_id)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use biosim_types::SimulationKind;

    use super::*;

    const FIXTURE: &str = include_str!("../tests/fixtures/catalog.yaml");

    fn fixture() -> StaticCatalog {
        StaticCatalog::parse(FIXTURE).unwrap()
    }

    #[test]
    fn fixture_catalog_loads() {
        let catalog = fixture();
        assert_eq!(catalog.chapters().len(), 6);
        assert_eq!(catalog.chapter(1).unwrap().title, "Life Processes");
        let sim = catalog.simulation("cell-division").unwrap();
        assert_eq!(sim.chapter_id, 1);
        assert_eq!(sim.kind, SimulationKind::Simulation);
        assert!(!sim.key_points.is_empty());
    }

    #[test]
    fn simulations_grouped_by_chapter() {
        let catalog = fixture();
        let ids: Vec<&str> = catalog
            .simulations_in(4)
            .into_iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec![
                "mendel-experiments",
                "dna-inheritance",
                "genetic-engineering",
                "evolution-mechanisms"
            ]
        );
    }

    #[test]
    fn unknown_ids_resolve_to_none() {
        let catalog = fixture();
        assert!(catalog.chapter(99).is_none());
        assert!(catalog.simulation("photosynthesis-2").is_none());
        assert!(catalog.simulations_in(99).is_empty());
    }

    #[test]
    fn records_can_be_supplied_directly() {
        let chapter = Chapter {
            id: 7,
            title: "Extras".to_owned(),
            description: String::new(),
            topics: vec!["Osmosis".to_owned()],
        };
        let sim = SimulationMeta {
            id: "osmosis".to_owned(),
            chapter_id: 7,
            name: "Osmosis".to_owned(),
            description: String::new(),
            kind: SimulationKind::Interactive,
            duration: "5 min".to_owned(),
            difficulty: 2,
            key_points: Vec::new(),
        };
        let catalog = StaticCatalog::new(vec![chapter.clone()], vec![sim.clone()]).unwrap();
        assert_eq!(catalog.simulations_in(7), vec![&sim]);

        let err = StaticCatalog::new(vec![chapter], vec![sim.clone(), sim]).unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate { ref id } if id == "osmosis"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = StaticCatalog::from_file(Path::new("/nonexistent/catalog.yaml")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn dangling_chapter_is_rejected() {
        let yaml = r#"
chapters: []
simulations:
  - id: orphan
    chapter_id: 3
    name: "Orphan"
    description: ""
    kind: simulation
    duration: "1 min"
    difficulty: 1
    key_points: []
"#;
        assert!(matches!(
            StaticCatalog::parse(yaml),
            Err(CatalogError::UnknownChapter { chapter_id: 3, .. })
        ));
    }
}
