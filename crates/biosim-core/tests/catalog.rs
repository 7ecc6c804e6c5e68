//! Catalog fixture against the built-in topic library.
//!
//! Simulation identifiers double as topic identifiers, so a host catalog and
//! the library must agree on ids and display names.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::path::Path;

use biosim_core::catalog::{CatalogProvider, StaticCatalog};
use biosim_core::{LibraryError, TopicLibrary};

fn fixture() -> StaticCatalog {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/catalog.yaml");
    StaticCatalog::from_file(&path).unwrap()
}

#[test]
fn every_topic_has_catalog_metadata() {
    let library = TopicLibrary::builtin().unwrap();
    let catalog = fixture();
    for topic in library.topics() {
        let meta = catalog.simulation(topic.id()).unwrap();
        assert_eq!(meta.name, topic.name(), "{}", topic.id());
    }
}

#[test]
fn catalog_entries_without_phase_table_are_not_found() {
    let library = TopicLibrary::builtin().unwrap();
    let catalog = fixture();
    let missing: Vec<&str> = catalog
        .simulations()
        .iter()
        .map(|s| s.id.as_str())
        .filter(|id| library.get(id).is_err())
        .collect();
    assert_eq!(missing.len(), catalog.simulations().len() - library.len());
    for id in missing {
        assert!(matches!(
            library.get(id),
            Err(LibraryError::UnknownTopic { .. })
        ));
    }
}

#[test]
fn chapters_list_their_simulations() {
    let catalog = fixture();
    for chapter in catalog.chapters() {
        assert!(
            !catalog.simulations_in(chapter.id).is_empty(),
            "chapter {} has no simulations",
            chapter.id
        );
    }
}
