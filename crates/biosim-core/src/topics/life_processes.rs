//! Chapter 1: Life Processes.

use std::sync::Arc;

use crate::derive::{Derived, Expr};
use crate::effects::{CounterSpec, Effect};
use crate::topic::{Phase, Topic, TopicError};

/// Light absorption through glucose production, 2 s per step.
pub fn photosynthesis() -> Result<Topic, TopicError> {
    Topic::builder("photosynthesis", "Advanced Photosynthesis Process")
        .description("Light energy, water, and carbon dioxide combine into glucose and oxygen.")
        .phase(Phase::new(
            "light_absorption",
            "Light Absorption",
            "Chlorophyll absorbs sunlight energy",
            2000,
        ))
        .phase(Phase::new(
            "water_uptake",
            "Water Uptake",
            "Roots absorb water from soil",
            2000,
        ))
        .phase(Phase::new(
            "co2_intake",
            "CO₂ Intake",
            "Stomata take in carbon dioxide",
            2000,
        ))
        .phase(Phase::new(
            "glucose_production",
            "Glucose Production",
            "Light energy converts CO₂ + H₂O → Glucose + O₂",
            2000,
        ))
        .build()
}

/// Glycolysis, Krebs cycle, electron transport; energy accrues 25 per tick.
pub fn respiration() -> Result<Topic, TopicError> {
    Topic::builder("respiration", "Cellular Respiration Pathway")
        .description("Glucose is broken down step by step to release ATP.")
        .phase(
            Phase::new("glycolysis", "Glycolysis", "Glucose splits into pyruvate", 2500)
                .with_details(["Location: Cytoplasm", "Yield: 2 ATP"]),
        )
        .phase(
            Phase::new(
                "krebs_cycle",
                "Krebs Cycle",
                "Acetyl-CoA is oxidised to CO₂",
                2500,
            )
            .with_details(["Location: Mitochondria", "Yield: 2 ATP"]),
        )
        .phase(
            Phase::new(
                "electron_transport",
                "Electron Transport",
                "NADH and FADH₂ drive ATP synthase",
                2500,
            )
            .with_details(["Location: Mitochondria", "Yield: 32 ATP"]),
        )
        .counter(CounterSpec::new("energy_level", 0.0).bounded(0.0, 100.0))
        .every_tick(Effect::add("energy_level", 25.0))
        .build()
}

/// Alternating diastole and systole at one beat per second.
pub fn heart_circulation() -> Result<Topic, TopicError> {
    Topic::builder("heart-circulation", "3D Heart and Circulation System")
        .description("The cardiac cycle pumps blood through four circulation stages.")
        .phase(
            Phase::new("diastole", "Diastole", "Heart relaxes", 1000)
                .with_details(["Blood pressure: 80/60"]),
        )
        .phase(
            Phase::new("systole", "Systole", "Heart contracts", 1000)
                .with_details(["Blood pressure: 120/80"]),
        )
        .counter(CounterSpec::new("blood_flow_stage", 0.0))
        .every_tick(Effect::cycle("blood_flow_stage", 4, 0))
        .build()
}

/// Five digestive stages with heterogeneous dwell times.
pub fn digestive_system() -> Result<Topic, TopicError> {
    Topic::builder("digestive-system", "Complete Digestive Process")
        .description("Food moves through the tract while enzymes break it down.")
        .phase(
            Phase::new("mouth", "Mouth", "Starch → Maltose", 2000)
                .with_details(["Enzyme: Salivary Amylase"]),
        )
        .phase(
            Phase::new("stomach", "Stomach", "Proteins → Peptides", 3000)
                .with_details(["Enzyme: Pepsin + HCl"]),
        )
        .phase(
            Phase::new("small_intestine", "Small Intestine", "Complete Digestion", 4000)
                .with_details(["Enzyme: Pancreatic Enzymes"]),
        )
        .phase(
            Phase::new("absorption", "Absorption", "Nutrient Absorption", 3000)
                .with_effect(Effect::set("carbs", 85.0))
                .with_effect(Effect::set("proteins", 78.0))
                .with_effect(Effect::set("fats", 92.0))
                .with_details(["Enzyme: Villi"]),
        )
        .phase(
            Phase::new("large_intestine", "Large Intestine", "Water Absorption", 2000)
                .with_details(["Enzyme: Bacteria"]),
        )
        .counter(CounterSpec::new("carbs", 0.0).bounded(0.0, 100.0))
        .counter(CounterSpec::new("proteins", 0.0).bounded(0.0, 100.0))
        .counter(CounterSpec::new("fats", 0.0).bounded(0.0, 100.0))
        .derive(Derived::new("food_position", Expr::PhaseIndex * 20.0))
        .history(3)
        .build()
}

/// Nephron processes with rising rates and an oscillating blood pressure.
pub fn kidney_function() -> Result<Topic, TopicError> {
    Topic::builder("kidney-function", "Nephron Structure and Function")
        .description("Filtration, reabsorption, and secretion in the nephron.")
        .phase(Phase::new(
            "filtration",
            "Filtration",
            "Blood is filtered in glomerulus, removing waste and excess water",
            2000,
        ))
        .phase(Phase::new(
            "reabsorption",
            "Reabsorption",
            "Useful substances like glucose and amino acids are reabsorbed",
            2000,
        ))
        .phase(Phase::new(
            "secretion",
            "Secretion",
            "Additional waste products are actively secreted into urine",
            2000,
        ))
        .counter(CounterSpec::new("filtration_rate", 0.0).bounded(0.0, 100.0))
        .counter(CounterSpec::new("reabsorption_rate", 0.0).bounded(0.0, 85.0))
        .counter(CounterSpec::new("urine_concentration", 0.0).bounded(0.0, 60.0))
        .every_tick(Effect::add("filtration_rate", 15.0))
        .every_tick(Effect::add("reabsorption_rate", 12.0))
        .every_tick(Effect::add("urine_concentration", 8.0))
        .derive(Derived::new(
            "blood_pressure",
            Expr::constant(120.0) + Expr::ElapsedTicks.sin() * 10.0,
        ))
        .build()
}

/// Mitosis. Cyclic by default; re-declare as terminal to stop at
/// cytokinesis.
pub fn cell_division() -> Result<Topic, TopicError> {
    Topic::builder("cell-division", "Mitosis and Cell Division")
        .description("Chromosomes replicate, align, separate, and the cell divides.")
        .phase(
            Phase::new("interphase", "Interphase", "Cell grows and DNA replicates", 3000)
                .with_effect(Effect::add("cell_cycle", 1.0))
                .with_effect(Effect::set("dna_replication", 0.0))
                .with_effect(Effect::set("spindle_formation", 0.0)),
        )
        .phase(
            Phase::new(
                "prophase",
                "Prophase",
                "Chromosomes condense, nuclear envelope breaks",
                2000,
            )
            .with_effect(Effect::set("dna_replication", 100.0))
            .with_effect(Effect::set("spindle_formation", 30.0)),
        )
        .phase(
            Phase::new("metaphase", "Metaphase", "Chromosomes align at cell center", 1500)
                .with_effect(Effect::set("spindle_formation", 100.0)),
        )
        .phase(Phase::new("anaphase", "Anaphase", "Sister chromatids separate", 1500))
        .phase(Phase::new("telophase", "Telophase", "Nuclear envelopes reform", 2000))
        .phase(Phase::new(
            "cytokinesis",
            "Cytokinesis",
            "Cytoplasm divides, two cells form",
            2000,
        ))
        .counter(CounterSpec::new("chromosome_count", 4.0))
        .counter(CounterSpec::new("cell_cycle", 0.0).at_least(0.0))
        .counter(CounterSpec::new("dna_replication", 0.0).bounded(0.0, 100.0))
        .counter(CounterSpec::new("spindle_formation", 0.0).bounded(0.0, 100.0))
        .build()
}

/// All chapter 1 topics.
pub(crate) fn all() -> Result<Vec<Arc<Topic>>, TopicError> {
    Ok(vec![
        Arc::new(photosynthesis()?),
        Arc::new(respiration()?),
        Arc::new(heart_circulation()?),
        Arc::new(digestive_system()?),
        Arc::new(kidney_function()?),
        Arc::new(cell_division()?),
    ])
}
