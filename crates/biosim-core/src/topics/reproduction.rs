//! Chapter 3: How Do Organisms Reproduce?

use std::sync::Arc;

use crate::effects::{CounterSpec, Effect};
use crate::topic::{Phase, Topic, TopicError};

/// Insect, wind, and self pollination; nectar drains while fertilization
/// progresses.
pub fn flower_structure() -> Result<Topic, TopicError> {
    Topic::builder("flower-structure", "Flower Anatomy and Pollination")
        .description("Pollen reaches the stigma by three routes and fertilization follows.")
        .phase(
            Phase::new(
                "insect",
                "Insect Pollination",
                "Attracted by nectar and color",
                3000,
            )
            .with_details(["Agents: Bees, butterflies, beetles"]),
        )
        .phase(
            Phase::new("wind", "Wind Pollination", "Pollen carried by air", 3000)
                .with_details(["Agents: Air currents"]),
        )
        .phase(
            Phase::new("self", "Self Pollination", "Pollen falls on own stigma", 3000)
                .with_details(["Agents: Same flower"]),
        )
        .counter(CounterSpec::new("fertilization_stage", 0.0).bounded(0.0, 4.0))
        .counter(CounterSpec::new("nectar_level", 100.0).bounded(20.0, 100.0))
        .counter(CounterSpec::new("pollen_grains", 0.0).bounded(0.0, 6.0))
        .every_tick(Effect::add("fertilization_stage", 1.0))
        .every_tick(Effect::add("nectar_level", -5.0))
        .every_tick(Effect::add("pollen_grains", 1.0))
        .build()
}

/// Ovulation to development with fluctuating hormone levels.
pub fn human_reproduction() -> Result<Topic, TopicError> {
    Topic::builder("human-reproduction", "Human Reproductive Biology")
        .description("The menstrual cycle, fertilization, and early embryonic development.")
        .phase(
            Phase::new("ovulation", "Ovulation", "Egg released from ovary", 3000)
                .with_details(["Timing: Day 14"]),
        )
        .phase(
            Phase::new(
                "fertilization",
                "Fertilization",
                "Sperm meets egg in fallopian tube",
                3000,
            )
            .with_details(["Timing: Day 15-16"]),
        )
        .phase(
            Phase::new(
                "implantation",
                "Implantation",
                "Embryo attaches to uterine wall",
                3000,
            )
            .with_details(["Timing: Day 21-22"]),
        )
        .phase(
            Phase::new("development", "Development", "Fetal growth and development", 3000)
                .with_details(["Timing: Week 3-40"]),
        )
        .counter(CounterSpec::new("cycle_day", 1.0).bounded(1.0, 28.0))
        .counter(CounterSpec::new("embryo_stage", 0.0).bounded(0.0, 8.0))
        .counter(CounterSpec::new("estrogen", 30.0).bounded(20.0, 80.0))
        .counter(CounterSpec::new("progesterone", 20.0).bounded(10.0, 60.0))
        .counter(CounterSpec::new("lh", 10.0).bounded(5.0, 50.0))
        .counter(CounterSpec::new("fsh", 15.0).bounded(5.0, 40.0))
        .every_tick(Effect::cycle("cycle_day", 28, 1))
        .every_tick(Effect::add("embryo_stage", 1.0))
        .every_tick(Effect::jitter("estrogen", -10.0, 10.0))
        .every_tick(Effect::jitter("progesterone", -7.5, 7.5))
        .every_tick(Effect::jitter("lh", -12.5, 12.5))
        .every_tick(Effect::jitter("fsh", -5.0, 5.0))
        .build()
}

/// Four asexual strategies. The population doubles each time the cycle
/// returns to binary fission, capped at 16.
pub fn asexual_reproduction() -> Result<Topic, TopicError> {
    Topic::builder("asexual-reproduction", "Asexual Reproduction Strategies")
        .description("Binary fission, budding, fragmentation, and spore formation.")
        .phase(
            Phase::new(
                "binary_fission",
                "Binary Fission",
                "Single cell divides into two identical cells",
                2500,
            )
            .with_effect(Effect::multiply("population", 2.0))
            .with_details([
                "Organism: Amoeba",
                "Time: 20-30 minutes",
                "DNA replication → Cell elongation → Septum formation → Cell separation",
            ]),
        )
        .phase(
            Phase::new(
                "budding",
                "Budding",
                "Small outgrowth develops into new individual",
                2500,
            )
            .with_details([
                "Organism: Hydra",
                "Time: 2-3 days",
                "Bud formation → Bud growth → Organ development → Detachment",
            ]),
        )
        .phase(
            Phase::new(
                "fragmentation",
                "Fragmentation",
                "Body breaks into fragments, each grows into new individual",
                2500,
            )
            .with_details([
                "Organism: Spirogyra",
                "Time: 1-2 weeks",
                "Filament breaks → Fragment isolation → Cell division → New filament",
            ]),
        )
        .phase(
            Phase::new(
                "spore_formation",
                "Spore Formation",
                "Specialized reproductive cells develop into new organisms",
                2500,
            )
            .with_details([
                "Organism: Rhizopus",
                "Time: 3-5 days",
                "Sporangium formation → Spore development → Spore release → Germination",
            ]),
        )
        .counter(CounterSpec::new("population", 1.0).bounded(1.0, 16.0))
        .counter(CounterSpec::new("generation_time", 0.0).at_least(0.0))
        .every_tick(Effect::add("generation_time", 1.0))
        .build()
}

/// All chapter 3 topics.
pub(crate) fn all() -> Result<Vec<Arc<Topic>>, TopicError> {
    Ok(vec![
        Arc::new(flower_structure()?),
        Arc::new(human_reproduction()?),
        Arc::new(asexual_reproduction()?),
    ])
}
