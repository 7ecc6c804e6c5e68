//! Chapter 2: Control and Coordination.

use std::sync::Arc;

use biosim_types::AdvancePolicy;

use crate::derive::{Derived, Expr};
use crate::effects::{CounterSpec, Effect};
use crate::topic::{Phase, Topic, TopicError};

/// Stimulus to motor response, 800 ms per hop; reaction time accrues 50 ms
/// per tick.
pub fn reflex_arc() -> Result<Topic, TopicError> {
    Topic::builder("reflex-arc", "Neural Reflex Arc Mechanism")
        .description("A withdrawal reflex travels from receptor to muscle without the brain.")
        .phase(Phase::new(
            "stimulus_detection",
            "Stimulus Detection",
            "Sensory receptor detects hot object",
            800,
        ))
        .phase(Phase::new(
            "sensory_neuron",
            "Sensory Neuron",
            "Impulse travels to spinal cord",
            800,
        ))
        .phase(Phase::new(
            "spinal_cord",
            "Spinal Cord Processing",
            "Interneuron processes signal",
            800,
        ))
        .phase(Phase::new(
            "motor_neuron",
            "Motor Neuron",
            "Signal sent to muscle",
            800,
        ))
        .phase(Phase::new(
            "motor_response",
            "Motor Response",
            "Hand withdraws from stimulus",
            800,
        ))
        .counter(CounterSpec::new("reaction_time_ms", 0.0).at_least(0.0))
        .every_tick(Effect::add("reaction_time_ms", 50.0))
        .derive(Derived::new("impulse_position", Expr::PhaseIndex * 20.0))
        .build()
}

fn region(name: &str, label: &str, description: &str, functions: &[&str]) -> Phase {
    let choices = u32::try_from(functions.len()).unwrap_or(u32::MAX);
    Phase::new(name, label, description, 2000)
        .with_effect(Effect::pick("active_function", choices))
        .with_details(functions.iter().copied())
}

/// A random brain region lights up every 2 s with one of its functions.
///
/// `active_function` indexes the active phase's detail lines; it is -1 until
/// the first tick.
pub fn brain_structure() -> Result<Topic, TopicError> {
    Topic::builder("brain-structure", "Interactive Brain Anatomy")
        .description("Regions of the human brain and the functions they control.")
        .policy(AdvancePolicy::Random)
        .phase(region(
            "cerebrum",
            "Cerebrum",
            "Largest part of brain, controls conscious activities",
            &[
                "Thinking",
                "Memory",
                "Voluntary movements",
                "Speech",
                "Sensory processing",
            ],
        ))
        .phase(region(
            "cerebellum",
            "Cerebellum",
            "Controls balance and fine motor coordination",
            &["Balance", "Coordination", "Posture", "Motor learning"],
        ))
        .phase(region(
            "medulla",
            "Medulla Oblongata",
            "Controls vital involuntary functions",
            &["Breathing", "Heart rate", "Blood pressure", "Swallowing"],
        ))
        .phase(region(
            "hypothalamus",
            "Hypothalamus",
            "Links nervous and endocrine systems",
            &[
                "Temperature regulation",
                "Hormone control",
                "Sleep cycles",
                "Hunger",
            ],
        ))
        .phase(region(
            "pons",
            "Pons",
            "Bridge between brain regions",
            &["Sleep regulation", "Arousal", "Facial sensation", "Hearing"],
        ))
        .counter(CounterSpec::new("active_function", -1.0))
        .build()
}

/// Photo-, geo-, and hydrotropism in turn, with auxin redistribution.
pub fn plant_tropisms() -> Result<Topic, TopicError> {
    Topic::builder("plant-tropisms", "Plant Movement and Tropisms")
        .description("Plants bend toward light, gravity, and water by redistributing auxin.")
        .phase(
            Phase::new(
                "phototropism",
                "Phototropism",
                "Growth response to light direction",
                2000,
            )
            .with_effect(Effect::add("plant_angle", 5.0).at_most(30.0))
            .with_effect(Effect::set("auxin_left", 30.0))
            .with_effect(Effect::set("auxin_right", 70.0))
            .with_details([
                "Stimulus: Light",
                "Response: Shoot bends toward light",
                "Hormone: Auxin accumulates on shaded side",
            ]),
        )
        .phase(
            Phase::new(
                "geotropism",
                "Geotropism (Gravitropism)",
                "Growth response to gravity",
                2000,
            )
            .with_effect(Effect::add("root_direction", 5.0).at_most(45.0))
            .with_effect(Effect::set("auxin_left", 50.0))
            .with_effect(Effect::set("auxin_right", 50.0))
            .with_details([
                "Stimulus: Gravity",
                "Response: Roots grow downward, shoots upward",
                "Hormone: Auxin redistributed by gravity",
            ]),
        )
        .phase(
            Phase::new("hydrotropism", "Hydrotropism", "Growth response to water", 2000)
                .with_effect(Effect::add("root_direction", 3.0).at_most(25.0))
                .with_effect(Effect::set("auxin_left", 40.0))
                .with_effect(Effect::set("auxin_right", 60.0))
                .with_details([
                    "Stimulus: Water gradient",
                    "Response: Roots grow toward water source",
                    "Hormone: Auxin guides root growth",
                ]),
        )
        .counter(CounterSpec::new("plant_angle", 0.0).bounded(0.0, 30.0))
        .counter(CounterSpec::new("root_direction", 0.0).bounded(0.0, 45.0))
        .counter(CounterSpec::new("auxin_left", 50.0).bounded(0.0, 100.0))
        .counter(CounterSpec::new("auxin_right", 50.0).bounded(0.0, 100.0))
        .counter(CounterSpec::new("growth_rate", 0.0).bounded(0.0, 100.0))
        .every_tick(Effect::add("growth_rate", 10.0))
        .build()
}

/// All chapter 2 topics.
pub(crate) fn all() -> Result<Vec<Arc<Topic>>, TopicError> {
    Ok(vec![
        Arc::new(reflex_arc()?),
        Arc::new(brain_structure()?),
        Arc::new(plant_tropisms()?),
    ])
}
