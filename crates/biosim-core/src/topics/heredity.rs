//! Chapter 4: Heredity and Evolution.

use std::sync::Arc;

use rand::Rng;

use crate::derive::{Derived, Expr};
use crate::dynamics::{StepContext, TopicDynamics};
use crate::effects::{CounterSpec, Effect, Rounding};
use crate::topic::{Phase, Topic, TopicError};

fn generation(name: &str, label: &str, description: &str, dominant: f64, recessive: f64) -> Phase {
    Phase::new(name, label, description, 3000)
        .with_effect(Effect::set("dominant", dominant))
        .with_effect(Effect::set("recessive", recessive))
}

/// Monohybrid then dihybrid crosses through P, F1, and F2.
pub fn mendel_experiments() -> Result<Topic, TopicError> {
    Topic::builder("mendel-experiments", "Mendel's Genetic Experiments")
        .description("Punnett-square crosses that reveal dominance and independent assortment.")
        .phase(
            generation(
                "monohybrid_p",
                "Monohybrid Cross: P",
                "Plant Height: TT (Tall) × tt (Short)",
                0.0,
                0.0,
            )
            .with_details(["TT × tt"]),
        )
        .phase(
            generation(
                "monohybrid_f1",
                "Monohybrid Cross: F1",
                "All offspring show the dominant trait",
                4.0,
                0.0,
            )
            .with_details(["Tt Tall ×4"]),
        )
        .phase(
            generation(
                "monohybrid_f2",
                "Monohybrid Cross: F2",
                "Selfing F1 gives a 3:1 phenotype ratio",
                3.0,
                1.0,
            )
            .with_details(["TT Tall ×1", "Tt Tall ×2", "tt Short ×1"]),
        )
        .phase(
            generation(
                "dihybrid_p",
                "Dihybrid Cross: P",
                "Height & Seed Color: TTYY (Tall Yellow) × ttyy (Short Green)",
                0.0,
                0.0,
            )
            .with_details(["TTYY × ttyy"]),
        )
        .phase(
            generation(
                "dihybrid_f1",
                "Dihybrid Cross: F1",
                "All offspring are Tall Yellow",
                4.0,
                0.0,
            )
            .with_details(["TtYy Tall Yellow ×4"]),
        )
        .phase(
            generation(
                "dihybrid_f2",
                "Dihybrid Cross: F2",
                "Independent assortment gives a 9:3:3:1 phenotype ratio",
                9.0,
                7.0,
            )
            .with_details([
                "TTYY Tall Yellow ×1",
                "TTYy Tall Yellow ×2",
                "TtYY Tall Yellow ×2",
                "TtYy Tall Yellow ×4",
                "TTyy Tall Green ×1",
                "Ttyy Tall Green ×2",
                "ttYY Short Yellow ×1",
                "ttYy Short Yellow ×2",
                "ttyy Short Green ×1",
            ]),
        )
        .counter(CounterSpec::new("dominant", 0.0).at_least(0.0))
        .counter(CounterSpec::new("recessive", 0.0).at_least(0.0))
        .build()
}

/// Meiosis, fertilization, and expression. Trait counters hold 0 for the
/// dominant allele and 1 for the recessive one.
pub fn dna_inheritance() -> Result<Topic, TopicError> {
    Topic::builder("dna-inheritance", "DNA Structure and Inheritance")
        .description("Chromosomes recombine, gametes fuse, and genes become traits.")
        .phase(
            Phase::new(
                "meiosis",
                "Meiosis",
                "Gamete formation with genetic recombination",
                3000,
            )
            .with_details(["Genetic diversity through crossing over"]),
        )
        .phase(
            Phase::new(
                "fertilization",
                "Fertilization",
                "Fusion of male and female gametes",
                3000,
            )
            .with_details(["Diploid zygote formation"]),
        )
        .phase(
            Phase::new("expression", "Gene Expression", "Genes determine observable traits", 3000)
                .with_details(["Phenotype manifestation"]),
        )
        .counter(CounterSpec::new("chromosome_pairs", 2.0).bounded(1.0, 3.0))
        .counter(CounterSpec::new("crossing_over", 0.0).bounded(0.0, 1.0))
        .counter(CounterSpec::new("eye_color", 0.0).bounded(0.0, 1.0))
        .counter(CounterSpec::new("hair_color", 0.0).bounded(0.0, 1.0))
        .counter(CounterSpec::new("height", 0.0).bounded(0.0, 1.0))
        .counter(CounterSpec::new("inheritance_pattern", 0.0).bounded(0.0, 2.0))
        .every_tick(Effect::cycle("crossing_over", 2, 0))
        .every_tick(Effect::cycle("chromosome_pairs", 3, 1))
        .every_tick(Effect::coin("eye_color"))
        .every_tick(Effect::coin("hair_color"))
        .every_tick(Effect::coin("height"))
        .every_tick(Effect::cycle("inheritance_pattern", 3, 0))
        .build()
}

/// Recombinant DNA from gene isolation to protein expression, repeated.
///
/// `progress` fills by 20 per step and stays at 100 once full. Call
/// [`Topic::with_policy`] with `AdvancePolicy::Terminal` for a single pass.
pub fn genetic_engineering() -> Result<Topic, TopicError> {
    Topic::builder("genetic-engineering", "Genetic Engineering Techniques")
        .description("A target gene is cut, inserted into a plasmid, and expressed by bacteria.")
        .phase(Phase::new(
            "isolation",
            "Gene Isolation",
            "Extract target gene from donor organism",
            3000,
        ))
        .phase(Phase::new(
            "cutting",
            "Restriction Cutting",
            "Cut DNA using restriction enzymes",
            3000,
        ))
        .phase(Phase::new(
            "insertion",
            "Gene Insertion",
            "Insert gene into plasmid vector",
            3000,
        ))
        .phase(
            Phase::new(
                "transformation",
                "Transformation",
                "Introduce recombinant plasmid into bacteria",
                3000,
            )
            .with_effect(Effect::multiply("plasmid_count", 2.0)),
        )
        .phase(
            Phase::new(
                "expression",
                "Protein Expression",
                "Bacteria produce desired protein",
                3000,
            )
            .with_effect(Effect::add("protein_production", 25.0))
            .with_effect(Effect::multiply("bacterial_growth", 1.5)),
        )
        .counter(CounterSpec::new("progress", 0.0).bounded(0.0, 100.0))
        .counter(CounterSpec::new("plasmid_count", 1.0).at_least(1.0))
        .counter(CounterSpec::new("protein_production", 0.0).bounded(0.0, 100.0))
        .counter(CounterSpec::new("bacterial_growth", 1.0).at_least(1.0))
        .every_tick(Effect::add("progress", 20.0))
        .build()
}

/// Environments in the order they follow each other: name, label, selection
/// pressure.
const ENVIRONMENTS: [(&str, &str, f64); 4] = [
    ("moderate", "Moderate Pressure", 0.3),
    ("harsh", "Harsh Environment", 0.6),
    ("extreme", "Extreme Conditions", 0.8),
    ("mild", "Mild Environment", 0.1),
];

/// Index of the environment in which speciation happens.
const EXTREME: u32 = 2;

/// Generations spent in each environment before it changes.
const GENERATIONS_PER_ENVIRONMENT: u32 = 10;

const MAX_SPECIES: f64 = 4.0;

/// Natural selection over three variant classes.
///
/// One tick is one generation. Selection, mutation, fitness and speciation
/// all use the environment the generation was lived in, which is the phase
/// just left. Every tenth generation the phase moves into the next
/// environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvolutionDynamics;

impl EvolutionDynamics {
    const COUNTERS: [&'static str; 8] = [
        "advantageous",
        "neutral",
        "disadvantageous",
        "mutation_rate",
        "species",
        "fitness_high",
        "fitness_medium",
        "fitness_low",
    ];

    /// Environment index of a phase.
    fn environment(phase_index: u32) -> u32 {
        phase_index
            .checked_div(GENERATIONS_PER_ENVIRONMENT)
            .unwrap_or(0)
    }

    fn pressure(environment: u32) -> f64 {
        usize::try_from(environment)
            .ok()
            .and_then(|i| ENVIRONMENTS.get(i))
            .map_or(0.0, |(_, _, pressure)| *pressure)
    }
}

impl TopicDynamics for EvolutionDynamics {
    fn step(&self, ctx: &mut StepContext<'_>) {
        let environment = Self::environment(ctx.previous_index);
        let pressure = Self::pressure(environment);
        let rate = ctx.counters.get("mutation_rate");

        let mut adv = (ctx.counters.get("advantageous")
            * (1.0 - pressure * 0.2)
            * (1.0 + ctx.rng.random::<f64>() * 0.3))
            .floor();
        let mut neu = (ctx.counters.get("neutral")
            * (1.0 - pressure * 0.5)
            * (1.0 + ctx.rng.random::<f64>() * 0.1))
            .floor();
        let mut dis = (ctx.counters.get("disadvantageous")
            * (1.0 - pressure * 0.8)
            * (1.0 + ctx.rng.random::<f64>() * 0.05))
            .floor();

        let mutations = (rate * (adv + neu + dis) / 100.0).floor();
        adv += (mutations * 0.1).floor();
        neu += (mutations * 0.7).floor();
        dis += (mutations * 0.2).floor();

        ctx.counters.set("advantageous", adv);
        ctx.counters.set("neutral", neu);
        ctx.counters.set("disadvantageous", dis);

        ctx.counters
            .set("fitness_high", (100.0 - pressure * 30.0).max(60.0));
        ctx.counters
            .set("fitness_medium", (70.0 - pressure * 40.0).max(30.0));
        ctx.counters
            .set("fitness_low", (40.0 - pressure * 50.0).max(5.0));

        // The generation just lived is numbered by the tick count.
        if environment == EXTREME && ctx.elapsed_ticks % 5 == 0 {
            let species = ctx.counters.get("species");
            ctx.counters.set("species", (species + 1.0).min(MAX_SPECIES));
        }
    }

    fn counters(&self) -> &[&'static str] {
        &Self::COUNTERS
    }
}

/// Natural selection across four cycling environments, ten generations
/// each.
pub fn evolution_mechanisms() -> Result<Topic, TopicError> {
    let counter = |name: &str, initial: f64| {
        CounterSpec::new(name, initial)
            .bounded(0.0, 1_000_000.0)
            .rounded(Rounding::Down)
    };
    let mut builder = Topic::builder("evolution-mechanisms", "Evolution and Natural Selection")
        .description("Variants with an advantage survive and spread as the environment changes.");
    for (name, label, pressure) in ENVIRONMENTS {
        for generation in 1..=GENERATIONS_PER_ENVIRONMENT {
            builder = builder.phase(
                Phase::new(
                    format!("{name}_{generation}"),
                    label,
                    format!(
                        "Generation {generation} of {GENERATIONS_PER_ENVIRONMENT} in this environment"
                    ),
                    2000,
                )
                .with_details([format!("Selection pressure: {pressure}")]),
            );
        }
    }
    builder
        .counter(CounterSpec::new("generation", 1.0).at_least(1.0))
        .counter(counter("advantageous", 20.0))
        .counter(counter("neutral", 60.0))
        .counter(counter("disadvantageous", 20.0))
        .counter(CounterSpec::new("mutation_rate", 5.0))
        .counter(CounterSpec::new("species", 1.0).bounded(1.0, MAX_SPECIES))
        .counter(CounterSpec::new("fitness_high", 85.0))
        .counter(CounterSpec::new("fitness_medium", 50.0))
        .counter(CounterSpec::new("fitness_low", 15.0))
        .every_tick(Effect::add("generation", 1.0))
        .derive(Derived::new(
            "total_population",
            Expr::var("advantageous") + "neutral" + "disadvantageous",
        ))
        .dynamics(Arc::new(EvolutionDynamics))
        .build()
}

/// All chapter 4 topics.
pub(crate) fn all() -> Result<Vec<Arc<Topic>>, TopicError> {
    Ok(vec![
        Arc::new(mendel_experiments()?),
        Arc::new(dna_inheritance()?),
        Arc::new(genetic_engineering()?),
        Arc::new(evolution_mechanisms()?),
    ])
}
