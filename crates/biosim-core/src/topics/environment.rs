//! Chapter 5: Our Environment.

use std::sync::Arc;

use biosim_types::AdvancePolicy;

use crate::derive::{Derived, Expr};
use crate::dynamics::{StepContext, TopicDynamics};
use crate::effects::{CounterSpec, Effect, Rounding};
use crate::topic::{Phase, Topic, TopicError};

/// Rising air, water, and soil pollution with derived health impacts.
pub fn pollution_effects() -> Result<Topic, TopicError> {
    let level = |name: &str, initial: f64| CounterSpec::new(name, initial).bounded(0.0, 100.0);
    Topic::builder("pollution-effects", "Environmental Pollution Impact")
        .description("Pollutants accumulate and degrade ecosystem and human health.")
        .phase(
            Phase::new("co2", "Carbon Dioxide", "Climate Change", 2500)
                .with_details(["Source: Fossil Fuels"]),
        )
        .phase(
            Phase::new("plastic", "Plastic Waste", "Marine Pollution", 2500)
                .with_details(["Source: Consumer Products"]),
        )
        .phase(
            Phase::new("chemicals", "Industrial Chemicals", "Toxic Accumulation", 2500)
                .with_details(["Source: Manufacturing"]),
        )
        .counter(level("air_pollution", 30.0))
        .counter(level("water_pollution", 25.0))
        .counter(level("soil_pollution", 20.0))
        .counter(level("bioaccumulation", 0.0))
        .every_tick(Effect::jitter("air_pollution", 0.0, 5.0))
        .every_tick(Effect::jitter("water_pollution", 0.0, 4.0))
        .every_tick(Effect::jitter("soil_pollution", 0.0, 3.0))
        .every_tick(Effect::add("bioaccumulation", 2.0))
        .derive(Derived::new(
            "ecosystem_health",
            (Expr::constant(100.0)
                - Expr::mean(vec![
                    Expr::var("air_pollution"),
                    Expr::var("water_pollution"),
                    Expr::var("soil_pollution"),
                ]))
            .at_least(10.0),
        ))
        .derive(Derived::new(
            "biodiversity_index",
            (Expr::var("ecosystem_health") / 100.0 * 0.9).at_least(0.1),
        ))
        .derive(Derived::new(
            "human_health_impact",
            (Expr::var("air_pollution") * 0.4
                + Expr::var("water_pollution") * 0.3
                + Expr::var("soil_pollution") * 0.3)
                .at_most(100.0),
        ))
        .build()
}

const TROPHIC_LEVELS: [&str; 4] = ["producers", "primary", "secondary", "tertiary"];

fn trophic_level(index: usize, label: &str, description: &str, organisms: &str) -> Phase {
    let phase = Phase::new(
        TROPHIC_LEVELS.get(index).copied().unwrap_or("level"),
        label,
        description,
        2000,
    )
    .with_details([format!("Organisms: {organisms}")]);
    match (index.checked_sub(1).and_then(|i| TROPHIC_LEVELS.get(i)), TROPHIC_LEVELS.get(index)) {
        (Some(source), Some(target)) => phase.with_effect(Effect::transfer_from(
            format!("{target}_energy"),
            format!("{source}_energy"),
            0.1,
            2.0,
        )),
        _ => phase,
    }
}

/// Energy moves up four trophic levels by the 10% rule.
pub fn food_chains() -> Result<Topic, TopicError> {
    let mut builder = Topic::builder("food-chains", "Food Webs and Energy Flow")
        .description("Only about a tenth of the energy at each level reaches the next.")
        .phase(trophic_level(
            0,
            "Producers",
            "Convert solar energy to chemical energy",
            "Grass, Trees, Algae",
        ))
        .phase(trophic_level(
            1,
            "Primary Consumers",
            "Herbivores that eat producers",
            "Rabbit, Deer, Grasshopper",
        ))
        .phase(trophic_level(
            2,
            "Secondary Consumers",
            "Carnivores that eat primary consumers",
            "Snake, Fox, Frog",
        ))
        .phase(trophic_level(
            3,
            "Tertiary Consumers",
            "Top predators in the food chain",
            "Eagle, Lion, Shark",
        ));
    let populations = [1000.0, 100.0, 10.0, 1.0];
    let energy = [100.0, 0.0, 0.0, 0.0];
    for ((level, population), energy) in TROPHIC_LEVELS.iter().zip(populations).zip(energy) {
        builder = builder
            .counter(
                CounterSpec::new(format!("{level}_population"), population)
                    .at_least(1.0)
                    .rounded(Rounding::Down),
            )
            .counter(CounterSpec::new(format!("{level}_energy"), energy).bounded(0.0, 100.0))
            .every_tick(Effect::scale_jitter(
                format!("{level}_population"),
                -0.1,
                0.1,
            ));
    }
    builder.build()
}

/// Herbivore and carnivore response to the plant supply.
///
/// Herbivores grow by 10% toward a carrying capacity of one per ten plants
/// and shrink by 10% (to no fewer than 50) above it. Carnivores do the same
/// against one per ten herbivores, growing 5%, shrinking 20%, floored at 5.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcosystemDynamics;

impl TopicDynamics for EcosystemDynamics {
    fn step(&self, ctx: &mut StepContext<'_>) {
        let plants = ctx.counters.get("plants");
        let herbivores = ctx.counters.get("herbivores");
        let carnivores = ctx.counters.get("carnivores");

        let carrying_capacity = plants / 10.0;
        let herbivores = if herbivores > carrying_capacity {
            (herbivores * 0.9).max(50.0)
        } else {
            (herbivores * 1.1).min(carrying_capacity)
        };

        let prey_capacity = herbivores / 10.0;
        let carnivores = if carnivores > prey_capacity {
            (carnivores * 0.8).max(5.0)
        } else {
            (carnivores * 1.05).min(prey_capacity)
        };

        ctx.counters.set("herbivores", herbivores);
        ctx.counters.set("carnivores", carnivores);
    }

    fn counters(&self) -> &[&'static str] {
        &["plants", "herbivores", "carnivores"]
    }
}

fn event(name: &str, label: &str) -> Phase {
    Phase::new(name, label, label, 3000)
}

/// Random environmental events push a three-level ecosystem out of balance.
///
/// Playback opens on an undisturbed baseline; once events start the random
/// clock only draws among them.
pub fn ecosystem_balance() -> Result<Topic, TopicError> {
    let population = |name: &str, initial: f64| {
        CounterSpec::new(name, initial)
            .at_least(0.0)
            .rounded(Rounding::Nearest)
    };
    Topic::builder("ecosystem-balance", "Ecosystem Dynamics and Balance")
        .description("Populations and environmental factors react to random events.")
        .policy(AdvancePolicy::Random)
        .lead_in(1)
        .phase(Phase::new(
            "baseline",
            "Balanced",
            "No event is disturbing the ecosystem",
            3000,
        ))
        .phase(
            event("drought", "Drought reduces plant growth")
                .with_effect(Effect::multiply("plants", 0.8).at_least(500.0)),
        )
        .phase(
            event("rainfall", "Heavy rainfall increases plant growth")
                .with_effect(Effect::multiply("plants", 1.2).at_most(1500.0)),
        )
        .phase(event("disease", "Disease affects herbivore population"))
        .phase(event("predator", "New predator introduced"))
        .phase(event("pollution", "Pollution levels increase"))
        .phase(event("conservation", "Conservation efforts implemented"))
        .phase(event("climate_change", "Climate change effects"))
        .phase(event("restoration", "Habitat restoration project"))
        .counter(population("plants", 1000.0))
        .counter(population("herbivores", 100.0))
        .counter(population("carnivores", 10.0))
        .counter(CounterSpec::new("temperature", 25.0).bounded(15.0, 35.0))
        .counter(CounterSpec::new("rainfall", 50.0).bounded(20.0, 80.0))
        .counter(CounterSpec::new("pollution", 10.0).bounded(5.0, 50.0))
        .every_tick(Effect::jitter("temperature", -2.0, 2.0))
        .every_tick(Effect::jitter("rainfall", -10.0, 10.0))
        .every_tick(Effect::jitter("pollution", -5.0, 5.0))
        .derive(Derived::new(
            "ecosystem_health",
            Expr::mean(vec![
                (Expr::var("plants") / 10.0).at_most(100.0),
                (Expr::constant(100.0)
                    - (Expr::var("herbivores") * 10.0 - "plants").abs() / 50.0)
                    .at_most(100.0),
                (Expr::constant(100.0) - Expr::var("pollution") * 2.0).at_least(0.0),
            ])
            .clamped(10.0, 100.0),
        ))
        .derive(Derived::new(
            "biodiversity_index",
            (Expr::var("plants").step(800.0, 0.2, 0.4)
                + Expr::var("herbivores").step(80.0, 0.1, 0.3)
                + Expr::var("carnivores").step(8.0, 0.1, 0.3))
            .at_most(1.0),
        ))
        .dynamics(Arc::new(EcosystemDynamics))
        .build()
}

/// All chapter 5 topics.
pub(crate) fn all() -> Result<Vec<Arc<Topic>>, TopicError> {
    Ok(vec![
        Arc::new(food_chains()?),
        Arc::new(ecosystem_balance()?),
        Arc::new(pollution_effects()?),
    ])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::effects::Counters;

    #[test]
    fn herbivores_shrink_above_capacity() {
        let topic = ecosystem_balance().unwrap();
        let mut counters = Counters::from_specs(topic.counters());
        counters.set("plants", 500.0);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ctx = StepContext {
            previous_index: 0,
            phase_index: 1,
            phase_name: "drought",
            elapsed_ticks: 1,
            counters: &mut counters,
            rng: &mut rng,
        };
        EcosystemDynamics.step(&mut ctx);
        // Capacity 50: 100 herbivores shrink to 90; prey capacity 9 so
        // 10 carnivores shrink to 8.
        assert_eq!(counters.get("herbivores"), 90.0);
        assert_eq!(counters.get("carnivores"), 8.0);
    }

    #[test]
    fn balanced_ecosystem_grows_to_capacity() {
        let topic = ecosystem_balance().unwrap();
        let mut counters = Counters::from_specs(topic.counters());
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ctx = StepContext {
            previous_index: 0,
            phase_index: 3,
            phase_name: "disease",
            elapsed_ticks: 1,
            counters: &mut counters,
            rng: &mut rng,
        };
        EcosystemDynamics.step(&mut ctx);
        // 100 herbivores at capacity 100 stay at 100 (min(110, 100)).
        assert_eq!(counters.get("herbivores"), 100.0);
        // Prey capacity 10: min(10.5, 10).
        assert_eq!(counters.get("carnivores"), 10.0);
    }

    #[test]
    fn ecosystem_opens_on_a_balanced_baseline() {
        let topic = ecosystem_balance().unwrap();
        assert_eq!(topic.lead_in(), 1);
        assert_eq!(topic.phase_count(), 9);
        let baseline = topic.phase(0).unwrap();
        assert_eq!(baseline.name, "baseline");
        assert!(baseline.effects.is_empty());
        assert_eq!(topic.phase_index("drought"), Some(1));
    }

    #[test]
    fn food_chain_transfers_ten_percent() {
        let topic = food_chains().unwrap();
        let phase = topic.phase(1).unwrap();
        let mut counters = Counters::from_specs(topic.counters());
        let mut rng = SmallRng::seed_from_u64(3);
        crate::effects::apply_effects(&phase.effects, topic.counters(), &mut counters, &mut rng);
        // min(0 + 2, 100 * 0.1)
        assert_eq!(counters.get("primary_energy"), 2.0);
    }
}
