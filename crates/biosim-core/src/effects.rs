//! Counters and the effects that mutate them.
//!
//! Every topic declares its counters up front ([`CounterSpec`]): a name, an
//! initial value, optional bounds, and a rounding rule. Phases and topics then
//! attach [`Effect`]s that are applied when the clock ticks. Bounds and
//! rounding are enforced after every effect, so a counter can never be
//! observed outside its declared range.
//!
//! Random effects draw from the random source injected into the engine. No
//! effect reads the wall clock.

use std::collections::BTreeMap;

use rand::distr::{Distribution, Uniform};
use rand::{Rng, RngCore};

// ---------------------------------------------------------------------------
// Counter declarations
// ---------------------------------------------------------------------------

/// How a counter value is rounded after each update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Rounding {
    /// Keep the exact floating-point value.
    #[default]
    None,
    /// Round half away from zero.
    Nearest,
    /// Round toward negative infinity.
    Down,
}

impl Rounding {
    /// Apply the rounding rule to a value.
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::None => value,
            Self::Nearest => value.round(),
            Self::Down => value.floor(),
        }
    }
}

/// Declaration of a single named counter.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSpec {
    /// Counter name, unique within the topic.
    pub name: String,
    /// Value the counter holds while the playback is stopped.
    pub initial: f64,
    /// Inclusive lower bound, if any.
    pub min: Option<f64>,
    /// Inclusive upper bound, if any.
    pub max: Option<f64>,
    /// Rounding applied after every update.
    pub rounding: Rounding,
}

impl CounterSpec {
    /// Declare an unbounded, unrounded counter.
    pub fn new(name: impl Into<String>, initial: f64) -> Self {
        Self {
            name: name.into(),
            initial,
            min: None,
            max: None,
            rounding: Rounding::None,
        }
    }

    /// Set the inclusive lower bound.
    #[must_use]
    pub const fn at_least(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Set the inclusive upper bound.
    #[must_use]
    pub const fn at_most(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Set both bounds at once.
    #[must_use]
    pub const fn bounded(self, min: f64, max: f64) -> Self {
        self.at_least(min).at_most(max)
    }

    /// Set the rounding rule.
    #[must_use]
    pub const fn rounded(mut self, rounding: Rounding) -> Self {
        self.rounding = rounding;
        self
    }

    /// Clamp and round a candidate value according to this declaration.
    pub fn settle(&self, value: f64) -> f64 {
        let mut v = self.rounding.apply(value);
        if let Some(min) = self.min {
            v = v.max(min);
        }
        if let Some(max) = self.max {
            v = v.min(max);
        }
        v
    }
}

// ---------------------------------------------------------------------------
// Counter values
// ---------------------------------------------------------------------------

/// Current values of a topic's counters.
///
/// Keyed by counter name in a [`BTreeMap`] so iteration order (and therefore
/// snapshot serialization) is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Counters {
    values: BTreeMap<String, f64>,
}

impl Counters {
    /// Build the initial counter set from declarations.
    pub fn from_specs(specs: &[CounterSpec]) -> Self {
        let values = specs
            .iter()
            .map(|spec| (spec.name.clone(), spec.settle(spec.initial)))
            .collect();
        Self { values }
    }

    /// Return a counter's value, or 0.0 if the counter is not declared.
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    /// Return a counter's value if it is declared.
    pub fn try_get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Overwrite a declared counter. Undeclared names are ignored.
    pub fn set(&mut self, name: &str, value: f64) {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
        }
    }

    /// Number of declared counters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the topic declares no counters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Borrow the underlying map.
    pub const fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    /// Re-apply bounds and rounding to every counter.
    pub fn settle(&mut self, specs: &[CounterSpec]) {
        for spec in specs {
            if let Some(slot) = self.values.get_mut(&spec.name) {
                *slot = spec.settle(*slot);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

/// The operation an [`Effect`] performs on its counter.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectOp {
    /// Replace the value.
    Set(f64),
    /// Add a constant (negative values subtract).
    Add(f64),
    /// Multiply by a constant.
    Multiply(f64),
    /// Restore the declared initial value.
    Reset,
    /// Wrap-increment within `base..base + modulus`.
    ///
    /// `modulus = 2, base = 0` is a toggle; `modulus = 28, base = 1` is a
    /// 1-based day-of-cycle counter.
    Cycle {
        /// Number of distinct values in the cycle.
        modulus: u32,
        /// Smallest value in the cycle.
        base: i32,
    },
    /// Add a value drawn uniformly from `low..high`.
    Uniform {
        /// Inclusive lower end of the perturbation.
        low: f64,
        /// Exclusive upper end of the perturbation.
        high: f64,
    },
    /// Multiply by `1 + x` where `x` is drawn uniformly from `low..high`.
    ScaleUniform {
        /// Inclusive lower end of the relative change.
        low: f64,
        /// Exclusive upper end of the relative change.
        high: f64,
    },
    /// Replace the value with a random index in `0..choices`.
    Pick {
        /// Number of choices.
        choices: u32,
    },
    /// Replace the value with 0 or 1 at even odds.
    Coin,
    /// `min(value + step, source * fraction)`: a capped transfer from another
    /// counter, as in trophic energy flow.
    TransferFrom {
        /// Counter that bounds the transfer.
        source: String,
        /// Share of the source that can reach this counter.
        fraction: f64,
        /// Maximum gain per application.
        step: f64,
    },
}

/// A single counter mutation, optionally clamped on top of the counter's own
/// bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    /// Target counter.
    pub counter: String,
    /// Operation to apply.
    pub op: EffectOp,
    /// Lower clamp applied to this effect's result only.
    pub floor: Option<f64>,
    /// Upper clamp applied to this effect's result only.
    pub ceiling: Option<f64>,
}

impl Effect {
    /// Build an effect from a counter name and an operation.
    pub fn new(counter: impl Into<String>, op: EffectOp) -> Self {
        Self {
            counter: counter.into(),
            op,
            floor: None,
            ceiling: None,
        }
    }

    /// `counter = value`.
    pub fn set(counter: impl Into<String>, value: f64) -> Self {
        Self::new(counter, EffectOp::Set(value))
    }

    /// `counter += amount`.
    pub fn add(counter: impl Into<String>, amount: f64) -> Self {
        Self::new(counter, EffectOp::Add(amount))
    }

    /// `counter *= factor`.
    pub fn multiply(counter: impl Into<String>, factor: f64) -> Self {
        Self::new(counter, EffectOp::Multiply(factor))
    }

    /// `counter = initial`.
    pub fn reset(counter: impl Into<String>) -> Self {
        Self::new(counter, EffectOp::Reset)
    }

    /// Wrap-increment within `base..base + modulus`.
    pub fn cycle(counter: impl Into<String>, modulus: u32, base: i32) -> Self {
        Self::new(counter, EffectOp::Cycle { modulus, base })
    }

    /// `counter += uniform(low..high)`.
    pub fn jitter(counter: impl Into<String>, low: f64, high: f64) -> Self {
        Self::new(counter, EffectOp::Uniform { low, high })
    }

    /// `counter *= 1 + uniform(low..high)`.
    pub fn scale_jitter(counter: impl Into<String>, low: f64, high: f64) -> Self {
        Self::new(counter, EffectOp::ScaleUniform { low, high })
    }

    /// `counter = uniform_int(0..choices)`.
    pub fn pick(counter: impl Into<String>, choices: u32) -> Self {
        Self::new(counter, EffectOp::Pick { choices })
    }

    /// `counter = coin flip (0 or 1)`.
    pub fn coin(counter: impl Into<String>) -> Self {
        Self::new(counter, EffectOp::Coin)
    }

    /// `counter = min(counter + step, source * fraction)`.
    pub fn transfer_from(
        counter: impl Into<String>,
        source: impl Into<String>,
        fraction: f64,
        step: f64,
    ) -> Self {
        Self::new(
            counter,
            EffectOp::TransferFrom {
                source: source.into(),
                fraction,
                step,
            },
        )
    }

    /// Clamp this effect's result from below.
    #[must_use]
    pub const fn at_least(mut self, floor: f64) -> Self {
        self.floor = Some(floor);
        self
    }

    /// Clamp this effect's result from above.
    #[must_use]
    pub const fn at_most(mut self, ceiling: f64) -> Self {
        self.ceiling = Some(ceiling);
        self
    }

    /// Names of every counter this effect reads or writes.
    pub fn referenced_counters(&self) -> impl Iterator<Item = &str> {
        let source = match &self.op {
            EffectOp::TransferFrom { source, .. } => Some(source.as_str()),
            _ => None,
        };
        core::iter::once(self.counter.as_str()).chain(source)
    }

    /// Compute the new value of the target counter.
    ///
    /// `current` is the counter's present value, `initial` its declared
    /// initial value. Per-effect clamps are applied here; the counter's own
    /// bounds and rounding are applied by the caller. Degenerate random
    /// ranges and a zero modulus or choice count leave the value unchanged.
    pub fn evaluate(
        &self,
        current: f64,
        initial: f64,
        counters: &Counters,
        rng: &mut dyn RngCore,
    ) -> f64 {
        let raw = match &self.op {
            EffectOp::Set(value) => *value,
            EffectOp::Add(amount) => current + amount,
            EffectOp::Multiply(factor) => current * factor,
            EffectOp::Reset => initial,
            EffectOp::Cycle { modulus: 0, .. } => current,
            EffectOp::Cycle { modulus, base } => {
                let m = f64::from(*modulus);
                let b = f64::from(*base);
                (current - b + 1.0).rem_euclid(m) + b
            }
            EffectOp::Uniform { low, high } => current + draw(*low, *high, rng),
            EffectOp::ScaleUniform { low, high } => current * (1.0 + draw(*low, *high, rng)),
            EffectOp::Pick { choices } => Uniform::new(0, *choices)
                .map_or(current, |d| f64::from(d.sample(rng))),
            EffectOp::Coin => {
                if rng.random_bool(0.5) {
                    1.0
                } else {
                    0.0
                }
            }
            EffectOp::TransferFrom {
                source,
                fraction,
                step,
            } => (current + step).min(counters.get(source) * fraction),
        };

        let mut v = raw;
        if let Some(floor) = self.floor {
            v = v.max(floor);
        }
        if let Some(ceiling) = self.ceiling {
            v = v.min(ceiling);
        }
        v
    }
}

/// Uniform sample from `low..high`, or 0 when the range is empty or not
/// finite.
fn draw(low: f64, high: f64, rng: &mut dyn RngCore) -> f64 {
    Uniform::new(low, high).map_or(0.0, |d| d.sample(rng))
}

/// Apply a sequence of effects in order, settling each counter after every
/// write.
///
/// Effects targeting undeclared counters are skipped; topic validation makes
/// that unreachable for topics built through [`TopicBuilder`].
///
/// [`TopicBuilder`]: crate::topic::TopicBuilder
pub fn apply_effects(
    effects: &[Effect],
    specs: &[CounterSpec],
    counters: &mut Counters,
    rng: &mut dyn RngCore,
) {
    for effect in effects {
        let Some(spec) = specs.iter().find(|s| s.name == effect.counter) else {
            continue;
        };
        let current = counters.get(&spec.name);
        let next = effect.evaluate(current, spec.initial, counters, rng);
        counters.set(&spec.name, spec.settle(next));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn specs() -> Vec<CounterSpec> {
        vec![
            CounterSpec::new("population", 1.0).at_most(16.0),
            CounterSpec::new("day", 1.0),
            CounterSpec::new("energy", 100.0),
            CounterSpec::new("consumer", 0.0),
            CounterSpec::new("plants", 1000.0).rounded(Rounding::Nearest),
        ]
    }

    #[test]
    fn initial_counters_follow_specs() {
        let counters = Counters::from_specs(&specs());
        assert_eq!(counters.len(), 5);
        assert_eq!(counters.get("population"), 1.0);
        assert_eq!(counters.get("plants"), 1000.0);
        assert_eq!(counters.try_get("missing"), None);
    }

    #[test]
    fn multiply_respects_counter_cap() {
        let specs = specs();
        let mut counters = Counters::from_specs(&specs);
        let mut rng = SmallRng::seed_from_u64(1);
        let double = [Effect::multiply("population", 2.0)];
        for _ in 0..10 {
            apply_effects(&double, &specs, &mut counters, &mut rng);
        }
        assert_eq!(counters.get("population"), 16.0);
    }

    #[test]
    fn cycle_wraps_one_based() {
        let specs = specs();
        let mut counters = Counters::from_specs(&specs);
        let mut rng = SmallRng::seed_from_u64(1);
        let step = [Effect::cycle("day", 3, 1)];
        let mut seen = Vec::new();
        for _ in 0..4 {
            apply_effects(&step, &specs, &mut counters, &mut rng);
            seen.push(counters.get("day"));
        }
        assert_eq!(seen, vec![2.0, 3.0, 1.0, 2.0]);
    }

    #[test]
    fn cycle_as_toggle() {
        let specs = vec![CounterSpec::new("flag", 0.0)];
        let mut counters = Counters::from_specs(&specs);
        let mut rng = SmallRng::seed_from_u64(1);
        let toggle = [Effect::cycle("flag", 2, 0)];
        apply_effects(&toggle, &specs, &mut counters, &mut rng);
        assert_eq!(counters.get("flag"), 1.0);
        apply_effects(&toggle, &specs, &mut counters, &mut rng);
        assert_eq!(counters.get("flag"), 0.0);
    }

    #[test]
    fn per_effect_clamps_apply() {
        let specs = specs();
        let mut counters = Counters::from_specs(&specs);
        let mut rng = SmallRng::seed_from_u64(1);
        let drain = [Effect::add("energy", -30.0).at_least(20.0)];
        for _ in 0..5 {
            apply_effects(&drain, &specs, &mut counters, &mut rng);
        }
        assert_eq!(counters.get("energy"), 20.0);
    }

    #[test]
    fn reset_restores_initial() {
        let specs = specs();
        let mut counters = Counters::from_specs(&specs);
        let mut rng = SmallRng::seed_from_u64(1);
        apply_effects(&[Effect::set("energy", 5.0)], &specs, &mut counters, &mut rng);
        assert_eq!(counters.get("energy"), 5.0);
        apply_effects(&[Effect::reset("energy")], &specs, &mut counters, &mut rng);
        assert_eq!(counters.get("energy"), 100.0);
    }

    #[test]
    fn transfer_is_capped_by_source_share() {
        let specs = specs();
        let mut counters = Counters::from_specs(&specs);
        let mut rng = SmallRng::seed_from_u64(1);
        let flow = [Effect::transfer_from("consumer", "energy", 0.1, 2.0)];
        for _ in 0..10 {
            apply_effects(&flow, &specs, &mut counters, &mut rng);
        }
        // 2 per step until the 10% share of 100 is reached.
        assert_eq!(counters.get("consumer"), 10.0);
    }

    #[test]
    fn jitter_stays_in_range_and_is_seeded() {
        let specs = vec![CounterSpec::new("t", 25.0).bounded(15.0, 35.0)];
        let jitter = [Effect::jitter("t", -2.0, 2.0)];

        let mut a = Counters::from_specs(&specs);
        let mut b = Counters::from_specs(&specs);
        let mut rng_a = SmallRng::seed_from_u64(7);
        let mut rng_b = SmallRng::seed_from_u64(7);
        for _ in 0..100 {
            apply_effects(&jitter, &specs, &mut a, &mut rng_a);
            apply_effects(&jitter, &specs, &mut b, &mut rng_b);
            let t = a.get("t");
            assert!((15.0..=35.0).contains(&t));
        }
        assert_eq!(a, b);
    }

    #[test]
    fn pick_and_coin_produce_indices() {
        let specs = vec![CounterSpec::new("choice", 0.0), CounterSpec::new("coin", 0.0)];
        let mut counters = Counters::from_specs(&specs);
        let mut rng = SmallRng::seed_from_u64(3);
        let effects = [Effect::pick("choice", 5), Effect::coin("coin")];
        for _ in 0..50 {
            apply_effects(&effects, &specs, &mut counters, &mut rng);
            let choice = counters.get("choice");
            assert!((0.0..5.0).contains(&choice));
            assert_eq!(choice.fract(), 0.0);
            let coin = counters.get("coin");
            assert!(coin == 0.0 || coin == 1.0);
        }
    }

    #[test]
    fn rounding_is_applied_after_effects() {
        let specs = specs();
        let mut counters = Counters::from_specs(&specs);
        let mut rng = SmallRng::seed_from_u64(1);
        apply_effects(
            &[Effect::multiply("plants", 0.8333)],
            &specs,
            &mut counters,
            &mut rng,
        );
        assert_eq!(counters.get("plants"), 833.0);
    }

    #[test]
    fn undeclared_targets_are_ignored() {
        let specs = specs();
        let mut counters = Counters::from_specs(&specs);
        let before = counters.clone();
        let mut rng = SmallRng::seed_from_u64(1);
        apply_effects(&[Effect::add("ghost", 1.0)], &specs, &mut counters, &mut rng);
        assert_eq!(counters, before);
    }

    #[test]
    fn referenced_counters_include_transfer_source() {
        let effect = Effect::transfer_from("a", "b", 0.1, 1.0);
        let names: Vec<&str> = effect.referenced_counters().collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn degenerate_random_ranges_leave_values_unchanged() {
        let specs = specs();
        let mut counters = Counters::from_specs(&specs);
        let before = counters.clone();
        let mut rng = SmallRng::seed_from_u64(1);
        let effects = [
            Effect::jitter("energy", 1.0, 1.0),
            Effect::jitter("energy", 2.0, -2.0),
            Effect::scale_jitter("energy", f64::NAN, 0.1),
            Effect::jitter("energy", f64::NEG_INFINITY, f64::INFINITY),
            Effect::pick("day", 0),
            Effect::cycle("day", 0, 1),
        ];
        apply_effects(&effects, &specs, &mut counters, &mut rng);
        assert_eq!(counters, before);
    }
}
