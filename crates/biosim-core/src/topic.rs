//! Phase tables: the static description of a topic.
//!
//! A [`Topic`] is an ordered, non-empty list of [`Phase`]s plus everything the
//! engine needs to animate it: the declared advance policy, counters, per-tick
//! effects, derived quantities, and an optional dynamics rule. Topics are
//! immutable once built. [`TopicBuilder::build`] validates the whole table so
//! that a malformed topic fails at construction instead of hanging or
//! misbehaving at runtime.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use biosim_types::AdvancePolicy;

use crate::derive::Derived;
use crate::dynamics::TopicDynamics;
use crate::effects::{CounterSpec, Effect, EffectOp};

/// Errors detected while building a topic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    /// The topic declares no phases.
    #[error("topic {topic} has no phases")]
    EmptyPhaseTable {
        /// Topic identifier.
        topic: String,
    },

    /// A phase has a zero dwell duration.
    #[error("phase {phase} of topic {topic} has a zero dwell duration")]
    ZeroDwell {
        /// Topic identifier.
        topic: String,
        /// Offending phase name.
        phase: String,
    },

    /// The lead-in leaves no phase for the clock to revisit.
    #[error("topic {topic} has a lead-in of {lead_in} but only {phases} phases")]
    InvalidLeadIn {
        /// Topic identifier.
        topic: String,
        /// Declared lead-in.
        lead_in: u32,
        /// Number of phases.
        phases: usize,
    },

    /// Two phases share a name.
    #[error("topic {topic} declares phase {phase} more than once")]
    DuplicatePhase {
        /// Topic identifier.
        topic: String,
        /// Duplicated phase name.
        phase: String,
    },

    /// Two counters or derived quantities share a name.
    #[error("topic {topic} declares {name} more than once")]
    DuplicateName {
        /// Topic identifier.
        topic: String,
        /// Duplicated name.
        name: String,
    },

    /// An effect, derived expression, or dynamics rule refers to an
    /// undeclared name.
    #[error("topic {topic} references undeclared name {name} in {context}")]
    UnknownName {
        /// Topic identifier.
        topic: String,
        /// The missing name.
        name: String,
        /// Where the reference appears.
        context: String,
    },

    /// A counter declaration is inconsistent.
    #[error("counter {counter} of topic {topic} is invalid: {reason}")]
    InvalidCounter {
        /// Topic identifier.
        topic: String,
        /// Counter name.
        counter: String,
        /// Explanation.
        reason: String,
    },

    /// An effect has parameters that cannot be evaluated.
    #[error("effect on {counter} in topic {topic} is invalid: {reason}")]
    InvalidEffect {
        /// Topic identifier.
        topic: String,
        /// Target counter.
        counter: String,
        /// Explanation.
        reason: String,
    },

    /// A derived expression contains a non-finite literal.
    #[error("derived quantity {name} of topic {topic} contains a non-finite literal")]
    InvalidDerived {
        /// Topic identifier.
        topic: String,
        /// Derived quantity name.
        name: String,
    },
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// One discrete, named step within a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    /// Machine name, unique within the topic.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Description shown while the phase is active.
    pub description: String,
    /// How long the phase stays active, in milliseconds.
    pub dwell_ms: u64,
    /// Effects applied when the clock enters this phase.
    pub effects: Vec<Effect>,
    /// Free-form detail lines for the view.
    pub details: Vec<String>,
}

impl Phase {
    /// Declare a phase with no effects or details.
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
        dwell_ms: u64,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            description: description.into(),
            dwell_ms,
            effects: Vec::new(),
            details: Vec::new(),
        }
    }

    /// Append an entry effect.
    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Append several detail lines.
    #[must_use]
    pub fn with_details<I, S>(mut self, details: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.details.extend(details.into_iter().map(Into::into));
        self
    }

    /// Dwell as a [`Duration`].
    pub const fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// A validated, immutable phase table.
#[derive(Debug, Clone)]
pub struct Topic {
    id: String,
    name: String,
    description: String,
    phases: Vec<Phase>,
    policy: AdvancePolicy,
    counters: Vec<CounterSpec>,
    tick_effects: Vec<Effect>,
    derived: Vec<Derived>,
    dynamics: Option<Arc<dyn TopicDynamics>>,
    history_len: usize,
    lead_in: u32,
}

impl Topic {
    /// Start building a topic.
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> TopicBuilder {
        TopicBuilder::new(id, name)
    }

    /// Return a copy of this topic with a different advance policy.
    #[must_use]
    pub fn with_policy(mut self, policy: AdvancePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stable identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Ordered phases (never empty).
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Number of phases as a `u32`, saturating.
    pub fn phase_count(&self) -> u32 {
        u32::try_from(self.phases.len()).unwrap_or(u32::MAX)
    }

    /// Phase at `index`, if in range.
    pub fn phase(&self, index: u32) -> Option<&Phase> {
        usize::try_from(index).ok().and_then(|i| self.phases.get(i))
    }

    /// Index of the phase with the given name.
    pub fn phase_index(&self, name: &str) -> Option<u32> {
        self.phases
            .iter()
            .position(|p| p.name == name)
            .and_then(|i| u32::try_from(i).ok())
    }

    /// Declared advance policy.
    pub const fn policy(&self) -> AdvancePolicy {
        self.policy
    }

    /// Counter declarations.
    pub fn counters(&self) -> &[CounterSpec] {
        &self.counters
    }

    /// Effects applied on every tick after the phase entry effects.
    pub fn tick_effects(&self) -> &[Effect] {
        &self.tick_effects
    }

    /// Derived quantity declarations.
    pub fn derived(&self) -> &[Derived] {
        &self.derived
    }

    /// Optional dynamics rule.
    pub fn dynamics(&self) -> Option<&dyn TopicDynamics> {
        self.dynamics.as_deref()
    }

    /// How many recently entered phases the snapshot reports.
    pub const fn history_len(&self) -> usize {
        self.history_len
    }

    /// Number of leading phases shown only at start or after a reset.
    pub const fn lead_in(&self) -> u32 {
        self.lead_in
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`Topic`].
#[derive(Debug)]
pub struct TopicBuilder {
    id: String,
    name: String,
    description: String,
    phases: Vec<Phase>,
    policy: AdvancePolicy,
    counters: Vec<CounterSpec>,
    tick_effects: Vec<Effect>,
    derived: Vec<Derived>,
    dynamics: Option<Arc<dyn TopicDynamics>>,
    history_len: usize,
    lead_in: u32,
}

impl TopicBuilder {
    /// Start a builder with a cyclic policy and nothing else.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            phases: Vec::new(),
            policy: AdvancePolicy::Cyclic,
            counters: Vec::new(),
            tick_effects: Vec::new(),
            derived: Vec::new(),
            dynamics: None,
            history_len: 0,
            lead_in: 0,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the advance policy.
    #[must_use]
    pub const fn policy(mut self, policy: AdvancePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Append a phase.
    #[must_use]
    pub fn phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    /// Declare a counter.
    #[must_use]
    pub fn counter(mut self, spec: CounterSpec) -> Self {
        self.counters.push(spec);
        self
    }

    /// Add an effect applied on every tick.
    #[must_use]
    pub fn every_tick(mut self, effect: Effect) -> Self {
        self.tick_effects.push(effect);
        self
    }

    /// Declare a derived quantity.
    #[must_use]
    pub fn derive(mut self, derived: Derived) -> Self {
        self.derived.push(derived);
        self
    }

    /// Attach a dynamics rule.
    #[must_use]
    pub fn dynamics(mut self, dynamics: Arc<dyn TopicDynamics>) -> Self {
        self.dynamics = Some(dynamics);
        self
    }

    /// Keep the labels of the last `len` entered phases in snapshots.
    #[must_use]
    pub const fn history(mut self, len: usize) -> Self {
        self.history_len = len;
        self
    }

    /// Show the first `phases` phases only at start or after a reset.
    ///
    /// Cyclic clocks wrap to the first phase after the lead-in and random
    /// clocks never pick a lead-in phase.
    #[must_use]
    pub const fn lead_in(mut self, phases: u32) -> Self {
        self.lead_in = phases;
        self
    }

    /// Validate and freeze the topic.
    ///
    /// # Errors
    ///
    /// Returns a [`TopicError`] describing the first problem found.
    pub fn build(self) -> Result<Topic, TopicError> {
        self.validate()?;
        Ok(Topic {
            id: self.id,
            name: self.name,
            description: self.description,
            phases: self.phases,
            policy: self.policy,
            counters: self.counters,
            tick_effects: self.tick_effects,
            derived: self.derived,
            dynamics: self.dynamics,
            history_len: self.history_len,
            lead_in: self.lead_in,
        })
    }

    fn validate(&self) -> Result<(), TopicError> {
        let topic = &self.id;

        if self.phases.is_empty() {
            return Err(TopicError::EmptyPhaseTable {
                topic: topic.clone(),
            });
        }

        let mut phase_names = BTreeSet::new();
        for phase in &self.phases {
            if phase.dwell_ms == 0 {
                return Err(TopicError::ZeroDwell {
                    topic: topic.clone(),
                    phase: phase.name.clone(),
                });
            }
            if !phase_names.insert(phase.name.as_str()) {
                return Err(TopicError::DuplicatePhase {
                    topic: topic.clone(),
                    phase: phase.name.clone(),
                });
            }
        }

        if !usize::try_from(self.lead_in).is_ok_and(|n| n < self.phases.len()) {
            return Err(TopicError::InvalidLeadIn {
                topic: topic.clone(),
                lead_in: self.lead_in,
                phases: self.phases.len(),
            });
        }

        let mut counter_names = BTreeSet::new();
        for spec in &self.counters {
            if !counter_names.insert(spec.name.as_str()) {
                return Err(TopicError::DuplicateName {
                    topic: topic.clone(),
                    name: spec.name.clone(),
                });
            }
            validate_counter(topic, spec)?;
        }

        for phase in &self.phases {
            for effect in &phase.effects {
                validate_effect(topic, effect, &counter_names, &format!("phase {}", phase.name))?;
            }
        }
        for effect in &self.tick_effects {
            validate_effect(topic, effect, &counter_names, "tick effects")?;
        }

        let mut visible: BTreeSet<&str> = counter_names.clone();
        for derived in &self.derived {
            if !derived.expr.is_finite() {
                return Err(TopicError::InvalidDerived {
                    topic: topic.clone(),
                    name: derived.name.clone(),
                });
            }
            for var in derived.expr.variables() {
                if !visible.contains(var) {
                    return Err(TopicError::UnknownName {
                        topic: topic.clone(),
                        name: var.to_owned(),
                        context: format!("derived quantity {}", derived.name),
                    });
                }
            }
            if !visible.insert(derived.name.as_str()) {
                return Err(TopicError::DuplicateName {
                    topic: topic.clone(),
                    name: derived.name.clone(),
                });
            }
        }

        if let Some(dynamics) = &self.dynamics {
            for name in dynamics.counters() {
                if !counter_names.contains(name) {
                    return Err(TopicError::UnknownName {
                        topic: topic.clone(),
                        name: (*name).to_owned(),
                        context: "dynamics".to_owned(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn validate_counter(topic: &str, spec: &CounterSpec) -> Result<(), TopicError> {
    let invalid = |reason: &str| TopicError::InvalidCounter {
        topic: topic.to_owned(),
        counter: spec.name.clone(),
        reason: reason.to_owned(),
    };

    let finite = spec.initial.is_finite()
        && spec.min.is_none_or(f64::is_finite)
        && spec.max.is_none_or(f64::is_finite);
    if !finite {
        return Err(invalid("values must be finite"));
    }
    if let (Some(min), Some(max)) = (spec.min, spec.max) {
        if min > max {
            return Err(invalid("min exceeds max"));
        }
    }
    if spec.min.is_some_and(|min| spec.initial < min)
        || spec.max.is_some_and(|max| spec.initial > max)
    {
        return Err(invalid("initial value lies outside the bounds"));
    }
    Ok(())
}

fn validate_effect(
    topic: &str,
    effect: &Effect,
    counters: &BTreeSet<&str>,
    context: &str,
) -> Result<(), TopicError> {
    for name in effect.referenced_counters() {
        if !counters.contains(name) {
            return Err(TopicError::UnknownName {
                topic: topic.to_owned(),
                name: name.to_owned(),
                context: context.to_owned(),
            });
        }
    }

    let invalid = |reason: &str| TopicError::InvalidEffect {
        topic: topic.to_owned(),
        counter: effect.counter.clone(),
        reason: reason.to_owned(),
    };

    match &effect.op {
        EffectOp::Set(v) | EffectOp::Add(v) | EffectOp::Multiply(v) if !v.is_finite() => {
            return Err(invalid("operand must be finite"));
        }
        EffectOp::Cycle { modulus: 0, .. } => return Err(invalid("cycle modulus must be positive")),
        EffectOp::Pick { choices: 0 } => return Err(invalid("pick needs at least one choice")),
        EffectOp::Uniform { low, high } | EffectOp::ScaleUniform { low, high }
            if !(low.is_finite() && high.is_finite() && low < high) =>
        {
            return Err(invalid("random range must be finite and non-empty"));
        }
        EffectOp::TransferFrom { fraction, step, .. }
            if !(fraction.is_finite() && step.is_finite()) =>
        {
            return Err(invalid("transfer parameters must be finite"));
        }
        _ => {}
    }

    if let (Some(floor), Some(ceiling)) = (effect.floor, effect.ceiling) {
        if floor > ceiling {
            return Err(invalid("floor exceeds ceiling"));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::derive::Expr;

    fn two_phase() -> TopicBuilder {
        Topic::builder("heart", "Heart")
            .phase(Phase::new("diastole", "Diastole", "Chambers fill", 1000))
            .phase(Phase::new("systole", "Systole", "Chambers contract", 1000))
    }

    #[test]
    fn builds_valid_topic() {
        let topic = two_phase()
            .counter(CounterSpec::new("flow", 0.0))
            .every_tick(Effect::cycle("flow", 4, 0))
            .build()
            .unwrap();
        assert_eq!(topic.id(), "heart");
        assert_eq!(topic.phase_count(), 2);
        assert_eq!(topic.policy(), AdvancePolicy::Cyclic);
        assert_eq!(topic.phase_index("systole"), Some(1));
        assert_eq!(topic.phase(1).unwrap().dwell(), Duration::from_millis(1000));
        assert!(topic.phase(2).is_none());
    }

    #[test]
    fn rejects_empty_phase_table() {
        let err = Topic::builder("empty", "Empty").build().unwrap_err();
        assert_eq!(
            err,
            TopicError::EmptyPhaseTable {
                topic: "empty".to_owned()
            }
        );
    }

    #[test]
    fn rejects_zero_dwell() {
        let err = Topic::builder("t", "T")
            .phase(Phase::new("a", "A", "", 0))
            .build()
            .unwrap_err();
        assert!(matches!(err, TopicError::ZeroDwell { .. }));
    }

    #[test]
    fn rejects_duplicate_phase_names() {
        let err = two_phase()
            .phase(Phase::new("systole", "Again", "", 10))
            .build()
            .unwrap_err();
        assert!(matches!(err, TopicError::DuplicatePhase { .. }));
    }

    #[test]
    fn rejects_unknown_counter_in_effect() {
        let err = two_phase()
            .every_tick(Effect::add("missing", 1.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, TopicError::UnknownName { .. }));
    }

    #[test]
    fn rejects_unknown_transfer_source() {
        let err = two_phase()
            .counter(CounterSpec::new("energy", 0.0))
            .every_tick(Effect::transfer_from("energy", "sun", 0.1, 1.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, TopicError::UnknownName { ref name, .. } if name == "sun"));
    }

    #[test]
    fn rejects_initial_outside_bounds() {
        let err = two_phase()
            .counter(CounterSpec::new("x", 50.0).bounded(0.0, 10.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, TopicError::InvalidCounter { .. }));
    }

    #[test]
    fn rejects_empty_random_range() {
        let err = two_phase()
            .counter(CounterSpec::new("x", 0.0))
            .every_tick(Effect::jitter("x", 1.0, 1.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, TopicError::InvalidEffect { .. }));
    }

    #[test]
    fn rejects_zero_modulus() {
        let err = two_phase()
            .counter(CounterSpec::new("x", 0.0))
            .every_tick(Effect::cycle("x", 0, 0))
            .build()
            .unwrap_err();
        assert!(matches!(err, TopicError::InvalidEffect { .. }));
    }

    #[test]
    fn derived_may_only_read_declared_or_earlier_names() {
        let ok = two_phase()
            .counter(CounterSpec::new("x", 1.0))
            .derive(Derived::new("double", Expr::var("x") * 2.0))
            .derive(Derived::new("quad", Expr::var("double") * 2.0))
            .build();
        assert!(ok.is_ok());

        let err = two_phase()
            .counter(CounterSpec::new("x", 1.0))
            .derive(Derived::new("quad", Expr::var("double") * 2.0))
            .derive(Derived::new("double", Expr::var("x") * 2.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, TopicError::UnknownName { .. }));
    }

    #[test]
    fn derived_name_cannot_shadow_counter() {
        let err = two_phase()
            .counter(CounterSpec::new("x", 1.0))
            .derive(Derived::new("x", Expr::constant(1.0)))
            .build()
            .unwrap_err();
        assert!(matches!(err, TopicError::DuplicateName { .. }));
    }

    #[test]
    fn lead_in_must_leave_a_phase() {
        let topic = two_phase().lead_in(1).build().unwrap();
        assert_eq!(topic.lead_in(), 1);
        let err = two_phase().lead_in(2).build().unwrap_err();
        assert_eq!(
            err,
            TopicError::InvalidLeadIn {
                topic: "heart".to_owned(),
                lead_in: 2,
                phases: 2,
            }
        );
    }

    #[test]
    fn with_policy_changes_only_policy() {
        let topic = two_phase().build().unwrap();
        let terminal = topic.clone().with_policy(AdvancePolicy::Terminal);
        assert_eq!(terminal.policy(), AdvancePolicy::Terminal);
        assert_eq!(terminal.phases(), topic.phases());
    }
}
