//! Derived quantities: small deterministic formulas over counters.
//!
//! A topic may declare named [`Derived`] values such as "ecosystem health =
//! mean of three sub-scores, clamped to [10, 100]". Each one is an [`Expr`]
//! tree evaluated against the current counters, the phase index, the elapsed
//! tick count, and any derived value declared earlier in the same topic.
//!
//! Evaluation is total: unknown names read as 0.0 and division by zero yields
//! 0.0, so a projection can never fail. Unknown names are rejected when the
//! topic is built.

use std::collections::BTreeMap;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::effects::Counters;

/// An arithmetic expression over playback state.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal.
    Const(f64),
    /// A counter or an earlier derived value.
    Var(String),
    /// The active phase index.
    PhaseIndex,
    /// Ticks applied since the playback started.
    ElapsedTicks,
    /// `a + b`.
    Add(Box<Expr>, Box<Expr>),
    /// `a - b`.
    Sub(Box<Expr>, Box<Expr>),
    /// `a * b`.
    Mul(Box<Expr>, Box<Expr>),
    /// `a / b`, or 0.0 when `b` is zero.
    Div(Box<Expr>, Box<Expr>),
    /// `-a`.
    Neg(Box<Expr>),
    /// `|a|`.
    Abs(Box<Expr>),
    /// `min(a, b)`.
    Min(Box<Expr>, Box<Expr>),
    /// `max(a, b)`.
    Max(Box<Expr>, Box<Expr>),
    /// `sin(a)` with `a` in radians.
    Sin(Box<Expr>),
    /// Arithmetic mean of the terms (0.0 when empty).
    Mean(Vec<Expr>),
    /// `above` when `value > threshold`, else `below`.
    Step {
        /// Tested value.
        value: Box<Expr>,
        /// Strict threshold.
        threshold: f64,
        /// Result at or below the threshold.
        below: f64,
        /// Result above the threshold.
        above: f64,
    },
}

impl Expr {
    /// A reference to a counter or earlier derived value.
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    /// A literal.
    pub const fn constant(value: f64) -> Self {
        Self::Const(value)
    }

    /// Mean of several terms.
    pub const fn mean(terms: Vec<Self>) -> Self {
        Self::Mean(terms)
    }

    /// `min(self, other)`.
    #[must_use]
    pub fn at_most(self, other: impl Into<Self>) -> Self {
        Self::Min(Box::new(self), Box::new(other.into()))
    }

    /// `max(self, other)`.
    #[must_use]
    pub fn at_least(self, other: impl Into<Self>) -> Self {
        Self::Max(Box::new(self), Box::new(other.into()))
    }

    /// `clamp(self, low, high)`.
    #[must_use]
    pub fn clamped(self, low: f64, high: f64) -> Self {
        self.at_least(low).at_most(high)
    }

    /// `|self|`.
    #[must_use]
    pub fn abs(self) -> Self {
        Self::Abs(Box::new(self))
    }

    /// `sin(self)`.
    #[must_use]
    pub fn sin(self) -> Self {
        Self::Sin(Box::new(self))
    }

    /// Threshold test: `above` when `self > threshold`, else `below`.
    #[must_use]
    pub fn step(self, threshold: f64, below: f64, above: f64) -> Self {
        Self::Step {
            value: Box::new(self),
            threshold,
            below,
            above,
        }
    }

    /// Every variable name referenced by this expression.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Var(name) => out.push(name.as_str()),
            Self::Const(_) | Self::PhaseIndex | Self::ElapsedTicks => {}
            Self::Add(a, b)
            | Self::Sub(a, b)
            | Self::Mul(a, b)
            | Self::Div(a, b)
            | Self::Min(a, b)
            | Self::Max(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
            Self::Neg(a) | Self::Abs(a) | Self::Sin(a) => a.collect_variables(out),
            Self::Step { value, .. } => value.collect_variables(out),
            Self::Mean(terms) => {
                for term in terms {
                    term.collect_variables(out);
                }
            }
        }
    }

    /// Whether every literal in the expression is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Const(v) => v.is_finite(),
            Self::Var(_) | Self::PhaseIndex | Self::ElapsedTicks => true,
            Self::Add(a, b)
            | Self::Sub(a, b)
            | Self::Mul(a, b)
            | Self::Div(a, b)
            | Self::Min(a, b)
            | Self::Max(a, b) => a.is_finite() && b.is_finite(),
            Self::Neg(a) | Self::Abs(a) | Self::Sin(a) => a.is_finite(),
            Self::Step {
                value,
                threshold,
                below,
                above,
            } => value.is_finite() && threshold.is_finite() && below.is_finite() && above.is_finite(),
            Self::Mean(terms) => terms.iter().all(Self::is_finite),
        }
    }

    /// Evaluate the expression.
    pub fn eval(&self, env: &Env<'_>) -> f64 {
        match self {
            Self::Const(v) => *v,
            Self::Var(name) => env.lookup(name),
            Self::PhaseIndex => env.phase_index,
            Self::ElapsedTicks => env.elapsed_ticks,
            Self::Add(a, b) => a.eval(env) + b.eval(env),
            Self::Sub(a, b) => a.eval(env) - b.eval(env),
            Self::Mul(a, b) => a.eval(env) * b.eval(env),
            Self::Div(a, b) => {
                let denominator = b.eval(env);
                if denominator == 0.0 {
                    0.0
                } else {
                    a.eval(env) / denominator
                }
            }
            Self::Neg(a) => -a.eval(env),
            Self::Abs(a) => a.eval(env).abs(),
            Self::Min(a, b) => a.eval(env).min(b.eval(env)),
            Self::Max(a, b) => a.eval(env).max(b.eval(env)),
            Self::Sin(a) => a.eval(env).sin(),
            Self::Mean(terms) => {
                if terms.is_empty() {
                    return 0.0;
                }
                let sum: f64 = terms.iter().map(|t| t.eval(env)).sum();
                let count = terms.iter().fold(0.0_f64, |n, _| n + 1.0);
                sum / count
            }
            Self::Step {
                value,
                threshold,
                below,
                above,
            } => {
                if value.eval(env) > *threshold {
                    *above
                } else {
                    *below
                }
            }
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Self::Const(value)
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Self::Var(name.to_owned())
    }
}

impl<T: Into<Self>> Add<T> for Expr {
    type Output = Self;

    fn add(self, rhs: T) -> Self {
        Self::Add(Box::new(self), Box::new(rhs.into()))
    }
}

impl<T: Into<Self>> Sub<T> for Expr {
    type Output = Self;

    fn sub(self, rhs: T) -> Self {
        Self::Sub(Box::new(self), Box::new(rhs.into()))
    }
}

impl<T: Into<Self>> Mul<T> for Expr {
    type Output = Self;

    fn mul(self, rhs: T) -> Self {
        Self::Mul(Box::new(self), Box::new(rhs.into()))
    }
}

impl<T: Into<Self>> Div<T> for Expr {
    type Output = Self;

    fn div(self, rhs: T) -> Self {
        Self::Div(Box::new(self), Box::new(rhs.into()))
    }
}

impl Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self {
        Self::Neg(Box::new(self))
    }
}

/// A named derived quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct Derived {
    /// Name exposed in the render snapshot.
    pub name: String,
    /// Formula.
    pub expr: Expr,
}

impl Derived {
    /// Declare a derived quantity.
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }
}

/// Evaluation environment for [`Expr::eval`].
#[derive(Debug)]
pub struct Env<'a> {
    counters: &'a Counters,
    derived: &'a BTreeMap<String, f64>,
    phase_index: f64,
    elapsed_ticks: f64,
}

impl<'a> Env<'a> {
    /// Build an environment. Tick counts beyond 2^53 lose precision, which is
    /// irrelevant at human timescales.
    pub fn new(
        counters: &'a Counters,
        derived: &'a BTreeMap<String, f64>,
        phase_index: u32,
        elapsed_ticks: u64,
    ) -> Self {
        Self {
            counters,
            derived,
            phase_index: f64::from(phase_index),
            elapsed_ticks: u64_to_f64(elapsed_ticks),
        }
    }

    fn lookup(&self, name: &str) -> f64 {
        self.counters
            .try_get(name)
            .or_else(|| self.derived.get(name).copied())
            .unwrap_or(0.0)
    }
}

/// Evaluate every derived quantity in declaration order.
///
/// Later entries may read earlier ones.
pub fn evaluate_all(
    derived: &[Derived],
    counters: &Counters,
    phase_index: u32,
    elapsed_ticks: u64,
) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for entry in derived {
        let value = {
            let env = Env::new(counters, &out, phase_index, elapsed_ticks);
            entry.expr.eval(&env)
        };
        out.insert(entry.name.clone(), value);
    }
    out
}

/// Lossy `u64` to `f64` conversion through the high and low 32-bit halves.
fn u64_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & u64::from(u32::MAX)).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}
