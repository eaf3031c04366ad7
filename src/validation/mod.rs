//! Signal validation
//!
//! Both validators build their confidence as a [`Scorecard`]: a base value plus a list
//! of named [`Contribution`]s, each a signed delta scaled by a weight. The final
//! score is the clamped sum, and the list doubles as an audit trail.
//!
//! - **breakout**: trendline breakout confidence on a 0..=1 scale
//! - **pattern**: chart-pattern confidence on a 0..=100 scale

use serde::Serialize;

pub mod breakout;
pub mod pattern;

pub use breakout::{validate_breakout, BreakoutValidation};
pub use pattern::{validate_pattern, PatternRequest, PatternValidation};

/// One scoring signal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub name: &'static str,
    pub weight: f64,
    /// Raw signal, usually in -1..=1 or a fixed point adjustment
    pub delta: f64,
    pub rationale: String,
}

impl Contribution {
    /// Weighted contribution
    pub fn new(name: &'static str, weight: f64, delta: f64, rationale: impl Into<String>) -> Self {
        Self {
            name,
            weight,
            delta,
            rationale: rationale.into(),
        }
    }

    /// Fixed adjustment (weight 1)
    pub fn fixed(name: &'static str, delta: f64, rationale: impl Into<String>) -> Self {
        Self::new(name, 1.0, delta, rationale)
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.weight * self.delta
    }
}

/// Base score plus contributions, clamped to `[min, max]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scorecard {
    pub base: f64,
    pub min: f64,
    pub max: f64,
    pub contributions: Vec<Contribution>,
}

impl Scorecard {
    pub fn new(base: f64, min: f64, max: f64) -> Self {
        Self {
            base,
            min,
            max,
            contributions: Vec::new(),
        }
    }

    pub fn push(&mut self, contribution: Contribution) {
        self.contributions.push(contribution);
    }

    /// Push when present
    pub fn extend(&mut self, contribution: Option<Contribution>) {
        if let Some(c) = contribution {
            self.push(c);
        }
    }

    /// Unclamped running sum
    pub fn raw_total(&self) -> f64 {
        self.contributions.iter().fold(self.base, |acc, c| acc + c.value())
    }

    pub fn total(&self) -> f64 {
        let raw = self.raw_total();
        if raw.is_nan() {
            return self.min;
        }
        raw.clamp(self.min, self.max)
    }

    pub fn get(&self, name: &str) -> Option<&Contribution> {
        self.contributions.iter().find(|c| c.name == name)
    }

    /// `name: +0.15 (rationale)` lines, in push order
    pub fn explain(&self) -> Vec<String> {
        self.contributions
            .iter()
            .map(|c| format!("{}: {:+.3} ({})", c.name, c.value(), c.rationale))
            .collect()
    }
}
