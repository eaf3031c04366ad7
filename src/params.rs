//! Parameter metadata for the analysis configuration
//!
//! This module describes the numeric tunables of [`AnalysisConfig`], enabling:
//! - Grid search over backtest outcomes
//! - Parameter documentation
//! - Overriding a config from a flat `name -> value` map
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use trendscan::config::AnalysisConfig;
//!
//! for param in AnalysisConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut overrides = HashMap::new();
//! overrides.insert("min_volume_factor", 1.5);
//! let config = AnalysisConfig::default().with_params(&overrides).unwrap();
//! assert_eq!(config.min_volume_factor, 1.5);
//! ```

use std::collections::HashMap;

use crate::{config::AnalysisConfig, AnalysisError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value in 0.0..=1.0
  Ratio,
  /// Period value (positive integer)
  Period,
  /// Non-negative integer count
  Count,
  /// Unbounded real value (angles, factors, multiples)
  Value,
}

/// Metadata for a single configuration parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name, matching the `AnalysisConfig` field
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn count(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Count, default, range, description }
  }

  pub const fn value(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Value, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    if step <= 0.0 {
      values.push(min);
      return values;
    }
    let mut i = 0usize;
    loop {
      let v = min + step * i as f64;
      if v > max + 1e-9 {
        break;
      }
      values.push(v);
      i += 1;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(AnalysisError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(AnalysisError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Count => {
        if value < 0.0 || value.fract() != 0.0 {
          return Err(AnalysisError::InvalidValue("Count must be a non-negative integer"));
        }
        Ok(())
      },
      ParamType::Value => Ok(()),
    }
  }
}

const ANALYSIS_PARAMS: &[ParamMeta] = &[
  ParamMeta::count("min_confirmation_touches", 2.0, (2.0, 4.0, 1.0), "Minimum trendline touches"),
  ParamMeta::period("lookback_period", 50.0, (20.0, 100.0, 10.0), "Swing point lookback window"),
  ParamMeta::ratio("validation_threshold", 0.5, (0.3, 0.8, 0.1), "Minimum bounce ratio"),
  ParamMeta::ratio("proximity_threshold", 0.005, (0.002, 0.01, 0.002), "Touch distance as fraction of price"),
  ParamMeta::ratio("strength_threshold", 0.6, (0.5, 0.8, 0.05), "Minimum trendline strength"),
  ParamMeta::value("min_slope_angle", 5.0, (0.0, 15.0, 5.0), "Lower diagonal slope bound, degrees"),
  ParamMeta::value("max_slope_angle", 45.0, (30.0, 60.0, 5.0), "Upper diagonal slope bound, degrees"),
  ParamMeta::value("volatility_wick_ratio", 1.5, (1.0, 3.0, 0.5), "Wick/body ratio that switches touches to bodies"),
  ParamMeta::value("min_volume_factor", 1.2, (1.0, 2.0, 0.1), "Breakout volume over trailing average"),
  ParamMeta::ratio("confidence_threshold", 0.70, (0.6, 0.85, 0.05), "Breakout validity cutoff"),
  ParamMeta::value("pattern_confidence_threshold", 70.0, (60.0, 80.0, 5.0), "Pattern validity cutoff"),
  ParamMeta::value("stop_atr_multiple", 1.5, (1.0, 3.0, 0.5), "Stop distance in ATR"),
  ParamMeta::value("reward_risk_ratio", 2.0, (1.0, 3.0, 0.5), "Target distance over stop distance"),
  ParamMeta::period("max_holding_period", 30.0, (10.0, 50.0, 10.0), "Maximum forward candles held"),
];

impl AnalysisConfig {
  /// Metadata for all sweepable numeric parameters
  pub fn param_meta() -> &'static [ParamMeta] {
    ANALYSIS_PARAMS
  }

  /// Returns a copy with the given parameters overridden.
  ///
  /// Unknown keys are rejected; missing keys keep their current value.
  pub fn with_params(&self, params: &HashMap<&str, f64>) -> Result<Self> {
    let mut config = self.clone();
    for (&key, &value) in params {
      let meta = ANALYSIS_PARAMS
        .iter()
        .find(|m| m.name == key)
        .ok_or_else(|| AnalysisError::InvalidConfig(format!("unknown parameter: {key}")))?;
      meta.validate(value)?;
      match key {
        "min_confirmation_touches" => config.min_confirmation_touches = value as usize,
        "lookback_period" => config.lookback_period = get_period(params, key, 0)?,
        "validation_threshold" => config.validation_threshold = get_ratio(params, key, 0.0)?,
        "proximity_threshold" => config.proximity_threshold = get_ratio(params, key, 0.0)?,
        "strength_threshold" => config.strength_threshold = get_ratio(params, key, 0.0)?,
        "min_slope_angle" => config.min_slope_angle = value,
        "max_slope_angle" => config.max_slope_angle = value,
        "volatility_wick_ratio" => config.volatility_wick_ratio = value,
        "min_volume_factor" => config.min_volume_factor = value,
        "confidence_threshold" => config.confidence_threshold = get_ratio(params, key, 0.0)?,
        "pattern_confidence_threshold" => config.pattern_confidence_threshold = value,
        "stop_atr_multiple" => config.stop_atr_multiple = value,
        "reward_risk_ratio" => config.reward_risk_ratio = value,
        "max_holding_period" => config.max_holding_period = get_period(params, key, 0)?,
        _ => unreachable!("parameter table and setter list are out of sync"),
      }
    }
    config.validate()?;
    Ok(config)
  }
}

/// Cartesian product of the grids of the named parameters.
///
/// Unknown names are skipped.
pub fn param_grid(names: &[&str]) -> Vec<HashMap<&'static str, f64>> {
  let mut grid: Vec<HashMap<&'static str, f64>> = vec![HashMap::new()];
  for meta in ANALYSIS_PARAMS.iter().filter(|m| names.contains(&m.name)) {
    let values = meta.generate_grid();
    grid = grid
      .into_iter()
      .flat_map(|point| {
        values.iter().map(move |&v| {
          let mut next = point.clone();
          next.insert(meta.name, v);
          next
        })
      })
      .collect();
  }
  grid
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  Period::new(value as usize)
}

// ============================================================
// TESTS
// ============================================================
