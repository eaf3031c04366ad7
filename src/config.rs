//! Analysis configuration
//!
//! A single [`AnalysisConfig`] is passed into every entry point. All tunables that the
//! detectors, validators and backtester consult live here; nothing reads a hidden default.

use serde::{Deserialize, Serialize};

use crate::{AnalysisError, Period, Ratio, Result};

/// Every tunable of the detection, validation and backtest pipeline.
///
/// Thresholds that differ between call sites (trendline strength vs breakout confidence
/// vs pattern score) are kept as separate fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // --- trendlines ---
    /// Minimum touches for a trendline to be valid
    pub min_confirmation_touches: usize,
    /// Swing points older than this many bars from the end are ignored
    pub lookback_period: Period,
    /// Minimum bounce ratio (bounce_percent / 100) for a valid trendline
    pub validation_threshold: Ratio,
    /// Relative distance at which a candle counts as touching a line (0.005 = 0.5%)
    pub proximity_threshold: Ratio,
    /// Minimum trendline strength
    pub strength_threshold: Ratio,
    /// EMA periods used as dynamic support/resistance
    pub ema_periods: Vec<usize>,
    /// Diagonal slope bounds, degrees
    pub min_slope_angle: f64,
    pub max_slope_angle: f64,
    /// Measure diagonal touches against wicks (true) or bodies (false)
    pub use_wicks: bool,
    /// Switch diagonal touches to bodies when the mean wick/body ratio exceeds `volatility_wick_ratio`
    pub volatility_adjustment: bool,
    pub volatility_wick_ratio: f64,
    /// Cap on swing points per kind fed to the pairwise diagonal search
    pub max_swing_points: usize,

    // --- breakout validation ---
    pub require_volume_confirmation: bool,
    pub min_volume_factor: f64,
    pub require_higher_timeframe_alignment: bool,
    /// Breakout validity cutoff on the 0..=1 confidence scale
    pub confidence_threshold: Ratio,

    // --- pattern validation ---
    /// Pattern validity cutoff on the 0..=100 score scale
    pub pattern_confidence_threshold: f64,
    /// Relative tolerance used by double top/bottom and flag checks
    pub structure_tolerance: Ratio,
    /// Prices below this are penalized
    pub min_price: f64,
    /// Open-vs-previous-close move that counts as a gap (0.02 = 2%)
    pub gap_threshold: Ratio,

    // --- signals & backtest ---
    /// Stop distance from entry in ATR multiples
    pub stop_atr_multiple: f64,
    /// Target distance as a multiple of the stop distance
    pub reward_risk_ratio: f64,
    /// Maximum forward candles a trade may be held
    pub max_holding_period: Period,
    /// Fewer forward candles than this (without a target/stop hit) is "insufficient data"
    pub min_forward_candles: usize,
    /// Bars between successive scans during historical replay
    pub replay_step: Period,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_confirmation_touches: 2,
            lookback_period: Period::new_const(50),
            validation_threshold: Ratio::new_const(0.5),
            proximity_threshold: Ratio::new_const(0.005),
            strength_threshold: Ratio::new_const(0.6),
            ema_periods: vec![7, 50, 100],
            min_slope_angle: 5.0,
            max_slope_angle: 45.0,
            use_wicks: true,
            volatility_adjustment: true,
            volatility_wick_ratio: 1.5,
            max_swing_points: 50,
            require_volume_confirmation: true,
            min_volume_factor: 1.2,
            require_higher_timeframe_alignment: false,
            confidence_threshold: Ratio::new_const(0.70),
            pattern_confidence_threshold: 70.0,
            structure_tolerance: Ratio::new_const(0.03),
            min_price: 10.0,
            gap_threshold: Ratio::new_const(0.02),
            stop_atr_multiple: 1.5,
            reward_risk_ratio: 2.0,
            max_holding_period: Period::new_const(30),
            min_forward_candles: 20,
            replay_step: Period::new_const(5),
        }
    }
}

impl AnalysisConfig {
    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        if self.min_confirmation_touches == 0 {
            return Err(AnalysisError::InvalidConfig(
                "min_confirmation_touches must be >= 1".into(),
            ));
        }
        if self.ema_periods.is_empty() || self.ema_periods.contains(&0) {
            return Err(AnalysisError::InvalidConfig(
                "ema_periods must be non-empty and > 0".into(),
            ));
        }
        if !(0.0..90.0).contains(&self.min_slope_angle)
            || !(0.0..=90.0).contains(&self.max_slope_angle)
            || self.min_slope_angle > self.max_slope_angle
        {
            return Err(AnalysisError::InvalidConfig(format!(
                "slope angle bounds [{}, {}] must satisfy 0 <= min <= max <= 90",
                self.min_slope_angle, self.max_slope_angle
            )));
        }
        for (field, value) in [
            ("volatility_wick_ratio", self.volatility_wick_ratio),
            ("min_volume_factor", self.min_volume_factor),
            ("stop_atr_multiple", self.stop_atr_multiple),
            ("reward_risk_ratio", self.reward_risk_ratio),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AnalysisError::InvalidConfig(format!("{field} must be > 0, got {value}")));
            }
        }
        if !(0.0..=100.0).contains(&self.pattern_confidence_threshold) {
            return Err(AnalysisError::OutOfRange {
                field: "pattern_confidence_threshold",
                value: self.pattern_confidence_threshold,
                min: 0.0,
                max: 100.0,
            });
        }
        if !self.min_price.is_finite() || self.min_price < 0.0 {
            return Err(AnalysisError::InvalidConfig("min_price must be >= 0".into()));
        }
        if self.max_swing_points < 2 {
            return Err(AnalysisError::InvalidConfig("max_swing_points must be >= 2".into()));
        }
        Ok(())
    }

    /// Largest configured EMA period.
    pub fn max_ema_period(&self) -> usize {
        self.ema_periods.iter().copied().max().unwrap_or(0)
    }

    /// Bars required before the full trendline battery (horizontal, diagonal, EMA) runs.
    pub fn min_trendline_bars(&self) -> usize {
        self.lookback_period.get().max(self.max_ema_period())
    }
}
