//! Trendline breakout validation
//!
//! Confidence starts at 0.5 and moves with each signal:
//!
//! 1. the latest close must sit beyond the line, or the breakout is rejected
//! 2. +0.15 per close beyond the line in the last 3 bars
//! 3. +0.15 for a strong close, engulfing bar or dominant body
//! 4. volume expansion `+0.15 * min(2, factor - 1)`, or -0.25 when required and missing
//! 5. higher-timeframe alignment `+0.25 * strength`, +0.20 if it is breaking out too,
//!    -0.30 when required and missing
//! 6. momentum `x0.20`
//! 7. distance beyond the line `x0.20`
//! 8. trendline strength `x0.15`
//! 9. false-breakout risk `x-0.25`
//!
//! The result is clamped to 0..=1 and valid at or above the configured threshold.

use serde::Serialize;

use super::{Contribution, Scorecard};
use crate::{
    config::AnalysisConfig,
    detectors::{
        helpers::{
            is_body_dominant, is_engulfing, is_strong_close, opposing_wick_ratio, trailing_avg_range,
            trailing_avg_volume, LONG_WICK_RATIO,
        },
        trendline::{Side, Trendline},
    },
    Direction, OHLCVExt, OHLCV,
};

pub const BASE_CONFIDENCE: f64 = 0.5;
/// Bars (including the breakout candle) checked for confirming closes
pub const CONFIRMATION_WINDOW: usize = 3;
pub const VOLUME_PERIOD: usize = 10;
/// Higher-timeframe candles checked for direction agreement
pub const HTF_WINDOW: usize = 3;
/// Higher-timeframe strength below this counts as not aligned
pub const HTF_ALIGNED: f64 = 0.5;
pub const MOMENTUM_BARS: usize = 5;

const CONFIRMATION_WEIGHT: f64 = 0.15;
const SHAPE_BONUS: f64 = 0.15;
const VOLUME_WEIGHT: f64 = 0.15;
const VOLUME_PENALTY: f64 = -0.25;
const HTF_WEIGHT: f64 = 0.25;
const HTF_BREAKOUT_BONUS: f64 = 0.20;
const HTF_MISSING_PENALTY: f64 = -0.30;
const MOMENTUM_WEIGHT: f64 = 0.20;
const STRENGTH_WEIGHT: f64 = 0.20;
const TRENDLINE_WEIGHT: f64 = 0.15;
const RISK_WEIGHT: f64 = 0.25;

const FAILED_BREAKOUT_RISK: f64 = 0.15;
const LATE_BREAKOUT_RISK: f64 = 0.2;
const LATE_FRACTION: f64 = 0.9;
const WEAK_CLOSE_RISK: f64 = 0.15;
const LONG_WICK_RISK: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakoutValidation {
    pub is_valid: bool,
    pub direction: Direction,
    /// 0..=1
    pub confidence: f64,
    pub confirmation_candles: usize,
    pub volume_factor: f64,
    pub volume_confirmed: bool,
    pub higher_timeframe_strength: f64,
    pub higher_timeframe_breakout: bool,
    pub momentum: f64,
    pub breakout_strength: f64,
    pub false_breakout_risk: f64,
    /// Set when validation stopped early
    pub rejection: Option<&'static str>,
    pub scorecard: Scorecard,
}

impl BreakoutValidation {
    fn new(direction: Direction) -> Self {
        Self {
            is_valid: false,
            direction,
            confidence: 0.0,
            confirmation_candles: 0,
            volume_factor: 0.0,
            volume_confirmed: false,
            higher_timeframe_strength: 0.0,
            higher_timeframe_breakout: false,
            momentum: 0.0,
            breakout_strength: 0.0,
            false_breakout_risk: 0.0,
            rejection: None,
            scorecard: Scorecard::new(BASE_CONFIDENCE, 0.0, 1.0),
        }
    }

    fn reject(mut self, reason: &'static str, confidence: f64) -> Self {
        self.rejection = Some(reason);
        self.confidence = confidence;
        self.is_valid = false;
        self
    }
}

/// Resistance lines break upward, support lines downward.
#[inline]
pub fn breakout_direction(side: Side) -> Direction {
    match side {
        Side::Resistance => Direction::Bullish,
        Side::Support => Direction::Bearish,
    }
}

#[inline]
fn is_beyond(close: f64, level: f64, direction: Direction) -> bool {
    match direction {
        Direction::Bullish => close > level,
        Direction::Bearish => close < level,
    }
}

/// Score a breakout of `trendline` by the last candle of `bars`.
///
/// `higher` holds higher-timeframe candles covering the same period, if available.
pub fn validate_breakout<T: OHLCV>(
    trendline: &Trendline,
    bars: &[T],
    higher: Option<&[T]>,
    config: &AnalysisConfig,
) -> BreakoutValidation {
    let direction = breakout_direction(trendline.side);
    let mut result = BreakoutValidation::new(direction);

    let Some(last) = bars.last() else {
        return result.reject("no candles", 0.0);
    };
    let at = bars.len() - 1;
    let level = trendline.price_at(at);
    if !is_beyond(last.close(), level, direction) {
        return result.reject("close has not crossed the line", 0.0);
    }

    // confirmation; the breakout candle itself always counts
    let window_start = bars.len().saturating_sub(CONFIRMATION_WINDOW);
    let confirmations = (window_start..bars.len())
        .filter(|&i| is_beyond(bars[i].close(), trendline.price_at(i), direction))
        .count();
    result.confirmation_candles = confirmations;
    result.scorecard.push(Contribution::new(
        "confirmation",
        CONFIRMATION_WEIGHT,
        confirmations as f64,
        format!("{confirmations} of the last {} closes beyond the line", bars.len() - window_start),
    ));

    // candle shape
    let engulfing = at > 0 && is_engulfing(&bars[at - 1], last, direction);
    if is_strong_close(last, direction) || engulfing || is_body_dominant(last, direction) {
        result
            .scorecard
            .push(Contribution::fixed("candle_shape", SHAPE_BONUS, "decisive breakout candle"));
    }

    // volume
    let avg_volume = trailing_avg_volume(bars, at, VOLUME_PERIOD);
    let factor = if avg_volume > f64::EPSILON {
        last.volume() / avg_volume
    } else {
        1.0
    };
    let rising = at >= 2 && last.volume() > bars[at - 1].volume() && bars[at - 1].volume() > bars[at - 2].volume();
    result.volume_factor = factor;
    result.volume_confirmed = factor >= config.min_volume_factor || rising;
    if result.volume_confirmed {
        result.scorecard.push(Contribution::new(
            "volume",
            VOLUME_WEIGHT,
            (factor - 1.0).clamp(0.0, 2.0),
            format!("volume {factor:.2}x the {VOLUME_PERIOD}-bar average"),
        ));
    } else if config.require_volume_confirmation {
        result.scorecard.push(Contribution::fixed(
            "volume",
            VOLUME_PENALTY,
            format!("volume {factor:.2}x average, below {}", config.min_volume_factor),
        ));
        let confidence = result.scorecard.total();
        if confidence < BASE_CONFIDENCE {
            return result.reject("volume not confirmed", confidence);
        }
    }

    // higher timeframe
    if let Some(higher) = higher.filter(|h| !h.is_empty()) {
        let (strength, breaking) = higher_timeframe_alignment(higher, level, direction);
        result.higher_timeframe_strength = strength;
        result.higher_timeframe_breakout = breaking;
        result.scorecard.push(Contribution::new(
            "higher_timeframe",
            HTF_WEIGHT,
            strength,
            "higher-timeframe direction and level agreement",
        ));
        if breaking {
            result.scorecard.push(Contribution::fixed(
                "higher_timeframe_breakout",
                HTF_BREAKOUT_BONUS,
                "higher timeframe crossing the same level",
            ));
        }
    }
    if config.require_higher_timeframe_alignment && result.higher_timeframe_strength < HTF_ALIGNED {
        result.scorecard.push(Contribution::fixed(
            "higher_timeframe_missing",
            HTF_MISSING_PENALTY,
            "required higher-timeframe alignment not present",
        ));
    }

    result.momentum = momentum_score(bars, direction);
    result.scorecard.push(Contribution::new(
        "momentum",
        MOMENTUM_WEIGHT,
        result.momentum,
        format!("{MOMENTUM_BARS}-bar move relative to average range"),
    ));

    result.breakout_strength = breakout_strength(last, level, direction);
    result.scorecard.push(Contribution::new(
        "breakout_strength",
        STRENGTH_WEIGHT,
        result.breakout_strength,
        "close distance beyond the line over candle range",
    ));

    result.scorecard.push(Contribution::new(
        "trendline_strength",
        TRENDLINE_WEIGHT,
        trendline.strength.clamp(0.0, 1.0),
        format!("{} touches, {:.0}% bounces", trendline.touches, trendline.bounce_percent),
    ));

    result.false_breakout_risk = false_breakout_risk(trendline, bars, direction);
    result.scorecard.push(Contribution::new(
        "false_breakout_risk",
        -RISK_WEIGHT,
        result.false_breakout_risk,
        "prior failures, late breakout and weak candle",
    ));

    result.confidence = result.scorecard.total();
    result.is_valid = result.confidence >= config.confidence_threshold.get();
    result
}

/// Strength in 0..=1 from the direction of the last [`HTF_WINDOW`] higher-timeframe
/// candles (half) and the latest higher-timeframe close sitting beyond `level` (half),
/// plus whether that close has just crossed `level`.
pub fn higher_timeframe_alignment<T: OHLCV>(higher: &[T], level: f64, direction: Direction) -> (f64, bool) {
    let Some((last, _)) = higher.split_last() else {
        return (0.0, false);
    };
    let window = &higher[higher.len().saturating_sub(HTF_WINDOW)..];
    let matching = window
        .iter()
        .filter(|b| direction.sign() * (b.close() - b.open()) > 0.0)
        .count();
    let trend = matching as f64 / window.len() as f64;

    let beyond = is_beyond(last.close(), level, direction);
    let strength = 0.5 * trend + if beyond { 0.5 } else { 0.0 };
    let breaking = beyond && higher.len() >= 2 && !is_beyond(higher[higher.len() - 2].close(), level, direction);
    (strength, breaking)
}

/// Close change over [`MOMENTUM_BARS`] in units of average candle range per bar,
/// signed so that moves in `direction` are positive. -1..=1.
pub fn momentum_score<T: OHLCV>(bars: &[T], direction: Direction) -> f64 {
    let n = bars.len();
    if n < 2 {
        return 0.0;
    }
    let k = MOMENTUM_BARS.min(n - 1);
    let change = bars[n - 1].close() - bars[n - 1 - k].close();
    let avg_range = trailing_avg_range(bars, n - 1, VOLUME_PERIOD);
    if avg_range <= f64::EPSILON {
        return 0.0;
    }
    (direction.sign() * change / (avg_range * k as f64)).clamp(-1.0, 1.0)
}

/// How far the close sits beyond `level`, as a share of the candle's range. 0..=1.
pub fn breakout_strength<T: OHLCV>(bar: &T, level: f64, direction: Direction) -> f64 {
    let range = bar.range();
    if range <= f64::EPSILON {
        return 0.0;
    }
    (direction.sign() * (bar.close() - level) / range).clamp(0.0, 1.0)
}

/// 0..=1, higher is riskier.
///
/// Each earlier close beyond the line that was reversed on the next bar adds 0.15;
/// a breakout inside the last 10% of the line's span adds 0.2; a long opposing wick
/// adds 0.25, or a weak close 0.15.
pub fn false_breakout_risk<T: OHLCV>(trendline: &Trendline, bars: &[T], direction: Direction) -> f64 {
    let Some(last) = bars.last() else {
        return 0.0;
    };
    let at = bars.len() - 1;
    let mut risk = 0.0;

    let stop = bars.len().saturating_sub(CONFIRMATION_WINDOW);
    for i in trendline.start_index + 1..stop {
        let crossed = is_beyond(bars[i].close(), trendline.price_at(i), direction);
        let reverted = !is_beyond(bars[i + 1].close(), trendline.price_at(i + 1), direction);
        if crossed && reverted {
            risk += FAILED_BREAKOUT_RISK;
        }
    }

    let (start, end) = (trendline.start_index, trendline.end_index);
    if end > start && (start..=end).contains(&at) && (at - start) as f64 >= LATE_FRACTION * (end - start) as f64 {
        risk += LATE_BREAKOUT_RISK;
    }

    if opposing_wick_ratio(last, direction) > LONG_WICK_RATIO {
        risk += LONG_WICK_RISK;
    } else if !is_strong_close(last, direction) {
        risk += WEAK_CLOSE_RISK;
    }
    risk.min(1.0)
}
