//! Trendline detection
//!
//! Three line families share one touch/bounce/strength model:
//!
//! - **Horizontal**: a constant level through a swing low (support) or swing high (resistance)
//! - **Diagonal**: a line through two same-kind swing points at least
//!   [`MIN_DIAGONAL_SPAN`] bars apart, with its angle inside the configured bounds
//! - **EMA**: an exponential moving average treated as dynamic support/resistance
//!
//! A line's price at any bar is given by its [`PriceModel`], a plain serializable value.

use serde::{Deserialize, Serialize};

use super::{
    helpers::mean_wick_body_ratio,
    swing::{find_swing_points, recent_of_kind, SwingKind, SwingPoint},
};
use crate::{config::AnalysisConfig, indicators, OHLCVExt, OHLCV};

/// Minimum bar distance between the two anchors of a diagonal
pub const MIN_DIAGONAL_SPAN: usize = 3;
/// Touch count at which the touch component of strength saturates
pub const MAX_SCORED_TOUCHES: usize = 5;
/// Length (bars) at which the length component of strength saturates
pub const MAX_SCORED_LENGTH: usize = 30;
/// Diagonal angles inside this band (degrees) get full angle quality
pub const OPTIMAL_ANGLE: (f64, f64) = (15.0, 30.0);
/// Relative slope difference under which two diagonals from one anchor coincide
const SLOPE_EPSILON: f64 = 1e-9;

// ============================================================
// TYPES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Horizontal,
    Diagonal,
    Ema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Support,
    Resistance,
}

/// How a line's price is computed at a bar index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PriceModel {
    Horizontal {
        level: f64,
    },
    Diagonal {
        slope: f64,
        intercept: f64,
    },
    /// `values[k]` is the EMA at bar `offset + k`
    Ema {
        period: usize,
        offset: usize,
        values: Vec<f64>,
    },
}

impl PriceModel {
    /// Line price at `index`. EMA lookups clamp to the first/last computed value.
    pub fn price_at(&self, index: usize) -> f64 {
        match self {
            PriceModel::Horizontal { level } => *level,
            PriceModel::Diagonal { slope, intercept } => intercept + slope * index as f64,
            PriceModel::Ema { offset, values, .. } => {
                if values.is_empty() {
                    return 0.0;
                }
                let k = index.saturating_sub(*offset).min(values.len() - 1);
                values[k]
            },
        }
    }

    pub fn kind(&self) -> LineKind {
        match self {
            PriceModel::Horizontal { .. } => LineKind::Horizontal,
            PriceModel::Diagonal { .. } => LineKind::Diagonal,
            PriceModel::Ema { .. } => LineKind::Ema,
        }
    }
}

/// A scored support or resistance line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trendline {
    pub start_index: usize,
    pub end_index: usize,
    pub start_price: f64,
    pub end_price: f64,
    pub kind: LineKind,
    pub side: Side,
    pub ema_period: Option<usize>,
    pub touches: usize,
    /// Share of touches followed by a bounce, 0..=100
    pub bounce_percent: f64,
    /// 0..=1
    pub strength: f64,
    /// Latest close is still on the line's side
    pub active: bool,
    /// Diagonal angle in degrees
    pub slope_angle: Option<f64>,
    pub model: PriceModel,
}

impl Trendline {
    #[inline]
    pub fn price_at(&self, index: usize) -> f64 {
        self.model.price_at(index)
    }

    /// Bars spanned by the line
    #[inline]
    pub fn length(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    /// Touch, bounce and strength thresholds all met.
    pub fn is_valid(&self, config: &AnalysisConfig) -> bool {
        self.touches >= config.min_confirmation_touches
            && self.bounce_percent >= config.validation_threshold.get() * 100.0
            && self.strength >= config.strength_threshold.get()
    }
}

/// Touch and bounce counts of a line over a window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchStats {
    pub touches: usize,
    pub bounces: usize,
    pub bounce_percent: f64,
}

// ============================================================
// SCORING PRIMITIVES
// ============================================================

/// Count touches of `model` from `start` to the last bar.
///
/// A touch is a low (support) or high (resistance) within `proximity` of the line,
/// measured against the body edge instead when `use_bodies` is set. A touch is a
/// bounce when the next close moves further from the line than the touching close
/// and stays on the line's side.
pub fn count_touches<T: OHLCV>(
    bars: &[T],
    model: &PriceModel,
    side: Side,
    start: usize,
    proximity: f64,
    use_bodies: bool,
) -> TouchStats {
    let mut touches = 0;
    let mut bounces = 0;

    for i in start..bars.len() {
        let level = model.price_at(i);
        if level <= f64::EPSILON {
            continue;
        }
        let bar = &bars[i];
        let edge = match (side, use_bodies) {
            (Side::Support, false) => bar.low(),
            (Side::Support, true) => bar.body_bottom(),
            (Side::Resistance, false) => bar.high(),
            (Side::Resistance, true) => bar.body_top(),
        };
        if (edge - level).abs() / level > proximity {
            continue;
        }
        touches += 1;

        if let Some(next) = bars.get(i + 1) {
            let next_level = model.price_at(i + 1);
            let bounced = match side {
                Side::Support => next.close() > bar.close() && next.close() > next_level,
                Side::Resistance => next.close() < bar.close() && next.close() < next_level,
            };
            if bounced {
                bounces += 1;
            }
        }
    }

    let bounce_percent = if touches > 0 {
        bounces as f64 / touches as f64 * 100.0
    } else {
        0.0
    };
    TouchStats {
        touches,
        bounces,
        bounce_percent,
    }
}

/// Angle quality in 0..=1: full inside [`OPTIMAL_ANGLE`], decaying linearly outside.
pub fn slope_angle_quality(angle_deg: f64) -> f64 {
    let a = angle_deg.abs();
    let (lo, hi) = OPTIMAL_ANGLE;
    if a < lo {
        a / lo
    } else if a <= hi {
        1.0
    } else {
        (1.0 - (a - hi) / hi).max(0.0)
    }
}

/// Weighted blend of touches, bounce rate, length and (diagonals only) angle quality.
pub fn line_strength(touches: usize, bounce_percent: f64, length: usize, angle_deg: Option<f64>) -> f64 {
    let touch = touches.min(MAX_SCORED_TOUCHES) as f64 / MAX_SCORED_TOUCHES as f64;
    let bounce = (bounce_percent / 100.0).clamp(0.0, 1.0);
    let len = length.min(MAX_SCORED_LENGTH) as f64 / MAX_SCORED_LENGTH as f64;

    let strength = match angle_deg {
        Some(angle) => 0.3 * touch + 0.3 * bounce + 0.2 * len + 0.2 * slope_angle_quality(angle),
        None => 0.4 * touch + 0.3 * bounce + 0.3 * len,
    };
    strength.clamp(0.0, 1.0)
}

/// True if the line passes strictly inside any candle body from `start` to the last bar.
pub fn crosses_bodies<T: OHLCV>(bars: &[T], model: &PriceModel, start: usize) -> bool {
    bars.iter().enumerate().skip(start).any(|(i, bar)| {
        let p = model.price_at(i);
        p > bar.body_bottom() && p < bar.body_top()
    })
}

/// Diagonal touches use bodies when wicks are disabled, or when the window is
/// wick-dominated and volatility adjustment is on.
pub fn use_bodies_for<T: OHLCV>(bars: &[T], config: &AnalysisConfig) -> bool {
    !config.use_wicks
        || (config.volatility_adjustment && mean_wick_body_ratio(bars) > config.volatility_wick_ratio)
}

fn is_active<T: OHLCV>(bars: &[T], model: &PriceModel, side: Side, proximity: f64) -> bool {
    let Some(last) = bars.last() else {
        return false;
    };
    let level = model.price_at(bars.len() - 1);
    match side {
        Side::Support => last.close() >= level * (1.0 - proximity),
        Side::Resistance => last.close() <= level * (1.0 + proximity),
    }
}

fn build_line<T: OHLCV>(
    bars: &[T],
    model: PriceModel,
    side: Side,
    start: usize,
    slope_angle: Option<f64>,
    use_bodies: bool,
    config: &AnalysisConfig,
) -> Trendline {
    let end = bars.len() - 1;
    let proximity = config.proximity_threshold.get();
    let stats = count_touches(bars, &model, side, start, proximity, use_bodies);
    let strength = line_strength(stats.touches, stats.bounce_percent, end - start, slope_angle);
    let ema_period = match &model {
        PriceModel::Ema { period, .. } => Some(*period),
        _ => None,
    };

    Trendline {
        start_index: start,
        end_index: end,
        start_price: model.price_at(start),
        end_price: model.price_at(end),
        kind: model.kind(),
        side,
        ema_period,
        touches: stats.touches,
        bounce_percent: stats.bounce_percent,
        strength,
        active: is_active(bars, &model, side, proximity),
        slope_angle,
        model,
    }
}

fn side_of(kind: SwingKind) -> Side {
    match kind {
        SwingKind::Low => Side::Support,
        SwingKind::High => Side::Resistance,
    }
}

/// Swing points inside the lookback window, at most `max_swing_points` per kind.
fn candidate_swings(points: &[SwingPoint], len: usize, kind: SwingKind, config: &AnalysisConfig) -> Vec<SwingPoint> {
    let window_start = len.saturating_sub(config.lookback_period.get());
    let in_window: Vec<SwingPoint> = points.iter().filter(|p| p.index >= window_start).copied().collect();
    recent_of_kind(&in_window, kind, config.max_swing_points)
}

// ============================================================
// DETECTORS
// ============================================================

/// Valid horizontal lines through swing lows (support) and swing highs (resistance).
pub fn horizontal_lines<T: OHLCV>(bars: &[T], swings: &[SwingPoint], config: &AnalysisConfig) -> Vec<Trendline> {
    if bars.is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::new();
    for kind in [SwingKind::Low, SwingKind::High] {
        for point in candidate_swings(swings, bars.len(), kind, config) {
            let model = PriceModel::Horizontal { level: point.value };
            let line = build_line(bars, model, side_of(kind), point.index, None, false, config);
            if line.is_valid(config) {
                lines.push(line);
            }
        }
    }
    lines
}

/// Valid diagonal lines through pairs of same-kind swing points.
///
/// Pairs closer than [`MIN_DIAGONAL_SPAN`] bars, with an angle outside
/// `[min_slope_angle, max_slope_angle]`, or whose line cuts through a candle body
/// are discarded.
pub fn diagonal_lines<T: OHLCV>(bars: &[T], swings: &[SwingPoint], config: &AnalysisConfig) -> Vec<Trendline> {
    if bars.is_empty() {
        return Vec::new();
    }
    let use_bodies = use_bodies_for(bars, config);
    let mut lines = Vec::new();

    for kind in [SwingKind::Low, SwingKind::High] {
        let points = candidate_swings(swings, bars.len(), kind, config);
        for (a_pos, a) in points.iter().enumerate() {
            // collinear partners of `a` give the same line
            let mut slopes: Vec<f64> = Vec::new();
            for b in &points[a_pos + 1..] {
                if b.index - a.index < MIN_DIAGONAL_SPAN {
                    continue;
                }
                let slope = (b.value - a.value) / (b.index - a.index) as f64;
                if slopes.iter().any(|s| (s - slope).abs() <= SLOPE_EPSILON * s.abs().max(1.0)) {
                    continue;
                }
                slopes.push(slope);
                let angle = slope.atan().to_degrees();
                if angle.abs() < config.min_slope_angle || angle.abs() > config.max_slope_angle {
                    continue;
                }
                let model = PriceModel::Diagonal {
                    slope,
                    intercept: a.value - slope * a.index as f64,
                };
                if crosses_bodies(bars, &model, a.index) {
                    continue;
                }
                let line = build_line(bars, model, side_of(kind), a.index, Some(angle), use_bodies, config);
                if line.is_valid(config) {
                    lines.push(line);
                }
            }
        }
    }
    lines
}

/// Valid EMA lines, one per configured period with enough data.
///
/// The side follows the latest close: above the EMA makes it support.
pub fn ema_lines<T: OHLCV>(bars: &[T], config: &AnalysisConfig) -> Vec<Trendline> {
    let closes = indicators::closes(bars);
    let mut lines = Vec::new();

    for &period in &config.ema_periods {
        let values = indicators::ema(&closes, period);
        let (Some(&last_ema), Some(&last_close)) = (values.last(), closes.last()) else {
            continue;
        };
        let side = if last_close >= last_ema {
            Side::Support
        } else {
            Side::Resistance
        };
        let offset = period - 1;
        let model = PriceModel::Ema {
            period,
            offset,
            values,
        };
        let line = build_line(bars, model, side, offset, None, false, config);
        if line.is_valid(config) {
            lines.push(line);
        }
    }
    lines
}

/// Full trendline battery: horizontal, diagonal and EMA lines, strongest first.
///
/// Returns an empty list when fewer than `max(lookback_period, max(ema_periods))`
/// candles are supplied.
pub fn detect_trendlines<T: OHLCV>(bars: &[T], config: &AnalysisConfig) -> Vec<Trendline> {
    if bars.len() < config.min_trendline_bars().max(1) {
        return Vec::new();
    }
    let swings = find_swing_points(bars);

    let mut lines = horizontal_lines(bars, &swings, config);
    lines.extend(diagonal_lines(bars, &swings, config));
    lines.extend(ema_lines(bars, config));
    lines.sort_by(|a, b| b.strength.total_cmp(&a.strength));

    tracing::trace!(bars = bars.len(), swings = swings.len(), lines = lines.len(), "trendlines detected");
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Candle, Ratio};

    fn c(i: usize, o: f64, h: f64, l: f64, cl: f64) -> Candle {
        Candle::new(i as i64, o, h, l, cl, 1000.0)
    }

    /// Ten candles touching support at 100.0 twice (bars 2 and 6), each followed by a higher close.
    fn two_touch_support() -> Vec<Candle> {
        vec![
            c(0, 104.0, 106.0, 103.0, 105.0),
            c(1, 105.0, 105.5, 101.5, 102.0),
            c(2, 102.0, 102.5, 100.0, 101.0),
            c(3, 101.0, 104.5, 101.0, 104.0),
            c(4, 104.0, 106.0, 103.5, 105.0),
            c(5, 105.0, 105.0, 102.0, 102.5),
            c(6, 102.5, 103.0, 100.2, 101.5),
            c(7, 101.5, 105.0, 101.5, 104.5),
            c(8, 104.5, 107.0, 104.0, 106.0),
            c(9, 106.0, 108.0, 105.5, 107.0),
        ]
    }

    #[test]
    fn test_two_touches_both_bounce() {
        let bars = two_touch_support();
        let model = PriceModel::Horizontal { level: 100.0 };
        let stats = count_touches(&bars, &model, Side::Support, 0, 0.005, false);
        assert_eq!(stats.touches, 2);
        assert_eq!(stats.bounces, 2);
        assert_eq!(stats.bounce_percent, 100.0);
    }

    #[test]
    fn test_touch_on_last_bar_does_not_bounce() {
        let mut bars = two_touch_support();
        bars.truncate(7);
        let stats = count_touches(&bars, &PriceModel::Horizontal { level: 100.0 }, Side::Support, 0, 0.005, false);
        assert_eq!(stats.touches, 2);
        assert_eq!(stats.bounces, 1);
        assert_eq!(stats.bounce_percent, 50.0);
    }

    #[test]
    fn test_price_models() {
        assert_eq!(PriceModel::Horizontal { level: 5.0 }.price_at(100), 5.0);
        let diag = PriceModel::Diagonal { slope: 0.5, intercept: 10.0 };
        assert_eq!(diag.price_at(4), 12.0);
        let ema = PriceModel::Ema { period: 3, offset: 2, values: vec![1.0, 2.0, 3.0] };
        assert_eq!(ema.price_at(0), 1.0);
        assert_eq!(ema.price_at(3), 2.0);
        assert_eq!(ema.price_at(99), 3.0);
        assert_eq!(ema.kind(), LineKind::Ema);
    }

    #[test]
    fn test_price_model_serializes_tagged() {
        let json = serde_json::to_string(&PriceModel::Diagonal { slope: 1.0, intercept: 2.0 }).unwrap();
        assert_eq!(json, r#"{"kind":"diagonal","slope":1.0,"intercept":2.0}"#);
    }

    #[test]
    fn test_strength_bounds_and_angle_quality() {
        assert!((line_strength(10, 100.0, 100, None) - 1.0).abs() < 1e-12);
        assert_eq!(line_strength(0, 0.0, 0, None), 0.0);
        assert!((line_strength(5, 100.0, 30, Some(20.0)) - 1.0).abs() < 1e-12);
        assert!(line_strength(5, 100.0, 30, Some(5.0)) < 1.0);
        assert_eq!(slope_angle_quality(-20.0), 1.0);
        assert!((slope_angle_quality(7.5) - 0.5).abs() < 1e-12);
        assert_eq!(slope_angle_quality(60.0), 0.0);
    }

    #[test]
    fn test_crosses_bodies() {
        let bars = vec![c(0, 10.0, 12.0, 9.0, 11.0), c(1, 11.0, 13.0, 10.0, 12.0)];
        assert!(crosses_bodies(&bars, &PriceModel::Horizontal { level: 10.5 }, 0));
        assert!(!crosses_bodies(&bars, &PriceModel::Horizontal { level: 9.5 }, 0));
        // touching a body edge is not a cross
        assert!(!crosses_bodies(&bars, &PriceModel::Horizontal { level: 11.0 }, 1));
    }

    #[test]
    fn test_horizontal_support_detected() {
        // swing low at bar 3 (100.0), retested at bar 8 (100.3), both followed by higher closes
        let bars = vec![
            c(0, 106.0, 107.0, 105.0, 106.0),
            c(1, 106.0, 106.5, 104.0, 104.5),
            c(2, 104.5, 105.0, 102.0, 102.5),
            c(3, 102.5, 103.0, 100.0, 101.0),
            c(4, 101.0, 104.0, 100.8, 103.5),
            c(5, 103.5, 105.5, 103.0, 105.0),
            c(6, 105.0, 105.5, 102.5, 103.0),
            c(7, 103.0, 103.5, 101.0, 101.5),
            c(8, 101.5, 102.0, 100.3, 101.0),
            c(9, 101.0, 104.0, 100.9, 103.8),
            c(10, 103.8, 106.0, 103.5, 105.5),
            c(11, 105.5, 107.0, 105.0, 106.5),
            c(12, 106.5, 108.0, 106.0, 107.5),
            c(13, 107.5, 109.0, 107.0, 108.5),
        ];
        let swings = find_swing_points(&bars);
        let config = AnalysisConfig {
            strength_threshold: Ratio::new_const(0.5),
            ..Default::default()
        };
        let lines = horizontal_lines(&bars, &swings, &config);
        let support = lines
            .iter()
            .find(|l| l.side == Side::Support)
            .expect("support line at 100");
        assert_eq!(support.kind, LineKind::Horizontal);
        assert_eq!(support.start_index, 3);
        assert_eq!(support.start_price, 100.0);
        assert_eq!(support.touches, 2);
        assert_eq!(support.bounce_percent, 100.0);
        assert!(support.active);
    }

    /// Uptrend of 8-bar zigzags: swing lows every 8 bars from bar 4, all on
    /// `99.5 + slope * i`; swing highs every 8 bars from bar 8.
    fn zigzag(n: usize, slope: f64) -> Vec<Candle> {
        let close = |i: usize| 100.0 + slope * i as f64 + ((i % 8) as f64 - 4.0).abs();
        (0..n)
            .map(|i| {
                let cl = close(i);
                let o = if i == 0 { cl } else { (close(i - 1) + cl) / 2.0 };
                c(i, o, o.max(cl) + 0.5, o.min(cl) - 0.5, cl)
            })
            .collect()
    }

    fn fixed_wick_config() -> AnalysisConfig {
        AnalysisConfig {
            volatility_adjustment: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_diagonal_support_through_rising_lows() {
        let bars = zigzag(60, 0.5);
        let lines = diagonal_lines(&bars, &find_swing_points(&bars), &fixed_wick_config());
        let support = lines
            .iter()
            .find(|l| l.side == Side::Support && l.start_index == 12)
            .expect("support diagonal from bar 12");
        assert_eq!(support.kind, LineKind::Diagonal);
        let angle = support.slope_angle.expect("diagonal has an angle");
        assert!((angle - 0.5f64.atan().to_degrees()).abs() < 1e-12);
        assert_eq!(support.start_price, 105.5);
        // each swing low and the bar after it
        assert_eq!(support.touches, 12);
        assert_eq!(support.bounce_percent, 100.0);
        assert!(support.active);
    }

    #[test]
    fn test_collinear_swings_yield_one_line_per_anchor() {
        let bars = zigzag(60, 0.5);
        let lines = diagonal_lines(&bars, &find_swing_points(&bars), &fixed_wick_config());
        for (i, a) in lines.iter().enumerate() {
            for b in &lines[i + 1..] {
                assert!(
                    !(a.side == b.side && a.start_index == b.start_index),
                    "duplicate {:?} line from bar {}",
                    a.side,
                    a.start_index
                );
            }
        }
        let starts: Vec<usize> = lines
            .iter()
            .filter(|l| l.side == Side::Support)
            .map(|l| l.start_index)
            .collect();
        assert_eq!(starts, vec![12, 20, 28, 36, 44]);
    }

    #[test]
    fn test_shallow_diagonal_rejected_by_min_angle() {
        let bars = zigzag(60, 0.05);
        let swings = find_swing_points(&bars);
        assert!(diagonal_lines(&bars, &swings, &fixed_wick_config()).is_empty());

        let config = AnalysisConfig {
            min_slope_angle: 1.0,
            ..fixed_wick_config()
        };
        let lines = diagonal_lines(&bars, &swings, &config);
        assert!(lines.iter().any(|l| l.side == Side::Support));
        assert!(lines.iter().all(|l| l.slope_angle.is_some_and(|a| a >= 1.0 && a < 5.0)));
    }

    #[test]
    fn test_diagonal_through_body_rejected() {
        let mut bars = zigzag(60, 0.5);
        // support line sits at 115.5 on bar 32
        bars[32] = c(32, 120.0, 120.5, 114.5, 115.0);
        let lines = diagonal_lines(&bars, &find_swing_points(&bars), &fixed_wick_config());
        let support: Vec<&Trendline> = lines.iter().filter(|l| l.side == Side::Support).collect();
        assert!(!support.is_empty());
        assert!(support.iter().all(|l| l.start_index > 32));
    }

    #[test]
    fn test_disabling_wicks_measures_touches_on_bodies() {
        let bars = zigzag(60, 0.5);
        let swings = find_swing_points(&bars);
        let wicks = AnalysisConfig {
            proximity_threshold: Ratio::new_const(0.002),
            ..fixed_wick_config()
        };
        let bodies = AnalysisConfig {
            use_wicks: false,
            ..wicks.clone()
        };
        assert!(!use_bodies_for(&bars, &wicks));
        assert!(use_bodies_for(&bars, &bodies));

        assert!(diagonal_lines(&bars, &swings, &wicks)
            .iter()
            .any(|l| l.side == Side::Support));
        // body bottoms sit half a point above the line through the lows
        assert!(!diagonal_lines(&bars, &swings, &bodies)
            .iter()
            .any(|l| l.side == Side::Support));
    }

    #[test]
    fn test_detect_trendlines_degrades_on_short_input() {
        let bars = two_touch_support();
        assert!(detect_trendlines(&bars, &AnalysisConfig::default()).is_empty());
    }

    #[test]
    fn test_ema_line_side_follows_close() {
        let bars: Vec<Candle> = (0..40)
            .map(|i| {
                let p = 100.0 + i as f64 * 0.5;
                c(i, p - 0.2, p + 0.3, p - 0.4, p)
            })
            .collect();
        let config = AnalysisConfig {
            ema_periods: vec![7],
            proximity_threshold: Ratio::new_const(0.02),
            min_confirmation_touches: 1,
            validation_threshold: Ratio::new_const(0.0),
            strength_threshold: Ratio::new_const(0.0),
            ..Default::default()
        };
        let lines = ema_lines(&bars, &config);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].side, Side::Support);
        assert_eq!(lines[0].ema_period, Some(7));
        assert_eq!(lines[0].start_index, 6);
    }
}
