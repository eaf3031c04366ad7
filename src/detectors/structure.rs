//! Chart-pattern geometry checks
//!
//! Each check inspects the recent candles for one named pattern and returns
//! whether the geometry holds together with a 0..=1 confidence. The pattern
//! validator blends this into its composite score.

use serde::{Deserialize, Serialize};

use super::swing::{find_swing_points, SwingKind, SwingPoint};
use crate::{indicators, Direction, OHLCV};

/// Minimum bars between the two peaks (or troughs) of a double top/bottom
pub const MIN_PEAK_SEPARATION: usize = 5;
/// Bars forming a flag pole
pub const POLE_BARS: usize = 8;
pub const MIN_FLAG_BARS: usize = 5;
pub const MAX_FLAG_BARS: usize = 15;
/// Minimum pole move, relative to its starting price
pub const MIN_POLE_MOVE: f64 = 0.05;
/// Flag range may not exceed this share of the pole height
pub const MAX_FLAG_TIGHTNESS: f64 = 0.5;
/// Flag may not retrace more than this share of the pole
pub const MAX_FLAG_RETRACE: f64 = 0.5;

/// Named setups the scanner can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    TrendlineBreakout,
    ChannelBreakout,
    DoubleTop,
    DoubleBottom,
    BullFlag,
    BearFlag,
}

impl PatternKind {
    pub const STRUCTURAL: [PatternKind; 4] = [
        PatternKind::DoubleTop,
        PatternKind::DoubleBottom,
        PatternKind::BullFlag,
        PatternKind::BearFlag,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::TrendlineBreakout => "trendline_breakout",
            PatternKind::ChannelBreakout => "channel_breakout",
            PatternKind::DoubleTop => "double_top",
            PatternKind::DoubleBottom => "double_bottom",
            PatternKind::BullFlag => "bull_flag",
            PatternKind::BearFlag => "bear_flag",
        }
    }

    /// Fixed direction of a structural pattern; breakouts take theirs from the event.
    pub fn typical_direction(self) -> Option<Direction> {
        match self {
            PatternKind::DoubleBottom | PatternKind::BullFlag => Some(Direction::Bullish),
            PatternKind::DoubleTop | PatternKind::BearFlag => Some(Direction::Bearish),
            PatternKind::TrendlineBreakout | PatternKind::ChannelBreakout => None,
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a geometry check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureCheck {
    pub is_valid: bool,
    /// 0..=1
    pub confidence: f64,
    /// Measured-move objective
    pub target: Option<f64>,
    /// Price that negates the pattern
    pub invalidation: Option<f64>,
}

impl StructureCheck {
    pub const fn rejected() -> Self {
        Self {
            is_valid: false,
            confidence: 0.0,
            target: None,
            invalidation: None,
        }
    }
}

/// Run the geometry check for `kind`. Breakout kinds have none and return `None`.
pub fn check_structure<T: OHLCV>(kind: PatternKind, bars: &[T], tolerance: f64) -> Option<StructureCheck> {
    match kind {
        PatternKind::DoubleTop => Some(double_top(bars, tolerance)),
        PatternKind::DoubleBottom => Some(double_bottom(bars, tolerance)),
        PatternKind::BullFlag => Some(flag(bars, Direction::Bullish)),
        PatternKind::BearFlag => Some(flag(bars, Direction::Bearish)),
        PatternKind::TrendlineBreakout | PatternKind::ChannelBreakout => None,
    }
}

fn last_two(points: &[SwingPoint], kind: SwingKind) -> Option<(SwingPoint, SwingPoint)> {
    let mut of_kind = points.iter().rev().filter(|p| p.kind == kind);
    let second = *of_kind.next()?;
    let first = *of_kind.find(|p| second.index - p.index >= MIN_PEAK_SEPARATION)?;
    Some((first, second))
}

/// Two swing highs within `tolerance` of each other, separated by a trough at least
/// `tolerance` deep, with price now back below the second peak.
pub fn double_top<T: OHLCV>(bars: &[T], tolerance: f64) -> StructureCheck {
    double_extreme(bars, tolerance, Direction::Bearish)
}

/// Mirror of [`double_top`] on swing lows.
pub fn double_bottom<T: OHLCV>(bars: &[T], tolerance: f64) -> StructureCheck {
    double_extreme(bars, tolerance, Direction::Bullish)
}

fn double_extreme<T: OHLCV>(bars: &[T], tolerance: f64, direction: Direction) -> StructureCheck {
    let kind = match direction {
        Direction::Bearish => SwingKind::High,
        Direction::Bullish => SwingKind::Low,
    };
    let swings = find_swing_points(bars);
    let (Some((a, b)), Some(last)) = (last_two(&swings, kind), bars.last()) else {
        return StructureCheck::rejected();
    };
    if tolerance <= 0.0 {
        return StructureCheck::rejected();
    }

    let between = &bars[a.index + 1..b.index];
    let (extreme, neckline) = match direction {
        Direction::Bearish => (
            a.value.max(b.value),
            between.iter().map(|x| x.low()).fold(f64::MAX, f64::min),
        ),
        Direction::Bullish => (
            a.value.min(b.value),
            between.iter().map(|x| x.high()).fold(f64::MIN, f64::max),
        ),
    };
    // the shallower of the two extremes
    let inner = match direction {
        Direction::Bearish => a.value.min(b.value),
        Direction::Bullish => a.value.max(b.value),
    };
    if inner <= f64::EPSILON {
        return StructureCheck::rejected();
    }

    let diff = (a.value - b.value).abs() / a.value.abs().max(b.value.abs());
    let depth = (inner - neckline).abs() / inner;
    let turned = match direction {
        Direction::Bearish => last.close() < b.value,
        Direction::Bullish => last.close() > b.value,
    };

    let is_valid = diff <= tolerance && depth >= tolerance && turned;
    let match_quality = (1.0 - diff / tolerance).clamp(0.0, 1.0);
    let depth_quality = (depth / (2.0 * tolerance)).min(1.0);
    let height = (extreme - neckline).abs();

    StructureCheck {
        is_valid,
        confidence: if is_valid { 0.5 * match_quality + 0.5 * depth_quality } else { 0.0 },
        target: Some(neckline - direction.opposite().sign() * height),
        invalidation: Some(extreme),
    }
}

/// Strong pole of [`POLE_BARS`] bars followed by a tight, shallow, flat or
/// counter-trend consolidation of [`MIN_FLAG_BARS`]..=[`MAX_FLAG_BARS`] bars ending
/// at the last candle. The best-scoring flag length wins.
pub fn flag<T: OHLCV>(bars: &[T], direction: Direction) -> StructureCheck {
    let n = bars.len();
    let sign = direction.sign();
    let mut best = StructureCheck::rejected();

    for flag_len in MIN_FLAG_BARS..=MAX_FLAG_BARS {
        if n < flag_len + POLE_BARS {
            break;
        }
        let pole = &bars[n - flag_len - POLE_BARS..n - flag_len];
        let flag = &bars[n - flag_len..];

        let pole_start = pole[0].open();
        let pole_end = pole[POLE_BARS - 1].close();
        if pole_start <= f64::EPSILON {
            continue;
        }
        let pole_move = sign * (pole_end - pole_start) / pole_start;
        if pole_move < MIN_POLE_MOVE {
            continue;
        }
        let pole_height = (pole_end - pole_start).abs();

        let flag_high = flag.iter().map(|b| b.high()).fold(f64::MIN, f64::max);
        let flag_low = flag.iter().map(|b| b.low()).fold(f64::MAX, f64::min);
        let tightness = (flag_high - flag_low) / pole_height;
        let retrace = match direction {
            Direction::Bullish => (pole_end - flag_low) / pole_height,
            Direction::Bearish => (flag_high - pole_end) / pole_height,
        };
        let (slope, _) = indicators::linear_regression(&indicators::closes(flag));
        let pole_slope = pole_height / POLE_BARS as f64;
        // drifting with the pole at more than a quarter of its pace is a continuation, not a flag
        let slope_ok = sign * slope <= 0.25 * pole_slope;

        if tightness > MAX_FLAG_TIGHTNESS || retrace > MAX_FLAG_RETRACE || !slope_ok {
            continue;
        }

        let counter_trend = sign * slope < 0.0;
        let confidence = 0.4 * (pole_move / (2.0 * MIN_POLE_MOVE)).min(1.0)
            + 0.4 * (1.0 - tightness / MAX_FLAG_TIGHTNESS)
            + 0.2 * if counter_trend { 1.0 } else { 0.5 };

        if confidence > best.confidence {
            let last_close = flag[flag_len - 1].close();
            best = StructureCheck {
                is_valid: true,
                confidence,
                target: Some(last_close + sign * pole_height),
                invalidation: Some(match direction {
                    Direction::Bullish => flag_low,
                    Direction::Bearish => flag_high,
                }),
            };
        }
    }
    best
}
