//! Price channel classification
//!
//! The direction comes from the least-squares slope of closes, expressed in ATR units
//! per bar (percentage slope over ATR percentage). Strength is the share of candles
//! reaching within half an ATR of either edge of the regression envelope. The reported
//! support and resistance are the min-low / max-high of a short trailing window.

use serde::{Deserialize, Serialize};

use crate::{indicators, Direction, OHLCV};

/// Fewest candles that can form a channel
pub const MIN_CHANNEL_BARS: usize = 7;
pub const ATR_PERIOD: usize = 14;
/// |normalized slope| below this is horizontal
pub const SLOPE_THRESHOLD: f64 = 0.5;
/// Boundary proximity and breakout distance, in ATR
pub const BOUNDARY_ATR_FRACTION: f64 = 0.5;
/// Boundary touches needed for an established channel
pub const ESTABLISHED_TOUCHES: usize = 3;
/// Largest rolling boundary window
pub const MAX_BOUNDARY_WINDOW: usize = 5;

const HTF_MATCH_MULTIPLIER: f64 = 1.5;
const HTF_CONFLICT_MULTIPLIER: f64 = 0.6;
const HTF_ESTABLISHED_MULTIPLIER: f64 = 1.25;
const HTF_BREAKOUT_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Ascending,
    Descending,
    Horizontal,
    Undefined,
}

impl ChannelKind {
    /// Direction implied by a sloped channel
    pub fn direction(self) -> Option<Direction> {
        match self {
            ChannelKind::Ascending => Some(Direction::Bullish),
            ChannelKind::Descending => Some(Direction::Bearish),
            ChannelKind::Horizontal | ChannelKind::Undefined => None,
        }
    }

    /// Ascending vs descending
    pub fn conflicts_with(self, other: ChannelKind) -> bool {
        matches!(
            (self, other),
            (ChannelKind::Ascending, ChannelKind::Descending) | (ChannelKind::Descending, ChannelKind::Ascending)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub kind: ChannelKind,
    /// 0..=1
    pub strength: f64,
    pub support_level: Option<f64>,
    pub resistance_level: Option<f64>,
    pub established: bool,
    pub touch_points: usize,
    /// Regression slope of closes in ATR per bar
    pub normalized_slope: f64,
    pub atr: f64,
    pub higher_timeframe_kind: Option<ChannelKind>,
}

impl Channel {
    pub fn undefined() -> Self {
        Self {
            kind: ChannelKind::Undefined,
            strength: 0.0,
            support_level: None,
            resistance_level: None,
            established: false,
            touch_points: 0,
            normalized_slope: 0.0,
            atr: 0.0,
            higher_timeframe_kind: None,
        }
    }

    /// `Some(true)` if the channel slopes with `direction`, `Some(false)` if against it,
    /// `None` for horizontal/undefined channels.
    pub fn agrees_with(&self, direction: Direction) -> Option<bool> {
        self.kind.direction().map(|d| d == direction)
    }
}

/// Classify `bars`, cross-validating against `higher` timeframe candles when given.
///
/// Matching higher-timeframe kinds multiply strength by 1.5, opposite slopes by 0.6,
/// and an established higher-timeframe channel adds a further 1.25; strength is capped at 1.
pub fn classify_channel<T: OHLCV>(bars: &[T], higher: Option<&[T]>) -> Channel {
    let mut channel = classify_local(bars);
    if channel.kind == ChannelKind::Undefined {
        return channel;
    }
    let Some(higher) = higher else {
        return channel;
    };

    let htf = classify_local(higher);
    if htf.kind == ChannelKind::Undefined {
        return channel;
    }
    if htf.kind == channel.kind {
        channel.strength *= HTF_MATCH_MULTIPLIER;
    } else if htf.kind.conflicts_with(channel.kind) {
        channel.strength *= HTF_CONFLICT_MULTIPLIER;
    }
    if htf.established {
        channel.strength *= HTF_ESTABLISHED_MULTIPLIER;
    }
    channel.strength = channel.strength.min(1.0);
    channel.higher_timeframe_kind = Some(htf.kind);
    channel
}

fn classify_local<T: OHLCV>(bars: &[T]) -> Channel {
    let n = bars.len();
    if n < MIN_CHANNEL_BARS {
        return Channel::undefined();
    }

    let atr = indicators::atr(bars, ATR_PERIOD);
    let closes = indicators::closes(bars);
    let (slope, intercept) = indicators::linear_regression(&closes);
    let avg_price = indicators::mean(&closes);

    // (slope / avg) / (atr / avg): percentage slope over ATR percentage
    let normalized_slope = if atr > f64::EPSILON && avg_price.abs() > f64::EPSILON {
        (slope / avg_price) / (atr / avg_price)
    } else {
        0.0
    };

    let kind = if normalized_slope > SLOPE_THRESHOLD {
        ChannelKind::Ascending
    } else if normalized_slope < -SLOPE_THRESHOLD {
        ChannelKind::Descending
    } else {
        ChannelKind::Horizontal
    };

    let touch_points = envelope_touches(bars, slope, intercept, BOUNDARY_ATR_FRACTION * atr);

    let window = MAX_BOUNDARY_WINDOW.min(n / 3).max(1);
    let recent = &bars[n - window..];
    let upper = recent.iter().map(|b| b.high()).fold(f64::MIN, f64::max);
    let lower = recent.iter().map(|b| b.low()).fold(f64::MAX, f64::min);

    Channel {
        kind,
        strength: touch_points as f64 / n as f64,
        support_level: Some(lower),
        resistance_level: Some(upper),
        established: n >= MIN_CHANNEL_BARS && touch_points >= ESTABLISHED_TOUCHES,
        touch_points,
        normalized_slope,
        atr,
        higher_timeframe_kind: None,
    }
}

/// Candles whose high (low) comes within `band` of the upper (lower) edge of the
/// regression envelope. The edges are the close regression line shifted to the
/// largest high residual and the smallest low residual.
fn envelope_touches<T: OHLCV>(bars: &[T], slope: f64, intercept: f64, band: f64) -> usize {
    let fit = |i: usize| intercept + slope * i as f64;
    let residuals: Vec<(f64, f64)> = bars
        .iter()
        .enumerate()
        .map(|(i, b)| (b.high() - fit(i), b.low() - fit(i)))
        .collect();
    let top = residuals.iter().map(|r| r.0).fold(f64::MIN, f64::max);
    let bottom = residuals.iter().map(|r| r.1).fold(f64::MAX, f64::min);

    residuals
        .iter()
        .filter(|(high, low)| *high >= top - band || *low <= bottom + band)
        .count()
}

/// A close beyond a channel boundary by more than half an ATR
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelBreakout {
    pub direction: Direction,
    /// Crossing distance over the half-ATR threshold, x1.5 when the higher timeframe agrees
    pub strength: f64,
    pub boundary: f64,
    pub distance: f64,
    pub higher_timeframe_confirmed: bool,
}

/// Check whether the latest close breaks out of the channel formed by the preceding bars.
pub fn detect_channel_breakout<T: OHLCV>(bars: &[T], higher: Option<&[T]>) -> Option<ChannelBreakout> {
    let (direction, boundary, distance, threshold) = breakout_of(bars)?;

    let confirmed = higher
        .and_then(breakout_of)
        .is_some_and(|(htf_direction, ..)| htf_direction == direction);
    let mut strength = distance / threshold;
    if confirmed {
        strength *= HTF_BREAKOUT_MULTIPLIER;
    }

    Some(ChannelBreakout {
        direction,
        strength,
        boundary,
        distance,
        higher_timeframe_confirmed: confirmed,
    })
}

/// (direction, boundary, distance, threshold) of a breakout by the last bar
fn breakout_of<T: OHLCV>(bars: &[T]) -> Option<(Direction, f64, f64, f64)> {
    let (last, prior) = bars.split_last()?;
    let channel = classify_local(prior);
    if channel.kind == ChannelKind::Undefined {
        return None;
    }
    let threshold = BOUNDARY_ATR_FRACTION * channel.atr;
    if threshold <= f64::EPSILON {
        return None;
    }

    let close = last.close();
    if let Some(resistance) = channel.resistance_level {
        let distance = close - resistance;
        if distance > threshold {
            return Some((Direction::Bullish, resistance, distance, threshold));
        }
    }
    if let Some(support) = channel.support_level {
        let distance = support - close;
        if distance > threshold {
            return Some((Direction::Bearish, support, distance, threshold));
        }
    }
    None
}
