//! Swing point detection
//!
//! A swing high is a bar whose high is strictly greater than the highs of the
//! [`SWING_LOOKAROUND`] bars on each side; swing lows mirror this on lows.

use serde::{Deserialize, Serialize};

use crate::OHLCV;

/// Bars compared on each side of a candidate swing point
pub const SWING_LOOKAROUND: usize = 3;

/// Fewest candles that can contain a swing point
pub const MIN_SWING_BARS: usize = SWING_LOOKAROUND * 2 + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingKind {
    High,
    Low,
}

/// A local price extreme
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub value: f64,
    pub kind: SwingKind,
}

/// All swing highs and lows in index order. A bar can be both.
///
/// Returns an empty list for fewer than [`MIN_SWING_BARS`] candles.
pub fn find_swing_points<T: OHLCV>(bars: &[T]) -> Vec<SwingPoint> {
    let mut points = Vec::new();
    if bars.len() < MIN_SWING_BARS {
        return points;
    }

    for i in SWING_LOOKAROUND..bars.len() - SWING_LOOKAROUND {
        let neighbors = (i - SWING_LOOKAROUND..i).chain(i + 1..=i + SWING_LOOKAROUND);

        let high = bars[i].high();
        let low = bars[i].low();
        let (mut is_high, mut is_low) = (true, true);
        for j in neighbors {
            is_high &= high > bars[j].high();
            is_low &= low < bars[j].low();
        }

        if is_high {
            points.push(SwingPoint {
                index: i,
                value: high,
                kind: SwingKind::High,
            });
        }
        if is_low {
            points.push(SwingPoint {
                index: i,
                value: low,
                kind: SwingKind::Low,
            });
        }
    }
    points
}

/// Swing points of one kind, keeping at most the `max` most recent.
pub fn recent_of_kind(points: &[SwingPoint], kind: SwingKind, max: usize) -> Vec<SwingPoint> {
    let of_kind: Vec<SwingPoint> = points.iter().filter(|p| p.kind == kind).copied().collect();
    let skip = of_kind.len().saturating_sub(max);
    of_kind.into_iter().skip(skip).collect()
}
