//! Common candle-shape helpers shared by the detectors and validators.

use crate::{Direction, OHLCVExt, OHLCV};

// ============================================================
// THRESHOLDS
// ============================================================

/// Close must sit in the outer third of the range (in the move's direction)
pub const STRONG_CLOSE_FRACTION: f64 = 2.0 / 3.0;
/// Body larger than this share of the range is a dominant body
pub const BODY_DOMINANCE_RATIO: f64 = 0.6;
/// Wick against the move longer than this share of the range is a long opposing wick
pub const LONG_WICK_RATIO: f64 = 0.5;
/// Upper bound reported by [`mean_wick_body_ratio`] when bodies vanish
pub const WICK_RATIO_CAP: f64 = 10.0;

// ============================================================
// SINGLE-BAR PREDICATES
// ============================================================

/// Close in the outer third of the range, on the side of `direction`.
#[inline]
pub fn is_strong_close<T: OHLCV>(bar: &T, direction: Direction) -> bool {
    match bar.close_location() {
        Some(loc) => match direction {
            Direction::Bullish => loc >= STRONG_CLOSE_FRACTION,
            Direction::Bearish => loc <= 1.0 - STRONG_CLOSE_FRACTION,
        },
        None => false,
    }
}

/// Body colored in `direction` and larger than [`BODY_DOMINANCE_RATIO`] of the range.
#[inline]
pub fn is_body_dominant<T: OHLCV>(bar: &T, direction: Direction) -> bool {
    let colored = match direction {
        Direction::Bullish => bar.is_bullish(),
        Direction::Bearish => bar.is_bearish(),
    };
    colored && bar.body_ratio().is_some_and(|r| r > BODY_DOMINANCE_RATIO)
}

/// Share of the range taken by the wick that opposes `direction`
/// (upper wick for bullish moves, lower wick for bearish ones).
#[inline]
pub fn opposing_wick_ratio<T: OHLCV>(bar: &T, direction: Direction) -> f64 {
    let range = bar.range();
    if range <= f64::EPSILON {
        return 0.0;
    }
    match direction {
        Direction::Bullish => bar.upper_shadow() / range,
        Direction::Bearish => bar.lower_shadow() / range,
    }
}

// ============================================================
// TWO-BAR PREDICATES
// ============================================================

/// `curr` engulfs the opposite-colored body of `prev` in `direction`.
#[inline]
pub fn is_engulfing<T: OHLCV>(prev: &T, curr: &T, direction: Direction) -> bool {
    match direction {
        Direction::Bullish => {
            prev.is_bearish()
                && curr.is_bullish()
                && curr.close() >= prev.open()
                && curr.open() <= prev.close()
        },
        Direction::Bearish => {
            prev.is_bullish()
                && curr.is_bearish()
                && curr.close() <= prev.open()
                && curr.open() >= prev.close()
        },
    }
}

/// Open gapped away from the previous close by more than `threshold` (relative).
#[inline]
pub fn is_gap<T: OHLCV>(prev: &T, curr: &T, threshold: f64) -> bool {
    let prev_close = prev.close();
    prev_close > f64::EPSILON && ((curr.open() - prev_close) / prev_close).abs() > threshold
}

// ============================================================
// WINDOW AVERAGES
// ============================================================

/// Average volume of the `period` bars before `at` (bar `at` excluded).
/// Falls back to bar `at`'s own volume when no earlier bars exist.
#[inline]
pub fn trailing_avg_volume<T: OHLCV>(bars: &[T], at: usize, period: usize) -> f64 {
    if at == 0 {
        return bars[0].volume();
    }
    let s = at.saturating_sub(period);
    let slice = &bars[s..at];
    slice.iter().map(|b| b.volume()).sum::<f64>() / slice.len() as f64
}

/// Average high-low range of the `period` bars ending at `at` (inclusive).
#[inline]
pub fn trailing_avg_range<T: OHLCV>(bars: &[T], at: usize, period: usize) -> f64 {
    let s = (at + 1).saturating_sub(period.max(1));
    let slice = &bars[s..=at];
    slice.iter().map(|b| OHLCVExt::range(b)).sum::<f64>() / slice.len() as f64
}

/// Total wick length over total body length across the window.
///
/// Large values mean noisy, wick-dominated candles.
pub fn mean_wick_body_ratio<T: OHLCV>(bars: &[T]) -> f64 {
    let (wicks, bodies) = bars.iter().fold((0.0, 0.0), |(w, b), bar| {
        (w + bar.upper_shadow() + bar.lower_shadow(), b + bar.body())
    });
    if bodies <= f64::EPSILON {
        return if wicks > 0.0 { WICK_RATIO_CAP } else { 0.0 };
    }
    (wicks / bodies).min(WICK_RATIO_CAP)
}
