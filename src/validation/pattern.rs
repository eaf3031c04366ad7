//! Chart-pattern confidence scoring
//!
//! A pattern starts at 50 and each independent signal adds or subtracts a fixed
//! number of points. The sum is clamped to 0..=100 and the pattern is valid at or above
//! [`AnalysisConfig::pattern_confidence_threshold`].
//!
//! | Signal                  | Points          |
//! |-------------------------|-----------------|
//! | volume expansion        | +10 / +20 / -10 |
//! | momentum agreement      | +10 / +15 / -10 / -15 |
//! | structure check         | up to +20 / -15 |
//! | channel direction       | ±10 / ±15       |
//! | MACD histogram          | ±15             |
//! | RSI position            | +10 / +15 / -10 / -15 |
//! | EMA stack               | ±5 / ±15        |
//! | volatility              | ±5              |
//! | price floor             | -10             |
//! | higher timeframe        | +20..+30 / -25..-30 |
//! | daily timeframe         | +20 / +25 / -25 |
//! | recent failed breakouts | -5 / -10 / -15  |
//! | clean price structure   | +10 / -5        |
//! | recent gap              | -15             |
//! | channel confluence      | +15             |

use serde::Serialize;

use super::{Contribution, Scorecard};
use crate::{
    config::AnalysisConfig,
    detectors::{
        channel::{classify_channel, detect_channel_breakout, Channel, ChannelBreakout, ChannelKind},
        helpers::{is_gap, mean_wick_body_ratio},
        structure::{check_structure, PatternKind, StructureCheck},
    },
    indicators, Direction, OHLCV,
};

pub const BASE_SCORE: f64 = 50.0;

/// Bars averaged for recent volume, and the baseline before them
pub const RECENT_VOLUME_BARS: usize = 5;
pub const BASELINE_VOLUME_BARS: usize = 20;
pub const MOMENTUM_BARS: usize = 10;
pub const RSI_PERIOD: usize = 14;
pub const MACD_PERIODS: (usize, usize, usize) = (12, 26, 9);
pub const ATR_PERIOD: usize = 14;
/// Window scanned for failed breakouts, wick noise and gaps
pub const FAILED_BREAKOUT_WINDOW: usize = 20;
pub const FAILED_BREAKOUT_LOOKBACK: usize = 10;
pub const CLEAN_STRUCTURE_WINDOW: usize = 20;
pub const GAP_WINDOW: usize = 5;
pub const DAILY_SMA_PERIOD: usize = 20;

const STRONG_CHANNEL: f64 = 0.7;

/// What to score
#[derive(Debug, Clone, Copy)]
pub struct PatternRequest<'a, T> {
    pub kind: PatternKind,
    pub direction: Direction,
    pub bars: &'a [T],
    pub higher: Option<&'a [T]>,
    pub daily: Option<&'a [T]>,
}

impl<'a, T: OHLCV> PatternRequest<'a, T> {
    pub fn new(kind: PatternKind, direction: Direction, bars: &'a [T]) -> Self {
        Self {
            kind,
            direction,
            bars,
            higher: None,
            daily: None,
        }
    }

    pub fn with_higher(mut self, higher: &'a [T]) -> Self {
        self.higher = Some(higher);
        self
    }

    pub fn with_daily(mut self, daily: &'a [T]) -> Self {
        self.daily = Some(daily);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternValidation {
    pub kind: PatternKind,
    pub direction: Direction,
    /// 0..=100
    pub score: f64,
    pub is_valid: bool,
    pub structure: Option<StructureCheck>,
    pub channel: Channel,
    pub higher_timeframe_breakout: bool,
    pub scorecard: Scorecard,
}

/// Score a pattern of `request.kind` in `request.direction` ending at the last bar.
pub fn validate_pattern<T: OHLCV>(request: &PatternRequest<'_, T>, config: &AnalysisConfig) -> PatternValidation {
    let (kind, direction, bars) = (request.kind, request.direction, request.bars);
    let (higher, daily) = (request.higher, request.daily);
    let closes = indicators::closes(bars);
    let channel = classify_channel(bars, higher);
    let mut card = Scorecard::new(BASE_SCORE, 0.0, 100.0);

    card.extend(volume_expansion(bars, config.min_volume_factor));
    card.extend(momentum_agreement(&closes, direction));

    let structure = check_structure(kind, bars, config.structure_tolerance.get());
    card.extend(structure.map(structure_contribution));

    card.extend(channel_agreement(&channel, direction));
    card.extend(macd_agreement(&closes, direction));
    card.extend(rsi_position(&closes, direction));
    card.extend(ema_stack(&closes, &config.ema_periods, direction));
    card.extend(volatility(bars));
    card.extend(price_floor(bars, config.min_price));

    let higher_channel = higher.map(|h| classify_channel(h, None));
    let higher_breakout = higher.and_then(|h| detect_channel_breakout(h, None));
    if let (Some(h), Some(channel)) = (higher, higher_channel.as_ref()) {
        card.extend(higher_timeframe_agreement(h, channel, higher_breakout.as_ref(), direction));
    }

    let daily_channel = daily.map(|d| classify_channel(d, None));
    if let (Some(d), Some(channel)) = (daily, daily_channel.as_ref()) {
        card.extend(daily_agreement(d, channel, direction));
    }

    card.extend(recent_failed_breakouts(bars, direction));
    card.extend(clean_structure(bars));
    card.extend(recent_gap(bars, config.gap_threshold.get()));
    card.extend(channel_confluence(
        channel.kind,
        higher_channel.as_ref().map(|c| c.kind),
        daily_channel.as_ref().map(|c| c.kind),
        direction,
    ));

    let score = card.total();
    PatternValidation {
        kind,
        direction,
        score,
        is_valid: score >= config.pattern_confidence_threshold,
        structure,
        channel,
        higher_timeframe_breakout: higher_breakout.is_some_and(|b| b.direction == direction),
        scorecard: card,
    }
}

// ============================================================
// SIGNALS
// ============================================================

/// Recent volume over its baseline: >=1.5x +20, >=`min_factor` +10, <0.8x -10.
pub fn volume_expansion<T: OHLCV>(bars: &[T], min_factor: f64) -> Option<Contribution> {
    let n = bars.len();
    if n < RECENT_VOLUME_BARS + BASELINE_VOLUME_BARS {
        return None;
    }
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume()).collect();
    let recent = indicators::mean(&volumes[n - RECENT_VOLUME_BARS..]);
    let baseline = indicators::mean(&volumes[n - RECENT_VOLUME_BARS - BASELINE_VOLUME_BARS..n - RECENT_VOLUME_BARS]);
    if baseline <= f64::EPSILON {
        return None;
    }
    let ratio = recent / baseline;
    let delta = if ratio >= 1.5 {
        20.0
    } else if ratio >= min_factor {
        10.0
    } else if ratio < 0.8 {
        -10.0
    } else {
        return None;
    };
    Some(Contribution::fixed("volume", delta, format!("recent volume {ratio:.2}x baseline")))
}

/// Rate of change over [`MOMENTUM_BARS`], signed to the pattern direction.
pub fn momentum_agreement(closes: &[f64], direction: Direction) -> Option<Contribution> {
    let n = closes.len();
    if n <= MOMENTUM_BARS {
        return None;
    }
    let past = closes[n - 1 - MOMENTUM_BARS];
    if past.abs() <= f64::EPSILON {
        return None;
    }
    let roc = direction.sign() * (closes[n - 1] - past) / past;
    let delta = match roc {
        r if r > 0.02 => 15.0,
        r if r > 0.0 => 10.0,
        r if r < -0.02 => -15.0,
        r if r < 0.0 => -10.0,
        _ => return None,
    };
    Some(Contribution::fixed("momentum", delta, format!("{:+.2}% in pattern direction", roc * 100.0)))
}

/// Valid structures add up to 20 points scaled by their confidence; invalid ones cost 15.
pub fn structure_contribution(check: StructureCheck) -> Contribution {
    if check.is_valid {
        Contribution::new("structure", 20.0, check.confidence, "pattern geometry holds")
    } else {
        Contribution::fixed("structure", -15.0, "pattern geometry does not hold")
    }
}

pub fn channel_agreement(channel: &Channel, direction: Direction) -> Option<Contribution> {
    let agrees = channel.agrees_with(direction)?;
    let magnitude = if channel.strength >= STRONG_CHANNEL { 15.0 } else { 10.0 };
    let (delta, note) = if agrees {
        (magnitude, "channel slopes with the pattern")
    } else {
        (-magnitude, "channel slopes against the pattern")
    };
    Some(Contribution::fixed(
        "channel",
        delta,
        format!("{note} (strength {:.2})", channel.strength),
    ))
}

pub fn macd_agreement(closes: &[f64], direction: Direction) -> Option<Contribution> {
    let (fast, slow, signal) = MACD_PERIODS;
    let macd = indicators::macd(closes, fast, slow, signal)?;
    let aligned = direction.sign() * macd.histogram;
    if aligned > 0.0 {
        Some(Contribution::fixed("macd", 15.0, "histogram agrees"))
    } else if aligned < 0.0 {
        Some(Contribution::fixed("macd", -15.0, "histogram disagrees"))
    } else {
        None
    }
}

/// RSI measured from the pattern's side (bearish patterns use `100 - rsi`).
pub fn rsi_position(closes: &[f64], direction: Direction) -> Option<Contribution> {
    let rsi = indicators::rsi(closes, RSI_PERIOD)?;
    let oriented = match direction {
        Direction::Bullish => rsi,
        Direction::Bearish => 100.0 - rsi,
    };
    let delta = match oriented {
        r if r > 80.0 => -15.0,
        r if r > 70.0 => 10.0,
        r if r >= 50.0 => 15.0,
        r if r < 40.0 => -10.0,
        _ => return None,
    };
    Some(Contribution::fixed("rsi", delta, format!("RSI {rsi:.1}")))
}

/// Close and EMAs stacked in the pattern direction: full stack ±15, close beyond every EMA ±5.
pub fn ema_stack(closes: &[f64], periods: &[usize], direction: Direction) -> Option<Contribution> {
    let close = *closes.last()?;
    let mut sorted = periods.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let emas = sorted
        .iter()
        .map(|&p| indicators::ema_last(closes, p))
        .collect::<Option<Vec<f64>>>()?;

    let sign = direction.sign();
    let chain: Vec<f64> = std::iter::once(close).chain(emas.iter().copied()).collect();
    let stacked = chain.windows(2).all(|w| sign * (w[0] - w[1]) > 0.0);
    let inverted = chain.windows(2).all(|w| sign * (w[0] - w[1]) < 0.0);
    let beyond_all = emas.iter().all(|e| sign * (close - e) > 0.0);
    let behind_all = emas.iter().all(|e| sign * (close - e) < 0.0);

    let (delta, note) = if stacked {
        (15.0, "EMAs fully stacked with the pattern")
    } else if inverted {
        (-15.0, "EMAs fully stacked against the pattern")
    } else if beyond_all {
        (5.0, "close beyond every EMA")
    } else if behind_all {
        (-5.0, "close behind every EMA")
    } else {
        return None;
    };
    Some(Contribution::fixed("ema_stack", delta, note))
}

/// ATR between 1% and 5% of price +5, above 8% -5.
pub fn volatility<T: OHLCV>(bars: &[T]) -> Option<Contribution> {
    if bars.len() <= ATR_PERIOD {
        return None;
    }
    let close = bars.last()?.close();
    if close <= f64::EPSILON {
        return None;
    }
    let atr_pct = indicators::atr(bars, ATR_PERIOD) / close;
    let delta = if (0.01..=0.05).contains(&atr_pct) {
        5.0
    } else if atr_pct > 0.08 {
        -5.0
    } else {
        return None;
    };
    Some(Contribution::fixed("volatility", delta, format!("ATR {:.2}% of price", atr_pct * 100.0)))
}

pub fn price_floor<T: OHLCV>(bars: &[T], min_price: f64) -> Option<Contribution> {
    let close = bars.last()?.close();
    (close < min_price).then(|| Contribution::fixed("price_floor", -10.0, format!("price {close:.2} below {min_price}")))
}

/// Higher-timeframe breakout with the pattern +30 (against -30); otherwise a channel
/// sloping with the pattern +20, +25 with price on the pattern side of the channel
/// midpoint, and -25 against.
pub fn higher_timeframe_agreement<T: OHLCV>(
    higher: &[T],
    channel: &Channel,
    breakout: Option<&ChannelBreakout>,
    direction: Direction,
) -> Option<Contribution> {
    if let Some(b) = breakout {
        return Some(if b.direction == direction {
            Contribution::fixed("higher_timeframe", 30.0, "higher timeframe breaking out with the pattern")
        } else {
            Contribution::fixed("higher_timeframe", -30.0, "higher timeframe breaking out against the pattern")
        });
    }

    if !channel.agrees_with(direction)? {
        return Some(Contribution::fixed("higher_timeframe", -25.0, "higher-timeframe trend disagrees"));
    }
    let close = higher.last()?.close();
    let level_agrees = match (channel.support_level, channel.resistance_level) {
        (Some(s), Some(r)) => direction.sign() * (close - (s + r) / 2.0) > 0.0,
        _ => false,
    };
    Some(if level_agrees {
        Contribution::fixed("higher_timeframe", 25.0, "higher-timeframe trend and level agree")
    } else {
        Contribution::fixed("higher_timeframe", 20.0, "higher-timeframe trend agrees")
    })
}

/// Daily channel sloping with the pattern +20, +25 with the close beyond the daily
/// 20-bar SMA; against -25.
pub fn daily_agreement<T: OHLCV>(daily: &[T], channel: &Channel, direction: Direction) -> Option<Contribution> {
    if !channel.agrees_with(direction)? {
        return Some(Contribution::fixed("daily_timeframe", -25.0, "daily trend disagrees"));
    }
    let closes = indicators::closes(daily);
    let close = *closes.last()?;
    let above_sma = indicators::sma(&closes, DAILY_SMA_PERIOD)
        .last()
        .is_some_and(|sma| direction.sign() * (close - sma) > 0.0);
    Some(if above_sma {
        Contribution::fixed("daily_timeframe", 25.0, "daily trend and average agree")
    } else {
        Contribution::fixed("daily_timeframe", 20.0, "daily trend agrees")
    })
}

/// Bars in the last [`FAILED_BREAKOUT_WINDOW`] that pierced the prior
/// [`FAILED_BREAKOUT_LOOKBACK`]-bar extreme in the pattern direction and closed back inside.
pub fn failed_breakout_count<T: OHLCV>(bars: &[T], direction: Direction) -> usize {
    let n = bars.len();
    let start = n.saturating_sub(FAILED_BREAKOUT_WINDOW).max(FAILED_BREAKOUT_LOOKBACK);
    (start..n)
        .filter(|&i| {
            let prior = &bars[i - FAILED_BREAKOUT_LOOKBACK..i];
            let bar = &bars[i];
            match direction {
                Direction::Bullish => {
                    let ceiling = prior.iter().map(|b| b.high()).fold(f64::MIN, f64::max);
                    bar.high() > ceiling && bar.close() <= ceiling
                },
                Direction::Bearish => {
                    let floor = prior.iter().map(|b| b.low()).fold(f64::MAX, f64::min);
                    bar.low() < floor && bar.close() >= floor
                },
            }
        })
        .count()
}

pub fn recent_failed_breakouts<T: OHLCV>(bars: &[T], direction: Direction) -> Option<Contribution> {
    let failures = failed_breakout_count(bars, direction);
    let delta = match failures {
        0 => return None,
        1 => -5.0,
        2 => -10.0,
        _ => -15.0,
    };
    Some(Contribution::fixed(
        "failed_breakouts",
        delta,
        format!("{failures} failed breakouts in the last {FAILED_BREAKOUT_WINDOW} bars"),
    ))
}

/// Body-dominated candles +10, wick-dominated -5.
pub fn clean_structure<T: OHLCV>(bars: &[T]) -> Option<Contribution> {
    if bars.len() < CLEAN_STRUCTURE_WINDOW {
        return None;
    }
    let ratio = mean_wick_body_ratio(&bars[bars.len() - CLEAN_STRUCTURE_WINDOW..]);
    if ratio < 1.0 {
        Some(Contribution::fixed("clean_structure", 10.0, format!("wick/body {ratio:.2}")))
    } else if ratio > 2.0 {
        Some(Contribution::fixed("clean_structure", -5.0, format!("wick/body {ratio:.2}")))
    } else {
        None
    }
}

pub fn recent_gap<T: OHLCV>(bars: &[T], threshold: f64) -> Option<Contribution> {
    let start = bars.len().saturating_sub(GAP_WINDOW).max(1);
    (start..bars.len())
        .any(|i| is_gap(&bars[i - 1], &bars[i], threshold))
        .then(|| Contribution::fixed("gap", -15.0, format!("gap in the last {GAP_WINDOW} bars")))
}

/// Local and higher-timeframe channels (and the daily one, when known) all sloping
/// with the pattern.
pub fn channel_confluence(
    local: ChannelKind,
    higher: Option<ChannelKind>,
    daily: Option<ChannelKind>,
    direction: Direction,
) -> Option<Contribution> {
    let with = |kind: ChannelKind| kind.direction() == Some(direction);
    let confluent = with(local) && higher.is_some_and(with) && daily.map_or(true, with);
    confluent.then(|| Contribution::fixed("channel_confluence", 15.0, "channels agree across timeframes"))
}
