//! End-to-end scanning
//!
//! [`Scanner::scan`] runs the whole pipeline on one candle series: trendlines and the
//! channel are detected, every breakout and structural pattern is validated, and the
//! survivors become [`PatternSignal`]s with an ATR stop and a reward/risk target.
//! Structural patterns use their measured move instead when it brackets the entry.
//! [`Scanner::replay`] walks a historical series, scanning at regular steps and
//! backtesting each signal on the candles that follow it.

use std::{borrow::Cow, collections::HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    backtest::{simulate, BacktestResult},
    config::AnalysisConfig,
    detectors::{
        channel::{classify_channel, detect_channel_breakout, Channel, ChannelBreakout, ChannelKind},
        structure::{check_structure, PatternKind, StructureCheck},
        swing::MIN_SWING_BARS,
        trendline::{detect_trendlines, Trendline},
    },
    indicators, sort_candles,
    validation::{validate_breakout, validate_pattern, PatternRequest},
    validate_candles, AnalysisError, Direction, PatternSignal, Result, OHLCV,
};

/// ATR period behind signal stops
pub const STOP_ATR_PERIOD: usize = 14;

const ALL_PATTERNS: [PatternKind; 6] = [
    PatternKind::TrendlineBreakout,
    PatternKind::ChannelBreakout,
    PatternKind::DoubleTop,
    PatternKind::DoubleBottom,
    PatternKind::BullFlag,
    PatternKind::BearFlag,
];

// ============================================================
// CONTEXT
// ============================================================

/// Candles of the higher and daily timeframes covering the scanned period
#[derive(Debug)]
pub struct TimeframeContext<'a, T> {
    pub higher: Option<&'a [T]>,
    pub daily: Option<&'a [T]>,
}

impl<T> Clone for TimeframeContext<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TimeframeContext<'_, T> {}

impl<'a, T: OHLCV> TimeframeContext<'a, T> {
    pub fn none() -> Self {
        Self {
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

    /// Drop candles stamped after `timestamp`. Without a timestamp nothing is cut.
    pub fn until(self, timestamp: Option<i64>) -> Self {
        let Some(ts) = timestamp else {
            return self;
        };
        let cut = |bars: &'a [T]| {
            let end = bars.partition_point(|b| b.timestamp().map_or(true, |t| t <= ts));
            &bars[..end]
        };
        Self {
            higher: self.higher.map(cut),
            daily: self.daily.map(cut),
        }
    }
}

// ============================================================
// REPORT
// ============================================================

/// Everything found in one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub symbol: String,
    pub timeframe: String,
    pub trendlines: Vec<Trendline>,
    pub channel: Channel,
    pub channel_breakout: Option<ChannelBreakout>,
    pub signals: Vec<PatternSignal>,
}

impl ScanReport {
    fn empty(symbol: &str, timeframe: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            trendlines: Vec::new(),
            channel: Channel::undefined(),
            channel_breakout: None,
            signals: Vec::new(),
        }
    }
}

// ============================================================
// SCANNER
// ============================================================

#[derive(Debug, Clone)]
pub struct Scanner {
    config: AnalysisConfig,
    patterns: Vec<PatternKind>,
}

impl Scanner {
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn patterns(&self) -> &[PatternKind] {
        &self.patterns
    }

    fn enabled(&self, kind: PatternKind) -> bool {
        self.patterns.contains(&kind)
    }

    /// Scan ordered candles. The last candle is the signal candle; trendlines are
    /// drawn on the candles before it.
    pub fn scan<T: OHLCV>(
        &self,
        symbol: &str,
        timeframe: &str,
        bars: &[T],
        context: TimeframeContext<'_, T>,
    ) -> ScanReport {
        let mut report = ScanReport::empty(symbol, timeframe);
        let Some((_, history)) = bars.split_last().filter(|_| bars.len() >= MIN_SWING_BARS) else {
            debug!(symbol, timeframe, bars = bars.len(), "too few candles to scan");
            return report;
        };

        report.channel = classify_channel(bars, context.higher);
        report.channel_breakout = detect_channel_breakout(bars, context.higher);
        report.trendlines = detect_trendlines(history, &self.config);
        let atr = indicators::atr(bars, STOP_ATR_PERIOD);

        if self.enabled(PatternKind::TrendlineBreakout) {
            let mut best: HashMap<Direction, (f64, bool)> = HashMap::new();
            for line in &report.trendlines {
                let v = validate_breakout(line, bars, context.higher, &self.config);
                if !v.is_valid {
                    trace!(symbol, kind = ?line.kind, side = ?line.side, confidence = v.confidence, "breakout rejected");
                    continue;
                }
                let entry = best.entry(v.direction).or_insert((f64::MIN, false));
                if v.confidence > entry.0 {
                    *entry = (v.confidence, v.higher_timeframe_breakout);
                }
            }
            for direction in [Direction::Bullish, Direction::Bearish] {
                if let Some(&(confidence, htf)) = best.get(&direction) {
                    report.signals.extend(self.signal(
                        symbol,
                        timeframe,
                        bars,
                        atr,
                        (PatternKind::TrendlineBreakout, direction),
                        confidence * 100.0,
                        &report.channel,
                        htf,
                    ));
                }
            }
        }

        if let Some(breakout) = report.channel_breakout.filter(|_| self.enabled(PatternKind::ChannelBreakout)) {
            let request = self.request(PatternKind::ChannelBreakout, breakout.direction, bars, context);
            let v = validate_pattern(&request, &self.config);
            if v.is_valid {
                report.signals.extend(self.signal(
                    symbol,
                    timeframe,
                    bars,
                    atr,
                    (PatternKind::ChannelBreakout, breakout.direction),
                    v.score,
                    &report.channel,
                    breakout.higher_timeframe_confirmed || v.higher_timeframe_breakout,
                ));
            }
        }

        let tolerance = self.config.structure_tolerance.get();
        for kind in PatternKind::STRUCTURAL {
            let Some(direction) = kind.typical_direction().filter(|_| self.enabled(kind)) else {
                continue;
            };
            let Some(check) = check_structure(kind, bars, tolerance).filter(|c| c.is_valid) else {
                continue;
            };
            let v = validate_pattern(&self.request(kind, direction, bars, context), &self.config);
            trace!(symbol, pattern = %kind, score = v.score, "structural pattern scored");
            if v.is_valid {
                let signal = self.signal(
                    symbol,
                    timeframe,
                    bars,
                    atr,
                    (kind, direction),
                    v.score,
                    &report.channel,
                    v.higher_timeframe_breakout,
                );
                report.signals.extend(signal.map(|s| with_measured_move(s, &check)));
            }
        }

        debug!(
            symbol,
            timeframe,
            bars = bars.len(),
            trendlines = report.trendlines.len(),
            channel = ?report.channel.kind,
            signals = report.signals.len(),
            "scan complete"
        );
        report
    }

    /// [`scan`](Self::scan) after validating the candles and restoring timestamp order.
    pub fn scan_checked<T: OHLCV + Clone>(
        &self,
        symbol: &str,
        timeframe: &str,
        bars: &[T],
        context: TimeframeContext<'_, T>,
    ) -> Result<ScanReport> {
        let bars = normalized(bars)?;
        Ok(self.scan(symbol, timeframe, &bars, context))
    }

    /// Scan every `replay_step` candles once enough history exists and backtest each
    /// signal on the candles after its signal candle.
    ///
    /// Context candles are cut at the signal candle's timestamp so no future data leaks in.
    pub fn replay<T: OHLCV>(
        &self,
        symbol: &str,
        timeframe: &str,
        bars: &[T],
        context: TimeframeContext<'_, T>,
    ) -> Vec<BacktestResult> {
        let warmup = (self.config.min_trendline_bars() + 1).max(MIN_SWING_BARS);
        let step = self.config.replay_step.get();
        let mut results = Vec::new();

        let mut end = warmup;
        while end < bars.len() {
            let window = &bars[..end];
            let at = context.until(window[end - 1].timestamp());
            let report = self.scan(symbol, timeframe, window, at);
            for signal in &report.signals {
                results.push(simulate(signal, &bars[end..], &self.config));
            }
            end += step;
        }

        debug!(symbol, timeframe, bars = bars.len(), trades = results.len(), "replay complete");
        results
    }

    /// [`replay`](Self::replay) after validating the candles and restoring timestamp order.
    pub fn replay_checked<T: OHLCV + Clone>(
        &self,
        symbol: &str,
        timeframe: &str,
        bars: &[T],
        context: TimeframeContext<'_, T>,
    ) -> Result<Vec<BacktestResult>> {
        let bars = normalized(bars)?;
        Ok(self.replay(symbol, timeframe, &bars, context))
    }

    fn request<'a, T: OHLCV>(
        &self,
        kind: PatternKind,
        direction: Direction,
        bars: &'a [T],
        context: TimeframeContext<'a, T>,
    ) -> PatternRequest<'a, T> {
        PatternRequest {
            kind,
            direction,
            bars,
            higher: context.higher,
            daily: context.daily,
        }
    }

    /// Signal at the last close; `None` when ATR gives no stop distance.
    #[allow(clippy::too_many_arguments)]
    fn signal<T: OHLCV>(
        &self,
        symbol: &str,
        timeframe: &str,
        bars: &[T],
        atr: f64,
        (pattern, direction): (PatternKind, Direction),
        confidence: f64,
        channel: &Channel,
        higher_timeframe_breakout: bool,
    ) -> Option<PatternSignal> {
        let last = bars.last()?;
        let risk = atr * self.config.stop_atr_multiple;
        if risk <= f64::EPSILON {
            return None;
        }
        let entry = last.close();
        let sign = direction.sign();
        let known_channel = channel.kind != ChannelKind::Undefined;

        Some(PatternSignal {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            pattern,
            direction,
            entry_index: bars.len() - 1,
            entry_time: last.timestamp(),
            entry_price: entry,
            target_price: entry + sign * risk * self.config.reward_risk_ratio,
            stop_loss: entry - sign * risk,
            confidence_score: confidence.clamp(0.0, 100.0),
            channel_kind: known_channel.then_some(channel.kind),
            channel_strength: known_channel.then_some(channel.strength),
            higher_timeframe_breakout,
        })
    }
}

/// Swap the ATR levels for the pattern's target and invalidation when both sit on
/// the expected side of the entry.
fn with_measured_move(mut signal: PatternSignal, check: &StructureCheck) -> PatternSignal {
    if let (Some(target), Some(stop)) = (check.target, check.invalidation) {
        let sign = signal.direction.sign();
        if (target - signal.entry_price) * sign > 0.0 && (signal.entry_price - stop) * sign > 0.0 {
            signal.target_price = target;
            signal.stop_loss = stop;
        }
    }
    signal
}

fn normalized<T: OHLCV + Clone>(bars: &[T]) -> Result<Cow<'_, [T]>> {
    validate_candles(bars)?;
    if bars.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp()) {
        return Ok(Cow::Borrowed(bars));
    }
    let mut sorted = bars.to_vec();
    sort_candles(&mut sorted);
    Ok(Cow::Owned(sorted))
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`Scanner`]
#[derive(Debug, Clone)]
pub struct ScannerBuilder {
    config: AnalysisConfig,
    patterns: Vec<PatternKind>,
}

impl Default for ScannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScannerBuilder {
    /// Default configuration with every pattern enabled
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
            patterns: ALL_PATTERNS.to_vec(),
        }
    }

    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Apply named parameter overrides (see [`AnalysisConfig::param_meta`])
    pub fn params(mut self, params: &HashMap<&str, f64>) -> Result<Self> {
        self.config = self.config.with_params(params)?;
        Ok(self)
    }

    /// Restrict scanning to `patterns`
    pub fn patterns(mut self, patterns: &[PatternKind]) -> Self {
        self.patterns = patterns.to_vec();
        self
    }

    pub fn build(self) -> Result<Scanner> {
        self.config.validate()?;
        if self.patterns.is_empty() {
            return Err(AnalysisError::InvalidConfig("no patterns enabled".into()));
        }
        Ok(Scanner {
            config: self.config,
            patterns: self.patterns,
        })
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

/// One symbol+timeframe series with its context candles
#[derive(Debug)]
pub struct Instrument<'a, T> {
    pub symbol: &'a str,
    pub timeframe: &'a str,
    pub bars: &'a [T],
    pub context: TimeframeContext<'a, T>,
}

impl<'a, T: OHLCV> Instrument<'a, T> {
    pub fn new(symbol: &'a str, timeframe: &'a str, bars: &'a [T]) -> Self {
        Self {
            symbol,
            timeframe,
            bars,
            context: TimeframeContext::none(),
        }
    }

    pub fn with_context(mut self, context: TimeframeContext<'a, T>) -> Self {
        self.context = context;
        self
    }
}

/// Failure to scan one instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub timeframe: String,
    pub error: AnalysisError,
}

fn split<R>(results: Vec<std::result::Result<R, ScanError>>) -> (Vec<R>, Vec<ScanError>) {
    let mut successes = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }
    (successes, errors)
}

fn scan_error<T>(instrument: &Instrument<'_, T>, error: AnalysisError) -> ScanError {
    ScanError {
        symbol: instrument.symbol.to_string(),
        timeframe: instrument.timeframe.to_string(),
        error,
    }
}

/// Scan many instruments in parallel. Instruments with invalid candles are reported
/// as errors; the rest are scanned independently.
pub fn scan_parallel<'a, T, I>(scanner: &Scanner, instruments: I) -> (Vec<ScanReport>, Vec<ScanError>)
where
    T: OHLCV + Clone + Sync + 'a,
    I: IntoParallelIterator<Item = Instrument<'a, T>>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|instrument| {
            scanner
                .scan_checked(instrument.symbol, instrument.timeframe, instrument.bars, instrument.context)
                .map_err(|error| scan_error(&instrument, error))
        })
        .collect();
    split(results)
}

/// Replay many instruments in parallel; results of all instruments are concatenated
/// in input order.
pub fn replay_parallel<'a, T, I>(scanner: &Scanner, instruments: I) -> (Vec<BacktestResult>, Vec<ScanError>)
where
    T: OHLCV + Clone + Sync + 'a,
    I: IntoParallelIterator<Item = Instrument<'a, T>>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|instrument| {
            scanner
                .replay_checked(instrument.symbol, instrument.timeframe, instrument.bars, instrument.context)
                .map_err(|error| scan_error(&instrument, error))
        })
        .collect();
    let (batches, errors) = split(results);
    (batches.into_iter().flatten().collect(), errors)
}
