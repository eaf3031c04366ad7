//! # trendscan - trendline, channel and chart-pattern scanning
//!
//! Detects support/resistance trendlines and price channels in OHLCV series, scores
//! breakout and chart-pattern signals for reliability, and replays forward candles to
//! measure whether a signal would have reached its target before its stop.
//!
//! ## Quick Start
//!
//! ```rust
//! use trendscan::prelude::*;
//!
//! let candles: Vec<Candle> = (0..120)
//!     .map(|i| {
//!         let c = 100.0 + i as f64;
//!         Candle::new(i as i64 * 60, c - 0.5, c + 0.5, c - 1.0, c, 1_000.0)
//!     })
//!     .collect();
//!
//! let scanner = ScannerBuilder::new().build().unwrap();
//! let report = scanner.scan("DEMO", "1h", &candles, TimeframeContext::none());
//! assert_eq!(report.channel.kind, ChannelKind::Ascending);
//! ```
//!
//! ## Pipeline
//!
//! `candles -> swing points -> {trendlines, channel} -> breakout / pattern validation
//! -> PatternSignal -> backtest -> BacktestResult -> statistics -> BacktestSummary`
//!
//! Every stage is a pure function over already-fetched candle slices.

pub mod backtest;
pub mod config;
pub mod detectors;
pub mod indicators;
pub mod params;
pub mod scanner;
pub mod validation;

pub mod prelude {
    pub use crate::{
        // Backtesting
        backtest::{
            simulate, summarize, summarize_filtered, BacktestResult, BacktestSummary, ExitReason,
            StatsFilter,
        },
        // Configuration
        config::AnalysisConfig,
        // Detectors
        detectors::{
            channel::{classify_channel, detect_channel_breakout, Channel, ChannelBreakout, ChannelKind},
            structure::{PatternKind, StructureCheck},
            swing::{find_swing_points, SwingKind, SwingPoint},
            trendline::{detect_trendlines, LineKind, PriceModel, Side, Trendline},
        },
        params::{get_period, get_ratio, ParamMeta, ParamType},
        // Scanning
        scanner::{
            replay_parallel, scan_parallel, Instrument, ScanReport, Scanner, ScannerBuilder,
            TimeframeContext,
        },
        sort_candles,
        validate_candles,
        // Validation
        validation::{
            breakout::{validate_breakout, BreakoutValidation},
            pattern::{validate_pattern, PatternRequest, PatternValidation},
            Contribution, Scorecard,
        },
        // Errors
        AnalysisError,
        // Types
        Candle,
        Direction,
        OHLCVExt,
        PatternSignal,
        Period,
        Ratio,
        Result,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised by configuration and explicit data validation.
///
/// Analysis entry points never return these for short or degenerate input; they
/// degrade to empty or neutral output instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AnalysisError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn body_top(&self) -> f64 {
        self.open().max(self.close())
    }

    #[inline]
    fn body_bottom(&self) -> f64 {
        self.open().min(self.close())
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body as ratio of range. Returns None if range ≈ 0
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.body() / range)
    }

    /// Position of the close inside the bar's range (0 = low, 1 = high). None if range ≈ 0
    #[inline]
    fn close_location(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| (self.close() - self.low()) / range)
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
            || self.volume().is_nan()
        {
            return Err(AnalysisError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(AnalysisError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(AnalysisError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

// ============================================================
// CANDLE
// ============================================================

/// A single OHLCV bar. `timestamp` is an opaque monotonically increasing key
/// (usually epoch seconds or milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub const fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Candle {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

/// Stable sort by timestamp, ascending. Bars without a timestamp keep their relative order
/// and sort ahead of timestamped bars.
pub fn sort_candles<T: OHLCV>(bars: &mut [T]) {
    bars.sort_by_key(|b| b.timestamp());
}

/// Validate every bar, reporting the first offending index.
pub fn validate_candles<T: OHLCV>(bars: &[T]) -> Result<()> {
    for (index, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            AnalysisError::InvalidOHLCV { reason, .. } => AnalysisError::InvalidOHLCV { index, reason },
            other => other,
        })?;
    }
    Ok(())
}

// ============================================================
// DIRECTION & SIGNALS
// ============================================================

/// Direction/bias of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    /// +1.0 for bullish, -1.0 for bearish
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Direction::Bullish => 1.0,
            Direction::Bearish => -1.0,
        }
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }
}

/// A scored, tradable setup produced by the validators and consumed by the backtester.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatternSignal {
    pub symbol: String,
    pub timeframe: String,
    pub pattern: detectors::structure::PatternKind,
    pub direction: Direction,
    /// Index of the signal candle in the scanned series
    pub entry_index: usize,
    pub entry_time: Option<i64>,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    /// 0.0..=100.0
    pub confidence_score: f64,
    pub channel_kind: Option<detectors::channel::ChannelKind>,
    pub channel_strength: Option<f64>,
    pub higher_timeframe_breakout: bool,
}

impl PatternSignal {
    /// Reward-to-risk of the planned trade, 0.0 when the stop sits on the entry.
    pub fn reward_risk(&self) -> f64 {
        let risk = (self.entry_price - self.stop_loss).abs();
        if risk <= f64::EPSILON {
            return 0.0;
        }
        (self.target_price - self.entry_price).abs() / risk
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_validation() {
        assert!(Ratio::new(0.0).is_ok());
        assert!(Ratio::new(1.0).is_ok());
        assert!(Ratio::new(0.5).is_ok());
        assert!(Ratio::new(-0.1).is_err());
        assert!(Ratio::new(1.1).is_err());
        assert!(Ratio::new(f64::NAN).is_err());
        assert!(Ratio::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(100).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_ratio_deserialize_rejects_out_of_range() {
        let ok: Ratio = serde_json::from_str("0.7").unwrap();
        assert_eq!(ok.get(), 0.7);
        assert!(serde_json::from_str::<Ratio>("1.5").is_err());
        assert!(serde_json::from_str::<Period>("0").is_err());
    }

    #[test]
    fn test_ohlcv_ext() {
        let bar = Candle::new(0, 100.0, 110.0, 90.0, 105.0, 1.0);
        assert_eq!(bar.body(), 5.0);
        assert_eq!(bar.range(), 20.0);
        assert_eq!(bar.upper_shadow(), 5.0);
        assert_eq!(bar.lower_shadow(), 10.0);
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
        assert!((bar.body_ratio().unwrap() - 0.25).abs() < 0.001);
        assert!((bar.close_location().unwrap() - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_sort_candles_is_stable() {
        let mut bars = vec![
            Candle::new(3, 1.0, 1.0, 1.0, 3.0, 0.0),
            Candle::new(1, 1.0, 1.0, 1.0, 1.0, 0.0),
            Candle::new(2, 1.0, 1.0, 1.0, 2.0, 0.0),
            Candle::new(1, 1.0, 1.0, 1.0, 1.5, 0.0),
        ];
        sort_candles(&mut bars);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 1.5, 2.0, 3.0]);
    }

    #[test]
    fn test_validate_candles_reports_index() {
        let bars = vec![
            Candle::new(0, 1.0, 2.0, 0.5, 1.5, 10.0),
            Candle::new(1, 1.0, 0.5, 2.0, 1.5, 10.0),
        ];
        match validate_candles(&bars) {
            Err(AnalysisError::InvalidOHLCV { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_direction_helpers() {
        assert_eq!(Direction::Bullish.sign(), 1.0);
        assert_eq!(Direction::Bearish.sign(), -1.0);
        assert_eq!(Direction::Bullish.opposite(), Direction::Bearish);
        assert_eq!(serde_json::to_string(&Direction::Bearish).unwrap(), "\"bearish\"");
    }
}
