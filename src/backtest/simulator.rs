//! Forward replay of a single signal
//!
//! Walks forward candles from the entry until the target or stop is touched, or the
//! holding period runs out. The target is checked before the stop within a candle.

use serde::{Deserialize, Serialize};

use crate::{config::AnalysisConfig, detectors::structure::PatternKind, Direction, PatternSignal, OHLCV};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Target,
    Stop,
    /// Held for the full horizon, closed at the last candle
    Timeout,
    /// Too few forward candles to judge the trade
    InsufficientData,
}

/// Outcome of one simulated trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub timeframe: String,
    pub pattern: PatternKind,
    pub direction: Direction,
    pub entry_time: Option<i64>,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub exit_price: f64,
    /// Signal candle index in the scanned series
    pub entry_index: usize,
    /// Exit candle position in the forward window
    pub exit_index: usize,
    /// Forward candles consumed up to and including the exit candle
    pub candles_to_breakout: usize,
    pub successful: bool,
    /// Price change in the trade's favor
    pub profit_loss: f64,
    pub profit_loss_percent: f64,
    /// Worst adverse excursion from entry, percent (>= 0)
    pub max_drawdown_percent: f64,
    pub exit_reason: ExitReason,
    pub confidence_score: f64,
}

impl BacktestResult {
    fn open(signal: &PatternSignal) -> Self {
        Self {
            symbol: signal.symbol.clone(),
            timeframe: signal.timeframe.clone(),
            pattern: signal.pattern,
            direction: signal.direction,
            entry_time: signal.entry_time,
            entry_price: signal.entry_price,
            target_price: signal.target_price,
            stop_loss: signal.stop_loss,
            exit_price: signal.entry_price,
            entry_index: signal.entry_index,
            exit_index: 0,
            candles_to_breakout: 0,
            successful: false,
            profit_loss: 0.0,
            profit_loss_percent: 0.0,
            max_drawdown_percent: 0.0,
            exit_reason: ExitReason::InsufficientData,
            confidence_score: signal.confidence_score,
        }
    }

    fn close(mut self, exit_index: usize, exit_price: f64, reason: ExitReason, drawdown: f64) -> Self {
        let profit_loss = self.direction.sign() * (exit_price - self.entry_price);
        self.exit_index = exit_index;
        self.exit_price = exit_price;
        self.candles_to_breakout = exit_index + 1;
        self.profit_loss = profit_loss;
        self.profit_loss_percent = if self.entry_price.abs() > f64::EPSILON {
            profit_loss * 100.0 / self.entry_price
        } else {
            0.0
        };
        self.successful = match reason {
            ExitReason::Target => true,
            ExitReason::Stop | ExitReason::InsufficientData => false,
            ExitReason::Timeout => profit_loss > 0.0,
        };
        self.max_drawdown_percent = drawdown;
        self.exit_reason = reason;
        self
    }

    /// Counted by the statistics aggregator
    #[inline]
    pub fn is_conclusive(&self) -> bool {
        self.exit_reason != ExitReason::InsufficientData
    }
}

/// Replay `forward` (the candles after the signal candle) against `signal`.
///
/// At most `max_holding_period` candles are consumed. Without a target or stop hit,
/// a window shorter than `min(min_forward_candles, max_holding_period)` yields an
/// [`ExitReason::InsufficientData`] result with zeroed metrics.
pub fn simulate<T: OHLCV>(signal: &PatternSignal, forward: &[T], config: &AnalysisConfig) -> BacktestResult {
    let result = BacktestResult::open(signal);
    let horizon = config.max_holding_period.get().min(forward.len());
    let entry = signal.entry_price;
    let (target, stop) = (signal.target_price, signal.stop_loss);
    let mut drawdown: f64 = 0.0;

    for (i, bar) in forward[..horizon].iter().enumerate() {
        let (favorable, adverse) = match signal.direction {
            Direction::Bullish => (bar.high(), bar.low()),
            Direction::Bearish => (bar.low(), bar.high()),
        };
        if entry.abs() > f64::EPSILON {
            let excursion = signal.direction.sign() * (entry - adverse) * 100.0 / entry;
            drawdown = drawdown.max(excursion);
        }

        let (target_hit, stop_hit) = match signal.direction {
            Direction::Bullish => (favorable >= target, adverse <= stop),
            Direction::Bearish => (favorable <= target, adverse >= stop),
        };
        if target_hit {
            return result.close(i, target, ExitReason::Target, drawdown);
        }
        if stop_hit {
            return result.close(i, stop, ExitReason::Stop, drawdown);
        }
    }

    let required = config.min_forward_candles.min(config.max_holding_period.get());
    if horizon == 0 || horizon < required {
        return result;
    }
    let last = horizon - 1;
    result.close(last, forward[last].close(), ExitReason::Timeout, drawdown)
}
