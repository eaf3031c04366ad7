//! Roll-up of simulated trades
//!
//! Results ending in [`ExitReason::InsufficientData`](super::ExitReason) are left out.
//! Ratios with a zero denominator and a positive numerator report [`RATIO_SENTINEL`].

use serde::{Deserialize, Serialize};

use super::simulator::BacktestResult;
use crate::{detectors::structure::PatternKind, indicators};

/// Finite stand-in for an unbounded ratio (no losses)
pub const RATIO_SENTINEL: f64 = 999.0;
/// Profit/loss standard deviation (percent) at which consistency reaches zero
pub const CONSISTENCY_STD_CAP: f64 = 20.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub total_patterns: usize,
    pub successful_patterns: usize,
    pub failed_patterns: usize,
    /// Percent, 0..=100
    pub success_rate: f64,
    pub avg_profit_loss_percent: f64,
    /// Mean profit percent of successful trades
    pub avg_win: f64,
    /// Mean profit percent of failed trades (usually negative)
    pub avg_loss: f64,
    pub risk_reward_ratio: f64,
    pub profit_factor: f64,
    pub max_profit: f64,
    pub max_loss: f64,
    pub max_win_streak: usize,
    pub max_loss_streak: usize,
    /// 0..=100
    pub consistency_score: f64,
    pub avg_candles_to_breakout: f64,
}

/// Restrict a summary to one timeframe and/or pattern
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsFilter {
    pub timeframe: Option<String>,
    pub pattern: Option<PatternKind>,
}

impl StatsFilter {
    pub fn timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = Some(timeframe.into());
        self
    }

    pub fn pattern(mut self, pattern: PatternKind) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn matches(&self, result: &BacktestResult) -> bool {
        self.timeframe.as_ref().map_or(true, |tf| *tf == result.timeframe)
            && self.pattern.map_or(true, |p| p == result.pattern)
    }
}

/// Summarize every conclusive result.
pub fn summarize(results: &[BacktestResult]) -> BacktestSummary {
    summarize_filtered(results, &StatsFilter::default())
}

pub fn summarize_filtered(results: &[BacktestResult], filter: &StatsFilter) -> BacktestSummary {
    let mut trades: Vec<&BacktestResult> = results
        .iter()
        .filter(|r| r.is_conclusive() && filter.matches(r))
        .collect();
    if trades.is_empty() {
        return BacktestSummary::default();
    }
    trades.sort_by_key(|r| (r.entry_time, r.entry_index));

    let total = trades.len();
    let returns: Vec<f64> = trades.iter().map(|r| r.profit_loss_percent).collect();
    let wins: Vec<f64> = trades.iter().filter(|r| r.successful).map(|r| r.profit_loss_percent).collect();
    let losses: Vec<f64> = trades.iter().filter(|r| !r.successful).map(|r| r.profit_loss_percent).collect();

    let avg_win = indicators::mean(&wins);
    let avg_loss = indicators::mean(&losses);
    let risk_reward_ratio = guarded_ratio(avg_win, avg_loss.abs());

    let gross_profit: f64 = returns.iter().filter(|r| **r > 0.0).sum();
    let gross_loss: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| r.abs()).sum();
    let profit_factor = guarded_ratio(gross_profit, gross_loss);

    let (max_win_streak, max_loss_streak) = streaks(trades.iter().map(|r| r.successful));
    let std = indicators::std_dev(&returns);

    BacktestSummary {
        total_patterns: total,
        successful_patterns: wins.len(),
        failed_patterns: losses.len(),
        success_rate: wins.len() as f64 * 100.0 / total as f64,
        avg_profit_loss_percent: indicators::mean(&returns),
        avg_win,
        avg_loss,
        risk_reward_ratio,
        profit_factor,
        max_profit: returns.iter().copied().fold(f64::MIN, f64::max),
        max_loss: returns.iter().copied().fold(f64::MAX, f64::min),
        max_win_streak,
        max_loss_streak,
        consistency_score: consistency(std),
        avg_candles_to_breakout: trades.iter().map(|r| r.candles_to_breakout as f64).sum::<f64>() / total as f64,
    }
}

/// `numerator / denominator`, [`RATIO_SENTINEL`] when only the denominator is zero, 0 when both are.
fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > f64::EPSILON {
        (numerator / denominator).abs()
    } else if numerator > 0.0 {
        RATIO_SENTINEL
    } else {
        0.0
    }
}

/// `100 * (1 - min(std, 20) / 20)`
pub fn consistency(std_dev: f64) -> f64 {
    if !std_dev.is_finite() {
        return 0.0;
    }
    100.0 * (1.0 - std_dev.min(CONSISTENCY_STD_CAP) / CONSISTENCY_STD_CAP)
}

/// Longest runs of `true` and `false`.
fn streaks(outcomes: impl Iterator<Item = bool>) -> (usize, usize) {
    let (mut best_win, mut best_loss, mut wins, mut losses) = (0, 0, 0, 0);
    for won in outcomes {
        if won {
            wins += 1;
            losses = 0;
            best_win = best_win.max(wins);
        } else {
            losses += 1;
            wins = 0;
            best_loss = best_loss.max(losses);
        }
    }
    (best_win, best_loss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backtest::ExitReason, Direction};

    fn result(time: i64, pct: f64, successful: bool) -> BacktestResult {
        BacktestResult {
            symbol: "TEST".into(),
            timeframe: "1h".into(),
            pattern: PatternKind::TrendlineBreakout,
            direction: Direction::Bullish,
            entry_time: Some(time),
            entry_price: 100.0,
            target_price: 110.0,
            stop_loss: 95.0,
            exit_price: 100.0 + pct,
            entry_index: time as usize,
            exit_index: 4,
            candles_to_breakout: 5,
            successful,
            profit_loss: pct,
            profit_loss_percent: pct,
            max_drawdown_percent: 1.0,
            exit_reason: if successful { ExitReason::Target } else { ExitReason::Stop },
            confidence_score: 75.0,
        }
    }

    #[test]
    fn test_empty_is_all_zero() {
        assert_eq!(summarize(&[]), BacktestSummary::default());
    }

    #[test]
    fn test_mixed_results() {
        let results = vec![
            result(1, 10.0, true),
            result(2, -5.0, false),
            result(3, 10.0, true),
            result(4, 10.0, true),
            result(5, -5.0, false),
        ];
        let s = summarize(&results);
        assert_eq!(s.total_patterns, 5);
        assert_eq!(s.successful_patterns, 3);
        assert_eq!(s.failed_patterns, 2);
        assert_eq!(s.success_rate, 60.0);
        assert_eq!(s.avg_win, 10.0);
        assert_eq!(s.avg_loss, -5.0);
        assert_eq!(s.risk_reward_ratio, 2.0);
        assert_eq!(s.profit_factor, 3.0);
        assert_eq!(s.max_profit, 10.0);
        assert_eq!(s.max_loss, -5.0);
        assert_eq!(s.max_win_streak, 2);
        assert_eq!(s.max_loss_streak, 1);
        assert_eq!(s.avg_candles_to_breakout, 5.0);
        assert!(s.consistency_score > 0.0 && s.consistency_score < 100.0);
    }

    #[test]
    fn test_streaks_use_entry_time_order() {
        let results = vec![
            result(3, -5.0, false),
            result(1, 10.0, true),
            result(4, -5.0, false),
            result(2, 10.0, true),
        ];
        let s = summarize(&results);
        assert_eq!(s.max_win_streak, 2);
        assert_eq!(s.max_loss_streak, 2);
    }

    #[test]
    fn test_no_losses_uses_sentinel() {
        let s = summarize(&[result(1, 10.0, true), result(2, 10.0, true)]);
        assert_eq!(s.risk_reward_ratio, RATIO_SENTINEL);
        assert_eq!(s.profit_factor, RATIO_SENTINEL);
        assert_eq!(s.consistency_score, 100.0);
        assert_eq!(s.failed_patterns, 0);
    }

    #[test]
    fn test_consistency_bounds() {
        assert_eq!(consistency(0.0), 100.0);
        assert_eq!(consistency(10.0), 50.0);
        assert_eq!(consistency(45.0), 0.0);
        assert_eq!(consistency(f64::NAN), 0.0);
    }

    #[test]
    fn test_filter_and_insufficient_data() {
        let mut other = result(6, -5.0, false);
        other.timeframe = "1d".into();
        other.pattern = PatternKind::BullFlag;
        let mut skipped = result(7, 0.0, false);
        skipped.exit_reason = ExitReason::InsufficientData;
        let results = vec![result(1, 10.0, true), other, skipped];

        assert_eq!(summarize(&results).total_patterns, 2);
        let daily = summarize_filtered(&results, &StatsFilter::default().timeframe("1d"));
        assert_eq!(daily.total_patterns, 1);
        assert_eq!(daily.success_rate, 0.0);
        let flags = summarize_filtered(&results, &StatsFilter::default().pattern(PatternKind::BullFlag));
        assert_eq!(flags.failed_patterns, 1);
    }

    #[test]
    fn test_idempotent() {
        let results = vec![result(1, 3.0, true), result(2, -1.5, false)];
        assert_eq!(summarize(&results), summarize(&results));
    }
}
