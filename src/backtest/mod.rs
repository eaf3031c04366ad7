//! Backtesting
//!
//! - **simulator**: replays forward candles against one [`PatternSignal`](crate::PatternSignal)
//! - **statistics**: aggregates many [`BacktestResult`]s into a [`BacktestSummary`]

pub mod simulator;
pub mod statistics;

pub use simulator::{simulate, BacktestResult, ExitReason};
pub use statistics::{summarize, summarize_filtered, BacktestSummary, StatsFilter, RATIO_SENTINEL};
