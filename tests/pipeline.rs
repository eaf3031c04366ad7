//! Integration tests for the trendscan detection, validation and backtest pipeline.

use trendscan::prelude::*;

/// Bar without a timestamp, exercising the generic `OHLCV` path
#[derive(Debug, Clone, Copy)]
struct TestBar {
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

impl TestBar {
    fn new(o: f64, h: f64, l: f64, c: f64, v: f64) -> Self {
        Self { o, h, l, c, v }
    }
}

impl OHLCV for TestBar {
    fn open(&self) -> f64 {
        self.o
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        self.c
    }

    fn volume(&self) -> f64 {
        self.v
    }
}

/// 130 bars oscillating between 104 and 109 under a 110 ceiling, then a
/// high-volume breakout candle closing at 114.
fn make_range_breakout() -> Vec<TestBar> {
    let mut bars: Vec<TestBar> = (0..130)
        .map(|i| {
            let phase = (i % 10) as f64;
            let c = 104.0 + if phase < 5.0 { phase } else { 10.0 - phase };
            let h = if phase == 5.0 { 110.0 } else { c + 0.5 };
            TestBar::new(c - 0.3, h, c - 0.8, c, 1000.0)
        })
        .collect();
    bars.push(TestBar::new(108.5, 114.3, 108.4, 114.0, 4000.0));
    bars
}

/// Steady advance after the breakout
fn make_follow_through(n: usize, from: f64) -> Vec<TestBar> {
    (0..n)
        .map(|k| {
            let c = from + (k + 1) as f64;
            TestBar::new(c - 0.8, c + 0.2, c - 1.0, c, 1500.0)
        })
        .collect()
}

fn candle(i: i64, h: f64, l: f64) -> Candle {
    let mid = (h + l) / 2.0;
    Candle::new(i, mid, h, l, mid, 1000.0)
}

// ============================================================
// DETECTION
// ============================================================

#[test]
fn test_monotonic_closes_form_ascending_channel() {
    let bars: Vec<TestBar> = (0..100)
        .map(|i| {
            let c = 100.0 + i as f64;
            TestBar::new(c - 0.5, c + 0.5, c - 1.0, c, 1000.0)
        })
        .collect();
    let channel = classify_channel(&bars, None);
    assert_eq!(channel.kind, ChannelKind::Ascending);
    assert!(channel.strength > 0.5);
}

#[test]
fn test_flat_closes_form_horizontal_channel() {
    let bars: Vec<TestBar> = (0..60)
        .map(|i| {
            let c = if i % 2 == 0 { 100.05 } else { 99.95 };
            TestBar::new(100.0, c + 0.2, c - 0.2, c, 1000.0)
        })
        .collect();
    assert_eq!(classify_channel(&bars, None).kind, ChannelKind::Horizontal);
}

#[test]
fn test_range_ceiling_is_detected_as_resistance() {
    let bars = make_range_breakout();
    let history = &bars[..bars.len() - 1];
    let lines = detect_trendlines(history, &AnalysisConfig::default());

    let ceiling = lines
        .iter()
        .find(|l| l.kind == LineKind::Horizontal && l.side == Side::Resistance && l.start_price == 110.0)
        .expect("resistance at 110");
    assert!(ceiling.touches >= 2);
    assert_eq!(ceiling.bounce_percent, 100.0);
    assert!(lines.windows(2).all(|w| w[0].strength >= w[1].strength));
    assert!(lines.iter().all(|l| (0.0..=1.0).contains(&l.strength)));
}

#[test]
fn test_swing_points_need_seven_bars() {
    let bars = make_range_breakout();
    assert!(find_swing_points(&bars[..6]).is_empty());
    let swings = find_swing_points(&bars);
    assert!(swings.iter().any(|s| s.kind == SwingKind::High && s.value == 110.0));
}

// ============================================================
// VALIDATION
// ============================================================

#[test]
fn test_breakout_through_ceiling_validates() {
    let bars = make_range_breakout();
    let history = &bars[..bars.len() - 1];
    let lines = detect_trendlines(history, &AnalysisConfig::default());
    let ceiling = lines
        .iter()
        .find(|l| l.kind == LineKind::Horizontal && l.side == Side::Resistance)
        .expect("resistance line");

    let v = validate_breakout(ceiling, &bars, None, &AnalysisConfig::default());
    assert!(v.is_valid, "{:?}", v.scorecard.explain());
    assert_eq!(v.direction, Direction::Bullish);
    assert!((0.0..=1.0).contains(&v.confidence));
}

#[test]
fn test_pattern_score_is_clamped_and_auditable() {
    let bars = make_range_breakout();
    let request = PatternRequest::new(PatternKind::ChannelBreakout, Direction::Bullish, &bars);
    let v = validate_pattern(&request, &AnalysisConfig::default());
    assert!((0.0..=100.0).contains(&v.score));
    let total = v.scorecard.raw_total().clamp(0.0, 100.0);
    assert_eq!(v.score, total);
}

// ============================================================
// SCAN -> BACKTEST -> STATISTICS
// ============================================================

#[test]
fn test_scan_emits_trendline_breakout_signal() {
    let bars = make_range_breakout();
    let scanner = ScannerBuilder::new().build().unwrap();
    let report = scanner.scan("RANGE", "1h", &bars, TimeframeContext::none());

    let signal = report
        .signals
        .iter()
        .find(|s| s.pattern == PatternKind::TrendlineBreakout)
        .expect("trendline breakout signal");
    assert_eq!(signal.direction, Direction::Bullish);
    assert_eq!(signal.entry_index, 130);
    assert_eq!(signal.entry_time, None);
    assert!(signal.stop_loss < signal.entry_price && signal.entry_price < signal.target_price);
    assert!(report.channel_breakout.is_some_and(|b| b.direction == Direction::Bullish));
}

#[test]
fn test_signal_hits_target_on_follow_through() {
    let bars = make_range_breakout();
    let scanner = ScannerBuilder::new().build().unwrap();
    let report = scanner.scan("RANGE", "1h", &bars, TimeframeContext::none());
    let forward = make_follow_through(40, 114.0);

    let results: Vec<BacktestResult> = report
        .signals
        .iter()
        .filter(|s| s.direction == Direction::Bullish)
        .map(|s| simulate(s, &forward, scanner.config()))
        .collect();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.exit_reason == ExitReason::Target && r.successful));

    let summary = summarize(&results);
    assert_eq!(summary.success_rate, 100.0);
    assert_eq!(summary.profit_factor, trendscan::backtest::RATIO_SENTINEL);
    assert_eq!(summary.max_loss_streak, 0);
}

#[test]
fn test_replay_backtests_signals_on_later_candles() {
    let mut bars = make_range_breakout();
    bars.extend(make_follow_through(40, 114.0));
    let scanner = ScannerBuilder::new().build().unwrap();

    let results = scanner.replay("RANGE", "1h", &bars, TimeframeContext::none());
    let breakout = results
        .iter()
        .find(|r| r.entry_index == 130 && r.pattern == PatternKind::TrendlineBreakout)
        .expect("breakout replayed");
    assert_eq!(breakout.exit_reason, ExitReason::Target);

    let summary = summarize(&results);
    let conclusive = results.iter().filter(|r| r.exit_reason != ExitReason::InsufficientData).count();
    assert_eq!(summary.total_patterns, conclusive);
    assert_eq!(summary.successful_patterns + summary.failed_patterns, conclusive);

    let only_breakouts = summarize_filtered(&results, &StatsFilter::default().pattern(PatternKind::TrendlineBreakout));
    assert!(only_breakouts.total_patterns >= 1);
}

#[test]
fn test_documented_backtest_scenario() {
    let signal = PatternSignal {
        symbol: "SCN".into(),
        timeframe: "1d".into(),
        pattern: PatternKind::TrendlineBreakout,
        direction: Direction::Bullish,
        entry_index: 0,
        entry_time: None,
        entry_price: 100.0,
        target_price: 110.0,
        stop_loss: 90.0,
        confidence_score: 75.0,
        channel_kind: None,
        channel_strength: None,
        higher_timeframe_breakout: false,
    };
    let forward = vec![candle(1, 103.0, 98.0), candle(2, 107.0, 101.0), candle(3, 112.0, 104.0)];
    let r = simulate(&signal, &forward, &AnalysisConfig::default());
    assert_eq!(r.exit_index, 2);
    assert_eq!(r.exit_price, 110.0);
    assert!(r.successful);
    assert_eq!(r.profit_loss_percent, 10.0);
    assert_eq!(r.candles_to_breakout, 3);
}

#[test]
fn test_empty_statistics() {
    let summary = summarize(&[]);
    assert_eq!(summary, BacktestSummary::default());
    assert_eq!(summary.consistency_score, 0.0);
}

// ============================================================
// PARALLEL & SERIALIZATION
// ============================================================

#[test]
fn test_parallel_scan_matches_sequential() {
    let range = make_range_breakout();
    let trend = make_follow_through(150, 50.0);
    let scanner = ScannerBuilder::new().build().unwrap();

    let (reports, errors) = scan_parallel(
        &scanner,
        vec![Instrument::new("RANGE", "1h", &range), Instrument::new("TREND", "4h", &trend)],
    );
    assert!(errors.is_empty());
    assert_eq!(reports[0], scanner.scan("RANGE", "1h", &range, TimeframeContext::none()));
    assert_eq!(reports[1].timeframe, "4h");

    let (results, errors) = replay_parallel(&scanner, vec![Instrument::new("RANGE", "1h", &range)]);
    assert!(errors.is_empty());
    assert_eq!(results, scanner.replay("RANGE", "1h", &range, TimeframeContext::none()));
}

#[test]
fn test_report_serializes() {
    let bars = make_range_breakout();
    let scanner = ScannerBuilder::new().build().unwrap();
    let report = scanner.scan("RANGE", "1h", &bars, TimeframeContext::none());

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"trendline_breakout\""));
    let back: ScanReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back.symbol, report.symbol);
    assert_eq!(back.channel.kind, report.channel.kind);
    assert_eq!(back.trendlines.len(), report.trendlines.len());
    let patterns: Vec<_> = back.signals.iter().map(|s| (s.pattern, s.direction)).collect();
    let expected: Vec<_> = report.signals.iter().map(|s| (s.pattern, s.direction)).collect();
    assert_eq!(patterns, expected);
}

#[test]
fn test_config_round_trips_through_json() {
    let config = AnalysisConfig {
        min_confirmation_touches: 3,
        confidence_threshold: Ratio::new(0.75).unwrap(),
        pattern_confidence_threshold: 65.0,
        ..Default::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: AnalysisConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
    assert!(ScannerBuilder::new().config(back).build().is_ok());
}
