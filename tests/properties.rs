//! Property tests: score bounds, determinism and backtest termination on arbitrary series.

use proptest::prelude::*;
use trendscan::prelude::*;

/// (close change, bar spread, volume) per step of a random walk
fn walk_strategy(max_len: usize) -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((-3.0f64..3.0, 0.1f64..4.0, 100.0f64..5_000.0), 0..max_len)
}

fn build_candles(steps: &[(f64, f64, f64)]) -> Vec<Candle> {
    let mut price: f64 = 100.0;
    steps
        .iter()
        .enumerate()
        .map(|(i, &(change, spread, volume))| {
            let open = price;
            price = (price + change).max(1.0);
            let high = open.max(price) + spread / 2.0;
            let low = (open.min(price) - spread / 2.0).max(0.5);
            Candle::new(i as i64 * 60, open, high, low, price, volume)
        })
        .collect()
}

/// Shorter windows so random series of modest length reach the trendline detectors
fn compact_config() -> AnalysisConfig {
    AnalysisConfig {
        lookback_period: Period::new(30).unwrap(),
        ema_periods: vec![7, 20],
        ..Default::default()
    }
}

fn signal_for(direction: Direction, entry: f64, offset: f64) -> PatternSignal {
    let sign = direction.sign();
    PatternSignal {
        symbol: "PROP".into(),
        timeframe: "1h".into(),
        pattern: PatternKind::ChannelBreakout,
        direction,
        entry_index: 0,
        entry_time: Some(0),
        entry_price: entry,
        target_price: entry + sign * 2.0 * offset,
        stop_loss: entry - sign * offset,
        confidence_score: 72.0,
        channel_kind: None,
        channel_strength: None,
        higher_timeframe_breakout: false,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn trendline_strength_is_bounded(steps in walk_strategy(120)) {
        let bars = build_candles(&steps);
        let config = compact_config();
        for line in detect_trendlines(&bars, &config) {
            prop_assert!((0.0..=1.0).contains(&line.strength));
            prop_assert!((0.0..=100.0).contains(&line.bounce_percent));
            prop_assert!(line.touches >= config.min_confirmation_touches);
            prop_assert!(line.start_index <= line.end_index);
        }
    }

    #[test]
    fn channel_strength_is_bounded(steps in walk_strategy(120), split in 0usize..120) {
        let bars = build_candles(&steps);
        let split = split.min(bars.len());
        let channel = classify_channel(&bars[split..], Some(&bars[..split]));
        prop_assert!((0.0..=1.0).contains(&channel.strength));
    }

    #[test]
    fn scan_is_deterministic_and_bounded(steps in walk_strategy(120)) {
        let bars = build_candles(&steps);
        let scanner = ScannerBuilder::new().config(compact_config()).build().unwrap();

        let first = scanner.scan("PROP", "1h", &bars, TimeframeContext::none());
        let second = scanner.scan("PROP", "1h", &bars, TimeframeContext::none());
        prop_assert_eq!(&first, &second);

        for signal in &first.signals {
            prop_assert!((0.0..=100.0).contains(&signal.confidence_score));
            prop_assert_eq!(signal.entry_index, bars.len() - 1);
            prop_assert!(signal.direction.sign() * (signal.target_price - signal.entry_price) > 0.0);
            prop_assert!(signal.direction.sign() * (signal.entry_price - signal.stop_loss) > 0.0);
        }
    }

    #[test]
    fn pattern_score_is_bounded(steps in walk_strategy(80), bullish in any::<bool>(), kind in 0usize..6) {
        let bars = build_candles(&steps);
        let kinds = [
            PatternKind::TrendlineBreakout,
            PatternKind::ChannelBreakout,
            PatternKind::DoubleTop,
            PatternKind::DoubleBottom,
            PatternKind::BullFlag,
            PatternKind::BearFlag,
        ];
        let direction = if bullish { Direction::Bullish } else { Direction::Bearish };
        let request = PatternRequest::new(kinds[kind], direction, &bars).with_higher(&bars);
        let v = validate_pattern(&request, &AnalysisConfig::default());
        prop_assert!((0.0..=100.0).contains(&v.score));
        prop_assert_eq!(v.is_valid, v.score >= 70.0);
    }

    #[test]
    fn backtest_terminates_within_horizon(
        steps in walk_strategy(60),
        bullish in any::<bool>(),
        offset in 0.5f64..10.0,
    ) {
        let forward = build_candles(&steps);
        let config = AnalysisConfig::default();
        let direction = if bullish { Direction::Bullish } else { Direction::Bearish };
        let r = simulate(&signal_for(direction, 100.0, offset), &forward, &config);

        let horizon = config.max_holding_period.get().min(forward.len());
        prop_assert!(r.candles_to_breakout <= horizon);
        prop_assert!(r.max_drawdown_percent >= 0.0);
        match r.exit_reason {
            ExitReason::Target => prop_assert!(r.successful && r.profit_loss > 0.0),
            ExitReason::Stop => prop_assert!(!r.successful && r.profit_loss < 0.0),
            ExitReason::Timeout => prop_assert_eq!(r.candles_to_breakout, horizon),
            ExitReason::InsufficientData => prop_assert_eq!(r.profit_loss_percent, 0.0),
        }
    }

    #[test]
    fn summary_is_bounded_and_idempotent(
        series in prop::collection::vec((walk_strategy(40), any::<bool>(), 0.5f64..10.0), 0..12),
    ) {
        let config = AnalysisConfig::default();
        let results: Vec<BacktestResult> = series
            .iter()
            .enumerate()
            .map(|(i, (steps, bullish, offset))| {
                let direction = if *bullish { Direction::Bullish } else { Direction::Bearish };
                let mut signal = signal_for(direction, 100.0, *offset);
                signal.entry_time = Some(i as i64);
                simulate(&signal, &build_candles(steps), &config)
            })
            .collect();

        let summary = summarize(&results);
        prop_assert_eq!(&summary, &summarize(&results));
        prop_assert!((0.0..=100.0).contains(&summary.consistency_score));
        prop_assert!((0.0..=100.0).contains(&summary.success_rate));
        prop_assert_eq!(summary.successful_patterns + summary.failed_patterns, summary.total_patterns);
        prop_assert!(summary.max_win_streak <= summary.successful_patterns);
        prop_assert!(summary.max_loss_streak <= summary.failed_patterns);
        prop_assert!(summary.profit_factor >= 0.0);
    }
}
