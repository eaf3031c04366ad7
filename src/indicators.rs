//! Numeric building blocks: moving averages, ATR, RSI, MACD, regression and dispersion.
//!
//! All functions take plain slices and return empty/neutral values on short input.

use crate::OHLCV;

/// Arithmetic mean, 0.0 for an empty slice.
#[inline]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation, 0.0 for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Simple moving average. Output length is `values.len() - period + 1`.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values.windows(period).map(mean).collect()
}

/// Exponential moving average seeded with the SMA of the first `period` values.
///
/// Output length is `values.len() - period + 1`; element `k` corresponds to input
/// index `k + period - 1`.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut prev = mean(&values[..period]);
    out.push(prev);

    for &v in &values[period..] {
        prev = (v - prev) * multiplier + prev;
        out.push(prev);
    }
    out
}

/// Latest EMA value, if enough data.
#[inline]
pub fn ema_last(values: &[f64], period: usize) -> Option<f64> {
    ema(values, period).last().copied()
}

/// True range of bar `i` (uses bar `i - 1` close when available).
#[inline]
pub fn true_range<T: OHLCV>(bars: &[T], i: usize) -> f64 {
    let bar = &bars[i];
    let hl = bar.high() - bar.low();
    if i == 0 {
        return hl;
    }
    let prev_close = bars[i - 1].close();
    hl.max((bar.high() - prev_close).abs())
        .max((bar.low() - prev_close).abs())
}

/// Wilder-smoothed average true range, one value per bar.
///
/// Until `period` bars are available the running mean of true ranges is used.
pub fn atr_series<T: OHLCV>(bars: &[T], period: usize) -> Vec<f64> {
    let period = period.max(1);
    let mut out = Vec::with_capacity(bars.len());
    let mut sum = 0.0;
    let mut prev = 0.0;

    for i in 0..bars.len() {
        let tr = true_range(bars, i);
        let value = if i < period {
            sum += tr;
            sum / (i + 1) as f64
        } else {
            (prev * (period - 1) as f64 + tr) / period as f64
        };
        out.push(value);
        prev = value;
    }
    out
}

/// Latest ATR, 0.0 for empty input.
#[inline]
pub fn atr<T: OHLCV>(bars: &[T], period: usize) -> f64 {
    atr_series(bars, period).last().copied().unwrap_or(0.0)
}

/// Wilder RSI of the whole slice. Returns `None` with fewer than `period + 1` values.
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }

    let mut gain = 0.0;
    let mut loss = 0.0;
    for w in values[..=period].windows(2) {
        let change = w[1] - w[0];
        if change > 0.0 {
            gain += change;
        } else {
            loss -= change;
        }
    }
    let mut avg_gain = gain / period as f64;
    let mut avg_loss = loss / period as f64;

    for w in values[period..].windows(2) {
        let change = w[1] - w[0];
        let (g, l) = if change > 0.0 { (change, 0.0) } else { (0.0, -change) };
        avg_gain = (avg_gain * (period - 1) as f64 + g) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + l) / period as f64;
    }

    if avg_loss <= f64::EPSILON {
        return Some(if avg_gain <= f64::EPSILON { 50.0 } else { 100.0 });
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Latest MACD reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD with the given fast/slow/signal periods; `None` until the signal line exists.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Option<Macd> {
    if fast == 0 || slow <= fast || signal == 0 || values.len() < slow + signal - 1 {
        return None;
    }
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);

    // Align fast EMA to slow EMA start (input index slow - 1)
    let offset = slow - fast;
    let line: Vec<f64> = slow_ema
        .iter()
        .enumerate()
        .map(|(k, s)| fast_ema[k + offset] - s)
        .collect();

    let signal_line = ema(&line, signal);
    let macd = *line.last()?;
    let signal = *signal_line.last()?;
    Some(Macd {
        macd,
        signal,
        histogram: macd - signal,
    })
}

/// Least-squares fit of `values` against their index. Returns `(slope, intercept)`.
pub fn linear_regression(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    if n == 1 {
        return (0.0, values[0]);
    }

    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = mean(values);
    let (mut num, mut den) = (0.0, 0.0);
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    let slope = if den > 0.0 { num / den } else { 0.0 };
    (slope, mean_y - slope * mean_x)
}

/// Closing prices of a bar slice.
#[inline]
pub fn closes<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter().map(|b| b.close()).collect()
}
