//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLC candle inside a bar's trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }
}

/// Intraday OHLC bar for one instrument.
///
/// `atr` is expressed in price units. `window` is a short trailing window of
/// recent candles, oldest first, with the current bar as the last element.
/// The opening range and the micro-trend estimate are read from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub atr: f64,
    /// Set on the first bar of a new trading session.
    #[serde(default)]
    pub new_session: bool,
    #[serde(default)]
    pub window: Vec<Candle>,
}

impl Bar {
    /// Returns true if any price field is non-finite or the ATR is negative.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.atr.is_finite())
            || self.atr < 0.0
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    /// This bar as a window candle.
    pub fn candle(&self) -> Candle {
        Candle::new(self.open, self.high, self.low, self.close)
    }

    /// Highest high and lowest low over the last `n` window candles.
    ///
    /// Returns `None` when the window holds fewer than `n` candles.
    pub fn window_range(&self, n: usize) -> Option<(f64, f64)> {
        if n == 0 || self.window.len() < n {
            return None;
        }
        let tail = &self.window[self.window.len() - n..];
        let high = tail.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let low = tail.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        Some((high, low))
    }

    /// Slope of window closes in price units per bar.
    pub fn window_slope(&self) -> f64 {
        match (self.window.first(), self.window.last()) {
            (Some(first), Some(last)) if self.window.len() >= 2 => {
                (last.close - first.close) / (self.window.len() - 1) as f64
            }
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_bar() -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 5, 0).unwrap(),
            open: 150.02,
            high: 150.08,
            low: 149.98,
            close: 150.05,
            atr: 0.10,
            new_session: false,
            window: vec![
                Candle::new(150.00, 150.04, 149.96, 150.01),
                Candle::new(150.01, 150.10, 150.00, 150.03),
                Candle::new(150.02, 150.08, 149.98, 150.05),
            ],
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());

        let mut bar = sample_bar();
        bar.atr = -0.1;
        assert!(bar.is_void());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 149.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn window_range_uses_tail() {
        let bar = sample_bar();
        assert_eq!(bar.window_range(2), Some((150.10, 149.98)));
        assert_eq!(bar.window_range(3), Some((150.10, 149.96)));
        assert_eq!(bar.window_range(4), None);
        assert_eq!(bar.window_range(0), None);
    }

    #[test]
    fn window_slope_per_bar() {
        let bar = sample_bar();
        assert!((bar.window_slope() - 0.02).abs() < 1e-12);

        let mut short = sample_bar();
        short.window.truncate(1);
        assert_eq!(short.window_slope(), 0.0);
    }

    #[test]
    fn bar_deserializes_without_optional_fields() {
        let json = r#"{
            "timestamp": "2024-01-02T00:05:00Z",
            "open": 1.0, "high": 1.1, "low": 0.9, "close": 1.05, "atr": 0.01
        }"#;
        let bar: Bar = serde_json::from_str(json).unwrap();
        assert!(!bar.new_session);
        assert!(bar.window.is_empty());
    }
}
