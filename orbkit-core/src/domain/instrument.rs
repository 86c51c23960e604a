//! Pip conversion for FX-style quoting conventions.
//!
//! Every symbol quotes in pips of 0.0001, except JPY-quoted pairs which use
//! the coarser 0.01. Conversions go through an integer pips-per-unit scale so
//! both directions use exact constants.

use serde::{Deserialize, Serialize};

/// Quoting family of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteFamily {
    /// Quote currency is JPY: one pip = 0.01.
    Jpy,
    /// Every other symbol: one pip = 0.0001.
    Standard,
}

impl QuoteFamily {
    /// Classify a symbol such as `USDJPY`, `usd/jpy` or `EUR_USD`.
    pub fn of(symbol: &str) -> Self {
        let normalized: String = symbol
            .chars()
            .filter(|c| !matches!(c, '/' | '_' | '-' | '.'))
            .collect::<String>()
            .to_ascii_uppercase();
        if normalized.ends_with("JPY") {
            QuoteFamily::Jpy
        } else {
            QuoteFamily::Standard
        }
    }

    /// Pips per one unit of price.
    pub fn pips_per_unit(self) -> f64 {
        match self {
            QuoteFamily::Jpy => 100.0,
            QuoteFamily::Standard => 10_000.0,
        }
    }

    /// Price distance of one pip.
    pub fn pip_size(self) -> f64 {
        1.0 / self.pips_per_unit()
    }
}

/// Price distance of one pip for `symbol`.
pub fn pip_size(symbol: &str) -> f64 {
    QuoteFamily::of(symbol).pip_size()
}

/// Convert a price distance to pips.
///
/// Converting back with [`pips_to_price`] returns `price` to within one
/// `f64::EPSILON` relative error, not bit-for-bit. Overflows to infinity
/// above `f64::MAX / pips_per_unit` (about 1.8e304 for non-JPY symbols).
pub fn price_to_pips(price: f64, symbol: &str) -> f64 {
    price * QuoteFamily::of(symbol).pips_per_unit()
}

/// Convert a pip distance to price units.
pub fn pips_to_price(pips: f64, symbol: &str) -> f64 {
    pips / QuoteFamily::of(symbol).pips_per_unit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpy_pairs_use_coarse_pips() {
        assert_eq!(QuoteFamily::of("USDJPY"), QuoteFamily::Jpy);
        assert_eq!(QuoteFamily::of("eur/jpy"), QuoteFamily::Jpy);
        assert_eq!(QuoteFamily::of("GBP_JPY"), QuoteFamily::Jpy);
        assert_eq!(pip_size("USDJPY"), 0.01);
    }

    #[test]
    fn other_pairs_use_fine_pips() {
        assert_eq!(QuoteFamily::of("EURUSD"), QuoteFamily::Standard);
        assert_eq!(QuoteFamily::of("JPYUSD"), QuoteFamily::Standard);
        assert_eq!(pip_size("EURUSD"), 0.0001);
    }

    #[test]
    fn converts_atr_to_pips() {
        assert!((price_to_pips(0.10, "USDJPY") - 10.0).abs() < 1e-9);
        assert!((price_to_pips(0.0015, "EURUSD") - 15.0).abs() < 1e-9);
        assert!((pips_to_price(25.0, "EURUSD") - 0.0025).abs() < 1e-12);
    }

    #[test]
    fn round_trip_is_close_but_not_exact() {
        let x = 0.0017;
        let back = pips_to_price(price_to_pips(x, "EURUSD"), "EURUSD");
        assert!((back - x).abs() <= f64::EPSILON * x);
    }

    #[test]
    fn huge_prices_overflow() {
        assert!(price_to_pips(1.0e304, "EURUSD").is_finite());
        assert!(price_to_pips(1.0e305, "EURUSD").is_infinite());
        assert!(price_to_pips(1.0e305, "USDJPY").is_finite());
    }
}
