//! Market context supplied by the caller for each signal evaluation.
//!
//! The engine only reads it. Band and session names are free-form strings
//! produced upstream; the engine compares them against configured sets.

use serde::{Deserialize, Serialize};

use crate::ev::BucketKey;

/// Realized-volatility band value that the low-volatility toggle refers to.
pub const LOW_VOL_BAND: &str = "low";

/// Realized-volatility band value that some strategies refuse to trade.
pub const HIGH_VOL_BAND: &str = "high";

/// Historical EV profile for the current regime bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvProfile {
    /// Mean realized EV per trade in pips.
    pub expected_ev_pips: f64,
    pub observations: u32,
    /// Recent data gets full weight, long-term data a partial weight.
    pub recent: bool,
}

/// Read-only description of the current regime and account state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketContext {
    pub session: String,
    pub spread_band: String,
    pub rv_band: String,
    pub or_atr_ratio: f64,
    pub expected_slippage_pips: f64,
    pub cost_pips: f64,
    pub loss_streak: u32,
    /// Realized P&L of the day in pips; only the negative part counts as loss.
    pub daily_pnl_pips: f64,
    pub daily_trade_count: u32,
    pub news_freeze: bool,
    pub equity: f64,
    /// Account-currency value of one pip per unit.
    pub pip_value: f64,
    /// Marks fills taken only to calibrate execution quality.
    pub calibration: bool,
    /// When false the sizer runs in calibration mode.
    pub ev_enabled: bool,
    /// Trades still to be taken at warm-up size.
    pub warmup_trades_left: u32,
    pub ev_profile: Option<EvProfile>,
}

impl Default for MarketContext {
    fn default() -> Self {
        Self {
            session: String::new(),
            spread_band: String::new(),
            rv_band: String::new(),
            or_atr_ratio: 0.0,
            expected_slippage_pips: 0.0,
            cost_pips: 0.0,
            loss_streak: 0,
            daily_pnl_pips: 0.0,
            daily_trade_count: 0,
            news_freeze: false,
            equity: 0.0,
            pip_value: 0.0,
            calibration: false,
            ev_enabled: true,
            warmup_trades_left: 0,
            ev_profile: None,
        }
    }
}

impl MarketContext {
    /// EV bucket this context falls into.
    pub fn bucket_key(&self) -> BucketKey {
        BucketKey::from_regime(&self.session, &self.spread_band, &self.rv_band)
    }

    /// Loss portion of the daily P&L as a positive number.
    pub fn daily_loss_pips(&self) -> f64 {
        (-self.daily_pnl_pips).max(0.0)
    }
}
