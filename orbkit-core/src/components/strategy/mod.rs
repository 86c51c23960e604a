//! Strategy contract: candidate generation plus the two customizable hooks.
//!
//! A strategy sees bars and its own [`StrategyState`], never the account.
//! The engine owns the state and calls the hooks in a fixed order:
//! `on_session_start` (new-session bars only), `on_bar` (every bar), then,
//! when the caller evaluates, `strategy_gate` and `ev_threshold`.

pub mod day_orb;
pub mod mean_reversion;
pub mod momentum;
pub mod scalping;

use crate::config::EvConfig;
use crate::context::MarketContext;
use crate::domain::{price_to_pips, Bar, BracketMultiples, CandidateSetup, Side};
use crate::engine::state::StrategyState;
use crate::error::StrategyError;
use crate::ev::adjusted_threshold;

use super::gates::GateVerdict;

pub use day_orb::DayOrb;
pub use mean_reversion::MeanReversion;
pub use momentum::Momentum;
pub use scalping::Scalping;

/// Trait for per-instrument strategies.
///
/// # Architecture invariant
/// `on_bar` may mutate only the state it is handed and must emit at most one
/// setup per call. The gate and threshold hooks are read-only.
pub trait Strategy: Send + Sync {
    /// Stable snake_case name; also the prefix of order tags.
    fn name(&self) -> &str;

    /// Called after the engine has reset the state for a new session.
    fn on_session_start(&self, _state: &mut StrategyState) {}

    /// Inspect the bar and maybe produce a candidate setup.
    ///
    /// The engine has already counted the bar and advanced the opening-range
    /// window before this is called.
    fn on_bar(&self, bar: &Bar, state: &mut StrategyState) -> Option<CandidateSetup>;

    /// Strategy-specific fine filter, run after every common gate passed.
    fn strategy_gate(
        &self,
        ctx: &MarketContext,
        setup: &CandidateSetup,
    ) -> Result<GateVerdict, StrategyError>;

    /// Minimum `ev_lcb_oco` in pips for admission in LCB mode.
    fn ev_threshold(&self, ctx: &MarketContext, ev: &EvConfig) -> f64 {
        adjusted_threshold(ctx, ev)
    }
}

/// Turns a signal (side, entry) on a bar into a fully priced setup.
#[derive(Debug, Clone)]
pub struct SetupBuilder {
    symbol: String,
    multiples: BracketMultiples,
}

impl SetupBuilder {
    pub fn new(symbol: impl Into<String>, multiples: BracketMultiples) -> Self {
        Self {
            symbol: symbol.into(),
            multiples,
        }
    }

    /// Window close slope in pips per bar.
    pub fn micro_trend(&self, bar: &Bar) -> f64 {
        price_to_pips(bar.window_slope(), &self.symbol)
    }

    pub fn build(
        &self,
        side: Side,
        entry_price: f64,
        bar: &Bar,
        bar_index: usize,
    ) -> CandidateSetup {
        let atr_pips = price_to_pips(bar.atr, &self.symbol);
        let (tp_pips, sl_pips, trail_pips) = self.multiples.distances(atr_pips);
        CandidateSetup {
            side,
            entry_price,
            tp_pips,
            sl_pips,
            trail_pips,
            atr_pips,
            micro_trend: self.micro_trend(bar),
            bar_index,
        }
    }
}

/// Fail a hook on a non-finite context number instead of comparing NaN.
pub(crate) fn finite(
    strategy: &str,
    hook: &'static str,
    field: &str,
    value: f64,
) -> Result<f64, StrategyError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(StrategyError::Hook {
            strategy: strategy.to_string(),
            hook,
            message: format!("context field `{field}` is not finite ({value})"),
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::{Bar, Candle};
    use chrono::{TimeZone, Utc};

    pub fn bar(open: f64, high: f64, low: f64, close: f64, atr: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            open,
            high,
            low,
            close,
            atr,
            new_session: false,
            window: Vec::new(),
        }
    }

    pub fn with_closes(mut b: Bar, closes: &[f64]) -> Bar {
        b.window = closes
            .iter()
            .map(|&c| Candle::new(c, c, c, c))
            .collect();
        b
    }
}
