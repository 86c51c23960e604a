//! Scalping: enter on a close through the previous window extreme.

use crate::components::gates::{GateReason, GateVerdict};
use crate::context::MarketContext;
use crate::domain::{Bar, BracketMultiples, CandidateSetup, Side};
use crate::engine::state::StrategyState;
use crate::error::StrategyError;

use super::{SetupBuilder, Strategy};

const NAME: &str = "scalping";

/// One prior candle plus the current one.
const MIN_WINDOW: usize = 2;

#[derive(Debug, Clone)]
pub struct Scalping {
    min_window: usize,
    required_spread_bands: Vec<String>,
    builder: SetupBuilder,
}

impl Scalping {
    pub fn new(
        symbol: &str,
        multiples: BracketMultiples,
        min_window: usize,
        required_spread_bands: Vec<String>,
    ) -> Self {
        Self {
            min_window: min_window.max(MIN_WINDOW),
            required_spread_bands,
            builder: SetupBuilder::new(symbol, multiples),
        }
    }

    /// High and low of the window excluding its last (current) candle.
    fn previous_extremes(&self, bar: &Bar) -> Option<(f64, f64)> {
        if bar.window.len() < self.min_window {
            return None;
        }
        let (_, prior) = bar.window.split_last()?;
        if prior.is_empty() {
            return None;
        }
        let high = prior.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let low = prior.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        Some((high, low))
    }
}

impl Strategy for Scalping {
    fn name(&self) -> &str {
        NAME
    }

    fn on_bar(&self, bar: &Bar, state: &mut StrategyState) -> Option<CandidateSetup> {
        let (high, low) = self.previous_extremes(bar)?;
        let side = if bar.close > high {
            Side::Long
        } else if bar.close < low {
            Side::Short
        } else {
            return None;
        };
        Some(self.builder.build(side, bar.close, bar, state.bar_index()))
    }

    fn strategy_gate(
        &self,
        ctx: &MarketContext,
        _setup: &CandidateSetup,
    ) -> Result<GateVerdict, StrategyError> {
        let bands = &self.required_spread_bands;
        if !bands.is_empty() && !bands.iter().any(|b| *b == ctx.spread_band) {
            return Ok(GateVerdict::Reject(GateReason::StrategyFilter {
                strategy: NAME.to_string(),
                detail: format!("spread band `{}` too wide for scalping", ctx.spread_band),
            }));
        }
        Ok(GateVerdict::Admit)
    }
}
