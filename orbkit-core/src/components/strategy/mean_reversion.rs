//! Mean reversion: fade a close stretched `z_entry` deviations from the
//! trailing window mean.

use crate::components::gates::{GateReason, GateVerdict};
use crate::context::{MarketContext, HIGH_VOL_BAND};
use crate::domain::{Bar, BracketMultiples, CandidateSetup, Side};
use crate::engine::state::StrategyState;
use crate::error::StrategyError;
use crate::sizers::EPS;

use super::{SetupBuilder, Strategy};

const NAME: &str = "mean_reversion";

/// Fewest closes a z-score is taken over.
const MIN_WINDOW: usize = 3;

#[derive(Debug, Clone)]
pub struct MeanReversion {
    z_entry: f64,
    min_window: usize,
    builder: SetupBuilder,
}

impl MeanReversion {
    pub fn new(symbol: &str, multiples: BracketMultiples, z_entry: f64, min_window: usize) -> Self {
        Self {
            z_entry,
            min_window: min_window.max(MIN_WINDOW),
            builder: SetupBuilder::new(symbol, multiples),
        }
    }

    /// z-score of the bar's close against the window closes.
    ///
    /// `None` when the window is too short or flat.
    pub fn z_score(&self, bar: &Bar) -> Option<f64> {
        let n = bar.window.len();
        if n < self.min_window {
            return None;
        }
        let mean = bar.window.iter().map(|c| c.close).sum::<f64>() / n as f64;
        let var = bar
            .window
            .iter()
            .map(|c| (c.close - mean).powi(2))
            .sum::<f64>()
            / n as f64;
        let sd = var.sqrt();
        (sd > EPS).then(|| (bar.close - mean) / sd)
    }
}

impl Strategy for MeanReversion {
    fn name(&self) -> &str {
        NAME
    }

    fn on_bar(&self, bar: &Bar, state: &mut StrategyState) -> Option<CandidateSetup> {
        let z = self.z_score(bar)?;
        let side = if z >= self.z_entry {
            Side::Short
        } else if z <= -self.z_entry {
            Side::Long
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
        if ctx.rv_band == HIGH_VOL_BAND {
            return Ok(GateVerdict::Reject(GateReason::StrategyFilter {
                strategy: NAME.to_string(),
                detail: format!("rv_band `{}` trends too hard to fade", ctx.rv_band),
            }));
        }
        Ok(GateVerdict::Admit)
    }
}
