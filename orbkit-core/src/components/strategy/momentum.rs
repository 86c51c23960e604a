//! Momentum continuation: after the opening range freezes, follow a close
//! beyond it when the micro-trend agrees. One entry per session.

use crate::components::gates::{GateReason, GateVerdict};
use crate::context::MarketContext;
use crate::domain::{Bar, BracketMultiples, CandidateSetup, Side};
use crate::engine::state::{RangeProgress, StrategyState};
use crate::error::StrategyError;

use super::{SetupBuilder, Strategy};

const NAME: &str = "momentum";

#[derive(Debug, Clone)]
pub struct Momentum {
    min_trend_pips: f64,
    blocked_sessions: Vec<String>,
    builder: SetupBuilder,
}

impl Momentum {
    pub fn new(
        symbol: &str,
        multiples: BracketMultiples,
        min_trend_pips: f64,
        blocked_sessions: Vec<String>,
    ) -> Self {
        Self {
            min_trend_pips,
            blocked_sessions,
            builder: SetupBuilder::new(symbol, multiples),
        }
    }
}

impl Strategy for Momentum {
    fn name(&self) -> &str {
        NAME
    }

    fn on_bar(&self, bar: &Bar, state: &mut StrategyState) -> Option<CandidateSetup> {
        if state.range_progress() != RangeProgress::Ready || state.breakout_consumed {
            return None;
        }
        let range = state.opening_range?;
        let trend = self.builder.micro_trend(bar);

        let side = if bar.close > range.high && trend >= self.min_trend_pips {
            Side::Long
        } else if bar.close < range.low && trend <= -self.min_trend_pips {
            Side::Short
        } else {
            return None;
        };
        state.breakout_consumed = true;
        Some(self.builder.build(side, bar.close, bar, state.bar_index()))
    }

    fn strategy_gate(
        &self,
        ctx: &MarketContext,
        _setup: &CandidateSetup,
    ) -> Result<GateVerdict, StrategyError> {
        if self.blocked_sessions.iter().any(|s| *s == ctx.session) {
            return Ok(GateVerdict::Reject(GateReason::SessionBlocked {
                session: ctx.session.clone(),
            }));
        }
        Ok(GateVerdict::Admit)
    }
}
