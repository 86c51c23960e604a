//! Day opening-range breakout with optional retest confirmation.
//!
//! After the opening range freezes, the first qualifying break of either
//! bound becomes the session's only entry. In retest mode the break must be
//! followed by a return to the bound (within `retest_tol_k * atr`) no later
//! than `retest_max_bars` after the first touch. Once the retest is confirmed
//! the second break may come at any later bar of the session.

use crate::components::gates::{GateReason, GateVerdict};
use crate::config::{BreakoutConfig, EscalationConfig, EscalationMode};
use crate::context::MarketContext;
use crate::domain::{Bar, CandidateSetup, Side};
use crate::engine::state::{OpeningRange, RangeProgress, RetestState, StrategyState};
use crate::error::StrategyError;

use super::{finite, SetupBuilder, Strategy};

const NAME: &str = "day_orb";

#[derive(Debug, Clone)]
pub struct DayOrb {
    breakout: BreakoutConfig,
    escalation: EscalationConfig,
    builder: SetupBuilder,
}

impl DayOrb {
    pub fn new(symbol: &str, breakout: BreakoutConfig, escalation: EscalationConfig) -> Self {
        let builder = SetupBuilder::new(symbol, breakout.multiples());
        Self {
            breakout,
            escalation,
            builder,
        }
    }

    fn breaks(&self, bar: &Bar, range: &OpeningRange, side: Side) -> bool {
        let bound = range.bound(side);
        let close_ok = !self.breakout.require_close_breakout || closes_beyond(bar, bound, side);
        touches(bar, bound, side) && close_ok
    }

    fn retested(&self, bar: &Bar, range: &OpeningRange, side: Side) -> bool {
        let tol = self.breakout.retest_tol_k * bar.atr;
        match side {
            Side::Long => bar.low <= range.high + tol,
            Side::Short => bar.high >= range.low - tol,
        }
    }

    fn emit(
        &self,
        side: Side,
        range: &OpeningRange,
        bar: &Bar,
        state: &mut StrategyState,
    ) -> CandidateSetup {
        state.breakout_consumed = true;
        state.retest = RetestState::Idle;
        self.builder.build(side, range.bound(side), bar, state.bar_index())
    }

    /// Advance the retest machine by one transition.
    fn step_retest(
        &self,
        bar: &Bar,
        range: &OpeningRange,
        state: &mut StrategyState,
    ) -> Option<CandidateSetup> {
        let idx = state.bar_index();
        match state.retest {
            RetestState::Idle => {
                let side = pick_side(
                    bar,
                    range,
                    touches(bar, range.high, Side::Long),
                    touches(bar, range.low, Side::Short),
                )?;
                let deadline = idx + self.breakout.retest_max_bars;
                state.retest = RetestState::AwaitingRetest { deadline, side };
                tracing::trace!(
                    bar_index = idx,
                    side = %side,
                    deadline,
                    "initial break, awaiting retest"
                );
                None
            }
            RetestState::AwaitingRetest { deadline, side } => {
                if idx > deadline {
                    state.retest = RetestState::Idle;
                    state.breakout_consumed = true;
                    tracing::trace!(
                        bar_index = idx,
                        deadline,
                        "retest deadline passed, breakout abandoned"
                    );
                } else if self.retested(bar, range, side) {
                    state.retest = RetestState::RetestConfirmed { side };
                    tracing::trace!(bar_index = idx, side = %side, "retest confirmed");
                }
                None
            }
            RetestState::RetestConfirmed { side } => {
                if self.breaks(bar, range, side) {
                    tracing::trace!(bar_index = idx, side = %side, "re-break after retest");
                    Some(self.emit(side, range, bar, state))
                } else {
                    None
                }
            }
        }
    }
}

fn touches(bar: &Bar, bound: f64, side: Side) -> bool {
    match side {
        Side::Long => bar.high >= bound,
        Side::Short => bar.low <= bound,
    }
}

fn closes_beyond(bar: &Bar, bound: f64, side: Side) -> bool {
    match side {
        Side::Long => bar.close > bound,
        Side::Short => bar.close < bound,
    }
}

/// Resolve which side broke. Both sides at once: close confirmation first,
/// then the larger excursion past its bound, then long.
fn pick_side(bar: &Bar, range: &OpeningRange, long: bool, short: bool) -> Option<Side> {
    match (long, short) {
        (false, false) => None,
        (true, false) => Some(Side::Long),
        (false, true) => Some(Side::Short),
        (true, true) => {
            let long_close = closes_beyond(bar, range.high, Side::Long);
            let short_close = closes_beyond(bar, range.low, Side::Short);
            if long_close != short_close {
                return Some(if long_close { Side::Long } else { Side::Short });
            }
            let up = bar.high - range.high;
            let down = range.low - bar.low;
            Some(if down > up { Side::Short } else { Side::Long })
        }
    }
}

impl Strategy for DayOrb {
    fn name(&self) -> &str {
        NAME
    }

    fn on_bar(&self, bar: &Bar, state: &mut StrategyState) -> Option<CandidateSetup> {
        if state.range_progress() != RangeProgress::Ready || state.breakout_consumed {
            return None;
        }
        let range = state.opening_range?;

        if self.breakout.require_retest {
            return self.step_retest(bar, &range, state);
        }

        let side = pick_side(
            bar,
            &range,
            self.breaks(bar, &range, Side::Long),
            self.breaks(bar, &range, Side::Short),
        )?;
        Some(self.emit(side, &range, bar, state))
    }

    fn strategy_gate(
        &self,
        ctx: &MarketContext,
        _setup: &CandidateSetup,
    ) -> Result<GateVerdict, StrategyError> {
        let esc = &self.escalation;
        let mut required = esc.min_or_atr_ratio;

        if esc.session.as_deref() == Some(ctx.session.as_str()) {
            match esc.mode {
                EscalationMode::Block => {
                    return Ok(GateVerdict::Reject(GateReason::SessionBlocked {
                        session: ctx.session.clone(),
                    }));
                }
                EscalationMode::Raise => required *= esc.multiplier,
            }
        }

        if required > 0.0 {
            let ratio = finite(NAME, "strategy_gate", "or_atr_ratio", ctx.or_atr_ratio)?;
            if ratio < required {
                return Ok(GateVerdict::Reject(GateReason::OrQualityTooLow {
                    session: ctx.session.clone(),
                    or_atr_ratio: ratio,
                    required,
                }));
            }
        }
        Ok(GateVerdict::Admit)
    }
}
