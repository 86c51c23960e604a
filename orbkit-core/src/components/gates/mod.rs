//! Admission gate chain: filters candidate setups before EV and sizing.
//!
//! Two tiers run in a fixed order and stop at the first failure:
//! - strategy-agnostic: cooldown, regime router, risk caps, ATR band, micro-trend
//! - strategy-specific: the strategy's own fine filter (`Strategy::strategy_gate`)
//!
//! Every stage returns `Result<(), GateReason>` so the chain is a sequence of
//! `?` and exactly one reason comes out of a rejection.

pub mod regime;
pub mod risk;
pub mod setup;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{GateConfig, RouterConfig};
use crate::context::MarketContext;
use crate::domain::{CandidateSetup, Side};
use crate::engine::state::StrategyState;
use crate::sizers::SizingMode;

/// Why a candidate setup was not turned into an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum GateReason {
    Cooldown {
        bars_since_signal: usize,
        cooldown_bars: usize,
    },
    NewsFreeze,
    SessionNotAllowed {
        session: String,
    },
    SpreadBandNotAllowed {
        spread_band: String,
    },
    LowVolDisallowed {
        rv_band: String,
    },
    OrAtrRatioTooLow {
        or_atr_ratio: f64,
        min_or_atr_ratio: f64,
    },
    SlippageTooHigh {
        expected_slippage_pips: f64,
        max_slippage_pips: f64,
    },
    SignalsPerDayCap {
        signals_today: u32,
        max_signals_per_day: u32,
    },
    LossStreakGuard {
        loss_streak: u32,
        max_loss_streak: u32,
    },
    DailyLossCap {
        daily_loss_pips: f64,
        max_daily_loss_pips: f64,
    },
    DailyTradeCap {
        daily_trade_count: u32,
        max_daily_trade_count: u32,
    },
    AtrBand {
        atr_pips: f64,
        min_atr_pips: f64,
        max_atr_pips: f64,
    },
    MicroTrend {
        side: Side,
        micro_trend: f64,
        min_micro_trend: f64,
    },
    SessionBlocked {
        session: String,
    },
    OrQualityTooLow {
        session: String,
        or_atr_ratio: f64,
        required: f64,
    },
    StrategyFilter {
        strategy: String,
        detail: String,
    },
    EvBelowThreshold {
        ev_lcb: f64,
        threshold: f64,
        p_lcb: f64,
    },
    ZeroQuantity {
        mode: SizingMode,
        quantity: f64,
    },
}

impl GateReason {
    /// Stable snake_case stage name, identical to the serialized tag.
    pub fn stage(&self) -> &'static str {
        match self {
            GateReason::Cooldown { .. } => "cooldown",
            GateReason::NewsFreeze => "news_freeze",
            GateReason::SessionNotAllowed { .. } => "session_not_allowed",
            GateReason::SpreadBandNotAllowed { .. } => "spread_band_not_allowed",
            GateReason::LowVolDisallowed { .. } => "low_vol_disallowed",
            GateReason::OrAtrRatioTooLow { .. } => "or_atr_ratio_too_low",
            GateReason::SlippageTooHigh { .. } => "slippage_too_high",
            GateReason::SignalsPerDayCap { .. } => "signals_per_day_cap",
            GateReason::LossStreakGuard { .. } => "loss_streak_guard",
            GateReason::DailyLossCap { .. } => "daily_loss_cap",
            GateReason::DailyTradeCap { .. } => "daily_trade_cap",
            GateReason::AtrBand { .. } => "atr_band",
            GateReason::MicroTrend { .. } => "micro_trend",
            GateReason::SessionBlocked { .. } => "session_blocked",
            GateReason::OrQualityTooLow { .. } => "or_quality_too_low",
            GateReason::StrategyFilter { .. } => "strategy_filter",
            GateReason::EvBelowThreshold { .. } => "ev_below_threshold",
            GateReason::ZeroQuantity { .. } => "zero_quantity",
        }
    }
}

impl fmt::Display for GateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateReason::Cooldown {
                bars_since_signal,
                cooldown_bars,
            } => write!(f, "cooldown: {bars_since_signal} < {cooldown_bars} bars"),
            GateReason::LossStreakGuard {
                loss_streak,
                max_loss_streak,
            } => write!(f, "loss_streak_guard: {loss_streak} >= {max_loss_streak}"),
            GateReason::EvBelowThreshold {
                ev_lcb, threshold, ..
            } => write!(f, "ev_below_threshold: {ev_lcb:.3} < {threshold:.3}"),
            other => f.write_str(other.stage()),
        }
    }
}

/// Outcome of a strategy's fine filter.
#[derive(Debug, Clone, PartialEq)]
pub enum GateVerdict {
    Admit,
    Reject(GateReason),
}

impl GateVerdict {
    pub fn is_admitted(&self) -> bool {
        matches!(self, GateVerdict::Admit)
    }

    pub fn into_result(self) -> Result<(), GateReason> {
        match self {
            GateVerdict::Admit => Ok(()),
            GateVerdict::Reject(reason) => Err(reason),
        }
    }
}

/// Run the strategy-agnostic stages in order, stopping at the first failure.
pub fn check_common(
    state: &StrategyState,
    setup: &CandidateSetup,
    ctx: &MarketContext,
    gates: &GateConfig,
    router: &RouterConfig,
) -> Result<(), GateReason> {
    risk::check_cooldown(state, gates)?;
    regime::check_router(ctx, router)?;
    risk::check_caps(state, ctx, gates)?;
    setup::check_atr_band(setup, gates)?;
    setup::check_micro_trend(setup, gates)
}
