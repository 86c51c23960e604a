//! Cooldown and account-level risk caps.

use super::GateReason;
use crate::config::GateConfig;
use crate::context::MarketContext;
use crate::engine::state::StrategyState;

/// Reject while fewer than `cooldown_bars` have passed since the last signal.
pub fn check_cooldown(state: &StrategyState, gates: &GateConfig) -> Result<(), GateReason> {
    match state.bars_since_signal() {
        Some(bars) if bars < gates.cooldown_bars => Err(GateReason::Cooldown {
            bars_since_signal: bars,
            cooldown_bars: gates.cooldown_bars,
        }),
        _ => Ok(()),
    }
}

/// Per-session signal cap, loss streak, daily loss and daily trade count.
///
/// Each cap is disabled when its limit is zero.
pub fn check_caps(
    state: &StrategyState,
    ctx: &MarketContext,
    gates: &GateConfig,
) -> Result<(), GateReason> {
    if gates.max_signals_per_day > 0 && state.signals_today >= gates.max_signals_per_day {
        return Err(GateReason::SignalsPerDayCap {
            signals_today: state.signals_today,
            max_signals_per_day: gates.max_signals_per_day,
        });
    }
    if gates.max_loss_streak > 0 && ctx.loss_streak >= gates.max_loss_streak {
        return Err(GateReason::LossStreakGuard {
            loss_streak: ctx.loss_streak,
            max_loss_streak: gates.max_loss_streak,
        });
    }
    let daily_loss = ctx.daily_loss_pips();
    if gates.max_daily_loss_pips > 0.0 && daily_loss >= gates.max_daily_loss_pips {
        return Err(GateReason::DailyLossCap {
            daily_loss_pips: daily_loss,
            max_daily_loss_pips: gates.max_daily_loss_pips,
        });
    }
    if gates.max_daily_trade_count > 0 && ctx.daily_trade_count >= gates.max_daily_trade_count {
        return Err(GateReason::DailyTradeCap {
            daily_trade_count: ctx.daily_trade_count,
            max_daily_trade_count: gates.max_daily_trade_count,
        });
    }
    Ok(())
}
