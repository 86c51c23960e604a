//! Router tier: coarse regime filter shared by every strategy.

use super::GateReason;
use crate::config::RouterConfig;
use crate::context::{MarketContext, LOW_VOL_BAND};

fn allowed(set: &[String], value: &str) -> bool {
    set.is_empty() || set.iter().any(|s| s == value)
}

/// News freeze, session, spread band, low-vol toggle, OR/ATR ratio, slippage.
pub fn check_router(ctx: &MarketContext, router: &RouterConfig) -> Result<(), GateReason> {
    if ctx.news_freeze {
        return Err(GateReason::NewsFreeze);
    }
    if !allowed(&router.allowed_sessions, &ctx.session) {
        return Err(GateReason::SessionNotAllowed {
            session: ctx.session.clone(),
        });
    }
    if !allowed(&router.allowed_spread_bands, &ctx.spread_band) {
        return Err(GateReason::SpreadBandNotAllowed {
            spread_band: ctx.spread_band.clone(),
        });
    }
    if !router.allow_low_vol && ctx.rv_band == LOW_VOL_BAND {
        return Err(GateReason::LowVolDisallowed {
            rv_band: ctx.rv_band.clone(),
        });
    }
    if router.min_or_atr_ratio > 0.0 && ctx.or_atr_ratio < router.min_or_atr_ratio {
        return Err(GateReason::OrAtrRatioTooLow {
            or_atr_ratio: ctx.or_atr_ratio,
            min_or_atr_ratio: router.min_or_atr_ratio,
        });
    }
    if router.max_slippage_pips > 0.0 && ctx.expected_slippage_pips > router.max_slippage_pips {
        return Err(GateReason::SlippageTooHigh {
            expected_slippage_pips: ctx.expected_slippage_pips,
            max_slippage_pips: router.max_slippage_pips,
        });
    }
    Ok(())
}
