//! Fractional-Kelly sizer with equity-at-risk guardrails.
//!
//! # Formula
//! ```text
//! base_units    = (equity * risk_per_trade_pct / 100) / max(pip_value * sl_pips, eps)
//! b             = tp_pips / sl_pips
//! f*            = max(0, p - (1 - p) / b)
//! multiplier    = min(units_cap, kelly_fraction * f*)
//! max_loss_u    = (equity * max_trade_loss_pct / 100) / max(pip_value * sl_pips, eps)
//! quantity      = min(max(base_units * multiplier, 0), max_loss_u, units_cap)
//! ```

use serde::{Deserialize, Serialize};

use crate::config::SizingConfig;
use crate::context::MarketContext;

/// Floor for divisions by pip value and stop distance.
pub const EPS: f64 = 1e-9;

/// Which sizing path applies to an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    /// Minimal fixed size for execution-quality calibration; EV is bypassed.
    Calibration,
    /// Small fixed size while the EV estimator accumulates samples.
    Warmup,
    /// Full EV + Kelly pipeline.
    Production,
}

impl SizingMode {
    /// Calibration beats warm-up beats production.
    pub fn from_context(ctx: &MarketContext) -> Self {
        if ctx.calibration || !ctx.ev_enabled {
            SizingMode::Calibration
        } else if ctx.warmup_trades_left > 0 {
            SizingMode::Warmup
        } else {
            SizingMode::Production
        }
    }

    pub fn uses_ev(self) -> bool {
        matches!(self, SizingMode::Production)
    }
}

/// Result of one sizing call, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeDecision {
    pub mode: SizingMode,
    pub base_units: f64,
    pub multiplier: f64,
    pub quantity: f64,
}

/// Units risking `pct` percent of equity over a stop of `sl_pips`.
fn units_at_risk(equity: f64, pct: f64, pip_value: f64, sl_pips: f64) -> f64 {
    (equity * pct / 100.0) / (pip_value * sl_pips).max(EPS)
}

/// Fractional-Kelly sizer.
#[derive(Debug, Clone)]
pub struct KellySizer {
    config: SizingConfig,
}

impl KellySizer {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    /// Units that risk `risk_per_trade_pct` of equity at the stop.
    pub fn base_units(&self, equity: f64, pip_value: f64, sl_pips: f64) -> f64 {
        units_at_risk(equity, self.config.risk_per_trade_pct, pip_value, sl_pips)
    }

    /// Units whose stop-out would lose exactly `max_trade_loss_pct` of equity.
    pub fn max_trade_loss_units(&self, equity: f64, pip_value: f64, sl_pips: f64) -> f64 {
        units_at_risk(equity, self.config.max_trade_loss_pct, pip_value, sl_pips)
    }

    /// Kelly multiplier for an OCO bracket: non-negative, at most `units_cap`.
    pub fn kelly_multiplier_oco(&self, p: f64, tp_pips: f64, sl_pips: f64) -> f64 {
        let b = tp_pips.max(0.0) / sl_pips.max(EPS);
        let f_star = if b <= 0.0 {
            0.0
        } else {
            (p - (1.0 - p) / b).max(0.0)
        };
        (self.config.kelly_fraction * f_star).min(self.config.units_cap)
    }

    /// Clamp a raw quantity into `[0, min(max_trade_loss_units, units_cap)]`.
    pub fn apply_guards(&self, qty: f64, max_trade_loss_units: f64) -> f64 {
        if !qty.is_finite() {
            return 0.0;
        }
        qty.max(0.0)
            .min(max_trade_loss_units.max(0.0))
            .min(self.config.units_cap)
    }

    /// Size a trade in the mode the context implies.
    ///
    /// `p` is only read in production mode. A non-positive quantity is a
    /// sizing rejection for the caller, not an error.
    pub fn compute_qty_from_ctx(
        &self,
        ctx: &MarketContext,
        p: f64,
        tp_pips: f64,
        sl_pips: f64,
    ) -> SizeDecision {
        let mode = SizingMode::from_context(ctx);
        let base_units = self.base_units(ctx.equity, ctx.pip_value, sl_pips);
        let multiplier = match mode {
            SizingMode::Calibration => self.config.calibration_mult,
            SizingMode::Warmup => self.config.warmup_mult,
            SizingMode::Production => self.kelly_multiplier_oco(p, tp_pips, sl_pips),
        };
        let cap = self.max_trade_loss_units(ctx.equity, ctx.pip_value, sl_pips);
        let quantity = self.apply_guards(base_units * multiplier, cap);
        SizeDecision {
            mode,
            base_units,
            multiplier,
            quantity,
        }
    }
}
