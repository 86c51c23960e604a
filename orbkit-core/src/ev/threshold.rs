//! EV admission threshold shaping.
//!
//! The base threshold is tightened for marginal opening ranges and relaxed
//! for strong ones, then pulled toward the historical EV of the current
//! regime when enough profile observations exist.

use crate::config::EvConfig;
use crate::context::MarketContext;

/// Threshold in pips that `ev_lcb_oco` must reach for admission.
pub fn adjusted_threshold(ctx: &MarketContext, cfg: &EvConfig) -> f64 {
    let mut threshold = cfg.threshold_pips;

    let ratio = ctx.or_atr_ratio;
    if cfg.marginal_or_ratio > 0.0 && ratio < cfg.marginal_or_ratio {
        threshold += cfg.tighten_pips;
    } else if cfg.strong_or_ratio > 0.0 && ratio >= cfg.strong_or_ratio {
        threshold -= cfg.relax_pips;
    }

    if let Some(profile) = &ctx.ev_profile {
        if profile.observations >= cfg.profile_min_obs && profile.observations > 0 {
            let full = cfg.profile_full_obs.max(1) as f64;
            let confidence = (profile.observations as f64 / full).min(1.0);
            let recency = if profile.recent {
                1.0
            } else {
                cfg.long_term_weight
            };
            let w = (cfg.profile_weight * confidence * recency).clamp(0.0, 1.0);
            threshold = (1.0 - w) * threshold + w * profile.expected_ev_pips;
        }
    }

    threshold
}
