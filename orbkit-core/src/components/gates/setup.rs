//! Setup-quality filters: realized ATR band and micro-trend alignment.

use super::GateReason;
use crate::config::GateConfig;
use crate::domain::{CandidateSetup, Side};

/// Reject when ATR in pips falls outside `[min_atr_pips, max_atr_pips]`.
/// A zero bound is disabled.
pub fn check_atr_band(setup: &CandidateSetup, gates: &GateConfig) -> Result<(), GateReason> {
    let atr = setup.atr_pips;
    let below = gates.min_atr_pips > 0.0 && atr < gates.min_atr_pips;
    let above = gates.max_atr_pips > 0.0 && atr > gates.max_atr_pips;
    if below || above {
        return Err(GateReason::AtrBand {
            atr_pips: atr,
            min_atr_pips: gates.min_atr_pips,
            max_atr_pips: gates.max_atr_pips,
        });
    }
    Ok(())
}

/// Longs need `trend >= min`, shorts need `trend <= -min`.
pub fn check_micro_trend(setup: &CandidateSetup, gates: &GateConfig) -> Result<(), GateReason> {
    let min = gates.min_micro_trend;
    let misaligned = match setup.side {
        Side::Long => setup.micro_trend < min,
        Side::Short => setup.micro_trend > -min,
    };
    if misaligned {
        return Err(GateReason::MicroTrend {
            side: setup.side,
            micro_trend: setup.micro_trend,
            min_micro_trend: min,
        });
    }
    Ok(())
}
