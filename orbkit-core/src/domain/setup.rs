//! Candidate setups produced by strategies and consumed by the gate chain.

use serde::{Deserialize, Serialize};

use super::order::{Bracket, Side};

/// A pending entry candidate.
///
/// Produced by a strategy on one bar and discarded by the end of the
/// evaluation cycle that follows it. Never carried across bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSetup {
    pub side: Side,
    pub entry_price: f64,
    pub tp_pips: f64,
    pub sl_pips: f64,
    pub trail_pips: Option<f64>,
    /// Realized ATR of the signal bar, in pips.
    pub atr_pips: f64,
    /// Short-horizon trend estimate in pips per bar.
    pub micro_trend: f64,
    /// Global bar index the setup was produced on.
    pub bar_index: usize,
}

impl CandidateSetup {
    pub fn bracket(&self) -> Bracket {
        Bracket {
            tp_pips: self.tp_pips,
            sl_pips: self.sl_pips,
            trail_pips: self.trail_pips,
        }
    }
}

/// ATR multiples for bracket distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketMultiples {
    pub k_tp: f64,
    pub k_sl: f64,
    pub k_tr: f64,
}

impl BracketMultiples {
    /// Scale ATR (already in pips) into take-profit, stop-loss and trailing
    /// distances. A zero trailing multiple means no trailing distance.
    pub fn distances(&self, atr_pips: f64) -> (f64, f64, Option<f64>) {
        let trail = (self.k_tr > 0.0).then(|| self.k_tr * atr_pips);
        (self.k_tp * atr_pips, self.k_sl * atr_pips, trail)
    }
}
