//! Order intents with OCO bracket distances.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time-in-force carried on the entry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    /// Good till cancelled.
    #[default]
    Gtc,
    /// Expires at the end of the session.
    Day,
    /// Immediate or cancel.
    Ioc,
}

/// Take-profit / stop-loss / trailing distances in pips.
///
/// The take-profit and stop-loss legs form an OCO pair. `trail_pips` is
/// `None` when no trailing stop is requested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub tp_pips: f64,
    pub sl_pips: f64,
    pub trail_pips: Option<f64>,
}

/// Terminal output of one evaluation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub side: Side,
    pub quantity: f64,
    /// Reference entry price.
    pub price: f64,
    pub time_in_force: TimeInForce,
    pub tag: String,
    pub bracket: Bracket,
}
