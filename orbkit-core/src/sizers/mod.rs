//! Position Sizers: determine trade quantity
//!
//! The sizer turns a win probability and bracket distances into units. It is
//! account-aware (equity, pip value) but setup-agnostic: it never decides
//! whether to trade, only how much.

pub mod kelly;

pub use kelly::{KellySizer, SizeDecision, SizingMode, EPS};
