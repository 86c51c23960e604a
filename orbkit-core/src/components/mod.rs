//! Pluggable pieces of the per-bar pipeline.
//!
//! - Gates: the strategy-agnostic admission chain and its rejection reasons
//! - Strategy: candidate generation plus the fine filter and EV threshold hooks
//! - Factory: builds the configured strategy as a trait object

pub mod factory;
pub mod gates;
pub mod strategy;

pub use factory::create_strategy;
pub use gates::{check_common, GateReason, GateVerdict};
pub use strategy::{SetupBuilder, Strategy};
