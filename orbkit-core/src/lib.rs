//! orbkit core: per-bar opening-range breakout pipeline.
//!
//! bar → candidate setup → gate chain → EV estimate → sized order intent.
//!
//! - Domain types (bars, setups, order intents) and the pip converter
//! - Breakout/retest state machine and its per-session state
//! - Two-tier admission gate chain with structured rejection reasons
//! - Beta-Binomial win-probability estimator with a Wilson lower bound
//! - Fractional-Kelly sizer with equity-at-risk guards
//! - Strategy trait with day-ORB, mean-reversion, momentum and scalping variants

pub mod components;
pub mod config;
pub mod context;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ev;
pub mod sizers;

pub use components::{GateReason, GateVerdict, Strategy};
pub use config::EngineConfig;
pub use context::MarketContext;
pub use engine::{Decision, StrategyEngine};
pub use error::{ConfigError, EngineError, StrategyError};
pub use ev::{BucketKey, EvEstimator, Outcome};
