//! Factory: turns a validated [`EngineConfig`] into a runtime strategy object.

use crate::config::{EngineConfig, StrategyKind};

use super::strategy::{DayOrb, MeanReversion, Momentum, Scalping, Strategy};

/// Build the strategy named by `config.strategy`.
///
/// Every variant shares the symbol (for pip conversion) and the bracket
/// multiples from `[breakout]`.
pub fn create_strategy(config: &EngineConfig) -> Box<dyn Strategy> {
    let symbol = config.symbol.as_str();
    let multiples = config.breakout.multiples();
    match &config.strategy {
        StrategyKind::DayOrb => Box::new(DayOrb::new(
            symbol,
            config.breakout.clone(),
            config.escalation.clone(),
        )),
        StrategyKind::MeanReversion {
            z_entry,
            min_window,
        } => Box::new(MeanReversion::new(symbol, multiples, *z_entry, *min_window)),
        StrategyKind::Momentum {
            min_trend_pips,
            blocked_sessions,
        } => Box::new(Momentum::new(
            symbol,
            multiples,
            *min_trend_pips,
            blocked_sessions.clone(),
        )),
        StrategyKind::Scalping {
            min_window,
            required_spread_bands,
        } => Box::new(Scalping::new(
            symbol,
            multiples,
            *min_window,
            required_spread_bands.clone(),
        )),
    }
}
