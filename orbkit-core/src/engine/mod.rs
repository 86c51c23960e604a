//! Strategy engine: one instrument, one bar at a time.
//!
//! Two calls per bar:
//!
//! 1. `on_bar`: session reset, opening-range bookkeeping, candidate generation
//! 2. `evaluate`: gate chain, EV check, sizing, order assembly
//!
//! `evaluate` takes the pending setup, so each setup is judged at most once.
//! Rejections come back as [`Decision::Rejected`]; only faults are errors.

pub mod state;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::components::gates::{check_common, GateReason};
use crate::components::{create_strategy, Strategy};
use crate::config::{EngineConfig, EvMode};
use crate::context::MarketContext;
use crate::domain::{Bar, CandidateSetup, OrderIntent};
use crate::error::{ConfigError, EngineError, StrategyError};
use crate::ev::EvEstimator;
use crate::sizers::{KellySizer, SizingMode};

pub use state::{OpeningRange, RangeProgress, RetestState, StrategyState};

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Nothing was pending.
    NoSetup,
    Rejected(GateReason),
    Order(OrderIntent),
}

impl Decision {
    pub fn order(&self) -> Option<&OrderIntent> {
        match self {
            Decision::Order(intent) => Some(intent),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<&GateReason> {
        match self {
            Decision::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

type Admission = Result<OrderIntent, GateReason>;

/// Owns the strategy, its state and the sizer for a single instrument.
pub struct StrategyEngine {
    config: EngineConfig,
    config_hash: String,
    strategy: Box<dyn Strategy>,
    sizer: KellySizer,
    state: StrategyState,
}

impl fmt::Debug for StrategyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyEngine")
            .field("strategy", &self.strategy.name())
            .field("symbol", &self.config.symbol)
            .field("config_hash", &self.config_hash)
            .field("state", &self.state)
            .finish()
    }
}

impl StrategyEngine {
    /// Validate `config` and build the strategy it names.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let strategy = create_strategy(&config);
        Self::with_strategy(config, strategy)
    }

    /// Run a caller-supplied strategy under `config`'s gates, EV and sizing.
    pub fn with_strategy(
        config: EngineConfig,
        strategy: Box<dyn Strategy>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let config_hash = config.full_hash()?;
        tracing::info!(
            strategy = strategy.name(),
            symbol = %config.symbol,
            config_hash = %config_hash,
            "strategy engine ready"
        );
        Ok(Self {
            sizer: KellySizer::new(config.sizing.clone()),
            config,
            config_hash,
            strategy,
            state: StrategyState::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    pub fn sizer(&self) -> &KellySizer {
        &self.sizer
    }

    /// Advance the state machine by one bar.
    ///
    /// Returns the setup now pending, if the strategy produced one. Void and
    /// malformed bars are refused before any state is touched.
    pub fn on_bar(&mut self, bar: &Bar) -> Result<Option<&CandidateSetup>, EngineError> {
        let bar_index = self.state.bars_processed();
        if bar.is_void() {
            tracing::warn!(bar_index, timestamp = %bar.timestamp, "void bar refused");
            return Err(EngineError::VoidBar { bar_index });
        }
        if !bar.is_sane() {
            tracing::warn!(
                bar_index,
                timestamp = %bar.timestamp,
                high = bar.high,
                low = bar.low,
                close = bar.close,
                "malformed bar refused"
            );
            return Err(EngineError::MalformedBar { bar_index });
        }

        if bar.new_session {
            self.state.reset_session();
            self.strategy.on_session_start(&mut self.state);
            tracing::debug!(timestamp = %bar.timestamp, "session start");
        }

        self.state.observe_bar(bar, self.config.breakout.or_n);

        if let Some(setup) = self.strategy.on_bar(bar, &mut self.state) {
            tracing::debug!(
                bar_index = setup.bar_index,
                side = %setup.side,
                entry = setup.entry_price,
                "candidate setup"
            );
            self.state.set_pending(setup);
        }
        Ok(self.state.pending())
    }

    /// Judge the pending setup against `ctx` and the shared estimator.
    pub fn evaluate(
        &mut self,
        ctx: &MarketContext,
        ev: &EvEstimator,
    ) -> Result<Decision, EngineError> {
        let Some(setup) = self.state.take_pending() else {
            return Ok(Decision::NoSetup);
        };

        match self.admit(&setup, ctx, ev)? {
            Ok(intent) => {
                self.state.record_signal();
                tracing::info!(
                    bar_index = setup.bar_index,
                    tag = %intent.tag,
                    quantity = intent.quantity,
                    price = intent.price,
                    "order intent"
                );
                Ok(Decision::Order(intent))
            }
            Err(reason) => {
                tracing::debug!(
                    bar_index = setup.bar_index,
                    stage = reason.stage(),
                    %reason,
                    "setup rejected"
                );
                Ok(Decision::Rejected(reason))
            }
        }
    }

    fn admit(
        &self,
        setup: &CandidateSetup,
        ctx: &MarketContext,
        ev: &EvEstimator,
    ) -> Result<Admission, StrategyError> {
        let cfg = &self.config;
        if let Err(reason) = check_common(&self.state, setup, ctx, &cfg.gates, &cfg.router) {
            return Ok(Err(reason));
        }
        if let Err(reason) = self.strategy.strategy_gate(ctx, setup)?.into_result() {
            return Ok(Err(reason));
        }

        let mode = SizingMode::from_context(ctx);
        let p = if mode.uses_ev() {
            match self.win_probability(setup, ctx, ev) {
                Ok(p) => p,
                Err(reason) => return Ok(Err(reason)),
            }
        } else {
            cfg.ev.fallback_win_rate
        };

        let size = self
            .sizer
            .compute_qty_from_ctx(ctx, p, setup.tp_pips, setup.sl_pips);
        if !(size.quantity > 0.0) {
            return Ok(Err(GateReason::ZeroQuantity {
                mode: size.mode,
                quantity: size.quantity,
            }));
        }

        Ok(Ok(OrderIntent {
            side: setup.side,
            quantity: size.quantity,
            price: setup.entry_price,
            time_in_force: cfg.order.time_in_force,
            tag: format!("{}_{}", self.strategy.name(), setup.side.as_str()),
            bracket: setup.bracket(),
        }))
    }

    /// Win probability for production sizing, per the configured EV mode.
    fn win_probability(
        &self,
        setup: &CandidateSetup,
        ctx: &MarketContext,
        ev: &EvEstimator,
    ) -> Result<f64, GateReason> {
        let bucket = ctx.bucket_key();
        match self.config.ev.mode {
            EvMode::Off => Ok(self.config.ev.fallback_win_rate),
            EvMode::Mean => Ok(ev.p_mean(&bucket)),
            EvMode::Lcb => {
                let p_lcb = ev.p_lcb(&bucket);
                let ev_lcb = ev.ev_lcb_oco(&bucket, setup.tp_pips, setup.sl_pips, ctx.cost_pips);
                let threshold = self.strategy.ev_threshold(ctx, &self.config.ev);
                if ev_lcb < threshold {
                    return Err(GateReason::EvBelowThreshold {
                        ev_lcb,
                        threshold,
                        p_lcb,
                    });
                }
                Ok(p_lcb)
            }
        }
    }
}
