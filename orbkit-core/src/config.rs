//! Serializable engine configuration.
//!
//! One TOML document configures a single-instrument engine: which strategy
//! variant runs, the breakout/retest parameters, both gate tiers, the EV
//! estimator, the sizer and order defaults. Every field has a default so a
//! config file only needs to name what it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::{BracketMultiples, TimeInForce};
use crate::error::ConfigError;

/// Complete configuration of one strategy engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Instrument symbol; selects the pip convention.
    pub symbol: String,
    pub strategy: StrategyKind,
    pub breakout: BreakoutConfig,
    pub gates: GateConfig,
    pub router: RouterConfig,
    pub escalation: EscalationConfig,
    pub ev: EvConfig,
    pub sizing: SizingConfig,
    pub order: OrderConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: "USDJPY".into(),
            strategy: StrategyKind::DayOrb,
            breakout: BreakoutConfig::default(),
            gates: GateConfig::default(),
            router: RouterConfig::default(),
            escalation: EscalationConfig::default(),
            ev: EvConfig::default(),
            sizing: SizingConfig::default(),
            order: OrderConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::invalid("symbol", "must not be empty"));
        }
        self.breakout.validate()?;
        self.gates.validate()?;
        self.escalation.validate()?;
        self.ev.validate()?;
        self.sizing.validate()?;
        self.strategy.validate()
    }

    /// Exact identity of this configuration: blake3 over its canonical JSON.
    pub fn full_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}

/// Strategy variant and its variant-specific parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyKind {
    /// Opening-range breakout with optional retest confirmation.
    DayOrb,
    /// Fade stretched closes back toward the trailing-window mean.
    MeanReversion {
        #[serde(default = "default_z_entry")]
        z_entry: f64,
        #[serde(default = "default_min_window")]
        min_window: usize,
    },
    /// Trend continuation beyond the opening range.
    Momentum {
        #[serde(default = "default_min_trend_pips")]
        min_trend_pips: f64,
        #[serde(default)]
        blocked_sessions: Vec<String>,
    },
    /// Break of the previous window extreme with tight brackets.
    Scalping {
        #[serde(default = "default_min_window")]
        min_window: usize,
        #[serde(default)]
        required_spread_bands: Vec<String>,
    },
}

fn default_z_entry() -> f64 {
    2.0
}

fn default_min_window() -> usize {
    5
}

fn default_min_trend_pips() -> f64 {
    0.5
}

impl StrategyKind {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            StrategyKind::DayOrb => Ok(()),
            StrategyKind::MeanReversion { z_entry, min_window } => {
                if !(*z_entry > 0.0) {
                    return Err(ConfigError::invalid("strategy.z_entry", "must be > 0"));
                }
                if *min_window < 3 {
                    return Err(ConfigError::invalid("strategy.min_window", "must be >= 3"));
                }
                Ok(())
            }
            StrategyKind::Momentum { min_trend_pips, .. } => {
                if *min_trend_pips < 0.0 {
                    return Err(ConfigError::invalid(
                        "strategy.min_trend_pips",
                        "must be >= 0",
                    ));
                }
                Ok(())
            }
            StrategyKind::Scalping { min_window, .. } => {
                if *min_window < 2 {
                    return Err(ConfigError::invalid("strategy.min_window", "must be >= 2"));
                }
                Ok(())
            }
        }
    }
}

/// Opening-range window, bracket multiples and retest parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BreakoutConfig {
    /// Opening-range window length in bars.
    pub or_n: usize,
    pub k_tp: f64,
    pub k_sl: f64,
    /// Trailing multiple; zero disables the trailing distance.
    pub k_tr: f64,
    pub require_close_breakout: bool,
    pub require_retest: bool,
    pub retest_max_bars: usize,
    /// Retest tolerance as a multiple of ATR in price units.
    pub retest_tol_k: f64,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            or_n: 6,
            k_tp: 1.0,
            k_sl: 0.8,
            k_tr: 0.0,
            require_close_breakout: true,
            require_retest: false,
            retest_max_bars: 6,
            retest_tol_k: 0.25,
        }
    }
}

impl BreakoutConfig {
    pub fn multiples(&self) -> BracketMultiples {
        BracketMultiples {
            k_tp: self.k_tp,
            k_sl: self.k_sl,
            k_tr: self.k_tr,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.or_n == 0 {
            return Err(ConfigError::invalid("breakout.or_n", "must be >= 1"));
        }
        if !(self.k_tp > 0.0) {
            return Err(ConfigError::invalid("breakout.k_tp", "must be > 0"));
        }
        if !(self.k_sl > 0.0) {
            return Err(ConfigError::invalid("breakout.k_sl", "must be > 0"));
        }
        if self.k_tr < 0.0 {
            return Err(ConfigError::invalid("breakout.k_tr", "must be >= 0"));
        }
        if self.retest_tol_k < 0.0 {
            return Err(ConfigError::invalid("breakout.retest_tol_k", "must be >= 0"));
        }
        Ok(())
    }
}

/// Strategy-agnostic risk caps and setup-quality filters.
///
/// A zero limit disables its stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    pub cooldown_bars: usize,
    pub min_micro_trend: f64,
    pub min_atr_pips: f64,
    pub max_atr_pips: f64,
    pub max_signals_per_day: u32,
    pub max_loss_streak: u32,
    pub max_daily_loss_pips: f64,
    pub max_daily_trade_count: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cooldown_bars: 0,
            min_micro_trend: 0.0,
            min_atr_pips: 0.0,
            max_atr_pips: 0.0,
            max_signals_per_day: 1,
            max_loss_streak: 0,
            max_daily_loss_pips: 0.0,
            max_daily_trade_count: 0,
        }
    }
}

impl GateConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_atr_pips < 0.0 || self.max_atr_pips < 0.0 {
            return Err(ConfigError::invalid("gates.atr_pips", "bounds must be >= 0"));
        }
        if self.min_atr_pips > 0.0
            && self.max_atr_pips > 0.0
            && self.min_atr_pips > self.max_atr_pips
        {
            return Err(ConfigError::invalid(
                "gates.atr_pips",
                "min_atr_pips must not exceed max_atr_pips",
            ));
        }
        if self.max_daily_loss_pips < 0.0 {
            return Err(ConfigError::invalid(
                "gates.max_daily_loss_pips",
                "must be >= 0 (a positive loss limit)",
            ));
        }
        Ok(())
    }
}

/// Coarse regime filter shared by every strategy.
///
/// Empty allowed-sets allow everything; zero numeric limits are disabled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    pub allowed_sessions: Vec<String>,
    pub allowed_spread_bands: Vec<String>,
    pub allow_low_vol: bool,
    pub min_or_atr_ratio: f64,
    pub max_slippage_pips: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            allowed_sessions: Vec::new(),
            allowed_spread_bands: Vec::new(),
            allow_low_vol: true,
            min_or_atr_ratio: 0.0,
            max_slippage_pips: 0.0,
        }
    }
}

/// What happens inside the escalated session window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationMode {
    /// No entries at all during the session.
    Block,
    /// Multiply the minimum OR/ATR ratio.
    #[default]
    Raise,
}

/// Day-ORB fine filter: minimum OR/ATR ratio, escalated in one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EscalationConfig {
    pub min_or_atr_ratio: f64,
    /// Name of the high-volatility session; `None` disables escalation.
    pub session: Option<String>,
    pub mode: EscalationMode,
    pub multiplier: f64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            min_or_atr_ratio: 0.0,
            session: None,
            mode: EscalationMode::Raise,
            multiplier: 1.5,
        }
    }
}

impl EscalationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.multiplier > 0.0) {
            return Err(ConfigError::invalid("escalation.multiplier", "must be > 0"));
        }
        Ok(())
    }
}

/// How the win probability is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvMode {
    /// Use `fallback_win_rate`.
    Off,
    /// Posterior mean, no threshold comparison.
    Mean,
    /// Lower confidence bound, compared against the EV threshold.
    #[default]
    Lcb,
}

/// EV estimator prior, decay, confidence level and threshold shaping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvConfig {
    pub mode: EvMode,
    pub fallback_win_rate: f64,
    pub prior_alpha: f64,
    pub prior_beta: f64,
    /// Multiplicative decay applied to counts before each update; 1.0 disables.
    pub decay: f64,
    /// One-sided confidence level of the lower bound.
    pub confidence: f64,
    /// Weight of the global counts pooled into each bucket.
    pub global_weight: f64,
    /// Base admission threshold on conservative EV, in pips.
    pub threshold_pips: f64,
    pub marginal_or_ratio: f64,
    pub strong_or_ratio: f64,
    pub tighten_pips: f64,
    pub relax_pips: f64,
    pub profile_min_obs: u32,
    pub profile_full_obs: u32,
    pub profile_weight: f64,
    /// Weight of long-term (non-recent) profile data relative to recent.
    pub long_term_weight: f64,
}

impl Default for EvConfig {
    fn default() -> Self {
        Self {
            mode: EvMode::Lcb,
            fallback_win_rate: 0.5,
            prior_alpha: 1.0,
            prior_beta: 1.0,
            decay: 1.0,
            confidence: 0.95,
            global_weight: 0.25,
            threshold_pips: 0.0,
            marginal_or_ratio: 0.0,
            strong_or_ratio: 0.0,
            tighten_pips: 0.0,
            relax_pips: 0.0,
            profile_min_obs: 20,
            profile_full_obs: 100,
            profile_weight: 0.0,
            long_term_weight: 0.5,
        }
    }
}

impl EvConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.fallback_win_rate) {
            return Err(ConfigError::invalid("ev.fallback_win_rate", "must be in [0, 1]"));
        }
        if self.prior_alpha < 0.0 || self.prior_beta < 0.0 {
            return Err(ConfigError::invalid("ev.prior", "pseudo-counts must be >= 0"));
        }
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(ConfigError::invalid("ev.decay", "must be in (0, 1]"));
        }
        if !(self.confidence > 0.5 && self.confidence < 1.0) {
            return Err(ConfigError::invalid("ev.confidence", "must be in (0.5, 1)"));
        }
        if self.global_weight < 0.0 {
            return Err(ConfigError::invalid("ev.global_weight", "must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.profile_weight)
            || !(0.0..=1.0).contains(&self.long_term_weight)
        {
            return Err(ConfigError::invalid(
                "ev.profile_weight",
                "profile weights must be in [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Risk-per-trade, Kelly fraction and hard guardrails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SizingConfig {
    pub risk_per_trade_pct: f64,
    pub kelly_fraction: f64,
    /// Absolute unit cap; also caps the Kelly multiplier.
    pub units_cap: f64,
    pub max_trade_loss_pct: f64,
    /// Fixed multiple of base units in calibration mode.
    pub calibration_mult: f64,
    /// Fixed multiple of base units while warming up.
    pub warmup_mult: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            risk_per_trade_pct: 0.25,
            kelly_fraction: 0.25,
            units_cap: 5.0,
            max_trade_loss_pct: 0.5,
            calibration_mult: 0.1,
            warmup_mult: 0.25,
        }
    }
}

impl SizingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.risk_per_trade_pct < 0.0 || self.max_trade_loss_pct < 0.0 {
            return Err(ConfigError::invalid("sizing.pct", "percentages must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.kelly_fraction) {
            return Err(ConfigError::invalid("sizing.kelly_fraction", "must be in [0, 1]"));
        }
        if !(self.units_cap > 0.0) {
            return Err(ConfigError::invalid("sizing.units_cap", "must be > 0"));
        }
        if self.calibration_mult < 0.0 || self.warmup_mult < 0.0 {
            return Err(ConfigError::invalid("sizing.mult", "multipliers must be >= 0"));
        }
        Ok(())
    }
}

/// Defaults stamped onto every order intent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OrderConfig {
    pub time_in_force: TimeInForce,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            symbol = "EURUSD"

            [breakout]
            or_n = 3
            require_retest = true

            [ev]
            mode = "mean"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.symbol, "EURUSD");
        assert_eq!(cfg.breakout.or_n, 3);
        assert!(cfg.breakout.require_retest);
        assert_eq!(cfg.breakout.k_tp, 1.0);
        assert_eq!(cfg.ev.mode, EvMode::Mean);
        assert_eq!(cfg.strategy, StrategyKind::DayOrb);
    }

    #[test]
    fn strategy_variant_from_toml() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            [strategy]
            kind = "momentum"
            blocked_sessions = ["asia"]
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.strategy,
            StrategyKind::Momentum {
                min_trend_pips: 0.5,
                blocked_sessions: vec!["asia".into()],
            }
        );
    }

    #[test]
    fn rejects_zero_or_window() {
        let err = EngineConfig::from_toml_str("[breakout]\nor_n = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "breakout.or_n",
                ..
            }
        ));
    }

    #[test]
    fn rejects_inverted_atr_band() {
        let mut cfg = EngineConfig::default();
        cfg.gates.min_atr_pips = 20.0;
        cfg.gates.max_atr_pips = 10.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_bad_confidence() {
        let mut cfg = EngineConfig::default();
        cfg.ev.confidence = 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = EngineConfig::from_toml_str("symbol = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn hash_is_deterministic_and_param_sensitive() {
        let a = EngineConfig::default();
        let mut b = EngineConfig::default();
        assert_eq!(a.full_hash().unwrap(), b.full_hash().unwrap());
        b.breakout.k_tp = 1.2;
        assert_ne!(a.full_hash().unwrap(), b.full_hash().unwrap());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "symbol = \"GBPUSD\"\n[gates]\ncooldown_bars = 3\n").unwrap();
        let cfg = EngineConfig::load(&path).unwrap();
        assert_eq!(cfg.symbol, "GBPUSD");
        assert_eq!(cfg.gates.cooldown_bars, 3);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = EngineConfig::load("/nonexistent/engine.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
