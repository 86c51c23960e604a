//! Beta-Binomial win-probability estimator with per-bucket and global counts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{normal_quantile, BucketKey};
use crate::config::EvConfig;

/// Observed result of a closed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    pub fn from_win(win: bool) -> Self {
        if win {
            Outcome::Win
        } else {
            Outcome::Loss
        }
    }
}

/// Observed (possibly decayed) success/failure counts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BetaCounts {
    pub wins: f64,
    pub losses: f64,
}

impl BetaCounts {
    pub fn total(&self) -> f64 {
        self.wins + self.losses
    }

    fn observe(&mut self, outcome: Outcome, decay: f64) {
        self.wins *= decay;
        self.losses *= decay;
        match outcome {
            Outcome::Win => self.wins += 1.0,
            Outcome::Loss => self.losses += 1.0,
        }
    }
}

/// Key-addressed store of Bayesian win/loss pseudo-counts.
///
/// Reads (`p_mean`, `p_lcb`, `ev_lcb_oco`) take `&self`; only `update`
/// needs `&mut self`, so callers sharing one estimator across instruments
/// serialize writers the usual way (one owner, or a lock around it).
#[derive(Debug, Clone)]
pub struct EvEstimator {
    prior_alpha: f64,
    prior_beta: f64,
    decay: f64,
    z: f64,
    global_weight: f64,
    buckets: HashMap<BucketKey, BetaCounts>,
    global: BetaCounts,
}

impl EvEstimator {
    pub fn new(config: &EvConfig) -> Self {
        Self {
            prior_alpha: config.prior_alpha,
            prior_beta: config.prior_beta,
            decay: config.decay,
            z: normal_quantile(config.confidence),
            global_weight: config.global_weight,
            buckets: HashMap::new(),
            global: BetaCounts::default(),
        }
    }

    /// Record a closed trade in its bucket and in the global counts.
    ///
    /// Existing counts are decayed first when `decay < 1`.
    pub fn update(&mut self, outcome: Outcome, bucket: &BucketKey) {
        let decay = self.decay;
        self.buckets
            .entry(bucket.clone())
            .or_default()
            .observe(outcome, decay);
        self.global.observe(outcome, decay);
        tracing::trace!(
            bucket = bucket.as_str(),
            ?outcome,
            global_wins = self.global.wins,
            global_losses = self.global.losses,
            "ev estimator updated"
        );
    }

    /// Raw counts of one bucket (zero when never observed).
    pub fn bucket(&self, bucket: &BucketKey) -> BetaCounts {
        self.buckets.get(bucket).copied().unwrap_or_default()
    }

    pub fn global(&self) -> BetaCounts {
        self.global
    }

    /// Posterior pseudo-counts `(alpha, beta)` for a bucket: prior plus the
    /// bucket's counts plus the weighted global counts.
    pub fn combined(&self, bucket: &BucketKey) -> (f64, f64) {
        let own = self.bucket(bucket);
        let alpha = self.prior_alpha + own.wins + self.global_weight * self.global.wins;
        let beta = self.prior_beta + own.losses + self.global_weight * self.global.losses;
        (alpha, beta)
    }

    /// Plain posterior mean of the win probability.
    pub fn p_mean(&self, bucket: &BucketKey) -> f64 {
        let (alpha, beta) = self.combined(bucket);
        let n = alpha + beta;
        if n <= 0.0 {
            return 0.5;
        }
        alpha / n
    }

    /// One-sided Wilson lower confidence bound on the win probability.
    ///
    /// Returns the neutral 0.5 when there are no pseudo-counts at all.
    pub fn p_lcb(&self, bucket: &BucketKey) -> f64 {
        let (alpha, beta) = self.combined(bucket);
        wilson_lower_bound(alpha, alpha + beta, self.z)
    }

    /// Conservative expected pips per trade for an OCO bracket, net of cost.
    pub fn ev_lcb_oco(
        &self,
        bucket: &BucketKey,
        tp_pips: f64,
        sl_pips: f64,
        cost_pips: f64,
    ) -> f64 {
        let p = self.p_lcb(bucket);
        p * tp_pips - (1.0 - p) * sl_pips - cost_pips
    }
}

/// Wilson score lower bound for `successes` out of `n` at normal quantile `z`.
pub fn wilson_lower_bound(successes: f64, n: f64, z: f64) -> f64 {
    if n <= 0.0 {
        return 0.5;
    }
    let p = (successes / n).clamp(0.0, 1.0);
    let z2 = z * z;
    let centre = p + z2 / (2.0 * n);
    let spread = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt();
    ((centre - spread) / (1.0 + z2 / n)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> EvEstimator {
        EvEstimator::new(&EvConfig {
            global_weight: 0.0,
            ..EvConfig::default()
        })
    }

    #[test]
    fn update_counts_bucket_and_global() {
        let mut ev = estimator();
        let a = BucketKey::from("a");
        let b = BucketKey::from("b");
        ev.update(Outcome::Win, &a);
        ev.update(Outcome::Loss, &a);
        ev.update(Outcome::Win, &b);
        assert_eq!(ev.bucket(&a), BetaCounts { wins: 1.0, losses: 1.0 });
        assert_eq!(ev.bucket(&b), BetaCounts { wins: 1.0, losses: 0.0 });
        assert_eq!(ev.global(), BetaCounts { wins: 2.0, losses: 1.0 });
    }

    #[test]
    fn decay_shrinks_prior_counts() {
        let mut ev = EvEstimator::new(&EvConfig {
            decay: 0.5,
            ..EvConfig::default()
        });
        let key = BucketKey::from("k");
        ev.update(Outcome::Win, &key);
        ev.update(Outcome::Win, &key);
        ev.update(Outcome::Loss, &key);
        // wins: (1*0.5 + 1)*0.5 = 0.75; losses: 1
        let c = ev.bucket(&key);
        assert!((c.wins - 0.75).abs() < 1e-12);
        assert!((c.losses - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mean_with_uniform_prior() {
        let mut ev = estimator();
        let key = BucketKey::from("k");
        assert!((ev.p_mean(&key) - 0.5).abs() < 1e-12);
        for _ in 0..3 {
            ev.update(Outcome::Win, &key);
        }
        ev.update(Outcome::Loss, &key);
        // (1 + 3) / (2 + 4)
        assert!((ev.p_mean(&key) - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn lcb_below_mean_and_tightens_with_data() {
        let mut ev = estimator();
        let key = BucketKey::from("k");
        for i in 0..200 {
            ev.update(Outcome::from_win(i % 10 < 6), &key);
        }
        let lcb = ev.p_lcb(&key);
        let mean = ev.p_mean(&key);
        assert!(lcb < mean);
        assert!(mean - lcb < 0.07);
    }

    #[test]
    fn neutral_without_any_pseudo_counts() {
        let ev = EvEstimator::new(&EvConfig {
            prior_alpha: 0.0,
            prior_beta: 0.0,
            ..EvConfig::default()
        });
        let key = BucketKey::from("empty");
        assert_eq!(ev.p_lcb(&key), 0.5);
        assert_eq!(ev.p_mean(&key), 0.5);
    }

    #[test]
    fn global_counts_pool_into_unseen_bucket() {
        let mut ev = EvEstimator::new(&EvConfig {
            global_weight: 1.0,
            ..EvConfig::default()
        });
        let seen = BucketKey::from("seen");
        for _ in 0..10 {
            ev.update(Outcome::Win, &seen);
        }
        let unseen = BucketKey::from("unseen");
        assert!(ev.p_mean(&unseen) > 0.5);
    }

    #[test]
    fn ev_lcb_oco_formula() {
        let mut ev = estimator();
        let key = BucketKey::from("k");
        for i in 0..50 {
            ev.update(Outcome::from_win(i % 2 == 0), &key);
        }
        let p = ev.p_lcb(&key);
        let expected = p * 20.0 - (1.0 - p) * 10.0 - 1.5;
        assert!((ev.ev_lcb_oco(&key, 20.0, 10.0, 1.5) - expected).abs() < 1e-12);
    }

    #[test]
    fn wilson_reference_value() {
        // 2 of 3 at z = 1.6449 -> ~0.2535
        let v = wilson_lower_bound(2.0, 3.0, 1.644_853_6);
        assert!((v - 0.2535).abs() < 1e-3);
    }
}
