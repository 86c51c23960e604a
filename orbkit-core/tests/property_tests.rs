//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Opening range: frozen exactly once per session, never recomputed
//! 2. Single entry: at most one setup per session, retest or not
//! 3. Retest path: emission only ever follows a confirmed retest
//! 4. Sizing bounds: Kelly multiplier and guards respect every cap
//! 5. LCB: bounded in [0, 1], non-decreasing in wins
//! 6. Pips: price/pip conversion round-trips

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use orbkit_core::config::{BreakoutConfig, EngineConfig, EvConfig, SizingConfig};
use orbkit_core::domain::{pips_to_price, price_to_pips, Bar};
use orbkit_core::engine::RetestState;
use orbkit_core::ev::wilson_lower_bound;
use orbkit_core::sizers::KellySizer;
use orbkit_core::{BucketKey, EvEstimator, Outcome, StrategyEngine};

// ── Generators ───────────────────────────────────────────────────────

/// (mid, up, down, close fraction) around 150.00 with a 0.10 ATR.
fn arb_bar() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (149.8..150.2_f64, 0.0..0.2_f64, 0.0..0.2_f64, 0.0..=1.0_f64)
}

fn make_bars(raw: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap();
    raw.iter()
        .enumerate()
        .map(|(i, &(mid, up, down, frac))| {
            let high = mid + up;
            let low = mid - down;
            Bar {
                timestamp: t0 + Duration::minutes(5 * i as i64),
                open: mid,
                high,
                low,
                close: (low + frac * (high - low)).clamp(low, high),
                atr: 0.10,
                new_session: i == 0,
                window: Vec::new(),
            }
        })
        .collect()
}

fn engine(or_n: usize, require_retest: bool, require_close: bool) -> StrategyEngine {
    StrategyEngine::new(EngineConfig {
        breakout: BreakoutConfig {
            or_n,
            require_retest,
            require_close_breakout: require_close,
            retest_max_bars: 4,
            ..BreakoutConfig::default()
        },
        ..EngineConfig::default()
    })
    .unwrap()
}

// ── 1. Opening range frozen once ─────────────────────────────────────

proptest! {
    #[test]
    fn opening_range_is_frozen_once(
        raw in prop::collection::vec(arb_bar(), 1..60),
        or_n in 1usize..8,
    ) {
        let mut engine = engine(or_n, false, true);
        let mut frozen = None;
        for (i, bar) in make_bars(&raw).iter().enumerate() {
            engine.on_bar(bar).unwrap();
            let range = engine.state().opening_range;
            if i + 1 < or_n {
                prop_assert!(range.is_none());
            } else if let Some(first) = frozen {
                prop_assert_eq!(range, Some(first));
            } else {
                prop_assert!(range.is_some());
                frozen = range;
            }
        }
    }
}

// ── 2. Single entry per session ──────────────────────────────────────

proptest! {
    #[test]
    fn at_most_one_setup_per_session(
        raw in prop::collection::vec(arb_bar(), 1..80),
        require_retest in any::<bool>(),
        require_close in any::<bool>(),
    ) {
        let mut engine = engine(3, require_retest, require_close);
        let mut emitted = 0;
        for bar in make_bars(&raw) {
            if engine.on_bar(&bar).unwrap().is_some() {
                emitted += 1;
            }
        }
        prop_assert!(emitted <= 1);
    }
}

// ── 3. Retest path ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn retest_emission_follows_confirmation(
        raw in prop::collection::vec(arb_bar(), 1..80),
    ) {
        let mut engine = engine(3, true, false);
        let mut seen_awaiting = false;
        let mut prev = RetestState::Idle;
        for bar in make_bars(&raw) {
            let emitted = engine.on_bar(&bar).unwrap().is_some();
            if emitted {
                prop_assert!(seen_awaiting);
                let confirmed = matches!(prev, RetestState::RetestConfirmed { .. });
                prop_assert!(confirmed);
            }
            let now = engine.state().retest;
            if matches!(now, RetestState::AwaitingRetest { .. }) {
                seen_awaiting = true;
            }
            prev = now;
        }
    }
}

// ── 4. Sizing bounds ─────────────────────────────────────────────────

fn sizer(units_cap: f64, kelly_fraction: f64) -> KellySizer {
    KellySizer::new(SizingConfig {
        units_cap,
        kelly_fraction,
        ..SizingConfig::default()
    })
}

proptest! {
    #[test]
    fn kelly_multiplier_is_bounded(
        p in 0.0..=1.0_f64,
        tp in 0.0..200.0_f64,
        sl in 0.0..200.0_f64,
        cap in 0.01..10.0_f64,
        fraction in 0.0..=1.0_f64,
    ) {
        let m = sizer(cap, fraction).kelly_multiplier_oco(p, tp, sl);
        prop_assert!(m >= 0.0);
        prop_assert!(m <= cap);
    }

    #[test]
    fn guards_never_exceed_either_cap(
        qty in -1.0e6..1.0e6_f64,
        max_loss_units in 0.0..1_000.0_f64,
        cap in 0.01..10.0_f64,
    ) {
        let q = sizer(cap, 0.25).apply_guards(qty, max_loss_units);
        prop_assert!(q >= 0.0);
        prop_assert!(q <= cap);
        prop_assert!(q <= max_loss_units);
    }
}

// ── 5. LCB ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn wilson_bound_is_monotone_and_bounded(
        wins in 0.0..500.0_f64,
        extra in 0.0..50.0_f64,
        losses in 1.0..500.0_f64,
        z in 0.5..3.5_f64,
    ) {
        let lo = wilson_lower_bound(wins, wins + losses, z);
        let hi = wilson_lower_bound(wins + extra, wins + extra + losses, z);
        prop_assert!((0.0..=1.0).contains(&lo));
        prop_assert!((0.0..=1.0).contains(&hi));
        prop_assert!(hi + 1e-12 >= lo);
    }

    #[test]
    fn estimator_lcb_rises_with_each_win(
        losses in 0usize..30,
        wins in 1usize..30,
    ) {
        let mut ev = EvEstimator::new(&EvConfig::default());
        let bucket = BucketKey::from_regime("london", "tight", "mid");
        for _ in 0..losses {
            ev.update(Outcome::Loss, &bucket);
        }
        let mut last = ev.p_lcb(&bucket);
        for _ in 0..wins {
            ev.update(Outcome::Win, &bucket);
            let next = ev.p_lcb(&bucket);
            prop_assert!(next + 1e-12 >= last);
            prop_assert!(next <= 1.0);
            last = next;
        }
    }
}

// ── 6. Pip round-trip ────────────────────────────────────────────────

proptest! {
    /// Within one epsilon of relative error up to the overflow limit.
    #[test]
    fn pips_round_trip(
        mantissa in -10.0..10.0_f64,
        exponent in -300i32..=303,
        symbol in prop::sample::select(vec!["USDJPY", "EUR/JPY", "EURUSD", "GBP_USD", "xauusd"]),
    ) {
        let x = mantissa * 10f64.powi(exponent);
        prop_assume!(x == 0.0 || x.is_normal());
        let pips = price_to_pips(x, symbol);
        prop_assert!(pips.is_finite());
        let back = pips_to_price(pips, symbol);
        prop_assert!((back - x).abs() <= f64::EPSILON * x.abs(), "{} -> {}", x, back);
    }
}
