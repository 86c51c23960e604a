//! Per-instrument mutable strategy state.
//!
//! Owned exclusively by one [`StrategyEngine`](super::StrategyEngine).
//! Everything except the global bar counter is wiped on a new-session bar.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, CandidateSetup, Side};

/// High/low bounds of the first `or_n` bars of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpeningRange {
    pub high: f64,
    pub low: f64,
}

impl OpeningRange {
    /// The bound a breakout on `side` has to clear.
    pub fn bound(&self, side: Side) -> f64 {
        match side {
            Side::Long => self.high,
            Side::Short => self.low,
        }
    }
}

/// Breakout/retest sub-state. Only moves forward within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RetestState {
    #[default]
    Idle,
    /// Initial break seen; a retest must arrive by bar `deadline`.
    AwaitingRetest { deadline: usize, side: Side },
    /// Retest seen; waiting for the second break on `side`.
    RetestConfirmed { side: Side },
}

/// Where the opening-range window stands after observing a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeProgress {
    /// Still inside the window.
    #[default]
    Accumulating,
    /// This bar closed the window; the range was just frozen.
    Frozen,
    /// The range was frozen on an earlier bar.
    Ready,
}

/// Mutable per-instrument record, mutated at most once per bar.
#[derive(Debug, Clone, Default)]
pub struct StrategyState {
    bars_processed: usize,
    pub session_bars: usize,
    pub within_or: bool,
    acc_high: f64,
    acc_low: f64,
    pub opening_range: Option<OpeningRange>,
    progress: RangeProgress,
    pub last_signal_bar: Option<usize>,
    pub breakout_consumed: bool,
    pub retest: RetestState,
    pub signals_today: u32,
    pending: Option<CandidateSetup>,
}

impl StrategyState {
    pub fn new() -> Self {
        let mut state = Self::default();
        state.reset_session();
        state
    }

    /// Global index of the most recently observed bar.
    pub fn bar_index(&self) -> usize {
        self.bars_processed.saturating_sub(1)
    }

    pub fn bars_processed(&self) -> usize {
        self.bars_processed
    }

    /// Wipe all session-scoped fields. The global bar counter survives.
    pub fn reset_session(&mut self) {
        self.session_bars = 0;
        self.within_or = true;
        self.acc_high = f64::NEG_INFINITY;
        self.acc_low = f64::INFINITY;
        self.opening_range = None;
        self.progress = RangeProgress::Accumulating;
        self.last_signal_bar = None;
        self.breakout_consumed = false;
        self.retest = RetestState::Idle;
        self.signals_today = 0;
        self.pending = None;
    }

    /// Count the bar and advance the opening-range window.
    ///
    /// On the `or_n`-th session bar the range is frozen from the bar's
    /// trailing window when it is long enough, otherwise from the running
    /// high/low of the session so far.
    pub(crate) fn observe_bar(&mut self, bar: &Bar, or_n: usize) -> RangeProgress {
        self.bars_processed += 1;
        self.pending = None;

        self.progress = self.advance_range(bar, or_n);
        self.progress
    }

    fn advance_range(&mut self, bar: &Bar, or_n: usize) -> RangeProgress {
        if !self.within_or {
            return RangeProgress::Ready;
        }

        self.session_bars += 1;
        self.acc_high = self.acc_high.max(bar.high);
        self.acc_low = self.acc_low.min(bar.low);

        if self.session_bars < or_n {
            return RangeProgress::Accumulating;
        }

        let (high, low) = bar
            .window_range(or_n)
            .unwrap_or((self.acc_high, self.acc_low));
        self.opening_range = Some(OpeningRange { high, low });
        self.within_or = false;
        tracing::trace!(
            bar_index = self.bar_index(),
            or_high = high,
            or_low = low,
            "opening range frozen"
        );
        RangeProgress::Frozen
    }

    /// Window progress as of the most recent bar.
    pub fn range_progress(&self) -> RangeProgress {
        self.progress
    }

    /// Bars elapsed since the last emitted signal this session.
    pub fn bars_since_signal(&self) -> Option<usize> {
        self.last_signal_bar
            .map(|last| self.bar_index().saturating_sub(last))
    }

    /// Book an admitted signal.
    pub(crate) fn record_signal(&mut self) {
        self.last_signal_bar = Some(self.bar_index());
        self.breakout_consumed = true;
        self.signals_today += 1;
    }

    pub fn pending(&self) -> Option<&CandidateSetup> {
        self.pending.as_ref()
    }

    pub(crate) fn set_pending(&mut self, setup: CandidateSetup) {
        self.pending = Some(setup);
    }

    pub(crate) fn take_pending(&mut self) -> Option<CandidateSetup> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Candle;
    use chrono::{TimeZone, Utc};

    fn bar(high: f64, low: f64) -> Bar {
        let mid = (high + low) / 2.0;
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            open: mid,
            high,
            low,
            close: mid,
            atr: 0.1,
            new_session: false,
            window: Vec::new(),
        }
    }

    #[test]
    fn range_accumulates_then_freezes() {
        let mut s = StrategyState::new();
        assert_eq!(s.observe_bar(&bar(10.2, 10.0), 3), RangeProgress::Accumulating);
        assert_eq!(s.observe_bar(&bar(10.5, 10.1), 3), RangeProgress::Accumulating);
        assert!(s.opening_range.is_none());
        assert_eq!(s.observe_bar(&bar(10.3, 9.9), 3), RangeProgress::Frozen);
        assert_eq!(
            s.opening_range,
            Some(OpeningRange {
                high: 10.5,
                low: 9.9
            })
        );
        assert!(!s.within_or);
        assert_eq!(s.range_progress(), RangeProgress::Frozen);
        assert_eq!(s.observe_bar(&bar(12.0, 8.0), 3), RangeProgress::Ready);
        assert_eq!(s.range_progress(), RangeProgress::Ready);
        assert_eq!(s.opening_range.unwrap().high, 10.5);
    }

    #[test]
    fn range_prefers_trailing_window() {
        let mut s = StrategyState::new();
        let mut b = bar(10.2, 10.0);
        b.window = vec![Candle::new(10.0, 11.0, 9.5, 10.0), Candle::new(10.0, 10.2, 10.0, 10.1)];
        assert_eq!(s.observe_bar(&b, 2), RangeProgress::Accumulating);
        assert_eq!(s.observe_bar(&b, 2), RangeProgress::Frozen);
        assert_eq!(
            s.opening_range,
            Some(OpeningRange {
                high: 11.0,
                low: 9.5
            })
        );
    }

    #[test]
    fn reset_keeps_global_counter() {
        let mut s = StrategyState::new();
        for _ in 0..5 {
            s.observe_bar(&bar(1.0, 0.5), 2);
        }
        s.record_signal();
        assert_eq!(s.last_signal_bar, Some(4));
        assert_eq!(s.signals_today, 1);
        assert!(s.breakout_consumed);

        s.reset_session();
        assert_eq!(s.bar_index(), 4);
        assert_eq!(s.last_signal_bar, None);
        assert_eq!(s.signals_today, 0);
        assert!(!s.breakout_consumed);
        assert!(s.within_or);
        assert!(s.opening_range.is_none());
        assert_eq!(s.retest, RetestState::Idle);
    }

    #[test]
    fn bars_since_signal_counts_forward() {
        let mut s = StrategyState::new();
        s.observe_bar(&bar(1.0, 0.5), 1);
        s.record_signal();
        s.observe_bar(&bar(1.0, 0.5), 1);
        s.observe_bar(&bar(1.0, 0.5), 1);
        assert_eq!(s.bars_since_signal(), Some(2));
    }
}
