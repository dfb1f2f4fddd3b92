//! Progress gating.
//!
//! Rate-limits progress records and keeps the emitted percent
//! non-decreasing. The downloading tool restarts its percentage for every
//! stream it fetches (video, then audio), so raw values can go backwards.
//! [`StreamFold`] maps those restarts onto one 0-100 range before gating.

use std::time::{Duration, Instant};

use kartoshka_core::ProgressEvent;

/// Default minimum gap between two progress records.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// A raw drop of at least this many points starts the next stream.
const RESTART_DROP: f64 = 50.0;

/// Place `event`, a percentage of part `index` out of `count`, on the
/// 0-100 scale of the whole.
#[allow(clippy::cast_precision_loss)]
pub fn span_progress(event: ProgressEvent, index: usize, count: usize) -> ProgressEvent {
    let count = count.max(1) as f64;
    let percent = (index as f64 + event.percent / 100.0) / count * 100.0;
    ProgressEvent::new(percent, event.speed, event.eta)
}

/// Folds the per-stream percentages of one transfer into one range.
///
/// Each expected stream gets an equal share. Restarts beyond the expected
/// count stay in the last share.
#[derive(Debug, Clone)]
pub struct StreamFold {
    streams: usize,
    index: usize,
    last_raw: f64,
}

impl StreamFold {
    pub fn new(streams: usize) -> Self {
        Self {
            streams: streams.max(1),
            index: 0,
            last_raw: 0.0,
        }
    }

    pub fn fold(&mut self, event: ProgressEvent) -> ProgressEvent {
        if self.last_raw - event.percent >= RESTART_DROP && self.index + 1 < self.streams {
            self.index += 1;
            tracing::debug!(stream = self.index, "Next stream started");
        }
        self.last_raw = event.percent;
        span_progress(event, self.index, self.streams)
    }
}

pub struct ProgressGate {
    last_emit: Option<Instant>,
    min_interval: Duration,
    high_water: f64,
}

impl ProgressGate {
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_emit: None,
            min_interval,
            high_water: 0.0,
        }
    }

    /// Pass an event through the gate.
    ///
    /// Returns the event to emit, clamped to the highest percent seen so far,
    /// or `None` if it arrived too soon. The first event to reach 100 always
    /// passes.
    pub fn admit(&mut self, event: ProgressEvent) -> Option<ProgressEvent> {
        let event = event.at_least(self.high_water);
        let completes = event.is_complete() && self.high_water < 100.0;
        self.high_water = event.percent;

        let now = Instant::now();
        let too_soon = self
            .last_emit
            .is_some_and(|last| now.duration_since(last) < self.min_interval);
        if too_soon && !completes {
            return None;
        }

        self.last_emit = Some(now);
        Some(event)
    }

    /// A closing 100% event if the stream never reached it.
    pub fn finish(&mut self) -> Option<ProgressEvent> {
        if self.high_water >= 100.0 {
            return None;
        }
        self.high_water = 100.0;
        self.last_emit = Some(Instant::now());
        Some(ProgressEvent::new(100.0, 0.0, 0))
    }

    pub const fn high_water(&self) -> f64 {
        self.high_water
    }
}

impl Default for ProgressGate {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(percent: f64) -> ProgressEvent {
        ProgressEvent::new(percent, 0.0, 0)
    }

    #[test]
    fn test_first_event_passes() {
        let mut gate = ProgressGate::new(Duration::from_secs(60));
        assert!(gate.admit(at(5.0)).is_some());
    }

    #[test]
    fn test_respects_interval() {
        let mut gate = ProgressGate::new(Duration::from_millis(50));
        assert!(gate.admit(at(1.0)).is_some());
        assert!(gate.admit(at(2.0)).is_none());

        std::thread::sleep(Duration::from_millis(60));
        assert!(gate.admit(at(3.0)).is_some());
    }

    #[test]
    fn test_completion_bypasses_interval() {
        let mut gate = ProgressGate::new(Duration::from_secs(60));
        gate.admit(at(50.0));
        let done = gate.admit(at(100.0)).unwrap();
        assert!(done.is_complete());
    }

    #[test]
    fn test_only_first_completion_bypasses_interval() {
        let mut gate = ProgressGate::new(Duration::from_secs(60));
        gate.admit(at(10.0));
        assert!(gate.admit(at(100.0)).is_some());
        assert!(gate.admit(at(100.0)).is_none());
        assert!(gate.admit(at(20.0)).is_none());
    }

    #[test]
    fn test_fold_splits_streams() {
        let mut fold = StreamFold::new(2);
        let folded: Vec<f64> = [0.0, 100.0, 0.0, 50.0, 100.0]
            .into_iter()
            .map(|p| fold.fold(at(p)).percent)
            .collect();
        assert_eq!(folded, vec![0.0, 50.0, 50.0, 75.0, 100.0]);
    }

    #[test]
    fn test_fold_ignores_small_wobble_and_extra_streams() {
        let mut fold = StreamFold::new(1);
        assert!((fold.fold(at(40.0)).percent - 40.0).abs() < 1e-9);
        assert!((fold.fold(at(38.0)).percent - 38.0).abs() < 1e-9);

        let mut fold = StreamFold::new(2);
        fold.fold(at(100.0));
        fold.fold(at(0.0));
        fold.fold(at(100.0));
        // A third restart stays in the second share.
        assert!((fold.fold(at(0.0)).percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_span_progress() {
        let first_half = span_progress(at(50.0), 0, 2);
        let second_start = span_progress(at(0.0), 1, 2);
        let last = span_progress(at(100.0), 1, 2);

        assert!((first_half.percent - 25.0).abs() < 1e-9);
        assert!((second_start.percent - 50.0).abs() < 1e-9);
        assert!((last.percent - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_percent_never_decreases() {
        let mut gate = ProgressGate::new(Duration::ZERO);
        let mut emitted = Vec::new();
        for p in [10.0, 60.0, 100.0, 0.0, 30.0, 100.0] {
            if let Some(e) = gate.admit(at(p)) {
                emitted.push(e.percent);
            }
        }
        assert!(emitted.windows(2).all(|w| w[0] <= w[1]), "{emitted:?}");
    }

    #[test]
    fn test_finish_only_when_incomplete() {
        let mut gate = ProgressGate::default();
        gate.admit(at(40.0));
        assert!(gate.finish().unwrap().is_complete());
        assert!(gate.finish().is_none());
    }
}
