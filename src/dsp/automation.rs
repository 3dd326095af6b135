//! Gain automation timeline.
//!
//! Values are scheduled at absolute times on the device clock, so ramps
//! issued in quick succession compose on one timeline instead of racing
//! each other. Semantics follow the usual audio-param model: a linear ramp
//! runs from the previous event's (time, value) to its own.

/// How long past events are kept around for rendering behind the clock.
const HISTORY_SECS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Segment {
    /// Jump to `value` at `time`.
    Set,
    /// Arrive at `value` at `time`, linearly from the previous event.
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AutomationEvent {
    time: f64,
    value: f64,
    segment: Segment,
}

/// A scalar parameter automated against an absolute clock.
#[derive(Debug, Clone)]
pub struct GainAutomation {
    /// Value in effect before the first event.
    initial: f64,
    /// Sorted by time; equal times keep insertion order.
    events: Vec<AutomationEvent>,
}

impl GainAutomation {
    pub fn new(initial: f64) -> Self {
        GainAutomation {
            initial,
            events: Vec::new(),
        }
    }

    /// Value of the parameter at time `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        let idx = self.events.partition_point(|e| e.time <= t);
        let (prev_time, prev_value) = match idx.checked_sub(1) {
            Some(i) => (self.events[i].time, self.events[i].value),
            None => (0.0, self.initial),
        };

        match self.events.get(idx) {
            Some(next) if next.segment == Segment::Linear => {
                let start = prev_time.min(next.time);
                let span = next.time - start;
                if span <= 0.0 {
                    return next.value;
                }
                let frac = ((t - start) / span).clamp(0.0, 1.0);
                prev_value + (next.value - prev_value) * frac
            }
            _ => prev_value,
        }
    }

    /// Schedule a jump to `value` at `time`.
    pub fn set_value_at(&mut self, value: f64, time: f64) {
        self.insert(AutomationEvent {
            time,
            value,
            segment: Segment::Set,
        });
    }

    /// Schedule a linear ramp ending at `value` at `end_time`.
    pub fn linear_ramp_to(&mut self, value: f64, end_time: f64) {
        self.insert(AutomationEvent {
            time: end_time,
            value,
            segment: Segment::Linear,
        });
    }

    /// Drop every event scheduled at or after `time`.
    pub fn cancel_from(&mut self, time: f64) {
        self.events.retain(|e| e.time < time);
    }

    /// Cancel everything from `time` on and pin the value that was in
    /// effect there. Returns the pinned value.
    pub fn hold_at(&mut self, time: f64) -> f64 {
        let value = self.value_at(time);
        self.cancel_from(time);
        self.set_value_at(value, time);
        self.prune_before(time - HISTORY_SECS);
        value
    }

    /// Replace the timeline from `time` on with a constant `value`.
    pub fn set_now(&mut self, value: f64, time: f64) {
        self.cancel_from(time);
        self.set_value_at(value, time);
        self.prune_before(time - HISTORY_SECS);
    }

    /// Number of scheduled events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn insert(&mut self, event: AutomationEvent) {
        let idx = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(idx, event);
    }

    /// Forget events before `cutoff`, re-anchoring the timeline there so
    /// values at and after `cutoff` are unchanged.
    fn prune_before(&mut self, cutoff: f64) {
        let idx = self.events.partition_point(|e| e.time < cutoff);
        if idx == 0 {
            return;
        }
        let anchor = self.value_at(cutoff);
        self.events.drain(..idx);
        self.initial = anchor;
        self.events.insert(
            0,
            AutomationEvent {
                time: cutoff,
                value: anchor,
                segment: Segment::Set,
            },
        );
    }
}
