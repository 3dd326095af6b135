//! Wall-clock timestamps for session bookkeeping.
//!
//! Timestamps returned by the engine are captured from a [`WallClock`], never
//! derived from the device clock, so they stay meaningful if the audio
//! pipeline is recreated.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn as_millis(self) -> u64 {
        self.0
    }
}

/// Whole seconds between two timestamps, `floor((end - start) / 1000)`.
/// Returns 0 if `end` precedes `start`.
pub fn session_duration_secs(start: Timestamp, end: Timestamp) -> u64 {
    end.0.saturating_sub(start.0) / 1000
}

/// Source of wall-clock timestamps.
pub trait WallClock: Send + Sync {
    fn now(&self) -> Timestamp;
}

fn system_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

/// Reads `SystemTime` on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(system_millis())
    }
}

/// Wall clock anchored once, then advanced by a monotonic instant.
///
/// Immune to system clock adjustments, and follows tokio's paused time.
#[derive(Debug, Clone, Copy)]
pub struct AnchoredClock {
    base_millis: u64,
    origin: tokio::time::Instant,
}

impl AnchoredClock {
    pub fn new() -> Self {
        Self::starting_at(Timestamp(system_millis()))
    }

    pub fn starting_at(base: Timestamp) -> Self {
        AnchoredClock {
            base_millis: base.0,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for AnchoredClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for AnchoredClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.base_millis + self.origin.elapsed().as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn duration_floors_to_whole_seconds() {
        assert_eq!(session_duration_secs(Timestamp(1_000), Timestamp(1_999)), 0);
        assert_eq!(session_duration_secs(Timestamp(1_000), Timestamp(2_000)), 1);
        assert_eq!(session_duration_secs(Timestamp(0), Timestamp(65_432)), 65);
    }

    #[test]
    fn duration_never_negative() {
        assert_eq!(session_duration_secs(Timestamp(5_000), Timestamp(1_000)), 0);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now().as_millis() > 1_577_836_800_000);
    }

    #[tokio::test(start_paused = true)]
    async fn anchored_clock_follows_paused_time() {
        let clock = AnchoredClock::starting_at(Timestamp(10_000));
        assert_eq!(clock.now(), Timestamp(10_000));
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        let now = clock.now().as_millis();
        assert!((12_500..12_502).contains(&now), "unexpected {now}");
    }

    #[test]
    fn timestamp_serializes_as_number() {
        let json = serde_json::to_string(&Timestamp(42)).expect("serialize");
        assert_eq!(json, "42");
    }
}
