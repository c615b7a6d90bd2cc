use std::time::{Duration, Instant};

/* ============================== Public API ============================== */

/// Source of song time. Gameplay reads this once per frame and once per tap;
/// it never drives playback itself.
pub trait Clock {
    /// Seconds since the start of the track.
    fn position_seconds(&self) -> f32;
    /// True once the track has played to its end.
    fn has_ended(&self) -> bool;
}

/// Clock advanced explicitly by the caller. Used by the headless driver and tests.
#[derive(Debug, Clone, Copy)]
pub struct ManualClock {
    position: f32,
    length: f32,
}

impl ManualClock {
    pub fn new(length_sec: f32) -> Self {
        let length = if length_sec.is_finite() && length_sec >= 0.0 {
            length_sec
        } else {
            f32::INFINITY
        };
        Self { position: 0.0, length }
    }

    pub fn unbounded() -> Self {
        Self::new(f32::INFINITY)
    }

    pub fn set(&mut self, position_sec: f32) {
        self.position = position_sec.max(0.0);
    }

    pub fn advance(&mut self, delta_sec: f32) {
        if delta_sec.is_finite() && delta_sec > 0.0 {
            self.position += delta_sec;
        }
    }

    pub fn length_seconds(&self) -> f32 {
        self.length
    }
}

impl Clock for ManualClock {
    fn position_seconds(&self) -> f32 {
        self.position.min(self.length)
    }

    fn has_ended(&self) -> bool {
        self.position >= self.length
    }
}

/// Clock anchored to a monotonic instant, for hosts that start audio and
/// the session at the same moment and have no device clock to query.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    started_at: Instant,
    rate: f32,
    length: Option<Duration>,
}

impl WallClock {
    pub fn start(rate: f32, length: Option<Duration>) -> Self {
        let rate = if rate.is_finite() && rate > 0.0 { rate } else { 1.0 };
        Self { started_at: Instant::now(), rate, length }
    }

    fn elapsed_song_seconds(&self) -> f32 {
        self.started_at.elapsed().as_secs_f32() * self.rate
    }
}

impl Clock for WallClock {
    fn position_seconds(&self) -> f32 {
        let pos = self.elapsed_song_seconds();
        match self.length {
            Some(len) => pos.min(len.as_secs_f32()),
            None => pos,
        }
    }

    fn has_ended(&self) -> bool {
        self.length
            .is_some_and(|len| self.elapsed_song_seconds() >= len.as_secs_f32())
    }
}
