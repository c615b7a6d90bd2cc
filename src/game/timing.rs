use crate::core::space::Viewport;
use crate::game::chart::{Line, SpeedEvent};
use glam::Vec2;

// --- Chart Clock Constants and Helpers ---
/// Charts subdivide each beat into this many microbeats.
pub const MICROBEATS_PER_BEAT: f32 = 32.0;

#[inline(always)]
pub fn microbeats_per_second(bpm: f32) -> f32 {
    MICROBEATS_PER_BEAT * bpm / 60.0
}

/// Anything that occupies a closed time range in microbeats.
pub trait TimedEvent {
    fn start_time(&self) -> f32;
    fn end_time(&self) -> f32;
}

/// Index of the first event whose range contains `t`. Event lists are validated
/// at load so both ends are non-decreasing; the first event with `end >= t` is
/// the only candidate, which is also what a forward scan would pick.
#[inline(always)]
pub fn covering_index<E: TimedEvent>(events: &[E], t: f32) -> Option<usize> {
    let idx = events.partition_point(|e| e.end_time() < t);
    let e = events.get(idx)?;
    (e.start_time() <= t).then_some(idx)
}

/// Linear progress of `t` through `[start, end]`. A zero-length range is a
/// step straight to its end value.
#[inline(always)]
fn progress(start: f32, end: f32, t: f32) -> f32 {
    let span = end - start;
    if span <= 0.0 { 1.0 } else { (t - start) / span }
}

#[inline(always)]
fn lerp(a: f32, b: f32, p: f32) -> f32 {
    (b - a).mul_add(p, a)
}

/// Cumulative floor position at the start of every speed event, with the total
/// after the last event appended. Length is always `events.len() + 1`.
pub fn build_floor_prefix(events: &[SpeedEvent], tps: f32) -> Vec<f32> {
    let mut prefix = Vec::with_capacity(events.len() + 1);
    let mut cum = 0.0_f32;
    prefix.push(cum);
    for e in events {
        cum += segment_distance(e, tps, e.end_time);
        prefix.push(cum);
    }
    prefix
}

#[inline(always)]
fn segment_distance(e: &SpeedEvent, tps: f32, until: f32) -> f32 {
    (e.value / tps) * (until.min(e.end_time) - e.start_time).max(0.0)
}

/// Distance the line has scrolled by `t` microbeats: the running integral of
/// the piecewise-constant speed field, summed up to and including the first
/// event that ends at or after `t`.
pub fn floor_position_at(events: &[SpeedEvent], prefix: &[f32], tps: f32, t: f32) -> f32 {
    let idx = events.partition_point(|e| e.end_time < t);
    let before = prefix.get(idx).copied().unwrap_or(0.0);
    match events.get(idx) {
        Some(e) => before + segment_distance(e, tps, t),
        None => before,
    }
}

/// Instantaneous state of one judge line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFrame {
    /// Line center in viewport pixels.
    pub center: Vec2,
    /// Radians, already in screen convention (authored degrees negated).
    pub angle: f32,
    pub alpha: f32,
    pub floor_position: f32,
    /// Evaluation time in microbeats of this line.
    pub time: f32,
    pub tps: f32,
}

impl LineFrame {
    #[inline(always)]
    pub fn to_screen(&self, local: Vec2) -> Vec2 {
        self.center + Vec2::from_angle(self.angle).rotate(local)
    }

    #[inline(always)]
    pub fn to_local(&self, screen: Vec2) -> Vec2 {
        Vec2::from_angle(-self.angle).rotate(screen - self.center)
    }

    /// Both ends of the drawn judge line segment.
    pub fn endpoints(&self, viewport: &Viewport) -> (Vec2, Vec2) {
        let half = Vec2::new(viewport.line_length(), 0.0);
        (self.to_screen(-half), self.to_screen(half))
    }
}

/// Evaluates a line at `time_sec` seconds of song time.
pub fn evaluate(line: &Line, time_sec: f32, viewport: &Viewport) -> LineFrame {
    let t = time_sec * line.tps;

    let center = covering_index(&line.move_events, t)
        .map(|i| {
            let e = &line.move_events[i];
            let p = progress(e.start_time, e.end_time, t);
            viewport.to_screen(e.start.lerp(e.end, p))
        })
        .unwrap_or_else(|| viewport.center());

    let angle = covering_index(&line.rotate_events, t)
        .map(|i| {
            let e = &line.rotate_events[i];
            -lerp(e.start, e.end, progress(e.start_time, e.end_time, t)).to_radians()
        })
        .unwrap_or(0.0);

    let alpha = covering_index(&line.disappear_events, t)
        .map(|i| {
            let e = &line.disappear_events[i];
            lerp(e.start, e.end, progress(e.start_time, e.end_time, t))
        })
        .unwrap_or(1.0);

    LineFrame {
        center,
        angle,
        alpha,
        floor_position: line.floor_position_at(t),
        time: t,
        tps: line.tps,
    }
}
