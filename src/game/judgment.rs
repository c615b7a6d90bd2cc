use crate::core::space::Viewport;
use crate::game::chart::Chart;
use crate::game::note::NoteId;
use crate::game::timing::LineFrame;
use crate::game::timing_windows::{JudgeWindows, classify_offset_s};
use glam::Vec2;
use log::debug;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum JudgeGrade {
    Perfect,
    Good,
    Bad,
    Miss,
}

/// Lifecycle of a single note: created `Unjudged`, then exactly one terminal grade.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum JudgeState {
    #[default]
    Unjudged,
    Perfect,
    Good,
    Bad,
    Miss,
}

impl From<JudgeGrade> for JudgeState {
    fn from(grade: JudgeGrade) -> Self {
        match grade {
            JudgeGrade::Perfect => Self::Perfect,
            JudgeGrade::Good => Self::Good,
            JudgeGrade::Bad => Self::Bad,
            JudgeGrade::Miss => Self::Miss,
        }
    }
}

/// A pointer press in viewport pixels at song time `time` (seconds).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TapEvent {
    pub position: Vec2,
    pub time: f32,
}

impl TapEvent {
    pub fn new(x: f32, y: f32, time: f32) -> Self {
        Self { position: Vec2::new(x, y), time }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Judgment {
    Hit { note: NoteId, grade: JudgeGrade, dt: f32 },
    /// Nothing in range. The chart is unchanged.
    Miss,
    /// Never tapped; resolved as Miss once its bad window passed.
    Expired { note: NoteId, dt: f32 },
}

impl Judgment {
    pub fn grade(&self) -> JudgeGrade {
        match self {
            Self::Hit { grade, .. } => *grade,
            Self::Miss | Self::Expired { .. } => JudgeGrade::Miss,
        }
    }
}

/// Finds the note a tap belongs to without mutating anything.
///
/// `frames[i]` must be line `i` evaluated at the tap time. Candidates are the
/// unjudged notes within the spatial tolerance of the tap along their line and
/// within the bad window in time; the one with the greatest signed `dt` wins,
/// earliest line and index on exact ties.
pub fn find_candidate(
    tap: &TapEvent,
    chart: &Chart,
    frames: &[LineFrame],
    windows: &JudgeWindows,
    viewport: &Viewport,
) -> Option<(NoteId, f32)> {
    let x_scale = viewport.x_scale();
    let mut best: Option<(NoteId, f32)> = None;

    for (line_idx, (line, frame)) in chart.lines.iter().zip(frames).enumerate() {
        let local_x = frame.to_local(tap.position).x / x_scale;
        // NaN when the viewport has no width.
        if !local_x.is_finite() {
            continue;
        }
        for (index, note) in line.notes.iter().enumerate() {
            if !note.is_unjudged() {
                continue;
            }
            if (local_x - note.x_position).abs() > windows.spatial_tolerance {
                continue;
            }
            let dt = tap.time - line.note_time_seconds(note);
            if dt.abs() > windows.bad_s {
                continue;
            }
            match best {
                Some((_, best_dt)) if dt <= best_dt => {}
                _ => best = Some((NoteId { line: line_idx, index }, dt)),
            }
        }
    }
    best
}

/// Judges a tap and resolves the chosen note. Never fails: no candidate is a Miss.
pub fn judge_tap(
    tap: &TapEvent,
    chart: &mut Chart,
    frames: &[LineFrame],
    windows: &JudgeWindows,
    viewport: &Viewport,
) -> Judgment {
    let Some((id, dt)) = find_candidate(tap, chart, frames, windows, viewport) else {
        return Judgment::Miss;
    };
    let Some(grade) = classify_offset_s(dt, windows) else {
        return Judgment::Miss;
    };
    let Some(note) = chart.note_mut(id) else {
        return Judgment::Miss;
    };
    if !note.resolve(grade) {
        return Judgment::Miss;
    }
    debug!(
        "Judged line {} note {} (type {}) as {:?} ({:+.1}ms).",
        id.line,
        id.index,
        note.note_type.code(),
        grade,
        dt * 1000.0
    );
    Judgment::Hit { note: id, grade, dt }
}
