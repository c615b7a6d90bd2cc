use crate::game::note::{Direction, Note, NoteId, NoteType};
use crate::game::parsing::chart_json::{RawChart, RawEvent, RawLine, RawNote, RawSpeedEvent};
use crate::game::timing::{self, TimedEvent};
use glam::Vec2;
use log::{info, warn};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("line {line}: bpm missing or not a positive number ({bpm:?})")]
    InvalidBpm { line: usize, bpm: Option<f32> },

    #[error("line {line}: unknown note type code {code}")]
    UnknownNoteType { line: usize, code: u8 },

    #[error("line {line}: hold note at time {time} has no holdTime")]
    MissingHoldTime { line: usize, time: f32 },

    #[error("line {line}: {list}[{index}] has a decreasing or inverted time range")]
    NonMonotonicEvents {
        line: usize,
        list: &'static str,
        index: usize,
    },

    #[error("line {line}: non-finite value in {what}")]
    NonFinite { line: usize, what: &'static str },
}

/// Interpolated scalar over `[start_time, end_time]` (rotation degrees or opacity).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarEvent {
    pub start_time: f32,
    pub end_time: f32,
    pub start: f32,
    pub end: f32,
}

/// Interpolated line center in chart-normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveEvent {
    pub start_time: f32,
    pub end_time: f32,
    pub start: Vec2,
    pub end: Vec2,
}

/// Constant scroll velocity over `[start_time, end_time]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedEvent {
    pub start_time: f32,
    pub end_time: f32,
    pub value: f32,
}

impl TimedEvent for ScalarEvent {
    fn start_time(&self) -> f32 { self.start_time }
    fn end_time(&self) -> f32 { self.end_time }
}

impl TimedEvent for MoveEvent {
    fn start_time(&self) -> f32 { self.start_time }
    fn end_time(&self) -> f32 { self.end_time }
}

impl TimedEvent for SpeedEvent {
    fn start_time(&self) -> f32 { self.start_time }
    fn end_time(&self) -> f32 { self.end_time }
}

#[derive(Debug, Clone)]
pub struct Line {
    pub bpm: f32,
    /// Microbeats per second.
    pub tps: f32,
    pub move_events: Vec<MoveEvent>,
    pub rotate_events: Vec<ScalarEvent>,
    pub disappear_events: Vec<ScalarEvent>,
    pub speed_events: Vec<SpeedEvent>,
    /// Cumulative floor position at the start of each speed event, plus the total.
    pub(crate) floor_prefix: Vec<f32>,
    pub notes: Vec<Note>,
}

impl Line {
    /// Floor position at `t` microbeats.
    #[inline(always)]
    pub fn floor_position_at(&self, t: f32) -> f32 {
        timing::floor_position_at(&self.speed_events, &self.floor_prefix, self.tps, t)
    }

    #[inline(always)]
    pub fn note_time_seconds(&self, note: &Note) -> f32 {
        note.time / self.tps
    }
}

#[derive(Debug, Clone, Default)]
pub struct Chart {
    pub lines: Vec<Line>,
}

impl Chart {
    pub fn note_count(&self) -> usize {
        self.lines.iter().map(|l| l.notes.len()).sum()
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.lines.get(id.line).and_then(|l| l.notes.get(id.index))
    }

    pub fn note_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.lines.get_mut(id.line).and_then(|l| l.notes.get_mut(id.index))
    }

    /// Latest nominal time (seconds) of any note, counting hold tails.
    pub fn last_note_seconds(&self) -> f32 {
        self.lines
            .iter()
            .flat_map(|line| {
                line.notes
                    .iter()
                    .map(move |n| (n.time + n.hold_time) / line.tps)
            })
            .fold(0.0_f32, f32::max)
    }

    pub(crate) fn reset_judgements(&mut self) {
        for note in self.lines.iter_mut().flat_map(|l| l.notes.iter_mut()) {
            note.reset_judgement();
        }
    }
}

/// Builds the runtime chart from a decoded document. Pure: the raw document is
/// left untouched and a partially built chart is never observable.
pub fn normalize(raw: &RawChart) -> Result<Chart, ChartError> {
    let lines = raw
        .judge_line_list
        .iter()
        .enumerate()
        .map(|(idx, raw_line)| normalize_line(idx, raw_line))
        .collect::<Result<Vec<_>, _>>()?;
    let chart = Chart { lines };
    info!(
        "Chart normalized: {} lines, {} notes.",
        chart.lines.len(),
        chart.note_count()
    );
    Ok(chart)
}

fn normalize_line(idx: usize, raw: &RawLine) -> Result<Line, ChartError> {
    let bpm = match raw.bpm {
        Some(bpm) if bpm.is_finite() && bpm > 0.0 => bpm,
        other => return Err(ChartError::InvalidBpm { line: idx, bpm: other }),
    };
    let tps = timing::microbeats_per_second(bpm);

    let move_events = convert_events(idx, "judgeLineMoveEvents", &raw.judge_line_move_events, |e| {
        MoveEvent {
            start_time: e.start_time,
            end_time: e.end_time,
            start: Vec2::new(e.start, e.start2),
            end: Vec2::new(e.end, e.end2),
        }
    })?;
    let rotate_events =
        convert_events(idx, "judgeLineRotateEvents", &raw.judge_line_rotate_events, scalar_event)?;
    let disappear_events = convert_events(
        idx,
        "judgeLineDisappearEvents",
        &raw.judge_line_disappear_events,
        scalar_event,
    )?;
    let speed_events = convert_speed_events(idx, &raw.speed_events)?;
    let floor_prefix = timing::build_floor_prefix(&speed_events, tps);

    let mut line = Line {
        bpm,
        tps,
        move_events,
        rotate_events,
        disappear_events,
        speed_events,
        floor_prefix,
        notes: Vec::new(),
    };
    line.notes = build_notes(idx, &line, &raw.notes_above, &raw.notes_below)?;
    Ok(line)
}

fn scalar_event(e: &RawEvent) -> ScalarEvent {
    ScalarEvent {
        start_time: e.start_time,
        end_time: e.end_time,
        start: e.start,
        end: e.end,
    }
}

fn convert_events<T, F>(
    line: usize,
    list: &'static str,
    raw: &[RawEvent],
    make: F,
) -> Result<Vec<T>, ChartError>
where
    F: Fn(&RawEvent) -> T,
    T: TimedEvent,
{
    let finite = raw.iter().all(|e| {
        [e.start_time, e.end_time, e.start, e.end, e.start2, e.end2]
            .iter()
            .all(|v| v.is_finite())
    });
    if !finite {
        return Err(ChartError::NonFinite { line, what: list });
    }
    let events: Vec<T> = raw.iter().map(make).collect();
    check_monotonic(line, list, &events)?;
    Ok(events)
}

fn convert_speed_events(line: usize, raw: &[RawSpeedEvent]) -> Result<Vec<SpeedEvent>, ChartError> {
    const LIST: &str = "speedEvents";
    if !raw
        .iter()
        .all(|e| e.start_time.is_finite() && e.end_time.is_finite() && e.value.is_finite())
    {
        return Err(ChartError::NonFinite { line, what: LIST });
    }
    let events: Vec<SpeedEvent> = raw
        .iter()
        .map(|e| SpeedEvent {
            start_time: e.start_time,
            end_time: e.end_time,
            value: e.value,
        })
        .collect();
    check_monotonic(line, LIST, &events)?;

    // Floor position integrates from zero; anything else only logs and counts as standing still.
    if let Some(first) = events.first()
        && first.start_time > 0.0
    {
        warn!(
            "line {line}: first speed event starts at {} instead of 0; treating the lead-in as zero velocity.",
            first.start_time
        );
    }
    let gaps = events
        .windows(2)
        .filter(|pair| pair[1].start_time > pair[0].end_time)
        .count();
    if gaps > 0 {
        warn!("line {line}: {gaps} gap(s) between speed events; gaps integrate as zero velocity.");
    }
    Ok(events)
}

fn check_monotonic<T: TimedEvent>(
    line: usize,
    list: &'static str,
    events: &[T],
) -> Result<(), ChartError> {
    let mut prev: Option<&T> = None;
    for (index, e) in events.iter().enumerate() {
        let inverted = e.end_time() < e.start_time();
        let decreasing = prev.is_some_and(|p| {
            e.start_time() < p.start_time() || e.end_time() < p.end_time()
        });
        if inverted || decreasing {
            return Err(ChartError::NonMonotonicEvents { line, list, index });
        }
        prev = Some(e);
    }
    Ok(())
}

#[inline(always)]
fn is_sorted_by_time(notes: &[RawNote]) -> bool {
    notes.windows(2).all(|w| w[0].time <= w[1].time)
}

/// Stable merge of the two source groups; on equal times "above" comes first.
pub fn merge_by_time<'a>(
    above: &'a [RawNote],
    below: &'a [RawNote],
) -> Vec<(&'a RawNote, Direction)> {
    let mut merged = Vec::with_capacity(above.len() + below.len());
    let (mut i, mut j) = (0, 0);
    while i < above.len() || j < below.len() {
        let take_above = j >= below.len() || (i < above.len() && above[i].time <= below[j].time);
        if take_above {
            merged.push((&above[i], Direction::Above));
            i += 1;
        } else {
            merged.push((&below[j], Direction::Below));
            j += 1;
        }
    }
    merged
}

fn build_notes(
    idx: usize,
    line: &Line,
    above: &[RawNote],
    below: &[RawNote],
) -> Result<Vec<Note>, ChartError> {
    let mut merged = merge_by_time(above, below);
    if !is_sorted_by_time(above) || !is_sorted_by_time(below) {
        warn!("line {idx}: source notes are not sorted by time; re-sorting merged notes.");
        merged.sort_by(|a, b| a.0.time.total_cmp(&b.0.time));
    }

    let mut notes: Vec<Note> = Vec::with_capacity(merged.len());
    for (raw, direction) in merged {
        let note_type = NoteType::from_code(raw.kind)
            .ok_or(ChartError::UnknownNoteType { line: idx, code: raw.kind })?;
        let values_finite = raw.time.is_finite()
            && raw.position_x.is_finite()
            && raw.speed.is_finite()
            && raw.hold_time.is_none_or(f32::is_finite)
            && raw.floor_position.is_none_or(f32::is_finite);
        if !values_finite {
            return Err(ChartError::NonFinite { line: idx, what: "notes" });
        }
        let hold_time = match (note_type, raw.hold_time) {
            (NoteType::Hold, Some(h)) => h,
            (NoteType::Hold, None) => {
                return Err(ChartError::MissingHoldTime { line: idx, time: raw.time });
            }
            _ => 0.0,
        };
        let floor_position = raw
            .floor_position
            .unwrap_or_else(|| line.floor_position_at(raw.time));

        let mut note = Note::new(
            raw.time,
            raw.position_x,
            note_type,
            raw.speed,
            hold_time,
            floor_position,
            direction,
        );
        if let Some(prev) = notes.last_mut()
            && prev.time == note.time
        {
            prev.highlight = true;
            note.highlight = true;
        }
        notes.push(note);
    }
    Ok(notes)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{ChartError, merge_by_time, normalize};
    use crate::game::judgment::JudgeState;
    use crate::game::note::{Direction, NoteType};
    use crate::game::parsing::chart_json::{RawChart, RawEvent, RawLine, RawNote, RawSpeedEvent};
    use proptest::prelude::*;

    pub(crate) fn raw_note(kind: u8, time: f32, x: f32) -> RawNote {
        RawNote {
            kind,
            time,
            position_x: x,
            speed: 1.0,
            hold_time: if kind == 3 { Some(32.0) } else { None },
            floor_position: None,
        }
    }

    pub(crate) fn raw_line(bpm: f32, above: Vec<RawNote>, below: Vec<RawNote>) -> RawLine {
        RawLine {
            bpm: Some(bpm),
            notes_above: above,
            notes_below: below,
            speed_events: vec![RawSpeedEvent { start_time: 0.0, end_time: 100_000.0, value: 1.0 }],
            ..RawLine::default()
        }
    }

    fn chart_of(lines: Vec<RawLine>) -> RawChart {
        RawChart { format_version: Some(3), judge_line_list: lines }
    }

    #[test]
    fn merge_prefers_above_on_equal_time() {
        let above = vec![raw_note(2, 10.0, 0.0), raw_note(2, 20.0, 1.0)];
        let below = vec![raw_note(4, 10.0, 2.0), raw_note(4, 15.0, 3.0)];
        let merged = merge_by_time(&above, &below);
        let order: Vec<(f32, Direction)> = merged.iter().map(|(n, d)| (n.time, *d)).collect();
        assert_eq!(
            order,
            vec![
                (10.0, Direction::Above),
                (10.0, Direction::Below),
                (15.0, Direction::Below),
                (20.0, Direction::Above),
            ]
        );
    }

    #[test]
    fn normalize_tags_highlight_pairs_and_unjudged_state() {
        let raw = chart_of(vec![raw_line(
            120.0,
            vec![raw_note(2, 10.0, 0.0), raw_note(1, 30.0, 0.0)],
            vec![raw_note(4, 10.0, 1.0), raw_note(3, 50.0, 0.0)],
        )]);
        let chart = normalize(&raw).expect("valid chart");
        let notes = &chart.lines[0].notes;
        let highlights: Vec<bool> = notes.iter().map(|n| n.highlight).collect();
        assert_eq!(highlights, vec![true, true, false, false]);
        assert!(notes.iter().all(|n| n.judge_state() == JudgeState::Unjudged));
        assert_eq!(notes[3].note_type, NoteType::Hold);
        assert!((notes[3].hold_time - 32.0).abs() <= f32::EPSILON);
        assert_eq!(notes[1].direction, Direction::Below);
    }

    #[test]
    fn missing_floor_position_is_integrated_from_speed_events() {
        let mut line = raw_line(120.0, vec![raw_note(2, 480.0, 0.0)], vec![]);
        line.speed_events = vec![RawSpeedEvent { start_time: 0.0, end_time: 1000.0, value: 10.0 }];
        let chart = normalize(&chart_of(vec![line])).expect("valid chart");
        // 10 units/s over 480 microbeats at 64 microbeats/s.
        let fp = chart.lines[0].notes[0].floor_position;
        assert!((fp - 75.0).abs() <= 1e-3, "expected 75, got {fp}");
    }

    #[test]
    fn document_floor_position_wins() {
        let mut note = raw_note(2, 480.0, 0.0);
        note.floor_position = Some(3.5);
        let chart = normalize(&chart_of(vec![raw_line(120.0, vec![note], vec![])]))
            .expect("valid chart");
        assert!((chart.lines[0].notes[0].floor_position - 3.5).abs() <= f32::EPSILON);
    }

    #[test]
    fn rejects_bad_bpm_type_and_hold() {
        let mut no_bpm = raw_line(120.0, vec![], vec![]);
        no_bpm.bpm = None;
        assert_eq!(
            normalize(&chart_of(vec![raw_line(100.0, vec![], vec![]), no_bpm])).unwrap_err(),
            ChartError::InvalidBpm { line: 1, bpm: None }
        );

        let zero = raw_line(0.0, vec![], vec![]);
        assert!(matches!(
            normalize(&chart_of(vec![zero])),
            Err(ChartError::InvalidBpm { line: 0, .. })
        ));

        let bad_type = raw_line(120.0, vec![raw_note(9, 0.0, 0.0)], vec![]);
        assert_eq!(
            normalize(&chart_of(vec![bad_type])).unwrap_err(),
            ChartError::UnknownNoteType { line: 0, code: 9 }
        );

        let mut hold = raw_note(3, 64.0, 0.0);
        hold.hold_time = None;
        assert!(matches!(
            normalize(&chart_of(vec![raw_line(120.0, vec![], vec![hold])])),
            Err(ChartError::MissingHoldTime { line: 0, .. })
        ));
    }

    #[test]
    fn rejects_inverted_and_decreasing_event_ranges() {
        let mut inverted = raw_line(120.0, vec![], vec![]);
        inverted.judge_line_rotate_events =
            vec![RawEvent { start_time: 10.0, end_time: 5.0, ..RawEvent::default() }];
        assert_eq!(
            normalize(&chart_of(vec![inverted])).unwrap_err(),
            ChartError::NonMonotonicEvents { line: 0, list: "judgeLineRotateEvents", index: 0 }
        );

        let mut decreasing = raw_line(120.0, vec![], vec![]);
        decreasing.judge_line_move_events = vec![
            RawEvent { start_time: 10.0, end_time: 20.0, ..RawEvent::default() },
            RawEvent { start_time: 0.0, end_time: 10.0, ..RawEvent::default() },
        ];
        assert_eq!(
            normalize(&chart_of(vec![decreasing])).unwrap_err(),
            ChartError::NonMonotonicEvents { line: 0, list: "judgeLineMoveEvents", index: 1 }
        );
    }

    #[test]
    fn rejects_non_finite_values() {
        let mut line = raw_line(120.0, vec![], vec![]);
        line.judge_line_disappear_events =
            vec![RawEvent { start_time: 0.0, end_time: 1.0, start: f32::NAN, ..RawEvent::default() }];
        assert_eq!(
            normalize(&chart_of(vec![line])).unwrap_err(),
            ChartError::NonFinite { line: 0, what: "judgeLineDisappearEvents" }
        );
    }

    #[test]
    fn unsorted_sources_still_produce_sorted_notes() {
        let raw = chart_of(vec![raw_line(
            120.0,
            vec![raw_note(2, 30.0, 0.0), raw_note(2, 10.0, 1.0)],
            vec![raw_note(2, 20.0, 2.0)],
        )]);
        let chart = normalize(&raw).expect("lenient about unsorted sources");
        let times: Vec<f32> = chart.lines[0].notes.iter().map(|n| n.time).collect();
        assert_eq!(times, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn last_note_seconds_counts_hold_tails() {
        let raw = chart_of(vec![raw_line(120.0, vec![raw_note(3, 64.0, 0.0)], vec![])]);
        let chart = normalize(&raw).expect("valid chart");
        // (64 + 32) microbeats at 64 per second.
        assert!((chart.last_note_seconds() - 1.5).abs() <= 1e-6);
    }

    fn sorted_times(max_len: usize) -> impl Strategy<Value = Vec<u16>> {
        proptest::collection::vec(0u16..200, 0..max_len).prop_map(|mut v| {
            v.sort_unstable();
            v
        })
    }

    proptest! {
        #[test]
        fn merged_notes_are_ascending_and_stable(above in sorted_times(24), below in sorted_times(24)) {
            // Encode source order in x so stability can be checked after normalization.
            let above: Vec<_> = above.iter().enumerate()
                .map(|(i, t)| raw_note(2, f32::from(*t), i as f32)).collect();
            let below: Vec<_> = below.iter().enumerate()
                .map(|(i, t)| raw_note(4, f32::from(*t), i as f32)).collect();
            let chart = normalize(&chart_of(vec![raw_line(120.0, above.clone(), below.clone())]))
                .expect("valid chart");
            let notes = &chart.lines[0].notes;
            prop_assert_eq!(notes.len(), above.len() + below.len());
            for pair in notes.windows(2) {
                prop_assert!(pair[0].time <= pair[1].time);
                if pair[0].time == pair[1].time {
                    if pair[0].direction == pair[1].direction {
                        prop_assert!(pair[0].x_position < pair[1].x_position);
                    } else {
                        prop_assert_eq!(pair[0].direction, Direction::Above);
                    }
                }
            }
        }
    }
}
