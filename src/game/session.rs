use crate::core::clock::Clock;
use crate::core::space::Viewport;
use crate::game::chart::Chart;
use crate::game::judgment::{JudgeGrade, JudgeState, Judgment, TapEvent, judge_tap};
use crate::game::note::NoteId;
use crate::game::projection::{Projection, project_line};
use crate::game::timing::{LineFrame, evaluate};
use crate::game::timing_windows::JudgeWindows;
use glam::Vec2;
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, Sender};

/// Cloneable handle for feeding taps from an input thread. Taps are applied
/// in send order on the next `GameSession::update`.
#[derive(Clone, Debug)]
pub struct TapSender(Sender<TapEvent>);

impl TapSender {
    /// Returns false once the session is gone.
    pub fn send(&self, tap: TapEvent) -> bool {
        self.0.send(tap).is_ok()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct SessionOptions {
    pub windows: JudgeWindows,
    /// Resolve notes nobody tapped as Miss once their bad window has passed.
    pub auto_miss: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineView {
    pub frame: LineFrame,
    /// Ends of the drawn judge line segment in screen space.
    pub endpoints: (Vec2, Vec2),
    /// Visible notes in draw order.
    pub notes: Vec<(NoteId, Projection)>,
}

/// Everything a renderer needs for one instant.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Frame {
    pub time: f32,
    pub lines: Vec<LineView>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Finished,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub perfect: usize,
    pub good: usize,
    pub bad: usize,
    pub miss: usize,
    pub unjudged: usize,
    /// Taps that matched no note.
    pub empty_taps: usize,
}

impl Tally {
    pub fn total_notes(&self) -> usize {
        self.perfect + self.good + self.bad + self.miss + self.unjudged
    }
}

/// Single owner of a running chart: the only place note state is written.
pub struct GameSession<C: Clock> {
    chart: Chart,
    clock: C,
    viewport: Viewport,
    options: SessionOptions,
    miss_cursors: Vec<usize>,
    tap_tx: Sender<TapEvent>,
    tap_rx: Receiver<TapEvent>,
    // Grows until the host calls `drain_judgments`.
    judgments: Vec<Judgment>,
    empty_taps: usize,
    frame: Frame,
    last_time: f32,
    log_timer: f32,
}

impl<C: Clock> GameSession<C> {
    pub fn new(chart: Chart, clock: C, viewport: Viewport, options: SessionOptions) -> Self {
        let (tap_tx, tap_rx) = mpsc::channel();
        let line_count = chart.lines.len();
        let viewport = if viewport.has_area() {
            viewport
        } else {
            warn!(
                "Viewport {}x{} has no area; using the default size.",
                viewport.width, viewport.height
            );
            Viewport::default()
        };
        info!(
            "Session ready: {} lines, {} notes, auto-miss {}.",
            line_count,
            chart.note_count(),
            if options.auto_miss { "on" } else { "off" }
        );
        Self {
            chart,
            clock,
            viewport,
            options: SessionOptions {
                windows: options.windows.sanitized(),
                ..options
            },
            miss_cursors: vec![0; line_count],
            tap_tx,
            tap_rx,
            judgments: Vec::new(),
            empty_taps: 0,
            frame: Frame::default(),
            last_time: 0.0,
            log_timer: 0.0,
        }
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn tap_sender(&self) -> TapSender {
        TapSender(self.tap_tx.clone())
    }

    /// Applies queued taps, runs auto-miss and rebuilds the frame for the
    /// clock's current position. Every result is kept until the host takes
    /// it with `drain_judgments`, so hosts must drain once per frame.
    pub fn update(&mut self) -> SessionStatus {
        let now = self.clock.position_seconds();

        while let Ok(tap) = self.tap_rx.try_recv() {
            let result = self.judge(&tap);
            self.judgments.push(result);
        }
        if self.options.auto_miss {
            self.apply_time_based_misses(now);
        }
        self.frame = self.build_frame(now);

        self.log_timer += (now - self.last_time).max(0.0);
        self.last_time = now;
        if self.log_timer >= 1.0 {
            let t = self.tally();
            info!(
                "Time: {:.2}, Perfect: {}, Good: {}, Bad: {}, Miss: {}, Remaining: {}",
                now, t.perfect, t.good, t.bad, t.miss, t.unjudged
            );
            self.log_timer = 0.0;
        }

        if self.clock.has_ended() {
            SessionStatus::Finished
        } else {
            SessionStatus::Running
        }
    }

    /// Judges a tap immediately, bypassing the queue.
    pub fn handle_tap(&mut self, tap: TapEvent) -> Judgment {
        let result = self.judge(&tap);
        self.judgments.push(result);
        result
    }

    /// Results produced since the last call, in the order they were applied.
    /// Taps come first in each update, then expired notes.
    pub fn drain_judgments(&mut self) -> Vec<Judgment> {
        std::mem::take(&mut self.judgments)
    }

    fn judge(&mut self, tap: &TapEvent) -> Judgment {
        let frames: Vec<LineFrame> = self
            .chart
            .lines
            .iter()
            .map(|line| evaluate(line, tap.time, &self.viewport))
            .collect();
        let result = judge_tap(tap, &mut self.chart, &frames, &self.options.windows, &self.viewport);
        if result == Judgment::Miss {
            self.empty_taps += 1;
        }
        result
    }

    fn apply_time_based_misses(&mut self, now: f32) {
        let cutoff = now - self.options.windows.bad_s;
        for (line_idx, line) in self.chart.lines.iter_mut().enumerate() {
            let cursor = &mut self.miss_cursors[line_idx];
            while let Some(note) = line.notes.get_mut(*cursor) {
                if note.time / line.tps >= cutoff {
                    break;
                }
                if note.resolve(JudgeGrade::Miss) {
                    debug!("MISSED (time-based): line {line_idx} note {}", *cursor);
                    self.judgments.push(Judgment::Expired {
                        note: NoteId { line: line_idx, index: *cursor },
                        dt: now - note.time / line.tps,
                    });
                }
                *cursor += 1;
            }
        }
    }

    fn build_frame(&self, now: f32) -> Frame {
        let lines = self
            .chart
            .lines
            .iter()
            .enumerate()
            .map(|(idx, line)| {
                let frame = evaluate(line, now, &self.viewport);
                LineView {
                    endpoints: frame.endpoints(&self.viewport),
                    notes: project_line(idx, line, &frame, &self.viewport),
                    frame,
                }
            })
            .collect();
        Frame { time: now, lines }
    }

    /// Rebuilds derived geometry for a new surface size. Sizes without area
    /// (a minimized window) are ignored and the previous viewport is kept.
    pub fn resize(&mut self, viewport: Viewport) {
        if !viewport.has_area() {
            debug!(
                "Ignoring resize to {}x{}; keeping {}x{}.",
                viewport.width, viewport.height, self.viewport.width, self.viewport.height
            );
            return;
        }
        debug!("Viewport resized to {}x{}.", viewport.width, viewport.height);
        self.viewport = viewport;
        self.frame = self.build_frame(self.clock.position_seconds());
    }

    /// Clears every judgement and pending tap. The caller rewinds the clock.
    pub fn restart(&mut self) {
        self.chart.reset_judgements();
        while self.tap_rx.try_recv().is_ok() {}
        self.judgments.clear();
        self.empty_taps = 0;
        self.rewind();
        info!("Session restarted.");
    }

    /// Call after moving the clock. Judged notes keep their state; auto-miss
    /// rescans from the top so nothing behind the new position is skipped.
    pub fn seek(&mut self) {
        self.rewind();
        debug!("Session seeked to {:.2}s.", self.last_time);
    }

    fn rewind(&mut self) {
        self.miss_cursors.iter_mut().for_each(|c| *c = 0);
        self.last_time = self.clock.position_seconds();
        self.log_timer = 0.0;
    }

    pub fn tally(&self) -> Tally {
        let mut t = Tally { empty_taps: self.empty_taps, ..Tally::default() };
        for note in self.chart.lines.iter().flat_map(|l| l.notes.iter()) {
            match note.judge_state() {
                JudgeState::Unjudged => t.unjudged += 1,
                JudgeState::Perfect => t.perfect += 1,
                JudgeState::Good => t.good += 1,
                JudgeState::Bad => t.bad += 1,
                JudgeState::Miss => t.miss += 1,
            }
        }
        t
    }
}
