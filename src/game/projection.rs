use crate::core::space::Viewport;
use crate::game::chart::Line;
use crate::game::note::{Note, NoteId, NoteType};
use crate::game::timing::LineFrame;
use crate::game::timing_windows::FADE_S;
use glam::Vec2;

const HOLD_BODY_ALPHA_FRESH: f32 = 0.6;
const HOLD_BODY_ALPHA_HELD: f32 = 0.3;

/// Hold body in line-local pixels. `y` is the edge farthest from the line;
/// `height` extends back toward it and carries the direction sign.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BodyRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BodyRect {
    /// Screen-space corners, in drawing order around the rectangle.
    pub fn corners(&self, frame: &LineFrame) -> [Vec2; 4] {
        let (x0, x1) = (self.x, self.x + self.width);
        let (y0, y1) = (self.y, self.y + self.height);
        [
            frame.to_screen(Vec2::new(x0, y0)),
            frame.to_screen(Vec2::new(x1, y0)),
            frame.to_screen(Vec2::new(x1, y1)),
            frame.to_screen(Vec2::new(x0, y1)),
        ]
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Projection {
    Hidden,
    Note {
        local: Vec2,
        screen: Vec2,
        opacity: f32,
    },
    Hold {
        /// Head marker in screen space, present until the hold starts.
        head: Option<Vec2>,
        body: BodyRect,
        opacity: f32,
    },
}

impl Projection {
    #[inline(always)]
    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::Hidden)
    }
}

/// Places one note relative to its line at the frame's time.
pub fn project(note: &Note, frame: &LineFrame, viewport: &Viewport) -> Projection {
    let fade = FADE_S * frame.tps;
    let t = frame.time;
    let x = note.x_position * viewport.x_scale();
    let dir = note.direction.sign();
    let y_scale = viewport.y_scale();
    let offset = note.floor_position - frame.floor_position;

    if note.note_type != NoteType::Hold {
        if t > note.time + fade {
            return Projection::Hidden;
        }
        let local = Vec2::new(x, -offset * note.speed * y_scale * dir);
        let opacity = (1.0 - (t - note.time) / fade).min(1.0);
        return Projection::Note {
            local,
            screen: frame.to_screen(local),
            opacity,
        };
    }

    let remaining = (note.time + note.hold_time - t).min(note.hold_time);
    let dy = note.speed / frame.tps * remaining;
    if dy <= 0.0 {
        return Projection::Hidden;
    }

    let (head, y_pos) = if t < note.time {
        let local = Vec2::new(x, -offset * y_scale * dir);
        (Some(frame.to_screen(local)), offset)
    } else {
        (None, 0.0)
    };
    let body = BodyRect {
        x: (note.x_position - 1.0) * viewport.x_scale(),
        y: -(dy + y_pos) * y_scale * dir,
        width: 2.0 * viewport.x_scale(),
        height: dy * y_scale * dir,
    };
    let opacity = if t <= note.time + fade {
        HOLD_BODY_ALPHA_FRESH
    } else {
        HOLD_BODY_ALPHA_HELD
    };
    Projection::Hold { head, body, opacity }
}

/// Projections for every unjudged note on a line, in draw-layer order.
pub fn project_line(
    line_idx: usize,
    line: &Line,
    frame: &LineFrame,
    viewport: &Viewport,
) -> Vec<(NoteId, Projection)> {
    let mut out: Vec<(u8, NoteId, Projection)> = line
        .notes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.is_unjudged())
        .filter_map(|(index, note)| {
            let p = project(note, frame, viewport);
            p.is_visible().then(|| {
                (note.note_type.draw_layer(), NoteId { line: line_idx, index }, p)
            })
        })
        .collect();
    out.sort_by_key(|(layer, _, _)| *layer);
    out.into_iter().map(|(_, id, p)| (id, p)).collect()
}
