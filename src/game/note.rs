use crate::game::judgment::{JudgeGrade, JudgeState};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NoteType {
    Tap,
    Drag,
    Hold,
    Flick,
}

impl NoteType {
    /// Maps the numeric code used by the chart format.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Flick),
            2 => Some(Self::Tap),
            3 => Some(Self::Hold),
            4 => Some(Self::Drag),
            _ => None,
        }
    }

    pub const fn code(self) -> u8 {
        match self {
            Self::Flick => 1,
            Self::Tap => 2,
            Self::Hold => 3,
            Self::Drag => 4,
        }
    }

    /// Per-line draw order: hold bodies at the bottom, drags on top.
    pub const fn draw_layer(self) -> u8 {
        match self {
            Self::Hold => 0,
            Self::Tap => 1,
            Self::Flick => 2,
            Self::Drag => 3,
        }
    }
}

/// Which side of the judge line a note approaches from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    #[inline(always)]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Above => 1.0,
            Self::Below => -1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId {
    pub line: usize,
    pub index: usize,
}

#[derive(Clone, Debug)]
pub struct Note {
    /// Nominal hit time in microbeats.
    pub time: f32,
    /// Offset along the judge line in note-width units.
    pub x_position: f32,
    pub note_type: NoteType,
    pub speed: f32,
    /// Hold duration in microbeats; zero for every other type.
    pub hold_time: f32,
    /// Scroll distance the owning line has traveled when this note reaches it.
    pub floor_position: f32,
    pub direction: Direction,
    pub highlight: bool,
    judge: JudgeState,
}

impl Note {
    pub fn new(
        time: f32,
        x_position: f32,
        note_type: NoteType,
        speed: f32,
        hold_time: f32,
        floor_position: f32,
        direction: Direction,
    ) -> Self {
        Self {
            time,
            x_position,
            note_type,
            speed,
            hold_time,
            floor_position,
            direction,
            highlight: false,
            judge: JudgeState::Unjudged,
        }
    }

    #[inline(always)]
    pub fn judge_state(&self) -> JudgeState {
        self.judge
    }

    #[inline(always)]
    pub fn is_unjudged(&self) -> bool {
        self.judge == JudgeState::Unjudged
    }

    /// Moves an unjudged note to its terminal grade. Returns false and leaves
    /// the note untouched if it was already resolved.
    pub fn resolve(&mut self, grade: JudgeGrade) -> bool {
        if !self.is_unjudged() {
            return false;
        }
        self.judge = JudgeState::from(grade);
        true
    }

    /// Used only when a session restarts from the top.
    pub(crate) fn reset_judgement(&mut self) {
        self.judge = JudgeState::Unjudged;
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, Note, NoteType};
    use crate::game::judgment::{JudgeGrade, JudgeState};

    #[test]
    fn type_codes_round_trip_and_reject_unknown() {
        for code in 1..=4 {
            let kind = NoteType::from_code(code).expect("codes 1..=4 are defined");
            assert_eq!(kind.code(), code);
        }
        assert_eq!(NoteType::from_code(0), None);
        assert_eq!(NoteType::from_code(5), None);
    }

    #[test]
    fn draw_layers_put_holds_first_and_drags_last() {
        let mut kinds = [NoteType::Drag, NoteType::Flick, NoteType::Hold, NoteType::Tap];
        kinds.sort_by_key(|k| k.draw_layer());
        assert_eq!(kinds, [NoteType::Hold, NoteType::Tap, NoteType::Flick, NoteType::Drag]);
    }

    #[test]
    fn resolve_transitions_exactly_once() {
        let mut note = Note::new(0.0, 0.0, NoteType::Tap, 1.0, 0.0, 0.0, Direction::Above);
        assert!(note.is_unjudged());
        assert!(note.resolve(JudgeGrade::Good));
        assert_eq!(note.judge_state(), JudgeState::Good);
        assert!(!note.resolve(JudgeGrade::Perfect), "second resolve must be refused");
        assert_eq!(note.judge_state(), JudgeState::Good);
    }
}
