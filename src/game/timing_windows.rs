// Shared timing window definitions so judging, auto-miss and projection agree.

use crate::game::judgment::JudgeGrade;

// All base windows are in seconds.
pub const BASE_PERFECT_S: f32 = 0.08;
pub const BASE_GOOD_S: f32 = 0.16;
pub const BASE_BAD_S: f32 = 0.18;

// Half-width of the hit area along the line, in note-width units.
pub const BASE_SPATIAL_TOLERANCE: f32 = 1.5;

// Non-hold notes keep fading past the line for this long.
pub const FADE_S: f32 = 0.16;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JudgeWindows {
    pub perfect_s: f32,
    pub good_s: f32,
    pub bad_s: f32,
    pub spatial_tolerance: f32,
}

impl Default for JudgeWindows {
    fn default() -> Self {
        Self {
            perfect_s: BASE_PERFECT_S,
            good_s: BASE_GOOD_S,
            bad_s: BASE_BAD_S,
            spatial_tolerance: BASE_SPATIAL_TOLERANCE,
        }
    }
}

impl JudgeWindows {
    /// Clamps user-supplied values so the windows stay nested and finite.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let pick = |v: f32, fallback: f32| if v.is_finite() && v > 0.0 { v } else { fallback };
        let perfect_s = pick(self.perfect_s, d.perfect_s);
        let good_s = pick(self.good_s, d.good_s).max(perfect_s);
        let bad_s = pick(self.bad_s, d.bad_s).max(good_s);
        Self {
            perfect_s,
            good_s,
            bad_s,
            spatial_tolerance: pick(self.spatial_tolerance, d.spatial_tolerance),
        }
    }
}

/// Grades a signed timing error. `None` once it falls outside the widest window.
#[inline(always)]
pub fn classify_offset_s(offset_s: f32, windows: &JudgeWindows) -> Option<JudgeGrade> {
    let abs = offset_s.abs();
    if abs <= windows.perfect_s {
        Some(JudgeGrade::Perfect)
    } else if abs <= windows.good_s {
        Some(JudgeGrade::Good)
    } else if abs <= windows.bad_s {
        Some(JudgeGrade::Bad)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{JudgeWindows, classify_offset_s};
    use crate::game::judgment::JudgeGrade;

    #[test]
    fn grades_follow_window_edges() {
        let w = JudgeWindows::default();
        assert_eq!(classify_offset_s(0.0, &w), Some(JudgeGrade::Perfect));
        assert_eq!(classify_offset_s(-0.08, &w), Some(JudgeGrade::Perfect));
        assert_eq!(classify_offset_s(0.12, &w), Some(JudgeGrade::Good));
        assert_eq!(classify_offset_s(-0.17, &w), Some(JudgeGrade::Bad));
        assert_eq!(classify_offset_s(0.2, &w), None);
    }

    #[test]
    fn sanitized_keeps_windows_nested() {
        let w = JudgeWindows {
            perfect_s: 0.1,
            good_s: 0.05,
            bad_s: f32::NAN,
            spatial_tolerance: -1.0,
        }
        .sanitized();
        assert!((w.good_s - 0.1).abs() <= f32::EPSILON);
        assert!((w.bad_s - 0.18).abs() <= f32::EPSILON);
        assert!((w.spatial_tolerance - 1.5).abs() <= f32::EPSILON);
    }
}
