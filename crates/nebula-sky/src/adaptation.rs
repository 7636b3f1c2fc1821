//! Eye adaptation state: per-frame world luminance accumulation and smoothing.
//!
//! Collaborators report the luminance of what they draw during a frame. The
//! brightest report wins. At the next update the resolved world luminance moves
//! toward it, instantly when a fast adaptation was requested for a brightening
//! view (pupil constriction), otherwise along an exponential blend in log space
//! (dark adaptation is slow).

use crate::tone::MIN_WORLD_LUMINANCE;

/// Accumulated luminance reports and the resolved world luminance.
#[derive(Clone, Debug, PartialEq)]
pub struct AdaptationState {
    /// Brightest luminance reported since the last resolve.
    max_lum: f32,
    /// World luminance resolved by the last update.
    old_lum: f32,
    /// Whether the report that set `max_lum` asked for fast adaptation.
    fast_pending: bool,
    /// Value `max_lum` resets to, and the default world luminance.
    floor: f32,
}

impl AdaptationState {
    /// Create a state adapted to `floor`.
    ///
    /// The floor is kept at or above [`MIN_WORLD_LUMINANCE`]; a non-finite
    /// floor falls back to that minimum.
    pub fn new(floor: f32) -> Self {
        let floor = sanitize_floor(floor).unwrap_or(MIN_WORLD_LUMINANCE);
        Self {
            max_lum: floor,
            old_lum: floor,
            fast_pending: false,
            floor,
        }
    }

    /// Record a luminance seen in the field of view this frame.
    pub fn report(&mut self, lum: f32, fast_adaptation: bool) {
        if lum.is_finite() && lum > self.max_lum {
            self.max_lum = lum;
            self.fast_pending = fast_adaptation;
        }
    }

    /// Move the world luminance toward this frame's brightest report.
    ///
    /// `time_constant_s` is the e-folding time of the slow blend. Resets the
    /// accumulator to the floor and returns the resolved world luminance.
    pub fn resolve(&mut self, delta_time: f64, time_constant_s: f32) -> f32 {
        let target = self.max_lum;
        if self.fast_pending && target > self.old_lum {
            self.old_lum = target;
        } else {
            let k = blend_factor(delta_time, time_constant_s);
            if k > 0.0 && target != self.old_lum {
                let ln_old = self.old_lum.ln();
                self.old_lum = (ln_old + (target.ln() - ln_old) * k).exp();
            }
        }
        self.max_lum = self.floor;
        self.fast_pending = false;
        self.old_lum
    }

    /// Drop pending reports and pin the world luminance to the floor.
    pub fn reset_to_floor(&mut self) {
        self.max_lum = self.floor;
        self.old_lum = self.floor;
        self.fast_pending = false;
    }

    /// Change the floor. Pending and resolved values are raised to it.
    ///
    /// Non-finite values are ignored and the floor never drops below
    /// [`MIN_WORLD_LUMINANCE`]. Returns the floor now in effect.
    pub fn set_floor(&mut self, floor: f32) -> f32 {
        let Some(floor) = sanitize_floor(floor) else {
            return self.floor;
        };
        self.floor = floor;
        self.max_lum = self.max_lum.max(floor);
        self.old_lum = self.old_lum.max(floor);
        floor
    }

    /// World luminance resolved by the last update.
    pub fn world_luminance(&self) -> f32 {
        self.old_lum
    }

    /// Brightest luminance reported since the last update.
    pub fn max_reported(&self) -> f32 {
        self.max_lum
    }

    /// Default world luminance.
    pub fn floor(&self) -> f32 {
        self.floor
    }
}

/// Floor clamped to a positive minimum, or `None` when it is not finite.
fn sanitize_floor(floor: f32) -> Option<f32> {
    floor.is_finite().then(|| floor.max(MIN_WORLD_LUMINANCE))
}

/// Fraction of the remaining log-luminance gap closed in `delta_time` seconds.
fn blend_factor(delta_time: f64, time_constant_s: f32) -> f32 {
    if time_constant_s <= 0.0 {
        return 1.0;
    }
    let dt = delta_time.max(0.0) as f32;
    1.0 - (-dt / time_constant_s).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_keeps_maximum() {
        let mut state = AdaptationState::new(0.1);
        state.report(5.0, false);
        state.report(2.0, true);
        assert_eq!(state.max_reported(), 5.0);
        state.report(9.0, false);
        assert_eq!(state.max_reported(), 9.0);
    }

    #[test]
    fn test_fast_adaptation_jumps_to_brighter_target() {
        let mut state = AdaptationState::new(0.1);
        state.report(100.0, true);
        assert_eq!(state.resolve(0.016, 1.0), 100.0);
    }

    #[test]
    fn test_slow_adaptation_moves_part_way() {
        let mut state = AdaptationState::new(0.1);
        state.report(100.0, false);
        let lum = state.resolve(0.016, 1.0);
        assert!(lum > 0.1 && lum < 100.0, "slow blend should land in between, got {lum}");
    }

    #[test]
    fn test_fast_adaptation_is_closer_than_slow() {
        let mut fast = AdaptationState::new(0.1);
        fast.report(100.0, true);
        let mut slow = AdaptationState::new(0.1);
        slow.report(100.0, false);
        let fast_lum = fast.resolve(0.016, 1.0);
        let slow_lum = slow.resolve(0.016, 1.0);
        assert!((100.0 - fast_lum).abs() < (100.0 - slow_lum).abs());
    }

    #[test]
    fn test_darkening_is_always_slow() {
        let mut state = AdaptationState::new(0.1);
        state.report(100.0, true);
        state.resolve(0.016, 1.0);
        // Nothing bright reported: the floor is the target, fast flag irrelevant.
        let lum = state.resolve(0.016, 1.0);
        assert!(lum < 100.0 && lum > 50.0, "dark adaptation should be gradual, got {lum}");
    }

    #[test]
    fn test_resolve_resets_accumulator() {
        let mut state = AdaptationState::new(0.1);
        state.report(42.0, false);
        state.resolve(0.5, 1.0);
        assert_eq!(state.max_reported(), 0.1);
    }

    #[test]
    fn test_converges_over_many_frames() {
        let mut state = AdaptationState::new(0.1);
        for _ in 0..600 {
            state.report(10.0, false);
            state.resolve(1.0 / 60.0, 1.0);
        }
        assert!((state.world_luminance() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_zero_delta_time_does_not_move() {
        let mut state = AdaptationState::new(0.1);
        state.report(10.0, false);
        assert_eq!(state.resolve(0.0, 1.0), 0.1);
    }

    #[test]
    fn test_non_positive_floor_is_clamped() {
        for floor in [0.0, -1.0] {
            let mut state = AdaptationState::new(0.1);
            assert_eq!(state.set_floor(floor), MIN_WORLD_LUMINANCE);
            for _ in 0..5 {
                state.resolve(0.5, 60.0);
            }
            for lum in [5.0, 50.0] {
                state.report(lum, false);
                state.resolve(0.5, 60.0);
            }
            let lum = state.world_luminance();
            assert!(lum.is_finite() && lum > 0.0, "floor {floor} gave world luminance {lum}");
        }
        assert_eq!(AdaptationState::new(-3.0).floor(), MIN_WORLD_LUMINANCE);
    }

    #[test]
    fn test_non_finite_floor_is_ignored() {
        let mut state = AdaptationState::new(0.1);
        assert_eq!(state.set_floor(f32::NAN), 0.1);
        assert_eq!(state.set_floor(f32::INFINITY), 0.1);
        assert_eq!(state.floor(), 0.1);
        assert_eq!(AdaptationState::new(f32::NAN).floor(), MIN_WORLD_LUMINANCE);

        state.report(f32::INFINITY, true);
        assert!(state.resolve(0.016, 1.0).is_finite());
    }

    #[test]
    fn test_no_reports_stays_at_floor() {
        let mut state = AdaptationState::new(0.25);
        for _ in 0..10 {
            assert!((state.resolve(0.016, 1.0) - 0.25).abs() < 1e-6);
        }
    }
}
