//! Bounded dichotomy search for visibility limits.
//!
//! Every search keeps a bracket `[last_true, first_false]` around the point
//! where a monotonic predicate flips. The bracket is valid after every step, so
//! stopping on the epsilon or on the iteration cap both return a usable side.

/// Parameters of one bisection search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dichotomy {
    /// Lower end of the search interval; the predicate is expected to hold here.
    pub lower: f32,
    /// Upper end of the search interval; the predicate is expected to fail here.
    pub upper: f32,
    /// Stop once the bracket is narrower than this.
    pub epsilon: f32,
    /// Hard cap on predicate evaluations inside the loop.
    pub max_iterations: u32,
}

/// Result of a [`Dichotomy`] search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bracket {
    /// Largest probed value where the predicate held.
    pub last_true: f32,
    /// Smallest probed value where the predicate failed.
    pub first_false: f32,
    /// Number of bisection steps taken.
    pub iterations: u32,
}

impl Bracket {
    /// Width of the bracket.
    pub fn width(&self) -> f32 {
        self.first_false - self.last_true
    }
}

/// Limiting magnitude search: range, 0.01 mag resolution.
pub const MAGNITUDE_SEARCH: Dichotomy = Dichotomy {
    lower: -26.0,
    upper: 30.0,
    epsilon: 0.01,
    max_iterations: 32,
};

/// Limiting luminance search over log10(cd/m^2).
pub const LOG_LUMINANCE_SEARCH: Dichotomy = Dichotomy {
    lower: -8.0,
    upper: 6.0,
    epsilon: 0.001,
    max_iterations: 48,
};

/// World adaptation luminance search over log10(cd/m^2).
pub const LOG_WORLD_LUMINANCE_SEARCH: Dichotomy = Dichotomy {
    lower: -4.0,
    upper: 8.0,
    epsilon: 1e-4,
    max_iterations: 48,
};

/// Input scale calibration search over ln(scale).
pub const LN_INPUT_SCALE_SEARCH: Dichotomy = Dichotomy {
    lower: -30.0,
    upper: 30.0,
    epsilon: 1e-5,
    max_iterations: 64,
};

impl Dichotomy {
    /// Locate where `predicate` flips from true to false.
    ///
    /// When the predicate already fails at `lower` the bracket collapses onto
    /// `lower`; when it still holds at `upper` it collapses onto `upper`.
    pub fn search(&self, mut predicate: impl FnMut(f32) -> bool) -> Bracket {
        if !predicate(self.lower) {
            return Bracket {
                last_true: self.lower,
                first_false: self.lower,
                iterations: 0,
            };
        }
        if predicate(self.upper) {
            return Bracket {
                last_true: self.upper,
                first_false: self.upper,
                iterations: 0,
            };
        }

        let mut a = self.lower;
        let mut b = self.upper;
        let mut iterations = 0;
        while b - a > self.epsilon && iterations < self.max_iterations {
            let mid = 0.5 * (a + b);
            if mid <= a || mid >= b {
                break;
            }
            if predicate(mid) {
                a = mid;
            } else {
                b = mid;
            }
            iterations += 1;
        }

        Bracket {
            last_true: a,
            first_false: b,
            iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_threshold_within_epsilon() {
        let bracket = MAGNITUDE_SEARCH.search(|m| m <= 6.37);
        assert!(bracket.last_true <= 6.37);
        assert!(bracket.first_false > 6.37);
        assert!(bracket.width() <= MAGNITUDE_SEARCH.epsilon);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let search = Dichotomy {
            lower: 0.0,
            upper: 8.0,
            epsilon: 0.0,
            max_iterations: 10,
        };
        // 4.0 is the first midpoint and sits exactly on the threshold.
        let bracket = search.search(|x| x <= 4.0);
        assert!(bracket.last_true >= 4.0);
    }

    #[test]
    fn test_iteration_cap_keeps_bracket() {
        let search = Dichotomy {
            lower: 0.0,
            upper: 100.0,
            epsilon: 1e-9,
            max_iterations: 3,
        };
        let bracket = search.search(|x| x < 33.3);
        assert_eq!(bracket.iterations, 3);
        assert!(bracket.last_true < 33.3 && bracket.first_false >= 33.3);
        assert!(bracket.width() > 1.0, "three steps cannot narrow 100 below 1");
    }

    #[test]
    fn test_collapses_when_nothing_holds() {
        let bracket = MAGNITUDE_SEARCH.search(|_| false);
        assert_eq!(bracket.last_true, MAGNITUDE_SEARCH.lower);
        assert_eq!(bracket.first_false, MAGNITUDE_SEARCH.lower);
    }

    #[test]
    fn test_collapses_when_everything_holds() {
        let bracket = LOG_LUMINANCE_SEARCH.search(|_| true);
        assert_eq!(bracket.last_true, LOG_LUMINANCE_SEARCH.upper);
        assert_eq!(bracket.iterations, 0);
    }

    #[test]
    fn test_terminates_with_zero_epsilon() {
        let search = Dichotomy {
            epsilon: 0.0,
            max_iterations: u32::MAX,
            ..LN_INPUT_SCALE_SEARCH
        };
        let bracket = search.search(|x| x < 1.234);
        assert!(bracket.iterations < 200);
    }
}
