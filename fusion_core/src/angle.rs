//! Angle wrap-around.

use std::f64::consts::{PI, TAU};

/// Map any angle (radians) into (−π, π].
pub fn normalize_angle(angle: f64) -> f64 {
    PI - (PI - angle).rem_euclid(TAU)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn stays_in_half_open_interval() {
        assert_abs_diff_eq!(normalize_angle(PI), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(-PI), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(0.0), 0.0, epsilon = 1e-12);
        for k in -50..=50 {
            let a = normalize_angle(k as f64 * 0.37);
            assert!(a > -PI && a <= PI, "{a} out of range");
        }
    }

    #[test]
    fn unwraps_many_turns() {
        assert_abs_diff_eq!(normalize_angle(10.0 * TAU + 0.5), 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(normalize_angle(-7.0 * TAU - 0.5), -0.5, epsilon = 1e-9);
    }

    #[test]
    fn heading_difference_across_pi() {
        // +3.1 and -3.1 are 0.083 rad apart through ±π, not 6.2
        let d = normalize_angle(3.1 - (-3.1));
        assert_abs_diff_eq!(d.abs(), TAU - 6.2, epsilon = 1e-12);
    }
}
