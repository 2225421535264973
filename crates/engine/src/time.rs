//! Time units shared by the playback clock and temporal windows.
//!
//! Times are `f64` values in editor time units (one unit is one second of
//! wall clock at the default tick period). Committed values are snapped to a
//! microsecond grid so that repeated tick increments do not accumulate
//! floating point drift.

/// Subdivisions of one time unit used by [`snap_time`].
pub const TIME_GRID: f64 = 1_000_000.0;

/// Snaps `t` to the nearest microsecond of a time unit.
///
/// # Example
/// ```
/// use engine::time::snap_time;
///
/// let mut t = 0.0;
/// for _ in 0..40 {
///     t = snap_time(t + 0.1);
/// }
/// assert_eq!(t, 4.0);
/// ```
pub fn snap_time(t: f64) -> f64 {
    (t * TIME_GRID).round() / TIME_GRID
}

/// Returns true when `t` lies inside the closed interval `[start, end]`.
pub fn within_closed(t: f64, start: f64, end: f64) -> bool {
    start <= t && t <= end
}

#[cfg(test)]
mod tests {
    use super::{snap_time, within_closed};

    #[test]
    fn snap_time_removes_accumulated_increment_error() {
        let naive = (0..30).fold(0.0_f64, |t, _| t + 0.1);
        assert_ne!(naive, 3.0);

        let snapped = (0..30).fold(0.0_f64, |t, _| snap_time(t + 0.1));
        assert_eq!(snapped, 3.0);
    }

    #[test]
    fn within_closed_includes_both_boundaries() {
        assert!(within_closed(3.0, 3.0, 8.0));
        assert!(within_closed(8.0, 3.0, 8.0));
        assert!(!within_closed(8.000_001, 3.0, 8.0));
        assert!(!within_closed(2.999_999, 3.0, 8.0));
    }
}
