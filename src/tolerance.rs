//! Mass accuracy windows around a targeted m/z.

/// A pair of parts-per-million tolerances that may differ below and above the target.
///
/// A wider tolerance on one side is useful when a compound's isotopic envelope or known
/// instrument drift skews observed values in one direction.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PpmTolerance {
    pub lower: f64,
    pub upper: f64,
}

impl PpmTolerance {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// The same tolerance on both sides of the target
    pub fn symmetric(ppm: f64) -> Self {
        Self::new(ppm, ppm)
    }

    /// Build the closed interval this tolerance spans around `center`
    pub fn window(&self, center: f64) -> ToleranceWindow {
        ToleranceWindow::new(center, self.lower, self.upper)
    }
}

/// A closed m/z interval computed from a target and a [`PpmTolerance`].
///
/// The bounds are computed once on construction:
///
/// ```text
/// lower_bound = center - center / 1e6 * lower_ppm
/// upper_bound = center + center / 1e6 * upper_ppm
/// ```
///
/// Non-positive centers are not rejected. The window simply collapses toward zero.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ToleranceWindow {
    center: f64,
    lower_ppm: f64,
    upper_ppm: f64,
    lower_bound: f64,
    upper_bound: f64,
}

impl ToleranceWindow {
    pub fn new(center: f64, lower_ppm: f64, upper_ppm: f64) -> Self {
        let lower_bound = center - center / 1e6 * lower_ppm;
        let upper_bound = center + center / 1e6 * upper_ppm;
        Self {
            center,
            lower_ppm,
            upper_ppm,
            lower_bound,
            upper_bound,
        }
    }

    #[inline]
    pub fn center(&self) -> f64 {
        self.center
    }

    #[inline]
    pub fn lower_ppm(&self) -> f64 {
        self.lower_ppm
    }

    #[inline]
    pub fn upper_ppm(&self) -> f64 {
        self.upper_ppm
    }

    #[inline]
    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    #[inline]
    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    /// Test whether `value` lies in the window. Both bounds are inclusive.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        self.lower_bound <= value && value <= self.upper_bound
    }

    /// The index of the first value in `values` inside the window
    pub fn first_match_in(&self, values: &[f64]) -> Option<usize> {
        values.iter().position(|v| self.contains(*v))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test_log::test]
    fn test_bounds() {
        let mz = 50.0;
        let ppm = 5.0;
        let window = ToleranceWindow::new(mz, ppm, ppm);
        assert_eq!(window.lower_bound(), mz - 0.00005 * ppm);
        assert_eq!(window.upper_bound(), mz + 0.00005 * ppm);
        assert_eq!(window.center(), mz);
    }

    #[test_log::test]
    fn test_contains_boundaries() {
        let mz = 50.0;
        let ppm = 5.0;
        let lower = mz - 0.00005 * ppm;
        let upper = mz + 0.00005 * ppm;
        let window = ToleranceWindow::new(mz, ppm, ppm);

        assert!(!window.contains(lower - 0.00001));
        assert!(window.contains(lower));
        assert!(window.contains(mz));
        assert!(window.contains(upper));
        assert!(!window.contains(upper + 0.00001));
    }

    #[test_log::test]
    fn test_asymmetric() {
        let window = PpmTolerance::new(10.0, 0.0).window(1000.0);
        assert!((window.lower_bound() - 999.99).abs() < 1e-9);
        assert_eq!(window.upper_bound(), 1000.0);
        assert!(window.contains(999.995));
        assert!(!window.contains(1000.001));
    }

    #[test_log::test]
    fn test_center_always_inside() {
        for mz in [0.5, 1.0, 100.0, 523.2847, 2000.0, 1e5] {
            for (lo, hi) in [(0.0, 0.0), (1.0, 20.0), (5.0, 5.0), (50.0, 3.0)] {
                let window = ToleranceWindow::new(mz, lo, hi);
                assert!(window.lower_bound() <= mz, "{mz} {lo} {hi}");
                assert!(mz <= window.upper_bound(), "{mz} {lo} {hi}");
                assert!(window.contains(mz));
            }
        }
    }

    #[test_log::test]
    fn test_degenerate_center() {
        let window = ToleranceWindow::new(0.0, 10.0, 10.0);
        assert_eq!(window.lower_bound(), 0.0);
        assert_eq!(window.upper_bound(), 0.0);
        assert!(window.contains(0.0));
        assert!(!window.contains(1e-12));
    }

    #[test_log::test]
    fn test_first_match_in() {
        let window = ToleranceWindow::new(100.0, 10.0, 10.0);
        let values = [99.0, 100.0005, 100.0001, 101.0];
        assert_eq!(window.first_match_in(&values), Some(1));
        assert_eq!(window.first_match_in(&values[2..]), Some(0));
        assert_eq!(window.first_match_in(&[1.0, 2.0]), None);
    }
}
