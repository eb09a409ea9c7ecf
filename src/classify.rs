use crate::model::ConfidenceLevel;

/// Vendor-documented operating points, threshold to false-acceptance-rate
/// percentage. Off-table thresholds fall back to the fitted law below.
const OPERATING_POINTS: [(i32, f64); 5] = [
    (24, 1.0),
    (36, 0.1),
    (48, 0.01),
    (60, 0.001),
    (72, 0.0001),
];

/// Band a raw score relative to the decision threshold.
///
/// The bands partition the integers: below the threshold is `Low`, then
/// 20-point and 30-point bands for `Medium` and `High`, everything at
/// threshold + 50 and above is `VeryHigh`.
#[must_use]
pub fn classify(score: i32, threshold: i32) -> ConfidenceLevel {
    // Widened so the band edges stay exact for every i32 threshold.
    let (score, threshold) = (i64::from(score), i64::from(threshold));
    if score < threshold {
        ConfidenceLevel::Low
    } else if score < threshold + 20 {
        ConfidenceLevel::Medium
    } else if score < threshold + 50 {
        ConfidenceLevel::High
    } else {
        ConfidenceLevel::VeryHigh
    }
}

/// False-acceptance rate in percent for a decision threshold.
///
/// Documented operating points return their exact published value; anything
/// else uses the law the points sit on, `FAR% = 10^(2 - t/12)`.
#[must_use]
pub fn far_percentage(threshold: i32) -> f64 {
    for (point, far) in OPERATING_POINTS {
        if point == threshold {
            return far;
        }
    }
    let far = 10f64.powf(2.0 - f64::from(threshold) / 12.0);
    tracing::debug!(
        threshold,
        far,
        "threshold is off the documented operating points; using the fitted law"
    );
    far
}

#[cfg(test)]
mod tests {
    use super::{classify, far_percentage};
    use crate::model::{ConfidenceLevel, DEFAULT_THRESHOLD};

    // ── confidence bands ──

    #[test]
    fn bands_at_default_threshold_boundaries() {
        assert_eq!(classify(47, 48), ConfidenceLevel::Low);
        assert_eq!(classify(48, 48), ConfidenceLevel::Medium);
        assert_eq!(classify(67, 48), ConfidenceLevel::Medium);
        assert_eq!(classify(68, 48), ConfidenceLevel::High);
        assert_eq!(classify(97, 48), ConfidenceLevel::High);
        assert_eq!(classify(98, 48), ConfidenceLevel::VeryHigh);
    }

    #[test]
    fn score_75_at_default_threshold_is_high() {
        assert_eq!(classify(75, DEFAULT_THRESHOLD), ConfidenceLevel::High);
    }

    #[test]
    fn zero_and_negative_scores_are_low() {
        assert_eq!(classify(0, 48), ConfidenceLevel::Low);
        assert_eq!(classify(-100, 48), ConfidenceLevel::Low);
    }

    #[test]
    fn bands_shift_with_custom_threshold() {
        assert_eq!(classify(29, 30), ConfidenceLevel::Low);
        assert_eq!(classify(30, 30), ConfidenceLevel::Medium);
        assert_eq!(classify(49, 30), ConfidenceLevel::Medium);
        assert_eq!(classify(50, 30), ConfidenceLevel::High);
        assert_eq!(classify(79, 30), ConfidenceLevel::High);
        assert_eq!(classify(80, 30), ConfidenceLevel::VeryHigh);
    }

    #[test]
    fn confidence_never_drops_as_score_rises() {
        let mut previous = classify(-10, 48);
        for score in -9..=150 {
            let level = classify(score, 48);
            assert!(level >= previous, "dropped at score {score}");
            previous = level;
        }
    }

    #[test]
    fn bands_hold_at_integer_extremes() {
        assert_eq!(classify(i32::MAX, i32::MAX), ConfidenceLevel::Medium);
        assert_eq!(classify(i32::MAX, i32::MAX - 10), ConfidenceLevel::Medium);
        assert_eq!(classify(i32::MAX, i32::MAX - 30), ConfidenceLevel::High);
        assert_eq!(classify(i32::MAX, i32::MAX - 50), ConfidenceLevel::VeryHigh);
        assert_eq!(classify(i32::MIN, i32::MAX), ConfidenceLevel::Low);
        assert_eq!(classify(i32::MIN, i32::MIN), ConfidenceLevel::Medium);
        assert_eq!(classify(i32::MAX, i32::MIN), ConfidenceLevel::VeryHigh);
    }

    // ── false-acceptance rate ──

    #[test]
    fn documented_operating_points_are_exact() {
        assert_eq!(far_percentage(24), 1.0);
        assert_eq!(far_percentage(36), 0.1);
        assert_eq!(far_percentage(48), 0.01);
        assert_eq!(far_percentage(60), 0.001);
        assert_eq!(far_percentage(72), 0.0001);
    }

    #[test]
    fn default_threshold_maps_to_published_far() {
        assert_eq!(far_percentage(DEFAULT_THRESHOLD), 0.01);
    }

    #[test]
    fn off_table_threshold_uses_the_law() {
        // 10^(2 - 54/12) = 10^-2.5
        let far = far_percentage(54);
        let expected = 10f64.powf(-2.5);
        assert!(
            (far - expected).abs() < 1e-12,
            "far {far} vs expected {expected}"
        );
    }

    #[test]
    fn far_decreases_as_threshold_rises() {
        let mut previous = far_percentage(0);
        for threshold in 1..=100 {
            let far = far_percentage(threshold);
            assert!(far < previous, "not strictly decreasing at {threshold}");
            previous = far;
        }
    }

    #[test]
    fn law_passes_through_the_table_points() {
        for threshold in [24, 36, 48, 60, 72] {
            let law = 10f64.powf(2.0 - f64::from(threshold) / 12.0);
            let table = far_percentage(threshold);
            assert!(
                (law - table).abs() / table < 1e-9,
                "law and table disagree at {threshold}: {law} vs {table}"
            );
        }
    }

    #[test]
    fn far_stays_finite_at_extremes() {
        assert!(far_percentage(i32::MAX).is_finite());
        assert!(far_percentage(-48).is_finite());
        assert!(far_percentage(0) > 99.0 && far_percentage(0) < 101.0);
    }
}
