//! Property tests for confidence normalization.

use proptest::prelude::*;

use tabmap_model::mapping::normalize_confidence;

proptest! {
    #[test]
    fn normalized_confidence_stays_in_unit_range(raw in -1000.0f64..10_000.0) {
        let normalized = normalize_confidence(raw);
        prop_assert!((0.0..=1.0).contains(&normalized), "{raw} normalized to {normalized}");
    }

    #[test]
    fn unit_scale_values_pass_through(raw in 0.0f64..=1.0) {
        prop_assert!((normalize_confidence(raw) - raw).abs() < 1e-12);
    }

    #[test]
    fn percent_scale_values_divide_by_100(raw in 1.0f64..=100.0) {
        prop_assume!(raw > 1.0);
        prop_assert!((normalize_confidence(raw) - raw / 100.0).abs() < 1e-12);
    }

    #[test]
    fn overshooting_percentages_clamp_to_one(raw in 100.0f64..1.0e6) {
        prop_assume!(raw > 100.0);
        prop_assert!((normalize_confidence(raw) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn negative_values_clamp_to_zero(raw in -1.0e6f64..0.0) {
        prop_assert_eq!(normalize_confidence(raw), 0.0);
    }
}
