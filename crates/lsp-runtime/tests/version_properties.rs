use lsp_runtime::RuntimeRequirement;
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_x_range_matches_only_its_major(major in 0u64..40, minor in 0u64..50, patch in 0u64..50, other in 0u64..40) {
        let requirement = RuntimeRequirement::parse(&format!("{major}.x")).unwrap();
        let inside = format!("{major}.{minor}.{patch}");
        let outside = format!("{other}.{minor}.{patch}");
        prop_assert!(requirement.satisfies(&inside));
        prop_assert_eq!(requirement.satisfies(&outside), other == major);
    }

    #[test]
    fn test_hyphen_range_is_inclusive_on_majors(low in 0u64..30, span in 0u64..10, major in 0u64..45, minor in 0u64..30) {
        let high = low + span;
        let requirement = RuntimeRequirement::parse(&format!("{low} - {high}")).unwrap();
        let candidate = format!("{major}.{minor}.0");
        prop_assert_eq!(requirement.satisfies(&candidate), (low..=high).contains(&major));
    }

    #[test]
    fn test_at_least_agrees_with_parsed_range(min in (0u64..30, 0u64..30, 0u64..30), v in (0u64..30, 0u64..30, 0u64..30)) {
        let built = RuntimeRequirement::at_least(min);
        let parsed = RuntimeRequirement::parse(&format!(">={}.{}.{}", min.0, min.1, min.2)).unwrap();
        let candidate = format!("{}.{}.{}", v.0, v.1, v.2);
        prop_assert_eq!(built.satisfies(&candidate), parsed.satisfies(&candidate));
        prop_assert_eq!(built.satisfies(&candidate), v >= min);
    }

    #[test]
    fn test_alternatives_are_a_union(a in 0u64..30, b in 0u64..30, major in 0u64..30) {
        let requirement = RuntimeRequirement::parse(&format!("{a}.x || {b}.x")).unwrap();
        prop_assert_eq!(requirement.satisfies(&format!("{major}.1.2")), major == a || major == b);
    }
}
