// crates/geobucket-core/tests/properties.rs
use geobucket_core::{quantize, GeoPoint, Normalizer};
use proptest::prelude::*;

proptest! {
    #[test]
    fn normalize_is_idempotent(raw in "\\PC{0,40}") {
        let n = Normalizer::default();
        let once = n.normalize(&raw);
        prop_assert_eq!(n.normalize(&once), once);
    }

    #[test]
    fn normalize_ignores_token_order_and_case(
        words in prop::collection::vec("[a-zA-Z]{1,8}", 1..5)
    ) {
        let n = Normalizer::default();
        let forward = words.join(" ");
        let mut reversed = words.clone();
        reversed.reverse();
        let shouted = reversed.join(", ").to_uppercase();
        prop_assert_eq!(n.normalize(&forward), n.normalize(&shouted));
    }

    #[test]
    fn quantize_is_deterministic_and_stable(
        lat in -90.0f64..=90.0,
        lng in -180.0f64..=180.0,
        step in prop::sample::select(vec![0.001, 0.005, 0.01, 0.1, 0.5]),
    ) {
        let a = quantize(lat, lng, step);
        let b = quantize(lat, lng, step);
        prop_assert_eq!(&a.key, &b.key);
        prop_assert!((-90.0..=90.0).contains(&a.lat));
        prop_assert!((-180.0..=180.0).contains(&a.lng));
        prop_assert!(!a.key.as_str().starts_with("-0.000"));
    }

    #[test]
    fn centroid_is_within_half_a_cell(
        lat in -80.0f64..80.0,
        lng in -170.0f64..170.0,
    ) {
        let step = 0.005;
        let cell = quantize(lat, lng, step);
        prop_assert!((cell.lat - lat).abs() <= step / 2.0 + 1e-9);
        prop_assert!((cell.lng - lng).abs() <= step / 2.0 + 1e-9);
        let here = GeoPoint::new(lat, lng).unwrap();
        // Half a cell diagonal at the equator is ~393 m.
        prop_assert!(here.distance_m(&cell.centroid()) < 400.0);
    }
}
