#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Version comparator and gradient engine tests.
//!
//! The gradient engine is pure given its inputs: these tests pin the
//! ordering, the endpoint assignments, and the idempotence of the
//! computed colors.

use std::cmp::Ordering;

use modhub_kernel::services::color::{
    NEWEST_VERSION_COLOR, OLDEST_VERSION_COLOR, gradient_color, parse_hex,
};
use modhub_kernel::services::version::{compare_versions, normalize_version, version_value};

// -------------------------------------------------------------------------
// Comparator tests
// -------------------------------------------------------------------------

#[test]
fn comparison_is_numeric() {
    assert_eq!(compare_versions("1_10", "1_9"), Ordering::Greater);
    assert_eq!(compare_versions("2_4", "2_4"), Ordering::Equal);
}

#[test]
fn comparator_sorts_a_realistic_release_history() {
    let mut values = vec!["1_10", "1_2", "2_0", "1_9", "1_0"];
    values.sort_by(|a, b| compare_versions(a, b));

    assert_eq!(values, vec!["1_0", "1_2", "1_9", "1_10", "2_0"]);
}

#[test]
fn comparator_never_panics_on_garbage() {
    for (a, b) in [("", ""), ("_", "__"), ("x_y", "1"), ("9999999999999", "1")] {
        // Ordering value is unimportant; reaching here without panic is.
        let _ = compare_versions(a, b);
    }
}

// -------------------------------------------------------------------------
// Gradient tests
// -------------------------------------------------------------------------

#[test]
fn two_versions_take_both_endpoints() {
    // n=2: ratio 0 and 1 exactly.
    assert_eq!(gradient_color(0, 2), OLDEST_VERSION_COLOR);
    assert_eq!(gradient_color(1, 2), NEWEST_VERSION_COLOR);
}

#[test]
fn lone_version_takes_the_newest_endpoint() {
    assert_eq!(gradient_color(0, 1), NEWEST_VERSION_COLOR);
}

#[test]
fn older_versions_sit_closer_to_the_oldest_endpoint() {
    let (oldest_r, oldest_g, oldest_b) = parse_hex(OLDEST_VERSION_COLOR).unwrap();

    let mut values = vec!["2_0", "1_0", "1_9", "1_10"];
    values.sort_by(|a, b| compare_versions(a, b));

    let total = values.len();
    let mut prev_distance = -1i64;
    for rank in 0..total {
        let (r, g, b) = parse_hex(&gradient_color(rank, total)).unwrap();
        let distance = i64::from(oldest_r.abs_diff(r))
            + i64::from(oldest_g.abs_diff(g))
            + i64::from(oldest_b.abs_diff(b));

        assert!(
            distance >= prev_distance,
            "rank {rank} is closer to the oldest endpoint than its predecessor"
        );
        prev_distance = distance;
    }
}

#[test]
fn recomputed_colors_are_stable() {
    // Same membership, same ranks: identical colors, so a persisting
    // caller comparing stored values would write nothing the second time.
    let first: Vec<String> = (0..6).map(|rank| gradient_color(rank, 6)).collect();
    let second: Vec<String> = (0..6).map(|rank| gradient_color(rank, 6)).collect();

    assert_eq!(first, second);
}

// -------------------------------------------------------------------------
// Normalization tests
// -------------------------------------------------------------------------

#[test]
fn raw_mod_versions_normalize_to_marked_form() {
    assert_eq!(normalize_version("1.10"), "V1.10");
    assert_eq!(normalize_version("v2.4"), "V2.4");
    assert_eq!(normalize_version("V1.0"), "V1.0");
}

#[test]
fn normalized_form_yields_canonical_value() {
    assert_eq!(version_value(&normalize_version("1.10")), "1_10");
    assert_eq!(version_value(&normalize_version("v1.9 Beta")), "1_9_beta");
}

#[test]
fn distinct_raw_spellings_converge_on_one_value() {
    let spellings = ["1.10", "v1.10", "V1.10", " V1.10 "];
    let values: Vec<String> = spellings.iter().map(|s| version_value(s)).collect();

    assert!(values.iter().all(|v| v == "1_10"));
}
