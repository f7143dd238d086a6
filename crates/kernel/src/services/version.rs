//! Game-version comparison and normalization.
//!
//! Version tag values are underscore-delimited numeric components
//! (`1_10`, `2_4`). Comparison is numeric, component by component, so
//! `1_10` sorts after `1_9` even though the strings compare the other way.

use std::cmp::Ordering;

/// Compare two version tag values numerically.
///
/// Missing trailing components and non-numeric components are treated as
/// zero; this never panics on malformed input.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<u64> = components(a);
    let right: Vec<u64> = components(b);

    let len = left.len().max(right.len());
    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    Ordering::Equal
}

fn components(value: &str) -> Vec<u64> {
    value
        .split('_')
        .map(|part| part.parse::<u64>().unwrap_or(0))
        .collect()
}

/// Normalize a mod's raw version text into its canonical display form.
///
/// Numeric versions get an uppercase `V` marker (`"1.10"` → `"V1.10"`,
/// `"v1.10"` → `"V1.10"`). Non-numeric text and already-normal forms pass
/// through unchanged apart from trimming; empty input stays empty.
pub fn normalize_version(raw: &str) -> String {
    let trimmed = raw.trim();

    match trimmed.strip_prefix(['V', 'v']) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => format!("V{rest}"),
        _ if trimmed.starts_with(|c: char| c.is_ascii_digit()) => format!("V{trimmed}"),
        _ => trimmed.to_string(),
    }
}

/// Derive the machine `value` of a game-version tag from its display form.
///
/// Strips the leading `V` marker, lowercases, maps non-alphanumeric
/// characters to underscores, collapses runs, and trims
/// (`"V1.10"` → `"1_10"`, `"V1.9 Beta"` → `"1_9_beta"`).
pub fn version_value(display: &str) -> String {
    let trimmed = display.trim();
    let rest = match trimmed.strip_prefix(['V', 'v']) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => trimmed,
    };

    let mapped: String = rest
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    // Collapse consecutive underscores and trim
    let mut result = String::with_capacity(mapped.len());
    let mut prev_was_sep = true; // Start true to skip leading separators
    for c in mapped.chars() {
        if c == '_' {
            if !prev_was_sep {
                result.push('_');
            }
            prev_was_sep = true;
        } else {
            result.push(c);
            prev_was_sep = false;
        }
    }

    while result.ends_with('_') {
        result.pop();
    }

    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn numeric_not_lexicographic() {
        assert_eq!(compare_versions("1_10", "1_9"), Ordering::Greater);
        assert_eq!(compare_versions("1_9", "1_10"), Ordering::Less);
        assert_eq!(compare_versions("2_4", "2_4"), Ordering::Equal);
    }

    #[test]
    fn missing_components_are_zero() {
        assert_eq!(compare_versions("1", "1_0"), Ordering::Equal);
        assert_eq!(compare_versions("1_0_0", "1"), Ordering::Equal);
        assert_eq!(compare_versions("1", "1_0_1"), Ordering::Less);
    }

    #[test]
    fn malformed_components_are_zero() {
        assert_eq!(compare_versions("1_x", "1_0"), Ordering::Equal);
        assert_eq!(compare_versions("abc", "0"), Ordering::Equal);
        assert_eq!(compare_versions("", "0"), Ordering::Equal);
        assert_eq!(compare_versions("1_beta", "1_1"), Ordering::Less);
    }

    #[test]
    fn first_differing_component_decides() {
        assert_eq!(compare_versions("2_0", "1_99"), Ordering::Greater);
        assert_eq!(compare_versions("1_2_3", "1_2_4"), Ordering::Less);
    }

    #[test]
    fn normalization_adds_marker() {
        assert_eq!(normalize_version("1.10"), "V1.10");
        assert_eq!(normalize_version("v1.10"), "V1.10");
        assert_eq!(normalize_version("V1.10"), "V1.10");
        assert_eq!(normalize_version("  2.4 "), "V2.4");
    }

    #[test]
    fn normalization_leaves_non_numeric_text() {
        assert_eq!(normalize_version("vanilla"), "vanilla");
        assert_eq!(normalize_version(""), "");
        assert_eq!(normalize_version("   "), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["1.10", "v1.10", "V2.4", "vanilla", ""] {
            let once = normalize_version(raw);
            assert_eq!(normalize_version(&once), once);
        }
    }

    #[test]
    fn value_derivation() {
        assert_eq!(version_value("V1.10"), "1_10");
        assert_eq!(version_value("v2.4"), "2_4");
        assert_eq!(version_value("V1.9 Beta"), "1_9_beta");
        assert_eq!(version_value("1.10"), "1_10");
        assert_eq!(version_value("vanilla"), "vanilla");
    }

    #[test]
    fn value_collapses_separator_runs() {
        assert_eq!(version_value("V1..10"), "1_10");
        assert_eq!(version_value("V1.10-"), "1_10");
        assert_eq!(version_value("  V1 . 10  "), "1_10");
    }

    #[test]
    fn value_of_normalized_matches_value_of_raw() {
        for raw in ["1.10", "v1.10", "V2.4", "1.9 beta"] {
            assert_eq!(version_value(&normalize_version(raw)), version_value(raw));
        }
    }
}
