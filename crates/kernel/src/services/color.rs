//! Tag color helpers: hex parsing, gradient interpolation, palette hashing.
//!
//! Game-version tags are colored along a fixed gradient by rank; author tags
//! share one constant color; all other categories get a deterministic
//! default derived from `(category, value)`.

use sha2::{Digest, Sha256};

/// Gradient endpoint assigned to the oldest game version.
pub const OLDEST_VERSION_COLOR: &str = "#6c7a89";

/// Gradient endpoint assigned to the newest game version.
pub const NEWEST_VERSION_COLOR: &str = "#2ecc71";

/// Constant color applied to every author tag.
pub const AUTHOR_COLOR: &str = "#3498db";

/// Fixed palette for hash-derived default colors on non-ordered categories.
const DEFAULT_PALETTE: [&str; 8] = [
    "#e74c3c", "#e67e22", "#f1c40f", "#27ae60", "#16a085", "#2980b9", "#8e44ad", "#7f8c8d",
];

/// Parse a `#rrggbb` hex string into RGB components.
pub fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Format RGB components as a lowercase `#rrggbb` hex string.
pub fn format_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Color for the game-version tag at sorted `rank` of `total`.
///
/// Each RGB channel is interpolated linearly between the oldest and newest
/// endpoint at `rank / (total - 1)`. A single tag gets the newest endpoint.
pub fn gradient_color(rank: usize, total: usize) -> String {
    if total <= 1 {
        return NEWEST_VERSION_COLOR.to_string();
    }

    let ratio = rank as f64 / (total - 1) as f64;
    blend(OLDEST_VERSION_COLOR, NEWEST_VERSION_COLOR, ratio)
}

/// Interpolate each RGB channel between two hex colors at `ratio` (0..=1).
fn blend(from: &str, to: &str, ratio: f64) -> String {
    // The endpoints are compile-time constants; black is a safe fallback
    // should either ever fail to parse.
    let (fr, fg, fb) = parse_hex(from).unwrap_or((0, 0, 0));
    let (tr, tg, tb) = parse_hex(to).unwrap_or((0, 0, 0));

    format_hex(
        lerp(fr, tr, ratio),
        lerp(fg, tg, ratio),
        lerp(fb, tb, ratio),
    )
}

fn lerp(from: u8, to: u8, ratio: f64) -> u8 {
    let blended = f64::from(from) + (f64::from(to) - f64::from(from)) * ratio;
    blended.round().clamp(0.0, 255.0) as u8
}

/// Deterministic default color for a non-ordered `(category, value)` pair.
///
/// Hashes the pair into the fixed palette; stable across runs and
/// side-effect-free, so the result needs no persistence until saved.
pub fn default_color(category: &str, value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(category.as_bytes());
    hasher.update(b":");
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();

    let index = usize::from(digest[0]) % DEFAULT_PALETTE.len();
    DEFAULT_PALETTE[index].to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        assert_eq!(parse_hex("#6c7a89"), Some((0x6c, 0x7a, 0x89)));
        assert_eq!(format_hex(0x6c, 0x7a, 0x89), "#6c7a89");
        assert_eq!(parse_hex("#FFFFFF"), Some((255, 255, 255)));
    }

    #[test]
    fn hex_rejects_malformed() {
        assert_eq!(parse_hex("6c7a89"), None);
        assert_eq!(parse_hex("#6c7a8"), None);
        assert_eq!(parse_hex("#6c7a8z"), None);
        assert_eq!(parse_hex(""), None);
    }

    #[test]
    fn gradient_endpoints() {
        // rank 0 of n is the oldest endpoint, rank n-1 the newest
        assert_eq!(gradient_color(0, 2), OLDEST_VERSION_COLOR);
        assert_eq!(gradient_color(1, 2), NEWEST_VERSION_COLOR);
        assert_eq!(gradient_color(0, 5), OLDEST_VERSION_COLOR);
        assert_eq!(gradient_color(4, 5), NEWEST_VERSION_COLOR);
    }

    #[test]
    fn single_tag_gets_newest_endpoint() {
        assert_eq!(gradient_color(0, 1), NEWEST_VERSION_COLOR);
        assert_eq!(gradient_color(0, 0), NEWEST_VERSION_COLOR);
    }

    #[test]
    fn gradient_moves_monotonically_toward_newest() {
        let (or, ..) = parse_hex(OLDEST_VERSION_COLOR).unwrap();
        let (nr, ..) = parse_hex(NEWEST_VERSION_COLOR).unwrap();

        let mut prev_distance = u32::MAX;
        for rank in 0..10 {
            let (r, ..) = parse_hex(&gradient_color(rank, 10)).unwrap();
            let distance = u32::from(nr.abs_diff(r));
            assert!(distance <= prev_distance, "rank {rank} moved away from newest");
            prev_distance = distance;
        }

        // And rank 0 is exactly the oldest channel value
        let (r0, ..) = parse_hex(&gradient_color(0, 10)).unwrap();
        assert_eq!(r0, or);
    }

    #[test]
    fn gradient_is_deterministic() {
        for rank in 0..7 {
            assert_eq!(gradient_color(rank, 7), gradient_color(rank, 7));
        }
    }

    #[test]
    fn gradient_output_is_well_formed() {
        for rank in 0..12 {
            let color = gradient_color(rank, 12);
            assert_eq!(color.len(), 7);
            assert!(parse_hex(&color).is_some());
            assert_eq!(color, color.to_lowercase());
        }
    }

    #[test]
    fn default_color_is_stable_and_in_palette() {
        let first = default_color("tag", "survival");
        let second = default_color("tag", "survival");
        assert_eq!(first, second);
        assert!(DEFAULT_PALETTE.contains(&first.as_str()));
    }

    #[test]
    fn default_color_distinguishes_category_from_value() {
        // The separator keeps ("ab", "c") and ("a", "bc") from colliding
        // structurally; the digests differ even if the palette slot may not.
        let colors: Vec<String> = [
            default_color("tag", "survival"),
            default_color("tag", "creative"),
            default_color("lang", "survival"),
        ]
        .into_iter()
        .collect();

        for color in &colors {
            assert!(DEFAULT_PALETTE.contains(&color.as_str()));
        }
    }
}
