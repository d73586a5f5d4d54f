//! Density to color classification and the map legend.
//!
//! Densities are bears per 1000 km². Six fixed tiers, each with a lower
//! bound that a value must strictly exceed.

use serde::Serialize;

/// Hex color token for a tier.
pub type Color = &'static str;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tier {
    pub index: u8,
    /// `None` for the lowest tier, which catches everything at or below 3.
    pub lower_bound: Option<f64>,
    pub color: Color,
}

pub const TIERS: [Tier; 6] = [
    Tier { index: 0, lower_bound: None, color: "#D2FFDF" },
    Tier { index: 1, lower_bound: Some(3.0), color: "#B4EEB2" },
    Tier { index: 2, lower_bound: Some(10.0), color: "#95DC86" },
    Tier { index: 3, lower_bound: Some(20.0), color: "#76CB59" },
    Tier { index: 4, lower_bound: Some(30.0), color: "#57B92D" },
    Tier { index: 5, lower_bound: Some(40.0), color: "#008000" },
];

/// Legend grades, ascending. Each legend row spans `[grade, next grade]`.
const GRADES: [u32; 6] = [0, 3, 10, 20, 30, 40];

/// Tier for a density. Thresholds are checked highest first with `>`, so a
/// value sitting exactly on a bound belongs to the tier below it. NaN falls
/// through every guard and lands in tier 0.
pub fn tier(value: f64) -> Tier {
    let index = if value > 40.0 {
        5
    } else if value > 30.0 {
        4
    } else if value > 20.0 {
        3
    } else if value > 10.0 {
        2
    } else if value > 3.0 {
        1
    } else {
        0
    };
    TIERS[index]
}

pub fn classify(value: f64) -> Color {
    tier(value).color
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: Color,
}

/// Legend rows in ascending order: `0–3`, `3–10`, ..., `40+`.
///
/// The swatch color is sampled one unit above each grade, so the first row
/// shows the tier-0 color because `classify(1)` is still at or below 3.
pub fn legend_entries() -> Vec<LegendEntry> {
    GRADES
        .iter()
        .enumerate()
        .map(|(i, &from)| {
            let label = match GRADES.get(i + 1) {
                Some(to) => format!("{from}\u{2013}{to}"),
                None => format!("{from}+"),
            };
            LegendEntry {
                label,
                color: classify(f64::from(from) + 1.0),
            }
        })
        .collect()
}

/// Parse a `#RRGGBB` token into components. Malformed channels read as 0.
pub fn hex_to_rgb(hex: &str) -> [u8; 3] {
    let hex = hex.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0)
    };
    [channel(0..2), channel(2..4), channel(4..6)]
}
