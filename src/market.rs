//! Static market trend shown next to the valuation. Purely illustrative: it
//! is supplied by the host and never touches the live computation.

use serde::{Deserialize, Serialize};

use crate::currency::format_rupee;
use crate::parcel::ParcelKind;

pub const MARKET_VOLATILITY: &str = "Low";
pub const GENAI_SENTIMENT: &str = "Positive (Infrastructure Expansion)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub label: String,
    pub price: f64,
}

impl TrendPoint {
    pub fn new(label: impl Into<String>, price: f64) -> Self {
        Self {
            label: label.into(),
            price,
        }
    }
}

pub fn default_trend() -> Vec<TrendPoint> {
    vec![
        TrendPoint::new("2020", 4_500_000.0),
        TrendPoint::new("2021", 4_800_000.0),
        TrendPoint::new("2022", 5_500_000.0),
        TrendPoint::new("2023", 6_200_000.0),
        TrendPoint::new("2024", 7_100_000.0),
        TrendPoint::new("2025", 8_500_000.0),
    ]
}

/// The fixed "Current Context" notes shown beside a valuation.
pub fn context_lines(kind: ParcelKind) -> [String; 3] {
    [
        format!("Property Type: {kind}"),
        format!("Indian Market Volatility: {MARKET_VOLATILITY}"),
        format!("GenAI Sentiment: {GENAI_SENTIMENT}"),
    ]
}

/// Horizontal bar chart, one row per point, scaled to the largest price.
pub fn render_trend(points: &[TrendPoint], width: usize) -> String {
    let max = points
        .iter()
        .map(|p| p.price)
        .filter(|p| p.is_finite())
        .fold(0.0_f64, f64::max);
    let label_width = points.iter().map(|p| p.label.len()).max().unwrap_or(0);

    let mut out = String::new();
    for point in points {
        let filled = if max > 0.0 && point.price.is_finite() {
            ((point.price.max(0.0) / max) * width as f64).round() as usize
        } else {
            0
        };
        out.push_str(&format!(
            "{:>label_width$} | {}{} {}\n",
            point.label,
            "█".repeat(filled),
            " ".repeat(width.saturating_sub(filled)),
            format_rupee(point.price),
        ));
    }
    out
}
