//! Bar chart of density per region, rendered as inline SVG.

use crate::config::ChartConfig;
use crate::table::{format_density, html_escape};
use crate::types::Region;
use std::fmt::Write;

pub const TITLE: &str = "Grizzly Bear Population Densities of Regions within BC";
pub const SERIES_LABEL: &str = "Population Density (# of bears/1000 km2)";

// Plot area insets
const MARGIN_LEFT: f64 = 64.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 56.0;
const MARGIN_BOTTOM: f64 = 120.0;
const TICKS: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub labels: Vec<String>,
    pub values: Vec<Option<f64>>,
}

pub fn bar_series(regions: &[Region]) -> BarSeries {
    BarSeries {
        labels: regions.iter().map(|r| r.name.clone()).collect(),
        values: regions.iter().map(|r| r.density).collect(),
    }
}

/// Smallest 1/2/5 x 10^n step that splits `max` into at most `TICKS` steps.
fn tick_step(max: f64) -> f64 {
    if max <= 0.0 || !max.is_finite() {
        return 1.0;
    }
    let raw = max / f64::from(TICKS);
    let magnitude = 10f64.powf(raw.log10().floor());
    [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|step| *step >= raw)
        .unwrap_or(10.0 * magnitude)
}

/// Tick values from 0 to `axis_max` with labels carrying as many decimals
/// as `step` needs.
fn ticks(axis_max: f64, step: f64) -> Vec<(f64, String)> {
    let decimals = (-step.log10().floor()).max(0.0) as usize;
    let count = (axis_max / step).round() as u32;
    (0..=count)
        .map(|k| {
            let value = f64::from(k) * step;
            (value, format!("{:.*}", decimals, value))
        })
        .collect()
}

pub fn render_bar_chart(series: &BarSeries, config: &ChartConfig) -> String {
    let width = f64::from(config.width);
    let height = f64::from(config.height);
    let plot_w = (width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0);
    let plot_h = (height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0);
    let baseline = MARGIN_TOP + plot_h;

    let max = series
        .values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    let step = tick_step(max);
    let axis_max = (max / step).ceil().max(1.0) * step;
    let scale = plot_h / axis_max;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg id="myChart" xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="11">"#,
        w = config.width,
        h = config.height,
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="24" text-anchor="middle" font-size="16" font-weight="bold">{}</text>"#,
        width / 2.0,
        TITLE
    );
    let _ = writeln!(
        svg,
        r#"<rect x="{x}" y="34" width="12" height="12" fill="{fill}" stroke="{stroke}"/><text x="{tx}" y="44">{label}</text>"#,
        x = width / 2.0 - 120.0,
        tx = width / 2.0 - 104.0,
        fill = config.bar_color,
        stroke = config.border_color,
        label = SERIES_LABEL,
    );

    // y axis
    for (tick, label) in ticks(axis_max, step) {
        let y = baseline - tick * scale;
        let _ = writeln!(
            svg,
            r##"<line x1="{x0}" y1="{y:.1}" x2="{x1}" y2="{y:.1}" stroke="#ddd"/><text x="{tx}" y="{ty:.1}" text-anchor="end">{label}</text>"##,
            x0 = MARGIN_LEFT,
            x1 = MARGIN_LEFT + plot_w,
            tx = MARGIN_LEFT - 6.0,
            ty = y + 4.0,
        );
    }
    let _ = writeln!(
        svg,
        r#"<line x1="{x}" y1="{top}" x2="{x}" y2="{baseline}" stroke="black"/>"#,
        x = MARGIN_LEFT,
        top = MARGIN_TOP,
    );

    let count = series.labels.len().max(1) as f64;
    let slot = plot_w / count;
    let bar_w = slot * 0.8;

    for (i, (label, value)) in series.labels.iter().zip(&series.values).enumerate() {
        let x = MARGIN_LEFT + slot * i as f64 + (slot - bar_w) / 2.0;
        let bar_h = value.filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0) * scale;
        let label = html_escape(label);
        let _ = writeln!(
            svg,
            r#"<g class="bar"><title>{label}&#10;{series}: {value}</title><rect x="{x:.1}" y="{y:.1}" width="{bar_w:.1}" height="{bar_h:.1}" fill="{fill}" stroke="{stroke}"/></g>"#,
            series = SERIES_LABEL,
            value = format_density(*value),
            y = baseline - bar_h,
            fill = config.bar_color,
            stroke = config.border_color,
        );
        let lx = x + bar_w / 2.0;
        let ly = baseline + 8.0;
        let _ = writeln!(
            svg,
            r#"<text x="{lx:.1}" y="{ly:.1}" text-anchor="end" transform="rotate(-60 {lx:.1} {ly:.1})">{label}</text>"#,
        );
    }

    let _ = writeln!(
        svg,
        r#"<line x1="{x0}" y1="{baseline}" x2="{x1}" y2="{baseline}" stroke="black"/>"#,
        x0 = MARGIN_LEFT,
        x1 = MARGIN_LEFT + plot_w,
    );
    svg.push_str("</svg>");
    svg
}
