//! Page assembly: chart, map and table written into the output directory.
//!
//! The map script is static. Everything dataset or config dependent is
//! handed to it through a single `SETTINGS` object.

use crate::chart::{bar_series, render_bar_chart, TITLE};
use crate::classify::{legend_entries, LegendEntry};
use crate::config::AppConfig;
use crate::table::{html_escape, render_table, table_rows, write_csv};
use crate::types::Region;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use tracing::info;

pub fn write_site(config: &AppConfig, regions: &[Region]) -> Result<()> {
    let dir = &config.output.dir;
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {:?}", dir))?;

    let page = dir.join("index.html");
    fs::write(&page, render_page(config, regions)?)
        .with_context(|| format!("Failed to write {:?}", page))?;

    let csv_path = dir.join("table.csv");
    write_csv(&table_rows(regions), &csv_path)?;

    info!(page = ?page, csv = ?csv_path, "wrote site");
    Ok(())
}

/// `<i>` swatches joined with `<br>`, as shown in the map's legend control.
pub fn render_legend(entries: &[LegendEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("<i style=\"background:{}\"></i> {}", e.color, html_escape(&e.label)))
        .collect::<Vec<_>>()
        .join("<br>")
}

#[derive(Serialize)]
struct MapSettings<'a> {
    title: &'a str,
    center: [f64; 2],
    zoom: u8,
    min_zoom: u8,
    max_zoom: u8,
    base_tile_url: &'a str,
    base_attribution: &'a str,
    data_attribution: &'a str,
    legend_html: String,
}

pub fn render_page(config: &AppConfig, regions: &[Region]) -> Result<String> {
    let map = &config.map;
    let settings = MapSettings {
        title: TITLE,
        center: map.center,
        zoom: map.zoom,
        min_zoom: map.min_zoom,
        max_zoom: map.max_zoom,
        base_tile_url: &map.base_tile_url,
        base_attribution: &map.base_attribution,
        data_attribution: &map.data_attribution,
        legend_html: render_legend(&legend_entries()),
    };
    // "</" would end the surrounding <script> element early.
    let settings = serde_json::to_string(&settings)?.replace("</", "<\\/");

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <style>{css}</style>
</head>
<body>
    <h1>{title}</h1>
    <section class="chart">
{chart}
    </section>
    <section>
        <div id="map"></div>
    </section>
    <section>
{table}
    </section>
    <script>const SETTINGS = {settings};</script>
    <script>{js}</script>
</body>
</html>
"#,
        title = TITLE,
        css = INLINE_CSS,
        chart = render_bar_chart(&bar_series(regions), &config.chart),
        table = render_table(&table_rows(regions)),
        settings = settings,
        js = MAP_SCRIPT,
    ))
}

const INLINE_CSS: &str = r#"
body { font-family: sans-serif; margin: 1em 2em; }
#map { width: 100%; height: 600px; }
.info { padding: 6px 8px; font: 14px/16px Arial, Helvetica, sans-serif; background: rgba(255,255,255,0.8); box-shadow: 0 0 15px rgba(0,0,0,0.2); border-radius: 5px; }
.info h4 { margin: 0 0 5px; color: #777; }
.legend { text-align: left; line-height: 18px; color: #555; }
.legend i { width: 18px; height: 18px; float: left; margin-right: 8px; opacity: 0.7; }
#jsontable { border-collapse: collapse; margin-top: 1em; }
#jsontable th, #jsontable td { border: 1px solid #999; padding: 4px 8px; }
"#;

const MAP_SCRIPT: &str = r#"
const map = L.map('map').setView(SETTINGS.center, SETTINGS.zoom);

L.tileLayer(SETTINGS.base_tile_url, {
    maxZoom: 19,
    attribution: SETTINGS.base_attribution
}).addTo(map);

L.tileLayer('tiles/{z}/{x}/{y}.png', {
    minNativeZoom: SETTINGS.min_zoom,
    maxNativeZoom: SETTINGS.max_zoom
}).addTo(map);

const escapeHtml = (s) => String(s).replace(/[&<>"']/g, (c) => `&#${c.charCodeAt(0)};`);

const info = L.control();
info.onAdd = function () {
    this._div = L.DomUtil.create('div', 'info');
    this.update();
    return this._div;
};
info.update = function (region) {
    const density = region && region.density !== null ? region.density : '';
    const contents = region ? `<b>${escapeHtml(region.name)}</b><br />${density} bears / km<sup>2</sup>` : 'Hover over a region';
    this._div.innerHTML = `<h4>${SETTINGS.title}</h4>${contents}`;
};
info.addTo(map);

let current = null;
let outline = null;
let inFlight = false;
// Last pointer position not yet looked up.
let latest = null;
// Bumped on mouseout; answers to requests started before it are dropped.
let epoch = 0;

async function queryRegion(latlng) {
    const resp = await fetch(`api/query?lat=${latlng.lat}&lon=${latlng.lng}`);
    return resp.ok ? resp.json() : null;
}

function highlight(region) {
    if (outline) {
        map.removeLayer(outline);
        outline = null;
    }
    current = region;
    if (region) {
        outline = L.geoJSON(region.outline, {
            interactive: false,
            style: { weight: 5, color: '#666', dashArray: '', fillOpacity: 0 }
        }).addTo(map);
        outline.bringToFront();
    }
    info.update(region);
}

async function refreshHover() {
    if (inFlight) return;
    inFlight = true;
    try {
        while (latest) {
            const latlng = latest;
            latest = null;
            const started = epoch;
            const region = await queryRegion(latlng);
            if (started !== epoch) continue;
            const name = region ? region.name : null;
            if (name !== (current ? current.name : null)) highlight(region);
        }
    } finally {
        inFlight = false;
    }
}

map.on('mousemove', (e) => {
    latest = e.latlng;
    refreshHover();
});

map.on('mouseout', () => {
    epoch += 1;
    latest = null;
    highlight(null);
});

map.on('click', async (e) => {
    const region = await queryRegion(e.latlng);
    if (region) {
        const [west, south, east, north] = region.bounds;
        map.fitBounds([[south, west], [north, east]]);
    }
});

map.attributionControl.addAttribution(SETTINGS.data_attribution);

const legend = L.control({ position: 'bottomright' });
legend.onAdd = function () {
    const div = L.DomUtil.create('div', 'info legend');
    div.innerHTML = SETTINGS.legend_html;
    return div;
};
legend.addTo(map);
"#;
