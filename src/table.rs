//! Table view of the dataset, as HTML markup and as CSV.

use crate::types::Region;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

pub const NAME_HEADER: &str = "Population Name";
pub const DENSITY_HEADER: &str = "Population Density (# of bears/1000 km2)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    #[serde(rename = "Population Name")]
    pub name: String,
    #[serde(rename = "Population Density (# of bears/1000 km2)")]
    pub density: Option<f64>,
}

pub fn table_rows(regions: &[Region]) -> Vec<TableRow> {
    regions
        .iter()
        .map(|r| TableRow {
            name: r.name.clone(),
            density: r.density,
        })
        .collect()
}

/// Render rows as a `<table>`. Cell text is escaped; missing densities are
/// left blank.
pub fn render_table(rows: &[TableRow]) -> String {
    let body: String = rows
        .iter()
        .map(|row| {
            format!(
                "<tr><td>{}</td><td>{}</td></tr>\n",
                html_escape(&row.name),
                format_density(row.density),
            )
        })
        .collect();

    format!(
        "<table id=\"jsontable\">\n<tr><th>{}</th><th>{}</th></tr>\n{}</table>",
        NAME_HEADER, DENSITY_HEADER, body
    )
}

pub fn write_csv(rows: &[TableRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn format_density(density: Option<f64>) -> String {
    density.map(|d| d.to_string()).unwrap_or_default()
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<TableRow> {
        vec![
            TableRow { name: "Skeena".into(), density: Some(41.0) },
            TableRow { name: "Babine".into(), density: Some(12.5) },
            TableRow { name: "Unknown".into(), density: None },
        ]
    }

    #[test]
    fn renders_header_and_rows_in_order() {
        let html = render_table(&rows());
        assert!(html.starts_with("<table id=\"jsontable\">"));
        assert!(html.contains(
            "<tr><th>Population Name</th><th>Population Density (# of bears/1000 km2)</th></tr>"
        ));
        let skeena = html.find("<td>Skeena</td><td>41</td>").unwrap();
        let babine = html.find("<td>Babine</td><td>12.5</td>").unwrap();
        assert!(skeena < babine);
        assert!(html.contains("<td>Unknown</td><td></td>"));
        assert!(html.ends_with("</table>"));
    }

    #[test]
    fn empty_dataset_still_has_header() {
        let html = render_table(&[]);
        assert_eq!(html.matches("<tr>").count(), 1);
    }

    #[test]
    fn names_are_escaped() {
        let html = render_table(&[TableRow {
            name: "<b>North & South</b>".into(),
            density: Some(1.0),
        }]);
        assert!(html.contains("&lt;b&gt;North &amp; South&lt;/b&gt;"));
        assert!(!html.contains("<b>North"));
    }

    #[test]
    fn csv_export_matches_rows() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write_csv(&rows(), file.path()).unwrap();
        let written = std::fs::read_to_string(file.path()).unwrap();

        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "Population Name,Population Density (# of bears/1000 km2)");
        assert_eq!(lines[1], "Skeena,41.0");
        assert_eq!(lines[2], "Babine,12.5");
        assert_eq!(lines[3], "Unknown,");
    }
}
