use crate::config::InputConfig;
use crate::types::Region;
use anyhow::{Context, Result, anyhow};
use geo::MultiPolygon;
use geojson::GeoJson;
use shapefile::Reader;
use shapefile::dbase::FieldValue;
use std::fs::File;
use std::io::BufReader;
use tracing::{debug, info, warn};

/// Load every region of the dataset, in file order.
pub fn load_regions(input: &InputConfig) -> Result<Vec<Region>> {
    let extension = input.regions.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input geometry file has no extension"))?;

    let regions = match extension.as_str() {
        "shp" => load_shapefile(input)?,
        "json" | "geojson" => load_geojson(input)?,
        _ => return Err(anyhow!("Unsupported geometry format: {}", extension)),
    };

    let without_density = regions.iter().filter(|r| r.density.is_none()).count();
    if without_density > 0 {
        warn!(without_density, "some regions have no density value");
    }
    info!(count = regions.len(), path = ?input.regions, "loaded regions");

    Ok(regions)
}

fn load_geojson(input: &InputConfig) -> Result<Vec<Region>> {
    let file = File::open(&input.regions)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", input.regions))?;
    let reader = BufReader::new(file);
    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;
    regions_from_geojson(geojson, input)
}

pub fn regions_from_geojson(geojson: GeoJson, input: &InputConfig) -> Result<Vec<Region>> {
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut regions = Vec::new();

    for feature in collection.features {
        let props = feature.properties.as_ref();

        let name = match props.and_then(|p| p.get(&input.name_property)) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                debug!("skipping feature without {}", input.name_property);
                continue;
            }
        };

        let density = props
            .and_then(|p| p.get(&input.density_property))
            .and_then(json_density);

        let geometry = match feature.geometry {
            Some(geom) => {
                let valid_geo: geo::Geometry<f64> = geom.value.try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry for {}: {:?}", name, e))?;

                match valid_geo {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue, // points and lines cannot be shaded
                }
            }
            None => continue,
        };

        regions.push(Region { name, density, geometry });
    }

    Ok(regions)
}

fn json_density(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn load_shapefile(input: &InputConfig) -> Result<Vec<Region>> {
    let mut reader = Reader::from_path(&input.regions)
        .with_context(|| format!("Failed to open Shapefile: {:?}", input.regions))?;

    let mut regions = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let name = match record.get(&input.name_property) {
            Some(value) => match field_name(value) {
                Some(name) => name,
                None => {
                    debug!("skipping record without {}", input.name_property);
                    continue;
                }
            },
            None => return Err(anyhow!("Name column '{}' not found in Shapefile", input.name_property)),
        };

        let density = record.get(&input.density_property).and_then(field_density);

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => continue,
        };

        regions.push(Region { name, density, geometry });
    }

    Ok(regions)
}

// Strings and numbers both name a region, as in the GeoJSON reader.
fn field_name(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(Some(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) => Some(n.to_string()),
        FieldValue::Float(Some(f)) => Some(f.to_string()),
        FieldValue::Double(d) => Some(d.to_string()),
        FieldValue::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

fn field_density(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Numeric(n) => *n,
        FieldValue::Float(f) => f.map(f64::from),
        FieldValue::Double(d) => Some(*d),
        FieldValue::Integer(i) => Some(f64::from(*i)),
        FieldValue::Character(Some(s)) => s.trim().parse().ok(),
        _ => None,
    }
}
