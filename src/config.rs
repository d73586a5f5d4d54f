use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub regions: PathBuf, // .geojson/.json or .shp
    #[serde(default = "default_name_property")]
    pub name_property: String,
    #[serde(default = "default_density_property")]
    pub density_property: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl OutputConfig {
    pub fn tile_dir(&self) -> PathBuf {
        self.dir.join("tiles")
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub center: [f64; 2], // lat, lon
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub base_tile_url: String,
    pub base_attribution: String,
    pub data_attribution: String,
    pub fill_opacity: f32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [55.0, -126.0],
            zoom: 5,
            min_zoom: 4,
            max_zoom: 8,
            base_tile_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            base_attribution:
                "&copy; <a href=\"http://www.openstreetmap.org/copyright\">OpenStreetMap</a>"
                    .to_string(),
            data_attribution: "Grizzly Population data &copy; <a href=\"https://catalogue.data.gov.bc.ca/dataset/2bf91935-9158-4f77-9c2c-4310480e6c29\">BC Data Catalogue</a>".to_string(),
            fill_opacity: 0.7,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub bar_color: String,
    pub border_color: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 480,
            bar_color: "rgb(50, 130, 50)".to_string(),
            border_color: "rgb(0, 0, 0)".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

fn default_name_property() -> String {
    "POPULATION_NAME".to_string()
}

fn default_density_property() -> String {
    "EST_POP_DENSITY_2018".to_string()
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            regions = "data/bearpop.geojson"

            [output]
            dir = "site"
            "#,
        )
        .unwrap();

        assert_eq!(config.input.name_property, "POPULATION_NAME");
        assert_eq!(config.input.density_property, "EST_POP_DENSITY_2018");
        assert_eq!(config.map.center, [55.0, -126.0]);
        assert_eq!(config.map.zoom, 5);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.chart.bar_color, "rgb(50, 130, 50)");
        assert_eq!(config.output.tile_dir(), PathBuf::from("site/tiles"));
    }

    #[test]
    fn overrides_are_read() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            regions = "bears.shp"
            name_property = "NAME"
            density_property = "DENSITY"

            [output]
            dir = "out"

            [map]
            max_zoom = 6

            [server]
            port = 3000
            "#,
        )
        .unwrap();

        assert_eq!(config.input.name_property, "NAME");
        assert_eq!(config.map.max_zoom, 6);
        assert_eq!(config.map.min_zoom, 4);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn missing_input_is_an_error() {
        assert!(AppConfig::from_toml("[output]\ndir = \"x\"").is_err());
    }
}
