use crate::classify::{classify, legend_entries, Color, LegendEntry};
use crate::config::AppConfig;
use crate::index::RegionIndex;
use crate::types::Region;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use geo::bounding_rect::BoundingRect;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

pub struct AppState {
    pub regions: Vec<Region>,
    pub index: RegionIndex,
}

impl AppState {
    pub fn new(regions: Vec<Region>) -> Self {
        let index = RegionIndex::build(&regions);
        Self { regions, index }
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

/// What the map's info control and click-to-zoom need about one region.
#[derive(Debug, Serialize)]
pub struct RegionInfo {
    name: String,
    density: Option<f64>,
    color: Color,
    /// `[west, south, east, north]`
    bounds: [f64; 4],
    outline: geojson::Geometry,
}

pub fn router(output_dir: &std::path::Path, state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/query", get(query_handler))
        .route("/api/legend", get(legend_handler))
        .fallback_service(ServeDir::new(output_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, regions: Vec<Region>) -> Result<()> {
    info!("Building spatial index for {} regions...", regions.len());
    let state = Arc::new(AppState::new(regions));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let app = router(&config.output.dir, state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<RegionInfo>> {
    let found = state
        .index
        .locate(&state.regions, params.lon, params.lat)
        .and_then(|i| state.regions.get(i));

    Json(found.and_then(region_info))
}

async fn legend_handler() -> Json<Vec<LegendEntry>> {
    Json(legend_entries())
}

fn region_info(region: &Region) -> Option<RegionInfo> {
    let rect = region.geometry.bounding_rect()?;
    Some(RegionInfo {
        name: region.name.clone(),
        density: region.density,
        color: classify(region.density.unwrap_or(0.0)),
        bounds: [rect.min().x, rect.min().y, rect.max().x, rect.max().y],
        outline: geojson::Geometry::new(geojson::Value::from(&region.geometry)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::tests::square;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(vec![
            square("Skeena", Some(41.0), -128.0, 54.0, 1.0),
            square("Babine", None, -126.0, 54.0, 1.0),
        ]))
    }

    #[tokio::test]
    async fn query_returns_region_under_point() {
        let Json(found) = query_handler(
            State(state()),
            Query(QueryParams { lat: 54.5, lon: -127.5 }),
        )
        .await;

        let info = found.unwrap();
        assert_eq!(info.name, "Skeena");
        assert_eq!(info.density, Some(41.0));
        assert_eq!(info.color, "#008000");
        assert_eq!(info.bounds, [-128.0, 54.0, -127.0, 55.0]);
    }

    #[tokio::test]
    async fn missing_density_reports_lowest_tier() {
        let Json(found) = query_handler(
            State(state()),
            Query(QueryParams { lat: 54.5, lon: -125.5 }),
        )
        .await;

        let info = found.unwrap();
        assert_eq!(info.density, None);
        assert_eq!(info.color, "#D2FFDF");
    }

    #[tokio::test]
    async fn query_outside_all_regions_is_null() {
        let Json(found) = query_handler(
            State(state()),
            Query(QueryParams { lat: 10.0, lon: 10.0 }),
        )
        .await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn legend_endpoint_serializes_entries() {
        let Json(entries) = legend_handler().await;
        let json = serde_json::to_value(&entries).unwrap();
        assert_eq!(json[0]["label"], "0\u{2013}3");
        assert_eq!(json[5]["color"], "#008000");
    }

    #[test]
    fn region_info_serializes_outline_as_geojson() {
        let region = square("Skeena", Some(41.0), -128.0, 54.0, 1.0);
        let json = serde_json::to_value(region_info(&region).unwrap()).unwrap();
        assert_eq!(json["outline"]["type"], "MultiPolygon");
        assert_eq!(json["name"], "Skeena");
    }
}
