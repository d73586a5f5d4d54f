use crate::classify::{classify, hex_to_rgb};
use crate::config::AppConfig;
use crate::index::RegionIndex;
use crate::types::Region;
use anyhow::{Context, Result};
use image::{ImageBuffer, Rgba, RgbaImage};
use rayon::prelude::*;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

// Constants for Web Mercator
const TILE_SIZE: u32 = 256;
const MAX_LAT: f64 = 85.051_128_78;

const BORDER: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Render choropleth tiles for every zoom level into
/// `{tile_dir}/{z}/{x}/{y}.png`. Tiles with no region pixels are not written.
/// Returns the number of tiles saved.
pub fn generate_tiles(config: &AppConfig, regions: &[Region]) -> Result<usize> {
    let map = &config.map;
    info!("Generating tiles from min_zoom {} to max_zoom {}...", map.min_zoom, map.max_zoom);

    let index = RegionIndex::build(regions);
    let Some(bounds) = index.bounds() else {
        warn!("no region geometry to render");
        return Ok(0);
    };

    // One fill per region. Regions without a density shade as the lowest tier.
    let alpha = (map.fill_opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    let fills: Vec<Rgba<u8>> = regions.iter().map(|r| {
        let [red, green, blue] = hex_to_rgb(classify(r.density.unwrap_or(0.0)));
        Rgba([red, green, blue, alpha])
    }).collect();

    let tile_dir = config.output.tile_dir();
    let saved = AtomicUsize::new(0);

    (map.min_zoom..=map.max_zoom).into_par_iter().try_for_each(|z| -> Result<()> {
        let count = render_zoom_level(&tile_dir, z, bounds, regions, &index, &fills)?;
        info!(zoom = z, tiles = count, "rendered zoom level");
        saved.fetch_add(count, Ordering::Relaxed);
        Ok(())
    })?;

    Ok(saved.into_inner())
}

fn render_zoom_level(
    tile_dir: &Path,
    zoom: u8,
    (min_lon, min_lat, max_lon, max_lat): (f64, f64, f64, f64),
    regions: &[Region],
    index: &RegionIndex,
    fills: &[Rgba<u8>],
) -> Result<usize> {
    // North-west corner has the smallest tile indices.
    let (x0, y0, _, _) = lat_lon_to_tile_pixel(max_lat, min_lon, zoom);
    let (x1, y1, _, _) = lat_lon_to_tile_pixel(min_lat, max_lon, zoom);

    let tiles: Vec<(u32, u32)> = (x0..=x1)
        .flat_map(|x| (y0..=y1).map(move |y| (x, y)))
        .collect();

    let z_dir = tile_dir.join(zoom.to_string());

    let saved = tiles.par_iter().map(|&(x, y)| -> Result<usize> {
        let Some(img) = render_tile(zoom, x, y, regions, index, fills) else {
            return Ok(0);
        };
        let x_dir = z_dir.join(x.to_string());
        fs::create_dir_all(&x_dir).with_context(|| format!("Failed to create tile directory {:?}", x_dir))?;
        let path = x_dir.join(format!("{}.png", y));
        img.save(&path).with_context(|| format!("Failed to save tile {:?}", path))?;
        Ok(1)
    }).try_reduce(|| 0, |a, b| Ok(a + b))?;

    Ok(saved)
}

/// Rasterize one tile. Each pixel takes the fill of the region under its
/// center; pixels on a boundary between regions (or between a region and
/// empty space) are drawn as white border.
pub fn render_tile(
    zoom: u8,
    tx: u32,
    ty: u32,
    regions: &[Region],
    index: &RegionIndex,
    fills: &[Rgba<u8>],
) -> Option<RgbaImage> {
    // Owners are sampled with a one pixel apron from the neighbouring tiles,
    // so edges lying on a tile seam are still detected.
    let size = TILE_SIZE as i64;
    let stride = (size + 2) as usize;
    let mut owners: Vec<Option<usize>> = Vec::with_capacity(stride * stride);
    for py in -1..=size {
        for px in -1..=size {
            let (lat, lon) = tile_pixel_to_lat_lon(tx, ty, px as f64 + 0.5, py as f64 + 0.5, zoom);
            owners.push(index.locate(regions, lon, lat));
        }
    }

    let owner_at = |px: i64, py: i64| owners[(py + 1) as usize * stride + (px + 1) as usize];

    let mut img: RgbaImage = ImageBuffer::new(TILE_SIZE, TILE_SIZE);
    let mut painted = false;
    for py in 0..size {
        for px in 0..size {
            let Some(owner) = owner_at(px, py) else { continue };
            let on_border = [(-1, 0), (1, 0), (0, -1), (0, 1)]
                .iter()
                .any(|(dx, dy)| owner_at(px + dx, py + dy) != Some(owner));
            let color = if on_border { BORDER } else { fills[owner] };
            img.put_pixel(px as u32, py as u32, color);
            painted = true;
        }
    }

    painted.then_some(img)
}

// Coordinate conversions
pub fn lat_lon_to_tile_pixel(lat: f64, lon: f64, zoom: u8) -> (u32, u32, u32, u32) {
    let lat = lat.clamp(-MAX_LAT, MAX_LAT);
    let n = 2.0_f64.powi(zoom as i32);
    let x_t = ((lon + 180.0) / 360.0 * n).clamp(0.0, n - 1e-9);
    let lat_rad = lat.to_radians();
    let y_t = ((1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0 * n).clamp(0.0, n - 1e-9);

    let tx = x_t as u32;
    let ty = y_t as u32;

    let px = ((x_t - tx as f64) * TILE_SIZE as f64) as u32;
    let py = ((y_t - ty as f64) * TILE_SIZE as f64) as u32;

    (tx, ty, px, py)
}

/// Inverse of `lat_lon_to_tile_pixel`, taking fractional pixel offsets.
pub fn tile_pixel_to_lat_lon(tx: u32, ty: u32, px: f64, py: f64, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);
    let x_t = tx as f64 + px / TILE_SIZE as f64;
    let y_t = ty as f64 + py / TILE_SIZE as f64;
    let lon = x_t / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y_t / n)).sinh().atan().to_degrees();
    (lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InputConfig, MapConfig, OutputConfig};
    use crate::index::tests::square;

    #[test]
    fn origin_maps_to_tile_center() {
        assert_eq!(lat_lon_to_tile_pixel(0.0, 0.0, 0), (0, 0, 128, 128));
        assert_eq!(lat_lon_to_tile_pixel(0.0, 0.0, 1), (1, 1, 0, 0));
    }

    #[test]
    fn inverse_projection_recovers_coordinates() {
        let (tx, ty, px, py) = lat_lon_to_tile_pixel(55.0, -126.0, 7);
        let (lat, lon) = tile_pixel_to_lat_lon(tx, ty, px as f64 + 0.5, py as f64 + 0.5, 7);
        assert!((lat - 55.0).abs() < 0.01, "lat {lat}");
        assert!((lon - (-126.0)).abs() < 0.01, "lon {lon}");
    }

    #[test]
    fn tile_interior_uses_tier_color_and_edges_are_white() {
        let regions = vec![square("Dense", Some(41.0), -127.0, 54.0, 2.0)];
        let index = RegionIndex::build(&regions);
        let fills = vec![Rgba([0x00, 0x80, 0x00, 178])];

        let zoom = 6;
        let (tx, ty, px, py) = lat_lon_to_tile_pixel(55.0, -126.0, zoom);
        let img = render_tile(zoom, tx, ty, &regions, &index, &fills).unwrap();
        assert_eq!(*img.get_pixel(px, py), Rgba([0x00, 0x80, 0x00, 178]));

        // Walk west from the center until leaving the region; the last
        // filled pixel must be border.
        let mut x = px;
        while x > 0 && img.get_pixel(x - 1, py)[3] != 0 {
            x -= 1;
        }
        if x > 0 {
            assert_eq!(*img.get_pixel(x, py), BORDER);
        }
    }

    #[test]
    fn region_edge_on_tile_seam_gets_border() {
        // At zoom 1 the seam between tiles x=0 and x=1 is the prime meridian.
        let regions = vec![square("Seam", Some(12.0), 0.0, 10.0, 10.0)];
        let index = RegionIndex::build(&regions);
        let fills = vec![Rgba([0x95, 0xDC, 0x86, 255])];

        let (tx, ty, px, py) = lat_lon_to_tile_pixel(15.0, 5.0, 1);
        assert_eq!(tx, 1);
        let img = render_tile(1, tx, ty, &regions, &index, &fills).unwrap();

        assert_eq!(*img.get_pixel(0, py), BORDER);
        assert_eq!(*img.get_pixel(px, py), fills[0]);
    }

    #[test]
    fn empty_tiles_are_skipped() {
        let regions = vec![square("Dense", Some(41.0), -127.0, 54.0, 1.0)];
        let index = RegionIndex::build(&regions);
        let fills = vec![Rgba([0, 0, 0, 255])];
        let (tx, ty, _, _) = lat_lon_to_tile_pixel(0.0, 0.0, 6);
        assert!(render_tile(6, tx, ty, &regions, &index, &fills).is_none());
    }

    #[test]
    fn writes_tiles_to_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let config = AppConfig {
            input: InputConfig {
                regions: "unused.geojson".into(),
                name_property: "POPULATION_NAME".into(),
                density_property: "EST_POP_DENSITY_2018".into(),
            },
            output: OutputConfig { dir: dir.clone() },
            map: MapConfig { min_zoom: 3, max_zoom: 4, fill_opacity: 1.0, ..MapConfig::default() },
            chart: Default::default(),
            server: Default::default(),
        };
        let regions = vec![square("Dense", Some(35.0), -127.0, 54.0, 2.0)];

        let saved = generate_tiles(&config, &regions).unwrap();
        assert!(saved >= 2);

        let (tx, ty, px, py) = lat_lon_to_tile_pixel(55.0, -126.0, 4);
        let path = dir.join("tiles").join("4").join(tx.to_string()).join(format!("{ty}.png"));
        let img = image::open(&path).unwrap().to_rgba8();
        let [r, g, b] = hex_to_rgb(classify(35.0));
        assert_eq!(*img.get_pixel(px, py), Rgba([r, g, b, 255]));
    }
}
