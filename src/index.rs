use crate::types::Region;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};

// Bounding box of one region, pointing back into the region slice.
pub struct RegionEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// R-tree over region bounding boxes. Lookups refine candidates with an
/// exact point-in-polygon test.
pub struct RegionIndex {
    tree: RTree<RegionEnvelope>,
}

impl RegionIndex {
    pub fn build(regions: &[Region]) -> Self {
        let items: Vec<RegionEnvelope> = regions.iter().enumerate().filter_map(|(i, region)| {
            let rect = region.geometry.bounding_rect()?;
            Some(RegionEnvelope {
                index: i,
                aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            })
        }).collect();

        Self { tree: RTree::bulk_load(items) }
    }

    /// Index of the first region (in dataset order) containing the point.
    pub fn locate(&self, regions: &[Region], lon: f64, lat: f64) -> Option<usize> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|candidate| candidate.index)
            .filter(|&i| regions.get(i).is_some_and(|r| r.geometry.contains(&point)))
            .min()
    }

    /// Union of all region bounds as `(min_lon, min_lat, max_lon, max_lat)`.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        if self.tree.size() == 0 {
            return None;
        }
        let env = self.tree.root().envelope();
        let [min_x, min_y] = env.lower();
        let [max_x, max_y] = env.upper();
        Some((min_x, min_y, max_x, max_y))
    }
}
