use geo::MultiPolygon;

/// One population unit of the dataset.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    // Bears per 1000 km². None when the feature carried no usable value.
    pub density: Option<f64>,
    pub geometry: MultiPolygon<f64>,
}
