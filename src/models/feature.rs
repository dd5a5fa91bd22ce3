use geo_types::Polygon;

use crate::models::SpatialRef;

/// A polygon tagged with a temperature (or temperature change) in °C
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Polygon<f64>,
    pub change: f64,
}

impl Feature {
    pub fn new(geometry: Polygon<f64>, change: f64) -> Self {
        Self { geometry, change }
    }
}

/// Ordered features sharing one spatial reference; the unit written per period
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    pub name: String,
    pub spatial_ref: SpatialRef,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(name: &str, spatial_ref: SpatialRef) -> Self {
        Self {
            name: name.to_string(),
            spatial_ref,
            features: Vec::new(),
        }
    }

    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features.extend(features);
        self
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Every property is finite
    pub fn all_values_finite(&self) -> bool {
        self.features.iter().all(|f| f.change.is_finite())
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
