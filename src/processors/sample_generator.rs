use crate::models::{Feature, FeatureCollection, SpatialRef};
use crate::utils::constants::{SAMPLE_BUFFER_RADIUS_DEG, SAMPLE_BUFFER_SEGMENTS};
use geo_types::{LineString, Polygon};
use std::f64::consts::PI;

/// Placeholder readings as (latitude, longitude, change °C)
pub const SAMPLE_POINTS: [(f64, f64, f64); 15] = [
    (60.0, -100.0, -2.5), // Northern Canada
    (45.0, -75.0, 1.8),   // Eastern US/Canada
    (40.0, -74.0, 2.1),   // New York
    (35.0, -118.0, 3.2),  // Los Angeles
    (25.0, -80.0, 2.8),   // Florida
    (60.0, 10.0, 1.5),    // Scandinavia
    (50.0, 0.0, 2.0),     // UK/Northern France
    (40.0, 15.0, 2.8),    // Southern Europe
    (35.0, 140.0, 2.3),   // Japan
    (22.0, 114.0, 3.1),   // Hong Kong
    (-35.0, 151.0, 2.6),  // Sydney
    (0.0, 0.0, 1.2),      // Equatorial Africa
    (-20.0, -50.0, 1.8),  // Brazil
    (70.0, -150.0, -1.8), // Northern Alaska
    (-60.0, 0.0, -0.5),   // Antarctica
];

/// Builds the fixed placeholder collection used when no real rasters can be read.
/// The output never depends on which period asked for it.
pub struct SampleGenerator {
    radius: f64,
    segments: usize,
}

impl SampleGenerator {
    pub fn new() -> Self {
        Self {
            radius: SAMPLE_BUFFER_RADIUS_DEG,
            segments: SAMPLE_BUFFER_SEGMENTS,
        }
    }

    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments.max(3);
        self
    }

    pub fn features(&self) -> Vec<Feature> {
        SAMPLE_POINTS
            .iter()
            .map(|&(lat, lon, change)| Feature::new(self.buffer(lon, lat), change))
            .collect()
    }

    /// Placeholder collection in geographic coordinates (EPSG:4326)
    pub fn collection(&self, name: &str) -> FeatureCollection {
        FeatureCollection::new(name, SpatialRef::wgs84()).with_features(self.features())
    }

    /// Circle around (x, y), counter-clockwise from due east
    pub fn buffer(&self, x: f64, y: f64) -> Polygon<f64> {
        let ring: Vec<(f64, f64)> = (0..self.segments)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 / self.segments as f64;
                (x + self.radius * angle.cos(), y + self.radius * angle.sin())
            })
            .collect();

        Polygon::new(LineString::from(ring), Vec::new())
    }
}

impl Default for SampleGenerator {
    fn default() -> Self {
        Self::new()
    }
}
