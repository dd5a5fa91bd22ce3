use crate::error::{ProcessingError, Result};
use crate::models::{Feature, FeatureCollection};
use geo_types::LineString;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// GeoJSON FeatureCollection as written to disk, with a GDAL-style named `crs` member
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoJsonFeatureCollection {
    #[serde(rename = "type")]
    pub type_: String,

    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub crs: Option<NamedCrs>,

    pub features: Vec<GeoJsonFeature>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedCrs {
    #[serde(rename = "type")]
    pub type_: String,

    pub properties: CrsName,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrsName {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoJsonFeature {
    #[serde(rename = "type")]
    pub type_: String,

    pub properties: ChangeProperties,

    pub geometry: GeoJsonGeometry,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChangeProperties {
    pub change: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    /// Exterior ring first, then holes; positions are [x, y]
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

impl GeoJsonGeometry {
    pub fn rings(&self) -> &[Vec<[f64; 2]>] {
        match self {
            GeoJsonGeometry::Polygon { coordinates } => coordinates,
        }
    }
}

impl From<&FeatureCollection> for GeoJsonFeatureCollection {
    fn from(collection: &FeatureCollection) -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            name: collection.name.clone(),
            crs: collection.spatial_ref.ogc_urn().map(|name| NamedCrs {
                type_: "name".to_string(),
                properties: CrsName { name },
            }),
            features: collection.iter().map(GeoJsonFeature::from).collect(),
        }
    }
}

impl From<&Feature> for GeoJsonFeature {
    fn from(feature: &Feature) -> Self {
        let polygon = &feature.geometry;
        let coordinates = std::iter::once(polygon.exterior())
            .chain(polygon.interiors().iter())
            .map(ring_positions)
            .collect();

        Self {
            type_: "Feature".to_string(),
            properties: ChangeProperties {
                change: feature.change,
            },
            geometry: GeoJsonGeometry::Polygon { coordinates },
        }
    }
}

fn ring_positions(ring: &LineString<f64>) -> Vec<[f64; 2]> {
    ring.coords().map(|c| [c.x, c.y]).collect()
}

pub struct GeoJsonWriter {
    pretty: bool,
}

impl GeoJsonWriter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Serialize a collection, creating the parent directory if needed
    pub fn write(&self, collection: &FeatureCollection, path: &Path) -> Result<()> {
        if !collection.all_values_finite() {
            return Err(ProcessingError::InvalidFormat(format!(
                "Collection {} contains non-finite values",
                collection.name
            )));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let document = GeoJsonFeatureCollection::from(collection);
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, &document)?;
        } else {
            serde_json::to_writer(&mut writer, &document)?;
        }
        writeln!(writer)?;
        writer.flush()?;

        debug!(
            "Wrote {} features to {}",
            document.features.len(),
            path.display()
        );
        Ok(())
    }

    /// Read back a file written by `write`
    pub fn read(&self, path: &Path) -> Result<GeoJsonFeatureCollection> {
        let file = File::open(path)?;
        let document = serde_json::from_reader(BufReader::new(file))?;
        Ok(document)
    }
}

impl Default for GeoJsonWriter {
    fn default() -> Self {
        Self::new()
    }
}
