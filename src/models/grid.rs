use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{EPSG_WGS84, TRANSFORM_TOLERANCE};

/// Affine mapping from cell (col, row) corners to world coordinates:
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
/// North-up rasters have zero rotation and a negative `pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Build from GDAL ordering `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self {
            origin_x: coeffs[0],
            pixel_width: coeffs[1],
            row_rotation: coeffs[2],
            origin_y: coeffs[3],
            col_rotation: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// World coordinates of a cell corner. `col`/`row` may equal the grid width/height.
    pub fn corner_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        let col_f = col as f64;
        let row_f = row as f64;

        let x = self.origin_x + col_f * self.pixel_width + row_f * self.row_rotation;
        let y = self.origin_y + col_f * self.col_rotation + row_f * self.pixel_height;

        (x, y)
    }

    /// Coefficient-wise comparison used for the co-registration check
    pub fn approx_eq(&self, other: &GeoTransform) -> bool {
        self.to_gdal()
            .iter()
            .zip(other.to_gdal().iter())
            .all(|(a, b)| (a - b).abs() <= TRANSFORM_TOLERANCE * a.abs().max(b.abs()).max(1.0))
    }

    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let corners = [
            self.corner_to_geo(0, 0),
            self.corner_to_geo(width, 0),
            self.corner_to_geo(0, height),
            self.corner_to_geo(width, height),
        ];

        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), &(x, y)| {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            },
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

impl fmt::Display for GeoTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "origin=({}, {}) pixel=({}, {}) rotation=({}, {})",
            self.origin_x,
            self.origin_y,
            self.pixel_width,
            self.pixel_height,
            self.row_rotation,
            self.col_rotation
        )
    }
}

/// Coordinate reference system as far as GeoTIFF keys can tell us
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpatialRef {
    epsg: Option<u32>,
}

impl SpatialRef {
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: Some(code) }
    }

    pub fn wgs84() -> Self {
        Self::from_epsg(EPSG_WGS84)
    }

    pub fn unknown() -> Self {
        Self { epsg: None }
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Name used in the GeoJSON `crs` member, `None` when the reference is unknown
    pub fn ogc_urn(&self) -> Option<String> {
        match self.epsg {
            Some(EPSG_WGS84) => Some("urn:ogc:def:crs:OGC:1.3:CRS84".to_string()),
            Some(code) => Some(format!("urn:ogc:def:crs:EPSG::{}", code)),
            None => None,
        }
    }

    pub fn identifier(&self) -> String {
        match self.epsg {
            Some(code) => format!("EPSG:{}", code),
            None => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for SpatialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Row-major f32 grid. Cells without valid data hold NaN; infinities are never valid either.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
    transform: GeoTransform,
    spatial_ref: SpatialRef,
}

impl RasterGrid {
    pub fn new(
        data: Vec<f32>,
        rows: usize,
        cols: usize,
        transform: GeoTransform,
        spatial_ref: SpatialRef,
    ) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(ProcessingError::InvalidFormat(format!(
                "Grid must not be empty, got {}x{}",
                rows, cols
            )));
        }

        if data.len() != rows * cols {
            return Err(ProcessingError::InvalidFormat(format!(
                "Grid holds {} cells but {}x{} were declared",
                data.len(),
                rows,
                cols
            )));
        }

        Ok(Self {
            rows,
            cols,
            data,
            transform,
            spatial_ref,
        })
    }

    /// Grid with every cell set to `value`
    pub fn filled(
        value: f32,
        rows: usize,
        cols: usize,
        transform: GeoTransform,
        spatial_ref: SpatialRef,
    ) -> Result<Self> {
        Self::new(vec![value; rows * cols], rows, cols, transform, spatial_ref)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn spatial_ref(&self) -> SpatialRef {
        self.spatial_ref
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.get(row, col).map_or(false, f32::is_finite)
    }

    /// Validity mask of identical shape: `true` wherever the cell is finite
    pub fn valid_mask(&self) -> Vec<bool> {
        self.data.iter().map(|v| v.is_finite()).collect()
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_finite()).count()
    }

    /// Minimum and maximum over valid cells
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn ensure_same_shape(&self, other: &RasterGrid) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(ProcessingError::DimensionMismatch {
                expected_rows: self.rows,
                expected_cols: self.cols,
                actual_rows: other.rows,
                actual_cols: other.cols,
            });
        }
        Ok(())
    }

    /// New grid of the same shape and georeference built cell-wise from `self` and `other`
    pub fn zip_with<F>(&self, other: &RasterGrid, op: F) -> Result<RasterGrid>
    where
        F: Fn(f32, f32) -> f32,
    {
        self.ensure_same_shape(other)?;

        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| op(a, b))
            .collect();

        RasterGrid::new(data, self.rows, self.cols, self.transform, self.spatial_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_corner_mapping() {
        let gt = GeoTransform::new(-180.0, 90.0, 0.5, -0.5);

        let (x, y) = gt.corner_to_geo(2, 4);
        assert_relative_eq!(x, -179.0);
        assert_relative_eq!(y, 88.0);

        let (x, y) = gt.corner_to_geo(0, 0);
        assert_relative_eq!(x, -180.0);
        assert_relative_eq!(y, 90.0);
    }

    #[test]
    fn test_gdal_roundtrip_and_bounds() {
        let coeffs = [10.0, 2.0, 0.0, 50.0, 0.0, -2.0];
        let gt = GeoTransform::from_gdal(coeffs);
        assert_eq!(gt.to_gdal(), coeffs);

        let (min_x, min_y, max_x, max_y) = gt.bounds(5, 10);
        assert_relative_eq!(min_x, 10.0);
        assert_relative_eq!(min_y, 30.0);
        assert_relative_eq!(max_x, 20.0);
        assert_relative_eq!(max_y, 50.0);
    }

    #[test]
    fn test_transform_approx_eq() {
        let a = GeoTransform::new(-180.0, 90.0, 1.0 / 6.0, -1.0 / 6.0);
        let b = GeoTransform::new(-180.0, 90.0, 0.16666666666666666, -0.16666666666666666);
        let c = GeoTransform::new(-179.0, 90.0, 1.0 / 6.0, -1.0 / 6.0);

        assert!(a.approx_eq(&b));
        assert!(!a.approx_eq(&c));
    }

    #[test]
    fn test_spatial_ref_urns() {
        assert_eq!(
            SpatialRef::wgs84().ogc_urn().as_deref(),
            Some("urn:ogc:def:crs:OGC:1.3:CRS84")
        );
        assert_eq!(
            SpatialRef::from_epsg(3035).ogc_urn().as_deref(),
            Some("urn:ogc:def:crs:EPSG::3035")
        );
        assert_eq!(SpatialRef::unknown().ogc_urn(), None);
        assert_eq!(SpatialRef::from_epsg(4326).to_string(), "EPSG:4326");
    }

    #[test]
    fn test_grid_rejects_wrong_length() {
        let result = RasterGrid::new(
            vec![1.0; 5],
            2,
            3,
            GeoTransform::default(),
            SpatialRef::unknown(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_valid_mask_and_range() {
        let grid = RasterGrid::new(
            vec![1.0, f32::NAN, 3.0, -2.0],
            2,
            2,
            GeoTransform::default(),
            SpatialRef::unknown(),
        )
        .unwrap();

        assert_eq!(grid.valid_mask(), vec![true, false, true, true]);
        assert_eq!(grid.valid_count(), 3);
        assert_eq!(grid.value_range(), Some((-2.0, 3.0)));
        assert!(!grid.is_valid(0, 1));
        assert!(!grid.is_valid(5, 5));
    }

    #[test]
    fn test_infinities_are_invalid() {
        let grid = RasterGrid::new(
            vec![f32::NEG_INFINITY, 4.0, f32::INFINITY, f32::NAN],
            2,
            2,
            GeoTransform::default(),
            SpatialRef::unknown(),
        )
        .unwrap();

        assert_eq!(grid.valid_mask(), vec![false, true, false, false]);
        assert_eq!(grid.valid_count(), 1);
        assert_eq!(grid.value_range(), Some((4.0, 4.0)));
        assert!(!grid.is_valid(0, 0));
    }

    #[test]
    fn test_zip_with_checks_shape() {
        let a = RasterGrid::filled(1.0, 2, 2, GeoTransform::default(), SpatialRef::unknown()).unwrap();
        let b = RasterGrid::filled(1.0, 3, 2, GeoTransform::default(), SpatialRef::unknown()).unwrap();

        match a.zip_with(&b, |x, y| x + y) {
            Err(ProcessingError::DimensionMismatch {
                expected_rows,
                actual_rows,
                ..
            }) => {
                assert_eq!(expected_rows, 2);
                assert_eq!(actual_rows, 3);
            }
            other => panic!("expected dimension mismatch, got {:?}", other),
        }
    }
}
