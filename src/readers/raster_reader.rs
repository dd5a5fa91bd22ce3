use crate::error::{ProcessingError, Result};
use crate::models::{GeoTransform, SpatialRef};
use crate::utils::constants::{
    DEFAULT_BUFFER_SIZE, GEOKEY_GEOGRAPHIC_TYPE, GEOKEY_MODEL_TYPE, GEOKEY_PROJECTED_CS_TYPE,
    GEOKEY_USER_DEFINED, MODEL_TYPE_GEOGRAPHIC, MODEL_TYPE_PROJECTED,
};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, warn};

const GEOKEY_RASTER_TYPE: u16 = 1025;
const RASTER_PIXEL_IS_POINT: u16 = 2;

/// Band 1 of a GeoTIFF as f32, with the georeferencing needed downstream.
/// Nodata cells still hold the raw sentinel; masking is the caller's decision.
#[derive(Debug, Clone)]
pub struct RasterBand {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
    pub transform: GeoTransform,
    pub spatial_ref: SpatialRef,
    pub nodata: Option<f64>,
}

impl RasterBand {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Replace every cell equal to `sentinel` with NaN
    pub fn mask_value(&mut self, sentinel: f64) {
        if sentinel.is_nan() {
            return;
        }
        let sentinel = sentinel as f32;
        for value in self.data.iter_mut() {
            if *value == sentinel {
                *value = f32::NAN;
            }
        }
    }

    /// Minimum and maximum ignoring non-finite cells and the declared nodata value
    pub fn value_range(&self) -> Option<(f32, f32)> {
        let sentinel = self.nodata.map(|nd| nd as f32);
        self.data
            .iter()
            .filter(|v| v.is_finite() && Some(**v) != sentinel)
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

pub struct RasterReader {
    use_mmap: bool,
}

impl RasterReader {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    pub fn with_mmap(use_mmap: bool) -> Self {
        Self { use_mmap }
    }

    /// Read band 1 of a GeoTIFF. The file handle is closed before returning.
    pub fn read_band(&self, path: &Path) -> Result<RasterBand> {
        if self.use_mmap {
            self.read_band_mmap(path)
        } else {
            self.read_band_buffered(path)
        }
    }

    fn read_band_buffered(&self, path: &Path) -> Result<RasterBand> {
        let file = File::open(path)?;
        let reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
        decode_band(reader)
    }

    fn read_band_mmap(&self, path: &Path) -> Result<RasterBand> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        decode_band(Cursor::new(&mmap[..]))
    }
}

impl Default for RasterReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode band 1 from any `Read + Seek` source
pub fn decode_band<R: Read + Seek>(reader: R) -> Result<RasterBand> {
    let mut decoder = Decoder::new(reader)?;

    let (width, height) = decoder.dimensions()?;
    let cols = width as usize;
    let rows = height as usize;

    if rows == 0 || cols == 0 {
        return Err(ProcessingError::InvalidFormat(format!(
            "Raster has invalid dimensions: {}x{}",
            cols, rows
        )));
    }

    let samples = decoding_result_to_f32(decoder.read_image()?)?;
    let data = first_sample(samples, rows * cols)?;

    let geokeys = decoder
        .get_tag_u16_vec(Tag::GeoKeyDirectoryTag)
        .ok()
        .map(|raw| GeoKeys::parse(&raw))
        .unwrap_or_default();

    let transform = match read_transform(&mut decoder) {
        Some(transform) if geokeys.pixel_is_point() => shift_to_corner(transform),
        Some(transform) => transform,
        None => {
            warn!("Raster has no georeferencing tags, using identity transform");
            GeoTransform::default()
        }
    };

    let nodata = decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|raw| parse_nodata(&raw));

    let spatial_ref = geokeys.spatial_ref();

    debug!(
        "Decoded {}x{} band, transform [{}], reference {}, nodata {:?}",
        cols, rows, transform, spatial_ref, nodata
    );

    Ok(RasterBand {
        rows,
        cols,
        data,
        transform,
        spatial_ref,
        nodata,
    })
}

fn decoding_result_to_f32(result: DecodingResult) -> Result<Vec<f32>> {
    let values = match result {
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(ProcessingError::UnsupportedSampleFormat(
                "unrecognised TIFF sample type".to_string(),
            ))
        }
    };
    Ok(values)
}

/// Chunky multi-sample images are de-interleaved to their first sample
fn first_sample(samples: Vec<f32>, cells: usize) -> Result<Vec<f32>> {
    if samples.len() == cells {
        return Ok(samples);
    }

    if samples.len() < cells || samples.len() % cells != 0 {
        return Err(ProcessingError::InvalidFormat(format!(
            "Decoded {} samples for {} cells",
            samples.len(),
            cells
        )));
    }

    let stride = samples.len() / cells;
    Ok(samples.into_iter().step_by(stride).collect())
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    if let (Ok(scale), Ok(tiepoint)) = (
        decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag),
        decoder.get_tag_f64_vec(Tag::ModelTiepointTag),
    ) {
        if scale.len() >= 2 && tiepoint.len() >= 6 {
            // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            return Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
        }
    }

    // 4x4 row-major model transformation matrix
    if let Ok(matrix) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if matrix.len() >= 8 {
            return Some(GeoTransform::from_gdal([
                matrix[3], matrix[0], matrix[1], matrix[7], matrix[4], matrix[5],
            ]));
        }
    }

    None
}

/// PixelIsPoint tiepoints reference cell centres; move the origin to the corner
fn shift_to_corner(transform: GeoTransform) -> GeoTransform {
    GeoTransform {
        origin_x: transform.origin_x - 0.5 * transform.pixel_width - 0.5 * transform.row_rotation,
        origin_y: transform.origin_y - 0.5 * transform.col_rotation - 0.5 * transform.pixel_height,
        ..transform
    }
}

/// GDAL writes the sentinel as ASCII, sometimes NUL-terminated
fn parse_nodata(raw: &str) -> Option<f64> {
    raw.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .parse::<f64>()
        .ok()
}

/// The short-valued keys of a GeoKeyDirectory
#[derive(Debug, Default, Clone, PartialEq)]
struct GeoKeys {
    entries: Vec<(u16, u16)>,
}

impl GeoKeys {
    /// Layout: header `[version, revision, minor, count]` then `count` x `[key, location, count, value]`.
    /// Only keys stored inline (location 0) are kept.
    fn parse(raw: &[u16]) -> Self {
        if raw.len() < 4 {
            return Self::default();
        }

        let declared = raw[3] as usize;
        let entries = raw[4..]
            .chunks_exact(4)
            .take(declared)
            .filter(|entry| entry[1] == 0)
            .map(|entry| (entry[0], entry[3]))
            .collect();

        Self { entries }
    }

    fn get(&self, key: u16) -> Option<u16> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| *value)
    }

    fn pixel_is_point(&self) -> bool {
        self.get(GEOKEY_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT)
    }

    fn spatial_ref(&self) -> SpatialRef {
        let projected = self.get(GEOKEY_PROJECTED_CS_TYPE);
        let geographic = self.get(GEOKEY_GEOGRAPHIC_TYPE);

        let code = match self.get(GEOKEY_MODEL_TYPE) {
            Some(MODEL_TYPE_PROJECTED) => projected,
            Some(MODEL_TYPE_GEOGRAPHIC) => geographic,
            _ => projected.or(geographic),
        };

        match code {
            Some(code) if code != GEOKEY_USER_DEFINED && code != 0 => {
                SpatialRef::from_epsg(u32::from(code))
            }
            _ => SpatialRef::unknown(),
        }
    }
}
