use crate::error::{ProcessingError, Result};
use crate::models::{NodataPolicy, RasterGrid};
use crate::readers::raster_reader::{RasterBand, RasterReader};
use crate::utils::constants::DEFAULT_SCALE_DIVISOR;
use crate::utils::filename::display_name;
use std::path::Path;
use tracing::{debug, error, info};

/// Result of trying to turn a tmin/tmax pair into an average-temperature grid
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded(RasterGrid),
    Failed { reason: String },
}

/// Loads WorldClim-style tmin/tmax rasters and averages them into °C
pub struct TemperatureLoader {
    reader: RasterReader,
    nodata_policy: NodataPolicy,
    scale_divisor: f32,
}

impl TemperatureLoader {
    pub fn new() -> Self {
        Self {
            reader: RasterReader::new(),
            nodata_policy: NodataPolicy::default(),
            scale_divisor: DEFAULT_SCALE_DIVISOR,
        }
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.reader = RasterReader::with_mmap(use_mmap);
        self
    }

    pub fn with_nodata_policy(mut self, policy: NodataPolicy) -> Self {
        self.nodata_policy = policy;
        self
    }

    pub fn with_scale_divisor(mut self, divisor: f32) -> Self {
        self.scale_divisor = divisor;
        self
    }

    /// Load and average a tmin/tmax pair. Every failure is logged and reported
    /// as `LoadOutcome::Failed`; nothing here aborts the run.
    pub fn load_average(&self, min_path: &Path, max_path: &Path) -> LoadOutcome {
        match self.try_load_average(min_path, max_path) {
            Ok(grid) => LoadOutcome::Loaded(grid),
            Err(e) => {
                let reason = match e {
                    ProcessingError::Io(_)
                    | ProcessingError::Tiff(_)
                    | ProcessingError::InvalidFormat(_)
                    | ProcessingError::UnsupportedSampleFormat(_) => {
                        error!("Cannot read TIFF files - {}", e);
                        error!("This usually means the files are corrupted or incompatible.");
                        format!("unreadable raster: {}", e)
                    }
                    ProcessingError::DimensionMismatch { .. }
                    | ProcessingError::TransformMismatch { .. } => {
                        error!("tmin/tmax rasters are not co-registered - {}", e);
                        format!("rasters not co-registered: {}", e)
                    }
                    other => {
                        error!("Unexpected error - {}", other);
                        other.to_string()
                    }
                };
                LoadOutcome::Failed { reason }
            }
        }
    }

    fn try_load_average(&self, min_path: &Path, max_path: &Path) -> Result<RasterGrid> {
        let mut tmin = self
            .reader
            .read_band(min_path)
            .map_err(|e| with_file_context(e, min_path))?;
        info!("Successfully opened {}", display_name(min_path));

        let mut tmax = self
            .reader
            .read_band(max_path)
            .map_err(|e| with_file_context(e, max_path))?;
        info!("Successfully opened {}", display_name(max_path));

        check_coregistered(&tmin, &tmax, min_path, max_path)?;
        self.apply_nodata(&mut tmin, &mut tmax);

        let data: Vec<f32> = tmin
            .data
            .iter()
            .zip(tmax.data.iter())
            .map(|(&lo, &hi)| (lo + hi) / 2.0 / self.scale_divisor)
            .collect();

        let grid = RasterGrid::new(data, tmin.rows, tmin.cols, tmin.transform, tmin.spatial_ref)?;

        debug!(
            "Derived {}x{} grid with {} valid cells, range {:?}",
            grid.rows(),
            grid.cols(),
            grid.valid_count(),
            grid.value_range()
        );

        Ok(grid)
    }

    fn apply_nodata(&self, tmin: &mut RasterBand, tmax: &mut RasterBand) {
        match self.nodata_policy {
            NodataPolicy::Legacy => {
                if let Some(nodata) = tmin.nodata {
                    tmin.mask_value(nodata);
                    tmax.mask_value(nodata);
                }
            }
            NodataPolicy::PerBand => {
                if let Some(nodata) = tmin.nodata {
                    tmin.mask_value(nodata);
                }
                if let Some(nodata) = tmax.nodata {
                    tmax.mask_value(nodata);
                }
            }
        }
    }
}

impl Default for TemperatureLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Both rasters must share shape, transform and (when declared) spatial reference
fn check_coregistered(
    tmin: &RasterBand,
    tmax: &RasterBand,
    min_path: &Path,
    max_path: &Path,
) -> Result<()> {
    if tmin.shape() != tmax.shape() {
        return Err(ProcessingError::DimensionMismatch {
            expected_rows: tmin.rows,
            expected_cols: tmin.cols,
            actual_rows: tmax.rows,
            actual_cols: tmax.cols,
        });
    }

    let refs_differ = tmin.spatial_ref.epsg().is_some()
        && tmax.spatial_ref.epsg().is_some()
        && tmin.spatial_ref != tmax.spatial_ref;

    if !tmin.transform.approx_eq(&tmax.transform) || refs_differ {
        return Err(ProcessingError::TransformMismatch {
            first: format!(
                "{} ({}, {})",
                display_name(min_path),
                tmin.transform,
                tmin.spatial_ref
            ),
            second: format!(
                "{} ({}, {})",
                display_name(max_path),
                tmax.transform,
                tmax.spatial_ref
            ),
        });
    }

    Ok(())
}

fn with_file_context(err: ProcessingError, path: &Path) -> ProcessingError {
    match err {
        ProcessingError::Io(io) => ProcessingError::Io(std::io::Error::new(
            io.kind(),
            format!("{}: {}", display_name(path), io),
        )),
        ProcessingError::Tiff(tiff) => {
            ProcessingError::InvalidFormat(format!("{}: {}", display_name(path), tiff))
        }
        other => other,
    }
}
