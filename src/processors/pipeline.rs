use crate::error::Result;
use crate::models::{FeatureCollection, PeriodDescriptor, PipelineConfig, RasterGrid};
use crate::processors::change_calculator::{apply_baseline, ValueKind};
use crate::processors::polygonizer::{Connectivity, Polygonizer};
use crate::processors::sample_generator::SampleGenerator;
use crate::readers::{any_inputs_exist, inputs_exist, missing_files, LoadOutcome, TemperatureLoader};
use crate::utils::filename::collection_name;
use crate::utils::progress::ProgressReporter;
use crate::writers::GeoJsonWriter;
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Which of the four per-period branches was taken
#[derive(Debug, Clone, PartialEq)]
pub enum PeriodOutcome {
    /// Real rasters, no baseline: the property holds the period average
    RealAverage,
    /// Real rasters minus the baseline
    RealChange,
    /// Inputs present but unreadable; placeholder written instead
    LoadFailed { reason: String },
    /// One or both inputs absent; placeholder written instead
    InputsMissing { missing: Vec<String> },
}

impl PeriodOutcome {
    pub fn is_real(&self) -> bool {
        matches!(self, PeriodOutcome::RealAverage | PeriodOutcome::RealChange)
    }

    pub fn used_samples(&self) -> bool {
        !self.is_real()
    }
}

impl fmt::Display for PeriodOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodOutcome::RealAverage => write!(f, "real data ({})", ValueKind::Average),
            PeriodOutcome::RealChange => write!(f, "real data ({})", ValueKind::Change),
            PeriodOutcome::LoadFailed { reason } => write!(f, "sample data (load failed: {})", reason),
            PeriodOutcome::InputsMissing { missing } => {
                write!(f, "sample data (missing: {})", missing.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PeriodReport {
    pub label: String,
    pub outcome: PeriodOutcome,
    pub feature_count: usize,
    pub output_path: PathBuf,
    pub written: bool,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub output_dir: PathBuf,
    pub baseline_loaded: bool,
    pub dry_run: bool,
    pub periods: Vec<PeriodReport>,
}

impl RunSummary {
    pub fn real_count(&self) -> usize {
        self.periods.iter().filter(|p| p.outcome.is_real()).count()
    }

    pub fn sample_count(&self) -> usize {
        self.periods.iter().filter(|p| p.outcome.used_samples()).count()
    }

    pub fn total_features(&self) -> usize {
        self.periods.iter().map(|p| p.feature_count).sum()
    }

    pub fn written_count(&self) -> usize {
        self.periods.iter().filter(|p| p.written).count()
    }

    pub fn summary(&self) -> String {
        let elapsed = self.finished_at - self.started_at;
        let mut lines = vec![
            "Run Summary:".to_string(),
            format!("- Started: {}", self.started_at.format("%Y-%m-%d %H:%M:%S UTC")),
            format!("- Duration: {} ms", elapsed.num_milliseconds()),
            format!("- Output directory: {}", self.output_dir.display()),
            format!(
                "- Baseline: {}",
                if self.baseline_loaded { "applied" } else { "none" }
            ),
            format!(
                "- Periods: {} ({} real, {} sample)",
                self.periods.len(),
                self.real_count(),
                self.sample_count()
            ),
            format!("- Features: {}", self.total_features()),
        ];

        for report in &self.periods {
            lines.push(format!(
                "  {}: {} features, {} -> {}{}",
                report.label,
                report.feature_count,
                report.outcome,
                report.output_path.display(),
                if report.written { "" } else { " (not written)" }
            ));
        }

        if self.dry_run {
            lines.push("Dry run - no files were written".to_string());
        }

        lines.join("\n")
    }
}

/// Runs every configured period through resolve, load, difference and vectorize
pub struct Pipeline {
    config: PipelineConfig,
    loader: TemperatureLoader,
    polygonizer: Polygonizer,
    sampler: SampleGenerator,
    writer: GeoJsonWriter,
    dry_run: bool,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let loader = TemperatureLoader::new()
            .with_mmap(config.use_mmap)
            .with_nodata_policy(config.nodata_policy)
            .with_scale_divisor(config.scale_divisor);
        let writer = GeoJsonWriter::new().with_pretty(config.pretty);

        Self {
            config,
            loader,
            polygonizer: Polygonizer::new(),
            sampler: SampleGenerator::new(),
            writer,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.polygonizer = Polygonizer::with_connectivity(connectivity);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process all periods in order. Missing or unreadable inputs fall back to
    /// placeholder output; only baseline shape mismatches and write failures abort.
    pub fn run(&self, progress: Option<&ProgressReporter>) -> Result<RunSummary> {
        let started_at = Utc::now();
        let output_dir = self.config.output_dir.clone();

        if !self.dry_run {
            fs::create_dir_all(&output_dir)?;
        }
        info!("Output directory: {}", output_dir.display());

        let real_data_available = any_inputs_exist(&self.config);
        if !real_data_available {
            warn!("No TIFF files found. Creating sample data instead.");
            warn!("To use real data, place WorldClim TIFF files in the data directory.");
            if let Some(p) = progress {
                p.println("WARNING: No TIFF files found. Creating sample data instead.");
            }
        }

        let baseline = if real_data_available {
            self.load_baseline()
        } else {
            None
        };

        let mut periods = Vec::with_capacity(self.config.periods.len());
        for period in &self.config.periods {
            if let Some(p) = progress {
                p.set_message(&format!("Processing {}...", period.label));
            }

            let report = self.process_period(period, baseline.as_ref())?;

            if let Some(p) = progress {
                p.println(&format!(
                    "  {} -> {} ({} features)",
                    report.label,
                    report.output_path.display(),
                    report.feature_count
                ));
                p.increment(1);
            }
            periods.push(report);
        }

        if let Some(p) = progress {
            p.finish_with_message("Processing complete!");
        }
        info!(
            "Processing complete! Generated {} temperature change files in {}",
            periods.iter().filter(|r| r.written).count(),
            output_dir.display()
        );

        Ok(RunSummary {
            started_at,
            finished_at: Utc::now(),
            output_dir,
            baseline_loaded: baseline.is_some(),
            dry_run: self.dry_run,
            periods,
        })
    }

    /// The baseline is optional in every sense: unconfigured, absent or
    /// unreadable all mean "no differencing".
    pub fn load_baseline(&self) -> Option<RasterGrid> {
        let baseline = self.config.baseline.as_ref()?;
        let data_dir = &self.config.data_dir;

        if !inputs_exist(baseline, data_dir) {
            warn!(
                "Baseline {} files not found: {}",
                baseline.label,
                missing_files(baseline, data_dir).join(", ")
            );
            return None;
        }

        info!("Loading baseline {}...", baseline.label);
        match self
            .loader
            .load_average(&baseline.min_path(data_dir), &baseline.max_path(data_dir))
        {
            LoadOutcome::Loaded(grid) => Some(grid),
            LoadOutcome::Failed { reason } => {
                warn!("Baseline {} unavailable: {}", baseline.label, reason);
                None
            }
        }
    }

    /// Build and write one period's collection
    pub fn process_period(
        &self,
        period: &PeriodDescriptor,
        baseline: Option<&RasterGrid>,
    ) -> Result<PeriodReport> {
        info!("Processing {}...", period.label);

        let (collection, outcome) = self.build_collection(period, baseline)?;
        let output_path = period.output_path(&self.config.output_dir);

        if !self.dry_run {
            self.writer.write(&collection, &output_path)?;
            info!("Saved {}", output_path.display());
        }

        Ok(PeriodReport {
            label: period.label.clone(),
            outcome,
            feature_count: collection.len(),
            output_path,
            written: !self.dry_run,
        })
    }

    /// Pick the branch for a period and produce its features without touching disk
    pub fn build_collection(
        &self,
        period: &PeriodDescriptor,
        baseline: Option<&RasterGrid>,
    ) -> Result<(FeatureCollection, PeriodOutcome)> {
        let name = collection_name(&period.label);
        let data_dir = &self.config.data_dir;

        if !inputs_exist(period, data_dir) {
            let missing = missing_files(period, data_dir);
            info!("Files not found: {}", missing.join(", "));
            info!("Using sample data instead");
            let collection = self.sampler.collection(&name);
            return Ok((collection, PeriodOutcome::InputsMissing { missing }));
        }

        let derived = match self
            .loader
            .load_average(&period.min_path(data_dir), &period.max_path(data_dir))
        {
            LoadOutcome::Loaded(grid) => grid,
            LoadOutcome::Failed { reason } => {
                warn!("Failed to load real data, using sample data instead");
                let collection = self.sampler.collection(&name);
                return Ok((collection, PeriodOutcome::LoadFailed { reason }));
            }
        };

        let (output, kind) = apply_baseline(derived, baseline)?;
        debug!(
            "{} grid {}x{}, {} valid cells, range {:?}",
            kind,
            output.rows(),
            output.cols(),
            output.valid_count(),
            output.value_range()
        );

        let features = self.polygonizer.to_features(&output);
        let collection = FeatureCollection::new(&name, output.spatial_ref()).with_features(features);
        let outcome = match kind {
            ValueKind::Average => PeriodOutcome::RealAverage,
            ValueKind::Change => PeriodOutcome::RealChange,
        };

        Ok((collection, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use crate::models::{GeoTransform, SpatialRef};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> PipelineConfig {
        PipelineConfig::default()
            .with_data_dir(dir.path().join("data"))
            .with_output_dir(dir.path().join("out"))
    }

    #[test]
    fn test_missing_inputs_write_samples_for_every_period() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(config_in(&dir));

        let summary = pipeline.run(None).unwrap();

        assert_eq!(summary.periods.len(), 4);
        assert_eq!(summary.sample_count(), 4);
        assert_eq!(summary.total_features(), 60);
        assert!(!summary.baseline_loaded);

        for report in &summary.periods {
            assert!(report.output_path.exists());
            assert!(matches!(report.outcome, PeriodOutcome::InputsMissing { .. }));
        }
        assert!(dir
            .path()
            .join("out/avg_temp_change_2021-2040.json")
            .exists());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(config_in(&dir)).with_dry_run(true);

        let summary = pipeline.run(None).unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.written_count(), 0);
        assert!(!dir.path().join("out").exists());
        assert!(summary.summary().contains("Dry run"));
    }

    #[test]
    fn test_unreadable_inputs_fall_back() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(data_dir.join("min.tif"), b"not a tiff").unwrap();
        fs::write(data_dir.join("max.tif"), b"not a tiff").unwrap();

        let period = PeriodDescriptor::new("2041-2060", "min.tif", "max.tif");
        let pipeline = Pipeline::new(config_in(&dir).with_periods(vec![period.clone()]));

        let (collection, outcome) = pipeline.build_collection(&period, None).unwrap();

        assert!(matches!(outcome, PeriodOutcome::LoadFailed { .. }));
        assert_eq!(collection.len(), 15);
        assert_eq!(collection.name, "avg_temp_change_2041-2060");
        assert_eq!(collection.spatial_ref, SpatialRef::wgs84());
    }

    #[test]
    fn test_unconfigured_baseline_is_none() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(config_in(&dir));
        assert!(pipeline.load_baseline().is_none());
    }

    #[test]
    fn test_absent_baseline_files_is_none() {
        let dir = TempDir::new().unwrap();
        let baseline = PeriodDescriptor::new("1970-2000", "bmin.tif", "bmax.tif");
        let pipeline = Pipeline::new(config_in(&dir).with_baseline(Some(baseline)));
        assert!(pipeline.load_baseline().is_none());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(
            PeriodOutcome::RealChange.to_string(),
            "real data (temperature change)"
        );
        let missing = PeriodOutcome::InputsMissing {
            missing: vec!["a.tif".to_string(), "b.tif".to_string()],
        };
        assert_eq!(missing.to_string(), "sample data (missing: a.tif, b.tif)");
        assert!(missing.used_samples());
    }

    #[test]
    fn test_summary_counts() {
        let now = Utc::now();
        let report = |label: &str, outcome: PeriodOutcome, count: usize| PeriodReport {
            label: label.to_string(),
            outcome,
            feature_count: count,
            output_path: PathBuf::from(format!("out/{}.json", label)),
            written: true,
        };
        let summary = RunSummary {
            started_at: now,
            finished_at: now,
            output_dir: PathBuf::from("out"),
            baseline_loaded: true,
            dry_run: false,
            periods: vec![
                report("a", PeriodOutcome::RealChange, 3),
                report(
                    "b",
                    PeriodOutcome::LoadFailed {
                        reason: "bad".to_string(),
                    },
                    15,
                ),
            ],
        };

        assert_eq!(summary.real_count(), 1);
        assert_eq!(summary.sample_count(), 1);
        assert_eq!(summary.total_features(), 18);
        assert!(summary.summary().contains("Baseline: applied"));
    }

    #[test]
    fn test_baseline_shape_mismatch_aborts() {
        let baseline = RasterGrid::filled(10.0, 2, 2, GeoTransform::default(), SpatialRef::wgs84()).unwrap();
        let derived = RasterGrid::filled(15.0, 3, 3, GeoTransform::default(), SpatialRef::wgs84()).unwrap();

        let result = apply_baseline(derived, Some(&baseline));
        assert!(matches!(result, Err(ProcessingError::DimensionMismatch { .. })));
    }
}
