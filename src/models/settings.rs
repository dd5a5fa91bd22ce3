use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use validator::{Validate, ValidationError};

use crate::error::Result;
use crate::models::PeriodDescriptor;
use crate::utils::constants::{
    DEFAULT_GCM, DEFAULT_OUTPUT_DIR, DEFAULT_PERIOD_LABELS, DEFAULT_SCALE_DIVISOR, DEFAULT_SSP,
    ENV_PREFIX,
};

/// How declared nodata sentinels are applied to the tmin/tmax pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodataPolicy {
    /// Each raster is masked with its own declared sentinel
    #[default]
    PerBand,
    /// The tmin sentinel is applied to both rasters; tmax's own sentinel is ignored
    Legacy,
}

/// Everything the pipeline needs for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_unique_labels"))]
pub struct PipelineConfig {
    #[validate(length(min = 1), nested)]
    pub periods: Vec<PeriodDescriptor>,

    pub data_dir: PathBuf,

    pub output_dir: PathBuf,

    #[validate(nested)]
    pub baseline: Option<PeriodDescriptor>,

    #[validate(range(exclusive_min = 0.0))]
    pub scale_divisor: f32,

    pub nodata_policy: NodataPolicy,

    pub use_mmap: bool,

    pub pretty: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            periods: DEFAULT_PERIOD_LABELS
                .iter()
                .map(|label| PeriodDescriptor::worldclim(label, DEFAULT_GCM, DEFAULT_SSP))
                .collect(),
            data_dir: PathBuf::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            baseline: None,
            scale_divisor: DEFAULT_SCALE_DIVISOR,
            nodata_policy: NodataPolicy::default(),
            use_mmap: false,
            pretty: false,
        }
    }
}

impl PipelineConfig {
    /// Layer built-in defaults, an optional config file and `CLIMVEC_*` environment variables
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&PipelineConfig::default())?);

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: PipelineConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_periods(mut self, periods: Vec<PeriodDescriptor>) -> Self {
        self.periods = periods;
        self
    }

    pub fn with_data_dir<P: Into<PathBuf>>(mut self, data_dir: P) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_output_dir<P: Into<PathBuf>>(mut self, output_dir: P) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_baseline(mut self, baseline: Option<PeriodDescriptor>) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_nodata_policy(mut self, policy: NodataPolicy) -> Self {
        self.nodata_policy = policy;
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

fn validate_unique_labels(config: &PipelineConfig) -> std::result::Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for period in &config.periods {
        if !seen.insert(period.label.as_str()) {
            return Err(ValidationError::new("duplicate_period_label"));
        }
    }
    Ok(())
}
