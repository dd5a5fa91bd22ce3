use crate::models::{PeriodDescriptor, PipelineConfig};
use std::path::Path;

/// Both rasters of a period are present under `data_dir`
pub fn inputs_exist(period: &PeriodDescriptor, data_dir: &Path) -> bool {
    period.min_path(data_dir).exists() && period.max_path(data_dir).exists()
}

/// At least one configured period has both rasters present
pub fn any_inputs_exist(config: &PipelineConfig) -> bool {
    config
        .periods
        .iter()
        .any(|period| inputs_exist(period, &config.data_dir))
}

/// Files of a period that are not on disk, for the "not found" log line
pub fn missing_files(period: &PeriodDescriptor, data_dir: &Path) -> Vec<String> {
    [&period.min_file, &period.max_file]
        .into_iter()
        .zip([period.min_path(data_dir), period.max_path(data_dir)])
        .filter(|(_, path)| !path.exists())
        .map(|(name, _)| name.clone())
        .collect()
}
