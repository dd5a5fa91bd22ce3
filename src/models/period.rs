use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::{Validate, ValidationError};

use crate::utils::filename::output_filename;

/// One projection period: a label plus the tmin/tmax rasters that describe it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PeriodDescriptor {
    #[validate(length(min = 1), custom(function = "validate_label"))]
    pub label: String,

    #[validate(length(min = 1))]
    pub min_file: String,

    #[validate(length(min = 1))]
    pub max_file: String,
}

impl PeriodDescriptor {
    pub fn new(label: &str, min_file: &str, max_file: &str) -> Self {
        Self {
            label: label.to_string(),
            min_file: min_file.to_string(),
            max_file: max_file.to_string(),
        }
    }

    /// WorldClim 2.1 10-minute CMIP6 file pair for a GCM/SSP/period combination
    pub fn worldclim(label: &str, gcm: &str, ssp: &str) -> Self {
        Self {
            label: label.to_string(),
            min_file: format!("wc2.1_10m_tmin_{}_{}_{}.tif", gcm, ssp, label),
            max_file: format!("wc2.1_10m_tmax_{}_{}_{}.tif", gcm, ssp, label),
        }
    }

    pub fn min_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.min_file)
    }

    pub fn max_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.max_file)
    }

    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(output_filename(&self.label))
    }
}

/// Labels end up in file names, so path separators are not allowed
fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.contains(['/', '\\']) || label == "." || label == ".." {
        return Err(ValidationError::new("label_not_filename_safe"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worldclim_filenames() {
        let period = PeriodDescriptor::worldclim("2041-2060", "ACCESS-CM2", "ssp585");
        assert_eq!(
            period.min_file,
            "wc2.1_10m_tmin_ACCESS-CM2_ssp585_2041-2060.tif"
        );
        assert_eq!(
            period.max_file,
            "wc2.1_10m_tmax_ACCESS-CM2_ssp585_2041-2060.tif"
        );
    }

    #[test]
    fn test_paths_join_directories() {
        let period = PeriodDescriptor::new("2021-2040", "tmin.tif", "tmax.tif");
        let data_dir = Path::new("data");

        assert_eq!(period.min_path(data_dir), PathBuf::from("data/tmin.tif"));
        assert_eq!(period.max_path(data_dir), PathBuf::from("data/tmax.tif"));
        assert_eq!(
            period.output_path(Path::new("out")),
            PathBuf::from("out/avg_temp_change_2021-2040.json")
        );
    }

    #[test]
    fn test_label_validation() {
        assert!(PeriodDescriptor::new("2021-2040", "a.tif", "b.tif")
            .validate()
            .is_ok());
        assert!(PeriodDescriptor::new("", "a.tif", "b.tif").validate().is_err());
        assert!(PeriodDescriptor::new("../etc", "a.tif", "b.tif")
            .validate()
            .is_err());
        assert!(PeriodDescriptor::new("2021", "", "b.tif").validate().is_err());
    }
}
