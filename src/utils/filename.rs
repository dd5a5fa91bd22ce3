use std::path::{Path, PathBuf};

use crate::utils::constants::{OUTPUT_EXTENSION, OUTPUT_PREFIX};

/// Collection name for a period, e.g. `avg_temp_change_2021-2040`
pub fn collection_name(label: &str) -> String {
    format!("{}{}", OUTPUT_PREFIX, label)
}

/// Output file name for a period, e.g. `avg_temp_change_2021-2040.json`
pub fn output_filename(label: &str) -> String {
    format!("{}.{}", collection_name(label), OUTPUT_EXTENSION)
}

pub fn output_path(output_dir: &Path, label: &str) -> PathBuf {
    output_dir.join(output_filename(label))
}

/// Final path component for log lines
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
