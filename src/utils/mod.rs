pub mod constants;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use filename::{collection_name, output_filename, output_path};
pub use progress::ProgressReporter;
