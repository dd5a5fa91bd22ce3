pub mod input_resolver;
pub mod raster_reader;
pub mod temperature_loader;

pub use input_resolver::{any_inputs_exist, inputs_exist, missing_files};
pub use raster_reader::{decode_band, RasterBand, RasterReader};
pub use temperature_loader::{LoadOutcome, TemperatureLoader};
