pub mod feature;
pub mod grid;
pub mod period;
pub mod settings;

pub use feature::{Feature, FeatureCollection};
pub use grid::{GeoTransform, RasterGrid, SpatialRef};
pub use period::PeriodDescriptor;
pub use settings::{NodataPolicy, PipelineConfig};
