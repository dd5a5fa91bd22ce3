/// Default run configuration
pub const DEFAULT_PERIOD_LABELS: [&str; 4] = ["2021-2040", "2041-2060", "2061-2080", "2081-2100"];
pub const DEFAULT_GCM: &str = "ACCESS-CM2";
pub const DEFAULT_SSP: &str = "ssp585";
pub const DEFAULT_OUTPUT_DIR: &str = "public/data";
pub const ENV_PREFIX: &str = "CLIMVEC";

/// WorldClim stores temperatures in tenths of a degree
pub const DEFAULT_SCALE_DIVISOR: f32 = 10.0;

/// Output naming
pub const OUTPUT_PREFIX: &str = "avg_temp_change_";
pub const OUTPUT_EXTENSION: &str = "json";

/// Placeholder geometry
pub const SAMPLE_BUFFER_RADIUS_DEG: f64 = 5.0;
pub const SAMPLE_BUFFER_SEGMENTS: usize = 64;

/// Spatial references
pub const EPSG_WGS84: u32 = 4326;
pub const TRANSFORM_TOLERANCE: f64 = 1e-9;

/// GeoKey directory entries
pub const GEOKEY_MODEL_TYPE: u16 = 1024;
pub const GEOKEY_GEOGRAPHIC_TYPE: u16 = 2048;
pub const GEOKEY_PROJECTED_CS_TYPE: u16 = 3072;
pub const GEOKEY_USER_DEFINED: u16 = 32767;
pub const MODEL_TYPE_PROJECTED: u16 = 1;
pub const MODEL_TYPE_GEOGRAPHIC: u16 = 2;

/// I/O defaults
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
