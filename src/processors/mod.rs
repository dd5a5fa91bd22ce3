pub mod change_calculator;
pub mod pipeline;
pub mod polygonizer;
pub mod sample_generator;

pub use change_calculator::{apply_baseline, ValueKind};
pub use pipeline::{PeriodOutcome, PeriodReport, Pipeline, RunSummary};
pub use polygonizer::{Connectivity, Polygonizer, Region};
pub use sample_generator::{SampleGenerator, SAMPLE_POINTS};
