use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::models::PipelineConfig;
use crate::processors::{Pipeline, SampleGenerator};
use crate::readers::RasterReader;
use crate::utils::progress::ProgressReporter;
use crate::writers::GeoJsonWriter;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` wins over the flags when set.
pub fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stdout)
        .try_init();
}

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.quiet);

    match cli.command_or_default() {
        Commands::Run {
            config,
            output_dir,
            data_dir,
            dry_run,
        } => {
            let mut settings = PipelineConfig::load(config.as_deref())?;
            if let Some(dir) = output_dir {
                settings = settings.with_output_dir(dir);
            }
            if let Some(dir) = data_dir {
                settings = settings.with_data_dir(dir);
            }

            if !cli.quiet {
                println!("Processing temperature data...");
                println!("Data directory: {}", display_dir(&settings.data_dir));
                println!("Output directory: {}", settings.output_dir.display());
                println!("Periods: {}", settings.periods.len());
            }

            let progress = ProgressReporter::new(
                settings.periods.len() as u64,
                "Processing periods...",
                cli.quiet,
            );

            let summary = Pipeline::new(settings)
                .with_dry_run(dry_run)
                .run(Some(&progress))?;

            if !cli.quiet {
                println!("\n{}", summary.summary());
                println!("\nProcessing complete!");
            }
        }

        Commands::Inspect { file } => {
            info!("Inspecting {}", file.display());

            let band = RasterReader::new().read_band(&file)?;
            let (min_x, min_y, max_x, max_y) = band.transform.bounds(band.cols, band.rows);

            println!("Raster: {}", file.display());
            println!("- Size: {} cols x {} rows", band.cols, band.rows);
            println!("- Transform: {}", band.transform);
            println!(
                "- Bounds: ({:.4}, {:.4}) - ({:.4}, {:.4})",
                min_x, min_y, max_x, max_y
            );
            println!("- Reference: {}", band.spatial_ref);
            match band.nodata {
                Some(nodata) => println!("- Nodata: {}", nodata),
                None => println!("- Nodata: none"),
            }
            match band.value_range() {
                Some((lo, hi)) => println!("- Value range: {} to {}", lo, hi),
                None => println!("- Value range: no valid cells"),
            }
        }

        Commands::Samples { output, name } => {
            let collection = SampleGenerator::new().collection(&name);
            GeoJsonWriter::new().write(&collection, &output)?;

            if !cli.quiet {
                println!(
                    "Wrote {} sample features to {}",
                    collection.len(),
                    output.display()
                );
            }
        }
    }

    Ok(())
}

fn display_dir(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        ".".to_string()
    } else {
        path.display().to_string()
    }
}
