use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "climate-vectorizer")]
#[command(about = "Convert WorldClim temperature rasters into GeoJSON polygons")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Only print errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Process every configured period (the default when no command is given)
    Run {
        #[arg(short, long, help = "Configuration file (TOML, JSON or YAML)")]
        config: Option<PathBuf>,

        #[arg(short, long, help = "Directory the GeoJSON files are written to")]
        output_dir: Option<PathBuf>,

        #[arg(short, long, help = "Directory the tmin/tmax GeoTIFFs are read from")]
        data_dir: Option<PathBuf>,

        #[arg(long, default_value = "false", help = "Resolve and vectorize without writing")]
        dry_run: bool,
    },

    /// Print dimensions, georeferencing and value range of a GeoTIFF
    Inspect {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Write the placeholder collection on its own
    Samples {
        #[arg(short, long, help = "Output GeoJSON file")]
        output: PathBuf,

        #[arg(long, default_value = "samples", help = "Collection name")]
        name: String,
    },
}

impl Cli {
    /// The command to execute, falling back to a plain `run`
    pub fn command_or_default(&self) -> Commands {
        match &self.command {
            Some(command) => command.clone(),
            None => Commands::Run {
                config: None,
                output_dir: None,
                data_dir: None,
                dry_run: false,
            },
        }
    }
}
