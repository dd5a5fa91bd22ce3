use anyhow::Context;
use clap::Parser;
use climate_vectorizer::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).context("climate-vectorizer failed")
}
