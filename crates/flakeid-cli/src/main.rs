#![doc = include_str!("../README.md")]

mod app;

use std::io::{BufWriter, Write};

use app::command::run;
use app::config::{CliArgs, Settings};
use app::telemetry::init_telemetry;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let settings = Settings::try_from(args)?;

    init_telemetry()?;
    tracing::debug!(?settings, "starting");

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    run(settings, &mut out).await?;
    out.flush()?;

    Ok(())
}
