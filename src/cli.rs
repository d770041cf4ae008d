//! Command line front end.

use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use clap::Parser;
use colored::Colorize;

use crate::batch::BatchResult;
use crate::boot::Session;
use crate::config::Config;
use crate::{logger, Error, Result};

#[derive(Parser, Debug)]
#[command(name = "taxosim", version, about = "Semantic similarity over taxonomy graphs")]
pub struct Cli {
    /// YAML configuration file.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Output file, overriding the configured one. Rows go to stdout when
    /// neither is set.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Parses the arguments and runs the configured batch.
///
/// # Errors
///
/// Returns the first error of the run.
pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(&cli).await
}

/// Runs the batch described by `cli`.
///
/// # Errors
///
/// Returns the first error of the run.
pub async fn run(cli: &Cli) -> Result<()> {
    let config = Config::from_file(&cli.config)?;
    logger::init(&config.logger)?;

    let session = Session::from_config(&config)?;
    let result = session.run(&config).await?;

    let header = session.processor.header();
    match cli.output.as_ref().or(config.output.as_ref()) {
        Some(path) => {
            fs::write(path, format!("{header}{}", result.output)).map_err(|err| {
                Error::Configuration(format!("cannot write `{}`: {err}", path.display()))
            })?;
            print_summary(&result, Some(path));
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(header.as_bytes())?;
            stdout.write_all(result.output.as_bytes())?;
            stdout.flush()?;
            print_summary(&result, None);
        }
    }
    Ok(())
}

fn print_summary(result: &BatchResult, path: Option<&PathBuf>) {
    let target = path.map_or_else(|| "stdout".to_string(), |path| path.display().to_string());
    eprintln!(
        "{} {} rows written to {} ({} substituted, {} skipped)",
        "✔".green(),
        result.rows.to_string().bold(),
        target.cyan(),
        result.substituted.to_string().yellow(),
        result.skipped.to_string().yellow(),
    );
}
