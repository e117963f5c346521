//! CLI module for PMP Workflow Repair
//!
//! Provides subcommands for running the engine in different modes:
//! - `serve`: HTTP API server (default)
//! - `validate`: structural report for a workflow file
//! - `fix`: deterministic normalization of a workflow file
//! - `repair`: full repair session against the configured engine

pub mod fix;
pub mod repair;
pub mod serve;
pub mod validate;

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// PMP Workflow Repair - validate and repair generated n8n workflows
#[derive(Parser)]
#[command(name = "pmp-workflow-repair")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Validate a workflow document and print the report
    Validate(validate::ValidateArgs),

    /// Apply deterministic fixes and print the normalized document
    Fix(fix::FixArgs),

    /// Run a repair session and print the outcome
    Repair(repair::RepairArgs),
}

/// Load `.env`, configuration and logging shared by every subcommand
pub(crate) fn bootstrap() -> AppConfig {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging);
    config
}

/// Read a workflow file; `-` reads stdin
pub(crate) fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read workflow from stdin")?;
        return Ok(text);
    }

    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read workflow file {}", path.display()))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
