//! Repair command - one repair session using the configured transports

use std::path::PathBuf;

use clap::Args;

use super::{bootstrap, print_json, read_input};
use crate::domain::WorkflowDocument;
use crate::infrastructure::services::timeout_from_secs;

/// Arguments for the repair command
#[derive(Args, Clone)]
pub struct RepairArgs {
    /// Workflow JSON file, or `-` for stdin
    pub file: PathBuf,

    /// Original natural-language request, passed to regeneration
    #[arg(long, default_value = "")]
    pub prompt: String,

    /// Override the configured attempt budget
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Session deadline in seconds (overrides config)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Ignore cached outcomes
    #[arg(long)]
    pub no_cache: bool,
}

/// Print the repair outcome; returns whether the session succeeded
pub async fn run(args: RepairArgs) -> anyhow::Result<bool> {
    let config = bootstrap();

    let document = WorkflowDocument::parse(&read_input(&args.file)?)?;
    let service = crate::create_repair_service(&config)?;

    let mut options = service.default_options();
    if let Some(max_attempts) = args.max_attempts {
        options.max_attempts = max_attempts;
    }
    if let Some(timeout) = timeout_from_secs(args.timeout) {
        options.timeout = Some(timeout);
    }
    options.bypass_cache = args.no_cache;

    let outcome = service.repair(document, &args.prompt, options).await;

    print_json(&outcome)?;
    Ok(outcome.success)
}
