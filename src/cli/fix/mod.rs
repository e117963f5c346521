//! Fix command - deterministic normalization without contacting the engine

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use super::{print_json, read_input};
use crate::domain::{Fixer, WorkflowDocument};

/// Arguments for the fix command
#[derive(Args, Clone)]
pub struct FixArgs {
    /// Workflow JSON file, or `-` for stdin
    pub file: PathBuf,

    /// Print only the fixed document, without applied changes and suggestions
    #[arg(long)]
    pub document_only: bool,
}

pub fn run(args: FixArgs) -> anyhow::Result<()> {
    super::bootstrap();

    let document = WorkflowDocument::parse(&read_input(&args.file)?)?;
    let report = Fixer::new().fix(document);

    for change in &report.applied {
        info!("{}", change);
    }

    if args.document_only {
        print_json(&report.workflow)
    } else {
        print_json(&report)
    }
}
