use std::process::ExitCode;

use clap::Parser;
use pmp_workflow_repair::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let ok = match cli.command {
        Command::Serve => cli::serve::run().await.map(|_| true)?,
        Command::Validate(args) => cli::validate::run(args)?,
        Command::Fix(args) => cli::fix::run(args).map(|_| true)?,
        Command::Repair(args) => cli::repair::run(args).await?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
