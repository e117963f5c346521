//! Validate command - structural report for a workflow file

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde_json::Value;

use super::{bootstrap, print_json, read_input};
use crate::domain::{StructuralValidator, ValidationOptions, ValidationResult};

/// Arguments for the validate command
#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Workflow JSON file, or `-` for stdin
    pub file: PathBuf,

    /// Print the full ValidationResult as JSON
    #[arg(long)]
    pub json: bool,

    /// Warn when no node declares failure handling
    #[arg(long)]
    pub require_error_handling: bool,
}

/// Print the validation report; returns whether the document is valid
pub fn run(args: ValidateArgs) -> anyhow::Result<bool> {
    bootstrap();

    let text = read_input(&args.file)?;
    let input: Value = serde_json::from_str(&text).context("workflow file is not valid JSON")?;

    let options = ValidationOptions {
        require_error_handling: args.require_error_handling,
        ..ValidationOptions::default()
    };
    let result = StructuralValidator::new().validate(&input, &options);

    if args.json {
        print_json(&result)?;
    } else {
        print!("{}", summary(&result));
    }
    Ok(result.is_valid)
}

fn summary(result: &ValidationResult) -> String {
    let verdict = if result.is_valid { "valid" } else { "invalid" };
    let mut out = format!("{} (score {})\n", verdict, result.score);

    for issue in &result.errors {
        out.push_str(&format!("  error: {}\n", issue.message));
    }
    for issue in &result.warnings {
        out.push_str(&format!("  warning: {}\n", issue.message));
    }
    for suggestion in &result.suggestions {
        out.push_str(&format!("  suggestion: {}\n", suggestion));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_lists_errors() {
        let input = json!({
            "name": "Dupes",
            "nodes": [
                {"id": "1", "name": "A", "type": "n8n-nodes-base.manualTrigger", "typeVersion": 1, "position": [0, 0]},
                {"id": "2", "name": "A", "type": "n8n-nodes-base.set", "typeVersion": 3.4, "position": [200, 0]}
            ],
            "connections": {}
        });
        let result = StructuralValidator::new().validate(&input, &ValidationOptions::default());

        let text = summary(&result);
        assert!(text.starts_with("invalid"));
        assert!(text.contains("error:"));
    }
}
