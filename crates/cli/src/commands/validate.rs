//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ReceiverBlueprint, SourceConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    num_lanes: u32,
    lane_width: u32,
    depth: usize,
    source: &'static str,
    sink_count: usize,
}

impl ConfigSummary {
    fn from_blueprint(blueprint: &ReceiverBlueprint) -> Self {
        let aligner = &blueprint.receiver.aligner;
        Self {
            version: format!("{:?}", blueprint.version),
            num_lanes: aligner.num_lanes,
            lane_width: aligner.lane_width,
            depth: aligner.depth,
            source: match blueprint.source {
                SourceConfig::Synthetic(_) => "synthetic",
                SourceConfig::Trace(_) => "trace",
            },
            sink_count: blueprint.sinks.len(),
        }
    }
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    match result.error {
        None => Ok(()),
        Some(error) => Err(CliError::config_validation(error).into()),
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = config_loader::collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary::from_blueprint(&blueprint)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  Lanes: {} x {} bits",
                summary.num_lanes, summary.lane_width
            );
            println!("  Aligner depth: {}", summary.depth);
            println!("  Source: {}", summary.source);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_for(content: &str) -> (tempfile::TempDir, ValidateArgs) {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("receiver.toml");
        std::fs::write(&config, content).unwrap();
        (dir, ValidateArgs { config, json: true })
    }

    #[test]
    fn test_valid_config_reports_warnings() {
        let (_dir, args) = args_for("[receiver.image]\nsubsample_x = 4\nsubsample_y = 9\nout_width = 96\nout_height = 108\n");
        let result = validate_config(&args);
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("No sinks")));
        assert!(warnings.iter().any(|w| w.contains("RAW10")));
        assert_eq!(result.summary.unwrap().source, "synthetic");
    }

    #[test]
    fn test_invalid_config() {
        let (_dir, args) = args_for("[receiver.aligner]\ndepth = 3\n\n[source]\nkind = \"synthetic\"\nlane_skews = [0, 0, 0, 2]\n");
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("lane_skews[3]"));
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/receiver.toml".into(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().starts_with("File not found"));
    }
}
