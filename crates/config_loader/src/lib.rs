//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `ReceiverBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("receiver.toml")).unwrap();
//! println!("Lanes: {}", blueprint.receiver.aligner.num_lanes);
//! ```

mod parser;
mod validator;

pub use contracts::ReceiverBlueprint;
pub use parser::ConfigFormat;
pub use validator::collect_warnings;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ReceiverBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ReceiverBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Serialize ReceiverBlueprint to TOML string
    pub fn to_toml(blueprint: &ReceiverBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize ReceiverBlueprint to JSON string
    pub fn to_json(blueprint: &ReceiverBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SourceConfig;

    const MINIMAL_TOML: &str = r#"
[receiver.aligner]
depth = 4

[receiver.packet]
depth = 256

[source]
kind = "synthetic"
frames = 2
lane_skews = [0, 2, 1, 0]

[[sinks]]
name = "log_sink"
sink_type = "log"

[[sinks]]
name = "files"
sink_type = "file"
queue_capacity = 4
params = { base_path = "./captures" }
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.receiver.aligner.depth, 4);
        assert_eq!(bp.receiver.packet.depth, 256);
        assert_eq!(bp.sinks[1].params["base_path"], "./captures");
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp, bp2);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp, bp2);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        // depth 3 only repairs one cycle of skew
        let content = MINIMAL_TOML.replace("depth = 4", "depth = 3");
        let result = ConfigLoader::load_from_str(&content, ConfigFormat::Toml);
        assert!(matches!(
            result,
            Err(ContractError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receiver.toml");
        std::fs::write(&path, MINIMAL_TOML).unwrap();
        let bp = ConfigLoader::load_from_path(&path).unwrap();
        assert!(matches!(bp.source, SourceConfig::Synthetic(_)));

        let yaml = dir.path().join("receiver.yaml");
        std::fs::write(&yaml, "").unwrap();
        assert!(matches!(
            ConfigLoader::load_from_path(&yaml),
            Err(ContractError::ConfigParse { .. })
        ));
    }
}
