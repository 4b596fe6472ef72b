/// `load_config` module: loads and adapts a static YAML config into the
/// internal bucket layout and training parameters.
///
/// This module is the only place where untrusted YAML is parsed and mapped to
/// the strongly-typed structs of the core crate.
///
/// # Responsibilities
/// - Parse user-supplied YAML configuration files into type-safe Rust structs
/// - Map loosely-typed YAML sections onto the core crate's
///   [`BucketLayout`] and [`TrainParams`] (both with serde defaults for every
///   key, so a minimal config only names the bucket root)
/// - Ensure robust error messages for CLI and tests: any failure in loading
///   must result in clear diagnostics
/// - Acts as the adapter layer decoupling input schemas from the domain core
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich
/// diagnostics, and are surfaced at the CLI boundary.
///
use anyhow::Result;
use review_pipeline_core::config::{BucketLayout, TrainParams};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct CliConfig {
    pub bucket: BucketSection,
    #[serde(default)]
    pub layout: BucketLayout,
    #[serde(default)]
    pub train: TrainParams,
}

#[derive(Debug, Deserialize)]
pub struct BucketSection {
    /// Root directory of the local bucket all stages read and write.
    pub root_dir: PathBuf,
}

/// Loads a static YAML config file and returns the typed CLI config.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    Ok(config)
}
