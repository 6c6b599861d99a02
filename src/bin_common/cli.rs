//! CLI utilities for binaries
//!
//! Resolves which configuration file a node binary loads.

use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Node configuration (config/node.yaml)
    Node,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Node => "config/node.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Node | ConfigType::Custom(_) => ambiance::infrastructure::config::CONFIG_PATH_VAR,
        }
    }
}

/// Configuration path from the environment, or the type's default
///
/// A custom path always wins over the environment.
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    if let ConfigType::Custom(path) = &config_type {
        return PathBuf::from(path);
    }
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Command line arguments, without the program name
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// Config path from `--config <path>` if given
pub fn config_from_args(args: &[String]) -> Option<ConfigType> {
    let at = args.iter().position(|a| a == "--config")?;
    args.get(at + 1).map(|path| ConfigType::Custom(path.clone()))
}
