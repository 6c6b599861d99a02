//! Node configuration
//!
//! One YAML file per node, with `.env` support and environment overrides
//! for the values that change between the bench and the installation.

use crate::animation::{Palette, Rgb, Scene, SceneError, Zone, ZoneMap};
use roomsockets::config::route_name;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Environment variable naming the config file
pub const CONFIG_PATH_VAR: &str = "NODE_CONFIG_PATH";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid configuration: {0}")]
    Scene(#[from] SceneError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Complete configuration of one installation node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Device name; prefixes every route path (`/{device_name}Message`)
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub hub: HubConfig,
    /// Route suffixes
    #[serde(default = "default_routes")]
    pub routes: Vec<String>,
    /// Tick period of the control loop
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    /// 0 disables queueing of undeliverable sends
    #[serde(default = "default_retry_queue_capacity")]
    pub retry_queue_capacity: usize,
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: u64,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Greeting for the connect route; empty disables it
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(default)]
    pub led: LedConfig,
    /// Extra named colors as `[r, g, b]`
    #[serde(default)]
    pub palette: BTreeMap<String, [u8; 3]>,
    /// Relay names, in bank order (`relay1` is the first)
    #[serde(default)]
    pub relays: Vec<String>,
    #[serde(default)]
    pub scenes: BTreeMap<String, Vec<SceneStepConfig>>,
    /// Payload fragment → scene name
    #[serde(default)]
    pub triggers: BTreeMap<String, String>,
    /// Destination for scene notifications and relay announcements
    #[serde(default)]
    pub notify: Option<String>,
    /// Card id → `topic#value` to send when read
    #[serde(default)]
    pub cards: BTreeMap<String, String>,
    /// Button name → `topic#value` to send when pressed
    #[serde(default)]
    pub buttons: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_hub_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedConfig {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub zones: BTreeMap<String, Zone>,
}

/// One step of a scene as written in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneStepConfig {
    /// solid, clear, fill, fill_end, pulse, blink, transition, rainbow, wait
    pub routine: String,
    #[serde(default = "default_zone")]
    pub zone: String,
    #[serde(default)]
    pub color: Option<String>,
    /// Target color of a transition
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub count: Option<u32>,
}

fn default_routes() -> Vec<String> {
    roomsockets::config::DEFAULT_ROUTE_SUFFIXES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_tick_ms() -> u64 {
    100
}

fn default_reconnect_interval_ms() -> u64 {
    1000
}

fn default_retry_queue_capacity() -> usize {
    32
}

fn default_max_frame_len() -> u64 {
    roomsockets::frame::DEFAULT_MAX_FRAME_LEN
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_hub_port() -> u16 {
    8080
}

fn default_zone() -> String {
    crate::animation::GLOBAL_ZONE.to_string()
}

impl NodeConfig {
    /// Load from a YAML file, then `.env` and environment overrides
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config: NodeConfig = serde_yaml::from_str(&yaml_content)?;

        // Don't fail if .env doesn't exist
        dotenv::dotenv().ok();
        config.apply_env_overrides()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate without touching the environment
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: NodeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// `HUB_HOST`, `HUB_PORT` and `DEVICE_NAME` replace the YAML values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("HUB_HOST") {
            info!("Overriding hub host from environment variable");
            self.hub.host = host;
        }
        if let Ok(port) = std::env::var("HUB_PORT") {
            self.hub.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::ValidationError(format!("HUB_PORT '{}' is not a port", port)))?;
        }
        if let Ok(name) = std::env::var("DEVICE_NAME") {
            info!("Overriding device name from environment variable");
            self.device_name = name;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.device_name.trim().is_empty() {
            return Err(ConfigError::ValidationError("device_name must not be empty".to_string()));
        }

        if self.hub.host.trim().is_empty() {
            return Err(ConfigError::EnvVarMissing("HUB_HOST".to_string()));
        }

        if !(10..=1000).contains(&self.tick_ms) {
            return Err(ConfigError::ValidationError(
                "tick_ms must be between 10 and 1000".to_string(),
            ));
        }

        if self.routes.is_empty() {
            return Err(ConfigError::ValidationError("at least one route is required".to_string()));
        }
        let mut seen = HashSet::new();
        for suffix in &self.routes {
            if suffix.is_empty() || !seen.insert(route_name(suffix)) {
                return Err(ConfigError::ValidationError(format!(
                    "route '{}' is empty or duplicated",
                    suffix
                )));
            }
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        if !self.led.zones.is_empty() && self.led.count == 0 {
            return Err(ConfigError::ValidationError(
                "led.count must be set when zones are defined".to_string(),
            ));
        }
        for (name, zone) in &self.led.zones {
            if zone.start >= zone.end || zone.end > self.led.count {
                return Err(ConfigError::ValidationError(format!(
                    "zone '{}' [{}, {}) does not fit a strip of {}",
                    name, zone.start, zone.end, self.led.count
                )));
            }
        }

        // Resolving every scene catches unknown colors, zones and routines
        self.resolve_scenes()?;

        for (fragment, scene) in &self.triggers {
            if fragment.is_empty() {
                return Err(ConfigError::ValidationError("empty trigger".to_string()));
            }
            if !self.scenes.contains_key(scene) {
                return Err(ConfigError::ValidationError(format!(
                    "trigger '{}' points at unknown scene '{}'",
                    fragment, scene
                )));
            }
        }

        for (kind, bindings) in [("card", &self.cards), ("button", &self.buttons)] {
            for (key, payload) in bindings {
                if payload.split('#').next().map_or(true, |topic| topic.trim().is_empty()) {
                    return Err(ConfigError::ValidationError(format!(
                        "{} '{}' has no topic to send",
                        kind, key
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn palette(&self) -> Palette {
        Palette::new(
            self.palette
                .iter()
                .map(|(name, rgb)| (name.clone(), Rgb::from(*rgb)))
                .collect(),
        )
    }

    pub fn zones(&self) -> ZoneMap {
        ZoneMap::new(self.led.count, self.led.zones.clone())
    }

    /// Every configured scene, resolved
    pub fn resolve_scenes(&self) -> Result<BTreeMap<String, Scene>> {
        let palette = self.palette();
        let zones = self.zones();
        self.scenes
            .iter()
            .map(|(name, steps)| {
                Scene::resolve(name, steps, &palette, &zones)
                    .map(|scene| (name.clone(), scene))
                    .map_err(ConfigError::from)
            })
            .collect()
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Device: {}", self.device_name);
        info!("  Hub: {}:{}", self.hub.host, self.hub.port);
        info!("  Routes: {}", self.routes.join(", "));
        info!("  Tick: {} ms", self.tick_ms);
        info!("  Reconnect interval: {} ms", self.reconnect_interval_ms);
        info!("  Retry queue: {}", self.retry_queue_capacity);
        info!("  LEDs: {} ({} zones)", self.led.count, self.led.zones.len());
        info!("  Relays: {}", self.relays.len());
        info!("  Scenes: {} ({} triggers)", self.scenes.len(), self.triggers.len());
        info!("  Notify: {}", self.notify.as_deref().unwrap_or("-"));
        info!("  Log level: {}", self.log_level);
    }
}
