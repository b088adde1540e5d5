use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::app::{
    ActuationLimits, HostAddresses, LoopConfig, OverlayConfig, DEFAULT_TUNING_STEP,
    INTENSITY_CEILING,
};
use crate::telemetry::{ScanConfig, DEFAULT_ENTITY_SLOTS, DEFAULT_FOV_DEGREES, DEFAULT_SLOT_STRIDE};

pub const CONFIG_ENV_VAR: &str = "HAPTIC_LINK_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "haptic_link.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config '{path}' at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config at {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub name: String,
    /// `host:port` of the actuator bridge. Empty runs without a link.
    pub address: String,
}

/// Host memory layout. Values may be written as numbers or `"0x…"` strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetConfig {
    #[serde(deserialize_with = "deserialize_address")]
    pub local_entity: u64,
    #[serde(deserialize_with = "deserialize_address")]
    pub entity_table: u64,
    #[serde(deserialize_with = "deserialize_address")]
    pub position: u64,
    #[serde(deserialize_with = "deserialize_address")]
    pub orientation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingConfig {
    pub fov_degrees: f64,
    pub entity_slots: usize,
    pub slot_stride: u64,
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            fov_degrees: DEFAULT_FOV_DEGREES,
            entity_slots: DEFAULT_ENTITY_SLOTS,
            slot_stride: DEFAULT_SLOT_STRIDE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub tick_interval_ms: u64,
    pub read_timeout_ms: u64,
    pub metrics_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            read_timeout_ms: 50,
            metrics_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub process_name: String,
    pub device: DeviceConfig,
    pub offsets: OffsetConfig,
    pub targeting: TargetingConfig,
    pub limits: ActuationLimits,
    pub tuning_step: f64,
    pub timing: TimingConfig,
    pub overlay: OverlayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            process_name: String::new(),
            device: DeviceConfig::default(),
            offsets: OffsetConfig::default(),
            targeting: TargetingConfig::default(),
            limits: ActuationLimits::default(),
            tuning_step: DEFAULT_TUNING_STEP,
            timing: TimingConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_json_str(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, AppConfig>(&mut deserializer).map_err(|error| {
            let field = error.path().to_string();
            ConfigError::Parse {
                path: path.to_path_buf(),
                field,
                source: error.into_inner(),
            }
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&raw, path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.process_name.trim().is_empty() {
            return Err(invalid("process_name", "must not be empty"));
        }
        if self.device.name.trim().is_empty() {
            return Err(invalid("device.name", "must not be empty"));
        }
        if !self.limits.is_valid() {
            return Err(invalid(
                "limits",
                format!(
                    "expected 0 <= min <= max <= {INTENSITY_CEILING}, got min {} max {}",
                    self.limits.min, self.limits.max
                ),
            ));
        }
        if !(self.tuning_step.is_finite() && self.tuning_step > 0.0) {
            return Err(invalid(
                "tuning_step",
                format!("expected a positive number, got {}", self.tuning_step),
            ));
        }
        let fov = self.targeting.fov_degrees;
        if !(fov > 0.0 && fov <= 180.0) {
            return Err(invalid(
                "targeting.fov_degrees",
                format!("expected (0, 180], got {fov}"),
            ));
        }
        if self.targeting.entity_slots == 0 {
            return Err(invalid("targeting.entity_slots", "must be at least 1"));
        }
        if self.targeting.slot_stride == 0 {
            return Err(invalid("targeting.slot_stride", "must be at least 1"));
        }
        if self.timing.tick_interval_ms == 0 {
            return Err(invalid("timing.tick_interval_ms", "must be non-zero"));
        }
        if self.timing.read_timeout_ms == 0 {
            return Err(invalid("timing.read_timeout_ms", "must be non-zero"));
        }
        if self.timing.metrics_interval_ms == 0 {
            return Err(invalid("timing.metrics_interval_ms", "must be non-zero"));
        }
        if self.overlay.enabled {
            let projection_fov = self.overlay.projection.fov_degrees;
            if !(projection_fov > 0.0 && projection_fov < 180.0) {
                return Err(invalid(
                    "overlay.projection.fov_degrees",
                    format!("expected (0, 180), got {projection_fov}"),
                ));
            }
            if self.overlay.viewport.width == 0 || self.overlay.viewport.height == 0 {
                return Err(invalid("overlay.viewport", "width and height must be non-zero"));
            }
        }
        Ok(())
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            fov_degrees: self.targeting.fov_degrees,
            entity_slots: self.targeting.entity_slots,
            slot_stride: self.targeting.slot_stride,
            position_offset: self.offsets.position,
        }
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            process_name: self.process_name.clone(),
            device_name: self.device.name.clone(),
            device_address: self.device.address.clone(),
            addresses: HostAddresses {
                local_entity: self.offsets.local_entity,
                entity_table: self.offsets.entity_table,
                orientation: self.offsets.orientation,
            },
            scan: self.scan_config(),
            tick_interval: Duration::from_millis(self.timing.tick_interval_ms),
            read_timeout: Duration::from_millis(self.timing.read_timeout_ms),
            metrics_log_interval: Duration::from_millis(self.timing.metrics_interval_ms),
            overlay: self.overlay.clone(),
        }
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

/// Loads the config named by `HAPTIC_LINK_CONFIG`, falling back to
/// `haptic_link.json` in the working directory, then to defaults.
pub fn load_config_from_env() -> Result<AppConfig, ConfigError> {
    let env_value = match env::var(CONFIG_ENV_VAR) {
        Ok(value) if value.trim().is_empty() => None,
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(source) => {
            return Err(ConfigError::EnvVar {
                var: CONFIG_ENV_VAR,
                source,
            })
        }
    };
    let cwd = env::current_dir().map_err(|source| ConfigError::Read {
        path: PathBuf::from("."),
        source,
    })?;

    match resolve_config_path(env_value, &cwd) {
        Some(path) => {
            info!(path = %path.display(), "config_loading");
            AppConfig::load(&path)
        }
        None => {
            info!(env_var = CONFIG_ENV_VAR, "config_defaults");
            let config = AppConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn resolve_config_path(env_value: Option<String>, cwd: &Path) -> Option<PathBuf> {
    if let Some(value) = env_value {
        return Some(PathBuf::from(value));
    }
    let fallback = cwd.join(DEFAULT_CONFIG_FILE);
    fallback.is_file().then_some(fallback)
}

pub fn parse_address(text: &str) -> Result<u64, String> {
    let trimmed = text.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|error| format!("invalid address '{text}': {error}"))
}

fn deserialize_address<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAddress {
        Number(u64),
        Text(String),
    }

    match RawAddress::deserialize(deserializer)? {
        RawAddress::Number(value) => Ok(value),
        RawAddress::Text(text) => parse_address(&text).map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const SAMPLE: &str = r#"{
        "process_name": "host.exe",
        "device": { "name": "toy", "address": "127.0.0.1:20010" },
        "offsets": {
            "local_entity": "0x1F8BAC",
            "entity_table": "0x4A83E40",
            "position": 20272,
            "orientation": "0x4D90B4"
        },
        "limits": { "max": 70 }
    }"#;

    fn write_config(dir: &TempDir, raw: &str) -> PathBuf {
        let path = dir.path().join("haptic_link.json");
        fs::write(&path, raw).expect("write config");
        path
    }

    #[test]
    fn load_reads_hex_offsets_and_fills_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(&dir, SAMPLE);

        let config = AppConfig::load(&path).expect("load");

        assert_eq!(config.offsets.local_entity, 0x1F8BAC);
        assert_eq!(config.offsets.entity_table, 0x4A83E40);
        assert_eq!(config.offsets.position, 0x4F30);
        assert_eq!(config.offsets.orientation, 0x4D90B4);
        assert_eq!(config.limits, ActuationLimits { min: 10.0, max: 70.0 });
        assert_eq!(config.targeting, TargetingConfig::default());
        assert_eq!(config.timing.tick_interval_ms, 100);
        assert!(!config.overlay.enabled);
    }

    #[test]
    fn parse_error_reports_field_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"{ "process_name": "host.exe", "device": { "name": "toy" },
                "offsets": { "entity_table": "0xZZ" } }"#,
        );

        let error = AppConfig::load(&path).expect_err("bad address");
        match error {
            ConfigError::Parse { field, .. } => assert_eq!(field, "offsets.entity_table"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = TempDir::new().expect("temp dir");
        let error = AppConfig::load(&dir.path().join("absent.json")).expect_err("missing");
        assert!(matches!(error, ConfigError::Read { .. }));
    }

    #[test]
    fn validate_rejects_inverted_limits() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"{ "process_name": "host.exe", "device": { "name": "toy" },
                "limits": { "min": 60, "max": 50 } }"#,
        );

        let error = AppConfig::load(&path).expect_err("inverted limits");
        assert!(matches!(error, ConfigError::Invalid { field: "limits", .. }));
    }

    #[test]
    fn defaults_require_process_name() {
        let error = AppConfig::default().validate().expect_err("empty name");
        assert!(matches!(
            error,
            ConfigError::Invalid {
                field: "process_name",
                ..
            }
        ));
    }

    #[test]
    fn partial_viewport_keeps_default_height() {
        let raw = r#"{ "process_name": "host.exe", "device": { "name": "toy" },
            "overlay": { "enabled": true, "viewport": { "width": 800 } } }"#;

        let config = AppConfig::from_json_str(raw, Path::new("inline")).expect("parse");

        assert_eq!(config.overlay.viewport.width, 800);
        assert_eq!(config.overlay.viewport.height, 1080);
        config.validate().expect("valid");
    }

    #[test]
    fn validate_rejects_zero_cadence() {
        let mut config = AppConfig {
            process_name: "host.exe".to_string(),
            device: DeviceConfig {
                name: "toy".to_string(),
                address: String::new(),
            },
            ..AppConfig::default()
        };
        config.validate().expect("valid baseline");

        config.timing.tick_interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "timing.tick_interval_ms",
                ..
            })
        ));
    }

    #[test]
    fn loop_config_carries_layout_and_timing() {
        let config = AppConfig::from_json_str(SAMPLE, Path::new("inline")).expect("parse");
        let loop_config = config.loop_config();

        assert_eq!(loop_config.addresses.orientation, 0x4D90B4);
        assert_eq!(loop_config.scan.position_offset, 0x4F30);
        assert_eq!(loop_config.scan.entity_slots, DEFAULT_ENTITY_SLOTS);
        assert_eq!(loop_config.tick_interval, Duration::from_millis(100));
        assert_eq!(loop_config.read_timeout, Duration::from_millis(50));
        assert_eq!(loop_config.device_address, "127.0.0.1:20010");
    }

    #[test]
    fn config_path_prefers_env_then_working_directory() {
        let dir = TempDir::new().expect("temp dir");
        assert_eq!(resolve_config_path(None, dir.path()), None);

        let fallback = write_config(&dir, SAMPLE);
        assert_eq!(resolve_config_path(None, dir.path()), Some(fallback));

        let explicit = resolve_config_path(Some("/etc/haptic.json".to_string()), dir.path());
        assert_eq!(explicit, Some(PathBuf::from("/etc/haptic.json")));
    }

    #[test]
    fn parse_address_accepts_decimal_and_hex() {
        assert_eq!(parse_address("4096"), Ok(4096));
        assert_eq!(parse_address(" 0x1000 "), Ok(0x1000));
        assert_eq!(parse_address("0XfF"), Ok(255));
        assert!(parse_address("0x").is_err());
        assert!(parse_address("-1").is_err());
    }
}
