//! ---
//! fcp_section: "01-core-functionality"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Shared primitives and utilities for the reliability core."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_api_enabled() -> bool {
    true
}

fn default_api_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_telemetry_max_age() -> Duration {
    Duration::from_secs(900)
}

fn default_telemetry_max_samples() -> usize {
    10_000
}

fn default_telemetry_window() -> Duration {
    Duration::from_secs(300)
}

fn default_drill_probe_id() -> String {
    "drill-probe".to_owned()
}

fn default_history_limit() -> usize {
    100
}

fn default_window_label() -> String {
    "5m".to_owned()
}

/// Primary configuration object for the reliability runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub drills: DrillConfig,
    #[serde(default)]
    pub scorecard: ScorecardConfig,
    #[serde(default)]
    pub fleet: FleetConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and defaults are in effect.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "FCP_CONFIG";

    /// Load configuration from disk, respecting the `FCP_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// An explicit `FCP_CONFIG` path must exist. Candidate paths are optional and
    /// defaults apply when none of them exist.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        debug!(
            inspected = candidates.len(),
            "no configuration file found; using defaults"
        );
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.telemetry.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the daily rolling JSON log. Stdout only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Prometheus series are scraped from `/metrics` on the API listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_api_enabled(),
            listen: default_api_listen(),
        }
    }
}

/// Bounds applied to the request telemetry buffer.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Samples older than this are evicted on the next record. Zero disables age eviction.
    #[serde(rename = "max_age_secs", default = "default_telemetry_max_age")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub max_age: Duration,
    #[serde(default = "default_telemetry_max_samples")]
    pub max_samples: usize,
    #[serde(rename = "default_window_secs", default = "default_telemetry_window")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub default_window: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            max_age: default_telemetry_max_age(),
            max_samples: default_telemetry_max_samples(),
            default_window: default_telemetry_window(),
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_samples == 0 {
            return Err(anyhow!("telemetry.max_samples must be greater than zero"));
        }
        if self.default_window.is_zero() {
            return Err(anyhow!(
                "telemetry.default_window_secs must be greater than zero"
            ));
        }
        Ok(())
    }

    /// Age bound as an option; zero means unbounded.
    pub fn max_age(&self) -> Option<Duration> {
        (!self.max_age.is_zero()).then_some(self.max_age)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillConfig {
    /// Probe identifier perturbed by the probe-disconnect drill and the recovery verifier.
    #[serde(default = "default_drill_probe_id")]
    pub probe_id: String,
    /// Retained drill results; zero keeps everything.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            probe_id: default_drill_probe_id(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorecardConfig {
    #[serde(default = "default_window_label")]
    pub window_label: String,
}

impl Default for ScorecardConfig {
    fn default() -> Self {
        Self {
            window_label: default_window_label(),
        }
    }
}

/// Static fleet counters used until a live fleet source is wired in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FleetConfig {
    #[serde(default)]
    pub probes_total: u64,
    #[serde(default)]
    pub probes_connected: u64,
    #[serde(default)]
    pub commands_total: u64,
    #[serde(default)]
    pub commands_succeeded: u64,
}
