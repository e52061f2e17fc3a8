use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use domain::discovery::DiscoveryFilter;
use domain::printer::{CutMode, PrinterSeries};
use domain::DiscoveredDevice;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PrinterConfig {
    /// Model used when `connectPrinter` names none (or an unknown one)
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Lines fed before the trailing cut of every job
    #[serde(default = "default_trailer_feed_lines")]
    pub trailer_feed_lines: u8,
    #[serde(default)]
    pub cut_mode: CutMode,
    /// How long to wait for a job completion signal; 0 waits forever
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

fn default_model() -> String {
    "TM-T88".to_string()
}
fn default_trailer_feed_lines() -> u8 {
    3
}
fn default_job_timeout_secs() -> u64 {
    30
}
fn default_connect_timeout_ms() -> u64 {
    15_000
}
fn default_send_timeout_ms() -> u64 {
    10_000
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            trailer_feed_lines: default_trailer_feed_lines(),
            cut_mode: CutMode::default(),
            job_timeout_secs: default_job_timeout_secs(),
            connect_timeout_ms: default_connect_timeout_ms(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

impl PrinterConfig {
    pub fn default_series(&self) -> PrinterSeries {
        PrinterSeries::from_model_name(&self.default_model).unwrap_or_default()
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DiscoveryConfig {
    #[serde(default = "default_stop_retry_interval_ms")]
    pub stop_retry_interval_ms: u64,
    /// Maximum stop attempts while the scan reports "processing"; 0 retries forever
    #[serde(default = "default_stop_retry_limit")]
    pub stop_retry_limit: u32,
    #[serde(default)]
    pub filter: DiscoveryFilter,
}

fn default_stop_retry_interval_ms() -> u64 {
    100
}
fn default_stop_retry_limit() -> u32 {
    50
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            stop_retry_interval_ms: default_stop_retry_interval_ms(),
            stop_retry_limit: default_stop_retry_limit(),
            filter: DiscoveryFilter::default(),
        }
    }
}

impl DiscoveryConfig {
    pub fn stop_retry_interval(&self) -> Duration {
        Duration::from_millis(self.stop_retry_interval_ms)
    }

    pub fn stop_retry_limit(&self) -> Option<u32> {
        (self.stop_retry_limit > 0).then_some(self.stop_retry_limit)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}
fn default_server_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimulatorConfig {
    /// Delay between `send_data` and the completion signal
    #[serde(default = "default_print_latency_ms")]
    pub print_latency_ms: u64,
    #[serde(default = "default_announce_interval_ms")]
    pub announce_interval_ms: u64,
    #[serde(default = "default_simulated_devices")]
    pub devices: Vec<DiscoveredDevice>,
}

fn default_print_latency_ms() -> u64 {
    200
}
fn default_announce_interval_ms() -> u64 {
    500
}
fn default_simulated_devices() -> Vec<DiscoveredDevice> {
    vec![
        DiscoveredDevice {
            device_name: "TM-m30".to_string(),
            target: "TCP:192.168.0.10".to_string(),
            ip_address: "192.168.0.10".to_string(),
            mac_address: "00:26:AB:10:20:30".to_string(),
            device_type: 1,
            bd_address: String::new(),
        },
        DiscoveredDevice {
            device_name: "TM-P80".to_string(),
            target: "BT:00:01:90:AA:BB:CC".to_string(),
            ip_address: String::new(),
            mac_address: String::new(),
            device_type: 1,
            bd_address: "00:01:90:AA:BB:CC".to_string(),
        },
    ]
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            print_latency_ms: default_print_latency_ms(),
            announce_interval_ms: default_announce_interval_ms(),
            devices: default_simulated_devices(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub printer: PrinterConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl AgentConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Shared settings, e.g. config/default.toml
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            // Per-environment overrides, e.g. config/production.toml
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. EPOS__PRINTER__JOB_TIMEOUT_SECS=10)
            .add_source(Environment::with_prefix("EPOS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
