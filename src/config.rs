//! Configuration module for httplogging.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The resulting value is passed explicitly to every job.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file (default: "logging.sqlite")
    pub db_path: PathBuf,
    /// Directory for log files and charts (default: ".")
    pub output_dir: PathBuf,
    /// Base URL of the regObs web API
    pub regobs_base_url: String,
    /// Base URL of the grid time-series service
    pub gts_base_url: String,
    /// Base URL of the chart server
    pub chartserver_base_url: String,
    /// Request timeout for time-series probes in seconds (default: 60)
    pub series_timeout_seconds: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("logging.sqlite"),
            output_dir: PathBuf::from("."),
            regobs_base_url: "https://api.nve.no/hydrology/regobs/webapi_v3.2.0".to_string(),
            gts_base_url: "http://h-web02.nve.no:8080".to_string(),
            chartserver_base_url: "http://h-web01.nve.no".to_string(),
            series_timeout_seconds: 60.0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `HTTPLOGGING_DB_PATH`: Database file path (default: "logging.sqlite")
    /// - `HTTPLOGGING_OUTPUT_DIR`: Output directory (default: ".")
    /// - `HTTPLOGGING_REGOBS_URL`: regObs API base URL
    /// - `HTTPLOGGING_GTS_URL`: grid time-series base URL
    /// - `HTTPLOGGING_CHARTSERVER_URL`: chart server base URL
    /// - `HTTPLOGGING_SERIES_TIMEOUT`: time-series request timeout in seconds
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(db_path) = env::var("HTTPLOGGING_DB_PATH") {
            cfg.db_path = PathBuf::from(db_path);
        }

        if let Ok(output_dir) = env::var("HTTPLOGGING_OUTPUT_DIR") {
            cfg.output_dir = PathBuf::from(output_dir);
        }

        if let Ok(url) = env::var("HTTPLOGGING_REGOBS_URL") {
            cfg.regobs_base_url = url;
        }

        if let Ok(url) = env::var("HTTPLOGGING_GTS_URL") {
            cfg.gts_base_url = url;
        }

        if let Ok(url) = env::var("HTTPLOGGING_CHARTSERVER_URL") {
            cfg.chartserver_base_url = url;
        }

        if let Ok(timeout_str) = env::var("HTTPLOGGING_SERIES_TIMEOUT") {
            if let Ok(timeout) = timeout_str.parse::<f64>() {
                if timeout > 0.0 && timeout.is_finite() {
                    cfg.series_timeout_seconds = timeout;
                }
            }
        }

        cfg
    }

    pub fn series_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.series_timeout_seconds)
    }

    /// Path of the flat log file for the given report name.
    pub fn log_file_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.log", name))
    }

    /// Path of the chart for the given report name.
    pub fn plot_file_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.svg", name))
    }
}
