use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TslError, TslResult};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TIMEOUT_SEC: f64 = 5.0;

/// How a query collects its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    /// One read of whatever has arrived. A slow instrument can leave the reply truncated.
    Single,
    /// Keep reading until the reply's newline shows up.
    #[default]
    Line,
}

/// Connection parameters for one instrument, fixed once the session is open.
///
/// Can be loaded from JSON; everything except `host` has a default:
///
/// ```
/// use santec_tsl::config::{ReadMode, SessionConfig};
///
/// let cfg = SessionConfig::from_json(r#"{ "host": "192.168.0.200" }"#).unwrap();
/// assert_eq!(cfg.port, 5000);
/// assert_eq!(cfg.read_mode, ReadMode::Line);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
    #[serde(default)]
    pub read_mode: ReadMode,
}

fn default_port() -> u16 { DEFAULT_PORT }
fn default_timeout_secs() -> f64 { DEFAULT_TIMEOUT_SEC }

impl SessionConfig {

    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_owned(),
            port,
            timeout_secs: DEFAULT_TIMEOUT_SEC,
            read_mode: ReadMode::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs_f64();
        self
    }

    pub fn with_read_mode(mut self, read_mode: ReadMode) -> Self {
        self.read_mode = read_mode;
        self
    }

    pub fn from_json(text: &str) -> TslResult<Self> {
        let cfg: SessionConfig = serde_json::from_str(text)
            .map_err(|e| TslError::Config(format!("Malformed session config: {e}")))?;
        cfg.timeout()?;
        Ok(cfg)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> TslResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| TslError::Config(format!("Unable to read {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// The connect/read/write timeout. Zero, negative and non-finite values are rejected.
    pub fn timeout(&self) -> TslResult<Duration> {
        if self.timeout_secs.is_finite() && self.timeout_secs > 0.0 {
            Ok(Duration::from_secs_f64(self.timeout_secs))
        } else {
            Err(TslError::Config(format!("Timeout must be a positive number of seconds, got {}", self.timeout_secs)))
        }
    }

}
