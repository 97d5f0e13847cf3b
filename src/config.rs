//! Configuration for the Talkwire client
//!
//! Defaults work out of the box; a TOML file (all fields optional, a
//! partial overlay) and a couple of environment variables refine them.
//! Default file location: the platform config dir, e.g.
//! `~/.config/talkwire/config.toml`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::discovery::{ResolverConfig, SERVICE_TYPE};
use crate::machine::Timing;
use crate::{Error, Result};

/// Environment override for the static fallback address
pub const ENV_FALLBACK_ADDR: &str = "TALKWIRE_FALLBACK_ADDR";

/// Environment override for the talk key
pub const ENV_PTT_KEY: &str = "TALKWIRE_PTT_KEY";

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// mDNS service type the backend advertises
    pub service_type: String,

    /// Address used when discovery is exhausted
    pub fallback_addr: SocketAddr,

    /// Discovery attempts before falling back
    pub discovery_attempts: u32,

    /// Per-attempt discovery timeout
    pub discovery_timeout: Duration,

    /// Delay between discovery attempts
    pub discovery_backoff: Duration,

    /// Talk key name (e.g. "space", "f9")
    pub ptt_key: String,

    /// Debounce interval for the talk input
    pub debounce_interval: Duration,

    /// Control-loop sleep while idle
    pub idle_poll: Duration,

    /// State machine timers
    pub timing: Timing,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_type: SERVICE_TYPE.to_string(),
            fallback_addr: SocketAddr::from(([127, 0, 0, 1], 12345)),
            discovery_attempts: 5,
            discovery_timeout: Duration::from_secs(3),
            discovery_backoff: Duration::from_secs(1),
            ptt_key: "space".to_string(),
            debounce_interval: Duration::from_millis(30),
            idle_poll: Duration::from_millis(20),
            timing: Timing::default(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the TOML overlay, then env
    ///
    /// `path` overrides the default file location. A missing file is fine;
    /// a malformed one is an error.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed, or if
    /// an override value is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let file_path = path.map_or_else(default_path, |p| Some(p.to_path_buf()));
        if let Some(file_path) = file_path {
            if file_path.exists() {
                let raw = std::fs::read_to_string(&file_path)?;
                let file: ConfigFile = toml::from_str(&raw)?;
                config.apply_file(&file)?;
                tracing::debug!(path = %file_path.display(), "loaded config file");
            } else if path.is_some() {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    file_path.display()
                )));
            }
        }

        if let Ok(addr) = std::env::var(ENV_FALLBACK_ADDR) {
            config.fallback_addr = parse_addr(&addr)?;
        }
        if let Ok(key) = std::env::var(ENV_PTT_KEY) {
            config.ptt_key = key;
        }

        Ok(config)
    }

    /// Overlay a parsed config file onto the current values
    fn apply_file(&mut self, file: &ConfigFile) -> Result<()> {
        if let Some(service) = &file.backend.service {
            self.service_type = service.clone();
        }
        if let Some(addr) = &file.backend.fallback_addr {
            self.fallback_addr = parse_addr(addr)?;
        }

        if let Some(attempts) = file.discovery.attempts {
            if attempts == 0 {
                return Err(Error::Config("discovery.attempts must be > 0".to_string()));
            }
            self.discovery_attempts = attempts;
        }
        if let Some(ms) = file.discovery.attempt_timeout_ms {
            self.discovery_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.discovery.backoff_ms {
            self.discovery_backoff = Duration::from_millis(ms);
        }

        if let Some(key) = &file.button.key {
            self.ptt_key = key.clone();
        }
        if let Some(ms) = file.button.debounce_ms {
            self.debounce_interval = Duration::from_millis(ms);
        }

        if let Some(ms) = file.timing.grace_period_ms {
            self.timing.grace_period = Duration::from_millis(ms);
        }
        if let Some(ms) = file.timing.ack_poll_ms {
            self.timing.ack_poll = Duration::from_millis(ms);
        }
        if let Some(secs) = file.timing.processing_deadline_secs {
            self.timing.processing_deadline = Duration::from_secs(secs);
        }
        if let Some(ms) = file.timing.blink_interval_ms {
            self.timing.blink_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = file.timing.idle_poll_ms {
            self.idle_poll = Duration::from_millis(ms);
        }

        Ok(())
    }

    /// Discovery schedule derived from this config
    #[must_use]
    pub fn resolver(&self) -> ResolverConfig {
        ResolverConfig {
            service_type: self.service_type.clone(),
            attempts: self.discovery_attempts,
            attempt_timeout: self.discovery_timeout,
            backoff: self.discovery_backoff,
            fallback: self.fallback_addr,
        }
    }
}

/// Default config file path under the platform config dir
fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "omni", "talkwire")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn parse_addr(raw: &str) -> Result<SocketAddr> {
    raw.parse()
        .map_err(|_| Error::Config(format!("invalid socket address: {raw}")))
}

/// TOML file schema; every field optional
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    backend: BackendFile,

    #[serde(default)]
    discovery: DiscoveryFile,

    #[serde(default)]
    button: ButtonFile,

    #[serde(default)]
    timing: TimingFile,
}

#[derive(Debug, Default, Deserialize)]
struct BackendFile {
    /// mDNS service type (e.g. `_talkwire-backend._tcp.local.`)
    service: Option<String>,

    /// Static fallback, `host:port`
    fallback_addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscoveryFile {
    attempts: Option<u32>,
    attempt_timeout_ms: Option<u64>,
    backoff_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ButtonFile {
    key: Option<String>,
    debounce_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TimingFile {
    grace_period_ms: Option<u64>,
    ack_poll_ms: Option<u64>,
    processing_deadline_secs: Option<u64>,
    blink_interval_ms: Option<u64>,
    idle_poll_ms: Option<u64>,
}
