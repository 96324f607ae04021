//! Gateway configuration with env loading and validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use url::Url;

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Webhook authentication and caller authorization
    pub security: SecurityConfig,
    /// Rate limiting and replay suppression
    pub throttle: ThrottleConfig,
    /// Upstream vehicle API configuration
    pub vehicle: VehicleConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            security: SecurityConfig::default(),
            throttle: ThrottleConfig::default(),
            vehicle: VehicleConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `VOICELOCK_HTTP_HOST` / `VOICELOCK_HTTP_PORT`: bind address
    /// - `BASE_URL`: public base URL the webhook provider signs against (required)
    /// - `TWILIO_AUTH_TOKEN`: shared webhook signing secret
    /// - `ALLOWED_CALLERS`: comma-separated caller allow-list
    /// - `TESSIE_API_BASE`: vehicle API base URL
    /// - `TESSIE_TOKEN`: vehicle API bearer token
    /// - `TESLA_VIN`: vehicle identifier
    /// - `VOICELOCK_RATE_WINDOW_SECS` / `VOICELOCK_RATE_MAX` /
    ///   `VOICELOCK_REPLAY_SECS`: throttle overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(host) = env::var("VOICELOCK_HTTP_HOST") {
            config.http.host = host.parse().map_err(|_| ConfigError::Invalid {
                name: "VOICELOCK_HTTP_HOST",
                reason: format!("not an IP address: {host}"),
            })?;
        }
        if let Ok(port) = env::var("VOICELOCK_HTTP_PORT") {
            config.http.port = port.parse().map_err(|_| ConfigError::Invalid {
                name: "VOICELOCK_HTTP_PORT",
                reason: format!("not a port number: {port}"),
            })?;
        }

        config.security.public_base_url =
            env::var("BASE_URL").map_err(|_| ConfigError::MissingVar("BASE_URL"))?;
        config.security.auth_token = env::var("TWILIO_AUTH_TOKEN").ok();
        config.security.allowed_callers = env::var("ALLOWED_CALLERS")
            .map(|raw| parse_allow_list(&raw))
            .unwrap_or_default();

        if let Ok(base) = env::var("TESSIE_API_BASE") {
            config.vehicle.api_base = base;
        }
        config.vehicle.access_token = env::var("TESSIE_TOKEN").ok();
        config.vehicle.vehicle_id = env::var("TESLA_VIN").ok();

        if let Some(secs) = parse_env_u64("VOICELOCK_RATE_WINDOW_SECS")? {
            config.throttle.window = Duration::from_secs(secs);
        }
        if let Some(max) = parse_env_u64("VOICELOCK_RATE_MAX")? {
            config.throttle.max_attempts = max as u32;
        }
        if let Some(secs) = parse_env_u64("VOICELOCK_REPLAY_SECS")? {
            config.throttle.replay_interval = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.throttle.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "VOICELOCK_RATE_MAX",
                reason: "max attempts cannot be 0".into(),
            });
        }
        if self.throttle.window.is_zero() {
            return Err(ConfigError::Invalid {
                name: "VOICELOCK_RATE_WINDOW_SECS",
                reason: "rate window cannot be 0".into(),
            });
        }
        if !self.security.public_base_url.is_empty() {
            let url = Url::parse(&self.security.public_base_url).map_err(|e| {
                ConfigError::Invalid {
                    name: "BASE_URL",
                    reason: e.to_string(),
                }
            })?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::Invalid {
                    name: "BASE_URL",
                    reason: format!("unsupported scheme: {}", url.scheme()),
                });
            }
        }
        if self.vehicle.api_base.is_empty() {
            return Err(ConfigError::Invalid {
                name: "TESSIE_API_BASE",
                reason: "api base cannot be empty".into(),
            });
        }
        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Bind port
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
        }
    }
}

/// Webhook authentication and caller authorization configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shared secret the webhook provider signs requests with.
    /// Absent means every signature check fails closed.
    pub auth_token: Option<String>,
    /// Callers permitted to toggle the vehicle
    pub allowed_callers: Vec<String>,
    /// Public base URL used to reconstruct the signed request URL
    pub public_base_url: String,
}

/// Rate limiting and replay suppression configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Rate limit window length
    pub window: Duration,
    /// Max gated attempts per caller per window
    pub max_attempts: u32,
    /// Minimum interval between two successful toggles by one caller
    pub replay_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(5 * 60),
            max_attempts: 5,
            replay_interval: Duration::from_secs(10),
        }
    }
}

/// Upstream vehicle API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Vehicle API base URL
    pub api_base: String,
    /// Bearer token for the vehicle API.
    /// Absent means attempts fail with a configuration error at the vehicle stage.
    pub access_token: Option<String>,
    /// Vehicle identifier (VIN)
    pub vehicle_id: Option<String>,
    /// Pause before the single retry of a transient upstream failure
    pub retry_pause: Duration,
    /// Retry budget per upstream call
    pub max_retries: u32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.tessie.com".to_string(),
            access_token: None,
            vehicle_id: None,
            retry_pause: Duration::from_millis(1500),
            max_retries: 1,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    /// A value failed to parse or validate
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        name: &'static str,
        reason: String,
    },

    /// Vehicle identifier missing at command time
    #[error("vehicle id is not configured")]
    MissingVehicleId,

    /// Vehicle API token missing at command time
    #[error("vehicle API token is not configured")]
    MissingVehicleToken,
}

/// Split a comma-separated allow-list, trimming entries and dropping empties.
pub fn parse_allow_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                name,
                reason: format!("not an integer: {raw}"),
            }),
        Err(_) => Ok(None),
    }
}
