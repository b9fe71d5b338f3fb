use crate::errors::ConfigError;
use log::{info, warn};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_EXPIRY_WARNING_SECS: u64 = 300;

//  CLIENT CONFIGURATION
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub token_file: PathBuf,
    pub request_timeout: Duration,
    pub jwt_secret: Option<String>,
    pub stripe_publishable_key: Option<String>,
    pub report_dir: PathBuf,
    pub expiry_warning_secs: u64,
}

impl AppConfig {
    /// Reads the process environment, after loading `.env` when one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("Ignoring unreadable .env file: {}", e),
        }
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // empty values count as unset
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let token_file = match get("MEALTIMES_TOKEN_FILE") {
            Some(path) => PathBuf::from(path),
            None => get("HOME")
                .map(|home| PathBuf::from(home).join(".mealtimes").join("token"))
                .ok_or(ConfigError::Missing { name: "HOME" })?,
        };

        Ok(AppConfig {
            api_url: get("MEALTIMES_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token_file,
            request_timeout: Duration::from_secs(parse_secs(
                "MEALTIMES_REQUEST_TIMEOUT_SECS",
                get("MEALTIMES_REQUEST_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )?),
            jwt_secret: get("MEALTIMES_JWT_SECRET"),
            stripe_publishable_key: get("STRIPE_PUBLISHABLE_KEY"),
            report_dir: get("MEALTIMES_REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            expiry_warning_secs: parse_secs(
                "MEALTIMES_EXPIRY_WARNING_SECS",
                get("MEALTIMES_EXPIRY_WARNING_SECS"),
                DEFAULT_EXPIRY_WARNING_SECS,
            )?,
        })
    }

    pub fn stripe_key(&self) -> Result<&str, ConfigError> {
        self.stripe_publishable_key
            .as_deref()
            .ok_or(ConfigError::Missing {
                name: "STRIPE_PUBLISHABLE_KEY",
            })
    }
}

fn parse_secs(name: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
