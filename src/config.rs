use std::{env, fmt, fmt::Display, str::FromStr};

use chrono_tz::Tz;
use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use crate::{error::ConfigError, timing::schedule::DEFAULT_STEP_MINUTES};

const DEFAULT_ADMIN_PATH: &str = "admin";
const DEFAULT_PORT: u16 = 7878;
const DEFAULT_DATABASE_PATH: &str = "data.db";

/// The admin credentials and the path segment the back-office lives under.
#[derive(Clone, Deserialize)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
    #[serde(default = "default_admin_path")]
    pub path: String,
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("path", &self.path)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub admin: AdminConfig,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(
        default = "default_timezone",
        deserialize_with = "deserialize_timezone"
    )]
    pub timezone: Tz,
    #[serde(default = "default_step")]
    pub slot_step_minutes: u16,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from a JSON document.
    pub fn from_config(config: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(config)?;
        config.validate()
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let admin = AdminConfig {
            username: var("ADMIN_USERNAME").ok_or(ConfigError::Missing("ADMIN_USERNAME"))?,
            password: var("ADMIN_PASSWORD").ok_or(ConfigError::Missing("ADMIN_PASSWORD"))?,
            path: var("ADMIN_PATH").unwrap_or_else(|| {
                info!("ADMIN_PATH not set, using default: {DEFAULT_ADMIN_PATH}");
                default_admin_path()
            }),
        };

        let config = Self {
            admin,
            port: try_load("PORT", var("PORT"), DEFAULT_PORT)?,
            database_path: var("DATABASE_PATH").unwrap_or_else(|| {
                info!("DATABASE_PATH not set, using default: {DEFAULT_DATABASE_PATH}");
                default_database_path()
            }),
            timezone: try_load("BUSINESS_TIMEZONE", var("BUSINESS_TIMEZONE"), default_timezone())?,
            slot_step_minutes: try_load(
                "SLOT_STEP_MINUTES",
                var("SLOT_STEP_MINUTES"),
                DEFAULT_STEP_MINUTES,
            )?,
        };
        config.validate()
    }

    fn validate(mut self) -> Result<Self, ConfigError> {
        if self.admin.username.is_empty() {
            return Err(ConfigError::Missing("ADMIN_USERNAME"));
        }
        if self.admin.password.is_empty() {
            return Err(ConfigError::Missing("ADMIN_PASSWORD"));
        }
        if self.slot_step_minutes == 0 {
            return Err(ConfigError::Invalid {
                key: "SLOT_STEP_MINUTES",
                reason: "must be greater than zero".to_owned(),
            });
        }
        self.admin.path = self.admin.path.trim_matches('/').to_owned();
        if self.admin.path.is_empty() {
            warn!("ADMIN_PATH is empty, using default: {DEFAULT_ADMIN_PATH}");
            self.admin.path = default_admin_path();
        }
        Ok(self)
    }
}

fn try_load<T: FromStr>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let Some(value) = value else {
        info!("{key} not set, using default");
        return Ok(default);
    };
    value.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }
    })
}

fn deserialize_timezone<'de, D>(deserializer: D) -> Result<Tz, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    name.parse::<Tz>().map_err(serde::de::Error::custom)
}

fn default_admin_path() -> String {
    DEFAULT_ADMIN_PATH.to_owned()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_owned()
}

fn default_timezone() -> Tz {
    chrono_tz::Asia::Dhaka
}

fn default_step() -> u16 {
    DEFAULT_STEP_MINUTES
}
