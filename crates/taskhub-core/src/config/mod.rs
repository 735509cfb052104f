//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! optional TOML files and `TASKHUB__` environment variables. Every field has
//! a default, so the gateway starts with no configuration files at all.

pub mod app;
pub mod auth;
pub mod events;
pub mod logging;
pub mod realtime;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::auth::AuthConfig;
pub use self::events::EventsConfig;
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;

use crate::error::AppError;
use crate::result::AppResult;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Realtime hub settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Token verification settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Upstream event ingress settings.
    #[serde(default)]
    pub events: EventsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the given environment name.
    ///
    /// Merges `config/default.toml`, `config/{env}.toml` and environment
    /// variables such as `TASKHUB__SERVER__PORT=9000`, later sources winning.
    pub fn load(env: &str) -> AppResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("TASKHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Parse configuration from a TOML string, applying defaults.
    pub fn from_toml_str(toml: &str) -> AppResult<Self> {
        let parsed: Self = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Rejects combinations the gateway cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        self.realtime.validate().map_err(AppError::configuration)?;

        if self.auth.jwt_secret.is_empty() && !self.auth.allow_anonymous {
            return Err(AppError::configuration(
                "auth.jwt_secret must be set unless auth.allow_anonymous is enabled",
            ));
        }

        if self.auth.jwt_secret.is_empty() && self.events.ingress_enabled {
            return Err(AppError::configuration(
                "auth.jwt_secret must be set when events.ingress_enabled is on",
            ));
        }

        Ok(())
    }
}
