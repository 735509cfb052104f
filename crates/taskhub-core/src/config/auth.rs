//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// JWT verification settings for WebSocket upgrades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret shared with the auth service.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Clock skew tolerance for `exp`, in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
    /// Accept upgrades without a token, owned by `anonymous`. Development only.
    #[serde(default)]
    pub allow_anonymous: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            leeway_seconds: default_leeway(),
            allow_anonymous: false,
        }
    }
}

fn default_jwt_secret() -> String {
    "dev_secret_key_change_in_production_please".to_string()
}

fn default_leeway() -> u64 {
    5
}
