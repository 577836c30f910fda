use actix_cors::Cors;
use serde::Deserialize;

use crate::server_state::GatewayOptions;

pub const ENV_PREFIX: &str = "DRAWBOARD_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable error: {0}")]
    Env(#[from] envy::Error),
}

/// Server settings, read from `DRAWBOARD_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Comma separated origins allowed to call the HTTP endpoints.
    pub cors_origins: Option<String>,

    /// Bind each connection to the first identity it presents.
    #[serde(default)]
    pub pin_identity: bool,

    /// Capacity of each connection's outbound channel.
    #[serde(default = "default_egress_buffer")]
    pub egress_buffer: usize,
}

impl Config {
    /// Loads `.env` if there is one, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                log::warn!("Ignoring .env: {}", err);
            }
        }
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(ENV_PREFIX).from_iter(vars)?)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            pin_identity: self.pin_identity,
        }
    }

    pub fn allowed_origins(&self) -> Vec<&str> {
        self.cors_origins
            .as_deref()
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn cors(&self) -> Cors {
        self.allowed_origins()
            .into_iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET"])
            .max_age(3600)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: None,
            pin_identity: false,
            egress_buffer: default_egress_buffer(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_egress_buffer() -> usize {
    256
}
