use std::net::SocketAddr;

use anyhow::Result;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub aneel: AneelConfig,
    pub db: DbConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AneelConfig {
    pub base_url: String,
    pub http_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    pub interval_hours: u64,
    /// Providers refreshed on the fixed cadence; any other provider can
    /// still be refreshed on demand through the API.
    pub providers: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("TARIFAS__").split("__"));
        Ok(figment.extract()?)
    }
}
