use std::{env, net::SocketAddr, path::PathBuf};

use dotenvy::dotenv;
use thiserror::Error;

use crate::upload::{AllowList, UploadRules};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} is not valid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub upload: UploadRules,
    /// Prefix for returned file URLs. Derived from the request when unset.
    pub public_base_url: Option<String>,
    pub enable_delete: bool,
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            upload: UploadRules {
                max_file_size: DEFAULT_MAX_FILE_SIZE,
                allowed_types: AllowList::images(),
            },
            public_base_url: None,
            enable_delete: true,
            cors_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source, falling back to the
    /// defaults for anything missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = parse_var("PORT", &port)?;
        }
        if let Some(dir) = lookup("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(size) = lookup("MAX_FILE_SIZE") {
            config.upload.max_file_size = parse_var("MAX_FILE_SIZE", &size)?;
        }
        if let Some(types) = lookup("ALLOWED_TYPES") {
            config.upload.allowed_types = parse_var("ALLOWED_TYPES", &types)?;
        }
        if let Some(url) = lookup("PUBLIC_BASE_URL") {
            let url = url.trim_end_matches('/');
            if !url.is_empty() {
                config.public_base_url = Some(url.to_string());
            }
        }
        if let Some(flag) = lookup("ENABLE_DELETE") {
            config.enable_delete = parse_var("ENABLE_DELETE", &flag)?;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "HOST",
                reason: e.to_string(),
            })
    }
}

fn parse_var<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}
