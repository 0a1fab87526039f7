//! Environment variable handling.

use crate::loader::{ConfigError, ConfigLoader};
use crate::types::WardenConfig;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Environment variable names.
pub mod vars {
    // Configuration
    pub const WARDEN_CONFIG_PATH: &str = "WARDEN_CONFIG_PATH";
    pub const WARDEN_ENV: &str = "WARDEN_ENV";

    // Overrides applied on top of the config file
    pub const WARDEN_AUDIT_CAPACITY: &str = "WARDEN_AUDIT_CAPACITY";
    pub const WARDEN_DEADLINE_MS: &str = "WARDEN_DEADLINE_MS";
}

/// Environment configuration.
pub struct Environment {
    _guard: (),
}

impl Environment {
    /// Initialize environment from .env files.
    pub fn init() -> Result<Self, EnvError> {
        // Later files override earlier ones
        let _ = dotenvy::from_filename(".env");
        let _ = dotenvy::from_filename(".env.local");

        if let Ok(env) = env::var(vars::WARDEN_ENV) {
            let _ = dotenvy::from_filename(format!(".env.{}", env));
        }

        Ok(Self { _guard: () })
    }

    /// Load the full configuration for a process.
    ///
    /// Reads `.env` files, then `WARDEN_CONFIG_PATH` if set or the loader's
    /// default file otherwise, then applies [`apply_overrides`](Self::apply_overrides).
    pub fn load_config(loader: &ConfigLoader) -> Result<WardenConfig, EnvError> {
        Self::init()?;
        let mut config = match Self::config_path() {
            Some(path) => loader.load_file(path)?,
            None => loader.load()?,
        };
        Self::apply_overrides(&mut config)?;
        Ok(config)
    }

    /// Get an optional string variable.
    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok()
    }

    /// Get an integer variable.
    pub fn get_int<T: std::str::FromStr>(var: &str) -> Result<Option<T>, EnvError> {
        match env::var(var) {
            Ok(v) => v.trim().parse().map(Some).map_err(|_| EnvError::InvalidValue {
                var: var.to_string(),
                message: "expected integer".to_string(),
            }),
            Err(_) => Ok(None),
        }
    }

    /// Explicit config file location, if set.
    pub fn config_path() -> Option<PathBuf> {
        Self::get(vars::WARDEN_CONFIG_PATH).map(PathBuf::from)
    }

    /// Apply `WARDEN_AUDIT_CAPACITY` and `WARDEN_DEADLINE_MS` to a loaded config.
    pub fn apply_overrides(config: &mut WardenConfig) -> Result<(), EnvError> {
        if let Some(capacity) = Self::get_int::<usize>(vars::WARDEN_AUDIT_CAPACITY)? {
            if capacity == 0 {
                return Err(EnvError::InvalidValue {
                    var: vars::WARDEN_AUDIT_CAPACITY.to_string(),
                    message: "must be greater than 0".to_string(),
                });
            }
            config.audit.capacity = Some(capacity);
        }
        if let Some(deadline_ms) = Self::get_int::<u64>(vars::WARDEN_DEADLINE_MS)? {
            if deadline_ms == 0 {
                return Err(EnvError::InvalidValue {
                    var: vars::WARDEN_DEADLINE_MS.to_string(),
                    message: "must be greater than 0".to_string(),
                });
            }
            config.proxy.deadline_ms = deadline_ms;
        }
        Ok(())
    }
}
