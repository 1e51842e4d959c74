//! Configuration loading, env substitution, environment overrides and
//! startup validation.
//!
//! Config files: `porter.toml`, `porter.yaml`, `porter.yml` or `porter.json`,
//! searched in `./` then the user config directory. All of them are optional:
//! a deployment can run purely from environment variables.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw
//! file text.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config},
    schema::{AccessConfig, MetricsConfig, PorterConfig, ServerConfig, TelegramConfig},
    validate::{Credentials, Diagnostic, Severity, ValidationResult, credentials, validate},
};
