//! Settings loader.
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML
//! file, then `ROSTER_*` environment variables.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use roster_domain::{AuthEndpoints, ClientSettings, DomainError};
use thiserror::Error;
use tracing::debug;

/// Prefix of the environment variables read by [`load_settings`].
pub const ENV_PREFIX: &str = "ROSTER";

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file given on the command line does not exist.
    #[error("settings file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A source could not be read or did not match the expected shape.
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    /// A value was read but is not acceptable.
    #[error(transparent)]
    Invalid(#[from] DomainError),

    /// No platform data directory and none configured.
    #[error("no data directory available; set ROSTER_DATA_DIR")]
    NoDataDir,
}

/// Loads settings from `path` (if given) and the process environment.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed, or if the result
/// does not validate (for example when `ROSTER_BASE_URL` is unset).
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings, SettingsError> {
    load_with_environment(path, Environment::with_prefix(ENV_PREFIX).try_parsing(true))
}

fn load_with_environment(
    path: Option<&Path>,
    environment: Environment,
) -> Result<ClientSettings, SettingsError> {
    let mut builder = Config::builder().set_default("base_url", "")?;

    if let Some(path) = path {
        if !path.exists() {
            return Err(SettingsError::NotFound(path.to_path_buf()));
        }
        debug!(path = %path.display(), "reading settings file");
        builder = builder.add_source(File::from(path.to_path_buf()).format(FileFormat::Toml));
    }

    let settings: ClientSettings = builder
        .add_source(environment)
        .build()?
        .try_deserialize()?;

    settings.validate()?;
    AuthEndpoints::from_settings(&settings)?;
    Ok(settings)
}

/// Directory holding the session file.
///
/// # Errors
///
/// Returns `NoDataDir` when neither the settings nor the platform name one.
pub fn resolve_data_dir(settings: &ClientSettings) -> Result<PathBuf, SettingsError> {
    settings
        .data_dir
        .clone()
        .or_else(|| dirs::data_dir().map(|dir| dir.join("roster")))
        .ok_or(SettingsError::NoDataDir)
}
