//! `tracing` subscriber setup for binaries and tests embedding the vault.

use tracing_subscriber::EnvFilter;

use crate::config::VaultConfig;
use crate::error::VaultError;

/// Install a global fmt subscriber. `RUST_LOG` wins over `default_filter`.
///
/// # Errors
///
/// Returns `VaultError::Config` if the filter does not parse or a global
/// subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<(), VaultError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| VaultError::Config(format!("invalid log filter: {e}")))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| VaultError::Config(format!("tracing already initialized: {e}")))
}

/// [`init_tracing`] with the filter from `config`.
///
/// # Errors
///
/// See [`init_tracing`].
pub fn init_from_config(config: &VaultConfig) -> Result<(), VaultError> {
    init_tracing(&config.log_filter)
}
