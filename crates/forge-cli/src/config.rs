//! Session configuration loader.
//!
//! Reads `config.toml` from the config directory and deserializes it
//! into [`SessionConfig`]. Falls back to defaults when the file is
//! missing or malformed.

use std::path::Path;

use forge_types::config::SessionConfig;

/// Load session configuration from `{config_dir}/config.toml`.
///
/// - If the file does not exist, returns [`SessionConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns
///   the default.
pub async fn load_session_config(config_dir: &Path) -> SessionConfig {
    let config_path = config_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return SessionConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return SessionConfig::default();
        }
    };

    match toml::from_str::<SessionConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            SessionConfig::default()
        }
    }
}
