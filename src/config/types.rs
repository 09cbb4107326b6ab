//! Configuration data types for berth.

use ortho_config::{OrthoConfig, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};

use crate::engine::DEFAULT_NETWORK;
use crate::error::{ConfigError, Result};
use crate::probe::DEFAULT_HOST_ALIAS;
use crate::resolver::DEFAULT_FALLBACK_HOST;

/// Address resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Network whose IP address and gateway are read from the engine.
    pub network: String,

    /// Host returned when container network lookups fail.
    pub fallback_host: String,

    /// Name the engine publishes for reaching the host machine.
    pub internal_host_alias: String,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            network: String::from(DEFAULT_NETWORK),
            fallback_host: String::from(DEFAULT_FALLBACK_HOST),
            internal_host_alias: String::from(DEFAULT_HOST_ALIAS),
        }
    }
}

impl ResolveConfig {
    /// Check that every resolution setting is non-empty.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("resolve.network", &self.network),
            ("resolve.fallback_host", &self.fallback_host),
            ("resolve.internal_host_alias", &self.internal_host_alias),
        ];

        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: String::from(field),
                    reason: String::from("must not be empty"),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Root application configuration.
///
/// Loaded from defaults, a configuration file, environment variables and
/// command-line arguments, lowest precedence first.
///
/// Configuration files are discovered in this order:
/// 1. Path specified via `BERTH_CONFIG_PATH` environment variable
/// 2. `.berth.toml` in the current working directory
/// 3. `.berth.toml` in the home directory
/// 4. `~/.config/berth/config.toml` (XDG default)
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "BERTH",
    post_merge_hook,
    discovery(
        app_name = "berth",
        env_var = "BERTH_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".berth.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct AppConfig {
    /// The container engine socket path or URL.
    pub engine_socket: Option<String>,

    /// Address resolution settings.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub resolve: ResolveConfig,
}

impl AppConfig {
    /// Validate the merged configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a resolution setting is empty.
    pub fn validate(&self) -> Result<()> {
        self.resolve.validate()
    }
}

impl PostMergeHook for AppConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        // An empty socket means "not configured" so environment fallbacks apply.
        if self
            .engine_socket
            .as_deref()
            .is_some_and(|socket| socket.trim().is_empty())
        {
            self.engine_socket = None;
        }
        Ok(())
    }
}
