//! Configuration loading with layered precedence.
//!
//! Layers are composed by hand with `MergeComposer` rather than through the
//! derived `load()`: the `Cli` struct owns subcommand dispatch, and the
//! environment layer is read through `mockable::Env` so tests can supply
//! variables without touching the process environment.
//!
//! Precedence, lowest to highest: defaults, configuration file, `BERTH_*`
//! environment variables, command-line arguments. The merged configuration
//! is validated before it is returned.

use camino::Utf8PathBuf;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use mockable::DefaultEnv;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};
use ortho_config::{MergeComposer, toml};

use crate::config::{AppConfig, Cli};
use crate::error::{ConfigError, Result};

/// Mapping from an environment variable to a configuration path.
struct EnvVarSpec {
    /// The environment variable name (e.g., `BERTH_ENGINE_SOCKET`).
    env_var: &'static str,
    /// The JSON path segments (e.g., `["resolve", "network"]`).
    path: &'static [&'static str],
}

/// Every environment variable the loader reads.
const ENV_VAR_SPECS: &[EnvVarSpec] = &[
    EnvVarSpec {
        env_var: "BERTH_ENGINE_SOCKET",
        path: &["engine_socket"],
    },
    EnvVarSpec {
        env_var: "BERTH_RESOLVE_NETWORK",
        path: &["resolve", "network"],
    },
    EnvVarSpec {
        env_var: "BERTH_RESOLVE_FALLBACK_HOST",
        path: &["resolve", "fallback_host"],
    },
    EnvVarSpec {
        env_var: "BERTH_RESOLVE_INTERNAL_HOST_ALIAS",
        path: &["resolve", "internal_host_alias"],
    },
];

/// Returns the environment variable names recognised by the config loader.
///
/// Tests use this to clear every `BERTH_*` variable without keeping a
/// separate list in sync.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_VAR_SPECS.iter().map(|spec| spec.env_var).collect()
}

/// Load a configuration file and push it to the composer.
fn load_config_file(path: &Utf8PathBuf, composer: &mut MergeComposer) -> Result<()> {
    let current_dir = Utf8PathBuf::from(".");
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| current_dir.as_ref());
    let file_name = path.file_name().unwrap_or(path.as_str());

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to open directory {parent}: {e}"),
        }
    })?;

    let content = dir
        .read_to_string(file_name)
        .map_err(|e| ConfigError::ParseError {
            message: format!("failed to read {path}: {e}"),
        })?;

    let value =
        toml::from_str::<serde_json::Value>(&content).map_err(|e| ConfigError::ParseError {
            message: format!("failed to parse {path}: {e}"),
        })?;

    composer.push_file(value, Some(path.clone()));
    Ok(())
}

/// Load configuration from every layer using the process environment.
///
/// # Errors
///
/// Returns `ConfigError` if a configuration file is malformed, the layers
/// cannot be merged, or the merged configuration fails validation.
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    load_config_with_env(cli, &DefaultEnv::new())
}

/// Load configuration from every layer, reading `BERTH_*` variables from
/// `env`.
///
/// # Errors
///
/// Returns the same errors as [`load_config`].
pub fn load_config_with_env<E: mockable::Env>(cli: &Cli, env: &E) -> Result<AppConfig> {
    let mut composer = MergeComposer::new();

    let defaults =
        serde_json::to_value(AppConfig::default()).map_err(|e| ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        })?;
    composer.push_defaults(defaults);

    let config_path: Option<Utf8PathBuf> =
        cli.config.clone().filter(|p| p.exists()).or_else(|| {
            let discovery = ConfigDiscovery::builder("berth")
                .env_var("BERTH_CONFIG_PATH")
                .config_file_name("config.toml")
                .dotfile_name(".berth.toml")
                .build();
            discovery
                .candidates()
                .into_iter()
                .filter(|p| p.exists())
                .find_map(|p| Utf8PathBuf::try_from(p).ok())
        });

    if let Some(ref path) = config_path {
        tracing::debug!(%path, "loading configuration file");
        load_config_file(path, &mut composer)?;
    }

    let env_values = collect_env_vars(env);
    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    let cli_overrides = build_cli_overrides(cli);
    if !cli_overrides.is_null() {
        composer.push_cli(cli_overrides);
    }

    let config =
        AppConfig::merge_from_layers(composer.layers()).map_err(ConfigError::OrthoConfig)?;
    config.validate()?;

    Ok(config)
}

/// Collect `BERTH_*` variables into a JSON value shaped like `AppConfig`.
fn collect_env_vars<E: mockable::Env>(env: &E) -> Value {
    let mut root = Map::new();

    for spec in ENV_VAR_SPECS {
        let Some(raw_value) = env.string(spec.env_var) else {
            continue;
        };
        insert_at_path(&mut root, spec.path, Value::String(raw_value));
    }

    if root.is_empty() {
        Value::Null
    } else {
        Value::Object(root)
    }
}

/// Insert a value at a nested path, creating intermediate objects.
fn insert_at_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((&field, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for &segment in parents {
        let entry = current
            .entry(String::from(segment))
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(obj) = entry.as_object_mut() else {
            return;
        };
        current = obj;
    }

    current.insert(String::from(field), value);
}

/// Build a JSON value containing CLI overrides.
fn build_cli_overrides(cli: &Cli) -> Value {
    let mut overrides = Map::new();

    if let Some(ref socket) = cli.engine_socket {
        overrides.insert(String::from("engine_socket"), Value::String(socket.clone()));
    }

    if overrides.is_empty() {
        Value::Null
    } else {
        Value::Object(overrides)
    }
}
