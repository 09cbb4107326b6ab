//! Configuration system for berth.
//!
//! This module provides the configuration structures and CLI definitions for
//! berth. Layers are merged with the `ortho_config` crate: CLI flags override
//! environment variables, which override configuration files, which override
//! defaults.
//!
//! The configuration file is expected at `~/.config/berth/config.toml` by default.
//!
//! # Example Configuration
//!
//! ```toml
//! engine_socket = "unix:///run/user/1000/podman/podman.sock"
//!
//! [resolve]
//! network = "bridge"
//! fallback_host = "localhost"
//! internal_host_alias = "host.docker.internal"
//! ```

mod cli;
mod loader;
mod types;


pub use cli::{Cli, Commands, HostArgs, PortArgs, RunArgs};
pub use loader::{env_var_names, load_config, load_config_with_env};
pub use types::{AppConfig, ResolveConfig};
