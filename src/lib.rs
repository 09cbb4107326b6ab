//! Start containers and resolve the address they are reachable at.
//!
//! berth wraps a Docker or Podman engine for test tooling. It launches
//! containers from a [`engine::RunSpec`] and answers the question "at which
//! host does this process reach that container?", which depends on how the
//! engine is reached and whether the caller is itself containerised.
//!
//! # Modules
//!
//! - [`config`]: Configuration system with layered precedence (CLI > env > file > defaults)
//! - [`engine`]: Engine connection, container inspection and launching
//! - [`error`]: Semantic error types for the library
//! - [`probe`]: Facts about the calling process's environment
//! - [`resolver`]: Reachability resolution with best-effort fallback

pub mod config;
pub mod engine;
pub mod error;
pub mod probe;
pub mod resolver;
