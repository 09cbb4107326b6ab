//! Semantic error types for berth.
//!
//! Errors are split by what the caller can do about them: configuration
//! problems, metadata that could not be found, and container engine failures.
//! Library code returns these `thiserror` enums; the binary converts them to
//! `eyre::Report` at its boundary.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A required configuration value is missing.
    #[error("missing required configuration: {field}")]
    MissingRequired {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The engine endpoint URL could not be parsed.
    #[error("invalid engine endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The endpoint as configured.
        endpoint: String,
        /// Why the endpoint was rejected.
        reason: String,
    },

    /// The `OrthoConfig` library returned an error during configuration loading.
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// Errors raised when requested metadata does not exist.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The container is not attached to the requested network.
    #[error("container '{container_id}' is not attached to network '{network}'")]
    NetworkNotAttached {
        /// The container that was inspected.
        container_id: String,
        /// The network that was expected.
        network: String,
    },

    /// The network entry exists but lacks the requested attribute.
    #[error("container '{container_id}' has no {attribute} on network '{network}'")]
    AttributeMissing {
        /// The container that was inspected.
        container_id: String,
        /// The network that was inspected.
        network: String,
        /// The missing attribute, such as `IP address` or `gateway`.
        attribute: &'static str,
    },

    /// The container port is not published to the host.
    #[error("port '{port}' of container '{container_id}' is not published")]
    PortNotPublished {
        /// The container that was inspected.
        container_id: String,
        /// The container port, in `port/protocol` form.
        port: String,
    },

    /// The routing table has no default route.
    #[error("no default route found in the routing table")]
    NoDefaultRoute,

    /// The routing table could not be read.
    #[error("routing table unavailable: {message}")]
    RouteTableUnavailable {
        /// A description of the read failure.
        message: String,
    },
}

/// Errors that can occur during container engine operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The container does not exist at the engine.
    #[error("container '{container_id}' not found")]
    NotFound {
        /// The container reference that was looked up.
        container_id: String,
    },

    /// Failed to connect to the container engine.
    #[error("failed to connect to container engine: {message}")]
    ConnectionFailed {
        /// A description of the connection failure.
        message: String,
    },

    /// The container engine socket was not found.
    #[error("container engine socket not found: {path}")]
    SocketNotFound {
        /// The path where the socket was expected.
        path: PathBuf,
    },

    /// Permission denied when accessing the container engine socket.
    #[error("permission denied accessing container socket: {path}")]
    PermissionDenied {
        /// The path to the socket.
        path: PathBuf,
    },

    /// The async runtime backing the synchronous API could not be created.
    #[error("failed to create async runtime: {message}")]
    RuntimeCreationFailed {
        /// A description of the runtime failure.
        message: String,
    },

    /// Health check failed - engine did not respond correctly.
    #[error("container engine health check failed: {message}")]
    HealthCheckFailed {
        /// A description of the health check failure.
        message: String,
    },

    /// Health check timed out.
    #[error("container engine health check timed out after {seconds} seconds")]
    HealthCheckTimeout {
        /// The timeout duration in seconds.
        seconds: u64,
    },

    /// Failed to inspect a container.
    #[error("failed to inspect container '{container_id}': {message}")]
    InspectFailed {
        /// The container that was inspected.
        container_id: String,
        /// A description of the inspect failure.
        message: String,
    },

    /// Failed to create a container.
    #[error("failed to create container: {message}")]
    CreateFailed {
        /// A description of the creation failure.
        message: String,
    },

    /// Failed to start a container.
    #[error("failed to start container '{container_id}': {message}")]
    StartFailed {
        /// The ID of the container that failed to start.
        container_id: String,
        /// A description of the start failure.
        message: String,
    },

    /// Failed to read container output.
    #[error("failed to read logs of container '{container_id}': {message}")]
    LogsFailed {
        /// The ID of the container.
        container_id: String,
        /// A description of the failure.
        message: String,
    },

    /// Failed to remove a container.
    #[error("failed to remove container '{container_id}': {message}")]
    RemoveFailed {
        /// The ID of the container.
        container_id: String,
        /// A description of the failure.
        message: String,
    },
}

/// Top-level error type for berth.
///
/// Aggregates the domain errors so a single `Result` alias can be used across
/// the library. The binary converts these into `eyre::Report`.
#[derive(Debug, Error)]
pub enum BerthError {
    /// An error occurred during configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Requested metadata could not be found.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// An error occurred talking to the container engine.
    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// A specialised `Result` type for berth operations.
pub type Result<T> = std::result::Result<T, BerthError>;
