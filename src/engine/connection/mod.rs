//! Socket resolution and container engine connection.
//!
//! The engine socket is taken from configuration, then the conventional
//! `DOCKER_HOST`-style variables, then the platform default. Connections
//! are opened with Bollard; container queries and runs are layered on top
//! in the submodules.

mod error_classification;
mod health_check;
mod inspect;
mod run_container;

use bollard::Docker;

use super::{EndpointScheme, EngineEndpoint};
use crate::error::{BerthError, ConfigError, ContainerError};

pub(crate) use self::error_classification::classify_engine_error;
use self::error_classification::classify_connection_error;
pub use self::inspect::{ContainerInspector, InspectContainerFuture};
pub(crate) use self::run_container::normalize_container_port;
pub use self::run_container::{
    CollectLogsFuture, ContainerRunClient, ContainerRunFuture, CreateContainerFuture, HostPort,
    RunOutcome, RunSpec, parse_port_mapping,
};

/// Environment variable names checked in fallback order after configuration sources.
const FALLBACK_ENV_VARS: &[&str] = &["DOCKER_HOST", "CONTAINER_HOST", "PODMAN_HOST"];

/// Connection timeout in seconds for Docker/Podman API connections.
const CONNECTION_TIMEOUT_SECS: u64 = 120;

/// Timeout in seconds for health check operations.
const HEALTH_CHECK_TIMEOUT_SECS: u64 = 10;

/// Default socket path for Unix platforms.
#[cfg(unix)]
const DEFAULT_SOCKET: &str = "unix:///var/run/docker.sock";

/// Default socket path for Windows platforms.
#[cfg(windows)]
const DEFAULT_SOCKET: &str = "npipe:////./pipe/docker_engine";

/// Resolves container engine socket endpoints from environment variables.
///
/// The resolver checks a prioritised list of environment variables to find
/// the socket endpoint when no explicit configuration is provided.
///
/// # Example
///
/// ```ignore
/// use mockable::DefaultEnv;
/// use berth::engine::SocketResolver;
///
/// let env = DefaultEnv::new();
/// let resolver = SocketResolver::new(&env);
///
/// if let Some(socket) = resolver.resolve_from_env() {
///     println!("Found socket: {}", socket);
/// }
/// ```
pub struct SocketResolver<'a, E: mockable::Env> {
    env: &'a E,
}

impl<'a, E: mockable::Env> SocketResolver<'a, E> {
    /// Creates a new socket resolver with the given environment provider.
    #[must_use]
    pub const fn new(env: &'a E) -> Self {
        Self { env }
    }

    /// Resolves the socket endpoint from fallback environment variables.
    ///
    /// Checks `DOCKER_HOST`, `CONTAINER_HOST` and `PODMAN_HOST` in that
    /// order. Returns `None` if no fallback variable is set or all are empty.
    #[must_use]
    pub fn resolve_from_env(&self) -> Option<String> {
        FALLBACK_ENV_VARS
            .iter()
            .filter_map(|var_name| self.env.string(var_name))
            .find(|value| !value.is_empty())
    }

    /// Returns the platform default socket path.
    #[must_use]
    pub const fn default_socket() -> &'static str {
        DEFAULT_SOCKET
    }
}

/// Provides methods to connect to and drive Docker or Podman container
/// engines.
pub struct EngineConnector;

impl EngineConnector {
    /// Connect to the container engine at the specified socket path.
    ///
    /// The endpoint is parsed once into an [`EngineEndpoint`] and the
    /// transport is chosen from its scheme:
    /// - `unix://` and `npipe://` URIs are opened as local sockets
    /// - bare paths starting with `\\` or `//` become named pipes, other
    ///   bare paths become Unix sockets
    /// - `tcp://` is rewritten to `http://`; `http://` and `https://` are
    ///   used as given
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEndpoint` when the endpoint cannot be
    /// parsed or uses an unsupported scheme. Returns
    /// `ContainerError::SocketNotFound` or `ContainerError::PermissionDenied`
    /// when the socket cannot be opened, and
    /// `ContainerError::ConnectionFailed` for any other connection failure.
    pub fn connect(socket: &str) -> Result<Docker, BerthError> {
        tracing::debug!(socket, "connecting to container engine");
        let endpoint = EngineEndpoint::parse(socket)?;
        let trimmed = socket.trim();

        match endpoint.scheme() {
            EndpointScheme::UnixSocket | EndpointScheme::NamedPipe => {
                let uri = if trimmed.contains("://") {
                    String::from(trimmed)
                } else {
                    Self::normalize_bare_path(trimmed)
                };
                Docker::connect_with_socket(
                    &uri,
                    CONNECTION_TIMEOUT_SECS,
                    bollard::API_DEFAULT_VERSION,
                )
            }
            EndpointScheme::Tcp => Docker::connect_with_http(
                &Self::tcp_as_http(trimmed),
                CONNECTION_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
            EndpointScheme::Http | EndpointScheme::Https => Docker::connect_with_http(
                trimmed,
                CONNECTION_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
            EndpointScheme::Unknown => {
                return Err(ConfigError::InvalidEndpoint {
                    endpoint: String::from(socket),
                    reason: String::from("unsupported engine scheme"),
                }
                .into());
            }
        }
        .map_err(|error| BerthError::from(classify_connection_error(&error, socket)))
    }

    /// Replace a `tcp` scheme of any case with `http`.
    fn tcp_as_http(socket: &str) -> String {
        socket
            .split_once("://")
            .map_or_else(|| String::from(socket), |(_, rest)| format!("http://{rest}"))
    }

    /// Normalise a bare socket path to a URI with the appropriate scheme.
    ///
    /// Paths like `//some/path` are treated as named pipes even on Unix.
    fn normalize_bare_path(path: &str) -> String {
        if path.starts_with("\\\\") || path.starts_with("//") {
            format!("npipe://{path}")
        } else {
            format!("unix://{path}")
        }
    }

    /// Connect using the resolved socket from configuration and environment.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::connect`].
    pub fn connect_with_fallback<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Docker, BerthError> {
        let socket = Self::resolve_socket(config_socket, resolver);
        Self::connect(&socket)
    }

    /// Resolves the socket endpoint without establishing a connection.
    ///
    /// Resolution order:
    /// 1. `config_socket` (from CLI, config file, or `BERTH_ENGINE_SOCKET`)
    /// 2. `DOCKER_HOST`, `CONTAINER_HOST`, `PODMAN_HOST` (via resolver)
    /// 3. Platform default socket
    #[must_use]
    pub fn resolve_socket<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> String {
        config_socket
            .filter(|s| !s.is_empty())
            .map(String::from)
            .or_else(|| resolver.resolve_from_env())
            .unwrap_or_else(|| String::from(SocketResolver::<E>::default_socket()))
    }

    /// Create a tokio runtime for synchronous operations.
    pub(crate) fn create_runtime() -> Result<tokio::runtime::Runtime, BerthError> {
        tokio::runtime::Runtime::new().map_err(|e| {
            BerthError::from(ContainerError::RuntimeCreationFailed {
                message: e.to_string(),
            })
        })
    }
}
