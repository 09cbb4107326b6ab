//! Introspection of the environment the calling process runs in.
//!
//! The resolver needs a handful of facts that do not come from the container
//! engine: whether this process is itself containerised, how the engine's
//! host alias resolves, the default route's gateway, and an operator-supplied
//! host override. [`EnvironmentProbe`] is the seam; [`SystemProbe`] reads
//! the real system.

mod route;

use std::net::{IpAddr, ToSocketAddrs};
use std::sync::OnceLock;

use camino::Utf8PathBuf;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;

use crate::error::{BerthError, LookupError};

/// Environment variable carrying an operator-supplied host override.
pub const OVERRIDE_HOST_ENV: &str = "TC_HOST";

/// Host alias engines expose for reaching the host machine.
pub const DEFAULT_HOST_ALIAS: &str = "host.docker.internal";

/// Marker files engines place in the root of a container filesystem.
const CONTAINER_MARKERS: &[&str] = &[".dockerenv", "run/.containerenv"];

/// Routing table location relative to the filesystem root.
const ROUTE_TABLE: &str = "proc/net/route";

/// Facts about the calling process's environment.
///
/// Implementations must be cheap and free of side effects; the resolver may
/// call them repeatedly.
pub trait EnvironmentProbe {
    /// Whether the calling process itself runs inside a container.
    fn is_inside_container(&self) -> bool;

    /// IPv4 address the engine's host alias resolves to, if it resolves to
    /// one at all.
    fn docker_internal_host_alias(&self) -> Option<String>;

    /// Gateway of the default route as seen by this process.
    ///
    /// # Errors
    ///
    /// Returns a `LookupError` when there is no default route or the routing
    /// table cannot be read.
    fn default_gateway_ip(&self) -> Result<String, BerthError>;

    /// Operator-supplied host override, if set and non-empty.
    fn override_host(&self) -> Option<String>;
}

/// [`EnvironmentProbe`] backed by the real filesystem, resolver and
/// environment.
///
/// Filesystem reads are relative to a configurable root so the probe can be
/// pointed at a fixture directory.
///
/// The host alias is looked up through the system resolver, which blocks.
/// The lookup runs at most once; call [`SystemProbe::resolve_host_alias`]
/// before handing the probe to async code so that later calls only read the
/// cached address.
pub struct SystemProbe<'a, E: mockable::Env> {
    env: &'a E,
    root: Utf8PathBuf,
    host_alias: String,
    alias_address: OnceLock<Option<String>>,
}

impl<'a, E: mockable::Env> SystemProbe<'a, E> {
    /// Create a probe reading from `/` and resolving [`DEFAULT_HOST_ALIAS`].
    #[must_use]
    pub fn new(env: &'a E) -> Self {
        Self {
            env,
            root: Utf8PathBuf::from("/"),
            host_alias: String::from(DEFAULT_HOST_ALIAS),
            alias_address: OnceLock::new(),
        }
    }

    /// Read marker files and the routing table below `root`.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Resolve `alias` instead of [`DEFAULT_HOST_ALIAS`].
    #[must_use]
    pub fn with_host_alias(mut self, alias: impl Into<String>) -> Self {
        self.host_alias = alias.into();
        self.alias_address = OnceLock::new();
        self
    }

    /// Look the host alias up now, blocking the current thread.
    #[must_use]
    pub fn resolve_host_alias(self) -> Self {
        self.alias_address();
        self
    }

    fn alias_address(&self) -> Option<&str> {
        self.alias_address
            .get_or_init(|| lookup_ipv4(&self.host_alias))
            .as_deref()
    }

    fn open_root(&self) -> std::io::Result<Dir> {
        Dir::open_ambient_dir(&self.root, ambient_authority())
    }
}

impl<E: mockable::Env> EnvironmentProbe for SystemProbe<'_, E> {
    fn is_inside_container(&self) -> bool {
        let Ok(root) = self.open_root() else {
            return false;
        };
        CONTAINER_MARKERS
            .iter()
            .copied()
            .any(|marker| root.exists(marker))
    }

    fn docker_internal_host_alias(&self) -> Option<String> {
        self.alias_address().map(String::from)
    }

    fn default_gateway_ip(&self) -> Result<String, BerthError> {
        let table = self
            .open_root()
            .and_then(|root| root.read_to_string(ROUTE_TABLE))
            .map_err(|error| LookupError::RouteTableUnavailable {
                message: format!("failed to read {}: {error}", self.root.join(ROUTE_TABLE)),
            })?;

        route::parse_default_gateway(&table).map(|gateway| gateway.to_string())
    }

    fn override_host(&self) -> Option<String> {
        self.env
            .string(OVERRIDE_HOST_ENV)
            .filter(|value| !value.is_empty())
    }
}

/// First IPv4 address `host` resolves to; IPv6-only names count as absent.
fn lookup_ipv4(host: &str) -> Option<String> {
    if host.trim().is_empty() {
        return None;
    }

    let address = (host, 0)
        .to_socket_addrs()
        .ok()?
        .map(|socket| socket.ip())
        .find(IpAddr::is_ipv4)?;
    tracing::trace!(alias = host, %address, "host alias resolved");
    Some(address.to_string())
}
