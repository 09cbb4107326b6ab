//! Reachability resolution.
//!
//! [`ReachabilityResolver`] picks the single address at which a container is
//! reachable from the calling process. Signals are consulted in decreasing
//! order of confidence: an operator override, the engine endpoint's own
//! hostname, and finally container network inspection when the caller is
//! itself containerised.
//!
//! Resolution is best-effort. Lookup failures never escape the resolver;
//! they degrade to a caller-supplied fallback host. The only "unknown"
//! outcome is an engine endpoint that cannot be parsed or whose scheme is
//! unsupported, reported as `None`.

use std::fmt;

use crate::engine::{AddressSource, ContainerRef, EndpointScheme};
use crate::error::BerthError;
use crate::probe::EnvironmentProbe;

/// Host returned when nothing better is known.
pub const DEFAULT_FALLBACK_HOST: &str = "localhost";

/// Loopback hostname. A network endpoint naming it is only meaningful from
/// the engine's own host, and a local socket outside a container resolves
/// to it regardless of the caller's fallback.
pub const LOCALHOST: &str = "localhost";

/// Signal that produced a resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// The operator-supplied override variable.
    EnvOverride,
    /// The hostname of a network engine endpoint.
    ExplicitHost,
    /// The engine's internal host alias.
    InternalHostAlias,
    /// The container's IP address on the inspected network.
    BridgeIp,
    /// The container network's gateway, or the host's default gateway.
    Gateway,
    /// The fallback host.
    Fallback,
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::EnvOverride => "env-override",
            Self::ExplicitHost => "explicit-host",
            Self::InternalHostAlias => "internal-host-alias",
            Self::BridgeIp => "bridge-ip",
            Self::Gateway => "gateway",
            Self::Fallback => "fallback",
        };
        f.write_str(label)
    }
}

/// A resolved address together with the signal it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCandidate {
    source: CandidateSource,
    value: String,
}

impl AddressCandidate {
    /// Create a candidate.
    #[must_use]
    pub fn new(source: CandidateSource, value: impl Into<String>) -> Self {
        Self {
            source,
            value: value.into(),
        }
    }

    /// Return the signal that produced the address.
    #[must_use]
    pub const fn source(&self) -> CandidateSource {
        self.source
    }

    /// Return the address.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Consume the candidate, keeping the address.
    #[must_use]
    pub fn into_value(self) -> String {
        self.value
    }
}

/// Chooses the address at which a container is reachable.
///
/// The resolver borrows its collaborators; it holds no state of its own and
/// may be rebuilt cheaply for each lookup.
pub struct ReachabilityResolver<'a, A, P> {
    source: &'a A,
    probe: &'a P,
}

impl<'a, A: AddressSource, P: EnvironmentProbe> ReachabilityResolver<'a, A, P> {
    /// Create a resolver over an address source and an environment probe.
    #[must_use]
    pub const fn new(source: &'a A, probe: &'a P) -> Self {
        Self { source, probe }
    }

    /// Resolve the address of `container` relative to the container network.
    ///
    /// Without an internal host alias the network gateway is returned. When
    /// the alias equals the gateway the container's own IP is returned
    /// instead; otherwise the alias wins. Any lookup failure yields
    /// `fallback`.
    #[must_use]
    pub async fn resolve_container_candidate_async(
        &self,
        container: &ContainerRef,
        fallback: &str,
    ) -> AddressCandidate {
        let alias = self.probe.docker_internal_host_alias();

        self.container_candidate(container, alias)
            .await
            .unwrap_or_else(|error| {
                tracing::debug!(
                    %container,
                    %error,
                    reason = fallback_reason(&error),
                    fallback,
                    "container address lookup failed; using fallback host"
                );
                AddressCandidate::new(CandidateSource::Fallback, fallback)
            })
    }

    /// Resolve the address of `container` relative to the container network.
    ///
    /// See [`Self::resolve_container_candidate_async`].
    #[must_use]
    pub async fn resolve_container_address_async(
        &self,
        container: &ContainerRef,
        fallback: &str,
    ) -> String {
        self.resolve_container_candidate_async(container, fallback)
            .await
            .into_value()
    }

    /// Resolve the host at which the calling process reaches `container`,
    /// keeping the winning signal.
    ///
    /// Returns `None` when the engine endpoint is malformed or uses a scheme
    /// that cannot be reached.
    #[must_use]
    pub async fn resolve_host_candidate_async(
        &self,
        container: &ContainerRef,
        fallback: &str,
    ) -> Option<AddressCandidate> {
        if let Some(host) = self.probe.override_host() {
            tracing::debug!(%host, "using host override");
            return Some(AddressCandidate::new(CandidateSource::EnvOverride, host));
        }

        let endpoint = self
            .source
            .engine_endpoint()
            .inspect_err(|error| tracing::warn!(%error, "engine endpoint unusable; host unknown"))
            .ok()?;

        let candidate = match endpoint.scheme() {
            EndpointScheme::Http | EndpointScheme::Https | EndpointScheme::Tcp => {
                let hostname = endpoint.hostname()?;
                if hostname == LOCALHOST && self.probe.is_inside_container() {
                    self.resolve_container_candidate_async(container, fallback)
                        .await
                } else {
                    AddressCandidate::new(CandidateSource::ExplicitHost, hostname)
                }
            }
            EndpointScheme::UnixSocket | EndpointScheme::NamedPipe => {
                if self.probe.is_inside_container() {
                    self.resolve_container_candidate_async(container, fallback)
                        .await
                } else {
                    AddressCandidate::new(CandidateSource::Fallback, LOCALHOST)
                }
            }
            EndpointScheme::Unknown => {
                tracing::warn!(?endpoint, "unsupported engine endpoint scheme; host unknown");
                return None;
            }
        };

        tracing::debug!(
            %container,
            source = %candidate.source(),
            host = candidate.value(),
            "host resolved"
        );
        Some(candidate)
    }

    /// Resolve the host at which the calling process reaches `container`.
    ///
    /// See [`Self::resolve_host_candidate_async`].
    #[must_use]
    pub async fn resolve_host_async(
        &self,
        container: &ContainerRef,
        fallback: &str,
    ) -> Option<String> {
        self.resolve_host_candidate_async(container, fallback)
            .await
            .map(AddressCandidate::into_value)
    }

    /// Resolve the host using a caller runtime handle.
    #[must_use]
    pub fn resolve_host(
        &self,
        runtime: &tokio::runtime::Handle,
        container: &ContainerRef,
        fallback: &str,
    ) -> Option<String> {
        runtime.block_on(self.resolve_host_async(container, fallback))
    }

    /// Resolve the container-network address using a caller runtime handle.
    #[must_use]
    pub fn resolve_container_address(
        &self,
        runtime: &tokio::runtime::Handle,
        container: &ContainerRef,
        fallback: &str,
    ) -> String {
        runtime.block_on(self.resolve_container_address_async(container, fallback))
    }

    async fn container_candidate(
        &self,
        container: &ContainerRef,
        alias: Option<String>,
    ) -> Result<AddressCandidate, BerthError> {
        let gateway = self.source.gateway_ip(container).await?;

        let Some(alias_address) = alias else {
            return Ok(AddressCandidate::new(CandidateSource::Gateway, gateway));
        };

        if alias_address == gateway {
            let bridge = self.source.bridge_ip(container).await?;
            return Ok(AddressCandidate::new(CandidateSource::BridgeIp, bridge));
        }

        Ok(AddressCandidate::new(
            CandidateSource::InternalHostAlias,
            alias_address,
        ))
    }
}

/// Describe why a container address lookup fell back.
const fn fallback_reason(error: &BerthError) -> &'static str {
    match error {
        BerthError::Lookup(_) => "address metadata unavailable",
        BerthError::Container(_) => "container engine query failed",
        BerthError::Config(_) => "configuration rejected",
    }
}
