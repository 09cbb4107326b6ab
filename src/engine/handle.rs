//! A connected engine client bundled with the runtime that drives it.

use bollard::Docker;

use super::{
    ContainerRef, EngineAddressSource, EngineConnector, RunOutcome, RunSpec, SocketResolver,
};
use crate::error::BerthError;
use crate::probe::EnvironmentProbe;
use crate::resolver::ReachabilityResolver;

/// An engine client, the endpoint it was built from, and a Tokio runtime.
///
/// Built once and shared by reference; every synchronous entry point in
/// berth drives its async counterpart on the owned runtime.
pub struct EngineHandle {
    docker: Docker,
    endpoint: String,
    runtime: tokio::runtime::Runtime,
}

impl EngineHandle {
    /// Resolve the engine socket and connect to it.
    ///
    /// HTTP endpoints connect lazily; the first request reveals whether the
    /// engine is reachable. Use [`Self::connect_and_verify`] to fail early.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::RuntimeCreationFailed` when the runtime
    /// cannot be built, and the errors of [`EngineConnector::connect`].
    pub fn connect<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Self, BerthError> {
        let runtime = EngineConnector::create_runtime()?;
        let endpoint = EngineConnector::resolve_socket(config_socket, resolver);
        let docker = {
            let _guard = runtime.enter();
            EngineConnector::connect(&endpoint)?
        };

        Ok(Self {
            docker,
            endpoint,
            runtime,
        })
    }

    /// Connect and confirm the engine answers a ping.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::connect`] and [`Self::health_check`].
    pub fn connect_and_verify<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Self, BerthError> {
        let handle = Self::connect(config_socket, resolver)?;
        handle.health_check()?;
        Ok(handle)
    }

    /// Return the engine client.
    #[must_use]
    pub const fn docker(&self) -> &Docker {
        &self.docker
    }

    /// Return the endpoint URL the client was built from.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.endpoint
    }

    /// Return a handle to the owned runtime.
    #[must_use]
    pub fn runtime(&self) -> &tokio::runtime::Handle {
        self.runtime.handle()
    }

    /// Ping the engine.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::HealthCheckFailed` or
    /// `ContainerError::HealthCheckTimeout`.
    pub fn health_check(&self) -> Result<(), BerthError> {
        self.runtime
            .block_on(EngineConnector::health_check_async(&self.docker))
    }

    /// Build an address source reading `network` through this client.
    #[must_use]
    pub fn address_source<'a, P: EnvironmentProbe + Sync>(
        &'a self,
        probe: &'a P,
        network: &str,
    ) -> EngineAddressSource<'a, Docker, P> {
        EngineAddressSource::new(&self.docker, self.endpoint.as_str(), probe).with_network(network)
    }

    /// Resolve the host at which this process reaches `container`.
    ///
    /// `None` means the engine endpoint gives no usable host.
    #[must_use]
    pub fn resolve_host<P: EnvironmentProbe + Sync>(
        &self,
        probe: &P,
        network: &str,
        container: &ContainerRef,
        fallback: &str,
    ) -> Option<String> {
        let source = self.address_source(probe, network);
        ReachabilityResolver::new(&source, probe).resolve_host(self.runtime(), container, fallback)
    }

    /// Return the first host port published for `container_port`.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::PortNotPublished` or the inspect errors of
    /// [`EngineConnector::inspect_container_async`].
    pub fn host_port(
        &self,
        container: &ContainerRef,
        container_port: &str,
    ) -> Result<String, BerthError> {
        EngineConnector::host_port(self.runtime(), &self.docker, container, container_port)
    }

    /// Create and start a container, blocking until an attached run ends.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`EngineConnector::run_container_async`].
    pub fn run_container(&self, spec: &RunSpec) -> Result<RunOutcome, BerthError> {
        EngineConnector::run_container(self.runtime.handle(), &self.docker, spec)
    }
}
