//! Container network addresses read from engine metadata.
//!
//! [`AddressSource`] is the seam the resolver queries; [`EngineAddressSource`]
//! answers it by inspecting containers through a [`ContainerInspector`].

use std::future::Future;
use std::pin::Pin;

use bollard::models::{ContainerInspectResponse, EndpointSettings};

use super::{ContainerInspector, ContainerRef, EngineConnector, EngineEndpoint};
use crate::error::{BerthError, LookupError};
use crate::probe::EnvironmentProbe;

/// Network whose addresses are read when none is configured.
pub const DEFAULT_NETWORK: &str = "bridge";

/// Boxed future returned by [`AddressSource`] lookups.
pub type LookupFuture<'a> = Pin<Box<dyn Future<Output = Result<String, BerthError>> + Send + 'a>>;

/// Network-level addresses of containers and the engine endpoint.
pub trait AddressSource {
    /// IP address of `container` on the configured network.
    ///
    /// Fails with `ContainerError::NotFound` when the container does not
    /// exist and with a `LookupError` when it is not attached to the network.
    fn bridge_ip(&self, container: &ContainerRef) -> LookupFuture<'_>;

    /// Gateway of the configured network for `container`.
    ///
    /// When the engine cannot provide it, the host's default gateway is
    /// returned instead; only when both lookups fail is an error reported.
    fn gateway_ip(&self, container: &ContainerRef) -> LookupFuture<'_>;

    /// Parsed form of the engine's base URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEndpoint` when the base URL is malformed.
    fn engine_endpoint(&self) -> Result<EngineEndpoint, BerthError>;
}

/// [`AddressSource`] backed by container inspection.
pub struct EngineAddressSource<'a, C, P> {
    client: &'a C,
    base_url: String,
    probe: &'a P,
    network: String,
}

#[derive(Clone, Copy)]
enum NetworkAttribute {
    IpAddress,
    Gateway,
}

impl NetworkAttribute {
    const fn label(self) -> &'static str {
        match self {
            Self::IpAddress => "IP address",
            Self::Gateway => "gateway",
        }
    }

    fn read(self, settings: &EndpointSettings) -> Option<&str> {
        let value = match self {
            Self::IpAddress => settings.ip_address.as_deref(),
            Self::Gateway => settings.gateway.as_deref(),
        };
        value.filter(|text| !text.is_empty())
    }
}

impl<'a, C, P> EngineAddressSource<'a, C, P>
where
    C: ContainerInspector + Sync,
    P: EnvironmentProbe + Sync,
{
    /// Create an address source reading the [`DEFAULT_NETWORK`].
    #[must_use]
    pub fn new(client: &'a C, base_url: impl Into<String>, probe: &'a P) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            probe,
            network: String::from(DEFAULT_NETWORK),
        }
    }

    /// Read addresses from `network` instead of [`DEFAULT_NETWORK`].
    #[must_use]
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    /// Return the network whose addresses are read.
    #[must_use]
    pub fn network(&self) -> &str {
        &self.network
    }

    async fn network_attribute(
        &self,
        container: &ContainerRef,
        attribute: NetworkAttribute,
    ) -> Result<String, BerthError> {
        let inspect =
            EngineConnector::inspect_container_async(self.client, container.as_str()).await?;
        self.read_network_attribute(container, &inspect, attribute)
    }

    fn read_network_attribute(
        &self,
        container: &ContainerRef,
        inspect: &ContainerInspectResponse,
        attribute: NetworkAttribute,
    ) -> Result<String, BerthError> {
        let settings = inspect
            .network_settings
            .as_ref()
            .and_then(|settings| settings.networks.as_ref())
            .and_then(|networks| networks.get(&self.network))
            .ok_or_else(|| LookupError::NetworkNotAttached {
                container_id: String::from(container.as_str()),
                network: self.network.clone(),
            })?;

        attribute
            .read(settings)
            .map(String::from)
            .ok_or_else(|| {
                BerthError::from(LookupError::AttributeMissing {
                    container_id: String::from(container.as_str()),
                    network: self.network.clone(),
                    attribute: attribute.label(),
                })
            })
    }
}

impl<C, P> AddressSource for EngineAddressSource<'_, C, P>
where
    C: ContainerInspector + Sync,
    P: EnvironmentProbe + Sync,
{
    fn bridge_ip(&self, container: &ContainerRef) -> LookupFuture<'_> {
        let container_owned = container.clone();
        Box::pin(async move {
            self.network_attribute(&container_owned, NetworkAttribute::IpAddress)
                .await
        })
    }

    fn gateway_ip(&self, container: &ContainerRef) -> LookupFuture<'_> {
        let container_owned = container.clone();
        Box::pin(async move {
            self.network_attribute(&container_owned, NetworkAttribute::Gateway)
                .await
                .or_else(|error| {
                    // The host's default route stands in for the container
                    // network's gateway.
                    tracing::debug!(
                        container = %container_owned,
                        %error,
                        "container gateway unavailable; using host default gateway"
                    );
                    self.probe.default_gateway_ip()
                })
        })
    }

    fn engine_endpoint(&self) -> Result<EngineEndpoint, BerthError> {
        EngineEndpoint::parse(&self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bollard::models::NetworkSettings;
    use mockall::mock;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::engine::{EndpointScheme, InspectContainerFuture};
    use crate::error::{ConfigError, ContainerError};

    mock! {
        Inspector {}

        impl ContainerInspector for Inspector {
            fn inspect_container<'a>(&'a self, container_id: &str) -> InspectContainerFuture<'a>;
        }
    }

    mock! {
        Probe {}

        impl EnvironmentProbe for Probe {
            fn is_inside_container(&self) -> bool;
            fn docker_internal_host_alias(&self) -> Option<String>;
            fn default_gateway_ip(&self) -> Result<String, BerthError>;
            fn override_host(&self) -> Option<String>;
        }
    }

    #[fixture]
    fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
        tokio::runtime::Runtime::new()
    }

    #[fixture]
    fn container() -> ContainerRef {
        ContainerRef::from("redis-1")
    }

    fn attached_to(network: &str, ip: &str, gateway: &str) -> ContainerInspectResponse {
        let endpoint = EndpointSettings {
            ip_address: Some(String::from(ip)),
            gateway: Some(String::from(gateway)),
            ..EndpointSettings::default()
        };
        ContainerInspectResponse {
            network_settings: Some(NetworkSettings {
                networks: Some(HashMap::from([(String::from(network), endpoint)])),
                ..NetworkSettings::default()
            }),
            ..ContainerInspectResponse::default()
        }
    }

    fn inspector_returning(response: ContainerInspectResponse) -> MockInspector {
        let mut inspector = MockInspector::new();
        inspector.expect_inspect_container().returning(move |_| {
            let value = response.clone();
            Box::pin(async move { Ok(value) })
        });
        inspector
    }

    fn inspector_failing(status_code: u16) -> MockInspector {
        let mut inspector = MockInspector::new();
        inspector.expect_inspect_container().returning(move |_| {
            Box::pin(async move {
                Err(bollard::errors::Error::DockerResponseServerError {
                    status_code,
                    message: String::from("engine said no"),
                })
            })
        });
        inspector
    }

    fn probe_with_gateway(gateway: Result<&'static str, ()>) -> MockProbe {
        let mut probe = MockProbe::new();
        probe.expect_default_gateway_ip().returning(move || {
            gateway
                .map(String::from)
                .map_err(|()| BerthError::from(LookupError::NoDefaultRoute))
        });
        probe
    }

    #[rstest]
    fn bridge_ip_reads_configured_network(
        runtime: std::io::Result<tokio::runtime::Runtime>,
        container: ContainerRef,
    ) {
        let rt = runtime.expect("runtime should be created");
        let inspector = inspector_returning(attached_to("bridge", "172.17.0.5", "172.17.0.1"));
        let probe = MockProbe::new();
        let source = EngineAddressSource::new(&inspector, "unix:///var/run/docker.sock", &probe);

        let ip = rt.block_on(source.bridge_ip(&container));

        assert_eq!(ip.expect("bridge IP should be found"), "172.17.0.5");
    }

    #[rstest]
    fn bridge_ip_reports_missing_network(
        runtime: std::io::Result<tokio::runtime::Runtime>,
        container: ContainerRef,
    ) {
        let rt = runtime.expect("runtime should be created");
        let inspector = inspector_returning(attached_to("custom", "10.1.0.5", "10.1.0.1"));
        let probe = MockProbe::new();
        let source = EngineAddressSource::new(&inspector, "unix:///var/run/docker.sock", &probe);

        let result = rt.block_on(source.bridge_ip(&container));

        assert!(
            matches!(
                result,
                Err(BerthError::Lookup(LookupError::NetworkNotAttached { ref network, .. }))
                    if network == "bridge"
            ),
            "expected missing network, got: {result:?}"
        );
    }

    #[rstest]
    fn bridge_ip_treats_empty_address_as_missing(
        runtime: std::io::Result<tokio::runtime::Runtime>,
        container: ContainerRef,
    ) {
        let rt = runtime.expect("runtime should be created");
        let inspector = inspector_returning(attached_to("bridge", "", "172.17.0.1"));
        let probe = MockProbe::new();
        let source = EngineAddressSource::new(&inspector, "unix:///var/run/docker.sock", &probe);

        let result = rt.block_on(source.bridge_ip(&container));

        assert!(
            matches!(
                result,
                Err(BerthError::Lookup(LookupError::AttributeMissing { attribute: "IP address", .. }))
            ),
            "expected missing IP address, got: {result:?}"
        );
    }

    #[rstest]
    fn bridge_ip_reports_unknown_container(
        runtime: std::io::Result<tokio::runtime::Runtime>,
        container: ContainerRef,
    ) {
        let rt = runtime.expect("runtime should be created");
        let inspector = inspector_failing(404);
        let probe = MockProbe::new();
        let source = EngineAddressSource::new(&inspector, "unix:///var/run/docker.sock", &probe);

        let result = rt.block_on(source.bridge_ip(&container));

        assert!(
            matches!(
                result,
                Err(BerthError::Container(ContainerError::NotFound { ref container_id }))
                    if container_id == "redis-1"
            ),
            "expected not found, got: {result:?}"
        );
    }

    #[rstest]
    fn gateway_ip_prefers_container_network(
        runtime: std::io::Result<tokio::runtime::Runtime>,
        container: ContainerRef,
    ) {
        let rt = runtime.expect("runtime should be created");
        let inspector = inspector_returning(attached_to("custom", "10.1.0.5", "10.1.0.1"));
        let mut probe = MockProbe::new();
        probe.expect_default_gateway_ip().times(0);
        let source = EngineAddressSource::new(&inspector, "unix:///var/run/docker.sock", &probe)
            .with_network("custom");

        let gateway = rt.block_on(source.gateway_ip(&container));

        assert_eq!(source.network(), "custom");
        assert_eq!(gateway.expect("gateway should be found"), "10.1.0.1");
    }

    // The host's default gateway is substituted for the container network's
    // gateway. The two can differ; this pins the substitution as-is.
    #[rstest]
    #[case::container_missing(inspector_failing(404))]
    #[case::engine_error(inspector_failing(500))]
    #[case::network_missing(inspector_returning(attached_to("other", "10.0.0.2", "10.0.0.1")))]
    #[case::gateway_empty(inspector_returning(attached_to("bridge", "172.17.0.5", "")))]
    fn gateway_ip_substitutes_host_default_gateway(
        runtime: std::io::Result<tokio::runtime::Runtime>,
        container: ContainerRef,
        #[case] inspector: MockInspector,
    ) {
        let rt = runtime.expect("runtime should be created");
        let probe = probe_with_gateway(Ok("192.168.65.1"));
        let source = EngineAddressSource::new(&inspector, "unix:///var/run/docker.sock", &probe);

        let gateway = rt.block_on(source.gateway_ip(&container));

        assert_eq!(gateway.expect("fallback gateway should be used"), "192.168.65.1");
    }

    #[rstest]
    fn gateway_ip_fails_when_both_lookups_fail(
        runtime: std::io::Result<tokio::runtime::Runtime>,
        container: ContainerRef,
    ) {
        let rt = runtime.expect("runtime should be created");
        let inspector = inspector_failing(404);
        let probe = probe_with_gateway(Err(()));
        let source = EngineAddressSource::new(&inspector, "unix:///var/run/docker.sock", &probe);

        let result = rt.block_on(source.gateway_ip(&container));

        assert!(
            matches!(result, Err(BerthError::Lookup(LookupError::NoDefaultRoute))),
            "expected lookup error, got: {result:?}"
        );
    }

    #[rstest]
    #[case::tcp("tcp://db.example.com:2375", EndpointScheme::Tcp, Some("db.example.com"))]
    #[case::unix("unix:///var/run/docker.sock", EndpointScheme::UnixSocket, None)]
    fn engine_endpoint_parses_base_url(
        #[case] base_url: &str,
        #[case] scheme: EndpointScheme,
        #[case] hostname: Option<&str>,
    ) {
        let inspector = MockInspector::new();
        let probe = MockProbe::new();
        let source = EngineAddressSource::new(&inspector, base_url, &probe);

        let endpoint = source.engine_endpoint().expect("endpoint should parse");

        assert_eq!(endpoint.scheme(), scheme);
        assert_eq!(endpoint.hostname(), hostname);
    }

    #[rstest]
    fn engine_endpoint_rejects_malformed_url() {
        let inspector = MockInspector::new();
        let probe = MockProbe::new();
        let source = EngineAddressSource::new(&inspector, "not a url", &probe);

        let result = source.engine_endpoint();

        assert!(
            matches!(result, Err(BerthError::Config(ConfigError::InvalidEndpoint { .. }))),
            "expected invalid endpoint, got: {result:?}"
        );
    }
}
