//! Given/when step definitions for reachability behavioural scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};

use berth::engine::{AddressSource, ContainerRef, EngineEndpoint, LookupFuture};
use berth::error::{BerthError, ContainerError, LookupError};
use berth::probe::EnvironmentProbe;
use berth::resolver::ReachabilityResolver;
use rstest_bdd_macros::{given, when};

use super::state::{ReachabilityState, StepResult};

/// Address source answering from scenario state and counting calls.
struct ScriptedSource {
    endpoint: String,
    gateway: Option<String>,
    bridge: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn lookup(&self, address: Option<&str>, container: &ContainerRef) -> LookupFuture<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = address.map(String::from).ok_or_else(|| {
            BerthError::from(ContainerError::NotFound {
                container_id: container.to_string(),
            })
        });
        Box::pin(async move { result })
    }
}

impl AddressSource for ScriptedSource {
    fn bridge_ip(&self, container: &ContainerRef) -> LookupFuture<'_> {
        self.lookup(self.bridge.as_deref(), container)
    }

    fn gateway_ip(&self, container: &ContainerRef) -> LookupFuture<'_> {
        self.lookup(self.gateway.as_deref(), container)
    }

    fn engine_endpoint(&self) -> Result<EngineEndpoint, BerthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        EngineEndpoint::parse(&self.endpoint)
    }
}

/// Environment probe answering from scenario state.
struct ScriptedProbe {
    inside_container: bool,
    host_alias: Option<String>,
    host_override: Option<String>,
}

impl EnvironmentProbe for ScriptedProbe {
    fn is_inside_container(&self) -> bool {
        self.inside_container
    }

    fn docker_internal_host_alias(&self) -> Option<String> {
        self.host_alias.clone()
    }

    fn default_gateway_ip(&self) -> Result<String, BerthError> {
        Err(LookupError::NoDefaultRoute.into())
    }

    fn override_host(&self) -> Option<String> {
        self.host_override.clone()
    }
}

#[given("the engine endpoint is {url}")]
fn engine_endpoint_is(reachability_state: &ReachabilityState, url: String) {
    reachability_state.endpoint.set(url);
}

#[given("the process runs inside a container")]
fn process_runs_inside_container(reachability_state: &ReachabilityState) {
    reachability_state.inside_container.set(true);
}

#[given("the host override is {host}")]
fn host_override_is(reachability_state: &ReachabilityState, host: String) {
    reachability_state.host_override.set(Some(host));
}

#[given("the internal host alias resolves to {address}")]
fn internal_host_alias_resolves_to(reachability_state: &ReachabilityState, address: String) {
    reachability_state.host_alias.set(Some(address));
}

#[given("the container network gateway is {address}")]
fn container_network_gateway_is(reachability_state: &ReachabilityState, address: String) {
    reachability_state.gateway.set(Some(address));
}

#[given("the container network address is {address}")]
fn container_network_address_is(reachability_state: &ReachabilityState, address: String) {
    reachability_state.bridge.set(Some(address));
}

#[given("the fallback host is {host}")]
fn fallback_host_is(reachability_state: &ReachabilityState, host: String) {
    reachability_state.fallback.set(host);
}

#[when("the host for container {container} is resolved")]
fn host_for_container_is_resolved(
    reachability_state: &ReachabilityState,
    container: String,
) -> StepResult<()> {
    let source = ScriptedSource {
        endpoint: reachability_state
            .endpoint
            .get()
            .ok_or_else(|| String::from("engine endpoint should be set"))?,
        gateway: reachability_state.gateway.get().flatten(),
        bridge: reachability_state.bridge.get().flatten(),
        calls: AtomicUsize::new(0),
    };
    let probe = ScriptedProbe {
        inside_container: reachability_state.inside_container.get().unwrap_or(false),
        host_alias: reachability_state.host_alias.get().flatten(),
        host_override: reachability_state.host_override.get().flatten(),
    };
    let fallback = reachability_state
        .fallback
        .get()
        .ok_or_else(|| String::from("fallback host should be set"))?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|error| format!("failed to create runtime: {error}"))?;
    let resolver = ReachabilityResolver::new(&source, &probe);
    let resolved = resolver.resolve_host(
        runtime.handle(),
        &ContainerRef::from(container.as_str()),
        &fallback,
    );

    reachability_state.resolved.set(resolved);
    reachability_state
        .engine_calls
        .set(source.calls.load(Ordering::SeqCst));
    Ok(())
}
