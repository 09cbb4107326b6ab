//! Behavioural tests for container reachability resolution.

mod bdd_reachability_helpers;

pub use bdd_reachability_helpers::{ReachabilityState, reachability_state};
use rstest_bdd_macros::scenario;

#[scenario(
    path = "tests/features/reachability.feature",
    name = "Host override wins without querying the engine"
)]
fn host_override_wins_without_querying_engine(reachability_state: ReachabilityState) {
    let _ = reachability_state;
}

#[scenario(
    path = "tests/features/reachability.feature",
    name = "Host override skips a malformed endpoint"
)]
fn host_override_skips_malformed_endpoint(reachability_state: ReachabilityState) {
    let _ = reachability_state;
}

#[scenario(
    path = "tests/features/reachability.feature",
    name = "Remote engine hostname is returned unchanged"
)]
fn remote_engine_hostname_returned_unchanged(reachability_state: ReachabilityState) {
    let _ = reachability_state;
}

#[scenario(
    path = "tests/features/reachability.feature",
    name = "Local socket outside a container resolves to localhost"
)]
fn local_socket_outside_container_resolves_to_localhost(reachability_state: ReachabilityState) {
    let _ = reachability_state;
}

#[scenario(
    path = "tests/features/reachability.feature",
    name = "Containerised caller without an alias uses the network gateway"
)]
fn containerised_caller_without_alias_uses_gateway(reachability_state: ReachabilityState) {
    let _ = reachability_state;
}

#[scenario(
    path = "tests/features/reachability.feature",
    name = "Alias matching the gateway yields the container address"
)]
fn alias_matching_gateway_yields_container_address(reachability_state: ReachabilityState) {
    let _ = reachability_state;
}

#[scenario(
    path = "tests/features/reachability.feature",
    name = "Alias distinct from the gateway is returned"
)]
fn alias_distinct_from_gateway_is_returned(reachability_state: ReachabilityState) {
    let _ = reachability_state;
}

#[scenario(
    path = "tests/features/reachability.feature",
    name = "Vanished container degrades to the fallback host"
)]
fn vanished_container_degrades_to_fallback(reachability_state: ReachabilityState) {
    let _ = reachability_state;
}

#[scenario(
    path = "tests/features/reachability.feature",
    name = "Malformed endpoint leaves the host unknown"
)]
fn malformed_endpoint_leaves_host_unknown(reachability_state: ReachabilityState) {
    let _ = reachability_state;
}

#[scenario(
    path = "tests/features/reachability.feature",
    name = "Unsupported endpoint scheme leaves the host unknown"
)]
fn unsupported_scheme_leaves_host_unknown(reachability_state: ReachabilityState) {
    let _ = reachability_state;
}
