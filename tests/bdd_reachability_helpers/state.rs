//! Shared behavioural-test state for reachability scenarios.

use berth::resolver::DEFAULT_FALLBACK_HOST;
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;

/// Step result type for reachability BDD tests.
pub type StepResult<T> = Result<T, String>;

/// Shared scenario state for reachability behavioural tests.
#[derive(Default, ScenarioState)]
pub struct ReachabilityState {
    /// Engine base URL reported by the address source.
    pub(crate) endpoint: Slot<String>,

    /// Whether the calling process runs inside a container.
    pub(crate) inside_container: Slot<bool>,

    /// Address the engine's internal host alias resolves to.
    pub(crate) host_alias: Slot<Option<String>>,

    /// Operator-supplied host override.
    pub(crate) host_override: Slot<Option<String>>,

    /// Gateway of the container's network, when the lookup succeeds.
    pub(crate) gateway: Slot<Option<String>>,

    /// Container address on its network, when the lookup succeeds.
    pub(crate) bridge: Slot<Option<String>>,

    /// Host returned when container lookups fail.
    pub(crate) fallback: Slot<String>,

    /// Resolution result; `None` means the host is unknown.
    pub(crate) resolved: Slot<Option<String>>,

    /// Number of address source calls made during resolution.
    pub(crate) engine_calls: Slot<usize>,
}

/// Fixture providing fresh state for each reachability scenario.
#[fixture]
pub fn reachability_state() -> ReachabilityState {
    let state = ReachabilityState::default();
    state
        .endpoint
        .set(String::from("unix:///var/run/docker.sock"));
    state.inside_container.set(false);
    state.host_alias.set(None);
    state.host_override.set(None);
    state.gateway.set(None);
    state.bridge.set(None);
    state.fallback.set(String::from(DEFAULT_FALLBACK_HOST));
    state
}
