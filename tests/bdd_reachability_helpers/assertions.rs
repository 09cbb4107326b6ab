//! Then-step assertions for reachability behavioural scenarios.

use rstest_bdd_macros::then;

use super::state::{ReachabilityState, StepResult};

fn resolved(reachability_state: &ReachabilityState) -> StepResult<Option<String>> {
    reachability_state
        .resolved
        .get()
        .ok_or_else(|| String::from("resolution outcome should be set"))
}

#[then("the resolved host is {expected}")]
fn resolved_host_is(reachability_state: &ReachabilityState, expected: String) -> StepResult<()> {
    match resolved(reachability_state)? {
        Some(host) if host == expected => Ok(()),
        Some(host) => Err(format!("expected host {expected}, got {host}")),
        None => Err(format!("expected host {expected}, got unknown host")),
    }
}

#[then("the host is unknown")]
fn host_is_unknown(reachability_state: &ReachabilityState) -> StepResult<()> {
    resolved(reachability_state)?.map_or(Ok(()), |host| {
        Err(format!("expected unknown host, got {host}"))
    })
}

#[then("the engine was not queried")]
fn engine_was_not_queried(reachability_state: &ReachabilityState) -> StepResult<()> {
    match reachability_state.engine_calls.get() {
        Some(0) => Ok(()),
        Some(calls) => Err(format!("expected no engine calls, got {calls}")),
        None => Err(String::from("engine call count should be recorded")),
    }
}
