//! Behavioural step helpers for reachability scenarios.

mod assertions;
mod state;
mod steps;

pub use state::{ReachabilityState, reachability_state};
