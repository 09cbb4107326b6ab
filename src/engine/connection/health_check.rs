//! Engine liveness check.

use std::time::Duration;

use bollard::Docker;

use super::{EngineConnector, HEALTH_CHECK_TIMEOUT_SECS};
use crate::error::{BerthError, ContainerError};

impl EngineConnector {
    /// Verify the container engine answers a ping within
    /// `HEALTH_CHECK_TIMEOUT_SECS`.
    ///
    /// A successful ping means the engine is operational, not merely that
    /// its socket exists.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::HealthCheckTimeout` if no answer arrives in
    /// time, and `ContainerError::HealthCheckFailed` if the engine rejects
    /// the ping.
    pub async fn health_check_async(docker: &Docker) -> Result<(), BerthError> {
        let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);
        tracing::debug!(timeout_secs = HEALTH_CHECK_TIMEOUT_SECS, "pinging container engine");

        tokio::time::timeout(timeout, docker.ping())
            .await
            .map_err(|_| ContainerError::HealthCheckTimeout {
                seconds: HEALTH_CHECK_TIMEOUT_SECS,
            })?
            .map_err(|error| ContainerError::HealthCheckFailed {
                message: error.to_string(),
            })?;
        Ok(())
    }
}
