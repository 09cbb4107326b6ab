//! Container inspection behind a small trait seam.
//!
//! Address lookups and attached runs both read container metadata from the
//! engine. Routing them through [`ContainerInspector`] keeps that logic
//! testable without a live daemon.

use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::models::ContainerInspectResponse;
use bollard::query_parameters::InspectContainerOptions;

use super::{EngineConnector, classify_engine_error, normalize_container_port};
use crate::engine::ContainerRef;
use crate::error::{BerthError, ContainerError, LookupError};

/// Boxed future type returned by [`ContainerInspector::inspect_container`].
pub type InspectContainerFuture<'a> = Pin<
    Box<dyn Future<Output = Result<ContainerInspectResponse, bollard::errors::Error>> + Send + 'a>,
>;

/// Behaviour required to read container metadata from an engine.
pub trait ContainerInspector {
    /// Inspect a container by ID or name.
    fn inspect_container(&self, container_id: &str) -> InspectContainerFuture<'_>;
}

impl ContainerInspector for Docker {
    fn inspect_container(&self, container_id: &str) -> InspectContainerFuture<'_> {
        let container_id_owned = String::from(container_id);
        Box::pin(async move {
            Self::inspect_container(self, &container_id_owned, None::<InspectContainerOptions>)
                .await
        })
    }
}

impl EngineConnector {
    /// Inspect a container and classify any engine failure.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::NotFound` when the engine does not know the
    /// container, and `ContainerError::InspectFailed` for other failures.
    pub async fn inspect_container_async<C: ContainerInspector + ?Sized>(
        client: &C,
        container_id: &str,
    ) -> Result<ContainerInspectResponse, BerthError> {
        client
            .inspect_container(container_id)
            .await
            .map_err(|error| {
                BerthError::from(classify_engine_error(&error, container_id, |message| {
                    ContainerError::InspectFailed {
                        container_id: String::from(container_id),
                        message,
                    }
                }))
            })
    }

    /// Return the first host port published for `container_port`.
    ///
    /// A bare port number is read as TCP.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::PortNotPublished` when no host binding exists,
    /// and the errors of [`Self::inspect_container_async`].
    pub async fn host_port_async<C: ContainerInspector + ?Sized>(
        client: &C,
        container: &ContainerRef,
        container_port: &str,
    ) -> Result<String, BerthError> {
        let port = normalize_container_port(container_port);
        let inspect = Self::inspect_container_async(client, container.as_str()).await?;

        inspect
            .network_settings
            .and_then(|settings| settings.ports)
            .and_then(|ports| ports.get(&port).cloned().flatten())
            .into_iter()
            .flatten()
            .find_map(|binding| binding.host_port.filter(|host_port| !host_port.is_empty()))
            .ok_or_else(|| {
                BerthError::from(LookupError::PortNotPublished {
                    container_id: String::from(container.as_str()),
                    port,
                })
            })
    }

    /// Return the first published host port using a caller runtime handle.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::host_port_async`].
    pub fn host_port<C: ContainerInspector + ?Sized>(
        runtime: &tokio::runtime::Handle,
        client: &C,
        container: &ContainerRef,
        container_port: &str,
    ) -> Result<String, BerthError> {
        runtime.block_on(Self::host_port_async(client, container, container_port))
    }
}
