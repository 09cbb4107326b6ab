//! Container engine connection, inspection and launching.
//!
//! The engine endpoint is resolved through a priority-based fallback chain:
//!
//! 1. CLI argument (`--engine-socket`)
//! 2. Config file (`engine_socket` in TOML)
//! 3. `BERTH_ENGINE_SOCKET` environment variable
//! 4. `DOCKER_HOST` environment variable
//! 5. `CONTAINER_HOST` environment variable
//! 6. `PODMAN_HOST` environment variable
//! 7. Platform default (`/var/run/docker.sock` on Unix)
//!
//! [`EngineHandle`] owns the connected client. Address lookups go through the
//! [`AddressSource`] seam and container launches through
//! [`ContainerRunClient`], both implemented for `bollard::Docker`.

mod address;
mod connection;
mod container_ref;
mod endpoint;
mod handle;

pub use address::{AddressSource, DEFAULT_NETWORK, EngineAddressSource, LookupFuture};
pub use connection::{
    CollectLogsFuture, ContainerInspector, ContainerRunClient, ContainerRunFuture,
    CreateContainerFuture, EngineConnector, HostPort, InspectContainerFuture, RunOutcome, RunSpec,
    SocketResolver, parse_port_mapping,
};
pub use container_ref::ContainerRef;
pub use endpoint::{EndpointScheme, EngineEndpoint};
pub use handle::EngineHandle;
