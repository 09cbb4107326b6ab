//! Container launching from a high-level [`RunSpec`].
//!
//! This module translates a run request into `Bollard` create/start calls and,
//! for attached runs, waits for the container to stop and collects its
//! output. Engine failures propagate unchanged as `ContainerError` variants.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bollard::Docker;
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerCreateBody, ContainerCreateResponse, HostConfig, PortBinding};
use bollard::query_parameters::{
    CreateContainerOptions, CreateContainerOptionsBuilder, LogsOptionsBuilder,
    RemoveContainerOptionsBuilder, StartContainerOptions,
};
use futures_util::StreamExt;
use tokio::time::sleep;

use super::{ContainerInspector, EngineConnector, classify_engine_error};
use crate::engine::ContainerRef;
use crate::error::{BerthError, ConfigError, ContainerError};

const INSPECT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_PROTOCOL: &str = "tcp";

/// Boxed future type returned by [`ContainerRunClient::create_container`].
pub type CreateContainerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ContainerCreateResponse, BollardError>> + Send + 'a>>;

/// Boxed future type for run lifecycle calls without a payload.
pub type ContainerRunFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BollardError>> + Send + 'a>>;

/// Boxed future type returned by [`ContainerRunClient::collect_logs`].
pub type CollectLogsFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<u8>, BollardError>> + Send + 'a>>;

/// Behaviour required to create, start, drain and remove containers.
///
/// Attached runs poll container state through the [`ContainerInspector`]
/// supertrait.
pub trait ContainerRunClient: ContainerInspector {
    /// Create a container from `Bollard` options and body payload.
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> CreateContainerFuture<'_>;

    /// Start a created container.
    fn start_container(&self, container_id: &str) -> ContainerRunFuture<'_>;

    /// Read the complete log output of a container.
    fn collect_logs(&self, container_id: &str, stdout: bool, stderr: bool)
    -> CollectLogsFuture<'_>;

    /// Force-remove a container.
    fn remove_container(&self, container_id: &str) -> ContainerRunFuture<'_>;
}

impl ContainerRunClient for Docker {
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> CreateContainerFuture<'_> {
        Box::pin(async move { Self::create_container(self, options, config).await })
    }

    fn start_container(&self, container_id: &str) -> ContainerRunFuture<'_> {
        let container_id_owned = String::from(container_id);
        Box::pin(async move {
            Self::start_container(self, &container_id_owned, None::<StartContainerOptions>).await
        })
    }

    fn collect_logs(
        &self,
        container_id: &str,
        stdout: bool,
        stderr: bool,
    ) -> CollectLogsFuture<'_> {
        let container_id_owned = String::from(container_id);
        Box::pin(async move {
            let options = LogsOptionsBuilder::new()
                .stdout(stdout)
                .stderr(stderr)
                .build();
            let mut stream = Box::pin(Self::logs(self, &container_id_owned, Some(options)));
            let mut output = Vec::new();
            while let Some(chunk) = stream.next().await {
                output.extend_from_slice(&chunk?.into_bytes());
            }
            Ok(output)
        })
    }

    fn remove_container(&self, container_id: &str) -> ContainerRunFuture<'_> {
        let container_id_owned = String::from(container_id);
        Box::pin(async move {
            let options = RemoveContainerOptionsBuilder::new().force(true).build();
            Self::remove_container(self, &container_id_owned, Some(options)).await
        })
    }
}

/// Host side of a published container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPort {
    /// Let the engine pick a free host port.
    Auto,
    /// Bind to a fixed host port.
    Fixed(u16),
}

/// A container launch request.
///
/// Built by the caller, consumed once by
/// [`EngineConnector::run_container_async`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    image: String,
    name: Option<String>,
    command: Option<Vec<String>>,
    environment: BTreeMap<String, String>,
    ports: BTreeMap<String, HostPort>,
    labels: BTreeMap<String, String>,
    network_mode: Option<String>,
    detach: bool,
    capture_stdout: bool,
    capture_stderr: bool,
    auto_remove: bool,
}

impl RunSpec {
    /// Create an attached run request for `image` capturing stdout only.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when `image` is empty.
    pub fn new(image: impl Into<String>) -> Result<Self, BerthError> {
        let image_value = image.into();
        if image_value.trim().is_empty() {
            return Err(BerthError::from(ConfigError::MissingRequired {
                field: String::from("image"),
            }));
        }

        Ok(Self {
            image: image_value,
            name: None,
            command: None,
            environment: BTreeMap::new(),
            ports: BTreeMap::new(),
            labels: BTreeMap::new(),
            network_mode: None,
            detach: false,
            capture_stdout: true,
            capture_stderr: false,
            auto_remove: false,
        })
    }

    /// Set the command from a shell-style string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when the string has unbalanced
    /// quotes.
    pub fn with_command(mut self, command: &str) -> Result<Self, BerthError> {
        let argv = shell_words::split(command).map_err(|error| ConfigError::InvalidValue {
            field: String::from("command"),
            reason: error.to_string(),
        })?;
        self.command = (!argv.is_empty()).then_some(argv);
        Ok(self)
    }

    /// Set the command as an explicit argv list.
    #[must_use]
    pub fn with_argv(mut self, argv: Vec<String>) -> Self {
        self.command = (!argv.is_empty()).then_some(argv);
        self
    }

    /// Set the container name.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|value| !value.trim().is_empty());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Publish a container port. `"6379"` is read as `"6379/tcp"`.
    #[must_use]
    pub fn with_port(mut self, container_port: &str, host_port: HostPort) -> Self {
        self.ports
            .insert(normalize_container_port(container_port), host_port);
        self
    }

    /// Attach a label to the container.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Set the engine network mode, such as `host` or a network name.
    #[must_use]
    pub fn with_network_mode(mut self, network_mode: Option<String>) -> Self {
        self.network_mode = network_mode;
        self
    }

    /// Return immediately after the container starts.
    #[must_use]
    pub const fn detached(mut self, detach: bool) -> Self {
        self.detach = detach;
        self
    }

    /// Collect stdout of attached runs.
    #[must_use]
    pub const fn capture_stdout(mut self, capture: bool) -> Self {
        self.capture_stdout = capture;
        self
    }

    /// Collect stderr of attached runs.
    #[must_use]
    pub const fn capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    /// Remove the container once it stops.
    #[must_use]
    pub const fn auto_remove(mut self, remove: bool) -> Self {
        self.auto_remove = remove;
        self
    }

    /// Return the image reference.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Return the published ports keyed by `port/protocol`.
    #[must_use]
    pub const fn ports(&self) -> &BTreeMap<String, HostPort> {
        &self.ports
    }

    /// Return whether the run is detached.
    #[must_use]
    pub const fn is_detached(&self) -> bool {
        self.detach
    }

    const fn captures_output(&self) -> bool {
        self.capture_stdout || self.capture_stderr
    }
}

/// Outcome of [`EngineConnector::run_container_async`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    container: ContainerRef,
    exit_code: Option<i64>,
    output: Vec<u8>,
}

impl RunOutcome {
    /// Return the created container.
    #[must_use]
    pub const fn container(&self) -> &ContainerRef {
        &self.container
    }

    /// Return the exit code of an attached run; `None` when detached.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i64> {
        self.exit_code
    }

    /// Return the collected output of an attached run.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Consume the outcome, keeping only the container reference.
    #[must_use]
    pub fn into_container(self) -> ContainerRef {
        self.container
    }
}

/// Parse a `[host:]container[/protocol]` port mapping.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` when either side is not a valid port.
pub fn parse_port_mapping(value: &str) -> Result<(String, HostPort), BerthError> {
    let invalid = |reason: &str| {
        BerthError::from(ConfigError::InvalidValue {
            field: String::from("port"),
            reason: format!("'{value}': {reason}"),
        })
    };

    let (host_part, container_part) = match value.rsplit_once(':') {
        Some((host, container)) => (Some(host), container),
        None => (None, value),
    };

    let container_number = container_part
        .split_once('/')
        .map_or(container_part, |(number, _)| number);
    container_number
        .parse::<u16>()
        .map_err(|_| invalid("container port must be a number"))?;

    let host_port = match host_part {
        None => HostPort::Auto,
        Some(host) => HostPort::Fixed(
            host.parse::<u16>()
                .map_err(|_| invalid("host port must be a number"))?,
        ),
    };

    Ok((normalize_container_port(container_part), host_port))
}

/// Append the default protocol to a bare container port.
pub(crate) fn normalize_container_port(port: &str) -> String {
    if port.contains('/') {
        String::from(port)
    } else {
        format!("{port}/{DEFAULT_PROTOCOL}")
    }
}

impl EngineConnector {
    /// Create and start a container described by `spec` (async version).
    ///
    /// Detached runs return as soon as the container starts. Attached runs
    /// wait for it to stop, collect the requested output and remove it when
    /// `auto_remove` is set. Removal is also attempted when waiting or log
    /// collection fails; that error is then returned and a removal failure
    /// is only logged.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::CreateFailed`, `StartFailed`,
    /// `InspectFailed`, `LogsFailed` or `RemoveFailed` for the failing step,
    /// and `ContainerError::NotFound` if the container vanishes mid-run.
    pub async fn run_container_async<C: ContainerRunClient>(
        client: &C,
        spec: &RunSpec,
    ) -> Result<RunOutcome, BerthError> {
        let response = client
            .create_container(build_create_options(spec), build_create_body(spec))
            .await
            .map_err(|error| {
                BerthError::from(ContainerError::CreateFailed {
                    message: error.to_string(),
                })
            })?;
        let container_id = response.id;
        tracing::debug!(%container_id, image = spec.image(), "container created");

        client
            .start_container(&container_id)
            .await
            .map_err(|error| {
                BerthError::from(classify_engine_error(&error, &container_id, |message| {
                    ContainerError::StartFailed {
                        container_id: container_id.clone(),
                        message,
                    }
                }))
            })?;

        if spec.is_detached() {
            return Ok(RunOutcome {
                container: ContainerRef::from(container_id),
                exit_code: None,
                output: Vec::new(),
            });
        }

        let attached = wait_and_collect_async(client, &container_id, spec).await;

        if spec.auto_remove {
            let removal = remove_container_async(client, &container_id).await;
            if attached.is_ok() {
                removal?;
            } else if let Err(error) = removal {
                tracing::warn!(
                    %container_id,
                    %error,
                    "failed to remove container after the attached run failed"
                );
            }
        }

        let (exit_code, output) = attached?;
        Ok(RunOutcome {
            container: ContainerRef::from(container_id),
            exit_code: Some(exit_code),
            output,
        })
    }

    /// Create and start a container using a caller runtime handle.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::run_container_async`].
    pub fn run_container<C: ContainerRunClient>(
        runtime: &tokio::runtime::Handle,
        client: &C,
        spec: &RunSpec,
    ) -> Result<RunOutcome, BerthError> {
        runtime.block_on(Self::run_container_async(client, spec))
    }
}

/// Wait for an attached container to stop and read its requested output.
async fn wait_and_collect_async<C: ContainerRunClient>(
    client: &C,
    container_id: &str,
    spec: &RunSpec,
) -> Result<(i64, Vec<u8>), BerthError> {
    let exit_code = wait_for_exit_code_async(client, container_id).await?;
    tracing::debug!(%container_id, exit_code, "container stopped");

    if !spec.captures_output() {
        return Ok((exit_code, Vec::new()));
    }

    let output = client
        .collect_logs(container_id, spec.capture_stdout, spec.capture_stderr)
        .await
        .map_err(|error| {
            BerthError::from(ContainerError::LogsFailed {
                container_id: String::from(container_id),
                message: error.to_string(),
            })
        })?;
    Ok((exit_code, output))
}

async fn remove_container_async<C: ContainerRunClient>(
    client: &C,
    container_id: &str,
) -> Result<(), BerthError> {
    client.remove_container(container_id).await.map_err(|error| {
        BerthError::from(ContainerError::RemoveFailed {
            container_id: String::from(container_id),
            message: error.to_string(),
        })
    })
}

async fn wait_for_exit_code_async<C: ContainerRunClient>(
    client: &C,
    container_id: &str,
) -> Result<i64, BerthError> {
    loop {
        let inspect = EngineConnector::inspect_container_async(client, container_id).await?;
        let state = inspect.state.unwrap_or_default();

        if state.running.unwrap_or(false) {
            sleep(Duration::from_millis(INSPECT_POLL_INTERVAL_MS)).await;
            continue;
        }

        return Ok(state.exit_code.unwrap_or_default());
    }
}

fn build_create_options(spec: &RunSpec) -> Option<CreateContainerOptions> {
    spec.name.as_deref().map(|container_name| {
        CreateContainerOptionsBuilder::new()
            .name(container_name)
            .build()
    })
}

fn build_create_body(spec: &RunSpec) -> ContainerCreateBody {
    let env = spec
        .environment
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>();
    let labels = spec
        .labels
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect::<HashMap<_, _>>();

    ContainerCreateBody {
        image: Some(spec.image.clone()),
        cmd: spec.command.clone(),
        env: (!env.is_empty()).then_some(env),
        labels: (!labels.is_empty()).then_some(labels),
        attach_stdout: Some(!spec.detach && spec.capture_stdout),
        attach_stderr: Some(!spec.detach && spec.capture_stderr),
        host_config: Some(build_host_config(spec)),
        ..ContainerCreateBody::default()
    }
}

fn build_host_config(spec: &RunSpec) -> HostConfig {
    let port_bindings = spec
        .ports
        .iter()
        .map(|(container_port, host_port)| {
            let binding = PortBinding {
                host_ip: None,
                host_port: match host_port {
                    HostPort::Auto => None,
                    HostPort::Fixed(port) => Some(port.to_string()),
                },
            };
            (container_port.clone(), Some(vec![binding]))
        })
        .collect::<HashMap<_, _>>();

    HostConfig {
        // Attached runs are removed explicitly once their logs are read.
        auto_remove: Some(spec.detach && spec.auto_remove),
        port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
        network_mode: spec.network_mode.clone(),
        ..HostConfig::default()
    }
}
