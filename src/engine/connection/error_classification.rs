//! Error classification helpers for container engine failures.
//!
//! Converts low-level `Bollard` errors into semantic `ContainerError`
//! variants so callers receive actionable diagnostics.

use std::path::Path;

use crate::error::ContainerError;

/// HTTP status the engine API returns for unknown containers.
const STATUS_NOT_FOUND: u16 = 404;

/// Extract the filesystem path from a socket URI.
///
/// Strips the scheme prefix (`unix://`, `npipe://`) to get the raw path.
/// HTTP endpoints and bare paths yield `None`.
fn extract_socket_path(socket_uri: &str) -> Option<&Path> {
    socket_uri
        .strip_prefix("unix://")
        .or_else(|| socket_uri.strip_prefix("npipe://"))
        .map(Path::new)
}

/// Map an I/O error kind onto a socket-specific variant when a path is known.
fn classify_io_error_kind(
    kind: std::io::ErrorKind,
    socket_path: Option<&Path>,
    error_msg: &str,
) -> ContainerError {
    let connection_failed = || ContainerError::ConnectionFailed {
        message: error_msg.to_owned(),
    };

    match kind {
        std::io::ErrorKind::PermissionDenied => {
            socket_path.map_or_else(connection_failed, |path| ContainerError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        std::io::ErrorKind::NotFound => {
            socket_path.map_or_else(connection_failed, |path| ContainerError::SocketNotFound {
                path: path.to_path_buf(),
            })
        }
        _ => connection_failed(),
    }
}

/// Classify a `Bollard` connection error into a semantic `ContainerError`.
///
/// Falls back to `ConnectionFailed` for errors that do not match known
/// patterns or for endpoints without filesystem paths.
pub(super) fn classify_connection_error(
    bollard_error: &bollard::errors::Error,
    socket_uri: &str,
) -> ContainerError {
    let socket_path = extract_socket_path(socket_uri);
    let error_msg = bollard_error.to_string();

    match bollard_error {
        bollard::errors::Error::SocketNotFoundError(_) => {
            if let Some(path) = socket_path {
                return ContainerError::SocketNotFound {
                    path: path.to_path_buf(),
                };
            }
        }
        bollard::errors::Error::IOError { err } => {
            let kind = io_error_kind_in_chain(err).unwrap_or_else(|| err.kind());
            return classify_io_error_kind(kind, socket_path, &error_msg);
        }
        _ => {}
    }

    if let Some(kind) = io_error_kind_in_chain(bollard_error) {
        return classify_io_error_kind(kind, socket_path, &error_msg);
    }

    ContainerError::ConnectionFailed { message: error_msg }
}

/// Classify an error returned by a per-container engine call.
///
/// Unknown containers become `ContainerError::NotFound`; everything else is
/// handed to `otherwise` together with the rendered engine message.
pub(crate) fn classify_engine_error(
    bollard_error: &bollard::errors::Error,
    container_id: &str,
    otherwise: impl FnOnce(String) -> ContainerError,
) -> ContainerError {
    match bollard_error {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == STATUS_NOT_FOUND =>
        {
            ContainerError::NotFound {
                container_id: String::from(container_id),
            }
        }
        _ => otherwise(bollard_error.to_string()),
    }
}

/// Walk the error source chain looking for an `io::Error` kind.
fn io_error_kind_in_chain(error: &dyn std::error::Error) -> Option<std::io::ErrorKind> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = error.source();
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return Some(io_err.kind());
        }
        current = err.source();
    }
    None
}
