//! Control server
//!
//! `ControlServer<Stopped>` binds the socket and becomes `ControlServer<Listening>`.
//! The listening server accepts one connection at a time and runs it to completion
//! through [`ControlConnection`] before accepting the next, so commands are applied
//! in arrival order. Accept races against a cancellation token; stopping closes the
//! listener and removes the socket file.

use super::connection::ControlConnection;
use crate::tracking::HeadTracker;
use statum::{machine, state};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Upper bound on reading a request or writing a response
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Pause after a failed accept so a persistent error does not spin
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Failed to bind control socket {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Control connection I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Control connection timed out after {0:?}")]
    Timeout(Duration),
}

#[state]
#[derive(Debug, Clone)]
pub enum ServerState {
    Stopped,
    Listening,
}

#[machine]
#[derive(Debug)]
pub struct ControlServer<S: ServerState> {
    path: PathBuf,
    tracker: Arc<HeadTracker>,
    listener: Option<UnixListener>,
    io_timeout: Duration,
}

impl<S: ServerState> ControlServer<S> {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ControlServer<Stopped> {
    pub fn create(path: PathBuf, tracker: Arc<HeadTracker>) -> Self {
        debug!("Creating control server for {}", path.display());
        Self::new(path, tracker, None, DEFAULT_IO_TIMEOUT)
    }

    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    /// Binds the socket, replacing a stale socket file left by an earlier run.
    pub fn bind(mut self) -> Result<ControlServer<Listening>, ControlError> {
        remove_socket_file(&self.path);

        let listener = UnixListener::bind(&self.path).map_err(|source| ControlError::Bind {
            path: self.path.clone(),
            source,
        })?;

        info!("Control server listening on {}", self.path.display());
        self.listener = Some(listener);
        Ok(self.transition())
    }
}

impl ControlServer<Listening> {
    /// Serves connections until `cancel` fires, then releases the socket.
    pub async fn serve_until_shutdown(mut self, cancel: CancellationToken) -> ControlServer<Stopped> {
        let Some(listener) = self.listener.take() else {
            error!("Listening control server has no listener");
            return self.transition();
        };

        let mut handled: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Control server cancelled");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        handled += 1;
                        self.handle_connection(stream).await;
                    }
                    Err(e) => {
                        warn!("Failed to accept control connection: {}", e);
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                },
            }
        }

        drop(listener);
        remove_socket_file(&self.path);
        info!(
            "Control server stopped after {} connections, removed {}",
            handled,
            self.path.display()
        );
        self.transition()
    }

    /// Failures are scoped to the one connection.
    async fn handle_connection(&self, stream: UnixStream) {
        let connection = ControlConnection::accept(stream, self.io_timeout);

        let parsed = match connection.read_command().await {
            Ok(Some(parsed)) => parsed,
            Ok(None) => return,
            Err(e) => {
                warn!("Dropping control connection: {}", e);
                return;
            }
        };

        match parsed.dispatch(&self.tracker).await.respond().await {
            Ok(response) if response.is_error() => debug!("Answered {}", response),
            Ok(response) => info!("Control command answered: {}", response),
            Err(e) => warn!("Failed to answer control connection: {}", e),
        }
    }
}

fn remove_socket_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed socket file {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove socket file {}: {}", path.display(), e),
    }
}

/// Runs a listening server on its own task
pub struct ControlServerHandle {
    task: JoinHandle<ControlServer<Stopped>>,
    cancel: CancellationToken,
    path: PathBuf,
}

impl ControlServerHandle {
    pub fn spawn(server: ControlServer<Listening>, cancel: CancellationToken) -> Self {
        let path = server.path().to_path_buf();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move { server.serve_until_shutdown(task_cancel).await });
        Self { task, cancel, path }
    }

    /// Binds at `path` and spawns the server task.
    pub fn start(
        path: PathBuf,
        tracker: Arc<HeadTracker>,
        cancel: CancellationToken,
    ) -> Result<Self, ControlError> {
        let server = ControlServer::create(path, tracker).bind()?;
        Ok(Self::spawn(server, cancel))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cancels the server and waits until the socket is released.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!("Control server task failed: {}", e);
        }
    }
}
