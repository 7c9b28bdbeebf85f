//! One-shot control client: connect, send one line, read one line.

use super::MAX_REQUEST_LEN;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::debug;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Socket missing or nobody listening on it
    #[error("headmouse is not running (no control socket at {path})")]
    NotRunning { path: PathBuf },

    #[error("Request too long ({0} bytes)")]
    RequestTooLong(usize),

    #[error("Control socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Connection closed without a response")]
    EmptyResponse,
}

/// Sends `command` and returns the response line without its newline.
pub async fn send_command(path: &Path, command: &str) -> Result<String, ClientError> {
    let request = format!("{}\n", command);
    if request.len() > MAX_REQUEST_LEN {
        return Err(ClientError::RequestTooLong(request.len()));
    }

    let mut stream = UnixStream::connect(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound | ErrorKind::ConnectionRefused => ClientError::NotRunning {
            path: path.to_path_buf(),
        },
        _ => ClientError::Io(e),
    })?;
    debug!("Connected to {}", path.display());

    let exchange = async {
        stream.write_all(request.as_bytes()).await?;
        let mut response = String::new();
        stream.read_to_string(&mut response).await?;
        Ok::<_, std::io::Error>(response)
    };
    let response = tokio::time::timeout(CLIENT_TIMEOUT, exchange)
        .await
        .map_err(|_| ClientError::Timeout(CLIENT_TIMEOUT))??;

    let line = response.lines().next().unwrap_or_default().to_string();
    if line.is_empty() {
        return Err(ClientError::EmptyResponse);
    }
    Ok(line)
}
