//! Per-connection state machine
//!
//! `Accepted → CommandParsed → Dispatched`, then the response is written and the
//! stream is dropped. Every step that touches the socket is bounded by the
//! connection's I/O timeout.

use super::protocol::{dispatch, Command, Response};
use super::server::ControlError;
use super::MAX_REQUEST_LEN;
use crate::tracking::HeadTracker;
use statum::{machine, state};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, trace};

#[state]
#[derive(Debug, Clone)]
pub enum ConnectionState {
    Accepted,
    CommandParsed(Command),
    Dispatched(Response),
}

#[machine]
#[derive(Debug)]
pub struct ControlConnection<S: ConnectionState> {
    stream: UnixStream,
    io_timeout: Duration,
}

impl ControlConnection<Accepted> {
    pub fn accept(stream: UnixStream, io_timeout: Duration) -> Self {
        Self::new(stream, io_timeout)
    }

    /// Reads one request. `None` when the client closed without sending anything.
    pub async fn read_command(
        mut self,
    ) -> Result<Option<ControlConnection<CommandParsed>>, ControlError> {
        let io_timeout = self.io_timeout;
        let request = tokio::time::timeout(io_timeout, read_request(&mut self.stream))
            .await
            .map_err(|_| ControlError::Timeout(io_timeout))??;

        if request.is_empty() {
            debug!("Client closed without a request");
            return Ok(None);
        }

        let command = Command::from_request(&request);
        trace!("Parsed request {:?} as {:?}", String::from_utf8_lossy(&request), command);
        Ok(Some(self.transition_with(command)))
    }
}

impl ControlConnection<CommandParsed> {
    pub async fn dispatch(self, tracker: &HeadTracker) -> ControlConnection<Dispatched> {
        let response = match self.get_state_data() {
            Some(command) => dispatch(command, tracker).await,
            None => Response::Error("missing command".to_string()),
        };
        self.transition_with(response)
    }
}

impl ControlConnection<Dispatched> {
    /// Writes the response line and closes the write side.
    pub async fn respond(mut self) -> Result<Response, ControlError> {
        let response = self
            .get_state_data()
            .cloned()
            .unwrap_or_else(|| Response::Error("missing response".to_string()));

        let io_timeout = self.io_timeout;
        let line = response.to_line();
        tokio::time::timeout(io_timeout, async {
            self.stream.write_all(line.as_bytes()).await?;
            self.stream.shutdown().await
        })
        .await
        .map_err(|_| ControlError::Timeout(io_timeout))??;

        Ok(response)
    }
}

/// Reads until a newline, EOF or [`MAX_REQUEST_LEN`] bytes, whichever comes first.
///
/// Input past the length cap is read and discarded up to the next newline, so the
/// socket is not closed with unread data and the client still gets its response.
async fn read_request(stream: &mut UnixStream) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; MAX_REQUEST_LEN];
    let mut filled = 0;
    let mut newline = false;
    while filled < MAX_REQUEST_LEN {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        newline = buf[filled..filled + n].contains(&b'\n');
        filled += n;
        if newline {
            break;
        }
    }
    buf.truncate(filled);

    if filled == MAX_REQUEST_LEN && !newline {
        let discarded = discard_line(stream).await?;
        debug!("Discarded {} bytes past the request limit", discarded);
    }
    Ok(buf)
}

async fn discard_line(stream: &mut UnixStream) -> std::io::Result<usize> {
    let mut scratch = [0u8; 256];
    let mut discarded = 0;
    loop {
        let n = stream.read(&mut scratch).await?;
        if n == 0 {
            return Ok(discarded);
        }
        discarded += n;
        if scratch[..n].contains(&b'\n') {
            return Ok(discarded);
        }
    }
}
