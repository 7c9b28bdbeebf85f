//! Local control channel
//!
//! A Unix socket speaking a one-line request/response protocol, one command per
//! connection:
//!
//! ```text
//! client ──"sensitivity +10\n"──► ControlServer ──► HeadTracker
//!        ◄──"OK: sensitivity adjusted to 55.0\n"──┘
//! ```
//!
//! - [`protocol`] - command parsing, dispatch and response formatting
//! - [`server`] - listener state machine and its task handle
//! - [`connection`] - per-connection state machine
//! - [`client`] - one-shot sender used by `headmouse-ctl`
//! - [`console`] - the same commands typed on the daemon's terminal

pub mod client;
pub mod connection;
pub mod console;
pub mod protocol;
pub mod server;

pub use client::{send_command, ClientError};
pub use console::{run_console, spawn_stdin_reader};
pub use protocol::{dispatch, Command, Response, SensitivityArg};
pub use server::{ControlError, ControlServer, ControlServerHandle};

use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;

/// Environment variable overriding the socket path
pub const SOCKET_PATH_ENV: &str = "HEADMOUSE_SOCKET";

/// Socket used when running as root
pub const ROOT_SOCKET_PATH: &str = "/tmp/headmouse.sock";

/// Socket used by unprivileged users
pub const USER_SOCKET_PATH: &str = "/tmp/headmouse-user.sock";

/// Longest request line accepted, newline included
pub const MAX_REQUEST_LEN: usize = 255;

/// Socket path shared by the daemon and the client.
pub fn socket_path() -> PathBuf {
    if let Some(path) = std::env::var_os(SOCKET_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    default_socket_path(is_root())
}

pub fn default_socket_path(root: bool) -> PathBuf {
    if root {
        PathBuf::from(ROOT_SOCKET_PATH)
    } else {
        PathBuf::from(USER_SOCKET_PATH)
    }
}

fn is_root() -> bool {
    // /proc/self is owned by the effective uid of this process
    std::fs::metadata("/proc/self")
        .map(|meta| meta.uid() == 0)
        .unwrap_or(false)
}
