//! Interactive console on the daemon's terminal
//!
//! Reads one command per line and answers like the socket does. An empty line
//! toggles tracking, `quit` stops the daemon, `sens N` is short for
//! `sensitivity N`.

use super::protocol::{dispatch, Command};
use crate::tracking::HeadTracker;
use std::io::BufRead;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const HELP: &str = "\
Commands:
  <Enter>          toggle tracking
  sens N           set sensitivity, +N/-N to adjust
  smooth N         smoothing factor 0.0-1.0
  deadzone N       deadzone in degrees
  roll N           roll threshold for scrolling in degrees
  scroll N         scroll sensitivity
  invertx          toggle X-axis inversion
  inverty          toggle Y-axis inversion
  invertscroll     toggle scroll direction
  recenter         use the current head position as center
  pause / resume   hold or continue pointer movement
  reload           re-read the configuration files
  status           show current state
  help             show this text
  quit             stop headmouse
";

enum ConsoleInput {
    Toggle,
    Help,
    Quit,
    Command(Command),
}

impl ConsoleInput {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "" => ConsoleInput::Toggle,
            "help" => ConsoleInput::Help,
            "quit" => ConsoleInput::Quit,
            line => match line.strip_prefix("sens ") {
                Some(arg) => ConsoleInput::Command(Command::parse(&format!("sensitivity {}", arg))),
                None => ConsoleInput::Command(Command::parse(line)),
            },
        }
    }
}

/// Reads stdin lines on a plain thread. The channel closes at end of input.
///
/// A pending read must not hold up runtime shutdown, so this is not a tokio
/// blocking task.
pub fn spawn_stdin_reader() -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Console read failed: {}", e);
                        break;
                    }
                };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Runs until `quit`, end of input or cancellation. `quit` cancels `cancel`.
pub async fn run_console<W>(
    mut lines: mpsc::Receiver<String>,
    mut writer: W,
    tracker: &HeadTracker,
    cancel: CancellationToken,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            debug!("Console input closed");
            break;
        };

        let reply = match ConsoleInput::parse(&line) {
            ConsoleInput::Quit => {
                info!("Quit requested from console");
                cancel.cancel();
                break;
            }
            ConsoleInput::Help => HELP.to_string(),
            ConsoleInput::Toggle => dispatch(&Command::Toggle, tracker).await.to_line(),
            ConsoleInput::Command(command) => dispatch(&command, tracker).await.to_line(),
        };
        writer.write_all(reply.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
