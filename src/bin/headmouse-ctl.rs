use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use headmouse::control::{
    send_command, socket_path, ClientError, Command, SensitivityArg, SOCKET_PATH_ENV,
};
use headmouse::tracking::{InvertTarget, Setting};
use std::process::ExitCode;

/// Control a running headmouse daemon.
#[derive(Parser, Debug)]
#[command(
    name = "headmouse-ctl",
    version,
    after_help = "Socket path can be overridden with HEADMOUSE_SOCKET."
)]
struct Cli {
    #[command(subcommand)]
    command: CtlCommand,
}

#[derive(Subcommand, Debug)]
enum CtlCommand {
    /// Enable or disable tracking
    Toggle,
    /// Use the current head position as the new center
    Recenter,
    /// Stop moving the pointer, keep the reference position
    Pause,
    /// Continue after pause
    Resume,
    /// Re-read the configuration files
    Reload,
    /// Show whether tracking is enabled and the current sensitivity
    Status,
    /// Set sensitivity to VALUE, or adjust it with +VALUE / -VALUE
    Sensitivity {
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Set the smoothing factor (0.0-1.0)
    Smooth {
        #[arg(allow_hyphen_values = true)]
        value: f32,
    },
    /// Set the deadzone in degrees
    Deadzone {
        #[arg(allow_hyphen_values = true)]
        value: f32,
    },
    /// Set the roll angle that starts scrolling, in degrees
    Roll {
        #[arg(allow_hyphen_values = true)]
        value: f32,
    },
    /// Set the scroll sensitivity
    Scroll {
        #[arg(allow_hyphen_values = true)]
        value: f32,
    },
    /// Toggle X-axis inversion
    Invertx,
    /// Toggle Y-axis inversion
    Inverty,
    /// Toggle scroll direction
    Invertscroll,
}

impl From<&CtlCommand> for Command {
    fn from(command: &CtlCommand) -> Self {
        match command {
            CtlCommand::Toggle => Command::Toggle,
            CtlCommand::Recenter => Command::Recenter,
            CtlCommand::Pause => Command::Pause,
            CtlCommand::Resume => Command::Resume,
            CtlCommand::Reload => Command::Reload,
            CtlCommand::Status => Command::Status,
            CtlCommand::Sensitivity { value } => Command::Sensitivity(SensitivityArg::parse(value)),
            CtlCommand::Smooth { value } => Command::Set(Setting::Smoothing, Some(*value)),
            CtlCommand::Deadzone { value } => Command::Set(Setting::Deadzone, Some(*value)),
            CtlCommand::Roll { value } => Command::Set(Setting::RollThreshold, Some(*value)),
            CtlCommand::Scroll { value } => Command::Set(Setting::ScrollSensitivity, Some(*value)),
            CtlCommand::Invertx => Command::Invert(InvertTarget::X),
            CtlCommand::Inverty => Command::Invert(InvertTarget::Y),
            CtlCommand::Invertscroll => Command::Invert(InvertTarget::Scroll),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let request = Command::from(&cli.command)
        .to_request()
        .ok_or_else(|| eyre!("Invalid argument for {:?}", cli.command))?;
    let path = socket_path();

    match send_command(&path, &request).await {
        Ok(response) => {
            println!("{}", response);
            if response.starts_with("ERROR:") {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Err(e @ ClientError::NotRunning { .. }) => {
            eprintln!("{}", e);
            eprintln!("Start the daemon first, or set {} to its socket.", SOCKET_PATH_ENV);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}
