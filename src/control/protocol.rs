//! Wire protocol: `<verb>[ <argument>]\n` in, one `OK: ...` or `ERROR: ...` line out.

use crate::tracking::{HeadTracker, InvertTarget, Setting, TrackerError};
use std::fmt;
use tracing::debug;

const SENSITIVITY_PREFIX: &str = "sensitivity ";

/// Verbs taking one numeric argument, with the setting they change
const SETTING_VERBS: [(&str, Setting); 4] = [
    ("smooth", Setting::Smoothing),
    ("deadzone", Setting::Deadzone),
    ("roll", Setting::RollThreshold),
    ("scroll", Setting::ScrollSensitivity),
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SensitivityArg {
    /// `N` without a sign
    Absolute(f32),
    /// `+N` or `-N`
    Relative(f32),
    /// Argument that is not a number
    Invalid,
}

impl SensitivityArg {
    pub fn parse(arg: &str) -> Self {
        let arg = arg.trim();
        let relative = arg.starts_with('+') || arg.starts_with('-');
        match arg.parse::<f32>() {
            Ok(value) if relative => SensitivityArg::Relative(value),
            Ok(value) => SensitivityArg::Absolute(value),
            Err(_) => SensitivityArg::Invalid,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Toggle,
    Recenter,
    Pause,
    Resume,
    Reload,
    Status,
    Sensitivity(SensitivityArg),
    /// Tuning parameter, `None` when the argument is not a number
    Set(Setting, Option<f32>),
    Invert(InvertTarget),
    /// Anything else, kept verbatim for the error response
    Unknown(String),
}

impl Command {
    /// Parses one request line. The line must not contain the terminating newline.
    pub fn parse(line: &str) -> Self {
        match line {
            "toggle" => Command::Toggle,
            "recenter" => Command::Recenter,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "reload" => Command::Reload,
            "status" => Command::Status,
            "invertx" => Command::Invert(InvertTarget::X),
            "inverty" => Command::Invert(InvertTarget::Y),
            "invertscroll" => Command::Invert(InvertTarget::Scroll),
            _ => {
                if let Some(arg) = line.strip_prefix(SENSITIVITY_PREFIX) {
                    return Command::Sensitivity(SensitivityArg::parse(arg));
                }
                Self::parse_setting(line).unwrap_or_else(|| Command::Unknown(line.to_string()))
            }
        }
    }

    fn parse_setting(line: &str) -> Option<Self> {
        let (verb, arg) = line.split_once(' ')?;
        let (_, setting) = SETTING_VERBS.iter().find(|(name, _)| *name == verb)?;
        Some(Command::Set(*setting, arg.trim().parse::<f32>().ok()))
    }

    /// Extracts the command from raw request bytes: everything before the first
    /// newline, lossily decoded.
    pub fn from_request(bytes: &[u8]) -> Self {
        let line = match bytes.iter().position(|&b| b == b'\n') {
            Some(end) => &bytes[..end],
            None => bytes,
        };
        Self::parse(&String::from_utf8_lossy(line))
    }

    /// Request line as sent by the client, without newline
    pub fn to_request(&self) -> Option<String> {
        let line = match self {
            Command::Toggle => "toggle".to_string(),
            Command::Recenter => "recenter".to_string(),
            Command::Pause => "pause".to_string(),
            Command::Resume => "resume".to_string(),
            Command::Reload => "reload".to_string(),
            Command::Status => "status".to_string(),
            Command::Sensitivity(SensitivityArg::Absolute(v)) => format!("sensitivity {}", v),
            Command::Sensitivity(SensitivityArg::Relative(v)) => format!("sensitivity {:+}", v),
            Command::Set(setting, Some(v)) => format!("{} {}", setting_verb(*setting), v),
            Command::Invert(InvertTarget::X) => "invertx".to_string(),
            Command::Invert(InvertTarget::Y) => "inverty".to_string(),
            Command::Invert(InvertTarget::Scroll) => "invertscroll".to_string(),
            Command::Sensitivity(SensitivityArg::Invalid)
            | Command::Set(_, None)
            | Command::Unknown(_) => return None,
        };
        Some(line)
    }
}

fn setting_verb(setting: Setting) -> &'static str {
    SETTING_VERBS
        .iter()
        .find(|(_, s)| *s == setting)
        .map(|(verb, _)| *verb)
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Ok(String),
    Error(String),
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// Wire form, newline terminated
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok(msg) => write!(f, "OK: {}", msg),
            Response::Error(msg) => write!(f, "ERROR: {}", msg),
        }
    }
}

impl From<TrackerError> for Response {
    fn from(e: TrackerError) -> Self {
        Response::Error(e.to_string())
    }
}

/// Applies a command to the tracker. Every command takes the tracker lock once.
pub async fn dispatch(command: &Command, tracker: &HeadTracker) -> Response {
    debug!("Dispatching {:?}", command);
    match command {
        Command::Toggle => {
            let enabled = tracker.toggle().await;
            Response::Ok(format!(
                "tracking {}",
                if enabled { "enabled" } else { "disabled" }
            ))
        }
        Command::Recenter => {
            tracker.recenter().await;
            Response::Ok("recentered".to_string())
        }
        Command::Pause => {
            tracker.pause().await;
            Response::Ok("paused".to_string())
        }
        Command::Resume => {
            tracker.resume().await;
            Response::Ok("resumed".to_string())
        }
        Command::Reload => match tracker.reload().await {
            Ok(_) => Response::Ok("configuration reloaded".to_string()),
            Err(e) => e.into(),
        },
        Command::Status => {
            let status = tracker.status().await;
            Response::Ok(format!(
                "enabled={} sensitivity={:.1}",
                status.enabled, status.sensitivity
            ))
        }
        Command::Sensitivity(SensitivityArg::Relative(delta)) => {
            match tracker.adjust_sensitivity(*delta).await {
                Ok(value) => Response::Ok(format!("sensitivity adjusted to {:.1}", value)),
                Err(e) => e.into(),
            }
        }
        Command::Sensitivity(SensitivityArg::Absolute(value)) => {
            match tracker.set_sensitivity(*value).await {
                Ok(value) => Response::Ok(format!("sensitivity set to {:.1}", value)),
                Err(e) => e.into(),
            }
        }
        Command::Sensitivity(SensitivityArg::Invalid) => TrackerError::InvalidSensitivity.into(),
        Command::Set(setting, Some(value)) => match tracker.set_setting(*setting, *value).await {
            Ok(value) => Response::Ok(format!("{} set to {:.2}", setting.name(), value)),
            Err(e) => e.into(),
        },
        Command::Set(setting, None) => TrackerError::InvalidSetting(*setting).into(),
        Command::Invert(target) => {
            let inverted = tracker.toggle_invert(*target).await;
            let subject = match target {
                InvertTarget::X => "X-axis",
                InvertTarget::Y => "Y-axis",
                InvertTarget::Scroll => "scroll direction",
            };
            Response::Ok(format!(
                "{} {}",
                subject,
                if inverted { "inverted" } else { "normal" }
            ))
        }
        Command::Unknown(cmd) => Response::Error(format!("unknown command '{}'", cmd)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(tracker: &HeadTracker, line: &str) -> String {
        dispatch(&Command::parse(line), tracker).await.to_string()
    }

    #[test]
    fn parses_verbs() {
        assert_eq!(Command::parse("toggle"), Command::Toggle);
        assert_eq!(Command::parse("status"), Command::Status);
        assert_eq!(
            Command::parse("sensitivity 100"),
            Command::Sensitivity(SensitivityArg::Absolute(100.0))
        );
        assert_eq!(
            Command::parse("sensitivity +10"),
            Command::Sensitivity(SensitivityArg::Relative(10.0))
        );
        assert_eq!(
            Command::parse("sensitivity -2.5"),
            Command::Sensitivity(SensitivityArg::Relative(-2.5))
        );
        assert_eq!(
            Command::parse("sensitivity fast"),
            Command::Sensitivity(SensitivityArg::Invalid)
        );
        // Verbs are exact, no trimming or case folding
        assert_eq!(
            Command::parse("sensitivity"),
            Command::Unknown("sensitivity".to_string())
        );
        assert_eq!(Command::parse("Toggle"), Command::Unknown("Toggle".to_string()));
        assert_eq!(Command::parse(" pause"), Command::Unknown(" pause".to_string()));
    }

    #[test]
    fn request_is_cut_at_first_newline() {
        assert_eq!(Command::from_request(b"pause\n"), Command::Pause);
        assert_eq!(Command::from_request(b"pause"), Command::Pause);
        assert_eq!(Command::from_request(b"pause\nresume\n"), Command::Pause);
        assert_eq!(Command::from_request(b"\n"), Command::Unknown(String::new()));
    }

    #[test]
    fn request_lines_parse_back() {
        for command in [
            Command::Toggle,
            Command::Reload,
            Command::Sensitivity(SensitivityArg::Absolute(12.5)),
            Command::Sensitivity(SensitivityArg::Relative(-3.0)),
            Command::Sensitivity(SensitivityArg::Relative(10.0)),
            Command::Set(Setting::Smoothing, Some(0.25)),
            Command::Set(Setting::RollThreshold, Some(20.0)),
            Command::Invert(InvertTarget::Scroll),
        ] {
            let line = command.to_request().unwrap();
            assert_eq!(Command::parse(&line), command);
        }
        assert_eq!(Command::Unknown("x".to_string()).to_request(), None);
        assert_eq!(Command::Set(Setting::Deadzone, None).to_request(), None);
    }

    #[test]
    fn parses_tuning_verbs() {
        assert_eq!(
            Command::parse("smooth 0.5"),
            Command::Set(Setting::Smoothing, Some(0.5))
        );
        assert_eq!(
            Command::parse("deadzone 0.2"),
            Command::Set(Setting::Deadzone, Some(0.2))
        );
        assert_eq!(
            Command::parse("roll 20"),
            Command::Set(Setting::RollThreshold, Some(20.0))
        );
        assert_eq!(
            Command::parse("scroll 1.5"),
            Command::Set(Setting::ScrollSensitivity, Some(1.5))
        );
        assert_eq!(Command::parse("scroll lots"), Command::Set(Setting::ScrollSensitivity, None));
        assert_eq!(Command::parse("invertx"), Command::Invert(InvertTarget::X));
        assert_eq!(Command::parse("inverty"), Command::Invert(InvertTarget::Y));
        assert_eq!(Command::parse("invertscroll"), Command::Invert(InvertTarget::Scroll));
        assert_eq!(Command::parse("smooth"), Command::Unknown("smooth".to_string()));
        assert_eq!(Command::parse("rollover 3"), Command::Unknown("rollover 3".to_string()));
    }

    #[tokio::test]
    async fn tuning_responses() {
        let tracker = HeadTracker::with_defaults();
        assert_eq!(run(&tracker, "smooth 0.5").await, "OK: smoothing set to 0.50");
        assert_eq!(run(&tracker, "smooth 2").await, "ERROR: invalid smoothing value");
        assert_eq!(run(&tracker, "deadzone 0.3").await, "OK: deadzone set to 0.30");
        assert_eq!(run(&tracker, "deadzone -1").await, "ERROR: invalid deadzone value");
        assert_eq!(run(&tracker, "roll 0").await, "OK: roll threshold set to 0.00");
        assert_eq!(run(&tracker, "roll x").await, "ERROR: invalid roll threshold value");
        assert_eq!(run(&tracker, "scroll 2").await, "OK: scroll sensitivity set to 2.00");
        assert_eq!(
            run(&tracker, "scroll 0").await,
            "ERROR: invalid scroll sensitivity value"
        );

        let config = tracker.config().await;
        assert_eq!(config.smoothing, 0.5);
        assert_eq!(config.deadzone, 0.3);
        assert_eq!(config.roll_scroll_threshold, 0.0);
        assert_eq!(config.scroll_sensitivity, 2.0);
    }

    #[tokio::test]
    async fn invert_responses() {
        let tracker = HeadTracker::with_defaults();
        assert_eq!(run(&tracker, "invertx").await, "OK: X-axis inverted");
        assert_eq!(run(&tracker, "invertx").await, "OK: X-axis normal");
        assert_eq!(run(&tracker, "inverty").await, "OK: Y-axis normal");
        assert_eq!(run(&tracker, "invertscroll").await, "OK: scroll direction inverted");

        let config = tracker.config().await;
        assert!(!config.invert_x);
        assert!(!config.invert_y);
        assert!(config.invert_scroll);
    }

    #[tokio::test]
    async fn sensitivity_responses() {
        let tracker = HeadTracker::with_defaults();
        assert_eq!(
            run(&tracker, "sensitivity 100").await,
            "OK: sensitivity set to 100.0"
        );
        assert_eq!(tracker.config().await.sensitivity_pitch, 100.0);

        tracker.set_sensitivity(45.0).await.unwrap();
        assert_eq!(
            run(&tracker, "sensitivity +10").await,
            "OK: sensitivity adjusted to 55.0"
        );
        assert_eq!(
            run(&tracker, "sensitivity -5").await,
            "OK: sensitivity adjusted to 50.0"
        );
        assert_eq!(run(&tracker, "sensitivity 0").await, "ERROR: invalid sensitivity value");
        assert_eq!(
            run(&tracker, "sensitivity abc").await,
            "ERROR: invalid sensitivity value"
        );

        tracker.set_sensitivity(30.0).await.unwrap();
        assert_eq!(
            run(&tracker, "sensitivity -30.0").await,
            "ERROR: invalid sensitivity value"
        );
        assert_eq!(tracker.status().await.sensitivity, 30.0);
    }

    #[tokio::test]
    async fn flag_commands() {
        let tracker = HeadTracker::with_defaults();
        assert_eq!(run(&tracker, "status").await, "OK: enabled=true sensitivity=45.0");
        assert_eq!(run(&tracker, "toggle").await, "OK: tracking disabled");
        assert_eq!(run(&tracker, "status").await, "OK: enabled=false sensitivity=45.0");
        assert_eq!(run(&tracker, "toggle").await, "OK: tracking enabled");

        assert_eq!(run(&tracker, "pause").await, "OK: paused");
        assert!(tracker.flags().await.paused);
        assert_eq!(run(&tracker, "resume").await, "OK: resumed");
        assert!(!tracker.flags().await.paused);

        assert_eq!(run(&tracker, "recenter").await, "OK: recentered");
        assert_eq!(run(&tracker, "reload").await, "OK: configuration reloaded");
    }

    #[tokio::test]
    async fn unknown_command_echoes_verb() {
        let tracker = HeadTracker::with_defaults();
        assert_eq!(run(&tracker, "foo").await, "ERROR: unknown command 'foo'");
        assert_eq!(run(&tracker, "").await, "ERROR: unknown command ''");
    }

    #[test]
    fn response_wire_form() {
        assert_eq!(Response::Ok("paused".into()).to_line(), "OK: paused\n");
        let err = Response::Error("bad".into());
        assert!(err.is_error());
        assert_eq!(err.to_line(), "ERROR: bad\n");
    }
}
