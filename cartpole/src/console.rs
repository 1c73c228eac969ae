//! Line commands for an interactive remote session.
//!
//! ```text
//! connect | disconnect | reset | play | pause | output | quit
//! toggle <controller>
//! force <newtons>
//! key <ArrowLeft|ArrowRight|a|d> <down|up>
//! params <json object>
//! ```

use std::io::BufRead;

use anyhow::{anyhow, bail, Context, Result};
use runtime::Key;
use session::SessionCommand;
use tokio::sync::mpsc::Sender;
use tracing::{info, warn};

/// Parse one input line. Blank lines and `#` comments yield `None`.
///
/// # Errors
///
/// Unknown verbs and malformed arguments.
pub fn parse_command(line: &str) -> Result<Option<SessionCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match verb {
        "connect" => SessionCommand::Connect,
        "disconnect" => SessionCommand::Disconnect,
        "reset" => SessionCommand::Reset,
        "play" => SessionCommand::Play,
        "pause" => SessionCommand::Pause,
        "output" => SessionCommand::RequestOutput,
        "quit" | "exit" => SessionCommand::Shutdown,
        "toggle" => {
            if rest.is_empty() {
                bail!("usage: toggle <controller>");
            }
            SessionCommand::ToggleController(rest.to_owned())
        }
        "force" => {
            let force: f64 = rest.parse().with_context(|| format!("bad force `{rest}`"))?;
            if !force.is_finite() {
                bail!("force must be finite");
            }
            SessionCommand::SetForce(force)
        }
        "key" => {
            let mut args = rest.split_whitespace();
            let key: Key = args
                .next()
                .ok_or_else(|| anyhow!("usage: key <name> <down|up>"))?
                .parse()?;
            let down = match args.next() {
                Some("down") => true,
                Some("up") => false,
                _ => bail!("usage: key <name> <down|up>"),
            };
            SessionCommand::Keyboard {
                key: key.as_str().to_owned(),
                down,
            }
        }
        "params" => {
            let params: serde_json::Value = serde_json::from_str(rest).context("params must be JSON")?;
            if !params.is_object() {
                bail!("params must be a JSON object");
            }
            SessionCommand::UpdateParams(params)
        }
        other => bail!("unknown command `{other}`"),
    };
    Ok(Some(command))
}

/// Forward parsed lines from `input` until end of input, `quit` or a closed
/// driver. Bad lines are reported and skipped.
pub fn forward_commands(input: impl BufRead, commands: &Sender<SessionCommand>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("stdin read failed: {e}");
                break;
            }
        };
        match parse_command(&line) {
            Ok(Some(command)) => {
                let quit = command == SessionCommand::Shutdown;
                if commands.blocking_send(command).is_err() || quit {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("{e:#}"),
        }
    }
    info!("command input closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_every_verb() {
        let cases = [
            ("connect", SessionCommand::Connect),
            ("  disconnect ", SessionCommand::Disconnect),
            ("reset", SessionCommand::Reset),
            ("play", SessionCommand::Play),
            ("pause", SessionCommand::Pause),
            ("output", SessionCommand::RequestOutput),
            ("quit", SessionCommand::Shutdown),
            ("toggle pid", SessionCommand::ToggleController("pid".into())),
            ("force -2.5", SessionCommand::SetForce(-2.5)),
            (
                "key a down",
                SessionCommand::Keyboard {
                    key: "ArrowLeft".into(),
                    down: true,
                },
            ),
            (
                "key ArrowRight up",
                SessionCommand::Keyboard {
                    key: "ArrowRight".into(),
                    down: false,
                },
            ),
            (
                r#"params {"kp": 0.1}"#,
                SessionCommand::UpdateParams(json!({"kp": 0.1})),
            ),
        ];
        for (line, expected) in cases {
            assert_eq!(parse_command(line).unwrap(), Some(expected), "{line}");
        }
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("   # nothing").unwrap(), None);
    }

    #[test]
    fn rejects_bad_input() {
        for line in [
            "jump",
            "toggle",
            "force lots",
            "force inf",
            "key up down",
            "key a sideways",
            "params [1]",
            "params {",
        ] {
            assert!(parse_command(line).is_err(), "{line}");
        }
    }

    #[test]
    fn forwards_until_quit() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let input = "connect\nbogus\ntoggle pid\nquit\nreset\n".as_bytes();
        forward_commands(input, &tx);
        drop(tx);

        let mut received = Vec::new();
        while let Ok(command) = rx.try_recv() {
            received.push(command);
        }
        assert_eq!(
            received,
            vec![
                SessionCommand::Connect,
                SessionCommand::ToggleController("pid".into()),
                SessionCommand::Shutdown,
            ]
        );
    }
}
