use std::{
    io::{self, Write},
    process::{Command, Stdio},
};

use log::{debug, warn};

use crate::config::Config;

/// Destination for generated tokens.
pub trait Clipboard {
    fn copy(&self, text: &str) -> io::Result<()>;
}

/// Copies through the platform clipboard utility.
///
/// A missing utility is not an error: a warning is logged and nothing is
/// copied.
#[derive(Debug, Clone)]
pub struct SystemClipboard {
    command: Vec<String>,
}

impl SystemClipboard {
    pub fn new(config: &Config) -> Self {
        Self {
            command: clipboard_command(std::env::consts::OS, config),
        }
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }
}

/// Picks the utility and its arguments for the given OS name.
fn clipboard_command(os: &str, config: &Config) -> Vec<String> {
    let command: Vec<&str> = match os {
        "macos" => vec!["pbcopy"],
        "windows" => vec!["clip"],
        _ if config.wayland => match config.x_selection.as_str() {
            "primary" => vec!["wl-copy", "--primary"],
            _ => vec!["wl-copy"],
        },
        _ => vec!["xclip", "-selection", config.x_selection.as_str()],
    };

    command.into_iter().map(String::from).collect()
}

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> io::Result<()> {
        let Some((program, args)) = self.command.split_first() else {
            return Ok(());
        };
        debug!("copying token with {program}");

        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("{program} not found. Not copying code");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        child.wait()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{clipboard_command, Clipboard, SystemClipboard};
    use crate::config::Config;

    fn config(x_selection: &str, wayland: bool) -> Config {
        Config {
            x_selection: x_selection.into(),
            wayland,
            ..Config::default()
        }
    }

    #[rstest]
    #[case("macos", config("clipboard", true), &["pbcopy"])]
    #[case("windows", config("clipboard", false), &["clip"])]
    #[case("linux", config("clipboard", false), &["xclip", "-selection", "clipboard"])]
    #[case("freebsd", config("primary", false), &["xclip", "-selection", "primary"])]
    #[case("linux", config("clipboard", true), &["wl-copy"])]
    #[case("linux", config("primary", true), &["wl-copy", "--primary"])]
    fn selects_utility(#[case] os: &str, #[case] config: Config, #[case] expected: &[&str]) {
        assert_eq!(expected.to_vec(), clipboard_command(os, &config));
    }

    #[test]
    fn missing_utility_is_not_an_error() {
        let clipboard = SystemClipboard {
            command: vec!["definitely-not-a-clipboard-utility".into()],
        };

        assert!(clipboard.copy("123456").is_ok());
    }
}
