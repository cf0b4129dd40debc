//! Storage of TOTP entries in the password store.
//!
//! Every entry is kept under `2fa/<identifier>/code` as a multi-line payload:
//! the secret on the first line, optionally followed by a `digits: <n>` line.
//! Other lines are preserved by the store but ignored here.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    io::Write,
    path::Path,
    process::{Command, Stdio},
    sync::OnceLock,
};

use log::{debug, info};
use regex::Regex;

use crate::{BackendError, OtpError, DIGITS_DEFAULT};

const ENTRY_PREFIX: &str = "2fa/";
const ENTRY_SUFFIX: &str = "/code";
const DIGITS_PREFIX: &str = "digits:";

/// Name of the password manager executable used by default.
pub const PASS_PROGRAM: &str = "pass";

/// Path of the entry for `identifier` inside the password store.
pub fn entry_path(identifier: &str) -> String {
    format!("{ENTRY_PREFIX}{identifier}{ENTRY_SUFFIX}")
}

/// A stored entry as read back from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    /// The raw secret, exactly as stored on the first line
    pub secret: String,
    pub digits: u32,
    pub raw_lines: Vec<String>,
}

impl SecretRecord {
    /// Interprets a verbatim entry payload.
    ///
    /// The first line that starts with `digits:` (in any case) sets the
    /// token length, otherwise it is [`DIGITS_DEFAULT`].
    pub fn parse(payload: &str) -> Result<Self, OtpError> {
        let raw_lines: Vec<String> = payload.lines().map(str::to_string).collect();

        let secret = raw_lines.first().cloned().unwrap_or_default();

        let digits = match raw_lines.iter().find(|line| is_digits_line(line)) {
            Some(line) => parse_digits_line(line)?,
            None => DIGITS_DEFAULT,
        };

        Ok(Self {
            secret,
            digits,
            raw_lines,
        })
    }

    /// Renders the payload written for a new entry.
    pub fn payload(secret: &str, digits: u32) -> String {
        format!("{secret}\ndigits: {digits}\n")
    }
}

fn is_digits_line(line: &str) -> bool {
    line.get(..DIGITS_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(DIGITS_PREFIX))
}

fn parse_digits_line(line: &str) -> Result<u32, OtpError> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let number = NUMBER.get_or_init(|| Regex::new(r"[0-9]+").expect("static regex is valid"));

    let found = number
        .find(line)
        .ok_or_else(|| OtpError::MalformedDigitsLine(line.to_string()))?;

    found
        .as_str()
        .parse()
        .map_err(|e| OtpError::IntegerParseError(e, DIGITS_PREFIX.trim_end_matches(':').into()))
}

/// Persistence of named secret entries.
pub trait EntryStore {
    /// Fetches and interprets the entry for `identifier`.
    fn read(&self, identifier: &str) -> Result<SecretRecord, OtpError>;

    /// Stores `secret` with its token length, replacing any previous entry.
    fn write(&self, identifier: &str, digits: u32, secret: &str) -> Result<(), OtpError>;

    /// Deletes the entry for `identifier`.
    fn remove(&self, identifier: &str) -> Result<(), OtpError>;
}

/// [`EntryStore`] backed by the `pass` command line tool.
///
/// Each operation is one blocking run of the executable. A non-zero exit
/// status becomes a [`BackendError`] carrying its stderr.
#[derive(Debug, Clone)]
pub struct PassStore {
    program: String,
    name: String,
}

impl Default for PassStore {
    fn default() -> Self {
        Self::new(PASS_PROGRAM)
    }
}

impl PassStore {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let name = Path::new(&program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.clone());

        Self { program, name }
    }

    fn backend_error(&self, message: impl Into<String>) -> OtpError {
        BackendError::new(self.name.as_str(), message).into()
    }

    /// Runs the backend, feeding `input` on stdin, and returns its stdout.
    fn run(&self, args: &[&str], input: Option<&str>) -> Result<String, OtpError> {
        debug!("running {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.backend_error(e.to_string()))?;

        // Reap the child even when it closed stdin early. A non-zero exit's
        // stderr takes precedence over the write error.
        let written = match (input, child.stdin.take()) {
            (Some(input), Some(mut stdin)) => stdin.write_all(input.as_bytes()),
            _ => Ok(()),
        };

        let output = child
            .wait_with_output()
            .map_err(|e| self.backend_error(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.backend_error(stderr.trim_end_matches(['\r', '\n'])));
        }
        written.map_err(|e| self.backend_error(e.to_string()))?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl EntryStore for PassStore {
    fn read(&self, identifier: &str) -> Result<SecretRecord, OtpError> {
        let payload = self.run(&["show", &entry_path(identifier)], None)?;

        SecretRecord::parse(&payload)
    }

    fn write(&self, identifier: &str, digits: u32, secret: &str) -> Result<(), OtpError> {
        let path = entry_path(identifier);
        let payload = SecretRecord::payload(secret, digits);

        self.run(&["insert", "--multiline", "--force", &path], Some(&payload))?;
        info!("stored {path}");

        Ok(())
    }

    fn remove(&self, identifier: &str) -> Result<(), OtpError> {
        let path = entry_path(identifier);

        self.run(&["rm", "--force", &path], None)?;
        info!("removed {path}");

        Ok(())
    }
}

/// In-memory [`EntryStore`] holding raw payloads keyed by entry path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub const BACKEND_NAME: &'static str = "memory";

    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a verbatim payload for `identifier`.
    pub fn with_payload(self, identifier: &str, payload: &str) -> Self {
        self.entries
            .borrow_mut()
            .insert(entry_path(identifier), payload.to_string());

        self
    }

    /// The verbatim payload stored for `identifier`, if any.
    pub fn payload(&self, identifier: &str) -> Option<String> {
        self.entries.borrow().get(&entry_path(identifier)).cloned()
    }

    fn not_found(path: &str) -> OtpError {
        BackendError::new(
            Self::BACKEND_NAME,
            format!("Error: {path} is not in the password store."),
        )
        .into()
    }
}

impl EntryStore for MemoryStore {
    fn read(&self, identifier: &str) -> Result<SecretRecord, OtpError> {
        let path = entry_path(identifier);
        let entries = self.entries.borrow();
        let payload = entries.get(&path).ok_or_else(|| Self::not_found(&path))?;

        SecretRecord::parse(payload)
    }

    fn write(&self, identifier: &str, digits: u32, secret: &str) -> Result<(), OtpError> {
        self.entries.borrow_mut().insert(
            entry_path(identifier),
            SecretRecord::payload(secret, digits),
        );

        Ok(())
    }

    fn remove(&self, identifier: &str) -> Result<(), OtpError> {
        let path = entry_path(identifier);

        match self.entries.borrow_mut().remove(&path) {
            Some(_) => Ok(()),
            None => Err(Self::not_found(&path)),
        }
    }
}
