//! Runtime settings taken from the environment.

use crate::store::PASS_PROGRAM;

pub const PASS_PROGRAM_VAR: &str = "TOTP_PASS_PROGRAM";
pub const X_SELECTION_VAR: &str = "PASSWORD_STORE_X_SELECTION";
pub const WAYLAND_DISPLAY_VAR: &str = "WAYLAND_DISPLAY";

const DEFAULT_SELECTION: &str = "clipboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Executable used as the password store backend
    pub pass_program: String,
    /// X11 selection the token is copied to (`clipboard` or `primary`)
    pub x_selection: String,
    /// Whether a Wayland session was detected
    pub wayland: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pass_program: PASS_PROGRAM.to_string(),
            x_selection: DEFAULT_SELECTION.to_string(),
            wayland: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup. Empty values
    /// count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            pass_program: get(PASS_PROGRAM_VAR).unwrap_or(defaults.pass_program),
            x_selection: get(X_SELECTION_VAR).unwrap_or(defaults.x_selection),
            wayland: get(WAYLAND_DISPLAY_VAR).is_some(),
        }
    }
}
