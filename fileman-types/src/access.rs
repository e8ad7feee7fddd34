// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TypeParseError;

/// How filesystem operations are dispatched.
///
/// - `Safe`: in-process only, never elevates
/// - `Prompt`: in-process, but permission failures are reported as
///   candidates for switching to `Root`
/// - `Root`: every operation goes through the shell behind a superuser wrapper
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    #[default]
    Safe,
    Prompt,
    Root,
}

impl AccessMode {
    pub const ALL: [AccessMode; 3] = [AccessMode::Safe, AccessMode::Prompt, AccessMode::Root];

    pub fn as_str(self) -> &'static str {
        match self {
            AccessMode::Safe => "safe",
            AccessMode::Prompt => "prompt",
            AccessMode::Root => "root",
        }
    }

    pub fn is_privileged(self) -> bool {
        self == AccessMode::Root
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = TypeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AccessMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| TypeParseError::AccessMode(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes_case_insensitively() {
        assert_eq!("ROOT".parse::<AccessMode>(), Ok(AccessMode::Root));
        assert_eq!(" prompt ".parse::<AccessMode>(), Ok(AccessMode::Prompt));
        assert!("sudo".parse::<AccessMode>().is_err());
        assert!(AccessMode::Root.is_privileged());
        assert!(!AccessMode::Prompt.is_privileged());
    }
}
