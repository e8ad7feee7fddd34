// SPDX-License-Identifier: GPL-3.0-only

//! Shell invocation
//!
//! Scripts are run as `sh -c <script>`, optionally behind a superuser wrapper
//! (`sudo -n`, `su -c`, ...). Callers classify failures from the exit status;
//! the constants below are the codes our own guard lines emit, taken from
//! `sysexits.h`, plus the two codes POSIX shells reserve for lookup failures.

use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Result, SysError};

/// Invalid argument for the operation (e.g. deleting a directory as a file).
pub const EXIT_USAGE: i32 = 64;
/// Source path does not exist.
pub const EXIT_NO_INPUT: i32 = 66;
/// Destination already exists.
pub const EXIT_CANT_CREATE: i32 = 73;
/// Target is not readable or writable by the invoking identity.
pub const EXIT_NO_PERM: i32 = 77;
/// The shell found the command but could not execute it.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;
/// The shell could not find the command.
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// How the superuser program expects the command it elevates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuperuserStyle {
    /// Remaining argv is executed directly (`sudo -n sh -c ...`)
    #[default]
    Argv,
    /// A single command string follows (`su -c 'sh -c ...'`)
    CommandString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperuserWrapper {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub style: SuperuserStyle,
}

impl Default for SuperuserWrapper {
    fn default() -> Self {
        Self {
            program: "sudo".to_string(),
            args: vec!["-n".to_string()],
            style: SuperuserStyle::Argv,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShellOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Runs scripts through a POSIX shell.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
    superuser: Option<SuperuserWrapper>,
}

impl ShellRunner {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            superuser: None,
        }
    }

    /// Run every script through `wrapper`.
    pub fn privileged(shell: impl Into<PathBuf>, wrapper: SuperuserWrapper) -> Self {
        Self {
            shell: shell.into(),
            superuser: Some(wrapper),
        }
    }

    pub fn shell(&self) -> &Path {
        &self.shell
    }

    pub fn is_privileged(&self) -> bool {
        self.superuser.is_some()
    }

    /// The program actually spawned: the superuser wrapper or the shell.
    pub fn launcher(&self) -> &OsStr {
        match &self.superuser {
            Some(wrapper) => OsStr::new(&wrapper.program),
            None => self.shell.as_os_str(),
        }
    }

    fn command(&self, script: &str) -> Command {
        match &self.superuser {
            None => {
                let mut command = Command::new(&self.shell);
                command.arg("-c").arg(script);
                command
            }
            Some(wrapper) => {
                let mut command = Command::new(&wrapper.program);
                command.args(&wrapper.args);
                match wrapper.style {
                    SuperuserStyle::Argv => {
                        command.arg(&self.shell).arg("-c").arg(script);
                    }
                    SuperuserStyle::CommandString => {
                        command.arg(format!(
                            "{} -c {}",
                            quote(&self.shell.to_string_lossy()),
                            quote(script)
                        ));
                    }
                }
                command
            }
        }
    }

    /// Run `script`, feeding `stdin` when given. Blocks until the shell exits.
    pub fn run(&self, script: &str, stdin: Option<&[u8]>) -> Result<ShellOutput> {
        debug!(
            privileged = self.is_privileged(),
            "Running shell script: {}", script
        );

        let mut command = self.command(script);
        command
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                SysError::CommandNotFound(self.launcher().to_string_lossy().into_owned())
            } else {
                SysError::Io(error)
            }
        })?;

        if let Some(input) = stdin
            && let Some(mut pipe) = child.stdin.take()
            && let Err(error) = pipe.write_all(input)
            && error.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(SysError::Io(error));
        }

        let output = child.wait_with_output()?;
        let result = ShellOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        };

        trace!(code = ?result.code, stderr = %result.stderr, "Shell script finished");
        Ok(result)
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("/bin/sh")
    }
}

/// Quote `value` as a single POSIX shell word.
pub fn quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || "/._-+=:,@%".contains(character))
    {
        return value.to_string();
    }

    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Lossy for paths that are not UTF-8; callers that must act on the exact
/// path reject those first.
pub fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy())
}

/// Whether `program` resolves on `PATH` (or is an existing absolute path).
pub fn has_command(program: &str) -> bool {
    which::which(program).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(quote("/data/file.txt"), "/data/file.txt");
        assert_eq!(quote("My Files"), "'My Files'");
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote(""), "''");
        assert_eq!(quote("$(reboot)"), "'$(reboot)'");
    }

    #[test]
    fn runs_scripts_and_captures_streams() {
        if !has_command("sh") {
            return;
        }

        let runner = ShellRunner::new("sh");
        let output = runner
            .run("cat; echo oops >&2; exit 3", Some(b"hello"))
            .expect("sh should run");
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout, b"hello");
        assert_eq!(output.stderr, "oops");
        assert!(!output.success());
    }

    #[test]
    fn missing_launcher_is_command_not_found() {
        let runner = ShellRunner::new("/nonexistent/fileman-shell");
        let error = runner.run("true", None).unwrap_err();
        assert!(matches!(error, SysError::CommandNotFound(_)));
    }

    #[test]
    fn command_string_wrapper_quotes_whole_invocation() {
        let runner = ShellRunner::privileged(
            "/bin/sh",
            SuperuserWrapper {
                program: "su".to_string(),
                args: vec!["-c".to_string()],
                style: SuperuserStyle::CommandString,
            },
        );
        let command = runner.command("ls 'a b'");
        let args: Vec<_> = command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(command.get_program(), "su");
        assert_eq!(args, vec!["-c", r"/bin/sh -c 'ls '\''a b'\'''"]);
    }
}
