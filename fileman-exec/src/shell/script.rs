// SPDX-License-Identifier: GPL-3.0-only

//! Guarded `sh` scripts and exit-code classification
//!
//! A script is a run of guard lines, each exiting with a sysexits code when
//! a precondition fails, followed by the utility invocation. Failures are
//! classified from the exit status alone.

use std::path::{Path, PathBuf};

use fileman_sys::shell::{
    EXIT_CANT_CREATE, EXIT_COMMAND_NOT_FOUND, EXIT_NO_INPUT, EXIT_NO_PERM, EXIT_NOT_EXECUTABLE,
    EXIT_USAGE, quote_path,
};
use fileman_sys::{ShellOutput, is_read_only_filesystem};

use crate::error::{ExecError, Result};
use crate::paths::parent_of;

/// `find -printf` record: parent, name, type, size, mtime, mode, uid, gid,
/// link target; every field NUL-terminated.
pub(crate) const FIND_FORMAT: &str = r"%h\0%f\0%y\0%s\0%T@\0%m\0%U\0%G\0%l\0";

/// Record of folder usage scans: type, size, name.
pub(crate) const USAGE_FORMAT: &str = r"%y\0%s\0%f\0";

#[derive(Debug, Default)]
pub(crate) struct Script {
    lines: Vec<String>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, line: String) -> Self {
        self.lines.push(line);
        self
    }

    /// Exit 66 unless `path` exists (dangling links count).
    pub fn exists(self, path: &Path) -> Self {
        let path = quote_path(path);
        self.push(format!(
            "{{ [ -e {path} ] || [ -L {path} ]; }} || exit {EXIT_NO_INPUT}"
        ))
    }

    /// Exit 66 unless `path` resolves to an existing object.
    pub fn resolves(self, path: &Path) -> Self {
        let path = quote_path(path);
        self.push(format!("[ -e {path} ] || exit {EXIT_NO_INPUT}"))
    }

    /// Exit 66 unless `path` is a directory.
    pub fn directory_exists(self, path: &Path) -> Self {
        let path = quote_path(path);
        self.push(format!("[ -d {path} ] || exit {EXIT_NO_INPUT}"))
    }

    /// Exit 73 when anything, even a dangling link, occupies `path`.
    pub fn absent(self, path: &Path) -> Self {
        let path = quote_path(path);
        self.push(format!(
            "if [ -e {path} ] || [ -L {path} ]; then exit {EXIT_CANT_CREATE}; fi"
        ))
    }

    /// Exit 64 when `path` is a real directory (not a link to one).
    pub fn not_directory(self, path: &Path) -> Self {
        let path = quote_path(path);
        self.push(format!(
            "if [ -d {path} ] && [ ! -L {path} ]; then exit {EXIT_USAGE}; fi"
        ))
    }

    /// Exit 64 when `path`, followed through links, is a directory.
    pub fn not_resolving_directory(self, path: &Path) -> Self {
        let path = quote_path(path);
        self.push(format!("if [ -d {path} ]; then exit {EXIT_USAGE}; fi"))
    }

    /// Exit 64 unless `path` is a real directory.
    pub fn real_directory(self, path: &Path) -> Self {
        let path = quote_path(path);
        self.push(format!(
            "if [ -L {path} ] || [ ! -d {path} ]; then exit {EXIT_USAGE}; fi"
        ))
    }

    /// Exit 64 unless `path` resolves to a directory.
    pub fn resolving_directory(self, path: &Path) -> Self {
        let path = quote_path(path);
        self.push(format!("[ -d {path} ] || exit {EXIT_USAGE}"))
    }

    pub fn writable(self, path: &Path) -> Self {
        let path = quote_path(path);
        self.push(format!("[ -w {path} ] || exit {EXIT_NO_PERM}"))
    }

    pub fn readable(self, path: &Path) -> Self {
        let path = quote_path(path);
        self.push(format!("[ -r {path} ] || exit {EXIT_NO_PERM}"))
    }

    /// Exit 77 unless the directory can be listed.
    pub fn listable(self, path: &Path) -> Self {
        let path = quote_path(path);
        self.push(format!(
            "{{ [ -r {path} ] && [ -x {path} ]; }} || exit {EXIT_NO_PERM}"
        ))
    }

    /// Exit 77 unless `path` can be written, or created in its parent when
    /// absent.
    pub fn writable_target(self, path: &Path) -> Self {
        let parent = quote_path(&parent_of(path));
        let path = quote_path(path);
        self.push(format!(
            "if [ -e {path} ]; then [ -w {path} ] || exit {EXIT_NO_PERM}; \
             else [ -w {parent} ] || exit {EXIT_NO_PERM}; fi"
        ))
    }

    /// Extraction target: an existing writable directory, or a new one in a
    /// writable parent.
    pub fn extract_directory(self, path: &Path) -> Self {
        let parent = quote_path(&parent_of(path));
        let path = quote_path(path);
        self.push(format!(
            "if [ -e {path} ] || [ -L {path} ]; then \
             {{ [ -d {path} ] && [ ! -L {path} ]; }} || exit {EXIT_CANT_CREATE}; \
             [ -w {path} ] || exit {EXIT_NO_PERM}; \
             else [ -d {parent} ] || exit {EXIT_NO_INPUT}; \
             [ -w {parent} ] || exit {EXIT_NO_PERM}; fi"
        ))
    }

    /// Exit 66 unless process `pid` exists.
    pub fn process_exists(self, pid: i32) -> Self {
        self.push(format!("[ -d /proc/{pid} ] || exit {EXIT_NO_INPUT}"))
    }

    /// Exit 77 unless running as root.
    pub fn root(self) -> Self {
        self.push(format!("[ \"$(id -u)\" = 0 ] || exit {EXIT_NO_PERM}"))
    }

    /// Exit 77 unless the invoking user owns `path` or is root.
    pub fn owned(self, path: &Path) -> Self {
        let path = quote_path(path);
        self.push(format!(
            "{{ [ -O {path} ] || [ \"$(id -u)\" = 0 ]; }} || exit {EXIT_NO_PERM}"
        ))
    }

    /// Run `command`; on failure remove the partial `output` and keep the
    /// command's exit status.
    pub fn run_cleaning(self, command: String, output: &Path) -> Self {
        let output = quote_path(output);
        self.push(format!(
            "{command} || {{ status=$?; rm -f -- {output}; exit $status; }}"
        ))
    }

    pub fn run(self, command: impl Into<String>) -> Self {
        self.push(command.into())
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// Paths a guarded script refers to when it fails.
#[derive(Debug, Clone)]
pub(crate) struct Subject {
    /// Object read or removed (reported on 66, 64, 126)
    pub input: PathBuf,
    /// Object created (reported on 73)
    pub output: PathBuf,
    /// Directories written to; 77 is read-only-filesystem when any of them
    /// lives on a read-only mount
    pub written: Vec<PathBuf>,
}

impl Subject {
    /// Read-only access to `path`.
    pub fn reading(path: &Path) -> Self {
        Self {
            input: path.to_path_buf(),
            output: path.to_path_buf(),
            written: Vec::new(),
        }
    }

    /// Creating or replacing `path` in its parent directory.
    pub fn creating(path: &Path) -> Self {
        Self {
            input: path.to_path_buf(),
            output: path.to_path_buf(),
            written: vec![parent_of(path)],
        }
    }

    /// Modifying `path` itself.
    pub fn modifying(path: &Path) -> Self {
        Self {
            input: path.to_path_buf(),
            output: path.to_path_buf(),
            written: vec![path.to_path_buf()],
        }
    }

    pub fn transfer(source: &Path, target: &Path, written: Vec<PathBuf>) -> Self {
        Self {
            input: source.to_path_buf(),
            output: target.to_path_buf(),
            written,
        }
    }
}

/// Classify a finished script from its exit status.
pub(crate) fn classify(
    command: &'static str,
    output: &ShellOutput,
    subject: &Subject,
) -> Result<()> {
    match output.code {
        Some(0) => Ok(()),
        Some(EXIT_COMMAND_NOT_FOUND) => Err(ExecError::CommandNotFound(command.to_string())),
        Some(EXIT_NOT_EXECUTABLE) => {
            Err(ExecError::InsufficientPermissions(subject.input.clone()))
        }
        Some(EXIT_NO_INPUT) => Err(ExecError::NoSuchFileOrDirectory(subject.input.clone())),
        Some(EXIT_CANT_CREATE) => Err(ExecError::AlreadyExists(subject.output.clone())),
        Some(EXIT_USAGE) => Err(ExecError::InvalidArgument(format!(
            "{command}: unsupported on {}",
            subject.input.display()
        ))),
        Some(EXIT_NO_PERM) => {
            let read_only = subject
                .written
                .iter()
                .find(|path| is_read_only_filesystem(path));
            match read_only {
                Some(path) => Err(ExecError::ReadOnlyFilesystem(path.clone())),
                None => Err(ExecError::InsufficientPermissions(
                    subject
                        .written
                        .first()
                        .cloned()
                        .unwrap_or_else(|| subject.input.clone()),
                )),
            }
        }
        code => Err(ExecError::ExecutionFailed {
            command,
            code,
            stderr: output.stderr.clone(),
        }),
    }
}
