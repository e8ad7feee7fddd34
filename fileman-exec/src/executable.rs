// SPDX-License-Identifier: GPL-3.0-only

//! The executable abstraction
//!
//! An [`Executable`] is one dispatchable filesystem operation: build it with
//! an [`ExecutableCreator`], call [`Executable::execute`] from a worker
//! thread, then read the typed outcome with [`Executable::result`].
//!
//! Every factory method on [`ExecutableCreator`] defaults to
//! [`ExecError::NotImplemented`]; a creator overrides only what it can do.

use std::path::{Path, PathBuf};

use fileman_types::{
    Checksum, ChecksumAlgorithm, CompressionMode, DiskUsage, FileSystemObject, FolderUsage,
    Identity, MountPoint, Query, SearchResult,
};
use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{ExecError, Result};

pub trait Executable: Send {
    type Output;

    fn name(&self) -> &'static str;

    /// Perform the operation. Blocks the calling thread.
    fn execute(&mut self, cancel: &CancellationToken) -> Result<()>;

    /// Outcome of a successful `execute`.
    fn result(&self) -> Option<&Self::Output>;

    fn take_result(&mut self) -> Option<Self::Output>;
}

pub type BoxedExecutable<T> = Box<dyn Executable<Output = T>>;

type Body<T> = Box<dyn FnOnce(&CancellationToken) -> Result<T> + Send>;

/// An executable backed by a one-shot closure.
pub struct Operation<T> {
    name: &'static str,
    body: Option<Body<T>>,
    result: Option<T>,
}

impl<T: Send + 'static> Operation<T> {
    pub fn new<F>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(&CancellationToken) -> Result<T> + Send + 'static,
    {
        Self {
            name,
            body: Some(Box::new(body)),
            result: None,
        }
    }

    pub fn boxed<F>(name: &'static str, body: F) -> BoxedExecutable<T>
    where
        F: FnOnce(&CancellationToken) -> Result<T> + Send + 'static,
    {
        Box::new(Self::new(name, body))
    }
}

impl<T: Send> Executable for Operation<T> {
    type Output = T;

    fn name(&self) -> &'static str {
        self.name
    }

    fn execute(&mut self, cancel: &CancellationToken) -> Result<()> {
        let body = self.body.take().ok_or_else(|| {
            ExecError::InvalidArgument(format!("{} has already been executed", self.name))
        })?;

        if cancel.is_cancelled() {
            return Err(ExecError::Cancelled);
        }

        let span = tracing::debug_span!("execute", operation = self.name);
        let _entered = span.enter();

        self.result = Some(body(cancel)?);
        Ok(())
    }

    fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    fn take_result(&mut self) -> Option<T> {
        self.result.take()
    }
}

/// Execute and hand back the typed outcome.
pub fn run<T>(mut executable: BoxedExecutable<T>, cancel: &CancellationToken) -> Result<T> {
    executable.execute(cancel)?;
    let name = executable.name();
    executable
        .take_result()
        .ok_or_else(|| ExecError::Parse(format!("{name} produced no result")))
}

/// Fail with `Cancelled` once the token fires.
pub fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(ExecError::Cancelled)
    } else {
        Ok(())
    }
}

/// Captured output of a raw shell script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Native,
    Shell,
}

/// Factory of executables, one method per operation.
pub trait ExecutableCreator: Send + Sync {
    fn backend(&self) -> Backend;

    fn list(&self, _dir: &Path) -> Result<BoxedExecutable<Vec<FileSystemObject>>> {
        Err(ExecError::NotImplemented("list"))
    }

    fn file_info(&self, _path: &Path) -> Result<BoxedExecutable<FileSystemObject>> {
        Err(ExecError::NotImplemented("file_info"))
    }

    fn create_directory(&self, _path: &Path) -> Result<BoxedExecutable<()>> {
        Err(ExecError::NotImplemented("create_directory"))
    }

    fn create_file(&self, _path: &Path) -> Result<BoxedExecutable<()>> {
        Err(ExecError::NotImplemented("create_file"))
    }

    fn delete_file(&self, _path: &Path) -> Result<BoxedExecutable<()>> {
        Err(ExecError::NotImplemented("delete_file"))
    }

    fn delete_directory(&self, _path: &Path) -> Result<BoxedExecutable<()>> {
        Err(ExecError::NotImplemented("delete_directory"))
    }

    /// Copy `source` to `destination`, or into it when it is a directory.
    fn copy(&self, _source: &Path, _destination: &Path) -> Result<BoxedExecutable<()>> {
        Err(ExecError::NotImplemented("copy"))
    }

    /// Move `source` to `destination`, or into it when it is a directory.
    fn move_to(&self, _source: &Path, _destination: &Path) -> Result<BoxedExecutable<()>> {
        Err(ExecError::NotImplemented("move"))
    }

    /// Create a symbolic link at `link` pointing to `target`.
    fn link(&self, _target: &Path, _link: &Path) -> Result<BoxedExecutable<()>> {
        Err(ExecError::NotImplemented("link"))
    }

    fn resolve_link(&self, _path: &Path) -> Result<BoxedExecutable<PathBuf>> {
        Err(ExecError::NotImplemented("resolve_link"))
    }

    fn read(&self, _path: &Path) -> Result<BoxedExecutable<Vec<u8>>> {
        Err(ExecError::NotImplemented("read"))
    }

    fn write(&self, _path: &Path, _data: Vec<u8>) -> Result<BoxedExecutable<()>> {
        Err(ExecError::NotImplemented("write"))
    }

    fn checksum(
        &self,
        _path: &Path,
        _algorithm: ChecksumAlgorithm,
    ) -> Result<BoxedExecutable<Checksum>> {
        Err(ExecError::NotImplemented("checksum"))
    }

    /// Compress `sources` with `mode`; returns the archive path.
    fn compress(
        &self,
        _mode: CompressionMode,
        _sources: &[PathBuf],
        _output: Option<&Path>,
    ) -> Result<BoxedExecutable<PathBuf>> {
        Err(ExecError::NotImplemented("compress"))
    }

    /// Extract `archive`; returns the extracted directory or file.
    fn uncompress(
        &self,
        _archive: &Path,
        _destination: Option<&Path>,
    ) -> Result<BoxedExecutable<PathBuf>> {
        Err(ExecError::NotImplemented("uncompress"))
    }

    fn disk_usage(&self, _path: &Path) -> Result<BoxedExecutable<DiskUsage>> {
        Err(ExecError::NotImplemented("disk_usage"))
    }

    fn folder_usage(&self, _dir: &Path) -> Result<BoxedExecutable<FolderUsage>> {
        Err(ExecError::NotImplemented("folder_usage"))
    }

    fn mount_points(&self) -> Result<BoxedExecutable<Vec<MountPoint>>> {
        Err(ExecError::NotImplemented("mount_points"))
    }

    fn remount(&self, _mount_path: &Path, _read_write: bool) -> Result<BoxedExecutable<()>> {
        Err(ExecError::NotImplemented("remount"))
    }

    fn search(&self, _dir: &Path, _query: &Query) -> Result<BoxedExecutable<Vec<SearchResult>>> {
        Err(ExecError::NotImplemented("search"))
    }

    fn change_permissions(&self, _path: &Path, _mode: u32) -> Result<BoxedExecutable<()>> {
        Err(ExecError::NotImplemented("change_permissions"))
    }

    fn change_owner(
        &self,
        _path: &Path,
        _uid: u32,
        _gid: Option<u32>,
    ) -> Result<BoxedExecutable<()>> {
        Err(ExecError::NotImplemented("change_owner"))
    }

    fn send_signal(&self, _pid: i32, _signal: Signal) -> Result<BoxedExecutable<()>> {
        Err(ExecError::NotImplemented("send_signal"))
    }

    fn identity(&self) -> Result<BoxedExecutable<Identity>> {
        Err(ExecError::NotImplemented("identity"))
    }

    fn exec(&self, _script: &str) -> Result<BoxedExecutable<ExecOutput>> {
        Err(ExecError::NotImplemented("exec"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nothing;

    impl ExecutableCreator for Nothing {
        fn backend(&self) -> Backend {
            Backend::Native
        }
    }

    #[test]
    fn defaults_are_capability_errors() {
        let creator = Nothing;
        let error = creator.identity().err().expect("not implemented");
        assert!(error.is_capability());
        assert!(creator.copy(Path::new("/a"), Path::new("/b")).is_err());
    }

    #[test]
    fn operations_run_once() {
        let cancel = CancellationToken::new();
        let mut operation = Operation::new("answer", |_| Ok(42));
        operation.execute(&cancel).expect("first run");
        assert_eq!(operation.result(), Some(&42));
        assert!(operation.execute(&cancel).is_err());
        assert_eq!(run(Operation::boxed("again", |_| Ok("ok")), &cancel).unwrap(), "ok");
    }

    #[test]
    fn cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let error = run(Operation::boxed("noop", |_| Ok(())), &cancel).unwrap_err();
        assert!(matches!(error, ExecError::Cancelled));
    }
}
