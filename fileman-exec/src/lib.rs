// SPDX-License-Identifier: GPL-3.0-only

//! Filesystem operations for fileman
//!
//! Operations are built by an [`ExecutableCreator`] and run as
//! [`Executable`]s on worker threads:
//! - [`NativeCreator`] works in-process with the caller's identity
//! - [`ShellCreator`] renders guarded `sh` scripts around standard
//!   utilities, optionally behind a superuser wrapper
//! - [`Console`] picks between them from the configured [`AccessMode`]
//!
//! Both creators classify failures into the same [`ExecError`] kinds for
//! the same filesystem preconditions.
//!
//! [`AccessMode`]: fileman_types::AccessMode

pub mod console;
pub mod error;
pub mod executable;
pub mod native;
pub mod paths;
pub mod shell;

pub use console::{Console, ConsoleSettings};
pub use error::{ExecError, ExecErrorKind, Result};
pub use executable::{
    Backend, BoxedExecutable, ExecOutput, Executable, ExecutableCreator, Operation,
    check_cancelled, run,
};
pub use native::NativeCreator;
pub use shell::ShellCreator;
