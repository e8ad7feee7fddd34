// SPDX-License-Identifier: GPL-3.0-only

//! Low-level system access for fileman
//!
//! This crate talks to the operating system directly:
//! - Mount table parsing (`/proc/mounts`)
//! - Filesystem statistics through `statvfs(2)`
//! - Shell invocation, optionally behind a superuser wrapper
//! - Storage volume discovery and its process-wide cache
//!
//! Everything here is blocking; callers dispatch it from worker threads.

pub mod classifier;
pub mod error;
pub mod mounts;
pub mod shell;
pub mod statfs;
pub mod volumes;

pub use classifier::classify_path;
pub use error::{Result, SysError};
pub use mounts::{parse_mounts, read_mount_points};
pub use shell::{ShellOutput, ShellRunner, SuperuserStyle, SuperuserWrapper};
pub use statfs::{FsStats, filesystem_stats, is_read_only_filesystem};
pub use volumes::{DiscoveryConfig, VolumeCache, discover_volumes, shared_cache};
