// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for fileman
//!
//! These types are shared by every layer of the workspace:
//!
//! - **fileman-sys**: builds `MountPoint` and `StorageVolume` values from the
//!   mount table and the platform volume list
//! - **fileman-exec**: returns these types from every `Executable`, whichever
//!   creator (native or shell) produced it
//! - **fileman-cli**: renders them for humans or serializes them with `--json`

pub mod access;
pub mod archive;
pub mod checksum;
pub mod error;
pub mod fso;
pub mod identity;
pub mod mount;
pub mod query;
pub mod usage;
pub mod volume;

pub use access::*;
pub use archive::*;
pub use checksum::*;
pub use error::*;
pub use fso::*;
pub use identity::*;
pub use mount::*;
pub use query::*;
pub use usage::*;
pub use volume::*;
