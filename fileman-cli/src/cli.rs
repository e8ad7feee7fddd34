// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fileman_types::{AccessMode, ChecksumAlgorithm, CompressionMode};

#[derive(Debug, Parser)]
#[command(name = "fileman")]
#[command(about = "File manager operations, in-process or through the shell")]
#[command(version)]
pub struct Cli {
    /// Access mode: safe, prompt or root (defaults to the config file)
    #[arg(long, global = true)]
    pub mode: Option<AccessMode>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (defaults to $FILEMAN_CONFIG, then
    /// $XDG_CONFIG_HOME/fileman/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List a directory
    Ls {
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Include hidden entries
        #[arg(short, long)]
        all: bool,
    },
    /// Show one object without following links
    Stat { path: PathBuf },
    Mkdir { path: PathBuf },
    /// Create an empty file; fails when it exists
    Touch { path: PathBuf },
    Rm {
        path: PathBuf,
        /// Remove a directory and its contents
        #[arg(short, long)]
        recursive: bool,
    },
    Cp { source: PathBuf, destination: PathBuf },
    Mv { source: PathBuf, destination: PathBuf },
    /// Create a symbolic link at LINK pointing to TARGET
    Ln { target: PathBuf, link: PathBuf },
    Readlink { path: PathBuf },
    Cat { path: PathBuf },
    /// Replace a file's contents with standard input
    Write { path: PathBuf },
    Checksum {
        path: PathBuf,
        #[arg(short, long, default_value = "sha256")]
        algorithm: ChecksumAlgorithm,
    },
    Compress {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        /// tar, tar.gz, tar.bz2, tar.xz, gz, bz2 or xz
        #[arg(short, long, default_value = "tar.gz")]
        format: CompressionMode,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    Extract {
        archive: PathBuf,
        destination: Option<PathBuf>,
    },
    /// Capacity of the filesystem holding PATH
    Df {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Recursive usage of a folder by content category
    Du {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    Mounts,
    /// Remount a filesystem read-write or read-only
    Remount {
        path: PathBuf,
        #[arg(long, conflicts_with = "ro")]
        rw: bool,
        #[arg(long)]
        ro: bool,
    },
    /// Storage volumes worth showing to a user
    Volumes,
    Find {
        dir: PathBuf,
        #[arg(required = true)]
        terms: Vec<String>,
    },
    Chmod {
        /// Octal mode, e.g. 644
        mode: String,
        path: PathBuf,
    },
    Chown {
        /// Numeric owner, UID or UID:GID
        owner: String,
        path: PathBuf,
    },
    Kill {
        #[arg(short, long, default_value = "TERM")]
        signal: String,
        pid: i32,
    },
    Id,
    /// Run a raw shell script
    Exec { script: String },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fileman", "compress", "a", "b", "--format", "tar.xz", "--mode", "root", "--json",
        ])
        .expect("parse");

        assert_eq!(cli.mode, Some(AccessMode::Root));
        assert!(cli.json);
        match cli.command {
            Command::Compress {
                sources, format, ..
            } => {
                assert_eq!(sources.len(), 2);
                assert_eq!(format, CompressionMode::TarXz);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
