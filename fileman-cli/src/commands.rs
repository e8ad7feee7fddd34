// SPDX-License-Identifier: GPL-3.0-only

use std::io::{Read, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::Local;
use fileman_exec::{BoxedExecutable, Console, ExecError, ExecutableCreator};
use fileman_types::{
    DiskUsage, FileSystemObject, FolderUsage, Identity, MimeCategory, MountPoint, Query,
    SearchResult, StorageVolume, sort_listing,
};
use nix::sys::signal::Signal;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::format::bytes_to_pretty;

struct Session {
    console: Console,
    cancel: CancellationToken,
    json: bool,
}

impl Session {
    /// Build with the console, then execute on the blocking pool.
    async fn run<'a, T, F>(
        &self,
        paths: impl IntoIterator<Item = &'a PathBuf>,
        factory: F,
    ) -> Result<T>
    where
        T: Send + 'static,
        F: Fn(&dyn ExecutableCreator) -> fileman_exec::Result<BoxedExecutable<T>>,
    {
        for path in paths {
            self.console.check_path(path)?;
        }

        let executable = self.console.build(factory).map_err(|e| self.explain(e))?;
        let cancel = self.cancel.clone();
        let outcome = tokio::task::spawn_blocking(move || fileman_exec::run(executable, &cancel))
            .await
            .context("operation worker panicked")?;

        outcome.map_err(|e| self.explain(e))
    }

    fn explain(&self, error: ExecError) -> anyhow::Error {
        let kind = error.kind();
        match self.console.escalation_hint(&error) {
            Some(mode) => anyhow::Error::new(error)
                .context(format!("{kind:?}: retry with --mode {mode} to elevate")),
            None => anyhow::Error::new(error),
        }
    }

    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    let mode = cli.mode.unwrap_or(config.access_mode);
    let mut console = Console::new(mode, config.console.clone());

    if config.confine_to_volumes {
        let volumes = discover(&config).await?;
        console = console.confine(volumes);
    }

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling");
            watcher.cancel();
        }
    });

    let session = Session {
        console,
        cancel,
        json: cli.json,
    };
    tracing::debug!(%mode, command = ?cli.command, "dispatching");

    match cli.command {
        Command::Ls { path, all } => {
            let mut objects = session.run([&path], |c| c.list(&path)).await?;
            if !all {
                objects.retain(|object| !object.is_hidden());
            }
            sort_listing(&mut objects);
            session.emit(&objects, |objects| objects.iter().for_each(print_object))
        }
        Command::Stat { path } => {
            let object = session.run([&path], |c| c.file_info(&path)).await?;
            session.emit(&object, print_details)
        }
        Command::Mkdir { path } => session.run([&path], |c| c.create_directory(&path)).await,
        Command::Touch { path } => session.run([&path], |c| c.create_file(&path)).await,
        Command::Rm { path, recursive } => {
            if recursive {
                session.run([&path], |c| c.delete_directory(&path)).await
            } else {
                session.run([&path], |c| c.delete_file(&path)).await
            }
        }
        Command::Cp {
            source,
            destination,
        } => {
            session
                .run([&source, &destination], |c| c.copy(&source, &destination))
                .await
        }
        Command::Mv {
            source,
            destination,
        } => {
            session
                .run([&source, &destination], |c| c.move_to(&source, &destination))
                .await
        }
        Command::Ln { target, link } => session.run([&link], |c| c.link(&target, &link)).await,
        Command::Readlink { path } => {
            let resolved = session.run([&path], |c| c.resolve_link(&path)).await?;
            session.emit(&resolved, |resolved| println!("{}", resolved.display()))
        }
        Command::Cat { path } => {
            let bytes = session.run([&path], |c| c.read(&path)).await?;
            std::io::stdout().write_all(&bytes)?;
            Ok(())
        }
        Command::Write { path } => {
            let mut data = Vec::new();
            std::io::stdin().read_to_end(&mut data)?;
            session
                .run([&path], |c| c.write(&path, data.clone()))
                .await
        }
        Command::Checksum { path, algorithm } => {
            let checksum = session.run([&path], |c| c.checksum(&path, algorithm)).await?;
            session.emit(&checksum, |checksum| {
                println!("{}  {}", checksum.hex, path.display())
            })
        }
        Command::Compress {
            sources,
            format,
            output,
        } => {
            let archive = session
                .run(sources.iter().chain(&output), |c| {
                    c.compress(format, &sources, output.as_deref())
                })
                .await?;
            session.emit(&archive, |archive| println!("{}", archive.display()))
        }
        Command::Extract {
            archive,
            destination,
        } => {
            let extracted = session
                .run(std::iter::once(&archive).chain(&destination), |c| {
                    c.uncompress(&archive, destination.as_deref())
                })
                .await?;
            session.emit(&extracted, |extracted| println!("{}", extracted.display()))
        }
        Command::Df { path } => {
            let usage = session.run([&path], |c| c.disk_usage(&path)).await?;
            session.emit(&usage, print_disk_usage)
        }
        Command::Du { path } => {
            let usage = session.run([&path], |c| c.folder_usage(&path)).await?;
            session.emit(&usage, print_folder_usage)
        }
        Command::Mounts => {
            let mounts = session.run([], |c| c.mount_points()).await?;
            session.emit(&mounts, |mounts| mounts.iter().for_each(print_mount))
        }
        Command::Remount { path, rw, ro } => {
            if rw == ro {
                bail!("choose exactly one of --rw or --ro");
            }
            session.run([&path], |c| c.remount(&path, rw)).await
        }
        Command::Volumes => {
            let volumes = discover(&config).await?;
            session.emit(&volumes, |volumes| volumes.iter().for_each(print_volume))
        }
        Command::Find { dir, terms } => {
            let query = Query::new(terms);
            let results = session.run([&dir], |c| c.search(&dir, &query)).await?;
            session.emit(&results, |results| results.iter().for_each(print_result))
        }
        Command::Chmod { mode, path } => {
            let mode = u32::from_str_radix(&mode, 8)
                .with_context(|| format!("invalid octal mode {mode:?}"))?;
            session
                .run([&path], |c| c.change_permissions(&path, mode))
                .await
        }
        Command::Chown { owner, path } => {
            let (uid, gid) = parse_owner(&owner)?;
            session
                .run([&path], |c| c.change_owner(&path, uid, gid))
                .await
        }
        Command::Kill { signal, pid } => {
            let signal = parse_signal(&signal)?;
            session.run([], |c| c.send_signal(pid, signal)).await
        }
        Command::Id => {
            let identity = session.run([], |c| c.identity()).await?;
            session.emit(&identity, print_identity)
        }
        Command::Exec { script } => {
            let output = session.run([], |c| c.exec(&script)).await?;
            session.emit(&output, |output| {
                print!("{}", output.stdout);
                if !output.stderr.is_empty() {
                    eprintln!("{}", output.stderr);
                }
            })?;
            match output.code {
                Some(0) => Ok(()),
                code => bail!("script exited with {code:?}"),
            }
        }
    }
}

async fn discover(config: &Config) -> Result<Vec<StorageVolume>> {
    fileman_sys::volumes::init_shared_cache(config.volumes.clone());
    let volumes = tokio::task::spawn_blocking(|| {
        fileman_sys::shared_cache()
            .volumes()
            .map(<[StorageVolume]>::to_vec)
    })
    .await
    .context("volume discovery worker panicked")??;

    tracing::info!("{} storage volume(s) discovered", volumes.len());
    Ok(volumes)
}

fn parse_owner(owner: &str) -> Result<(u32, Option<u32>)> {
    let (uid, gid) = match owner.split_once(':') {
        Some((uid, gid)) => (uid, Some(gid)),
        None => (owner, None),
    };

    let uid = uid
        .parse()
        .with_context(|| format!("invalid uid {uid:?}"))?;
    let gid = gid
        .map(|gid| gid.parse().with_context(|| format!("invalid gid {gid:?}")))
        .transpose()?;
    Ok((uid, gid))
}

fn parse_signal(name: &str) -> Result<Signal> {
    if let Ok(number) = name.parse::<i32>() {
        return Signal::try_from(number).with_context(|| format!("invalid signal {number}"));
    }

    let name = name.to_ascii_uppercase();
    let name = if name.starts_with("SIG") {
        name
    } else {
        format!("SIG{name}")
    };
    Signal::from_str(&name).with_context(|| format!("unknown signal {name}"))
}

fn print_object(object: &FileSystemObject) {
    let link = object
        .link_target
        .as_ref()
        .map(|target| format!(" -> {}", target.display()))
        .unwrap_or_default();

    println!(
        "{} {:>6} {:>6} {:>10} {} {}{}",
        object.permissions_string(),
        object.uid,
        object.gid,
        object.size,
        object
            .modified
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M"),
        object.name,
        link
    );
}

fn print_details(object: &FileSystemObject) {
    println!("    Path: {}", object.full_path().display());
    println!("    Kind: {:?}", object.kind);
    println!("    Size: {}", bytes_to_pretty(object.size, true));
    println!("    Mode: {} ({:04o})", object.permissions_string(), object.mode);
    println!("   Owner: {}:{}", object.uid, object.gid);
    println!("Modified: {}", object.modified.with_timezone(&Local).to_rfc3339());
    if let Some(target) = &object.link_target {
        println!("    Link: {}", target.display());
    }
}

fn print_disk_usage(usage: &DiskUsage) {
    println!(
        "{}: {} total, {} used, {} free ({:.1}% used)",
        usage.mount_point.display(),
        bytes_to_pretty(usage.total, false),
        bytes_to_pretty(usage.used, false),
        bytes_to_pretty(usage.free, false),
        usage.percent_used()
    );
}

fn print_folder_usage(usage: &FolderUsage) {
    println!("CATEGORY       BYTES            PERCENT");
    println!("----------------------------------------");

    for category in MimeCategory::ALL {
        let bytes = usage.bytes_for(category);
        let percent = if usage.total_bytes == 0 {
            0.0
        } else {
            (bytes as f64 * 100.0) / usage.total_bytes as f64
        };
        println!("{:<13} {:>14} {:>9.2}%", category.as_str(), bytes, percent);
    }

    println!();
    println!(
        "{}: {} files, {} directories, {}",
        usage.folder.display(),
        usage.files,
        usage.directories,
        bytes_to_pretty(usage.total_bytes, true)
    );
}

fn print_mount(mount: &MountPoint) {
    println!(
        "{} on {} type {} ({})",
        mount.device,
        mount.mount_path.display(),
        mount.fs_type,
        mount.options_string()
    );
}

fn print_volume(volume: &StorageVolume) {
    let mut flags = Vec::new();
    if volume.is_primary() {
        flags.push("primary");
    }
    if volume.is_removable() {
        flags.push("removable");
    }
    if volume.is_emulated() {
        flags.push("emulated");
    }

    println!(
        "{:<30} {:<18} {:<20} {:>12} {}",
        volume.mount_path.display(),
        volume.description,
        volume.device,
        volume
            .total_bytes
            .map(|bytes| bytes_to_pretty(bytes, false))
            .unwrap_or_else(|| "-".to_string()),
        flags.join(",")
    );
}

fn print_result(result: &SearchResult) {
    println!("{:.2}  {}", result.relevance, result.object.full_path().display());
}

fn print_identity(identity: &Identity) {
    let named = |id: u32, name: Option<&str>| match name {
        Some(name) => format!("{id}({name})"),
        None => id.to_string(),
    };

    let groups: Vec<String> = identity
        .groups
        .iter()
        .map(|group| named(group.id, group.name.as_deref()))
        .collect();
    println!(
        "uid={} gid={} groups={}",
        named(identity.uid, identity.user.as_deref()),
        identity.gid,
        groups.join(",")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owners() {
        assert_eq!(parse_owner("1000").unwrap(), (1000, None));
        assert_eq!(parse_owner("1000:27").unwrap(), (1000, Some(27)));
        assert!(parse_owner("alice").is_err());
        assert!(parse_owner("1000:").is_err());
    }

    #[test]
    fn signals_by_name_or_number() {
        assert_eq!(parse_signal("term").unwrap(), Signal::SIGTERM);
        assert_eq!(parse_signal("SIGKILL").unwrap(), Signal::SIGKILL);
        assert_eq!(parse_signal("9").unwrap(), Signal::SIGKILL);
        assert!(parse_signal("NOPE").is_err());
    }
}
