// SPDX-License-Identifier: GPL-3.0-only

//! Shell creator
//!
//! Every operation is a guarded `sh -c` script around a standard utility,
//! run through a [`ShellRunner`] that may elevate with a superuser wrapper.
//! Required utilities are looked up before an executable is handed out, so
//! a missing tool is a capability answer rather than a runtime failure.

mod parse;
mod script;

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fileman_sys::shell::{
    EXIT_COMMAND_NOT_FOUND, EXIT_NOT_EXECUTABLE, has_command, quote, quote_path,
};
use fileman_sys::{ShellOutput, ShellRunner, parse_mounts};
use fileman_types::{
    Checksum, ChecksumAlgorithm, CompressionMode, DiskUsage, FileSystemObject, FolderUsage,
    Identity, MountPoint, Query, SearchResult, sort_results,
};
use nix::sys::signal::Signal;

use self::script::{FIND_FORMAT, Script, Subject, USAGE_FORMAT, classify};
use crate::error::{ExecError, Result};
use crate::executable::{Backend, BoxedExecutable, ExecOutput, ExecutableCreator, Operation};
use crate::native::check_search_args;
use crate::paths::{
    check_compress_sources, default_archive_path, default_extract_path, parent_of,
    prepare_transfer,
};

#[derive(Debug, Clone, Default)]
pub struct ShellCreator {
    runner: Arc<ShellRunner>,
}

impl ShellCreator {
    pub fn new(runner: ShellRunner) -> Self {
        Self {
            runner: Arc::new(runner),
        }
    }

    pub fn runner(&self) -> &ShellRunner {
        &self.runner
    }

    /// Fail with `CommandNotFound` unless every utility is on `PATH`.
    fn require(&self, programs: &[&str]) -> Result<()> {
        for program in programs {
            if !has_command(program) {
                tracing::debug!("{program} not found on PATH");
                return Err(ExecError::CommandNotFound((*program).to_string()));
            }
        }
        Ok(())
    }

    /// Wrap a guarded script into an executable whose output is parsed by
    /// `finish`.
    fn operation<T, B, F>(
        &self,
        name: &'static str,
        command: &'static str,
        build: B,
        finish: F,
    ) -> BoxedExecutable<T>
    where
        T: Send + 'static,
        B: FnOnce() -> Result<(Script, Subject, Option<Vec<u8>>)> + Send + 'static,
        F: FnOnce(ShellOutput, &Subject) -> Result<T> + Send + 'static,
    {
        let runner = Arc::clone(&self.runner);
        Operation::boxed(name, move |_| {
            let (script, subject, stdin) = build()?;
            let output = runner.run(&script.render(), stdin.as_deref())?;
            classify(command, &output, &subject)?;
            finish(output, &subject)
        })
    }
}

/// Scripts are text; a path that is not UTF-8 cannot be quoted faithfully.
fn ensure_utf8<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Result<()> {
    match paths.into_iter().find(|path| path.to_str().is_none()) {
        Some(path) => Err(ExecError::InvalidArgument(format!(
            "{} is not valid UTF-8",
            path.display()
        ))),
        None => Ok(()),
    }
}

fn done(_: ShellOutput, _: &Subject) -> Result<()> {
    Ok(())
}

/// Compression utility behind `mode`.
fn compressor(mode: CompressionMode) -> Option<&'static str> {
    match mode {
        CompressionMode::TarGz | CompressionMode::Gzip => Some("gzip"),
        CompressionMode::TarBz2 | CompressionMode::Bzip2 => Some("bzip2"),
        CompressionMode::TarXz | CompressionMode::Xz => Some("xz"),
        CompressionMode::Tar | CompressionMode::Zip => None,
    }
}

fn tar_flag(mode: CompressionMode) -> &'static str {
    match mode {
        CompressionMode::TarGz => "z",
        CompressionMode::TarBz2 => "j",
        CompressionMode::TarXz => "J",
        _ => "",
    }
}

fn tools_for(mode: CompressionMode) -> Vec<&'static str> {
    let mut tools = Vec::new();
    if mode == CompressionMode::Zip {
        tools.push("unzip");
    } else if mode.is_archive() {
        tools.push("tar");
    }
    tools.extend(compressor(mode));
    tools
}

/// Member name for `tar -C parent name`; leading dashes would read as options.
fn tar_member(path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ExecError::InvalidArgument(format!("{} has no file name", path.display()))
        })?;

    Ok(if name.starts_with('-') {
        quote(&format!("./{name}"))
    } else {
        quote(&name)
    })
}

fn path_from_stdout(stdout: &[u8]) -> PathBuf {
    let trimmed = stdout.strip_suffix(b"\n").unwrap_or(stdout);
    PathBuf::from(OsStr::from_bytes(trimmed))
}

impl ExecutableCreator for ShellCreator {
    fn backend(&self) -> Backend {
        Backend::Shell
    }

    fn list(&self, dir: &Path) -> Result<BoxedExecutable<Vec<FileSystemObject>>> {
        ensure_utf8([dir])?;
        self.require(&["find"])?;
        let dir = dir.to_path_buf();
        Ok(self.operation(
            "list",
            "find",
            move || {
                let script = Script::new()
                    .resolves(&dir)
                    .resolving_directory(&dir)
                    .listable(&dir)
                    .run(format!(
                        "find -H {} -mindepth 1 -maxdepth 1 -printf {}",
                        quote_path(&dir),
                        quote(FIND_FORMAT)
                    ));
                Ok((script, Subject::reading(&dir), None))
            },
            |output, _| parse::parse_find_records(&output.stdout),
        ))
    }

    fn file_info(&self, path: &Path) -> Result<BoxedExecutable<FileSystemObject>> {
        ensure_utf8([path])?;
        self.require(&["find"])?;
        let path = path.to_path_buf();
        Ok(self.operation(
            "file_info",
            "find",
            move || {
                let script = Script::new().exists(&path).run(format!(
                    "find {} -maxdepth 0 -printf {}",
                    quote_path(&path),
                    quote(FIND_FORMAT)
                ));
                Ok((script, Subject::reading(&path), None))
            },
            |output, subject| {
                parse::parse_find_records(&output.stdout)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        ExecError::Parse(format!("no record for {}", subject.input.display()))
                    })
            },
        ))
    }

    fn create_directory(&self, path: &Path) -> Result<BoxedExecutable<()>> {
        ensure_utf8([path])?;
        self.require(&["mkdir"])?;
        let path = path.to_path_buf();
        Ok(self.operation(
            "create_directory",
            "mkdir",
            move || {
                let parent = parent_of(&path);
                let script = Script::new()
                    .directory_exists(&parent)
                    .absent(&path)
                    .writable(&parent)
                    .run(format!("mkdir -- {}", quote_path(&path)));
                Ok((script, Subject::creating(&path), None))
            },
            done,
        ))
    }

    fn create_file(&self, path: &Path) -> Result<BoxedExecutable<()>> {
        ensure_utf8([path])?;
        self.require(&["touch"])?;
        let path = path.to_path_buf();
        Ok(self.operation(
            "create_file",
            "touch",
            move || {
                let parent = parent_of(&path);
                let script = Script::new()
                    .directory_exists(&parent)
                    .absent(&path)
                    .writable(&parent)
                    .run(format!("touch -- {}", quote_path(&path)));
                Ok((script, Subject::creating(&path), None))
            },
            done,
        ))
    }

    fn delete_file(&self, path: &Path) -> Result<BoxedExecutable<()>> {
        ensure_utf8([path])?;
        self.require(&["rm"])?;
        let path = path.to_path_buf();
        Ok(self.operation(
            "delete_file",
            "rm",
            move || {
                let script = Script::new()
                    .exists(&path)
                    .not_directory(&path)
                    .writable(&parent_of(&path))
                    .run(format!("rm -f -- {}", quote_path(&path)));
                Ok((script, Subject::creating(&path), None))
            },
            done,
        ))
    }

    fn delete_directory(&self, path: &Path) -> Result<BoxedExecutable<()>> {
        ensure_utf8([path])?;
        self.require(&["rm"])?;
        let path = path.to_path_buf();
        Ok(self.operation(
            "delete_directory",
            "rm",
            move || {
                let script = Script::new()
                    .exists(&path)
                    .real_directory(&path)
                    .writable(&parent_of(&path))
                    .run(format!("rm -rf -- {}", quote_path(&path)));
                Ok((script, Subject::creating(&path), None))
            },
            done,
        ))
    }

    fn copy(&self, source: &Path, destination: &Path) -> Result<BoxedExecutable<()>> {
        ensure_utf8([source, destination])?;
        self.require(&["cp"])?;
        let (source, destination) = (source.to_path_buf(), destination.to_path_buf());
        Ok(self.operation(
            "copy",
            "cp",
            move || {
                let target = prepare_transfer(&source, &destination)?;
                let parent = parent_of(&target);
                let script = Script::new()
                    .exists(&source)
                    .absent(&target)
                    .directory_exists(&parent)
                    .writable(&parent)
                    .readable(&source)
                    .run(format!(
                        "cp -R -- {} {}",
                        quote_path(&source),
                        quote_path(&target)
                    ));
                let subject = Subject::transfer(&source, &target, vec![parent]);
                Ok((script, subject, None))
            },
            done,
        ))
    }

    fn move_to(&self, source: &Path, destination: &Path) -> Result<BoxedExecutable<()>> {
        ensure_utf8([source, destination])?;
        self.require(&["mv"])?;
        let (source, destination) = (source.to_path_buf(), destination.to_path_buf());
        Ok(self.operation(
            "move",
            "mv",
            move || {
                let target = prepare_transfer(&source, &destination)?;
                let (from, to) = (parent_of(&source), parent_of(&target));
                let script = Script::new()
                    .exists(&source)
                    .absent(&target)
                    .writable(&from)
                    .directory_exists(&to)
                    .writable(&to)
                    .run(format!(
                        "mv -- {} {}",
                        quote_path(&source),
                        quote_path(&target)
                    ));
                let subject = Subject::transfer(&source, &target, vec![from, to]);
                Ok((script, subject, None))
            },
            done,
        ))
    }

    fn link(&self, target: &Path, link: &Path) -> Result<BoxedExecutable<()>> {
        ensure_utf8([target, link])?;
        self.require(&["ln"])?;
        let (target, link) = (target.to_path_buf(), link.to_path_buf());
        Ok(self.operation(
            "link",
            "ln",
            move || {
                let parent = parent_of(&link);
                let script = Script::new()
                    .directory_exists(&parent)
                    .absent(&link)
                    .writable(&parent)
                    .run(format!(
                        "ln -s -- {} {}",
                        quote_path(&target),
                        quote_path(&link)
                    ));
                Ok((script, Subject::creating(&link), None))
            },
            done,
        ))
    }

    fn resolve_link(&self, path: &Path) -> Result<BoxedExecutable<PathBuf>> {
        ensure_utf8([path])?;
        self.require(&["readlink"])?;
        let path = path.to_path_buf();
        Ok(self.operation(
            "resolve_link",
            "readlink",
            move || {
                let script = Script::new()
                    .resolves(&path)
                    .run(format!("readlink -f -- {}", quote_path(&path)));
                Ok((script, Subject::reading(&path), None))
            },
            |output, _| Ok(path_from_stdout(&output.stdout)),
        ))
    }

    fn read(&self, path: &Path) -> Result<BoxedExecutable<Vec<u8>>> {
        ensure_utf8([path])?;
        self.require(&["cat"])?;
        let path = path.to_path_buf();
        Ok(self.operation(
            "read",
            "cat",
            move || {
                let script = Script::new()
                    .resolves(&path)
                    .not_resolving_directory(&path)
                    .readable(&path)
                    .run(format!("cat -- {}", quote_path(&path)));
                Ok((script, Subject::reading(&path), None))
            },
            |output, _| Ok(output.stdout),
        ))
    }

    fn write(&self, path: &Path, data: Vec<u8>) -> Result<BoxedExecutable<()>> {
        ensure_utf8([path])?;
        self.require(&["cat"])?;
        let path = path.to_path_buf();
        Ok(self.operation(
            "write",
            "cat",
            move || {
                let script = Script::new()
                    .directory_exists(&parent_of(&path))
                    .not_resolving_directory(&path)
                    .writable_target(&path)
                    .run(format!("cat > {}", quote_path(&path)));
                Ok((script, Subject::creating(&path), Some(data)))
            },
            done,
        ))
    }

    fn checksum(
        &self,
        path: &Path,
        algorithm: ChecksumAlgorithm,
    ) -> Result<BoxedExecutable<Checksum>> {
        ensure_utf8([path])?;
        let tool = match algorithm {
            ChecksumAlgorithm::Md5 => "md5sum",
            ChecksumAlgorithm::Sha1 => "sha1sum",
            ChecksumAlgorithm::Sha256 => "sha256sum",
        };
        self.require(&[tool])?;
        let path = path.to_path_buf();
        Ok(self.operation(
            "checksum",
            tool,
            move || {
                let script = Script::new()
                    .resolves(&path)
                    .not_resolving_directory(&path)
                    .readable(&path)
                    .run(format!("{tool} < {}", quote_path(&path)));
                Ok((script, Subject::reading(&path), None))
            },
            move |output, _| parse::parse_checksum(&output.stdout_lossy(), algorithm),
        ))
    }

    fn compress(
        &self,
        mode: CompressionMode,
        sources: &[PathBuf],
        output: Option<&Path>,
    ) -> Result<BoxedExecutable<PathBuf>> {
        ensure_utf8(sources.iter().map(PathBuf::as_path).chain(output))?;
        check_compress_sources(mode, sources)?;
        self.require(&tools_for(mode))?;
        let sources = sources.to_vec();
        let output = output.map(Path::to_path_buf);
        let command = if mode.is_archive() {
            "tar"
        } else {
            compressor(mode).unwrap_or("tar")
        };

        Ok(self.operation(
            "compress",
            command,
            move || {
                let output = match output {
                    Some(output) => output,
                    None => default_archive_path(mode, &sources)?,
                };
                let parent = parent_of(&output);

                let mut script = Script::new();
                for source in &sources {
                    script = script.exists(source);
                    if !mode.is_archive() {
                        script = script.not_directory(source);
                    }
                }
                script = script
                    .absent(&output)
                    .directory_exists(&parent)
                    .writable(&parent);

                let invocation = if mode.is_archive() {
                    let mut invocation =
                        format!("tar -c{}f {}", tar_flag(mode), quote_path(&output));
                    for source in &sources {
                        invocation.push_str(&format!(
                            " -C {} {}",
                            quote_path(&parent_of(source)),
                            tar_member(source)?
                        ));
                    }
                    invocation
                } else {
                    format!("{command} -c < {} > {}", quote_path(&sources[0]), quote_path(&output))
                };
                let script = script.run_cleaning(invocation, &output);

                let subject = Subject::transfer(&sources[0], &output, vec![parent]);
                Ok((script, subject, None))
            },
            |_, subject| Ok(subject.output.clone()),
        ))
    }

    fn uncompress(
        &self,
        archive: &Path,
        destination: Option<&Path>,
    ) -> Result<BoxedExecutable<PathBuf>> {
        ensure_utf8([archive].into_iter().chain(destination))?;
        let mode = CompressionMode::from_path(archive).ok_or_else(|| {
            ExecError::InvalidArgument(format!(
                "unrecognized archive format: {}",
                archive.display()
            ))
        })?;
        self.require(&tools_for(mode))?;
        let archive = archive.to_path_buf();
        let destination = destination.map(Path::to_path_buf);
        let command = match mode {
            CompressionMode::Zip => "unzip",
            mode if mode.is_archive() => "tar",
            mode => compressor(mode).unwrap_or("tar"),
        };

        Ok(self.operation(
            "uncompress",
            command,
            move || {
                let target = match destination {
                    Some(destination) => destination,
                    None => default_extract_path(mode, &archive)?,
                };
                let parent = parent_of(&target);
                let (a, t) = (quote_path(&archive), quote_path(&target));

                let script = Script::new()
                    .resolves(&archive)
                    .not_resolving_directory(&archive);
                let script = if mode.is_archive() {
                    let invocation = match mode {
                        CompressionMode::Zip => format!("unzip -o -q {a} -d {t}"),
                        mode => format!("tar -x{}f {a} -C {t}", tar_flag(mode)),
                    };
                    script
                        .extract_directory(&target)
                        .readable(&archive)
                        .run(format!("mkdir -p -- {t} && {invocation}"))
                } else {
                    script
                        .absent(&target)
                        .directory_exists(&parent)
                        .writable(&parent)
                        .readable(&archive)
                        .run_cleaning(format!("{command} -dc < {a} > {t}"), &target)
                };

                let subject = Subject::transfer(&archive, &target, vec![parent, target.clone()]);
                Ok((script, subject, None))
            },
            |_, subject| Ok(subject.output.clone()),
        ))
    }

    fn disk_usage(&self, path: &Path) -> Result<BoxedExecutable<DiskUsage>> {
        ensure_utf8([path])?;
        self.require(&["df"])?;
        let path = path.to_path_buf();
        Ok(self.operation(
            "disk_usage",
            "df",
            move || {
                let script = Script::new()
                    .resolves(&path)
                    .run(format!("df -P -B1 -- {}", quote_path(&path)));
                Ok((script, Subject::reading(&path), None))
            },
            |output, _| parse::parse_df(&output.stdout_lossy()),
        ))
    }

    fn folder_usage(&self, dir: &Path) -> Result<BoxedExecutable<FolderUsage>> {
        ensure_utf8([dir])?;
        self.require(&["find"])?;
        let dir = dir.to_path_buf();
        Ok(self.operation(
            "folder_usage",
            "find",
            move || {
                // Unreadable subdirectories are skipped, not fatal.
                let script = Script::new()
                    .exists(&dir)
                    .real_directory(&dir)
                    .readable(&dir)
                    .run(format!(
                        "find {} -mindepth 1 -printf {} 2>/dev/null; exit 0",
                        quote_path(&dir),
                        quote(USAGE_FORMAT)
                    ));
                Ok((script, Subject::reading(&dir), None))
            },
            |output, subject| parse::parse_folder_usage(&output.stdout, &subject.input),
        ))
    }

    fn mount_points(&self) -> Result<BoxedExecutable<Vec<MountPoint>>> {
        self.require(&["cat"])?;
        let table = PathBuf::from(fileman_sys::mounts::PROC_MOUNTS);
        Ok(self.operation(
            "mount_points",
            "cat",
            move || {
                let script = Script::new()
                    .resolves(&table)
                    .run(format!("cat {}", quote_path(&table)));
                Ok((script, Subject::reading(&table), None))
            },
            |output, _| Ok(parse_mounts(&output.stdout_lossy())?),
        ))
    }

    fn remount(&self, mount_path: &Path, read_write: bool) -> Result<BoxedExecutable<()>> {
        ensure_utf8([mount_path])?;
        self.require(&["mount"])?;
        let mount_path = mount_path.to_path_buf();
        let flag = if read_write { "rw" } else { "ro" };
        Ok(self.operation(
            "remount",
            "mount",
            move || {
                let script = Script::new()
                    .directory_exists(&mount_path)
                    .root()
                    .run(format!(
                        "mount -o remount,{flag} -- {}",
                        quote_path(&mount_path)
                    ));
                Ok((script, Subject::reading(&mount_path), None))
            },
            done,
        ))
    }

    fn search(&self, dir: &Path, query: &Query) -> Result<BoxedExecutable<Vec<SearchResult>>> {
        ensure_utf8([dir])?;
        self.require(&["find"])?;
        let dir = dir.to_path_buf();
        let (query, filter) = (query.clone(), query.clone());
        Ok(self.operation(
            "search",
            "find",
            move || {
                check_search_args(&dir, &query)?;
                let names = query
                    .terms()
                    .iter()
                    .map(|term| format!("-iname {}", quote(&Query::glob_for(term))))
                    .collect::<Vec<_>>()
                    .join(" -o ");
                // find's globs are a superset filter; matches() decides
                let script = Script::new().run(format!(
                    "find -H {} -mindepth 1 \\( {names} \\) -printf {} 2>/dev/null; exit 0",
                    quote_path(&dir),
                    quote(FIND_FORMAT)
                ));
                Ok((script, Subject::reading(&dir), None))
            },
            move |output, _| {
                let mut results: Vec<SearchResult> = parse::parse_find_records(&output.stdout)?
                    .into_iter()
                    .filter(|object| filter.matches(&object.name))
                    .map(|object| SearchResult::new(object, &filter))
                    .collect();
                sort_results(&mut results);
                Ok(results)
            },
        ))
    }

    fn change_permissions(&self, path: &Path, mode: u32) -> Result<BoxedExecutable<()>> {
        ensure_utf8([path])?;
        self.require(&["chmod"])?;
        if mode > 0o7777 {
            return Err(ExecError::InvalidArgument(format!("invalid mode {mode:o}")));
        }
        let path = path.to_path_buf();
        Ok(self.operation(
            "change_permissions",
            "chmod",
            move || {
                let script = Script::new()
                    .exists(&path)
                    .owned(&path)
                    .run(format!("chmod {mode:o} -- {}", quote_path(&path)));
                Ok((script, Subject::modifying(&path), None))
            },
            done,
        ))
    }

    fn change_owner(
        &self,
        path: &Path,
        uid: u32,
        gid: Option<u32>,
    ) -> Result<BoxedExecutable<()>> {
        ensure_utf8([path])?;
        self.require(&["chown"])?;
        let path = path.to_path_buf();
        let owner = match gid {
            Some(gid) => format!("{uid}:{gid}"),
            None => uid.to_string(),
        };
        Ok(self.operation(
            "change_owner",
            "chown",
            move || {
                let script = Script::new()
                    .exists(&path)
                    .root()
                    .run(format!("chown -h {owner} -- {}", quote_path(&path)));
                Ok((script, Subject::modifying(&path), None))
            },
            done,
        ))
    }

    fn send_signal(&self, pid: i32, signal: Signal) -> Result<BoxedExecutable<()>> {
        if pid <= 0 {
            return Err(ExecError::InvalidArgument(format!("invalid pid {pid}")));
        }
        let name = signal.as_str().trim_start_matches("SIG");
        let proc_path = PathBuf::from(format!("/proc/{pid}"));
        Ok(self.operation(
            "send_signal",
            "kill",
            move || {
                let script = Script::new()
                    .process_exists(pid)
                    .run(format!("kill -s {name} {pid} 2>/dev/null || exit 77"));
                Ok((script, Subject::reading(&proc_path), None))
            },
            done,
        ))
    }

    fn identity(&self) -> Result<BoxedExecutable<Identity>> {
        self.require(&["id"])?;
        Ok(self.operation(
            "identity",
            "id",
            || {
                let script = Script::new()
                    .run("id -u && id -g && id -G || exit 1")
                    .run(format!(
                        "printf '{}%s\\n' \"$(id -un 2>/dev/null)\"",
                        parse::IDENTITY_USER
                    ))
                    .run(format!(
                        "printf '{}%s\\n' \"$(id -Gn 2>/dev/null)\"",
                        parse::IDENTITY_GROUPS
                    ))
                    .run("exit 0");
                Ok((script, Subject::reading(Path::new("/")), None))
            },
            |output, _| parse::parse_identity(&output.stdout_lossy()),
        ))
    }

    fn exec(&self, script: &str) -> Result<BoxedExecutable<ExecOutput>> {
        let runner = Arc::clone(&self.runner);
        let script = script.to_string();
        Ok(Operation::boxed("exec", move |_| {
            let output = runner.run(&script, None)?;
            let program = script.split_whitespace().next().unwrap_or("sh").to_string();

            match output.code {
                Some(EXIT_COMMAND_NOT_FOUND) => Err(ExecError::CommandNotFound(program)),
                Some(EXIT_NOT_EXECUTABLE) => {
                    Err(ExecError::InsufficientPermissions(PathBuf::from(program)))
                }
                code => Ok(ExecOutput {
                    code,
                    stdout: output.stdout_lossy(),
                    stderr: output.stderr,
                }),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tools_per_mode() {
        assert_eq!(tools_for(CompressionMode::TarXz), vec!["tar", "xz"]);
        assert_eq!(tools_for(CompressionMode::Tar), vec!["tar"]);
        assert_eq!(tools_for(CompressionMode::Gzip), vec!["gzip"]);
        assert_eq!(tools_for(CompressionMode::Zip), vec!["unzip"]);
    }

    #[test]
    fn tar_members_never_look_like_options() {
        assert_eq!(tar_member(Path::new("/data/photos")).unwrap(), "photos");
        assert_eq!(tar_member(Path::new("/data/-rf")).unwrap(), "./-rf");
        assert_eq!(tar_member(Path::new("/data/My Files")).unwrap(), "'My Files'");
    }

    #[test]
    fn stdout_paths_lose_one_newline() {
        assert_eq!(path_from_stdout(b"/data/x\n"), PathBuf::from("/data/x"));
        assert_eq!(path_from_stdout(b"/data/x"), PathBuf::from("/data/x"));
    }

    #[test]
    fn non_utf8_paths_are_rejected() {
        let creator = ShellCreator::default();
        let latin1 = Path::new(OsStr::from_bytes(b"/tmp/caf\xe9.txt"));

        assert!(matches!(
            creator.delete_file(latin1),
            Err(ExecError::InvalidArgument(_))
        ));
        assert!(matches!(
            creator.copy(Path::new("/tmp/a.txt"), latin1),
            Err(ExecError::InvalidArgument(_))
        ));
        assert!(matches!(
            creator.compress(CompressionMode::Tar, &[latin1.to_path_buf()], None),
            Err(ExecError::InvalidArgument(_))
        ));
        assert!(ensure_utf8([Path::new("/tmp/café.txt")]).is_ok());
    }

    #[test]
    fn missing_utilities_are_capability_errors() {
        let creator = ShellCreator::default();
        let error = creator.require(&["fileman-no-such-tool"]).unwrap_err();
        assert!(error.is_capability());
    }
}
