// SPDX-License-Identifier: GPL-3.0-only

//! Native and shell creators must agree on how each filesystem precondition
//! is classified.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use fileman_exec::{
    BoxedExecutable, ExecError, ExecErrorKind, ExecutableCreator, NativeCreator, ShellCreator,
    run,
};
use fileman_sys::ShellRunner;
use fileman_sys::shell::has_command;
use fileman_types::{ChecksumAlgorithm, FileKind, sort_listing};
use tokio_util::sync::CancellationToken;

const SHELL: &str = "/bin/sh";

fn creators() -> Vec<(&'static str, Box<dyn ExecutableCreator>)> {
    let mut creators: Vec<(&'static str, Box<dyn ExecutableCreator>)> =
        vec![("native", Box::new(NativeCreator::new()))];

    if Path::new(SHELL).exists() && has_command("find") {
        creators.push(("shell", Box::new(ShellCreator::new(ShellRunner::new(SHELL)))));
    } else {
        eprintln!("skipping shell half: {SHELL} or findutils unavailable");
    }
    creators
}

fn outcome<T>(built: fileman_exec::Result<BoxedExecutable<T>>) -> Result<T, ExecErrorKind> {
    built
        .and_then(|executable| run(executable, &CancellationToken::new()))
        .map_err(|error| error.kind())
}

fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Run `case` against every creator in a fresh directory and collect the
/// classified outcomes.
fn outcomes<T, F>(case: F) -> Vec<(&'static str, Result<T, ExecErrorKind>)>
where
    F: Fn(&dyn ExecutableCreator, &Path) -> fileman_exec::Result<BoxedExecutable<T>>,
{
    creators()
        .into_iter()
        .map(|(name, creator)| {
            let dir = tempfile::tempdir().expect("tempdir");
            fs::write(dir.path().join("file.txt"), b"contents").expect("seed file");
            fs::create_dir(dir.path().join("folder")).expect("seed folder");
            let result = outcome(case(creator.as_ref(), dir.path()));
            (name, result)
        })
        .collect()
}

fn assert_all_fail(results: &[(&str, Result<(), ExecErrorKind>)], expected: ExecErrorKind) {
    for (name, result) in results {
        assert_eq!(result, &Err(expected), "{name} creator");
    }
}

#[test]
fn missing_sources_are_no_such_file() {
    assert_all_fail(
        &outcomes(|c, dir| c.delete_file(&dir.join("missing"))),
        ExecErrorKind::NoSuchFileOrDirectory,
    );
    assert_all_fail(
        &outcomes(|c, dir| c.delete_directory(&dir.join("missing"))),
        ExecErrorKind::NoSuchFileOrDirectory,
    );
    assert_all_fail(
        &outcomes(|c, dir| c.copy(&dir.join("missing"), &dir.join("copy"))),
        ExecErrorKind::NoSuchFileOrDirectory,
    );
    assert_all_fail(
        &outcomes(|c, dir| c.move_to(&dir.join("missing"), &dir.join("moved"))),
        ExecErrorKind::NoSuchFileOrDirectory,
    );
    assert_all_fail(
        &outcomes(|c, dir| c.create_directory(&dir.join("no/parent"))),
        ExecErrorKind::NoSuchFileOrDirectory,
    );
}

#[test]
fn paths_through_a_file_are_no_such_file() {
    assert_all_fail(
        &outcomes(|c, dir| c.delete_file(&dir.join("file.txt/child"))),
        ExecErrorKind::NoSuchFileOrDirectory,
    );
    assert_all_fail(
        &outcomes(|c, dir| c.delete_directory(&dir.join("file.txt/child"))),
        ExecErrorKind::NoSuchFileOrDirectory,
    );
    assert_all_fail(
        &outcomes(|c, dir| c.copy(&dir.join("file.txt/child"), &dir.join("copy"))),
        ExecErrorKind::NoSuchFileOrDirectory,
    );
    assert_all_fail(
        &outcomes(|c, dir| c.move_to(&dir.join("file.txt/child"), &dir.join("moved"))),
        ExecErrorKind::NoSuchFileOrDirectory,
    );
    assert_all_fail(
        &outcomes(|c, dir| c.create_file(&dir.join("file.txt/child"))),
        ExecErrorKind::NoSuchFileOrDirectory,
    );
    assert_all_fail(
        &outcomes(|c, dir| c.create_directory(&dir.join("file.txt/child"))),
        ExecErrorKind::NoSuchFileOrDirectory,
    );
    assert_all_fail(
        &outcomes(|c, dir| c.link(&dir.join("folder"), &dir.join("file.txt/child"))),
        ExecErrorKind::NoSuchFileOrDirectory,
    );

    let reads = outcomes(|c, dir| c.read(&dir.join("file.txt/child")));
    for (name, result) in &reads {
        assert_eq!(
            result,
            &Err(ExecErrorKind::NoSuchFileOrDirectory),
            "{name} creator"
        );
    }
}

#[test]
fn existing_targets_are_never_replaced() {
    assert_all_fail(
        &outcomes(|c, dir| c.create_directory(&dir.join("folder"))),
        ExecErrorKind::AlreadyExists,
    );
    assert_all_fail(
        &outcomes(|c, dir| c.create_file(&dir.join("file.txt"))),
        ExecErrorKind::AlreadyExists,
    );
    assert_all_fail(
        &outcomes(|c, dir| {
            fs::write(dir.join("other.txt"), b"other").expect("seed");
            c.copy(&dir.join("other.txt"), &dir.join("file.txt"))
        }),
        ExecErrorKind::AlreadyExists,
    );
    assert_all_fail(
        &outcomes(|c, dir| c.link(&dir.join("folder"), &dir.join("file.txt"))),
        ExecErrorKind::AlreadyExists,
    );
}

#[test]
fn wrong_kinds_are_invalid_arguments() {
    assert_all_fail(
        &outcomes(|c, dir| c.delete_file(&dir.join("folder"))),
        ExecErrorKind::InvalidArgument,
    );
    assert_all_fail(
        &outcomes(|c, dir| c.delete_directory(&dir.join("file.txt"))),
        ExecErrorKind::InvalidArgument,
    );
    assert_all_fail(
        &outcomes(|c, dir| c.copy(&dir.join("folder"), &dir.join("folder/inner"))),
        ExecErrorKind::InvalidArgument,
    );
}

#[test]
fn unwritable_parents_need_elevation() {
    if is_root() {
        eprintln!("skipping: permission checks do not apply to root");
        return;
    }

    let results = outcomes(|c, dir| {
        let locked = dir.join("locked");
        fs::create_dir(&locked).expect("mkdir");
        fs::write(locked.join("keep.txt"), b"keep").expect("seed");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).expect("chmod");
        c.delete_file(&locked.join("keep.txt"))
    });

    for (name, result) in &results {
        assert_eq!(
            result,
            &Err(ExecErrorKind::InsufficientPermissions),
            "{name} creator"
        );
    }
}

#[test]
fn unreadable_sources_need_elevation() {
    if is_root() {
        eprintln!("skipping: permission checks do not apply to root");
        return;
    }

    let results = outcomes(|c, dir| {
        let secret = dir.join("secret.txt");
        fs::write(&secret, b"secret").expect("seed");
        fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).expect("chmod");
        c.copy(&secret, &dir.join("copy.txt"))
    });
    assert_all_fail(&results, ExecErrorKind::InsufficientPermissions);

    let reads = outcomes(|c, dir| {
        let secret = dir.join("secret.txt");
        fs::write(&secret, b"secret").expect("seed");
        fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).expect("chmod");
        c.read(&secret)
    });
    for (name, result) in &reads {
        assert_eq!(
            result,
            &Err(ExecErrorKind::InsufficientPermissions),
            "{name} creator"
        );
    }
}

#[test]
fn successful_operations_agree() {
    let deleted = outcomes(|c, dir| c.delete_directory(&dir.join("folder")));
    let moved = outcomes(|c, dir| c.move_to(&dir.join("file.txt"), &dir.join("folder")));
    let made = outcomes(|c, dir| c.create_directory(&dir.join("fresh")));

    for results in [deleted, moved, made] {
        for (name, result) in results {
            assert_eq!(result, Ok(()), "{name} creator");
        }
    }
}

#[test]
fn listings_match() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
    fs::create_dir(dir.path().join("music")).unwrap();
    std::os::unix::fs::symlink("notes.txt", dir.path().join("latest")).unwrap();

    let mut listings = Vec::new();
    for (name, creator) in creators() {
        let mut objects = outcome(creator.list(dir.path())).expect(name);
        sort_listing(&mut objects);
        listings.push(objects);
    }

    let native = &listings[0];
    assert_eq!(native.len(), 3);
    assert_eq!(native[0].kind, FileKind::Directory);

    for other in &listings[1..] {
        assert_eq!(other.len(), native.len());
        for (left, right) in native.iter().zip(other) {
            assert_eq!(left.name, right.name);
            assert_eq!(left.parent, right.parent);
            assert_eq!(left.kind, right.kind);
            assert_eq!(left.mode, right.mode);
            assert_eq!(left.uid, right.uid);
            assert_eq!(left.link_target, right.link_target);
            assert_eq!(left.modified.timestamp(), right.modified.timestamp());
            if left.kind != FileKind::Directory {
                assert_eq!(left.size, right.size);
            }
        }
    }
}

#[test]
fn contents_and_digests_match() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("payload.bin");
    let payload: Vec<u8> = (0..=255u8).cycle().take(100_000).collect();

    for (name, creator) in creators() {
        let _ = fs::remove_file(&path);
        outcome(creator.write(&path, payload.clone())).expect(name);
        assert_eq!(fs::read(&path).unwrap(), payload, "{name} write");
        assert_eq!(outcome(creator.read(&path)).expect(name), payload, "{name} read");

        if name == "shell" && !has_command("sha256sum") {
            continue;
        }
        let checksum = outcome(creator.checksum(&path, ChecksumAlgorithm::Sha256)).expect(name);
        let native = outcome(NativeCreator::new().checksum(&path, ChecksumAlgorithm::Sha256))
            .expect("native checksum");
        assert_eq!(checksum, native, "{name} checksum");
    }
}

#[test]
fn folder_usage_matches() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("a/b")).unwrap();
    fs::write(dir.path().join("a/b/song.mp3"), vec![1u8; 4096]).unwrap();
    fs::write(dir.path().join("a/readme.md"), b"# readme").unwrap();

    let usages: Vec<_> = creators()
        .into_iter()
        .map(|(name, creator)| outcome(creator.folder_usage(dir.path())).expect(name))
        .collect();

    for usage in &usages[1..] {
        assert_eq!(usage, &usages[0]);
    }
    assert_eq!(usages[0].files, 2);
    assert_eq!(usages[0].directories, 2);
}

#[test]
fn unknown_commands_are_capability_errors() {
    if !Path::new(SHELL).exists() {
        eprintln!("skipping: {SHELL} unavailable");
        return;
    }

    let creator = ShellCreator::new(ShellRunner::new(SHELL));
    let error = run(
        creator.exec("fileman-definitely-not-a-command --flag").unwrap(),
        &CancellationToken::new(),
    )
    .unwrap_err();

    assert!(matches!(error, ExecError::CommandNotFound(_)));
    assert!(error.is_capability());
    assert!(!error.needs_elevation());

    let output = run(creator.exec("echo hi; exit 3").unwrap(), &CancellationToken::new()).unwrap();
    assert_eq!(output.code, Some(3));
    assert_eq!(output.stdout, "hi\n");

    let native = NativeCreator::new().exec("true").err().expect("not implemented");
    assert!(native.is_capability());
}

#[test]
fn archives_made_by_one_backend_open_in_the_other() {
    if !(Path::new(SHELL).exists() && has_command("tar") && has_command("gzip")) {
        eprintln!("skipping: tar or gzip unavailable");
        return;
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let photos = dir.path().join("photos");
    fs::create_dir(&photos).unwrap();
    fs::write(photos.join("beach.jpg"), b"jpeg").unwrap();

    let native = NativeCreator::new();
    let shell = ShellCreator::new(ShellRunner::new(SHELL));
    let mode = fileman_types::CompressionMode::TarGz;

    let archive = outcome(native.compress(mode, &[photos.clone()], None)).expect("compress");
    let out = dir.path().join("from-shell");
    outcome(shell.uncompress(&archive, Some(&out))).expect("shell extract");
    assert_eq!(fs::read(out.join("photos/beach.jpg")).unwrap(), b"jpeg");

    let second = dir.path().join("second.tar.gz");
    outcome(shell.compress(mode, &[photos], Some(&second))).expect("shell compress");
    let out = dir.path().join("from-native");
    outcome(native.uncompress(&second, Some(&out))).expect("native extract");
    assert_eq!(fs::read(out.join("photos/beach.jpg")).unwrap(), b"jpeg");

    assert_eq!(
        outcome(shell.compress(mode, &[dir.path().join("photos")], Some(&second))),
        Err(ExecErrorKind::AlreadyExists)
    );
}
