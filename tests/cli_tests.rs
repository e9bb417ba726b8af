//! End-to-end tests of the `fsbridge` binary in both submission modes

use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

fn fsbridge(async_mode: bool) -> Command {
    let mut cmd = Command::cargo_bin("fsbridge").unwrap();
    if async_mode {
        cmd.arg("--async");
    }
    cmd
}

#[rstest]
#[case::sync(false)]
#[case::routed(true)]
fn test_stat_file(#[case] async_mode: bool) {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("hello.txt");
    fs::write(&file, b"hello world").unwrap();

    fsbridge(async_mode)
        .arg("stat")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("type: file"))
        .stdout(predicate::str::contains("size: 11"));
}

#[rstest]
#[case::sync(false)]
#[case::routed(true)]
fn test_lstat_and_readlink(#[case] async_mode: bool) {
    let temp_dir = TempDir::new().unwrap();
    let link = temp_dir.path().join("link");
    std::os::unix::fs::symlink("target/file", &link).unwrap();

    fsbridge(async_mode)
        .arg("lstat")
        .arg(&link)
        .assert()
        .success()
        .stdout(predicate::str::contains("type: symlink"));

    fsbridge(async_mode)
        .arg("readlink")
        .arg(&link)
        .assert()
        .success()
        .stdout("target/file\n");
}

#[rstest]
#[case::sync(false)]
#[case::routed(true)]
fn test_ls_lists_sorted_entries(#[case] async_mode: bool) {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("b.txt"), b"").unwrap();
    fs::write(temp_dir.path().join("a.txt"), b"").unwrap();
    fs::create_dir(temp_dir.path().join("c")).unwrap();

    // Batch of 2 forces more than one readdir call
    fsbridge(async_mode)
        .arg("ls")
        .arg(temp_dir.path())
        .args(["--batch", "2"])
        .assert()
        .success()
        .stdout("f\ta.txt\nf\tb.txt\nd\tc\n");
}

#[rstest]
#[case::sync(false)]
#[case::routed(true)]
fn test_write_then_cat(#[case] async_mode: bool) {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("out.txt");

    fsbridge(async_mode)
        .arg("write")
        .arg(&file)
        .arg("first line\n")
        .assert()
        .success();

    fsbridge(async_mode)
        .arg("write")
        .arg(&file)
        .arg("second line\n")
        .args(["--flags", "a"])
        .assert()
        .success();

    assert_eq!(fs::read(&file).unwrap(), b"first line\nsecond line\n");

    fsbridge(async_mode)
        .arg("cat")
        .arg(&file)
        .args(["--chunk", "5"])
        .assert()
        .success()
        .stdout("first line\nsecond line\n");
}

#[rstest]
#[case::sync(false)]
#[case::routed(true)]
fn test_missing_path_fails_with_errno_name(#[case] async_mode: bool) {
    let temp_dir = TempDir::new().unwrap();

    fsbridge(async_mode)
        .arg("stat")
        .arg(temp_dir.path().join("missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("ENOENT"));
}

#[test]
fn test_exclusive_create_refuses_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("exists");
    fs::write(&file, b"keep").unwrap();

    fsbridge(false)
        .arg("write")
        .arg(&file)
        .arg("clobber")
        .args(["--flags", "wx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("EEXIST"));
    assert_eq!(fs::read(&file).unwrap(), b"keep");
}

#[test]
fn test_bad_flags_rejected_before_running() {
    fsbridge(false)
        .args(["write", "/nonexistent/x", "text", "--flags", "rw"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid open flags"));
}

#[rstest]
#[case::sync(false)]
#[case::routed(true)]
fn test_mkdir_parents(#[case] async_mode: bool) {
    let temp_dir = TempDir::new().unwrap();
    let deep = temp_dir.path().join("x/y/z");

    fsbridge(async_mode)
        .arg("mkdir")
        .arg(&deep)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ENOENT"));

    fsbridge(async_mode)
        .args(["mkdir", "-p"])
        .arg(&deep)
        .assert()
        .success();
    assert!(deep.is_dir());

    // Existing directory is fine with -p
    fsbridge(async_mode)
        .args(["mkdir", "-p"])
        .arg(&deep)
        .assert()
        .success();
}
