//! End-to-end tests for the update / save / apply / clean / ls workflow.

mod common;

use common::commit_file;
use common::prelude::*;
use std::fs;

#[test]
fn test_update_clones_and_reports() {
    require_git!();
    let fixture = TestFixture::new();

    fixture
        .command()
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("libfoo: cloned"))
        .stdout(predicate::str::contains("1 module(s) updated"));
    assert!(fixture.module_path().join(".git").exists());
}

#[test]
fn test_update_no_backup_discards_changes() {
    require_git!();
    let fixture = TestFixture::new();
    fixture.command().arg("update").assert().success();
    fs::write(fixture.module_path().join("lib.c"), "scratch\n").unwrap();

    fixture
        .command()
        .args(["update", "--no-backup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("local changes discarded"));
    assert_eq!(
        fs::read_to_string(fixture.module_path().join("lib.c")).unwrap(),
        "int answer(void) { return 41; }\n"
    );
}

#[test]
fn test_update_backup_then_clean() {
    require_git!();
    let fixture = TestFixture::new();
    fixture.command().arg("update").assert().success();
    fs::write(fixture.module_path().join("lib.c"), "scratch\n").unwrap();

    fixture
        .command()
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("local changes committed to backup/detached-"));

    fixture
        .command()
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted backup/detached-"));
    fixture
        .command()
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("no backup branches"));
}

#[test]
fn test_save_and_apply_round_trip() {
    require_git!();
    let fixture = TestFixture::new().with_layered_module();

    fixture
        .command()
        .args(["save", "--parallel"])
        .assert()
        .success()
        .stdout(predicate::str::contains("saved generic (1), specific (1)"));
    assert_eq!(fixture.patch_files("generic"), vec!["0001-B.patch"]);

    fixture.command().arg("update").assert().success();
    fixture
        .command()
        .args(["apply", "specific"])
        .assert()
        .success()
        .stdout(predicate::str::contains("applied generic (1), specific (1)"));
    assert_eq!(
        fs::read_to_string(fixture.module_path().join("lib.c")).unwrap(),
        "int answer(void) { return 42; }\n"
    );
}

#[test]
fn test_save_failure_exits_nonzero() {
    require_git!();
    let fixture = TestFixture::new();
    fixture.command().arg("update").assert().success();

    fixture
        .command()
        .arg("save")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("libfoo"))
        .stderr(predicate::str::contains("missing tag"));
}

#[test]
fn test_save_with_corrupt_older_marker_exits_nonzero() {
    require_git!();
    let fixture = TestFixture::new().with_layered_module();
    let module = fixture.module_path();

    // Independent sets pinned at D: the generic tag on B now sits below the pin.
    let independent: &[(&str, &[&str])] = &[("generic", &[]), ("specific", &[])];
    let new_pin = git(&module, &["rev-parse", "specific"]);
    fixture.write_config_with_patch_sets(&new_pin, independent);
    commit_file(&module, "later.c", "int later;\n", "F");
    git(&module, &["tag", "-f", "specific"]);

    fixture
        .command()
        .arg("save")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[WARN] libfoo: saved specific (1)"))
        .stdout(predicate::str::contains("0 of 1 module(s) saved, 1 failed"))
        .stderr(predicate::str::contains("[FAIL] libfoo:"))
        .stderr(predicate::str::contains("tag 'generic' is not a descendant"));
    // The valid set is still exported.
    assert_eq!(fixture.patch_files("specific"), vec!["0001-F.patch"]);
}

#[test]
fn test_ls_shows_checkout_and_saved_sets() {
    require_git!();
    let fixture = TestFixture::new();
    fixture
        .command()
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("libfoo: not cloned; no saved patch sets"));

    let fixture = fixture.with_layered_module();
    fixture.command().arg("save").assert().success();
    fixture
        .command()
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("generic (1), specific (1)"));

    fixture
        .command()
        .args(["ls", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::eq("libfoo\n"));
}
