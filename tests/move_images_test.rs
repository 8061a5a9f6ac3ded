use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn make_vault(root: &Path) {
    fs::create_dir_all(root.join(".obsidian")).expect("mkdir .obsidian");
}

#[test]
fn move_images_relocates_and_is_idempotent() {
    let tmp = tempdir().expect("tempdir");
    let vault = tmp.path().join("vault");
    make_vault(&vault);
    fs::create_dir_all(vault.join("notes")).expect("mkdir notes");
    fs::write(vault.join("notes/note.md"), "# note\n![[pic.png]]\n").expect("write note");
    fs::write(vault.join("pic.png"), b"fake png bytes").expect("write png");

    assert_cmd::cargo::cargo_bin_cmd!("vault-tidy")
        .arg(&vault)
        .arg("--move-images")
        .assert()
        .success();

    assert!(!vault.join("pic.png").exists());
    assert!(vault.join("notes/assets/pic.png").exists());

    let ledger = fs::read_to_string(vault.join(".logs/moved-images.json")).expect("read ledger");
    assert!(ledger.contains("\"asset_name\": \"pic.png\""));

    // Second run over the unchanged vault: same ledger, no missing report.
    assert_cmd::cargo::cargo_bin_cmd!("vault-tidy")
        .arg(&vault)
        .arg("--move-images")
        .assert()
        .success();

    let ledger_after = fs::read_to_string(vault.join(".logs/moved-images.json")).expect("read");
    assert_eq!(ledger, ledger_after);
    let log = fs::read_to_string(vault.join(".logs/vault-tidy.log")).expect("read log");
    assert!(!log.contains("Image not found"));
}

#[test]
fn missing_asset_is_advisory_and_exit_is_zero() {
    let tmp = tempdir().expect("tempdir");
    let vault = tmp.path().join("vault");
    make_vault(&vault);
    fs::write(vault.join("note.md"), "![[ghost.png]]\n").expect("write note");

    assert_cmd::cargo::cargo_bin_cmd!("vault-tidy")
        .arg(&vault)
        .arg("--move-images")
        .assert()
        .success()
        .stdout(predicates::str::contains("Image not found in vault root: ghost.png"));
}

#[test]
fn skip_not_found_suppresses_the_missing_report() {
    let tmp = tempdir().expect("tempdir");
    let vault = tmp.path().join("vault");
    make_vault(&vault);
    fs::write(vault.join("note.md"), "![[ghost.png]]\n").expect("write note");

    assert_cmd::cargo::cargo_bin_cmd!("vault-tidy")
        .arg(&vault)
        .arg("--move-images")
        .arg("--skip-not-found")
        .assert()
        .success()
        .stdout(predicates::str::contains("Image not found").not());
}

#[test]
fn unmarked_root_is_fatal_unless_skipped() {
    let tmp = tempdir().expect("tempdir");
    let plain = tmp.path().join("plain");
    fs::create_dir_all(&plain).expect("mkdir");
    fs::write(plain.join("note.md"), "no embeds\n").expect("write note");

    assert_cmd::cargo::cargo_bin_cmd!("vault-tidy")
        .arg(&plain)
        .arg("--move-images")
        .assert()
        .failure();

    // With the check skipped, the "validated" line must not be claimed.
    assert_cmd::cargo::cargo_bin_cmd!("vault-tidy")
        .arg(&plain)
        .arg("--move-images")
        .arg("--skip-vault-checking")
        .assert()
        .success()
        .stdout(predicates::str::contains("Vault path validated").not());
}

#[test]
fn missing_root_is_fatal() {
    let tmp = tempdir().expect("tempdir");
    assert_cmd::cargo::cargo_bin_cmd!("vault-tidy")
        .arg(tmp.path().join("does-not-exist"))
        .arg("--move-images")
        .assert()
        .failure();
}
