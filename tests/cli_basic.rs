//! Integration tests for basic CLI behavior.
//!
//! Tests that the binary exists, accepts standard flags, each subcommand
//! responds to `--help`, and offline commands work without a config file.

#![allow(deprecated)] // cargo_bin deprecation — replacement not yet stable

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: a Command for the `reelnab` binary that never reads the user's
/// own config file.
fn reelnab() -> Command {
    let mut cmd = Command::cargo_bin("reelnab").expect("binary 'reelnab' should be built");
    cmd.env("REELNAB_CONFIG", std::env::temp_dir().join("reelnab-no-such-config.toml"))
        .env_remove("RUST_LOG");
    cmd
}

// ─── Top-level flags ─────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    reelnab()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: reelnab"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("episodes"))
        .stdout(predicate::str::contains("streams"))
        .stdout(predicate::str::contains("play"));
}

#[test]
fn version_flag_shows_semver() {
    reelnab()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^reelnab \d+\.\d+\.\d+\n$").unwrap());
}

#[test]
fn no_args_shows_error_and_usage() {
    reelnab()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: reelnab"));
}

#[test]
fn invalid_subcommand_fails() {
    reelnab()
        .arg("this-is-not-a-real-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ─── Subcommand help ─────────────────────────────────────────────────────────

#[test]
fn streams_help_mentions_type() {
    reelnab()
        .args(["streams", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--type"));
}

#[test]
fn play_help_mentions_index_and_download() {
    reelnab()
        .args(["play", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--index"))
        .stdout(predicate::str::contains("--download"));
}

#[test]
fn serve_help_mentions_bind() {
    reelnab()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--bind"));
}

// ─── Argument validation ─────────────────────────────────────────────────────

#[test]
fn search_requires_query() {
    reelnab()
        .arg("search")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<QUERY>"));
}

#[test]
fn unknown_content_type_is_rejected() {
    reelnab()
        .args(["streams", "movies4u", "https://movies4u.style/x/", "--type", "podcast"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown content type"));
}

// ─── Offline commands ────────────────────────────────────────────────────────

#[test]
fn providers_lists_builtin_sites() {
    reelnab()
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::contains("joya9tv"))
        .stdout(predicate::str::contains("movies4u"))
        .stdout(predicate::str::contains("zeefliz"));
}

#[test]
fn providers_json_is_parseable() {
    let output = reelnab().args(["providers", "--json"]).output().unwrap();
    assert!(output.status.success());
    let providers: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(providers.as_array().unwrap().len(), 3);
    assert_eq!(providers[1]["name"], "movies4u");
}

#[test]
fn catalog_is_served_from_the_profile() {
    reelnab()
        .args(["catalog", "joya9tv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Web Series"));
}

#[test]
fn unknown_provider_fails() {
    reelnab()
        .args(["catalog", "nosuchsite"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown provider"));
}
