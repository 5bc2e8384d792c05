use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cli(workspace: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("codevertex-cli")?;
    cmd.env_remove("CODEVERTEX_COLOR_SCHEME")
        .env_remove("CODEVERTEX_ENDPOINT")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(workspace.join("config.json"))
        .arg("--store")
        .arg(workspace.join("store.json"));
    Ok(cmd)
}

#[test]
fn show_follows_the_os_until_a_choice_is_made() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;

    cli(workspace.path())?
        .args(["theme", "show"])
        .assert()
        .success()
        .stdout("light (system) #ffffff\n");

    cli(workspace.path())?
        .env("CODEVERTEX_COLOR_SCHEME", "dark")
        .args(["theme", "show"])
        .assert()
        .success()
        .stdout("dark (system) #0f172a\n");

    assert!(!workspace.path().join("store.json").exists());
    Ok(())
}

#[test]
fn explicit_choice_persists_and_overrides_the_os() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;

    cli(workspace.path())?
        .args(["theme", "set", "light"])
        .assert()
        .success()
        .stdout("light (user) #ffffff\n");

    cli(workspace.path())?
        .args(["--color-scheme", "dark", "theme", "show"])
        .assert()
        .success()
        .stdout("light (user) #ffffff\n");

    let stored: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(workspace.path().join("store.json"))?)?;
    assert_eq!(stored["theme"], "light");

    cli(workspace.path())?
        .args(["theme", "toggle"])
        .assert()
        .success()
        .stdout("dark (user) #0f172a\n");
    Ok(())
}

#[test]
fn clear_returns_to_the_os_preference() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;

    cli(workspace.path())?
        .args(["theme", "set", "dark"])
        .assert()
        .success();
    cli(workspace.path())?
        .args(["theme", "clear"])
        .assert()
        .success()
        .stdout("light (system) #ffffff\n");

    let stored: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(workspace.path().join("store.json"))?)?;
    assert!(stored.get("theme").is_none());
    Ok(())
}

#[test]
fn invalid_mode_is_rejected_without_writing() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;

    cli(workspace.path())?
        .args(["theme", "set", "sepia"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown theme mode `sepia`"));

    assert!(!workspace.path().join("store.json").exists());
    Ok(())
}
