use anyhow::Result;
use assert_fs::TempDir;
use serial_test::serial;
use std::fs;
use toolbridge_config::constants::env;
use toolbridge_config::{ConfigManager, TraceLevel};

fn clear_override() {
    // SAFETY: tests touching the environment are serialized.
    unsafe { std::env::remove_var(env::CONFIG_PATH) };
}

#[test]
#[serial]
fn workspace_without_config_uses_defaults() -> Result<()> {
    clear_override();
    let temp = TempDir::new()?;

    let manager = ConfigManager::load(Some(temp.path()))?;
    assert!(manager.config_path().is_none());
    assert_eq!(manager.config().tool.binary, "webforge");
    assert_eq!(manager.config().detection.cache_ttl_seconds, 60);
    Ok(())
}

#[test]
#[serial]
fn workspace_config_is_loaded() -> Result<()> {
    clear_override();
    let temp = TempDir::new()?;
    fs::write(
        temp.path().join("toolbridge.toml"),
        "[tool]\nbinary = \"forge\"\npackage = \"@forge/cli\"\n\n[logging]\nlevel = \"debug\"\n",
    )?;

    let manager = ConfigManager::load(Some(temp.path()))?;
    assert_eq!(manager.config().tool.binary, "forge");
    assert_eq!(manager.config().tool.package, "@forge/cli");
    assert_eq!(manager.config().logging.level, TraceLevel::Debug);
    assert!(manager.config_path().is_some());
    Ok(())
}

#[test]
#[serial]
fn env_override_takes_precedence() -> Result<()> {
    let temp = TempDir::new()?;
    let override_path = temp.path().join("custom.toml");
    fs::write(&override_path, "[security]\nforce_color = false\n")?;
    fs::write(
        temp.path().join("toolbridge.toml"),
        "[security]\nforce_color = true\n",
    )?;

    // SAFETY: tests touching the environment are serialized.
    unsafe { std::env::set_var(env::CONFIG_PATH, &override_path) };
    let manager = ConfigManager::load(Some(temp.path()));
    clear_override();

    assert!(!manager?.config().security.force_color);
    Ok(())
}

#[test]
#[serial]
fn invalid_workspace_config_is_an_error() -> Result<()> {
    clear_override();
    let temp = TempDir::new()?;
    fs::write(
        temp.path().join("toolbridge.toml"),
        "[security]\nextra_allowed_commands = [\"sh -c\"]\n",
    )?;

    assert!(ConfigManager::load(Some(temp.path())).is_err());
    Ok(())
}

#[test]
#[serial]
fn no_workspace_means_defaults() -> Result<()> {
    clear_override();
    let manager = ConfigManager::load(None)?;
    assert!(manager.config_path().is_none());
    Ok(())
}
