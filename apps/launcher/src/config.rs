use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use controller::LauncherConfig;

const DEFAULT_CONFIG_FILE: &str = "launcher.toml";

/// Defaults, then the TOML file, then `LAUNCHER__*` environment overrides.
///
/// An explicitly named file must exist; the default `launcher.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<LauncherConfig> {
    let mut settings = match path {
        Some(path) => read_file(path)?,
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                read_file(&default_path)?
            } else {
                LauncherConfig::default()
            }
        }
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn read_file(path: &Path) -> anyhow::Result<LauncherConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    parse_settings(&raw).with_context(|| format!("invalid config file '{}'", path.display()))
}

pub fn parse_settings(raw: &str) -> anyhow::Result<LauncherConfig> {
    Ok(toml::from_str(raw)?)
}

pub fn apply_env_overrides(
    settings: &mut LauncherConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("LAUNCHER__SERIAL_PORT") {
        settings.serial.port = v;
    }
    if let Some(v) = parsed(&lookup, "LAUNCHER__MOCK")? {
        settings.serial.mock = v;
    }
    if let Some(v) = parsed(&lookup, "LAUNCHER__MIN_ANGLE")? {
        settings.aim.min_angle = v;
    }
    if let Some(v) = parsed(&lookup, "LAUNCHER__MAX_ANGLE")? {
        settings.aim.max_angle = v;
    }
    if let Some(v) = lookup("LAUNCHER__SPIN") {
        settings.wheels.spin = v;
    }
    if let Some(v) = lookup("LAUNCHER__AIM_MODE") {
        settings.aim.mode = v.parse().context("LAUNCHER__AIM_MODE")?;
    }
    if let Some(v) = parsed(&lookup, "LAUNCHER__FIRE_ON_SECS")? {
        settings.fire.on_secs = v;
    }
    if let Some(v) = parsed(&lookup, "LAUNCHER__FIRE_OFF_SECS")? {
        settings.fire.off_secs = v;
    }
    Ok(())
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} has invalid value '{raw}'"))
        })
        .transpose()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
