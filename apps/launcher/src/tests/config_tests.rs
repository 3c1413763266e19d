use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

use controller::config::{FollowPolicy, HoldMode};
use shared::domain::AimMode;

use super::*;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn empty_file_yields_defaults() {
    assert_eq!(parse_settings("").expect("parse"), LauncherConfig::default());
}

#[test]
fn file_sections_override_defaults() {
    let settings = parse_settings(
        r#"
        [serial]
        port = "/dev/ttyUSB1"
        mock = false

        [aim]
        min_angle = 20
        max_angle = 160
        follow_policy = "steady"

        [wheels]
        spin = "topspin"

        [fire]
        off_secs = 1.5
        hold = "deferred"
        "#,
    )
    .expect("parse");

    assert_eq!(settings.serial.port, "/dev/ttyUSB1");
    assert!(!settings.serial.mock);
    assert_eq!((settings.aim.min_angle, settings.aim.max_angle), (20, 160));
    assert_eq!(settings.aim.follow_policy, FollowPolicy::Steady);
    assert_eq!(settings.wheels.spin, "topspin");
    assert_eq!(settings.fire.off_secs, 1.5);
    assert_eq!(settings.fire.on_secs, 0.3);
    assert_eq!(settings.fire.hold, HoldMode::Deferred);
}

#[test]
fn env_overrides_win_over_file_values() {
    let mut settings = parse_settings("[serial]\nport = \"/dev/ttyACM3\"\n").expect("parse");
    apply_env_overrides(
        &mut settings,
        env_of(&[
            ("LAUNCHER__SERIAL_PORT", "COM4"),
            ("LAUNCHER__MOCK", "false"),
            ("LAUNCHER__MIN_ANGLE", "10"),
            ("LAUNCHER__MAX_ANGLE", "170"),
            ("LAUNCHER__SPIN", "backspin"),
            ("LAUNCHER__AIM_MODE", "random"),
            ("LAUNCHER__FIRE_ON_SECS", "0.5"),
            ("LAUNCHER__FIRE_OFF_SECS", " 4 "),
        ]),
    )
    .expect("overrides");

    assert_eq!(settings.serial.port, "COM4");
    assert!(!settings.serial.mock);
    assert_eq!((settings.aim.min_angle, settings.aim.max_angle), (10, 170));
    assert_eq!(settings.wheels.spin, "backspin");
    assert_eq!(settings.aim.mode, AimMode::Random);
    assert_eq!((settings.fire.on_secs, settings.fire.off_secs), (0.5, 4.0));
}

#[test]
fn unparsable_env_value_names_the_variable() {
    let mut settings = LauncherConfig::default();
    let err = apply_env_overrides(&mut settings, env_of(&[("LAUNCHER__MIN_ANGLE", "ten")]))
        .expect_err("invalid angle");
    assert!(err.to_string().contains("LAUNCHER__MIN_ANGLE"));
}

#[test]
fn named_config_file_must_exist() {
    let missing = env::temp_dir().join("launcher_config_that_does_not_exist.toml");
    let err = load_settings(Some(&missing)).expect_err("missing file");
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn reads_named_config_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("launcher_config_test_{suffix}.toml"));
    fs::write(&path, "[tracking]\ntick_hz = 60\nframe_width = 1280\n").expect("write config");

    let settings = load_settings(Some(&path)).expect("load");
    assert_eq!(settings.tracking.tick_hz, 60);
    assert_eq!(settings.tracking.frame_width, 1280);

    fs::remove_file(path).expect("cleanup");
}
