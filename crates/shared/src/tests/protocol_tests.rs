use super::*;

#[test]
fn frames_each_command_kind() {
    assert_eq!(DeviceCommand::Angle(97).encode(), "A,97\n");
    assert_eq!(
        DeviceCommand::Wheels {
            upper: 182,
            lower: 140
        }
        .encode(),
        "W,182,140\n"
    );
    assert_eq!(DeviceCommand::Gate { open: true }.encode(), "G,1\n");
    assert_eq!(DeviceCommand::Gate { open: false }.encode(), "G,0\n");
}

#[test]
fn negative_angles_keep_their_sign() {
    assert_eq!(DeviceCommand::Angle(-15).encode(), "A,-15\n");
}

#[test]
fn parses_framed_lines() {
    assert_eq!(
        "W,182,140\n".parse::<DeviceCommand>().expect("wheels"),
        DeviceCommand::Wheels {
            upper: 182,
            lower: 140
        }
    );
    assert_eq!(
        "G,1\r\n".parse::<DeviceCommand>().expect("gate"),
        DeviceCommand::Gate { open: true }
    );
}

#[test]
fn rejects_malformed_lines() {
    for line in ["", "A", "A,x", "W,1", "G,2", "Z,1", "A,90,1", "W,-1,3"] {
        let err = line.parse::<DeviceCommand>().expect_err(line);
        assert!(
            matches!(err, LauncherError::MalformedCommand(_)),
            "unexpected error for {line:?}: {err}"
        );
    }
}
