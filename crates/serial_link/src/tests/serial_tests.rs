use super::*;

fn candidate(name: &str, usb: bool) -> PortCandidate {
    PortCandidate {
        name: name.into(),
        usb,
    }
}

#[test]
fn picks_the_first_usb_port() {
    let ports = [
        candidate("/dev/ttyS0", false),
        candidate("/dev/ttyACM1", true),
        candidate("/dev/ttyUSB0", true),
    ];
    assert_eq!(pick_port(&ports), Some("/dev/ttyACM1"));
}

#[test]
fn no_usb_port_means_no_pick() {
    assert_eq!(pick_port(&[]), None);
    assert_eq!(pick_port(&[candidate("COM1", false)]), None);
}

#[test]
fn explicit_port_skips_detection() {
    let connector = SerialConnector::new(SerialSettings {
        port: "COM7".into(),
        ..SerialSettings::default()
    });
    assert_eq!(connector.resolve_port(), "COM7");
    assert_eq!(connector.port(), "COM7");
}

#[test]
fn default_settings_auto_detect() {
    assert_eq!(SerialSettings::default().port, AUTO_PORT);
}

#[test]
fn partial_ack_is_kept_until_its_terminator_arrives() {
    let mut acks = AckBuffer::default();

    acks.extend(b"OK A,9");
    assert_eq!(acks.next_line(), None);

    acks.extend(b"7\r\nOK G");
    assert_eq!(acks.next_line(), Some("OK A,97".into()));
    assert_eq!(acks.next_line(), None);

    acks.extend(b",1\n");
    assert_eq!(acks.next_line(), Some("OK G,1".into()));
}

#[test]
fn blank_ack_lines_are_skipped() {
    let mut acks = AckBuffer::default();
    acks.extend(b"\r\n\nready\nOK\n");

    assert_eq!(acks.next_line(), Some("ready".into()));
    assert_eq!(acks.next_line(), Some("OK".into()));
    assert_eq!(acks.next_line(), None);
}
