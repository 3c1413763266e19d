use super::*;

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn sequencer(start: Instant) -> FireSequencer {
    FireSequencer::new(ms(300), ms(2_000), true, start)
}

#[test]
fn first_cycle_waits_for_the_off_interval() {
    let start = Instant::now();
    let mut fire = sequencer(start);

    let mut opens = Vec::new();
    for step in 1..=19 {
        if let Some(step) = fire.poll(start + ms(100 * step)) {
            opens.push(step);
        }
    }
    assert!(opens.is_empty(), "opened before 2s: {opens:?}");

    let mut opened = 0;
    for step in 20..=21 {
        if let Some(FireStep::Open { .. }) = fire.poll(start + ms(100 * step)) {
            opened += 1;
        }
    }
    assert_eq!(opened, 1);
}

#[test]
fn gate_is_held_for_the_on_duration() {
    let start = Instant::now();
    let mut fire = sequencer(start);

    let opened_at = start + ms(2_000);
    assert_eq!(
        fire.poll(opened_at),
        Some(FireStep::Open { close_at: opened_at + ms(300) })
    );
    assert!(fire.is_holding());
    assert_eq!(fire.poll(opened_at + ms(299)), None);
    assert_eq!(fire.poll(opened_at + ms(300)), Some(FireStep::Close));
    assert!(!fire.is_holding());
}

#[test]
fn next_cycle_counts_from_the_close() {
    let start = Instant::now();
    let mut fire = sequencer(start);

    fire.poll(start + ms(2_000));
    let closed_at = start + ms(2_400);
    assert_eq!(fire.poll(closed_at), Some(FireStep::Close));

    assert_eq!(fire.poll(closed_at + ms(1_999)), None);
    assert!(matches!(
        fire.poll(closed_at + ms(2_000)),
        Some(FireStep::Open { .. })
    ));
    assert_eq!(fire.cycles(), 2);
}

#[test]
fn opens_and_closes_alternate() {
    let start = Instant::now();
    let mut fire = sequencer(start);

    let mut steps = Vec::new();
    for step in 0..200 {
        if let Some(step) = fire.poll(start + ms(50 * step)) {
            steps.push(step);
        }
    }
    assert!(steps.len() >= 4);
    for pair in steps.windows(2) {
        let alternates = matches!(
            pair,
            [FireStep::Open { .. }, FireStep::Close] | [FireStep::Close, FireStep::Open { .. }]
        );
        assert!(alternates, "{pair:?}");
    }
}

#[test]
fn auto_off_suppresses_periodic_cycles() {
    let start = Instant::now();
    let mut fire = FireSequencer::new(ms(300), ms(2_000), false, start);

    assert_eq!(fire.poll(start + ms(10_000)), None);
    fire.set_auto(true);
    assert!(matches!(fire.poll(start + ms(10_000)), Some(FireStep::Open { .. })));
}

#[test]
fn trigger_starts_a_cycle_unless_holding() {
    let start = Instant::now();
    let mut fire = sequencer(start);

    assert!(matches!(fire.trigger(start + ms(10)), Some(FireStep::Open { .. })));
    assert_eq!(fire.trigger(start + ms(20)), None);
    assert_eq!(fire.poll(start + ms(310)), Some(FireStep::Close));
    assert_eq!(fire.cycles(), 1);
}

#[test]
fn abort_closes_a_holding_cycle() {
    let start = Instant::now();
    let mut fire = sequencer(start);

    assert_eq!(fire.abort(start), None);
    fire.trigger(start);
    assert_eq!(fire.abort(start + ms(5)), Some(FireStep::Close));
    assert!(!fire.is_holding());
    assert_eq!(fire.poll(start + ms(400)), None);
}

#[test]
fn new_timing_applies_to_the_next_cycle() {
    let start = Instant::now();
    let mut fire = sequencer(start);

    fire.set_timing(ms(100), ms(500));
    assert!(matches!(fire.poll(start + ms(500)), Some(FireStep::Open { .. })));
    assert_eq!(fire.close_at(), Some(start + ms(600)));

    let status = fire.status();
    assert_eq!((status.on_ms, status.off_ms), (100, 500));
    assert!(status.holding);
}

#[test]
fn millisecond_reporting_saturates() {
    assert_eq!(millis(Duration::MAX), u64::MAX);
    assert_eq!(millis(ms(1_500)), 1_500);
}

#[test]
fn oversized_timing_is_clamped_instead_of_overflowing() {
    let start = Instant::now();
    let mut fire = FireSequencer::new(Duration::MAX, Duration::MAX, true, start);
    assert_eq!(fire.poll(start + ms(10)), None);

    fire.set_timing(Duration::MAX, ms(0));
    assert_eq!(
        fire.poll(start),
        Some(FireStep::Open { close_at: start + MAX_PHASE })
    );

    let status = fire.status();
    assert_eq!(status.on_ms, 86_400_000);
    assert_eq!(status.off_ms, 0);
}
