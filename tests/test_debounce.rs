//! Tests for `tapkit::debounce` - the bounce filter in isolation.

use tapkit::debounce::DebounceFilter;
use tapkit::source::TouchPoint;

fn touched() -> TouchPoint {
    TouchPoint::new(100, 100, 1)
}

fn untouched() -> TouchPoint {
    TouchPoint::default()
}

#[test]
fn test_no_decision_within_interval() {
    let mut filter = DebounceFilter::new(15);
    // First call at t=0 is within the interval of the zeroed bookkeeping.
    assert!(filter.settle(0, untouched()).is_none());
    assert!(filter.settle(14, untouched()).is_none());
    assert!(filter.settle(15, untouched()).is_some());
}

#[test]
fn test_flip_is_not_stable_yet() {
    let mut filter = DebounceFilter::new(15);
    assert!(filter.settle(20, untouched()).is_some());

    // The first touched sample only records the flip.
    assert!(filter.settle(40, touched()).is_none());
    // Still within the fresh interval.
    assert!(filter.settle(50, touched()).is_none());
    // Persisted a full interval: accepted.
    let stable = filter.settle(56, touched()).unwrap();
    assert!(stable.is_touched());
}

#[test]
fn test_bounce_that_reverts_is_swallowed() {
    let mut filter = DebounceFilter::new(15);
    assert!(filter.settle(20, untouched()).is_some());

    // Touch flips, then reverts before the interval elapses: the touched
    // state is never reported stable.
    assert!(filter.settle(40, touched()).is_none());
    assert!(filter.settle(56, untouched()).is_none());
    let stable = filter.settle(72, untouched()).unwrap();
    assert!(!stable.is_touched());
}

#[test]
fn test_accepted_changes_are_at_least_interval_apart() {
    let mut filter = DebounceFilter::new(15);
    let mut accepted: Vec<(u32, bool)> = Vec::new();
    let mut last_state = false;

    // Jitter: flips every 7 ms for a while, then a clean hold.
    let samples: Vec<(u32, TouchPoint)> = (0..20)
        .map(|i| {
            let t = i * 7;
            let point = if i % 2 == 0 { touched() } else { untouched() };
            (t, point)
        })
        .chain((0..10).map(|i| (140 + i * 7, touched())))
        .collect();

    for (t, point) in samples {
        if let Some(stable) = filter.settle(t, point) {
            if stable.is_touched() != last_state {
                last_state = stable.is_touched();
                accepted.push((t, last_state));
            }
        }
    }

    for pair in accepted.windows(2) {
        assert!(pair[1].0 - pair[0].0 >= 15);
    }
    // The clean hold eventually comes through.
    assert_eq!(accepted.last().map(|(_, s)| *s), Some(true));
}

#[test]
fn test_position_passes_through_while_stable() {
    let mut filter = DebounceFilter::new(15);
    assert!(filter.settle(20, TouchPoint::new(10, 10, 1)).is_none());
    assert!(filter.settle(40, TouchPoint::new(11, 10, 1)).is_some());

    // Movement without a touched-state change is reported as-is on every
    // stable tick.
    let moved = filter.settle(60, TouchPoint::new(90, 120, 1)).unwrap();
    assert_eq!((moved.x, moved.y), (90, 120));
}

#[test]
fn test_interval_is_configurable() {
    let mut filter = DebounceFilter::new(40);
    assert_eq!(filter.interval(), 40);
    assert!(filter.settle(39, untouched()).is_none());
    assert!(filter.settle(40, untouched()).is_some());

    filter.set_interval(5);
    assert!(filter.settle(46, untouched()).is_some());
}

#[test]
fn test_wrapping_counter() {
    let mut filter = DebounceFilter::new(15);
    // Near the top of the u32 range.
    assert!(filter.settle(u32::MAX - 10, untouched()).is_some());
    // Shortly after, across the wrap: still within the interval.
    assert!(filter.settle(u32::MAX.wrapping_add(2), untouched()).is_none());
    // 20 ms later: a full interval has elapsed despite the wrap.
    assert!(filter.settle(u32::MAX.wrapping_add(10), untouched()).is_some());
}
