use evdev::{
    AbsoluteAxisCode, EventType, InputEvent, KeyCode, RelativeAxisCode, SynchronizationCode,
};

/// Returns a key (or button) event
pub fn key_event(code: KeyCode, value: i32) -> InputEvent {
    InputEvent::new(EventType::KEY.0, code.0, value)
}

/// Returns an absolute axis event
pub fn abs_event(code: AbsoluteAxisCode, value: i32) -> InputEvent {
    InputEvent::new(EventType::ABSOLUTE.0, code.0, value)
}

/// Returns a relative axis event
pub fn rel_event(code: RelativeAxisCode, value: i32) -> InputEvent {
    InputEvent::new(EventType::RELATIVE.0, code.0, value)
}

/// Returns the SYN_REPORT marker that closes a batch of events
pub fn sync_event() -> InputEvent {
    InputEvent::new(
        EventType::SYNCHRONIZATION.0,
        SynchronizationCode::SYN_REPORT.0,
        0,
    )
}

/// Returns true if the given event is a SYN_REPORT marker
pub fn is_sync(event: &InputEvent) -> bool {
    event.event_type() == EventType::SYNCHRONIZATION
        && event.code() == SynchronizationCode::SYN_REPORT.0
}

/// Splits a stream of events into the batches delimited by SYN_REPORT
/// markers. The markers themselves are not part of the returned batches. Any
/// trailing events without a closing marker are returned as a final batch.
pub fn split_batches(events: &[InputEvent]) -> Vec<&[InputEvent]> {
    let mut batches = Vec::new();
    let mut start = 0;
    for (i, event) in events.iter().enumerate() {
        if is_sync(event) {
            batches.push(&events[start..i]);
            start = i + 1;
        }
    }
    if start < events.len() {
        batches.push(&events[start..]);
    }

    batches
}
