use evdev::{AbsoluteAxisCode, InputEvent, KeyCode};
use packed_struct::types::SizedInteger;

use crate::input::{
    event::{
        evdev::{abs_event, key_event, sync_event},
        AliasedEvent,
    },
    mapping::{MappingTables, WHEEL_DIAL},
};

use super::hid_report::{DigitizerReport, FrameReport, StylusButton};

const PRESSED: i32 = 1;
const RELEASED: i32 = 0;

/// Pad state that must survive between frame reports. Pad buttons are level
/// triggered: the hardware repeats the button bit while it is held and never
/// sends an explicit release, so the pressed button is remembered to release
/// it once the bit clears.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameState {
    pub last_button: Option<usize>,
    /// Actions pressed for `last_button`. Releases are sent from this record
    /// so a mapping change while the button is held cannot leave keys down.
    pub pressed: Vec<AliasedEvent>,
}

/// Translate a digitizer report into a batch of pen events closed by a
/// single SYN_REPORT.
pub fn translate_digitizer(report: &DigitizerReport) -> Vec<InputEvent> {
    let mut events = Vec::with_capacity(9);

    if report.is_touching() {
        events.push(key_event(KeyCode::BTN_TOOL_PEN, PRESSED));
        events.push(abs_event(
            AbsoluteAxisCode::ABS_PRESSURE,
            report.pressure.to_primitive().into(),
        ));
    } else {
        events.push(key_event(KeyCode::BTN_TOOL_PEN, RELEASED));
    }

    // Both stylus buttons are always reported so a release is never missed
    let (stylus, stylus2) = match report.stylus_button() {
        StylusButton::Released => (RELEASED, RELEASED),
        StylusButton::Lower => (PRESSED, RELEASED),
        StylusButton::Upper => (RELEASED, PRESSED),
    };
    events.push(key_event(KeyCode::BTN_STYLUS, stylus));
    events.push(key_event(KeyCode::BTN_STYLUS2, stylus2));

    events.push(abs_event(
        AbsoluteAxisCode::ABS_X,
        report.x.to_primitive().into(),
    ));
    events.push(abs_event(
        AbsoluteAxisCode::ABS_Y,
        report.y.to_primitive().into(),
    ));
    events.push(abs_event(
        AbsoluteAxisCode::ABS_TILT_X,
        report.tilt_x().into(),
    ));
    events.push(abs_event(
        AbsoluteAxisCode::ABS_TILT_Y,
        report.tilt_y().into(),
    ));

    events.push(sync_event());
    events
}

/// Translate a frame report into pad events using the given mapping tables.
///
/// A dial detent with a mapping fires its actions in one batch and, because
/// dials have no release in the protocol, releases every key-style action in
/// a second batch. Otherwise the lowest pressed pad button is pressed once
/// and released when the hardware stops reporting it.
pub fn translate_frame(
    report: &FrameReport,
    tables: &MappingTables,
    state: &mut FrameState,
) -> Vec<InputEvent> {
    let mut events = Vec::new();

    if let Some(step) = report.dial_step() {
        let actions = tables.dial(WHEEL_DIAL, step);
        if !actions.is_empty() {
            log::trace!("Dial step {step}");
            for action in actions.iter() {
                events.extend(action.events());
            }
            events.push(sync_event());

            for action in actions.iter().filter(|action| action.kind.is_key()) {
                events.extend(action.events_with_value(RELEASED));
            }
            events.push(sync_event());

            return events;
        }
    }

    match (report.pressed_button(tables.button_count()), state.last_button) {
        // Still held
        (Some(button), Some(last)) if button == last => (),
        (Some(button), last) => {
            if let Some(last) = last {
                log::trace!("Pad button {last} released for {button}");
                release_button(state, &mut events);
            }
            log::trace!("Pad button {button} pressed");
            let actions = tables.button(button);
            for action in actions.iter() {
                events.extend(action.events_with_value(PRESSED));
            }
            state.last_button = Some(button);
            state.pressed = actions.to_vec();
        }
        (None, Some(last)) => {
            log::trace!("Pad button {last} released");
            release_button(state, &mut events);
        }
        (None, None) => (),
    }

    events.push(sync_event());
    events
}

fn release_button(state: &mut FrameState, events: &mut Vec<InputEvent>) {
    for action in state.pressed.drain(..) {
        events.extend(action.events_with_value(RELEASED));
    }
    state.last_button = None;
}
