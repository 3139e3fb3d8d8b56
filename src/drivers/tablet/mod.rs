//! Shared logic of XP-Pen tablets that speak the "0x02" vendor report
//! protocol. Model modules only declare their constants and defaults.
pub mod decoder;
pub mod driver;
pub mod hid_report;

#[cfg(test)]
mod hid_report_test;

use evdev::KeyCode;

use crate::{
    config::MappingConfig,
    input::{event::EventKind, mapping::WHEEL_DIAL},
};

use hid_report::ReportLayout;

/// Report layout used by every supported XP-Pen model
pub const XP_PEN_LAYOUT: ReportLayout = ReportLayout {
    report_id: 0x02,
    digitizer_below: 0xb0,
    frame_from: 0xf0,
};

/// Key codes the eight physical pad buttons are aliased to, in button order
pub const XP_PEN_PAD_BUTTONS: [KeyCode; 8] = [
    KeyCode::BTN_0,
    KeyCode::BTN_1,
    KeyCode::BTN_2,
    KeyCode::BTN_3,
    KeyCode::BTN_4,
    KeyCode::BTN_5,
    KeyCode::BTN_6,
    KeyCode::BTN_7,
];

/// Default pad layout of XP-Pen tablets with eight buttons and a wheel,
/// aimed at drawing applications.
pub fn xp_pen_default_mapping() -> MappingConfig {
    let buttons: [&[KeyCode]; 8] = [
        &[KeyCode::KEY_B],
        &[KeyCode::KEY_E],
        &[KeyCode::KEY_SPACE],
        &[KeyCode::KEY_LEFTALT],
        &[KeyCode::KEY_V],
        &[KeyCode::KEY_LEFTCTRL, KeyCode::KEY_S],
        &[KeyCode::KEY_LEFTCTRL, KeyCode::KEY_Z],
        &[KeyCode::KEY_LEFTCTRL, KeyCode::KEY_LEFTALT, KeyCode::KEY_N],
    ];

    let mut mapping = MappingConfig::default();
    for (index, keys) in buttons.iter().enumerate() {
        mapping.add_button(index, EventKind::Key, &codes(keys));
    }

    // Zoom out / zoom in
    mapping.add_dial(
        WHEEL_DIAL,
        -1,
        EventKind::Key,
        &codes(&[KeyCode::KEY_LEFTCTRL, KeyCode::KEY_MINUS]),
    );
    mapping.add_dial(
        WHEEL_DIAL,
        1,
        EventKind::Key,
        &codes(&[KeyCode::KEY_LEFTCTRL, KeyCode::KEY_EQUAL]),
    );

    mapping
}

fn codes(keys: &[KeyCode]) -> Vec<u16> {
    keys.iter().map(|key| key.0).collect()
}
