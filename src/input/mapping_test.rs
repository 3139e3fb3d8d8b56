use std::{error::Error, sync::Arc};

use evdev::{KeyCode, RelativeAxisCode};

use crate::{
    config::{DeviceConfig, MappingConfig},
    drivers::tablet::{xp_pen_default_mapping, XP_PEN_PAD_BUTTONS},
    input::{
        event::{AliasedEvent, EventKind},
        mapping::{MappingError, MappingTables, SharedMappings, WHEEL_DIAL},
    },
};

#[test]
fn test_default_mapping_tables() {
    let tables = MappingTables::from_config(&xp_pen_default_mapping(), &XP_PEN_PAD_BUTTONS).unwrap();

    assert_eq!(tables.button_count(), 8);
    assert_eq!(
        tables.button(0),
        &[AliasedEvent::new(EventKind::Key, vec![KeyCode::KEY_B.0], 1)]
    );
    assert_eq!(
        tables.button(7),
        &[AliasedEvent::new(
            EventKind::Key,
            vec![
                KeyCode::KEY_LEFTCTRL.0,
                KeyCode::KEY_LEFTALT.0,
                KeyCode::KEY_N.0
            ],
            1
        )]
    );
    assert_eq!(
        tables.dial(WHEEL_DIAL, -1),
        &[AliasedEvent::new(
            EventKind::Key,
            vec![KeyCode::KEY_LEFTCTRL.0, KeyCode::KEY_MINUS.0],
            1
        )]
    );
    assert!(tables.button(8).is_empty());
    assert!(tables.dial(WHEEL_DIAL, 2).is_empty());
}

#[tokio::test]
async fn test_json_mapping() -> Result<(), Box<dyn Error>> {
    let json = r#"{
        "mapping": {
            "buttons": {
                "1": { "1": [30, 31] },
                "3": { "2": [8], "1": [42] }
            },
            "dials": {
                "8": { "1": { "2": [8] }, "-1": { "1": [29, 12] } }
            }
        }
    }"#;
    let config = DeviceConfig::from_json(json)?;
    let mapping = config.mapping.unwrap_or_default();
    let tables = MappingTables::from_config(&mapping, &XP_PEN_PAD_BUTTONS)?;

    assert_eq!(
        tables.button(1),
        &[AliasedEvent::new(EventKind::Key, vec![30, 31], 1)]
    );
    // Ordered by event type, not by declaration
    assert_eq!(
        tables.button(3),
        &[
            AliasedEvent::new(EventKind::Key, vec![42], 1),
            AliasedEvent::new(EventKind::Relative, vec![8], 1),
        ]
    );
    // Relative dial actions carry the step, key actions are pressed
    assert_eq!(
        tables.dial(WHEEL_DIAL, 1),
        &[AliasedEvent::new(
            EventKind::Relative,
            vec![RelativeAxisCode::REL_WHEEL.0],
            1
        )]
    );
    assert_eq!(
        tables.dial(WHEEL_DIAL, -1),
        &[AliasedEvent::new(EventKind::Key, vec![29, 12], 1)]
    );

    Ok(())
}

#[test]
fn test_relative_dial_step_value() {
    let mut mapping = MappingConfig::default();
    mapping.add_dial(WHEEL_DIAL, -1, EventKind::Relative, &[RelativeAxisCode::REL_HWHEEL.0]);
    let tables = MappingTables::from_config(&mapping, &XP_PEN_PAD_BUTTONS).unwrap();

    assert_eq!(tables.dial(WHEEL_DIAL, -1)[0].value, -1);
}

#[test]
fn test_alias_button_keys() {
    // BTN_2 is accepted in place of index 2
    let mut mapping = MappingConfig::default();
    mapping
        .buttons
        .entry(KeyCode::BTN_2.0.to_string())
        .or_default()
        .insert("1".to_string(), vec![KeyCode::KEY_Q.0]);
    let tables = MappingTables::from_config(&mapping, &XP_PEN_PAD_BUTTONS).unwrap();

    assert_eq!(
        tables.button(2),
        &[AliasedEvent::new(EventKind::Key, vec![KeyCode::KEY_Q.0], 1)]
    );
}

#[test]
fn test_empty_code_lists_skipped() {
    let mut mapping = MappingConfig::default();
    mapping.add_button(0, EventKind::Key, &[]);
    let tables = MappingTables::from_config(&mapping, &XP_PEN_PAD_BUTTONS).unwrap();

    assert!(tables.button(0).is_empty());
}

#[test]
fn test_invalid_mappings() {
    let mut mapping = MappingConfig::default();
    mapping.add_button(0, EventKind::Key, &[KeyCode::KEY_A.0]);
    mapping
        .buttons
        .entry("first".to_string())
        .or_default()
        .insert("1".to_string(), vec![30]);
    assert_eq!(
        MappingTables::from_config(&mapping, &XP_PEN_PAD_BUTTONS),
        Err(MappingError::InvalidKey {
            section: "buttons",
            key: "first".to_string()
        })
    );

    let mut mapping = MappingConfig::default();
    mapping.add_button(12, EventKind::Key, &[30]);
    assert_eq!(
        MappingTables::from_config(&mapping, &XP_PEN_PAD_BUTTONS),
        Err(MappingError::UnknownButton(12))
    );

    let mut mapping = MappingConfig::default();
    mapping
        .buttons
        .entry("0".to_string())
        .or_default()
        .insert("4".to_string(), vec![30]);
    assert_eq!(
        MappingTables::from_config(&mapping, &XP_PEN_PAD_BUTTONS),
        Err(MappingError::UnsupportedEventType(4))
    );

    let mut mapping = MappingConfig::default();
    mapping.add_dial(WHEEL_DIAL, 1, EventKind::Relative, &[0x40]);
    assert_eq!(
        MappingTables::from_config(&mapping, &XP_PEN_PAD_BUTTONS),
        Err(MappingError::CodeOutOfRange {
            kind: EventKind::Relative,
            code: 0x40
        })
    );

    let mut mapping = MappingConfig::default();
    mapping
        .dials
        .entry("8".to_string())
        .or_default()
        .entry("up".to_string())
        .or_default();
    assert!(matches!(
        MappingTables::from_config(&mapping, &XP_PEN_PAD_BUTTONS),
        Err(MappingError::InvalidKey {
            section: "dials",
            ..
        })
    ));
}

#[test]
fn test_replace_discards_previous_tables() {
    let shared = SharedMappings::new(
        MappingTables::from_config(&xp_pen_default_mapping(), &XP_PEN_PAD_BUTTONS).unwrap(),
    );
    let before = shared.snapshot();

    let mut mapping = MappingConfig::default();
    mapping.add_button(4, EventKind::Key, &[KeyCode::KEY_X.0]);
    shared.replace(MappingTables::from_config(&mapping, &XP_PEN_PAD_BUTTONS).unwrap());

    let after = shared.snapshot();
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(after.button(0).is_empty());
    assert!(after.dial(WHEEL_DIAL, 1).is_empty());
    assert_eq!(
        after.button(4),
        &[AliasedEvent::new(EventKind::Key, vec![KeyCode::KEY_X.0], 1)]
    );

    // Readers holding the old snapshot still see a complete table
    assert_eq!(before.button(0).len(), 1);
}
