use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, PoisonError, RwLock},
};

use evdev::{KeyCode, RelativeAxisCode};
use thiserror::Error;

use crate::{
    config::{EventCodes, MappingConfig},
    input::event::{AliasedEvent, EventKind},
};

/// Dial id of the rotary wheel found on XP-Pen pads. Dials are identified by
/// the relative axis they conceptually drive.
pub const WHEEL_DIAL: u16 = RelativeAxisCode::REL_WHEEL.0;

/// Value used for pressed key-style actions
const PRESSED: i32 = 1;

/// Errors produced while validating a [MappingConfig]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("Invalid {section} key '{key}'")]
    InvalidKey { section: &'static str, key: String },
    #[error("Button {0} does not exist on this device")]
    UnknownButton(usize),
    #[error("Unsupported event type {0}")]
    UnsupportedEventType(u16),
    #[error("Code {code} is out of range for {kind}")]
    CodeOutOfRange { kind: EventKind, code: u16 },
}

/// Lookup tables built from a [MappingConfig]. Tables are immutable once
/// built; a configuration change builds a new set and swaps it in through
/// [SharedMappings].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MappingTables {
    button_count: usize,
    buttons: HashMap<usize, Vec<AliasedEvent>>,
    dials: HashMap<(u16, i32), Vec<AliasedEvent>>,
}

impl MappingTables {
    /// Validate the given configuration and flatten it into lookup tables.
    /// `pad_buttons` is the ordered list of physical pad button aliases of the
    /// device, which bounds the valid button indices. Button keys may also be
    /// given as the alias code itself (e.g. "256" for BTN_0).
    pub fn from_config(
        config: &MappingConfig,
        pad_buttons: &[KeyCode],
    ) -> Result<Self, MappingError> {
        let mut buttons = HashMap::new();
        for (key, events) in config.buttons.iter() {
            let index = parse_button_key(key, pad_buttons)?;
            let actions = parse_events(events, |_| PRESSED)?;
            buttons.insert(index, actions);
        }

        let mut dials = HashMap::new();
        for (dial_key, steps) in config.dials.iter() {
            let dial = dial_key
                .parse::<u16>()
                .map_err(|_| MappingError::InvalidKey {
                    section: "dials",
                    key: dial_key.clone(),
                })?;
            for (step_key, events) in steps.iter() {
                let step = step_key
                    .parse::<i32>()
                    .map_err(|_| MappingError::InvalidKey {
                        section: "dials",
                        key: step_key.clone(),
                    })?;
                // Dials never report a release, so key-style actions always
                // fire as a press and are released by the decoder.
                let actions = parse_events(events, |kind| {
                    if kind.is_key() {
                        PRESSED
                    } else {
                        step
                    }
                })?;
                dials.insert((dial, step), actions);
            }
        }

        Ok(Self {
            button_count: pad_buttons.len(),
            buttons,
            dials,
        })
    }

    /// Number of physical pad buttons these tables were built for
    pub fn button_count(&self) -> usize {
        self.button_count
    }

    /// Returns the actions mapped to the given pad button index
    pub fn button(&self, index: usize) -> &[AliasedEvent] {
        self.buttons.get(&index).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the actions mapped to one detent of the given dial
    pub fn dial(&self, dial: u16, step: i32) -> &[AliasedEvent] {
        self.dials
            .get(&(dial, step))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Resolve a button key into a physical button index
fn parse_button_key(key: &str, pad_buttons: &[KeyCode]) -> Result<usize, MappingError> {
    let value = key.parse::<usize>().map_err(|_| MappingError::InvalidKey {
        section: "buttons",
        key: key.to_string(),
    })?;
    if value < pad_buttons.len() {
        return Ok(value);
    }
    pad_buttons
        .iter()
        .position(|alias| alias.0 as usize == value)
        .ok_or(MappingError::UnknownButton(value))
}

/// Turn an event type -> codes section into an ordered list of actions. The
/// value of each action is chosen by the given closure.
fn parse_events<F>(events: &EventCodes, value: F) -> Result<Vec<AliasedEvent>, MappingError>
where
    F: Fn(EventKind) -> i32,
{
    // Order by event type rather than by the string form of the key
    let mut by_kind = BTreeMap::new();
    for (key, codes) in events.iter() {
        let event_type = key.parse::<u16>().map_err(|_| MappingError::InvalidKey {
            section: "event type",
            key: key.clone(),
        })?;
        let kind = EventKind::try_from(event_type).map_err(MappingError::UnsupportedEventType)?;
        if let Some(code) = codes.iter().find(|code| **code > kind.max_code()) {
            return Err(MappingError::CodeOutOfRange { kind, code: *code });
        }
        by_kind.insert(kind, codes);
    }

    let actions = by_kind
        .into_iter()
        .filter(|(_, codes)| !codes.is_empty())
        .map(|(kind, codes)| AliasedEvent::new(kind, codes.clone(), value(kind)))
        .collect();

    Ok(actions)
}

/// Mapping tables shared between the configuration path (rare writer) and
/// the report decoding path (frequent readers). Readers take a snapshot of
/// the current tables and never observe a partially rebuilt set.
#[derive(Debug, Default)]
pub struct SharedMappings {
    current: RwLock<Arc<MappingTables>>,
}

impl SharedMappings {
    pub fn new(tables: MappingTables) -> Self {
        Self {
            current: RwLock::new(Arc::new(tables)),
        }
    }

    /// Returns the current tables
    pub fn snapshot(&self) -> Arc<MappingTables> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current tables with the given ones
    pub fn replace(&self, tables: MappingTables) {
        let tables = Arc::new(tables);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = tables;
    }
}
