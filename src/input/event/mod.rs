pub mod evdev;

use std::fmt::Display;

use ::evdev::{EventType, InputEvent};

/// The kinds of virtual input events a physical pad control can be mapped to.
/// The numeric values match the kernel event type numbers used as keys in the
/// mapping configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Key,
    Relative,
    Absolute,
}

impl EventKind {
    /// Returns the evdev [EventType] for this kind of event
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::Key => EventType::KEY,
            EventKind::Relative => EventType::RELATIVE,
            EventKind::Absolute => EventType::ABSOLUTE,
        }
    }

    /// Key-style events are level events that must be explicitly released.
    pub fn is_key(&self) -> bool {
        matches!(self, EventKind::Key)
    }

    /// Largest code (inclusive) the kernel accepts for this kind of event.
    pub fn max_code(&self) -> u16 {
        match self {
            EventKind::Key => 0x2ff,
            EventKind::Relative => 0x0f,
            EventKind::Absolute => 0x3f,
        }
    }
}

impl TryFrom<u16> for EventKind {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            value if value == EventType::KEY.0 => Ok(EventKind::Key),
            value if value == EventType::RELATIVE.0 => Ok(EventKind::Relative),
            value if value == EventType::ABSOLUTE.0 => Ok(EventKind::Absolute),
            value => Err(value),
        }
    }
}

impl From<EventKind> for u16 {
    fn from(kind: EventKind) -> Self {
        kind.event_type().0
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Key => write!(f, "EV_KEY"),
            EventKind::Relative => write!(f, "EV_REL"),
            EventKind::Absolute => write!(f, "EV_ABS"),
        }
    }
}

/// A configured virtual event that a physical control triggers. A single
/// aliased event can carry several codes to express a chord (e.g. Ctrl+S),
/// in which case every code is emitted in order with the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasedEvent {
    pub kind: EventKind,
    pub codes: Vec<u16>,
    /// Value emitted when the action fires as-is
    pub value: i32,
}

impl AliasedEvent {
    pub fn new(kind: EventKind, codes: Vec<u16>, value: i32) -> Self {
        Self { kind, codes, value }
    }

    /// Returns the evdev events for this action using its configured value
    pub fn events(&self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events_with_value(self.value)
    }

    /// Returns the evdev events for this action with the given value. Used to
    /// express presses (1) and releases (0) of key-style actions.
    pub fn events_with_value(&self, value: i32) -> impl Iterator<Item = InputEvent> + '_ {
        let event_type = self.kind.event_type().0;
        self.codes
            .iter()
            .map(move |code| InputEvent::new(event_type, *code, value))
    }
}
