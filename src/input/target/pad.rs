use std::{io, os::fd::AsRawFd};

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AttributeSet, EventType, InputEvent, KeyCode, RelativeAxisCode,
};
use nix::fcntl::{FcntlArg, OFlag};

use super::VirtualIdentity;

/// Configuration of the virtual pad device that carries the pad buttons and
/// whatever keyboard or wheel events they are mapped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadConfig {
    pub name: String,
    pub identity: VirtualIdentity,
    /// Key codes of the physical pad buttons, in button index order
    pub buttons: Vec<KeyCode>,
    pub has_wheel: bool,
    pub has_hwheel: bool,
    /// Largest magnitude of a single wheel event (one detent per event)
    pub wheel_max: i32,
    pub hwheel_max: i32,
}

impl PadConfig {
    pub fn new(name: &str, identity: VirtualIdentity, buttons: &[KeyCode]) -> Self {
        Self {
            name: name.to_string(),
            identity,
            buttons: buttons.to_vec(),
            has_wheel: true,
            has_hwheel: true,
            wheel_max: 1,
            hwheel_max: 1,
        }
    }

    /// Clamp wheel events to the range this pad declares
    pub fn bound_wheel_events(&self, events: &[InputEvent]) -> Vec<InputEvent> {
        events
            .iter()
            .map(|event| {
                if event.event_type() != EventType::RELATIVE {
                    return *event;
                }
                let max = match RelativeAxisCode(event.code()) {
                    RelativeAxisCode::REL_WHEEL => self.wheel_max,
                    RelativeAxisCode::REL_HWHEEL => self.hwheel_max,
                    _ => return *event,
                };
                let value = event.value().clamp(-max, max);
                InputEvent::new(event.event_type().0, event.code(), value)
            })
            .collect()
    }
}

/// Create the virtual pad device
pub fn create_virtual_device(config: &PadConfig) -> io::Result<VirtualDevice> {
    // Pad buttons, plus every keyboard key since any of them can be a mapping
    // target.
    let mut keys = AttributeSet::<KeyCode>::new();
    for button in config.buttons.iter() {
        keys.insert(*button);
    }
    for code in KeyCode::KEY_RESERVED.0..=KeyCode::KEY_MICMUTE.0 {
        keys.insert(KeyCode::new(code));
    }

    // Setup REL inputs
    let mut rels = AttributeSet::<RelativeAxisCode>::new();
    rels.insert(RelativeAxisCode::REL_X);
    rels.insert(RelativeAxisCode::REL_Y);
    if config.has_wheel {
        rels.insert(RelativeAxisCode::REL_WHEEL);
    }
    if config.has_hwheel {
        rels.insert(RelativeAxisCode::REL_HWHEEL);
    }

    let device = VirtualDeviceBuilder::new()?
        .name(config.name.as_str())
        .input_id(config.identity.input_id())
        .with_keys(&keys)?
        .with_relative_axes(&rels)?
        .build()?;

    let raw_fd = device.as_raw_fd();
    nix::fcntl::fcntl(raw_fd, FcntlArg::F_SETFL(OFlag::O_NONBLOCK)).map_err(io::Error::from)?;

    Ok(device)
}
