use std::io;

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AttributeSet, KeyCode, RelativeAxisCode,
};

use super::VirtualIdentity;

/// Configuration of the virtual pointer used by tablets that also expose a
/// mouse emulation interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerConfig {
    pub name: String,
    pub identity: VirtualIdentity,
    pub wheel_max: i32,
}

impl PointerConfig {
    pub fn new(name: &str, identity: VirtualIdentity) -> Self {
        Self {
            name: name.to_string(),
            identity,
            wheel_max: 1,
        }
    }
}

/// Create the virtual pointer device
pub fn create_virtual_device(config: &PointerConfig) -> io::Result<VirtualDevice> {
    let device = VirtualDeviceBuilder::new()?
        .name(config.name.as_str())
        .input_id(config.identity.input_id())
        .with_keys(&AttributeSet::from_iter([KeyCode::BTN_LEFT]))?
        .with_relative_axes(&AttributeSet::from_iter([
            RelativeAxisCode::REL_X,
            RelativeAxisCode::REL_Y,
            RelativeAxisCode::REL_WHEEL,
        ]))?
        .build()?;

    Ok(device)
}
