use std::{io, os::fd::AsRawFd};

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisCode, AttributeSet, KeyCode, MiscCode, RelativeAxisCode, UinputAbsSetup,
};
use nix::fcntl::{FcntlArg, OFlag};

use super::VirtualIdentity;

/// Default tilt range in degrees reported by XP-Pen pens
pub const DEFAULT_MAX_TILT: i32 = 60;

/// Configuration of the virtual pen device. Coordinate and pressure ranges
/// come from the capability descriptor of the tablet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenConfig {
    pub name: String,
    pub identity: VirtualIdentity,
    pub max_width: i32,
    pub max_height: i32,
    pub max_pressure: i32,
    pub max_tilt_x: i32,
    pub max_tilt_y: i32,
}

impl PenConfig {
    pub fn new(
        name: &str,
        identity: VirtualIdentity,
        max_width: u16,
        max_height: u16,
        max_pressure: u16,
    ) -> Self {
        Self {
            name: name.to_string(),
            identity,
            max_width: max_width.into(),
            max_height: max_height.into(),
            max_pressure: max_pressure.into(),
            max_tilt_x: DEFAULT_MAX_TILT,
            max_tilt_y: DEFAULT_MAX_TILT,
        }
    }
}

/// Create the virtual pen device
pub fn create_virtual_device(config: &PenConfig) -> io::Result<VirtualDevice> {
    // Setup Key inputs
    let keys = AttributeSet::from_iter([
        KeyCode::BTN_LEFT,
        KeyCode::BTN_RIGHT,
        KeyCode::BTN_MIDDLE,
        KeyCode::BTN_SIDE,
        KeyCode::BTN_EXTRA,
        KeyCode::BTN_TOOL_PEN,
        KeyCode::BTN_TOOL_RUBBER,
        KeyCode::BTN_TOOL_BRUSH,
        KeyCode::BTN_TOOL_PENCIL,
        KeyCode::BTN_TOOL_AIRBRUSH,
        KeyCode::BTN_TOOL_MOUSE,
        KeyCode::BTN_TOOL_LENS,
        KeyCode::BTN_TOUCH,
        KeyCode::BTN_STYLUS,
        KeyCode::BTN_STYLUS2,
    ]);

    // Setup ABS inputs
    let abs_x = UinputAbsSetup::new(
        AbsoluteAxisCode::ABS_X,
        AbsInfo::new(0, 0, config.max_width, 0, 0, 0),
    );
    let abs_y = UinputAbsSetup::new(
        AbsoluteAxisCode::ABS_Y,
        AbsInfo::new(0, 0, config.max_height, 0, 0, 0),
    );
    let abs_pressure = UinputAbsSetup::new(
        AbsoluteAxisCode::ABS_PRESSURE,
        AbsInfo::new(0, 0, config.max_pressure, 0, 0, 0),
    );
    let abs_tilt_x = UinputAbsSetup::new(
        AbsoluteAxisCode::ABS_TILT_X,
        AbsInfo::new(0, -config.max_tilt_x, config.max_tilt_x, 0, 0, 0),
    );
    let abs_tilt_y = UinputAbsSetup::new(
        AbsoluteAxisCode::ABS_TILT_Y,
        AbsInfo::new(0, -config.max_tilt_y, config.max_tilt_y, 0, 0, 0),
    );

    // Auxiliary tablet axes that tablet aware applications probe for
    let aux_setup = AbsInfo::new(0, 0, 0, 0, 0, 0);
    let aux_axes = [
        AbsoluteAxisCode::ABS_Z,
        AbsoluteAxisCode::ABS_RZ,
        AbsoluteAxisCode::ABS_THROTTLE,
        AbsoluteAxisCode::ABS_WHEEL,
        AbsoluteAxisCode::ABS_DISTANCE,
        AbsoluteAxisCode::ABS_MISC,
    ]
    .map(|code| UinputAbsSetup::new(code, aux_setup));

    // Setup REL inputs
    let rels = AttributeSet::from_iter([RelativeAxisCode::REL_WHEEL]);

    // Setup MSC inputs
    let mscs = AttributeSet::from_iter([MiscCode::MSC_SERIAL]);

    // Build the device
    let mut builder = VirtualDeviceBuilder::new()?
        .name(config.name.as_str())
        .input_id(config.identity.input_id())
        .with_keys(&keys)?
        .with_relative_axes(&rels)?
        .with_msc(&mscs)?
        .with_absolute_axis(&abs_x)?
        .with_absolute_axis(&abs_y)?
        .with_absolute_axis(&abs_pressure)?
        .with_absolute_axis(&abs_tilt_x)?
        .with_absolute_axis(&abs_tilt_y)?;
    for axis in aux_axes.iter() {
        builder = builder.with_absolute_axis(axis)?;
    }
    let device = builder.build()?;

    // Writes to the pen must never block report decoding
    let raw_fd = device.as_raw_fd();
    nix::fcntl::fcntl(raw_fd, FcntlArg::F_SETFL(OFlag::O_NONBLOCK)).map_err(io::Error::from)?;

    Ok(device)
}
