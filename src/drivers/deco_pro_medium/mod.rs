//! XP-Pen Deco Pro Medium tablet. Besides pen and pad it exposes a mouse
//! emulation interface which gets its own virtual pointer.
use crate::input::target::{TargetKind, VirtualIdentity};

/// Product ID
pub const PID: u16 = 0x0904;
pub const NAME: &str = "XP-Pen Deco Pro M";
pub const INIT_SELECTOR: u8 = 0x02;
pub const PEN_INTERFACE: u8 = 2;
pub const POINTER_INTERFACE: u8 = 0;

pub const IDENTITY: VirtualIdentity = VirtualIdentity {
    vendor_id: 0x28bd,
    product_id: 0xf904,
    version: 0x0001,
};

pub fn targets_for_interface(interface: u8) -> &'static [TargetKind] {
    match interface {
        PEN_INTERFACE => &[TargetKind::Pen, TargetKind::Pad],
        POINTER_INTERFACE => &[TargetKind::Pointer],
        _ => &[],
    }
}
