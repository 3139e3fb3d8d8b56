//! XP-Pen Artist 13.3 Pro pen display
use crate::input::target::{TargetKind, VirtualIdentity};

/// Product ID
pub const PID: u16 = 0x092b;
/// Marketing name, also used for the virtual pen
pub const NAME: &str = "XP-Pen Artist 13.3 Pro";
/// Value that unlocks the vendor report stream
pub const INIT_SELECTOR: u8 = 0x02;
/// Interface carrying both pen and pad reports
pub const PEN_INTERFACE: u8 = 2;

/// Identity of the virtual devices created for this model
pub const IDENTITY: VirtualIdentity = VirtualIdentity {
    vendor_id: 0x28bd,
    product_id: 0xf92b,
    version: 0x0001,
};

/// Returns the virtual devices that belong to the given USB interface
pub fn targets_for_interface(interface: u8) -> &'static [TargetKind] {
    match interface {
        PEN_INTERFACE => &[TargetKind::Pen, TargetKind::Pad],
        _ => &[],
    }
}
