/// USB vendor id of XP-Pen tablets
pub const XP_PEN_VID: u16 = 0x28bd;

/// Prefix used for XDG configuration lookups
pub const CONFIG_PREFIX: &str = "tabletdriver";
