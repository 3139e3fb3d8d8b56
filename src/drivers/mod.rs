//! Profiles of every supported tablet model. A physical device is matched to
//! a [Profile] by its product id; all models share the driver in [tablet].
pub mod artist_13_3_pro;
pub mod deco_pro_medium;
pub mod tablet;

use std::fmt::Display;

use evdev::KeyCode;
use packed_struct::types::SizedInteger;

use crate::{
    config::MappingConfig,
    input::target::{PadConfig, PenConfig, PointerConfig, TargetKind, VirtualIdentity},
};

use tablet::hid_report::{DescriptorReport, ReportLayout};

/// Name reported for product ids no profile answers to
pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown XP-Pen Device";

/// Supported tablet models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    Artist133Pro,
    DecoProMedium,
}

impl Profile {
    pub const ALL: [Profile; 2] = [Profile::Artist133Pro, Profile::DecoProMedium];

    /// Returns the profile that answers to the given hardware product id
    pub fn from_product_id(product_id: u16) -> Option<Profile> {
        Self::ALL
            .into_iter()
            .find(|profile| profile.product_ids().contains(&product_id))
    }

    /// Hardware product ids this profile answers to
    pub fn product_ids(&self) -> &'static [u16] {
        match self {
            Profile::Artist133Pro => &[artist_13_3_pro::PID],
            Profile::DecoProMedium => &[deco_pro_medium::PID],
        }
    }

    /// Product id the model's configuration is stored under
    pub fn primary_product_id(&self) -> u16 {
        match self {
            Profile::Artist133Pro => artist_13_3_pro::PID,
            Profile::DecoProMedium => deco_pro_medium::PID,
        }
    }

    /// Human readable name of the given product id, or an "unknown device"
    /// fallback when it does not belong to this profile.
    pub fn product_name(&self, product_id: u16) -> &'static str {
        if !self.product_ids().contains(&product_id) {
            return UNKNOWN_PRODUCT_NAME;
        }
        self.name()
    }

    /// Name of the model, used for the virtual devices
    pub fn name(&self) -> &'static str {
        match self {
            Profile::Artist133Pro => artist_13_3_pro::NAME,
            Profile::DecoProMedium => deco_pro_medium::NAME,
        }
    }

    /// Handshake value that unlocks the vendor report stream
    pub fn init_selector(&self) -> u8 {
        match self {
            Profile::Artist133Pro => artist_13_3_pro::INIT_SELECTOR,
            Profile::DecoProMedium => deco_pro_medium::INIT_SELECTOR,
        }
    }

    pub fn layout(&self) -> ReportLayout {
        match self {
            Profile::Artist133Pro | Profile::DecoProMedium => tablet::XP_PEN_LAYOUT,
        }
    }

    /// Ordered key codes of the physical pad buttons
    pub fn pad_buttons(&self) -> &'static [KeyCode] {
        match self {
            Profile::Artist133Pro | Profile::DecoProMedium => &tablet::XP_PEN_PAD_BUTTONS,
        }
    }

    /// Virtual devices to create when the given interface is attached
    pub fn targets_for_interface(&self, interface: u8) -> &'static [TargetKind] {
        match self {
            Profile::Artist133Pro => artist_13_3_pro::targets_for_interface(interface),
            Profile::DecoProMedium => deco_pro_medium::targets_for_interface(interface),
        }
    }

    /// Identity presented by the virtual devices of this model
    pub fn identity(&self) -> VirtualIdentity {
        match self {
            Profile::Artist133Pro => artist_13_3_pro::IDENTITY,
            Profile::DecoProMedium => deco_pro_medium::IDENTITY,
        }
    }

    pub fn default_mapping(&self) -> MappingConfig {
        match self {
            Profile::Artist133Pro | Profile::DecoProMedium => tablet::xp_pen_default_mapping(),
        }
    }

    /// Virtual pen sized by the capability descriptor of the tablet
    pub fn pen_config(&self, descriptor: &DescriptorReport) -> PenConfig {
        PenConfig::new(
            self.name(),
            self.identity(),
            descriptor.max_width.to_primitive(),
            descriptor.max_height.to_primitive(),
            descriptor.max_pressure.to_primitive(),
        )
    }

    pub fn pad_config(&self) -> PadConfig {
        let name = format!("{} Pad", self.name());
        PadConfig::new(&name, self.identity(), self.pad_buttons())
    }

    pub fn pointer_config(&self) -> PointerConfig {
        let name = format!("{} Pointer", self.name());
        PointerConfig::new(&name, self.identity())
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Returns every hardware product id handled by any profile
pub fn handled_product_ids() -> Vec<u16> {
    Profile::ALL
        .iter()
        .flat_map(|profile| profile.product_ids().iter().copied())
        .collect()
}

/// Human readable name of any product id
pub fn product_name(product_id: u16) -> &'static str {
    match Profile::from_product_id(product_id) {
        Some(profile) => profile.product_name(product_id),
        None => UNKNOWN_PRODUCT_NAME,
    }
}
