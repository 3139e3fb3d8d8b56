pub mod pad;
pub mod pen;
pub mod pointer;


use std::{fmt::Display, io};

use evdev::{uinput::VirtualDevice, BusType, InputEvent, InputId};
use thiserror::Error;

use crate::input::event::evdev::split_batches;

pub use pad::PadConfig;
pub use pen::PenConfig;
pub use pointer::PointerConfig;

/// Possible errors of a virtual target device
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("Unable to create virtual {kind}: {source}")]
    Create {
        kind: TargetKind,
        #[source]
        source: io::Error,
    },
    #[error("Unable to write events: {0}")]
    Write(#[from] io::Error),
}

/// The kinds of virtual devices that can be created for a tablet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Pen,
    Pad,
    Pointer,
}

impl Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Pen => write!(f, "pen"),
            TargetKind::Pad => write!(f, "pad"),
            TargetKind::Pointer => write!(f, "pointer"),
        }
    }
}

/// Identity a virtual device presents to the kernel. These are deliberately
/// different from the ids of the physical tablet so that userspace does not
/// mistake the virtual device for the real one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
}

impl VirtualIdentity {
    /// Returns the identity as an evdev [InputId] on the USB bus
    pub fn input_id(&self) -> InputId {
        InputId::new(
            BusType::BUS_USB,
            self.vendor_id,
            self.product_id,
            self.version,
        )
    }
}

/// A [TargetDevice] is any virtual input device that events can be written to.
/// Events are written as a stream in which every batch is closed by a
/// SYN_REPORT marker. The device is destroyed when it is dropped.
pub trait TargetDevice: Send {
    fn write_events(&mut self, events: &[InputEvent]) -> Result<(), TargetError>;
}

impl TargetDevice for VirtualDevice {
    fn write_events(&mut self, events: &[InputEvent]) -> Result<(), TargetError> {
        // Emitting a batch through uinput appends the SYN_REPORT itself
        for batch in split_batches(events) {
            self.emit(batch)?;
        }
        Ok(())
    }
}

/// Creates the virtual devices for an attached tablet
pub trait TargetFactory: Send + Sync {
    fn create_pen(&self, config: &PenConfig) -> Result<Box<dyn TargetDevice>, TargetError>;
    fn create_pad(&self, config: &PadConfig) -> Result<Box<dyn TargetDevice>, TargetError>;
    fn create_pointer(&self, config: &PointerConfig)
        -> Result<Box<dyn TargetDevice>, TargetError>;
}

/// [TargetFactory] that creates real kernel devices through uinput
#[derive(Debug, Default, Clone, Copy)]
pub struct UinputFactory;

impl TargetFactory for UinputFactory {
    fn create_pen(&self, config: &PenConfig) -> Result<Box<dyn TargetDevice>, TargetError> {
        log::debug!("Creating virtual pen '{}'", config.name);
        let device = pen::create_virtual_device(config).map_err(|source| TargetError::Create {
            kind: TargetKind::Pen,
            source,
        })?;
        Ok(Box::new(device))
    }

    fn create_pad(&self, config: &PadConfig) -> Result<Box<dyn TargetDevice>, TargetError> {
        log::debug!("Creating virtual pad '{}'", config.name);
        let device = pad::create_virtual_device(config).map_err(|source| TargetError::Create {
            kind: TargetKind::Pad,
            source,
        })?;
        Ok(Box::new(device))
    }

    fn create_pointer(
        &self,
        config: &PointerConfig,
    ) -> Result<Box<dyn TargetDevice>, TargetError> {
        log::debug!("Creating virtual pointer '{}'", config.name);
        let device =
            pointer::create_virtual_device(config).map_err(|source| TargetError::Create {
                kind: TargetKind::Pointer,
                source,
            })?;
        Ok(Box::new(device))
    }
}
