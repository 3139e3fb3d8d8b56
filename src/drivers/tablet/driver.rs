use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use thiserror::Error;

use crate::{
    config::DeviceConfig,
    drivers::Profile,
    input::{
        mapping::{MappingTables, SharedMappings},
        target::{PadConfig, TargetDevice, TargetError, TargetFactory, TargetKind},
    },
    usb::{
        transfer::{self, TransferError, TransferMessage, TransferResponse},
        DeviceId, Transport, ENDPOINT_OUT,
    },
};

use super::{
    decoder::{translate_digitizer, translate_frame, FrameState},
    hid_report::{DescriptorReport, DigitizerReport, FrameReport, ReportError},
};

/// String descriptor index of the capability descriptor
pub const DESCRIPTOR_INDEX: u8 = 0x64;
/// Language id the capability descriptor is requested in
pub const DESCRIPTOR_LANGUAGE: u16 = 0x0409;
/// Largest possible string descriptor
const DESCRIPTOR_BUFFER_SIZE: usize = 255;
/// Packet that switches the tablet from its generic HID reports to the
/// vendor report stream
pub const INIT_PACKET: [u8; 8] = [0x02, 0xb0, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00];

/// Errors of the tablet driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Product id {0:#06x} is not handled by this driver")]
    NotHandled(u16),
    #[error("Device {0} already has a virtual {1}")]
    AlreadyAttached(DeviceId, TargetKind),
    #[error("Device {0} is not attached")]
    NotAttached(DeviceId),
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
    #[error("Invalid report: {0}")]
    Report(#[from] ReportError),
    #[error("Virtual device error: {0}")]
    Target(#[from] TargetError),
}

/// Virtual devices and decoder state of one attached physical device
#[derive(Default)]
struct DeviceState {
    pen: Option<Box<dyn TargetDevice>>,
    pad: Option<Box<dyn TargetDevice>>,
    /// Held for the lifetime of the attachment only. Pointer reports reach
    /// userspace through the kernel's mouse emulation and are not decoded or
    /// forwarded here.
    pointer: Option<Box<dyn TargetDevice>>,
    frame: FrameState,
}

impl DeviceState {
    fn has(&self, kind: TargetKind) -> bool {
        match kind {
            TargetKind::Pen => self.pen.is_some(),
            TargetKind::Pad => self.pad.is_some(),
            TargetKind::Pointer => self.pointer.is_some(),
        }
    }

    fn insert(&mut self, kind: TargetKind, device: Box<dyn TargetDevice>) {
        let slot = match kind {
            TargetKind::Pen => &mut self.pen,
            TargetKind::Pad => &mut self.pad,
            TargetKind::Pointer => &mut self.pointer,
        };
        *slot = Some(device);
    }
}

/// Registry record of an attached physical device
struct DeviceEntry {
    product_id: u16,
    transport: Arc<dyn Transport>,
    state: Arc<Mutex<DeviceState>>,
}

/// Driver shared by every physical tablet of one [Profile]. It owns the
/// mapping tables of the model and the virtual devices of each attached
/// tablet.
pub struct TabletDriver {
    profile: Profile,
    factory: Arc<dyn TargetFactory>,
    pad_config: PadConfig,
    mappings: SharedMappings,
    config: RwLock<DeviceConfig>,
    devices: Mutex<HashMap<DeviceId, DeviceEntry>>,
}

impl TabletDriver {
    /// Create a new driver for the given profile using its default mapping
    pub fn new(profile: Profile, factory: Arc<dyn TargetFactory>) -> Self {
        let driver = Self {
            profile,
            factory,
            pad_config: profile.pad_config(),
            mappings: SharedMappings::default(),
            config: RwLock::new(DeviceConfig::default()),
            devices: Mutex::new(HashMap::new()),
        };
        driver.set_config(DeviceConfig::default());
        driver
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Human readable name of the given product id
    pub fn product_name(&self, product_id: u16) -> &'static str {
        self.profile.product_name(product_id)
    }

    /// Hardware product ids this driver answers to
    pub fn handled_product_ids(&self) -> &'static [u16] {
        self.profile.product_ids()
    }

    /// Handshake value that unlocks the vendor report stream
    pub fn init_selector(&self) -> u8 {
        self.profile.init_selector()
    }

    /// Send the init packet that unlocks the vendor report stream
    pub fn initialize(&self, transport: &dyn Transport) -> Result<(), DriverError> {
        let endpoint = self.init_selector() | ENDPOINT_OUT;
        log::debug!("Sending init packet to endpoint {endpoint:#04x}");
        transport.write_interrupt(endpoint, &INIT_PACKET, transfer::TRANSFER_TIMEOUT)?;
        Ok(())
    }

    /// Create the virtual devices that belong to the given interface of a
    /// physical tablet. Returns the kinds of devices that were created, which
    /// is empty for interfaces this model does not use. If any device cannot
    /// be created, none of them are kept.
    pub fn attach(
        &self,
        id: DeviceId,
        product_id: u16,
        transport: Arc<dyn Transport>,
        interface: u8,
    ) -> Result<Vec<TargetKind>, DriverError> {
        if !self.profile.product_ids().contains(&product_id) {
            return Err(DriverError::NotHandled(product_id));
        }
        let kinds = self.profile.targets_for_interface(interface);
        if kinds.is_empty() {
            log::debug!("Nothing to attach for {id} on interface {interface}");
            return Ok(Vec::new());
        }
        if let Some(state) = self.state_of(id) {
            let state = state.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(kind) = kinds.iter().find(|kind| state.has(**kind)) {
                return Err(DriverError::AlreadyAttached(id, *kind));
            }
        }

        let descriptor = if kinds.contains(&TargetKind::Pen) {
            Some(read_descriptor(transport.as_ref())?)
        } else {
            None
        };

        let mut created = Vec::with_capacity(kinds.len());
        for kind in kinds.iter() {
            let device = match kind {
                TargetKind::Pen => {
                    let Some(descriptor) = descriptor.as_ref() else {
                        continue;
                    };
                    self.factory.create_pen(&self.profile.pen_config(descriptor))
                }
                TargetKind::Pad => self.factory.create_pad(&self.pad_config),
                TargetKind::Pointer => self.factory.create_pointer(&self.profile.pointer_config()),
            };
            // Devices created so far are dropped, and destroyed, on error
            created.push((*kind, device?));
        }

        let mut devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = devices.entry(id).or_insert_with(|| DeviceEntry {
            product_id,
            transport,
            state: Arc::new(Mutex::new(DeviceState::default())),
        });
        let mut state = entry.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((kind, _)) = created.iter().find(|(kind, _)| state.has(*kind)) {
            return Err(DriverError::AlreadyAttached(id, *kind));
        }
        let kinds = created.iter().map(|(kind, _)| *kind).collect();
        for (kind, device) in created {
            state.insert(kind, device);
        }

        log::info!(
            "Attached {} ({id}) on interface {interface}",
            self.product_name(product_id)
        );
        Ok(kinds)
    }

    /// Destroy every virtual device of the given tablet. Returns whether the
    /// tablet was attached.
    pub fn detach(&self, id: DeviceId) -> bool {
        let entry = self
            .devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        match entry {
            Some(entry) => {
                log::info!("Detached {} ({id})", self.product_name(entry.product_id));
                true
            }
            None => false,
        }
    }

    /// Detach every tablet
    pub fn detach_all(&self) {
        let entries: Vec<_> = self
            .devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (id, entry) in entries {
            log::info!("Detached {} ({id})", self.product_name(entry.product_id));
        }
    }

    pub fn is_attached(&self, id: DeviceId) -> bool {
        self.state_of(id).is_some()
    }

    /// Returns the ids of all attached tablets
    pub fn attached_devices(&self) -> Vec<DeviceId> {
        let devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<DeviceId> = devices.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Decode one interrupt report of the given tablet and write the
    /// resulting events to its virtual devices. Reports with a foreign
    /// report id are ignored.
    pub fn decode_report(&self, id: DeviceId, report: &[u8]) -> Result<(), DriverError> {
        let state = self.state_of(id).ok_or(DriverError::NotAttached(id))?;

        let layout = self.profile.layout();
        let (tag, sub_type) = match report {
            [tag, sub_type, ..] => (*tag, *sub_type),
            _ => {
                return Err(ReportError::TooShort {
                    expected: 2,
                    actual: report.len(),
                }
                .into())
            }
        };
        if tag != layout.report_id {
            log::trace!("Ignoring report {tag:#04x} from {id}");
            return Ok(());
        }

        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);

        if layout.is_digitizer(sub_type) {
            let report = DigitizerReport::from_bytes(report)?;
            log::trace!("Digitizer report: {report:?}");
            let events = translate_digitizer(&report);
            if let Some(pen) = state.pen.as_mut() {
                pen.write_events(&events)?;
            }
        }

        if layout.is_frame(sub_type) {
            let report = FrameReport::from_bytes(report)?;
            log::trace!("Frame report: {report:?}");
            let tables = self.mappings.snapshot();
            let DeviceState { pad, frame, .. } = &mut *state;
            let events = translate_frame(&report, &tables, frame);
            if let Some(pad) = pad.as_mut() {
                pad.write_events(&self.pad_config.bound_wheel_events(&events))?;
            }
        }

        Ok(())
    }

    /// Forward a message to every attached tablet it is addressed to
    pub fn handle_message(
        &self,
        message: &TransferMessage,
    ) -> Result<Vec<TransferResponse>, TransferError> {
        let transports: Vec<Arc<dyn Transport>> = {
            let devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
            devices
                .values()
                .filter(|entry| entry.product_id == message.device)
                .map(|entry| entry.transport.clone())
                .collect()
        };

        transfer::forward(message, &transports).inspect_err(|e| {
            log::error!("Failed to forward message to {:#06x}: {e}", message.device);
        })
    }

    /// Returns the effective configuration, including synthesized defaults
    pub fn config(&self) -> DeviceConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply the given configuration. A missing or invalid mapping is
    /// replaced by the model default. Returns the effective configuration.
    pub fn set_config(&self, mut config: DeviceConfig) -> DeviceConfig {
        let pad_buttons = self.profile.pad_buttons();
        let tables = match config.mapping.as_ref() {
            Some(mapping) => match MappingTables::from_config(mapping, pad_buttons) {
                Ok(tables) => Some(tables),
                Err(e) => {
                    log::warn!("Invalid mapping for {}, using defaults: {e}", self.profile);
                    None
                }
            },
            None => {
                log::debug!("No mapping for {}, using defaults", self.profile);
                None
            }
        };

        let tables = match tables {
            Some(tables) => tables,
            None => {
                let mapping = self.profile.default_mapping();
                let tables = MappingTables::from_config(&mapping, pad_buttons)
                    .inspect_err(|e| log::error!("Invalid default mapping: {e}"))
                    .unwrap_or_default();
                config.mapping = Some(mapping);
                tables
            }
        };

        self.mappings.replace(tables);
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config.clone();
        log::info!("Applied configuration for {}", self.profile);

        config
    }

    /// Apply a configuration given as a JSON document. A document that cannot
    /// be parsed keeps its other top-level fields but gets the default
    /// mapping. Returns the effective document.
    pub fn set_config_value(&self, value: serde_json::Value) -> serde_json::Value {
        let config = match DeviceConfig::from_value(value.clone()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Malformed configuration for {}: {e}", self.profile);
                let mut extra = match value {
                    serde_json::Value::Object(map) => map,
                    _ => serde_json::Map::new(),
                };
                extra.remove("mapping");
                DeviceConfig {
                    mapping: None,
                    extra,
                }
            }
        };

        self.set_config(config).to_value()
    }

    /// Returns the current mapping tables
    pub fn mappings(&self) -> Arc<MappingTables> {
        self.mappings.snapshot()
    }

    fn state_of(&self, id: DeviceId) -> Option<Arc<Mutex<DeviceState>>> {
        let devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        devices.get(&id).map(|entry| entry.state.clone())
    }
}

/// Read and unpack the capability descriptor of a tablet
fn read_descriptor(transport: &dyn Transport) -> Result<DescriptorReport, DriverError> {
    let mut buf = [0; DESCRIPTOR_BUFFER_SIZE];
    let read = transport
        .read_string_descriptor(DESCRIPTOR_INDEX, DESCRIPTOR_LANGUAGE, &mut buf)
        .inspect_err(|e| log::error!("Could not read capability descriptor: {e}"))?;
    let descriptor = DescriptorReport::from_bytes(&buf[..read.min(buf.len())])?;
    log::debug!("Capability descriptor: {descriptor:?}");
    Ok(descriptor)
}
