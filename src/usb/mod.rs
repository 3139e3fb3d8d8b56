pub mod transfer;

use std::{fmt::Display, time::Duration};

use rusb::{Device, DeviceHandle, Direction, Recipient, RequestType, TransferType, UsbContext};

/// Timeout used for control transfers made while attaching
const CONTROL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Standard GET_DESCRIPTOR request
const REQUEST_GET_DESCRIPTOR: u8 = 0x06;
/// String descriptor type
const DESCRIPTOR_TYPE_STRING: u16 = 0x03;

/// Endpoint direction bit for device-to-host transfers
pub const ENDPOINT_IN: u8 = 0x80;
/// Endpoint direction bit for host-to-device transfers
pub const ENDPOINT_OUT: u8 = 0x00;

/// Identifies a physical USB device for as long as it stays plugged in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId {
    pub bus: u8,
    pub address: u8,
}

impl DeviceId {
    pub fn new(bus: u8, address: u8) -> Self {
        Self { bus, address }
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "usb://{:03}-{:03}", self.bus, self.address)
    }
}

impl<T: UsbContext> From<&Device<T>> for DeviceId {
    fn from(device: &Device<T>) -> Self {
        Self::new(device.bus_number(), device.address())
    }
}

/// Interrupt IN endpoint of a USB interface that tablet reports arrive on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptEndpoint {
    pub interface: u8,
    pub address: u8,
    pub max_packet_size: u16,
}

/// Returns the first interrupt IN endpoint of every interface of the active
/// configuration of the given device.
pub fn interrupt_endpoints<T: UsbContext>(
    device: &Device<T>,
) -> Result<Vec<InterruptEndpoint>, rusb::Error> {
    let config = device.active_config_descriptor()?;
    let mut endpoints = Vec::new();
    for interface in config.interfaces() {
        for descriptor in interface.descriptors() {
            let endpoint = descriptor.endpoint_descriptors().find(|endpoint| {
                endpoint.transfer_type() == TransferType::Interrupt
                    && endpoint.direction() == Direction::In
            });
            if let Some(endpoint) = endpoint {
                endpoints.push(InterruptEndpoint {
                    interface: descriptor.interface_number(),
                    address: endpoint.address(),
                    max_packet_size: endpoint.max_packet_size(),
                });
                break;
            }
        }
    }

    Ok(endpoints)
}

/// The USB operations the driver needs from a physical tablet. Implemented
/// for [rusb::DeviceHandle]; tests substitute an in-memory transport.
pub trait Transport: Send + Sync {
    /// Read the raw bytes of the string descriptor at the given index,
    /// including the two byte descriptor header. Returns the number of bytes
    /// read.
    fn read_string_descriptor(
        &self,
        index: u8,
        language: u16,
        buf: &mut [u8],
    ) -> Result<usize, rusb::Error>;

    /// Blocking interrupt write. Returns the number of bytes written.
    fn write_interrupt(
        &self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error>;

    /// Blocking interrupt read. Returns the number of bytes read.
    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error>;
}

impl<T: UsbContext> Transport for DeviceHandle<T> {
    fn read_string_descriptor(
        &self,
        index: u8,
        language: u16,
        buf: &mut [u8],
    ) -> Result<usize, rusb::Error> {
        let request_type =
            rusb::request_type(Direction::In, RequestType::Standard, Recipient::Device);
        self.read_control(
            request_type,
            REQUEST_GET_DESCRIPTOR,
            (DESCRIPTOR_TYPE_STRING << 8) | u16::from(index),
            language,
            buf,
            CONTROL_TIMEOUT,
        )
    }

    fn write_interrupt(
        &self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        DeviceHandle::write_interrupt(self, endpoint, data, timeout)
    }

    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        DeviceHandle::read_interrupt(self, endpoint, buf, timeout)
    }
}
