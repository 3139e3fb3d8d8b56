use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Transport, ENDPOINT_IN, ENDPOINT_OUT};

/// Timeout of every interrupt transfer made on behalf of a message
pub const TRANSFER_TIMEOUT: Duration = Duration::from_millis(1000);

/// Errors forwarding a message to a physical tablet
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Short write to endpoint {endpoint:#04x}: wrote {written} of {expected} bytes")]
    ShortWrite {
        endpoint: u8,
        written: usize,
        expected: usize,
    },
    #[error("Unexpected response length from endpoint {endpoint:#04x}: expected {expected} bytes, got {actual}")]
    ResponseLength {
        endpoint: u8,
        expected: usize,
        actual: usize,
    },
    #[error("USB transfer failed: {0}")]
    Usb(#[from] rusb::Error),
}

/// A command sent to every attached tablet of one product, usually on behalf
/// of a configuration client.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransferMessage {
    /// Hardware product id the message is addressed to
    pub device: u16,
    /// Interface number the payload is written to
    pub interface: u8,
    pub data: Vec<u8>,
    /// Interface the response is read from, if a response is expected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_interface: Option<u8>,
    /// Exact number of bytes the response must have
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_length: Option<usize>,
}

impl TransferMessage {
    fn out_endpoint(&self) -> u8 {
        self.interface | ENDPOINT_OUT
    }

    /// Returns the IN endpoint and expected length when a response is wanted
    fn response(&self) -> Option<(u8, usize)> {
        let interface = self.response_interface?;
        let length = self.response_length?;
        Some((interface | ENDPOINT_IN, length))
    }
}

/// Response read back from one physical tablet
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransferResponse {
    pub interface: u8,
    pub data: Vec<u8>,
}

/// Write the message to every given transport and collect the responses.
/// The first failure aborts the message and no responses are returned.
pub fn forward(
    message: &TransferMessage,
    transports: &[Arc<dyn Transport>],
) -> Result<Vec<TransferResponse>, TransferError> {
    let mut responses = Vec::new();
    let endpoint = message.out_endpoint();

    for transport in transports.iter() {
        let written = transport.write_interrupt(endpoint, &message.data, TRANSFER_TIMEOUT)?;
        if written != message.data.len() {
            return Err(TransferError::ShortWrite {
                endpoint,
                written,
                expected: message.data.len(),
            });
        }

        let Some((in_endpoint, length)) = message.response() else {
            continue;
        };
        let mut buf = vec![0; length];
        let read = transport.read_interrupt(in_endpoint, &mut buf, TRANSFER_TIMEOUT)?;
        if read != length {
            return Err(TransferError::ResponseLength {
                endpoint: in_endpoint,
                expected: length,
                actual: read,
            });
        }
        log::trace!("Read {read} bytes from endpoint {in_endpoint:#04x}");

        responses.push(TransferResponse {
            interface: in_endpoint & !ENDPOINT_IN,
            data: buf,
        });
    }

    Ok(responses)
}
