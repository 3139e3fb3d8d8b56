//! In-memory stand-ins for the USB transport and the uinput factory
#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use evdev::InputEvent;
use tabletdriver::{
    input::target::{
        PadConfig, PenConfig, PointerConfig, TargetDevice, TargetError, TargetFactory, TargetKind,
    },
    usb::Transport,
};

/// Capability descriptor of an Artist 13.3 Pro: 54464 x 30672, 8191 levels
pub const ARTIST_DESCRIPTOR: [u8; 12] = [
    0x0c, 0x03, 0xc0, 0xd4, 0xd0, 0x77, 0x00, 0x00, 0xff, 0x1f, 0x00, 0x00,
];

pub type Triple = (u16, u16, i32);

/// Transport that serves a fixed descriptor and records every write
#[derive(Debug, Default)]
pub struct FakeTransport {
    pub descriptor: Vec<u8>,
    pub descriptor_error: Option<rusb::Error>,
    pub writes: Mutex<Vec<(u8, Vec<u8>)>>,
    /// Responses served by interrupt reads, in order
    pub responses: Mutex<VecDeque<Vec<u8>>>,
    /// Number of bytes dropped from every write
    pub short_by: usize,
    pub write_error: Option<rusb::Error>,
}

impl FakeTransport {
    pub fn new(descriptor: &[u8]) -> Self {
        Self {
            descriptor: descriptor.to_vec(),
            ..Default::default()
        }
    }

    pub fn with_responses(self, responses: &[&[u8]]) -> Self {
        *self.responses.lock().unwrap() = responses.iter().map(|r| r.to_vec()).collect();
        self
    }

    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn read_string_descriptor(
        &self,
        _index: u8,
        _language: u16,
        buf: &mut [u8],
    ) -> Result<usize, rusb::Error> {
        if let Some(e) = self.descriptor_error {
            return Err(e);
        }
        let len = self.descriptor.len().min(buf.len());
        buf[..len].copy_from_slice(&self.descriptor[..len]);
        Ok(len)
    }

    fn write_interrupt(
        &self,
        endpoint: u8,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        if let Some(e) = self.write_error {
            return Err(e);
        }
        self.writes.lock().unwrap().push((endpoint, data.to_vec()));
        Ok(data.len().saturating_sub(self.short_by))
    }

    fn read_interrupt(
        &self,
        _endpoint: u8,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        let Some(response) = self.responses.lock().unwrap().pop_front() else {
            return Err(rusb::Error::Timeout);
        };
        let len = response.len().min(buf.len());
        buf[..len].copy_from_slice(&response[..len]);
        Ok(len)
    }
}

/// Everything a [RecordingFactory] observed
#[derive(Debug, Default)]
pub struct Recording {
    /// Name of every device created, in order
    pub created: Vec<(TargetKind, String)>,
    pub pens: Vec<PenConfig>,
    /// Events written to each device
    pub events: Vec<(TargetKind, Vec<Triple>)>,
}

/// Factory of in-memory virtual devices that counts live and destroyed
/// devices
#[derive(Debug, Default)]
pub struct RecordingFactory {
    pub recording: Arc<Mutex<Recording>>,
    pub live: Arc<AtomicUsize>,
    pub destroyed: Arc<AtomicUsize>,
    pub fail_on: Option<TargetKind>,
}

impl RecordingFactory {
    pub fn failing_on(kind: TargetKind) -> Self {
        Self {
            fail_on: Some(kind),
            ..Default::default()
        }
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> Vec<(TargetKind, String)> {
        self.recording.lock().unwrap().created.clone()
    }

    pub fn pens(&self) -> Vec<PenConfig> {
        self.recording.lock().unwrap().pens.clone()
    }

    /// Returns every event written to devices of the given kind
    pub fn events(&self, kind: TargetKind) -> Vec<Triple> {
        self.recording
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|(k, _)| *k == kind)
            .flat_map(|(_, events)| events.iter().copied())
            .collect()
    }

    fn create(&self, kind: TargetKind, name: &str) -> Result<Box<dyn TargetDevice>, TargetError> {
        if self.fail_on == Some(kind) {
            return Err(TargetError::Create {
                kind,
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "uinput"),
            });
        }
        self.recording
            .lock()
            .unwrap()
            .created
            .push((kind, name.to_string()));
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingDevice {
            kind,
            recording: self.recording.clone(),
            live: self.live.clone(),
            destroyed: self.destroyed.clone(),
        }))
    }
}

impl TargetFactory for RecordingFactory {
    fn create_pen(&self, config: &PenConfig) -> Result<Box<dyn TargetDevice>, TargetError> {
        let device = self.create(TargetKind::Pen, &config.name)?;
        self.recording.lock().unwrap().pens.push(config.clone());
        Ok(device)
    }

    fn create_pad(&self, config: &PadConfig) -> Result<Box<dyn TargetDevice>, TargetError> {
        self.create(TargetKind::Pad, &config.name)
    }

    fn create_pointer(
        &self,
        config: &PointerConfig,
    ) -> Result<Box<dyn TargetDevice>, TargetError> {
        self.create(TargetKind::Pointer, &config.name)
    }
}

struct RecordingDevice {
    kind: TargetKind,
    recording: Arc<Mutex<Recording>>,
    live: Arc<AtomicUsize>,
    destroyed: Arc<AtomicUsize>,
}

impl TargetDevice for RecordingDevice {
    fn write_events(&mut self, events: &[InputEvent]) -> Result<(), TargetError> {
        let events = events
            .iter()
            .map(|event| (event.event_type().0, event.code(), event.value()))
            .collect();
        self.recording.lock().unwrap().events.push((self.kind, events));
        Ok(())
    }
}

impl Drop for RecordingDevice {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}
