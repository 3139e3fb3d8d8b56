//! Report layouts shared by XP-Pen tablets that speak the "0x02" vendor
//! protocol once unlocked.
use packed_struct::prelude::*;
use packed_struct::PackingError;
use thiserror::Error;

/// Input report size of a pen (digitizer) report
pub const DIGITIZER_REPORT_SIZE: usize = 10;
/// Input report size of a pad (frame) report
pub const FRAME_REPORT_SIZE: usize = 8;
/// Size of the capability string descriptor
pub const DESCRIPTOR_SIZE: usize = 12;

/// Status bit set while the pen tip is touching the surface
const STATUS_TOUCHING: u8 = 0x01;
/// Status bit set while the lower stylus button is held
const STATUS_STYLUS: u8 = 0x02;
/// Status bit set while the upper stylus button is held
const STATUS_STYLUS2: u8 = 0x04;
/// Dial bit for one detent clockwise
const DIAL_CLOCKWISE: u8 = 0x01;
/// Dial bit for one detent counter-clockwise
const DIAL_COUNTER_CLOCKWISE: u8 = 0x02;

/// Errors decoding a report buffer
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("Capability descriptor must be 12 bytes, got {0}")]
    DescriptorLength(usize),
    #[error("Unable to unpack report: {0}")]
    Packing(#[from] PackingError),
}

/// Returns the first `N` bytes of the buffer as a fixed size array
fn sized<const N: usize>(buf: &[u8]) -> Result<&[u8; N], ReportError> {
    buf.get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(ReportError::TooShort {
            expected: N,
            actual: buf.len(),
        })
}

/// Where a report's sub-type tag (byte 1) places it. Digitizer reports use
/// tags below `digitizer_below`, frame reports use tags at or above
/// `frame_from`. Each tablet model declares its own thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportLayout {
    /// Leading report id of vendor reports
    pub report_id: u8,
    pub digitizer_below: u8,
    pub frame_from: u8,
}

impl ReportLayout {
    pub fn is_digitizer(&self, tag: u8) -> bool {
        tag < self.digitizer_below
    }

    pub fn is_frame(&self, tag: u8) -> bool {
        tag >= self.frame_from
    }
}

/// Stylus side button state. The hardware only reports one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StylusButton {
    Released,
    Lower,
    Upper,
}

// DigitizerReport
//
// # ReportID: 2 / Status: 0xa1 | X: 0x1234 | Y: 0x0abc | Pressure: 0x0200 | Tilt: -12, 30
// E: 02 a1 34 12 bc 0a 00 02 f4 1e
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "10")]
pub struct DigitizerReport {
    // BYTE 0
    #[packed_field(bytes = "0")]
    pub report_id: u8,
    // BYTE 1
    #[packed_field(bytes = "1")]
    pub status: u8,
    // BYTE 2-3
    #[packed_field(bytes = "2..=3", endian = "lsb")]
    pub x: Integer<u16, packed_bits::Bits<16>>,
    // BYTE 4-5
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub y: Integer<u16, packed_bits::Bits<16>>,
    // BYTE 6-7
    #[packed_field(bytes = "6..=7", endian = "lsb")]
    pub pressure: Integer<u16, packed_bits::Bits<16>>,
    // BYTE 8
    #[packed_field(bytes = "8")]
    pub tilt_x: u8,
    // BYTE 9
    #[packed_field(bytes = "9")]
    pub tilt_y: u8,
}

impl DigitizerReport {
    /// Unpack a digitizer report from the start of the given buffer
    pub fn from_bytes(buf: &[u8]) -> Result<Self, ReportError> {
        let report = Self::unpack(sized::<DIGITIZER_REPORT_SIZE>(buf)?)?;
        Ok(report)
    }

    pub fn is_touching(&self) -> bool {
        self.status & STATUS_TOUCHING != 0
    }

    pub fn stylus_button(&self) -> StylusButton {
        if self.status & STATUS_STYLUS != 0 {
            StylusButton::Lower
        } else if self.status & STATUS_STYLUS2 != 0 {
            StylusButton::Upper
        } else {
            StylusButton::Released
        }
    }

    pub fn tilt_x(&self) -> i8 {
        self.tilt_x as i8
    }

    pub fn tilt_y(&self) -> i8 {
        self.tilt_y as i8
    }
}

// FrameReport
//
// # ReportID: 2 / Status: 0xf0 | Buttons: 0b00000100 | Dial: counter-clockwise
// E: 02 f0 04 00 00 00 00 02
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "8")]
pub struct FrameReport {
    // BYTE 0
    #[packed_field(bytes = "0")]
    pub report_id: u8,
    // BYTE 1
    #[packed_field(bytes = "1")]
    pub status: u8,
    // BYTE 2
    #[packed_field(bytes = "2")]
    pub buttons: u8,
    // BYTE 3-6
    #[packed_field(bytes = "3..=6")]
    pub unk_3: [u8; 4],
    // BYTE 7
    #[packed_field(bytes = "7")]
    pub dial: u8,
}

impl FrameReport {
    /// Unpack a frame report from the start of the given buffer
    pub fn from_bytes(buf: &[u8]) -> Result<Self, ReportError> {
        let report = Self::unpack(sized::<FRAME_REPORT_SIZE>(buf)?)?;
        Ok(report)
    }

    /// Returns the index of the pressed pad button. Only the lowest set bit is
    /// considered: the hardware cannot express chords reliably, so when
    /// several buttons are held the lowest index wins.
    pub fn pressed_button(&self, button_count: usize) -> Option<usize> {
        if self.buttons == 0 {
            return None;
        }
        let index = self.buttons.trailing_zeros() as usize;
        (index < button_count).then_some(index)
    }

    /// Returns the dial rotation of this report in detents, if any
    pub fn dial_step(&self) -> Option<i32> {
        if self.dial & DIAL_CLOCKWISE != 0 {
            Some(1)
        } else if self.dial & DIAL_COUNTER_CLOCKWISE != 0 {
            Some(-1)
        } else {
            None
        }
    }
}

// DescriptorReport
//
// Returned by the string descriptor at index 0x64. The first two bytes are
// the standard descriptor header.
// E: 0c 03 c0 d4 d0 77 00 00 ff 1f 00 00
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "12")]
pub struct DescriptorReport {
    // BYTE 0
    #[packed_field(bytes = "0")]
    pub length: u8,
    // BYTE 1
    #[packed_field(bytes = "1")]
    pub descriptor_type: u8,
    // BYTE 2-3
    #[packed_field(bytes = "2..=3", endian = "lsb")]
    pub max_width: Integer<u16, packed_bits::Bits<16>>,
    // BYTE 4-5
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub max_height: Integer<u16, packed_bits::Bits<16>>,
    // BYTE 6-7
    #[packed_field(bytes = "6..=7")]
    pub unk_6: [u8; 2],
    // BYTE 8-9
    #[packed_field(bytes = "8..=9", endian = "lsb")]
    pub max_pressure: Integer<u16, packed_bits::Bits<16>>,
    // BYTE 10-11
    #[packed_field(bytes = "10..=11")]
    pub unk_10: [u8; 2],
}

impl DescriptorReport {
    /// Unpack the capability descriptor. Anything but exactly
    /// [DESCRIPTOR_SIZE] bytes is rejected.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, ReportError> {
        if buf.len() != DESCRIPTOR_SIZE {
            return Err(ReportError::DescriptorLength(buf.len()));
        }
        let report = Self::unpack(sized::<DESCRIPTOR_SIZE>(buf)?)?;
        Ok(report)
    }
}
