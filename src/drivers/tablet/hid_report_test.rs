use std::error::Error;

use packed_struct::types::SizedInteger;
use proptest::prelude::*;

use crate::drivers::tablet::{
    hid_report::{
        DescriptorReport, DigitizerReport, FrameReport, ReportError, StylusButton,
        DIGITIZER_REPORT_SIZE,
    },
    XP_PEN_LAYOUT,
};

// Example packet:
// # ReportID: 2 / Status: 0xa1 | X: 0x1234 | Y: 0x0abc | Pressure: 0x0200 | Tilt: -12, 30
// E: 02 a1 34 12 bc 0a 00 02 f4 1e
#[tokio::test]
async fn test_digitizer_report() -> Result<(), Box<dyn Error>> {
    let buf = [0x02, 0xa1, 0x34, 0x12, 0xbc, 0x0a, 0x00, 0x02, 0xf4, 0x1e];
    let report = DigitizerReport::from_bytes(&buf)?;
    println!("{report:?}");

    assert_eq!(report.report_id, 0x02);
    assert_eq!(report.x.to_primitive(), 0x1234);
    assert_eq!(report.y.to_primitive(), 0x0abc);
    assert_eq!(report.pressure.to_primitive(), 0x0200);
    assert_eq!(report.tilt_x(), -12);
    assert_eq!(report.tilt_y(), 30);
    assert!(report.is_touching());
    assert_eq!(report.stylus_button(), StylusButton::Released);

    Ok(())
}

#[tokio::test]
async fn test_digitizer_stylus_buttons() -> Result<(), Box<dyn Error>> {
    let mut buf = [0x02, 0xa0, 0, 0, 0, 0, 0, 0, 0, 0];

    buf[1] = 0xa2;
    assert_eq!(
        DigitizerReport::from_bytes(&buf)?.stylus_button(),
        StylusButton::Lower
    );
    buf[1] = 0xa4;
    assert_eq!(
        DigitizerReport::from_bytes(&buf)?.stylus_button(),
        StylusButton::Upper
    );
    // The lower button wins when both bits are set
    buf[1] = 0xa6;
    assert_eq!(
        DigitizerReport::from_bytes(&buf)?.stylus_button(),
        StylusButton::Lower
    );
    assert!(!DigitizerReport::from_bytes(&buf)?.is_touching());

    Ok(())
}

#[test]
fn test_digitizer_trailing_bytes_ignored() {
    let mut buf = vec![0x02, 0xa1, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00];
    buf.extend_from_slice(&[0xff; 6]);
    let report = DigitizerReport::from_bytes(&buf).unwrap();
    assert_eq!(report.x.to_primitive(), 1);
    assert_eq!(report.y.to_primitive(), 2);
    assert_eq!(report.pressure.to_primitive(), 3);
}

#[test]
fn test_short_reports() {
    let err = DigitizerReport::from_bytes(&[0x02, 0xa1, 0x00]).unwrap_err();
    assert!(matches!(
        err,
        ReportError::TooShort {
            expected: DIGITIZER_REPORT_SIZE,
            actual: 3
        }
    ));

    let err = FrameReport::from_bytes(&[0x02, 0xf0, 0x01, 0x00, 0x00, 0x00, 0x00]).unwrap_err();
    assert!(matches!(
        err,
        ReportError::TooShort {
            expected: 8,
            actual: 7
        }
    ));
}

// Example packet:
// # ReportID: 2 / Status: 0xf0 | Buttons: 0b00000100 | Dial: counter-clockwise
// E: 02 f0 04 00 00 00 00 02
#[tokio::test]
async fn test_frame_report() -> Result<(), Box<dyn Error>> {
    let buf = [0x02, 0xf0, 0x04, 0x00, 0x00, 0x00, 0x00, 0x02];
    let report = FrameReport::from_bytes(&buf)?;
    println!("{report:?}");

    assert_eq!(report.pressed_button(8), Some(2));
    assert_eq!(report.dial_step(), Some(-1));

    Ok(())
}

#[test]
fn test_frame_lowest_button_wins() {
    let report = FrameReport {
        buttons: 0b1010_0100,
        ..Default::default()
    };
    assert_eq!(report.pressed_button(8), Some(2));

    let report = FrameReport {
        buttons: 0,
        ..Default::default()
    };
    assert_eq!(report.pressed_button(8), None);

    // Bits beyond the physical buttons of the model are not buttons
    let report = FrameReport {
        buttons: 0b0100_0000,
        ..Default::default()
    };
    assert_eq!(report.pressed_button(4), None);
}

#[test]
fn test_frame_dial() {
    let mut report = FrameReport::default();
    assert_eq!(report.dial_step(), None);
    report.dial = 0x01;
    assert_eq!(report.dial_step(), Some(1));
    report.dial = 0x02;
    assert_eq!(report.dial_step(), Some(-1));
    report.dial = 0x03;
    assert_eq!(report.dial_step(), Some(1));
}

// Example descriptor of an Artist 13.3 Pro:
// E: 0c 03 c0 d4 d0 77 00 00 ff 1f 00 00
#[tokio::test]
async fn test_descriptor_report() -> Result<(), Box<dyn Error>> {
    let buf = [
        0x0c, 0x03, 0xc0, 0xd4, 0xd0, 0x77, 0x00, 0x00, 0xff, 0x1f, 0x00, 0x00,
    ];
    let report = DescriptorReport::from_bytes(&buf)?;

    assert_eq!(report.max_width.to_primitive(), 0xd4c0);
    assert_eq!(report.max_height.to_primitive(), 0x77d0);
    assert_eq!(report.max_pressure.to_primitive(), 0x1fff);

    Ok(())
}

#[test]
fn test_descriptor_length() {
    for len in [0, 11, 13, 64] {
        let buf = vec![0; len];
        let err = DescriptorReport::from_bytes(&buf).unwrap_err();
        assert!(matches!(err, ReportError::DescriptorLength(l) if l == len));
    }
}

#[test]
fn test_layout() {
    assert!(XP_PEN_LAYOUT.is_digitizer(0xa1));
    assert!(!XP_PEN_LAYOUT.is_digitizer(0xb0));
    assert!(!XP_PEN_LAYOUT.is_frame(0xef));
    assert!(XP_PEN_LAYOUT.is_frame(0xf0));
    assert!(XP_PEN_LAYOUT.is_frame(0xff));
}

proptest! {
    #[test]
    fn prop_digitizer_fields_are_little_endian(bytes in proptest::array::uniform10(any::<u8>())) {
        let report = DigitizerReport::from_bytes(&bytes).unwrap();
        let le = |lo: usize| u16::from(bytes[lo]) | (u16::from(bytes[lo + 1]) << 8);

        prop_assert_eq!(report.x.to_primitive(), le(2));
        prop_assert_eq!(report.y.to_primitive(), le(4));
        prop_assert_eq!(report.pressure.to_primitive(), le(6));
        prop_assert_eq!(report.tilt_x(), bytes[8] as i8);
        prop_assert_eq!(report.tilt_y(), bytes[9] as i8);
    }

    #[test]
    fn prop_descriptor_fields_are_little_endian(bytes in proptest::array::uniform12(any::<u8>())) {
        let report = DescriptorReport::from_bytes(&bytes).unwrap();
        let le = |lo: usize| u16::from(bytes[lo]) | (u16::from(bytes[lo + 1]) << 8);

        prop_assert_eq!(report.max_width.to_primitive(), le(2));
        prop_assert_eq!(report.max_height.to_primitive(), le(4));
        prop_assert_eq!(report.max_pressure.to_primitive(), le(8));
    }
}
