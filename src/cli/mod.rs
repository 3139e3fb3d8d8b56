use std::{error::Error, path::PathBuf};

use clap::Parser;
use rusb::UsbContext;
use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

use crate::{constants::XP_PEN_VID, drivers::Profile};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// List supported tablets and exit
    #[arg(short, long)]
    pub list: bool,
}

#[derive(Tabled)]
struct SupportedDeviceRow {
    #[tabled(rename = "Product Id")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Connected")]
    connected: usize,
}

/// Print every supported tablet model along with how many are plugged in
pub fn list_devices<T: UsbContext>(context: &T) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut connected = Vec::new();
    for device in context.devices()?.iter() {
        let Ok(descriptor) = device.device_descriptor() else {
            continue;
        };
        if descriptor.vendor_id() == XP_PEN_VID {
            connected.push(descriptor.product_id());
        }
    }

    let connected = connected.as_slice();
    let rows: Vec<SupportedDeviceRow> = Profile::ALL
        .iter()
        .flat_map(|profile| {
            profile
                .product_ids()
                .iter()
                .map(move |product_id| SupportedDeviceRow {
                    id: format!("{XP_PEN_VID:04x}:{product_id:04x}"),
                    name: profile.product_name(*product_id).to_string(),
                    connected: connected.iter().filter(|id| *id == product_id).count(),
                })
        })
        .collect();
    let count = rows.len();

    let mut table = Table::new(rows);
    table
        .with(Style::modern_rounded())
        .with(Panel::header("Supported Tablets"));
    println!("{table}");
    println!("Found {count} supported tablet(s)");

    Ok(())
}
