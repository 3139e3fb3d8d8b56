use std::{sync::Arc, time::Duration};

use rusb::{Context, Device, DeviceHandle, UsbContext};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    config::DaemonConfig,
    constants::XP_PEN_VID,
    drivers::{
        product_name,
        tablet::driver::{DriverError, TabletDriver},
        Profile,
    },
    input::target::TargetFactory,
    usb::{self, DeviceId, InterruptEndpoint, Transport},
};

const BUFFER_SIZE: usize = 64;
/// How often the bus is scanned for newly plugged tablets
const SCAN_INTERVAL: Duration = Duration::from_secs(2);
/// Interrupt read timeout of the report readers. Readers check whether their
/// tablet is still attached after every timeout.
const READ_TIMEOUT: Duration = Duration::from_millis(1000);
/// Smallest buffer used for interrupt reads
const MIN_REPORT_BUFFER: u16 = 64;

/// Possible errors of the [Manager]
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Manager commands define all the different ways to interact with [Manager]
/// over a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A tablet stopped answering and should be detached
    DeviceRemoved { id: DeviceId },
    /// Detach every tablet and stop
    Stop,
}

/// Discovers supported tablets on the USB bus, attaches them to the driver of
/// their model and feeds their interrupt reports to it.
pub struct Manager {
    context: Context,
    drivers: Vec<Arc<TabletDriver>>,
    config: DaemonConfig,
    tx: mpsc::Sender<Command>,
    rx: mpsc::Receiver<Command>,
}

impl Manager {
    /// Returns a new [Manager] with one driver per supported model, each
    /// configured from the given settings.
    pub fn new(context: Context, config: DaemonConfig, factory: Arc<dyn TargetFactory>) -> Manager {
        let (tx, rx) = mpsc::channel(BUFFER_SIZE);
        let drivers = Profile::ALL
            .iter()
            .map(|profile| Arc::new(TabletDriver::new(*profile, factory.clone())))
            .collect();

        let mut manager = Manager {
            context,
            drivers,
            config,
            tx,
            rx,
        };
        manager.apply_config();
        manager
    }

    /// Returns a sender that can be used to send [Command] messages to the
    /// manager
    pub fn tx(&self) -> mpsc::Sender<Command> {
        self.tx.clone()
    }

    /// Scan for tablets periodically and process [Command] messages until a
    /// [Command::Stop] is received.
    pub async fn run(&mut self) -> Result<(), ManagerError> {
        self.scan()?;

        let mut interval = tokio::time::interval(SCAN_INTERVAL);
        loop {
            // None means the scan interval elapsed
            let cmd = tokio::select! {
                _ = interval.tick() => None,
                cmd = self.rx.recv() => Some(cmd),
            };

            match cmd {
                None => {
                    if let Err(e) = self.scan() {
                        log::error!("Unable to scan for tablets: {e}");
                    }
                }
                Some(cmd) => {
                    log::debug!("Received command: {cmd:?}");
                    match cmd {
                        Some(Command::DeviceRemoved { id }) => self.on_device_removed(id),
                        Some(Command::Stop) | None => break,
                    }
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Detach every tablet from every driver
    pub fn shutdown(&self) {
        log::info!("Detaching all tablets");
        for driver in self.drivers.iter() {
            driver.detach_all();
        }
    }

    /// Apply the stored configuration of every model and store back the
    /// effective configuration, including synthesized defaults.
    fn apply_config(&mut self) {
        for driver in self.drivers.iter() {
            let product_id = driver.profile().primary_product_id();
            let stored = self
                .config
                .device(product_id)
                .cloned()
                .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
            let effective = driver.set_config_value(stored);
            self.config.set_device(product_id, effective);
        }
        self.save_config();
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save() {
            log::warn!("Unable to save configuration to {:?}: {e}", self.config.path);
        }
    }

    fn driver_for(&self, product_id: u16) -> Option<Arc<TabletDriver>> {
        self.drivers
            .iter()
            .find(|driver| driver.handled_product_ids().contains(&product_id))
            .cloned()
    }

    /// Attach every supported tablet on the bus that is not attached yet
    fn scan(&self) -> Result<(), ManagerError> {
        let mut attached = false;
        for device in self.context.devices()?.iter() {
            let descriptor = match device.device_descriptor() {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    log::debug!("Unable to read device descriptor: {e}");
                    continue;
                }
            };
            if descriptor.vendor_id() != XP_PEN_VID {
                continue;
            }

            let product_id = descriptor.product_id();
            let id = DeviceId::from(&device);
            let Some(driver) = self.driver_for(product_id) else {
                log::trace!("Ignoring {} ({id})", product_name(product_id));
                continue;
            };
            if driver.is_attached(id) {
                continue;
            }

            match self.open(&driver, &device, id, product_id) {
                Ok(true) => attached = true,
                Ok(false) => (),
                Err(e) => log::error!("Unable to attach {} ({id}): {e}", product_name(product_id)),
            }
        }

        if attached {
            self.save_config();
        }

        Ok(())
    }

    /// Claim the interfaces of the given tablet, attach them and start one
    /// report reader per interface. Returns whether any virtual device was
    /// created.
    fn open(
        &self,
        driver: &Arc<TabletDriver>,
        device: &Device<Context>,
        id: DeviceId,
        product_id: u16,
    ) -> Result<bool, ManagerError> {
        let endpoints = usb::interrupt_endpoints(device)?;
        let mut handle = device.open()?;
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            log::debug!("Kernel driver auto detach is unavailable: {e}");
        }
        for endpoint in endpoints.iter() {
            handle.claim_interface(endpoint.interface)?;
        }
        let handle = Arc::new(handle);

        if let Err(e) = driver.initialize(handle.as_ref()) {
            log::warn!("Unable to initialize {id}: {e}");
        }

        let mut attached = false;
        for endpoint in endpoints.iter() {
            let transport: Arc<dyn Transport> = handle.clone();
            match driver.attach(id, product_id, transport, endpoint.interface) {
                Ok(kinds) => attached |= !kinds.is_empty(),
                Err(e) => {
                    driver.detach(id);
                    return Err(e.into());
                }
            }
        }
        if !attached {
            return Ok(false);
        }

        for endpoint in endpoints {
            self.spawn_reader(driver.clone(), handle.clone(), id, endpoint);
        }

        Ok(true)
    }

    /// Start a blocking task that reads interrupt reports from the given
    /// endpoint until the tablet is detached or goes away.
    fn spawn_reader(
        &self,
        driver: Arc<TabletDriver>,
        handle: Arc<DeviceHandle<Context>>,
        id: DeviceId,
        endpoint: InterruptEndpoint,
    ) {
        let tx = self.tx.clone();
        tokio::task::spawn_blocking(move || {
            log::debug!("Started reader for {id} on endpoint {:#04x}", endpoint.address);
            let size = endpoint.max_packet_size.max(MIN_REPORT_BUFFER);
            let mut buf = vec![0; size as usize];
            while driver.is_attached(id) {
                match handle.read_interrupt(endpoint.address, &mut buf, READ_TIMEOUT) {
                    Ok(read) => {
                        if let Err(e) = driver.decode_report(id, &buf[..read]) {
                            log::warn!("Unable to process report from {id}: {e}");
                        }
                    }
                    Err(rusb::Error::Timeout) => continue,
                    Err(e) => {
                        log::debug!("Reader for {id} stopped: {e}");
                        if let Err(e) = tx.blocking_send(Command::DeviceRemoved { id }) {
                            log::error!("Unable to send command: {e}");
                        }
                        break;
                    }
                }
            }
            log::debug!("Reader for {id} on endpoint {:#04x} exited", endpoint.address);
        });
    }

    /// Called when a tablet stops answering
    fn on_device_removed(&self, id: DeviceId) {
        for driver in self.drivers.iter() {
            driver.detach(id);
        }
    }
}
