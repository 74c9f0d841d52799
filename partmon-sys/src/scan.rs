// SPDX-License-Identifier: GPL-3.0-only

use std::io;

use tracing::{debug, info};

use crate::device::{DEVTYPE_PARTITION, DeviceContext, DeviceView, SUBSYSTEM_BLOCK};
use crate::error::{MonitorError, Result};
use crate::format::EventHandler;

/// Source of the partitions present right now.
pub trait DeviceRegistry {
    type Device: DeviceView;

    /// Lists matching devices, resolving each one lazily from its syspath.
    /// An `Err` item is a device that vanished or could not be opened.
    fn scan_partitions(
        &mut self,
    ) -> io::Result<Box<dyn Iterator<Item = io::Result<Self::Device>> + '_>>;
}

/// Partition enumerator backed by the udev database.
pub struct UdevRegistry {
    enumerator: udev::Enumerator,
}

impl UdevRegistry {
    /// Enumerator restricted to `SUBSYSTEM=block`, `DEVTYPE=partition`.
    pub fn partitions(context: &DeviceContext) -> Result<Self> {
        let mut enumerator =
            udev::Enumerator::with_udev(context.udev()).map_err(MonitorError::Scan)?;
        enumerator
            .match_subsystem(SUBSYSTEM_BLOCK)
            .map_err(MonitorError::Scan)?;
        enumerator
            .match_property("DEVTYPE", DEVTYPE_PARTITION)
            .map_err(MonitorError::Scan)?;

        Ok(Self { enumerator })
    }
}

impl DeviceRegistry for UdevRegistry {
    type Device = udev::Device;

    fn scan_partitions(
        &mut self,
    ) -> io::Result<Box<dyn Iterator<Item = io::Result<udev::Device>> + '_>> {
        // The udev list iterator already skips entries whose syspath no
        // longer resolves.
        let devices = self.enumerator.scan_devices()?;
        Ok(Box::new(devices.map(Ok::<_, io::Error>)))
    }
}

/// Feeds every partition currently present to `handler`.
///
/// Devices that fail to resolve are skipped. Returns how many devices were
/// handled.
pub fn scan_partitions<R, H>(registry: &mut R, handler: &mut H) -> Result<usize>
where
    R: DeviceRegistry,
    H: EventHandler<R::Device>,
{
    let devices = registry.scan_partitions().map_err(MonitorError::Scan)?;

    let mut handled = 0;
    for device in devices {
        match device {
            Ok(device) => {
                handler.handle(&device);
                handled += 1;
            }
            Err(e) => debug!("Skipping partition that failed to resolve: {e}"),
        }
    }

    info!("Found {handled} partitions");
    Ok(handled)
}
