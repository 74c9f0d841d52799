// SPDX-License-Identifier: GPL-3.0-only

//! Read-only access to devices published by the udev registry.
//!
//! The formatter only needs a handful of lookups, so it works against
//! [`DeviceView`] rather than `udev::Device` directly. Both enumerated devices
//! and monitor events implement it.

use std::ffi::OsStr;

use tracing::trace;

use crate::error::{MonitorError, Result};

pub const SUBSYSTEM_BLOCK: &str = "block";
pub const DEVTYPE_PARTITION: &str = "partition";

/// One device at one point in time, as seen through the device registry.
pub trait DeviceView {
    type Ancestor: DeviceView;

    /// Event action (`add`, `remove`, `change`, ...). Enumerated devices have none.
    fn action(&self) -> Option<String>;

    /// Device node path, e.g. `/dev/sda1`.
    fn devnode(&self) -> Option<String>;

    /// Named sysfs attribute of this device.
    fn sysattr(&self, name: &str) -> Option<String>;

    /// Closest ancestor with the given subsystem and device type.
    fn ancestor(&self, subsystem: &str, devtype: &str) -> Option<Self::Ancestor>;
}

fn lossy(value: Option<&OsStr>) -> Option<String> {
    value.map(|v| v.to_string_lossy().into_owned())
}

impl DeviceView for udev::Device {
    type Ancestor = udev::Device;

    fn action(&self) -> Option<String> {
        lossy(udev::Device::action(self))
    }

    fn devnode(&self) -> Option<String> {
        udev::Device::devnode(self).map(|path| path.to_string_lossy().into_owned())
    }

    fn sysattr(&self, name: &str) -> Option<String> {
        lossy(self.attribute_value(name))
    }

    fn ancestor(&self, subsystem: &str, devtype: &str) -> Option<udev::Device> {
        match self.parent_with_subsystem_devtype(subsystem, devtype) {
            Ok(parent) => parent,
            Err(e) => {
                trace!(
                    "No {subsystem}/{devtype} ancestor for {}: {e}",
                    self.syspath().display()
                );
                None
            }
        }
    }
}

impl DeviceView for udev::Event {
    type Ancestor = udev::Device;

    fn action(&self) -> Option<String> {
        DeviceView::action(&**self)
    }

    fn devnode(&self) -> Option<String> {
        DeviceView::devnode(&**self)
    }

    fn sysattr(&self, name: &str) -> Option<String> {
        DeviceView::sysattr(&**self, name)
    }

    fn ancestor(&self, subsystem: &str, devtype: &str) -> Option<udev::Device> {
        DeviceView::ancestor(&**self, subsystem, devtype)
    }
}

/// Owned udev library context for the partition enumerator.
pub struct DeviceContext {
    udev: udev::Udev,
}

impl DeviceContext {
    pub fn new() -> Result<Self> {
        let udev = udev::Udev::new().map_err(MonitorError::Context)?;
        Ok(Self { udev })
    }

    pub(crate) fn udev(&self) -> udev::Udev {
        self.udev.clone()
    }
}
