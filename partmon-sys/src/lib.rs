// SPDX-License-Identifier: GPL-3.0-only

//! Block partition enumeration and event monitoring on top of udev
//!
//! The crate provides the three pieces of the partition monitor:
//! - A one-shot snapshot of the partitions present right now ([`scan_partitions`])
//! - A blocking subscription to partition add/remove/change events
//!   ([`monitor_partitions`]), stoppable through a [`Shutdown`]
//! - A line formatter shared by both ([`describe`], [`LinePrinter`])
//!
//! The udev backends ([`UdevRegistry`], [`UdevMonitor`]) sit behind the
//! [`DeviceRegistry`] and [`EventSource`] traits.

pub mod device;
pub mod error;
pub mod format;
pub mod monitor;
pub mod scan;
pub mod shutdown;

#[cfg(test)]
pub(crate) mod testing;

pub use device::{DeviceContext, DeviceView};
pub use error::{MonitorError, Result};
pub use format::{EventHandler, LinePrinter, describe, trim_trailing_space, trimmed_len};
pub use monitor::{EventSource, StopReason, UdevMonitor, monitor_partitions};
pub use scan::{DeviceRegistry, UdevRegistry, scan_partitions};
pub use shutdown::{Shutdown, ShutdownTrigger};
