// SPDX-License-Identifier: GPL-3.0-only

use std::io;

use thiserror::Error;

/// Fatal setup failures. Per-device and per-event failures never surface here;
/// they are skipped where they happen.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("udev context creation failed: {0}")]
    Context(#[source] io::Error),

    #[error("udev enumeration failed: {0}")]
    Scan(#[source] io::Error),

    #[error("udev monitor setup failed: {0}")]
    Subscribe(#[source] io::Error),

    #[error("signal descriptor setup failed: {0}")]
    Shutdown(#[source] nix::Error),
}

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;
