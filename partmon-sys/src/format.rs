// SPDX-License-Identifier: GPL-3.0-only

//! Rendering of partition events as single text lines.
//!
//! Line format:
//!
//! ```text
//! <action>: <devnode>[, partition <N>][, device <vendor> <model>][ on USB <busnum>-<devpath>]
//! ```
//!
//! Enrichments are only looked up for `add` events. Absent values render empty.

use std::io::Write;

use tracing::warn;

use crate::device::DeviceView;

const DEFAULT_ACTION: &str = "add";

/// Consumer of devices produced by the snapshot and the subscriber.
pub trait EventHandler<D> {
    fn handle(&mut self, device: &D);
}

impl<D, F> EventHandler<D> for F
where
    F: FnMut(&D),
{
    fn handle(&mut self, device: &D) {
        self(device)
    }
}

/// Same whitespace set as C `isspace` in the "C" locale.
fn is_c_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r')
}

/// Length in bytes of `s` once trailing whitespace is dropped.
///
/// Leading and interior whitespace is kept.
pub fn trimmed_len(s: &str) -> usize {
    let mut tail = 0;
    for (index, c) in s.char_indices() {
        if !is_c_space(c) {
            tail = index + c.len_utf8();
        }
    }
    tail
}

pub fn trim_trailing_space(s: &str) -> &str {
    &s[..trimmed_len(s)]
}

/// Renders one device as an event line, without the newline.
pub fn describe<D: DeviceView>(device: &D) -> String {
    let action = device
        .action()
        .unwrap_or_else(|| DEFAULT_ACTION.to_string());
    let mut line = format!("{action}: {}", device.devnode().unwrap_or_default());

    if action == DEFAULT_ACTION {
        push_partition_number(&mut line, device);
        push_scsi_device_info(&mut line, device);
        push_usb_device_info(&mut line, device);
    }

    line
}

fn push_partition_number<D: DeviceView>(line: &mut String, device: &D) {
    if let Some(number) = device.sysattr("partition") {
        line.push_str(", partition ");
        line.push_str(&number);
    }
}

fn push_scsi_device_info<D: DeviceView>(line: &mut String, device: &D) {
    let Some(parent) = device.ancestor("scsi", "scsi_device") else {
        return;
    };

    let vendor = parent.sysattr("vendor").unwrap_or_default();
    let model = parent.sysattr("model").unwrap_or_default();

    line.push_str(", device ");
    line.push_str(trim_trailing_space(&vendor));
    line.push(' ');
    line.push_str(trim_trailing_space(&model));
}

fn push_usb_device_info<D: DeviceView>(line: &mut String, device: &D) {
    let Some(parent) = device.ancestor("usb", "usb_device") else {
        return;
    };

    let busnum = parent.sysattr("busnum").unwrap_or_default();
    let devpath = parent.sysattr("devpath").unwrap_or_default();

    line.push_str(" on USB ");
    line.push_str(&busnum);
    line.push('-');
    line.push_str(&devpath);
}

/// Handler that writes one line per device to `out`.
pub struct LinePrinter<W: Write> {
    out: W,
}

impl<W: Write> LinePrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write, D: DeviceView> EventHandler<D> for LinePrinter<W> {
    fn handle(&mut self, device: &D) {
        let line = describe(device);
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!("Failed to print event line: {e}");
        }
    }
}
