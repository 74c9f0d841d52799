// SPDX-License-Identifier: GPL-3.0-only

//! In-memory stand-ins for the udev registry and monitor.

use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::path::{Path, PathBuf};

use crate::device::DeviceView;
use crate::monitor::EventSource;
use crate::scan::DeviceRegistry;

#[derive(Clone, Debug, Default)]
pub struct FakeDevice {
    action: Option<String>,
    devnode: Option<String>,
    attrs: HashMap<String, String>,
    ancestors: HashMap<(String, String), FakeDevice>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    pub fn with_devnode(mut self, devnode: &str) -> Self {
        self.devnode = Some(devnode.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_ancestor(mut self, subsystem: &str, devtype: &str, parent: FakeDevice) -> Self {
        self.ancestors
            .insert((subsystem.to_string(), devtype.to_string()), parent);
        self
    }
}

impl DeviceView for FakeDevice {
    type Ancestor = FakeDevice;

    fn action(&self) -> Option<String> {
        self.action.clone()
    }

    fn devnode(&self) -> Option<String> {
        self.devnode.clone()
    }

    fn sysattr(&self, name: &str) -> Option<String> {
        self.attrs.get(name).cloned()
    }

    fn ancestor(&self, subsystem: &str, devtype: &str) -> Option<FakeDevice> {
        self.ancestors
            .get(&(subsystem.to_string(), devtype.to_string()))
            .cloned()
    }
}

/// Registry keyed by syspath. Paths listed without a device fail to resolve.
#[derive(Default)]
pub struct FakeRegistry {
    entries: Vec<(PathBuf, Option<FakeDevice>)>,
    scan_error: Option<io::ErrorKind>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, syspath: &str, device: FakeDevice) -> Self {
        self.entries.push((PathBuf::from(syspath), Some(device)));
        self
    }

    pub fn with_missing(mut self, syspath: &str) -> Self {
        self.entries.push((PathBuf::from(syspath), None));
        self
    }

    pub fn failing_with(mut self, kind: io::ErrorKind) -> Self {
        self.scan_error = Some(kind);
        self
    }

    fn resolve(&self, syspath: &Path) -> io::Result<FakeDevice> {
        self.entries
            .iter()
            .find(|(path, _)| path == syspath)
            .and_then(|(_, device)| device.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, syspath.display().to_string()))
    }
}

impl DeviceRegistry for FakeRegistry {
    type Device = FakeDevice;

    fn scan_partitions(
        &mut self,
    ) -> io::Result<Box<dyn Iterator<Item = io::Result<FakeDevice>> + '_>> {
        if let Some(kind) = self.scan_error {
            return Err(io::Error::from(kind));
        }

        Ok(Box::new(
            self.entries.iter().map(|(path, _)| self.resolve(path)),
        ))
    }
}

/// Event source backed by a pipe: every queued entry writes one byte, so
/// the read end polls readable exactly while entries are pending. A `None`
/// entry models a wakeup that yields no event.
pub struct FakeEventSource {
    reader: File,
    writer: File,
    queue: VecDeque<Option<FakeDevice>>,
}

impl FakeEventSource {
    pub fn new() -> io::Result<Self> {
        let (reader, writer) = nix::unistd::pipe()?;
        Ok(Self {
            reader: File::from(reader),
            writer: File::from(writer),
            queue: VecDeque::new(),
        })
    }

    pub fn push(&mut self, device: FakeDevice) -> io::Result<()> {
        self.queue.push_back(Some(device));
        self.writer.write_all(&[1])
    }

    pub fn push_spurious(&mut self) -> io::Result<()> {
        self.queue.push_back(None);
        self.writer.write_all(&[0])
    }
}

impl AsFd for FakeEventSource {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.reader.as_fd()
    }
}

impl EventSource for FakeEventSource {
    type Device = FakeDevice;

    fn receive(&mut self) -> Option<FakeDevice> {
        let mut byte = [0u8; 1];
        self.reader.read_exact(&mut byte).ok()?;
        self.queue.pop_front().flatten()
    }
}

/// Source whose peer end has gone away; polls as hang-up with no data.
pub struct ClosedEventSource {
    reader: File,
}

impl ClosedEventSource {
    pub fn new() -> io::Result<Self> {
        let (reader, writer) = nix::unistd::pipe()?;
        drop(writer);
        Ok(Self {
            reader: File::from(reader),
        })
    }
}

impl AsFd for ClosedEventSource {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.reader.as_fd()
    }
}

impl EventSource for ClosedEventSource {
    type Device = FakeDevice;

    fn receive(&mut self) -> Option<FakeDevice> {
        None
    }
}
