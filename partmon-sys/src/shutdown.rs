// SPDX-License-Identifier: GPL-3.0-only

//! Pollable stop requests for the event loop.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};

use nix::sys::signal::{SigSet, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};
use tracing::warn;

use crate::error::{MonitorError, Result};

enum Source {
    Signals { fd: SignalFd, mask: SigSet },
    Trigger(File),
}

/// A descriptor that turns readable once a stop has been requested.
pub struct Shutdown {
    source: Source,
}

/// Write side of [`Shutdown::manual`].
pub struct ShutdownTrigger {
    pipe: File,
}

impl Shutdown {
    /// Stops on delivery of any of `signals`.
    ///
    /// The signals are blocked for the calling thread and read through a
    /// signalfd instead, so the default disposition no longer kills the
    /// process. The mask is restored on drop. Call before spawning threads.
    pub fn on_signals(signals: &[Signal]) -> Result<Self> {
        let mut mask = SigSet::empty();
        for signal in signals {
            mask.add(*signal);
        }

        mask.thread_block().map_err(MonitorError::Shutdown)?;
        let flags = SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC;
        let fd = match SignalFd::with_flags(&mask, flags) {
            Ok(fd) => fd,
            Err(e) => {
                let _ = mask.thread_unblock();
                return Err(MonitorError::Shutdown(e));
            }
        };

        Ok(Self {
            source: Source::Signals { fd, mask },
        })
    }

    /// Stops when the returned trigger fires or is dropped.
    pub fn manual() -> io::Result<(Self, ShutdownTrigger)> {
        let (reader, writer) = nix::unistd::pipe()?;
        let shutdown = Self {
            source: Source::Trigger(File::from(reader)),
        };
        let trigger = ShutdownTrigger {
            pipe: File::from(writer),
        };
        Ok((shutdown, trigger))
    }

    /// Consumes one pending request and names its cause.
    pub(crate) fn acknowledge(&mut self) -> String {
        match &mut self.source {
            Source::Signals { fd, .. } => match fd.read_signal() {
                Ok(Some(info)) => Signal::try_from(info.ssi_signo as i32)
                    .map(|signal| signal.as_str().to_string())
                    .unwrap_or_else(|_| format!("signal {}", info.ssi_signo)),
                Ok(None) => "signal".to_string(),
                Err(e) => {
                    warn!("Failed to read pending signal: {e}");
                    "signal".to_string()
                }
            },
            Source::Trigger(pipe) => {
                let mut byte = [0u8; 1];
                match pipe.read(&mut byte) {
                    Ok(0) => "trigger dropped".to_string(),
                    Ok(_) => "trigger".to_string(),
                    Err(e) => {
                        warn!("Failed to read shutdown trigger: {e}");
                        "trigger".to_string()
                    }
                }
            }
        }
    }
}

impl AsFd for Shutdown {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match &self.source {
            Source::Signals { fd, .. } => fd.as_fd(),
            Source::Trigger(pipe) => pipe.as_fd(),
        }
    }
}

impl Drop for Shutdown {
    fn drop(&mut self) {
        if let Source::Signals { mask, .. } = &self.source
            && let Err(e) = mask.thread_unblock()
        {
            warn!("Failed to restore signal mask: {e}");
        }
    }
}

impl ShutdownTrigger {
    pub fn trigger(&self) -> io::Result<()> {
        (&self.pipe).write_all(&[1])
    }
}
