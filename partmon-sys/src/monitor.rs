// SPDX-License-Identifier: GPL-3.0-only

use std::ffi::c_int;
use std::os::fd::{AsFd, BorrowedFd};

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use tracing::{info, trace, warn};

use crate::device::{DEVTYPE_PARTITION, DeviceView, SUBSYSTEM_BLOCK};
use crate::error::{MonitorError, Result};
use crate::format::EventHandler;
use crate::shutdown::Shutdown;

/// A live subscription that signals pending events through its descriptor.
pub trait EventSource: AsFd {
    type Device: DeviceView;

    /// Takes one pending event. `None` when the wakeup carried nothing usable.
    fn receive(&mut self) -> Option<Self::Device>;
}

/// Why [`monitor_partitions`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown descriptor became readable.
    Cancelled,
    /// The event source hung up or reported an error condition.
    SourceClosed,
    /// `poll` returned with nothing ready despite the infinite timeout.
    NothingReady,
    /// `poll` itself failed.
    WaitFailed(Errno),
}

/// Netlink subscription to udev events for block partitions.
///
/// `udev` 0.8 only builds monitors on a context of their own, so this does not
/// share the [`DeviceContext`](crate::DeviceContext) used for enumeration.
pub struct UdevMonitor {
    socket: udev::MonitorSocket,
}

impl UdevMonitor {
    pub fn partitions() -> Result<Self> {
        let socket = udev::MonitorBuilder::new()
            .and_then(|builder| {
                builder.match_subsystem_devtype(SUBSYSTEM_BLOCK, DEVTYPE_PARTITION)
            })
            .and_then(|builder| builder.listen())
            .map_err(MonitorError::Subscribe)?;

        Ok(Self { socket })
    }
}

impl AsFd for UdevMonitor {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}

impl EventSource for UdevMonitor {
    type Device = udev::Event;

    fn receive(&mut self) -> Option<udev::Event> {
        self.socket.iter().next()
    }
}

/// What to do after one `poll` call.
#[derive(Debug, PartialEq, Eq)]
enum Wait {
    Ready,
    Retry,
    Stop(StopReason),
}

fn wait_outcome(result: nix::Result<c_int>) -> Wait {
    match result {
        Ok(0) => {
            warn!("Event wait returned with nothing ready");
            Wait::Stop(StopReason::NothingReady)
        }
        Ok(_) => Wait::Ready,
        Err(Errno::EINTR) => Wait::Retry,
        Err(errno) => {
            warn!("Event wait failed: {errno}");
            Wait::Stop(StopReason::WaitFailed(errno))
        }
    }
}

fn readiness(fd: &PollFd<'_>) -> PollFlags {
    fd.revents().unwrap_or(PollFlags::empty())
}

/// Feeds every event from `source` to `handler` until `shutdown` fires or the
/// wait fails.
///
/// Blocks without timeout between events. Wakeups that yield no event are
/// ignored. Only a readable `shutdown`, a hung-up source or a failing `poll`
/// ends the loop; all of these are reported as a [`StopReason`].
pub fn monitor_partitions<S, H>(
    source: &mut S,
    shutdown: &mut Shutdown,
    handler: &mut H,
) -> Result<StopReason>
where
    S: EventSource,
    H: EventHandler<S::Device>,
{
    info!("Monitoring partition events");

    loop {
        let (source_ready, stop_ready) = {
            let mut fds = [
                PollFd::new(source.as_fd(), PollFlags::POLLIN),
                PollFd::new(shutdown.as_fd(), PollFlags::POLLIN),
            ];

            match wait_outcome(poll(&mut fds, PollTimeout::NONE)) {
                Wait::Ready => {}
                Wait::Retry => continue,
                Wait::Stop(reason) => return Ok(reason),
            }

            (readiness(&fds[0]), readiness(&fds[1]))
        };

        if !stop_ready.is_empty() {
            let cause = shutdown.acknowledge();
            info!("Stopping partition monitor: {cause}");
            return Ok(StopReason::Cancelled);
        }

        if source_ready.contains(PollFlags::POLLIN) {
            match source.receive() {
                Some(device) => handler.handle(&device),
                None => trace!("Wakeup without a device event"),
            }
        } else if source_ready
            .intersects(PollFlags::POLLERR | PollFlags::POLLHUP | PollFlags::POLLNVAL)
        {
            warn!("Event source closed ({source_ready:?}), no further events will arrive");
            return Ok(StopReason::SourceClosed);
        }
    }
}
