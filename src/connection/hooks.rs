use std::fmt;
use std::ops::BitOr;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{Interest, Ready};
use tokio::sync::{mpsc, oneshot};

use crate::Serial;

use super::DispatchStatus;

raw_set! {
    /// The readiness a watch is interested in, or which it reports.
    #[repr(u8)]
    pub enum WatchFlags {
        /// The descriptor is readable.
        READABLE = 1,
        /// The descriptor is writable.
        WRITABLE = 2,
        /// The descriptor has hung up, only ever reported.
        HANGUP = 4,
        /// The descriptor is in an error state, only ever reported.
        ERROR = 8,
    }
}

impl WatchFlags {
    /// Test if every flag in `other` is set.
    #[inline]
    pub fn contains(self, other: WatchFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Test if no flags are set.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn interest(self) -> Option<Interest> {
        match (self.contains(Self::READABLE), self.contains(Self::WRITABLE)) {
            (true, true) => Some(Interest::READABLE | Interest::WRITABLE),
            (true, false) => Some(Interest::READABLE),
            (false, true) => Some(Interest::WRITABLE),
            (false, false) => None,
        }
    }

    pub(crate) fn from_ready(ready: Ready) -> Self {
        let mut flags = WatchFlags::default();

        if ready.is_readable() {
            flags = flags | WatchFlags::READABLE;
        }

        if ready.is_writable() {
            flags = flags | WatchFlags::WRITABLE;
        }

        if ready.is_read_closed() || ready.is_write_closed() {
            flags = flags | WatchFlags::HANGUP;
        }

        if ready.is_error() {
            flags = flags | WatchFlags::ERROR;
        }

        flags
    }
}

impl BitOr<WatchFlags> for WatchFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: WatchFlags) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Identifies a watch registered through [`Hooks::add_watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

/// Identifies a timer registered through [`Hooks::add_timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Work queued up for the connection loop.
pub(crate) enum Deferred {
    AddWatch {
        id: WatchId,
        fd: RawFd,
        flags: WatchFlags,
        enabled: bool,
    },
    ToggleWatch {
        id: WatchId,
        enabled: bool,
    },
    RemoveWatch {
        id: WatchId,
    },
    WatchReady {
        id: WatchId,
        ready: WatchFlags,
        ack: oneshot::Sender<()>,
    },
    AddTimer {
        id: TimerId,
        interval: Duration,
        enabled: bool,
    },
    ToggleTimer {
        id: TimerId,
        enabled: bool,
    },
    RemoveTimer {
        id: TimerId,
    },
    TimerFired {
        id: TimerId,
    },
    ReplyTimeout {
        serial: Serial,
    },
    Dispatch,
    Wake,
}

struct Inner {
    ids: AtomicU64,
    dispatch_scheduled: AtomicBool,
}

/// The handle through which a [`Transport`] talks to its connection.
///
/// Hooks may be cloned and used from any thread. Every request is queued and
/// carried out by the connection loop, never inline.
///
/// [`Transport`]: crate::Transport
#[derive(Clone)]
pub struct Hooks {
    tx: mpsc::UnboundedSender<Deferred>,
    inner: Arc<Inner>,
}

impl Hooks {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Deferred>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let hooks = Self {
            tx,
            inner: Arc::new(Inner {
                ids: AtomicU64::new(1),
                dispatch_scheduled: AtomicBool::new(false),
            }),
        };

        (hooks, rx)
    }

    fn next_id(&self) -> u64 {
        self.inner.ids.fetch_add(1, Ordering::Relaxed)
    }

    /// Watch `fd` for the readiness in `flags`.
    ///
    /// When the descriptor becomes ready [`Transport::handle_watch`] is called
    /// on the connection loop. The descriptor must stay open until the watch
    /// is removed.
    ///
    /// [`Transport::handle_watch`]: crate::Transport::handle_watch
    pub fn add_watch(&self, fd: RawFd, flags: WatchFlags, enabled: bool) -> WatchId {
        let id = WatchId(self.next_id());

        self.post(Deferred::AddWatch {
            id,
            fd,
            flags,
            enabled,
        });

        id
    }

    /// Enable or disable a watch without removing it.
    pub fn toggle_watch(&self, id: WatchId, enabled: bool) {
        self.post(Deferred::ToggleWatch { id, enabled });
    }

    /// Remove a watch.
    pub fn remove_watch(&self, id: WatchId) {
        self.post(Deferred::RemoveWatch { id });
    }

    /// Add a timer which fires every `interval` while enabled, calling
    /// [`Transport::handle_timeout`] on the connection loop.
    ///
    /// [`Transport::handle_timeout`]: crate::Transport::handle_timeout
    pub fn add_timer(&self, interval: Duration, enabled: bool) -> TimerId {
        let id = TimerId(self.next_id());

        self.post(Deferred::AddTimer {
            id,
            interval,
            enabled,
        });

        id
    }

    /// Enable or disable a timer. Enabling restarts its interval.
    pub fn toggle_timer(&self, id: TimerId, enabled: bool) {
        self.post(Deferred::ToggleTimer { id, enabled });
    }

    /// Remove a timer.
    pub fn remove_timer(&self, id: TimerId) {
        self.post(Deferred::RemoveTimer { id });
    }

    /// Report the dispatch status of the transport.
    ///
    /// If data remains a drain of the transport is scheduled on the loop.
    /// Repeated reports before the drain runs are coalesced.
    pub fn dispatch_status(&self, status: DispatchStatus) {
        if status != DispatchStatus::DataRemains {
            return;
        }

        if !self.inner.dispatch_scheduled.swap(true, Ordering::AcqRel) {
            self.post(Deferred::Dispatch);
        }
    }

    /// Called by the loop right before it drains the transport.
    pub(crate) fn dispatch_started(&self) {
        self.inner.dispatch_scheduled.store(false, Ordering::Release);
    }

    pub(crate) fn post(&self, deferred: Deferred) {
        if self.tx.send(deferred).is_err() {
            tracing::trace!("Connection loop is gone, dropping deferred work");
        }
    }

    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<Deferred> {
        self.tx.clone()
    }
}

impl fmt::Debug for Hooks {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}
