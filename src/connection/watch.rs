use std::io;
use std::os::fd::{BorrowedFd, OwnedFd, RawFd};
use std::time::Duration;

use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::{Deferred, TimerId, WatchFlags, WatchId};

#[derive(Debug, Clone, Copy)]
struct WatchConfig {
    flags: WatchFlags,
    enabled: bool,
}

/// The loop-side half of a transport watch.
///
/// The readiness task only ever posts to the connection queue. Toggling
/// reconfigures the running task instead of spawning a new one.
pub(crate) struct WatchHandle {
    config: watch::Sender<WatchConfig>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub(crate) fn spawn(
        id: WatchId,
        fd: RawFd,
        flags: WatchFlags,
        enabled: bool,
        tx: mpsc::UnboundedSender<Deferred>,
    ) -> io::Result<Self> {
        // SAFETY: The transport keeps the descriptor open while the watch is
        // registered, and we only borrow it long enough to duplicate it.
        let fd = unsafe { BorrowedFd::borrow_raw(fd) }.try_clone_to_owned()?;
        // The same descriptor may back several watches, each registers its
        // own duplicate with the reactor.
        let fd = AsyncFd::with_interest(fd, Interest::READABLE | Interest::WRITABLE)?;

        let (config, rx) = watch::channel(WatchConfig { flags, enabled });
        let task = tokio::spawn(watch_task(id, fd, rx, tx));
        Ok(Self { config, task })
    }

    pub(crate) fn toggle(&self, enabled: bool) {
        self.config.send_modify(|config| config.enabled = enabled);
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn watch_task(
    id: WatchId,
    fd: AsyncFd<OwnedFd>,
    mut config: watch::Receiver<WatchConfig>,
    tx: mpsc::UnboundedSender<Deferred>,
) {
    loop {
        let current = *config.borrow_and_update();

        let interest = match current.flags.interest() {
            Some(interest) if current.enabled => interest,
            _ => {
                if config.changed().await.is_err() {
                    return;
                }

                continue;
            }
        };

        tokio::select! {
            changed = config.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            guard = fd.ready(interest) => {
                let mut guard = match guard {
                    Ok(guard) => guard,
                    Err(error) => {
                        tracing::error!(?id, %error, "Watch failed");
                        return;
                    }
                };

                let ready = guard.ready();
                let (ack, acked) = oneshot::channel();

                let deferred = Deferred::WatchReady {
                    id,
                    ready: WatchFlags::from_ready(ready),
                    ack,
                };

                if tx.send(deferred).is_err() {
                    return;
                }

                // Readiness is only cleared once the transport has handled it.
                if acked.await.is_err() {
                    return;
                }

                guard.clear_ready_matching(ready);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TimerConfig {
    interval: Duration,
    enabled: bool,
}

/// The loop-side half of a transport timer.
pub(crate) struct TimerHandle {
    config: watch::Sender<TimerConfig>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub(crate) fn spawn(
        id: TimerId,
        interval: Duration,
        enabled: bool,
        tx: mpsc::UnboundedSender<Deferred>,
    ) -> Self {
        let (config, rx) = watch::channel(TimerConfig { interval, enabled });
        let task = tokio::spawn(timer_task(id, rx, tx));
        Self { config, task }
    }

    pub(crate) fn toggle(&self, enabled: bool) {
        self.config.send_modify(|config| config.enabled = enabled);
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn timer_task(
    id: TimerId,
    mut config: watch::Receiver<TimerConfig>,
    tx: mpsc::UnboundedSender<Deferred>,
) {
    loop {
        let current = *config.borrow_and_update();

        if !current.enabled {
            if config.changed().await.is_err() {
                return;
            }

            continue;
        }

        tokio::select! {
            changed = config.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            _ = tokio::time::sleep(current.interval) => {
                if tx.send(Deferred::TimerFired { id }).is_err() {
                    return;
                }
            }
        }
    }
}
