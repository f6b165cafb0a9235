use std::fmt;
use std::rc::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::{Message, Serial};

use super::connection::Shared;

/// How long to wait for the reply to a method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    /// Use the timeout configured for the connection, or the transport's own
    /// default.
    #[default]
    Default,
    /// Wait for the given duration.
    After(Duration),
    /// Wait until the reply arrives or the connection is closed.
    Infinite,
}

impl Timeout {
    /// Interpret a timeout in milliseconds the way libdbus does: negative
    /// values use the default and `i32::MAX` never times out.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use dynbus::Timeout;
    ///
    /// assert_eq!(Timeout::from_millis(-1), Timeout::Default);
    /// assert_eq!(Timeout::from_millis(100), Timeout::After(Duration::from_millis(100)));
    /// assert_eq!(Timeout::from_millis(i32::MAX), Timeout::Infinite);
    /// ```
    pub fn from_millis(millis: i32) -> Self {
        match millis {
            i32::MAX => Timeout::Infinite,
            millis if millis < 0 => Timeout::Default,
            millis => Timeout::After(Duration::from_millis(millis as u64)),
        }
    }
}

impl From<Duration> for Timeout {
    #[inline]
    fn from(duration: Duration) -> Self {
        Timeout::After(duration)
    }
}

/// A continuation waiting for the reply to a call.
pub(crate) struct PendingEntry {
    pub(crate) continuation: Box<dyn FnOnce(Message)>,
    pub(crate) timer: Option<JoinHandle<()>>,
}

impl PendingEntry {
    /// Take the continuation, stopping the reply timer.
    pub(crate) fn into_continuation(self) -> Box<dyn FnOnce(Message)> {
        if let Some(timer) = &self.timer {
            timer.abort();
        }

        self.continuation
    }
}

/// A token for a call waiting for its reply.
///
/// The continuation the call was sent with runs exactly once: with the reply,
/// with a `org.freedesktop.DBus.Error.NoReply` error when the call times out,
/// or with a `org.freedesktop.DBus.Error.Disconnected` error when the
/// connection is closed first.
pub struct PendingCall {
    pub(super) serial: Serial,
    pub(super) shared: Weak<Shared>,
}

impl PendingCall {
    /// The serial of the call.
    pub fn serial(&self) -> Serial {
        self.serial
    }

    /// Test if the continuation of the call has run.
    pub fn is_completed(&self) -> bool {
        match self.shared.upgrade() {
            Some(shared) => !shared.is_pending(self.serial),
            None => true,
        }
    }
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall")
            .field("serial", &self.serial)
            .field("completed", &self.is_completed())
            .finish()
    }
}
