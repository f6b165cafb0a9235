use std::time::Duration;

use crate::error::Result;
use crate::protocol::Type;
use crate::{Message, Serial};

use super::{Hooks, TimerId, WatchFlags, WatchId};

/// The reply timeout used when neither the caller nor the builder specify
/// one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(25);

/// Whether a transport has received messages which have not yet been popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// More messages are queued.
    DataRemains,
    /// Nothing is queued.
    Complete,
}

/// The message transport a [`Connection`] is layered on top of.
///
/// A transport owns socket I/O, authentication and framing. It hands complete
/// messages to the connection through [`Transport::pop_message`], and asks
/// for watches, timers and dispatches through the [`Hooks`] it is opened
/// with. Every method is called from the connection loop.
///
/// [`Connection`]: crate::Connection
pub trait Transport {
    /// Open the transport, registering any watches and timers it needs.
    fn open(&mut self, hooks: Hooks) -> Result<()>;

    /// Close the transport. Called once.
    fn close(&mut self);

    /// Send a message, returning the serial it was assigned.
    ///
    /// This must not wait for a reply.
    fn send(&mut self, message: &Message) -> Result<Serial>;

    /// Pop the next received message.
    fn pop_message(&mut self) -> Option<Message>;

    /// Test if received messages remain queued.
    ///
    /// The connection checks this after opening the transport and after
    /// every watch or timer it hands over, so messages queued without a
    /// call to [`Hooks::dispatch_status`] are still drained.
    fn dispatch_status(&self) -> DispatchStatus;

    /// Handle readiness on a watched descriptor.
    ///
    /// Readiness is edge triggered, the transport should consume everything
    /// that is available before returning.
    fn handle_watch(&mut self, id: WatchId, ready: WatchFlags) -> Result<()> {
        _ = (id, ready);
        Ok(())
    }

    /// Handle a timer firing.
    fn handle_timeout(&mut self, id: TimerId) -> Result<()> {
        _ = id;
        Ok(())
    }

    /// The reply timeout used when none is configured.
    fn default_timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    /// Test if the transport is connected.
    fn is_connected(&self) -> bool;

    /// Test if the transport has authenticated.
    fn is_authenticated(&self) -> bool {
        self.is_connected()
    }

    /// Test if the transport authenticated anonymously.
    fn is_anonymous(&self) -> bool {
        false
    }

    /// The id of the server the transport is connected to.
    fn server_id(&self) -> Option<String> {
        None
    }

    /// The unique name assigned to this end of the transport.
    fn unique_name(&self) -> Option<String> {
        None
    }

    /// Test if values of the given type can be sent.
    fn can_send_type(&self, ty: Type) -> bool {
        ty != Type::UNIX_FD
    }
}
