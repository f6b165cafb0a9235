use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::mem::take;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, ErrorKind, Result};
use crate::org_freedesktop_dbus;
use crate::protocol::{MessageType, Type};
use crate::{Message, ObjectPath, ObjectProxy, Serial, Signature, SignatureCache};

use super::handler::Handler;
use super::{ConnectionState, Deferred, FilterId, HandlerResult, Hooks, PendingCall};
use super::{PendingEntry, Registry, Timeout, TimerHandle, Transport, WatchHandle};
use super::{TimerId, WatchId};

type ErrorHook = Rc<dyn Fn(&Error)>;

/// Configuration handed over by the builder.
pub(super) struct Config {
    pub(super) default_timeout: Option<Duration>,
    pub(super) on_handler_error: Option<ErrorHook>,
}

pub(crate) struct Shared {
    state: Cell<ConnectionState>,
    transport: RefCell<Box<dyn Transport>>,
    hooks: Hooks,
    receiver: RefCell<Option<mpsc::UnboundedReceiver<Deferred>>>,
    pending: RefCell<HashMap<Serial, PendingEntry>>,
    registry: RefCell<Registry>,
    watches: RefCell<HashMap<WatchId, WatchHandle>>,
    timers: RefCell<HashMap<TimerId, TimerHandle>>,
    signatures: RefCell<SignatureCache>,
    config: Config,
}

impl Shared {
    pub(super) fn is_pending(&self, serial: Serial) -> bool {
        self.pending.borrow().contains_key(&serial)
    }

    /// Fail every outstanding call with a disconnected error.
    ///
    /// The map is emptied before any continuation runs.
    fn cancel_pending(&self) -> Vec<Result<(), Box<dyn Any + Send>>> {
        let mut pending = take(&mut *self.pending.borrow_mut())
            .into_iter()
            .collect::<Vec<_>>();

        pending.sort_by_key(|(serial, _)| *serial);

        let mut outcomes = Vec::with_capacity(pending.len());

        for (serial, entry) in pending {
            tracing::debug!(%serial, "Cancelling pending call");

            let reply = Message::error_reply(
                serial,
                org_freedesktop_dbus::DISCONNECTED,
                Some("Connection was closed"),
            );

            let continuation = entry.into_continuation();
            outcomes.push(catch_unwind(AssertUnwindSafe(move || continuation(reply))));
        }

        outcomes
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if matches!(self.state.get(), ConnectionState::Closed) {
            return;
        }

        self.state.set(ConnectionState::Closed);
        self.watches.get_mut().clear();
        self.timers.get_mut().clear();
        self.transport.get_mut().close();

        for outcome in self.cancel_pending() {
            if outcome.is_err() {
                tracing::error!("Pending call continuation panicked while dropping connection");
            }
        }
    }
}

/// A connection dispatching messages from a [`Transport`].
///
/// The connection is a cheap handle which can be cloned, all clones refer to
/// the same connection. It is bound to the thread it was opened on and must be
/// driven by [`Connection::run`], typically inside of a
/// [`LocalSet`][tokio::task::LocalSet].
///
/// # Examples
///
/// ```
/// use dynbus::{ConnectionBuilder, HandlerResult, MemoryTransport, Message, Timeout};
///
/// # #[tokio::main(flavor = "current_thread")] async fn main() -> dynbus::Result<()> {
/// let (a, b) = MemoryTransport::pair();
/// let client = ConnectionBuilder::new().open(a)?;
/// let server = ConnectionBuilder::new().open(b)?;
///
/// server.register_object_path("/org/example", |c, m| {
///     c.send(Message::method_return(m)?)?;
///     Ok(HandlerResult::Handled)
/// })?;
///
/// let local = tokio::task::LocalSet::new();
///
/// local.run_until(async move {
///     tokio::task::spawn_local({
///         let server = server.clone();
///         async move { server.run().await }
///     });
///
///     tokio::task::spawn_local({
///         let client = client.clone();
///         async move { client.run().await }
///     });
///
///     let call = Message::method_call(None, "/org/example", None, "Ping")?;
///     let reply = client.call(call, Timeout::Default).await?;
///     assert_eq!(reply.message_type(), dynbus::MessageType::METHOD_RETURN);
///     Ok(())
/// }).await
/// # }
/// ```
#[derive(Clone)]
pub struct Connection {
    shared: Rc<Shared>,
}

impl Connection {
    pub(super) fn open(mut transport: Box<dyn Transport>, config: Config) -> Result<Self> {
        let (hooks, receiver) = Hooks::new();
        transport.open(hooks.clone())?;

        let shared = Rc::new(Shared {
            state: Cell::new(ConnectionState::Connected),
            transport: RefCell::new(transport),
            hooks,
            receiver: RefCell::new(Some(receiver)),
            pending: RefCell::new(HashMap::new()),
            registry: RefCell::new(Registry::default()),
            watches: RefCell::new(HashMap::new()),
            timers: RefCell::new(HashMap::new()),
            signatures: RefCell::new(SignatureCache::new()),
            config,
        });

        tracing::debug!("Connection opened");
        let connection = Self { shared };
        connection.check_dispatch_status();
        Ok(connection)
    }

    /// The state of the connection.
    pub fn state(&self) -> ConnectionState {
        match self.shared.state.get() {
            ConnectionState::Connected if !self.shared.transport.borrow().is_connected() => {
                ConnectionState::Disconnected
            }
            state => state,
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        match self.state() {
            ConnectionState::Connected => Ok(()),
            state => Err(Error::new(ErrorKind::InvalidState(state))),
        }
    }

    /// Drive the connection.
    ///
    /// This processes watches, timers, dispatches and reply timeouts until
    /// the connection is closed.
    ///
    /// # Errors
    ///
    /// Errors if the connection is already being driven.
    pub async fn run(&self) -> Result<()> {
        let Some(mut receiver) = self.shared.receiver.borrow_mut().take() else {
            return Err(Error::new(ErrorKind::AlreadyRunning));
        };

        while !self.is_closed() {
            let Some(deferred) = receiver.recv().await else {
                break;
            };

            self.process(deferred);
        }

        tracing::debug!("Connection loop finished");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        matches!(
            self.shared.state.get(),
            ConnectionState::Closing | ConnectionState::Closed
        )
    }

    fn process(&self, deferred: Deferred) {
        match deferred {
            Deferred::AddWatch {
                id,
                fd,
                flags,
                enabled,
            } => match WatchHandle::spawn(id, fd, flags, enabled, self.shared.hooks.sender()) {
                Ok(handle) => {
                    tracing::trace!(?id, fd, ?flags, enabled, "Adding watch");
                    self.shared.watches.borrow_mut().insert(id, handle);
                }
                Err(error) => {
                    tracing::error!(?id, fd, %error, "Failed to add watch");
                }
            },
            Deferred::ToggleWatch { id, enabled } => {
                if let Some(handle) = self.shared.watches.borrow().get(&id) {
                    tracing::trace!(?id, enabled, "Toggling watch");
                    handle.toggle(enabled);
                }
            }
            Deferred::RemoveWatch { id } => {
                tracing::trace!(?id, "Removing watch");
                self.shared.watches.borrow_mut().remove(&id);
            }
            Deferred::WatchReady { id, ready, ack } => {
                if self.shared.watches.borrow().contains_key(&id) {
                    let result = self.shared.transport.borrow_mut().handle_watch(id, ready);

                    if let Err(error) = result {
                        tracing::error!(?id, ?ready, %error, "Transport failed to handle watch");
                    }

                    self.check_dispatch_status();
                }

                _ = ack.send(());
            }
            Deferred::AddTimer {
                id,
                interval,
                enabled,
            } => {
                tracing::trace!(?id, ?interval, enabled, "Adding timer");
                let handle = TimerHandle::spawn(id, interval, enabled, self.shared.hooks.sender());
                self.shared.timers.borrow_mut().insert(id, handle);
            }
            Deferred::ToggleTimer { id, enabled } => {
                if let Some(handle) = self.shared.timers.borrow().get(&id) {
                    tracing::trace!(?id, enabled, "Toggling timer");
                    handle.toggle(enabled);
                }
            }
            Deferred::RemoveTimer { id } => {
                tracing::trace!(?id, "Removing timer");
                self.shared.timers.borrow_mut().remove(&id);
            }
            Deferred::TimerFired { id } => {
                if self.shared.timers.borrow().contains_key(&id) {
                    let result = self.shared.transport.borrow_mut().handle_timeout(id);

                    if let Err(error) = result {
                        tracing::error!(?id, %error, "Transport failed to handle timeout");
                    }

                    self.check_dispatch_status();
                }
            }
            Deferred::ReplyTimeout { serial } => {
                let entry = self.shared.pending.borrow_mut().remove(&serial);

                if let Some(entry) = entry {
                    tracing::debug!(%serial, "Pending call timed out");

                    let reply = Message::error_reply(
                        serial,
                        org_freedesktop_dbus::NO_REPLY,
                        Some("Did not receive a reply"),
                    );

                    self.complete(entry, reply);
                }
            }
            Deferred::Dispatch => {
                self.shared.hooks.dispatch_started();
                self.dispatch();
            }
            Deferred::Wake => {}
        }
    }

    /// Schedule a drain if the transport has queued messages without
    /// reporting them through its hooks.
    fn check_dispatch_status(&self) {
        if !matches!(self.shared.state.get(), ConnectionState::Connected) {
            return;
        }

        let status = self.shared.transport.borrow().dispatch_status();
        self.shared.hooks.dispatch_status(status);
    }

    /// Drain every queued message from the transport.
    fn dispatch(&self) {
        while matches!(self.shared.state.get(), ConnectionState::Connected) {
            let message = self.shared.transport.borrow_mut().pop_message();

            let Some(message) = message else {
                break;
            };

            self.deliver(message);
        }
    }

    fn deliver(&self, message: Message) {
        let is_reply = matches!(
            message.message_type(),
            MessageType::METHOD_RETURN | MessageType::ERROR
        );

        if is_reply {
            if let Some(reply_serial) = message.reply_serial() {
                let entry = self.shared.pending.borrow_mut().remove(&reply_serial);

                if let Some(entry) = entry {
                    self.complete(entry, message);
                    return;
                }
            }
        }

        let handlers = self.shared.registry.borrow().candidates(&message);

        for handler in handlers {
            // A handler which is already running further up the stack is
            // skipped.
            let Ok(mut guard) = handler.try_borrow_mut() else {
                continue;
            };

            let outcome = catch_unwind(AssertUnwindSafe(|| (&mut *guard)(self, &message)));

            match outcome {
                Ok(Ok(HandlerResult::Handled)) => return,
                Ok(Ok(HandlerResult::NotYetHandled)) => {}
                Ok(Err(error)) => {
                    self.report(&error);
                    return;
                }
                Err(panic) => {
                    self.report(&Error::new(ErrorKind::HandlerPanicked(panic_message(&*panic))));
                    return;
                }
            }
        }

        tracing::trace!(
            message_type = ?message.message_type(),
            path = ?message.path(),
            member = ?message.member(),
            "Dropping unhandled message"
        );
    }

    fn complete(&self, entry: PendingEntry, reply: Message) {
        let continuation = entry.into_continuation();

        if let Err(panic) = catch_unwind(AssertUnwindSafe(move || continuation(reply))) {
            self.report(&Error::new(ErrorKind::HandlerPanicked(panic_message(&*panic))));
        }
    }

    fn report(&self, error: &Error) {
        tracing::error!(%error, "Message handler failed");

        if let Some(hook) = &self.shared.config.on_handler_error {
            hook(error);
        }
    }

    /// Close the connection.
    ///
    /// Watches and timers are removed, the transport is closed and every
    /// pending call is completed with a disconnected error. Closing an
    /// already closed connection does nothing.
    pub fn close(&self) {
        if self.is_closed() {
            return;
        }

        tracing::debug!("Closing connection");
        self.shared.state.set(ConnectionState::Closing);

        let watches = take(&mut *self.shared.watches.borrow_mut());
        let timers = take(&mut *self.shared.timers.borrow_mut());
        drop((watches, timers));

        self.shared.transport.borrow_mut().close();

        for outcome in self.shared.cancel_pending() {
            if let Err(panic) = outcome {
                self.report(&Error::new(ErrorKind::HandlerPanicked(panic_message(&*panic))));
            }
        }

        self.shared.state.set(ConnectionState::Closed);
        self.shared.hooks.post(Deferred::Wake);
        tracing::debug!("Connection closed");
    }

    /// Send a message without waiting for a reply.
    ///
    /// # Errors
    ///
    /// Errors if the connection is not connected or if the transport fails to
    /// send the message.
    pub fn send(&self, message: Message) -> Result<Serial> {
        self.ensure_connected()?;
        let serial = self.shared.transport.borrow_mut().send(&message)?;
        tracing::trace!(%serial, message_type = ?message.message_type(), "Sent message");
        Ok(serial)
    }

    /// Send a message and run `continuation` once with its reply.
    ///
    /// The continuation runs on the connection loop with the reply, or with a
    /// synthesized error if the call times out or the connection is closed.
    ///
    /// # Errors
    ///
    /// Errors if the connection is not connected, if called outside of a
    /// Tokio runtime, or if the transport fails to send the message. The
    /// continuation is not run in that case.
    pub fn send_with_reply<F>(
        &self,
        message: Message,
        timeout: Timeout,
        continuation: F,
    ) -> Result<PendingCall>
    where
        F: FnOnce(Message) + 'static,
    {
        self.ensure_connected()?;

        let handle = Handle::try_current().map_err(|_| Error::new(ErrorKind::MissingRuntime))?;

        let duration = match timeout {
            Timeout::Default => Some(match self.shared.config.default_timeout {
                Some(duration) => duration,
                None => self.shared.transport.borrow().default_timeout(),
            }),
            Timeout::After(duration) => Some(duration),
            Timeout::Infinite => None,
        };

        let serial = self.shared.transport.borrow_mut().send(&message)?;

        let timer = duration.map(|duration| {
            let hooks = self.shared.hooks.clone();

            handle.spawn(async move {
                tokio::time::sleep(duration).await;
                hooks.post(Deferred::ReplyTimeout { serial });
            })
        });

        self.shared.pending.borrow_mut().insert(
            serial,
            PendingEntry {
                continuation: Box::new(continuation),
                timer,
            },
        );

        tracing::trace!(%serial, ?duration, "Sent message expecting reply");

        Ok(PendingCall {
            serial,
            shared: Rc::downgrade(&self.shared),
        })
    }

    /// Send a method call and wait for its reply.
    ///
    /// Timeouts and disconnects are delivered as error messages, like any
    /// other error reply.
    pub async fn call(&self, message: Message, timeout: Timeout) -> Result<Message> {
        let (tx, rx) = oneshot::channel();

        self.send_with_reply(message, timeout, move |reply| {
            _ = tx.send(reply);
        })?;

        match rx.await {
            Ok(reply) => Ok(reply),
            Err(..) => Err(Error::new(ErrorKind::InvalidState(ConnectionState::Closed))),
        }
    }

    /// The number of calls waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.shared.pending.borrow().len()
    }

    /// Add a filter which is offered every message not claimed by a pending
    /// call or an object path handler.
    pub fn add_filter<F>(&self, handler: F) -> FilterId
    where
        F: FnMut(&Connection, &Message) -> Result<HandlerResult> + 'static,
    {
        let handler: Handler = Rc::new(RefCell::new(handler));
        self.shared.registry.borrow_mut().add_filter(handler)
    }

    /// Remove a filter, returning `true` if it was registered.
    pub fn remove_filter(&self, id: FilterId) -> bool {
        self.shared.registry.borrow_mut().remove_filter(id)
    }

    /// Register a handler for messages addressed to exactly `path`.
    ///
    /// # Errors
    ///
    /// Errors if `path` is invalid or already has a handler.
    pub fn register_object_path<F>(&self, path: &str, handler: F) -> Result<()>
    where
        F: FnMut(&Connection, &Message) -> Result<HandlerResult> + 'static,
    {
        self.register(path, Rc::new(RefCell::new(handler)), false)
    }

    /// Register a handler for messages addressed to `path` or any path below
    /// it.
    ///
    /// # Errors
    ///
    /// Errors if `path` is invalid or already has a handler.
    pub fn register_fallback<F>(&self, path: &str, handler: F) -> Result<()>
    where
        F: FnMut(&Connection, &Message) -> Result<HandlerResult> + 'static,
    {
        self.register(path, Rc::new(RefCell::new(handler)), true)
    }

    fn register(&self, path: &str, handler: Handler, fallback: bool) -> Result<()> {
        let path = ObjectPath::new(path)?;
        tracing::trace!(%path, fallback, "Registering object path");
        self.shared
            .registry
            .borrow_mut()
            .register(path, handler, fallback)
    }

    /// Unregister the handler for `path`, returning `true` if one was
    /// registered.
    pub fn unregister_object_path(&self, path: &str) -> bool {
        match ObjectPath::new(path) {
            Ok(path) => self.shared.registry.borrow_mut().unregister(&path),
            Err(..) => false,
        }
    }

    /// Parse a signature through the signature cache of this connection.
    pub fn signature(&self, text: &str) -> Result<Signature> {
        Ok(self.shared.signatures.borrow_mut().get(text)?)
    }

    /// Access a remote object.
    ///
    /// Calls through the returned proxy are addressed to `destination`, or
    /// to the peer itself if it is `None`.
    ///
    /// # Errors
    ///
    /// Errors if `path` is not a valid object path.
    pub fn object(&self, destination: Option<&str>, path: &str) -> Result<ObjectProxy> {
        let path = ObjectPath::new(path)?;
        Ok(ObjectProxy::new(self.clone(), destination.map(Rc::from), path))
    }

    /// Test if the connection is connected.
    pub fn is_connected(&self) -> bool {
        matches!(self.state(), ConnectionState::Connected)
    }

    /// Test if the transport has authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.shared.transport.borrow().is_authenticated()
    }

    /// Test if the transport authenticated anonymously.
    pub fn is_anonymous(&self) -> bool {
        self.shared.transport.borrow().is_anonymous()
    }

    /// The id of the server the transport is connected to.
    pub fn server_id(&self) -> Option<String> {
        self.shared.transport.borrow().server_id()
    }

    /// The unique name of this end of the connection.
    pub fn unique_name(&self) -> Option<String> {
        self.shared.transport.borrow().unique_name()
    }

    /// Test if values of the given type can be sent over the connection.
    pub fn can_send_type(&self, ty: Type) -> bool {
        self.shared.transport.borrow().can_send_type(ty)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.shared.state.get())
            .field("pending_calls", &self.pending_calls())
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> Box<str> {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return (*message).into();
    }

    if let Some(message) = panic.downcast_ref::<String>() {
        return message.as_str().into();
    }

    "unknown panic".into()
}
