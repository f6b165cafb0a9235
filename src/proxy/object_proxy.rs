use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, ErrorKind, Result};
use crate::introspect::{self, Node};
use crate::org_freedesktop_dbus::INTROSPECTABLE;
use crate::{Connection, FilterId, HandlerResult, Message, MessageType, ObjectPath};
use crate::{Signature, Timeout, Value};

use super::InterfaceProxy;

/// A remote object, addressed by an optional destination and an object path.
///
/// Constructed through [`Connection::object`]. Clones share the cached
/// introspection data.
///
/// # Examples
///
/// ```no_run
/// use dynbus::{ConnectionBuilder, MemoryTransport};
///
/// # async fn run() -> dynbus::Result<()> {
/// let (transport, _peer) = MemoryTransport::pair();
/// let c = ConnectionBuilder::new().open(transport)?;
///
/// let object = c.object(Some("org.freedesktop.Notifications"), "/org/freedesktop/Notifications")?;
/// let notifications = object.interface("org.freedesktop.Notifications").await?;
/// let capabilities = notifications.call("GetCapabilities", &[]).await?;
/// # _ = capabilities;
/// # Ok(()) }
/// ```
#[derive(Clone)]
pub struct ObjectProxy {
    connection: Connection,
    destination: Option<Rc<str>>,
    path: ObjectPath,
    timeout: Timeout,
    introspection: Rc<RefCell<Option<Rc<Node>>>>,
}

impl ObjectProxy {
    pub(crate) fn new(connection: Connection, destination: Option<Rc<str>>, path: ObjectPath) -> Self {
        Self {
            connection,
            destination,
            path,
            timeout: Timeout::Default,
            introspection: Rc::new(RefCell::new(None)),
        }
    }

    /// Use `timeout` for calls made through this object and the proxies
    /// derived from it.
    pub fn with_timeout(self, timeout: Timeout) -> Self {
        Self { timeout, ..self }
    }

    /// The connection the object is reached through.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// The destination calls are addressed to.
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// The path of the object.
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Construct a proxy for another object on the same destination.
    pub(crate) fn sibling(&self, path: ObjectPath) -> Self {
        Self::new(self.connection.clone(), self.destination.clone(), path).with_timeout(self.timeout)
    }

    /// Describe the object by calling
    /// `org.freedesktop.DBus.Introspectable.Introspect`.
    ///
    /// The result is cached, later calls return it without a round trip.
    ///
    /// # Errors
    ///
    /// Errors if the call fails or the returned document can't be parsed.
    pub async fn introspect(&self) -> Result<Rc<Node>> {
        if let Some(node) = &*self.introspection.borrow() {
            return Ok(node.clone());
        }

        let signature = Signature::empty();
        let reply = self
            .call_message(INTROSPECTABLE, "Introspect", &signature, &[])
            .await?;

        let values = reply.arguments()?;

        let [Value::Str(document)] = &values[..] else {
            return Err(Error::new(ErrorKind::UnexpectedReply(
                reply.signature().as_str().into(),
            )));
        };

        let node = Rc::new(introspect::parse(document)?);
        tracing::trace!(path = %self.path, interfaces = node.interfaces.len(), "Introspected object");
        *self.introspection.borrow_mut() = Some(node.clone());
        Ok(node)
    }

    /// Forget cached introspection data.
    pub fn invalidate(&self) {
        self.introspection.borrow_mut().take();
    }

    /// Access the object through one of its interfaces, introspecting it if
    /// that hasn't been done yet.
    ///
    /// # Errors
    ///
    /// Errors if introspection fails or the object doesn't implement
    /// `interface`.
    pub async fn interface(&self, interface: &str) -> Result<InterfaceProxy> {
        let node = self.introspect().await?;

        let Some(index) = node.interfaces.iter().position(|i| i.name == interface) else {
            return Err(Error::new(ErrorKind::UnknownInterface(interface.into())));
        };

        Ok(InterfaceProxy::new(self.clone(), node, index))
    }

    /// Call a method without consulting introspection data, encoding
    /// `arguments` against `signature`.
    ///
    /// # Errors
    ///
    /// Errors if the arguments don't match the signature, if the call fails
    /// to be sent, or if it is answered with an error reply.
    pub async fn call(
        &self,
        interface: &str,
        method: &str,
        signature: &Signature,
        arguments: &[Value],
    ) -> Result<Vec<Value>> {
        let reply = self.call_message(interface, method, signature, arguments).await?;
        reply.arguments()
    }

    pub(super) async fn call_message(
        &self,
        interface: &str,
        method: &str,
        signature: &Signature,
        arguments: &[Value],
    ) -> Result<Message> {
        let message = Message::method_call(
            self.destination.as_deref(),
            self.path.as_str(),
            Some(interface),
            method,
        )?
        .with_arguments(signature, arguments)?;

        let reply = self.connection.call(message, self.timeout).await?;

        if reply.message_type() == MessageType::ERROR {
            let name = reply.error_name().unwrap_or_default();
            tracing::debug!(path = %self.path, interface, method, name, "Call failed");

            return Err(Error::new(ErrorKind::Reply {
                name: name.into(),
                message: reply.error_text().map(String::into_boxed_str),
            }));
        }

        Ok(reply)
    }

    /// Subscribe to a signal emitted by this object.
    ///
    /// `listener` is called on the connection loop with the decoded arguments
    /// of every matching signal. Other handlers still see the signal.
    /// Remove the subscription with [`Connection::remove_filter`].
    pub fn on_signal<F>(&self, interface: &str, member: &str, mut listener: F) -> FilterId
    where
        F: FnMut(&[Value]) -> Result<()> + 'static,
    {
        let path = self.path.clone();
        let interface = Box::<str>::from(interface);
        let member = Box::<str>::from(member);

        self.connection.add_filter(move |_, message| {
            let matches = message.message_type() == MessageType::SIGNAL
                && message.path() == Some(&path)
                && message.interface() == Some(&*interface)
                && message.member() == Some(&*member);

            if matches {
                listener(&message.arguments()?)?;
            }

            Ok(HandlerResult::NotYetHandled)
        })
    }
}

impl fmt::Debug for ObjectProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectProxy")
            .field("destination", &self.destination)
            .field("path", &self.path)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
