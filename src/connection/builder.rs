use std::rc::Rc;
use std::time::Duration;

use crate::error::{Error, Result};

use super::connection::Config;
use super::{Address, BusType, Connection, Transport};

enum Target {
    Bus(BusType),
    Address(Box<str>),
}

/// Builder of a [`Connection`].
pub struct ConnectionBuilder {
    target: Target,
    default_timeout: Option<Duration>,
    on_handler_error: Option<Rc<dyn Fn(&Error)>>,
}

impl ConnectionBuilder {
    /// Construct a new [`ConnectionBuilder`] with the default configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::ConnectionBuilder;
    ///
    /// let c = ConnectionBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            target: Target::Bus(BusType::Session),
            default_timeout: None,
            on_handler_error: None,
        }
    }

    /// Connect to the session bus (default).
    pub fn session_bus(&mut self) -> &mut Self {
        self.target = Target::Bus(BusType::Session);
        self
    }

    /// Connect to the system bus.
    pub fn system_bus(&mut self) -> &mut Self {
        self.target = Target::Bus(BusType::System);
        self
    }

    /// Connect to the bus which activated this process.
    pub fn starter_bus(&mut self) -> &mut Self {
        self.target = Target::Bus(BusType::Starter);
        self
    }

    /// Connect to an explicit address instead of a well-known bus.
    pub fn address(&mut self, address: &str) -> &mut Self {
        self.target = Target::Address(address.into());
        self
    }

    /// The reply timeout used by calls sent with [`Timeout::Default`].
    ///
    /// Without one the transport's default applies.
    ///
    /// [`Timeout::Default`]: crate::Timeout::Default
    pub fn default_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Install a hook which is called with every error raised by a message
    /// handler or reply continuation.
    ///
    /// Failures are logged regardless.
    pub fn on_handler_error<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Error) + 'static,
    {
        self.on_handler_error = Some(Rc::new(hook));
        self
    }

    /// Resolve the configured address, connect a transport to it with
    /// `connector` and open a [`Connection`] over it.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::{ConnectionBuilder, MemoryTransport};
    ///
    /// # #[tokio::main(flavor = "current_thread")] async fn main() -> dynbus::Result<()> {
    /// let c = ConnectionBuilder::new()
    ///     .address("unix:path=/tmp/example")
    ///     .build(|address| {
    ///         assert_eq!(address.unix_path(), Some("/tmp/example"));
    ///         Ok(MemoryTransport::pair().0)
    ///     })?;
    ///
    /// assert!(c.is_connected());
    /// # Ok(()) }
    /// ```
    pub fn build<T, F>(&self, connector: F) -> Result<Connection>
    where
        F: FnOnce(&Address) -> Result<T>,
        T: Transport + 'static,
    {
        let address = match &self.target {
            Target::Bus(bus) => bus.address()?,
            Target::Address(address) => Address::parse(address)?,
        };

        tracing::debug!(%address, "Connecting");
        let transport = connector(&address)?;
        self.open(transport)
    }

    /// Open a [`Connection`] over an already connected transport.
    pub fn open<T>(&self, transport: T) -> Result<Connection>
    where
        T: Transport + 'static,
    {
        let config = Config {
            default_timeout: self.default_timeout,
            on_handler_error: self.on_handler_error.clone(),
        };

        Connection::open(Box::new(transport), config)
    }
}

impl Default for ConnectionBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
