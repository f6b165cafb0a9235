use std::env;
use std::fmt;

use crate::error::{Error, ErrorKind, Result};

const ENV_STARTER_ADDRESS: &str = "DBUS_STARTER_ADDRESS";
const ENV_STARTER_BUS_TYPE: &str = "DBUS_STARTER_BUS_TYPE";
const ENV_SESSION_BUS: &str = "DBUS_SESSION_BUS_ADDRESS";
const ENV_SYSTEM_BUS: &str = "DBUS_SYSTEM_BUS_ADDRESS";
const DEFAULT_SYSTEM_BUS: &str = "unix:path=/var/run/dbus/system_bus_socket";

/// A well-known message bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusType {
    /// The per-login session bus.
    Session,
    /// The system-wide bus.
    System,
    /// The bus which started this process through activation.
    Starter,
}

impl BusType {
    /// Resolve the address of the bus from the environment.
    ///
    /// # Errors
    ///
    /// Errors with a missing bus if the environment does not name an address,
    /// except for the system bus which falls back to its well-known socket.
    pub fn address(self) -> Result<Address> {
        let address = match self {
            BusType::Session => env::var(ENV_SESSION_BUS).ok(),
            BusType::System => {
                Some(env::var(ENV_SYSTEM_BUS).unwrap_or_else(|_| DEFAULT_SYSTEM_BUS.to_owned()))
            }
            BusType::Starter => match env::var(ENV_STARTER_ADDRESS) {
                Ok(address) => Some(address),
                Err(..) => match env::var(ENV_STARTER_BUS_TYPE).as_deref() {
                    Ok("system") => return BusType::System.address(),
                    Ok("session") => return BusType::Session.address(),
                    _ => None,
                },
            },
        };

        let Some(address) = address else {
            tracing::debug!(bus = ?self, "No address for bus");
            return Err(Error::new(ErrorKind::MissingBus));
        };

        Address::parse(&address)
    }
}

/// A parsed bus address, such as `unix:path=/run/user/1000/bus`.
///
/// Only the first of several `;` separated addresses is kept.
///
/// # Examples
///
/// ```
/// use dynbus::Address;
///
/// let address = Address::parse("unix:path=/tmp/dbus%2dtest,guid=1234;tcp:host=localhost")?;
/// assert_eq!(address.transport(), "unix");
/// assert_eq!(address.unix_path(), Some("/tmp/dbus-test"));
/// assert_eq!(address.get("guid"), Some("1234"));
/// assert_eq!(address.get("host"), None);
/// # Ok::<_, dynbus::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    transport: String,
    params: Vec<(String, String)>,
}

impl Address {
    /// Parse an address.
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.split(';').next().unwrap_or_default();

        let Some((transport, rest)) = address.split_once(':') else {
            return Err(Error::new(ErrorKind::InvalidAddress));
        };

        if transport.is_empty() {
            return Err(Error::new(ErrorKind::InvalidAddress));
        }

        let mut params = Vec::new();

        for pair in rest.split(',').filter(|pair| !pair.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(Error::new(ErrorKind::InvalidAddress));
            };

            if key.is_empty() {
                return Err(Error::new(ErrorKind::InvalidAddress));
            }

            params.push((key.to_owned(), unescape(value)?));
        }

        Ok(Self {
            transport: transport.to_owned(),
            params,
        })
    }

    /// The transport named by the address, like `unix` or `tcp`.
    pub fn transport(&self) -> &str {
        &self.transport
    }

    /// Get the value of a parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    /// The socket path of a `unix` address.
    pub fn unix_path(&self) -> Option<&str> {
        if self.transport != "unix" {
            return None;
        }

        self.get("path")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.transport)?;

        for (n, (key, value)) in self.params.iter().enumerate() {
            if n > 0 {
                f.write_str(",")?;
            }

            write!(f, "{key}=")?;

            for b in value.bytes() {
                if b.is_ascii_alphanumeric() || b"-_/.\\*".contains(&b) {
                    write!(f, "{}", b as char)?;
                } else {
                    write!(f, "%{b:02x}")?;
                }
            }
        }

        Ok(())
    }
}

fn unescape(value: &str) -> Result<String> {
    let mut out = Vec::with_capacity(value.len());
    let mut bytes = value.bytes();

    while let Some(b) = bytes.next() {
        if b != b'%' {
            out.push(b);
            continue;
        }

        let (Some(hi), Some(lo)) = (bytes.next(), bytes.next()) else {
            return Err(Error::new(ErrorKind::InvalidAddress));
        };

        let (Some(hi), Some(lo)) = ((hi as char).to_digit(16), (lo as char).to_digit(16)) else {
            return Err(Error::new(ErrorKind::InvalidAddress));
        };

        out.push((hi << 4 | lo) as u8);
    }

    String::from_utf8(out).map_err(|_| Error::new(ErrorKind::InvalidAddress))
}
