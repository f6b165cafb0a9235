//! [<img alt="github" src="https://img.shields.io/badge/github-udoprog/dynbus-8da0cb?style=for-the-badge&logo=github" height="20">](https://github.com/udoprog/dynbus)
//!
//! A dynamically typed D-Bus marshalling engine and message dispatcher.
//!
//! Values cross the wire as [`Value`]s, described by a parsed [`Signature`].
//! The [`codec`] turns one into the other in both directions, and the
//! [`Connection`] drives a [`Transport`] on a Tokio event loop, dispatching
//! incoming messages to reply continuations, object path handlers and
//! filters.
//!
//! <br>
//!
//! ## Marshalling
//!
//! ```
//! use dynbus::{codec, Endianness, OwnedBuf, Signature, Value};
//!
//! let signature = Signature::new("sa{sv}")?;
//!
//! let mut props = std::collections::BTreeMap::new();
//! props.insert(String::from("volume"), Value::from(42u32));
//!
//! let values = [Value::from("speaker"), Value::from(props)];
//!
//! let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);
//! codec::encode_all(&mut buf, &signature, &values)?;
//!
//! let decoded = codec::decode_all(&mut buf.read(), &signature)?;
//! assert_eq!(decoded[0], Value::from("speaker"));
//! assert_eq!(decoded[1].as_mapping().and_then(|m| m.get("volume")), Some(&Value::from(42u32)));
//! # Ok::<_, dynbus::Error>(())
//! ```
//!
//! <br>
//!
//! ## Connections
//!
//! A connection is opened over a [`Transport`], which owns framing and
//! socket I/O. [`MemoryTransport`] connects two connections in the same
//! process. See [`Connection`] for a complete request and reply exchange.
//!
//! <br>
//!
//! ## Proxies
//!
//! [`Connection::object`] addresses a remote object. Its interfaces are
//! discovered through introspection, after which methods are called by name
//! with the call signature taken from the [`introspect`] data.

#![allow(clippy::module_inception)]

#[macro_use]
pub mod protocol;
#[doc(inline)]
pub use self::protocol::{Endianness, Flags, MessageType, Type};

#[doc(inline)]
pub use self::frame::Frame;
mod frame;

#[doc(inline)]
pub use self::write::Write;
mod write;

#[doc(inline)]
pub use self::read::Read;
mod read;

#[doc(inline)]
pub use self::error::{Error, Result};
mod error;

pub use self::buf::{OwnedBuf, ReadBuf};
pub mod buf;

#[doc(inline)]
pub use self::object_path::{ObjectPath, ObjectPathError};
mod object_path;

#[doc(inline)]
pub use self::signature::{BasicType, Signature, SignatureCache, SignatureError, SignatureNode};
mod signature;

#[doc(inline)]
pub use self::value::Value;
mod value;

pub mod codec;

#[doc(inline)]
pub use self::message::{Message, Serial};
mod message;

pub mod org_freedesktop_dbus;

#[doc(inline)]
pub use self::connection::{
    Address, BusType, Connection, ConnectionBuilder, ConnectionState, DispatchStatus, FilterId,
    HandlerResult, Hooks, MemoryTransport, PendingCall, Timeout, TimerId, Transport, WatchFlags,
    WatchId, DEFAULT_TIMEOUT,
};
mod connection;

pub mod introspect;

#[doc(inline)]
pub use self::proxy::{InterfaceProxy, ObjectProxy, Output};
mod proxy;
