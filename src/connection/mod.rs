//! The connection dispatch engine.
//!
//! A [`Connection`] lives on a single thread and is driven by
//! [`Connection::run`]. Everything a [`Transport`] reports, possibly from
//! other threads, goes through its [`Hooks`] handle and is queued up to be
//! processed by the loop, which is the only place handlers and pending call
//! continuations are invoked from.

pub use self::connection::Connection;
mod connection;

pub use self::builder::ConnectionBuilder;
mod builder;

pub use self::address::{Address, BusType};
mod address;

pub use self::state::ConnectionState;
mod state;

pub use self::handler::{FilterId, HandlerResult};
pub(crate) use self::handler::Registry;
mod handler;

pub use self::pending::{PendingCall, Timeout};
pub(crate) use self::pending::PendingEntry;
mod pending;

pub use self::hooks::{Hooks, TimerId, WatchFlags, WatchId};
pub(crate) use self::hooks::Deferred;
mod hooks;

pub(crate) use self::watch::{TimerHandle, WatchHandle};
mod watch;

pub use self::transport::{DispatchStatus, Transport, DEFAULT_TIMEOUT};
mod transport;

pub use self::memory::MemoryTransport;
mod memory;
