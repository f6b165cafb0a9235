//! Proxies for calling into remote objects through their introspection data.

pub use self::object_proxy::ObjectProxy;
mod object_proxy;

pub use self::interface_proxy::{InterfaceProxy, Output};
mod interface_proxy;
