//! Types associated with the `org.freedesktop.DBus` interface.

/// Well known destination name.
pub const DESTINATION: &str = "org.freedesktop.DBus";

/// Well known interface name.
pub const INTERFACE: &str = "org.freedesktop.DBus";

/// Well known D-Bus path.
pub const PATH: &str = "/org/freedesktop/DBus";

/// Error name delivered to a pending call whose reply did not arrive in time.
pub const NO_REPLY: &str = "org.freedesktop.DBus.Error.NoReply";

/// Error name delivered to pending calls when their connection is closed.
pub const DISCONNECTED: &str = "org.freedesktop.DBus.Error.Disconnected";

/// Interface implemented by objects which can describe themselves.
pub const INTROSPECTABLE: &str = "org.freedesktop.DBus.Introspectable";
