//! Parsing of introspection documents.
//!
//! Objects describe their interfaces through
//! `org.freedesktop.DBus.Introspectable.Introspect`, which returns an XML
//! document. [`parse`] turns it into a [`Node`] tree. See [`ObjectProxy`] for
//! calling methods described by it.
//!
//! [`ObjectProxy`]: crate::ObjectProxy


pub use self::elements::{
    Access, Annotation, Argument, Direction, Doc, Interface, Method, Node, Property, Signal,
};
mod elements;

pub use self::error::IntrospectError;
mod error;

pub use self::parser::parse;
mod parser;
