use std::fmt;
use std::rc::Rc;

use crate::error::{Error, ErrorKind, Result};
use crate::introspect::{Interface, Node};
use crate::{FilterId, ObjectPath, Value};

use super::ObjectProxy;

/// A remote object seen through one of its introspected interfaces.
///
/// Constructed through [`ObjectProxy::interface`].
#[derive(Clone)]
pub struct InterfaceProxy {
    object: ObjectProxy,
    node: Rc<Node>,
    index: usize,
}

impl InterfaceProxy {
    pub(super) fn new(object: ObjectProxy, node: Rc<Node>, index: usize) -> Self {
        Self {
            object,
            node,
            index,
        }
    }

    /// The object this proxy calls into.
    pub fn object(&self) -> &ObjectProxy {
        &self.object
    }

    /// The introspected description of the interface.
    pub fn interface(&self) -> &Interface {
        &self.node.interfaces[self.index]
    }

    /// The name of the interface.
    pub fn name(&self) -> &str {
        &self.interface().name
    }

    /// Call `method`, with a signature built from its introspected inputs.
    ///
    /// Outputs declared as object paths come back as [`Output::Object`],
    /// addressed to the same destination as this proxy.
    ///
    /// # Errors
    ///
    /// Errors if the interface has no such method, if `arguments` don't match
    /// its inputs, or if the call is answered with an error reply.
    pub async fn call(&self, method: &str, arguments: &[Value]) -> Result<Vec<Output>> {
        let interface = self.interface();

        let Some(description) = interface.method(method) else {
            return Err(Error::new(ErrorKind::UnknownMethod(method.into())));
        };

        let signature = self
            .object
            .connection()
            .signature(&description.in_signature())?;

        let reply = self
            .object
            .call_message(&interface.name, method, &signature, arguments)
            .await?;

        let mut outputs = description.outputs();
        let mut values = Vec::new();

        for value in reply.arguments()? {
            let is_object = outputs
                .next()
                .map(|o| o.ty.as_str() == "o")
                .unwrap_or_default();

            values.push(match value {
                Value::ObjectPath(path) if is_object => Output::Object(self.object.sibling(path)),
                value => Output::Value(value),
            });
        }

        Ok(values)
    }

    /// Subscribe to one of the interface's signals.
    ///
    /// See [`ObjectProxy::on_signal`].
    ///
    /// # Errors
    ///
    /// Errors if the interface has no such signal.
    pub fn on_signal<F>(&self, signal: &str, listener: F) -> Result<FilterId>
    where
        F: FnMut(&[Value]) -> Result<()> + 'static,
    {
        if self.interface().signal(signal).is_none() {
            return Err(Error::new(ErrorKind::UnknownSignal(signal.into())));
        }

        Ok(self.object.on_signal(self.name(), signal, listener))
    }
}

impl fmt::Debug for InterfaceProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceProxy")
            .field("object", &self.object)
            .field("name", &self.name())
            .finish()
    }
}

/// A value returned by [`InterfaceProxy::call`].
#[derive(Debug, Clone)]
pub enum Output {
    /// A plain value.
    Value(Value),
    /// An object path output, ready to be called into.
    Object(ObjectProxy),
}

impl Output {
    /// Access the output as a plain value.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Output::Value(value) => Some(value),
            Output::Object(..) => None,
        }
    }

    /// Access the output as an object.
    pub fn as_object(&self) -> Option<&ObjectProxy> {
        match self {
            Output::Object(object) => Some(object),
            Output::Value(..) => None,
        }
    }

    /// Convert into a plain value, turning objects back into their paths.
    pub fn into_value(self) -> Value {
        match self {
            Output::Value(value) => value,
            Output::Object(object) => Value::ObjectPath(object.path().clone()),
        }
    }

    /// The object path of an object output.
    pub fn path(&self) -> Option<&ObjectPath> {
        self.as_object().map(ObjectProxy::path)
    }
}
