use crate::Signature;

/// A node in an introspection document.
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct Node {
    /// The name of the node. The root node usually has none, child nodes
    /// carry their path relative to the parent.
    pub name: Option<String>,
    /// Interfaces implemented by the node.
    pub interfaces: Vec<Interface>,
    /// Child nodes.
    pub nodes: Vec<Node>,
}

impl Node {
    /// Look up an interface by name.
    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Names of the child nodes.
    pub fn children(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|n| n.name.as_deref())
    }
}

/// An interface.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Interface {
    /// The name of the interface.
    pub name: String,
    /// Methods of the interface.
    pub methods: Vec<Method>,
    /// Signals of the interface.
    pub signals: Vec<Signal>,
    /// Properties of the interface.
    pub properties: Vec<Property>,
    /// Annotations attached to the interface.
    pub annotations: Vec<Annotation>,
    /// Documentation.
    pub doc: Doc,
}

impl Interface {
    /// Look up a method by name.
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Look up a signal by name.
    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.name == name)
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// The direction of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The argument is passed by the caller.
    In,
    /// The argument is returned to the caller, or carried by a signal.
    Out,
}

/// A method or signal argument.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Argument {
    /// The optional name of the argument.
    pub name: Option<String>,
    /// The single complete type of the argument.
    pub ty: Signature,
    /// The direction of the argument.
    pub direction: Direction,
    /// Annotations attached to the argument.
    pub annotations: Vec<Annotation>,
    /// Documentation.
    pub doc: Doc,
}

/// A method.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Method {
    /// The name of the method.
    pub name: String,
    /// Arguments in declaration order, inputs and outputs interleaved.
    pub arguments: Vec<Argument>,
    /// Annotations attached to the method.
    pub annotations: Vec<Annotation>,
    /// Documentation.
    pub doc: Doc,
}

impl Method {
    /// Arguments passed by the caller.
    pub fn inputs(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter().filter(|a| a.direction == Direction::In)
    }

    /// Arguments returned to the caller.
    pub fn outputs(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter().filter(|a| a.direction == Direction::Out)
    }

    /// The signature of the call, made up of the input types.
    pub fn in_signature(&self) -> String {
        self.inputs().map(|a| a.ty.as_str()).collect()
    }

    /// The signature of the reply, made up of the output types.
    pub fn out_signature(&self) -> String {
        self.outputs().map(|a| a.ty.as_str()).collect()
    }
}

/// A signal.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Signal {
    /// The name of the signal.
    pub name: String,
    /// Arguments carried by the signal.
    pub arguments: Vec<Argument>,
    /// Annotations attached to the signal.
    pub annotations: Vec<Annotation>,
    /// Documentation.
    pub doc: Doc,
}

impl Signal {
    /// The signature of the signal body.
    pub fn signature(&self) -> String {
        self.arguments.iter().map(|a| a.ty.as_str()).collect()
    }
}

/// How a property may be accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The property can only be read.
    Read,
    /// The property can only be written.
    Write,
    /// The property can be read and written.
    ReadWrite,
}

/// A property.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Property {
    /// The name of the property.
    pub name: String,
    /// The single complete type of the property.
    pub ty: Signature,
    /// How the property may be accessed.
    pub access: Access,
    /// Annotations attached to the property.
    pub annotations: Vec<Annotation>,
    /// Documentation.
    pub doc: Doc,
}

/// An annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Annotation {
    /// The name of the annotation, like `org.freedesktop.DBus.Deprecated`.
    pub name: String,
    /// The value of the annotation.
    pub value: String,
}

/// Documentation from the `doc` extension namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Doc {
    /// A one-line summary.
    pub summary: Option<String>,
    /// Paragraphs of the longer description.
    pub paragraphs: Vec<String>,
}
