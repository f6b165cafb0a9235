use xmlparser::{ElementEnd, Token, Tokenizer};

use crate::{Signature, SignatureError};

use super::error::{IntrospectError, IntrospectErrorKind};
use super::{Access, Annotation, Argument, Direction, Doc, Interface, Method, Node, Property, Signal};

/// Parse an introspection document, as returned by
/// `org.freedesktop.DBus.Introspectable.Introspect`.
///
/// Argument and property types are parsed as signatures holding a single
/// complete type. Elements from the `doc` extension namespace are collected
/// into [`Doc`].
///
/// # Examples
///
/// ```
/// use dynbus::introspect::{self, Direction};
///
/// let node = introspect::parse(r#"
/// <node>
///   <interface name="org.example.Contacts">
///     <method name="Add">
///       <arg name="name" type="s" direction="in"/>
///       <arg name="id" type="u" direction="out"/>
///     </method>
///     <signal name="Added">
///       <arg name="id" type="u"/>
///     </signal>
///   </interface>
///   <node name="contacts"/>
/// </node>
/// "#)?;
///
/// let contacts = node.interface("org.example.Contacts").unwrap();
/// let add = contacts.method("Add").unwrap();
/// assert_eq!(add.in_signature(), "s");
/// assert_eq!(add.out_signature(), "u");
/// assert_eq!(contacts.signal("Added").unwrap().arguments[0].direction, Direction::Out);
/// assert!(node.children().eq(["contacts"]));
/// # Ok::<_, dynbus::Error>(())
/// ```
pub fn parse(document: &str) -> Result<Node, IntrospectError> {
    let mut stack = Vec::new();
    let mut root = None;
    let mut path = String::new();

    macro_rules! error {
        ($kind:expr) => {
            IntrospectError::new(&path, $kind)
        };
    }

    macro_rules! expect_end {
        ($end:expr, $expected:literal) => {
            if let Some(end) = $end {
                if end != $expected {
                    return Err(error!(IntrospectErrorKind::MismatchingEnd {
                        expected: $expected.into(),
                        actual: end.into(),
                    }));
                }
            }
        };
    }

    for token in Tokenizer::from(document) {
        let token = token.map_err(|e| error!(e))?;

        match token {
            Token::ElementStart { local, .. } => {
                let local = local.as_str();

                let state = match (stack.last(), local) {
                    (None, "node") if root.is_none() => State::Node(NodeBuilder::default()),
                    (Some(State::Node(..)), "node") => State::Node(NodeBuilder::default()),
                    (Some(State::Node(..)), "interface") => {
                        State::Interface(InterfaceBuilder::default())
                    }
                    (Some(State::Interface(..)), "method") => State::Method(MemberBuilder::default()),
                    (Some(State::Interface(..)), "signal") => State::Signal(MemberBuilder::default()),
                    (Some(State::Interface(..)), "property") => {
                        State::Property(PropertyBuilder::default())
                    }
                    (Some(State::Method(..)), "arg") => {
                        State::Argument(ArgumentBuilder::new(Direction::In))
                    }
                    (Some(State::Signal(..)), "arg") => {
                        State::Argument(ArgumentBuilder::new(Direction::Out))
                    }
                    (Some(parent), "annotation") if parent.is_annotated() => {
                        State::Annotation(AnnotationBuilder::default())
                    }
                    (Some(parent), "doc") if parent.is_annotated() => State::Doc(Doc::default()),
                    (Some(State::Doc(..)), "summary") => State::Text("summary", String::new()),
                    (Some(State::Doc(..)), "description") => State::Description(Vec::new()),
                    (Some(State::Description(..)), "para") => State::Text("para", String::new()),
                    (_, element) => {
                        return Err(error!(IntrospectErrorKind::UnsupportedElementStart(
                            element.into()
                        )));
                    }
                };

                stack.push(state);

                if !path.is_empty() {
                    path.push('/');
                }

                path.push_str(local);
            }
            Token::ElementEnd { end, .. } => {
                let name = match end {
                    ElementEnd::Open => continue,
                    ElementEnd::Close(_, name) => Some(name.as_str()),
                    ElementEnd::Empty => None,
                };

                let Some(top) = stack.pop() else {
                    return Err(error!(IntrospectErrorKind::UnsupportedElementEnd));
                };

                match (stack.last_mut(), top) {
                    (None, State::Node(builder)) => {
                        expect_end!(name, "node");
                        root = Some(builder.build());
                    }
                    (Some(State::Node(parent)), State::Node(builder)) => {
                        expect_end!(name, "node");
                        parent.nodes.push(builder.build());
                    }
                    (Some(State::Node(parent)), State::Interface(builder)) => {
                        expect_end!(name, "interface");
                        parent.interfaces.push(builder.build().map_err(|e| error!(e))?);
                    }
                    (Some(State::Interface(parent)), State::Method(builder)) => {
                        expect_end!(name, "method");
                        let (name, arguments, annotations, doc) =
                            builder.build().map_err(|e| error!(e))?;

                        parent.methods.push(Method {
                            name,
                            arguments,
                            annotations,
                            doc,
                        });
                    }
                    (Some(State::Interface(parent)), State::Signal(builder)) => {
                        expect_end!(name, "signal");
                        let (name, arguments, annotations, doc) =
                            builder.build().map_err(|e| error!(e))?;

                        parent.signals.push(Signal {
                            name,
                            arguments,
                            annotations,
                            doc,
                        });
                    }
                    (Some(State::Interface(parent)), State::Property(builder)) => {
                        expect_end!(name, "property");
                        parent.properties.push(builder.build().map_err(|e| error!(e))?);
                    }
                    (Some(State::Method(parent) | State::Signal(parent)), State::Argument(builder)) => {
                        expect_end!(name, "arg");
                        parent.arguments.push(builder.build().map_err(|e| error!(e))?);
                    }
                    (Some(parent), State::Annotation(builder)) => {
                        expect_end!(name, "annotation");
                        let annotation = builder.build().map_err(|e| error!(e))?;

                        if let Some(annotations) = parent.annotations_mut() {
                            annotations.push(annotation);
                        }
                    }
                    (Some(parent), State::Doc(doc)) => {
                        expect_end!(name, "doc");

                        if let Some(target) = parent.doc_mut() {
                            *target = doc;
                        }
                    }
                    (Some(State::Doc(doc)), State::Text("summary", text)) => {
                        expect_end!(name, "summary");
                        doc.summary = Some(normalize(&text));
                    }
                    (Some(State::Doc(doc)), State::Description(paragraphs)) => {
                        expect_end!(name, "description");
                        doc.paragraphs = paragraphs;
                    }
                    (Some(State::Description(paragraphs)), State::Text("para", text)) => {
                        expect_end!(name, "para");
                        paragraphs.push(normalize(&text));
                    }
                    _ => return Err(error!(IntrospectErrorKind::UnsupportedElementEnd)),
                }

                if let Some(index) = path.rfind('/') {
                    path.truncate(index);
                } else {
                    path.clear();
                }
            }
            Token::Attribute {
                prefix,
                local,
                value,
                ..
            } => {
                let value = value.as_str();

                match (stack.last_mut(), prefix.as_str(), local.as_str()) {
                    // Namespace declarations are accepted but not validated.
                    (Some(State::Node(..)), "xmlns", _) | (Some(State::Node(..)), "", "xmlns") => {}
                    (Some(State::Node(builder)), "", "name") => {
                        builder.name = Some(value.into());
                    }
                    (Some(State::Interface(builder)), "", "name") => {
                        builder.name = Some(value.into());
                    }
                    (Some(State::Method(builder) | State::Signal(builder)), "", "name") => {
                        builder.name = Some(value.into());
                    }
                    (Some(State::Argument(builder)), "", "name") => {
                        builder.name = Some(value.into());
                    }
                    (Some(State::Argument(builder)), "", "type") => {
                        builder.ty = Some(value.into());
                    }
                    (Some(State::Argument(builder)), "", "direction") => {
                        builder.direction = match value {
                            "in" => Direction::In,
                            "out" => Direction::Out,
                            other => {
                                return Err(error!(IntrospectErrorKind::UnsupportedDirection(
                                    other.into()
                                )));
                            }
                        };
                    }
                    (Some(State::Property(builder)), "", "name") => {
                        builder.name = Some(value.into());
                    }
                    (Some(State::Property(builder)), "", "type") => {
                        builder.ty = Some(value.into());
                    }
                    (Some(State::Property(builder)), "", "access") => {
                        builder.access = Some(match value {
                            "read" => Access::Read,
                            "write" => Access::Write,
                            "readwrite" => Access::ReadWrite,
                            other => {
                                return Err(error!(IntrospectErrorKind::UnsupportedAccess(
                                    other.into()
                                )));
                            }
                        });
                    }
                    (Some(State::Annotation(builder)), "", "name") => {
                        builder.name = Some(value.into());
                    }
                    (Some(State::Annotation(builder)), "", "value") => {
                        builder.value = Some(unescape(value));
                    }
                    (_, _, name) => {
                        return Err(error!(IntrospectErrorKind::UnsupportedAttribute(
                            name.into()
                        )));
                    }
                }
            }
            Token::Text { text } | Token::Cdata { text, .. } => match stack.last_mut() {
                Some(State::Text(_, string)) => {
                    string.push_str(&unescape(text.as_str()));
                }
                _ => {
                    if !text.as_str().trim().is_empty() {
                        return Err(error!(IntrospectErrorKind::UnsupportedText));
                    }
                }
            },
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(error!(IntrospectErrorKind::UnclosedElement));
    }

    root.ok_or_else(|| error!(IntrospectErrorKind::MissingNode))
}

/// Collapse runs of whitespace in documentation text.
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace the predefined entities.
fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }

    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn single_type(ty: Option<String>) -> Result<Signature, IntrospectErrorKind> {
    let ty = ty.ok_or(IntrospectErrorKind::MissingType)?;
    let signature = Signature::new(ty)?;

    if signature.len() != 1 {
        return Err(SignatureError::NotSingleCompleteType.into());
    }

    Ok(signature)
}

#[derive(Default)]
struct NodeBuilder {
    name: Option<String>,
    interfaces: Vec<Interface>,
    nodes: Vec<Node>,
}

impl NodeBuilder {
    fn build(self) -> Node {
        Node {
            name: self.name,
            interfaces: self.interfaces,
            nodes: self.nodes,
        }
    }
}

#[derive(Default)]
struct InterfaceBuilder {
    name: Option<String>,
    methods: Vec<Method>,
    signals: Vec<Signal>,
    properties: Vec<Property>,
    annotations: Vec<Annotation>,
    doc: Doc,
}

impl InterfaceBuilder {
    fn build(self) -> Result<Interface, IntrospectErrorKind> {
        Ok(Interface {
            name: self.name.ok_or(IntrospectErrorKind::MissingName)?,
            methods: self.methods,
            signals: self.signals,
            properties: self.properties,
            annotations: self.annotations,
            doc: self.doc,
        })
    }
}

/// Shared by methods and signals.
#[derive(Default)]
struct MemberBuilder {
    name: Option<String>,
    arguments: Vec<Argument>,
    annotations: Vec<Annotation>,
    doc: Doc,
}

impl MemberBuilder {
    #[allow(clippy::type_complexity)]
    fn build(self) -> Result<(String, Vec<Argument>, Vec<Annotation>, Doc), IntrospectErrorKind> {
        let name = self.name.ok_or(IntrospectErrorKind::MissingName)?;
        Ok((name, self.arguments, self.annotations, self.doc))
    }
}

struct ArgumentBuilder {
    name: Option<String>,
    ty: Option<String>,
    direction: Direction,
    annotations: Vec<Annotation>,
    doc: Doc,
}

impl ArgumentBuilder {
    fn new(direction: Direction) -> Self {
        Self {
            name: None,
            ty: None,
            direction,
            annotations: Vec::new(),
            doc: Doc::default(),
        }
    }

    fn build(self) -> Result<Argument, IntrospectErrorKind> {
        Ok(Argument {
            name: self.name,
            ty: single_type(self.ty)?,
            direction: self.direction,
            annotations: self.annotations,
            doc: self.doc,
        })
    }
}

#[derive(Default)]
struct PropertyBuilder {
    name: Option<String>,
    ty: Option<String>,
    access: Option<Access>,
    annotations: Vec<Annotation>,
    doc: Doc,
}

impl PropertyBuilder {
    fn build(self) -> Result<Property, IntrospectErrorKind> {
        Ok(Property {
            name: self.name.ok_or(IntrospectErrorKind::MissingName)?,
            ty: single_type(self.ty)?,
            access: self.access.ok_or(IntrospectErrorKind::MissingAccess)?,
            annotations: self.annotations,
            doc: self.doc,
        })
    }
}

#[derive(Default)]
struct AnnotationBuilder {
    name: Option<String>,
    value: Option<String>,
}

impl AnnotationBuilder {
    fn build(self) -> Result<Annotation, IntrospectErrorKind> {
        Ok(Annotation {
            name: self.name.ok_or(IntrospectErrorKind::MissingName)?,
            value: self.value.ok_or(IntrospectErrorKind::MissingValue)?,
        })
    }
}

enum State {
    Node(NodeBuilder),
    Interface(InterfaceBuilder),
    Method(MemberBuilder),
    Signal(MemberBuilder),
    Property(PropertyBuilder),
    Argument(ArgumentBuilder),
    Annotation(AnnotationBuilder),
    Doc(Doc),
    Description(Vec<String>),
    Text(&'static str, String),
}

impl State {
    /// Test if the element accepts `annotation` and `doc` children.
    fn is_annotated(&self) -> bool {
        matches!(
            self,
            State::Interface(..)
                | State::Method(..)
                | State::Signal(..)
                | State::Property(..)
                | State::Argument(..)
        )
    }

    fn annotations_mut(&mut self) -> Option<&mut Vec<Annotation>> {
        match self {
            State::Interface(b) => Some(&mut b.annotations),
            State::Method(b) | State::Signal(b) => Some(&mut b.annotations),
            State::Property(b) => Some(&mut b.annotations),
            State::Argument(b) => Some(&mut b.annotations),
            _ => None,
        }
    }

    fn doc_mut(&mut self) -> Option<&mut Doc> {
        match self {
            State::Interface(b) => Some(&mut b.doc),
            State::Method(b) | State::Signal(b) => Some(&mut b.doc),
            State::Property(b) => Some(&mut b.doc),
            State::Argument(b) => Some(&mut b.doc),
            _ => None,
        }
    }
}
