use crate::codec;
use crate::error::{ErrorKind, Result};
use crate::protocol::{Flags, MessageType};
use crate::{BasicType, Error, ObjectPath, OwnedBuf, ReadBuf, Serial, Signature, SignatureNode};
use crate::Value;

/// A D-Bus message.
///
/// The body is held in marshalled form together with its signature. Use
/// [`Message::with_arguments`] to encode an argument list into it and
/// [`Message::arguments`] to decode it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The type of the message.
    message_type: MessageType,
    /// Assigned by the transport once the message is sent.
    serial: Option<Serial>,
    /// The serial this message replies to.
    reply_serial: Option<Serial>,
    flags: Flags,
    path: Option<ObjectPath>,
    interface: Option<Box<str>>,
    member: Option<Box<str>>,
    error_name: Option<Box<str>>,
    destination: Option<Box<str>>,
    sender: Option<Box<str>>,
    signature: Signature,
    body: OwnedBuf,
}

impl Message {
    fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            serial: None,
            reply_serial: None,
            flags: Flags::EMPTY,
            path: None,
            interface: None,
            member: None,
            error_name: None,
            destination: None,
            sender: None,
            signature: Signature::empty(),
            body: OwnedBuf::new(),
        }
    }

    /// Construct a method call.
    ///
    /// # Errors
    ///
    /// Errors if `path` is not a valid object path.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::{Message, MessageType};
    ///
    /// let m = Message::method_call(Some("org.example"), "/org/example", Some("org.example.Api"), "Ping")?;
    /// assert_eq!(m.message_type(), MessageType::METHOD_CALL);
    /// assert_eq!(m.path().map(|p| p.as_str()), Some("/org/example"));
    /// assert_eq!(m.member(), Some("Ping"));
    /// assert_eq!(m.serial(), None);
    /// # Ok::<_, dynbus::Error>(())
    /// ```
    pub fn method_call(
        destination: Option<&str>,
        path: &str,
        interface: Option<&str>,
        member: &str,
    ) -> Result<Self> {
        let mut this = Self::new(MessageType::METHOD_CALL);
        this.destination = destination.map(Box::from);
        this.path = Some(ObjectPath::new(path)?);
        this.interface = interface.map(Box::from);
        this.member = Some(member.into());
        Ok(this)
    }

    /// Construct a signal.
    ///
    /// # Errors
    ///
    /// Errors if `path` is not a valid object path.
    pub fn signal(path: &str, interface: &str, member: &str) -> Result<Self> {
        let mut this = Self::new(MessageType::SIGNAL);
        this.path = Some(ObjectPath::new(path)?);
        this.interface = Some(interface.into());
        this.member = Some(member.into());
        Ok(this)
    }

    /// Construct a method return replying to `origin`.
    ///
    /// # Errors
    ///
    /// Errors if `origin` has not been assigned a serial.
    pub fn method_return(origin: &Message) -> Result<Self> {
        let mut this = Self::new(MessageType::METHOD_RETURN);
        this.reply_serial = Some(origin.expect_serial()?);
        this.destination = origin.sender.clone();
        Ok(this)
    }

    /// Construct an error replying to `origin`.
    ///
    /// If `text` is specified it becomes the single string argument of the
    /// error, which is what [`Message::error_text`] reads.
    ///
    /// # Errors
    ///
    /// Errors if `origin` has not been assigned a serial.
    pub fn error(origin: &Message, error_name: &str, text: Option<&str>) -> Result<Self> {
        let this = Self::error_reply(origin.expect_serial()?, error_name, text);

        Ok(Self {
            destination: origin.sender.clone(),
            ..this
        })
    }

    /// Construct an error for the given reply serial.
    pub(crate) fn error_reply(reply_serial: Serial, error_name: &str, text: Option<&str>) -> Self {
        let mut this = Self::new(MessageType::ERROR);
        this.reply_serial = Some(reply_serial);
        this.error_name = Some(error_name.into());

        if let Some(text) = text {
            this.signature = Signature::from_nodes(vec![SignatureNode::Basic(BasicType::String)]);
            this.body.write(text);
        }

        this
    }

    fn expect_serial(&self) -> Result<Serial> {
        match self.serial {
            Some(serial) => Ok(serial),
            None => Err(Error::new(ErrorKind::MissingSerial)),
        }
    }

    /// The type of the message.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The serial of the message, if it has been sent.
    pub fn serial(&self) -> Option<Serial> {
        self.serial
    }

    /// Modify the serial of the message.
    ///
    /// This is used by transports when a message is sent.
    pub fn with_serial(self, serial: Serial) -> Self {
        Self {
            serial: Some(serial),
            ..self
        }
    }

    /// The serial this message replies to.
    pub fn reply_serial(&self) -> Option<Serial> {
        self.reply_serial
    }

    /// The flags of the message.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Modify the flags of the message.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::{Flags, Message};
    ///
    /// let m = Message::method_call(None, "/", None, "Ping")?;
    /// assert_eq!(m.flags(), Flags::default());
    ///
    /// let m2 = m.with_flags(Flags::NO_REPLY_EXPECTED);
    /// assert_eq!(m2.flags(), Flags::NO_REPLY_EXPECTED);
    /// # Ok::<_, dynbus::Error>(())
    /// ```
    pub fn with_flags(self, flags: Flags) -> Self {
        Self { flags, ..self }
    }

    /// The object path of the message.
    pub fn path(&self) -> Option<&ObjectPath> {
        self.path.as_ref()
    }

    /// The interface of the message.
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    /// Modify the interface of the message.
    pub fn set_interface(&mut self, interface: &str) {
        self.interface = Some(interface.into());
    }

    /// Modify the interface of the message.
    pub fn with_interface(mut self, interface: &str) -> Self {
        self.set_interface(interface);
        self
    }

    /// The member of the message.
    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    /// Modify the member of the message.
    pub fn set_member(&mut self, member: &str) {
        self.member = Some(member.into());
    }

    /// The error name of the message.
    pub fn error_name(&self) -> Option<&str> {
        self.error_name.as_deref()
    }

    /// Modify the error name of the message.
    pub fn set_error_name(&mut self, error_name: &str) {
        self.error_name = Some(error_name.into());
    }

    /// The destination of the message.
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// Modify the destination of the message.
    pub fn with_destination(self, destination: &str) -> Self {
        Self {
            destination: Some(destination.into()),
            ..self
        }
    }

    /// The sender of the message.
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Modify the sender of the message.
    ///
    /// This is used by transports to stamp the name of the sending peer.
    pub fn with_sender(self, sender: &str) -> Self {
        Self {
            sender: Some(sender.into()),
            ..self
        }
    }

    /// The signature of the body.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// A read cursor over the marshalled body.
    pub fn body(&self) -> ReadBuf<'_> {
        self.body.read()
    }

    /// Replace the body with already marshalled bytes.
    pub fn with_body(self, signature: Signature, body: OwnedBuf) -> Self {
        Self {
            signature,
            body,
            ..self
        }
    }

    /// Encode `values` as the arguments of the message.
    ///
    /// The message is consumed, so it is dropped if encoding fails. Use
    /// [`Message::set_arguments`] to keep it around on failure.
    ///
    /// # Errors
    ///
    /// Errors if the number of values differs from the number of complete
    /// types in `signature`, or if any value doesn't match its type.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::{Message, Signature, Value};
    ///
    /// let signature = Signature::new("su")?;
    ///
    /// let m = Message::method_call(None, "/org/example", None, "Add")?
    ///     .with_arguments(&signature, &[Value::from("apples"), Value::from(3u32)])?;
    ///
    /// assert_eq!(m.signature(), &signature);
    /// assert_eq!(m.arguments()?, [Value::from("apples"), Value::from(3u32)]);
    /// # Ok::<_, dynbus::Error>(())
    /// ```
    pub fn with_arguments(mut self, signature: &Signature, values: &[Value]) -> Result<Self> {
        self.set_arguments(signature, values)?;
        Ok(self)
    }

    /// Encode `values` as the arguments of the message in place.
    ///
    /// The signature and body are only replaced once every value has been
    /// encoded, so the message is left untouched if encoding fails.
    pub fn set_arguments(&mut self, signature: &Signature, values: &[Value]) -> Result<()> {
        let mut body = OwnedBuf::with_endianness(self.body.endianness());
        codec::encode_all(&mut body, signature, values)?;
        self.signature = signature.clone();
        self.body = body;
        Ok(())
    }

    /// Decode the arguments of the message.
    ///
    /// Error messages decode to no arguments, use [`Message::error_text`] to
    /// access their description.
    pub fn arguments(&self) -> Result<Vec<Value>> {
        if self.message_type == MessageType::ERROR {
            return Ok(Vec::new());
        }

        codec::decode_all(&mut self.body.read(), &self.signature)
    }

    /// The human readable description of an error message, which by
    /// convention is its leading string argument.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::{Message, Serial};
    ///
    /// let call = Message::method_call(None, "/", None, "Ping")?.with_serial(Serial::FIRST);
    /// let error = Message::error(&call, "org.example.Error.Failed", Some("it broke"))?;
    ///
    /// assert!(error.arguments()?.is_empty());
    /// assert_eq!(error.error_text().as_deref(), Some("it broke"));
    /// # Ok::<_, dynbus::Error>(())
    /// ```
    pub fn error_text(&self) -> Option<String> {
        if self.message_type != MessageType::ERROR {
            return None;
        }

        let Some(SignatureNode::Basic(BasicType::String)) = self.signature.nodes().first() else {
            return None;
        };

        self.body.read().read::<str>().ok().map(str::to_owned)
    }

    /// Test if this is an error message with the given name.
    pub fn is_error(&self, error_name: &str) -> bool {
        self.message_type == MessageType::ERROR && self.error_name() == Some(error_name)
    }
}
