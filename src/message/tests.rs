use crate::error::Result;
use crate::org_freedesktop_dbus;
use crate::{Message, MessageType, Serial, Signature, Value};

#[test]
fn reply_addressing() -> Result<()> {
    let call = Message::method_call(Some("org.example"), "/org/example", None, "Ping")?
        .with_sender(":1.7")
        .with_serial(Serial::new(12).unwrap());

    let reply = Message::method_return(&call)?;
    assert_eq!(reply.message_type(), MessageType::METHOD_RETURN);
    assert_eq!(reply.reply_serial(), call.serial());
    assert_eq!(reply.destination(), Some(":1.7"));

    let error = Message::error(&call, org_freedesktop_dbus::NO_REPLY, None)?;
    assert!(error.is_error(org_freedesktop_dbus::NO_REPLY));
    assert_eq!(error.error_text(), None);
    Ok(())
}

#[test]
fn replying_to_unsent_message() -> Result<()> {
    let call = Message::method_call(None, "/", None, "Ping")?;
    assert!(Message::method_return(&call).is_err());
    Ok(())
}

#[test]
fn invalid_path() {
    assert!(Message::method_call(None, "not/a/path", None, "Ping").is_err());
    assert!(Message::signal("/a/", "org.example", "Changed").is_err());
}

#[test]
fn failed_arguments_leave_message_untouched() -> Result<()> {
    let signature = Signature::new("s")?;
    let mut message = Message::signal("/org/example", "org.example", "Changed")?
        .with_arguments(&signature, &[Value::from("first")])?;

    let two = Signature::new("si")?;
    assert!(message
        .set_arguments(&two, &[Value::from("only one")])
        .unwrap_err()
        .is_argument_count_mismatch());

    assert!(message
        .set_arguments(&two, &[Value::from("one"), Value::from("two")])
        .unwrap_err()
        .is_encode_mismatch());

    assert_eq!(message.signature(), &signature);
    assert_eq!(message.arguments()?, [Value::from("first")]);

    message.set_arguments(&two, &[Value::from("one"), Value::from(2i32)])?;
    assert_eq!(message.arguments()?, [Value::from("one"), Value::Int64(2)]);
    Ok(())
}

#[test]
fn setters() -> Result<()> {
    let mut message = Message::method_call(None, "/", None, "Ping")?;
    message.set_member("Pong");
    message.set_interface("org.example.Api");
    assert_eq!(message.member(), Some("Pong"));
    assert_eq!(message.interface(), Some("org.example.Api"));
    Ok(())
}
