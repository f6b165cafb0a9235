use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use dynbus::org_freedesktop_dbus::{DISCONNECTED, NO_REPLY};
use dynbus::{Connection, ConnectionBuilder, HandlerResult, MemoryTransport, Message, MessageType};
use dynbus::{Signature, Timeout, Value};
use tokio::task::{spawn_local, JoinHandle, LocalSet};

fn drive(c: &Connection) -> JoinHandle<dynbus::Result<()>> {
    let c = c.clone();
    spawn_local(async move { c.run().await })
}

fn ping() -> dynbus::Result<Message> {
    Message::method_call(Some(":1.1"), "/org/example", Some("org.example.Test"), "Ping")
}

#[tokio::test(start_paused = true)]
async fn call_times_out_once() -> Result<()> {
    let (a, _b) = MemoryTransport::pair();
    let c = ConnectionBuilder::new().open(a)?;

    LocalSet::new()
        .run_until(async move {
            let driver = drive(&c);
            let replies = Rc::new(RefCell::new(Vec::new()));

            let pending = c.send_with_reply(ping()?, Timeout::After(Duration::from_millis(100)), {
                let replies = replies.clone();
                move |reply| replies.borrow_mut().push(reply)
            })?;

            tokio::time::sleep(Duration::from_millis(99)).await;
            assert!(replies.borrow().is_empty());
            assert!(!pending.is_completed());

            tokio::time::sleep(Duration::from_millis(2)).await;
            assert!(pending.is_completed());
            assert_eq!(c.pending_calls(), 0);

            tokio::time::sleep(Duration::from_secs(10)).await;

            {
                let replies = replies.borrow();
                assert_eq!(replies.len(), 1);
                assert_eq!(replies[0].message_type(), MessageType::ERROR);
                assert!(replies[0].is_error(NO_REPLY));
                assert_eq!(replies[0].reply_serial(), Some(pending.serial()));
            }

            c.close();
            driver.await??;
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn default_timeout_from_builder() -> Result<()> {
    let (a, _b) = MemoryTransport::pair();

    let c = ConnectionBuilder::new()
        .default_timeout(Duration::from_secs(1))
        .open(a)?;

    LocalSet::new()
        .run_until(async move {
            let driver = drive(&c);

            let start = tokio::time::Instant::now();
            let reply = c.call(ping()?, Timeout::Default).await?;
            assert!(reply.is_error(NO_REPLY));
            assert!(start.elapsed() >= Duration::from_secs(1));

            c.close();
            driver.await??;
            Ok(())
        })
        .await
}

#[tokio::test]
async fn close_cancels_pending_calls() -> Result<()> {
    let (a, _b) = MemoryTransport::pair();
    let c = ConnectionBuilder::new().open(a)?;
    let replies = Rc::new(RefCell::new(Vec::new()));

    let mut serials = Vec::new();

    for _ in 0..2 {
        let pending = c.send_with_reply(ping()?, Timeout::Infinite, {
            let replies = replies.clone();
            move |reply: Message| replies.borrow_mut().push(reply)
        })?;

        serials.push(Some(pending.serial()));
    }

    assert_eq!(c.pending_calls(), 2);

    c.close();
    c.close();

    assert_eq!(c.pending_calls(), 0);
    assert_eq!(c.state(), dynbus::ConnectionState::Closed);

    let replies = replies.borrow();
    assert_eq!(replies.len(), 2);
    assert!(replies.iter().all(|reply| reply.is_error(DISCONNECTED)));

    let reply_serials = replies.iter().map(Message::reply_serial).collect::<Vec<_>>();
    assert_eq!(reply_serials, serials);

    let error = c.send(ping()?).unwrap_err();
    assert!(error.is_invalid_state());
    Ok(())
}

#[tokio::test]
async fn dropping_connection_cancels_pending_calls() -> Result<()> {
    let (a, _b) = MemoryTransport::pair();
    let c = ConnectionBuilder::new().open(a)?;
    let replies = Rc::new(RefCell::new(Vec::new()));

    let pending = c.send_with_reply(ping()?, Timeout::Infinite, {
        let replies = replies.clone();
        move |reply: Message| replies.borrow_mut().push(reply)
    })?;

    drop(c);

    assert!(pending.is_completed());
    assert_eq!(replies.borrow().len(), 1);
    assert!(replies.borrow()[0].is_error(DISCONNECTED));
    Ok(())
}

#[tokio::test]
async fn reply_is_delivered() -> Result<()> {
    let (a, b) = MemoryTransport::pair();
    let client = ConnectionBuilder::new().open(a)?;
    let server = ConnectionBuilder::new().open(b)?;

    let signature = server.signature("sa{sv}")?;

    server.register_object_path("/org/example", move |c, m| {
        let mut props = std::collections::BTreeMap::new();
        props.insert(String::from("answer"), Value::from(42i32));

        let reply = Message::method_return(m)?
            .with_arguments(&signature, &[Value::from("pong"), Value::from(props)])?;

        c.send(reply)?;
        Ok(HandlerResult::Handled)
    })?;

    LocalSet::new()
        .run_until(async move {
            let server_driver = drive(&server);
            let client_driver = drive(&client);

            let reply = client.call(ping()?, Timeout::Default).await?;

            assert_eq!(reply.message_type(), MessageType::METHOD_RETURN);
            assert_eq!(reply.sender(), Some(":1.1"));
            assert_eq!(reply.destination(), Some(":1.0"));
            assert_eq!(*reply.signature(), Signature::new("sa{sv}")?);

            let arguments = reply.arguments()?;
            assert_eq!(arguments[0], Value::from("pong"));

            let answer = arguments[1].as_mapping().and_then(|m| m.get("answer"));
            assert_eq!(answer, Some(&Value::from(42i32)));
            assert_eq!(client.pending_calls(), 0);

            client.close();
            server.close();
            client_driver.await??;
            server_driver.await??;
            Ok(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn late_reply_is_not_correlated() -> Result<()> {
    let (a, b) = MemoryTransport::pair();
    let client = ConnectionBuilder::new().open(a)?;
    let server = ConnectionBuilder::new().open(b)?;

    server.register_object_path("/org/example", |c, m| {
        c.send(Message::method_return(m)?)?;
        Ok(HandlerResult::Handled)
    })?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    client.add_filter(move |_, m| {
        _ = tx.send(m.message_type());
        Ok(HandlerResult::Handled)
    });

    LocalSet::new()
        .run_until(async move {
            let client_driver = drive(&client);

            let completions = Rc::new(RefCell::new(0));

            client.send_with_reply(ping()?, Timeout::After(Duration::from_millis(10)), {
                let completions = completions.clone();
                move |reply: Message| {
                    assert!(reply.is_error(NO_REPLY));
                    *completions.borrow_mut() += 1;
                }
            })?;

            tokio::time::sleep(Duration::from_millis(20)).await;
            assert_eq!(*completions.borrow(), 1);

            // The server only starts processing once the call has timed out.
            let server_driver = drive(&server);

            assert_eq!(rx.recv().await, Some(MessageType::METHOD_RETURN));
            assert_eq!(*completions.borrow(), 1);

            client.close();
            server.close();
            client_driver.await??;
            server_driver.await??;
            Ok(())
        })
        .await
}

#[test]
fn send_with_reply_requires_runtime() -> Result<()> {
    let (a, _b) = MemoryTransport::pair();
    let c = ConnectionBuilder::new().open(a)?;

    let error = c
        .send_with_reply(ping()?, Timeout::Infinite, |_| {})
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Connection must be used inside of a Tokio runtime"
    );

    assert_eq!(c.pending_calls(), 0);
    Ok(())
}
