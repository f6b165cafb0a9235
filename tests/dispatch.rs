use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc as std_mpsc;
use std::thread;

use anyhow::{anyhow, Result};
use dynbus::{Connection, ConnectionBuilder, ConnectionState, HandlerResult, MemoryTransport};
use dynbus::{Message, Signature};
use tokio::sync::mpsc;
use tokio::task::{spawn_local, JoinHandle, LocalSet};

fn drive(c: &Connection) -> JoinHandle<dynbus::Result<()>> {
    let c = c.clone();
    spawn_local(async move { c.run().await })
}

fn signal(path: &str, member: &str) -> dynbus::Result<Message> {
    Message::signal(path, "org.example.Test", member)
}

/// Record `name` and the member of every message into `tx`.
fn recorder(
    tx: &mpsc::UnboundedSender<String>,
    name: &'static str,
    result: HandlerResult,
) -> impl FnMut(&Connection, &Message) -> dynbus::Result<HandlerResult> + 'static {
    let tx = tx.clone();

    move |_, m| {
        _ = tx.send(format!("{name}:{}", m.member().unwrap_or_default()));
        Ok(result)
    }
}

async fn collect(rx: &mut mpsc::UnboundedReceiver<String>, n: usize) -> Vec<String> {
    let mut out = Vec::new();

    while out.len() < n {
        let Some(entry) = rx.recv().await else {
            break;
        };

        out.push(entry);
    }

    out
}

#[tokio::test]
async fn handler_order() -> Result<()> {
    let (a, b) = MemoryTransport::pair();
    let client = ConnectionBuilder::new().open(a)?;
    let server = ConnectionBuilder::new().open(b)?;

    let (tx, mut rx) = mpsc::unbounded_channel();

    server.add_filter(recorder(&tx, "filter", HandlerResult::Handled));
    server.register_fallback("/", recorder(&tx, "root", HandlerResult::NotYetHandled))?;
    server.register_object_path("/org/example", recorder(&tx, "exact", HandlerResult::NotYetHandled))?;
    server.register_fallback("/org", recorder(&tx, "org", HandlerResult::NotYetHandled))?;

    LocalSet::new()
        .run_until(async move {
            let driver = drive(&server);

            client.send(signal("/org/example", "A")?)?;

            assert_eq!(
                collect(&mut rx, 4).await,
                ["exact:A", "org:A", "root:A", "filter:A"]
            );

            // Fallbacks match whole path elements only.
            client.send(signal("/org/examples", "B")?)?;
            assert_eq!(collect(&mut rx, 3).await, ["org:B", "root:B", "filter:B"]);

            client.send(signal("/other", "C")?)?;
            assert_eq!(collect(&mut rx, 2).await, ["root:C", "filter:C"]);

            server.close();
            driver.await??;
            Ok(())
        })
        .await
}

#[tokio::test]
async fn handled_stops_dispatch() -> Result<()> {
    let (a, b) = MemoryTransport::pair();
    let client = ConnectionBuilder::new().open(a)?;
    let server = ConnectionBuilder::new().open(b)?;

    let (tx, mut rx) = mpsc::unbounded_channel();

    server.register_object_path("/org/example", {
        let tx = tx.clone();

        move |_, m| {
            let member = m.member().unwrap_or_default();
            _ = tx.send(format!("exact:{member}"));

            if member == "Stop" {
                return Ok(HandlerResult::Handled);
            }

            Ok(HandlerResult::NotYetHandled)
        }
    })?;

    let first = server.add_filter(recorder(&tx, "first", HandlerResult::NotYetHandled));
    server.add_filter(recorder(&tx, "second", HandlerResult::Handled));

    LocalSet::new()
        .run_until(async move {
            let driver = drive(&server);

            client.send(signal("/org/example", "Stop")?)?;
            client.send(signal("/org/example", "Go")?)?;

            assert_eq!(
                collect(&mut rx, 4).await,
                ["exact:Stop", "exact:Go", "first:Go", "second:Go"]
            );

            assert!(server.remove_filter(first));
            assert!(!server.remove_filter(first));
            assert!(server.unregister_object_path("/org/example"));

            client.send(signal("/org/example", "Again")?)?;
            assert_eq!(collect(&mut rx, 1).await, ["second:Again"]);

            server.close();
            driver.await??;
            Ok(())
        })
        .await
}

#[tokio::test]
async fn failing_handlers_do_not_stop_the_loop() -> Result<()> {
    let (a, b) = MemoryTransport::pair();
    let client = ConnectionBuilder::new().open(a)?;

    let errors = Rc::new(RefCell::new(Vec::new()));

    let server = ConnectionBuilder::new()
        .on_handler_error({
            let errors = errors.clone();
            move |error| errors.borrow_mut().push(error.to_string())
        })
        .open(b)?;

    let (tx, mut rx) = mpsc::unbounded_channel();

    server.register_object_path("/fail", |_, _| {
        Signature::new("a")?;
        Ok(HandlerResult::Handled)
    })?;

    server.register_object_path("/panic", |_, _| panic!("handler exploded"))?;
    server.add_filter(recorder(&tx, "filter", HandlerResult::Handled));

    LocalSet::new()
        .run_until(async move {
            let driver = drive(&server);

            client.send(signal("/fail", "A")?)?;
            client.send(signal("/panic", "B")?)?;
            client.send(signal("/ok", "C")?)?;

            // A failing handler ends processing of its message, the filter
            // only sees the last one.
            assert_eq!(collect(&mut rx, 1).await, ["filter:C"]);

            {
                let errors = errors.borrow();
                assert_eq!(errors.len(), 2);
                assert!(errors[1].contains("handler exploded"));
            }

            assert_eq!(server.state(), ConnectionState::Connected);

            server.close();
            driver.await??;
            Ok(())
        })
        .await
}

#[tokio::test]
async fn messages_sent_from_another_thread() -> Result<()> {
    let (a, b) = MemoryTransport::pair();
    let server = ConnectionBuilder::new().open(a)?;

    let (tx, mut rx) = mpsc::unbounded_channel();

    server.add_filter(move |_, m| {
        let member = String::from(m.member().unwrap_or_default());
        _ = tx.send((thread::current().id(), member));
        Ok(HandlerResult::Handled)
    });

    let loop_thread = thread::current().id();
    let (done_tx, done_rx) = std_mpsc::channel::<()>();

    // The peer connection lives entirely on its own thread, so every
    // notification it raises crosses over to this loop.
    let sender = thread::spawn(move || -> dynbus::Result<thread::ThreadId> {
        let client = ConnectionBuilder::new().open(b)?;

        for n in 0..16 {
            client.send(signal("/org/example", &format!("Tick{n}"))?)?;
        }

        _ = done_rx.recv();
        Ok(thread::current().id())
    });

    LocalSet::new()
        .run_until(async move {
            let driver = drive(&server);

            let mut members = Vec::new();

            while members.len() < 16 {
                let Some((id, member)) = rx.recv().await else {
                    break;
                };

                assert_eq!(id, loop_thread);
                members.push(member);
            }

            let expected = (0..16).map(|n| format!("Tick{n}")).collect::<Vec<_>>();
            assert_eq!(members, expected);

            done_tx.send(())?;

            let sender_thread = sender
                .join()
                .map_err(|_| anyhow!("sending thread panicked"))??;
            assert_ne!(sender_thread, loop_thread);

            server.close();
            driver.await??;
            Ok(())
        })
        .await
}

#[tokio::test]
async fn duplicate_registration() -> Result<()> {
    let (a, _b) = MemoryTransport::pair();
    let c = ConnectionBuilder::new().open(a)?;

    c.register_object_path("/org/example", |_, _| Ok(HandlerResult::Handled))?;

    let error = c
        .register_fallback("/org/example", |_, _| Ok(HandlerResult::Handled))
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Object path `/org/example` already has a handler"
    );

    assert!(c
        .register_object_path("not/a/path", |_, _| Ok(HandlerResult::Handled))
        .is_err());

    assert!(!c.unregister_object_path("/org/other"));
    assert!(c.unregister_object_path("/org/example"));
    Ok(())
}

#[tokio::test]
async fn handlers_may_close_the_connection() -> Result<()> {
    let (a, b) = MemoryTransport::pair();
    let client = ConnectionBuilder::new().open(a)?;
    let server = ConnectionBuilder::new().open(b)?;

    let (tx, mut rx) = mpsc::unbounded_channel();

    server.add_filter(move |c, m| {
        _ = tx.send(String::from(m.member().unwrap_or_default()));
        c.close();
        Ok(HandlerResult::Handled)
    });

    // Both messages are queued before the loop starts, only the first is
    // delivered.
    client.send(signal("/org/example", "First")?)?;
    client.send(signal("/org/example", "Second")?)?;

    LocalSet::new()
        .run_until(async move {
            let driver = drive(&server);
            driver.await??;

            assert_eq!(collect(&mut rx, 1).await, ["First"]);
            assert!(rx.try_recv().is_err());
            assert_eq!(server.state(), ConnectionState::Closed);

            // The peer observes the disconnect.
            assert_eq!(client.state(), ConnectionState::Disconnected);
            assert!(client.send(signal("/org/example", "Third")?).is_err());
            Ok(())
        })
        .await
}

#[tokio::test]
async fn run_twice() -> Result<()> {
    let (a, _b) = MemoryTransport::pair();
    let c = ConnectionBuilder::new().open(a)?;

    LocalSet::new()
        .run_until(async move {
            let driver = drive(&c);
            tokio::task::yield_now().await;

            let error = c.run().await.unwrap_err();
            assert_eq!(error.to_string(), "Connection is already being driven");

            c.close();
            c.close();
            driver.await??;
            Ok(())
        })
        .await
}

#[tokio::test]
async fn liveness() -> Result<()> {
    let (a, b) = MemoryTransport::pair();
    let c = ConnectionBuilder::new().open(a)?;

    assert!(c.is_connected());
    assert!(c.is_authenticated());
    assert!(!c.is_anonymous());
    assert_eq!(c.server_id().as_deref(), Some("memory"));
    assert_eq!(c.unique_name().as_deref(), Some(":1.0"));
    assert!(c.can_send_type(dynbus::Type::STRING));
    assert!(!c.can_send_type(dynbus::Type::UNIX_FD));

    let signature = c.signature("a{sv}")?;
    assert_eq!(signature, c.signature("a{sv}")?);
    assert!(c.signature("a{vs}").unwrap_err().is_malformed_signature());

    drop(b);
    assert!(c.is_connected());

    c.close();
    assert!(!c.is_connected());
    assert!(!c.is_authenticated());
    Ok(())
}
