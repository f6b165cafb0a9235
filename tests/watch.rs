use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use anyhow::Result;
use dynbus::{ConnectionBuilder, DispatchStatus, HandlerResult, Hooks, Message, Serial};
use dynbus::{TimerId, Transport, WatchFlags, WatchId};
use tokio::sync::mpsc;
use tokio::task::{spawn_local, LocalSet};

/// A transport turning every byte read from a socket into a signal.
struct ByteTransport {
    stream: UnixStream,
    hooks: Option<Hooks>,
    watch: Option<WatchId>,
    timer: Option<TimerId>,
    inbox: VecDeque<Message>,
    ticks: mpsc::UnboundedSender<TimerId>,
    open: bool,
    /// Register a second, disabled watch on the same descriptor.
    shadow: bool,
    shadow_watch: Option<WatchId>,
}

impl ByteTransport {
    fn new(stream: UnixStream, ticks: mpsc::UnboundedSender<TimerId>) -> io::Result<Self> {
        stream.set_nonblocking(true)?;

        Ok(Self {
            stream,
            hooks: None,
            watch: None,
            timer: None,
            inbox: VecDeque::new(),
            ticks,
            open: false,
            shadow: false,
            shadow_watch: None,
        })
    }
}

impl Transport for ByteTransport {
    fn open(&mut self, hooks: Hooks) -> dynbus::Result<()> {
        let fd = self.stream.as_raw_fd();
        self.watch = Some(hooks.add_watch(fd, WatchFlags::READABLE, true));
        self.timer = Some(hooks.add_timer(Duration::from_millis(10), true));

        if self.shadow {
            self.shadow_watch = Some(hooks.add_watch(fd, WatchFlags::READABLE, false));
        }

        self.hooks = Some(hooks);
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(hooks) = self.hooks.take() {
            if let Some(id) = self.watch.take() {
                hooks.remove_watch(id);
            }

            if let Some(id) = self.timer.take() {
                hooks.remove_timer(id);
            }

            if let Some(id) = self.shadow_watch.take() {
                hooks.remove_watch(id);
            }
        }

        self.open = false;
    }

    fn send(&mut self, _: &Message) -> dynbus::Result<Serial> {
        Err(dynbus::Error::transport("read only"))
    }

    fn pop_message(&mut self) -> Option<Message> {
        self.inbox.pop_front()
    }

    fn dispatch_status(&self) -> DispatchStatus {
        if self.inbox.is_empty() {
            DispatchStatus::Complete
        } else {
            DispatchStatus::DataRemains
        }
    }

    fn handle_watch(&mut self, id: WatchId, ready: WatchFlags) -> dynbus::Result<()> {
        assert_eq!(Some(id), self.watch);
        assert_ne!(Some(id), self.shadow_watch);
        assert!(ready.contains(WatchFlags::READABLE) || ready.contains(WatchFlags::HANGUP));

        let mut buf = [0u8; 16];

        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => {
                    self.open = false;
                    break;
                }
                Ok(n) => {
                    for b in &buf[..n] {
                        let member = format!("Byte{b}");
                        self.inbox
                            .push_back(Message::signal("/org/example", "org.example.Bytes", &member)?);
                    }
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => break,
                Err(error) => return Err(error.into()),
            }
        }

        if let Some(hooks) = &self.hooks {
            hooks.dispatch_status(self.dispatch_status());

            if !self.open {
                if let Some(id) = self.watch.take() {
                    hooks.remove_watch(id);
                }
            }
        }

        Ok(())
    }

    fn handle_timeout(&mut self, id: TimerId) -> dynbus::Result<()> {
        assert_eq!(Some(id), self.timer);
        _ = self.ticks.send(id);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.open
    }
}

#[tokio::test]
async fn watch_and_timer() -> Result<()> {
    let (local, mut remote) = UnixStream::pair()?;
    let (ticks_tx, mut ticks) = mpsc::unbounded_channel();

    let c = ConnectionBuilder::new().open(ByteTransport::new(local, ticks_tx)?)?;

    let (tx, mut rx) = mpsc::unbounded_channel();

    c.add_filter(move |_, m| {
        _ = tx.send(m.member().map(String::from));
        Ok(HandlerResult::Handled)
    });

    LocalSet::new()
        .run_until(async move {
            let driver = spawn_local({
                let c = c.clone();
                async move { c.run().await }
            });

            remote.write_all(&[1, 2, 3])?;

            for expected in ["Byte1", "Byte2", "Byte3"] {
                assert_eq!(rx.recv().await, Some(Some(String::from(expected))));
            }

            remote.write_all(&[4])?;
            assert_eq!(rx.recv().await, Some(Some(String::from("Byte4"))));

            // The timer keeps firing for as long as it is enabled.
            let first = ticks.recv().await;
            let second = ticks.recv().await;
            assert!(first.is_some());
            assert_eq!(first, second);

            c.close();
            driver.await??;
            Ok(())
        })
        .await
}

#[tokio::test]
async fn shared_descriptor_and_hangup() -> Result<()> {
    let (local, mut remote) = UnixStream::pair()?;
    let (ticks_tx, _ticks) = mpsc::unbounded_channel();

    let mut transport = ByteTransport::new(local, ticks_tx)?;
    transport.shadow = true;

    let c = ConnectionBuilder::new().open(transport)?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    c.add_filter(move |_, m| {
        _ = tx.send(m.member().map(String::from));
        Ok(HandlerResult::Handled)
    });

    LocalSet::new()
        .run_until(async move {
            let driver = spawn_local({
                let c = c.clone();
                async move { c.run().await }
            });

            remote.write_all(&[7])?;
            assert_eq!(rx.recv().await, Some(Some(String::from("Byte7"))));

            // Hanging up is reported as a zero-length read, after which the
            // transport removes its watch and reports itself disconnected.
            drop(remote);

            while c.is_connected() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }

            assert_eq!(c.state(), dynbus::ConnectionState::Disconnected);

            c.close();
            driver.await??;
            Ok(())
        })
        .await
}

/// A transport which queues messages without reporting them through its
/// hooks, leaving the connection to notice through its dispatch status.
struct SilentTransport {
    hooks: Option<Hooks>,
    timer: Option<TimerId>,
    inbox: VecDeque<Message>,
    ticks: usize,
}

impl Transport for SilentTransport {
    fn open(&mut self, hooks: Hooks) -> dynbus::Result<()> {
        // Messages received while authenticating.
        self.inbox
            .push_back(Message::signal("/org/example", "org.example.Silent", "Buffered")?);
        self.timer = Some(hooks.add_timer(Duration::from_millis(5), true));
        self.hooks = Some(hooks);
        Ok(())
    }

    fn close(&mut self) {
        if let (Some(hooks), Some(id)) = (self.hooks.take(), self.timer.take()) {
            hooks.remove_timer(id);
        }
    }

    fn send(&mut self, _: &Message) -> dynbus::Result<Serial> {
        Err(dynbus::Error::transport("read only"))
    }

    fn pop_message(&mut self) -> Option<Message> {
        self.inbox.pop_front()
    }

    fn dispatch_status(&self) -> DispatchStatus {
        if self.inbox.is_empty() {
            DispatchStatus::Complete
        } else {
            DispatchStatus::DataRemains
        }
    }

    fn handle_timeout(&mut self, id: TimerId) -> dynbus::Result<()> {
        self.ticks += 1;
        let member = format!("Tick{}", self.ticks);
        self.inbox
            .push_back(Message::signal("/org/example", "org.example.Silent", &member)?);

        if self.ticks == 2 {
            if let Some(hooks) = &self.hooks {
                hooks.toggle_timer(id, false);
            }
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.hooks.is_some()
    }
}

#[tokio::test]
async fn unreported_messages_are_drained() -> Result<()> {
    let transport = SilentTransport {
        hooks: None,
        timer: None,
        inbox: VecDeque::new(),
        ticks: 0,
    };

    let c = ConnectionBuilder::new().open(transport)?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    c.add_filter(move |_, m| {
        _ = tx.send(m.member().map(String::from));
        Ok(HandlerResult::Handled)
    });

    LocalSet::new()
        .run_until(async move {
            let driver = spawn_local({
                let c = c.clone();
                async move { c.run().await }
            });

            for expected in ["Buffered", "Tick1", "Tick2"] {
                assert_eq!(rx.recv().await, Some(Some(String::from(expected))));
            }

            c.close();
            driver.await??;
            Ok(())
        })
        .await
}
