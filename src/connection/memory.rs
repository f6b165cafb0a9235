use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::{Message, Serial};

use super::{DispatchStatus, Hooks, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointState {
    Idle,
    Open,
    Closed,
}

struct Endpoint {
    name: Box<str>,
    state: EndpointState,
    inbox: VecDeque<Message>,
    hooks: Option<Hooks>,
}

impl Endpoint {
    fn new(name: &str) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            name: name.into(),
            state: EndpointState::Idle,
            inbox: VecDeque::new(),
            hooks: None,
        }))
    }
}

fn lock(endpoint: &Mutex<Endpoint>) -> MutexGuard<'_, Endpoint> {
    endpoint.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An in-process transport connecting two endpoints.
///
/// Messages sent on one endpoint are queued on the other, stamped with a
/// serial and the sender's unique name. The two endpoints may live on
/// different threads.
///
/// # Examples
///
/// ```
/// use dynbus::{ConnectionBuilder, MemoryTransport};
///
/// # #[tokio::main(flavor = "current_thread")] async fn main() -> dynbus::Result<()> {
/// let (a, b) = MemoryTransport::pair();
/// let a = ConnectionBuilder::new().open(a)?;
/// let b = ConnectionBuilder::new().open(b)?;
///
/// assert_eq!(a.unique_name().as_deref(), Some(":1.0"));
/// assert_eq!(b.unique_name().as_deref(), Some(":1.1"));
/// # Ok(()) }
/// ```
pub struct MemoryTransport {
    local: Arc<Mutex<Endpoint>>,
    remote: Arc<Mutex<Endpoint>>,
    next_serial: Serial,
}

impl MemoryTransport {
    /// Construct a connected pair of endpoints.
    pub fn pair() -> (Self, Self) {
        let a = Endpoint::new(":1.0");
        let b = Endpoint::new(":1.1");

        let first = Self {
            local: a.clone(),
            remote: b.clone(),
            next_serial: Serial::FIRST,
        };

        let second = Self {
            local: b,
            remote: a,
            next_serial: Serial::FIRST,
        };

        (first, second)
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self, hooks: Hooks) -> Result<()> {
        let mut local = lock(&self.local);

        if local.state != EndpointState::Idle {
            return Err(Error::transport("endpoint has already been opened"));
        }

        local.state = EndpointState::Open;

        if !local.inbox.is_empty() {
            hooks.dispatch_status(DispatchStatus::DataRemains);
        }

        local.hooks = Some(hooks);
        Ok(())
    }

    fn close(&mut self) {
        let mut local = lock(&self.local);
        local.state = EndpointState::Closed;
        local.hooks = None;
        local.inbox.clear();
    }

    fn send(&mut self, message: &Message) -> Result<Serial> {
        let name = {
            let local = lock(&self.local);

            if local.state != EndpointState::Open {
                return Err(Error::transport("endpoint is not open"));
            }

            local.name.clone()
        };

        let serial = self.next_serial;

        let hooks = {
            let mut remote = lock(&self.remote);

            if remote.state == EndpointState::Closed {
                return Err(Error::transport("peer has closed"));
            }

            self.next_serial = serial.next();

            remote
                .inbox
                .push_back(message.clone().with_serial(serial).with_sender(&name));

            remote.hooks.clone()
        };

        if let Some(hooks) = hooks {
            hooks.dispatch_status(DispatchStatus::DataRemains);
        }

        Ok(serial)
    }

    fn pop_message(&mut self) -> Option<Message> {
        lock(&self.local).inbox.pop_front()
    }

    fn dispatch_status(&self) -> DispatchStatus {
        if lock(&self.local).inbox.is_empty() {
            DispatchStatus::Complete
        } else {
            DispatchStatus::DataRemains
        }
    }

    fn is_connected(&self) -> bool {
        lock(&self.local).state == EndpointState::Open
            && lock(&self.remote).state != EndpointState::Closed
    }

    fn server_id(&self) -> Option<String> {
        Some(String::from("memory"))
    }

    fn unique_name(&self) -> Option<String> {
        Some(lock(&self.local).name.to_string())
    }
}
