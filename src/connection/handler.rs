use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{Error, ErrorKind, Result};
use crate::{Connection, Message, ObjectPath};

/// The outcome of a filter or object path handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerResult {
    /// The message was handled, no further handlers are consulted.
    Handled,
    /// The message should be offered to the next handler.
    NotYetHandled,
}

/// Identifies a filter added with [`Connection::add_filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(u64);

pub(crate) type Handler = Rc<RefCell<dyn FnMut(&Connection, &Message) -> Result<HandlerResult>>>;

struct ObjectEntry {
    handler: Handler,
    fallback: bool,
}

/// Registered filters and object path handlers.
#[derive(Default)]
pub(crate) struct Registry {
    next_filter: u64,
    filters: Vec<(FilterId, Handler)>,
    objects: BTreeMap<ObjectPath, ObjectEntry>,
}

impl Registry {
    pub(crate) fn add_filter(&mut self, handler: Handler) -> FilterId {
        let id = FilterId(self.next_filter);
        self.next_filter += 1;
        self.filters.push((id, handler));
        id
    }

    pub(crate) fn remove_filter(&mut self, id: FilterId) -> bool {
        let len = self.filters.len();
        self.filters.retain(|(filter, _)| *filter != id);
        self.filters.len() != len
    }

    pub(crate) fn register(
        &mut self,
        path: ObjectPath,
        handler: Handler,
        fallback: bool,
    ) -> Result<()> {
        if self.objects.contains_key(&path) {
            return Err(Error::new(ErrorKind::ObjectPathInUse(path)));
        }

        self.objects.insert(path, ObjectEntry { handler, fallback });
        Ok(())
    }

    pub(crate) fn unregister(&mut self, path: &ObjectPath) -> bool {
        self.objects.remove(path).is_some()
    }

    /// The handlers to offer a message to, in order.
    ///
    /// The handler registered for the exact path of the message comes first,
    /// then fallbacks from the most to the least specific, then filters in
    /// registration order.
    pub(crate) fn candidates(&self, message: &Message) -> Vec<Handler> {
        let mut handlers = Vec::new();

        if let Some(path) = message.path() {
            if let Some(entry) = self.objects.get(path) {
                handlers.push(entry.handler.clone());
            }

            let mut fallbacks = self
                .objects
                .iter()
                .filter(|(prefix, entry)| {
                    entry.fallback && *prefix != path && path.starts_with(prefix)
                })
                .map(|(prefix, entry)| (prefix.iter().count(), entry.handler.clone()))
                .collect::<Vec<_>>();

            fallbacks.sort_by(|a, b| b.0.cmp(&a.0));
            handlers.extend(fallbacks.into_iter().map(|(_, handler)| handler));
        }

        handlers.extend(self.filters.iter().map(|(_, handler)| handler.clone()));
        handlers
    }
}
