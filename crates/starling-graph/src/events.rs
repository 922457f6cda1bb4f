//! Explicit callback registration.
//!
//! Listeners are keyed by the id returned from [`Listeners::subscribe`], so a graph session can
//! tear down exactly the callbacks it registered when it is replaced.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Callback<E> = Box<dyn FnMut(&E)>;

pub struct Listeners<E: ?Sized> {
    next_id: u64,
    entries: Vec<(ListenerId, Callback<E>)>,
}

impl<E: ?Sized> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<E: ?Sized> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<E: ?Sized> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&E) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Returns `false` when `id` was never registered or is already gone.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Calls every listener once, in registration order.
    pub fn emit(&mut self, event: &E) {
        for (_, callback) in self.entries.iter_mut() {
            callback(event);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Listeners;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners: Listeners<u32> = Listeners::new();

        let a = {
            let seen = seen.clone();
            listeners.subscribe(move |v| seen.borrow_mut().push(("a", *v)))
        };
        {
            let seen = seen.clone();
            listeners.subscribe(move |v| seen.borrow_mut().push(("b", *v)));
        }

        listeners.emit(&1);
        assert!(listeners.unsubscribe(a));
        assert!(!listeners.unsubscribe(a));
        listeners.emit(&2);

        assert_eq!(*seen.borrow(), vec![("a", 1), ("b", 1), ("b", 2)]);
        assert_eq!(listeners.len(), 1);
    }
}
