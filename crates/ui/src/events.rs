use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Handler<E> = Rc<dyn Fn(&E)>;

struct Registry<E> {
    next_id: u64,
    handlers: Vec<(u64, Handler<E>)>,
}

/// 單執行緒的事件訂閱清單。 / Single-threaded publish/subscribe list for one event type.
///
/// Clones share the same registry, so a component can hand out a clone to
/// whoever needs to emit while listeners keep their [`Subscription`].
pub struct Subscribers<E> {
    registry: Rc<RefCell<Registry<E>>>,
}

impl<E> Clone for Subscribers<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }
}

impl<E> fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("handlers", &self.len())
            .finish()
    }
}

impl<E: 'static> Subscribers<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 註冊事件處理器。 / Registers a handler; it stays active while the returned handle lives.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&E) + 'static,
    {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.handlers.push((id, Rc::new(handler)));
            id
        };
        let weak: Weak<RefCell<Registry<E>>> = Rc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                registry
                    .borrow_mut()
                    .handlers
                    .retain(|(handler_id, _)| *handler_id != id);
            }
        })
    }

    /// 依註冊順序通知所有處理器。 / Notifies every handler in registration order.
    ///
    /// Handlers may subscribe or unsubscribe while being notified; the change
    /// takes effect from the next emission.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Handler<E>> = self
            .registry
            .borrow()
            .handlers
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for handler in snapshot {
            handler(event);
        }
    }
}

impl<E> Subscribers<E> {
    pub fn len(&self) -> usize {
        self.registry.borrow().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 取消訂閱用的控制代碼。 / Handle that removes its handler when dropped or unsubscribed.
#[must_use = "dropping a Subscription unsubscribes the handler immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn handlers_receive_events_until_unsubscribed() {
        let subscribers = Subscribers::<u32>::new();
        let total = Rc::new(Cell::new(0));
        let sink = Rc::clone(&total);
        let subscription = subscribers.subscribe(move |value| sink.set(sink.get() + value));

        subscribers.emit(&2);
        subscribers.emit(&3);
        assert_eq!(total.get(), 5);

        subscription.unsubscribe();
        subscribers.emit(&10);
        assert_eq!(total.get(), 5);
        assert!(subscribers.is_empty());
    }

    #[test]
    fn dropping_the_handle_unsubscribes() {
        let subscribers = Subscribers::<()>::new();
        {
            let _subscription = subscribers.subscribe(|_| {});
            assert_eq!(subscribers.len(), 1);
        }
        assert_eq!(subscribers.len(), 0);
    }

    #[test]
    fn handler_may_subscribe_during_emit() {
        let subscribers = Subscribers::<()>::new();
        let late = Rc::new(RefCell::new(Vec::new()));
        let emitter = subscribers.clone();
        let store = Rc::clone(&late);
        let _outer = subscribers.subscribe(move |_| {
            store.borrow_mut().push(emitter.subscribe(|_| {}));
        });

        subscribers.emit(&());
        assert_eq!(subscribers.len(), 2);
    }
}
