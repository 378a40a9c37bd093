use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Callback<S> = Arc<dyn Fn(&Arc<S>, &Arc<S>) + Send + Sync>;

struct Inner<S> {
    state: Arc<S>,
    subscribers: Vec<(u64, Callback<S>)>,
    next_id: u64,
}

/// Observable state container.
///
/// `get` hands out immutable snapshots; `set` applies an update and then
/// synchronously calls every subscriber, in registration order, with the new
/// and the previous snapshot. The subscriber list is copied before each
/// notification round, so callbacks may subscribe, unsubscribe or call `set`
/// again without affecting the round in progress. Cloning the store shares it.
pub struct Store<S> {
    inner: Arc<Mutex<Inner<S>>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Handle returned by [`Store::subscribe`].
#[must_use = "dropping the handle keeps the subscription; call unsubscribe() to end it"]
pub struct Subscription<S> {
    id: u64,
    inner: Weak<Mutex<Inner<S>>>,
}

impl<S> Subscription<S> {
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            lock(&inner).subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}

// A subscriber that panicked poisons nothing we can't recover: the state
// itself is only ever replaced wholesale.
fn lock<S>(inner: &Mutex<Inner<S>>) -> MutexGuard<'_, Inner<S>> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Notification<S> {
    new: Arc<S>,
    old: Arc<S>,
    subscribers: Vec<Callback<S>>,
}

impl<S> Notification<S> {
    fn deliver(self) {
        for callback in self.subscribers {
            callback(&self.new, &self.old);
        }
    }
}

/// Swaps in the new state and snapshots the subscriber list. Delivery
/// happens after the lock is released.
fn publish<S>(inner: &mut Inner<S>, next: S) -> Notification<S> {
    let new = Arc::new(next);
    let old = std::mem::replace(&mut inner.state, new.clone());
    let subscribers = inner.subscribers.iter().map(|(_, cb)| cb.clone()).collect();
    Notification {
        new,
        old,
        subscribers,
    }
}

impl<S: Clone> Store<S> {
    pub fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: Arc::new(initial),
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    pub fn get(&self) -> Arc<S> {
        lock(&self.inner).state.clone()
    }

    /// Applies `update` to a copy of the current state, publishes it and
    /// notifies subscribers. Returns whatever `update` returns.
    pub fn set<R>(&self, update: impl FnOnce(&mut S) -> R) -> R {
        let (result, notification) = {
            let mut inner = lock(&self.inner);
            let mut next = S::clone(&inner.state);
            let result = update(&mut next);
            (result, publish(&mut inner, next))
        };
        notification.deliver();
        result
    }

    /// Like [`set`](Self::set), but the update can decline by returning
    /// `None`; the state is then left untouched and nobody is notified.
    pub fn try_set<R>(&self, update: impl FnOnce(&mut S) -> Option<R>) -> Option<R> {
        let (result, notification) = {
            let mut inner = lock(&self.inner);
            let mut next = S::clone(&inner.state);
            let result = update(&mut next)?;
            (result, publish(&mut inner, next))
        };
        notification.deliver();
        Some(result)
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription<S>
    where
        F: Fn(&Arc<S>, &Arc<S>) + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Arc::new(callback)));

        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Counter {
        value: i32,
        label: String,
    }

    #[test]
    fn test_get_returns_snapshot() {
        let store = Store::new(Counter::default());
        let before = store.get();
        store.set(|s| s.value = 5);
        assert_eq!(before.value, 0);
        assert_eq!(store.get().value, 5);
    }

    #[test]
    fn test_set_merges_partial_update() {
        let store = Store::new(Counter {
            value: 1,
            label: "one".to_string(),
        });
        store.set(|s| s.value = 2);
        assert_eq!(
            *store.get(),
            Counter {
                value: 2,
                label: "one".to_string()
            }
        );
    }

    #[test]
    fn test_subscribers_receive_new_and_old_in_order() {
        let store = Store::new(Counter::default());
        let seen = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second"] {
            let seen = seen.clone();
            let _sub = store.subscribe(move |new: &Arc<Counter>, old: &Arc<Counter>| {
                seen.lock()
                    .unwrap()
                    .push(format!("{}:{}->{}", name, old.value, new.value));
            });
        }

        store.set(|s| s.value = 7);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:0->7".to_string(), "second:0->7".to_string()]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let store = Store::new(Counter::default());
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let sub = store.subscribe(move |_, _| *counter.lock().unwrap() += 1);

        store.set(|s| s.value = 1);
        sub.unsubscribe();
        store.set(|s| s.value = 2);

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribe_during_notify_applies_next_round() {
        let store = Store::new(Counter::default());
        let late_calls = Arc::new(Mutex::new(0));

        let handle = store.clone();
        let late = late_calls.clone();
        let _sub = store.subscribe(move |new, _| {
            if new.value == 1 {
                let late = late.clone();
                let _inner = handle.subscribe(move |_, _| *late.lock().unwrap() += 1);
            }
        });

        store.set(|s| s.value = 1);
        assert_eq!(*late_calls.lock().unwrap(), 0);

        store.set(|s| s.value = 2);
        assert_eq!(*late_calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_set_from_subscriber() {
        let store = Store::new(Counter::default());
        let handle = store.clone();
        let _sub = store.subscribe(move |new, _| {
            if new.value == 1 && new.label.is_empty() {
                handle.set(|s| s.label = "bumped".to_string());
            }
        });

        store.set(|s| s.value = 1);
        assert_eq!(store.get().label, "bumped");
        assert_eq!(store.get().value, 1);
    }

    #[test]
    fn test_try_set_declined_does_not_notify() {
        let store = Store::new(Counter::default());
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let _sub = store.subscribe(move |_, _| *counter.lock().unwrap() += 1);

        let result: Option<()> = store.try_set(|s| {
            s.value = 99;
            None
        });

        assert!(result.is_none());
        assert_eq!(store.get().value, 0);
        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
