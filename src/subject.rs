use crossbeam::channel::{unbounded, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

struct Inner<T> {
    latest: T,
    subscribers: Vec<Sender<T>>,
}

/// Broadcasts the most recent value to any number of subscribers.
///
/// New subscribers immediately receive the current value, then every value
/// published after they subscribed.
pub(crate) struct Subject<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> Subject<T>
where
    T: Clone,
{
    pub(crate) fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(Inner {
                latest: initial,
                subscribers: Vec::new(),
            }),
        }
    }

    pub(crate) fn next(&self, value: T) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // dropped receivers unsubscribe themselves
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(value.clone()).is_ok());
        inner.latest = value;
    }

    pub(crate) fn subscribe(&self) -> Receiver<T> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let (tx, rx) = unbounded();
        // the receiver is alive here, so this cannot fail
        let _ = tx.send(inner.latest.clone());
        inner.subscribers.push(tx);
        rx
    }

    pub(crate) fn latest(&self) -> T {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .latest
            .clone()
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }
}
