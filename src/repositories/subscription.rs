use futures_util::{Stream, stream};
use tokio::sync::watch;

/// Handle to an observed value. Updates are received until the handle is dropped or
/// [`cancel`](Self::cancel)ed.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    pub(super) fn new(rx: watch::Receiver<T>) -> Self {
        Self { rx }
    }

    /// The latest value, without waiting for a change.
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next change and return the new value, or `None` if the source is gone.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Stop observing. Dropping the handle has the same effect.
    pub fn cancel(self) {
        drop(self);
    }

    pub fn into_stream(self) -> impl Stream<Item = T> {
        stream::unfold(self, |mut sub| async move {
            let value = sub.next().await?;
            Some((value, sub))
        })
    }
}
