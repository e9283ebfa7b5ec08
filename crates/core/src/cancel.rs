//! A cancellation signal shared between a turn and its owner.

use tokio::sync::watch;

/// Creates a connected pair of [`CancelHandle`] and [`CancelToken`].
#[inline]
pub fn channel() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// The owning side of a cancellation signal.
///
/// Dropping the handle cancels the paired tokens as well.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Fires the signal.
    #[inline]
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// The observing side of a cancellation signal.
#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Returns `true` if the signal has fired or the handle is gone.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Waits until the signal fires.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe.
    pub async fn cancelled(&mut self) {
        // An error means the handle has been dropped, which counts as a
        // cancellation too.
        self.rx.wait_for(|cancelled| *cancelled).await.ok();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn test_cancel() {
        let (handle, mut token) = channel();
        assert!(!token.is_cancelled());
        assert!(
            timeout(Duration::from_millis(10), token.cancelled())
                .await
                .is_err()
        );

        handle.cancel();
        assert!(token.is_cancelled());
        token.cancelled().await;
        assert!(token.clone().is_cancelled());
    }

    #[tokio::test]
    async fn test_drop_handle() {
        let (handle, mut token) = channel();
        drop(handle);
        assert!(token.is_cancelled());
        token.cancelled().await;
    }
}
