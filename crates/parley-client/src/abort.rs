use tokio::sync::watch;

/// Handle used to request cancellation of an in-flight stream.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// Cancellation is cooperative: the stream notices it at its next pending
    /// read and finishes through the sink's cancellation path.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving side of an [`AbortHandle`], held by the stream task.
#[derive(Debug)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// Resolves once cancellation has been requested.
    ///
    /// Never resolves if every handle is dropped without aborting.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Creates a connected handle/signal pair.
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortSignal { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_resolves_after_abort() {
        let (handle, mut signal) = abort_pair();
        handle.abort();
        signal.cancelled().await;
        // Stays resolved for later waits.
        signal.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handle_does_not_cancel() {
        let (handle, mut signal) = abort_pair();
        drop(handle);
        let waited =
            tokio::time::timeout(std::time::Duration::from_secs(1), signal.cancelled()).await;
        assert!(waited.is_err());
    }
}
