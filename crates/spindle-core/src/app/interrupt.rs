//! InterruptContext - 1 invocation 分の timeout と外部キャンセル
//!
//! プロセス全体のシグナルハンドラは使わない。
//! supervisor に値として渡し、invocation の終了と同時に drop される
//! （= timer と cancel listener はどの終了経路でも解放される）。

use std::future::pending;
use std::time::Duration;

use tokio::sync::watch;

/// Sending side of a cancellation signal, held by whoever may abort the task.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // receiver がもう居なくてもよい
        let _ = self.tx.send(true);
    }

    /// `true` while some invocation still listens for this signal.
    pub fn is_listening(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

/// Receiving side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx: Some(rx) })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once cancellation is requested. Never resolves if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        let Some(rx) = self.rx.as_mut() else {
            return pending().await;
        };
        let fired = rx.wait_for(|cancelled| *cancelled).await.is_ok();
        if !fired {
            pending::<()>().await;
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

#[derive(Debug)]
pub struct InterruptContext {
    timeout: Option<Duration>,
    signal: CancelSignal,
}

impl InterruptContext {
    /// `timeout_seconds == 0` disables the timer.
    pub fn new(timeout_seconds: u64, signal: CancelSignal) -> Self {
        let timeout = (timeout_seconds > 0).then(|| Duration::from_secs(timeout_seconds));
        Self { timeout, signal }
    }

    pub fn unbounded() -> Self {
        Self::new(0, CancelSignal::never())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub async fn cancelled(&mut self) {
        self.signal.cancelled().await
    }
}

/// Sleeps for `timeout`, or forever when there is none.
pub async fn expire_after(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[test]
    fn zero_timeout_disables_timer() {
        assert_eq!(InterruptContext::new(0, CancelSignal::never()).timeout(), None);
        assert_eq!(
            InterruptContext::new(3, CancelSignal::never()).timeout(),
            Some(Duration::from_secs(3))
        );
    }

    #[tokio::test]
    async fn cancel_wakes_listener() {
        let (handle, signal) = CancelSignal::pair();
        let mut ctx = InterruptContext::new(0, signal);

        handle.cancel();
        timeout(Duration::from_millis(200), ctx.cancelled())
            .await
            .expect("cancellation should be observed");
    }

    #[tokio::test]
    async fn dropped_handle_never_cancels() {
        let (handle, mut signal) = CancelSignal::pair();
        drop(handle);
        assert!(timeout(Duration::from_millis(50), signal.cancelled()).await.is_err());
        assert!(!signal.is_cancelled());
    }

    #[test]
    fn dropping_context_releases_listener() {
        let (handle, signal) = CancelSignal::pair();
        let ctx = InterruptContext::new(1, signal);
        assert!(handle.is_listening());
        drop(ctx);
        assert!(!handle.is_listening());
    }

    #[tokio::test]
    async fn expire_after_without_timeout_is_pending() {
        assert!(timeout(Duration::from_millis(20), expire_after(None)).await.is_err());
        assert!(timeout(Duration::from_millis(200), expire_after(Some(Duration::from_millis(5))))
            .await
            .is_ok());
    }
}
