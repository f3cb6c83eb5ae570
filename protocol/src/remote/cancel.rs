//! # Cancellation Tokens
//!
//! A [`CancelToken`] combines two ways for a caller to bound a remote call:
//!
//! - an explicit signal, tripped through the paired [`CancelHandle`]
//!   (a `tokio::sync::watch` channel, the same shape the node uses for
//!   shutdown), and
//! - an optional deadline.
//!
//! Tokens are cheap to clone. Tightening a token's deadline never loosens
//! it: [`CancelToken::with_deadline`] keeps the earlier of the two.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use super::RemoteError;

/// Trips every token created from it.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// A handle and a token that observes it.
    pub fn pair() -> (Self, CancelToken) {
        let (tx, rx) = watch::channel(false);
        let token = CancelToken {
            signal: Some(rx),
            deadline: None,
        };
        (Self { tx }, token)
    }

    /// Cancel every outstanding and future call bound to this handle.
    pub fn cancel(&self) {
        // send_replace succeeds even if every receiver is gone.
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Another token bound to this handle.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            signal: Some(self.tx.subscribe()),
            deadline: None,
        }
    }
}

/// Caller-owned bound on a remote call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    signal: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that never trips on its own.
    pub fn never() -> Self {
        Self::default()
    }

    /// Same signal, with a deadline no later than `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Same signal, with a deadline no later than `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// `Err` if the token has already tripped, checked without waiting.
    pub fn check(&self) -> Result<(), RemoteError> {
        if self.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(RemoteError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the token trips, with the reason it tripped.
    ///
    /// A token whose handle was dropped without cancelling behaves like
    /// [`never`](Self::never) apart from its deadline.
    pub async fn tripped(&self) -> RemoteError {
        let signal = self.signal.clone();
        let cancelled = async move {
            let Some(mut rx) = signal else {
                return std::future::pending::<()>().await;
            };
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    return std::future::pending::<()>().await;
                }
            }
        };
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => RemoteError::Cancelled,
            _ = expired => RemoteError::DeadlineExceeded,
        }
    }

    /// Drive `fut` to completion unless the token trips first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            reason = self.tripped() => Err(reason),
            out = fut => out,
        }
    }
}
