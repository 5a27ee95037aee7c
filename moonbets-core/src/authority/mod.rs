//! The settlement authority seam: everything the client needs from the
//! chain, behind one trait so the resolver can be driven by a scripted
//! authority in tests.

pub mod rpc;
pub mod websocket;

pub use rpc::RpcAuthority;

use crate::error::{AuthorityError, SubmissionError};
use crate::program::Instruction;
use crate::signer::WagerSigner;
use crate::types::{PlayerState, Pubkey, ResolutionEvent};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// How long a reader gets to say goodbye before it is aborted. Teardown
/// sits on the resolution path, so this stays short.
pub(crate) const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

#[async_trait]
pub trait SettlementAuthority: Send + Sync {
    /// Sign and dispatch one transaction carrying `instruction`. Returns the
    /// transaction signature. Never retries.
    async fn submit(
        &self,
        instruction: &Instruction,
        signer: &dyn WagerSigner,
    ) -> Result<String, SubmissionError>;

    async fn fetch_player_state(&self, player: &Pubkey) -> Result<PlayerState, AuthorityError>;

    async fn fetch_balance(&self, wallet: &Pubkey) -> Result<u64, AuthorityError>;

    /// Open a push channel of resolution events mentioning `player`.
    async fn subscribe(&self, player: &Pubkey) -> Result<EventSubscription, AuthorityError>;
}

/// Live event subscription. The reader task runs until `unsubscribe` is
/// called or the subscription is dropped.
pub struct EventSubscription {
    id: u64,
    receiver: mpsc::Receiver<Result<ResolutionEvent, AuthorityError>>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl EventSubscription {
    pub fn new(
        id: u64,
        receiver: mpsc::Receiver<Result<ResolutionEvent, AuthorityError>>,
        shutdown: oneshot::Sender<()>,
        handle: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            receiver,
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.shutdown.is_some()
    }

    /// Next event, or `None` once the stream has closed.
    pub async fn next(&mut self) -> Option<Result<ResolutionEvent, AuthorityError>> {
        self.receiver.recv().await
    }

    /// Tear the subscription down. Safe to call any number of times; only
    /// the first call does anything, and it reports `true`. Returns within
    /// `SHUTDOWN_GRACE` even if the reader ignores the shutdown signal.
    pub async fn unsubscribe(&mut self) -> bool {
        let Some(shutdown) = self.shutdown.take() else {
            return false;
        };

        // the reader may already be gone
        let _ = shutdown.send(());
        // unblocks a reader stuck on a full channel
        self.receiver.close();
        if let Some(mut handle) = self.handle.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_cancelled() => {}
                Ok(Err(e)) => {
                    tracing::warn!(subscription = self.id, error = %e, "event reader task failed");
                }
                Err(_) => {
                    tracing::warn!(subscription = self.id, "event reader did not stop, aborting");
                    handle.abort();
                }
            }
        }

        tracing::debug!(subscription = self.id, "unsubscribed");
        true
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
