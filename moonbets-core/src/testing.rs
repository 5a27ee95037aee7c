//! In-memory settlement authority driven by a script keyed on elapsed
//! (tokio) time. Used with paused-clock tests.

use crate::authority::{EventSubscription, SettlementAuthority, DEFAULT_CHANNEL_CAPACITY};
use crate::error::{AuthorityError, DecodeError, SubmissionError};
use crate::program::Instruction;
use crate::signer::WagerSigner;
use crate::types::{PlayerState, Pubkey, ResolutionEvent};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub(crate) enum Step {
    State(PlayerState),
    Transient,
    Fatal,
}

#[derive(Debug, Clone)]
pub(crate) enum Push {
    Event(ResolutionEvent),
    Garbage,
}

pub(crate) struct ScriptedAuthority {
    start: Instant,
    initial: Mutex<PlayerState>,
    submit_effect: Mutex<Option<PlayerState>>,
    steps: Mutex<Vec<(Duration, Step)>>,
    pushes: Mutex<Vec<(Duration, Push)>>,
    close_stream: AtomicBool,
    stuck_reader: AtomicBool,
    fail_subscribe: AtomicBool,
    state_outage_on_submit: AtomicBool,
    state_outage: AtomicBool,
    balance: Mutex<Result<u64, String>>,
    submit_result: Mutex<Result<String, SubmissionError>>,
    last_instruction: Mutex<Option<Instruction>>,
    calls: Mutex<Vec<&'static str>>,
    poll_times: Mutex<Vec<Duration>>,
    subscriptions: AtomicUsize,
    unsubscribes: Arc<AtomicUsize>,
    submissions: AtomicUsize,
}

impl ScriptedAuthority {
    /// `initial` is served until the first scripted step is due.
    pub fn new(initial: PlayerState) -> Self {
        Self {
            start: Instant::now(),
            initial: Mutex::new(initial),
            submit_effect: Mutex::new(None),
            steps: Mutex::new(Vec::new()),
            pushes: Mutex::new(Vec::new()),
            close_stream: AtomicBool::new(false),
            stuck_reader: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            state_outage_on_submit: AtomicBool::new(false),
            state_outage: AtomicBool::new(false),
            balance: Mutex::new(Ok(10_000_000_000)),
            submit_result: Mutex::new(Ok(
                "3dYhq5Mw8vZbGk3cTnQW4nSAfRt7u1xDEfYbVZcPzP8V9pQkM3oJ2hXq1ZyN6sWcLtRbE4uA5gHfK7mDjC2vX9Kp"
                    .to_string(),
            )),
            last_instruction: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            poll_times: Mutex::new(Vec::new()),
            subscriptions: AtomicUsize::new(0),
            unsubscribes: Arc::new(AtomicUsize::new(0)),
            submissions: AtomicUsize::new(0),
        }
    }

    pub fn with_state_at(self, at: Duration, state: PlayerState) -> Self {
        self.push_step(at, Step::State(state));
        self
    }

    pub fn with_transient_at(self, at: Duration) -> Self {
        self.push_step(at, Step::Transient);
        self
    }

    pub fn with_fatal_at(self, at: Duration) -> Self {
        self.push_step(at, Step::Fatal);
        self
    }

    pub fn with_event_at(self, at: Duration, event: ResolutionEvent) -> Self {
        self.pushes.lock().push((at, Push::Event(event)));
        self
    }

    pub fn with_garbage_at(self, at: Duration) -> Self {
        self.pushes.lock().push((at, Push::Garbage));
        self
    }

    /// Close the event stream once every scripted push has been sent.
    pub fn closing_stream(self) -> Self {
        self.close_stream.store(true, Ordering::SeqCst);
        self
    }

    /// Event reader that never reacts to shutdown, like one wedged in a
    /// socket write.
    pub fn with_stuck_reader(self) -> Self {
        self.stuck_reader.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_subscribe(self) -> Self {
        self.fail_subscribe.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_balance(self, lamports: u64) -> Self {
        *self.balance.lock() = Ok(lamports);
        self
    }

    pub fn failing_balance(self, reason: &str) -> Self {
        *self.balance.lock() = Err(reason.to_string());
        self
    }

    /// State served from the moment `submit` is called until the next
    /// scripted step, whatever the submit result.
    pub fn with_submit_effect(self, state: PlayerState) -> Self {
        *self.submit_effect.lock() = Some(state);
        self
    }

    /// Every state read after `submit` fails with a transport error.
    pub fn with_state_outage_after_submit(self) -> Self {
        self.state_outage_on_submit.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_submit_result(&self, result: Result<String, SubmissionError>) {
        *self.submit_result.lock() = result;
    }

    fn push_step(&self, at: Duration, step: Step) {
        let mut steps = self.steps.lock();
        steps.push((at, step));
        steps.sort_by_key(|(at, _)| *at);
    }

    pub fn polls(&self) -> usize {
        self.poll_times.lock().len()
    }

    pub fn poll_times(&self) -> Vec<Duration> {
        self.poll_times.lock().clone()
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    pub fn unsubscribes(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instruction.lock().clone()
    }

    /// Names of the trait methods in call order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SettlementAuthority for ScriptedAuthority {
    async fn submit(
        &self,
        instruction: &Instruction,
        _signer: &dyn WagerSigner,
    ) -> Result<String, SubmissionError> {
        self.calls.lock().push("submit");
        self.submissions.fetch_add(1, Ordering::SeqCst);
        *self.last_instruction.lock() = Some(instruction.clone());
        if let Some(state) = self.submit_effect.lock().take() {
            *self.initial.lock() = state;
        }
        if self.state_outage_on_submit.load(Ordering::SeqCst) {
            self.state_outage.store(true, Ordering::SeqCst);
        }
        self.submit_result.lock().clone()
    }

    async fn fetch_player_state(&self, _player: &Pubkey) -> Result<PlayerState, AuthorityError> {
        let elapsed = self.start.elapsed();
        self.calls.lock().push("state");
        self.poll_times.lock().push(elapsed);
        if self.state_outage.load(Ordering::SeqCst) {
            return Err(AuthorityError::transport("node unhealthy"));
        }

        let steps = self.steps.lock();
        let due = steps.iter().rev().find(|(at, _)| *at <= elapsed);
        match due {
            None => Ok(*self.initial.lock()),
            Some((_, Step::State(state))) => Ok(*state),
            Some((_, Step::Transient)) => Err(AuthorityError::transport("connection reset by peer")),
            Some((_, Step::Fatal)) => Err(AuthorityError::Decode(DecodeError::discriminator(
                "Player account",
                &[0u8; 8],
            ))),
        }
    }

    async fn fetch_balance(&self, _wallet: &Pubkey) -> Result<u64, AuthorityError> {
        self.calls.lock().push("balance");
        self.balance
            .lock()
            .clone()
            .map_err(|reason| AuthorityError::transport(reason))
    }

    async fn subscribe(&self, _player: &Pubkey) -> Result<EventSubscription, AuthorityError> {
        self.calls.lock().push("subscribe");
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(AuthorityError::subscription("connection refused"));
        }
        let id = self.subscriptions.fetch_add(1, Ordering::SeqCst) as u64 + 1;

        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let pushes = self.pushes.lock().clone();
        let close_stream = self.close_stream.load(Ordering::SeqCst);
        let stuck = self.stuck_reader.load(Ordering::SeqCst);
        let unsubscribes = self.unsubscribes.clone();
        let start = self.start;

        let handle = tokio::spawn(async move {
            if stuck {
                let _open = tx;
                return std::future::pending::<()>().await;
            }
            let mut tx = Some(tx);
            for (at, push) in pushes {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        unsubscribes.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                    _ = tokio::time::sleep_until(start + at) => {
                        let item = match push {
                            Push::Event(event) => Ok(event),
                            Push::Garbage => Err(AuthorityError::Decode(DecodeError::Base64(
                                "invalid padding".to_string(),
                            ))),
                        };
                        if let Some(sender) = &tx {
                            if sender.send(item).await.is_err() {
                                tx = None;
                            }
                        }
                    }
                }
            }
            if close_stream {
                tx = None;
            }
            let _ = shutdown_rx.await;
            unsubscribes.fetch_add(1, Ordering::SeqCst);
            drop(tx);
        });

        Ok(EventSubscription::new(id, rx, shutdown_tx, handle))
    }
}
