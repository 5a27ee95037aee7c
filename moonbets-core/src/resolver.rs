//! Outcome resolution: the push event stream and the player-state poll race
//! each other under one timeout, and exactly one `Outcome` comes out.
//!
//! A resolution is split in two phases so callers can subscribe before the
//! wager is even submitted:
//!
//! ```text
//! arm(subject) ──► submit ──► ArmedResolution::resolve(receipt, prior)
//!                                 │
//!                  select! { push event | state poll | timeout }
//!                                 │
//!                             unsubscribe
//! ```

use crate::authority::{EventSubscription, SettlementAuthority};
use crate::config::ResolverConfig;
use crate::program::PAYOUT_MULTIPLIER;
use crate::types::{Outcome, PlayerState, Pubkey, SubmissionReceipt};
use std::sync::Arc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

pub struct OutcomeResolver<A> {
    authority: Arc<A>,
    config: ResolverConfig,
}

impl<A: SettlementAuthority> OutcomeResolver<A> {
    pub fn new(authority: Arc<A>, config: ResolverConfig) -> Self {
        Self { authority, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Open the event subscription for `subject`. If subscribing fails the
    /// resolution still runs on polling alone.
    pub async fn arm(&self, subject: Pubkey) -> ArmedResolution<A> {
        let subscription = match self.authority.subscribe(&subject).await {
            Ok(subscription) => {
                debug!(subscription = subscription.id(), subject = %subject, "Resolution armed");
                Some(subscription)
            }
            Err(e) => {
                warn!(subject = %subject, error = %e, "Event subscription failed, falling back to polling only");
                None
            }
        };

        ArmedResolution {
            authority: self.authority.clone(),
            config: self.config.clone(),
            subject,
            subscription,
        }
    }

    /// Subscribe and race in one go, for wagers submitted elsewhere.
    pub async fn resolve(
        &self,
        receipt: &SubmissionReceipt,
        subject: Pubkey,
        prior: &PlayerState,
    ) -> Outcome {
        self.arm(subject).await.resolve(receipt, prior).await
    }
}

/// A resolution whose subscription is open but whose race has not started.
pub struct ArmedResolution<A> {
    authority: Arc<A>,
    config: ResolverConfig,
    subject: Pubkey,
    subscription: Option<EventSubscription>,
}

impl<A: SettlementAuthority> ArmedResolution<A> {
    pub fn subject(&self) -> Pubkey {
        self.subject
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }

    pub async fn resolve(mut self, receipt: &SubmissionReceipt, prior: &PlayerState) -> Outcome {
        let started = Instant::now();
        info!(
            submission_id = %receipt.submission_id,
            subject = %self.subject,
            timeout_secs = self.config.timeout.as_secs(),
            "Waiting for wager outcome"
        );

        let outcome = {
            let push = wait_for_event(self.subscription.as_mut(), self.subject);
            let pull = poll_for_settlement(
                &*self.authority,
                self.subject,
                receipt,
                prior,
                &self.config,
            );

            tokio::select! {
                biased;

                outcome = push => {
                    info!(source = "event", elapsed_ms = started.elapsed().as_millis() as u64, "Wager resolved");
                    outcome
                }
                outcome = pull => {
                    info!(source = "poll", elapsed_ms = started.elapsed().as_millis() as u64, "Wager resolved");
                    outcome
                }
                _ = tokio::time::sleep(self.config.timeout) => {
                    warn!(
                        submission_id = %receipt.submission_id,
                        "No outcome after {}s, wager may still settle",
                        self.config.timeout.as_secs()
                    );
                    Outcome::TimedOut
                }
            }
        };

        self.teardown().await;
        outcome
    }

    /// Tear down without resolving, e.g. when submission failed.
    pub async fn cancel(mut self) {
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.as_mut() {
            subscription.unsubscribe().await;
        }
    }
}

/// Push path. Parks forever when there is no usable stream so the other
/// branches decide.
async fn wait_for_event(subscription: Option<&mut EventSubscription>, subject: Pubkey) -> Outcome {
    if let Some(subscription) = subscription {
        while let Some(item) = subscription.next().await {
            match item {
                Ok(event) if event.subject == subject => return Outcome::from_event(&event),
                Ok(event) => {
                    trace!(subject = %event.subject, "Ignoring event for another player");
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable event");
                }
            }
        }
        debug!("Event stream closed, relying on polling");
    }

    std::future::pending().await
}

/// Pull path. The first fetch happens one interval after the race starts.
async fn poll_for_settlement<A: SettlementAuthority + ?Sized>(
    authority: &A,
    subject: Pubkey,
    receipt: &SubmissionReceipt,
    prior: &PlayerState,
    config: &ResolverConfig,
) -> Outcome {
    let mut ticker = interval_at(Instant::now() + config.poll_interval, config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut attempt: u32 = 0;
    loop {
        ticker.tick().await;
        attempt += 1;

        match authority.fetch_player_state(&subject).await {
            Ok(state) if state.settled_since(prior) => {
                return outcome_from_state(receipt, prior, &state);
            }
            Ok(state) => {
                debug!(
                    attempt,
                    current_bet = state.current_bet,
                    last_result = state.last_result,
                    "Wager not settled yet"
                );
            }
            Err(e) if e.is_transient() => {
                warn!(attempt, error = %e, "Player state poll failed, retrying");
            }
            Err(e) => {
                warn!(attempt, error = %e, "Player state unusable, polling stopped");
                break;
            }
        }
    }

    std::future::pending().await
}

/// Infer the outcome from a settled player account. Counter movement is
/// authoritative; when neither counter moved the result is compared with
/// the chosen number.
pub fn outcome_from_state(
    receipt: &SubmissionReceipt,
    prior: &PlayerState,
    state: &PlayerState,
) -> Outcome {
    let result_value = state.last_result;
    let full_payout = receipt.stake_lamports.saturating_mul(PAYOUT_MULTIPLIER);

    if state.wins != prior.wins {
        let credited = state
            .pending_withdrawal
            .saturating_sub(prior.pending_withdrawal);
        let payout = if credited > 0 { credited } else { full_payout };
        Outcome::Won {
            result_value,
            payout,
        }
    } else if state.losses != prior.losses {
        Outcome::Lost { result_value }
    } else if result_value == receipt.chosen_number {
        Outcome::Won {
            result_value,
            payout: full_payout,
        }
    } else {
        Outcome::Lost { result_value }
    }
}
