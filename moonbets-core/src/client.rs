use crate::authority::{RpcAuthority, SettlementAuthority};
use crate::config::ClientConfig;
use crate::error::{Result, SubmissionError, ValidationError};
use crate::program::{initialize_player_instruction, withdraw_instruction, PlayerAccounts};
use crate::resolver::OutcomeResolver;
use crate::signer::WagerSigner;
use crate::submission::SubmissionClient;
use crate::types::{Outcome, PlayerState, SubmissionReceipt};
use crate::wager::WagerRequest;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// What one player-state read says about an ambiguous submission.
enum Reconciliation {
    Landed(SubmissionReceipt),
    NotObserved,
    Unknown(String),
}

/// Everything a wallet needs to place and follow wagers: the authority,
/// the signing capability and the addresses derived from both.
pub struct MoonbetsClient<A> {
    authority: Arc<A>,
    signer: Arc<dyn WagerSigner>,
    config: ClientConfig,
    accounts: PlayerAccounts,
    submission: SubmissionClient<A>,
    resolver: OutcomeResolver<A>,
}

impl MoonbetsClient<RpcAuthority> {
    /// Client talking to the cluster named in `config`.
    pub fn connect(config: ClientConfig, signer: Arc<dyn WagerSigner>) -> Result<Self> {
        let authority = Arc::new(RpcAuthority::new(&config)?);
        Self::new(authority, signer, config)
    }
}

impl<A: SettlementAuthority> MoonbetsClient<A> {
    pub fn new(authority: Arc<A>, signer: Arc<dyn WagerSigner>, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let accounts = PlayerAccounts::derive(signer.pubkey(), &config)?;

        info!(
            wallet = %accounts.wallet,
            player = %accounts.player,
            program = %accounts.program_id,
            "Client ready"
        );

        Ok(Self {
            submission: SubmissionClient::new(authority.clone()),
            resolver: OutcomeResolver::new(authority.clone(), config.resolver.clone()),
            authority,
            signer,
            config,
            accounts,
        })
    }

    pub fn accounts(&self) -> &PlayerAccounts {
        &self.accounts
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Wallet balance in lamports.
    pub async fn balance(&self) -> Result<u64> {
        Ok(self.authority.fetch_balance(&self.accounts.wallet).await?)
    }

    pub async fn player_state(&self) -> Result<PlayerState> {
        Ok(self
            .authority
            .fetch_player_state(&self.accounts.player)
            .await?)
    }

    /// Place one wager and wait for its outcome.
    ///
    /// Validation failures are returned as errors before anything is sent,
    /// including a previous bet that has not settled: its `DiceRolled`
    /// event would otherwise be taken for this wager's result.
    /// Once a submission has been attempted the result is always an
    /// `Outcome`; a failed submission becomes `Outcome::SubmissionFailed`.
    /// The wager is never resubmitted.
    pub async fn place_bet(&self, chosen_number: u8, stake_sol: &str) -> Result<Outcome> {
        self.wager(chosen_number, stake_sol, false).await
    }

    /// Like `place_bet`, but goes ahead while a previous bet is still
    /// pending. The outcome reported may belong to that earlier bet.
    pub async fn place_bet_over_pending(&self, chosen_number: u8, stake_sol: &str) -> Result<Outcome> {
        self.wager(chosen_number, stake_sol, true).await
    }

    async fn wager(&self, chosen_number: u8, stake_sol: &str, allow_pending: bool) -> Result<Outcome> {
        let balance = self.balance().await?;
        let request = WagerRequest::build(chosen_number, stake_sol, balance)?;

        let prior = self.player_state().await?;
        if prior.has_pending_bet() {
            if !allow_pending {
                return Err(ValidationError::BetPending(prior.current_bet).into());
            }
            warn!(
                current_bet = prior.current_bet,
                "Previous bet has not settled yet, its result may be reported for this one"
            );
        }

        // subscribe before submitting so an early event is not missed
        let armed = self.resolver.arm(self.accounts.player).await;

        let receipt = match self
            .submission
            .submit(&request, &self.accounts, self.signer.as_ref())
            .await
        {
            Ok(receipt) => receipt,
            Err(SubmissionError::TransportFailure(reason)) => {
                match self.reconcile(&request, &prior).await {
                    Reconciliation::Landed(receipt) => receipt,
                    Reconciliation::NotObserved => {
                        armed.cancel().await;
                        return Ok(Outcome::SubmissionFailed {
                            reason: format!(
                                "{}; the bet was not observed on chain, check your stats before retrying",
                                reason
                            ),
                        });
                    }
                    Reconciliation::Unknown(check_error) => {
                        armed.cancel().await;
                        return Ok(Outcome::SubmissionFailed {
                            reason: format!(
                                "{}; could not verify whether the bet landed ({}), it may already be staked, check your stats before retrying",
                                reason, check_error
                            ),
                        });
                    }
                }
            }
            Err(e) => {
                armed.cancel().await;
                return Ok(Outcome::SubmissionFailed {
                    reason: e.to_string(),
                });
            }
        };

        Ok(armed.resolve(&receipt, &prior).await)
    }

    /// After an ambiguous submission, look at the player account once. If
    /// it moved, the wager reached the program and is worth resolving.
    async fn reconcile(&self, request: &WagerRequest, prior: &PlayerState) -> Reconciliation {
        match self.player_state().await {
            Ok(state) if state != *prior => {
                info!(
                    current_bet = state.current_bet,
                    "Wager observed on chain despite transport failure"
                );
                Reconciliation::Landed(SubmissionReceipt {
                    submission_id: "unconfirmed".to_string(),
                    chosen_number: request.chosen_number,
                    stake_lamports: request.stake_lamports,
                    client_nonce: request.client_nonce,
                    submitted_at: Utc::now(),
                    confirmed: false,
                })
            }
            Ok(_) => Reconciliation::NotObserved,
            Err(e) => {
                warn!(error = %e, "Could not check player state after transport failure");
                Reconciliation::Unknown(e.to_string())
            }
        }
    }

    /// Create the player account. Returns the transaction signature.
    pub async fn initialize_player(&self) -> Result<String> {
        let instruction = initialize_player_instruction(&self.accounts);
        let signature = self
            .authority
            .submit(&instruction, self.signer.as_ref())
            .await?;
        info!(signature = %signature, player = %self.accounts.player, "Player initialized");
        Ok(signature)
    }

    /// Move pending winnings to the wallet. Returns the transaction signature.
    pub async fn withdraw(&self) -> Result<String> {
        let instruction = withdraw_instruction(&self.accounts);
        let signature = self
            .authority
            .submit(&instruction, self.signer.as_ref())
            .await?;
        info!(signature = %signature, "Withdrawal sent");
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MoonbetsError;
    use crate::program::discriminator;
    use crate::signer::Keypair;
    use crate::testing::ScriptedAuthority;
    use crate::types::{Pubkey, ResolutionEvent};
    use std::time::Duration;

    fn prior() -> PlayerState {
        PlayerState {
            last_result: 7,
            ..Default::default()
        }
    }

    fn keypair() -> Keypair {
        Keypair::from_secret_bytes(&[33u8; 32])
    }

    fn client(authority: &Arc<ScriptedAuthority>) -> MoonbetsClient<ScriptedAuthority> {
        let signer: Arc<dyn WagerSigner> = Arc::new(keypair());
        MoonbetsClient::new(authority.clone(), signer, ClientConfig::default()).unwrap()
    }

    fn player() -> Pubkey {
        PlayerAccounts::derive(keypair().pubkey(), &ClientConfig::default())
            .unwrap()
            .player
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_bet_sends_nothing() {
        let authority = Arc::new(ScriptedAuthority::new(prior()).with_balance(1_000_000_000));
        let client = client(&authority);

        let err = client.place_bet(3, "2").await.unwrap_err();
        assert!(matches!(
            err,
            MoonbetsError::Validation(ValidationError::InsufficientBalance {
                need: 2_000_000_000,
                available: 1_000_000_000
            })
        ));

        let err = client.place_bet(9, "0.1").await.unwrap_err();
        assert!(matches!(
            err,
            MoonbetsError::Validation(ValidationError::ChoiceOutOfRange(9))
        ));

        assert_eq!(authority.submissions(), 0);
        assert_eq!(authority.subscriptions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_place_bet_subscribes_before_submitting() {
        let authority = Arc::new(
            ScriptedAuthority::new(prior()).with_event_at(
                Duration::from_secs(3),
                ResolutionEvent {
                    subject: player(),
                    result_value: 2,
                    won: true,
                    payout: 100_000_000,
                },
            ),
        );

        let outcome = client(&authority).place_bet(2, "0.05").await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Won {
                result_value: 2,
                payout: 100_000_000
            }
        );
        assert_eq!(authority.calls(), vec!["balance", "state", "subscribe", "submit"]);
        assert_eq!(authority.submissions(), 1);
        assert_eq!(authority.unsubscribes(), 1);

        let sent = authority.last_instruction().unwrap();
        assert_eq!(&sent.data[..8], &discriminator("global", "play"));
        assert_eq!(sent.data[8], 2);
        assert_eq!(&sent.data[9..17], &50_000_000u64.to_le_bytes());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_submission_is_a_failed_outcome() {
        let authority = Arc::new(ScriptedAuthority::new(prior()));
        authority.set_submit_result(Err(SubmissionError::rejected(
            "Transaction simulation failed: insufficient lamports",
        )));

        let outcome = client(&authority).place_bet(4, "0.1").await.unwrap();

        match outcome {
            Outcome::SubmissionFailed { reason } => assert!(reason.contains("insufficient lamports")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(authority.submissions(), 1);
        assert_eq!(authority.unsubscribes(), 1);
        assert_eq!(authority.polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_with_visible_wager_is_resolved() {
        let registered = PlayerState {
            last_result: 7,
            current_bet: 4,
            last_bet_amount: 100_000_000,
            ..Default::default()
        };
        let settled = PlayerState {
            last_result: 2,
            current_bet: 0,
            losses: 1,
            total_games: 1,
            ..Default::default()
        };
        let authority = Arc::new(
            ScriptedAuthority::new(prior())
                .with_submit_effect(registered)
                .with_state_at(Duration::from_secs(8), settled),
        );
        authority.set_submit_result(Err(SubmissionError::transport("operation timed out")));

        let outcome = client(&authority).place_bet(4, "0.1").await.unwrap();

        assert_eq!(outcome, Outcome::Lost { result_value: 2 });
        assert_eq!(authority.submissions(), 1);
        assert_eq!(authority.unsubscribes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_without_trace_is_not_retried() {
        let authority = Arc::new(ScriptedAuthority::new(prior()));
        authority.set_submit_result(Err(SubmissionError::transport("connection reset")));

        let outcome = client(&authority).place_bet(4, "0.1").await.unwrap();

        match outcome {
            Outcome::SubmissionFailed { reason } => {
                assert!(reason.contains("connection reset"));
                assert!(reason.contains("not observed"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(authority.submissions(), 1);
        assert_eq!(authority.unsubscribes(), 1);
        // prior snapshot plus one reconciliation read
        assert_eq!(authority.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_with_unreadable_state_is_not_called_unobserved() {
        let authority = Arc::new(ScriptedAuthority::new(prior()).with_state_outage_after_submit());
        authority.set_submit_result(Err(SubmissionError::transport("operation timed out")));

        let outcome = client(&authority).place_bet(4, "0.1").await.unwrap();

        match outcome {
            Outcome::SubmissionFailed { reason } => {
                assert!(reason.contains("operation timed out"));
                assert!(reason.contains("could not verify whether the bet landed"));
                assert!(reason.contains("node unhealthy"));
                assert!(!reason.contains("not observed"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(authority.submissions(), 1);
        assert_eq!(authority.unsubscribes(), 1);
        assert_eq!(authority.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_bet_blocks_a_new_wager() {
        let pending = PlayerState {
            last_result: 7,
            current_bet: 5,
            last_bet_amount: 100_000_000,
            ..Default::default()
        };
        let authority = Arc::new(ScriptedAuthority::new(pending));
        let client = client(&authority);

        let err = client.place_bet(2, "0.05").await.unwrap_err();
        assert!(matches!(
            err,
            MoonbetsError::Validation(ValidationError::BetPending(5))
        ));
        assert_eq!(authority.submissions(), 0);
        assert_eq!(authority.subscriptions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_bet_can_be_overridden() {
        let pending = PlayerState {
            last_result: 7,
            current_bet: 5,
            ..Default::default()
        };
        let authority = Arc::new(
            ScriptedAuthority::new(pending).with_event_at(
                Duration::from_secs(2),
                ResolutionEvent {
                    subject: player(),
                    result_value: 5,
                    won: true,
                    payout: 200_000_000,
                },
            ),
        );

        let outcome = client(&authority)
            .place_bet_over_pending(2, "0.05")
            .await
            .unwrap();

        assert!(outcome.is_resolved());
        assert_eq!(authority.submissions(), 1);
    }

    #[tokio::test]
    async fn test_balance_failure_is_reported() {
        let authority = Arc::new(ScriptedAuthority::new(prior()).failing_balance("node unhealthy"));

        let err = client(&authority).place_bet(1, "0.1").await.unwrap_err();
        assert!(matches!(err, MoonbetsError::Authority(_)));
        assert_eq!(authority.submissions(), 0);
    }

    #[tokio::test]
    async fn test_initialize_and_withdraw() {
        let authority = Arc::new(ScriptedAuthority::new(prior()));
        let client = client(&authority);

        client.initialize_player().await.unwrap();
        let sent = authority.last_instruction().unwrap();
        assert_eq!(sent.data, discriminator("global", "initialize_player").to_vec());
        assert_eq!(sent.accounts[1].pubkey, client.accounts().player);

        client.withdraw().await.unwrap();
        let sent = authority.last_instruction().unwrap();
        assert_eq!(sent.data, discriminator("global", "withdraw").to_vec());
        assert_eq!(sent.accounts[2].pubkey, client.accounts().platform_vault);

        authority.set_submit_result(Err(SubmissionError::rejected("custom program error: 0x1771")));
        assert!(matches!(
            client.withdraw().await,
            Err(MoonbetsError::Submission(SubmissionError::Rejected(_)))
        ));
    }
}
