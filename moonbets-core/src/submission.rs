use crate::authority::SettlementAuthority;
use crate::error::SubmissionError;
use crate::program::{play_instruction, PlayerAccounts};
use crate::signer::WagerSigner;
use crate::types::SubmissionReceipt;
use crate::wager::WagerRequest;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Turns a validated wager into exactly one dispatched `play` transaction.
pub struct SubmissionClient<A> {
    authority: Arc<A>,
}

impl<A: SettlementAuthority> SubmissionClient<A> {
    pub fn new(authority: Arc<A>) -> Self {
        Self { authority }
    }

    pub async fn submit(
        &self,
        request: &WagerRequest,
        accounts: &PlayerAccounts,
        signer: &dyn WagerSigner,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let instruction = play_instruction(accounts, request)
            .map_err(|e| SubmissionError::not_dispatched(e.to_string()))?;

        info!(
            chosen_number = request.chosen_number,
            stake_lamports = request.stake_lamports,
            client_nonce = request.client_nonce,
            "Submitting wager"
        );

        match self.authority.submit(&instruction, signer).await {
            Ok(submission_id) => {
                info!(submission_id = %submission_id, "Wager submitted");
                Ok(SubmissionReceipt {
                    submission_id,
                    chosen_number: request.chosen_number,
                    stake_lamports: request.stake_lamports,
                    client_nonce: request.client_nonce,
                    submitted_at: Utc::now(),
                    confirmed: true,
                })
            }
            Err(e) => {
                warn!(ambiguous = e.is_ambiguous(), "Wager submission failed: {}", e);
                Err(e)
            }
        }
    }
}
