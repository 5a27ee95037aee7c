use crate::types::Outcome;
use crate::wager::format_sol;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Win,
    Loss,
    /// Not settled as far as we know. Check again later.
    Pending,
    Failure,
}

/// What the presentation side needs to show one finished wager attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayResult {
    pub tone: Tone,
    pub headline: String,
    pub detail: String,
    pub result_value: Option<u8>,
    pub payout_lamports: Option<u64>,
}

pub fn report(outcome: &Outcome) -> DisplayResult {
    match outcome {
        Outcome::Won {
            result_value,
            payout,
        } => DisplayResult {
            tone: Tone::Win,
            headline: "TO THE MOON!".to_string(),
            detail: format!(
                "Dice result: {}. You won! Payout: {} lamports ({} SOL)",
                result_value,
                payout,
                format_sol(*payout)
            ),
            result_value: Some(*result_value),
            payout_lamports: Some(*payout),
        },
        Outcome::Lost { result_value } => DisplayResult {
            tone: Tone::Loss,
            headline: "CRASHED!".to_string(),
            detail: format!("Dice result: {}. Better luck next time!", result_value),
            result_value: Some(*result_value),
            payout_lamports: None,
        },
        Outcome::TimedOut => DisplayResult {
            tone: Tone::Pending,
            headline: "Still rolling".to_string(),
            detail: "No result received in time. The bet may still settle, check your stats again later."
                .to_string(),
            result_value: None,
            payout_lamports: None,
        },
        Outcome::SubmissionFailed { reason } => DisplayResult {
            tone: Tone::Failure,
            headline: "Bet failed".to_string(),
            detail: reason.clone(),
            result_value: None,
            payout_lamports: None,
        },
    }
}

/// Rendering callback supplied by the presentation layer.
pub trait ResultSink {
    fn show(&mut self, result: DisplayResult);
}

impl<F: FnMut(DisplayResult)> ResultSink for F {
    fn show(&mut self, result: DisplayResult) {
        self(result)
    }
}

pub fn deliver(outcome: &Outcome, sink: &mut impl ResultSink) {
    sink.show(report(outcome));
}
