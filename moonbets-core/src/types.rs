use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use solana_program::pubkey::Pubkey;

/// Serde helpers writing addresses as base58 strings rather than byte
/// arrays, so config files and JSON output stay readable.
pub mod base58 {
    use super::Pubkey;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let text = String::deserialize(deserializer)?;
        Pubkey::from_str(&text).map_err(de::Error::custom)
    }

    pub mod option {
        use super::Pubkey;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            key: &Option<Pubkey>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match key {
                Some(key) => serializer.collect_str(key),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Pubkey>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapper(#[serde(with = "super")] Pubkey);

            let wrapper = Option::<Wrapper>::deserialize(deserializer)?;
            Ok(wrapper.map(|Wrapper(key)| key))
        }
    }
}

/// Snapshot of the on-chain `Player` account. Owned by the settlement
/// authority; only ever read here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub last_result: u8,
    pub current_bet: u8, // 0 = no bet pending
    pub last_bet_amount: u64,
    pub pending_withdrawal: u64,
    pub wins: u16,
    pub losses: u16,
    pub total_games: u16,
}

impl PlayerState {
    pub fn has_pending_bet(&self) -> bool {
        self.current_bet != 0
    }

    /// A wager placed after `prior` has settled: no bet is pending and the
    /// result moved. Both conditions are required.
    pub fn settled_since(&self, prior: &PlayerState) -> bool {
        !self.has_pending_bet() && self.last_result != prior.last_result
    }
}

/// `DiceRolled` event pushed by the program once the VRF callback lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionEvent {
    #[serde(with = "base58")]
    pub subject: Pubkey,
    pub result_value: u8,
    pub won: bool,
    pub payout: u64,
}

/// Acknowledgement of a dispatched wager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub submission_id: String,
    pub chosen_number: u8,
    pub stake_lamports: u64,
    pub client_nonce: u8,
    pub submitted_at: DateTime<Utc>,
    /// False when the authority never acknowledged the submission and the
    /// wager was only observed afterwards in player state.
    pub confirmed: bool,
}

/// Terminal value of one wager attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Won { result_value: u8, payout: u64 },
    Lost { result_value: u8 },
    TimedOut,
    SubmissionFailed { reason: String },
}

impl Outcome {
    pub fn from_event(event: &ResolutionEvent) -> Self {
        if event.won {
            Outcome::Won {
                result_value: event.result_value,
                payout: event.payout,
            }
        } else {
            Outcome::Lost {
                result_value: event.result_value,
            }
        }
    }

    pub fn result_value(&self) -> Option<u8> {
        match self {
            Outcome::Won { result_value, .. } | Outcome::Lost { result_value } => {
                Some(*result_value)
            }
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.result_value().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_subject_as_base58() {
        let event = ResolutionEvent {
            subject: Pubkey::new_from_array([0u8; 32]),
            result_value: 4,
            won: false,
            payout: 0,
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["subject"], "11111111111111111111111111111111");

        let back: ResolutionEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);

        let bad = serde_json::json!({
            "subject": "not-base58!",
            "result_value": 4,
            "won": false,
            "payout": 0
        });
        assert!(serde_json::from_value::<ResolutionEvent>(bad).is_err());
    }

    #[test]
    fn test_settlement_needs_both_conditions() {
        let prior = PlayerState {
            last_result: 7,
            ..Default::default()
        };

        let registered = PlayerState {
            last_result: 7,
            current_bet: 3,
            ..Default::default()
        };
        assert!(!registered.settled_since(&prior));

        // result moved but a bet is still pending
        let still_pending = PlayerState {
            last_result: 2,
            current_bet: 3,
            ..Default::default()
        };
        assert!(!still_pending.settled_since(&prior));

        // cleared but the result repeated
        let repeated = PlayerState {
            last_result: 7,
            current_bet: 0,
            losses: 1,
            ..Default::default()
        };
        assert!(!repeated.settled_since(&prior));

        let settled = PlayerState {
            last_result: 2,
            current_bet: 0,
            ..Default::default()
        };
        assert!(settled.settled_since(&prior));
    }

    #[test]
    fn test_outcome_from_event() {
        let subject = Pubkey::default();
        let won = ResolutionEvent {
            subject,
            result_value: 2,
            won: true,
            payout: 100_000_000,
        };
        assert_eq!(
            Outcome::from_event(&won),
            Outcome::Won {
                result_value: 2,
                payout: 100_000_000
            }
        );

        let lost = ResolutionEvent {
            won: false,
            payout: 0,
            ..won
        };
        assert_eq!(Outcome::from_event(&lost), Outcome::Lost { result_value: 2 });
        assert!(!Outcome::TimedOut.is_resolved());
    }
}
