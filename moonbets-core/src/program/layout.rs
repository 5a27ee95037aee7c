use super::discriminator;
use crate::error::DecodeError;
use crate::types::{PlayerState, Pubkey, ResolutionEvent};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use borsh::{BorshDeserialize, BorshSerialize};

const DISCRIMINATOR_LEN: usize = 8;
const PLAYER_ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + 1 + 1 + 8 + 8 + 2 + 2 + 2;
const DICE_ROLLED_LEN: usize = DISCRIMINATOR_LEN + 32 + 1 + 1 + 8;
const PROGRAM_DATA_PREFIX: &str = "Program data: ";

/// `Player` account body, after the discriminator.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
struct PlayerAccount {
    last_result: u8,
    current_bet: u8,
    last_bet_amount: u64,
    pending_withdrawal: u64,
    wins: u16,
    losses: u16,
    total_games: u16,
}

impl From<PlayerAccount> for PlayerState {
    fn from(account: PlayerAccount) -> Self {
        Self {
            last_result: account.last_result,
            current_bet: account.current_bet,
            last_bet_amount: account.last_bet_amount,
            pending_withdrawal: account.pending_withdrawal,
            wins: account.wins,
            losses: account.losses,
            total_games: account.total_games,
        }
    }
}

/// `DiceRolled` event body, after the discriminator.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
struct DiceRolled {
    player: [u8; 32],
    result: u8,
    won: bool,
    payout: u64,
}

impl From<DiceRolled> for ResolutionEvent {
    fn from(event: DiceRolled) -> Self {
        Self {
            subject: Pubkey::new_from_array(event.player),
            result_value: event.result,
            won: event.won,
            payout: event.payout,
        }
    }
}

/// Check length and discriminator, then borsh-decode the body. Trailing
/// bytes (account padding) are ignored.
fn decode_anchor<T: BorshDeserialize>(
    what: &'static str,
    data: &[u8],
    expected_len: usize,
    expected: [u8; 8],
) -> Result<T, DecodeError> {
    if data.len() < expected_len {
        return Err(DecodeError::TooShort {
            what,
            expected: expected_len,
            got: data.len(),
        });
    }

    let (found, mut body) = data.split_at(DISCRIMINATOR_LEN);
    if found != expected.as_slice() {
        return Err(DecodeError::discriminator(what, found));
    }

    T::deserialize(&mut body).map_err(|e| DecodeError::borsh(what, e))
}

pub fn decode_player_state(data: &[u8]) -> Result<PlayerState, DecodeError> {
    decode_anchor::<PlayerAccount>(
        "Player account",
        data,
        PLAYER_ACCOUNT_LEN,
        discriminator("account", "Player"),
    )
    .map(PlayerState::from)
}

pub fn decode_resolution_event(data: &[u8]) -> Result<ResolutionEvent, DecodeError> {
    decode_anchor::<DiceRolled>(
        "DiceRolled event",
        data,
        DICE_ROLLED_LEN,
        discriminator("event", "DiceRolled"),
    )
    .map(ResolutionEvent::from)
}

pub fn decode_base64(data: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD
        .decode(data)
        .map_err(|e| DecodeError::Base64(e.to_string()))
}

/// Pull every `DiceRolled` event out of a transaction's log lines. Other
/// programs' events and other event types are skipped; a `DiceRolled`
/// payload that fails to decode is reported.
pub fn parse_log_events(logs: &[String]) -> Vec<Result<ResolutionEvent, DecodeError>> {
    let wanted = discriminator("event", "DiceRolled");

    logs.iter()
        .filter_map(|line| line.strip_prefix(PROGRAM_DATA_PREFIX))
        .filter_map(|payload| match decode_base64(payload.trim()) {
            Ok(bytes) if bytes.starts_with(&wanted) => Some(decode_resolution_event(&bytes)),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
        .collect()
}

#[cfg(test)]
fn encode_anchor(discriminator: [u8; 8], body: &impl BorshSerialize) -> Vec<u8> {
    let mut data = discriminator.to_vec();
    body.serialize(&mut data).unwrap();
    data
}

#[cfg(test)]
pub(crate) fn encode_player_state(state: &PlayerState) -> Vec<u8> {
    let account = PlayerAccount {
        last_result: state.last_result,
        current_bet: state.current_bet,
        last_bet_amount: state.last_bet_amount,
        pending_withdrawal: state.pending_withdrawal,
        wins: state.wins,
        losses: state.losses,
        total_games: state.total_games,
    };
    encode_anchor(discriminator("account", "Player"), &account)
}

#[cfg(test)]
pub(crate) fn encode_resolution_event(event: &ResolutionEvent) -> Vec<u8> {
    let body = DiceRolled {
        player: event.subject.to_bytes(),
        result: event.result_value,
        won: event.won,
        payout: event.payout,
    };
    encode_anchor(discriminator("event", "DiceRolled"), &body)
}
