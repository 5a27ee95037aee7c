use crate::error::ValidationError;
use crate::program::{LAMPORTS_PER_SOL, MAX_CHOICE, MIN_CHOICE};
use serde::{Deserialize, Serialize};

/// Decimal places between SOL and lamports.
const UNIT_DECIMALS: usize = 9;

/// A validated dice wager, ready to submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WagerRequest {
    pub chosen_number: u8,
    pub stake_lamports: u64,
    pub client_nonce: u8,
}

impl WagerRequest {
    /// Validate user input and draw a fresh client nonce.
    pub fn build(
        chosen_number: u8,
        stake_sol: &str,
        balance_available: u64,
    ) -> Result<Self, ValidationError> {
        Self::build_with_nonce(chosen_number, stake_sol, balance_available, rand::random())
    }

    pub fn build_with_nonce(
        chosen_number: u8,
        stake_sol: &str,
        balance_available: u64,
        client_nonce: u8,
    ) -> Result<Self, ValidationError> {
        if !(MIN_CHOICE..=MAX_CHOICE).contains(&chosen_number) {
            return Err(ValidationError::ChoiceOutOfRange(chosen_number));
        }

        let stake_lamports = to_lamports(stake_sol)?;
        if stake_lamports == 0 {
            return Err(ValidationError::NonPositiveStake);
        }
        if stake_lamports > balance_available {
            return Err(ValidationError::InsufficientBalance {
                need: stake_lamports,
                available: balance_available,
            });
        }

        Ok(Self {
            chosen_number,
            stake_lamports,
            client_nonce,
        })
    }
}

/// Convert a SOL amount written as a decimal into lamports. Digits past
/// the ninth decimal place are dropped. Negative input is reported as a
/// non-positive stake.
pub fn to_lamports(amount: &str) -> Result<u64, ValidationError> {
    let invalid = || ValidationError::InvalidAmount(amount.to_string());

    let trimmed = amount.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().map_err(|_| invalid())?
    };

    let kept = &fraction[..fraction.len().min(UNIT_DECIMALS)];
    let fraction_value = if kept.is_empty() {
        0
    } else {
        let scale = 10u64.pow((UNIT_DECIMALS - kept.len()) as u32);
        kept.parse::<u64>().map_err(|_| invalid())? * scale
    };

    let lamports = whole_value
        .checked_mul(LAMPORTS_PER_SOL)
        .and_then(|v| v.checked_add(fraction_value))
        .ok_or_else(invalid)?;

    if negative && lamports > 0 {
        return Err(ValidationError::NonPositiveStake);
    }
    Ok(lamports)
}

/// Lamports rendered as SOL with trailing zeros trimmed.
pub fn format_sol(lamports: u64) -> String {
    let whole = lamports / LAMPORTS_PER_SOL;
    let fraction = lamports % LAMPORTS_PER_SOL;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:09}", fraction);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}
