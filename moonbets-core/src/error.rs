use crate::types::Pubkey;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MoonbetsError>;

#[derive(Error, Debug)]
pub enum MoonbetsError {
    #[error("Invalid wager: {0}")]
    Validation(#[from] ValidationError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Settlement authority error: {0}")]
    Authority(#[from] AuthorityError),

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MoonbetsError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Local, pre-submission rejection of a wager. Nothing has been sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("stake must be greater than zero")]
    NonPositiveStake,

    #[error("insufficient balance: need {need} lamports, have {available} lamports")]
    InsufficientBalance { need: u64, available: u64 },

    #[error("chosen number {0} is outside 1..=6")]
    ChoiceOutOfRange(u8),

    #[error("invalid stake amount: {0:?}")]
    InvalidAmount(String),

    #[error("previous bet on {0} has not settled yet")]
    BetPending(u8),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// The authority answered and declined the request.
    #[error("rejected by settlement authority: {0}")]
    Rejected(String),

    /// No authoritative answer was obtained. The wager may or may not exist.
    #[error("transport failure, wager state unknown: {0}")]
    TransportFailure(String),

    /// Failed before anything reached the authority.
    #[error("not dispatched: {0}")]
    NotDispatched(String),
}

impl SubmissionError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportFailure(msg.into())
    }

    pub fn not_dispatched(msg: impl Into<String>) -> Self {
        Self::NotDispatched(msg.into())
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::TransportFailure(_))
    }
}

/// Errors from reading the authority's state or event stream.
#[derive(Error, Debug)]
pub enum AuthorityError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("account not found: {0}")]
    AccountNotFound(Pubkey),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("subscription error: {0}")]
    Subscription(String),
}

impl AuthorityError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn subscription(msg: impl Into<String>) -> Self {
        Self::Subscription(msg.into())
    }

    /// Worth retrying on the next poll. Decode failures and missing
    /// accounts will not fix themselves.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Rpc { .. } | Self::Subscription(_)
        )
    }
}

impl From<reqwest::Error> for AuthorityError {
    fn from(err: reqwest::Error) -> Self {
        AuthorityError::Transport(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for AuthorityError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        AuthorityError::Subscription(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{what}: expected at least {expected} bytes, got {got}")]
    TooShort {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{what}: discriminator mismatch (found {found})")]
    Discriminator { what: &'static str, found: String },

    #[error("{what}: {reason}")]
    Borsh { what: &'static str, reason: String },

    #[error("invalid base64: {0}")]
    Base64(String),

    #[error("invalid blockhash: {0}")]
    Blockhash(String),

    #[error("unexpected account encoding: {0}")]
    Encoding(String),
}

impl DecodeError {
    pub(crate) fn discriminator(what: &'static str, found: &[u8]) -> Self {
        Self::Discriminator {
            what,
            found: hex::encode(found),
        }
    }

    pub(crate) fn borsh(what: &'static str, err: std::io::Error) -> Self {
        Self::Borsh {
            what,
            reason: err.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error("cannot sign: {0}")]
    CannotSign(String),

    #[error("failed to read keypair file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse keypair file: {0}")]
    Parse(#[from] serde_json::Error),
}
