//! moonbets SDK - Core library for placing dice wagers against the moonbets
//! program and learning their outcome.
//!
//! A wager is validated locally, submitted once, then resolved by racing
//! the program's `DiceRolled` event stream against polls of the player
//! account, under a single timeout.

pub mod authority;
pub mod client;
pub mod config;
pub mod error;
pub mod program;
pub mod reporter;
pub mod resolver;
pub mod signer;
pub mod submission;
pub mod types;
pub mod wager;

#[cfg(test)]
mod testing;

pub use authority::{EventSubscription, RpcAuthority, SettlementAuthority};
pub use client::MoonbetsClient;
pub use config::{ClientConfig, Cluster, Commitment, ResolverConfig};
pub use error::{
    AuthorityError, DecodeError, MoonbetsError, Result, SignerError, SubmissionError,
    ValidationError,
};
pub use program::{PlayerAccounts, LAMPORTS_PER_SOL};
pub use reporter::{deliver, report, DisplayResult, ResultSink, Tone};
pub use resolver::{ArmedResolution, OutcomeResolver};
pub use signer::{Keypair, WagerSigner};
pub use submission::SubmissionClient;
pub use types::{Outcome, PlayerState, Pubkey, ResolutionEvent, SubmissionReceipt};
pub use wager::{format_sol, to_lamports, WagerRequest};
