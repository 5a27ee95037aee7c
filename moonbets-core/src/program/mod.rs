//! Wire-level view of the moonbets dice program: addresses, Anchor
//! discriminators, instruction encoding and account/event layouts.

pub mod layout;
pub mod transaction;

pub use layout::{decode_player_state, decode_resolution_event, parse_log_events};
pub use solana_program::instruction::{AccountMeta, Instruction};
pub use solana_program::native_token::LAMPORTS_PER_SOL;

use crate::config::ClientConfig;
use crate::error::{MoonbetsError, Result};
use crate::types::Pubkey;
use crate::wager::WagerRequest;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::hash::hashv;
use solana_program::{pubkey, system_program, sysvar};

pub const PLAYER_SEED: &[u8] = b"playerd";
pub const VAULT_SEED: &[u8] = b"platform_vault";
pub const STATS_SEED: &[u8] = b"platform_stats";
pub const IDENTITY_SEED: &[u8] = b"identity";

pub const DEFAULT_PROGRAM_ID: Pubkey = pubkey!("4u7ukPnbiHn8bfYJEftm6Euyrsi2EsBgbACG5J3pmoP2");
pub const DEFAULT_ORACLE_QUEUE: Pubkey = pubkey!("Cuj97ggrhhidhbu39TijNVqE74xvKJ69gDervRUXAxGh");
pub const VRF_PROGRAM_ID: Pubkey = pubkey!("Vrf1RNUjXmQGjmQrQLvJHs9SNkvDJEsRVFPkfSQUwGz");

/// Winning bets pay the stake times this.
pub const PAYOUT_MULTIPLIER: u64 = 2;

pub const MIN_CHOICE: u8 = 1;
pub const MAX_CHOICE: u8 = 6;

/// Anchor discriminator: first 8 bytes of sha256("<namespace>:<name>").
pub fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let hash = hashv(&[namespace.as_bytes(), b":", name.as_bytes()]).to_bytes();
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

/// Arguments of `play(user_choice: u8, bet_amount: u64, client_seed: u8)`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayArgs {
    pub user_choice: u8,
    pub bet_amount: u64,
    pub client_seed: u8,
}

impl From<&WagerRequest> for PlayArgs {
    fn from(request: &WagerRequest) -> Self {
        Self {
            user_choice: request.chosen_number,
            bet_amount: request.stake_lamports,
            client_seed: request.client_nonce,
        }
    }
}

/// Instruction data for a global Anchor method: discriminator then the
/// borsh-encoded arguments.
fn method_data(name: &str, args: &impl BorshSerialize) -> Result<Vec<u8>> {
    let mut data = discriminator("global", name).to_vec();
    args.serialize(&mut data)
        .map_err(|e| MoonbetsError::internal(format!("encoding {} arguments: {}", name, e)))?;
    Ok(data)
}

fn derive(seeds: &[&[u8]], program_id: &Pubkey, what: &str) -> Result<Pubkey> {
    Pubkey::try_find_program_address(seeds, program_id)
        .map(|(address, _)| address)
        .ok_or_else(|| MoonbetsError::internal(format!("no valid {} address", what)))
}

/// Every address a wallet needs to talk to the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerAccounts {
    pub program_id: Pubkey,
    pub wallet: Pubkey,
    pub player: Pubkey,
    pub platform_vault: Pubkey,
    pub platform_stats: Pubkey,
    pub program_identity: Pubkey,
    pub oracle_queue: Pubkey,
    pub vrf_program: Pubkey,
}

impl PlayerAccounts {
    pub fn derive(wallet: Pubkey, config: &ClientConfig) -> Result<Self> {
        let program_id = config.program_id;

        let player = derive(&[PLAYER_SEED, wallet.as_ref()], &program_id, "player")?;
        let platform_vault = match config.platform_vault {
            Some(vault) => vault,
            None => derive(&[VAULT_SEED], &program_id, "platform vault")?,
        };
        let platform_stats = match config.platform_stats {
            Some(stats) => stats,
            None => derive(&[STATS_SEED], &program_id, "platform stats")?,
        };
        let program_identity = derive(&[IDENTITY_SEED], &program_id, "program identity")?;

        Ok(Self {
            program_id,
            wallet,
            player,
            platform_vault,
            platform_stats,
            program_identity,
            oracle_queue: config.oracle_queue,
            vrf_program: config.vrf_program,
        })
    }
}

pub fn play_instruction(accounts: &PlayerAccounts, request: &WagerRequest) -> Result<Instruction> {
    let data = method_data("play", &PlayArgs::from(request))?;

    Ok(Instruction::new_with_bytes(
        accounts.program_id,
        &data,
        vec![
            AccountMeta::new(accounts.wallet, true),
            AccountMeta::new(accounts.player, false),
            AccountMeta::new(accounts.platform_vault, false),
            AccountMeta::new(accounts.platform_stats, false),
            AccountMeta::new(accounts.oracle_queue, false),
            AccountMeta::new_readonly(accounts.program_identity, false),
            AccountMeta::new_readonly(sysvar::slot_hashes::ID, false),
            AccountMeta::new_readonly(accounts.vrf_program, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
    ))
}

pub fn initialize_player_instruction(accounts: &PlayerAccounts) -> Instruction {
    Instruction::new_with_bytes(
        accounts.program_id,
        &discriminator("global", "initialize_player"),
        vec![
            AccountMeta::new(accounts.wallet, true),
            AccountMeta::new(accounts.player, false),
            AccountMeta::new(accounts.platform_stats, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
    )
}

pub fn withdraw_instruction(accounts: &PlayerAccounts) -> Instruction {
    Instruction::new_with_bytes(
        accounts.program_id,
        &discriminator("global", "withdraw"),
        vec![
            AccountMeta::new(accounts.wallet, true),
            AccountMeta::new(accounts.player, false),
            AccountMeta::new(accounts.platform_vault, false),
            AccountMeta::new(accounts.platform_stats, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
    )
}
