use super::{websocket, EventSubscription, SettlementAuthority, DEFAULT_CHANNEL_CAPACITY};
use crate::config::{ClientConfig, Commitment};
use crate::error::{AuthorityError, DecodeError, MoonbetsError, Result, SubmissionError};
use crate::program::layout::decode_base64;
use crate::program::transaction::{compile_message, sign_transaction};
use crate::program::{decode_player_state, Instruction};
use crate::signer::WagerSigner;
use crate::types::{PlayerState, Pubkey};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use solana_program::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl RpcErrorBody {
    /// Preflight failures carry the program logs; the last one usually
    /// names the program error.
    fn describe(&self) -> String {
        let last_log = self
            .data
            .as_ref()
            .and_then(|data| data.get("logs"))
            .and_then(Value::as_array)
            .and_then(|logs| logs.iter().rev().find_map(Value::as_str));

        match last_log {
            Some(log) => format!("{} ({})", self.message, log),
            None => self.message.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    data: (String, String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestBlockhash {
    blockhash: String,
}

/// Settlement authority backed by a Solana JSON-RPC node and its PubSub
/// WebSocket endpoint.
pub struct RpcAuthority {
    http: reqwest::Client,
    rpc_url: String,
    ws_url: String,
    commitment: Commitment,
    next_id: AtomicU64,
}

impl RpcAuthority {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MoonbetsError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            rpc_url: config.rpc_url.clone(),
            ws_url: config.ws_url.clone(),
            commitment: config.commitment,
            next_id: AtomicU64::new(1),
        })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> std::result::Result<RpcResponse<T>, reqwest::Error> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        debug!(method, url = %self.rpc_url, "rpc request");
        self.http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<RpcResponse<T>>()
            .await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> std::result::Result<T, AuthorityError> {
        let response = self.post(method, params).await?;
        into_result(method, response)
    }

    async fn latest_blockhash(&self) -> std::result::Result<Hash, AuthorityError> {
        let latest: WithContext<LatestBlockhash> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment.as_str() }]),
            )
            .await?;

        let hash = latest
            .value
            .blockhash
            .parse::<Hash>()
            .map_err(|e| DecodeError::Blockhash(e.to_string()))?;
        Ok(hash)
    }
}

fn into_result<T>(
    method: &str,
    response: RpcResponse<T>,
) -> std::result::Result<T, AuthorityError> {
    if let Some(error) = response.error {
        return Err(AuthorityError::Rpc {
            code: error.code,
            message: error.describe(),
        });
    }
    response
        .result
        .ok_or_else(|| AuthorityError::transport(format!("{}: empty response", method)))
}

fn decode_account(
    player: &Pubkey,
    account: Option<AccountInfo>,
) -> std::result::Result<PlayerState, AuthorityError> {
    let account = account.ok_or(AuthorityError::AccountNotFound(*player))?;
    let (data, encoding) = account.data;
    if encoding != "base64" {
        return Err(DecodeError::Encoding(encoding).into());
    }
    Ok(decode_player_state(&decode_base64(&data)?)?)
}

/// Map a failed `sendTransaction` round trip onto the submission taxonomy.
/// A refused connection never reached the node; anything after the
/// request left leaves the wager's fate unknown.
fn classify_send_error(err: reqwest::Error) -> SubmissionError {
    if err.is_connect() {
        SubmissionError::not_dispatched(err.to_string())
    } else {
        SubmissionError::transport(err.to_string())
    }
}

#[async_trait]
impl SettlementAuthority for RpcAuthority {
    async fn submit(
        &self,
        instruction: &Instruction,
        signer: &dyn WagerSigner,
    ) -> std::result::Result<String, SubmissionError> {
        let blockhash = self
            .latest_blockhash()
            .await
            .map_err(|e| SubmissionError::not_dispatched(format!("recent blockhash: {}", e)))?;

        let message = compile_message(std::slice::from_ref(instruction), &signer.pubkey(), &blockhash);
        let transaction = sign_transaction(&message, signer)
            .map_err(|e| SubmissionError::not_dispatched(format!("signing: {}", e)))?;

        let params = json!([
            STANDARD.encode(&transaction),
            {
                "encoding": "base64",
                "preflightCommitment": self.commitment.as_str(),
            }
        ]);

        let response: RpcResponse<String> = self
            .post("sendTransaction", params)
            .await
            .map_err(classify_send_error)?;

        match response {
            RpcResponse {
                error: Some(error), ..
            } => {
                warn!(code = error.code, "transaction rejected: {}", error.describe());
                Err(SubmissionError::rejected(error.describe()))
            }
            RpcResponse {
                result: Some(signature),
                ..
            } => {
                info!(signature = %signature, "transaction sent");
                Ok(signature)
            }
            _ => Err(SubmissionError::transport("sendTransaction: empty response")),
        }
    }

    async fn fetch_player_state(
        &self,
        player: &Pubkey,
    ) -> std::result::Result<PlayerState, AuthorityError> {
        let info: WithContext<Option<AccountInfo>> = self
            .call(
                "getAccountInfo",
                json!([
                    player.to_string(),
                    { "encoding": "base64", "commitment": self.commitment.as_str() }
                ]),
            )
            .await?;

        decode_account(player, info.value)
    }

    async fn fetch_balance(&self, wallet: &Pubkey) -> std::result::Result<u64, AuthorityError> {
        let balance: WithContext<u64> = self
            .call(
                "getBalance",
                json!([wallet.to_string(), { "commitment": self.commitment.as_str() }]),
            )
            .await?;
        Ok(balance.value)
    }

    async fn subscribe(
        &self,
        player: &Pubkey,
    ) -> std::result::Result<EventSubscription, AuthorityError> {
        websocket::subscribe_logs(&self.ws_url, player, self.commitment, DEFAULT_CHANNEL_CAPACITY)
            .await
    }
}
