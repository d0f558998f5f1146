//! JSON-RPC backend.
//!
//! Reads go straight to the cluster:
//!   getAccountInfo(address, base64)            -> fetch-by-address
//!   getProgramAccounts(program, memcmp@0=disc) -> fetch-all-of-type
//! Writes are handed to the wallet, which owns the keys and submits the transaction.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    config::Commitment,
    error::{JournalError, Result},
    network::Cluster,
    program::{AccountSource, InstructionSender, RawAccount, TxSignature},
};

/// Wallet stand-in for read-only use; every send is refused.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadOnlyWallet;

#[async_trait]
impl InstructionSender for ReadOnlyWallet {
    async fn send(&self, _instruction: Instruction, _signer: &Pubkey) -> Result<TxSignature> {
        Err(JournalError::WalletDisconnected)
    }
}

#[derive(Debug)]
pub struct RpcBackend<W = ReadOnlyWallet> {
    http      : reqwest::Client,
    endpoint  : String,
    commitment: Commitment,
    wallet    : W,
    next_id   : AtomicU64,
}

impl RpcBackend<ReadOnlyWallet> {
    pub fn read_only(cluster: &Cluster) -> Self {
        Self::new(cluster, ReadOnlyWallet)
    }
}

impl<W> RpcBackend<W> {
    pub fn new(cluster: &Cluster, wallet: W) -> Self {
        Self {
            http      : reqwest::Client::new(),
            endpoint  : cluster.endpoint.clone(),
            commitment: cluster.commitment,
            wallet,
            next_id   : AtomicU64::new(1),
        }
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        debug!(method, id, endpoint = %self.endpoint, "rpc request");
        let response: RpcResponse<T> = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.into_result()
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error : Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code   : i64,
    message: String,
}

impl<T> RpcResponse<T> {
    fn into_result(self) -> Result<T> {
        match (self.result, self.error) {
            (_, Some(e))       => Err(JournalError::Rpc { code: e.code, message: e.message }),
            (Some(result), _)  => Ok(result),
            (None, None)       => Err(JournalError::Rpc { code: 0, message: "response carried no result".into() }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

/// Account as encoded by the RPC with `encoding: base64`.
#[derive(Debug, Deserialize)]
struct UiAccount {
    lamports  : u64,
    owner     : String,
    executable: bool,
    data      : (String, String),
}

impl UiAccount {
    fn decode(self, address: &Pubkey) -> Result<RawAccount> {
        let (payload, encoding) = self.data;
        if encoding != "base64" {
            return Err(JournalError::Decode { address: *address, reason: format!("unexpected encoding `{encoding}`") });
        }
        let data = STANDARD.decode(payload).map_err(|e| JournalError::Decode {
            address: *address,
            reason : e.to_string(),
        })?;
        Ok(RawAccount {
            owner     : parse_pubkey(&self.owner)?,
            lamports  : self.lamports,
            executable: self.executable,
            data,
        })
    }
}

#[derive(Debug, Deserialize)]
struct KeyedUiAccount {
    pubkey : String,
    account: UiAccount,
}

fn parse_pubkey(s: &str) -> Result<Pubkey> {
    Pubkey::from_str(s).map_err(|e| JournalError::Rpc { code: 0, message: format!("invalid pubkey `{s}` in response: {e}") })
}

fn account_info_params(address: &Pubkey, commitment: Commitment) -> Value {
    json!([address.to_string(), { "encoding": "base64", "commitment": commitment.as_str() }])
}

fn program_accounts_params(program_id: &Pubkey, discriminator: &[u8], commitment: Commitment) -> Value {
    json!([
        program_id.to_string(),
        {
            "encoding": "base64",
            "commitment": commitment.as_str(),
            "filters": [{ "memcmp": { "offset": 0, "bytes": STANDARD.encode(discriminator), "encoding": "base64" } }],
        }
    ])
}

#[async_trait]
impl<W: InstructionSender> AccountSource for RpcBackend<W> {
    async fn account(&self, address: &Pubkey) -> Result<Option<RawAccount>> {
        let info: WithContext<Option<UiAccount>> =
            self.call("getAccountInfo", account_info_params(address, self.commitment)).await?;
        info.value.map(|acc| acc.decode(address)).transpose()
    }

    async fn program_accounts(&self, program_id: &Pubkey, discriminator: &[u8]) -> Result<Vec<(Pubkey, RawAccount)>> {
        let keyed: Vec<KeyedUiAccount> = self
            .call("getProgramAccounts", program_accounts_params(program_id, discriminator, self.commitment))
            .await?;
        keyed
            .into_iter()
            .map(|k| {
                let address = parse_pubkey(&k.pubkey)?;
                Ok((address, k.account.decode(&address)?))
            })
            .collect()
    }
}

#[async_trait]
impl<W: InstructionSender> InstructionSender for RpcBackend<W> {
    async fn send(&self, instruction: Instruction, signer: &Pubkey) -> Result<TxSignature> {
        self.wallet.send(instruction, signer).await
    }
}
