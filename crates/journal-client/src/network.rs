//! Network selection passed explicitly to every component.
//!
//! Network -> (program id, default RPC endpoint). Cluster bundles the resolved values plus the
//! explorer link conventions used when reporting confirmed transactions.

use std::{fmt, str::FromStr};

use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::{config::Commitment, error::JournalError, program::TxSignature};

/// Program id deployed on devnet and testnet.
pub const DEVNET_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    248, 222, 218,   6,  38, 248, 140, 211, 183, 112,  15, 234, 119,  91,  18, 208,
    174, 200,  99, 110, 129,  94, 236, 212,  77, 169, 168, 118, 230,  44, 230,  15,
]);

const EXPLORER_BASE: &str = "https://explorer.solana.com";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    #[serde(rename = "mainnet-beta")]
    MainnetBeta,
    #[serde(rename = "testnet")]
    Testnet,
    #[default]
    #[serde(rename = "devnet")]
    Devnet,
    #[serde(rename = "localnet")]
    Localnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::MainnetBeta => "mainnet-beta",
            Network::Testnet     => "testnet",
            Network::Devnet      => "devnet",
            Network::Localnet    => "localnet",
        }
    }

    /// Program id of the journal program on this network.
    pub fn program_id(&self) -> Pubkey {
        match self {
            Network::Devnet | Network::Testnet => DEVNET_PROGRAM_ID,
            Network::MainnetBeta | Network::Localnet => crate::ID,
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Network::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Network::Testnet     => "https://api.testnet.solana.com",
            Network::Devnet      => "https://api.devnet.solana.com",
            Network::Localnet    => "http://localhost:8899",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet-beta" | "mainnet" => Ok(Network::MainnetBeta),
            "testnet"                  => Ok(Network::Testnet),
            "devnet"                   => Ok(Network::Devnet),
            "localnet" | "local"       => Ok(Network::Localnet),
            other => Err(JournalError::Config(format!("unknown network `{other}`"))),
        }
    }
}

/// Resolved cluster: which network, where to reach it, and which program to address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cluster {
    pub network   : Network,
    pub endpoint  : String,
    pub program_id: Pubkey,
    pub commitment: Commitment,
}

impl Cluster {
    /// Cluster with the network's default endpoint and program id.
    pub fn new(network: Network) -> Self {
        Self {
            network,
            endpoint  : network.default_endpoint().to_string(),
            program_id: network.program_id(),
            commitment: Commitment::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = program_id;
        self
    }

    /// Explorer link for `path` (e.g. `tx/<sig>`, `account/<pk>`) on this cluster.
    pub fn explorer_url(&self, path: &str) -> String {
        let suffix = match self.network {
            Network::MainnetBeta => String::new(),
            Network::Testnet | Network::Devnet => format!("?cluster={}", self.network),
            Network::Localnet => {
                let encoded: String = form_urlencoded::byte_serialize(self.endpoint.as_bytes()).collect();
                format!("?cluster=custom&customUrl={encoded}")
            }
        };
        format!("{EXPLORER_BASE}/{path}{suffix}")
    }

    pub fn tx_url(&self, signature: &TxSignature) -> String {
        self.explorer_url(&format!("tx/{signature}"))
    }

    pub fn account_url(&self, address: &Pubkey) -> String {
        self.explorer_url(&format!("account/{address}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devnet_constant_matches_published_id() {
        assert_eq!(DEVNET_PROGRAM_ID.to_string(), "HkVCcQQU9EshkHGqewWsayEWVQ2pvUr3mENjKeJj3d1p");
    }

    #[test]
    fn program_id_per_network() {
        assert_eq!(Network::Devnet.program_id(), DEVNET_PROGRAM_ID);
        assert_eq!(Network::Testnet.program_id(), DEVNET_PROGRAM_ID);
        assert_eq!(Network::MainnetBeta.program_id(), crate::ID);
        assert_eq!(Network::Localnet.program_id(), crate::ID);
    }

    #[test]
    fn parses_network_names() {
        for network in [Network::MainnetBeta, Network::Testnet, Network::Devnet, Network::Localnet] {
            assert_eq!(network.as_str().parse::<Network>().unwrap(), network);
        }
        assert!("moon".parse::<Network>().is_err());
    }

    #[test]
    fn explorer_urls_follow_cluster() {
        let addr = Pubkey::new_unique();
        assert_eq!(
            Cluster::new(Network::MainnetBeta).account_url(&addr),
            format!("https://explorer.solana.com/account/{addr}")
        );
        assert_eq!(
            Cluster::new(Network::Devnet).tx_url(&TxSignature::new("abc")),
            "https://explorer.solana.com/tx/abc?cluster=devnet"
        );
        assert_eq!(
            Cluster::new(Network::Localnet).explorer_url("tx/abc"),
            "https://explorer.solana.com/tx/abc?cluster=custom&customUrl=http%3A%2F%2Flocalhost%3A8899"
        );
    }
}
