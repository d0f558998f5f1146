//! Client configuration loaded from TOML.
//!
//! ```toml
//! network    = "devnet"
//! rpc_url    = "https://api.devnet.solana.com"   # optional
//! program_id = "HkVC...d1p"                      # optional override
//! commitment = "confirmed"
//! ```

use std::{fmt, path::Path, str::FromStr};

use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    error::{JournalError, Result},
    network::{Cluster, Network},
};

/// RPC commitment level used for reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub network   : Network,
    pub rpc_url   : Option<String>,
    pub program_id: Option<String>,
    pub commitment: Commitment,
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Reads and parses a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Resolves overrides against the network defaults.
    pub fn into_cluster(self) -> Result<Cluster> {
        let mut cluster = Cluster::new(self.network);
        cluster.commitment = self.commitment;

        if let Some(rpc_url) = self.rpc_url {
            let parsed = Url::parse(&rpc_url)
                .map_err(|e| JournalError::Config(format!("invalid rpc_url `{rpc_url}`: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(JournalError::Config(format!("rpc_url `{rpc_url}` must be http(s)")));
            }
            cluster = cluster.with_endpoint(rpc_url);
        }
        if let Some(program_id) = self.program_id {
            let key = Pubkey::from_str(&program_id)
                .map_err(|e| JournalError::Config(format!("invalid program_id `{program_id}`: {e}")))?;
            cluster = cluster.with_program_id(key);
        }
        Ok(cluster)
    }
}
