//! # Module overview
//! Client for the on-chain journal program: titled text entries owned by a wallet.
//! 1. Record Locator: (title, owner) -> PDA under the program id (locator)
//! 2. Entry Synchronizer: create/update/delete with refetch-on-success caches (sync)
//!
//! # Instruction set (external program)
//! create_entry(title, message): opens the PDA, fails if the address is already in use.
//! update_entry(title, message): replaces the message, owner-only.
//! delete_journal_entry(title): closes the PDA back to the owner, owner-only.
//!
//! # Backends
//! rpc::RpcBackend: JSON-RPC reads + an external wallet for signing.
//! ledger::LocalLedger: in-memory validator running the same rules, used by tests and demos.

#![allow(unexpected_cfgs)] // Keep until Anchor's cfg layout is simplified

use anchor_lang::prelude::*;

pub mod config;
pub mod error;
pub mod instructions;
pub mod ledger;
pub mod locator;
pub mod network;
pub mod program;
pub mod query;
pub mod rpc;
pub mod state;
pub mod sync;

// Program ID (IDL address)
declare_id!("HkVCcQQU9EshkHGqewWsayEWVQ2pvUr3mENjKeJj3d1p");

// Re-exports
pub use config   ::{ ClientConfig, Commitment };
pub use error    ::{ JournalError, Result };
pub use ledger   ::LocalLedger;
pub use locator  ::{ derive_entry_address, EntryAddress };
pub use network  ::{ Cluster, Network, DEVNET_PROGRAM_ID };
pub use program  ::{ AccountSource, InstructionSender, JournalProgram, RawAccount, TxSignature };
pub use query    ::{ MutationKey, MutationStatus, QueryState };
pub use rpc      ::{ ReadOnlyWallet, RpcBackend };
pub use state    ::{ JournalAccount, JournalEntryState };
pub use sync     ::EntrySynchronizer;
