//! Binding to the external journal program.
//!
//! AccountSource: fetch-by-address and fetch-all-of-type reads.
//! InstructionSender: signs and submits one instruction (the wallet boundary).
//! JournalProgram: builds the three instructions and decodes JournalEntryState accounts on top
//! of any backend that provides both.

use std::fmt;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::Discriminator;
use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::{JournalError, Result},
    instructions::{self, EntryAccounts},
    state::{JournalAccount, JournalEntryState},
};

/// Transaction confirmation token returned for every successful mutation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TxSignature(String);

impl TxSignature {
    pub fn new(signature: impl Into<String>) -> Self {
        Self(signature.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account as stored by the cluster: raw data plus the fields needed to trust it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAccount {
    pub owner     : Pubkey,
    pub lamports  : u64,
    pub executable: bool,
    pub data      : Vec<u8>,
}

#[async_trait]
pub trait AccountSource: Send + Sync {
    /// `None` when nothing is stored at `address`.
    async fn account(&self, address: &Pubkey) -> Result<Option<RawAccount>>;

    /// Every account owned by `program_id` whose data starts with `discriminator`.
    async fn program_accounts(&self, program_id: &Pubkey, discriminator: &[u8]) -> Result<Vec<(Pubkey, RawAccount)>>;
}

#[async_trait]
pub trait InstructionSender: Send + Sync {
    /// Signs `instruction` as `signer`, submits it and waits for confirmation.
    async fn send(&self, instruction: Instruction, signer: &Pubkey) -> Result<TxSignature>;
}

/// The journal program on one cluster, reached through backend `B`.
#[derive(Debug)]
pub struct JournalProgram<B> {
    program_id: Pubkey,
    backend   : B,
}

impl<B> JournalProgram<B>
where
    B: AccountSource + InstructionSender,
{
    pub fn new(program_id: Pubkey, backend: B) -> Self {
        Self { program_id, backend }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Sends `create_entry(title, message)` for the entry at `address`.
    pub async fn create_entry(&self, owner: &Pubkey, address: &Pubkey, title: &str, message: &str) -> Result<TxSignature> {
        let ix = instructions::create_entry_ix(&self.program_id, EntryAccounts::new(*address, *owner), title, message);
        self.submit("create_entry", ix, owner).await
    }

    /// Sends `update_entry(title, message)` for the entry at `address`.
    pub async fn update_entry(&self, owner: &Pubkey, address: &Pubkey, title: &str, message: &str) -> Result<TxSignature> {
        let ix = instructions::update_entry_ix(&self.program_id, EntryAccounts::new(*address, *owner), title, message);
        self.submit("update_entry", ix, owner).await
    }

    /// Sends `delete_journal_entry(title)` for the entry at `address`.
    pub async fn delete_entry(&self, owner: &Pubkey, address: &Pubkey, title: &str) -> Result<TxSignature> {
        let ix = instructions::delete_entry_ix(&self.program_id, EntryAccounts::new(*address, *owner), title);
        self.submit("delete_journal_entry", ix, owner).await
    }

    async fn submit(&self, name: &str, ix: Instruction, signer: &Pubkey) -> Result<TxSignature> {
        debug!(instruction = name, %signer, data_len = ix.data.len(), "sending journal instruction");
        self.backend.send(ix, signer).await
    }

    /// Fetches one entry; `None` if the account does not exist or is not a journal entry.
    pub async fn fetch(&self, address: &Pubkey) -> Result<Option<JournalEntryState>> {
        match self.backend.account(address).await? {
            Some(raw) if raw.owner == self.program_id => decode_entry(address, &raw.data).map(Some),
            Some(_) | None => Ok(None),
        }
    }

    /// Fetches every journal entry stored by the program. Order is unspecified.
    pub async fn all(&self) -> Result<Vec<JournalAccount>> {
        let raw = self.backend.program_accounts(&self.program_id, JournalEntryState::DISCRIMINATOR).await?;
        debug!(count = raw.len(), "fetched journal accounts");
        raw.into_iter()
            .map(|(address, acc)| Ok(JournalAccount { entry: decode_entry(&address, &acc.data)?, address }))
            .collect()
    }

    /// The program account itself; `None` means it is not deployed on this cluster.
    pub async fn program_account(&self) -> Result<Option<RawAccount>> {
        self.backend.account(&self.program_id).await
    }
}

fn decode_entry(address: &Pubkey, data: &[u8]) -> Result<JournalEntryState> {
    JournalEntryState::try_deserialize(&mut &data[..]).map_err(|e| JournalError::Decode {
        address: *address,
        reason : e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Backend with canned accounts that records sent instructions.
    #[derive(Default)]
    struct Canned {
        accounts: Vec<(Pubkey, RawAccount)>,
        sent    : Mutex<Vec<(Instruction, Pubkey)>>,
    }

    #[async_trait]
    impl AccountSource for Canned {
        async fn account(&self, address: &Pubkey) -> Result<Option<RawAccount>> {
            Ok(self.accounts.iter().find(|(k, _)| k == address).map(|(_, a)| a.clone()))
        }

        async fn program_accounts(&self, program_id: &Pubkey, disc: &[u8]) -> Result<Vec<(Pubkey, RawAccount)>> {
            Ok(self.accounts.iter()
                .filter(|(_, a)| a.owner == *program_id && a.data.starts_with(disc))
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl InstructionSender for Canned {
        async fn send(&self, instruction: Instruction, signer: &Pubkey) -> Result<TxSignature> {
            self.sent.lock().unwrap().push((instruction, *signer));
            Ok(TxSignature::new("sig"))
        }
    }

    fn entry_account(owner: Pubkey, title: &str) -> RawAccount {
        let mut data = Vec::new();
        JournalEntryState { owner, title: title.into(), message: "m".into() }
            .try_serialize(&mut data)
            .unwrap();
        RawAccount { owner: crate::ID, lamports: 1, executable: false, data }
    }

    #[tokio::test]
    async fn fetch_distinguishes_missing_foreign_and_corrupt() {
        let (good, foreign, corrupt, missing) =
            (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let owner = Pubkey::new_unique();
        let mut foreign_acc = entry_account(owner, "x");
        foreign_acc.owner = Pubkey::new_unique();
        let backend = Canned {
            accounts: vec![
                (good, entry_account(owner, "t")),
                (foreign, foreign_acc),
                (corrupt, RawAccount { owner: crate::ID, lamports: 1, executable: false, data: vec![9; 4] }),
            ],
            ..Default::default()
        };
        let program = JournalProgram::new(crate::ID, backend);

        assert_eq!(program.fetch(&good).await.unwrap().unwrap().title, "t");
        assert_eq!(program.fetch(&missing).await.unwrap(), None);
        assert_eq!(program.fetch(&foreign).await.unwrap(), None);
        assert!(matches!(program.fetch(&corrupt).await, Err(JournalError::Decode { .. })));
    }

    #[tokio::test]
    async fn all_decodes_only_journal_accounts() {
        let owner = Pubkey::new_unique();
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let backend = Canned {
            accounts: vec![
                (a, entry_account(owner, "a")),
                (b, entry_account(owner, "b")),
                (Pubkey::new_unique(), RawAccount { owner: crate::ID, lamports: 1, executable: false, data: vec![0; 16] }),
            ],
            ..Default::default()
        };
        let program = JournalProgram::new(crate::ID, backend);
        let mut titles: Vec<_> = program.all().await.unwrap().into_iter().map(|acc| acc.entry.title).collect();
        titles.sort();
        assert_eq!(titles, ["a", "b"]);
    }

    #[tokio::test]
    async fn mutations_go_through_the_sender() {
        let program = JournalProgram::new(crate::ID, Canned::default());
        let (owner, address) = (Pubkey::new_unique(), Pubkey::new_unique());

        program.create_entry(&owner, &address, "t", "m").await.unwrap();
        program.delete_entry(&owner, &address, "t").await.unwrap();

        let sent = program.backend().sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, owner);
        assert_eq!(sent[0].0.accounts[0].pubkey, address);
        assert_eq!(&sent[1].0.data[..8], crate::instructions::DeleteJournalEntry::DISCRIMINATOR);
    }
}
