//! In-memory ledger running the journal program's rules.
//!
//! Decodes the same instruction bytes the builders produce and applies them to an account map:
//! create_entry: seeds check, non-empty title, address must be free, max_len limits.
//! update_entry: seeds check, account must exist and be owned by the signer.
//! delete_journal_entry: same checks as update, then the account is closed.
//! Each instruction is atomic: it either applies fully or leaves the map untouched.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex,
};

use anchor_lang::prelude::*;
use anchor_lang::solana_program::{hash::hashv, instruction::Instruction};
use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::{JournalError, Result},
    instructions::JournalInstruction,
    program::{AccountSource, InstructionSender, RawAccount, TxSignature},
    query::lock,
    state::{JournalEntryState, ENTRY_ACCOUNT_SPACE, MAX_MESSAGE_LEN},
};

/// Loader that owns deployed programs.
const LOADER_ID: Pubkey = Pubkey::new_from_array([
      2, 168, 246, 145,  78, 136, 161, 176, 226,  16,  21,  62, 247,  99, 174,  43,
      0, 194, 185,  61,  22, 193,  36, 210, 192,  83, 122,  16,   4, 128,   0,   0,
]);

#[derive(Debug)]
pub struct LocalLedger {
    program_id: Pubkey,
    accounts  : Mutex<HashMap<Pubkey, RawAccount>>,
    tx_count  : AtomicU64,
}

impl LocalLedger {
    /// Ledger with the journal program deployed at `program_id`.
    pub fn new(program_id: Pubkey) -> Self {
        let ledger = Self::undeployed(program_id);
        lock(&ledger.accounts).insert(program_id, RawAccount {
            owner     : LOADER_ID,
            lamports  : 1,
            executable: true,
            data      : Vec::new(),
        });
        ledger
    }

    /// Ledger where nothing lives at `program_id` (wrong cluster, or never deployed).
    pub fn undeployed(program_id: Pubkey) -> Self {
        Self {
            program_id,
            accounts: Mutex::new(HashMap::new()),
            tx_count: AtomicU64::new(0),
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Number of journal entry accounts currently open.
    pub fn entry_count(&self) -> usize {
        lock(&self.accounts).values().filter(|a| a.owner == self.program_id && !a.executable).count()
    }

    fn process(&self, ix: &Instruction, signer: &Pubkey) -> Result<()> {
        if ix.program_id != self.program_id {
            return Err(JournalError::Rejected(format!("unknown program {}", ix.program_id)));
        }
        let decoded = JournalInstruction::decode(&ix.data)
            .ok_or_else(|| JournalError::Rejected("instruction did not deserialize".into()))?;
        let [entry_meta, owner_meta, system_meta] = ix.accounts.as_slice() else {
            return Err(JournalError::Rejected("not enough account keys given to the instruction".into()));
        };
        let (address, owner) = (entry_meta.pubkey, owner_meta.pubkey);

        if !owner_meta.is_signer || owner != *signer {
            return Err(JournalError::Unauthorized { address, signer: *signer });
        }
        if system_meta.pubkey != anchor_lang::system_program::ID {
            return Err(JournalError::Rejected("system_program: invalid program id".into()));
        }
        if decoded.title().is_empty() {
            return Err(JournalError::validation("title", "must not be empty"));
        }
        // ConstraintSeeds: a signer that is not the owner derives a different address.
        let (expected, _bump) = Pubkey::try_find_program_address(&[decoded.title().as_bytes(), owner.as_ref()], &self.program_id)
            .ok_or_else(|| JournalError::Rejected("seeds constraint could not be evaluated".into()))?;
        if expected != address {
            return Err(JournalError::Unauthorized { address, signer: *signer });
        }

        debug!("Instruction: {}", decoded.name());
        let mut accounts = lock(&self.accounts);
        match decoded {
            JournalInstruction::CreateEntry(args) => {
                if accounts.contains_key(&address) {
                    return Err(JournalError::AlreadyExists(address));
                }
                check_message_len(&args.message)?;
                let state = JournalEntryState { owner, title: args.title, message: args.message };
                let account = RawAccount {
                    owner     : self.program_id,
                    lamports  : Rent::default().minimum_balance(ENTRY_ACCOUNT_SPACE),
                    executable: false,
                    data      : encode(&state)?,
                };
                debug!("Journal Entry Created: {}", state.title);
                accounts.insert(address, account);
            }
            JournalInstruction::UpdateEntry(args) => {
                let account = accounts.get_mut(&address).ok_or(JournalError::NotFound(address))?;
                let mut state = stored_entry(&address, account)?;
                if state.owner != owner {
                    return Err(JournalError::Unauthorized { address, signer: *signer });
                }
                check_message_len(&args.message)?;
                state.message = args.message;
                account.data  = encode(&state)?;
                debug!("Journal Entry Updated: {}", state.title);
            }
            JournalInstruction::DeleteJournalEntry(args) => {
                let account = accounts.get(&address).ok_or(JournalError::NotFound(address))?;
                if stored_entry(&address, account)?.owner != owner {
                    return Err(JournalError::Unauthorized { address, signer: *signer });
                }
                accounts.remove(&address);
                debug!("Journal Entry Deleted: {}", args.title);
            }
        }
        Ok(())
    }

    fn signature(&self, ix: &Instruction) -> TxSignature {
        let n = self.tx_count.fetch_add(1, Ordering::Relaxed);
        let head = hashv(&[&n.to_le_bytes(), &ix.data]).to_bytes();
        let tail = hashv(&[&head, ix.program_id.as_ref()]).to_bytes();
        TxSignature::new(hex::encode([head, tail].concat()))
    }
}

/// Titles need no check here: the 32-byte seed cap is below `MAX_TITLE_LEN`.
fn check_message_len(message: &str) -> Result<()> {
    if message.len() > MAX_MESSAGE_LEN {
        return Err(JournalError::Rejected(format!("message longer than {MAX_MESSAGE_LEN} bytes")));
    }
    Ok(())
}

/// Serializes `state` into a zero-padded buffer of the allocated account size.
fn encode(state: &JournalEntryState) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(ENTRY_ACCOUNT_SPACE);
    state
        .try_serialize(&mut data)
        .map_err(|e| JournalError::Rejected(format!("account did not serialize: {e}")))?;
    if data.len() > ENTRY_ACCOUNT_SPACE {
        return Err(JournalError::Rejected("account data exceeds allocated space".into()));
    }
    data.resize(ENTRY_ACCOUNT_SPACE, 0);
    Ok(data)
}

fn stored_entry(address: &Pubkey, account: &RawAccount) -> Result<JournalEntryState> {
    JournalEntryState::try_deserialize(&mut &account.data[..]).map_err(|e| JournalError::Decode {
        address: *address,
        reason : e.to_string(),
    })
}

#[async_trait]
impl AccountSource for LocalLedger {
    async fn account(&self, address: &Pubkey) -> Result<Option<RawAccount>> {
        Ok(lock(&self.accounts).get(address).cloned())
    }

    async fn program_accounts(&self, program_id: &Pubkey, discriminator: &[u8]) -> Result<Vec<(Pubkey, RawAccount)>> {
        Ok(lock(&self.accounts)
            .iter()
            .filter(|(_, a)| a.owner == *program_id && a.data.starts_with(discriminator))
            .map(|(k, a)| (*k, a.clone()))
            .collect())
    }
}

#[async_trait]
impl InstructionSender for LocalLedger {
    async fn send(&self, instruction: Instruction, signer: &Pubkey) -> Result<TxSignature> {
        self.process(&instruction, signer)?;
        Ok(self.signature(&instruction))
    }
}
