//! Instruction encoding for the journal program.
//!
//! data = discriminator(8) || borsh(args), discriminator = sha256("global:<ix_name>")[..8].
//! All three instructions share one account list: journal_entry (w), owner (w, signer),
//! system_program.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_lang::{Discriminator, InstructionData, ToAccountMetas};

/// Args of `create_entry`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateEntry {
    pub title  : String,
    pub message: String,
}

impl Discriminator for CreateEntry {
    const DISCRIMINATOR: &'static [u8] = &[248, 207, 142, 242, 66, 162, 150, 16];
}
impl InstructionData for CreateEntry {}

/// Args of `update_entry`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct UpdateEntry {
    pub title  : String,
    pub message: String,
}

impl Discriminator for UpdateEntry {
    const DISCRIMINATOR: &'static [u8] = &[70, 47, 181, 2, 1, 40, 2, 92];
}
impl InstructionData for UpdateEntry {}

/// Args of `delete_journal_entry`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeleteJournalEntry {
    pub title: String,
}

impl Discriminator for DeleteJournalEntry {
    const DISCRIMINATOR: &'static [u8] = &[156, 50, 93, 5, 157, 97, 188, 114];
}
impl InstructionData for DeleteJournalEntry {}

/// Accounts shared by every journal instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryAccounts {
    pub journal_entry : Pubkey,
    pub owner         : Pubkey,
    pub system_program: Pubkey,
}

impl EntryAccounts {
    pub fn new(journal_entry: Pubkey, owner: Pubkey) -> Self {
        Self { journal_entry, owner, system_program: anchor_lang::system_program::ID }
    }
}

impl ToAccountMetas for EntryAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.journal_entry, false),
            AccountMeta::new(self.owner, true),
            AccountMeta::new_readonly(self.system_program, false),
        ]
    }
}

fn build<D: InstructionData>(program_id: &Pubkey, accounts: EntryAccounts, args: D) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts  : accounts.to_account_metas(None),
        data      : args.data(),
    }
}

pub fn create_entry_ix(program_id: &Pubkey, accounts: EntryAccounts, title: &str, message: &str) -> Instruction {
    build(program_id, accounts, CreateEntry { title: title.to_string(), message: message.to_string() })
}

pub fn update_entry_ix(program_id: &Pubkey, accounts: EntryAccounts, title: &str, message: &str) -> Instruction {
    build(program_id, accounts, UpdateEntry { title: title.to_string(), message: message.to_string() })
}

pub fn delete_entry_ix(program_id: &Pubkey, accounts: EntryAccounts, title: &str) -> Instruction {
    build(program_id, accounts, DeleteJournalEntry { title: title.to_string() })
}

/// Decoded journal instruction, as seen by the program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalInstruction {
    CreateEntry(CreateEntry),
    UpdateEntry(UpdateEntry),
    DeleteJournalEntry(DeleteJournalEntry),
}

impl JournalInstruction {
    /// Splits off the discriminator and decodes the args; `None` for unknown or malformed data.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }
        let (disc, mut args) = data.split_at(8);
        let ix = if disc == CreateEntry::DISCRIMINATOR {
            Self::CreateEntry(AnchorDeserialize::deserialize(&mut args).ok()?)
        } else if disc == UpdateEntry::DISCRIMINATOR {
            Self::UpdateEntry(AnchorDeserialize::deserialize(&mut args).ok()?)
        } else if disc == DeleteJournalEntry::DISCRIMINATOR {
            Self::DeleteJournalEntry(AnchorDeserialize::deserialize(&mut args).ok()?)
        } else {
            return None;
        };
        // Trailing bytes mean the args did not match the layout.
        args.is_empty().then_some(ix)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateEntry(_)        => "create_entry",
            Self::UpdateEntry(_)        => "update_entry",
            Self::DeleteJournalEntry(_) => "delete_journal_entry",
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::CreateEntry(a)        => &a.title,
            Self::UpdateEntry(a)        => &a.title,
            Self::DeleteJournalEntry(a) => &a.title,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_lang::solana_program::hash::hash;

    fn sighash(name: &str) -> Vec<u8> {
        hash(format!("global:{name}").as_bytes()).to_bytes()[..8].to_vec()
    }

    #[test]
    fn discriminators_match_global_namespace() {
        assert_eq!(CreateEntry::DISCRIMINATOR, sighash("create_entry").as_slice());
        assert_eq!(UpdateEntry::DISCRIMINATOR, sighash("update_entry").as_slice());
        assert_eq!(DeleteJournalEntry::DISCRIMINATOR, sighash("delete_journal_entry").as_slice());
    }

    #[test]
    fn create_layout_is_disc_then_borsh_strings() {
        let (entry, owner) = (Pubkey::new_unique(), Pubkey::new_unique());
        let ix = create_entry_ix(&crate::ID, EntryAccounts::new(entry, owner), "ab", "xyz");

        assert_eq!(ix.program_id, crate::ID);
        let mut expected = sighash("create_entry");
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(b"ab");
        expected.extend_from_slice(&3u32.to_le_bytes());
        expected.extend_from_slice(b"xyz");
        assert_eq!(ix.data, expected);
    }

    #[test]
    fn account_metas_order_and_flags() {
        let (entry, owner) = (Pubkey::new_unique(), Pubkey::new_unique());
        let ix = delete_entry_ix(&crate::ID, EntryAccounts::new(entry, owner), "t");
        assert_eq!(ix.accounts, vec![
            AccountMeta::new(entry, false),
            AccountMeta::new(owner, true),
            AccountMeta::new_readonly(anchor_lang::system_program::ID, false),
        ]);
    }

    #[test]
    fn decode_recovers_args() {
        let accounts = EntryAccounts::new(Pubkey::new_unique(), Pubkey::new_unique());
        let ix = update_entry_ix(&crate::ID, accounts, "title", "new message");
        let decoded = JournalInstruction::decode(&ix.data).unwrap();
        assert_eq!(decoded, JournalInstruction::UpdateEntry(UpdateEntry {
            title  : "title".into(),
            message: "new message".into(),
        }));
        assert_eq!(decoded.name(), "update_entry");
        assert_eq!(decoded.title(), "title");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(JournalInstruction::decode(&[1, 2, 3]), None);
        assert_eq!(JournalInstruction::decode(&[0u8; 16]), None);

        let mut data = delete_entry_ix(&crate::ID, EntryAccounts::new(Pubkey::new_unique(), Pubkey::new_unique()), "t").data;
        data.push(0);
        assert_eq!(JournalInstruction::decode(&data), None);
    }
}
