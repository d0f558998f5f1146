//! On-chain account layout of the journal program.
//!
//! JournalEntryState: one entry per (title, owner) PDA. Title and owner are fixed at creation,
//! only the message is mutable. Space is allocated once for the max lengths below.

use anchor_lang::prelude::*;

// Size constants
pub const MAX_TITLE_LEN: usize = 50;
pub const MAX_MESSAGE_LEN: usize = 1_000;
pub const DISC_SIZE: usize = 8;
pub const ENTRY_ACCOUNT_SPACE: usize = DISC_SIZE + JournalEntryState::INIT_SPACE; // = 1,098

#[account]
#[derive(InitSpace, Debug, PartialEq, Eq)]
pub struct JournalEntryState {
    pub owner  : Pubkey,
    #[max_len(50)]
    pub title  : String,
    #[max_len(1000)]
    pub message: String,
}

/// One record of a fetch-all query: the account address plus its decoded state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JournalAccount {
    pub address: Pubkey,
    pub entry  : JournalEntryState,
}
