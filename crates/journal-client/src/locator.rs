//! Record Locator: deterministic PDA for a journal entry.
//!
//! seeds = [title bytes, owner bytes], namespaced by the program id. Every create, update and
//! delete recomputes it; the title is part of the input, so a derived address is never reused
//! across titles.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::pubkey::MAX_SEED_LEN;

use crate::error::{JournalError, Result};

/// Derived entry address and its canonical bump.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryAddress {
    pub address: Pubkey,
    pub bump   : u8,
}

/// Derives the entry PDA for (title, owner) under `program_id`.
pub fn derive_entry_address(program_id: &Pubkey, owner: &Pubkey, title: &str) -> Result<EntryAddress> {
    validate_title(title)?;
    let (address, bump) = Pubkey::try_find_program_address(&[title.as_bytes(), owner.as_ref()], program_id)
        .ok_or_else(|| JournalError::validation("title", "no valid program address for this title"))?;
    Ok(EntryAddress { address, bump })
}

/// Rejects titles the program cannot accept or that cannot be used as a PDA seed.
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(JournalError::validation("title", "must not be empty"));
    }
    // A single PDA seed is capped at 32 bytes.
    if title.len() > MAX_SEED_LEN {
        return Err(JournalError::validation(
            "title",
            format!("{} bytes exceeds the {MAX_SEED_LEN}-byte seed limit", title.len()),
        ));
    }
    Ok(())
}

/// Rejects empty messages; length limits are left to the program.
pub fn validate_message(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        return Err(JournalError::validation("message", "must not be empty"));
    }
    Ok(())
}
