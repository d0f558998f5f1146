//! Entry Synchronizer: mutations against the journal program plus the read caches a UI renders.
//!
//! Flow per mutation: validate -> derive address -> gate on MutationKey -> remote call.
//! On success the record query for that address is invalidated and "all entries" is refetched.
//! On failure the error goes back to the caller and the caches are left exactly as they were.
//! Nothing is retried. Cache mutexes are never held across an await.

use std::{collections::HashMap, sync::Mutex};

use anchor_lang::prelude::Pubkey;
use tracing::{debug, info, warn};

use crate::{
    error::Result,
    locator::{self, derive_entry_address, validate_message},
    network::Cluster,
    program::{AccountSource, InstructionSender, JournalProgram, TxSignature},
    query::{lock, MutationKey, MutationStatus, MutationTracker, QueryState, Slot},
    state::{JournalAccount, JournalEntryState},
};

pub struct EntrySynchronizer<B> {
    cluster  : Cluster,
    program  : JournalProgram<B>,
    entries  : Mutex<Slot<Vec<JournalAccount>>>,
    records  : Mutex<HashMap<Pubkey, Slot<Option<JournalEntryState>>>>,
    mutations: MutationTracker,
}

impl<B> EntrySynchronizer<B>
where
    B: AccountSource + InstructionSender,
{
    pub fn new(cluster: Cluster, backend: B) -> Self {
        Self {
            program  : JournalProgram::new(cluster.program_id, backend),
            cluster,
            entries  : Mutex::new(Slot::default()),
            records  : Mutex::new(HashMap::new()),
            mutations: MutationTracker::default(),
        }
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn program(&self) -> &JournalProgram<B> {
        &self.program
    }

    /// Derived address of `owner`'s entry titled `title` on this cluster.
    pub fn entry_address(&self, owner: &Pubkey, title: &str) -> Result<Pubkey> {
        Ok(derive_entry_address(self.program.program_id(), owner, title)?.address)
    }

    /// Creates `owner`'s entry titled `title`. Fails if it already exists.
    pub async fn create(&self, owner: &Pubkey, title: &str, message: &str) -> Result<TxSignature> {
        validate_message(message)?;
        let address = self.entry_address(owner, title)?;

        let in_flight = self.mutations.begin(MutationKey::Create)?;
        let outcome = self.program.create_entry(owner, &address, title, message).await;
        in_flight.finish(&outcome);
        let signature = outcome?;

        info!(%address, %signature, url = %self.cluster.tx_url(&signature), "journal entry created");
        self.after_mutation(&address).await;
        Ok(signature)
    }

    /// Replaces the message of `owner`'s entry titled `title`.
    pub async fn update(&self, owner: &Pubkey, title: &str, message: &str) -> Result<TxSignature> {
        validate_message(message)?;
        let address = self.entry_address(owner, title)?;

        let in_flight = self.mutations.begin(MutationKey::Update(address))?;
        let outcome = self.program.update_entry(owner, &address, title, message).await;
        in_flight.finish(&outcome);
        let signature = outcome?;

        info!(%address, %signature, url = %self.cluster.tx_url(&signature), "journal entry updated");
        self.after_mutation(&address).await;
        Ok(signature)
    }

    /// Closes the entry at the already-known `address`; `title` is passed through unchanged.
    pub async fn delete(&self, owner: &Pubkey, address: &Pubkey, title: &str) -> Result<TxSignature> {
        locator::validate_title(title)?;

        let in_flight = self.mutations.begin(MutationKey::Delete(*address))?;
        let outcome = self.program.delete_entry(owner, address, title).await;
        in_flight.finish(&outcome);
        let signature = outcome?;

        info!(%address, %signature, url = %self.cluster.tx_url(&signature), "journal entry deleted");
        self.forget_entry(address);
        self.after_mutation(address).await;
        Ok(signature)
    }

    async fn after_mutation(&self, address: &Pubkey) {
        self.invalidate_entry(address);
        lock(&self.entries).invalidate();
        if let Err(e) = self.refetch_all().await {
            warn!(error = %e, "refetch after mutation failed");
        }
    }

    /// All entries, from cache when ready. Order is unspecified.
    pub async fn list_all(&self) -> Result<Vec<JournalAccount>> {
        if let QueryState::Ready(entries) = lock(&self.entries).state() {
            return Ok(entries);
        }
        self.refetch_all().await
    }

    /// Fetches all entries from the program and stores the outcome, success or failure.
    pub async fn refetch_all(&self) -> Result<Vec<JournalAccount>> {
        let generation = lock(&self.entries).generation();
        let outcome = self.program.all().await;
        if !lock(&self.entries).store(generation, &outcome) {
            debug!("discarding superseded entry list");
        }
        outcome
    }

    /// One entry, from cache when ready. `Ok(None)` means no entry lives at `address`.
    pub async fn fetch_one(&self, address: &Pubkey) -> Result<Option<JournalEntryState>> {
        if let Some(QueryState::Ready(entry)) = lock(&self.records).get(address).map(Slot::state) {
            return Ok(entry);
        }
        self.refetch_one(address).await
    }

    pub async fn refetch_one(&self, address: &Pubkey) -> Result<Option<JournalEntryState>> {
        let generation = lock(&self.records).entry(*address).or_default().generation();
        let outcome = self.program.fetch(address).await;
        // A slot removed mid-fetch belonged to a deleted entry; the result must not recreate it.
        let stored = lock(&self.records)
            .get_mut(address)
            .is_some_and(|slot| slot.store(generation, &outcome));
        if !stored {
            debug!(%address, "discarding superseded entry fetch");
        }
        outcome
    }

    /// Drops the cached record for `address`; the next read goes to the program.
    pub fn invalidate_entry(&self, address: &Pubkey) {
        if let Some(slot) = lock(&self.records).get_mut(address) {
            debug!(%address, "invalidating entry query");
            slot.invalidate();
        }
    }

    fn forget_entry(&self, address: &Pubkey) {
        if lock(&self.records).remove(address).is_some() {
            debug!(%address, "dropping entry query of deleted entry");
        }
    }

    /// Whether the program account exists and is executable on this cluster.
    pub async fn program_deployed(&self) -> Result<bool> {
        Ok(self.program.program_account().await?.is_some_and(|acc| acc.executable))
    }

    pub fn cached_entries(&self) -> QueryState<Vec<JournalAccount>> {
        lock(&self.entries).state()
    }

    pub fn cached_entry(&self, address: &Pubkey) -> QueryState<Option<JournalEntryState>> {
        lock(&self.records).get(address).map(Slot::state).unwrap_or_default()
    }

    pub fn mutation_status(&self, key: &MutationKey) -> MutationStatus {
        self.mutations.status(key)
    }

    /// True while a call for `key` is in flight; the triggering control should stay disabled.
    pub fn is_pending(&self, key: &MutationKey) -> bool {
        self.mutation_status(key) == MutationStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::JournalError, ledger::LocalLedger, network::Network, program::RawAccount};
    use anchor_lang::solana_program::instruction::Instruction;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    fn sync_with_ledger() -> EntrySynchronizer<LocalLedger> {
        let cluster = Cluster::new(Network::Localnet);
        let ledger = LocalLedger::new(cluster.program_id);
        EntrySynchronizer::new(cluster, ledger)
    }

    /// Ledger wrapper whose sends wait for a go signal and whose reads can be made to fail.
    struct Gated {
        ledger    : LocalLedger,
        go        : Notify,
        gate_sends: AtomicBool,
        fail_reads: AtomicBool,
    }

    impl Gated {
        fn new(program_id: Pubkey) -> Self {
            Self {
                ledger    : LocalLedger::new(program_id),
                go        : Notify::new(),
                gate_sends: AtomicBool::new(false),
                fail_reads: AtomicBool::new(false),
            }
        }

        fn read_guard(&self) -> Result<()> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(JournalError::Rpc { code: -32000, message: "node is behind".into() });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl AccountSource for Gated {
        async fn account(&self, address: &Pubkey) -> Result<Option<RawAccount>> {
            self.read_guard()?;
            self.ledger.account(address).await
        }

        async fn program_accounts(&self, program_id: &Pubkey, disc: &[u8]) -> Result<Vec<(Pubkey, RawAccount)>> {
            self.read_guard()?;
            self.ledger.program_accounts(program_id, disc).await
        }
    }

    #[async_trait]
    impl InstructionSender for Gated {
        async fn send(&self, instruction: Instruction, signer: &Pubkey) -> Result<TxSignature> {
            if self.gate_sends.load(Ordering::SeqCst) {
                self.go.notified().await;
            }
            self.ledger.send(instruction, signer).await
        }
    }

    fn gated_sync() -> EntrySynchronizer<Gated> {
        let cluster = Cluster::new(Network::Localnet);
        let backend = Gated::new(cluster.program_id);
        EntrySynchronizer::new(cluster, backend)
    }

    #[tokio::test]
    async fn create_refetches_entry_list() {
        let sync = sync_with_ledger();
        let owner = Pubkey::new_unique();
        assert!(sync.list_all().await.unwrap().is_empty());

        sync.create(&owner, "t", "m").await.unwrap();
        let cached = sync.cached_entries();
        let entries = cached.data().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].address, sync.entry_address(&owner, "t").unwrap());
        assert_eq!(entries[0].entry.owner, owner);
    }

    #[tokio::test]
    async fn validation_fails_before_any_remote_call() {
        let sync = sync_with_ledger();
        let owner = Pubkey::new_unique();
        assert!(sync.create(&owner, "", "m").await.unwrap_err().is_validation());
        assert!(sync.create(&owner, "t", "  ").await.unwrap_err().is_validation());
        assert!(sync.update(&owner, "t", "").await.unwrap_err().is_validation());
        assert!(sync.delete(&owner, &Pubkey::new_unique(), "").await.unwrap_err().is_validation());
        assert_eq!(sync.mutation_status(&MutationKey::Create), MutationStatus::Idle);
        assert_eq!(sync.program().backend().entry_count(), 0);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_cache_untouched() {
        let sync = sync_with_ledger();
        let owner = Pubkey::new_unique();
        sync.create(&owner, "t", "m").await.unwrap();
        let before = sync.cached_entries();

        let err = sync.create(&owner, "t", "again").await.unwrap_err();
        assert!(matches!(err, JournalError::AlreadyExists(_)));
        assert_eq!(sync.cached_entries(), before);
        assert!(matches!(sync.mutation_status(&MutationKey::Create), MutationStatus::Error(_)));
    }

    #[tokio::test]
    async fn update_invalidates_cached_record() {
        let sync = sync_with_ledger();
        let owner = Pubkey::new_unique();
        sync.create(&owner, "t", "m").await.unwrap();
        let address = sync.entry_address(&owner, "t").unwrap();
        assert_eq!(sync.fetch_one(&address).await.unwrap().unwrap().message, "m");

        sync.update(&owner, "t", "updated").await.unwrap();
        assert!(sync.cached_entry(&address).is_loading());
        assert_eq!(sync.fetch_one(&address).await.unwrap().unwrap().message, "updated");
    }

    #[tokio::test]
    async fn delete_drops_the_record_slot() {
        let sync = sync_with_ledger();
        let owner = Pubkey::new_unique();
        sync.create(&owner, "t", "m").await.unwrap();
        let address = sync.entry_address(&owner, "t").unwrap();
        sync.fetch_one(&address).await.unwrap();
        assert!(lock(&sync.records).contains_key(&address));

        sync.delete(&owner, &address, "t").await.unwrap();
        assert!(!lock(&sync.records).contains_key(&address));
        assert_eq!(sync.cached_entry(&address), QueryState::Idle);

        sync.invalidate_entry(&Pubkey::new_unique());
        assert!(lock(&sync.records).is_empty());
    }

    #[tokio::test]
    async fn second_submission_is_refused_while_in_flight() {
        let sync = gated_sync();
        sync.program().backend().gate_sends.store(true, Ordering::SeqCst);
        let owner = Pubkey::new_unique();

        let (first, second, ()) = tokio::join!(
            sync.create(&owner, "a", "m"),
            async {
                assert!(sync.is_pending(&MutationKey::Create));
                sync.create(&owner, "b", "m").await
            },
            async { sync.program().backend().go.notify_one() },
        );
        first.unwrap();
        assert!(matches!(second, Err(JournalError::MutationInFlight(MutationKey::Create))));
        assert!(!sync.is_pending(&MutationKey::Create));
        assert_eq!(sync.program().backend().ledger.entry_count(), 1);
    }

    #[tokio::test]
    async fn failed_list_is_reported_not_stale() {
        let sync = gated_sync();
        let owner = Pubkey::new_unique();
        sync.create(&owner, "t", "m").await.unwrap();
        assert!(sync.cached_entries().data().is_some());

        sync.program().backend().fail_reads.store(true, Ordering::SeqCst);
        assert!(sync.refetch_all().await.unwrap_err().is_transport());
        assert!(matches!(sync.cached_entries(), QueryState::Failed(_)));
        assert!(sync.list_all().await.is_err());
    }

    #[tokio::test]
    async fn mutation_succeeds_even_if_refetch_fails() {
        let sync = gated_sync();
        sync.program().backend().fail_reads.store(true, Ordering::SeqCst);
        let owner = Pubkey::new_unique();

        let signature = sync.create(&owner, "t", "m").await.unwrap();
        assert_eq!(sync.mutation_status(&MutationKey::Create), MutationStatus::Success(signature));
        assert!(matches!(sync.cached_entries(), QueryState::Failed(_)));
    }

    #[tokio::test]
    async fn program_deployment_check() {
        assert!(sync_with_ledger().program_deployed().await.unwrap());

        let cluster = Cluster::new(Network::Devnet);
        let undeployed = EntrySynchronizer::new(cluster.clone(), LocalLedger::undeployed(cluster.program_id));
        assert!(!undeployed.program_deployed().await.unwrap());
    }
}
