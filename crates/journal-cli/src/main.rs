//! Journal program CLI.
//! Prints one JSON object to stdout per command; logs go to stderr.
//! Keeps JSON field names programId isSigner isWritable dataB64 via serde rename.

use std::{path::PathBuf, str::FromStr};

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use clap::{Parser, Subcommand, ValueEnum};
use journal_client::{
    instructions::{self, EntryAccounts},
    locator::validate_message,
    ClientConfig, Cluster, EntrySynchronizer, JournalAccount, LocalLedger, Network, RpcBackend,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Defines the CLI and the selected subcommand.
#[derive(Parser, Debug)]
#[command(name = "journal-cli")]
#[command(about = "Client for the on-chain journal program", long_about = None)]
struct Cli {
    /// TOML config file (network, rpc_url, program_id, commitment).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    network: Option<String>,
    #[arg(long, global = true)]
    rpc_url: Option<String>,
    #[arg(long, global = true)]
    program_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Lists available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Derives the entry address for (owner, title).
    Address {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        title: String,
    },
    /// Prints an unsigned journal instruction for an external wallet to sign.
    Instruction {
        #[arg(value_enum)]
        kind: IxKind,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: Option<String>,
    },
    /// Lists every journal entry on the cluster.
    List,
    /// Shows the entry at an address.
    Show { address: String },
    /// Reports whether the program is deployed on the cluster.
    Status,
    /// Runs create/update/delete against an in-memory ledger.
    Demo,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum IxKind {
    Create,
    Update,
    Delete,
}

/// Holds JSON output of address.
#[derive(Serialize)]
struct OutAddress {
    address: String,
    bump: u8,
    #[serde(rename = "programId")]
    program_id: String,
    network: Network,
}

#[derive(Serialize)]
struct OutMeta {
    pubkey: String,
    #[serde(rename = "isSigner")]
    is_signer: bool,
    #[serde(rename = "isWritable")]
    is_writable: bool,
}

/// Holds JSON output of instruction.
#[derive(Serialize)]
struct OutInstruction {
    #[serde(rename = "programId")]
    program_id: String,
    accounts: Vec<OutMeta>,
    #[serde(rename = "dataB64")]
    data_b64: String,
}

#[derive(Serialize)]
struct OutEntry {
    address: String,
    owner: String,
    title: String,
    message: String,
    explorer: String,
}

/// Holds JSON output of list.
#[derive(Serialize)]
struct OutList {
    network: Network,
    count: usize,
    entries: Vec<OutEntry>,
}

/// Holds JSON output of show.
#[derive(Serialize)]
struct OutShow {
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry: Option<OutEntry>,
}

/// Holds JSON output of status.
#[derive(Serialize)]
struct OutStatus {
    network: Network,
    endpoint: String,
    #[serde(rename = "programId")]
    program_id: String,
    deployed: bool,
}

/// Holds JSON output of demo.
#[derive(Serialize)]
struct OutDemo {
    created: String,
    updated: String,
    deleted: String,
    #[serde(rename = "emptyTitleRejected")]
    empty_title_rejected: bool,
    #[serde(rename = "intruderDeleteRejected")]
    intruder_delete_rejected: bool,
    #[serde(rename = "foundAfterDelete")]
    found_after_delete: bool,
}

fn out_entry(cluster: &Cluster, acc: &JournalAccount) -> OutEntry {
    OutEntry {
        address: acc.address.to_string(),
        owner: acc.entry.owner.to_string(),
        title: acc.entry.title.clone(),
        message: acc.entry.message.clone(),
        explorer: cluster.account_url(&acc.address),
    }
}

fn out_instruction(ix: &Instruction) -> OutInstruction {
    OutInstruction {
        program_id: ix.program_id.to_string(),
        accounts: ix
            .accounts
            .iter()
            .map(|m| OutMeta { pubkey: m.pubkey.to_string(), is_signer: m.is_signer, is_writable: m.is_writable })
            .collect(),
        data_b64: STANDARD.encode(&ix.data),
    }
}

fn parse_key(s: &str, what: &str) -> Result<Pubkey> {
    Pubkey::from_str(s).map_err(|e| anyhow!("invalid {what} `{s}`: {e}"))
}

/// Config file first, then command line overrides.
fn resolve_cluster(cli: &Cli) -> Result<Cluster> {
    let mut cfg = match &cli.config {
        Some(path) => ClientConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(network) = &cli.network {
        cfg.network = network.parse()?;
    }
    if let Some(url) = &cli.rpc_url {
        cfg.rpc_url = Some(url.clone());
    }
    if let Some(id) = &cli.program_id {
        cfg.program_id = Some(id.clone());
    }
    Ok(cfg.into_cluster()?)
}

/// Same checks the synchronizer runs before a send.
fn build_instruction(cluster: &Cluster, kind: IxKind, owner: &Pubkey, title: &str, message: Option<&str>) -> Result<Instruction> {
    let entry = journal_client::derive_entry_address(&cluster.program_id, owner, title)?;
    let accounts = EntryAccounts::new(entry.address, *owner);
    let ix = match (kind, message) {
        (IxKind::Delete, _) => instructions::delete_entry_ix(&cluster.program_id, accounts, title),
        (_, None) => return Err(anyhow!("--message is required for {kind:?}")),
        (IxKind::Create, Some(m)) => {
            validate_message(m)?;
            instructions::create_entry_ix(&cluster.program_id, accounts, title, m)
        }
        (IxKind::Update, Some(m)) => {
            validate_message(m)?;
            instructions::update_entry_ix(&cluster.program_id, accounts, title, m)
        }
    };
    Ok(ix)
}

fn print_json<T: Serialize>(out: &T) -> Result<()> {
    println!("{}", serde_json::to_string(out)?);
    Ok(())
}

async fn run_demo(cluster: Cluster) -> Result<OutDemo> {
    let ledger = LocalLedger::new(cluster.program_id);
    let sync = EntrySynchronizer::new(cluster, ledger);
    let (owner, intruder) = (Pubkey::new_unique(), Pubkey::new_unique());
    let title = "My Journal Entry";

    let created = sync.create(&owner, title, "This is my first journal entry.").await?;
    let address = sync.entry_address(&owner, title)?;
    let updated = sync.update(&owner, title, "updated").await?;
    info!(entries = sync.list_all().await?.len(), "entry list after update");

    let empty_title_rejected = sync.create(&owner, "", "This should fail.").await.is_err();

    sync.create(&owner, "EntryToDelete", "This entry will be targeted for unauthorized deletion.").await?;
    let target = sync.entry_address(&owner, "EntryToDelete")?;
    let intruder_delete_rejected = sync.delete(&intruder, &target, "EntryToDelete").await.is_err();

    let deleted = sync.delete(&owner, &address, title).await?;
    let found_after_delete = sync.fetch_one(&address).await?.is_some();

    Ok(OutDemo {
        created: created.to_string(),
        updated: updated.to_string(),
        deleted: deleted.to_string(),
        empty_title_rejected,
        intruder_delete_rejected,
        found_after_delete,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Parses flags and dispatches.
    let cli = Cli::parse();
    let cluster = resolve_cluster(&cli)?;

    match cli.command {
        Commands::Address { owner, title } => {
            let owner = parse_key(&owner, "owner")?;
            let entry = journal_client::derive_entry_address(&cluster.program_id, &owner, &title)?;
            print_json(&OutAddress {
                address: entry.address.to_string(),
                bump: entry.bump,
                program_id: cluster.program_id.to_string(),
                network: cluster.network,
            })?;
        }
        Commands::Instruction { kind, owner, title, message } => {
            let owner = parse_key(&owner, "owner")?;
            let ix = build_instruction(&cluster, kind, &owner, &title, message.as_deref())?;
            print_json(&out_instruction(&ix))?;
        }
        Commands::List => {
            let sync = EntrySynchronizer::new(cluster.clone(), RpcBackend::read_only(&cluster));
            let entries = sync.list_all().await?;
            print_json(&OutList {
                network: cluster.network,
                count: entries.len(),
                entries: entries.iter().map(|acc| out_entry(&cluster, acc)).collect(),
            })?;
        }
        Commands::Show { address } => {
            let address = parse_key(&address, "address")?;
            let sync = EntrySynchronizer::new(cluster.clone(), RpcBackend::read_only(&cluster));
            let entry = sync.fetch_one(&address).await?;
            print_json(&OutShow {
                found: entry.is_some(),
                entry: entry.map(|entry| out_entry(&cluster, &JournalAccount { address, entry })),
            })?;
        }
        Commands::Status => {
            let sync = EntrySynchronizer::new(cluster.clone(), RpcBackend::read_only(&cluster));
            print_json(&OutStatus {
                deployed: sync.program_deployed().await?,
                network: cluster.network,
                endpoint: cluster.endpoint.clone(),
                program_id: cluster.program_id.to_string(),
            })?;
        }
        Commands::Demo => {
            print_json(&run_demo(cluster).await?)?;
        }
    }

    Ok(())
}
