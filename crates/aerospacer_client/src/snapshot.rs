//! Point-in-time reads of every live trove for one collateral denom
//!
//! A fetch runs in three steps:
//! 1. scan all debt records (fixed size + discriminator filter)
//! 2. batch-read the threshold record of every owner with non-zero debt
//! 3. scan all collateral records and keep the ones for the requested denom
//!
//! Step 2 is best-effort. A threshold that cannot be read or decoded drops
//! that one trove and is reported in [`Snapshot::failures`]; the caller decides
//! whether an undercounted snapshot is good enough.

use futures::future::join_all;
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::account::Account;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::time::Duration;

use crate::accounts::ProtocolContext;
use crate::constants::*;
use crate::error::FetchError;
use crate::layout::*;
use crate::pda::{derive_liquidity_threshold, ProtocolAddresses, TroveAddresses};
use crate::types::Position;

/// Batching knobs for the threshold reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Addresses per `getMultipleAccounts` call
    pub chunk_size: usize,
    /// Calls in flight at once
    pub concurrency: usize,
    /// Pause between groups of concurrent calls
    pub batch_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            concurrency: 4,
            batch_delay: Duration::from_millis(200),
        }
    }
}

/// A trove left out of a snapshot and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub owner: Pubkey,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Live positions in ledger scan order (not sorted)
    pub positions: Vec<Position>,
    pub failures: Vec<FetchFailure>,
}

impl Snapshot {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Raw record bytes gathered from the ledger, before decoding
#[derive(Debug, Clone, Default)]
pub struct RawRecords {
    /// (record address, data) of every debt record
    pub debts: Vec<(Pubkey, Vec<u8>)>,
    /// Threshold data by owner; `Err` carries the read error for that owner
    pub thresholds: HashMap<Pubkey, Result<Vec<u8>, String>>,
    /// (record address, data) of every collateral record
    pub collaterals: Vec<(Pubkey, Vec<u8>)>,
}

/// Decode and join raw records into a snapshot
pub fn assemble_snapshot(program_id: &Pubkey, denom: &str, raw: &RawRecords) -> Snapshot {
    let mut snapshot = Snapshot::default();

    let mut collateral_by_owner: HashMap<Pubkey, u64> = HashMap::new();
    for (address, data) in &raw.collaterals {
        match UserCollateralAmount::decode(data) {
            Ok(record) if record.denom == denom && record.amount > 0 => {
                collateral_by_owner.insert(record.owner, record.amount);
            }
            Ok(_) => {}
            Err(e) => log::warn!("skipping collateral record {}: {}", address, e),
        }
    }

    for (address, data) in &raw.debts {
        let debt = match UserDebtAmount::decode(data) {
            Ok(debt) => debt,
            Err(e) => {
                let owner = record_owner(data).unwrap_or(*address);
                log::warn!("skipping debt record {}: {}", address, e);
                snapshot.failures.push(FetchFailure { owner, reason: e.to_string() });
                continue;
            }
        };
        if debt.amount == 0 {
            continue;
        }
        let Some(&collateral) = collateral_by_owner.get(&debt.owner) else {
            log::debug!("owner {} has no {} collateral", debt.owner, denom);
            continue;
        };

        let ratio = match raw.thresholds.get(&debt.owner) {
            Some(Ok(data)) => LiquidityThreshold::decode(data).map(|t| t.ratio).map_err(|e| e.to_string()),
            Some(Err(e)) => Err(e.clone()),
            None => Err("threshold record not found".to_string()),
        };

        match ratio {
            Ok(ratio) => snapshot.positions.push(Position::new(
                program_id,
                debt.owner,
                debt.amount as u128,
                collateral,
                denom,
                ratio,
            )),
            Err(reason) => {
                log::warn!("omitting trove {}: {}", debt.owner, reason);
                snapshot.failures.push(FetchFailure { owner: debt.owner, reason });
            }
        }
    }

    snapshot
}

fn program_accounts_config(filters: Vec<RpcFilterType>) -> RpcProgramAccountsConfig {
    RpcProgramAccountsConfig {
        filters: Some(filters),
        account_config: RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::Base64),
            ..Default::default()
        },
        ..Default::default()
    }
}

async fn scan(
    rpc: &RpcClient,
    program_id: &Pubkey,
    filters: Vec<RpcFilterType>,
) -> Result<Vec<(Pubkey, Vec<u8>)>, FetchError> {
    let accounts = rpc
        .get_program_accounts_with_config(program_id, program_accounts_config(filters))
        .await?;
    Ok(accounts.into_iter().map(|(key, account)| (key, account.data)).collect())
}

/// Read many accounts in chunks, a few chunks at a time
///
/// A failed chunk marks each of its addresses with the error instead of
/// failing the whole read.
async fn fetch_multiple(
    rpc: &RpcClient,
    addresses: &[Pubkey],
    config: &FetchConfig,
) -> Vec<Result<Option<Account>, String>> {
    let chunks: Vec<&[Pubkey]> = addresses.chunks(config.chunk_size.max(1)).collect();
    let mut results = Vec::with_capacity(addresses.len());

    for (i, group) in chunks.chunks(config.concurrency.max(1)).enumerate() {
        if i > 0 && !config.batch_delay.is_zero() {
            tokio::time::sleep(config.batch_delay).await;
        }

        let replies = join_all(group.iter().map(|chunk| rpc.get_multiple_accounts(chunk))).await;

        for (chunk, reply) in group.iter().zip(replies) {
            match reply {
                Ok(accounts) => results.extend(accounts.into_iter().map(Ok)),
                Err(e) => {
                    log::warn!("getMultipleAccounts failed for {} addresses: {}", chunk.len(), e);
                    let reason = e.to_string();
                    results.extend(chunk.iter().map(|_| Err(reason.clone())));
                }
            }
        }
    }

    results
}

/// Fetch every live trove for `denom`
pub async fn fetch_snapshot(
    rpc: &RpcClient,
    program_id: &Pubkey,
    denom: &str,
    config: &FetchConfig,
) -> Result<Snapshot, FetchError> {
    let debts = scan(
        rpc,
        program_id,
        vec![
            RpcFilterType::DataSize(USER_DEBT_AMOUNT_SIZE),
            RpcFilterType::Memcmp(Memcmp::new_raw_bytes(0, USER_DEBT_AMOUNT_DISCRIMINATOR.to_vec())),
        ],
    )
    .await?;
    log::info!("found {} debt records", debts.len());

    let owners: Vec<Pubkey> = debts
        .iter()
        .filter_map(|(_, data)| UserDebtAmount::decode(data).ok())
        .filter(|debt| debt.amount > 0)
        .map(|debt| debt.owner)
        .collect();
    let threshold_addresses: Vec<Pubkey> = owners
        .iter()
        .map(|owner| derive_liquidity_threshold(owner, program_id))
        .collect();

    let replies = fetch_multiple(rpc, &threshold_addresses, config).await;
    let thresholds = owners
        .iter()
        .zip(replies)
        .filter_map(|(owner, reply)| match reply {
            Ok(Some(account)) => Some((*owner, Ok(account.data))),
            Ok(None) => None,
            Err(e) => Some((*owner, Err(e))),
        })
        .collect();

    let collaterals = scan(
        rpc,
        program_id,
        vec![RpcFilterType::Memcmp(Memcmp::new_raw_bytes(
            0,
            USER_COLLATERAL_AMOUNT_DISCRIMINATOR.to_vec(),
        ))],
    )
    .await?;

    let raw = RawRecords { debts, thresholds, collaterals };
    let snapshot = assemble_snapshot(program_id, denom, &raw);

    log::info!(
        "snapshot for {}: {} live troves, {} omitted",
        denom,
        snapshot.positions.len(),
        snapshot.failures.len()
    );
    Ok(snapshot)
}

/// Read one owner's trove; `None` when it does not exist or is closed
pub async fn fetch_position(
    rpc: &RpcClient,
    program_id: &Pubkey,
    owner: &Pubkey,
    denom: &str,
) -> Result<Option<Position>, FetchError> {
    let records = TroveAddresses::derive(program_id, owner, denom);
    let mut accounts = rpc
        .get_multiple_accounts(&[records.debt, records.collateral, records.threshold])
        .await?
        .into_iter();
    let debt = accounts.next().flatten();
    let collateral = accounts.next().flatten();
    let threshold = accounts.next().flatten();

    let Some(debt) = debt else {
        return Ok(None);
    };
    let debt = UserDebtAmount::decode(&debt.data)?;
    if debt.amount == 0 {
        return Ok(None);
    }

    let collateral = match collateral {
        Some(account) => UserCollateralAmount::decode(&account.data)?.amount,
        None => 0,
    };
    let threshold = threshold.ok_or_else(|| FetchError::AccountNotFound {
        address: records.threshold.to_string(),
    })?;
    let ratio = LiquidityThreshold::decode(&threshold.data)?.ratio;

    Ok(Some(Position::new(
        program_id,
        *owner,
        debt.amount as u128,
        collateral,
        denom,
        ratio,
    )))
}

/// Read the protocol state account
pub async fn fetch_protocol_state(rpc: &RpcClient, program_id: &Pubkey) -> Result<ProtocolState, FetchError> {
    let state = ProtocolAddresses::derive(program_id, DEFAULT_COLLATERAL_DENOM).state;
    let account = rpc
        .get_multiple_accounts(&[state])
        .await?
        .into_iter()
        .next()
        .flatten()
        .ok_or_else(|| FetchError::AccountNotFound { address: state.to_string() })?;
    Ok(ProtocolState::decode(&account.data)?)
}

/// Build a [`ProtocolContext`] from the state account and the collateral vault
pub async fn fetch_protocol_context(
    rpc: &RpcClient,
    program_id: &Pubkey,
    denom: &str,
) -> Result<ProtocolContext, FetchError> {
    let state = fetch_protocol_state(rpc, program_id).await?;

    let vault = ProtocolAddresses::derive(program_id, denom).collateral_vault;
    let vault_account = rpc
        .get_multiple_accounts(&[vault])
        .await?
        .into_iter()
        .next()
        .flatten()
        .ok_or_else(|| FetchError::AccountNotFound { address: vault.to_string() })?;
    let collateral_mint = token_account_mint(&vault_account.data)?;

    Ok(ProtocolContext::from_state(*program_id, denom, &state, collateral_mint))
}
