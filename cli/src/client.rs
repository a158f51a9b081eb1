//! Solana RPC client utilities and the simulate-then-send path

use aerospacer_client::pda::get_associated_token_address;
use aerospacer_client::{
    snapshot, FetchConfig, PreparedOperation, ProgramRejection, ProtocolContext, Snapshot,
};
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Signature, Signer},
    transaction::Transaction,
};
use std::future::Future;
use std::time::Duration;

use crate::config::NetworkConfig;

/// Largest serialized transaction the network accepts
const PACKET_DATA_SIZE: usize = 1232;

/// Create an RPC client from the network configuration
pub fn create_rpc_client(config: &NetworkConfig) -> RpcClient {
    RpcClient::new_with_commitment(config.rpc_url.clone(), CommitmentConfig::confirmed())
}

/// Read the protocol state and apply config file overrides
pub async fn load_context(config: &NetworkConfig, rpc: &RpcClient) -> Result<ProtocolContext> {
    let mut ctx = snapshot::fetch_protocol_context(rpc, &config.protocol_program_id, &config.collateral_denom)
        .await
        .context("Failed to read protocol state")?;
    config.overrides.apply(&mut ctx)?;
    Ok(ctx)
}

/// Fetch a snapshot behind a spinner, reporting omitted troves
pub async fn load_snapshot(config: &NetworkConfig, rpc: &RpcClient) -> Result<Snapshot> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    spinner.set_message(format!("Fetching {} troves...", config.collateral_denom));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = snapshot::fetch_snapshot(
        rpc,
        &config.protocol_program_id,
        &config.collateral_denom,
        &FetchConfig::default(),
    )
    .await;
    spinner.finish_and_clear();

    let snapshot = result.context("Failed to fetch trove snapshot")?;
    if !snapshot.is_complete() {
        println!(
            "{} {} trove(s) could not be read and are missing from this view",
            "⚠".yellow(),
            snapshot.failures.len()
        );
        for failure in &snapshot.failures {
            println!("  {} {}: {}", "├─".dimmed(), format_pubkey(&failure.owner), failure.reason);
        }
    }
    Ok(snapshot)
}

/// What happened to a prepared operation
pub enum Outcome {
    Sent(Signature),
    /// Dry run: simulation passed, nothing was sent
    Simulated,
    Rejected(ProgramRejection),
}

/// Simulate, then sign and send unless `dry_run`
///
/// `setup` instructions (ATA creation) run before the protocol instruction in
/// the same transaction.
pub async fn execute(
    config: &NetworkConfig,
    rpc: &RpcClient,
    setup: Vec<Instruction>,
    prepared: PreparedOperation,
    dry_run: bool,
) -> Result<Outcome> {
    let payer = config.pubkey();

    if dry_run {
        print_prepared(&prepared);
    }

    let mut instructions = setup;
    instructions.push(prepared.into_instruction());

    let recent_blockhash = rpc
        .get_latest_blockhash()
        .await
        .context("Failed to get recent blockhash")?;

    let transaction = Transaction::new_signed_with_payer(
        &instructions,
        Some(&payer),
        &[&config.keypair],
        recent_blockhash,
    );

    let size = bincode::serialized_size(&transaction).context("Failed to size transaction")? as usize;
    log::debug!("transaction size {} bytes", size);
    if size > PACKET_DATA_SIZE {
        anyhow::bail!("Transaction is {} bytes, over the {} byte limit", size, PACKET_DATA_SIZE);
    }

    println!("{}", "Simulating transaction...".dimmed());
    let simulation = rpc
        .simulate_transaction(&transaction)
        .await
        .context("Failed to simulate transaction")?
        .value;

    if let Some(err) = simulation.err {
        let logs = simulation.logs.unwrap_or_default();
        for line in &logs {
            log::debug!("{}", line);
        }
        let rejection = ProgramRejection::from_logs(&logs)
            .unwrap_or_else(|| ProgramRejection::unclassified(err.to_string()));
        return Ok(Outcome::Rejected(rejection));
    }

    if let Some(units) = simulation.units_consumed {
        println!("{} {}", "Compute units:".bright_cyan(), units);
    }

    if dry_run {
        println!("{}", "Simulation passed (dry run, not sent)".bright_green());
        return Ok(Outcome::Simulated);
    }

    println!("{}", "Sending transaction...".dimmed());
    let signature = rpc
        .send_and_confirm_transaction(&transaction)
        .await
        .context("Failed to send and confirm transaction")?;

    println!("{} {}", "Transaction confirmed:".bright_green(), format_signature(&signature, &config.network));
    Ok(Outcome::Sent(signature))
}

impl Outcome {
    /// Turn a final outcome into the command's result
    pub fn finish(self) -> Result<()> {
        match self {
            Outcome::Sent(_) | Outcome::Simulated => Ok(()),
            Outcome::Rejected(rejection) => {
                println!("{} {}", "✗ Rejected:".bright_red().bold(), rejection.kind);
                if let Some(code) = &rejection.code {
                    println!("  {} {}", "Code:".bright_cyan(), code);
                }
                println!("  {} {}", "Message:".bright_cyan(), rejection.message);
                Err(rejection.into())
            }
        }
    }
}

/// Setup instructions plus the protocol operation, ready to simulate
pub struct Attempt {
    pub setup: Vec<Instruction>,
    pub prepared: PreparedOperation,
}

/// Run `submit` on `first`; after a stale-proof rejection, run it once more
/// on whatever `rebuild` produces
///
/// Every other outcome, including a second rejection, is returned as is.
pub async fn retry_stale<T, S, SF, R, RF>(first: T, mut submit: S, rebuild: R) -> Result<Outcome>
where
    S: FnMut(T) -> SF,
    SF: Future<Output = Result<Outcome>>,
    R: FnOnce() -> RF,
    RF: Future<Output = Result<T>>,
{
    match submit(first).await? {
        Outcome::Rejected(rejection) if rejection.kind.is_retryable() => {
            log::info!("{}, rebuilding from a fresh snapshot", rejection);
            println!("{}", "Proof went stale, retrying with a fresh snapshot...".yellow());
            let retry = rebuild().await?;
            submit(retry).await
        }
        outcome => Ok(outcome),
    }
}

/// [`execute`] with one rebuild-and-resubmit on a stale proof
pub async fn execute_with_retry<R, RF>(
    config: &NetworkConfig,
    rpc: &RpcClient,
    first: Attempt,
    dry_run: bool,
    rebuild: R,
) -> Result<Outcome>
where
    R: FnOnce() -> RF,
    RF: Future<Output = Result<Attempt>>,
{
    retry_stale(
        first,
        |attempt: Attempt| execute(config, rpc, attempt.setup, attempt.prepared, dry_run),
        rebuild,
    )
    .await
}

/// Idempotent ATA creation, so a missing token account does not fail the op
pub fn create_ata_idempotent(payer: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> Instruction {
    spl_associated_token_account::instruction::create_associated_token_account_idempotent(
        payer,
        owner,
        mint,
        &spl_token::id(),
    )
}

/// Move `lamports` into the payer's wrapped SOL account
pub fn wrap_sol(payer: &Pubkey, lamports: u64) -> Result<Vec<Instruction>> {
    let wsol_account = get_associated_token_address(payer, &spl_token::native_mint::id());
    Ok(vec![
        create_ata_idempotent(payer, payer, &spl_token::native_mint::id()),
        solana_sdk::system_instruction::transfer(payer, &wsol_account, lamports),
        spl_token::instruction::sync_native(&spl_token::id(), &wsol_account)
            .context("Failed to build SyncNative instruction")?,
    ])
}

/// Payload and account table, for dry runs
pub fn print_prepared(prepared: &PreparedOperation) {
    println!("\n{}", "Instruction data:".bright_yellow());
    println!("  {} {}", "hex:".bright_cyan(), to_hex(&prepared.data));
    println!("  {} {}", "base58:".bright_cyan(), bs58::encode(&prepared.data).into_string());
    println!("  {} {} bytes", "length:".bright_cyan(), prepared.data.len());

    println!("\n{}", "Accounts:".bright_yellow());
    for (i, meta) in prepared.accounts.iter().enumerate() {
        println!("  [{:>2}] {} {}", i, format_flags(meta), meta.pubkey);
    }
    println!();
}

pub fn format_flags(meta: &AccountMeta) -> String {
    format!(
        "{}{}",
        if meta.is_signer { "S" } else { "-" },
        if meta.is_writable { "W" } else { "-" }
    )
}

pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Pretty print a signature as a shortened explorer link
pub fn format_signature(signature: &Signature, network: &str) -> String {
    let sig_str = signature.to_string();
    let short = format!("{}...{}", &sig_str[0..8], &sig_str[sig_str.len() - 8..]);

    let explorer_url = match network {
        "mainnet-beta" | "mainnet" => format!("https://explorer.solana.com/tx/{}", sig_str),
        "devnet" => format!("https://explorer.solana.com/tx/{}?cluster=devnet", sig_str),
        "localnet" | "local" => format!("http://localhost:3000/tx/{}", sig_str),
        _ => sig_str.clone(),
    };

    format!("{} ({})", short.bright_blue(), explorer_url.dimmed())
}

/// Pretty print a pubkey as shortened address
pub fn format_pubkey(pubkey: &Pubkey) -> String {
    let addr = pubkey.to_string();
    format!("{}...{}", &addr[0..8], &addr[addr.len() - 8..]).bright_yellow().to_string()
}

/// Micro-percent ICR as a percentage
pub fn format_ratio(ratio: u64) -> String {
    if ratio == u64::MAX {
        return "∞".to_string();
    }
    format!("{}.{:02}%", ratio / 1_000_000, (ratio % 1_000_000) / 10_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerospacer_client::RejectionKind;

    fn stale() -> Outcome {
        Outcome::Rejected(ProgramRejection {
            kind: RejectionKind::StaleProof,
            code: Some("InvalidList".to_string()),
            message: "Invalid list".to_string(),
        })
    }

    #[tokio::test]
    async fn test_stale_rejection_is_rebuilt_once() {
        let mut submitted = Vec::new();
        let outcome = retry_stale(
            1u32,
            |n| {
                submitted.push(n);
                async move { Ok::<_, anyhow::Error>(if n == 1 { stale() } else { Outcome::Simulated }) }
            },
            || async { Ok::<_, anyhow::Error>(2u32) },
        )
        .await
        .unwrap();

        assert!(matches!(outcome, Outcome::Simulated));
        assert_eq!(submitted, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_second_stale_rejection_is_returned() {
        let mut calls = 0;
        let outcome = retry_stale(
            (),
            |_| {
                calls += 1;
                async { Ok::<_, anyhow::Error>(stale()) }
            },
            || async { Ok::<_, anyhow::Error>(()) },
        )
        .await
        .unwrap();

        assert!(matches!(outcome, Outcome::Rejected(_)));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_business_rejection_is_not_retried() {
        let mut rebuilt = false;
        let outcome = retry_stale(
            (),
            |_| async { Ok::<_, anyhow::Error>(Outcome::Rejected(ProgramRejection::unclassified("boom"))) },
            || {
                rebuilt = true;
                async { Ok::<_, anyhow::Error>(()) }
            },
        )
        .await
        .unwrap();

        assert!(matches!(outcome, Outcome::Rejected(_)));
        assert!(!rebuilt);
    }

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(150_000_000), "150.00%");
        assert_eq!(format_ratio(109_990_000), "109.99%");
        assert_eq!(format_ratio(u64::MAX), "∞");
    }

    #[test]
    fn test_hex_and_flags() {
        assert_eq!(to_hex(&[0x00, 0xab, 0x10]), "00ab10");
        let key = Pubkey::new_unique();
        assert_eq!(format_flags(&AccountMeta::new(key, true)), "SW");
        assert_eq!(format_flags(&AccountMeta::new_readonly(key, false)), "--");
    }

    #[test]
    fn test_create_ata_idempotent_layout() {
        let payer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ix = create_ata_idempotent(&payer, &payer, &mint);

        assert_eq!(ix.program_id, spl_associated_token_account::id());
        assert!(ix.accounts[0].is_signer);
        assert_eq!(ix.accounts[1].pubkey, get_associated_token_address(&payer, &mint));
        assert_eq!(ix.accounts[3].pubkey, mint);
    }

    #[test]
    fn test_wrap_sol_funds_the_wsol_account() {
        let payer = Pubkey::new_unique();
        let ixs = wrap_sol(&payer, 5).unwrap();
        assert_eq!(ixs.len(), 3);
        let wsol = get_associated_token_address(&payer, &aerospacer_client::constants::WSOL_MINT);
        assert_eq!(ixs[1].accounts[1].pubkey, wsol);
        assert_eq!(ixs[2].program_id, spl_token::id());
        assert_eq!(ixs[2].accounts[0].pubkey, wsol);
        assert_eq!(
            ixs[2].data,
            spl_token::instruction::TokenInstruction::SyncNative.pack()
        );
    }
}
