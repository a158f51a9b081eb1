//! Network configuration and keypair management

use aerospacer_client::constants::*;
use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub struct NetworkConfig {
    pub network: String,
    pub rpc_url: String,
    pub ws_url: String,
    pub keypair: Keypair,
    pub keypair_path: PathBuf,
    pub protocol_program_id: Pubkey,
    pub collateral_denom: String,
    pub overrides: ProtocolOverrides,
}

/// Optional TOML file overriding program ids and protocol accounts
///
/// ```toml
/// rpc_url = "https://my-node.example"
/// keypair = "~/.config/solana/operator.json"
/// protocol_program_id = "HQbV7SKnWuWPHEci5eejsnJG7qwYuQkGzJHJ6nhLZhxk"
/// collateral_denom = "SOL"
///
/// [protocol]
/// price_feed = "J83w4HKfqxwcq3BEMMkPFSppX3gqekLyLJBexebFVkix"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub rpc_url: Option<String>,
    pub keypair: Option<String>,
    pub protocol_program_id: Option<String>,
    pub collateral_denom: Option<String>,
    #[serde(default)]
    pub protocol: ProtocolOverrides,
}

/// Accounts normally read from the protocol state or built in
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolOverrides {
    pub collateral_mint: Option<String>,
    pub stablecoin_mint: Option<String>,
    pub oracle_program: Option<String>,
    pub oracle_state: Option<String>,
    pub fees_program: Option<String>,
    pub fees_state: Option<String>,
    pub price_feed: Option<String>,
    pub stability_pool_owner: Option<String>,
    pub fee_address_1: Option<String>,
    pub fee_address_2: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

impl NetworkConfig {
    pub fn new(
        network: &str,
        rpc_url: Option<String>,
        keypair_path: Option<PathBuf>,
        config_path: Option<PathBuf>,
    ) -> Result<Self> {
        let (default_rpc, ws_url) = match network {
            "localnet" | "local" => (
                "http://127.0.0.1:8899".to_string(),
                "ws://127.0.0.1:8900".to_string(),
            ),
            "devnet" => (
                "https://api.devnet.solana.com".to_string(),
                "wss://api.devnet.solana.com".to_string(),
            ),
            "mainnet-beta" | "mainnet" => (
                "https://api.mainnet-beta.solana.com".to_string(),
                "wss://api.mainnet-beta.solana.com".to_string(),
            ),
            _ => anyhow::bail!("Unknown network: {}. Use localnet, devnet, or mainnet-beta", network),
        };

        let file = match config_path {
            Some(path) => FileConfig::load(&expand_path(&path.to_string_lossy())?)?,
            None => FileConfig::default(),
        };

        // Flags win over the config file, which wins over network defaults
        let rpc_url = rpc_url.or(file.rpc_url).unwrap_or(default_rpc);

        let keypair_path = match (keypair_path, file.keypair) {
            (Some(path), _) => expand_path(&path.to_string_lossy())?,
            (None, Some(path)) => expand_path(&path)?,
            (None, None) => default_keypair_path()?,
        };

        let keypair = load_keypair(&keypair_path)?;

        let protocol_program_id = match file.protocol_program_id {
            Some(id) => parse_pubkey("protocol_program_id", &id)?,
            None => PROTOCOL_PROGRAM_ID,
        };

        Ok(Self {
            network: network.to_string(),
            rpc_url,
            ws_url,
            keypair,
            keypair_path,
            protocol_program_id,
            collateral_denom: file
                .collateral_denom
                .unwrap_or_else(|| DEFAULT_COLLATERAL_DENOM.to_string()),
            overrides: file.protocol,
        })
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

impl ProtocolOverrides {
    /// Apply every override that is set
    pub fn apply(&self, ctx: &mut aerospacer_client::ProtocolContext) -> Result<()> {
        let fields: [(&str, &Option<String>, &mut Pubkey); 10] = [
            ("collateral_mint", &self.collateral_mint, &mut ctx.collateral_mint),
            ("stablecoin_mint", &self.stablecoin_mint, &mut ctx.stablecoin_mint),
            ("oracle_program", &self.oracle_program, &mut ctx.oracle_program),
            ("oracle_state", &self.oracle_state, &mut ctx.oracle_state),
            ("fees_program", &self.fees_program, &mut ctx.fees_program),
            ("fees_state", &self.fees_state, &mut ctx.fees_state),
            ("price_feed", &self.price_feed, &mut ctx.price_feed),
            ("stability_pool_owner", &self.stability_pool_owner, &mut ctx.stability_pool_owner),
            ("fee_address_1", &self.fee_address_1, &mut ctx.fee_address_1),
            ("fee_address_2", &self.fee_address_2, &mut ctx.fee_address_2),
        ];

        for (name, value, slot) in fields {
            if let Some(value) = value {
                *slot = parse_pubkey(name, value)?;
            }
        }
        Ok(())
    }
}

fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).with_context(|| format!("Invalid {} address: {}", field, value))
}

fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path).with_context(|| format!("Failed to expand path: {}", path))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Keypair from the Solana CLI config, falling back to `~/.config/solana/id.json`
fn default_keypair_path() -> Result<PathBuf> {
    if let Some(config_file) = solana_cli_config::CONFIG_FILE.as_ref() {
        if let Ok(config) = solana_cli_config::Config::load(config_file) {
            return expand_path(&config.keypair_path);
        }
    }
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config/solana/id.json"))
}

/// Load a keypair from a JSON file
fn load_keypair(path: &Path) -> Result<Keypair> {
    if !path.exists() {
        anyhow::bail!(
            "Keypair file not found: {}\n\
             Create one with: solana-keygen new --outfile {}",
            path.display(),
            path.display()
        );
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read keypair file: {}", path.display()))?;

    let bytes: Vec<u8> = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse keypair JSON: {}", path.display()))?;

    Keypair::from_bytes(&bytes)
        .with_context(|| format!("Invalid keypair data in: {}", path.display()))
}
