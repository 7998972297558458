// ============================================================================
// nectar — CLI for the Nectar token-gated storage SDK
// ============================================================================
// Usage:
//   nectar wallet                               Generate a key pair
//   nectar recover -m MSG -s 0xSIG              Recover a signer address
//   nectar check -m MSG -s 0xSIG -p policy.json Run a whitelist decision
//   nectar upload -f FILE [--secret HEX]        Upload to the gateway
//   nectar download -H HASH -o FILE             Download from the gateway
//   nectar remove -n NAME                       Remove from the gateway
//
// Environment: ALCHEMY_API_KEY for check; NECTAR_GATEWAY_URL and
// NECTAR_GATEWAY_TOKEN for upload/download/remove (.env is honored).
// ============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use nectar_core::access::{AlchemyOracle, recover_signer};
use nectar_core::{Address, PolicyRequirement, Signature, StorageClient, WhitelistGate};

/// Nectar token-gated storage tool
#[derive(Parser)]
#[command(name = "nectar", version, about = "Token-gated storage gateway client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a random wallet and print it as JSON
    Wallet,

    /// Recover the signer address from a message and an RPC-hex signature
    Recover {
        #[arg(short, long)]
        message: String,

        /// 65-byte signature as 0x-prefixed hex
        #[arg(short, long)]
        signature: String,
    },

    /// Evaluate a whitelist policy for a signed message
    Check {
        #[arg(short, long)]
        message: String,

        /// 65-byte signature as 0x-prefixed hex
        #[arg(short, long)]
        signature: String,

        /// Path to the policy JSON document
        #[arg(short, long)]
        policy: PathBuf,

        /// Numeric chain id (1 = mainnet)
        #[arg(long, default_value = "1")]
        chain_id: u64,

        /// Explicit allow-list entry; may be repeated
        #[arg(long = "allow")]
        allow: Vec<Address>,
    },

    /// Upload a file to the gateway, optionally sealed with a hex secret
    Upload {
        #[arg(short, long)]
        file: PathBuf,

        /// 32-byte encryption secret as hex
        #[arg(long)]
        secret: Option<String>,
    },

    /// Download content by hash, optionally opening the encryption envelope
    Download {
        #[arg(short = 'H', long)]
        hash: String,

        #[arg(short, long)]
        output: PathBuf,

        /// 32-byte encryption secret as hex
        #[arg(long)]
        secret: Option<String>,
    },

    /// Remove a file from the gateway
    Remove {
        #[arg(short, long)]
        name: String,
    },
}

fn gateway_client() -> Result<StorageClient> {
    let url = std::env::var("NECTAR_GATEWAY_URL").context("NECTAR_GATEWAY_URL is not set")?;
    let token = std::env::var("NECTAR_GATEWAY_TOKEN").context("NECTAR_GATEWAY_TOKEN is not set")?;
    StorageClient::new(url, token)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Wallet => {
            let wallet = nectar_core::wallet::generate();
            println!("{}", serde_json::to_string_pretty(&wallet)?);
        }

        Commands::Recover { message, signature } => {
            let signature = Signature::from_rpc_hex(&signature)?;
            println!("{}", recover_signer(&message, &signature)?);
        }

        Commands::Check { message, signature, policy, chain_id, allow } => {
            let api_key = std::env::var("ALCHEMY_API_KEY").context("ALCHEMY_API_KEY is not set")?;
            let policy_text = std::fs::read_to_string(&policy)
                .with_context(|| format!("failed to read {}", policy.display()))?;
            let policy: PolicyRequirement =
                serde_json::from_str(&policy_text).context("malformed policy document")?;
            let signature = Signature::from_rpc_hex(&signature)?;

            let gate = WhitelistGate::new(Arc::new(AlchemyOracle::new(api_key)));
            let allow_list = if allow.is_empty() { None } else { Some(allow.as_slice()) };

            match gate.evaluate(&message, &signature, &policy, chain_id, allow_list).await {
                Ok(signer) => println!("admitted: {signer}"),
                Err(e) => {
                    println!("denied: {e}");
                    std::process::exit(1);
                }
            }
        }

        Commands::Upload { file, secret } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .context("file has no usable name")?;

            let hash = gateway_client()?
                .upload(&data, filename, secret.as_deref())
                .await?;
            println!("{hash}");
        }

        Commands::Download { hash, output, secret } => {
            let content = gateway_client()?.download(&hash, secret.as_deref()).await?;
            std::fs::write(&output, content)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("wrote {}", output.display());
        }

        Commands::Remove { name } => {
            gateway_client()?.remove(&name).await?;
            println!("removed {name}");
        }
    }

    Ok(())
}
