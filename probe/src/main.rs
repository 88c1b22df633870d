//! This utility imports `subkey` key dumps and submits tracked transactions to a Substrate node.

use std::net::IpAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{error, info};
use node_keyring::{Keyring, LabelPolicy};
use node_probe::peer_identity::{bootnode_address, read_peer_id};
use node_probe::{
    CallArg,
    CallRequest,
    ResolvePolicy,
    SignerRef,
    SubmitterConfig,
    SubxtChainClient,
    TransactionRequest,
    TransactionSubmitter,
    TxParams,
};

/// CLI entrypoint
#[derive(Parser, Debug)]
#[command(
    name = "node-probe",
    version,
    about = "Import subkey dumps and submit tracked transactions to a Substrate node"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Location and parsing mode of a key dump.
#[derive(Args, Debug)]
struct DumpArgs {
    /// Path to the key dump produced by `subkey`
    #[arg(short, long, env = "KEY_DUMP")]
    dump: PathBuf,

    /// Trust line positions only and ignore the label column
    #[arg(long)]
    positional: bool,
}

impl DumpArgs {
    /// Reads the dump into a keyring.
    async fn load(&self) -> anyhow::Result<Keyring> {
        let policy = if self.positional {
            LabelPolicy::Positional
        } else {
            LabelPolicy::Labeled
        };
        Ok(Keyring::load(&self.dump, policy).await?)
    }
}

/// Status that counts as success.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum WaitFor {
    /// Inclusion in a best block
    InBlock,
    /// Inclusion in a finalized block
    Finalized,
}

impl From<WaitFor> for ResolvePolicy {
    fn from(wait_for: WaitFor) -> Self {
        match wait_for {
            WaitFor::InBlock => ResolvePolicy::InBlock,
            WaitFor::Finalized => ResolvePolicy::Finalized,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the records of a key dump
    Keys {
        #[command(flatten)]
        dump: DumpArgs,

        /// Only list records that carry every field
        #[arg(long)]
        valid_only: bool,
    },

    /// Look up a record by chain address
    Lookup {
        #[command(flatten)]
        dump: DumpArgs,

        /// SS58 address to look up
        #[arg(short, long)]
        address: String,
    },

    /// Sign and submit a call, then wait for its outcome
    Submit {
        /// Path to the key dump holding the signer
        #[arg(short, long, env = "KEY_DUMP")]
        dump: Option<PathBuf>,

        /// Trust line positions only and ignore the label column
        #[arg(long)]
        positional: bool,

        /// SS58 address of the signer in the key dump
        #[arg(short, long, conflicts_with = "suri")]
        signer: Option<String>,

        /// Secret URI of the signer, e.g. //Alice
        #[arg(long)]
        suri: Option<String>,

        /// Pallet name, e.g. Balances
        #[arg(long)]
        pallet: String,

        /// Call name, e.g. transfer_keep_alive
        #[arg(long)]
        call: String,

        /// Call argument as kind:value (bool, u128, i128, str, bytes, id, addr), repeatable
        #[arg(long = "arg", value_name = "KIND:VALUE")]
        args: Vec<CallArg>,

        /// Node RPC endpoint
        #[arg(short, long, env = "NODE_RPC_URL", default_value = "ws://127.0.0.1:9944")]
        rpc: url::Url,

        /// Status that resolves the submission
        #[arg(long, value_enum, default_value_t = WaitFor::Finalized)]
        wait_for: WaitFor,

        /// Seconds to wait for a resolving status
        #[arg(long, env = "CONFIRMATION_TIMEOUT_SECS", default_value_t = 120)]
        timeout_secs: u64,

        /// Explicit nonce instead of the account's next index
        #[arg(long)]
        nonce: Option<u64>,

        /// Make the transaction mortal for this many blocks
        #[arg(long)]
        mortality: Option<u64>,
    },

    /// Print the peer id a node logged at startup
    PeerId {
        /// Path to the node's log
        #[arg(short, long)]
        log: PathBuf,

        /// Also print the bootnode multiaddr for this IP
        #[arg(long)]
        ip: Option<IpAddr>,

        /// P2P port used in the bootnode multiaddr
        #[arg(long, default_value_t = 30333)]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Initialize logger with fallback to info if RUST_LOG is not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command).await {
        error!("❌ {:#}", e);
        process::exit(1);
    }
}

/// Executes one subcommand.
async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Keys { dump, valid_only } => {
            let keyring = dump.load().await?;
            for (position, record) in keyring.all().iter().enumerate() {
                if record.is_valid() {
                    println!("{position}\t{}\tvalid", record.address);
                } else if !valid_only {
                    println!(
                        "{position}\t{}\tmissing {:?}",
                        record.address,
                        record.missing_fields()
                    );
                }
            }
        }
        Commands::Lookup { dump, address } => {
            let keyring = dump.load().await?;
            let record = keyring.get(&address)?;
            println!("Account ID:        {}", record.account_id);
            println!("Public key (hex):  {}", record.public_key_hex);
            println!("Public key (SS58): {}", record.public_key_ss58);
            println!("SS58 Address:      {}", record.address);
            println!("Usable signer:     {}", record.is_valid());
        }
        Commands::Submit {
            dump,
            positional,
            signer,
            suri,
            pallet,
            call,
            args,
            rpc,
            wait_for,
            timeout_secs,
            nonce,
            mortality,
        } => {
            let keyring = match dump {
                Some(dump) => DumpArgs { dump, positional }.load().await?,
                None => Keyring::new(),
            };

            let signer = match (signer, suri) {
                (Some(address), _) => SignerRef::Address(address),
                (None, Some(uri)) => SignerRef::Uri(uri),
                (None, None) => bail!("either --signer or --suri is required"),
            };

            let client = Arc::new(SubxtChainClient::connect(&rpc).await?);
            let submitter = TransactionSubmitter::new(
                client,
                Arc::new(keyring),
                SubmitterConfig {
                    policy: wait_for.into(),
                    timeout: Duration::from_secs(timeout_secs),
                },
            );

            let request = TransactionRequest::new(CallRequest::new(pallet, call, args), signer)
                .with_params(TxParams { nonce, mortality });

            let handle = submitter.submit(request).await?;
            let confirmation = handle.wait().await?;

            info!(
                "✅ Transaction {:?} reached {:?} in block {:?}",
                confirmation.tx_hash, confirmation.state, confirmation.block_hash
            );
            println!("{:?}\t{:?}", confirmation.tx_hash, confirmation.block_hash);
        }
        Commands::PeerId { log, ip, port } => {
            let peer_id = read_peer_id(&log).await?;
            match ip {
                Some(ip) => println!("{}", bootnode_address(ip, port, &peer_id)),
                None => println!("{peer_id}"),
            }
        }
    }

    Ok(())
}
