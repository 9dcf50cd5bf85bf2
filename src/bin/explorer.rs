use anyhow::Result;
use clap::{Parser, Subcommand};
use explorer_feed::config::Config;
use explorer_feed::query::commands::{
    AddressQuery, OverviewQuery, cmd_address, cmd_addresses, cmd_block, cmd_blocks, cmd_gas,
    cmd_latest_txns, cmd_overview, cmd_tokens, cmd_transfers, parse_address,
};
use explorer_feed::query::formatters::OutputFormat;
use explorer_feed::rpc::RpcClient;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "explorer")]
#[command(about = "Browse blocks, transactions and token activity of an EVM chain", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Current gas price and max priority fee
    Gas,
    /// Recent blocks, newest first
    Blocks {
        #[arg(long)]
        from: Option<u64>,
        #[arg(default_value = "10")]
        count: usize,
    },
    /// Most recent transactions of the latest blocks
    Txns {
        #[arg(long, default_value = "5")]
        blocks: usize,
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// One page of an address's transaction history
    Address {
        address: String,
        #[arg(long)]
        before: Option<u64>,
        #[arg(long)]
        after: Option<u64>,
        #[arg(long, default_value = "25")]
        page_size: usize,
    },
    /// Merged latest transactions of several addresses
    Feed {
        #[arg(required = true)]
        addresses: Vec<String>,
        #[arg(long, default_value = "25")]
        limit: usize,
    },
    /// Non-zero ERC-20 balances of an address
    Tokens { address: String },
    /// Net token movements of an address in one transaction
    Transfers {
        hash: String,
        address: String,
        #[arg(long)]
        block: u64,
    },
    /// Block details by hash
    Block { hash: String },
    /// Gas, latest blocks, latest transactions and favorite feed in one view
    Overview {
        #[arg(long, default_value = "5")]
        blocks: usize,
        #[arg(long, default_value = "10")]
        limit: usize,
        #[arg(long = "favorite")]
        favorites: Vec<String>,
        /// Redraw every N seconds, refetching once the cache interval has passed
        #[arg(long)]
        watch: Option<u64>,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());

    let config = Config::from_env()?;
    let client = RpcClient::new(&config.json_rpc_urls, config.request_timeout)?;
    info!(
        "RPC URLs: {} endpoint(s) configured, using {}",
        config.json_rpc_urls.len(),
        client.get_current_url()
    );

    if let Err(e) = run(cli.command, &client, &config, &format).await {
        error!("Command failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}

async fn run(
    command: Commands,
    client: &RpcClient,
    config: &Config,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        Commands::Gas => cmd_gas(client, format).await,
        Commands::Blocks { from, count } => cmd_blocks(client, from, count, format).await,
        Commands::Txns { blocks, limit } => cmd_latest_txns(client, blocks, limit, format).await,
        Commands::Address {
            address,
            before,
            after,
            page_size,
        } => {
            let query = AddressQuery {
                address,
                before,
                after,
                page_size,
            };
            cmd_address(client, query, format).await
        }
        Commands::Feed { addresses, limit } => cmd_addresses(client, &addresses, limit, format).await,
        Commands::Tokens { address } => {
            cmd_tokens(client, &address, &config.token_addresses, format).await
        }
        Commands::Transfers {
            hash,
            address,
            block,
        } => cmd_transfers(client, &hash, &address, block, format).await,
        Commands::Block { hash } => cmd_block(client, &hash, format).await,
        Commands::Overview {
            blocks,
            limit,
            favorites,
            watch,
        } => {
            let query = OverviewQuery {
                block_count: blocks,
                txn_limit: limit,
                favorites: favorites
                    .iter()
                    .map(|a| parse_address(a))
                    .collect::<Result<Vec<_>>>()?,
                interval: config.cache_interval,
            };
            cmd_overview(client, query, watch.map(Duration::from_secs), format).await
        }
        Commands::Config => {
            println!("RPC endpoints:    {}", config.json_rpc_urls.join(", "));
            println!("Request timeout:  {}s", config.request_timeout.as_secs());
            println!("Cache interval:   {}s", config.cache_interval.as_secs());
            println!("Tracked tokens:   {}", config.token_addresses.len());
            if config.ipfs_gateway_url.is_empty() {
                println!("IPFS gateway:     -");
            } else {
                println!("IPFS gateway:     {}", config.ipfs_gateway_url);
            }
            Ok(())
        }
    }
}
