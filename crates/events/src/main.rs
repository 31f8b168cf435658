//! Tansu contract event service binary

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use events::api::{self, AppState, DEFAULT_CORS_ORIGINS};
use events::config::{DatabaseArgs, RpcArgs, mask_url};
use events::ingest::{IngestOptions, ValueMode, run_ingestion};
use monitoring::{LogDestination, init_logging};
use soroban::SorobanClient;
use std::net::SocketAddr;
use std::sync::Arc;
use store::{InsertNotifier, SeaOrmStore, spawn_event_logger};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tansu-events")]
#[command(about = "Tansu contract event ingestion and query service", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    #[command(flatten)]
    database: DatabaseArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the event query API
    Serve {
        #[arg(long, env = "TANSU_LISTEN_ADDR", default_value = "127.0.0.1:8080")]
        listen_addr: SocketAddr,

        /// Comma separated origins allowed by CORS
        #[arg(long, env = "TANSU_CORS_ORIGINS", value_delimiter = ',')]
        cors_origins: Vec<String>,
    },

    /// Fetch contract events once and store the new ones
    Ingest {
        #[arg(long, env = "TANSU_CONTRACT_ID")]
        contract_id: String,

        #[command(flatten)]
        rpc: RpcArgs,

        /// First ledger to fetch; defaults to the stored watermark or a 20h lookback
        #[arg(long)]
        start_ledger: Option<u32>,

        #[arg(long, value_enum, default_value_t = ValueMode::Raw)]
        value_mode: ValueMode,
    },

    /// Create the tables if they are missing
    Migrate,

    /// Drop and recreate the tables, deleting every stored event
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let cli = Cli::parse();

    let _guard = init_logging(
        &format!(
            "tansu_events={0},events={0},store={0},soroban={0},scval={0},tower_http={0},sqlx=warn",
            cli.log_level
        ),
        LogDestination::from_env(),
    )?;

    let database_url = cli.database.url();
    info!("Database URL: {}", mask_url(&database_url));

    match cli.command {
        Commands::Serve {
            listen_addr,
            cors_origins,
        } => serve(&database_url, listen_addr, cors_origins).await,
        Commands::Ingest {
            contract_id,
            rpc,
            start_ledger,
            value_mode,
        } => {
            let options = IngestOptions {
                contract_id,
                start_ledger,
                value_mode,
            };
            ingest(&database_url, &rpc, &options).await
        }
        Commands::Migrate => {
            let store = SeaOrmStore::connect(&database_url).await?;
            store.create_schema().await?;
            info!("Event tables are ready");
            Ok(())
        }
        Commands::Reset { yes } => {
            if !yes {
                warn!("Reset deletes every stored event, pass --yes to confirm");
                return Ok(());
            }
            let store = SeaOrmStore::connect(&database_url).await?;
            store.reset_schema().await?;
            info!("Event tables dropped and recreated");
            Ok(())
        }
    }
}

async fn serve(database_url: &str, listen_addr: SocketAddr, cors_origins: Vec<String>) -> Result<()> {
    let cors_origins = if cors_origins.is_empty() {
        DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect()
    } else {
        cors_origins
    };
    info!("CORS origins: {}", cors_origins.join(", "));

    let store = SeaOrmStore::connect(database_url).await?;
    store.create_schema().await?;

    let router = api::create_router(AppState::new(Arc::new(store)), &cors_origins);
    api::serve(listen_addr, router).await
}

async fn ingest(database_url: &str, rpc: &RpcArgs, options: &IngestOptions) -> Result<()> {
    let (notifier, receiver) = InsertNotifier::channel();
    let listener = spawn_event_logger(receiver);

    let store = SeaOrmStore::connect(database_url)
        .await?
        .with_notifier(notifier);
    store.create_schema().await?;

    info!("Soroban RPC: {}", rpc.rpc_url);
    let client = SorobanClient::new(rpc.client_config()).context("Failed to build Soroban RPC client")?;

    let result = run_ingestion(&client, &store, options).await;

    // closes the channel so the listener drains and exits
    drop(store);
    if let Err(e) = listener.await {
        warn!("Event listener task failed: {}", e);
    }

    let report = result?;
    info!(
        "Ingestion finished: {} mapped, {} inserted, {} already stored, latest ledger {}",
        report.fetched, report.inserted, report.skipped, report.latest_ledger
    );
    Ok(())
}
