use clap::Parser;
use log::{debug, error, info};
use thiserror::Error;

use config::{Config, ConfigError};
use storage::{DocumentStoreClient, StoreError};

use crate::walkthrough::run_walkthrough;

mod walkthrough;

#[derive(Parser, Debug)]
struct Args {
    /// Config file path. The MONGODB_* environment variables are used when it is omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Collection the walkthrough writes to
    #[arg(long, default_value = "USERS")]
    collection: String,
}

#[derive(Debug, Error)]
enum DocstoreError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Document store error: {0}")]
    Store(#[from] StoreError),
}

#[tokio::main]
async fn main() {
    simple_logger::SimpleLogger::new().env().init().unwrap();
    dotenv::dotenv().ok();

    let args = Args::parse();
    debug!("Args: {:?}", args);

    if let Err(e) = run(args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), DocstoreError> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    debug!("Config: {:?}", config);

    let mut client = DocumentStoreClient::new(config.database);
    client.connection().await?;

    client.set_collection_name(args.collection);
    info!("Collection name: {}", client.collection_name().unwrap_or_default());

    // Close before surfacing a failed step
    let result = run_walkthrough(&client).await;
    client.close_connection().await;

    let report = result?;
    info!("Walkthrough finished: {:?}", report);
    Ok(())
}
