use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use nimbus_homeserver::{init_tracing_logs_if_set, DavServer};

#[derive(Parser, Debug)]
#[command(version, about = "Nimbus storage engine and WebDAV gateway")]
struct Cli {
    /// Path to the data directory. Created with a default config on first start.
    #[clap(short, long, default_value = "~/.nimbus")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    if let Err(e) = init_tracing_logs_if_set(&args.data_dir) {
        eprintln!("Failed to initialize tracing: {e}");
    }

    let server = DavServer::start_with_persistent_data_dir_path(args.data_dir).await?;
    tracing::info!("WebDAV gateway listening on {}", server.url());

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down WebDAV gateway");
    server.shutdown().await;

    Ok(())
}
