use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use factly_api::FactlyApi;
use factly_service::{app, ServiceState};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "factly-service")]
#[command(about = "HTTP service for the Factly fact board")]
struct Args {
    #[arg(long, default_value = "./factly.sqlite3")]
    db: PathBuf,
    #[arg(long, default_value = "127.0.0.1:4017")]
    bind: SocketAddr,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(fmt::layer().compact()).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let state = ServiceState::new(FactlyApi::new(args.db));
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(bind = %args.bind, "factly service listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
