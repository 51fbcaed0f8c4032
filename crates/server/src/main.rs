use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use emberkv_common::{
    DEFAULT_AOF_PATH, DEFAULT_HOST, DEFAULT_PORT, MAX_CONNECTIONS, SWEEP_INTERVAL_SECS,
};
use emberkv_server::serve;
use emberkv_storage::{Db, DbConfig};

#[derive(Parser, Debug)]
#[command(name = "emberkv-server", about = "EmberKV: in-memory key-value store")]
struct Args {
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    #[arg(long, default_value_t = MAX_CONNECTIONS)]
    max_connections: usize,
    /// Arquivo do log append-only
    #[arg(long, value_name = "FILE", default_value = DEFAULT_AOF_PATH)]
    aof: PathBuf,
    /// Período do sweep de chaves expiradas, em segundos
    #[arg(long, value_name = "SECS", default_value_t = SWEEP_INTERVAL_SECS)]
    sweep_interval: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emberkv_server=info,emberkv_storage=info".into()),
        )
        .init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let db = Db::with_config(DbConfig {
        aof_path: Some(args.aof),
        sweep_interval: Duration::from_secs(args.sweep_interval),
    })
    .await;
    if !db.is_empty() {
        info!("{} chaves restauradas do AOF", db.len());
    }

    let listener = TcpListener::bind(&addr).await?;
    info!("EmberKV escutando em {addr}");

    serve(listener, db.clone(), args.max_connections, async {
        let _ = signal::ctrl_c().await;
    })
    .await;

    db.shutdown();
    Ok(())
}
