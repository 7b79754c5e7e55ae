use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use salsa_archive_http::{ServerConfig, serve};
use salsa_archive_store::{SqliteStore, Store};

/// SALSA archive - serves archived telescope spectra over HTTP
#[derive(Parser)]
#[command(name = "salsa-archive")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Archive database URL (sqlite://..., or mysql://... when built with `mysql`)
  #[arg(
    long,
    global = true,
    env = "DATABASE_URL",
    default_value = "sqlite://salsa_archive.db"
  )]
  database_url: String,

  /// Maximum number of pooled database connections
  #[arg(
    long,
    global = true,
    env = "SALSA_ARCHIVE_MAX_CONNECTIONS",
    default_value_t = 8
  )]
  max_connections: u32,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Serve archive artifacts over HTTP
  Serve {
    /// Address to listen on
    #[arg(long, env = "SALSA_ARCHIVE_LISTEN", default_value = "127.0.0.1:8080")]
    listen: SocketAddr,
  },

  /// Create the archive table in a SQLite database (development only)
  Migrate,
}

fn main() -> Result<()> {
  // A missing .env file is fine.
  dotenvy::dotenv().ok();
  init_tracing();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Serve { listen }) => {
      let config = ServerConfig { listen };
      run_server(config, cli.database_url, cli.max_connections)?;
    }
    Some(Commands::Migrate) => {
      run_migrate(cli.database_url, cli.max_connections)?;
    }
    None => {
      println!("salsa-archive - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn run_server(config: ServerConfig, database_url: String, max_connections: u32) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_server_async(config, database_url, max_connections).await })
}

async fn run_server_async(
  config: ServerConfig,
  database_url: String,
  max_connections: u32,
) -> Result<()> {
  let store = open_store(&database_url, max_connections).await?;

  let cancel = CancellationToken::new();
  tokio::spawn(shutdown_on_signal(cancel.clone()));

  serve(config, store, cancel)
    .await
    .context("archive server failed")?;

  Ok(())
}

fn run_migrate(database_url: String, max_connections: u32) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    if !database_url.starts_with("sqlite:") {
      bail!("migrate only supports sqlite databases; the production table is managed by the uploader");
    }

    let store = SqliteStore::connect(&database_url, max_connections)
      .await
      .context("failed to open archive database")?;
    store
      .migrate()
      .await
      .context("failed to run archive migrations")?;

    info!("archive schema is up to date");
    Ok(())
  })
}

/// Open the store named by the URL scheme. The URL itself is never logged,
/// it may carry credentials.
async fn open_store(database_url: &str, max_connections: u32) -> Result<Arc<dyn Store>> {
  let scheme = database_url.split(':').next().unwrap_or_default();

  match scheme {
    "sqlite" => {
      let store = SqliteStore::connect(database_url, max_connections)
        .await
        .context("failed to open sqlite archive")?;
      info!(scheme, max_connections, "archive store ready");
      Ok(Arc::new(store))
    }
    #[cfg(feature = "mysql")]
    "mysql" => {
      let store = salsa_archive_store::MySqlStore::connect(database_url, max_connections)
        .await
        .context("failed to open mysql archive")?;
      info!(scheme, max_connections, "archive store ready");
      Ok(Arc::new(store))
    }
    other => bail!("unsupported database scheme: {other:?}"),
  }
}

async fn shutdown_on_signal(cancel: CancellationToken) {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      warn!(error = %e, "failed to listen for ctrl-c");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
      Ok(mut sigterm) => {
        sigterm.recv().await;
      }
      Err(e) => {
        warn!(error = %e, "failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {}
    _ = terminate => {}
  }

  info!("shutdown requested");
  cancel.cancel();
}
