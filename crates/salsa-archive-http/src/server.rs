use std::net::SocketAddr;
use std::sync::Arc;

use salsa_archive_store::Store;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::router::router;

/// Resolved server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
  /// Address to listen on.
  pub listen: SocketAddr,
}

/// Errors that can occur while running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
  #[error("failed to bind {addr}: {source}")]
  Bind {
    addr: SocketAddr,
    #[source]
    source: std::io::Error,
  },

  #[error("server error: {0}")]
  Io(#[from] std::io::Error),
}

/// Bind and serve until `cancel` fires, then drain in-flight requests.
pub async fn serve(
  config: ServerConfig,
  store: Arc<dyn Store>,
  cancel: CancellationToken,
) -> Result<(), ServeError> {
  let listener = TcpListener::bind(config.listen)
    .await
    .map_err(|source| ServeError::Bind {
      addr: config.listen,
      source,
    })?;
  info!(addr = %listener.local_addr()?, "archive server listening");

  axum::serve(listener, router(store))
    .with_graceful_shutdown(cancel.cancelled_owned())
    .await?;

  info!("archive server stopped");
  Ok(())
}
