use std::str::FromStr;

use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use tracing::debug;

use crate::Error;

/// MySQL-based store implementation, for the production archive database.
pub struct MySqlStore {
  pool: MySqlPool,
}

impl MySqlStore {
  /// Create a new MySQL store with the given connection pool.
  pub fn new(pool: MySqlPool) -> Self {
    Self { pool }
  }

  /// Open a pool for `url` (e.g. `mysql://salsa_archive@localhost/salsa_drupal`).
  ///
  /// The archive table is owned by the upload side; no migrations are run.
  pub async fn connect(url: &str, max_connections: u32) -> Result<Self, Error> {
    let options = MySqlConnectOptions::from_str(url)?;
    let pool = MySqlPoolOptions::new()
      .max_connections(max_connections)
      .connect_with(options)
      .await?;
    debug!(max_connections, "opened mysql archive");
    Ok(Self::new(pool))
  }

  pub fn pool(&self) -> &MySqlPool {
    &self.pool
  }
}

impl_archive_store!(MySqlStore);
