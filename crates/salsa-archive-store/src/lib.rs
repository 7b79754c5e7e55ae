//! SALSA Archive Store
//!
//! This crate provides read access to the SALSA spectrum archive. Every
//! uploaded observation is one row of the `salsa_archive` table, holding the
//! FITS file, a PNG plot and a plain-text spectrum next to the observation
//! metadata. Rows are written by the telescope control program; nothing in
//! this crate mutates them.
//!
//! The [`Store`] trait defines operations for:
//! - Fetching one artifact of a record by [`SpectrumKind`]
//! - Reading the metadata summary of a record
//! - Paging through record summaries

#[macro_use]
mod queries;
mod sqlite;
mod types;

#[cfg(feature = "mysql")]
mod mysql;

#[cfg(feature = "mysql")]
pub use mysql::MySqlStore;
pub use sqlite::SqliteStore;
pub use types::{Page, ParseKindError, SpectrumId, SpectrumKind, SpectrumSummary};

use async_trait::async_trait;
use bytes::Bytes;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// No record exists with the requested id.
  #[error("spectrum {0} not found")]
  RecordNotFound(SpectrumId),

  /// The record exists but the requested artifact is NULL or empty.
  #[error("spectrum {id} has no {kind} artifact")]
  ArtifactMissing { id: SpectrumId, kind: SpectrumKind },

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

impl Error {
  /// Whether this error means the requested data does not exist, as opposed
  /// to the backend failing.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::RecordNotFound(_) | Self::ArtifactMissing { .. })
  }
}

/// Read-only storage trait for the spectrum archive.
#[async_trait]
pub trait Store: Send + Sync {
  /// Fetch the raw bytes of one artifact.
  ///
  /// Issues exactly one query. The column is selected from a fixed set of
  /// statements by `kind`; `id` is bound as a parameter.
  async fn fetch_artifact(&self, id: SpectrumId, kind: SpectrumKind) -> Result<Bytes, Error>;

  /// Get the metadata summary of a record.
  async fn get_summary(&self, id: SpectrumId) -> Result<SpectrumSummary, Error>;

  /// List record summaries, newest observation first.
  async fn list_summaries(&self, page: Page) -> Result<Vec<SpectrumSummary>, Error>;
}

/// Turn the result of a single-column artifact lookup into the artifact bytes.
///
/// The outer `Option` is the row, the inner one the column value.
pub(crate) fn artifact_bytes(
  id: SpectrumId,
  kind: SpectrumKind,
  row: Option<Option<Vec<u8>>>,
) -> Result<Bytes, Error> {
  match row {
    None => Err(Error::RecordNotFound(id)),
    Some(None) => Err(Error::ArtifactMissing { id, kind }),
    Some(Some(data)) if data.is_empty() => Err(Error::ArtifactMissing { id, kind }),
    Some(Some(data)) => Ok(Bytes::from(data)),
  }
}
