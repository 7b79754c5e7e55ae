//! Metadata endpoints backing the archive listing pages.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use salsa_archive_store::{Page, SpectrumId, SpectrumSummary};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::router::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub limit: Option<String>,
  pub offset: Option<String>,
}

impl ListParams {
  pub fn page(&self) -> Result<Page, ApiError> {
    let limit = parse_optional(self.limit.as_deref(), "limit")?;
    let offset = parse_optional(self.offset.as_deref(), "offset")?;
    Ok(Page::new(limit, offset))
  }
}

fn parse_optional(value: Option<&str>, name: &str) -> Result<Option<u32>, ApiError> {
  value
    .map(|v| {
      v.parse::<u32>()
        .map_err(|_| ApiError::invalid(format!("{name} must be a non-negative integer")))
    })
    .transpose()
}

/// `GET /spectra/{id}`
#[instrument(name = "spectrum_summary", skip_all)]
pub async fn get_summary(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<SpectrumSummary>, ApiError> {
  let id = id
    .parse::<SpectrumId>()
    .map_err(|_| ApiError::invalid("id must be an integer"))?;
  let summary = state.store.get_summary(id).await?;
  debug!(%id, artifacts = summary.artifacts.len(), "read spectrum summary");
  Ok(Json(summary))
}

/// `GET /spectra?limit=..&offset=..`
#[instrument(name = "spectrum_list", skip_all)]
pub async fn list_summaries(
  State(state): State<AppState>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<SpectrumSummary>>, ApiError> {
  let Query(params) = params.map_err(|e| ApiError::invalid(e.body_text()))?;
  let page = params.page()?;
  let summaries = state.store.list_summaries(page).await?;
  debug!(
    limit = page.limit,
    offset = page.offset,
    count = summaries.len(),
    "listed spectra"
  );
  Ok(Json(summaries))
}

/// `GET /health`
pub async fn health() -> &'static str {
  "ok"
}
