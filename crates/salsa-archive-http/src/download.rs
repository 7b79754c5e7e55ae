//! The artifact fetch endpoint.

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use salsa_archive_store::{SpectrumId, SpectrumKind};
use serde::Deserialize;
use tracing::{Span, field, info, instrument};

use crate::error::ApiError;
use crate::router::AppState;

const CONTENT_TRANSFER_ENCODING: HeaderName = HeaderName::from_static("content-transfer-encoding");

/// Raw query string of a download request, before validation.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadParams {
  pub id: Option<String>,
  pub kind: Option<String>,
}

/// A validated download request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
  pub id: SpectrumId,
  pub kind: SpectrumKind,
}

impl FetchRequest {
  /// Validate both parameters. Nothing touches storage before this succeeds.
  pub fn parse(params: &DownloadParams) -> Result<Self, ApiError> {
    let id = params
      .id
      .as_deref()
      .ok_or_else(|| ApiError::invalid("missing id"))?
      .parse::<SpectrumId>()
      .map_err(|_| ApiError::invalid("id must be an integer"))?;

    let kind = params
      .kind
      .as_deref()
      .ok_or_else(|| ApiError::invalid("missing kind"))?
      .parse::<SpectrumKind>()
      .map_err(|_| ApiError::invalid("kind must be one of file_fits, file_png, file_txt"))?;

    Ok(Self { id, kind })
  }
}

/// Headers that frame an artifact download.
pub fn artifact_headers(request: FetchRequest) -> Result<HeaderMap, ApiError> {
  let FetchRequest { id, kind } = request;
  let disposition = format!("attachment; filename=\"{}\"", kind.file_name(id));

  let mut headers = HeaderMap::new();
  headers.insert(
    header::CONTENT_DISPOSITION,
    HeaderValue::try_from(disposition)?,
  );
  headers.insert(
    header::CONTENT_TYPE,
    HeaderValue::from_static(kind.content_type()),
  );
  if kind.is_binary() {
    headers.insert(CONTENT_TRANSFER_ENCODING, HeaderValue::from_static("binary"));
  }
  Ok(headers)
}

/// `GET /download?id=..&kind=..`, also mounted at `/download_spectrum.php`.
#[instrument(
  name = "download",
  skip_all,
  fields(id = field::Empty, kind = field::Empty)
)]
pub async fn download(
  State(state): State<AppState>,
  params: Result<Query<DownloadParams>, QueryRejection>,
) -> Result<Response, ApiError> {
  let Query(params) = params.map_err(|e| ApiError::invalid(e.body_text()))?;
  let request = FetchRequest::parse(&params)?;
  let span = Span::current();
  span.record("id", request.id.get());
  span.record("kind", request.kind.as_str());

  let data = state.store.fetch_artifact(request.id, request.kind).await?;
  info!(bytes = data.len(), "serving artifact");

  artifact_response(request, data)
}

fn artifact_response(request: FetchRequest, data: Bytes) -> Result<Response, ApiError> {
  let headers = artifact_headers(request)?;
  let mut response = Response::new(Body::from(data));
  *response.status_mut() = StatusCode::OK;
  *response.headers_mut() = headers;
  Ok(response)
}
