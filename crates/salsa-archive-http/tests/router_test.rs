//! Integration tests driving the archive router end to end.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use bytes::Bytes;
use http_body_util::BodyExt;
use salsa_archive_http::router;
use salsa_archive_store::{
  Error, Page, SpectrumId, SpectrumKind, SpectrumSummary, SqliteStore, Store,
};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

/// In-memory store that counts every call.
#[derive(Default)]
struct RecordingStore {
  artifacts: HashMap<(i64, SpectrumKind), Vec<u8>>,
  calls: AtomicUsize,
}

impl RecordingStore {
  fn with(mut self, id: i64, kind: SpectrumKind, data: &[u8]) -> Self {
    self.artifacts.insert((id, kind), data.to_vec());
    self
  }

  fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Store for RecordingStore {
  async fn fetch_artifact(&self, id: SpectrumId, kind: SpectrumKind) -> Result<Bytes, Error> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let known = self.artifacts.keys().any(|(i, _)| *i == id.get());
    match self.artifacts.get(&(id.get(), kind)) {
      Some(data) if !data.is_empty() => Ok(Bytes::from(data.clone())),
      _ if known => Err(Error::ArtifactMissing { id, kind }),
      _ => Err(Error::RecordNotFound(id)),
    }
  }

  async fn get_summary(&self, id: SpectrumId) -> Result<SpectrumSummary, Error> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    Err(Error::RecordNotFound(id))
  }

  async fn list_summaries(&self, _page: Page) -> Result<Vec<SpectrumSummary>, Error> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    Ok(Vec::new())
  }
}

/// Store whose backend is always down.
struct FailingStore;

#[async_trait]
impl Store for FailingStore {
  async fn fetch_artifact(&self, _id: SpectrumId, _kind: SpectrumKind) -> Result<Bytes, Error> {
    Err(Error::Database(sqlx::Error::Protocol(
      "Access denied for user 'salsa_archive'@'localhost'".to_string(),
    )))
  }

  async fn get_summary(&self, _id: SpectrumId) -> Result<SpectrumSummary, Error> {
    Err(Error::Database(sqlx::Error::PoolTimedOut))
  }

  async fn list_summaries(&self, _page: Page) -> Result<Vec<SpectrumSummary>, Error> {
    Err(Error::Database(sqlx::Error::PoolClosed))
  }
}

async fn get(app: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Bytes) {
  let response = app
    .clone()
    .oneshot(Request::get(uri).body(Body::empty()).unwrap())
    .await
    .unwrap();
  let status = response.status();
  let headers = response.headers().clone();
  let body = response.into_body().collect().await.unwrap().to_bytes();
  (status, headers, body)
}

async fn sqlite_store() -> SqliteStore {
  let pool = SqlitePoolOptions::new()
    .max_connections(1)
    .idle_timeout(None)
    .max_lifetime(None)
    .connect("sqlite::memory:")
    .await
    .unwrap();
  let store = SqliteStore::new(pool);
  store.migrate().await.unwrap();
  store
}

async fn insert_txt(store: &SqliteStore, txt: &str) -> i64 {
  sqlx::query("INSERT INTO salsa_archive (observer, obsdate, file_txt) VALUES ('tester', 1, ?)")
    .bind(txt)
    .execute(store.pool())
    .await
    .unwrap()
    .last_insert_rowid()
}

#[tokio::test]
async fn test_download_txt_round_trips_bytes() {
  let text = "# SALSA spectrum\n1420.0\t3.25\n1420.1\t3.50\n\n";
  let store = Arc::new(RecordingStore::default().with(7, SpectrumKind::FileTxt, text.as_bytes()));
  let app = router(store.clone());

  let (status, headers, body) = get(&app, "/download?id=7&kind=file_txt").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
  assert_eq!(
    headers[header::CONTENT_DISPOSITION],
    "attachment; filename=\"spectrum_7.txt\""
  );
  assert!(headers.get("content-transfer-encoding").is_none());
  assert_eq!(&body[..], text.as_bytes());
  assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn test_download_binary_kinds() {
  let fits: &[u8] = b"SIMPLE  =                    T\0\0\xff\n";
  let png: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
  let store = Arc::new(
    RecordingStore::default()
      .with(3, SpectrumKind::FileFits, fits)
      .with(3, SpectrumKind::FilePng, png),
  );
  let app = router(store);

  let (status, headers, body) = get(&app, "/download?id=3&kind=file_fits").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
  assert_eq!(
    headers[header::CONTENT_DISPOSITION],
    "attachment; filename=\"spectrum_3.fits\""
  );
  assert_eq!(headers["content-transfer-encoding"], "binary");
  assert_eq!(&body[..], fits);

  let (status, headers, body) = get(&app, "/download?id=3&kind=file_png").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(headers[header::CONTENT_TYPE], "image/png");
  assert_eq!(
    headers[header::CONTENT_DISPOSITION],
    "attachment; filename=\"spectrum_3.png\""
  );
  assert_eq!(headers["content-transfer-encoding"], "binary");
  assert_eq!(&body[..], png);
}

#[tokio::test]
async fn test_unknown_kind_is_rejected_without_query() {
  let store = Arc::new(RecordingStore::default().with(1, SpectrumKind::FileTxt, b"x"));
  let app = router(store.clone());

  for uri in [
    "/download?id=1&kind=observer",
    "/download?id=1&kind=file_txt%20FROM%20salsa_archive%3B--",
    "/download?id=1&kind=",
    "/download?id=1",
  ] {
    let (status, _, _) = get(&app, uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
  }
  assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_non_numeric_id_is_rejected_without_query() {
  let store = Arc::new(RecordingStore::default().with(1, SpectrumKind::FileTxt, b"x"));
  let app = router(store.clone());

  for uri in [
    "/download?id=abc&kind=file_txt",
    "/download?id=1%20OR%201%3D1&kind=file_txt",
    "/download?id=&kind=file_txt",
    "/download?kind=file_txt",
  ] {
    let (status, _, _) = get(&app, uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
  }
  assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_missing_record_and_missing_artifact_are_404() {
  let store = Arc::new(RecordingStore::default().with(1, SpectrumKind::FileTxt, b"x"));
  let app = router(store);

  let (status, _, _) = get(&app, "/download?id=2&kind=file_txt").await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _, _) = get(&app, "/download?id=1&kind=file_png").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_storage_failure_does_not_leak_details() {
  let app = router(Arc::new(FailingStore));

  let (status, _, body) = get(&app, "/download?id=1&kind=file_fits").await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  let body = String::from_utf8(body.to_vec()).unwrap();
  assert_eq!(body, "internal server error");
  assert!(!body.contains("salsa_archive"));

  let (status, _, _) = get(&app, "/spectra/1").await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  let (status, _, _) = get(&app, "/spectra").await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_legacy_php_path() {
  let store = Arc::new(RecordingStore::default().with(11, SpectrumKind::FileFits, b"FITS"));
  let app = router(store);

  let (status, headers, body) = get(&app, "/download_spectrum.php?id=11&kind=file_fits").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    headers[header::CONTENT_DISPOSITION],
    "attachment; filename=\"spectrum_11.fits\""
  );
  assert_eq!(&body[..], b"FITS");

  let (status, _, _) = get(&app, "/download_spectrum.php?id=abc&kind=file_fits").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concurrent_downloads_do_not_cross() {
  let mut store = RecordingStore::default();
  for id in 1..=32 {
    let payload = format!("spectrum payload {id}\n").repeat(id as usize);
    store = store.with(id, SpectrumKind::FileTxt, payload.as_bytes());
  }
  let app = router(Arc::new(store));

  let handles: Vec<_> = (1..=32i64)
    .map(|id| {
      let app = app.clone();
      tokio::spawn(async move {
        let (status, headers, body) = get(&app, &format!("/download?id={id}&kind=file_txt")).await;
        (id, status, headers, body)
      })
    })
    .collect();

  for handle in handles {
    let (id, status, headers, body) = handle.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      headers[header::CONTENT_DISPOSITION],
      format!("attachment; filename=\"spectrum_{id}.txt\"").as_str()
    );
    let expected = format!("spectrum payload {id}\n").repeat(id as usize);
    assert_eq!(&body[..], expected.as_bytes());
  }
}

#[tokio::test]
async fn test_sqlite_backed_download() {
  let store = sqlite_store().await;
  let first = insert_txt(&store, "first\n").await;
  let second = insert_txt(&store, "second\n").await;
  let app = router(Arc::new(store));

  let (status, _, body) = get(&app, &format!("/download?id={first}&kind=file_txt")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(&body[..], b"first\n");

  let (status, _, body) = get(&app, &format!("/download?id={second}&kind=file_txt")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(&body[..], b"second\n");

  // Present row, NULL column.
  let (status, _, _) = get(&app, &format!("/download?id={first}&kind=file_fits")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _, _) = get(&app, "/download?id=9999&kind=file_txt").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sqlite_txt_download_is_byte_exact() {
  let store = sqlite_store().await;
  let latin1: &[u8] = b"# observer: J\xf6rgen\n1420.0 3.5\n";
  let id = sqlx::query("INSERT INTO salsa_archive (obsdate, file_txt) VALUES (1, ?)")
    .bind(latin1)
    .execute(store.pool())
    .await
    .unwrap()
    .last_insert_rowid();
  let app = router(Arc::new(store));

  let (status, headers, body) = get(&app, &format!("/download?id={id}&kind=file_txt")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
  assert_eq!(&body[..], latin1);
}

#[tokio::test]
async fn test_spectra_endpoints() {
  let store = sqlite_store().await;
  let id = insert_txt(&store, "spectrum").await;
  let app = router(Arc::new(store));

  let (status, headers, body) = get(&app, &format!("/spectra/{id}")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(headers[header::CONTENT_TYPE], "application/json");
  let summary: serde_json::Value = serde_json::from_slice(&body).unwrap();
  assert_eq!(summary["id"], id);
  assert_eq!(summary["observer"], "tester");
  assert_eq!(summary["artifacts"], serde_json::json!(["file_txt"]));

  let (status, _, body) = get(&app, "/spectra?limit=10").await;
  assert_eq!(status, StatusCode::OK);
  let list: Vec<SpectrumSummary> = serde_json::from_slice(&body).unwrap();
  assert_eq!(list.len(), 1);
  assert_eq!(list[0].id, SpectrumId::new(id));

  let (status, _, _) = get(&app, "/spectra/abc").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _, _) = get(&app, "/spectra/424242").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _, _) = get(&app, "/spectra?limit=lots").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_skips_storage() {
  let store = Arc::new(RecordingStore::default());
  let app = router(store.clone());

  let (status, _, body) = get(&app, "/health").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(&body[..], b"ok");
  assert_eq!(store.calls(), 0);
}
