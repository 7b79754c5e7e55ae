use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use salsa_archive_store::Store;
use tower_http::trace::TraceLayer;

use crate::download::download;
use crate::spectra::{get_summary, health, list_summaries};

/// Shared state handed to every handler.
///
/// Holds only the store handle; each request checks its own connection out
/// of the store's pool.
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
}

/// Build the archive router.
pub fn router(store: Arc<dyn Store>) -> Router {
  Router::new()
    .route("/download", get(download))
    .route("/download_spectrum.php", get(download))
    .route("/spectra", get(list_summaries))
    .route("/spectra/{id}", get(get_summary))
    .route("/health", get(health))
    .layer(TraceLayer::new_for_http())
    .with_state(AppState { store })
}
