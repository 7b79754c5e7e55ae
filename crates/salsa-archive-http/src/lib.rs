//! SALSA Archive HTTP
//!
//! HTTP front of the spectrum archive. The main route streams one artifact
//! of one record:
//!
//! ```text
//! GET /download?id=42&kind=file_fits
//! ```
//!
//! `kind` is one of `file_fits`, `file_png` or `file_txt`. The response body
//! is the stored bytes, framed with a `Content-Disposition` attachment header
//! named `spectrum_<id>.<ext>` and the content type of the kind. The same
//! handler answers the legacy `/download_spectrum.php` path used by older
//! archive pages.
//!
//! `/spectra` and `/spectra/{id}` return record metadata as JSON.
//!
//! Failures map to 400 (bad parameters), 404 (missing record or artifact)
//! and 500 (storage failure). Storage errors are logged, never echoed.

mod download;
mod error;
mod router;
mod server;
mod spectra;

pub use download::{DownloadParams, FetchRequest, artifact_headers};
pub use error::ApiError;
pub use router::{AppState, router};
pub use server::{ServeError, ServerConfig, serve};
