use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Identifier of a record in the archive table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct SpectrumId(i64);

impl SpectrumId {
  pub fn new(id: i64) -> Self {
    Self(id)
  }

  pub fn get(self) -> i64 {
    self.0
  }
}

impl fmt::Display for SpectrumId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for SpectrumId {
  type Err = ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    s.parse().map(Self)
  }
}

/// Which artifact of a record to read.
///
/// This is the only place that knows the column, file extension and content
/// type of each artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectrumKind {
  /// FITS file of the observation.
  FileFits,
  /// PNG plot of the spectrum.
  FilePng,
  /// Plain-text spectrum (one channel per line).
  FileTxt,
}

impl SpectrumKind {
  pub const ALL: [SpectrumKind; 3] = [Self::FileFits, Self::FilePng, Self::FileTxt];

  /// The request parameter value, which is also the column name.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::FileFits => "file_fits",
      Self::FilePng => "file_png",
      Self::FileTxt => "file_txt",
    }
  }

  pub fn extension(self) -> &'static str {
    match self {
      Self::FileFits => "fits",
      Self::FilePng => "png",
      Self::FileTxt => "txt",
    }
  }

  pub fn content_type(self) -> &'static str {
    match self {
      Self::FileFits => "application/octet-stream",
      Self::FilePng => "image/png",
      Self::FileTxt => "text/plain",
    }
  }

  /// Binary artifacts are served with `Content-Transfer-Encoding: binary`.
  pub fn is_binary(self) -> bool {
    !matches!(self, Self::FileTxt)
  }

  /// Download file name, e.g. `spectrum_42.fits`.
  pub fn file_name(self, id: SpectrumId) -> String {
    format!("spectrum_{}.{}", id, self.extension())
  }
}

impl fmt::Display for SpectrumKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A `kind` value outside the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown artifact kind: {0:?}")]
pub struct ParseKindError(pub String);

impl FromStr for SpectrumKind {
  type Err = ParseKindError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|kind| kind.as_str() == s)
      .ok_or_else(|| ParseKindError(s.to_string()))
  }
}

/// Metadata of one archive record, without the artifact bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumSummary {
  pub id: SpectrumId,
  pub observer: Option<String>,
  /// Galactic longitude in degrees, as written by the control program.
  pub glon: Option<String>,
  /// Galactic latitude in degrees, as written by the control program.
  pub glat: Option<String>,
  /// Observation time in unix seconds.
  pub obsdate: Option<i64>,
  /// Observing frequency in MHz.
  pub obsfreq: Option<f64>,
  /// Bandwidth in MHz.
  pub bandwidth: Option<f64>,
  /// Integration time in seconds.
  pub int_time: Option<f64>,
  pub telescope: Option<String>,
  /// Artifacts that are present (non-NULL and non-empty).
  pub artifacts: Vec<SpectrumKind>,
}

/// Row shape of the summary queries. Artifact columns are read as lengths.
#[derive(Debug, FromRow)]
pub(crate) struct SummaryRow {
  pub id: i64,
  pub observer: Option<String>,
  pub glon: Option<String>,
  pub glat: Option<String>,
  pub obsdate: Option<i64>,
  pub obsfreq: Option<f64>,
  pub bandwidth: Option<f64>,
  pub int_time: Option<f64>,
  pub telescope: Option<String>,
  pub fits_len: Option<i64>,
  pub png_len: Option<i64>,
  pub txt_len: Option<i64>,
}

impl From<SummaryRow> for SpectrumSummary {
  fn from(row: SummaryRow) -> Self {
    let present = |len: Option<i64>| len.is_some_and(|n| n > 0);
    let artifacts = [
      (SpectrumKind::FileFits, row.fits_len),
      (SpectrumKind::FilePng, row.png_len),
      (SpectrumKind::FileTxt, row.txt_len),
    ]
    .into_iter()
    .filter(|(_, len)| present(*len))
    .map(|(kind, _)| kind)
    .collect();

    Self {
      id: SpectrumId::new(row.id),
      observer: row.observer,
      glon: row.glon,
      glat: row.glat,
      obsdate: row.obsdate,
      obsfreq: row.obsfreq,
      bandwidth: row.bandwidth,
      int_time: row.int_time,
      telescope: row.telescope,
      artifacts,
    }
  }
}

/// A window into the summary listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub limit: u32,
  pub offset: u32,
}

impl Page {
  pub const DEFAULT_LIMIT: u32 = 50;
  pub const MAX_LIMIT: u32 = 500;

  /// Build a page, clamping `limit` to `1..=MAX_LIMIT`.
  pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
    Self {
      limit: limit
        .unwrap_or(Self::DEFAULT_LIMIT)
        .clamp(1, Self::MAX_LIMIT),
      offset: offset.unwrap_or(0),
    }
  }
}

impl Default for Page {
  fn default() -> Self {
    Self::new(None, None)
  }
}
