//! SQL statements shared by the store implementations.
//!
//! Every statement is a fixed string. The artifact column is chosen by
//! matching on [`SpectrumKind`], never by formatting request input into SQL.

use crate::SpectrumKind;

const FETCH_FITS: &str = "SELECT file_fits FROM salsa_archive WHERE id = ?";
const FETCH_PNG: &str = "SELECT file_png FROM salsa_archive WHERE id = ?";
const FETCH_TXT: &str = "SELECT file_txt FROM salsa_archive WHERE id = ?";

/// Single-column lookup of one artifact by id.
pub(crate) fn fetch_artifact(kind: SpectrumKind) -> &'static str {
  match kind {
    SpectrumKind::FileFits => FETCH_FITS,
    SpectrumKind::FilePng => FETCH_PNG,
    SpectrumKind::FileTxt => FETCH_TXT,
  }
}

pub(crate) const GET_SUMMARY: &str = r#"
  SELECT id, observer, glon, glat, obsdate, obsfreq, bandwidth, int_time, telescope,
         LENGTH(file_fits) AS fits_len,
         LENGTH(file_png) AS png_len,
         LENGTH(file_txt) AS txt_len
  FROM salsa_archive
  WHERE id = ?
"#;

pub(crate) const LIST_SUMMARIES: &str = r#"
  SELECT id, observer, glon, glat, obsdate, obsfreq, bandwidth, int_time, telescope,
         LENGTH(file_fits) AS fits_len,
         LENGTH(file_png) AS png_len,
         LENGTH(file_txt) AS txt_len
  FROM salsa_archive
  ORDER BY obsdate DESC, id DESC
  LIMIT ? OFFSET ?
"#;

/// Implement [`Store`](crate::Store) for a store type with a `pool` field.
///
/// The statements above use `?` placeholders and portable SQL, so every sqlx
/// backend shares one body. Artifact columns are decoded as raw bytes whatever
/// their declared type.
macro_rules! impl_archive_store {
  ($store:ty) => {
    #[async_trait::async_trait]
    impl $crate::Store for $store {
      async fn fetch_artifact(
        &self,
        id: $crate::SpectrumId,
        kind: $crate::SpectrumKind,
      ) -> Result<bytes::Bytes, $crate::Error> {
        let row = sqlx::query_as::<_, (Option<Vec<u8>>,)>($crate::queries::fetch_artifact(kind))
          .bind(id)
          .fetch_optional(&self.pool)
          .await?
          .map(|(data,)| data);

        $crate::artifact_bytes(id, kind, row)
      }

      async fn get_summary(
        &self,
        id: $crate::SpectrumId,
      ) -> Result<$crate::SpectrumSummary, $crate::Error> {
        sqlx::query_as::<_, $crate::types::SummaryRow>($crate::queries::GET_SUMMARY)
          .bind(id)
          .fetch_optional(&self.pool)
          .await?
          .map($crate::SpectrumSummary::from)
          .ok_or($crate::Error::RecordNotFound(id))
      }

      async fn list_summaries(
        &self,
        page: $crate::Page,
      ) -> Result<Vec<$crate::SpectrumSummary>, $crate::Error> {
        let rows = sqlx::query_as::<_, $crate::types::SummaryRow>($crate::queries::LIST_SUMMARIES)
          .bind(i64::from(page.limit))
          .bind(i64::from(page.offset))
          .fetch_all(&self.pool)
          .await?;

        Ok(rows.into_iter().map($crate::SpectrumSummary::from).collect())
      }
    }
  };
}
