//! CSV export of failed pages. Uses the `csv` crate for safe serialization.
//!
//! The export backs the manual-review report so operators can triage
//! failures in a spreadsheet.

use crate::domain::WikiPage;

/// Render pages that failed to migrate, with their errors, as CSV.
///
/// Columns: `PageId,Path,Error,RemoteUrl`. The remote URL column is empty
/// when the source listing did not provide one.
pub fn failed_pages_to_csv(failures: &[(WikiPage, String)]) -> Result<String, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());

    wtr.write_record(["PageId", "Path", "Error", "RemoteUrl"])?;

    for (page, error) in failures {
        let id = page.id.to_string();
        // The csv crate quotes commas and quotes; newlines still read badly
        // in spreadsheets, so flatten them.
        let clean_error = error.replace('\n', " ").replace('\r', "");
        let remote = page.remote_url.clone().unwrap_or_default();
        wtr.write_record([&id, &page.path, &clean_error, &remote])?;
    }

    wtr.flush()?;
    let bytes = wtr.into_inner().map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::Other,
            e.to_string(),
        ))
    })?;

    String::from_utf8(bytes).map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: i64, path: &str) -> WikiPage {
        WikiPage {
            id,
            path: path.to_string(),
            remote_url: None,
            last_modified: None,
        }
    }

    #[test]
    fn renders_header_and_rows() {
        let failures = vec![
            (page(1, "/Home"), "API error 500".to_string()),
            (page(2, "/Guides/Setup"), "edit rejected".to_string()),
        ];

        let csv = failed_pages_to_csv(&failures).unwrap();
        assert!(csv.starts_with("PageId,Path,Error,RemoteUrl"));
        assert!(csv.contains("1,/Home,API error 500,"));
        assert!(csv.contains("2,/Guides/Setup,edit rejected,"));
    }

    #[test]
    fn flattens_newlines_in_errors() {
        let failures = vec![(page(1, "/Home"), "line one\nline two".to_string())];

        let csv = failed_pages_to_csv(&failures).unwrap();
        assert!(csv.contains("line one line two"));
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn empty_failures_render_header_only() {
        let csv = failed_pages_to_csv(&[]).unwrap();
        assert_eq!(csv.trim_end(), "PageId,Path,Error,RemoteUrl");
    }
}
