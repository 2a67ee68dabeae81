//! Report artifacts: Markdown writer and CSV exports.

pub mod csv_export;
pub mod writer;

pub use csv_export::failed_pages_to_csv;
pub use writer::write_report;
