//! Conversation export pipeline.
//!
//! Two paginated fetch loops (all non-email traffic and email) run
//! concurrently against a [`MessageSource`](vault_core::MessageSource). Each
//! non-empty result set is rendered to CSV and handed to a
//! [`DownloadSink`].

pub mod assembler;
pub mod dates;
pub mod download;
pub mod email;
pub mod orchestrator;
pub mod range;
pub mod summary;

pub use assembler::{emails_to_csv, to_csv, CsvSchema};
pub use dates::format_csv_date;
pub use download::{export_filename, sanitize_filename, DirectorySink, DownloadSink};
pub use email::resolve_email;
pub use orchestrator::{fetch_channel, ExportJob, Exporter, FetchSettings};
pub use range::{validate_range, DateRangePreset};
pub use summary::{ExportSummary, ExportedFile, Notice, NoticeDetail, NoticeKind};
