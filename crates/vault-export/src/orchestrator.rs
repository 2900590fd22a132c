use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use vault_config::ExportSettings;
use vault_core::{Channel, DateRange, ExportRequest, MessageRecord, MessageSource, Result};
use vault_metrics::FetchTracker;

use crate::assembler::{to_csv, CsvSchema};
use crate::download::{export_filename, sanitize_filename, DownloadSink};
use crate::summary::{ExportSummary, ExportedFile, Notice};

/// Pagination limits for one channel's fetch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub page_size: usize,
    pub max_batches: usize,
    pub cooldown: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            page_size: 500,
            max_batches: 20,
            cooldown: Duration::from_millis(300),
        }
    }
}

impl From<&ExportSettings> for FetchSettings {
    fn from(settings: &ExportSettings) -> Self {
        Self {
            page_size: settings.page_size,
            max_batches: settings.max_batches,
            cooldown: settings.cooldown(),
        }
    }
}

/// Page through one channel until the server runs dry or the batch cap is hit.
///
/// A page only continues the loop when it carries a cursor AND is full.
/// A full page without a cursor therefore ends the export even if the
/// server had more; that matches what the upstream API has always been
/// consumed with.
pub async fn fetch_channel<S>(
    source: &S,
    request: &ExportRequest,
    settings: &FetchSettings,
    tracker: &FetchTracker,
) -> Result<Vec<MessageRecord>>
where
    S: MessageSource + ?Sized,
{
    let mut cursor: Option<String> = None;
    let mut accumulated = Vec::new();
    let mut batch_count = 0;
    let mut has_more = true;

    while has_more && batch_count < settings.max_batches {
        let query = request.page(settings.page_size, cursor.take());
        let page = source.fetch_page(&query).await?;

        let batch_len = page.messages.len();
        tracker.record_batch(request.channel, batch_len);

        cursor = page.pagination.cursor().map(str::to_string);
        has_more = cursor.is_some() && batch_len == settings.page_size;
        accumulated.extend(page.messages);
        batch_count += 1;

        if has_more && batch_count < settings.max_batches {
            tokio::time::sleep(settings.cooldown).await;
        }
    }

    if has_more {
        warn!(
            "Stopped {} export after {} batches with more pages available ({} records)",
            request.channel,
            batch_count,
            accumulated.len()
        );
        tracker.mark_truncated(request.channel);
    }

    debug!(
        "Fetched {} {} records in {} batches",
        accumulated.len(),
        request.channel,
        batch_count
    );
    Ok(accumulated)
}

/// What to export: the caller's current conversation selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    pub conversation_id: String,
    pub location_id: String,
    pub contact_name: Option<String>,
    pub date_range: Option<DateRange>,
}

impl ExportJob {
    pub fn new(conversation_id: impl Into<String>, location_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            location_id: location_id.into(),
            contact_name: None,
            date_range: None,
        }
    }

    pub fn with_contact_name(mut self, name: Option<String>) -> Self {
        self.contact_name = name;
        self
    }

    pub fn with_date_range(mut self, range: Option<DateRange>) -> Self {
        self.date_range = range;
        self
    }

    fn request(&self, channel: Channel) -> ExportRequest {
        ExportRequest::new(&self.conversation_id, &self.location_id)
            .with_channel(channel)
            .with_date_range(self.date_range)
    }

    fn base_name(&self) -> String {
        match self.contact_name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => sanitize_filename(name),
            None => "messages".to_string(),
        }
    }
}

/// Drives both channel fetch loops and hands the results to the sink.
pub struct Exporter<S, D> {
    source: S,
    sink: D,
    settings: FetchSettings,
    download_pause: Duration,
}

impl<S, D> Exporter<S, D>
where
    S: MessageSource,
    D: DownloadSink,
{
    pub fn new(source: S, sink: D) -> Self {
        Self {
            source,
            sink,
            settings: FetchSettings::default(),
            download_pause: Duration::from_millis(500),
        }
    }

    pub fn from_settings(source: S, sink: D, settings: &ExportSettings) -> Self {
        Self {
            source,
            sink,
            settings: FetchSettings::from(settings),
            download_pause: settings.download_pause(),
        }
    }

    pub fn with_fetch_settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_download_pause(mut self, pause: Duration) -> Self {
        self.download_pause = pause;
        self
    }

    /// Fetch both channels concurrently, then write one CSV per non-empty channel.
    ///
    /// Any fetch failure aborts both channels before anything is written.
    pub async fn run(&self, job: &ExportJob) -> Result<ExportSummary> {
        let export_id = Uuid::new_v4();
        info!(
            "Starting export {} for conversation {} (location {})",
            export_id, job.conversation_id, job.location_id
        );

        let tracker = FetchTracker::new();
        let generic_request = job.request(Channel::All);
        let email_request = job.request(Channel::Email);

        let (messages, emails) = tokio::try_join!(
            fetch_channel(&self.source, &generic_request, &self.settings, &tracker),
            fetch_channel(&self.source, &email_request, &self.settings, &tracker),
        )?;

        let timestamp = Utc::now().timestamp_millis();
        let base_name = job.base_name();
        let mut files: Vec<ExportedFile> = Vec::new();

        for (channel, records, schema) in [
            (Channel::All, &messages, CsvSchema::Generic),
            (Channel::Email, &emails, CsvSchema::Email),
        ] {
            if records.is_empty() {
                continue;
            }
            if !files.is_empty() {
                tokio::time::sleep(self.download_pause).await;
            }

            let filename = export_filename(&base_name, channel, timestamp);
            match self.write_file(&filename, records, schema).await {
                Ok(path) => files.push(ExportedFile {
                    channel,
                    filename,
                    path,
                    records: records.len(),
                }),
                Err(e) => {
                    self.discard_all(&files).await;
                    return Err(e);
                }
            }
        }

        let summary = ExportSummary {
            export_id,
            message_count: messages.len(),
            email_count: emails.len(),
            files,
            stats: tracker.get_summary(),
        };

        info!(
            "Export {} finished: {} messages, {} emails, {} requests",
            export_id, summary.message_count, summary.email_count, summary.stats.total_requests
        );
        Ok(summary)
    }

    /// Run an export and reduce the outcome to the notice shown to the operator.
    pub async fn run_with_notice(&self, job: &ExportJob) -> (Option<ExportSummary>, Notice) {
        match self.run(job).await {
            Ok(summary) => {
                let notice = summary.notice();
                (Some(summary), notice)
            }
            Err(e) => {
                error!("Export failed for conversation {}: {}", job.conversation_id, e);
                (None, Notice::failed())
            }
        }
    }

    async fn write_file(
        &self,
        filename: &str,
        records: &[MessageRecord],
        schema: CsvSchema,
    ) -> Result<PathBuf> {
        let csv = to_csv(records, schema)?;
        self.sink.save(filename, &csv).await
    }

    async fn discard_all(&self, files: &[ExportedFile]) {
        for file in files {
            if let Err(e) = self.sink.discard(&file.path).await {
                warn!("Failed to remove {}: {}", file.path.display(), e);
            }
        }
    }
}
