use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;
use vault_core::Channel;
use vault_metrics::FetchSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedFile {
    pub channel: Channel,
    pub filename: String,
    pub path: PathBuf,
    pub records: usize,
}

/// Outcome of a completed export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSummary {
    pub export_id: Uuid,
    pub message_count: usize,
    pub email_count: usize,
    pub files: Vec<ExportedFile>,
    pub stats: FetchSummary,
}

impl ExportSummary {
    pub fn is_empty(&self) -> bool {
        self.message_count == 0 && self.email_count == 0
    }

    /// The notice shown to the operator once the export has finished.
    pub fn notice(&self) -> Notice {
        if self.is_empty() {
            return Notice::no_messages();
        }

        let both = self.message_count > 0 && self.email_count > 0;
        let details: Vec<NoticeDetail> = self
            .files
            .iter()
            .map(|file| {
                let items = match (file.channel, both) {
                    (Channel::All, true) => vec![format!(
                        "{} messages (SMS, WhatsApp, Calls, etc.)",
                        file.records
                    )],
                    (Channel::All, false) => vec![format!("{} messages exported", file.records)],
                    (Channel::Email, true) => vec![
                        format!("{} email messages with full metadata", file.records),
                        "Includes: Subject, From, To, CC, BCC".to_string(),
                    ],
                    (Channel::Email, false) => {
                        vec![format!("{} email messages with metadata", file.records)]
                    }
                };
                NoticeDetail {
                    title: file.filename.clone(),
                    items,
                }
            })
            .collect();

        let count = details.len();
        Notice {
            kind: NoticeKind::Success,
            title: "Export Complete!".to_string(),
            message: format!(
                "Downloaded {} CSV file{}:",
                count,
                if count > 1 { "s" } else { "" }
            ),
            details,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeDetail {
    pub title: String,
    pub items: Vec<String>,
}

/// User-facing notification for one export action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
    pub details: Vec<NoticeDetail>,
}

impl Notice {
    pub fn no_messages() -> Self {
        Self {
            kind: NoticeKind::Info,
            title: "No Messages".to_string(),
            message: "No messages found in this conversation.".to_string(),
            details: Vec::new(),
        }
    }

    pub fn failed() -> Self {
        Self {
            kind: NoticeKind::Error,
            title: "Export Failed".to_string(),
            message: "Failed to export messages from this conversation. Please try again."
                .to_string(),
            details: Vec::new(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        write!(f, "{}", self.message)?;
        for (i, detail) in self.details.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, detail.title)?;
            for item in &detail.items {
                write!(f, "\n     - {}", item)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn summary(messages: usize, emails: usize) -> ExportSummary {
        let mut files = Vec::new();
        if messages > 0 {
            files.push(ExportedFile {
                channel: Channel::All,
                filename: "x_messages_1.csv".into(),
                path: PathBuf::from("x_messages_1.csv"),
                records: messages,
            });
        }
        if emails > 0 {
            files.push(ExportedFile {
                channel: Channel::Email,
                filename: "x_emails_1.csv".into(),
                path: PathBuf::from("x_emails_1.csv"),
                records: emails,
            });
        }
        ExportSummary {
            export_id: Uuid::new_v4(),
            message_count: messages,
            email_count: emails,
            files,
            stats: FetchSummary {
                total_requests: 2,
                total_records: messages + emails,
                channels: HashMap::new(),
                elapsed_ms: 0,
            },
        }
    }

    #[test]
    fn test_single_file_notice() {
        let notice = summary(3, 0).notice();
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.message, "Downloaded 1 CSV file:");
        assert_eq!(notice.details[0].items, vec!["3 messages exported"]);
        assert!(notice.to_string().contains("3 messages exported"));
    }

    #[test]
    fn test_both_files_notice() {
        let notice = summary(4, 2).notice();
        assert_eq!(notice.message, "Downloaded 2 CSV files:");
        assert_eq!(notice.details[0].items, vec!["4 messages (SMS, WhatsApp, Calls, etc.)"]);
        assert_eq!(
            notice.details[1].items,
            vec![
                "2 email messages with full metadata",
                "Includes: Subject, From, To, CC, BCC"
            ]
        );
    }

    #[test]
    fn test_email_only_and_empty() {
        let notice = summary(0, 5).notice();
        assert_eq!(notice.details[0].items, vec!["5 email messages with metadata"]);

        assert_eq!(summary(0, 0).notice(), Notice::no_messages());
    }
}
