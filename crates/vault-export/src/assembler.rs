//! Renders message records into CSV documents.
//!
//! Every data cell is quoted. Embedded quotes are doubled by the writer and
//! embedded line breaks are flattened to a single space beforehand, so each
//! record occupies exactly one line.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use vault_core::{EmailMessageRecord, MessageRecord, Result, VaultError};

use crate::dates::format_csv_date;
use crate::email::resolve_email;

const GENERIC_COLUMNS: [&str; 8] = [
    "Message Date",
    "Message ID",
    "Conversation ID",
    "Message Type",
    "Direction",
    "Status",
    "Message Body",
    "Contact ID",
];

const EMAIL_COLUMNS: [&str; 12] = [
    "Message Date",
    "Message ID",
    "Conversation ID",
    "Subject",
    "From",
    "To",
    "CC",
    "BCC",
    "Direction",
    "Status",
    "Message Body",
    "Contact ID",
];

const ADDRESS_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvSchema {
    Generic,
    Email,
}

impl CsvSchema {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            CsvSchema::Generic => &GENERIC_COLUMNS,
            CsvSchema::Email => &EMAIL_COLUMNS,
        }
    }

    pub fn header(&self) -> String {
        self.columns().join(",")
    }
}

fn cell(value: &str) -> String {
    value.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

fn opt_cell(value: &Option<String>) -> String {
    value.as_deref().map(cell).unwrap_or_default()
}

fn generic_row(message: &MessageRecord) -> Vec<String> {
    vec![
        format_csv_date(message.date_added.as_ref()),
        opt_cell(&message.id),
        opt_cell(&message.conversation_id),
        opt_cell(&message.message_type),
        opt_cell(&message.direction),
        opt_cell(&message.status),
        opt_cell(&message.body),
        opt_cell(&message.contact_id),
    ]
}

fn email_row(email: &EmailMessageRecord) -> Vec<String> {
    let message = &email.message;
    vec![
        format_csv_date(message.date_added.as_ref()),
        opt_cell(&message.id),
        opt_cell(&message.conversation_id),
        cell(&email.subject),
        cell(&email.from),
        cell(&email.to.join(ADDRESS_SEPARATOR)),
        cell(&email.cc.join(ADDRESS_SEPARATOR)),
        cell(&email.bcc.join(ADDRESS_SEPARATOR)),
        opt_cell(&message.direction),
        opt_cell(&message.status),
        opt_cell(&message.body),
        opt_cell(&message.contact_id),
    ]
}

fn render(header: String, rows: impl Iterator<Item = Vec<String>>) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| VaultError::CsvError(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| VaultError::CsvError(e.to_string()))?;
    let body = String::from_utf8(bytes).map_err(|e| VaultError::CsvError(e.to_string()))?;

    let mut document = header;
    if !body.is_empty() {
        document.push('\n');
        document.push_str(body.trim_end_matches('\n'));
    }
    Ok(document)
}

/// Header line plus one line per record, newline-joined, no trailing newline.
pub fn to_csv(records: &[MessageRecord], schema: CsvSchema) -> Result<String> {
    match schema {
        CsvSchema::Generic => render(schema.header(), records.iter().map(generic_row)),
        CsvSchema::Email => {
            let resolved: Vec<EmailMessageRecord> = records.iter().map(resolve_email).collect();
            emails_to_csv(&resolved)
        }
    }
}

pub fn emails_to_csv(records: &[EmailMessageRecord]) -> Result<String> {
    render(CsvSchema::Email.header(), records.iter().map(email_row))
}
