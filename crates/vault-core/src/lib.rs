use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, SecondsFormat, TimeDelta};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod lenient;

/// Message transport category as far as export is concerned.
///
/// The API filters on a single `channel` value; leaving it out returns all
/// non-email traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    All,
    Email,
}

impl Channel {
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            Channel::All => None,
            Channel::Email => Some("Email"),
        }
    }

    /// Label used in file names and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Channel::All => "messages",
            Channel::Email => "emails",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Start of the first day, UTC, RFC 3339.
    pub fn start_timestamp(&self) -> String {
        self.start
            .and_time(NaiveTime::MIN)
            .and_utc()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Last millisecond of the final day, UTC, RFC 3339.
    pub fn end_timestamp(&self) -> String {
        let end_of_day = self.end.and_time(NaiveTime::MIN).and_utc() + TimeDelta::days(1)
            - TimeDelta::milliseconds(1);
        end_of_day.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Identifies one paginated fetch loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub conversation_id: String,
    pub location_id: String,
    pub channel: Channel,
    pub date_range: Option<DateRange>,
}

impl ExportRequest {
    pub fn new(conversation_id: impl Into<String>, location_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            location_id: location_id.into(),
            channel: Channel::All,
            date_range: None,
        }
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_date_range(mut self, date_range: Option<DateRange>) -> Self {
        self.date_range = date_range;
        self
    }

    pub fn page(&self, limit: usize, cursor: Option<String>) -> PageQuery {
        PageQuery {
            conversation_id: self.conversation_id.clone(),
            location_id: self.location_id.clone(),
            channel: self.channel,
            date_range: self.date_range,
            limit,
            cursor,
        }
    }
}

/// A single page request sent to the export-messages endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub conversation_id: String,
    pub location_id: String,
    pub channel: Channel,
    pub date_range: Option<DateRange>,
    pub limit: usize,
    pub cursor: Option<String>,
}

/// `dateAdded` as the API sends it: either epoch milliseconds or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Millis(i64),
    Text(String),
}

/// Recipient-style field that may be a scalar or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressField {
    Single(String),
    List(Vec<String>),
}

impl AddressField {
    /// An empty scalar is treated as missing; a list always counts, even empty.
    pub fn is_present(&self) -> bool {
        match self {
            AddressField::Single(s) => !s.is_empty(),
            AddressField::List(_) => true,
        }
    }

    pub fn into_values(self) -> Vec<String> {
        match self {
            AddressField::Single(s) => vec![s],
            AddressField::List(items) => items,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMeta {
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, deserialize_with = "lenient::address", skip_serializing_if = "Option::is_none")]
    pub to: Option<AddressField>,
    #[serde(default, deserialize_with = "lenient::address", skip_serializing_if = "Option::is_none")]
    pub cc: Option<AddressField>,
    #[serde(default, deserialize_with = "lenient::address", skip_serializing_if = "Option::is_none")]
    pub bcc: Option<AddressField>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMeta {
    #[serde(default, deserialize_with = "lenient::email_meta", skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailMeta>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, deserialize_with = "lenient::address", skip_serializing_if = "Option::is_none")]
    pub to: Option<AddressField>,
}

/// A message as returned by the export API. Consumed read-only.
///
/// Email-specific fields are optional and may instead live under
/// `meta.email`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub conversation_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub date_added: Option<DateValue>,
    #[serde(rename = "type", default, deserialize_with = "lenient::string")]
    pub message_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub direction: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub contact_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, deserialize_with = "lenient::address", skip_serializing_if = "Option::is_none")]
    pub to: Option<AddressField>,
    #[serde(default, deserialize_with = "lenient::address", skip_serializing_if = "Option::is_none")]
    pub cc: Option<AddressField>,
    #[serde(default, deserialize_with = "lenient::address", skip_serializing_if = "Option::is_none")]
    pub bcc: Option<AddressField>,
    #[serde(default, deserialize_with = "lenient::meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<MessageMeta>,
}

/// Email message with its extended metadata already resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailMessageRecord {
    pub message: MessageRecord,
    pub subject: String,
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(rename = "nextCursor", default, deserialize_with = "lenient::string")]
    pub next_cursor: Option<String>,
    #[serde(rename = "hasMore", default)]
    pub has_more: Option<bool>,
}

impl Pagination {
    /// The cursor for the next page, ignoring empty tokens.
    pub fn cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// One API response's worth of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPage {
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid date range: {0}")]
    DateRangeError(String),

    #[error("CSV error: {0}")]
    CsvError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VaultError>;

/// Anything that can serve pages of exported messages.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<ExportPage>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_page() {
        let page: ExportPage = serde_json::from_value(json!({
            "messages": [
                {
                    "id": "m1",
                    "conversationId": "c1",
                    "dateAdded": "2024-03-05T15:04:05.000Z",
                    "type": "TYPE_SMS",
                    "direction": "inbound",
                    "status": "delivered",
                    "body": "hello",
                    "contactId": "ct1"
                }
            ],
            "pagination": { "nextCursor": "abc", "hasMore": true }
        }))
        .unwrap();

        assert_eq!(page.messages.len(), 1);
        let msg = &page.messages[0];
        assert_eq!(msg.id.as_deref(), Some("m1"));
        assert_eq!(msg.message_type.as_deref(), Some("TYPE_SMS"));
        assert_eq!(
            msg.date_added,
            Some(DateValue::Text("2024-03-05T15:04:05.000Z".into()))
        );
        assert_eq!(page.pagination.cursor(), Some("abc"));
    }

    #[test]
    fn test_malformed_fields_become_absent() {
        let msg: MessageRecord = serde_json::from_value(json!({
            "id": 42,
            "body": { "unexpected": true },
            "dateAdded": [1, 2],
            "to": ["a@x.com", 7, null],
            "meta": "not-an-object"
        }))
        .unwrap();

        assert_eq!(msg.id.as_deref(), Some("42"));
        assert_eq!(msg.body, None);
        assert_eq!(msg.date_added, None);
        assert_eq!(
            msg.to,
            Some(AddressField::List(vec!["a@x.com".into(), "7".into()]))
        );
        assert_eq!(msg.meta, None);
    }

    #[test]
    fn test_nested_email_meta() {
        let msg: MessageRecord = serde_json::from_value(json!({
            "id": "m1",
            "meta": { "email": { "subject": "Hi", "to": "b@x.com" }, "from": "c@x.com" }
        }))
        .unwrap();

        let meta = msg.meta.unwrap();
        let email = meta.email.unwrap();
        assert_eq!(email.subject.as_deref(), Some("Hi"));
        assert_eq!(email.to, Some(AddressField::Single("b@x.com".into())));
        assert_eq!(meta.from.as_deref(), Some("c@x.com"));
    }

    #[test]
    fn test_missing_messages_and_empty_cursor() {
        let page: ExportPage =
            serde_json::from_value(json!({ "pagination": { "nextCursor": "" } })).unwrap();
        assert!(page.messages.is_empty());
        assert_eq!(page.pagination.cursor(), None);
    }

    #[test]
    fn test_date_range_timestamps() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        assert_eq!(range.start_timestamp(), "2024-01-01T00:00:00.000Z");
        assert_eq!(range.end_timestamp(), "2024-01-31T23:59:59.999Z");
    }

    #[test]
    fn test_request_page() {
        let request = ExportRequest::new("conv", "loc").with_channel(Channel::Email);
        let query = request.page(500, Some("next".into()));
        assert_eq!(query.channel.as_param(), Some("Email"));
        assert_eq!(query.limit, 500);
        assert_eq!(query.cursor.as_deref(), Some("next"));
        assert_eq!(Channel::All.as_param(), None);
    }
}
