//! HTTP access to the export-messages endpoint.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use vault_config::{ApiSettings, AuthSettings, VaultConfig};
use vault_core::{ExportPage, MessageSource, PageQuery, Result, VaultError};
use tracing::debug;

const EXPORT_MESSAGES_PATH: &str = "/api/export/messages";

/// Client for the export API, authenticated with the caller's session token.
pub struct ExportClient {
    client: reqwest::Client,
    endpoint: String,
}

impl std::fmt::Debug for ExportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ExportMessagesResponse {
    #[serde(default)]
    data: ExportPage,
}

impl ExportClient {
    pub fn new(api: &ApiSettings, auth: &AuthSettings) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", auth.session_token))
            .map_err(|e| VaultError::ConfigError(format!("Invalid session token: {}", e)))?;
        default_headers.insert(AUTHORIZATION, bearer);
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(api.timeout())
            .default_headers(default_headers)
            .build()
            .map_err(|e| VaultError::HttpError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: export_endpoint(&api.base_url),
        })
    }

    pub fn from_config(config: &VaultConfig) -> Result<Self> {
        Self::new(&config.api, &config.auth)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MessageSource for ExportClient {
    async fn fetch_page(&self, query: &PageQuery) -> Result<ExportPage> {
        debug!(
            "Requesting {} page for conversation {} (cursor: {:?})",
            query.channel, query.conversation_id, query.cursor
        );

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query_params(query))
            .send()
            .await
            .map_err(|e| VaultError::HttpError(format!("Failed to send HTTP request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let envelope: ExportMessagesResponse = response
            .json()
            .await
            .map_err(|e| VaultError::HttpError(format!("Failed to decode response: {}", e)))?;

        debug!(
            "Received {} records (next cursor: {:?})",
            envelope.data.messages.len(),
            envelope.data.pagination.cursor()
        );

        Ok(envelope.data)
    }
}

fn export_endpoint(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), EXPORT_MESSAGES_PATH)
}

/// Query string for one page. Optional parameters are left out entirely.
pub fn query_params(query: &PageQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("locationId", query.location_id.clone()),
        ("conversationId", query.conversation_id.clone()),
        ("limit", query.limit.to_string()),
    ];

    if let Some(cursor) = query.cursor.as_deref().filter(|c| !c.is_empty()) {
        params.push(("cursor", cursor.to_string()));
    }
    if let Some(channel) = query.channel.as_param() {
        params.push(("channel", channel.to_string()));
    }
    if let Some(range) = &query.date_range {
        params.push(("startDate", range.start_timestamp()));
        params.push(("endDate", range.end_timestamp()));
    }

    params
}

fn status_error(status: StatusCode, body: String) -> VaultError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            VaultError::AuthError(format!("{}: {}", status, body))
        }
        StatusCode::TOO_MANY_REQUESTS => VaultError::RateLimitError(body),
        _ => VaultError::ApiError {
            status: status.as_u16(),
            message: body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use vault_core::{Channel, DateRange, ExportRequest};

    fn settings(base_url: &str) -> (ApiSettings, AuthSettings) {
        (
            ApiSettings {
                base_url: base_url.to_string(),
                timeout_ms: 1000,
            },
            AuthSettings {
                session_token: "token".to_string(),
            },
        )
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let (api, auth) = settings("https://api.example.com/");
        let client = ExportClient::new(&api, &auth).unwrap();
        assert_eq!(client.endpoint(), "https://api.example.com/api/export/messages");
    }

    #[test]
    fn test_invalid_token_rejected() {
        let (api, mut auth) = settings("https://api.example.com");
        auth.session_token = "bad\ntoken".to_string();
        assert!(matches!(
            ExportClient::new(&api, &auth),
            Err(VaultError::ConfigError(_))
        ));
    }

    #[test]
    fn test_first_page_params() {
        let query = ExportRequest::new("conv1", "loc1").page(500, None);
        let params = query_params(&query);
        assert_eq!(
            params,
            vec![
                ("locationId", "loc1".to_string()),
                ("conversationId", "conv1".to_string()),
                ("limit", "500".to_string()),
            ]
        );
    }

    #[test]
    fn test_email_page_params_with_cursor_and_range() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        );
        let query = ExportRequest::new("conv1", "loc1")
            .with_channel(Channel::Email)
            .with_date_range(Some(range))
            .page(500, Some("cur".to_string()));
        let params = query_params(&query);

        assert!(params.contains(&("cursor", "cur".to_string())));
        assert!(params.contains(&("channel", "Email".to_string())));
        assert!(params.contains(&("startDate", "2024-02-01T00:00:00.000Z".to_string())));
        assert!(params.contains(&("endDate", "2024-02-29T23:59:59.999Z".to_string())));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            VaultError::AuthError(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, String::new()),
            VaultError::RateLimitError(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "upstream".into()),
            VaultError::ApiError { status: 502, .. }
        ));
    }

    #[test]
    fn test_envelope_decoding() {
        let envelope: ExportMessagesResponse = serde_json::from_str(
            r#"{"success":true,"data":{"messages":[{"id":"m1"}],"pagination":{"nextCursor":"n"}}}"#,
        )
        .unwrap();
        assert_eq!(envelope.data.messages.len(), 1);
        assert_eq!(envelope.data.pagination.cursor(), Some("n"));
    }
}
