//! Supabase (`PostgREST`) implementation of the remote data gateway.

use std::fmt;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::{GatewayError, GatewayResult, Query, RemoteGateway};

#[derive(Clone)]
pub struct SupabaseGateway {
    rest_url: String,
    anon_key: String,
    access_token: Option<String>,
    client: Client,
}

impl fmt::Debug for SupabaseGateway {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SupabaseGateway")
            .field("rest_url", &self.rest_url)
            .field("anon_key", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl SupabaseGateway {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>) -> GatewayResult<Self> {
        let rest_url = normalize_rest_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(GatewayError::InvalidConfiguration(
                "Supabase anon key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            rest_url,
            anon_key,
            access_token: None,
            client: Client::builder().build()?,
        })
    }

    /// Act on behalf of a signed-in user instead of the anonymous role.
    #[must_use]
    pub fn with_access_token(mut self, access_token: Option<String>) -> Self {
        self.access_token = crate::util::normalize_text_option(access_token);
        self
    }

    /// REST root, also usable as a reachability endpoint.
    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .header("Accept", "application/json")
    }

    fn returning(&self, request: RequestBuilder) -> RequestBuilder {
        self.authorized(request)
            .header("Prefer", "return=representation")
    }

    async fn read_rows(response: Response) -> GatewayResult<Vec<Value>> {
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&body)? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            row @ Value::Object(_) => Ok(vec![row]),
            other => Err(GatewayError::InvalidResponse(format!(
                "expected rows, got {other}"
            ))),
        }
    }

    async fn read_first_row(response: Response) -> GatewayResult<Value> {
        Ok(Self::read_rows(response)
            .await?
            .into_iter()
            .next()
            .unwrap_or(Value::Null))
    }
}

impl RemoteGateway for SupabaseGateway {
    async fn insert(&self, table: &str, record: &Value) -> GatewayResult<Value> {
        let request = self.returning(self.client.post(self.table_url(table)).json(record));
        Self::read_first_row(request.send().await?).await
    }

    async fn update(&self, table: &str, id: &str, changes: &Value) -> GatewayResult<Value> {
        let request = self.returning(
            self.client
                .patch(self.table_url(table))
                .query(&[("id", format!("eq.{id}"))])
                .json(changes),
        );
        Self::read_first_row(request.send().await?).await
    }

    async fn delete(&self, table: &str, id: &str) -> GatewayResult<Value> {
        let request = self.authorized(
            self.client
                .delete(self.table_url(table))
                .query(&[("id", format!("eq.{id}"))]),
        );
        ensure_success(request.send().await?).await?;
        Ok(Value::Null)
    }

    async fn select(&self, query: &Query) -> GatewayResult<Vec<Value>> {
        let request = self.authorized(
            self.client
                .get(self.table_url(&query.table))
                .query(&query.to_params()),
        );
        Self::read_rows(request.send().await?).await
    }
}

pub fn normalize_rest_url(url: &str) -> GatewayResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(GatewayError::InvalidConfiguration(
            "Supabase URL must not be empty".to_string(),
        ));
    }
    if !crate::util::is_http_url(trimmed) {
        return Err(GatewayError::InvalidConfiguration(
            "Supabase URL must include http:// or https://".to_string(),
        ));
    }
    if trimmed.ends_with("/rest/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/rest/v1"))
    }
}

async fn ensure_success(response: Response) -> GatewayResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Api {
        status: status.as_u16(),
        message: parse_api_error(status, &body),
    })
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
    code: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorResponse>(body) {
        if let Some(message) = payload.message {
            let mut rendered = message.trim().to_string();
            if let Some(code) = payload.code {
                rendered = format!("{rendered} [{code}]");
            }
            if let Some(detail) = payload.details.or(payload.hint) {
                rendered = format!("{rendered}: {}", detail.trim());
            }
            return rendered;
        }
    }

    let trimmed = crate::util::compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_rest_url_appends_rest_path() {
        let normalized = normalize_rest_url("https://demo.supabase.co/").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/rest/v1");
    }

    #[test]
    fn normalize_rest_url_keeps_existing_rest_path() {
        let normalized = normalize_rest_url("https://demo.supabase.co/rest/v1").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/rest/v1");
    }

    #[test]
    fn normalize_rest_url_rejects_missing_scheme() {
        assert!(normalize_rest_url("demo.supabase.co").is_err());
        assert!(normalize_rest_url("  ").is_err());
    }

    #[test]
    fn gateway_rejects_empty_anon_key() {
        assert!(SupabaseGateway::new("https://demo.supabase.co", " ").is_err());
    }

    #[test]
    fn gateway_debug_redacts_keys() {
        let gateway = SupabaseGateway::new("https://demo.supabase.co", "anon-secret")
            .unwrap()
            .with_access_token(Some("user-secret".to_string()));
        let rendered = format!("{gateway:?}");
        assert!(!rendered.contains("anon-secret"));
        assert!(!rendered.contains("user-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn parse_api_error_prefers_postgrest_message() {
        let body = r#"{"message":"duplicate key value","code":"23505","details":"Key (id) exists."}"#;
        assert_eq!(
            parse_api_error(StatusCode::CONFLICT, body),
            "duplicate key value [23505]: Key (id) exists."
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }
}
