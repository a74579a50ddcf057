//! Reachability probe over HTTP.

use std::time::Duration;

use reqwest::Client;

use super::{NetworkProbe, NetworkState};
use crate::error::{Error, Result};

const PROBE_TIMEOUT_SECS: u64 = 4;

/// Considers the network online when `url` answers at all.
///
/// A connect failure means no connectivity; any other transport failure
/// (timeouts, TLS interception by captive portals) means connected but
/// unreachable.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    client: Client,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, Duration::from_secs(PROBE_TIMEOUT_SECS))
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = crate::util::normalize_text_option(Some(url.into()))
            .ok_or_else(|| Error::Config("probe URL must not be empty".to_string()))?;
        if !crate::util::is_http_url(&url) {
            return Err(Error::Config(
                "probe URL must include http:// or https://".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Config(format!("failed to build probe client: {error}")))?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl NetworkProbe for HttpProbe {
    async fn current(&self) -> NetworkState {
        match self.client.head(&self.url).send().await {
            Ok(_) => NetworkState::ONLINE,
            Err(error) if error.is_connect() => {
                tracing::debug!("Reachability probe could not connect: {}", error);
                NetworkState::OFFLINE
            }
            Err(error) => {
                tracing::debug!("Reachability probe failed: {}", error);
                NetworkState {
                    is_connected: true,
                    is_internet_reachable: Some(false),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_urls() {
        assert!(HttpProbe::new("").is_err());
        assert!(HttpProbe::new("demo.supabase.co").is_err());
        assert_eq!(
            HttpProbe::new(" https://demo.supabase.co/rest/v1 ")
                .unwrap()
                .url(),
            "https://demo.supabase.co/rest/v1"
        );
    }

    #[tokio::test]
    async fn unreachable_port_reports_offline() {
        let probe =
            HttpProbe::with_timeout("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        assert!(!probe.current().await.is_online());
    }
}
