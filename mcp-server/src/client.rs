use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Error returned when a country lookup cannot produce a record list.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Failed to send request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Upstream returned status {0}")]
    Status(StatusCode),

    #[error("Failed to parse response: {0}")]
    Parse(#[source] reqwest::Error),
}

/// Source of country records, looked up by name.
#[async_trait]
pub trait CountryLookup: Send + Sync {
    /// Fetch all records matching `country_name`.
    async fn lookup(&self, country_name: &str) -> Result<Vec<Value>, LookupError>;
}

/// HTTP client for the REST Countries API
#[derive(Clone, Debug)]
pub struct RestCountriesClient {
    base_url: String,
    client: Client,
}

impl RestCountriesClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, country_name: &str) -> Result<Vec<Value>, LookupError> {
        let url = format!(
            "{}/name/{}",
            self.base_url,
            urlencoding::encode(country_name)
        );
        debug!("Fetching country data from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(LookupError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }

        response.json().await.map_err(LookupError::Parse)
    }
}

#[async_trait]
impl CountryLookup for RestCountriesClient {
    async fn lookup(&self, country_name: &str) -> Result<Vec<Value>, LookupError> {
        self.fetch(country_name).await.inspect_err(|e| {
            error!("Failed to fetch country data for '{}': {}", country_name, e);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
    use serde_json::json;

    async fn fake_name_endpoint(Path(name): Path<String>) -> axum::response::Response {
        match name.as_str() {
            "France" => Json(json!([
                {"name": {"common": "France"}, "cca2": "FR"},
                {"name": {"common": "French Guiana"}, "cca2": "GF"}
            ]))
            .into_response(),
            "United States" => Json(json!([{"name": {"common": "United States"}}])).into_response(),
            "garbage" => "definitely not json".into_response(),
            _ => (
                StatusCode::NOT_FOUND,
                Json(json!({"status": 404, "message": "Not Found"})),
            )
                .into_response(),
        }
    }

    async fn spawn_upstream() -> String {
        let router = Router::new().route("/name/{name}", get(fake_name_endpoint));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: String) -> RestCountriesClient {
        RestCountriesClient::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_returns_all_matches() {
        let client = client(spawn_upstream().await);
        let records = client.lookup("France").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"]["common"], "France");
    }

    #[tokio::test]
    async fn test_lookup_encodes_name() {
        let client = client(spawn_upstream().await);
        let records = client.lookup("United States").await.unwrap();
        assert_eq!(records[0]["name"]["common"], "United States");
    }

    #[tokio::test]
    async fn test_lookup_not_found_is_status_error() {
        let client = client(spawn_upstream().await);
        let err = client.lookup("Atlantis").await.unwrap_err();
        assert!(matches!(err, LookupError::Status(StatusCode::NOT_FOUND)));
    }

    #[tokio::test]
    async fn test_lookup_invalid_body_is_parse_error() {
        let client = client(spawn_upstream().await);
        let err = client.lookup("garbage").await.unwrap_err();
        assert!(matches!(err, LookupError::Parse(_)));
    }

    #[tokio::test]
    async fn test_lookup_unreachable_is_request_error() {
        let client = client("http://127.0.0.1:1".to_string());
        let err = client.lookup("France").await.unwrap_err();
        assert!(matches!(err, LookupError::Request(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = client("https://restcountries.com/v3.1/".to_string());
        assert_eq!(client.base_url(), "https://restcountries.com/v3.1");
    }
}
