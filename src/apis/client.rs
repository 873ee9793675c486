/// Base HTTP plumbing shared by the API clients
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::errors::FetchError;
use crate::logger::{self, LogTag};

/// HTTP client wrapper with a per-upstream timeout.
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
        if timeout_secs == 0 {
            return Err(FetchError::Network(
                "timeout must be greater than zero".to_string(),
            ));
        }
        let timeout = Duration::from_secs(timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build http client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a GET request and decode the JSON body, mapping the failure
    /// space onto the fetch error taxonomy. HTTP 429 comes back as
    /// [`FetchError::RateLimited`] so the fetcher can run its bounded retry.
    pub async fn get_json<T>(&self, endpoint: &str, builder: RequestBuilder) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let response = builder
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("{}: {}", endpoint, e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            logger::warning(LogTag::Api, &format!("HTTP 429 on {}", endpoint));
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::InvalidResponse(format!("{}: {}", endpoint, e)))
    }
}
