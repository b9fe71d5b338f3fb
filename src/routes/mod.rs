//! HTTP client for the MealTimes REST API, one file per resource.

pub mod orders;
pub mod payments;
pub mod subscription_plans;
pub mod user_auth;

use crate::errors::ApiError;
use crate::middleware::request_logger::RequestLogger;
use log::error;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(ApiClient { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    /// Sends the request and returns the body of a 2xx response.
    async fn send_for_text(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = RequestLogger::send(request).await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("API request failed with {}: {}", status, body);
            return Err(ApiError::Status { status, body });
        }
        Ok(body)
    }
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        error!("Failed to parse API response: {}", e);
        error!("Response was: {}", body);
        ApiError::Decode(e)
    })
}

/// List endpoints answer either with a bare array or with `{ data: [...] }`.
fn parse_list<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, ApiError> {
    let value: Value = parse_json(body)?;
    let items = match value {
        Value::Object(mut envelope) => envelope.remove("data").unwrap_or(Value::Null),
        other => other,
    };
    if items.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(items)?)
}
