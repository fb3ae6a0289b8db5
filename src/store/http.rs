use log::{debug, warn};
use reqwest::header::LINK;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::logic::pagination::{parse_link_header, LinkInfo};
use crate::model::{Id, PageRequest};
use crate::store::traits::{PageResponse, Transport, TransportError};

pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// `Transport` over a JSON REST server reached with reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, TransportError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn resource_url(&self, resource: &str) -> String {
        format!("{}/api/{}", self.base_url, resource)
    }

    /// List URL with a cache buster so intermediaries never serve a stale page
    pub fn list_url(&self, resource: &str, page: &PageRequest) -> String {
        format!(
            "{}?{}&cacheBuster={}",
            self.resource_url(resource),
            page.query(),
            chrono::Utc::now().timestamp_millis()
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            warn!("{} answered {}", response.url(), status);
            Err(status_error(status))
        }
    }

    async fn json(response: Response) -> Result<Value, TransportError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

fn status_error(status: StatusCode) -> TransportError {
    TransportError::status(
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status"),
    )
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn list(&self, resource: &str, page: &PageRequest) -> Result<PageResponse, TransportError> {
        let url = self.list_url(resource, page);
        debug!("GET {}", url);
        let response = self.send(self.client.get(&url)).await?;

        let links = match response.headers().get(LINK) {
            Some(header) => {
                let header = header
                    .to_str()
                    .map_err(|e| TransportError::Decode(e.to_string()))?;
                parse_link_header(header)?
            }
            None => LinkInfo::single_page(),
        };
        let total_count = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        let rows = response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        Ok(PageResponse {
            total_items: total_count.unwrap_or(rows.len() as u64),
            rows,
            links,
        })
    }

    async fn get(&self, resource: &str, id: Id) -> Result<Value, TransportError> {
        let url = format!("{}/{}", self.resource_url(resource), id);
        debug!("GET {}", url);
        let response = self.send(self.client.get(&url)).await?;
        Self::json(response).await
    }

    async fn create(&self, resource: &str, body: Value) -> Result<Value, TransportError> {
        let url = self.resource_url(resource);
        debug!("POST {}", url);
        let response = self.send(self.client.post(&url).json(&body)).await?;
        Self::json(response).await
    }

    async fn update(&self, resource: &str, body: Value) -> Result<Value, TransportError> {
        let url = self.resource_url(resource);
        debug!("PUT {}", url);
        let response = self.send(self.client.put(&url).json(&body)).await?;
        Self::json(response).await
    }

    async fn delete(&self, resource: &str, id: Id) -> Result<(), TransportError> {
        let url = format!("{}/{}", self.resource_url(resource), id);
        debug!("DELETE {}", url);
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }
}
