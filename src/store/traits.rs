use serde_json::Value;
use thiserror::Error;

use crate::logic::pagination::{LinkInfo, LinkParseError};
use crate::model::{Id, PageRequest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Non-success HTTP status, rendered like "404 Not Found"
    #[error("{status} {reason}")]
    Status { status: u16, reason: String },
    #[error("{0}")]
    Network(String),
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("invalid pagination header: {0}")]
    Link(#[from] LinkParseError),
}

impl TransportError {
    pub fn status(status: u16, reason: impl Into<String>) -> Self {
        Self::Status {
            status,
            reason: reason.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::status(404, "Not Found")
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// One page of a list response, rows still in wire form
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse {
    pub rows: Vec<Value>,
    pub links: LinkInfo,
    pub total_items: u64,
}

/// REST calls against `<base>/api/<resource>`
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// `GET /<resource>?page&size&sort`
    async fn list(&self, resource: &str, page: &PageRequest) -> Result<PageResponse, TransportError>;
    /// `GET /<resource>/{id}`
    async fn get(&self, resource: &str, id: Id) -> Result<Value, TransportError>;
    /// `POST /<resource>`, returns the created row
    async fn create(&self, resource: &str, body: Value) -> Result<Value, TransportError>;
    /// `PUT /<resource>`, returns the updated row
    async fn update(&self, resource: &str, body: Value) -> Result<Value, TransportError>;
    /// `DELETE /<resource>/{id}`
    async fn delete(&self, resource: &str, id: Id) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_verbatim() {
        assert_eq!(TransportError::not_found().to_string(), "404 Not Found");
        assert_eq!(
            TransportError::Network("connection refused".to_string()).to_string(),
            "connection refused"
        );
        let link: TransportError = LinkParseError::Empty.into();
        assert_eq!(
            link.to_string(),
            "invalid pagination header: link header must not be empty"
        );
    }
}
