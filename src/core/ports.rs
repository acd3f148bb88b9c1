use async_trait::async_trait;

use crate::core::domain::{Completion, CompletionRequest, ResultRecord};
use crate::core::error::Result;

/// Abstraction for interacting with an LLM provider.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one request and return the raw response. No retries happen here.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}

/// Destination for finished records.
pub trait RecordSink {
    /// Durably append one record before returning.
    fn append(&mut self, record: &ResultRecord) -> Result<()>;
}
