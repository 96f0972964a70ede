// Port for the Helena CRM API
use crate::domain::helena::{Card, Contact, Metric, Panel};
use async_trait::async_trait;
use thiserror::Error;

/// Failure of one upstream call. Cloneable so the deduplicator can hand the
/// same error to every caller that joined the call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpstreamError {
    #[error("request to Helena failed: {0}")]
    Transport(String),
    #[error("request to Helena timed out")]
    Timeout,
    #[error("Helena responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode Helena response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

#[async_trait]
pub trait HelenaApi: Send + Sync {
    /// List every panel (pipeline), walking all pages
    async fn list_panels(&self) -> Result<Vec<Panel>, UpstreamError>;

    /// List every card on one panel
    async fn list_cards(&self, panel_id: &str) -> Result<Vec<Card>, UpstreamError>;

    /// List every contact
    async fn list_contacts(&self) -> Result<Vec<Contact>, UpstreamError>;

    /// List panel metrics
    async fn list_metrics(&self) -> Result<Vec<Metric>, UpstreamError>;
}
