//! Backend port for the Sankhya automation workflow.
//!
//! The runner only talks to the backend through [`SankhyaApi`]; the reqwest-based
//! [`HttpBackend`] is the production implementation.

mod http;
mod wire;

pub use http::HttpBackend;

use crate::model::{RoundResult, Summary, WorkflowParameters};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with `sucesso: false`.
    #[error("{0}")]
    Backend(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response (HTTP {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
    /// The request could not even be built; nothing reached the network.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Errors that abort a run instead of counting as a failed round.
    pub fn is_fatal(&self) -> bool {
        match self {
            ApiError::InvalidRequest(_) => true,
            ApiError::Transport(e) => e.is_builder(),
            _ => false,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[async_trait]
pub trait SankhyaApi: Send + Sync {
    /// Returns the backend's confirmation message.
    async fn verify_connections(&self) -> ApiResult<String>;

    /// Number of pending planning records in the range.
    async fn search_plans(&self, params: &WorkflowParameters) -> ApiResult<u64>;

    /// Backend-reported failures come back as `Ok` with `success == false`.
    async fn process_round(&self, params: &WorkflowParameters, round: u32)
        -> ApiResult<RoundResult>;

    async fn fetch_summary(&self) -> ApiResult<Summary>;

    async fn finalize_connections(&self) -> ApiResult<()>;
}
