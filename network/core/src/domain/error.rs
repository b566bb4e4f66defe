// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Failure Taxonomy
//!
//! Every component operation returns [`NetworkError`], a classified failure
//! carrying an [`ErrorKind`], a client-facing message and an optional cause.
//! Only the transport inspects the kind; it maps it to a wire code and logs
//! [`NetworkError::detail`], which includes the full cause chain.

use std::error::Error as StdError;
use thiserror::Error;

use crate::domain::repository::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing request fields
    InvalidParams,
    /// Operation not valid for the current state
    InvalidRequest,
    /// Referenced thread, agent or message does not exist
    NotFound,
    /// Pagination exhausted
    NoMore,
    /// Unexpected failure; the fallback for anything unclassified
    Internal,
    /// Failure that already carries its wire error code
    WireCode(i32),
}

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct NetworkError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

pub type NetworkResult<T> = Result<T, NetworkError>;

impl NetworkError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn no_more(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoMore, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::WireCode(code), message)
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Prefix the client-facing message, keeping kind and cause.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.message = format!("{}: {}", context.into(), self.message);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Message followed by every cause in the chain, `: `-separated.
    pub fn detail(&self) -> String {
        let mut detail = self.message.clone();
        let mut cause = self.source.as_deref().map(|e| e as &(dyn StdError + 'static));
        while let Some(err) = cause {
            detail.push_str(": ");
            detail.push_str(&err.to_string());
            cause = err.source();
        }
        detail
    }
}

/// Why a call-scoped operation was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl From<ContextError> for NetworkError {
    fn from(err: ContextError) -> Self {
        NetworkError::internal(err.to_string())
    }
}

impl From<RepositoryError> for NetworkError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => {
                NetworkError::not_found(format!("{} not found", what))
            }
            RepositoryError::Context(ctx) => ctx.into(),
            other => NetworkError::internal("storage failure").with_source(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_includes_cause_chain() {
        let err = NetworkError::internal("failed to add message")
            .with_source(RepositoryError::Database("connection reset".to_string()));
        assert_eq!(err.to_string(), "failed to add message");
        assert_eq!(err.detail(), "failed to add message: Database error: connection reset");
    }

    #[test]
    fn test_repository_errors_are_classified() {
        let err: NetworkError = RepositoryError::NotFound("thread 4".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "thread 4 not found");

        let err: NetworkError = RepositoryError::Serialization("bad json".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err: NetworkError = RepositoryError::Context(ContextError::DeadlineExceeded).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.message(), "context deadline exceeded");
    }
}
