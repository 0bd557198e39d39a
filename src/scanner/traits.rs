//! Fetcher trait abstraction.
//!
//! Probe workers issue requests through a [`Fetcher`] built by a
//! [`FetcherFactory`], so the orchestrator can dispose of a worker's HTTP
//! client (and its pooled connections) and tests can swap in canned
//! responses.

use crate::error::{NetworkError, ScanResult};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// Outcome tag of a single probe, tallied by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Outcome {
    /// The target answered and its response was recorded.
    Completed,
    /// A result already existed and override was not requested.
    Skipped,
    /// The request failed, or its outcome could not be recorded.
    Errored,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Completed, Outcome::Skipped, Outcome::Errored];
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "Completed"),
            Self::Skipped => write!(f, "Skipped"),
            Self::Errored => write!(f, "Errored"),
        }
    }
}

/// An HTTP response reduced to what gets recorded.
#[derive(Debug, Clone, Default)]
pub struct FetchedResponse {
    pub status: u16,
    /// Header pairs in wire order; repeated names appear once per value.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl FetchedResponse {
    /// Value of the first `Content-Type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }
}

/// Performs one GET request.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedResponse, NetworkError>;
}

/// Builds fresh fetchers for worker slots.
pub trait FetcherFactory: Send + Sync {
    fn build(&self) -> ScanResult<Box<dyn Fetcher>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Completed.to_string(), "Completed");
        assert_eq!(Outcome::Skipped.to_string(), "Skipped");
        assert_eq!(Outcome::Errored.to_string(), "Errored");
    }

    #[test]
    fn test_content_type_lookup_ignores_case() {
        let response = FetchedResponse {
            status: 200,
            headers: vec![
                ("server".into(), "lighttpd".into()),
                ("Content-Type".into(), "text/html; charset=iso-8859-1".into()),
            ],
            body: Vec::new(),
        };
        assert_eq!(
            response.content_type(),
            Some("text/html; charset=iso-8859-1")
        );
        assert_eq!(FetchedResponse::default().content_type(), None);
    }

    #[test]
    fn test_outcome_order_is_stable() {
        let mut tags = vec![Outcome::Errored, Outcome::Completed, Outcome::Skipped];
        tags.sort();
        assert_eq!(tags, Outcome::ALL.to_vec());
    }
}
