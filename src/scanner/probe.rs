//! The probe worker: one target in, one outcome tag out.
//!
//! All side effects go through the [`ResultStore`]. Failures of the target
//! are recorded against it; failures of the store are logged. Neither ever
//! propagates to the orchestrator.

use super::page::PageSummary;
use super::traits::{Fetcher, Outcome};
use crate::error::{NetworkError, StorageResult};
use crate::storage::{ProbeRecord, ResultStore, WriteMode};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error};

/// Per-scan probe settings.
#[derive(Debug, Clone, Copy)]
pub struct ProbeOptions {
    /// Re-probe targets that already have a result.
    pub override_existing: bool,
    /// Hard upper bound on one request, on top of the client's own timeout.
    pub deadline: Duration,
}

/// Probe one target and record what happened.
pub async fn probe(
    store: &dyn ResultStore,
    fetcher: &dyn Fetcher,
    session: &str,
    url: &str,
    options: ProbeOptions,
) -> Outcome {
    match try_probe(store, fetcher, session, url, options).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(url, error = %e, "failed to record probe result");
            Outcome::Errored
        }
    }
}

async fn try_probe(
    store: &dyn ResultStore,
    fetcher: &dyn Fetcher,
    session: &str,
    url: &str,
    options: ProbeOptions,
) -> StorageResult<Outcome> {
    if store.has_result(session, url)? {
        if !options.override_existing {
            debug!(url, "already scanned, skipping");
            return Ok(Outcome::Skipped);
        }
        debug!(url, "rescanning existing entry");
    }

    let mode = if options.override_existing {
        WriteMode::Replace
    } else {
        WriteMode::Insert
    };

    debug!(url, "probing");
    let fetched = match timeout(options.deadline, fetcher.fetch(url)).await {
        Ok(result) => result,
        Err(_) => Err(NetworkError::Timeout(format!(
            "no response within {:.1}s",
            options.deadline.as_secs_f64()
        ))),
    };

    let response = match fetched {
        Ok(response) => response,
        Err(e) => {
            debug!(url, kind = e.kind(), error = %e, "probe failed");
            store.record_probe(
                session,
                url,
                &ProbeRecord::Failure {
                    error: e.to_string(),
                },
                &[],
                &[],
                mode,
            )?;
            return Ok(Outcome::Errored);
        }
    };

    let page = PageSummary::parse_with_content_type(&response.body, response.content_type());
    debug!(
        url,
        status = response.status,
        headers = response.headers.len(),
        links = page.links.len(),
        "saving response"
    );

    store.record_probe(
        session,
        url,
        &ProbeRecord::Success {
            status_code: response.status,
            page_title: page.title,
        },
        &response.headers,
        &page.links,
        mode,
    )?;

    Ok(Outcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::traits::FetchedResponse;
    use crate::storage::SqliteStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const URL: &str = "http://10.0.0.1:80";

    struct Canned {
        result: Result<FetchedResponse, NetworkError>,
        calls: AtomicUsize,
    }

    impl Canned {
        fn ok(body: &str) -> Self {
            Self {
                result: Ok(FetchedResponse {
                    status: 200,
                    headers: vec![
                        ("server".into(), "test".into()),
                        ("content-type".into(), "text/html".into()),
                    ],
                    body: body.as_bytes().to_vec(),
                }),
                calls: AtomicUsize::new(0),
            }
        }

        fn err(e: NetworkError) -> Self {
            Self {
                result: Err(e),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for Canned {
        async fn fetch(&self, _url: &str) -> Result<FetchedResponse, NetworkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct Hang;

    #[async_trait]
    impl Fetcher for Hang {
        async fn fetch(&self, _url: &str) -> Result<FetchedResponse, NetworkError> {
            std::future::pending().await
        }
    }

    fn options(override_existing: bool) -> ProbeOptions {
        ProbeOptions {
            override_existing,
            deadline: Duration::from_secs(5),
        }
    }

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_session("s", "10.0.0.0/30", "80").unwrap();
        store
    }

    #[tokio::test]
    async fn test_success_records_everything() {
        let store = store();
        let fetcher = Canned::ok(
            r#"<html><head><title>X</title></head><body><a href="/a">l</a></body></html>"#,
        );

        let outcome = probe(&store, &fetcher, "s", URL, options(false)).await;
        assert_eq!(outcome, Outcome::Completed);

        let rows = store.results("s", false).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status_code, Some(200));
        assert_eq!(rows[0].page_title.as_deref(), Some("X"));
        assert_eq!(rows[0].last_error, None);
        assert_eq!(store.headers("s", Some(URL)).unwrap().len(), 2);
        let links = store.links("s", Some(URL)).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link.as_deref(), Some("/a"));
    }

    #[tokio::test]
    async fn test_title_uses_declared_charset() {
        let store = store();
        let fetcher = Canned {
            result: Ok(FetchedResponse {
                status: 200,
                headers: vec![(
                    "content-type".into(),
                    "text/html; charset=iso-8859-1".into(),
                )],
                body: b"<title>Caf\xe9 Admin</title>".to_vec(),
            }),
            calls: AtomicUsize::new(0),
        };

        probe(&store, &fetcher, "s", URL, options(false)).await;
        let rows = store.results("s", false).unwrap();
        assert_eq!(rows[0].page_title.as_deref(), Some("Caf\u{e9} Admin"));
    }

    #[tokio::test]
    async fn test_failure_records_error_only() {
        let store = store();
        let fetcher = Canned::err(NetworkError::Connect("connection refused".into()));

        let outcome = probe(&store, &fetcher, "s", URL, options(false)).await;
        assert_eq!(outcome, Outcome::Errored);

        let rows = store.results("s", false).unwrap();
        assert_eq!(rows[0].status_code, None);
        assert!(rows[0]
            .last_error
            .as_deref()
            .unwrap()
            .contains("connection refused"));
        assert!(store.headers("s", None).unwrap().is_empty());
        assert!(store.links("s", None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_existing_result_is_skipped_without_io() {
        let store = store();
        let fetcher = Canned::ok("<title>X</title>");

        assert_eq!(
            probe(&store, &fetcher, "s", URL, options(false)).await,
            Outcome::Completed
        );
        assert_eq!(
            probe(&store, &fetcher, "s", URL, options(false)).await,
            Outcome::Skipped
        );
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.results("s", false).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_override_replaces_row() {
        let store = store();
        let first = Canned::ok(r#"<title>old</title><a href="/1">1</a><a href="/2">2</a>"#);
        probe(&store, &first, "s", URL, options(false)).await;

        let second = Canned::ok(r#"<title>new</title><a href="/3">3</a>"#);
        assert_eq!(
            probe(&store, &second, "s", URL, options(true)).await,
            Outcome::Completed
        );

        let rows = store.results("s", false).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].page_title.as_deref(), Some("new"));
        assert_eq!(store.links("s", Some(URL)).unwrap().len(), 1);
        assert_eq!(store.headers("s", Some(URL)).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_deadline_turns_hang_into_timeout() {
        let store = store();
        let opts = ProbeOptions {
            override_existing: false,
            deadline: Duration::from_millis(50),
        };

        assert_eq!(probe(&store, &Hang, "s", URL, opts).await, Outcome::Errored);
        let rows = store.results("s", false).unwrap();
        assert!(rows[0].last_error.as_deref().unwrap().starts_with("timed out"));
    }

    #[tokio::test]
    async fn test_storage_failure_is_contained() {
        // No session row, so the foreign key rejects the insert.
        let store = SqliteStore::open_in_memory().unwrap();
        let fetcher = Canned::ok("<title>X</title>");

        let outcome = probe(&store, &fetcher, "missing", URL, options(false)).await;
        assert_eq!(outcome, Outcome::Errored);
    }
}
