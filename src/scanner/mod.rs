//! Scanner module - runs a sweep over every target of a range.
//!
//! The orchestrator enumerates targets lazily, hands them to a fixed pool of
//! worker tasks and tallies their outcome tags in completion order. Workers
//! pull the next target from a shared cursor, so at most `threads` probes are
//! in flight at any time.

pub mod http;
pub mod page;
pub mod probe;
pub mod rate_limiter;
pub mod traits;

use crate::error::{ScanError, ScanResult};
use crate::storage::ResultStore;
use crate::types::{NetworkRange, PortSpec, SessionName, TargetIter, Targets};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

pub use http::{HttpConfig, HttpFetcher, HttpFetcherFactory, DEFAULT_USER_AGENT};
pub use page::PageSummary;
pub use probe::{probe, ProbeOptions};
pub use rate_limiter::RateLimiter;
pub use traits::{FetchedResponse, Fetcher, FetcherFactory, Outcome};

/// Slack added to the request timeout before a probe is abandoned.
const PROBE_GRACE: Duration = Duration::from_secs(5);

/// Extra time the collector waits beyond one probe deadline, covering a
/// store write stuck behind a busy database.
const COLLECT_GRACE: Duration = Duration::from_secs(30);

/// Longest request timeout a job accepts.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration for one scan run.
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub session: SessionName,
    pub range: NetworkRange,
    pub ports: PortSpec,
    /// Number of worker slots.
    pub threads: usize,
    /// Request timeout handed to the HTTP client.
    pub timeout: Duration,
    pub override_existing: bool,
    /// Probes a worker serves before its fetcher is rebuilt.
    pub recycle_after: usize,
    /// Requests per second across all workers, 0 for unlimited.
    pub rate_limit: u32,
    pub show_progress: bool,
    /// How long the collector waits for any outcome before declaring the
    /// scan stalled; derived from the timeout when unset.
    pub stall_timeout: Option<Duration>,
}

impl ScanJob {
    pub fn new(session: SessionName, range: NetworkRange, ports: PortSpec) -> Self {
        Self {
            session,
            range,
            ports,
            threads: 5,
            timeout: Duration::from_secs(5),
            override_existing: false,
            recycle_after: 1,
            rate_limit: 0,
            show_progress: false,
            stall_timeout: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.min(MAX_TIMEOUT);
        self
    }

    pub fn with_override(mut self, override_existing: bool) -> Self {
        self.override_existing = override_existing;
        self
    }

    pub fn with_recycle_after(mut self, probes: usize) -> Self {
        self.recycle_after = probes.max(1);
        self
    }

    pub fn with_rate_limit(mut self, rate: u32) -> Self {
        self.rate_limit = rate;
        self
    }

    pub fn with_progress(mut self) -> Self {
        self.show_progress = true;
        self
    }

    pub fn with_stall_timeout(mut self, window: Duration) -> Self {
        self.stall_timeout = Some(window);
        self
    }

    pub fn targets(&self) -> Targets {
        Targets::new(self.range, self.ports.clone())
    }

    fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            override_existing: self.override_existing,
            deadline: self.timeout.saturating_add(PROBE_GRACE),
        }
    }

    /// Collector liveness window: one probe deadline plus store slack plus
    /// one rate-limit interval per worker.
    fn liveness(&self, pace: Duration) -> Duration {
        self.stall_timeout.unwrap_or_else(|| {
            let paced = pace.saturating_mul(u32::try_from(self.threads).unwrap_or(u32::MAX));
            self.probe_options()
                .deadline
                .saturating_add(COLLECT_GRACE)
                .saturating_add(paced)
        })
    }
}

/// Tally of a finished (or interrupted) scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub session: String,
    /// Whether this run created the session.
    pub session_created: bool,
    /// Number of enumerated targets.
    pub total: u64,
    pub counts: BTreeMap<Outcome, u64>,
    pub elapsed: Duration,
    /// Set when dispatch stopped early on cancellation.
    pub interrupted: bool,
}

impl ScanSummary {
    fn new(session: &SessionName, session_created: bool, total: u64) -> Self {
        Self {
            session: session.to_string(),
            session_created,
            total,
            counts: BTreeMap::new(),
            elapsed: Duration::ZERO,
            interrupted: false,
        }
    }

    fn record(&mut self, outcome: Outcome) {
        *self.counts.entry(outcome).or_insert(0) += 1;
    }

    /// Number of probes tallied with this outcome.
    pub fn count(&self, outcome: Outcome) -> u64 {
        self.counts.get(&outcome).copied().unwrap_or(0)
    }

    /// Number of probes that finished, whatever their outcome.
    pub fn finished(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Everything a worker task needs, shared between slots.
struct WorkerShared {
    session: String,
    queue: Mutex<TargetIter>,
    store: Arc<dyn ResultStore>,
    fetchers: Arc<dyn FetcherFactory>,
    limiter: Option<RateLimiter>,
    options: ProbeOptions,
    recycle_after: usize,
    cancel: CancellationToken,
}

/// Execute a complete scan.
///
/// Creates the session if needed, probes every target with at most
/// `job.threads` requests in flight and returns the outcome tally. Cancelling
/// `cancel` stops dispatch; probes already started run to completion.
pub async fn run_scan(
    job: ScanJob,
    store: Arc<dyn ResultStore>,
    fetchers: Arc<dyn FetcherFactory>,
    cancel: CancellationToken,
) -> ScanResult<ScanSummary> {
    let start = Instant::now();
    let targets = job.targets();
    let total = targets.len();

    let created = store.create_session(
        job.session.as_str(),
        &job.range.to_string(),
        &job.ports.to_string(),
    )?;
    if created {
        info!(session = %job.session, network = %job.range, ports = %job.ports, "recorded new session");
    } else {
        info!(session = %job.session, "using existing session");
    }

    let mut summary = ScanSummary::new(&job.session, created, total);
    if total == 0 {
        return Ok(summary);
    }

    // Fail on a bad client configuration before anything is dispatched.
    drop(fetchers.build()?);

    let limiter = RateLimiter::from_setting(job.rate_limit);
    let pace = limiter
        .as_ref()
        .map(RateLimiter::interval)
        .unwrap_or_default();
    let options = job.probe_options();
    let liveness = job.liveness(pace);

    let shared = Arc::new(WorkerShared {
        session: job.session.to_string(),
        queue: Mutex::new(targets.iter()),
        store,
        fetchers,
        limiter,
        options,
        recycle_after: job.recycle_after.max(1),
        cancel: cancel.clone(),
    });

    let progress = progress_bar(total, job.show_progress);
    let slots = (job.threads.max(1) as u64).min(total) as usize;
    let (tx, mut rx) = mpsc::channel::<Outcome>(slots * 2);

    debug!(targets = total, workers = slots, "dispatching");
    let workers: Vec<JoinHandle<ScanResult<()>>> = (0..slots)
        .map(|id| tokio::spawn(worker(id, Arc::clone(&shared), tx.clone())))
        .collect();
    drop(tx);

    loop {
        match tokio::time::timeout(liveness, rx.recv()).await {
            Ok(Some(outcome)) => {
                summary.record(outcome);
                progress.inc(1);
            }
            Ok(None) => break,
            Err(_) => {
                cancel.cancel();
                for handle in &workers {
                    handle.abort();
                }
                progress.abandon_with_message("stalled");
                return Err(ScanError::Stalled {
                    completed: summary.finished(),
                    total,
                    waited_secs: liveness.as_secs(),
                });
            }
        }
    }

    for result in futures::future::join_all(workers).await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(e) => return Err(ScanError::Worker(e.to_string())),
        }
    }

    summary.interrupted = cancel.is_cancelled() && summary.finished() < total;
    summary.elapsed = start.elapsed();

    if summary.interrupted {
        progress.abandon_with_message("interrupted");
        warn!(
            finished = summary.finished(),
            total, "scan interrupted before all targets were dispatched"
        );
    } else {
        progress.finish_with_message("scan complete");
    }

    Ok(summary)
}

/// One worker slot: pull a target, probe it, report, repeat.
async fn worker(
    id: usize,
    shared: Arc<WorkerShared>,
    tx: mpsc::Sender<Outcome>,
) -> ScanResult<()> {
    let mut fetcher = shared.fetchers.build()?;
    let mut served = 0usize;

    loop {
        if shared.cancel.is_cancelled() {
            break;
        }

        let next = shared.queue.lock().await.next();
        let Some(target) = next else { break };

        if let Some(limiter) = &shared.limiter {
            tokio::select! {
                _ = limiter.wait() => {}
                _ = shared.cancel.cancelled() => break,
            }
        }

        if served >= shared.recycle_after {
            fetcher = shared.fetchers.build()?;
            served = 0;
            trace!(worker = id, "fetcher recycled");
        }

        let outcome = probe(
            shared.store.as_ref(),
            fetcher.as_ref(),
            &shared.session,
            &target.url,
            shared.options,
        )
        .await;
        served += 1;

        if tx.send(outcome).await.is_err() {
            break;
        }
    }

    trace!(worker = id, "worker finished");
    Ok(())
}

fn progress_bar(total: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NetworkError, StorageResult};
    use crate::storage::{
        HeaderRow, LinkRow, ProbeRecord, ResultRow, SessionRecord, SqliteStore, WriteMode,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every request after a short delay and tracks concurrency.
    #[derive(Default)]
    struct Tracker {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        built: AtomicUsize,
        calls: AtomicUsize,
    }

    struct TrackedFetcher(Arc<Tracker>);

    #[async_trait]
    impl Fetcher for TrackedFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedResponse, NetworkError> {
            let now = self.0.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.0.peak.fetch_max(now, Ordering::SeqCst);
            self.0.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.0.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.starts_with("https") {
                Err(NetworkError::Tls("handshake failure".into()))
            } else {
                Ok(FetchedResponse {
                    status: 200,
                    headers: vec![("server".into(), "stub".into())],
                    body: b"<title>stub</title>".to_vec(),
                })
            }
        }
    }

    struct TrackedFactory(Arc<Tracker>);

    impl FetcherFactory for TrackedFactory {
        fn build(&self) -> ScanResult<Box<dyn Fetcher>> {
            self.0.built.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(TrackedFetcher(Arc::clone(&self.0))))
        }
    }

    fn job(range: &str, ports: &str) -> ScanJob {
        ScanJob::new(
            SessionName::new("unit").unwrap(),
            range.parse().unwrap(),
            ports.parse().unwrap(),
        )
    }

    fn setup() -> (Arc<SqliteStore>, Arc<Tracker>) {
        (
            Arc::new(SqliteStore::open_in_memory().unwrap()),
            Arc::new(Tracker::default()),
        )
    }

    #[tokio::test]
    async fn test_tally_sums_to_total_and_respects_thread_cap() {
        let (store, tracker) = setup();
        let job = job("10.0.0.0/28", "80,443s").with_threads(3);

        let summary = run_scan(
            job,
            store.clone(),
            Arc::new(TrackedFactory(tracker.clone())),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.total, 28);
        assert_eq!(summary.finished(), 28);
        assert_eq!(summary.count(Outcome::Completed), 14);
        assert_eq!(summary.count(Outcome::Errored), 14);
        assert!(summary.session_created);
        assert!(!summary.interrupted);
        assert!(tracker.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(store.results("unit", false).unwrap().len(), 28);
    }

    #[tokio::test]
    async fn test_second_run_skips_everything() {
        let (store, tracker) = setup();
        let factory: Arc<dyn FetcherFactory> = Arc::new(TrackedFactory(tracker.clone()));

        run_scan(job("10.0.0.0/30", "80"), store.clone(), factory.clone(), CancellationToken::new())
            .await
            .unwrap();
        let calls = tracker.calls.load(Ordering::SeqCst);

        let again = run_scan(job("10.0.0.0/30", "80"), store.clone(), factory, CancellationToken::new())
            .await
            .unwrap();
        assert!(!again.session_created);
        assert_eq!(again.count(Outcome::Skipped), 2);
        assert_eq!(tracker.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_fetchers_are_recycled() {
        let (store, tracker) = setup();
        let job = job("10.0.0.0/29", "80").with_threads(1).with_recycle_after(2);

        run_scan(job, store, Arc::new(TrackedFactory(tracker.clone())), CancellationToken::new())
            .await
            .unwrap();

        // One validation build, then 6 probes served 2 at a time.
        assert_eq!(tracker.built.load(Ordering::SeqCst), 1 + 3);
    }

    #[tokio::test]
    async fn test_cancelled_scan_dispatches_nothing() {
        let (store, tracker) = setup();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = run_scan(
            job("10.0.0.0/24", "80"),
            store.clone(),
            Arc::new(TrackedFactory(tracker.clone())),
            cancel,
        )
        .await
        .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.finished(), 0);
        assert_eq!(tracker.calls.load(Ordering::SeqCst), 0);
        assert!(store.session_exists("unit").unwrap());
    }

    #[tokio::test]
    async fn test_rate_limited_scan_completes() {
        let (store, tracker) = setup();
        let job = job("10.0.0.0/30", "80,8080").with_rate_limit(1000);

        let summary = run_scan(job, store, Arc::new(TrackedFactory(tracker)), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.finished(), 4);
    }

    /// Delegates to an in-memory store but holds writes for one url until
    /// released, the way a locked database file would.
    struct GatedStore {
        inner: SqliteStore,
        held_url: String,
        release: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl ResultStore for GatedStore {
        fn session_exists(&self, name: &str) -> StorageResult<bool> {
            self.inner.session_exists(name)
        }

        fn create_session(&self, name: &str, network: &str, ports: &str) -> StorageResult<bool> {
            self.inner.create_session(name, network, ports)
        }

        fn session(&self, name: &str) -> StorageResult<Option<SessionRecord>> {
            self.inner.session(name)
        }

        fn list_sessions(&self) -> StorageResult<Vec<SessionRecord>> {
            self.inner.list_sessions()
        }

        fn has_result(&self, session: &str, url: &str) -> StorageResult<bool> {
            self.inner.has_result(session, url)
        }

        fn record_result(
            &self,
            session: &str,
            url: &str,
            record: &ProbeRecord,
            mode: WriteMode,
        ) -> StorageResult<()> {
            self.inner.record_result(session, url, record, mode)
        }

        fn record_headers(
            &self,
            session: &str,
            url: &str,
            headers: &[(String, String)],
        ) -> StorageResult<()> {
            self.inner.record_headers(session, url, headers)
        }

        fn record_links(
            &self,
            session: &str,
            url: &str,
            links: &[Option<String>],
        ) -> StorageResult<()> {
            self.inner.record_links(session, url, links)
        }

        fn record_probe(
            &self,
            session: &str,
            url: &str,
            record: &ProbeRecord,
            headers: &[(String, String)],
            links: &[Option<String>],
            mode: WriteMode,
        ) -> StorageResult<()> {
            if url == self.held_url {
                if let Ok(release) = self.release.lock() {
                    let _ = release.recv_timeout(Duration::from_secs(10));
                }
            }
            self.inner
                .record_probe(session, url, record, headers, links, mode)
        }

        fn results(&self, session: &str, successful_only: bool) -> StorageResult<Vec<ResultRow>> {
            self.inner.results(session, successful_only)
        }

        fn headers(&self, session: &str, url: Option<&str>) -> StorageResult<Vec<HeaderRow>> {
            self.inner.headers(session, url)
        }

        fn links(&self, session: &str, url: Option<&str>) -> StorageResult<Vec<LinkRow>> {
            self.inner.links(session, url)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stuck_store_write_stalls_the_scan() {
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let store = Arc::new(GatedStore {
            inner: SqliteStore::open_in_memory().unwrap(),
            held_url: "http://10.0.0.2:80".to_string(),
            release: std::sync::Mutex::new(release_rx),
        });
        let cancel = CancellationToken::new();
        let job = job("10.0.0.0/30", "80")
            .with_threads(2)
            .with_stall_timeout(Duration::from_millis(300));

        let result = run_scan(
            job,
            store.clone(),
            Arc::new(TrackedFactory(Arc::new(Tracker::default()))),
            cancel.clone(),
        )
        .await;

        assert!(matches!(
            result,
            Err(ScanError::Stalled {
                completed: 1,
                total: 2,
                ..
            })
        ));
        assert!(cancel.is_cancelled());
        assert_eq!(store.inner.results("unit", false).unwrap().len(), 1);

        drop(release_tx);
    }

    #[test]
    fn test_liveness_window() {
        let job = job("10.0.0.0/30", "80")
            .with_threads(4)
            .with_timeout(Duration::from_secs(2));
        assert_eq!(
            job.liveness(Duration::from_millis(100)),
            Duration::from_secs(2) + PROBE_GRACE + COLLECT_GRACE + Duration::from_millis(400)
        );

        let pinned = job.with_stall_timeout(Duration::from_secs(1));
        assert_eq!(pinned.liveness(Duration::from_secs(60)), Duration::from_secs(1));
    }

    #[test]
    fn test_huge_timeout_is_clamped() {
        let job = job("10.0.0.0/30", "80")
            .with_threads(usize::MAX)
            .with_timeout(Duration::MAX);
        assert_eq!(job.timeout, MAX_TIMEOUT);
        assert_eq!(job.probe_options().deadline, MAX_TIMEOUT + PROBE_GRACE);
        assert!(job.liveness(Duration::from_secs(1)) >= MAX_TIMEOUT);
    }

    #[test]
    fn test_job_builders_clamp() {
        let job = job("10.0.0.0/30", "80").with_threads(0).with_recycle_after(0);
        assert_eq!(job.threads, 1);
        assert_eq!(job.recycle_after, 1);
        assert_eq!(job.targets().len(), 2);
    }
}
