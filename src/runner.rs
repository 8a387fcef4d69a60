use std::collections::HashSet;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use indicatif::ProgressBar;
use itertools::iproduct;
use thiserror::Error;
use tokio::time::Instant;

use crate::detector::response::{self, ExtraHeader, RequestSpec, ResponseSnapshot};
use crate::detector::{self, Classifier, Verdict};
use crate::extractor::{PathExtractor, DEFAULT_EXTRACT_PREFIXES};
use crate::fingerprint::{self, Fingerprint};
use crate::frontier::Frontier;
use crate::output::{Finding, ResultSink};
use crate::queue::{StopReason, Task, TaskQueue, DEFAULT_QUEUE_CAPACITY};
use crate::seeds::{self, SeedError, SeedList};
use crate::utils;

pub const DEFAULT_WORKERS: usize = 20;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_PAYLOADS: [&str; 3] = ["?id=1", "?user=admin", "?q=test"];

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:95.0) Gecko/20100101 Firefox/95.0";

#[derive(Clone, Debug)]
pub enum SeedSource {
    Directory(String),
    Inline(Vec<String>),
}

#[derive(Clone, Debug)]
pub struct Options {
    /// Target root. A missing scheme is resolved by probing https then http.
    pub base_url: String,
    pub seeds: SeedSource,
    pub workers: usize,
    /// Pause after every request a worker makes.
    pub delay: Duration,
    pub timeout_seconds: u64,
    /// Global requests-per-second cap across all workers.
    pub rate: Option<u32>,
    pub queue_capacity: usize,
    pub methods: Vec<reqwest::Method>,
    /// Query suffixes tried after the bare URL.
    pub payloads: Vec<String>,
    pub allowed_status: HashSet<u16>,
    pub snippet_len: usize,
    pub extract_prefixes: Vec<String>,
    pub header: Option<String>,
    pub proxy: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            seeds: SeedSource::Directory(seeds::DEFAULT_SEED_DIR.to_string()),
            workers: DEFAULT_WORKERS,
            delay: Duration::ZERO,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            rate: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            methods: vec![reqwest::Method::GET, reqwest::Method::HEAD],
            payloads: DEFAULT_PAYLOADS.iter().map(|s| s.to_string()).collect(),
            allowed_status: detector::DEFAULT_ALLOWED_STATUS.into_iter().collect(),
            snippet_len: detector::DEFAULT_SNIPPET_LEN,
            extract_prefixes: DEFAULT_EXTRACT_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            header: None,
            proxy: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("base URL is empty")]
    EmptyBaseUrl,

    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("invalid worker count {value}, expected a positive integer")]
    InvalidWorkers { value: usize },

    #[error("methods list is empty")]
    EmptyMethods,

    #[error("allowed status list is empty")]
    EmptyAllowedStatus,

    #[error("invalid rate {value}, expected a positive integer")]
    InvalidRate { value: u32 },

    #[error("invalid header: {message}")]
    InvalidHeader { message: String },

    #[error("invalid extraction prefixes: {message}")]
    InvalidExtractPrefixes { message: String },

    #[error(transparent)]
    Seeds(#[from] SeedError),

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("task join failed: {source}")]
    TaskJoin {
        #[source]
        source: tokio::task::JoinError,
    },
}

#[derive(Clone, Debug)]
pub struct ScanResult {
    pub base_url: String,
    pub started_at: Instant,
    pub elapsed: Duration,
    pub fingerprint: Fingerprint,
    pub files_scanned: usize,
    pub seeds_enqueued: usize,
    pub discovered: usize,
    pub urls_checked: usize,
    pub endpoints_found: usize,
    pub findings: Vec<Finding>,
    pub stop_reason: StopReason,
}

impl ScanResult {
    pub fn aborted(&self) -> bool {
        self.stop_reason == StopReason::Cancelled
    }
}

/// Everything a run shares between its workers. Owned by one
/// [`Runner::run_until`] call and dropped with it.
struct ScanContext {
    client: reqwest::Client,
    classifier: Classifier,
    extractor: PathExtractor,
    frontier: Frontier,
    queue: TaskQueue,
    sink: ResultSink,
    limiter: Option<DirectLimiter>,
    methods: Vec<reqwest::Method>,
    // bare URL first, then each payload suffix
    variants: Vec<String>,
    header: Option<ExtraHeader>,
    delay: Duration,
    snippet_len: usize,
    urls_checked: AtomicUsize,
    endpoints_found: AtomicUsize,
    seeded: AtomicUsize,
    discovered: AtomicUsize,
    progress: ProgressBar,
}

/// What the run needs before any worker starts.
struct Prepared {
    client: reqwest::Client,
    base_url: String,
    seed_list: SeedList,
    fingerprint: Fingerprint,
}

impl ScanContext {
    fn variants_per_task(&self) -> u64 {
        (self.methods.len() * self.variants.len()) as u64
    }
}

#[derive(Clone)]
pub struct Runner {
    options: Options,
    header: Option<ExtraHeader>,
    extractor: PathExtractor,
    progress: ProgressBar,
}

impl Runner {
    pub fn new(options: Options) -> Result<Self, RunnerError> {
        if options.base_url.trim().is_empty() {
            return Err(RunnerError::EmptyBaseUrl);
        }
        if options.workers == 0 {
            return Err(RunnerError::InvalidWorkers {
                value: options.workers,
            });
        }
        if options.methods.is_empty() {
            return Err(RunnerError::EmptyMethods);
        }
        if options.allowed_status.is_empty() {
            return Err(RunnerError::EmptyAllowedStatus);
        }
        if options.rate == Some(0) {
            return Err(RunnerError::InvalidRate { value: 0 });
        }
        let header = match options.header.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(
                ExtraHeader::parse(raw).map_err(|message| RunnerError::InvalidHeader { message })?,
            ),
            _ => None,
        };
        let extractor = PathExtractor::new(&options.extract_prefixes)
            .map_err(|message| RunnerError::InvalidExtractPrefixes { message })?;
        Ok(Self {
            options,
            header,
            extractor,
            progress: ProgressBar::hidden(),
        })
    }

    /// Reports progress and `[FOUND]` lines through `pb`.
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.progress = pb;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub async fn run(&self) -> Result<ScanResult, RunnerError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Runs until every discovered task is processed or `shutdown` resolves.
    /// Shutdown is honoured during setup as well.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<ScanResult, RunnerError>
    where
        F: Future<Output = ()>,
    {
        let started_at = Instant::now();
        tokio::pin!(shutdown);

        let Prepared {
            client,
            base_url,
            seed_list,
            fingerprint,
        } = tokio::select! {
            prepared = self.prepare() => prepared?,
            _ = &mut shutdown => {
                tracing::warn!("scan cancelled during setup");
                return Ok(self.cancelled_before_scan(started_at));
            }
        };

        let limiter = self
            .options
            .rate
            .and_then(NonZeroU32::new)
            .map(|rate| RateLimiter::direct(Quota::per_second(rate)));

        let mut variants = vec![String::new()];
        variants.extend(
            self.options
                .payloads
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
        );

        let ctx = Arc::new(ScanContext {
            client,
            classifier: Classifier::new(self.options.allowed_status.clone(), fingerprint.clone()),
            extractor: self.extractor.clone(),
            frontier: Frontier::new(&base_url),
            queue: TaskQueue::new(self.options.queue_capacity),
            sink: ResultSink::new(),
            limiter,
            methods: self.options.methods.clone(),
            variants,
            header: self.header.clone(),
            delay: self.options.delay,
            snippet_len: self.options.snippet_len,
            urls_checked: AtomicUsize::new(0),
            endpoints_found: AtomicUsize::new(0),
            seeded: AtomicUsize::new(0),
            discovered: AtomicUsize::new(0),
            progress: self.progress.clone(),
        });
        self.progress.set_length(0);

        let workers: Vec<_> = (0..self.options.workers)
            .map(|id| tokio::spawn(run_worker(Arc::clone(&ctx), id)))
            .collect();

        let drive = async {
            enqueue_seeds(&ctx, &seed_list.paths).await;
            ctx.queue.watch_termination().await
        };
        let stop_reason = tokio::select! {
            reason = drive => reason,
            _ = &mut shutdown => {
                tracing::warn!("scan cancelled, stopping workers");
                ctx.queue.cancel();
                StopReason::Cancelled
            }
        };

        let mut join_error = None;
        for joined in futures::future::join_all(workers).await {
            if let Err(e) = joined {
                join_error.get_or_insert(e);
            }
        }
        if let Some(source) = join_error {
            return Err(RunnerError::TaskJoin { source });
        }

        Ok(ScanResult {
            base_url,
            started_at,
            elapsed: started_at.elapsed(),
            fingerprint,
            files_scanned: seed_list.files_scanned,
            seeds_enqueued: ctx.seeded.load(Ordering::Acquire),
            discovered: ctx.discovered.load(Ordering::Acquire),
            urls_checked: ctx.urls_checked.load(Ordering::Acquire),
            endpoints_found: ctx.endpoints_found.load(Ordering::Acquire),
            findings: ctx.sink.finalize(),
            stop_reason,
        })
    }

    /// Scheme detection, seed loading and fingerprint capture.
    async fn prepare(&self) -> Result<Prepared, RunnerError> {
        let client = build_http_client(self.options.proxy.as_deref(), self.options.timeout_seconds)?;

        let base_url = utils::ensure_scheme(&client, &self.options.base_url).await;
        let base_url = base_url.trim_end_matches('/').to_string();
        if reqwest::Url::parse(&base_url).is_err() {
            return Err(RunnerError::InvalidUrl { url: base_url });
        }

        let seed_list = match &self.options.seeds {
            SeedSource::Directory(dir) => seeds::load_seed_paths(dir).await?,
            SeedSource::Inline(paths) => SeedList {
                files_scanned: 0,
                paths: paths
                    .iter()
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty())
                    .map(|p| p.to_string())
                    .collect(),
            },
        };
        tracing::info!(
            base_url = %base_url,
            files = seed_list.files_scanned,
            paths = seed_list.paths.len(),
            "loaded seed paths"
        );

        let fingerprint = fingerprint::capture(&client, &base_url, self.header.as_ref()).await;
        Ok(Prepared {
            client,
            base_url,
            seed_list,
            fingerprint,
        })
    }

    fn cancelled_before_scan(&self, started_at: Instant) -> ScanResult {
        ScanResult {
            base_url: self.options.base_url.trim().to_string(),
            started_at,
            elapsed: started_at.elapsed(),
            fingerprint: Fingerprint::unavailable(),
            files_scanned: 0,
            seeds_enqueued: 0,
            discovered: 0,
            urls_checked: 0,
            endpoints_found: 0,
            findings: Vec::new(),
            stop_reason: StopReason::Cancelled,
        }
    }
}

fn build_http_client(
    proxy: Option<&str>,
    timeout_seconds: u64,
) -> Result<reqwest::Client, RunnerError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(USER_AGENT),
    );

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_seconds.max(1)))
        .danger_accept_invalid_hostnames(true)
        .danger_accept_invalid_certs(true);

    if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| RunnerError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| RunnerError::HttpClientBuild { source: e })
}

/// Claims and enqueues every seed path. The seeding hold keeps the run from
/// draining before the last seed is visible.
async fn enqueue_seeds(ctx: &ScanContext, paths: &[String]) {
    let _seeding = ctx.queue.hold();
    for path in paths {
        let url = match ctx.frontier.claim_path(path) {
            Some(url) => url,
            None => {
                tracing::debug!(path = %path, "duplicate seed skipped");
                continue;
            }
        };
        ctx.progress.inc_length(ctx.variants_per_task());
        if !ctx.queue.enqueue(Task::new(url)).await {
            return;
        }
        ctx.seeded.fetch_add(1, Ordering::AcqRel);
    }
}

async fn run_worker(ctx: Arc<ScanContext>, id: usize) {
    tracing::trace!(worker = id, "worker started");
    while let Some(task) = ctx.queue.dequeue().await {
        let _done = ctx.queue.adopt();
        process_task(&ctx, &task).await;
    }
    tracing::trace!(worker = id, "worker stopped");
}

/// Sends every method and payload variant of `task`, in order, and feeds
/// hits to the sink and the frontier.
async fn process_task(ctx: &ScanContext, task: &Task) {
    for (method, suffix) in iproduct!(ctx.methods.iter(), ctx.variants.iter()) {
        let url = format!("{}{}", task.url(), suffix);

        if let Some(limiter) = ctx.limiter.as_ref() {
            tokio::select! {
                _ = limiter.until_ready() => {}
                _ = ctx.queue.stopped() => return,
            }
        }

        let spec = RequestSpec {
            method,
            url: &url,
            header: ctx.header.as_ref(),
        };
        let outcome = tokio::select! {
            outcome = response::fetch(&ctx.client, spec) => outcome,
            _ = ctx.queue.stopped() => return,
        };
        ctx.urls_checked.fetch_add(1, Ordering::AcqRel);
        ctx.progress.inc(1);

        match outcome {
            Ok(snapshot) => handle_response(ctx, method, &url, snapshot),
            Err(e) => tracing::debug!(method = %method, url = %url, error = %e, "request failed"),
        }

        if !ctx.delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(ctx.delay) => {}
                _ = ctx.queue.stopped() => return,
            }
        }
    }
}

fn handle_response(
    ctx: &ScanContext,
    method: &reqwest::Method,
    url: &str,
    snapshot: ResponseSnapshot,
) {
    let verdict = ctx
        .classifier
        .classify(snapshot.status, &snapshot.content_type, &snapshot.body);
    if let Verdict::Miss(reason) = verdict {
        tracing::trace!(method = %method, url = %url, status = snapshot.status, ?reason, "miss");
        return;
    }

    ctx.endpoints_found.fetch_add(1, Ordering::AcqRel);
    ctx.progress.println(format!(
        "{} {} {} {}",
        "[FOUND]".bold().green(),
        url.bold().blue(),
        method.as_str().bold().white(),
        snapshot.status.to_string().bold().cyan(),
    ));
    tracing::info!(
        method = %method,
        url = %url,
        status = snapshot.status,
        ms = snapshot.duration_ms as u64,
        "endpoint found"
    );

    let text = snapshot.body_text();
    ctx.sink.record(Finding {
        url: url.to_string(),
        method: method.as_str().to_string(),
        status: snapshot.status,
        snippet: detector::snippet(&text, ctx.snippet_len),
        content_type: snapshot.content_type.clone(),
    });

    if !ctx.extractor.applies_to(&snapshot.content_type) {
        return;
    }
    for path in ctx.extractor.extract(&text) {
        let Some(new_url) = ctx.frontier.claim_path(&path) else {
            continue;
        };
        if ctx.queue.enqueue_discovered(Task::new(new_url.clone())) {
            ctx.discovered.fetch_add(1, Ordering::AcqRel);
            ctx.progress.inc_length(ctx.variants_per_task());
            tracing::debug!(from = %url, url = %new_url, "queued discovered path");
        }
    }
}
