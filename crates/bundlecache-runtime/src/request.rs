//! Bundle load requests and the attempt machinery behind them

use bundlecache_bundle::{BundleCache, BundleHandle, BundleStore, CipherContext};
use bundlecache_core::{CacheError, CacheResult, LoadState};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Reads bundle bytes and opens them through a [`BundleStore`]
///
/// In client mode bytes come from the cache directory, decrypted when a
/// cipher is configured. In server mode they come from the preloaded
/// in-memory copies.
#[derive(Clone)]
pub struct BundleLoader {
    cache: BundleCache,
    cipher: Option<CipherContext>,
    store: Arc<dyn BundleStore>,
    preloaded: Option<Arc<HashMap<String, Arc<[u8]>>>>,
    crcs: Arc<HashMap<String, u32>>,
}

impl BundleLoader {
    /// Create a loader reading from `cache`
    pub fn new(
        cache: BundleCache,
        cipher: Option<CipherContext>,
        store: Arc<dyn BundleStore>,
    ) -> Self {
        Self {
            cache,
            cipher,
            store,
            preloaded: None,
            crcs: Arc::new(HashMap::new()),
        }
    }

    /// Expected CRC32 per bundle name, checked by the store on open
    pub fn with_crcs(mut self, crcs: HashMap<String, u32>) -> Self {
        self.crcs = Arc::new(crcs);
        self
    }

    /// Serve bytes from memory instead of the cache directory
    pub fn with_preloaded(mut self, preloaded: HashMap<String, Arc<[u8]>>) -> Self {
        self.preloaded = Some(Arc::new(preloaded));
        self
    }

    pub fn cache(&self) -> &BundleCache {
        &self.cache
    }

    /// Whether bundles are served from memory
    pub fn is_preloaded(&self) -> bool {
        self.preloaded.is_some()
    }

    /// Read (decrypted) bundle bytes from disk on a blocking thread
    pub async fn read_bytes(&self, name: &str, progress: Arc<AtomicU64>) -> CacheResult<Vec<u8>> {
        if let Some(bytes) = self.preloaded.as_ref().and_then(|p| p.get(name)) {
            progress.store(bytes.len() as u64, Ordering::Relaxed);
            return Ok(bytes.to_vec());
        }

        let cache = self.cache.clone();
        let cipher = self.cipher.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || {
            cache
                .read_bundle(&name, cipher.as_ref(), |n| {
                    progress.store(n, Ordering::Relaxed)
                })
                .map_err(CacheError::from)
        })
        .await
        .map_err(|e| CacheError::Internal(format!("read task failed: {e}")))?
    }

    /// Read and open one bundle
    pub async fn load(
        &self,
        name: &str,
        progress: Arc<AtomicU64>,
    ) -> CacheResult<Arc<dyn BundleHandle>> {
        let bytes = self.read_bytes(name, progress).await?;
        let crc = self.crcs.get(name).copied().unwrap_or(0);
        self.store
            .open(name, bytes, crc)
            .await
            .map_err(CacheError::from)
    }
}

impl fmt::Debug for BundleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleLoader")
            .field("cache", &self.cache)
            .field("encrypted", &self.cipher.is_some())
            .field("preloaded", &self.is_preloaded())
            .finish()
    }
}

/// Retry and deadline policy for load requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Deadline of each attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            timeout: Duration::from_secs(30),
        }
    }
}

/// One spawned attempt; aborted when dropped
struct Attempt {
    task: JoinHandle<()>,
    result: oneshot::Receiver<CacheResult<Arc<dyn BundleHandle>>>,
}

impl Drop for Attempt {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Load request for one bundle
///
/// State transitions are driven by [`update`](Self::update), called once per
/// tick of the polling loop:
///
/// ```text
/// Requesting ──ok──▶ Success
///     │  ▲
///   err  retry (while retry_count < max_retries)
///     ▼  │
///    Error ──exhausted──▶ Failed
/// ```
pub struct LoadRequest {
    bundle_name: String,
    dependencies: Vec<String>,
    policy: RetryPolicy,
    retry_count: u32,
    attempts: u32,
    deadline: Option<Instant>,
    state: LoadState,
    last_error: Option<CacheError>,
    bytes_read: Arc<AtomicU64>,
    expected_size: u64,
    pending_refs: u32,
    attempt: Option<Attempt>,
    handle: Option<Arc<dyn BundleHandle>>,
}

impl LoadRequest {
    /// Create a request in `Requesting`; the first attempt starts on the
    /// first [`update`](Self::update)
    pub fn new(bundle_name: &str, dependencies: Vec<String>, policy: RetryPolicy) -> Self {
        Self {
            bundle_name: bundle_name.to_string(),
            dependencies,
            policy,
            retry_count: 0,
            attempts: 0,
            deadline: None,
            state: LoadState::Requesting,
            last_error: None,
            bytes_read: Arc::new(AtomicU64::new(0)),
            expected_size: 0,
            pending_refs: 0,
            attempt: None,
            handle: None,
        }
    }

    /// Set the expected file size used for progress
    pub fn with_expected_size(mut self, size: u64) -> Self {
        self.expected_size = size;
        self
    }

    pub fn bundle_name(&self) -> &str {
        &self.bundle_name
    }

    /// Direct dependencies, already variant-resolved
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Retries used so far
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Attempts started so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&CacheError> {
        self.last_error.as_ref()
    }

    /// Fraction of the expected bytes read by the current attempt
    pub fn progress(&self) -> f32 {
        match self.state {
            LoadState::Success => 1.0,
            _ if self.expected_size == 0 => 0.0,
            _ => {
                let read = self.bytes_read.load(Ordering::Relaxed);
                (read as f64 / self.expected_size as f64).min(1.0) as f32
            }
        }
    }

    /// References requested while the load is in flight
    pub fn pending_refs(&self) -> u32 {
        self.pending_refs
    }

    pub fn add_ref(&mut self) {
        self.pending_refs += 1;
    }

    /// Drop one pending reference; returns the remaining count
    pub fn release_ref(&mut self) -> u32 {
        self.pending_refs = self.pending_refs.saturating_sub(1);
        self.pending_refs
    }

    /// Open handle once the request succeeded
    pub fn handle(&self) -> Option<&Arc<dyn BundleHandle>> {
        self.handle.as_ref()
    }

    /// Take the open handle out of a successful request
    pub fn take_handle(&mut self) -> Option<Arc<dyn BundleHandle>> {
        self.handle.take()
    }

    /// Advance the state machine by one tick
    pub fn update(&mut self, now: Instant, loader: &BundleLoader) {
        match self.state {
            LoadState::Requesting => self.poll_attempt(now, loader),
            LoadState::Error => {
                let retryable = self.last_error.as_ref().is_none_or(CacheError::is_retryable);
                if retryable && self.retry_count < self.policy.max_retries {
                    self.retry_count += 1;
                    tracing::debug!(
                        bundle = %self.bundle_name,
                        retry = self.retry_count,
                        max_retries = self.policy.max_retries,
                        "retrying bundle load"
                    );
                    self.transition(LoadState::Requesting);
                    self.start_attempt(now, loader);
                } else {
                    tracing::warn!(
                        bundle = %self.bundle_name,
                        attempts = self.attempts,
                        error = ?self.last_error,
                        "bundle load failed"
                    );
                    self.transition(LoadState::Failed);
                }
            }
            LoadState::Success | LoadState::Failed => {}
        }
    }

    fn poll_attempt(&mut self, now: Instant, loader: &BundleLoader) {
        let Some(attempt) = self.attempt.as_mut() else {
            self.start_attempt(now, loader);
            return;
        };

        match attempt.result.try_recv() {
            Ok(Ok(handle)) => {
                self.attempt = None;
                self.handle = Some(handle);
                self.last_error = None;
                self.transition(LoadState::Success);
                tracing::debug!(bundle = %self.bundle_name, attempts = self.attempts, "bundle loaded");
            }
            Ok(Err(err)) => self.fail_attempt(err),
            Err(oneshot::error::TryRecvError::Empty) => {
                if self.deadline.is_some_and(|deadline| now > deadline) {
                    self.fail_attempt(CacheError::TimeoutError(format!(
                        "{} not opened within {:?}",
                        self.bundle_name, self.policy.timeout
                    )));
                }
            }
            Err(oneshot::error::TryRecvError::Closed) => {
                self.fail_attempt(CacheError::Internal(format!(
                    "load task for {} ended without a result",
                    self.bundle_name
                )));
            }
        }
    }

    fn start_attempt(&mut self, now: Instant, loader: &BundleLoader) {
        self.attempts += 1;
        self.deadline = Some(now + self.policy.timeout);
        self.bytes_read.store(0, Ordering::Relaxed);

        let (tx, rx) = oneshot::channel();
        let loader = loader.clone();
        let name = self.bundle_name.clone();
        let progress = Arc::clone(&self.bytes_read);
        let task = tokio::spawn(async move {
            let result = loader.load(&name, progress).await;
            let _ = tx.send(result);
        });

        self.attempt = Some(Attempt { task, result: rx });
    }

    fn fail_attempt(&mut self, err: CacheError) {
        tracing::debug!(
            bundle = %self.bundle_name,
            attempt = self.attempts,
            error = %err,
            "bundle load attempt failed"
        );
        self.attempt = None;
        self.last_error = Some(err);
        self.transition(LoadState::Error);
    }

    /// Fail permanently without consuming retries
    ///
    /// Used for dependency failure and cancellation. Any running attempt is
    /// aborted and an open handle is dropped.
    pub fn fail(&mut self, err: CacheError) {
        if self.state == LoadState::Failed {
            return;
        }
        self.attempt = None;
        self.handle = None;
        self.last_error = Some(err);
        self.transition(LoadState::Failed);
    }

    fn transition(&mut self, target: LoadState) {
        debug_assert!(
            self.state.can_transition_to(target),
            "invalid transition {} -> {}",
            self.state,
            target
        );
        self.state = target;
    }
}

impl fmt::Debug for LoadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadRequest")
            .field("bundle_name", &self.bundle_name)
            .field("state", &self.state)
            .field("retry_count", &self.retry_count)
            .field("attempts", &self.attempts)
            .field("pending_refs", &self.pending_refs)
            .field("last_error", &self.last_error)
            .finish()
    }
}
