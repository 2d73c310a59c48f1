//! Reference-counted bundle registry
//!
//! [`BundleRegistry`] owns the loaded, in-flight, and error tables for one
//! cache root. Callers request bundles or assets; the registry enqueues one
//! [`LoadRequest`] per bundle and dependency, and the polling loop advances
//! them until they are loaded, failed, or cancelled.

use crate::operation::{AssetRequest, BundleRequest, Operation, OperationContext};
use crate::request::{BundleLoader, LoadRequest, RetryPolicy};
use crate::resolver::DependencyResolver;
use crate::scheduler::{PollTarget, PollingLoop};
use bundlecache_bundle::{
    ArchiveStore, Asset, BundleCache, BundleHandle, BundleHashList, BundleStore, CipherContext,
    DEPENDENCY_MANIFEST_OBJECT, DependencyManifest, Json, Platform,
};
use bundlecache_core::{CacheConfig, CacheError, CacheResult, DependencyLoad, LoadState, ProgressStatus};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// A bundle in the loaded table
pub(crate) struct LoadedBundle {
    pub(crate) handle: Arc<dyn BundleHandle>,
    pub(crate) ref_count: u32,
    pub(crate) dependencies: Vec<String>,
}

/// State that exists only between a successful setup and teardown
struct Session {
    cache: BundleCache,
    server_mode: bool,
    hash_lists: HashMap<Platform, BundleHashList>,
    diff: Vec<String>,
    resolver: DependencyResolver,
    loader: BundleLoader,
    master: Arc<dyn BundleHandle>,
    cancel: CancellationToken,
    polling: Option<PollingLoop>,
}

impl Session {
    fn active_list(&self) -> Option<&BundleHashList> {
        self.hash_lists.get(&self.cache.platform())
    }

    fn expected_size(&self, name: &str) -> Option<u64> {
        self.active_list()
            .and_then(|list| list.get_entry(name))
            .map(|info| info.content_size)
    }
}

/// Loaded, in-flight, error, and operation tables
#[derive(Default)]
struct Tables {
    loaded: HashMap<String, LoadedBundle>,
    in_flight: BTreeMap<String, LoadRequest>,
    errors: HashMap<String, CacheError>,
    operations: Vec<Operation>,
}

impl Tables {
    /// Take one reference on `name`, enqueueing a load when needed
    fn acquire(&mut self, session: &Session, policy: RetryPolicy, name: &str) {
        if let Some(bundle) = self.loaded.get_mut(name) {
            bundle.ref_count += 1;
            return;
        }
        if let Some(request) = self.in_flight.get_mut(name) {
            request.add_ref();
            return;
        }
        if let Some(previous) = self.errors.remove(name) {
            tracing::debug!(bundle = name, error = %previous, "re-requesting failed bundle");
        }

        let dependencies = session.resolver.dependencies(name);
        let size = session.expected_size(name).unwrap_or(0);
        let mut request = LoadRequest::new(name, dependencies, policy).with_expected_size(size);
        request.add_ref();
        tracing::debug!(bundle = name, "bundle load enqueued");
        self.in_flight.insert(name.to_string(), request);
    }

    /// Drop one reference on `name`, releasing it at zero
    fn release(&mut self, name: &str) {
        if let Some(bundle) = self.loaded.get_mut(name) {
            bundle.ref_count = bundle.ref_count.saturating_sub(1);
            if bundle.ref_count == 0 {
                self.loaded.remove(name);
                tracing::debug!(bundle = name, "bundle released");
            }
        } else if let Some(request) = self.in_flight.get_mut(name) {
            if request.release_ref() == 0 {
                self.in_flight.remove(name);
                tracing::debug!(bundle = name, "in-flight load abandoned");
            }
        } else {
            tracing::debug!(bundle = name, "unload of bundle that is not loaded");
        }
    }

    /// Fail every in-flight load and pending operation with `err`
    fn cancel_all(&mut self, err: &CacheError) {
        for (name, mut request) in std::mem::take(&mut self.in_flight) {
            request.fail(err.clone());
            self.errors.insert(name, err.clone());
        }
        for op in &mut self.operations {
            op.cancel(err.clone());
        }
        self.operations.clear();
    }

    /// Drop everything
    fn clear(&mut self, err: &CacheError) {
        self.cancel_all(err);
        self.loaded.clear();
        self.errors.clear();
    }
}

/// Aggregate state of `dependencies` against the error and loaded tables
///
/// `loaded` should be the loaded table as it stood at the start of the tick.
pub fn dependency_state(
    dependencies: &[String],
    errors: &HashMap<String, CacheError>,
    loaded: &HashSet<String>,
) -> DependencyLoad {
    if dependencies.is_empty() {
        return DependencyLoad::NoTargets;
    }
    if dependencies.iter().any(|d| errors.contains_key(d)) {
        return DependencyLoad::Failed;
    }
    if dependencies.iter().all(|d| loaded.contains(d)) {
        DependencyLoad::Success
    } else {
        DependencyLoad::LoadWait
    }
}

#[derive(Default)]
struct RegistryState {
    session: Option<Session>,
    status: ProgressStatus,
    setup_progress: f32,
    tables: Tables,
}

struct RegistryInner {
    config: CacheConfig,
    store: Arc<dyn BundleStore>,
    state: Mutex<RegistryState>,
}

impl RegistryInner {
    fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.config.max_retries,
            timeout: self.config.timeout(),
        }
    }

    fn set_status(&self, status: ProgressStatus, progress: f32) {
        let mut state = self.state.lock();
        state.status = status;
        state.setup_progress = progress;
    }
}

impl PollTarget for RegistryInner {
    fn poll_tick(&self) {
        let mut state = self.state.lock();
        let RegistryState { session, tables, .. } = &mut *state;
        let Some(session) = session.as_ref() else {
            return;
        };

        let now = Instant::now();
        let loaded_before: HashSet<String> = tables.loaded.keys().cloned().collect();

        for request in tables.in_flight.values_mut() {
            request.update(now, &session.loader);
        }

        let names: Vec<String> = tables.in_flight.keys().cloned().collect();
        for name in names {
            let Some(request) = tables.in_flight.get_mut(&name) else {
                continue;
            };

            let gate = dependency_state(request.dependencies(), &tables.errors, &loaded_before);
            if gate == DependencyLoad::Failed {
                let failed: Vec<&str> = request
                    .dependencies()
                    .iter()
                    .filter(|d| tables.errors.contains_key(*d))
                    .map(String::as_str)
                    .collect();
                request.fail(CacheError::DependencyError(format!(
                    "{name} requires {}",
                    failed.join(", ")
                )));
            }

            match request.state() {
                LoadState::Success if gate.is_satisfied() => {
                    let Some(mut request) = tables.in_flight.remove(&name) else {
                        continue;
                    };
                    let Some(handle) = request.take_handle() else {
                        continue;
                    };
                    tracing::info!(bundle = %name, refs = request.pending_refs(), "bundle ready");
                    tables.loaded.insert(
                        name,
                        LoadedBundle {
                            handle,
                            ref_count: request.pending_refs().max(1),
                            dependencies: request.dependencies().to_vec(),
                        },
                    );
                }
                LoadState::Failed => {
                    let err = request.last_error().cloned().unwrap_or_else(|| {
                        CacheError::Internal(format!("{name} failed without an error"))
                    });
                    tracing::warn!(bundle = %name, error = %err, "bundle failed");
                    tables.in_flight.remove(&name);
                    tables.errors.insert(name, err);
                }
                _ => {}
            }
        }

        let ctx = OperationContext {
            loaded: &tables.loaded,
            in_flight: &tables.in_flight,
            errors: &tables.errors,
        };
        for op in &mut tables.operations {
            op.update(&ctx);
        }
        tables.operations.retain(|op| !op.is_done());
    }

    /// Tear down the session whose token was cancelled
    ///
    /// Failed loads stay in the error table until the next setup.
    fn on_cancel(&self) {
        let session = {
            let mut state = self.state.lock();
            // A loop outliving its session must leave a newer session alone.
            if !state.session.as_ref().is_some_and(|s| s.cancel.is_cancelled()) {
                return;
            }

            let pending = state.tables.in_flight.len();
            state.tables.cancel_all(&CacheError::Cancelled);
            state.tables.loaded.clear();
            state.status = ProgressStatus::Idle;
            state.setup_progress = 0.0;
            if pending > 0 {
                tracing::info!(pending, "in-flight loads cancelled");
            }
            state.session.take()
        };

        if session.is_some() {
            tracing::info!("bundle registry cancelled");
        }
    }
}

/// Bundle cache registry for one cache root
///
/// Cloning is cheap; clones share the same state.
///
/// # Example
///
/// ```no_run
/// use bundlecache_runtime::BundleRegistry;
/// use bundlecache_core::CacheConfig;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> bundlecache_core::CacheResult<()> {
/// let registry = BundleRegistry::with_archive_store(CacheConfig::new().with_platform("android"));
/// if !registry.setup(CancellationToken::new(), false, "cache").await? {
///     return Ok(());
/// }
///
/// let mut request = registry.load_asset::<String>("dialogue", "intro.txt")?;
/// let intro = request.wait().await?;
/// registry.unload_bundle("dialogue")?;
/// # let _ = intro;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BundleRegistry {
    inner: Arc<RegistryInner>,
}

impl BundleRegistry {
    /// Create a registry opening bundles through `store`
    pub fn new(config: CacheConfig, store: Arc<dyn BundleStore>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                store,
                state: Mutex::new(RegistryState::default()),
            }),
        }
    }

    /// Create a registry for ZIP-archive bundles
    pub fn with_archive_store(config: CacheConfig) -> Self {
        Self::new(config, Arc::new(ArchiveStore::new()))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Load hash lists and the dependency manifest, then preload (server) or
    /// diff (client) and start the polling loop
    ///
    /// Returns `Ok(false)` and stays uninitialized when any step fails.
    /// Returns [`CacheError::Cancelled`] when `cancel` fires first. Cancelling
    /// `cancel` after setup stops the polling loop, fails in-flight loads with
    /// [`CacheError::Cancelled`], and leaves the registry uninitialized. Loads
    /// requested between the cancel and the teardown are refused.
    pub async fn setup(
        &self,
        cancel: CancellationToken,
        server_mode: bool,
        local_dir: impl Into<PathBuf>,
    ) -> CacheResult<bool> {
        if cancel.is_cancelled() {
            return Err(CacheError::Cancelled);
        }
        if self.is_init() {
            return Err(CacheError::InvalidState {
                expected: "uninitialized".to_string(),
                actual: "initialized".to_string(),
            });
        }

        let local_dir = local_dir.into();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CacheError::Cancelled),
            session = self.build_session(&cancel, server_mode, &local_dir) => session,
        };

        match result {
            Ok(mut session) => {
                session.polling = Some(PollingLoop::spawn(
                    Arc::downgrade(&self.inner),
                    self.inner.config.tick_interval(),
                    session.cancel.clone(),
                ));
                tracing::info!(
                    root = %local_dir.display(),
                    platform = %session.cache.platform(),
                    server_mode,
                    diff = session.diff.len(),
                    "bundle registry ready"
                );

                let mut state = self.inner.state.lock();
                state.tables = Tables::default();
                state.session = Some(session);
                state.status = ProgressStatus::Ready;
                state.setup_progress = 1.0;
                Ok(true)
            }
            Err(CacheError::Cancelled) => {
                tracing::info!("bundle registry setup cancelled");
                self.inner.set_status(ProgressStatus::Idle, 0.0);
                Err(CacheError::Cancelled)
            }
            Err(e) => {
                tracing::error!(error = %e, root = %local_dir.display(), "bundle registry setup failed");
                self.inner.set_status(ProgressStatus::Failed, 0.0);
                Ok(false)
            }
        }
    }

    async fn build_session(
        &self,
        cancel: &CancellationToken,
        server_mode: bool,
        local_dir: &Path,
    ) -> CacheResult<Session> {
        let config = &self.inner.config;
        config.validate()?;

        let platform = active_platform(config)?;
        let platforms = configured_platforms(config, platform)?;
        let cipher = CipherContext::from_config(&config.encryption)?;
        let cache = BundleCache::new(local_dir, platform);

        self.inner.set_status(ProgressStatus::LoadingHashList, 0.0);
        let hash_file = config.hash_file();
        let mut hash_lists = HashMap::new();
        for p in platforms {
            let platform_cache = BundleCache::new(local_dir, p);
            let file = hash_file.clone();
            let list = blocking(move || platform_cache.read_hash_list(&file)).await?;
            hash_lists.insert(p, list);
        }
        let active = hash_lists
            .get(&platform)
            .cloned()
            .ok_or_else(|| CacheError::ConfigError(format!("no hash list for {platform}")))?;

        let crcs = active
            .all_entries()
            .into_iter()
            .map(|info| (info.name.clone(), info.crc32))
            .collect();
        let mut loader = BundleLoader::new(cache.clone(), cipher, Arc::clone(&self.inner.store))
            .with_crcs(crcs);

        self.inner.set_status(ProgressStatus::LoadingManifest, 0.0);
        let master_name = active.platform_master.name.clone();
        let master = loader
            .load(&master_name, Arc::new(AtomicU64::new(0)))
            .await?;
        let manifest_bytes = master
            .load_object(DEPENDENCY_MANIFEST_OBJECT, Json::<DependencyManifest>::TYPE_TAG)
            .await?;
        let manifest = DependencyManifest::from_bytes(&manifest_bytes)?;
        tracing::debug!(bundles = manifest.bundles.len(), "dependency manifest loaded");
        let resolver = DependencyResolver::new(manifest, config.active_variants.clone());

        let diff = if server_mode {
            self.inner.set_status(ProgressStatus::Preloading, 0.0);
            let total = active.total_size().max(1);
            let mut done = 0u64;
            let mut preloaded = HashMap::new();
            for info in active.all_entries() {
                if cancel.is_cancelled() {
                    return Err(CacheError::Cancelled);
                }
                let bytes = loader
                    .read_bytes(&info.name, Arc::new(AtomicU64::new(0)))
                    .await?;
                done += info.content_size + info.manifest_companion_size;
                self.inner
                    .set_status(ProgressStatus::Preloading, done as f32 / total as f32);
                preloaded.insert(info.name.clone(), Arc::<[u8]>::from(bytes));
            }
            tracing::info!(bundles = preloaded.len(), "bundles preloaded");
            loader = loader.with_preloaded(preloaded);
            Vec::new()
        } else {
            self.inner.set_status(ProgressStatus::CheckingDiff, 0.0);
            let diff_cache = cache.clone();
            let list = active.clone();
            blocking(move || Ok(diff_cache.compute_diff(&list))).await?
        };

        Ok(Session {
            cache,
            server_mode,
            hash_lists,
            diff,
            resolver,
            loader,
            master,
            cancel: cancel.child_token(),
            polling: None,
        })
    }

    /// Request a bundle and its dependencies
    ///
    /// Every call takes one reference on the bundle and each transitive
    /// dependency; release them with [`unload_bundle`](Self::unload_bundle).
    pub fn load_bundle(&self, name: &str) -> CacheResult<BundleRequest> {
        let (op, request) = Operation::bundle(name);
        self.enqueue(name, op)?;
        Ok(request)
    }

    /// Request one object from a bundle, decoded as `T`
    ///
    /// Takes the same references as [`load_bundle`](Self::load_bundle).
    pub fn load_asset<T: Asset>(&self, bundle: &str, asset: &str) -> CacheResult<AssetRequest<T>> {
        let (op, request) = Operation::asset::<T>(bundle, asset);
        self.enqueue(bundle, op)?;
        Ok(request)
    }

    fn enqueue(&self, name: &str, op: Operation) -> CacheResult<()> {
        let policy = self.inner.policy();
        let mut state = self.inner.state.lock();
        let RegistryState { session, tables, .. } = &mut *state;
        let session = session.as_ref().ok_or(CacheError::NotInitialized)?;
        if session.cancel.is_cancelled() {
            return Err(CacheError::Cancelled);
        }

        if session.expected_size(name).is_none() {
            return Err(CacheError::ConfigError(format!(
                "{name} is not in the hash list"
            )));
        }

        for dep in session.resolver.all_dependencies(name) {
            tables.acquire(session, policy, &dep);
        }
        tables.acquire(session, policy, name);
        tables.operations.push(op);
        Ok(())
    }

    /// Drop one reference on `name` and its dependencies
    ///
    /// An empty name unloads everything and cancels in-flight loads.
    pub fn unload_bundle(&self, name: &str) -> CacheResult<()> {
        let mut state = self.inner.state.lock();
        let RegistryState { session, tables, .. } = &mut *state;
        let session = session.as_ref().ok_or(CacheError::NotInitialized)?;

        if name.is_empty() {
            let count = tables.loaded.len();
            tables.cancel_all(&CacheError::Cancelled);
            tables.loaded.clear();
            tracing::info!(count, "all bundles unloaded");
            return Ok(());
        }

        tables.release(name);
        for dep in session.resolver.all_dependencies(name) {
            tables.release(&dep);
        }
        Ok(())
    }

    /// Tear down all state and delete the cache directory
    ///
    /// Refused in server mode. The registry is uninitialized afterwards.
    pub fn clear_cache(&self) -> CacheResult<()> {
        let session = {
            let mut state = self.inner.state.lock();
            match state.session.as_ref() {
                None => return Err(CacheError::NotInitialized),
                Some(s) if s.server_mode => {
                    return Err(CacheError::ServerMode(
                        "clear_cache is not available".to_string(),
                    ));
                }
                Some(_) => {}
            }
            state.tables.clear(&CacheError::Cancelled);
            state.status = ProgressStatus::Idle;
            state.setup_progress = 0.0;
            state.session.take()
        };

        let Some(session) = session else {
            return Err(CacheError::NotInitialized);
        };
        session.cancel.cancel();
        session.cache.clear()?;
        Ok(())
    }

    /// Re-read every hash list from disk and recompute the diff
    pub fn reload_hash_lists(&self) -> CacheResult<()> {
        let (root, platforms, active_platform, server_mode) = {
            let state = self.inner.state.lock();
            let session = state.session.as_ref().ok_or(CacheError::NotInitialized)?;
            let platforms: Vec<Platform> = session.hash_lists.keys().copied().collect();
            (
                session.cache.root().to_path_buf(),
                platforms,
                session.cache.platform(),
                session.server_mode,
            )
        };

        let hash_file = self.inner.config.hash_file();
        let mut fresh = HashMap::new();
        for p in platforms {
            let list = BundleCache::new(&root, p).read_hash_list(&hash_file)?;
            fresh.insert(p, list);
        }
        let diff = match (server_mode, fresh.get(&active_platform)) {
            (false, Some(list)) => BundleCache::new(&root, active_platform).compute_diff(list),
            _ => Vec::new(),
        };

        let mut state = self.inner.state.lock();
        let session = state.session.as_mut().ok_or(CacheError::NotInitialized)?;
        for (p, list) in &fresh {
            match session.hash_lists.get_mut(p) {
                Some(existing) => existing.copy_from(list),
                None => {
                    session.hash_lists.insert(*p, list.clone());
                }
            }
        }
        if let Some(list) = fresh.get(&active_platform) {
            let crcs = list
                .all_entries()
                .into_iter()
                .map(|info| (info.name.clone(), info.crc32))
                .collect();
            session.loader = session.loader.clone().with_crcs(crcs);
        }
        session.diff = diff;
        tracing::info!(diff = session.diff.len(), "hash lists reloaded");
        Ok(())
    }

    /// Advance the registry by one tick
    ///
    /// The polling loop calls this on its interval; calling it directly is
    /// safe and only speeds things up.
    pub fn tick(&self) {
        self.inner.poll_tick();
    }

    /// Stop the polling loop, cancel in-flight loads, and drop all state
    pub async fn shutdown(&self) {
        let polling = {
            let mut state = self.inner.state.lock();
            state.session.as_mut().and_then(|s| s.polling.take())
        };
        if let Some(polling) = polling {
            polling.join().await;
        }

        let mut state = self.inner.state.lock();
        state.tables.clear(&CacheError::Cancelled);
        state.session = None;
        state.status = ProgressStatus::Idle;
        state.setup_progress = 0.0;
        tracing::info!("bundle registry shut down");
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Whether setup completed
    pub fn is_init(&self) -> bool {
        self.inner.state.lock().session.is_some()
    }

    pub fn is_server_mode(&self) -> bool {
        self.inner
            .state
            .lock()
            .session
            .as_ref()
            .is_some_and(|s| s.server_mode)
    }

    /// Whether the cache differs from the active hash list
    pub fn is_diff_data(&self) -> bool {
        self.inner
            .state
            .lock()
            .session
            .as_ref()
            .is_some_and(|s| !s.diff.is_empty())
    }

    /// Files that are missing or have the wrong size
    pub fn diff_list(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .session
            .as_ref()
            .map(|s| s.diff.clone())
            .unwrap_or_default()
    }

    /// Active platform once set up
    pub fn platform(&self) -> Option<Platform> {
        self.inner
            .state
            .lock()
            .session
            .as_ref()
            .map(|s| s.cache.platform())
    }

    /// Hash list of a configured platform
    pub fn hash_list(&self, platform: Platform) -> Option<BundleHashList> {
        self.inner
            .state
            .lock()
            .session
            .as_ref()
            .and_then(|s| s.hash_lists.get(&platform).cloned())
    }

    /// Open handle of the platform master bundle
    pub fn master(&self) -> Option<Arc<dyn BundleHandle>> {
        self.inner
            .state
            .lock()
            .session
            .as_ref()
            .map(|s| Arc::clone(&s.master))
    }

    pub fn progress_status(&self) -> ProgressStatus {
        self.inner.state.lock().status
    }

    /// Setup progress while setting up, then mean progress of in-flight loads
    pub fn progress(&self) -> f32 {
        let state = self.inner.state.lock();
        if state.status != ProgressStatus::Ready {
            return state.setup_progress;
        }
        let in_flight = &state.tables.in_flight;
        if in_flight.is_empty() {
            return 1.0;
        }
        in_flight.values().map(LoadRequest::progress).sum::<f32>() / in_flight.len() as f32
    }

    /// Snapshot of the per-bundle error table
    pub fn errors(&self) -> HashMap<String, CacheError> {
        self.inner.state.lock().tables.errors.clone()
    }

    /// Reference count of a loaded bundle; 0 when not loaded
    pub fn ref_count(&self, name: &str) -> u32 {
        self.inner
            .state
            .lock()
            .tables
            .loaded
            .get(name)
            .map_or(0, |b| b.ref_count)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.inner.state.lock().tables.loaded.contains_key(name)
    }

    /// Open handle of a loaded bundle
    pub fn bundle(&self, name: &str) -> Option<Arc<dyn BundleHandle>> {
        self.inner
            .state
            .lock()
            .tables
            .loaded
            .get(name)
            .map(|b| Arc::clone(&b.handle))
    }

    /// Resolved direct dependencies of a loaded bundle
    pub fn loaded_dependencies(&self, name: &str) -> Option<Vec<String>> {
        self.inner
            .state
            .lock()
            .tables
            .loaded
            .get(name)
            .map(|b| b.dependencies.clone())
    }

    /// Number of loads not yet finished
    pub fn in_flight_count(&self) -> usize {
        self.inner.state.lock().tables.in_flight.len()
    }
}

impl fmt::Debug for BundleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("BundleRegistry")
            .field("init", &state.session.is_some())
            .field("status", &state.status)
            .field("loaded", &state.tables.loaded.len())
            .field("in_flight", &state.tables.in_flight.len())
            .field("errors", &state.tables.errors.len())
            .finish()
    }
}

fn active_platform(config: &CacheConfig) -> CacheResult<Platform> {
    match config.platform.as_deref() {
        Some(key) => Platform::parse(key)
            .ok_or_else(|| CacheError::ConfigError(format!("unknown platform: {key}"))),
        None => Platform::current()
            .ok_or_else(|| CacheError::ConfigError("host platform is not supported".to_string())),
    }
}

/// Configured platforms, always including the active one
fn configured_platforms(config: &CacheConfig, active: Platform) -> CacheResult<Vec<Platform>> {
    let mut platforms = vec![active];
    for key in &config.platforms {
        let p = Platform::parse(key)
            .ok_or_else(|| CacheError::ConfigError(format!("unknown platform: {key}")))?;
        if !platforms.contains(&p) {
            platforms.push(p);
        }
    }
    Ok(platforms)
}

/// Run blocking file work off the async workers
async fn blocking<T, F>(f: F) -> CacheResult<T>
where
    F: FnOnce() -> bundlecache_bundle::BundleResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CacheError::Internal(format!("blocking task failed: {e}")))?
        .map_err(CacheError::from)
}

#[cfg(test)]
#[path = "registry/registry_tests.rs"]
mod registry_tests;
