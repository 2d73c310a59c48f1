//! Pollable bundle and asset operations
//!
//! The registry keeps one [`Operation`] per caller request and advances it on
//! every tick. Callers observe it through a [`BundleRequest`] or
//! [`AssetRequest`], which read the latest status from a watch channel.

use crate::registry::LoadedBundle;
use crate::request::LoadRequest;
use bundlecache_bundle::{Asset, BundleHandle, BundleResult};
use bundlecache_core::{CacheError, CacheResult};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// Status published to request handles
#[derive(Clone)]
pub enum Completion {
    /// Still loading, with progress in `[0, 1]`
    Pending(f32),
    /// Bundle is open
    Bundle(Arc<dyn BundleHandle>),
    /// Object bytes were extracted
    Object(Arc<[u8]>),
    /// Terminal failure
    Failed(CacheError),
}

impl Completion {
    pub fn is_done(&self) -> bool {
        !matches!(self, Completion::Pending(_))
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Pending(p) => f.debug_tuple("Pending").field(p).finish(),
            Completion::Bundle(h) => f.debug_tuple("Bundle").field(&h.name()).finish(),
            Completion::Object(bytes) => write!(f, "Object({} bytes)", bytes.len()),
            Completion::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

/// Read-only view of registry tables used to advance operations
pub(crate) struct OperationContext<'a> {
    pub loaded: &'a HashMap<String, LoadedBundle>,
    pub in_flight: &'a BTreeMap<String, LoadRequest>,
    pub errors: &'a HashMap<String, CacheError>,
}

impl OperationContext<'_> {
    /// Where the bundle stands for an operation waiting on it
    fn bundle_status(&self, name: &str) -> Completion {
        if let Some(bundle) = self.loaded.get(name) {
            Completion::Bundle(Arc::clone(&bundle.handle))
        } else if let Some(err) = self.errors.get(name) {
            Completion::Failed(err.clone())
        } else if let Some(request) = self.in_flight.get(name) {
            Completion::Pending(request.progress())
        } else {
            Completion::Failed(CacheError::Cancelled)
        }
    }
}

/// Operation waiting for a bundle to open
pub(crate) struct BundleOperation {
    name: String,
    tx: watch::Sender<Completion>,
    done: bool,
}

/// Phase of an asset operation
enum AssetPhase {
    WaitingForBundle,
    Extracting {
        task: JoinHandle<()>,
        result: oneshot::Receiver<BundleResult<Vec<u8>>>,
    },
    Done,
}

/// Operation extracting one object from a bundle once it is open
pub(crate) struct AssetOperation {
    bundle: String,
    object: String,
    type_tag: &'static str,
    tx: watch::Sender<Completion>,
    phase: AssetPhase,
}

/// A caller-visible unit of work advanced by the polling loop
pub(crate) enum Operation {
    Bundle(BundleOperation),
    Asset(AssetOperation),
}

impl Operation {
    /// Create a bundle operation and its request handle
    pub fn bundle(name: &str) -> (Self, BundleRequest) {
        let (tx, rx) = watch::channel(Completion::Pending(0.0));
        let op = Operation::Bundle(BundleOperation {
            name: name.to_string(),
            tx,
            done: false,
        });
        let request = BundleRequest {
            name: name.to_string(),
            rx,
        };
        (op, request)
    }

    /// Create an asset operation and its typed request handle
    pub fn asset<T: Asset>(bundle: &str, object: &str) -> (Self, AssetRequest<T>) {
        let (tx, rx) = watch::channel(Completion::Pending(0.0));
        let op = Operation::Asset(AssetOperation {
            bundle: bundle.to_string(),
            object: object.to_string(),
            type_tag: T::TYPE_TAG,
            tx,
            phase: AssetPhase::WaitingForBundle,
        });
        let request = AssetRequest {
            bundle: bundle.to_string(),
            asset: object.to_string(),
            rx,
            _marker: PhantomData,
        };
        (op, request)
    }

    /// Advance by one tick
    pub fn update(&mut self, ctx: &OperationContext<'_>) {
        match self {
            Operation::Bundle(op) => op.update(ctx),
            Operation::Asset(op) => op.update(ctx),
        }
    }

    /// Whether the operation can be dropped from the registry
    ///
    /// Operations whose request handles were all dropped are done too.
    pub fn is_done(&self) -> bool {
        match self {
            Operation::Bundle(op) => op.done || op.tx.is_closed(),
            Operation::Asset(op) => matches!(op.phase, AssetPhase::Done) || op.tx.is_closed(),
        }
    }

    /// Fail the operation if it has not finished
    pub fn cancel(&mut self, err: CacheError) {
        match self {
            Operation::Bundle(op) => {
                if !op.done {
                    op.done = true;
                    op.tx.send_replace(Completion::Failed(err));
                }
            }
            Operation::Asset(op) => op.finish(Completion::Failed(err)),
        }
    }
}

impl BundleOperation {
    fn update(&mut self, ctx: &OperationContext<'_>) {
        if self.done {
            return;
        }
        let status = ctx.bundle_status(&self.name);
        self.done = status.is_done();
        publish(&self.tx, status);
    }
}

impl AssetOperation {
    fn update(&mut self, ctx: &OperationContext<'_>) {
        match &mut self.phase {
            AssetPhase::WaitingForBundle => match ctx.bundle_status(&self.bundle) {
                Completion::Bundle(handle) => self.start_extract(handle),
                status => {
                    if status.is_done() {
                        self.finish(status);
                    } else {
                        publish(&self.tx, status);
                    }
                }
            },
            AssetPhase::Extracting { result, .. } => match result.try_recv() {
                Ok(Ok(bytes)) => self.finish(Completion::Object(Arc::from(bytes))),
                Ok(Err(err)) => self.finish(Completion::Failed(err.into())),
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => {
                    let err = CacheError::Internal(format!(
                        "extract task for {}/{} ended without a result",
                        self.bundle, self.object
                    ));
                    self.finish(Completion::Failed(err));
                }
            },
            AssetPhase::Done => {}
        }
    }

    fn start_extract(&mut self, handle: Arc<dyn BundleHandle>) {
        let (tx, rx) = oneshot::channel();
        let object = self.object.clone();
        let type_tag = self.type_tag;
        let task = tokio::spawn(async move {
            let result = handle.load_object(&object, type_tag).await;
            let _ = tx.send(result);
        });
        self.phase = AssetPhase::Extracting { task, result: rx };
    }

    fn finish(&mut self, status: Completion) {
        if let AssetPhase::Extracting { task, .. } = &self.phase {
            task.abort();
        }
        if matches!(self.phase, AssetPhase::Done) {
            return;
        }
        if let Completion::Failed(err) = &status {
            tracing::debug!(
                bundle = %self.bundle,
                object = %self.object,
                error = %err,
                "asset load failed"
            );
        }
        self.phase = AssetPhase::Done;
        self.tx.send_replace(status);
    }
}

/// Publish pending progress only when it changed
fn publish(tx: &watch::Sender<Completion>, status: Completion) {
    tx.send_if_modified(|current| {
        let unchanged = matches!(
            (&*current, &status),
            (Completion::Pending(a), Completion::Pending(b)) if (a - b).abs() < f32::EPSILON
        );
        if !unchanged {
            *current = status.clone();
        }
        !unchanged
    });
}

// ============================================================================
// Request handles
// ============================================================================

/// Handle to a pending bundle load
pub struct BundleRequest {
    name: String,
    rx: watch::Receiver<Completion>,
}

impl BundleRequest {
    /// Name of the requested bundle
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the load finished, successfully or not
    pub fn is_done(&self) -> bool {
        self.rx.borrow().is_done()
    }

    /// Progress in `[0, 1]`
    pub fn progress(&self) -> f32 {
        match &*self.rx.borrow() {
            Completion::Pending(p) => *p,
            Completion::Failed(_) => 0.0,
            _ => 1.0,
        }
    }

    /// Error of a failed load
    pub fn error(&self) -> Option<CacheError> {
        match &*self.rx.borrow() {
            Completion::Failed(e) => Some(e.clone()),
            _ => None,
        }
    }

    /// Open handle of a successful load
    pub fn handle(&self) -> Option<Arc<dyn BundleHandle>> {
        match &*self.rx.borrow() {
            Completion::Bundle(h) => Some(Arc::clone(h)),
            _ => None,
        }
    }

    /// Wait until the load finishes
    pub async fn wait(&mut self) -> CacheResult<Arc<dyn BundleHandle>> {
        let status = wait_done(&mut self.rx).await?;
        match status {
            Completion::Bundle(h) => Ok(h),
            Completion::Failed(e) => Err(e),
            other => Err(CacheError::Internal(format!(
                "unexpected bundle status {other:?}"
            ))),
        }
    }
}

impl fmt::Debug for BundleRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleRequest")
            .field("name", &self.name)
            .field("status", &*self.rx.borrow())
            .finish()
    }
}

/// Handle to a pending typed asset load
pub struct AssetRequest<T> {
    bundle: String,
    asset: String,
    rx: watch::Receiver<Completion>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Asset> AssetRequest<T> {
    pub fn bundle(&self) -> &str {
        &self.bundle
    }

    /// Object name within the bundle
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Whether the load finished, successfully or not
    pub fn is_done(&self) -> bool {
        self.rx.borrow().is_done()
    }

    /// Progress in `[0, 1]`
    ///
    /// Reaching the extraction phase counts as fully loaded.
    pub fn progress(&self) -> f32 {
        match &*self.rx.borrow() {
            Completion::Pending(p) => *p,
            Completion::Failed(_) => 0.0,
            _ => 1.0,
        }
    }

    /// Error of a failed load
    pub fn error(&self) -> Option<CacheError> {
        match &*self.rx.borrow() {
            Completion::Failed(e) => Some(e.clone()),
            _ => None,
        }
    }

    /// Decode the asset once the load succeeded
    pub fn get_asset(&self) -> CacheResult<T> {
        let status = self.rx.borrow().clone();
        self.decode(status)
    }

    /// Wait until the load finishes and decode the asset
    pub async fn wait(&mut self) -> CacheResult<T> {
        let status = wait_done(&mut self.rx).await?;
        self.decode(status)
    }

    fn decode(&self, status: Completion) -> CacheResult<T> {
        match status {
            Completion::Object(bytes) => T::from_bytes(&self.asset, bytes.to_vec()).map_err(Into::into),
            Completion::Failed(e) => Err(e),
            Completion::Pending(_) => Err(CacheError::InvalidState {
                expected: "Success".to_string(),
                actual: "Requesting".to_string(),
            }),
            Completion::Bundle(_) => Err(CacheError::Internal(
                "asset request resolved to a bundle".to_string(),
            )),
        }
    }
}

impl<T> fmt::Debug for AssetRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetRequest")
            .field("bundle", &self.bundle)
            .field("asset", &self.asset)
            .field("status", &*self.rx.borrow())
            .finish()
    }
}

async fn wait_done(rx: &mut watch::Receiver<Completion>) -> CacheResult<Completion> {
    let status = rx
        .wait_for(Completion::is_done)
        .await
        .map_err(|_| CacheError::Cancelled)?;
    Ok(status.clone())
}
