//! Process-wide loading of the mapping runtime
//!
//! The runtime asset is loaded at most once per loader. The first caller
//! starts the load on a detached task, concurrent callers await that same
//! load, later callers get the cached outcome. A caller that gives up early
//! does not abort the load. A failed load is cached too and never retried.
//! The loaded runtime lives for the rest of the process.

use crate::{
    runtime,
    traits::{MapRuntime, RuntimeAsset},
    RuntimeLoadError,
};
use futures::future::{BoxFuture, FutureExt, Shared};
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

type LoadOutcome = std::result::Result<Arc<dyn MapRuntime>, RuntimeLoadError>;
type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

static GLOBAL_LOADER: Lazy<SdkLoader> = Lazy::new(SdkLoader::new);

pub struct SdkLoader {
    load: Mutex<Option<SharedLoad>>,
    loads_started: AtomicUsize,
}

impl SdkLoader {
    pub fn new() -> Self {
        Self {
            load: Mutex::new(None),
            loads_started: AtomicUsize::new(0),
        }
    }

    /// The loader shared by every session in the process
    pub fn global() -> &'static SdkLoader {
        &GLOBAL_LOADER
    }

    /// Resolves once the runtime is available. Only the first caller's
    /// `asset` is ever loaded.
    pub async fn ensure_ready(&self, asset: Arc<dyn RuntimeAsset>) -> LoadOutcome {
        let load = {
            let mut slot = self.load.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            slot.get_or_insert_with(|| self.start_load(asset)).clone()
        };
        load.await
    }

    fn start_load(&self, asset: Arc<dyn RuntimeAsset>) -> SharedLoad {
        self.loads_started.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        runtime::spawn(async move {
            log::debug!("loading map runtime asset '{}'", asset.name());
            let outcome = match asset.load().await {
                Ok(Some(runtime)) => Ok(runtime),
                Ok(None) => Err(RuntimeLoadError::CapabilityMissing),
                Err(message) => Err(RuntimeLoadError::Asset(message)),
            };
            match &outcome {
                Ok(_) => log::info!("map runtime '{}' ready", asset.name()),
                Err(e) => log::error!("map runtime '{}' unavailable: {}", asset.name(), e),
            }
            let _ = tx.send(outcome);
        });
        async move {
            rx.await
                .unwrap_or_else(|_| Err(RuntimeLoadError::Asset("load task aborted".to_string())))
        }
        .boxed()
        .shared()
    }

    /// The runtime, if a load already succeeded
    pub fn get(&self) -> Option<Arc<dyn MapRuntime>> {
        let slot = self.load.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.as_ref()
            .and_then(|load| load.peek())
            .and_then(|outcome| outcome.as_ref().ok().cloned())
    }

    pub fn is_ready(&self) -> bool {
        self.get().is_some()
    }

    /// Number of loads ever started; at most one
    pub fn loads_started(&self) -> usize {
        self.loads_started.load(Ordering::SeqCst)
    }
}

impl Default for SdkLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessAsset, HeadlessRuntime};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_load() {
        let loader = SdkLoader::new();
        let asset = Arc::new(
            HeadlessAsset::new(HeadlessRuntime::new()).with_delay(Duration::from_millis(50)),
        );

        let results =
            futures::future::join_all((0..8).map(|_| loader.ensure_ready(asset.clone()))).await;

        assert_eq!(loader.loads_started(), 1);
        assert_eq!(asset.load_calls(), 1);
        let first = results[0].as_ref().unwrap();
        assert!(results
            .iter()
            .all(|r| Arc::ptr_eq(r.as_ref().unwrap(), first)));
        assert!(loader.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_caller_does_not_restart_the_load() {
        let loader = SdkLoader::new();
        let asset = Arc::new(
            HeadlessAsset::new(HeadlessRuntime::new()).with_delay(Duration::from_millis(100)),
        );

        let gave_up =
            tokio::time::timeout(Duration::from_millis(10), loader.ensure_ready(asset.clone()))
                .await;
        assert!(gave_up.is_err());
        assert!(!loader.is_ready());

        let runtime = loader.ensure_ready(asset.clone()).await.unwrap();

        assert_eq!(asset.load_calls(), 1);
        assert_eq!(loader.loads_started(), 1);
        assert!(Arc::ptr_eq(&runtime, &loader.get().unwrap()));
    }

    #[tokio::test]
    async fn test_ready_runtime_is_returned_immediately() {
        let loader = SdkLoader::new();
        let asset = Arc::new(HeadlessAsset::new(HeadlessRuntime::new()));

        let first = loader.ensure_ready(asset.clone()).await.unwrap();
        let second = loader.ensure_ready(asset.clone()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(asset.load_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_capability_is_cached() {
        let loader = SdkLoader::new();
        let asset = Arc::new(HeadlessAsset::missing_capability());

        let err = loader.ensure_ready(asset.clone()).await.err().unwrap();
        assert_eq!(err, RuntimeLoadError::CapabilityMissing);

        let again = loader.ensure_ready(asset.clone()).await.err().unwrap();
        assert_eq!(again, RuntimeLoadError::CapabilityMissing);
        assert_eq!(asset.load_calls(), 1);
        assert!(!loader.is_ready());
    }

    #[tokio::test]
    async fn test_asset_failure_is_reported() {
        let loader = SdkLoader::new();
        let asset = Arc::new(HeadlessAsset::failing("script blocked"));

        let err = loader.ensure_ready(asset).await.err().unwrap();
        assert_eq!(err, RuntimeLoadError::Asset("script blocked".to_string()));
    }
}
