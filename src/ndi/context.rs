//! Process-wide NDI runtime handle.
//!
//! [`Ndi`] checks and initializes the runtime once and keeps a single shared
//! [`Finder`] that receivers use to resolve source names. The finder is only
//! created the first time a lookup happens.

use std::ffi::CStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::api::NdiApi;
use super::error::NdiError;
use super::find::Finder;
use super::library::NdiLibrary;
use super::recv::{Recv, RecvOptions};
use super::types::Source;

/// Initialized NDI runtime plus the shared source finder.
pub struct Ndi {
    api: Arc<dyn NdiApi>,
    finder: Mutex<Option<Finder>>,
}

impl Ndi {
    /// Load the runtime from disk and initialize it.
    pub fn load(library_path: Option<&Path>) -> Result<Self, NdiError> {
        let library = NdiLibrary::load(library_path)?;
        Self::with_api(Arc::new(library))
    }

    /// Initialize an already loaded runtime.
    pub fn with_api(api: Arc<dyn NdiApi>) -> Result<Self, NdiError> {
        if !api.is_supported_cpu() {
            tracing::error!("NDI: CPU is not supported");
            return Err(NdiError::UnsupportedCpu);
        }
        if !api.initialize() {
            tracing::error!("NDI: Failed to initialize library");
            return Err(NdiError::NotInitialized);
        }

        let ndi = Self {
            api,
            finder: Mutex::new(None),
        };
        tracing::info!("NDI: Library initialized (version: {})", ndi.version());
        Ok(ndi)
    }

    pub fn api(&self) -> &Arc<dyn NdiApi> {
        &self.api
    }

    /// Runtime version string.
    pub fn version(&self) -> String {
        let version_ptr = self.api.version();
        if version_ptr.is_null() {
            return "unknown".to_string();
        }
        unsafe { CStr::from_ptr(version_ptr) }
            .to_string_lossy()
            .into_owned()
    }

    fn with_finder<R>(&self, f: impl FnOnce(&Finder) -> R) -> Option<R> {
        let mut guard = self.finder.lock();
        if guard.is_none() {
            match Finder::create(self.api.clone()) {
                Ok(finder) => *guard = Some(finder),
                Err(e) => {
                    tracing::warn!("NDI: {}", e);
                    return None;
                }
            }
        }
        guard.as_ref().map(f)
    }

    /// Sources currently visible on the network.
    pub fn current_sources(&self) -> Vec<Source> {
        self.with_finder(Finder::current_sources).unwrap_or_default()
    }

    /// Block until the source list changes or the timeout elapses.
    pub fn wait_for_sources(&self, timeout: Duration) -> bool {
        let timeout_ms = timeout.as_millis().min(u32::MAX as u128) as u32;
        self.with_finder(|finder| finder.wait_for_sources(timeout_ms))
            .unwrap_or(false)
    }

    /// Look up a source by its exact NDI name.
    pub fn find_source(&self, ndi_name: &str) -> Option<Source> {
        self.current_sources()
            .into_iter()
            .find(|source| source.ndi_name == ndi_name)
    }

    /// Create a receiver for `ndi_name` if that source is currently visible.
    ///
    /// Returns `Ok(None)` when the source has not been discovered (yet).
    pub fn try_create_recv(&self, ndi_name: &str, options: &RecvOptions) -> Result<Option<Recv>, NdiError> {
        if ndi_name.is_empty() {
            return Ok(None);
        }
        let Some(source) = self.find_source(ndi_name) else {
            tracing::debug!("NDI: Source '{}' not found", ndi_name);
            return Ok(None);
        };
        Recv::create(self.api.clone(), &source, options).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndi::testing::FakeApi;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_initializes_runtime() {
        let api = Arc::new(FakeApi::with_sources(&[]));
        let ndi = Ndi::with_api(api.clone()).unwrap();
        assert!(api.state.lock().initialized);
        assert_eq!(ndi.version(), "NDI SDK FAKE 6.0.0");
    }

    #[test]
    fn test_unsupported_cpu() {
        let api = Arc::new(FakeApi::with_sources(&[]));
        api.cpu_supported.store(false, Ordering::SeqCst);
        assert!(matches!(Ndi::with_api(api), Err(NdiError::UnsupportedCpu)));
    }

    #[test]
    fn test_initialize_failure() {
        let api = Arc::new(FakeApi::with_sources(&["A (One)"]));
        api.init_ok.store(false, Ordering::SeqCst);

        assert!(matches!(Ndi::with_api(api.clone()), Err(NdiError::NotInitialized)));
        let state = api.state.lock();
        assert!(!state.initialized);
        assert_eq!(state.finders_created, 0);
    }

    #[test]
    fn test_source_discovered_after_startup() {
        let api = Arc::new(FakeApi::with_sources(&[]));
        let ndi = Ndi::with_api(api.clone()).unwrap();
        assert!(ndi.find_source("A (One)").is_none());

        api.add_source("A (One)");
        assert!(ndi.find_source("A (One)").is_some());
        assert_eq!(api.state.lock().finders_created, 1);
    }

    #[test]
    fn test_finder_is_created_lazily_and_shared() {
        let api = Arc::new(FakeApi::with_sources(&["A (One)"]));
        let ndi = Ndi::with_api(api.clone()).unwrap();
        assert_eq!(api.state.lock().finders_created, 0);

        assert!(ndi.find_source("A (One)").is_some());
        assert!(ndi.find_source("Missing").is_none());
        assert!(ndi.wait_for_sources(Duration::from_millis(5)));
        assert_eq!(api.state.lock().finders_created, 1);
    }

    #[test]
    fn test_try_create_recv() {
        let api = Arc::new(FakeApi::with_sources(&["A (One)"]));
        let ndi = Ndi::with_api(api.clone()).unwrap();

        assert!(ndi.try_create_recv("", &RecvOptions::default()).unwrap().is_none());
        assert!(ndi.try_create_recv("B (Two)", &RecvOptions::default()).unwrap().is_none());
        assert!(api.state.lock().created.is_empty());

        let recv = ndi.try_create_recv("A (One)", &RecvOptions::default()).unwrap();
        assert_eq!(recv.map(|r| r.source().ndi_name.clone()).as_deref(), Some("A (One)"));
    }
}
