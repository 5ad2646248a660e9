//! NDI source discovery.

use std::ffi::CStr;
use std::sync::Arc;

use super::api::NdiApi;
use super::error::NdiError;
use super::ffi::{NDIlib_find_create_t, NDIlib_find_instance_t};
use super::types::Source;

/// Owned NDI finder handle.
pub struct Finder {
    api: Arc<dyn NdiApi>,
    instance: NDIlib_find_instance_t,
}

// Finder instances are internally synchronized by the SDK.
unsafe impl Send for Finder {}

impl Finder {
    /// Create a finder that includes local sources and searches default groups.
    pub fn create(api: Arc<dyn NdiApi>) -> Result<Self, NdiError> {
        let create_settings = NDIlib_find_create_t::default();
        let instance = unsafe { api.find_create_v2(&create_settings) };
        if instance.is_null() {
            return Err(NdiError::Creation("finder"));
        }
        tracing::info!("NDI: Finder created");
        Ok(Self { api, instance })
    }

    /// Snapshot of the sources discovered so far.
    pub fn current_sources(&self) -> Vec<Source> {
        let mut count: u32 = 0;
        let sources = unsafe { self.api.find_get_current_sources(self.instance, &mut count) };
        if sources.is_null() || count == 0 {
            return Vec::new();
        }

        // The array stays valid until the next call on this finder.
        let raw = unsafe { std::slice::from_raw_parts(sources, count as usize) };
        raw.iter()
            .filter(|s| !s.p_ndi_name.is_null())
            .map(|s| unsafe {
                Source {
                    ndi_name: CStr::from_ptr(s.p_ndi_name).to_string_lossy().into_owned(),
                    url_address: (!s.p_url_address.is_null())
                        .then(|| CStr::from_ptr(s.p_url_address).to_string_lossy().into_owned()),
                }
            })
            .collect()
    }

    /// Block until the source list changes or `timeout_ms` elapses.
    pub fn wait_for_sources(&self, timeout_ms: u32) -> bool {
        unsafe { self.api.find_wait_for_sources(self.instance, timeout_ms) }
    }
}

impl Drop for Finder {
    fn drop(&mut self) {
        unsafe { self.api.find_destroy(self.instance) };
        tracing::debug!("NDI: Finder destroyed");
    }
}
