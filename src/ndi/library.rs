//! Runtime loading of the NDI shared library.
//!
//! The SDK is redistributed as a separate runtime, so it is opened with
//! `libloading` at startup instead of being linked. All entry points are
//! resolved eagerly; a runtime that lacks one is rejected up front.

use std::ffi::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use super::api::NdiApi;
use super::error::NdiError;
use super::ffi::*;

/// Environment variables the NDI installers set to the runtime directory.
pub const RUNTIME_DIR_VARS: [&str; 2] = ["NDI_RUNTIME_DIR_V6", "NDI_RUNTIME_DIR_V5"];

/// Platform file names of the NDI runtime, in order of preference.
pub fn library_names() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        if cfg!(target_pointer_width = "64") {
            &["Processing.NDI.Lib.x64.dll"]
        } else {
            &["Processing.NDI.Lib.x86.dll"]
        }
    } else if cfg!(target_os = "macos") {
        &["libndi.dylib"]
    } else {
        &["libndi.so.6", "libndi.so.5", "libndi.so"]
    }
}

/// Well-known install locations checked after the environment variables.
fn fallback_dirs() -> &'static [&'static str] {
    if cfg!(target_os = "macos") {
        &["/Library/NDI SDK for Apple/lib/macOS", "/usr/local/lib"]
    } else if cfg!(target_os = "windows") {
        &[]
    } else {
        &["/usr/local/lib"]
    }
}

/// Build the ordered list of paths to try.
///
/// An explicit path wins. Runtime directories from the environment come next,
/// then well-known install locations, and finally the bare file names so the
/// system loader search path gets a chance.
pub fn candidate_paths<F>(explicit: Option<&Path>, env: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let mut paths = Vec::new();

    if let Some(path) = explicit {
        paths.push(path.to_path_buf());
    }

    for var in RUNTIME_DIR_VARS {
        if let Some(dir) = env(var).filter(|d| !d.is_empty()) {
            for name in library_names() {
                paths.push(Path::new(&dir).join(name));
            }
        }
    }

    for dir in fallback_dirs() {
        for name in library_names() {
            paths.push(Path::new(dir).join(name));
        }
    }

    for name in library_names() {
        paths.push(PathBuf::from(name));
    }

    paths
}

struct NdiFunctions {
    initialize: NDIlib_initialize_fn,
    destroy: NDIlib_destroy_fn,
    version: NDIlib_version_fn,
    is_supported_cpu: NDIlib_is_supported_CPU_fn,
    find_create_v2: NDIlib_find_create_v2_fn,
    find_destroy: NDIlib_find_destroy_fn,
    find_get_current_sources: NDIlib_find_get_current_sources_fn,
    find_wait_for_sources: NDIlib_find_wait_for_sources_fn,
    recv_create_v3: NDIlib_recv_create_v3_fn,
    recv_destroy: NDIlib_recv_destroy_fn,
    recv_capture_v2: NDIlib_recv_capture_v2_fn,
    recv_free_video_v2: NDIlib_recv_free_video_v2_fn,
    recv_set_tally: NDIlib_recv_set_tally_fn,
    recv_get_no_connections: NDIlib_recv_get_no_connections_fn,
    recv_ptz_is_supported: NDIlib_recv_ptz_is_supported_fn,
    recv_ptz_zoom: NDIlib_recv_ptz_zoom_fn,
    recv_ptz_zoom_speed: NDIlib_recv_ptz_zoom_speed_fn,
    recv_ptz_pan_tilt: NDIlib_recv_ptz_pan_tilt_fn,
    recv_ptz_pan_tilt_speed: NDIlib_recv_ptz_pan_tilt_speed_fn,
    recv_ptz_store_preset: NDIlib_recv_ptz_store_preset_fn,
    recv_ptz_recall_preset: NDIlib_recv_ptz_recall_preset_fn,
}

macro_rules! symbol {
    ($lib:expr, $ty:ty, $name:literal) => {{
        let sym = $lib
            .get::<$ty>(concat!($name, "\0").as_bytes())
            .map_err(|source| NdiError::MissingSymbol { symbol: $name, source })?;
        *sym
    }};
}

impl NdiFunctions {
    /// # Safety
    /// `lib` must be an NDI runtime exporting the declared signatures.
    unsafe fn resolve(lib: &libloading::Library) -> Result<Self, NdiError> {
        Ok(Self {
            initialize: symbol!(lib, NDIlib_initialize_fn, "NDIlib_initialize"),
            destroy: symbol!(lib, NDIlib_destroy_fn, "NDIlib_destroy"),
            version: symbol!(lib, NDIlib_version_fn, "NDIlib_version"),
            is_supported_cpu: symbol!(lib, NDIlib_is_supported_CPU_fn, "NDIlib_is_supported_CPU"),
            find_create_v2: symbol!(lib, NDIlib_find_create_v2_fn, "NDIlib_find_create_v2"),
            find_destroy: symbol!(lib, NDIlib_find_destroy_fn, "NDIlib_find_destroy"),
            find_get_current_sources: symbol!(
                lib,
                NDIlib_find_get_current_sources_fn,
                "NDIlib_find_get_current_sources"
            ),
            find_wait_for_sources: symbol!(
                lib,
                NDIlib_find_wait_for_sources_fn,
                "NDIlib_find_wait_for_sources"
            ),
            recv_create_v3: symbol!(lib, NDIlib_recv_create_v3_fn, "NDIlib_recv_create_v3"),
            recv_destroy: symbol!(lib, NDIlib_recv_destroy_fn, "NDIlib_recv_destroy"),
            recv_capture_v2: symbol!(lib, NDIlib_recv_capture_v2_fn, "NDIlib_recv_capture_v2"),
            recv_free_video_v2: symbol!(lib, NDIlib_recv_free_video_v2_fn, "NDIlib_recv_free_video_v2"),
            recv_set_tally: symbol!(lib, NDIlib_recv_set_tally_fn, "NDIlib_recv_set_tally"),
            recv_get_no_connections: symbol!(
                lib,
                NDIlib_recv_get_no_connections_fn,
                "NDIlib_recv_get_no_connections"
            ),
            recv_ptz_is_supported: symbol!(
                lib,
                NDIlib_recv_ptz_is_supported_fn,
                "NDIlib_recv_ptz_is_supported"
            ),
            recv_ptz_zoom: symbol!(lib, NDIlib_recv_ptz_zoom_fn, "NDIlib_recv_ptz_zoom"),
            recv_ptz_zoom_speed: symbol!(lib, NDIlib_recv_ptz_zoom_speed_fn, "NDIlib_recv_ptz_zoom_speed"),
            recv_ptz_pan_tilt: symbol!(lib, NDIlib_recv_ptz_pan_tilt_fn, "NDIlib_recv_ptz_pan_tilt"),
            recv_ptz_pan_tilt_speed: symbol!(
                lib,
                NDIlib_recv_ptz_pan_tilt_speed_fn,
                "NDIlib_recv_ptz_pan_tilt_speed"
            ),
            recv_ptz_store_preset: symbol!(
                lib,
                NDIlib_recv_ptz_store_preset_fn,
                "NDIlib_recv_ptz_store_preset"
            ),
            recv_ptz_recall_preset: symbol!(
                lib,
                NDIlib_recv_ptz_recall_preset_fn,
                "NDIlib_recv_ptz_recall_preset"
            ),
        })
    }
}

/// A loaded NDI runtime.
pub struct NdiLibrary {
    fns: NdiFunctions,
    path: PathBuf,
    initialized: AtomicBool,
    // Must outlive every function pointer in `fns`.
    _library: libloading::Library,
}

impl NdiLibrary {
    /// Load the runtime, trying `explicit` first and then the usual locations.
    pub fn load(explicit: Option<&Path>) -> Result<Self, NdiError> {
        let candidates = candidate_paths(explicit, |var| std::env::var(var).ok());
        let mut tried = Vec::with_capacity(candidates.len());

        for path in candidates {
            match unsafe { Self::open(&path) } {
                Ok(Some(library)) => return Ok(library),
                Ok(None) => tried.push(path.display().to_string()),
                Err(e) => return Err(e),
            }
        }

        Err(NdiError::LibraryNotFound { tried })
    }

    /// Returns `Ok(None)` if nothing loadable exists at `path`.
    unsafe fn open(path: &Path) -> Result<Option<Self>, NdiError> {
        let library = match libloading::Library::new(path) {
            Ok(library) => library,
            Err(e) => {
                tracing::debug!("NDI: Could not load {}: {}", path.display(), e);
                return Ok(None);
            }
        };

        let fns = NdiFunctions::resolve(&library)?;
        tracing::info!("NDI: Loaded runtime from {}", path.display());

        Ok(Some(Self {
            fns,
            path: path.to_path_buf(),
            initialized: AtomicBool::new(false),
            _library: library,
        }))
    }

    /// Path the runtime was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// Receivers and finders hold their own `Arc` to the library, so this only
// runs once every native handle is gone.
impl Drop for NdiLibrary {
    fn drop(&mut self) {
        self.destroy();
        tracing::debug!("NDI: Unloading runtime {}", self.path.display());
    }
}

impl NdiApi for NdiLibrary {
    fn initialize(&self) -> bool {
        let ok = unsafe { (self.fns.initialize)() };
        if ok {
            self.initialized.store(true, Ordering::Release);
        }
        ok
    }

    fn destroy(&self) {
        if self.initialized.swap(false, Ordering::AcqRel) {
            unsafe { (self.fns.destroy)() }
        }
    }

    fn version(&self) -> *const c_char {
        unsafe { (self.fns.version)() }
    }

    fn is_supported_cpu(&self) -> bool {
        unsafe { (self.fns.is_supported_cpu)() }
    }

    unsafe fn find_create_v2(&self, settings: *const NDIlib_find_create_t) -> NDIlib_find_instance_t {
        (self.fns.find_create_v2)(settings)
    }

    unsafe fn find_destroy(&self, instance: NDIlib_find_instance_t) {
        (self.fns.find_destroy)(instance)
    }

    unsafe fn find_get_current_sources(
        &self,
        instance: NDIlib_find_instance_t,
        count: *mut u32,
    ) -> *const NDIlib_source_t {
        (self.fns.find_get_current_sources)(instance, count)
    }

    unsafe fn find_wait_for_sources(&self, instance: NDIlib_find_instance_t, timeout_ms: u32) -> bool {
        (self.fns.find_wait_for_sources)(instance, timeout_ms)
    }

    unsafe fn recv_create_v3(&self, settings: *const NDIlib_recv_create_v3_t) -> NDIlib_recv_instance_t {
        (self.fns.recv_create_v3)(settings)
    }

    unsafe fn recv_destroy(&self, instance: NDIlib_recv_instance_t) {
        (self.fns.recv_destroy)(instance)
    }

    unsafe fn recv_capture_v2(
        &self,
        instance: NDIlib_recv_instance_t,
        video: *mut NDIlib_video_frame_v2_t,
        timeout_ms: u32,
    ) -> NDIlib_frame_type_e {
        (self.fns.recv_capture_v2)(
            instance,
            video,
            std::ptr::null_mut(), // No audio
            std::ptr::null_mut(), // No metadata
            timeout_ms,
        )
    }

    unsafe fn recv_free_video_v2(&self, instance: NDIlib_recv_instance_t, video: *const NDIlib_video_frame_v2_t) {
        (self.fns.recv_free_video_v2)(instance, video)
    }

    unsafe fn recv_set_tally(&self, instance: NDIlib_recv_instance_t, tally: *const NDIlib_tally_t) -> bool {
        (self.fns.recv_set_tally)(instance, tally)
    }

    unsafe fn recv_get_no_connections(&self, instance: NDIlib_recv_instance_t) -> c_int {
        (self.fns.recv_get_no_connections)(instance)
    }

    unsafe fn recv_ptz_is_supported(&self, instance: NDIlib_recv_instance_t) -> bool {
        (self.fns.recv_ptz_is_supported)(instance)
    }

    unsafe fn recv_ptz_zoom(&self, instance: NDIlib_recv_instance_t, zoom: f32) -> bool {
        (self.fns.recv_ptz_zoom)(instance, zoom)
    }

    unsafe fn recv_ptz_zoom_speed(&self, instance: NDIlib_recv_instance_t, zoom_speed: f32) -> bool {
        (self.fns.recv_ptz_zoom_speed)(instance, zoom_speed)
    }

    unsafe fn recv_ptz_pan_tilt(&self, instance: NDIlib_recv_instance_t, pan: f32, tilt: f32) -> bool {
        (self.fns.recv_ptz_pan_tilt)(instance, pan, tilt)
    }

    unsafe fn recv_ptz_pan_tilt_speed(
        &self,
        instance: NDIlib_recv_instance_t,
        pan_speed: f32,
        tilt_speed: f32,
    ) -> bool {
        (self.fns.recv_ptz_pan_tilt_speed)(instance, pan_speed, tilt_speed)
    }

    unsafe fn recv_ptz_store_preset(&self, instance: NDIlib_recv_instance_t, preset: c_int) -> bool {
        (self.fns.recv_ptz_store_preset)(instance, preset)
    }

    unsafe fn recv_ptz_recall_preset(&self, instance: NDIlib_recv_instance_t, preset: c_int, speed: f32) -> bool {
        (self.fns.recv_ptz_recall_preset)(instance, preset, speed)
    }
}
