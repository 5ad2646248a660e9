//! In-memory stand-in for the NDI runtime used by unit tests.

use std::collections::VecDeque;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::api::NdiApi;
use super::ffi::*;
use super::types::{FourCC, Tally};

/// A frame the fake hands out on the next capture.
pub struct FakeFrame {
    pub width: u32,
    pub height: u32,
    pub fourcc: u32,
    pub stride: i32,
    pub data: Vec<u8>,
    pub metadata: Option<CString>,
}

impl FakeFrame {
    pub fn new(fourcc: FourCC, width: u32, height: u32) -> Self {
        let stride = fourcc.default_stride(width);
        let data = vec![0x80; fourcc.buffer_size(width, height, stride)];
        Self {
            width,
            height,
            fourcc: fourcc.to_raw(),
            stride: 0,
            data,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: &str) -> Self {
        self.metadata = CString::new(metadata).ok();
        self
    }
}

/// What `recv_capture_v2` returns next.
pub enum Scripted {
    Frame(FakeFrame),
    Type(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedRecv {
    pub source: String,
    pub url: Option<String>,
    pub recv_name: Option<String>,
    pub color_format: i32,
    pub bandwidth: i32,
    pub allow_video_fields: bool,
}

#[derive(Default)]
pub struct FakeState {
    pub initialized: bool,
    pub created: Vec<CreatedRecv>,
    pub destroyed: usize,
    pub finders_created: usize,
    pub finders_destroyed: usize,
    pub captures: usize,
    pub freed: usize,
    pub tally: Option<Tally>,
    pub ptz_calls: Vec<String>,
    pub script: VecDeque<Scripted>,
    // Buffers handed to the caller and not yet freed.
    live: Vec<(Vec<u8>, Option<CString>)>,
    next_handle: usize,
}

/// Announced sources and the native table pointing into them.
#[derive(Default)]
struct SourceList {
    names: Vec<(CString, Option<CString>)>,
    table: Vec<NDIlib_source_t>,
}

impl SourceList {
    fn push(&mut self, name: &str) {
        self.names.push((CString::new(name).unwrap(), None));
        // CString buffers are boxed, so rebuilding only moves the table.
        self.table = self
            .names
            .iter()
            .map(|(name, url)| NDIlib_source_t {
                p_ndi_name: name.as_ptr(),
                p_url_address: url.as_ref().map_or(std::ptr::null(), |u| u.as_ptr()),
            })
            .collect();
    }
}

pub struct FakeApi {
    pub state: Mutex<FakeState>,
    sources: Mutex<SourceList>,
    pub init_ok: AtomicBool,
    pub fail_create: AtomicBool,
    pub ptz_supported: AtomicBool,
    pub cpu_supported: AtomicBool,
}

// The raw pointers in the source table point into heap buffers owned by the
// same list. A returned table stays valid until the next `add_source`.
unsafe impl Send for FakeApi {}
unsafe impl Sync for FakeApi {}

impl FakeApi {
    pub fn with_sources(names: &[&str]) -> Self {
        let mut sources = SourceList::default();
        for name in names {
            sources.push(name);
        }

        Self {
            state: Mutex::new(FakeState::default()),
            sources: Mutex::new(sources),
            init_ok: AtomicBool::new(true),
            fail_create: AtomicBool::new(false),
            ptz_supported: AtomicBool::new(true),
            cpu_supported: AtomicBool::new(true),
        }
    }

    /// Announce a new source on the fake network.
    pub fn add_source(&self, name: &str) {
        self.sources.lock().push(name);
    }

    pub fn push_frame(&self, frame: FakeFrame) {
        self.state.lock().script.push_back(Scripted::Frame(frame));
    }

    pub fn push_type(&self, raw: i32) {
        self.state.lock().script.push_back(Scripted::Type(raw));
    }

    pub fn outstanding_frames(&self) -> usize {
        self.state.lock().live.len()
    }

    pub fn source_count(&self) -> usize {
        self.sources.lock().names.len()
    }

    fn fresh_handle(&self) -> *mut c_void {
        let mut state = self.state.lock();
        state.next_handle += 1;
        (0x1000 + state.next_handle * 0x10) as *mut c_void
    }

    fn record_ptz(&self, call: String) -> bool {
        self.state.lock().ptz_calls.push(call);
        self.ptz_supported.load(Ordering::SeqCst)
    }
}

unsafe fn opt_string(ptr: *const c_char) -> Option<String> {
    (!ptr.is_null()).then(|| CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

impl NdiApi for FakeApi {
    fn initialize(&self) -> bool {
        let ok = self.init_ok.load(Ordering::SeqCst);
        self.state.lock().initialized = ok;
        ok
    }

    fn destroy(&self) {
        self.state.lock().initialized = false;
    }

    fn version(&self) -> *const c_char {
        c"NDI SDK FAKE 6.0.0".as_ptr()
    }

    fn is_supported_cpu(&self) -> bool {
        self.cpu_supported.load(Ordering::SeqCst)
    }

    unsafe fn find_create_v2(&self, _settings: *const NDIlib_find_create_t) -> NDIlib_find_instance_t {
        self.state.lock().finders_created += 1;
        self.fresh_handle()
    }

    unsafe fn find_destroy(&self, _instance: NDIlib_find_instance_t) {
        self.state.lock().finders_destroyed += 1;
    }

    unsafe fn find_get_current_sources(
        &self,
        _instance: NDIlib_find_instance_t,
        count: *mut u32,
    ) -> *const NDIlib_source_t {
        let sources = self.sources.lock();
        *count = sources.table.len() as u32;
        if sources.table.is_empty() {
            std::ptr::null()
        } else {
            sources.table.as_ptr()
        }
    }

    unsafe fn find_wait_for_sources(&self, _instance: NDIlib_find_instance_t, _timeout_ms: u32) -> bool {
        !self.sources.lock().table.is_empty()
    }

    unsafe fn recv_create_v3(&self, settings: *const NDIlib_recv_create_v3_t) -> NDIlib_recv_instance_t {
        let settings = &*settings;
        let created = CreatedRecv {
            source: opt_string(settings.source_to_connect_to.p_ndi_name).unwrap_or_default(),
            url: opt_string(settings.source_to_connect_to.p_url_address),
            recv_name: opt_string(settings.p_ndi_recv_name),
            color_format: settings.color_format as i32,
            bandwidth: settings.bandwidth as i32,
            allow_video_fields: settings.allow_video_fields,
        };
        self.state.lock().created.push(created);

        if self.fail_create.load(Ordering::SeqCst) {
            return std::ptr::null_mut();
        }
        self.fresh_handle()
    }

    unsafe fn recv_destroy(&self, _instance: NDIlib_recv_instance_t) {
        self.state.lock().destroyed += 1;
    }

    unsafe fn recv_capture_v2(
        &self,
        _instance: NDIlib_recv_instance_t,
        video: *mut NDIlib_video_frame_v2_t,
        _timeout_ms: u32,
    ) -> NDIlib_frame_type_e {
        let mut state = self.state.lock();
        state.captures += 1;

        match state.script.pop_front() {
            None => 0,
            Some(Scripted::Type(raw)) => raw,
            Some(Scripted::Frame(frame)) => {
                let mut out = NDIlib_video_frame_v2_t {
                    xres: frame.width as c_int,
                    yres: frame.height as c_int,
                    FourCC: frame.fourcc,
                    frame_rate_N: 30000,
                    frame_rate_D: 1001,
                    line_stride_in_bytes: frame.stride,
                    ..Default::default()
                };
                // Heap buffers don't move when the owning Vec/CString moves.
                out.p_data = frame.data.as_ptr() as *mut u8;
                out.p_metadata = frame
                    .metadata
                    .as_ref()
                    .map_or(std::ptr::null(), |m| m.as_ptr());
                state.live.push((frame.data, frame.metadata));
                *video = out;
                1
            }
        }
    }

    unsafe fn recv_free_video_v2(&self, _instance: NDIlib_recv_instance_t, video: *const NDIlib_video_frame_v2_t) {
        let mut state = self.state.lock();
        let data = (*video).p_data as *const u8;
        let before = state.live.len();
        state.live.retain(|(buf, _)| buf.as_ptr() != data);
        assert_eq!(before - state.live.len(), 1, "freed a frame that was not outstanding");
        state.freed += 1;
    }

    unsafe fn recv_set_tally(&self, _instance: NDIlib_recv_instance_t, tally: *const NDIlib_tally_t) -> bool {
        let tally = &*tally;
        self.state.lock().tally = Some(Tally {
            on_program: tally.on_program,
            on_preview: tally.on_preview,
        });
        true
    }

    unsafe fn recv_get_no_connections(&self, _instance: NDIlib_recv_instance_t) -> c_int {
        1
    }

    unsafe fn recv_ptz_is_supported(&self, _instance: NDIlib_recv_instance_t) -> bool {
        self.ptz_supported.load(Ordering::SeqCst)
    }

    unsafe fn recv_ptz_zoom(&self, _instance: NDIlib_recv_instance_t, zoom: f32) -> bool {
        self.record_ptz(format!("zoom({zoom})"))
    }

    unsafe fn recv_ptz_zoom_speed(&self, _instance: NDIlib_recv_instance_t, zoom_speed: f32) -> bool {
        self.record_ptz(format!("zoom_speed({zoom_speed})"))
    }

    unsafe fn recv_ptz_pan_tilt(&self, _instance: NDIlib_recv_instance_t, pan: f32, tilt: f32) -> bool {
        self.record_ptz(format!("pan_tilt({pan}, {tilt})"))
    }

    unsafe fn recv_ptz_pan_tilt_speed(
        &self,
        _instance: NDIlib_recv_instance_t,
        pan_speed: f32,
        tilt_speed: f32,
    ) -> bool {
        self.record_ptz(format!("pan_tilt_speed({pan_speed}, {tilt_speed})"))
    }

    unsafe fn recv_ptz_store_preset(&self, _instance: NDIlib_recv_instance_t, preset: c_int) -> bool {
        self.record_ptz(format!("store_preset({preset})"))
    }

    unsafe fn recv_ptz_recall_preset(&self, _instance: NDIlib_recv_instance_t, preset: c_int, speed: f32) -> bool {
        self.record_ptz(format!("recall_preset({preset}, {speed})"))
    }
}
