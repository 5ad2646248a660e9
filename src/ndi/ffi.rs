//! Raw mirrors of the NDI SDK receive ABI.
//!
//! Layouts follow `Processing.NDI.Lib.h` (v5/v6). Fields the SDK writes back
//! to us (frame type, FourCC, frame format) are kept as raw integers here and
//! only turned into Rust enums by the safe layer in [`super::types`], so an
//! unexpected value coming out of the runtime can never become an invalid enum.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::ffi::{c_char, c_int, c_void};
use std::ptr;

// =============================================================================
// Opaque Handle Types
// =============================================================================

/// Opaque handle to an NDI finder instance.
pub type NDIlib_find_instance_t = *mut c_void;

/// Opaque handle to an NDI receiver instance.
pub type NDIlib_recv_instance_t = *mut c_void;

/// Raw `NDIlib_frame_type_e` as returned by `NDIlib_recv_capture_v2`.
pub type NDIlib_frame_type_e = c_int;

// =============================================================================
// Constants
// =============================================================================

/// Timestamp value indicating the timestamp is undefined.
pub const NDILIB_RECV_TIMESTAMP_UNDEFINED: i64 = i64::MAX;

// =============================================================================
// Enumerations (written by us, read by the SDK)
// =============================================================================

/// Receiver bandwidth modes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NDIlib_recv_bandwidth_e {
    /// Receive metadata only.
    MetadataOnly = -10,
    /// Receive metadata and audio only.
    AudioOnly = 10,
    /// Receive at lower bandwidth and resolution.
    Lowest = 0,
    /// Receive at full resolution.
    Highest = 100,
}

/// Receiver color format preferences.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NDIlib_recv_color_format_e {
    /// No alpha: BGRX, with alpha: BGRA.
    BGRX_BGRA = 0,
    /// No alpha: UYVY, with alpha: BGRA.
    UYVY_BGRA = 1,
    /// No alpha: RGBX, with alpha: RGBA.
    RGBX_RGBA = 2,
    /// No alpha: UYVY, with alpha: RGBA.
    UYVY_RGBA = 3,
    /// BGRX/BGRA delivered bottom-up.
    BGRX_BGRA_Flipped = 200,
    /// Fastest available format (UYVY, UYVA with alpha).
    Fastest = 100,
    /// Best quality format.
    Best = 101,
}

// =============================================================================
// Structures
// =============================================================================

/// NDI source descriptor.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NDIlib_source_t {
    /// UTF-8 source name in format "MACHINE_NAME (NDI_SOURCE_NAME)".
    pub p_ndi_name: *const c_char,
    /// URL address for direct connection (may be NULL).
    pub p_url_address: *const c_char,
}

impl Default for NDIlib_source_t {
    fn default() -> Self {
        Self {
            p_ndi_name: ptr::null(),
            p_url_address: ptr::null(),
        }
    }
}

/// Finder creation settings.
#[repr(C)]
#[derive(Debug)]
pub struct NDIlib_find_create_t {
    /// Include local sources in the list.
    pub show_local_sources: bool,
    /// Groups to search (NULL for default).
    pub p_groups: *const c_char,
    /// Extra IP addresses to query (comma-separated).
    pub p_extra_ips: *const c_char,
}

impl Default for NDIlib_find_create_t {
    fn default() -> Self {
        Self {
            show_local_sources: true,
            p_groups: ptr::null(),
            p_extra_ips: ptr::null(),
        }
    }
}

/// Receiver creation settings (v3).
#[repr(C)]
#[derive(Debug)]
pub struct NDIlib_recv_create_v3_t {
    /// Source to connect to.
    pub source_to_connect_to: NDIlib_source_t,
    /// Preferred color format.
    pub color_format: NDIlib_recv_color_format_e,
    /// Bandwidth setting.
    pub bandwidth: NDIlib_recv_bandwidth_e,
    /// Allow fielded video (false = always progressive).
    pub allow_video_fields: bool,
    /// Receiver name (NULL for auto).
    pub p_ndi_recv_name: *const c_char,
}

impl Default for NDIlib_recv_create_v3_t {
    fn default() -> Self {
        Self {
            source_to_connect_to: NDIlib_source_t::default(),
            color_format: NDIlib_recv_color_format_e::Fastest,
            bandwidth: NDIlib_recv_bandwidth_e::Highest,
            allow_video_fields: false,
            p_ndi_recv_name: ptr::null(),
        }
    }
}

/// Video frame structure (v2), filled in by `NDIlib_recv_capture_v2`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NDIlib_video_frame_v2_t {
    /// Horizontal resolution.
    pub xres: c_int,
    /// Vertical resolution.
    pub yres: c_int,
    /// Raw `NDIlib_FourCC_video_type_e`.
    pub FourCC: u32,
    /// Frame rate numerator.
    pub frame_rate_N: c_int,
    /// Frame rate denominator.
    pub frame_rate_D: c_int,
    /// Picture aspect ratio (0 = square pixels).
    pub picture_aspect_ratio: f32,
    /// Raw `NDIlib_frame_format_type_e`.
    pub frame_format_type: c_int,
    /// Timecode in 100ns intervals.
    pub timecode: i64,
    /// Pointer to pixel data.
    pub p_data: *mut u8,
    /// Line stride in bytes (0 = default for the FourCC).
    pub line_stride_in_bytes: c_int,
    /// Per-frame metadata (UTF-8 XML, may be NULL).
    pub p_metadata: *const c_char,
    /// Timestamp in 100ns intervals.
    pub timestamp: i64,
}

impl Default for NDIlib_video_frame_v2_t {
    fn default() -> Self {
        Self {
            xres: 0,
            yres: 0,
            FourCC: 0,
            frame_rate_N: 0,
            frame_rate_D: 0,
            picture_aspect_ratio: 0.0,
            frame_format_type: 1,
            timecode: 0,
            p_data: ptr::null_mut(),
            line_stride_in_bytes: 0,
            p_metadata: ptr::null(),
            timestamp: NDILIB_RECV_TIMESTAMP_UNDEFINED,
        }
    }
}

/// Tally state structure.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct NDIlib_tally_t {
    /// Is this source on program output.
    pub on_program: bool,
    /// Is this source on preview output.
    pub on_preview: bool,
}

// =============================================================================
// Entry point signatures
// =============================================================================

pub type NDIlib_initialize_fn = unsafe extern "C" fn() -> bool;
pub type NDIlib_destroy_fn = unsafe extern "C" fn();
pub type NDIlib_version_fn = unsafe extern "C" fn() -> *const c_char;
pub type NDIlib_is_supported_CPU_fn = unsafe extern "C" fn() -> bool;

pub type NDIlib_find_create_v2_fn =
    unsafe extern "C" fn(p_create_settings: *const NDIlib_find_create_t) -> NDIlib_find_instance_t;
pub type NDIlib_find_destroy_fn = unsafe extern "C" fn(p_instance: NDIlib_find_instance_t);
pub type NDIlib_find_get_current_sources_fn = unsafe extern "C" fn(
    p_instance: NDIlib_find_instance_t,
    p_no_sources: *mut u32,
) -> *const NDIlib_source_t;
pub type NDIlib_find_wait_for_sources_fn =
    unsafe extern "C" fn(p_instance: NDIlib_find_instance_t, timeout_in_ms: u32) -> bool;

pub type NDIlib_recv_create_v3_fn =
    unsafe extern "C" fn(p_create_settings: *const NDIlib_recv_create_v3_t) -> NDIlib_recv_instance_t;
pub type NDIlib_recv_destroy_fn = unsafe extern "C" fn(p_instance: NDIlib_recv_instance_t);
pub type NDIlib_recv_capture_v2_fn = unsafe extern "C" fn(
    p_instance: NDIlib_recv_instance_t,
    p_video_data: *mut NDIlib_video_frame_v2_t,
    p_audio_data: *mut c_void,
    p_metadata: *mut c_void,
    timeout_in_ms: u32,
) -> NDIlib_frame_type_e;
pub type NDIlib_recv_free_video_v2_fn = unsafe extern "C" fn(
    p_instance: NDIlib_recv_instance_t,
    p_video_data: *const NDIlib_video_frame_v2_t,
);
pub type NDIlib_recv_set_tally_fn =
    unsafe extern "C" fn(p_instance: NDIlib_recv_instance_t, p_tally: *const NDIlib_tally_t) -> bool;
pub type NDIlib_recv_get_no_connections_fn =
    unsafe extern "C" fn(p_instance: NDIlib_recv_instance_t) -> c_int;

pub type NDIlib_recv_ptz_is_supported_fn =
    unsafe extern "C" fn(p_instance: NDIlib_recv_instance_t) -> bool;
pub type NDIlib_recv_ptz_zoom_fn =
    unsafe extern "C" fn(p_instance: NDIlib_recv_instance_t, zoom_value: f32) -> bool;
pub type NDIlib_recv_ptz_zoom_speed_fn =
    unsafe extern "C" fn(p_instance: NDIlib_recv_instance_t, zoom_speed: f32) -> bool;
pub type NDIlib_recv_ptz_pan_tilt_fn =
    unsafe extern "C" fn(p_instance: NDIlib_recv_instance_t, pan_value: f32, tilt_value: f32) -> bool;
pub type NDIlib_recv_ptz_pan_tilt_speed_fn =
    unsafe extern "C" fn(p_instance: NDIlib_recv_instance_t, pan_speed: f32, tilt_speed: f32) -> bool;
pub type NDIlib_recv_ptz_store_preset_fn =
    unsafe extern "C" fn(p_instance: NDIlib_recv_instance_t, preset_no: c_int) -> bool;
pub type NDIlib_recv_ptz_recall_preset_fn =
    unsafe extern "C" fn(p_instance: NDIlib_recv_instance_t, preset_no: c_int, speed: f32) -> bool;
