//! The set of native entry points the receiver uses.
//!
//! Every method forwards to exactly one SDK function. [`super::NdiLibrary`]
//! implements this over a dynamically loaded runtime; tests substitute a fake.

use std::ffi::{c_char, c_int};

use super::ffi::*;

/// Native NDI entry points.
///
/// # Safety
///
/// Methods taking raw pointers have the same contract as the SDK functions
/// they forward to: instances must come from the matching create call and
/// must not have been destroyed, and struct pointers must be valid for the
/// duration of the call.
pub trait NdiApi: Send + Sync {
    fn initialize(&self) -> bool;
    fn destroy(&self);
    fn version(&self) -> *const c_char;
    fn is_supported_cpu(&self) -> bool;

    unsafe fn find_create_v2(&self, settings: *const NDIlib_find_create_t) -> NDIlib_find_instance_t;
    unsafe fn find_destroy(&self, instance: NDIlib_find_instance_t);
    unsafe fn find_get_current_sources(
        &self,
        instance: NDIlib_find_instance_t,
        count: *mut u32,
    ) -> *const NDIlib_source_t;
    unsafe fn find_wait_for_sources(&self, instance: NDIlib_find_instance_t, timeout_ms: u32) -> bool;

    unsafe fn recv_create_v3(&self, settings: *const NDIlib_recv_create_v3_t) -> NDIlib_recv_instance_t;
    unsafe fn recv_destroy(&self, instance: NDIlib_recv_instance_t);
    /// Audio and metadata frames are never requested, so only video is passed.
    unsafe fn recv_capture_v2(
        &self,
        instance: NDIlib_recv_instance_t,
        video: *mut NDIlib_video_frame_v2_t,
        timeout_ms: u32,
    ) -> NDIlib_frame_type_e;
    unsafe fn recv_free_video_v2(&self, instance: NDIlib_recv_instance_t, video: *const NDIlib_video_frame_v2_t);
    unsafe fn recv_set_tally(&self, instance: NDIlib_recv_instance_t, tally: *const NDIlib_tally_t) -> bool;
    unsafe fn recv_get_no_connections(&self, instance: NDIlib_recv_instance_t) -> c_int;

    unsafe fn recv_ptz_is_supported(&self, instance: NDIlib_recv_instance_t) -> bool;
    unsafe fn recv_ptz_zoom(&self, instance: NDIlib_recv_instance_t, zoom: f32) -> bool;
    unsafe fn recv_ptz_zoom_speed(&self, instance: NDIlib_recv_instance_t, zoom_speed: f32) -> bool;
    unsafe fn recv_ptz_pan_tilt(&self, instance: NDIlib_recv_instance_t, pan: f32, tilt: f32) -> bool;
    unsafe fn recv_ptz_pan_tilt_speed(
        &self,
        instance: NDIlib_recv_instance_t,
        pan_speed: f32,
        tilt_speed: f32,
    ) -> bool;
    unsafe fn recv_ptz_store_preset(&self, instance: NDIlib_recv_instance_t, preset: c_int) -> bool;
    unsafe fn recv_ptz_recall_preset(&self, instance: NDIlib_recv_instance_t, preset: c_int, speed: f32) -> bool;
}
