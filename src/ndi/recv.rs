//! Owned NDI receiver handle.
//!
//! [`Recv`] owns one `NDIlib_recv_instance_t` and destroys it on drop. Captured
//! video frames borrow the receiver and are released back to the SDK when the
//! [`VideoFrame`] guard is dropped, so a frame can never outlive its receiver
//! or be freed twice.

use std::ffi::{c_int, CStr, CString};
use std::sync::Arc;

use super::api::NdiApi;
use super::error::NdiError;
use super::ffi::*;
use super::types::{Bandwidth, ColorFormat, FourCC, FrameFormat, FrameType, Source, Tally};

/// Receiver creation options (everything except the source).
#[derive(Debug, Clone, PartialEq)]
pub struct RecvOptions {
    /// Pixel format requested from the SDK.
    pub color_format: ColorFormat,
    /// Bandwidth mode.
    pub bandwidth: Bandwidth,
    /// Allow fielded video (false = always progressive).
    pub allow_video_fields: bool,
    /// Name this receiver announces on the network (None = SDK default).
    pub name: Option<String>,
}

impl Default for RecvOptions {
    fn default() -> Self {
        Self {
            color_format: ColorFormat::Fastest,
            bandwidth: Bandwidth::Highest,
            allow_video_fields: false,
            name: None,
        }
    }
}

fn c_string(value: &str) -> Result<CString, NdiError> {
    CString::new(value).map_err(|_| NdiError::InvalidName(value.to_string()))
}

/// Result of a single capture call.
pub enum Capture<'a> {
    /// Nothing arrived within the timeout.
    None,
    Video(VideoFrame<'a>),
    Audio,
    Metadata,
    /// The connection was lost.
    Error,
    StatusChange,
    SourceChange,
    /// A frame type this crate does not know about.
    Unknown(i32),
}

impl Capture<'_> {
    pub fn frame_type(&self) -> Option<FrameType> {
        Some(match self {
            Capture::None => FrameType::None,
            Capture::Video(_) => FrameType::Video,
            Capture::Audio => FrameType::Audio,
            Capture::Metadata => FrameType::Metadata,
            Capture::Error => FrameType::Error,
            Capture::StatusChange => FrameType::StatusChange,
            Capture::SourceChange => FrameType::SourceChange,
            Capture::Unknown(_) => return None,
        })
    }
}

/// NDI receiver handle.
pub struct Recv {
    api: Arc<dyn NdiApi>,
    instance: NDIlib_recv_instance_t,
    source: Source,
}

// NDI receiver instances may be used from any thread.
unsafe impl Send for Recv {}

impl Recv {
    /// Create a receiver connected to `source`.
    pub fn create(api: Arc<dyn NdiApi>, source: &Source, options: &RecvOptions) -> Result<Self, NdiError> {
        let c_name = c_string(&source.ndi_name)?;
        let c_url = source.url_address.as_deref().map(c_string).transpose()?;
        let c_recv_name = options.name.as_deref().map(c_string).transpose()?;

        let create_settings = NDIlib_recv_create_v3_t {
            source_to_connect_to: NDIlib_source_t {
                p_ndi_name: c_name.as_ptr(),
                p_url_address: c_url.as_ref().map_or(std::ptr::null(), |s| s.as_ptr()),
            },
            color_format: options.color_format.to_raw(),
            bandwidth: options.bandwidth.to_raw(),
            allow_video_fields: options.allow_video_fields,
            p_ndi_recv_name: c_recv_name.as_ref().map_or(std::ptr::null(), |s| s.as_ptr()),
        };

        let instance = unsafe { api.recv_create_v3(&create_settings) };
        if instance.is_null() {
            tracing::debug!("NDI Receiver: Failed to create receiver for '{}'", source.ndi_name);
            return Err(NdiError::Creation("receiver"));
        }

        tracing::info!(
            "NDI Receiver: Created receiver for '{}' ({:?}, {:?})",
            source.ndi_name,
            options.color_format,
            options.bandwidth
        );

        Ok(Self {
            api,
            instance,
            source: source.clone(),
        })
    }

    /// The source this receiver was created for.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Wait up to `timeout_ms` for the next frame.
    pub fn capture(&self, timeout_ms: u32) -> Capture<'_> {
        let mut raw = NDIlib_video_frame_v2_t::default();
        let frame_type = unsafe { self.api.recv_capture_v2(self.instance, &mut raw, timeout_ms) };

        match FrameType::from_raw(frame_type) {
            Some(FrameType::Video) => Capture::Video(VideoFrame { recv: self, raw }),
            Some(FrameType::None) => Capture::None,
            Some(FrameType::Audio) => Capture::Audio,
            Some(FrameType::Metadata) => Capture::Metadata,
            Some(FrameType::Error) => Capture::Error,
            Some(FrameType::StatusChange) => Capture::StatusChange,
            Some(FrameType::SourceChange) => Capture::SourceChange,
            None => Capture::Unknown(frame_type),
        }
    }

    /// Non-blocking capture that only yields video frames.
    pub fn try_capture_video_frame(&self) -> Option<VideoFrame<'_>> {
        match self.capture(0) {
            Capture::Video(frame) => Some(frame),
            Capture::Error => {
                tracing::debug!("NDI Receiver: Connection error on '{}'", self.source.ndi_name);
                None
            }
            _ => None,
        }
    }

    /// Report program/preview state to the source.
    pub fn set_tally(&self, tally: Tally) -> bool {
        let raw = NDIlib_tally_t::from(tally);
        unsafe { self.api.recv_set_tally(self.instance, &raw) }
    }

    /// Number of live connections (0 or 1).
    pub fn connection_count(&self) -> usize {
        let count = unsafe { self.api.recv_get_no_connections(self.instance) };
        count.max(0) as usize
    }

    pub fn ptz_is_supported(&self) -> bool {
        unsafe { self.api.recv_ptz_is_supported(self.instance) }
    }

    pub fn ptz_zoom(&self, zoom: f32) -> bool {
        unsafe { self.api.recv_ptz_zoom(self.instance, zoom) }
    }

    pub fn ptz_zoom_speed(&self, zoom_speed: f32) -> bool {
        unsafe { self.api.recv_ptz_zoom_speed(self.instance, zoom_speed) }
    }

    pub fn ptz_pan_tilt(&self, pan: f32, tilt: f32) -> bool {
        unsafe { self.api.recv_ptz_pan_tilt(self.instance, pan, tilt) }
    }

    pub fn ptz_pan_tilt_speed(&self, pan_speed: f32, tilt_speed: f32) -> bool {
        unsafe { self.api.recv_ptz_pan_tilt_speed(self.instance, pan_speed, tilt_speed) }
    }

    pub fn ptz_store_preset(&self, preset: i32) -> bool {
        unsafe { self.api.recv_ptz_store_preset(self.instance, preset as c_int) }
    }

    pub fn ptz_recall_preset(&self, preset: i32, speed: f32) -> bool {
        unsafe { self.api.recv_ptz_recall_preset(self.instance, preset as c_int, speed) }
    }
}

impl Drop for Recv {
    fn drop(&mut self) {
        unsafe { self.api.recv_destroy(self.instance) };
        tracing::info!("NDI Receiver: Destroyed receiver for '{}'", self.source.ndi_name);
    }
}

/// A captured video frame, owned by the SDK until dropped.
pub struct VideoFrame<'a> {
    recv: &'a Recv,
    raw: NDIlib_video_frame_v2_t,
}

impl VideoFrame<'_> {
    /// Horizontal resolution.
    pub fn width(&self) -> u32 {
        self.raw.xres.max(0) as u32
    }

    /// Vertical resolution.
    pub fn height(&self) -> u32 {
        self.raw.yres.max(0) as u32
    }

    /// Pixel layout, or `None` for a code this crate does not know.
    pub fn fourcc(&self) -> Option<FourCC> {
        FourCC::from_raw(self.raw.FourCC)
    }

    /// The raw FourCC as reported by the SDK.
    pub fn raw_fourcc(&self) -> u32 {
        self.raw.FourCC
    }

    pub fn frame_format(&self) -> Option<FrameFormat> {
        FrameFormat::from_raw(self.raw.frame_format_type)
    }

    /// Frames per second, 0 if the SDK did not report a rate.
    pub fn frame_rate(&self) -> f64 {
        if self.raw.frame_rate_D > 0 {
            self.raw.frame_rate_N as f64 / self.raw.frame_rate_D as f64
        } else {
            0.0
        }
    }

    /// Picture aspect ratio, falling back to square pixels.
    pub fn aspect_ratio(&self) -> f32 {
        if self.raw.picture_aspect_ratio > 0.0 {
            self.raw.picture_aspect_ratio
        } else if self.raw.yres > 0 {
            self.raw.xres as f32 / self.raw.yres as f32
        } else {
            0.0
        }
    }

    /// Timecode in 100ns units.
    pub fn timecode(&self) -> i64 {
        self.raw.timecode
    }

    /// Timestamp in 100ns units, `None` if undefined.
    pub fn timestamp(&self) -> Option<i64> {
        (self.raw.timestamp != NDILIB_RECV_TIMESTAMP_UNDEFINED).then_some(self.raw.timestamp)
    }

    /// Line stride in bytes of the first plane.
    pub fn stride(&self) -> usize {
        if self.raw.line_stride_in_bytes > 0 {
            self.raw.line_stride_in_bytes as usize
        } else {
            self.fourcc()
                .map(|f| f.default_stride(self.width()))
                .unwrap_or(0)
        }
    }

    /// The whole frame buffer, including any trailing planes.
    ///
    /// `None` if the SDK returned no data or an unknown layout.
    pub fn data(&self) -> Option<&[u8]> {
        let fourcc = self.fourcc()?;
        if self.raw.p_data.is_null() {
            return None;
        }
        let len = fourcc.buffer_size(self.width(), self.height(), self.stride());
        if len == 0 {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts(self.raw.p_data, len) })
    }

    /// Per-frame metadata (UTF-8 XML), if the sender attached any.
    pub fn metadata(&self) -> Option<String> {
        if self.raw.p_metadata.is_null() {
            return None;
        }
        let text = unsafe { CStr::from_ptr(self.raw.p_metadata) };
        Some(text.to_string_lossy().into_owned())
    }
}

impl std::fmt::Debug for VideoFrame<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("fourcc", &self.fourcc())
            .field("stride", &self.stride())
            .finish()
    }
}

impl Drop for VideoFrame<'_> {
    fn drop(&mut self) {
        unsafe { self.recv.api.recv_free_video_v2(self.recv.instance, &self.raw) };
    }
}
