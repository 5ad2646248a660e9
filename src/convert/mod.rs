//! Pixel format conversion of captured frames into renderable images.
//!
//! The receiver asks the SDK for its fastest packed layout (UYVY, or UYVA
//! when the sender has alpha). A [`FormatConverter`] turns that into an RGBA
//! image the renderer can sample. [`FramePlan`] holds the CPU-side validation
//! shared by every converter; [`GpuFormatConverter`] does the work on the GPU.

mod gpu;

pub use gpu::{sample_format_for, GpuFormatConverter, GpuImage};

use std::borrow::Cow;

use thiserror::Error;

use crate::ndi::{FourCC, VideoFrame};

/// Converts captured frames into images of type [`FormatConverter::Image`].
pub trait FormatConverter {
    /// Handle to a converted image. Cheap to clone.
    type Image: Clone;

    /// Convert one frame. The frame is still owned by the SDK while this runs.
    fn decode(&mut self, frame: &VideoFrame<'_>) -> Result<Self::Image, ConvertError>;
}

/// Frame conversion errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("unsupported pixel format {0}")]
    UnsupportedFormat(String),

    #[error("frame has no pixels ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("4:2:2 frame width must be even, got {0}")]
    OddWidth(u32),

    #[error("line stride {stride} is smaller than {min} bytes")]
    StrideTooSmall { stride: usize, min: usize },

    #[error("frame data is {actual} bytes, expected at least {expected}")]
    DataSize { expected: usize, actual: usize },

    #[error("frame carries no pixel data")]
    MissingData,

    #[error("frame is {width}x{height}, the GPU supports at most {max} pixels per side")]
    FrameTooLarge { width: u32, height: u32, max: u32 },
}

/// How the packed source texels map to RGBA. Values match the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ConvertMode {
    Uyvy = 0,
    Uyva = 1,
    Bgra = 2,
    Bgrx = 3,
    Rgba = 4,
    Rgbx = 5,
}

impl ConvertMode {
    pub fn for_fourcc(fourcc: FourCC) -> Option<Self> {
        Some(match fourcc {
            FourCC::Uyvy => ConvertMode::Uyvy,
            FourCC::Uyva => ConvertMode::Uyva,
            FourCC::Bgra => ConvertMode::Bgra,
            FourCC::Bgrx => ConvertMode::Bgrx,
            FourCC::Rgba => ConvertMode::Rgba,
            FourCC::Rgbx => ConvertMode::Rgbx,
            _ => return None,
        })
    }

    /// Two pixels share one RGBA8 texel in 4:2:2 layouts.
    pub fn is_422(self) -> bool {
        matches!(self, ConvertMode::Uyvy | ConvertMode::Uyva)
    }
}

/// Validated description of how to upload one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePlan {
    pub mode: ConvertMode,
    pub width: u32,
    pub height: u32,
    /// Bytes per row of the packed plane.
    pub stride: usize,
    /// Width of the packed plane in RGBA8 texels.
    pub packed_width: u32,
    /// The converted image carries alpha.
    pub has_alpha: bool,
    /// Byte offset of the alpha plane, for UYVA.
    pub alpha_offset: Option<usize>,
}

impl FramePlan {
    /// Validate frame geometry against the buffer the SDK handed out.
    pub fn new(
        fourcc: Option<FourCC>,
        raw_fourcc: u32,
        width: u32,
        height: u32,
        stride: usize,
        data_len: usize,
    ) -> Result<Self, ConvertError> {
        let fourcc = fourcc.ok_or_else(|| {
            ConvertError::UnsupportedFormat(String::from_utf8_lossy(&raw_fourcc.to_le_bytes()).into_owned())
        })?;
        let mode = ConvertMode::for_fourcc(fourcc)
            .ok_or_else(|| ConvertError::UnsupportedFormat(fourcc.to_string()))?;

        if width == 0 || height == 0 {
            return Err(ConvertError::EmptyFrame { width, height });
        }
        if mode.is_422() && width % 2 != 0 {
            return Err(ConvertError::OddWidth(width));
        }

        let min_stride = fourcc.default_stride(width);
        if stride < min_stride {
            return Err(ConvertError::StrideTooSmall { stride, min: min_stride });
        }

        let expected = fourcc.buffer_size(width, height, stride);
        if data_len < expected {
            return Err(ConvertError::DataSize {
                expected,
                actual: data_len,
            });
        }

        let packed_width = if mode.is_422() { width / 2 } else { width };
        let has_alpha = fourcc.has_alpha();
        // 4:2:2 alpha lives in a separate plane after the packed rows.
        let alpha_offset = (has_alpha && mode.is_422()).then(|| stride * height as usize);

        Ok(Self {
            mode,
            width,
            height,
            stride,
            packed_width,
            has_alpha,
            alpha_offset,
        })
    }

    /// Reject frames larger than the device's maximum 2D texture size.
    pub fn within_limit(self, max_dimension: u32) -> Result<Self, ConvertError> {
        if self.width > max_dimension || self.height > max_dimension {
            return Err(ConvertError::FrameTooLarge {
                width: self.width,
                height: self.height,
                max: max_dimension,
            });
        }
        Ok(self)
    }

    /// Plan a captured frame.
    pub fn for_frame(frame: &VideoFrame<'_>) -> Result<Self, ConvertError> {
        let data_len = frame.data().map_or(0, <[u8]>::len);
        if data_len == 0 && frame.fourcc().is_some() && frame.width() > 0 && frame.height() > 0 {
            return Err(ConvertError::MissingData);
        }
        Self::new(
            frame.fourcc(),
            frame.raw_fourcc(),
            frame.width(),
            frame.height(),
            frame.stride(),
            data_len,
        )
    }

    /// The packed plane as RGBA8 texel rows, with its row pitch in bytes.
    ///
    /// Borrowed when the stride is texel aligned, repacked otherwise.
    pub fn packed_plane<'d>(&self, data: &'d [u8]) -> (Cow<'d, [u8]>, u32) {
        let rows = self.height as usize;
        if self.stride % 4 == 0 {
            return (Cow::Borrowed(&data[..self.stride * rows]), self.stride as u32);
        }

        let row_bytes = self.packed_width as usize * 4;
        let mut packed = Vec::with_capacity(row_bytes * rows);
        for row in data.chunks(self.stride).take(rows) {
            packed.extend_from_slice(&row[..row_bytes]);
        }
        (Cow::Owned(packed), row_bytes as u32)
    }

    /// The 8-bit alpha plane of a UYVA frame, one byte per pixel.
    pub fn alpha_plane<'d>(&self, data: &'d [u8]) -> Option<&'d [u8]> {
        let offset = self.alpha_offset?;
        let len = self.width as usize * self.height as usize;
        data.get(offset..offset + len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(fourcc: FourCC, width: u32, height: u32, stride: usize, len: usize) -> Result<FramePlan, ConvertError> {
        FramePlan::new(Some(fourcc), fourcc.to_raw(), width, height, stride, len)
    }

    #[test]
    fn test_uyvy_plan() {
        let plan = plan(FourCC::Uyvy, 1920, 1080, 3840, 3840 * 1080).unwrap();
        assert_eq!(plan.mode, ConvertMode::Uyvy);
        assert_eq!(plan.packed_width, 960);
        assert_eq!(plan.alpha_offset, None);
    }

    #[test]
    fn test_uyva_plan_has_alpha_plane_after_padded_rows() {
        // Padded stride: 64 bytes for a 16 pixel wide frame.
        let len = 64 * 8 + 16 * 8;
        let plan = plan(FourCC::Uyva, 16, 8, 64, len).unwrap();
        assert_eq!(plan.mode, ConvertMode::Uyva);
        assert_eq!(plan.alpha_offset, Some(64 * 8));
        assert_eq!(plan.packed_width, 8);
    }

    #[test]
    fn test_bgra_plan_is_one_texel_per_pixel() {
        let plan = plan(FourCC::Bgrx, 5, 3, 20, 60).unwrap();
        assert_eq!(plan.mode, ConvertMode::Bgrx);
        assert_eq!(plan.packed_width, 5);
    }

    #[test]
    fn test_rejects_bad_frames() {
        assert_eq!(
            plan(FourCC::Uyvy, 3, 2, 6, 12),
            Err(ConvertError::OddWidth(3))
        );
        assert_eq!(
            plan(FourCC::Bgra, 0, 2, 0, 0),
            Err(ConvertError::EmptyFrame { width: 0, height: 2 })
        );
        assert_eq!(
            plan(FourCC::Bgra, 4, 2, 8, 32),
            Err(ConvertError::StrideTooSmall { stride: 8, min: 16 })
        );
        assert_eq!(
            plan(FourCC::Uyva, 4, 2, 8, 16),
            Err(ConvertError::DataSize { expected: 24, actual: 16 })
        );
    }

    #[test]
    fn test_rejects_unsupported_formats() {
        assert_eq!(
            plan(FourCC::Nv12, 4, 4, 4, 24),
            Err(ConvertError::UnsupportedFormat("NV12".into()))
        );
        let raw = u32::from_le_bytes(*b"V210");
        assert_eq!(
            FramePlan::new(None, raw, 4, 4, 16, 64),
            Err(ConvertError::UnsupportedFormat("V210".into()))
        );
    }

    #[test]
    fn test_packed_plane_borrows_aligned_rows() {
        let data = vec![7u8; 32 * 2 + 8 * 2];
        let plan = plan(FourCC::Uyva, 8, 2, 32, data.len()).unwrap();

        let (rows, pitch) = plan.packed_plane(&data);
        assert!(matches!(rows, Cow::Borrowed(_)));
        assert_eq!(rows.len(), 64);
        assert_eq!(pitch, 32);
        assert_eq!(plan.alpha_plane(&data).map(<[u8]>::len), Some(16));
    }

    #[test]
    fn test_packed_plane_repacks_unaligned_stride() {
        // 2x2 UYVY with a 6 byte stride: one texel plus two bytes of padding per row.
        let data = [1, 2, 3, 4, 0, 0, 5, 6, 7, 8, 0, 0];
        let plan = plan(FourCC::Uyvy, 2, 2, 6, data.len()).unwrap();

        let (rows, pitch) = plan.packed_plane(&data);
        assert_eq!(pitch, 4);
        assert_eq!(&rows[..], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(plan.alpha_plane(&data), None);
    }

    #[test]
    fn test_alpha_follows_fourcc() {
        let uyva = plan(FourCC::Uyva, 4, 2, 8, 24).unwrap();
        assert!(uyva.has_alpha);
        assert_eq!(uyva.alpha_offset, Some(16));

        // Interleaved alpha has no separate plane.
        let bgra = plan(FourCC::Bgra, 4, 2, 16, 32).unwrap();
        assert!(bgra.has_alpha);
        assert_eq!(bgra.alpha_offset, None);

        assert!(!plan(FourCC::Uyvy, 4, 2, 8, 16).unwrap().has_alpha);
        assert!(!plan(FourCC::Rgbx, 4, 2, 16, 32).unwrap().has_alpha);
    }

    #[test]
    fn test_frame_size_limit() {
        let frame = plan(FourCC::Uyvy, 16384, 2, 32768, 65536).unwrap();
        assert_eq!(frame.within_limit(16384), Ok(frame));
        assert_eq!(
            frame.within_limit(8192),
            Err(ConvertError::FrameTooLarge {
                width: 16384,
                height: 2,
                max: 8192
            })
        );
    }

    #[test]
    fn test_modes() {
        assert!(ConvertMode::Uyvy.is_422());
        assert!(!ConvertMode::Rgba.is_422());
        assert_eq!(ConvertMode::for_fourcc(FourCC::P216), None);
    }
}
