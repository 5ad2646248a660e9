//! Safe counterparts of the NDI enumerations and small value types.

use serde::{Deserialize, Serialize};

use super::ffi::{NDIlib_recv_bandwidth_e, NDIlib_recv_color_format_e, NDIlib_tally_t};

/// Receiver bandwidth mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Bandwidth {
    MetadataOnly,
    AudioOnly,
    Lowest,
    #[default]
    Highest,
}

impl Bandwidth {
    pub(crate) fn to_raw(self) -> NDIlib_recv_bandwidth_e {
        match self {
            Bandwidth::MetadataOnly => NDIlib_recv_bandwidth_e::MetadataOnly,
            Bandwidth::AudioOnly => NDIlib_recv_bandwidth_e::AudioOnly,
            Bandwidth::Lowest => NDIlib_recv_bandwidth_e::Lowest,
            Bandwidth::Highest => NDIlib_recv_bandwidth_e::Highest,
        }
    }
}

/// Pixel format the receiver asks the SDK to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ColorFormat {
    BgrxBgra,
    UyvyBgra,
    RgbxRgba,
    UyvyRgba,
    BgrxBgraFlipped,
    /// UYVY, or UYVA when the source has alpha.
    #[default]
    Fastest,
    Best,
}

impl ColorFormat {
    pub(crate) fn to_raw(self) -> NDIlib_recv_color_format_e {
        match self {
            ColorFormat::BgrxBgra => NDIlib_recv_color_format_e::BGRX_BGRA,
            ColorFormat::UyvyBgra => NDIlib_recv_color_format_e::UYVY_BGRA,
            ColorFormat::RgbxRgba => NDIlib_recv_color_format_e::RGBX_RGBA,
            ColorFormat::UyvyRgba => NDIlib_recv_color_format_e::UYVY_RGBA,
            ColorFormat::BgrxBgraFlipped => NDIlib_recv_color_format_e::BGRX_BGRA_Flipped,
            ColorFormat::Fastest => NDIlib_recv_color_format_e::Fastest,
            ColorFormat::Best => NDIlib_recv_color_format_e::Best,
        }
    }
}

/// Kind of frame returned by a capture call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    None,
    Video,
    Audio,
    Metadata,
    /// Connection lost.
    Error,
    StatusChange,
    SourceChange,
}

impl FrameType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => FrameType::None,
            1 => FrameType::Video,
            2 => FrameType::Audio,
            3 => FrameType::Metadata,
            4 => FrameType::Error,
            100 => FrameType::StatusChange,
            101 => FrameType::SourceChange,
            _ => return None,
        })
    }
}

const fn fourcc(code: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*code)
}

/// Video pixel layout codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FourCC {
    /// YCbCr 4:2:2 (UYVY ordering).
    Uyvy,
    /// UYVY followed by an 8-bit alpha plane.
    Uyva,
    /// 16-bit semi-planar 4:2:2.
    P216,
    /// P216 followed by a 16-bit alpha plane.
    Pa16,
    Yv12,
    I420,
    Nv12,
    Bgra,
    Bgrx,
    Rgba,
    Rgbx,
}

impl FourCC {
    pub const ALL: [FourCC; 11] = [
        FourCC::Uyvy,
        FourCC::Uyva,
        FourCC::P216,
        FourCC::Pa16,
        FourCC::Yv12,
        FourCC::I420,
        FourCC::Nv12,
        FourCC::Bgra,
        FourCC::Bgrx,
        FourCC::Rgba,
        FourCC::Rgbx,
    ];

    /// The little-endian four-character code as used by the SDK.
    pub const fn to_raw(self) -> u32 {
        match self {
            FourCC::Uyvy => fourcc(b"UYVY"),
            FourCC::Uyva => fourcc(b"UYVA"),
            FourCC::P216 => fourcc(b"P216"),
            FourCC::Pa16 => fourcc(b"PA16"),
            FourCC::Yv12 => fourcc(b"YV12"),
            FourCC::I420 => fourcc(b"I420"),
            FourCC::Nv12 => fourcc(b"NV12"),
            FourCC::Bgra => fourcc(b"BGRA"),
            FourCC::Bgrx => fourcc(b"BGRX"),
            FourCC::Rgba => fourcc(b"RGBA"),
            FourCC::Rgbx => fourcc(b"RGBX"),
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.to_raw() == raw)
    }

    /// Whether frames in this layout carry an alpha channel.
    pub fn has_alpha(self) -> bool {
        matches!(self, FourCC::Uyva | FourCC::Pa16 | FourCC::Bgra | FourCC::Rgba)
    }

    /// Default line stride in bytes when the SDK reports a stride of 0.
    pub fn default_stride(self, width: u32) -> usize {
        let width = width as usize;
        match self {
            FourCC::Uyvy | FourCC::Uyva => width * 2,
            FourCC::P216 | FourCC::Pa16 => width * 2,
            FourCC::Yv12 | FourCC::I420 | FourCC::Nv12 => width,
            FourCC::Bgra | FourCC::Bgrx | FourCC::Rgba | FourCC::Rgbx => width * 4,
        }
    }

    /// Total byte size of a frame buffer, including trailing planes.
    pub fn buffer_size(self, width: u32, height: u32, stride: usize) -> usize {
        let h = height as usize;
        let w = width as usize;
        match self {
            FourCC::Uyvy | FourCC::Bgra | FourCC::Bgrx | FourCC::Rgba | FourCC::Rgbx => stride * h,
            // Alpha plane is tightly packed, one byte per pixel.
            FourCC::Uyva => stride * h + w * h,
            // Y plane plus interleaved UV plane, both 16-bit.
            FourCC::P216 => stride * h * 2,
            FourCC::Pa16 => stride * h * 3,
            FourCC::Yv12 | FourCC::I420 | FourCC::Nv12 => stride * h + stride * h.div_ceil(2),
        }
    }
}

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = self.to_raw().to_le_bytes();
        write!(f, "{}", String::from_utf8_lossy(&bytes))
    }
}

/// Field layout of a video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Interleaved,
    Progressive,
    Field0,
    Field1,
}

impl FrameFormat {
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => FrameFormat::Interleaved,
            1 => FrameFormat::Progressive,
            2 => FrameFormat::Field0,
            3 => FrameFormat::Field1,
            _ => return None,
        })
    }
}

/// On-air indication sent back to the connected source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub on_program: bool,
    pub on_preview: bool,
}

impl From<Tally> for NDIlib_tally_t {
    fn from(tally: Tally) -> Self {
        Self {
            on_program: tally.on_program,
            on_preview: tally.on_preview,
        }
    }
}

/// A discovered NDI source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Name in the form "MACHINE_NAME (SOURCE_NAME)".
    pub ndi_name: String,
    /// Direct connection address, when the finder reports one.
    pub url_address: Option<String>,
}

impl Source {
    pub fn new(ndi_name: impl Into<String>) -> Self {
        Self {
            ndi_name: ndi_name.into(),
            url_address: None,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.url_address {
            Some(url) => write!(f, "{} [{}]", self.ndi_name, url),
            None => f.write_str(&self.ndi_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_values() {
        assert_eq!(FourCC::Bgra.to_raw(), 0x41524742);
        assert_eq!(FourCC::Rgba.to_raw(), 0x41424752);
        assert_eq!(FourCC::Uyvy.to_raw(), 0x59565955);
        assert_eq!(FourCC::Uyva.to_raw(), 0x41565955);
        assert_eq!(FourCC::Nv12.to_raw(), 0x3231564E);
    }

    #[test]
    fn test_fourcc_from_raw() {
        assert_eq!(FourCC::from_raw(0x59565955), Some(FourCC::Uyvy));
        assert_eq!(FourCC::from_raw(0xDEADBEEF), None);
        assert_eq!(FourCC::Uyva.to_string(), "UYVA");
    }

    #[test]
    fn test_has_alpha() {
        assert!(FourCC::Uyva.has_alpha());
        assert!(FourCC::Bgra.has_alpha());
        assert!(!FourCC::Uyvy.has_alpha());
        assert!(!FourCC::Rgbx.has_alpha());
    }

    #[test]
    fn test_buffer_sizes() {
        let stride = FourCC::Uyvy.default_stride(1920);
        assert_eq!(stride, 3840);
        assert_eq!(FourCC::Uyvy.buffer_size(1920, 1080, stride), 3840 * 1080);
        assert_eq!(
            FourCC::Uyva.buffer_size(1920, 1080, stride),
            3840 * 1080 + 1920 * 1080
        );
        assert_eq!(FourCC::Bgra.buffer_size(4, 2, 16), 32);
        assert_eq!(FourCC::Nv12.buffer_size(4, 3, 4), 12 + 8);
    }

    #[test]
    fn test_frame_type_from_raw() {
        assert_eq!(FrameType::from_raw(1), Some(FrameType::Video));
        assert_eq!(FrameType::from_raw(101), Some(FrameType::SourceChange));
        assert_eq!(FrameType::from_raw(7), None);
    }

    #[test]
    fn test_color_format_raw() {
        assert_eq!(ColorFormat::default().to_raw() as i32, 100);
        assert_eq!(ColorFormat::UyvyRgba.to_raw() as i32, 3);
        assert_eq!(Bandwidth::default().to_raw() as i32, 100);
    }

    #[test]
    fn test_source_display() {
        let mut source = Source::new("STUDIO (Camera 1)");
        assert_eq!(source.to_string(), "STUDIO (Camera 1)");
        source.url_address = Some("10.0.0.5:5961".into());
        assert_eq!(source.to_string(), "STUDIO (Camera 1) [10.0.0.5:5961]");
    }
}
