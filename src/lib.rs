//! NDI receiver that publishes incoming video as wgpu textures.
//!
//! The host drives an [`NdiReceiver`] once per rendered frame. The receiver
//! pulls at most one frame from the NDI runtime, converts it on the GPU with a
//! [`GpuFormatConverter`] and hands the result to a material override and an
//! [`ExternalTexture`].

pub mod convert;
pub mod gpu_context;
pub mod ndi;
pub mod output;
pub mod receiver;
pub mod settings;
pub mod telemetry;

pub use convert::{ConvertError, FormatConverter, GpuFormatConverter, GpuImage};
pub use gpu_context::{GpuContext, GpuError};
pub use ndi::{Ndi, NdiError};
pub use output::{ExternalTexture, MaterialSlot, MaterialTarget, PropertyBlock, TextureTarget};
pub use receiver::NdiReceiver;
pub use settings::{ReceiverSettings, SettingsError};
