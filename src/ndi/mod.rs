//! NDI receive support via the official NDI runtime.
//!
//! ```text
//! Ndi ──────────── loads/initializes the runtime, owns the shared Finder
//!  └─ Recv ─────── one receiver handle (capture, tally, PTZ)
//!      └─ VideoFrame  borrowed frame, freed on drop
//! ```

pub mod api;
pub mod context;
pub mod error;
pub mod ffi;
pub mod find;
pub mod library;
pub mod recv;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use api::NdiApi;
pub use context::Ndi;
pub use error::NdiError;
pub use find::Finder;
pub use library::NdiLibrary;
pub use recv::{Capture, Recv, RecvOptions, VideoFrame};
pub use types::{Bandwidth, ColorFormat, FourCC, FrameFormat, FrameType, Source, Tally};
