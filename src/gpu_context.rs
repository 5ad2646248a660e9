//! Shared GPU context
//!
//! Provides `GpuContext` for the device/queue pair the converter and output
//! targets render with. Hosts that already own a device wrap it with
//! [`GpuContext::from_parts`]; the CLI creates a headless one.

use std::sync::Arc;

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// GPU CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// GPU setup and readback errors.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("cannot read back texture format {0:?}")]
    UnsupportedReadbackFormat(wgpu::TextureFormat),

    #[error("failed to map readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),

    #[error("readback callback was dropped")]
    MapCallbackDropped,

    #[error("readback produced a {width}x{height} image with the wrong size")]
    ImageSize { width: u32, height: u32 },
}

/// Shared GPU resources.
///
/// Wrapped in `Arc<GpuContext>` for sharing between the converter and targets.
pub struct GpuContext {
    /// The wgpu instance
    pub instance: wgpu::Instance,
    /// The selected GPU adapter
    pub adapter: wgpu::Adapter,
    /// The GPU device for creating resources
    pub device: wgpu::Device,
    /// The command queue for submitting GPU work
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Wrap resources the host has already created.
    pub fn from_parts(
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
    ) -> Self {
        Self {
            instance,
            adapter,
            device,
            queue,
        }
    }

    /// Create a context without any surface.
    pub async fn new_headless() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        tracing::info!("Using GPU: {}", adapter.get_info().name);
        tracing::info!("Backend: {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("NDI Texture Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Blocking variant of [`GpuContext::new_headless`], shared behind an `Arc`.
    pub fn headless_blocking() -> Result<Arc<Self>, GpuError> {
        pollster::block_on(Self::new_headless()).map(Arc::new)
    }

    /// Copy an RGBA8 or BGRA8 texture back to the CPU.
    ///
    /// Blocks until the GPU has finished all submitted work.
    pub fn read_texture_rgba(&self, texture: &wgpu::Texture) -> Result<image::RgbaImage, GpuError> {
        let format = texture.format();
        let swap_red_blue = match format {
            wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => false,
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => true,
            other => return Err(GpuError::UnsupportedReadbackFormat(other)),
        };

        let width = texture.width();
        let height = texture.height();
        let bytes_per_row = width * 4;
        let padded = padded_bytes_per_row(width);

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("NDI Readback Buffer"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("NDI Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        rx.recv().map_err(|_| GpuError::MapCallbackDropped)??;

        let mut pixels = Vec::with_capacity((bytes_per_row * height) as usize);
        {
            let data = buffer_slice.get_mapped_range();
            for row in data.chunks(padded as usize).take(height as usize) {
                pixels.extend_from_slice(&row[..bytes_per_row as usize]);
            }
        }
        staging.unmap();

        if swap_red_blue {
            for pixel in pixels.chunks_exact_mut(4) {
                pixel.swap(0, 2);
            }
        }

        image::RgbaImage::from_raw(width, height, pixels).ok_or(GpuError::ImageSize { width, height })
    }
}

/// Row pitch for texture-to-buffer copies, rounded up to wgpu's 256 byte alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let bytes_per_row = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    bytes_per_row.div_ceil(align) * align
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_bytes_per_row() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1920), 7680);
    }

    #[test]
    fn test_gpu_error_messages() {
        assert_eq!(GpuError::NoAdapter.to_string(), "no suitable GPU adapter found");
        assert_eq!(
            GpuError::UnsupportedReadbackFormat(wgpu::TextureFormat::R8Unorm).to_string(),
            "cannot read back texture format R8Unorm"
        );
    }
}
