//! Per-frame NDI polling component.
//!
//! [`NdiReceiver`] is driven by the host once per rendered frame. Each
//! [`NdiReceiver::update`] lazily connects to the configured source, takes at
//! most one video frame without blocking, converts it and publishes the image
//! to the target renderer's material overrides and the target texture.
//!
//! Native resources are only held between [`NdiReceiver::update`] calls; the
//! host releases them with [`NdiReceiver::on_disable`] and the next update
//! creates them again.

use std::sync::Arc;

use crate::convert::{ConvertError, FormatConverter};
use crate::ndi::{Ndi, Recv, RecvOptions, Source, Tally};
use crate::output::{MaterialTarget, PropertyBlock, TextureTarget};
use crate::settings::{ReceiverSettings, DEFAULT_TARGET_PROPERTY};

/// Creates the converter the first time a frame has to be decoded.
pub type ConverterFactory<C> = Box<dyn FnMut() -> Result<C, ConvertError> + Send>;

type MaterialTargetBox<I> = Box<dyn MaterialTarget<I> + Send>;
type TextureTargetBox<I> = Box<dyn TextureTarget<I> + Send>;

/// Polls one NDI source and publishes its frames.
pub struct NdiReceiver<C: FormatConverter> {
    ndi: Arc<Ndi>,
    ndi_name: String,
    options: RecvOptions,
    target_material_property: String,
    target_renderer: Option<MaterialTargetBox<C::Image>>,
    target_texture: Option<TextureTargetBox<C::Image>>,
    make_converter: ConverterFactory<C>,

    recv: Option<Recv>,
    converter: Option<C>,
    property_block: Option<PropertyBlock<C::Image>>,
    texture: Option<C::Image>,
    metadata: Option<String>,
    // Failures already reported, so polling does not repeat them every tick.
    create_failed: bool,
    converter_failed: bool,
}

impl<C: FormatConverter> NdiReceiver<C> {
    pub fn new(
        ndi: Arc<Ndi>,
        ndi_name: impl Into<String>,
        make_converter: impl FnMut() -> Result<C, ConvertError> + Send + 'static,
    ) -> Self {
        Self {
            ndi,
            ndi_name: ndi_name.into(),
            options: RecvOptions::default(),
            target_material_property: DEFAULT_TARGET_PROPERTY.to_string(),
            target_renderer: None,
            target_texture: None,
            make_converter: Box::new(make_converter),
            recv: None,
            converter: None,
            property_block: None,
            texture: None,
            metadata: None,
            create_failed: false,
            converter_failed: false,
        }
    }

    /// Build a receiver from loaded settings.
    pub fn from_settings(
        ndi: Arc<Ndi>,
        settings: &ReceiverSettings,
        make_converter: impl FnMut() -> Result<C, ConvertError> + Send + 'static,
    ) -> Self {
        let mut receiver = Self::new(ndi, settings.ndi_name.clone(), make_converter);
        receiver.options = settings.recv_options();
        receiver.target_material_property = settings.target_material_property.clone();
        receiver
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Configuration
    // ═══════════════════════════════════════════════════════════════════════

    pub fn ndi_name(&self) -> &str {
        &self.ndi_name
    }

    /// Switch to another source. The current connection is dropped.
    pub fn set_ndi_name(&mut self, ndi_name: impl Into<String>) {
        self.ndi_name = ndi_name.into();
        self.restart();
    }

    pub fn recv_options(&self) -> &RecvOptions {
        &self.options
    }

    /// Change receiver options. Applied on the next connection.
    pub fn set_recv_options(&mut self, options: RecvOptions) {
        self.options = options;
        self.restart();
    }

    pub fn target_material_property(&self) -> &str {
        &self.target_material_property
    }

    pub fn set_target_material_property(&mut self, name: impl Into<String>) {
        self.target_material_property = name.into();
    }

    /// Renderer whose material overrides receive each frame.
    pub fn set_target_renderer(&mut self, target: Option<impl MaterialTarget<C::Image> + Send + 'static>) {
        self.target_renderer = target.map(|t| Box::new(t) as MaterialTargetBox<C::Image>);
    }

    /// Texture each frame is blitted into.
    pub fn set_target_texture(&mut self, target: Option<impl TextureTarget<C::Image> + Send + 'static>) {
        self.target_texture = target.map(|t| Box::new(t) as TextureTargetBox<C::Image>);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Create the native receiver and converter if they don't exist yet.
    ///
    /// Returns whether a receiver is available. A converter that failed to
    /// build is not retried until the next [`release`](Self::release).
    pub fn prepare(&mut self) -> bool {
        if self.recv.is_none() {
            match self.ndi.try_create_recv(&self.ndi_name, &self.options) {
                Ok(Some(recv)) => {
                    self.recv = Some(recv);
                    self.create_failed = false;
                }
                Ok(None) => return false,
                Err(e) => {
                    if self.create_failed {
                        tracing::debug!("NDI Receiver: {}", e);
                    } else {
                        tracing::warn!("NDI Receiver: {} for '{}', retrying", e, self.ndi_name);
                        self.create_failed = true;
                    }
                    return false;
                }
            }
        }

        if self.converter.is_none() && !self.converter_failed {
            match (self.make_converter)() {
                Ok(converter) => self.converter = Some(converter),
                Err(e) => {
                    tracing::warn!("NDI Receiver: Failed to create converter: {}", e);
                    self.converter_failed = true;
                }
            }
        }

        self.property_block.get_or_insert_with(PropertyBlock::new);
        true
    }

    /// Drop the native receiver and the converter.
    pub fn release(&mut self) {
        self.converter = None;
        self.converter_failed = false;
        self.texture = None;
        if let Some(recv) = self.recv.take() {
            tracing::debug!("NDI Receiver: Releasing '{}'", recv.source().ndi_name);
        }
    }

    /// Host disabled the component.
    pub fn on_disable(&mut self) {
        self.release();
    }

    /// Reconnect on the next update.
    pub fn restart(&mut self) {
        self.release();
    }

    pub fn is_connected(&self) -> bool {
        self.recv.is_some()
    }

    /// Source of the current connection.
    pub fn source(&self) -> Option<&Source> {
        self.recv.as_ref().map(Recv::source)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Frame polling
    // ═══════════════════════════════════════════════════════════════════════

    /// Take one video frame without blocking and convert it.
    ///
    /// Frames are captured even without a converter so the runtime's queue
    /// keeps draining.
    pub fn try_receive_frame(&mut self) -> Option<C::Image> {
        if !self.prepare() {
            return None;
        }
        let recv = self.recv.as_ref()?;

        let frame = recv.try_capture_video_frame()?;
        self.metadata = frame.metadata();

        let Some(converter) = self.converter.as_mut() else {
            tracing::trace!("NDI Receiver: No converter, dropped frame from '{}'", recv.source().ndi_name);
            return None;
        };

        let image = match converter.decode(&frame) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("NDI Receiver: Dropped frame from '{}': {}", recv.source().ndi_name, e);
                return None;
            }
        };
        drop(frame);

        self.texture = Some(image.clone());
        Some(image)
    }

    /// Per-frame tick. Returns whether a new frame was published.
    pub fn update(&mut self) -> bool {
        let Some(image) = self.try_receive_frame() else {
            return false;
        };

        if let Some(renderer) = self.target_renderer.as_mut() {
            let block = self.property_block.get_or_insert_with(PropertyBlock::new);
            renderer.property_block(block);
            block.set_texture(self.target_material_property.as_str(), image.clone());
            renderer.set_property_block(block);
        }

        if let Some(target) = self.target_texture.as_mut() {
            target.blit(&image);
        }

        true
    }

    /// Most recently converted image.
    pub fn texture(&self) -> Option<&C::Image> {
        self.texture.as_ref()
    }

    /// Metadata attached to the most recent frame.
    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    pub fn converter(&self) -> Option<&C> {
        self.converter.as_ref()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Tally / PTZ
    // ═══════════════════════════════════════════════════════════════════════

    fn with_recv(&mut self, f: impl FnOnce(&Recv) -> bool) -> bool {
        if !self.prepare() {
            return false;
        }
        self.recv.as_ref().is_some_and(f)
    }

    pub fn set_tally(&mut self, tally: Tally) -> bool {
        self.with_recv(|recv| recv.set_tally(tally))
    }

    /// Live connections of the current receiver, 0 when not connected.
    pub fn connection_count(&self) -> usize {
        self.recv.as_ref().map_or(0, Recv::connection_count)
    }

    pub fn is_ptz_supported(&mut self) -> bool {
        self.with_recv(Recv::ptz_is_supported)
    }

    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        self.with_recv(|recv| recv.ptz_zoom(zoom))
    }

    pub fn set_zoom_speed(&mut self, zoom_speed: f32) -> bool {
        self.with_recv(|recv| recv.ptz_zoom_speed(zoom_speed))
    }

    pub fn set_pan_tilt(&mut self, pan: f32, tilt: f32) -> bool {
        self.with_recv(|recv| recv.ptz_pan_tilt(pan, tilt))
    }

    pub fn set_pan_tilt_speed(&mut self, pan_speed: f32, tilt_speed: f32) -> bool {
        self.with_recv(|recv| recv.ptz_pan_tilt_speed(pan_speed, tilt_speed))
    }

    pub fn store_ptz_preset(&mut self, index: i32) -> bool {
        self.with_recv(|recv| recv.ptz_store_preset(index))
    }

    pub fn recall_ptz_preset(&mut self, index: i32, speed: f32) -> bool {
        self.with_recv(|recv| recv.ptz_recall_preset(index, speed))
    }
}

impl<C: FormatConverter> Drop for NdiReceiver<C> {
    fn drop(&mut self) {
        self.release();
    }
}
