//! Renderer-visible outputs of the receiver.
//!
//! A received image is published two ways: as a named texture override on a
//! material (a [`PropertyBlock`] read from and written back to a
//! [`MaterialTarget`]), and by blitting into a host-owned texture through a
//! [`TextureTarget`].

mod blit;

pub use blit::ExternalTexture;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Named texture overrides applied on top of a material.
#[derive(Debug, Clone)]
pub struct PropertyBlock<I> {
    textures: HashMap<String, I>,
}

impl<I> Default for PropertyBlock<I> {
    fn default() -> Self {
        Self {
            textures: HashMap::new(),
        }
    }
}

impl<I> PropertyBlock<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the texture bound to `name`.
    pub fn set_texture(&mut self, name: impl Into<String>, texture: I) {
        self.textures.insert(name.into(), texture);
    }

    pub fn texture(&self, name: &str) -> Option<&I> {
        self.textures.get(name)
    }

    pub fn clear(&mut self) {
        self.textures.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &I)> {
        self.textures.iter().map(|(name, texture)| (name.as_str(), texture))
    }
}

/// Something that carries material overrides, such as a renderer.
pub trait MaterialTarget<I> {
    /// Replace the contents of `block` with this target's current overrides.
    fn property_block(&self, block: &mut PropertyBlock<I>);

    /// Apply `block` as this target's overrides.
    fn set_property_block(&mut self, block: &PropertyBlock<I>);
}

/// A texture the receiver copies every published image into.
pub trait TextureTarget<I> {
    fn blit(&mut self, source: &I);
}

/// Plain in-memory material target.
#[derive(Debug, Clone)]
pub struct MaterialSlot<I> {
    overrides: PropertyBlock<I>,
}

impl<I> Default for MaterialSlot<I> {
    fn default() -> Self {
        Self {
            overrides: PropertyBlock::default(),
        }
    }
}

impl<I> MaterialSlot<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The texture currently bound to `name`.
    pub fn texture(&self, name: &str) -> Option<&I> {
        self.overrides.texture(name)
    }

    pub fn overrides(&self) -> &PropertyBlock<I> {
        &self.overrides
    }
}

impl<I: Clone> MaterialTarget<I> for MaterialSlot<I> {
    fn property_block(&self, block: &mut PropertyBlock<I>) {
        block.clone_from(&self.overrides);
    }

    fn set_property_block(&mut self, block: &PropertyBlock<I>) {
        self.overrides.clone_from(block);
    }
}

impl<I, T: MaterialTarget<I>> MaterialTarget<I> for Arc<Mutex<T>> {
    fn property_block(&self, block: &mut PropertyBlock<I>) {
        self.lock().property_block(block);
    }

    fn set_property_block(&mut self, block: &PropertyBlock<I>) {
        self.lock().set_property_block(block);
    }
}

impl<I, T: TextureTarget<I>> TextureTarget<I> for Arc<Mutex<T>> {
    fn blit(&mut self, source: &I) {
        self.lock().blit(source);
    }
}
