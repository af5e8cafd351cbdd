// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The transient render-target pool.
//!
//! Targets produced by Output/PassThrough pins live for the pipeline's
//! lifetime, not per frame: on every rebuild the pipeline returns its
//! targets here and re-acquires, so an unchanged description reuses the
//! same texture instead of reallocating. Keyed by the descriptor hash,
//! which covers size, format, sample count and usage.

use log::trace;
use std::collections::HashMap;

use crate::gal::{GalDevice, GalError, TextureDesc, TextureHandle};

/// A pool of reusable render-target textures keyed by descriptor hash.
#[derive(Debug, Default)]
pub struct TransientTargetPool {
    free: HashMap<u64, Vec<TextureHandle>>,
    allocation_count: usize,
}

impl TransientTargetPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a texture matching `desc`, reusing a pooled one when the
    /// descriptor hash matches.
    pub fn acquire(
        &mut self,
        device: &mut GalDevice,
        desc: &TextureDesc,
    ) -> Result<TextureHandle, GalError> {
        let hash = desc.calculate_hash();
        if let Some(pooled) = self.free.get_mut(&hash) {
            while let Some(texture) = pooled.pop() {
                // A stale handle here means someone destroyed the texture
                // behind the pool's back; skip it.
                if device.texture(texture).is_some() {
                    trace!("transient pool: reusing target {texture:?}");
                    return Ok(texture);
                }
            }
        }
        self.allocation_count += 1;
        trace!("transient pool: allocating {}x{} {:?}", desc.size.width, desc.size.height, desc.format);
        device.create_texture(desc, &[])
    }

    /// Returns a texture to the pool for later reuse.
    pub fn release(&mut self, desc: &TextureDesc, texture: TextureHandle) {
        if texture.is_invalidated() {
            return;
        }
        self.free.entry(desc.calculate_hash()).or_default().push(texture);
    }

    /// Destroys every pooled texture. Called when the owning pipeline is
    /// torn down.
    pub fn destroy_all(&mut self, device: &mut GalDevice) {
        for (_, textures) in self.free.drain() {
            for texture in textures {
                device.destroy_texture(texture);
            }
        }
    }

    /// Total textures ever allocated through this pool (reuse does not
    /// increment).
    pub fn allocation_count(&self) -> usize {
        self.allocation_count
    }

    /// Textures currently parked in the pool.
    pub fn free_count(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }
}
