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

//! Extracted render data, categories and the category registry.
//!
//! The world-side extraction (out of scope here) fills an
//! [`ExtractedRenderData`] per view; the pipeline's passes consume it in
//! category order after sorting with the category's key function.

use log::warn;
use std::collections::HashMap;

use crate::math::{LinearRgba, Mat4, Vec3};

use super::sorting::SortingKeyFn;
use super::view::Camera;

/// A render-data category, e.g. "LitOpaque".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderDataCategory(pub u16);

/// An invalid category, returned by failed lookups.
pub const INVALID_RENDER_DATA_CATEGORY: RenderDataCategory = RenderDataCategory(u16::MAX);

/// Hashes a render-data type name to the 16-bit hash used in sorting keys.
///
/// FNV-1a, truncated. Stable across runs and platforms, which keeps sort
/// keys deterministic.
pub fn render_data_type_hash(type_name: &str) -> u16 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in type_name.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    (hash & 0xFFFF) as u16
}

/// One extracted renderable.
#[derive(Debug, Clone)]
pub struct RenderData {
    /// Object-to-world transform.
    pub transform: Mat4,
    /// World-space sorting reference point (usually the bounds center).
    pub position: Vec3,
    /// Additive tweak applied to the camera distance before quantization,
    /// letting extractors bias draw order within a category.
    pub sorting_depth_offset: f32,
    /// The caller-supplied 32-bit sorting key (material/mesh hash).
    pub sorting_key: u32,
    /// The 16-bit hash of the render-data type
    /// (see [`render_data_type_hash`]).
    pub type_hash: u16,
    /// Vertex count submitted when this entry is drawn.
    pub vertex_count: u32,
}

/// An extracted point light.
#[derive(Debug, Clone, Copy)]
pub struct PointLightData {
    /// World-space position.
    pub position: Vec3,
    /// Influence radius.
    pub radius: f32,
    /// Light color.
    pub color: LinearRgba,
    /// Intensity multiplier.
    pub intensity: f32,
}

/// Per-category registration data.
#[derive(Debug)]
struct CategoryData {
    name: String,
    sorting_key_fn: SortingKeyFn,
}

/// Maps category names to sorting policies.
///
/// Plain instance state: construct one per render world and pass it where
/// needed instead of reaching for a global.
#[derive(Debug, Default)]
pub struct CategoryRegistry {
    categories: Vec<CategoryData>,
    by_name: HashMap<String, u16>,
}

impl CategoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the engine's default categories registered
    /// in the order of [`DefaultRenderDataCategories`].
    pub fn with_default_categories() -> Self {
        use super::sorting::{back_to_front_then_by_render_data, by_render_data_then_front_to_back};
        let mut registry = Self::new();
        registry.register_category("LitOpaque", by_render_data_then_front_to_back);
        registry.register_category("LitMasked", by_render_data_then_front_to_back);
        registry.register_category("LitTransparent", back_to_front_then_by_render_data);
        registry.register_category("SimpleOpaque", by_render_data_then_front_to_back);
        registry.register_category("SimpleTransparent", back_to_front_then_by_render_data);
        registry.register_category("Sky", by_render_data_then_front_to_back);
        registry.register_category("SelectionHighlight", by_render_data_then_front_to_back);
        registry
    }

    /// Registers a category; returns the existing one if the name is
    /// already taken (the sorting function of the first registration
    /// wins).
    pub fn register_category(
        &mut self,
        name: &str,
        sorting_key_fn: SortingKeyFn,
    ) -> RenderDataCategory {
        if let Some(&existing) = self.by_name.get(name) {
            return RenderDataCategory(existing);
        }
        let index = self.categories.len() as u16;
        self.categories.push(CategoryData {
            name: name.to_string(),
            sorting_key_fn,
        });
        self.by_name.insert(name.to_string(), index);
        RenderDataCategory(index)
    }

    /// Finds a category by name.
    pub fn find_category(&self, name: &str) -> RenderDataCategory {
        match self.by_name.get(name) {
            Some(&index) => RenderDataCategory(index),
            None => INVALID_RENDER_DATA_CATEGORY,
        }
    }

    /// The registered name of a category.
    pub fn category_name(&self, category: RenderDataCategory) -> Option<&str> {
        self.categories
            .get(category.0 as usize)
            .map(|c| c.name.as_str())
    }

    /// Computes the sort key of one entry under a category's policy.
    pub fn sorting_key(
        &self,
        category: RenderDataCategory,
        data: &RenderData,
        camera: &Camera,
    ) -> u64 {
        match self.categories.get(category.0 as usize) {
            Some(entry) => (entry.sorting_key_fn)(data, data.sorting_key, camera),
            None => {
                warn!("sorting_key queried for unregistered category {category:?}");
                0
            }
        }
    }
}

/// The default categories, index-stable with
/// [`CategoryRegistry::with_default_categories`].
#[allow(missing_docs)]
pub struct DefaultRenderDataCategories;

impl DefaultRenderDataCategories {
    pub const LIT_OPAQUE: RenderDataCategory = RenderDataCategory(0);
    pub const LIT_MASKED: RenderDataCategory = RenderDataCategory(1);
    pub const LIT_TRANSPARENT: RenderDataCategory = RenderDataCategory(2);
    pub const SIMPLE_OPAQUE: RenderDataCategory = RenderDataCategory(3);
    pub const SIMPLE_TRANSPARENT: RenderDataCategory = RenderDataCategory(4);
    pub const SKY: RenderDataCategory = RenderDataCategory(5);
    pub const SELECTION_HIGHLIGHT: RenderDataCategory = RenderDataCategory(6);
}

/// Everything extracted from the world for one view and one frame.
#[derive(Debug, Default)]
pub struct ExtractedRenderData {
    batches: HashMap<RenderDataCategory, Vec<RenderData>>,
    lights: Vec<PointLightData>,
}

impl ExtractedRenderData {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one renderable to a category batch.
    pub fn add(&mut self, category: RenderDataCategory, data: RenderData) {
        self.batches.entry(category).or_default().push(data);
    }

    /// Adds an extracted point light.
    pub fn add_light(&mut self, light: PointLightData) {
        self.lights.push(light);
    }

    /// The extracted lights.
    pub fn lights(&self) -> &[PointLightData] {
        &self.lights
    }

    /// The (possibly unsorted) batch of a category.
    pub fn batch(&self, category: RenderDataCategory) -> &[RenderData] {
        self.batches
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sorts every batch with its category's key function. Stable, so
    /// entries with equal keys keep extraction order.
    pub fn sort_batches(&mut self, registry: &CategoryRegistry, camera: &Camera) {
        for (category, batch) in &mut self.batches {
            batch.sort_by_key(|data| registry.sorting_key(*category, data, camera));
        }
    }

    /// Total number of extracted renderables across all categories.
    pub fn renderable_count(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_hash_is_stable_and_16_bit() {
        let a = render_data_type_hash("MeshRenderData");
        let b = render_data_type_hash("MeshRenderData");
        let c = render_data_type_hash("SkinnedMeshRenderData");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn registry_is_idempotent_per_name() {
        let mut registry = CategoryRegistry::with_default_categories();
        let again = registry
            .register_category("LitOpaque", super::super::sorting::by_render_data_then_front_to_back);
        assert_eq!(again, DefaultRenderDataCategories::LIT_OPAQUE);
        assert_eq!(
            registry.find_category("LitTransparent"),
            DefaultRenderDataCategories::LIT_TRANSPARENT
        );
        assert_eq!(
            registry.find_category("NoSuchCategory"),
            INVALID_RENDER_DATA_CATEGORY
        );
        assert_eq!(
            registry.category_name(DefaultRenderDataCategories::SKY),
            Some("Sky")
        );
    }
}
