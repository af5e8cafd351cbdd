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

//! The view: camera, viewport and output render targets of one pipeline
//! execution.
//!
//! Views are produced by the (out-of-scope) world/render-world layer; the
//! pipeline only reads them. The render-target handles typically point at
//! swap-chain backbuffers and are refreshed every frame after
//! `acquire_next_render_target`.

use crate::gal::TextureHandle;
use crate::math::{Vec3, Viewport};

/// The maximum number of color render targets a view can carry.
pub const MAX_COLOR_TARGETS: usize = 8;

/// A minimal camera: enough for culling-independent sorting and cluster
/// binning.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    /// World-space camera position.
    pub position: Vec3,
    /// Normalized view direction.
    pub forward: Vec3,
    /// Normalized up vector.
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    /// Near plane distance.
    pub near: f32,
    /// Far plane distance.
    pub far: f32,
}

impl Camera {
    /// Distance from the camera to a world-space point.
    pub fn distance_to(&self, point: Vec3) -> f32 {
        (point - self.position).length()
    }

    /// Signed depth of a point along the view direction.
    pub fn view_depth(&self, point: Vec3) -> f32 {
        (point - self.position).dot(self.forward)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            fov_y_degrees: 60.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Identifies one of the view's output render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetSlot {
    /// A color target by index.
    Color(u8),
    /// The depth/stencil target.
    DepthStencil,
}

/// The output textures a view renders into.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderTargets {
    /// Color targets, indexed by slot.
    pub colors: [TextureHandle; MAX_COLOR_TARGETS],
    /// The depth/stencil target.
    pub depth_stencil: TextureHandle,
}

impl RenderTargets {
    /// The texture bound to `slot` (possibly invalid).
    pub fn texture(&self, slot: RenderTargetSlot) -> TextureHandle {
        match slot {
            RenderTargetSlot::Color(index) => self
                .colors
                .get(index as usize)
                .copied()
                .unwrap_or(TextureHandle::INVALID),
            RenderTargetSlot::DepthStencil => self.depth_stencil,
        }
    }

    /// Binds a texture to `slot`.
    pub fn set_texture(&mut self, slot: RenderTargetSlot, texture: TextureHandle) {
        match slot {
            RenderTargetSlot::Color(index) => {
                if let Some(entry) = self.colors.get_mut(index as usize) {
                    *entry = texture;
                }
            }
            RenderTargetSlot::DepthStencil => self.depth_stencil = texture,
        }
    }
}

/// A camera + viewport + render-target triple driving one pipeline run.
#[derive(Debug, Clone)]
pub struct View {
    name: String,
    camera: Camera,
    viewport: Viewport,
    render_targets: RenderTargets,
}

impl View {
    /// Creates a view with the given name and viewport.
    pub fn new(name: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            name: name.into(),
            camera: Camera::default(),
            viewport,
            render_targets: RenderTargets::default(),
        }
    }

    /// The view's name (used in logs and markers).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The viewport in pixels.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Replaces the viewport. A size change makes the owning pipeline
    /// rebuild on its next `ensure_rebuilt`.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// The camera used for sorting and per-view data.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera access.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// The currently bound output render targets.
    pub fn render_targets(&self) -> &RenderTargets {
        &self.render_targets
    }

    /// Rebinds one output render target (typically after a swap-chain
    /// acquire).
    pub fn set_render_target(&mut self, slot: RenderTargetSlot, texture: TextureHandle) {
        self.render_targets.set_texture(slot, texture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn camera_distances() {
        let camera = Camera {
            position: Vec3::new(0.0, 0.0, 5.0),
            ..Camera::default()
        };
        assert_relative_eq!(camera.distance_to(Vec3::new(0.0, 0.0, -5.0)), 10.0);
        // Depth is signed along the view direction.
        assert_relative_eq!(camera.view_depth(Vec3::new(0.0, 0.0, -5.0)), 10.0);
        assert_relative_eq!(camera.view_depth(Vec3::new(0.0, 0.0, 8.0)), -3.0);
    }

    #[test]
    fn render_target_slots() {
        let mut targets = RenderTargets::default();
        assert!(targets.texture(RenderTargetSlot::Color(0)).is_invalidated());

        let handle = TextureHandle::from_parts(5, 1);
        targets.set_texture(RenderTargetSlot::Color(2), handle);
        targets.set_texture(RenderTargetSlot::DepthStencil, handle);
        assert_eq!(targets.texture(RenderTargetSlot::Color(2)), handle);
        assert_eq!(targets.texture(RenderTargetSlot::DepthStencil), handle);
        // Out-of-range color slots read back as invalid.
        assert!(targets
            .texture(RenderTargetSlot::Color(MAX_COLOR_TARGETS as u8))
            .is_invalidated());
    }
}
