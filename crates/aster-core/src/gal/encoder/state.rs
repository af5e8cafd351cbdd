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

//! The cached binding state behind redundant-state elimination.

use crate::gal::backend::ScissorRect;
use crate::gal::descriptors::{IndexFormat, PrimitiveTopology, SHADER_STAGE_COUNT};
use crate::gal::device::{
    BlendStateHandle, BufferHandle, DepthStencilStateHandle, RasterizerStateHandle,
    ResourceViewHandle, SamplerStateHandle, ShaderHandle, UnorderedAccessViewHandle,
};
use crate::math::Viewport;

/// The maximum number of constant buffer slots.
pub const MAX_CONSTANT_BUFFER_SLOTS: usize = 16;
/// The maximum number of shader resource view slots per stage.
pub const MAX_RESOURCE_VIEW_SLOTS: usize = 16;
/// The maximum number of sampler slots per stage.
pub const MAX_SAMPLER_SLOTS: usize = 16;
/// The maximum number of unordered access view slots.
pub const MAX_UAV_SLOTS: usize = 8;
/// The maximum number of vertex buffer slots.
pub const MAX_VERTEX_BUFFER_SLOTS: usize = 8;

/// Mirror of everything currently bound on a command encoder.
///
/// Binding arrays grow on demand and are emptied by
/// [`invalidate`](CommandEncoderState::invalidate); an empty slot array
/// means "nothing bound". The encoder compares against this cache before
/// touching the backend recorder, which is what makes redundant
/// state-setting calls free.
#[derive(Debug, Default)]
pub struct CommandEncoderState {
    /// The bound shader.
    pub shader: ShaderHandle,
    /// Bound constant buffers, indexed by slot.
    pub constant_buffers: Vec<BufferHandle>,
    /// Bound shader resource views, per stage, indexed by slot.
    pub resource_views: [Vec<ResourceViewHandle>; SHADER_STAGE_COUNT],
    /// Bound samplers, per stage, indexed by slot.
    pub sampler_states: [Vec<SamplerStateHandle>; SHADER_STAGE_COUNT],
    /// Bound unordered access views, indexed by slot.
    pub unordered_access_views: Vec<UnorderedAccessViewHandle>,
    /// Bound vertex buffers with their offsets, indexed by slot.
    pub vertex_buffers: Vec<(BufferHandle, u64)>,
    /// The bound index buffer.
    pub index_buffer: Option<(BufferHandle, IndexFormat, u64)>,
    /// The bound primitive topology.
    pub topology: Option<PrimitiveTopology>,
    /// The bound blend state and constant blend factor.
    pub blend_state: BlendStateHandle,
    /// The constant blend factor bound with the blend state.
    pub blend_factor: [f32; 4],
    /// The bound depth/stencil state.
    pub depth_stencil_state: DepthStencilStateHandle,
    /// The stencil reference value bound with the depth/stencil state.
    pub stencil_ref: u8,
    /// The bound rasterizer state.
    pub rasterizer_state: RasterizerStateHandle,
    /// The active viewport.
    pub viewport: Option<Viewport>,
    /// The active scissor rectangle.
    pub scissor: Option<ScissorRect>,
}

impl CommandEncoderState {
    /// Creates an empty state cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets every cached binding to its empty/invalid default, forcing
    /// the next state-setting calls through to the backend.
    ///
    /// Called at every encoder scope boundary.
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    /// Writes `value` into `slots[slot]`, growing the array with invalid
    /// handles as needed. Returns `false` if the slot already held `value`.
    pub(crate) fn bind_slot<T: Copy + Default + PartialEq>(
        slots: &mut Vec<T>,
        slot: usize,
        value: T,
    ) -> bool {
        if slots.len() <= slot {
            if value == T::default() {
                return false;
            }
            slots.resize(slot + 1, T::default());
        }
        if slots[slot] == value {
            return false;
        }
        slots[slot] = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gal::device::ShaderHandle;

    #[test]
    fn invalidate_resets_every_cached_binding() {
        let mut state = CommandEncoderState::new();
        state.shader = ShaderHandle::from_parts(3, 1);
        state.constant_buffers.push(BufferHandle::from_parts(1, 1));
        state.resource_views[0].push(ResourceViewHandle::from_parts(2, 1));
        state.sampler_states[1].push(SamplerStateHandle::from_parts(4, 1));
        state
            .unordered_access_views
            .push(UnorderedAccessViewHandle::from_parts(5, 1));
        state.vertex_buffers.push((BufferHandle::from_parts(6, 1), 0));
        state.index_buffer = Some((BufferHandle::from_parts(7, 1), IndexFormat::Uint16, 0));
        state.topology = Some(PrimitiveTopology::Triangles);
        state.viewport = Some(Viewport::from_size(64.0, 64.0));

        state.invalidate();

        assert!(state.shader.is_invalidated());
        assert_eq!(state.constant_buffers.len(), 0);
        for stage in &state.resource_views {
            assert_eq!(stage.len(), 0);
        }
        for stage in &state.sampler_states {
            assert_eq!(stage.len(), 0);
        }
        assert_eq!(state.unordered_access_views.len(), 0);
        assert_eq!(state.vertex_buffers.len(), 0);
        assert!(state.index_buffer.is_none());
        assert!(state.topology.is_none());
        assert!(state.blend_state.is_invalidated());
        assert!(state.depth_stencil_state.is_invalidated());
        assert!(state.rasterizer_state.is_invalidated());
        assert!(state.viewport.is_none());
        assert!(state.scissor.is_none());
    }

    #[test]
    fn bind_slot_reports_redundancy() {
        let mut slots: Vec<BufferHandle> = Vec::new();
        let buffer = BufferHandle::from_parts(1, 1);
        assert!(CommandEncoderState::bind_slot(&mut slots, 2, buffer));
        assert!(!CommandEncoderState::bind_slot(&mut slots, 2, buffer));
        // Unbinding a never-bound slot is also redundant.
        assert!(!CommandEncoderState::bind_slot(
            &mut slots,
            5,
            BufferHandle::INVALID
        ));
    }
}
