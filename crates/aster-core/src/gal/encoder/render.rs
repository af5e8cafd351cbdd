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

//! The render command encoder scope guard.

use log::error;

use crate::gal::backend::ScissorRect;
use crate::gal::descriptors::{BufferUsage, IndexFormat, PrimitiveTopology, ShaderStage};
use crate::gal::device::{
    BlendStateHandle, BufferHandle, DepthStencilStateHandle, QueryHandle, RasterizerStateHandle,
    ResourceViewHandle, SamplerStateHandle, ShaderHandle, TextureHandle,
};
use crate::gal::encoder::state::MAX_VERTEX_BUFFER_SLOTS;
use crate::gal::pass::{Pass, ScopeState};
use crate::math::Viewport;

use super::CommandEncoderState;

/// Records draw calls and graphics state into an open render scope.
///
/// Obtained from [`Pass::begin_rendering`]; dropping it ends the scope and
/// pops the scope's debug marker.
#[derive(Debug)]
pub struct RenderCommandEncoder<'p, 'd> {
    pass: &'p mut Pass<'d>,
    pop_marker: bool,
}

impl<'p, 'd> RenderCommandEncoder<'p, 'd> {
    pub(crate) fn new(pass: &'p mut Pass<'d>, pop_marker: bool) -> Self {
        Self { pass, pop_marker }
    }

    // --- State ---

    /// Binds a graphics shader.
    pub fn set_shader(&mut self, shader: ShaderHandle) {
        self.pass.bind_shader(shader);
    }

    /// Binds a constant buffer slot; an invalid handle unbinds it.
    pub fn set_constant_buffer(&mut self, slot: u32, buffer: BufferHandle) {
        self.pass.bind_constant_buffer(slot, buffer);
    }

    /// Binds a shader resource view slot; an invalid handle unbinds it.
    pub fn set_resource_view(&mut self, stage: ShaderStage, slot: u32, view: ResourceViewHandle) {
        self.pass.bind_resource_view(stage, slot, view);
    }

    /// Binds a sampler slot; an invalid handle unbinds it.
    pub fn set_sampler_state(&mut self, stage: ShaderStage, slot: u32, sampler: SamplerStateHandle) {
        self.pass.bind_sampler_state(stage, slot, sampler);
    }

    /// Binds a blend state with a constant blend factor.
    pub fn set_blend_state(&mut self, state: BlendStateHandle, blend_factor: [f32; 4]) {
        self.pass.bind_blend_state(state, blend_factor);
    }

    /// Binds a depth/stencil state with a stencil reference value.
    pub fn set_depth_stencil_state(&mut self, state: DepthStencilStateHandle, stencil_ref: u8) {
        self.pass.bind_depth_stencil_state(state, stencil_ref);
    }

    /// Binds a rasterizer state.
    pub fn set_rasterizer_state(&mut self, state: RasterizerStateHandle) {
        self.pass.bind_rasterizer_state(state);
    }

    /// Sets the primitive topology.
    pub fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        if self.pass.state.topology == Some(topology) {
            self.pass.device.stats.redundant_state_changes += 1;
            return;
        }
        self.pass.state.topology = Some(topology);
        self.pass.device.stats.state_changes += 1;
        self.pass.recorder_mut().set_primitive_topology(topology);
    }

    /// Sets the viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.pass.state.viewport == Some(viewport) {
            self.pass.device.stats.redundant_state_changes += 1;
            return;
        }
        self.pass.state.viewport = Some(viewport);
        self.pass.device.stats.state_changes += 1;
        self.pass.recorder_mut().set_viewport(viewport);
    }

    /// Sets the scissor rectangle.
    pub fn set_scissor_rect(&mut self, rect: ScissorRect) {
        if self.pass.state.scissor == Some(rect) {
            self.pass.device.stats.redundant_state_changes += 1;
            return;
        }
        self.pass.state.scissor = Some(rect);
        self.pass.device.stats.state_changes += 1;
        self.pass.recorder_mut().set_scissor_rect(rect);
    }

    /// Binds a vertex buffer slot.
    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64) {
        debug_assert!(
            (slot as usize) < MAX_VERTEX_BUFFER_SLOTS,
            "vertex buffer slot {slot} out of range"
        );
        if !CommandEncoderState::bind_slot(
            &mut self.pass.state.vertex_buffers,
            slot as usize,
            (buffer, offset),
        ) {
            self.pass.device.stats.redundant_state_changes += 1;
            return;
        }
        let Some(native) = self.pass.device.native_buffer(buffer) else {
            error!("set_vertex_buffer: stale buffer handle, skipping bind.");
            return;
        };
        self.pass.device.stats.state_changes += 1;
        self.pass.recorder_mut().set_vertex_buffer(slot, native, offset);
    }

    /// Binds the index buffer.
    pub fn set_index_buffer(&mut self, buffer: BufferHandle, format: IndexFormat, offset: u64) {
        if self.pass.state.index_buffer == Some((buffer, format, offset)) {
            self.pass.device.stats.redundant_state_changes += 1;
            return;
        }
        let Some(native) = self.pass.device.native_buffer(buffer) else {
            error!("set_index_buffer: stale buffer handle, skipping bind.");
            return;
        };
        self.pass.state.index_buffer = Some((buffer, format, offset));
        self.pass.device.stats.state_changes += 1;
        self.pass.recorder_mut().set_index_buffer(native, format, offset);
    }

    // --- Draws ---

    /// Draws non-indexed geometry.
    pub fn draw(&mut self, vertex_count: u32, first_vertex: u32) {
        self.pass.device.stats.draw_calls += 1;
        self.pass.recorder_mut().draw(vertex_count, first_vertex);
    }

    /// Draws indexed geometry.
    pub fn draw_indexed(&mut self, index_count: u32, first_index: u32, base_vertex: i32) {
        self.pass.device.stats.draw_calls += 1;
        self.pass
            .recorder_mut()
            .draw_indexed(index_count, first_index, base_vertex);
    }

    /// Draws instanced non-indexed geometry.
    pub fn draw_instanced(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32) {
        self.pass.device.stats.draw_calls += 1;
        self.pass
            .recorder_mut()
            .draw_instanced(vertex_count, instance_count, first_vertex);
    }

    /// Draws instanced indexed geometry.
    pub fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
    ) {
        self.pass.device.stats.draw_calls += 1;
        self.pass
            .recorder_mut()
            .draw_indexed_instanced(index_count, instance_count, first_index, base_vertex);
    }

    /// Draws with arguments sourced from `args`.
    ///
    /// Panics if `args` does not resolve or was not created with
    /// [`BufferUsage::INDIRECT`]; a stale indirect-argument buffer is a
    /// programmer error, not a recoverable condition.
    pub fn draw_indirect(&mut self, args: BufferHandle, offset: u64) {
        let native = self.pass.resolve_required_buffer(args, "draw_indirect");
        debug_assert!(
            self.pass
                .device
                .buffer(args)
                .is_some_and(|b| b.desc.usage.contains(BufferUsage::INDIRECT)),
            "draw_indirect: buffer lacks INDIRECT usage"
        );
        self.pass.device.stats.draw_calls += 1;
        self.pass.recorder_mut().draw_indirect(native, offset);
    }

    // --- Resource operations ---

    /// Writes CPU data into a buffer region.
    pub fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        let Some(native) = self.pass.device.native_buffer(buffer) else {
            error!("update_buffer: stale buffer handle, dropping the update.");
            return;
        };
        self.pass.recorder_mut().update_buffer(native, offset, data);
    }

    /// Copies one buffer into another.
    pub fn copy_buffer(&mut self, dst: BufferHandle, src: BufferHandle) {
        let (Some(dst), Some(src)) = (
            self.pass.device.native_buffer(dst),
            self.pass.device.native_buffer(src),
        ) else {
            error!("copy_buffer: stale buffer handle, dropping the copy.");
            return;
        };
        self.pass.recorder_mut().copy_buffer(dst, src);
    }

    /// Copies a buffer region.
    pub fn copy_buffer_region(
        &mut self,
        dst: BufferHandle,
        dst_offset: u64,
        src: BufferHandle,
        src_offset: u64,
        byte_count: u64,
    ) {
        let (Some(dst), Some(src)) = (
            self.pass.device.native_buffer(dst),
            self.pass.device.native_buffer(src),
        ) else {
            error!("copy_buffer_region: stale buffer handle, dropping the copy.");
            return;
        };
        self.pass
            .recorder_mut()
            .copy_buffer_region(dst, dst_offset, src, src_offset, byte_count);
    }

    /// Copies one texture into another.
    pub fn copy_texture(&mut self, dst: TextureHandle, src: TextureHandle) {
        let (Some(dst), Some(src)) = (
            self.pass.device.native_texture(dst),
            self.pass.device.native_texture(src),
        ) else {
            error!("copy_texture: stale texture handle, dropping the copy.");
            return;
        };
        self.pass.recorder_mut().copy_texture(dst, src);
    }

    /// Resolves a multisampled texture into a single-sampled one.
    pub fn resolve_texture(&mut self, dst: TextureHandle, src: TextureHandle) {
        let (Some(dst), Some(src)) = (
            self.pass.device.native_texture(dst),
            self.pass.device.native_texture(src),
        ) else {
            error!("resolve_texture: stale texture handle, dropping the resolve.");
            return;
        };
        self.pass.recorder_mut().resolve_texture(dst, src);
    }

    /// Generates the mip chain of the texture behind `view`.
    pub fn generate_mip_maps(&mut self, view: ResourceViewHandle) {
        let Some(native) = self.pass.device.native_resource_view(view) else {
            error!("generate_mip_maps: stale view handle, skipping.");
            return;
        };
        self.pass.recorder_mut().generate_mip_maps(native);
    }

    // --- Queries ---

    /// Begins a query.
    pub fn begin_query(&mut self, query: QueryHandle) {
        let Some(native) = self.pass.device.native_query(query) else {
            error!("begin_query: stale query handle, skipping.");
            return;
        };
        self.pass.recorder_mut().begin_query(native);
    }

    /// Ends a query.
    pub fn end_query(&mut self, query: QueryHandle) {
        let Some(native) = self.pass.device.native_query(query) else {
            error!("end_query: stale query handle, skipping.");
            return;
        };
        self.pass.recorder_mut().end_query(native);
    }

    // --- Markers ---

    /// Pushes a nested debug marker.
    pub fn push_marker(&mut self, label: &str) {
        self.pass.recorder_mut().push_marker(label);
    }

    /// Pops the innermost debug marker.
    pub fn pop_marker(&mut self) {
        self.pass.recorder_mut().pop_marker();
    }

    /// Inserts a single event marker.
    pub fn insert_event_marker(&mut self, label: &str) {
        self.pass.recorder_mut().insert_event_marker(label);
    }
}

impl Drop for RenderCommandEncoder<'_, '_> {
    fn drop(&mut self) {
        if self.pop_marker {
            self.pass.recorder_mut().pop_marker();
        }
        self.pass.recorder_mut().end_rendering();
        self.pass.scope = ScopeState::Invalid;
    }
}
