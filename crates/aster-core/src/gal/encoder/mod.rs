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

//! Render and compute command encoders.
//!
//! Encoders are scope guards handed out by [`Pass`]; all state-setting
//! calls run through the shared [`CommandEncoderState`] cache so that
//! binding the same object to the same slot twice never reaches the
//! backend.

mod compute;
mod render;
mod state;

pub use compute::ComputeCommandEncoder;
pub use render::RenderCommandEncoder;
pub use state::{
    CommandEncoderState, MAX_CONSTANT_BUFFER_SLOTS, MAX_RESOURCE_VIEW_SLOTS, MAX_SAMPLER_SLOTS,
    MAX_UAV_SLOTS, MAX_VERTEX_BUFFER_SLOTS,
};

use log::error;

use crate::gal::backend::NativeId;
use crate::gal::descriptors::ShaderStage;
use crate::gal::device::{
    BlendStateHandle, BufferHandle, DepthStencilStateHandle, RasterizerStateHandle,
    ResourceViewHandle, SamplerStateHandle, ShaderHandle, UnorderedAccessViewHandle,
};
use crate::gal::pass::Pass;

// The state-caching half of both encoders. These run on the pass so the
// render and compute guards share one implementation.
impl Pass<'_> {
    pub(crate) fn bind_shader(&mut self, shader: ShaderHandle) {
        if self.state.shader == shader {
            self.device.stats.redundant_state_changes += 1;
            return;
        }
        let Some(native) = self.device.native_shader(shader) else {
            error!("set_shader: handle does not resolve, keeping the previous shader.");
            return;
        };
        self.state.shader = shader;
        self.device.stats.state_changes += 1;
        self.recorder_mut().set_shader(native);
    }

    pub(crate) fn bind_constant_buffer(&mut self, slot: u32, buffer: BufferHandle) {
        debug_assert!(
            (slot as usize) < MAX_CONSTANT_BUFFER_SLOTS,
            "constant buffer slot {slot} out of range"
        );
        if !CommandEncoderState::bind_slot(
            &mut self.state.constant_buffers,
            slot as usize,
            buffer,
        ) {
            self.device.stats.redundant_state_changes += 1;
            return;
        }
        let native = self.resolve_optional_buffer(buffer, "set_constant_buffer");
        self.device.stats.state_changes += 1;
        self.recorder_mut().set_constant_buffer(slot, native);
    }

    pub(crate) fn bind_resource_view(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        view: ResourceViewHandle,
    ) {
        debug_assert!(
            (slot as usize) < MAX_RESOURCE_VIEW_SLOTS,
            "resource view slot {slot} out of range"
        );
        if !CommandEncoderState::bind_slot(
            &mut self.state.resource_views[stage.index()],
            slot as usize,
            view,
        ) {
            self.device.stats.redundant_state_changes += 1;
            return;
        }
        let native = if view.is_invalidated() {
            None
        } else {
            let resolved = self.device.native_resource_view(view);
            if resolved.is_none() {
                error!("set_resource_view: stale view handle, unbinding slot {slot}.");
            }
            resolved
        };
        self.device.stats.state_changes += 1;
        self.recorder_mut().set_resource_view(stage, slot, native);
    }

    pub(crate) fn bind_sampler_state(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        sampler: SamplerStateHandle,
    ) {
        debug_assert!(
            (slot as usize) < MAX_SAMPLER_SLOTS,
            "sampler slot {slot} out of range"
        );
        if !CommandEncoderState::bind_slot(
            &mut self.state.sampler_states[stage.index()],
            slot as usize,
            sampler,
        ) {
            self.device.stats.redundant_state_changes += 1;
            return;
        }
        let native = if sampler.is_invalidated() {
            None
        } else {
            let resolved = self.device.native_sampler_state(sampler);
            if resolved.is_none() {
                error!("set_sampler_state: stale sampler handle, unbinding slot {slot}.");
            }
            resolved
        };
        self.device.stats.state_changes += 1;
        self.recorder_mut().set_sampler_state(stage, slot, native);
    }

    pub(crate) fn bind_unordered_access_view(
        &mut self,
        slot: u32,
        view: UnorderedAccessViewHandle,
    ) {
        debug_assert!(
            (slot as usize) < MAX_UAV_SLOTS,
            "unordered access view slot {slot} out of range"
        );
        if !CommandEncoderState::bind_slot(
            &mut self.state.unordered_access_views,
            slot as usize,
            view,
        ) {
            self.device.stats.redundant_state_changes += 1;
            return;
        }
        let native = if view.is_invalidated() {
            None
        } else {
            let resolved = self.device.native_unordered_access_view(view);
            if resolved.is_none() {
                error!("set_unordered_access_view: stale view handle, unbinding slot {slot}.");
            }
            resolved
        };
        self.device.stats.state_changes += 1;
        self.recorder_mut().set_unordered_access_view(slot, native);
    }

    pub(crate) fn bind_blend_state(&mut self, state: BlendStateHandle, blend_factor: [f32; 4]) {
        if self.state.blend_state == state && self.state.blend_factor == blend_factor {
            self.device.stats.redundant_state_changes += 1;
            return;
        }
        let native = if state.is_invalidated() {
            None
        } else {
            self.device.native_blend_state(state)
        };
        self.state.blend_state = state;
        self.state.blend_factor = blend_factor;
        self.device.stats.state_changes += 1;
        self.recorder_mut().set_blend_state(native, blend_factor);
    }

    pub(crate) fn bind_depth_stencil_state(
        &mut self,
        state: DepthStencilStateHandle,
        stencil_ref: u8,
    ) {
        if self.state.depth_stencil_state == state && self.state.stencil_ref == stencil_ref {
            self.device.stats.redundant_state_changes += 1;
            return;
        }
        let native = if state.is_invalidated() {
            None
        } else {
            self.device.native_depth_stencil_state(state)
        };
        self.state.depth_stencil_state = state;
        self.state.stencil_ref = stencil_ref;
        self.device.stats.state_changes += 1;
        self.recorder_mut().set_depth_stencil_state(native, stencil_ref);
    }

    pub(crate) fn bind_rasterizer_state(&mut self, state: RasterizerStateHandle) {
        if self.state.rasterizer_state == state {
            self.device.stats.redundant_state_changes += 1;
            return;
        }
        let native = if state.is_invalidated() {
            None
        } else {
            self.device.native_rasterizer_state(state)
        };
        self.state.rasterizer_state = state;
        self.device.stats.state_changes += 1;
        self.recorder_mut().set_rasterizer_state(native);
    }

    fn resolve_optional_buffer(&self, buffer: BufferHandle, op: &str) -> Option<NativeId> {
        if buffer.is_invalidated() {
            return None;
        }
        let resolved = self.device.native_buffer(buffer);
        if resolved.is_none() {
            error!("{op}: stale buffer handle, unbinding.");
        }
        resolved
    }

    /// Resolves a buffer that must exist; used for indirect-argument
    /// buffers where a stale handle is a programmer error.
    pub(crate) fn resolve_required_buffer(&self, buffer: BufferHandle, op: &str) -> NativeId {
        match self.device.native_buffer(buffer) {
            Some(native) => native,
            None => panic!("{op}: argument buffer handle does not resolve to a buffer"),
        }
    }
}
