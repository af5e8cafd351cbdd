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

//! The compute command encoder scope guard.

use log::error;

use crate::gal::descriptors::{BufferUsage, ShaderStage};
use crate::gal::device::{
    BufferHandle, ResourceViewHandle, SamplerStateHandle, ShaderHandle, UnorderedAccessViewHandle,
};
use crate::gal::pass::{Pass, ScopeState};

/// Records dispatches and compute state into an open compute scope.
///
/// Obtained from [`Pass::begin_compute`]; dropping it ends the scope and
/// pops the scope's debug marker.
#[derive(Debug)]
pub struct ComputeCommandEncoder<'p, 'd> {
    pass: &'p mut Pass<'d>,
    pop_marker: bool,
}

impl<'p, 'd> ComputeCommandEncoder<'p, 'd> {
    pub(crate) fn new(pass: &'p mut Pass<'d>, pop_marker: bool) -> Self {
        Self { pass, pop_marker }
    }

    /// Binds a compute shader.
    pub fn set_shader(&mut self, shader: ShaderHandle) {
        self.pass.bind_shader(shader);
    }

    /// Binds a constant buffer slot; an invalid handle unbinds it.
    pub fn set_constant_buffer(&mut self, slot: u32, buffer: BufferHandle) {
        self.pass.bind_constant_buffer(slot, buffer);
    }

    /// Binds a compute-stage shader resource view slot.
    pub fn set_resource_view(&mut self, slot: u32, view: ResourceViewHandle) {
        self.pass.bind_resource_view(ShaderStage::Compute, slot, view);
    }

    /// Binds a compute-stage sampler slot.
    pub fn set_sampler_state(&mut self, slot: u32, sampler: SamplerStateHandle) {
        self.pass.bind_sampler_state(ShaderStage::Compute, slot, sampler);
    }

    /// Binds an unordered access view slot; an invalid handle unbinds it.
    pub fn set_unordered_access_view(&mut self, slot: u32, view: UnorderedAccessViewHandle) {
        self.pass.bind_unordered_access_view(slot, view);
    }

    /// Dispatches compute workgroups.
    ///
    /// All three counts must be greater than zero: a zero-sized dispatch
    /// is meaningless, and call sites that can produce zero must skip the
    /// dispatch themselves.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        assert!(
            x > 0 && y > 0 && z > 0,
            "dispatch counts must all be greater than zero (got {x}x{y}x{z}); \
             skip the dispatch at the call site instead"
        );
        self.pass.device.stats.dispatch_calls += 1;
        self.pass.recorder_mut().dispatch(x, y, z);
    }

    /// Dispatches with arguments sourced from `args`.
    ///
    /// Panics if `args` does not resolve; a stale indirect-argument
    /// buffer is a programmer error.
    pub fn dispatch_indirect(&mut self, args: BufferHandle, offset: u64) {
        let native = self.pass.resolve_required_buffer(args, "dispatch_indirect");
        debug_assert!(
            self.pass
                .device
                .buffer(args)
                .is_some_and(|b| b.desc.usage.contains(BufferUsage::INDIRECT)),
            "dispatch_indirect: buffer lacks INDIRECT usage"
        );
        self.pass.device.stats.dispatch_calls += 1;
        self.pass.recorder_mut().dispatch_indirect(native, offset);
    }

    /// Clears an unordered access view with float values.
    pub fn clear_unordered_access_view_f32(
        &mut self,
        view: UnorderedAccessViewHandle,
        values: [f32; 4],
    ) {
        let Some(native) = self.pass.device.native_unordered_access_view(view) else {
            error!("clear_unordered_access_view_f32: stale view handle, skipping.");
            return;
        };
        self.pass
            .recorder_mut()
            .clear_unordered_access_view_f32(native, values);
    }

    /// Clears an unordered access view with integer values.
    pub fn clear_unordered_access_view_u32(
        &mut self,
        view: UnorderedAccessViewHandle,
        values: [u32; 4],
    ) {
        let Some(native) = self.pass.device.native_unordered_access_view(view) else {
            error!("clear_unordered_access_view_u32: stale view handle, skipping.");
            return;
        };
        self.pass
            .recorder_mut()
            .clear_unordered_access_view_u32(native, values);
    }

    /// Writes CPU data into a buffer region.
    pub fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        let Some(native) = self.pass.device.native_buffer(buffer) else {
            error!("update_buffer: stale buffer handle, dropping the update.");
            return;
        };
        self.pass.recorder_mut().update_buffer(native, offset, data);
    }

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

impl Drop for ComputeCommandEncoder<'_, '_> {
    fn drop(&mut self) {
        if self.pop_marker {
            self.pass.recorder_mut().pop_marker();
        }
        self.pass.recorder_mut().end_compute();
        self.pass.scope = ScopeState::Invalid;
    }
}
