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

//! The traits a concrete graphics backend implements.
//!
//! The common [`GalDevice`](super::device::GalDevice) owns all handle
//! tables, validation and lifetime bookkeeping; a backend only translates
//! already-validated descriptors into native objects (two-phase creation:
//! the common layer never publishes a handle whose backend init failed) and
//! records already-resolved commands.

use crate::math::{Extent3D, LinearRgba, Origin3D, Viewport};
use std::any::Any;
use std::fmt;

use super::capabilities::{AdapterInfo, DeviceCapabilities, GraphicsBackendType};
use super::descriptors::{
    BlendStateDesc, BufferDesc, DepthStencilStateDesc, IndexFormat, PrimitiveTopology, QueryDesc,
    RasterizerStateDesc, RenderTargetViewDesc, ResourceViewDesc, SamplerStateDesc, ShaderDesc,
    ShaderStage, SwapChainDesc, TextureDesc, TextureInitData, UnorderedAccessViewDesc,
};
use super::error::BackendError;

/// An opaque token identifying a native object inside a backend.
///
/// The common layer never interprets the value; backends typically use it
/// as a key into their own maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeId(pub u64);

/// What a shader resource view or unordered access view is created over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTarget {
    /// A view over a texture.
    Texture(NativeId),
    /// A view over a buffer.
    Buffer(NativeId),
}

/// The result of creating a swap chain: the chain itself plus a description
/// of its backbuffer texture, which the common layer wraps in a regular
/// texture handle.
#[derive(Debug)]
pub struct SwapChainInit {
    /// The native swap chain.
    pub swap_chain: NativeId,
    /// The backbuffer creation description.
    pub backbuffer_desc: TextureDesc,
    /// The native backbuffer texture currently presented into.
    pub backbuffer: NativeId,
}

/// A color target of a render scope, resolved to native objects.
#[derive(Debug, Clone, Copy)]
pub struct RecordedColorTarget {
    /// The render target view to bind.
    pub view: NativeId,
    /// Clear color, or `None` to load the existing contents.
    pub clear: Option<LinearRgba>,
}

/// The depth/stencil target of a render scope, resolved to native objects.
#[derive(Debug, Clone, Copy)]
pub struct RecordedDepthTarget {
    /// The depth/stencil view to bind.
    pub view: NativeId,
    /// Depth clear value, or `None` to load.
    pub clear_depth: Option<f32>,
    /// Stencil clear value, or `None` to load.
    pub clear_stencil: Option<u8>,
}

/// A fully resolved render scope description handed to the recorder.
#[derive(Debug, Clone, Default)]
pub struct RecordedRenderingSetup {
    /// Bound color targets in slot order.
    pub color_targets: Vec<RecordedColorTarget>,
    /// The bound depth/stencil target, if any.
    pub depth_target: Option<RecordedDepthTarget>,
    /// The common extent of all targets.
    pub extent: Extent3D,
}

/// A scissor rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScissorRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

/// The command sink a backend provides for one device pass scope.
///
/// Every handle has already been resolved to a [`NativeId`] and every
/// redundant state change eliminated by the common encoder, so
/// implementations translate calls one-to-one into their native command
/// list.
pub trait CommandRecorder: fmt::Debug {
    // Scope management

    /// Opens a render scope targeting the given attachments.
    fn begin_rendering(&mut self, setup: &RecordedRenderingSetup);
    /// Closes the current render scope.
    fn end_rendering(&mut self);
    /// Opens a compute scope.
    fn begin_compute(&mut self);
    /// Closes the current compute scope.
    fn end_compute(&mut self);

    // Debug markers

    /// Pushes a nested debug marker.
    fn push_marker(&mut self, label: &str);
    /// Pops the innermost debug marker.
    fn pop_marker(&mut self);
    /// Inserts a single event marker.
    fn insert_event_marker(&mut self, label: &str);

    // State

    /// Binds a shader (graphics or compute).
    fn set_shader(&mut self, shader: NativeId);
    /// Binds or clears a constant buffer slot.
    fn set_constant_buffer(&mut self, slot: u32, buffer: Option<NativeId>);
    /// Binds or clears a per-stage shader resource view slot.
    fn set_resource_view(&mut self, stage: ShaderStage, slot: u32, view: Option<NativeId>);
    /// Binds or clears a per-stage sampler slot.
    fn set_sampler_state(&mut self, stage: ShaderStage, slot: u32, sampler: Option<NativeId>);
    /// Binds or clears an unordered access view slot.
    fn set_unordered_access_view(&mut self, slot: u32, view: Option<NativeId>);
    /// Binds a blend state with the given constant blend factor.
    fn set_blend_state(&mut self, state: Option<NativeId>, blend_factor: [f32; 4]);
    /// Binds a depth/stencil state with the given stencil reference.
    fn set_depth_stencil_state(&mut self, state: Option<NativeId>, stencil_ref: u8);
    /// Binds a rasterizer state.
    fn set_rasterizer_state(&mut self, state: Option<NativeId>);
    /// Sets the primitive topology.
    fn set_primitive_topology(&mut self, topology: PrimitiveTopology);
    /// Sets the viewport.
    fn set_viewport(&mut self, viewport: Viewport);
    /// Sets the scissor rectangle.
    fn set_scissor_rect(&mut self, rect: ScissorRect);
    /// Binds a vertex buffer slot.
    fn set_vertex_buffer(&mut self, slot: u32, buffer: NativeId, offset: u64);
    /// Binds the index buffer.
    fn set_index_buffer(&mut self, buffer: NativeId, format: IndexFormat, offset: u64);

    // Draw / dispatch

    /// Draws non-indexed geometry.
    fn draw(&mut self, vertex_count: u32, first_vertex: u32);
    /// Draws indexed geometry.
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, base_vertex: i32);
    /// Draws instanced non-indexed geometry.
    fn draw_instanced(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32);
    /// Draws instanced indexed geometry.
    fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
    );
    /// Draws with arguments sourced from a buffer.
    fn draw_indirect(&mut self, args: NativeId, offset: u64);
    /// Dispatches compute workgroups.
    fn dispatch(&mut self, x: u32, y: u32, z: u32);
    /// Dispatches with arguments sourced from a buffer.
    fn dispatch_indirect(&mut self, args: NativeId, offset: u64);

    // Resource operations

    /// Writes CPU data into a buffer region.
    fn update_buffer(&mut self, buffer: NativeId, offset: u64, data: &[u8]);
    /// Copies a whole buffer.
    fn copy_buffer(&mut self, dst: NativeId, src: NativeId);
    /// Copies a buffer region.
    fn copy_buffer_region(
        &mut self,
        dst: NativeId,
        dst_offset: u64,
        src: NativeId,
        src_offset: u64,
        byte_count: u64,
    );
    /// Copies a whole texture.
    fn copy_texture(&mut self, dst: NativeId, src: NativeId);
    /// Writes CPU texel data into a texture region.
    fn update_texture(
        &mut self,
        dst: NativeId,
        mip_level: u32,
        origin: Origin3D,
        extent: Extent3D,
        data: &[u8],
        bytes_per_row: u32,
    );
    /// Resolves a multisampled texture into a single-sampled one.
    fn resolve_texture(&mut self, dst: NativeId, src: NativeId);
    /// Generates the mip chain of the texture behind a resource view.
    fn generate_mip_maps(&mut self, view: NativeId);
    /// Clears an unordered access view with float values.
    fn clear_unordered_access_view_f32(&mut self, view: NativeId, values: [f32; 4]);
    /// Clears an unordered access view with integer values.
    fn clear_unordered_access_view_u32(&mut self, view: NativeId, values: [u32; 4]);

    // Queries

    /// Begins a query.
    fn begin_query(&mut self, query: NativeId);
    /// Ends a query.
    fn end_query(&mut self, query: NativeId);

    /// Flushes pending recorded work to the device queue.
    fn flush(&mut self);

    /// Downcast support for backends retrieving their own recorder type at
    /// submit time.
    fn as_any(&mut self) -> &mut dyn Any;
}

/// A concrete graphics backend: native resource lifecycle plus command
/// submission.
pub trait GalBackend: fmt::Debug {
    /// The API this backend drives.
    fn backend_type(&self) -> GraphicsBackendType;
    /// Capabilities of the adapter the backend was initialized on.
    fn capabilities(&self) -> DeviceCapabilities;
    /// Information about the adapter.
    fn adapter_info(&self) -> AdapterInfo;

    // Two-phase resource lifecycle. `init_*` either fully creates a native
    // object or fails; `deinit_*` must accept any id a matching `init_*`
    // returned.

    /// Creates a native texture, optionally uploading initial data.
    fn init_texture(
        &mut self,
        desc: &TextureDesc,
        initial_data: &[TextureInitData<'_>],
    ) -> Result<NativeId, BackendError>;
    /// Destroys a native texture.
    fn deinit_texture(&mut self, texture: NativeId);

    /// Creates a native buffer, optionally uploading initial data.
    fn init_buffer(
        &mut self,
        desc: &BufferDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<NativeId, BackendError>;
    /// Destroys a native buffer.
    fn deinit_buffer(&mut self, buffer: NativeId);

    /// Creates a native shader from stage bytecode.
    fn init_shader(&mut self, desc: &ShaderDesc) -> Result<NativeId, BackendError>;
    /// Destroys a native shader.
    fn deinit_shader(&mut self, shader: NativeId);

    /// Creates a native blend state.
    fn init_blend_state(&mut self, desc: &BlendStateDesc) -> Result<NativeId, BackendError>;
    /// Destroys a native blend state.
    fn deinit_blend_state(&mut self, state: NativeId);

    /// Creates a native depth/stencil state.
    fn init_depth_stencil_state(
        &mut self,
        desc: &DepthStencilStateDesc,
    ) -> Result<NativeId, BackendError>;
    /// Destroys a native depth/stencil state.
    fn deinit_depth_stencil_state(&mut self, state: NativeId);

    /// Creates a native rasterizer state.
    fn init_rasterizer_state(
        &mut self,
        desc: &RasterizerStateDesc,
    ) -> Result<NativeId, BackendError>;
    /// Destroys a native rasterizer state.
    fn deinit_rasterizer_state(&mut self, state: NativeId);

    /// Creates a native sampler state.
    fn init_sampler_state(&mut self, desc: &SamplerStateDesc) -> Result<NativeId, BackendError>;
    /// Destroys a native sampler state.
    fn deinit_sampler_state(&mut self, state: NativeId);

    /// Creates a shader resource view over a texture or buffer.
    fn init_resource_view(
        &mut self,
        target: ViewTarget,
        desc: &ResourceViewDesc,
    ) -> Result<NativeId, BackendError>;
    /// Destroys a shader resource view.
    fn deinit_resource_view(&mut self, view: NativeId);

    /// Creates a render target view over a texture.
    fn init_render_target_view(
        &mut self,
        texture: NativeId,
        desc: &RenderTargetViewDesc,
    ) -> Result<NativeId, BackendError>;
    /// Destroys a render target view.
    fn deinit_render_target_view(&mut self, view: NativeId);

    /// Creates an unordered access view over a texture or buffer.
    fn init_unordered_access_view(
        &mut self,
        target: ViewTarget,
        desc: &UnorderedAccessViewDesc,
    ) -> Result<NativeId, BackendError>;
    /// Destroys an unordered access view.
    fn deinit_unordered_access_view(&mut self, view: NativeId);

    /// Creates a native query.
    fn init_query(&mut self, desc: &QueryDesc) -> Result<NativeId, BackendError>;
    /// Destroys a native query.
    fn deinit_query(&mut self, query: NativeId);

    /// Creates a swap chain and its backbuffer.
    fn init_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<SwapChainInit, BackendError>;
    /// Destroys a swap chain.
    fn deinit_swap_chain(&mut self, swap_chain: NativeId);

    // Swap-chain frame interface

    /// Acquires the next backbuffer; returns its native texture.
    fn acquire_next_render_target(
        &mut self,
        swap_chain: NativeId,
    ) -> Result<NativeId, BackendError>;
    /// Presents the currently acquired backbuffer.
    fn present_render_target(&mut self, swap_chain: NativeId);

    // Data paths outside a recorder

    /// Writes CPU data into a buffer through the device queue.
    fn write_buffer(
        &mut self,
        buffer: NativeId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), BackendError>;
    /// Reads a query result if it is available.
    fn query_result(&mut self, query: NativeId) -> Result<Option<u64>, BackendError>;

    // Command recording and frame rotation

    /// Creates a recorder for one device pass scope.
    fn create_recorder(&mut self) -> Box<dyn CommandRecorder>;
    /// Submits a finished recorder's work to the device queue.
    fn submit(&mut self, recorder: Box<dyn CommandRecorder>);

    /// Marks the beginning of frame `frame_index`.
    fn begin_frame(&mut self, frame_index: u64);
    /// Marks the end of the current frame; returns the highest frame index
    /// the GPU has provably finished with.
    fn end_frame(&mut self) -> u64;
    /// Blocks until the GPU is idle. All submitted frames count as retired
    /// afterwards.
    fn wait_idle(&mut self);
}
