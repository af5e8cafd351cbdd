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

//! A CPU-only backend that allocates opaque ids instead of GPU objects.
//!
//! Used by the test suites, by CI environments without an adapter, and as
//! a last-resort device so the engine can run its frame loop headless.
//! Buffer contents are actually stored, so code paths that write and read
//! buffers behave observably; draws and dispatches are counted, not
//! executed.

use log::trace;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::math::{Extent3D, Origin3D, Viewport};

use super::backend::{
    CommandRecorder, GalBackend, NativeId, RecordedRenderingSetup, ScissorRect, SwapChainInit,
    ViewTarget,
};
use super::capabilities::{
    AdapterDeviceType, AdapterInfo, DeviceCapabilities, GraphicsBackendType,
};
use super::descriptors::{
    BlendStateDesc, BufferDesc, DepthStencilStateDesc, IndexFormat, PrimitiveTopology, QueryDesc,
    RasterizerStateDesc, RenderTargetViewDesc, ResourceViewDesc, SamplerStateDesc, ShaderDesc,
    ShaderStage, SwapChainDesc, TextureDesc, TextureInitData, UnorderedAccessViewDesc,
};
use super::error::BackendError;

/// Counters a [`HeadlessProbe`] exposes to tests.
#[derive(Debug, Clone, Default)]
pub struct HeadlessCounters {
    /// Live native textures.
    pub live_textures: usize,
    /// Live native buffers.
    pub live_buffers: usize,
    /// Live native shaders.
    pub live_shaders: usize,
    /// Live native state objects (all four kinds).
    pub live_states: usize,
    /// Live native views (all three kinds).
    pub live_views: usize,
    /// Live native queries.
    pub live_queries: usize,
    /// Live native swap chains.
    pub live_swap_chains: usize,
    /// Draws recorded across all submitted recorders.
    pub draws: u64,
    /// Dispatches recorded across all submitted recorders.
    pub dispatches: u64,
    /// Render scopes opened.
    pub render_scopes: u64,
    /// Compute scopes opened.
    pub compute_scopes: u64,
    /// Recorders submitted.
    pub submitted_recorders: u64,
}

/// A cloneable window into a [`HeadlessBackend`]'s counters, usable after
/// the backend has been boxed into a device.
#[derive(Debug, Clone)]
pub struct HeadlessProbe {
    counters: Arc<Mutex<HeadlessCounters>>,
}

impl HeadlessProbe {
    /// A snapshot of the current counters.
    pub fn snapshot(&self) -> HeadlessCounters {
        self.counters.lock().expect("probe mutex poisoned").clone()
    }
}

#[derive(Debug, Default)]
struct SharedState {
    counters: Arc<Mutex<HeadlessCounters>>,
    buffers: Arc<Mutex<HashMap<u64, Vec<u8>>>>,
}

/// The headless [`GalBackend`].
#[derive(Debug)]
pub struct HeadlessBackend {
    next_id: u64,
    caps: DeviceCapabilities,
    shared: SharedState,
    frame_index: u64,
}

impl HeadlessBackend {
    /// Creates a headless backend with default capabilities.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            caps: DeviceCapabilities {
                multithreaded_resource_creation: true,
                timestamp_queries: true,
                ..DeviceCapabilities::default()
            },
            shared: SharedState::default(),
            frame_index: 0,
        }
    }

    /// Creates a headless backend with explicit capabilities, letting
    /// tests exercise capability-gated paths.
    pub fn with_capabilities(caps: DeviceCapabilities) -> Self {
        Self {
            caps,
            ..Self::new()
        }
    }

    /// A probe observing this backend's counters.
    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe {
            counters: self.shared.counters.clone(),
        }
    }

    fn allocate(&mut self) -> NativeId {
        let id = self.next_id;
        self.next_id += 1;
        NativeId(id)
    }

    fn counters(&self) -> std::sync::MutexGuard<'_, HeadlessCounters> {
        self.shared.counters.lock().expect("probe mutex poisoned")
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GalBackend for HeadlessBackend {
    fn backend_type(&self) -> GraphicsBackendType {
        GraphicsBackendType::Headless
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.caps.clone()
    }

    fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            name: "Headless".to_string(),
            backend: GraphicsBackendType::Headless,
            device_type: AdapterDeviceType::Cpu,
            vendor_id: 0,
            driver_info: String::new(),
        }
    }

    fn init_texture(
        &mut self,
        desc: &TextureDesc,
        _initial_data: &[TextureInitData<'_>],
    ) -> Result<NativeId, BackendError> {
        trace!("headless: texture {:?}", desc.size);
        let id = self.allocate();
        self.counters().live_textures += 1;
        Ok(id)
    }

    fn deinit_texture(&mut self, _texture: NativeId) {
        self.counters().live_textures -= 1;
    }

    fn init_buffer(
        &mut self,
        desc: &BufferDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<NativeId, BackendError> {
        let id = self.allocate();
        let mut contents = vec![0u8; desc.size as usize];
        if let Some(data) = initial_data {
            contents[..data.len()].copy_from_slice(data);
        }
        self.shared
            .buffers
            .lock()
            .expect("buffer store mutex poisoned")
            .insert(id.0, contents);
        self.counters().live_buffers += 1;
        Ok(id)
    }

    fn deinit_buffer(&mut self, buffer: NativeId) {
        self.shared
            .buffers
            .lock()
            .expect("buffer store mutex poisoned")
            .remove(&buffer.0);
        self.counters().live_buffers -= 1;
    }

    fn init_shader(&mut self, _desc: &ShaderDesc) -> Result<NativeId, BackendError> {
        let id = self.allocate();
        self.counters().live_shaders += 1;
        Ok(id)
    }

    fn deinit_shader(&mut self, _shader: NativeId) {
        self.counters().live_shaders -= 1;
    }

    fn init_blend_state(&mut self, _desc: &BlendStateDesc) -> Result<NativeId, BackendError> {
        let id = self.allocate();
        self.counters().live_states += 1;
        Ok(id)
    }

    fn deinit_blend_state(&mut self, _state: NativeId) {
        self.counters().live_states -= 1;
    }

    fn init_depth_stencil_state(
        &mut self,
        _desc: &DepthStencilStateDesc,
    ) -> Result<NativeId, BackendError> {
        let id = self.allocate();
        self.counters().live_states += 1;
        Ok(id)
    }

    fn deinit_depth_stencil_state(&mut self, _state: NativeId) {
        self.counters().live_states -= 1;
    }

    fn init_rasterizer_state(
        &mut self,
        _desc: &RasterizerStateDesc,
    ) -> Result<NativeId, BackendError> {
        let id = self.allocate();
        self.counters().live_states += 1;
        Ok(id)
    }

    fn deinit_rasterizer_state(&mut self, _state: NativeId) {
        self.counters().live_states -= 1;
    }

    fn init_sampler_state(&mut self, _desc: &SamplerStateDesc) -> Result<NativeId, BackendError> {
        let id = self.allocate();
        self.counters().live_states += 1;
        Ok(id)
    }

    fn deinit_sampler_state(&mut self, _state: NativeId) {
        self.counters().live_states -= 1;
    }

    fn init_resource_view(
        &mut self,
        _target: ViewTarget,
        _desc: &ResourceViewDesc,
    ) -> Result<NativeId, BackendError> {
        let id = self.allocate();
        self.counters().live_views += 1;
        Ok(id)
    }

    fn deinit_resource_view(&mut self, _view: NativeId) {
        self.counters().live_views -= 1;
    }

    fn init_render_target_view(
        &mut self,
        _texture: NativeId,
        _desc: &RenderTargetViewDesc,
    ) -> Result<NativeId, BackendError> {
        let id = self.allocate();
        self.counters().live_views += 1;
        Ok(id)
    }

    fn deinit_render_target_view(&mut self, _view: NativeId) {
        self.counters().live_views -= 1;
    }

    fn init_unordered_access_view(
        &mut self,
        _target: ViewTarget,
        _desc: &UnorderedAccessViewDesc,
    ) -> Result<NativeId, BackendError> {
        let id = self.allocate();
        self.counters().live_views += 1;
        Ok(id)
    }

    fn deinit_unordered_access_view(&mut self, _view: NativeId) {
        self.counters().live_views -= 1;
    }

    fn init_query(&mut self, _desc: &QueryDesc) -> Result<NativeId, BackendError> {
        let id = self.allocate();
        self.counters().live_queries += 1;
        Ok(id)
    }

    fn deinit_query(&mut self, _query: NativeId) {
        self.counters().live_queries -= 1;
    }

    fn init_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<SwapChainInit, BackendError> {
        let swap_chain = self.allocate();
        let backbuffer = self.allocate();
        self.counters().live_swap_chains += 1;
        self.counters().live_textures += 1;
        Ok(SwapChainInit {
            swap_chain,
            backbuffer_desc: TextureDesc::render_target(desc.width, desc.height, desc.format),
            backbuffer,
        })
    }

    fn deinit_swap_chain(&mut self, _swap_chain: NativeId) {
        self.counters().live_swap_chains -= 1;
        self.counters().live_textures -= 1;
    }

    fn acquire_next_render_target(
        &mut self,
        swap_chain: NativeId,
    ) -> Result<NativeId, BackendError> {
        // One persistent backbuffer per chain: its id is the slot after the
        // chain's own.
        Ok(NativeId(swap_chain.0 + 1))
    }

    fn present_render_target(&mut self, _swap_chain: NativeId) {}

    fn write_buffer(
        &mut self,
        buffer: NativeId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let mut buffers = self
            .shared
            .buffers
            .lock()
            .expect("buffer store mutex poisoned");
        let contents = buffers.get_mut(&buffer.0).ok_or_else(|| {
            BackendError::NativeCallFailed {
                operation: "write_buffer".into(),
                details: "unknown native buffer".into(),
            }
        })?;
        let end = offset as usize + data.len();
        if end > contents.len() {
            return Err(BackendError::NativeCallFailed {
                operation: "write_buffer".into(),
                details: "write out of bounds".into(),
            });
        }
        contents[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn query_result(&mut self, _query: NativeId) -> Result<Option<u64>, BackendError> {
        Ok(Some(0))
    }

    fn create_recorder(&mut self) -> Box<dyn CommandRecorder> {
        Box::new(HeadlessRecorder {
            counters: self.shared.counters.clone(),
            buffers: self.shared.buffers.clone(),
            marker_depth: 0,
            scope_open: false,
        })
    }

    fn submit(&mut self, mut recorder: Box<dyn CommandRecorder>) {
        if let Some(headless) = recorder.as_any().downcast_mut::<HeadlessRecorder>() {
            debug_assert_eq!(headless.marker_depth, 0, "unbalanced debug markers at submit");
            debug_assert!(!headless.scope_open, "encoder scope still open at submit");
        }
        self.counters().submitted_recorders += 1;
    }

    fn begin_frame(&mut self, frame_index: u64) {
        self.frame_index = frame_index;
    }

    fn end_frame(&mut self) -> u64 {
        // No GPU: every submitted frame retires immediately.
        self.frame_index
    }

    fn wait_idle(&mut self) {}
}

/// The headless command recorder: counts operations and applies buffer
/// writes to the shared store.
#[derive(Debug)]
struct HeadlessRecorder {
    counters: Arc<Mutex<HeadlessCounters>>,
    buffers: Arc<Mutex<HashMap<u64, Vec<u8>>>>,
    marker_depth: i32,
    scope_open: bool,
}

impl HeadlessRecorder {
    fn counters(&self) -> std::sync::MutexGuard<'_, HeadlessCounters> {
        self.counters.lock().expect("probe mutex poisoned")
    }
}

impl CommandRecorder for HeadlessRecorder {
    fn begin_rendering(&mut self, setup: &RecordedRenderingSetup) {
        debug_assert!(!self.scope_open, "scope already open");
        debug_assert!(
            !setup.color_targets.is_empty() || setup.depth_target.is_some(),
            "render scope without any attachment"
        );
        self.scope_open = true;
        self.counters().render_scopes += 1;
    }

    fn end_rendering(&mut self) {
        debug_assert!(self.scope_open);
        self.scope_open = false;
    }

    fn begin_compute(&mut self) {
        debug_assert!(!self.scope_open, "scope already open");
        self.scope_open = true;
        self.counters().compute_scopes += 1;
    }

    fn end_compute(&mut self) {
        debug_assert!(self.scope_open);
        self.scope_open = false;
    }

    fn push_marker(&mut self, _label: &str) {
        self.marker_depth += 1;
    }

    fn pop_marker(&mut self) {
        self.marker_depth -= 1;
        debug_assert!(self.marker_depth >= 0, "pop_marker without matching push");
    }

    fn insert_event_marker(&mut self, _label: &str) {}

    fn set_shader(&mut self, _shader: NativeId) {}
    fn set_constant_buffer(&mut self, _slot: u32, _buffer: Option<NativeId>) {}
    fn set_resource_view(&mut self, _stage: ShaderStage, _slot: u32, _view: Option<NativeId>) {}
    fn set_sampler_state(&mut self, _stage: ShaderStage, _slot: u32, _sampler: Option<NativeId>) {}
    fn set_unordered_access_view(&mut self, _slot: u32, _view: Option<NativeId>) {}
    fn set_blend_state(&mut self, _state: Option<NativeId>, _blend_factor: [f32; 4]) {}
    fn set_depth_stencil_state(&mut self, _state: Option<NativeId>, _stencil_ref: u8) {}
    fn set_rasterizer_state(&mut self, _state: Option<NativeId>) {}
    fn set_primitive_topology(&mut self, _topology: PrimitiveTopology) {}
    fn set_viewport(&mut self, _viewport: Viewport) {}
    fn set_scissor_rect(&mut self, _rect: ScissorRect) {}
    fn set_vertex_buffer(&mut self, _slot: u32, _buffer: NativeId, _offset: u64) {}
    fn set_index_buffer(&mut self, _buffer: NativeId, _format: IndexFormat, _offset: u64) {}

    fn draw(&mut self, _vertex_count: u32, _first_vertex: u32) {
        debug_assert!(self.scope_open, "draw outside a render scope");
        self.counters().draws += 1;
    }

    fn draw_indexed(&mut self, _index_count: u32, _first_index: u32, _base_vertex: i32) {
        debug_assert!(self.scope_open, "draw outside a render scope");
        self.counters().draws += 1;
    }

    fn draw_instanced(&mut self, _vertex_count: u32, _instance_count: u32, _first_vertex: u32) {
        debug_assert!(self.scope_open, "draw outside a render scope");
        self.counters().draws += 1;
    }

    fn draw_indexed_instanced(
        &mut self,
        _index_count: u32,
        _instance_count: u32,
        _first_index: u32,
        _base_vertex: i32,
    ) {
        debug_assert!(self.scope_open, "draw outside a render scope");
        self.counters().draws += 1;
    }

    fn draw_indirect(&mut self, _args: NativeId, _offset: u64) {
        debug_assert!(self.scope_open, "draw outside a render scope");
        self.counters().draws += 1;
    }

    fn dispatch(&mut self, _x: u32, _y: u32, _z: u32) {
        debug_assert!(self.scope_open, "dispatch outside a compute scope");
        self.counters().dispatches += 1;
    }

    fn dispatch_indirect(&mut self, _args: NativeId, _offset: u64) {
        debug_assert!(self.scope_open, "dispatch outside a compute scope");
        self.counters().dispatches += 1;
    }

    fn update_buffer(&mut self, buffer: NativeId, offset: u64, data: &[u8]) {
        let mut buffers = self.buffers.lock().expect("buffer store mutex poisoned");
        if let Some(contents) = buffers.get_mut(&buffer.0) {
            let offset = offset as usize;
            if offset >= contents.len() {
                return;
            }
            let end = (offset + data.len()).min(contents.len());
            contents[offset..end].copy_from_slice(&data[..end - offset]);
        }
    }

    fn copy_buffer(&mut self, dst: NativeId, src: NativeId) {
        let mut buffers = self.buffers.lock().expect("buffer store mutex poisoned");
        if let Some(source) = buffers.get(&src.0).cloned() {
            if let Some(dest) = buffers.get_mut(&dst.0) {
                let len = source.len().min(dest.len());
                dest[..len].copy_from_slice(&source[..len]);
            }
        }
    }

    fn copy_buffer_region(
        &mut self,
        dst: NativeId,
        dst_offset: u64,
        src: NativeId,
        src_offset: u64,
        byte_count: u64,
    ) {
        let mut buffers = self.buffers.lock().expect("buffer store mutex poisoned");
        if let Some(source) = buffers.get(&src.0).cloned() {
            if let Some(dest) = buffers.get_mut(&dst.0) {
                let src_end = (src_offset + byte_count) as usize;
                let dst_end = (dst_offset + byte_count) as usize;
                if src_end <= source.len() && dst_end <= dest.len() {
                    dest[dst_offset as usize..dst_end]
                        .copy_from_slice(&source[src_offset as usize..src_end]);
                }
            }
        }
    }

    fn copy_texture(&mut self, _dst: NativeId, _src: NativeId) {}

    fn update_texture(
        &mut self,
        _dst: NativeId,
        _mip_level: u32,
        _origin: Origin3D,
        _extent: Extent3D,
        _data: &[u8],
        _bytes_per_row: u32,
    ) {
    }

    fn resolve_texture(&mut self, _dst: NativeId, _src: NativeId) {}
    fn generate_mip_maps(&mut self, _view: NativeId) {}
    fn clear_unordered_access_view_f32(&mut self, _view: NativeId, _values: [f32; 4]) {}
    fn clear_unordered_access_view_u32(&mut self, _view: NativeId, _values: [u32; 4]) {}
    fn begin_query(&mut self, _query: NativeId) {}
    fn end_query(&mut self, _query: NativeId) {}
    fn flush(&mut self) {}

    fn as_any(&mut self) -> &mut dyn Any {
        self
    }
}
