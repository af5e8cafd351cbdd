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

//! The common graphics device: factory and owner of all GAL resources.
//!
//! `GalDevice` is the only place resources are created or destroyed. It
//! validates descriptors against the device capabilities, runs the
//! two-phase create (backend init must succeed before a handle is
//! published), deduplicates immutable state objects by descriptor hash,
//! and defers native destruction until the GPU has provably retired the
//! frame that last saw the resource.

use log::{error, warn};
use std::collections::HashMap;

use crate::math::Extent3D;
use crate::stats::RenderStats;

use super::backend::{GalBackend, NativeId, SwapChainInit, ViewTarget};
use super::capabilities::{AdapterInfo, DeviceCapabilities};
use super::descriptors::{
    descriptor_hash, BlendStateDesc, BufferDesc, BufferUsage, DepthStencilStateDesc, QueryDesc,
    RasterizerStateDesc, RenderTargetViewDesc, ResourceViewDesc, SamplerStateDesc, ShaderDesc,
    SwapChainDesc, TextureDesc, TextureInitData, TextureUsage, UnorderedAccessViewDesc,
};
use super::error::GalError;
use super::handle::{Handle, HandleTable};
use super::init_context::InitContext;
use super::pass::Pass;

/// A texture owned by the device.
#[derive(Debug)]
pub struct GalTexture {
    /// The immutable creation descriptor.
    pub desc: TextureDesc,
    pub(crate) native: NativeId,
    pub(crate) view_count: u32,
    pub(crate) default_resource_view: ResourceViewHandle,
    pub(crate) default_render_target_view: RenderTargetViewHandle,
    /// Set for swap-chain backbuffers, whose native object rotates on
    /// acquire.
    pub(crate) is_backbuffer: bool,
}

/// A buffer owned by the device.
#[derive(Debug)]
pub struct GalBuffer {
    /// The immutable creation descriptor.
    pub desc: BufferDesc,
    pub(crate) native: NativeId,
    pub(crate) view_count: u32,
}

/// A shader owned by the device.
#[derive(Debug)]
pub struct GalShader {
    /// The immutable creation descriptor (stage bytecode is shared).
    pub desc: ShaderDesc,
    pub(crate) native: NativeId,
}

/// A deduplicated immutable state object (blend, depth-stencil, rasterizer
/// or sampler state).
#[derive(Debug)]
pub struct GalStateObject<D> {
    /// The immutable creation descriptor.
    pub desc: D,
    pub(crate) native: NativeId,
    pub(crate) ref_count: u32,
    pub(crate) hash: u64,
}

/// What a view was created over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewParent {
    /// The view targets a texture.
    Texture(TextureHandle),
    /// The view targets a buffer.
    Buffer(BufferHandle),
}

/// A shader resource view.
#[derive(Debug)]
pub struct GalResourceView {
    /// The immutable creation descriptor.
    pub desc: ResourceViewDesc,
    pub(crate) native: NativeId,
    /// The viewed resource.
    pub parent: ViewParent,
}

/// A render target view.
#[derive(Debug)]
pub struct GalRenderTargetView {
    /// The immutable creation descriptor.
    pub desc: RenderTargetViewDesc,
    pub(crate) native: NativeId,
    /// The viewed texture.
    pub texture: TextureHandle,
}

/// An unordered access view.
#[derive(Debug)]
pub struct GalUnorderedAccessView {
    /// The immutable creation descriptor.
    pub desc: UnorderedAccessViewDesc,
    pub(crate) native: NativeId,
    /// The viewed resource.
    pub parent: ViewParent,
}

/// A GPU query.
#[derive(Debug)]
pub struct GalQuery {
    /// The immutable creation descriptor.
    pub desc: QueryDesc,
    pub(crate) native: NativeId,
}

/// A swap chain and its backbuffer texture.
#[derive(Debug)]
pub struct GalSwapChain {
    /// The immutable creation descriptor.
    pub desc: SwapChainDesc,
    pub(crate) native: NativeId,
    /// The handle of the backbuffer texture; its native object changes on
    /// every acquire.
    pub backbuffer: TextureHandle,
}

/// Handle to a [`GalTexture`].
pub type TextureHandle = Handle<GalTexture>;
/// Handle to a [`GalBuffer`].
pub type BufferHandle = Handle<GalBuffer>;
/// Handle to a [`GalShader`].
pub type ShaderHandle = Handle<GalShader>;
/// Handle to a blend state object.
pub type BlendStateHandle = Handle<GalStateObject<BlendStateDesc>>;
/// Handle to a depth/stencil state object.
pub type DepthStencilStateHandle = Handle<GalStateObject<DepthStencilStateDesc>>;
/// Handle to a rasterizer state object.
pub type RasterizerStateHandle = Handle<GalStateObject<RasterizerStateDesc>>;
/// Handle to a sampler state object.
pub type SamplerStateHandle = Handle<GalStateObject<SamplerStateDesc>>;
/// Handle to a [`GalResourceView`].
pub type ResourceViewHandle = Handle<GalResourceView>;
/// Handle to a [`GalRenderTargetView`].
pub type RenderTargetViewHandle = Handle<GalRenderTargetView>;
/// Handle to a [`GalUnorderedAccessView`].
pub type UnorderedAccessViewHandle = Handle<GalUnorderedAccessView>;
/// Handle to a [`GalQuery`].
pub type QueryHandle = Handle<GalQuery>;
/// Handle to a [`GalSwapChain`].
pub type SwapChainHandle = Handle<GalSwapChain>;

/// Events the device broadcasts over its [`flume`] channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalDeviceEvent {
    /// A new frame began recording.
    FrameBegin(u64),
    /// The GPU finished all work of the given frame; its deferred-freed
    /// resources have been reclaimed.
    FrameRetired(u64),
    /// The device is about to shut down.
    BeforeShutdown,
}

/// A native object whose destruction is deferred until its frame retires.
#[derive(Debug)]
enum DeadObject {
    Texture(NativeId),
    Buffer(NativeId),
    Shader(NativeId),
    BlendState(NativeId),
    DepthStencilState(NativeId),
    RasterizerState(NativeId),
    SamplerState(NativeId),
    ResourceView(NativeId),
    RenderTargetView(NativeId),
    UnorderedAccessView(NativeId),
    Query(NativeId),
    SwapChain(NativeId),
}

/// The common graphics device. See the module docs.
#[derive(Debug)]
pub struct GalDevice {
    backend: Box<dyn GalBackend>,
    caps: DeviceCapabilities,

    textures: HandleTable<GalTexture>,
    buffers: HandleTable<GalBuffer>,
    shaders: HandleTable<GalShader>,
    blend_states: HandleTable<GalStateObject<BlendStateDesc>>,
    depth_stencil_states: HandleTable<GalStateObject<DepthStencilStateDesc>>,
    rasterizer_states: HandleTable<GalStateObject<RasterizerStateDesc>>,
    sampler_states: HandleTable<GalStateObject<SamplerStateDesc>>,
    resource_views: HandleTable<GalResourceView>,
    render_target_views: HandleTable<GalRenderTargetView>,
    unordered_access_views: HandleTable<GalUnorderedAccessView>,
    queries: HandleTable<GalQuery>,
    swap_chains: HandleTable<GalSwapChain>,

    blend_dedup: HashMap<u64, BlendStateHandle>,
    depth_stencil_dedup: HashMap<u64, DepthStencilStateHandle>,
    rasterizer_dedup: HashMap<u64, RasterizerStateHandle>,
    sampler_dedup: HashMap<u64, SamplerStateHandle>,

    dead_objects: Vec<(u64, DeadObject)>,

    frame_index: u64,
    frame_open: bool,
    pub(crate) pass_open: bool,

    init_context: InitContext,

    event_tx: flume::Sender<GalDeviceEvent>,
    event_rx: flume::Receiver<GalDeviceEvent>,

    pub(crate) stats: RenderStats,
    shutdown_done: bool,
}

impl GalDevice {
    /// Wraps an initialized backend in the common device layer.
    pub fn new(backend: Box<dyn GalBackend>) -> Self {
        let caps = backend.capabilities();
        let (event_tx, event_rx) = flume::unbounded();
        Self {
            backend,
            caps,
            textures: HandleTable::new(),
            buffers: HandleTable::new(),
            shaders: HandleTable::new(),
            blend_states: HandleTable::new(),
            depth_stencil_states: HandleTable::new(),
            rasterizer_states: HandleTable::new(),
            sampler_states: HandleTable::new(),
            resource_views: HandleTable::new(),
            render_target_views: HandleTable::new(),
            unordered_access_views: HandleTable::new(),
            queries: HandleTable::new(),
            swap_chains: HandleTable::new(),
            blend_dedup: HashMap::new(),
            depth_stencil_dedup: HashMap::new(),
            rasterizer_dedup: HashMap::new(),
            sampler_dedup: HashMap::new(),
            dead_objects: Vec::new(),
            frame_index: 0,
            frame_open: false,
            pass_open: false,
            init_context: InitContext::new(),
            event_tx,
            event_rx,
            stats: RenderStats::default(),
            shutdown_done: false,
        }
    }

    /// The capabilities the backend reported at init time.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.caps
    }

    /// Adapter information from the backend.
    pub fn adapter_info(&self) -> AdapterInfo {
        self.backend.adapter_info()
    }

    /// Subscribes to the device event stream. Receivers that lag never
    /// block the render thread. The channel is a queue, not a broadcast:
    /// with several subscribers, each event reaches exactly one of them.
    pub fn events(&self) -> flume::Receiver<GalDeviceEvent> {
        self.event_rx.clone()
    }

    /// The shared init-upload context for loader threads.
    ///
    /// Only useful when
    /// [`DeviceCapabilities::multithreaded_resource_creation`] is set;
    /// uploads are flushed at the next [`begin_frame`](Self::begin_frame).
    pub fn init_context(&self) -> InitContext {
        self.init_context.clone()
    }

    /// Accumulated recording statistics.
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Clears the accumulated statistics counters.
    pub fn clear_stats(&mut self) {
        self.stats.clear();
    }

    /// The index of the frame currently being recorded.
    pub fn current_frame(&self) -> u64 {
        self.frame_index
    }

    // -----------------------------------------------------------------
    // Frame rotation
    // -----------------------------------------------------------------

    /// Begins a new frame and flushes batched init-context uploads.
    pub fn begin_frame(&mut self) -> u64 {
        assert!(!self.frame_open, "begin_frame called while a frame is open");
        self.frame_index += 1;
        self.frame_open = true;
        self.stats.frame_number = self.frame_index;
        self.backend.begin_frame(self.frame_index);
        self.flush_init_context();
        let _ = self.event_tx.try_send(GalDeviceEvent::FrameBegin(self.frame_index));
        self.frame_index
    }

    /// Ends the current frame and reclaims deferred-freed resources of
    /// every frame the GPU has retired.
    pub fn end_frame(&mut self) {
        assert!(self.frame_open, "end_frame called without begin_frame");
        assert!(!self.pass_open, "end_frame called with an open pass scope");
        self.frame_open = false;
        let retired = self.backend.end_frame();
        self.reclaim_dead(retired);
        let _ = self.event_tx.try_send(GalDeviceEvent::FrameRetired(retired));
    }

    /// Waits for the GPU to go idle and reclaims everything pending.
    pub fn wait_idle(&mut self) {
        self.backend.wait_idle();
        self.reclaim_dead(u64::MAX);
    }

    fn reclaim_dead(&mut self, retired_frame: u64) {
        let backend = &mut self.backend;
        self.dead_objects.retain(|(frame, object)| {
            if *frame > retired_frame {
                return true;
            }
            match object {
                DeadObject::Texture(id) => backend.deinit_texture(*id),
                DeadObject::Buffer(id) => backend.deinit_buffer(*id),
                DeadObject::Shader(id) => backend.deinit_shader(*id),
                DeadObject::BlendState(id) => backend.deinit_blend_state(*id),
                DeadObject::DepthStencilState(id) => backend.deinit_depth_stencil_state(*id),
                DeadObject::RasterizerState(id) => backend.deinit_rasterizer_state(*id),
                DeadObject::SamplerState(id) => backend.deinit_sampler_state(*id),
                DeadObject::ResourceView(id) => backend.deinit_resource_view(*id),
                DeadObject::RenderTargetView(id) => backend.deinit_render_target_view(*id),
                DeadObject::UnorderedAccessView(id) => backend.deinit_unordered_access_view(*id),
                DeadObject::Query(id) => backend.deinit_query(*id),
                DeadObject::SwapChain(id) => backend.deinit_swap_chain(*id),
            }
            false
        });
    }

    /// The number of native objects still waiting for frame retirement.
    pub fn pending_destruction_count(&self) -> usize {
        self.dead_objects.len()
    }

    fn flush_init_context(&mut self) {
        let batch = self.init_context.take_batch();
        if batch.is_empty() {
            return;
        }
        // One recorder for the whole batch keeps the transition barriers of
        // concurrent loader submissions from interleaving.
        let mut recorder = self.backend.create_recorder();
        for upload in batch {
            let Some(texture) = self.textures.get(upload.texture) else {
                warn!("InitContext upload targets a destroyed texture, dropping it.");
                continue;
            };
            recorder.update_texture(
                texture.native,
                upload.mip_level,
                upload.origin,
                upload.extent,
                &upload.data,
                upload.bytes_per_row,
            );
        }
        recorder.flush();
        self.backend.submit(recorder);
    }

    // -----------------------------------------------------------------
    // Pass scope
    // -----------------------------------------------------------------

    /// Opens a device pass scope. Only one may be open at a time; the
    /// returned [`Pass`] closes it on drop.
    pub fn begin_pass(&mut self, name: &str) -> Pass<'_> {
        assert!(
            !self.pass_open,
            "Nested passes are not allowed: end the current Pass before calling begin_pass again"
        );
        debug_assert!(self.frame_open, "begin_pass called outside a frame");
        self.pass_open = true;
        let recorder = self.backend.create_recorder();
        Pass::new(self, recorder, name)
    }

    pub(crate) fn submit_recorder(&mut self, recorder: Box<dyn super::backend::CommandRecorder>) {
        self.backend.submit(recorder);
    }

    // -----------------------------------------------------------------
    // Textures
    // -----------------------------------------------------------------

    /// Creates a texture, optionally with initial subresource data.
    pub fn create_texture(
        &mut self,
        desc: &TextureDesc,
        initial_data: &[TextureInitData<'_>],
    ) -> Result<TextureHandle, GalError> {
        self.validate_texture_desc(desc).inspect_err(|err| {
            error!("Texture creation failed: {err}");
        })?;
        let native = self.backend.init_texture(desc, initial_data).map_err(|err| {
            error!("Backend texture creation failed: {err}");
            GalError::from(err)
        })?;
        Ok(self.textures.insert(GalTexture {
            desc: desc.clone(),
            native,
            view_count: 0,
            default_resource_view: Handle::INVALID,
            default_render_target_view: Handle::INVALID,
            is_backbuffer: false,
        }))
    }

    fn validate_texture_desc(&self, desc: &TextureDesc) -> Result<(), GalError> {
        if desc.size.is_empty() {
            return Err(GalError::InvalidDescriptor {
                resource: "texture",
                reason: format!("extent {:?} has a zero dimension", desc.size),
            });
        }
        let max = self.caps.max_texture_dimension_2d;
        if desc.size.width > max || desc.size.height > max {
            return Err(GalError::InvalidDescriptor {
                resource: "texture",
                reason: format!(
                    "extent {}x{} exceeds the device limit of {max}",
                    desc.size.width, desc.size.height
                ),
            });
        }
        if desc.size.depth_or_array_layers > self.caps.max_texture_array_layers {
            return Err(GalError::InvalidDescriptor {
                resource: "texture",
                reason: format!(
                    "{} array layers exceed the device limit of {}",
                    desc.size.depth_or_array_layers, self.caps.max_texture_array_layers
                ),
            });
        }
        let wants_attachment = desc
            .usage
            .intersects(TextureUsage::RENDER_TARGET | TextureUsage::DEPTH_STENCIL);
        if wants_attachment && !self.caps.supports_render_target_format(desc.format) {
            return Err(GalError::UnsupportedFormat {
                format: desc.format,
                usage: "a render target",
            });
        }
        if desc.mip_level_count == 0 {
            return Err(GalError::InvalidDescriptor {
                resource: "texture",
                reason: "mip_level_count must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Resolves a texture handle.
    pub fn texture(&self, handle: TextureHandle) -> Option<&GalTexture> {
        self.textures.get(handle)
    }

    /// Destroys a texture. Its views must already be gone; the native
    /// object is reclaimed once the current frame retires.
    pub fn destroy_texture(&mut self, handle: TextureHandle) {
        // Tear down lazily created default views first; they belong to the
        // texture.
        let (default_rv, default_rtv) = match self.textures.get(handle) {
            Some(t) => (t.default_resource_view, t.default_render_target_view),
            None => {
                warn!("destroy_texture called with a stale handle.");
                return;
            }
        };
        if !default_rv.is_invalidated() {
            self.destroy_resource_view(default_rv);
        }
        if !default_rtv.is_invalidated() {
            self.destroy_render_target_view(default_rtv);
        }

        let Some(texture) = self.textures.remove(handle) else {
            return;
        };
        debug_assert!(
            texture.view_count == 0,
            "destroying texture with {} live view(s)",
            texture.view_count
        );
        if texture.view_count != 0 {
            error!(
                "Texture destroyed while {} view(s) are still alive.",
                texture.view_count
            );
        }
        if !texture.is_backbuffer {
            self.defer_destroy(DeadObject::Texture(texture.native));
        }
    }

    // -----------------------------------------------------------------
    // Buffers
    // -----------------------------------------------------------------

    /// Creates a buffer, optionally with initial data.
    pub fn create_buffer(
        &mut self,
        desc: &BufferDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<BufferHandle, GalError> {
        if desc.size == 0 {
            let err = GalError::InvalidDescriptor {
                resource: "buffer",
                reason: "size must be non-zero".into(),
            };
            error!("Buffer creation failed: {err}");
            return Err(err);
        }
        if desc.usage.contains(BufferUsage::CONSTANT)
            && desc.size > self.caps.max_constant_buffer_size
        {
            let err = GalError::InvalidDescriptor {
                resource: "buffer",
                reason: format!(
                    "constant buffer of {} bytes exceeds the device limit of {}",
                    desc.size, self.caps.max_constant_buffer_size
                ),
            };
            error!("Buffer creation failed: {err}");
            return Err(err);
        }
        if let Some(data) = initial_data {
            if data.len() as u64 > desc.size {
                let err = GalError::InvalidDescriptor {
                    resource: "buffer",
                    reason: format!(
                        "initial data of {} bytes does not fit in {} bytes",
                        data.len(),
                        desc.size
                    ),
                };
                error!("Buffer creation failed: {err}");
                return Err(err);
            }
        }
        let native = self.backend.init_buffer(desc, initial_data).map_err(|err| {
            error!("Backend buffer creation failed: {err}");
            GalError::from(err)
        })?;
        Ok(self.buffers.insert(GalBuffer {
            desc: desc.clone(),
            native,
            view_count: 0,
        }))
    }

    /// Resolves a buffer handle.
    pub fn buffer(&self, handle: BufferHandle) -> Option<&GalBuffer> {
        self.buffers.get(handle)
    }

    /// Writes CPU data into a buffer through the device queue.
    pub fn write_buffer(
        &mut self,
        handle: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GalError> {
        let buffer = self.buffers.get(handle).ok_or(GalError::InvalidHandle {
            resource: "buffer",
        })?;
        if offset + data.len() as u64 > buffer.desc.size {
            return Err(GalError::InvalidDescriptor {
                resource: "buffer",
                reason: format!(
                    "write of {} bytes at offset {offset} exceeds buffer size {}",
                    data.len(),
                    buffer.desc.size
                ),
            });
        }
        let native = buffer.native;
        self.backend.write_buffer(native, offset, data)?;
        Ok(())
    }

    /// Destroys a buffer. Its views must already be gone.
    pub fn destroy_buffer(&mut self, handle: BufferHandle) {
        let Some(buffer) = self.buffers.remove(handle) else {
            warn!("destroy_buffer called with a stale handle.");
            return;
        };
        debug_assert!(
            buffer.view_count == 0,
            "destroying buffer with {} live view(s)",
            buffer.view_count
        );
        if buffer.view_count != 0 {
            error!(
                "Buffer destroyed while {} view(s) are still alive.",
                buffer.view_count
            );
        }
        self.defer_destroy(DeadObject::Buffer(buffer.native));
    }

    // -----------------------------------------------------------------
    // Shaders
    // -----------------------------------------------------------------

    /// Creates a shader from stage bytecode.
    pub fn create_shader(&mut self, desc: &ShaderDesc) -> Result<ShaderHandle, GalError> {
        if !desc.is_valid() {
            let err = GalError::InvalidDescriptor {
                resource: "shader",
                reason: "stage combination must be vertex(+pixel) or compute".into(),
            };
            error!("Shader creation failed ({}): {err}", desc.debug_name);
            return Err(err);
        }
        if desc.is_compute() && !self.caps.compute_shaders {
            let err = GalError::InvalidDescriptor {
                resource: "shader",
                reason: "compute shaders are not supported by this device".into(),
            };
            error!("Shader creation failed ({}): {err}", desc.debug_name);
            return Err(err);
        }
        let native = self.backend.init_shader(desc).map_err(|err| {
            error!("Backend shader creation failed ({}): {err}", desc.debug_name);
            GalError::from(err)
        })?;
        Ok(self.shaders.insert(GalShader {
            desc: desc.clone(),
            native,
        }))
    }

    /// Resolves a shader handle.
    pub fn shader(&self, handle: ShaderHandle) -> Option<&GalShader> {
        self.shaders.get(handle)
    }

    /// Destroys a shader.
    pub fn destroy_shader(&mut self, handle: ShaderHandle) {
        if let Some(shader) = self.shaders.remove(handle) {
            self.defer_destroy(DeadObject::Shader(shader.native));
        } else {
            warn!("destroy_shader called with a stale handle.");
        }
    }

    // -----------------------------------------------------------------
    // State objects (deduplicated by descriptor hash)
    // -----------------------------------------------------------------

    /// Creates (or re-references) a blend state.
    pub fn create_blend_state(
        &mut self,
        desc: &BlendStateDesc,
    ) -> Result<BlendStateHandle, GalError> {
        let hash = descriptor_hash(desc);
        if let Some(&existing) = self.blend_dedup.get(&hash) {
            if let Some(entry) = self.blend_states.get_mut(existing) {
                entry.ref_count += 1;
                return Ok(existing);
            }
        }
        let native = self.backend.init_blend_state(desc).map_err(|err| {
            error!("Backend blend state creation failed: {err}");
            GalError::from(err)
        })?;
        let handle = self.blend_states.insert(GalStateObject {
            desc: desc.clone(),
            native,
            ref_count: 1,
            hash,
        });
        self.blend_dedup.insert(hash, handle);
        Ok(handle)
    }

    /// Releases a blend state reference; frees the native object at zero.
    pub fn destroy_blend_state(&mut self, handle: BlendStateHandle) {
        let Some(entry) = self.blend_states.get_mut(handle) else {
            warn!("destroy_blend_state called with a stale handle.");
            return;
        };
        entry.ref_count -= 1;
        if entry.ref_count == 0 {
            let entry = self.blend_states.remove(handle).expect("entry just resolved");
            self.blend_dedup.remove(&entry.hash);
            self.defer_destroy(DeadObject::BlendState(entry.native));
        }
    }

    /// Resolves a blend state handle.
    pub fn blend_state(&self, handle: BlendStateHandle) -> Option<&GalStateObject<BlendStateDesc>> {
        self.blend_states.get(handle)
    }

    /// Creates (or re-references) a depth/stencil state.
    pub fn create_depth_stencil_state(
        &mut self,
        desc: &DepthStencilStateDesc,
    ) -> Result<DepthStencilStateHandle, GalError> {
        let hash = descriptor_hash(desc);
        if let Some(&existing) = self.depth_stencil_dedup.get(&hash) {
            if let Some(entry) = self.depth_stencil_states.get_mut(existing) {
                entry.ref_count += 1;
                return Ok(existing);
            }
        }
        let native = self.backend.init_depth_stencil_state(desc).map_err(|err| {
            error!("Backend depth/stencil state creation failed: {err}");
            GalError::from(err)
        })?;
        let handle = self.depth_stencil_states.insert(GalStateObject {
            desc: *desc,
            native,
            ref_count: 1,
            hash,
        });
        self.depth_stencil_dedup.insert(hash, handle);
        Ok(handle)
    }

    /// Releases a depth/stencil state reference.
    pub fn destroy_depth_stencil_state(&mut self, handle: DepthStencilStateHandle) {
        let Some(entry) = self.depth_stencil_states.get_mut(handle) else {
            warn!("destroy_depth_stencil_state called with a stale handle.");
            return;
        };
        entry.ref_count -= 1;
        if entry.ref_count == 0 {
            let entry = self
                .depth_stencil_states
                .remove(handle)
                .expect("entry just resolved");
            self.depth_stencil_dedup.remove(&entry.hash);
            self.defer_destroy(DeadObject::DepthStencilState(entry.native));
        }
    }

    /// Resolves a depth/stencil state handle.
    pub fn depth_stencil_state(
        &self,
        handle: DepthStencilStateHandle,
    ) -> Option<&GalStateObject<DepthStencilStateDesc>> {
        self.depth_stencil_states.get(handle)
    }

    /// Creates (or re-references) a rasterizer state.
    pub fn create_rasterizer_state(
        &mut self,
        desc: &RasterizerStateDesc,
    ) -> Result<RasterizerStateHandle, GalError> {
        let hash = descriptor_hash(desc);
        if let Some(&existing) = self.rasterizer_dedup.get(&hash) {
            if let Some(entry) = self.rasterizer_states.get_mut(existing) {
                entry.ref_count += 1;
                return Ok(existing);
            }
        }
        let native = self.backend.init_rasterizer_state(desc).map_err(|err| {
            error!("Backend rasterizer state creation failed: {err}");
            GalError::from(err)
        })?;
        let handle = self.rasterizer_states.insert(GalStateObject {
            desc: *desc,
            native,
            ref_count: 1,
            hash,
        });
        self.rasterizer_dedup.insert(hash, handle);
        Ok(handle)
    }

    /// Releases a rasterizer state reference.
    pub fn destroy_rasterizer_state(&mut self, handle: RasterizerStateHandle) {
        let Some(entry) = self.rasterizer_states.get_mut(handle) else {
            warn!("destroy_rasterizer_state called with a stale handle.");
            return;
        };
        entry.ref_count -= 1;
        if entry.ref_count == 0 {
            let entry = self
                .rasterizer_states
                .remove(handle)
                .expect("entry just resolved");
            self.rasterizer_dedup.remove(&entry.hash);
            self.defer_destroy(DeadObject::RasterizerState(entry.native));
        }
    }

    /// Resolves a rasterizer state handle.
    pub fn rasterizer_state(
        &self,
        handle: RasterizerStateHandle,
    ) -> Option<&GalStateObject<RasterizerStateDesc>> {
        self.rasterizer_states.get(handle)
    }

    /// Creates (or re-references) a sampler state.
    pub fn create_sampler_state(
        &mut self,
        desc: &SamplerStateDesc,
    ) -> Result<SamplerStateHandle, GalError> {
        let hash = descriptor_hash(desc);
        if let Some(&existing) = self.sampler_dedup.get(&hash) {
            if let Some(entry) = self.sampler_states.get_mut(existing) {
                entry.ref_count += 1;
                return Ok(existing);
            }
        }
        let native = self.backend.init_sampler_state(desc).map_err(|err| {
            error!("Backend sampler state creation failed: {err}");
            GalError::from(err)
        })?;
        let handle = self.sampler_states.insert(GalStateObject {
            desc: *desc,
            native,
            ref_count: 1,
            hash,
        });
        self.sampler_dedup.insert(hash, handle);
        Ok(handle)
    }

    /// Releases a sampler state reference.
    pub fn destroy_sampler_state(&mut self, handle: SamplerStateHandle) {
        let Some(entry) = self.sampler_states.get_mut(handle) else {
            warn!("destroy_sampler_state called with a stale handle.");
            return;
        };
        entry.ref_count -= 1;
        if entry.ref_count == 0 {
            let entry = self
                .sampler_states
                .remove(handle)
                .expect("entry just resolved");
            self.sampler_dedup.remove(&entry.hash);
            self.defer_destroy(DeadObject::SamplerState(entry.native));
        }
    }

    /// Resolves a sampler state handle.
    pub fn sampler_state(
        &self,
        handle: SamplerStateHandle,
    ) -> Option<&GalStateObject<SamplerStateDesc>> {
        self.sampler_states.get(handle)
    }

    // -----------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------

    /// Creates a shader resource view over a texture.
    pub fn create_resource_view(
        &mut self,
        texture: TextureHandle,
        desc: &ResourceViewDesc,
    ) -> Result<ResourceViewHandle, GalError> {
        let entry = self.textures.get(texture).ok_or(GalError::InvalidHandle {
            resource: "texture",
        })?;
        let native_parent = entry.native;
        let native = self
            .backend
            .init_resource_view(ViewTarget::Texture(native_parent), desc)
            .map_err(|err| {
                error!("Backend resource view creation failed: {err}");
                GalError::from(err)
            })?;
        self.textures
            .get_mut(texture)
            .expect("texture resolved above")
            .view_count += 1;
        Ok(self.resource_views.insert(GalResourceView {
            desc: *desc,
            native,
            parent: ViewParent::Texture(texture),
        }))
    }

    /// Creates a shader resource view over a buffer.
    pub fn create_buffer_resource_view(
        &mut self,
        buffer: BufferHandle,
        desc: &ResourceViewDesc,
    ) -> Result<ResourceViewHandle, GalError> {
        let entry = self.buffers.get(buffer).ok_or(GalError::InvalidHandle {
            resource: "buffer",
        })?;
        let native_parent = entry.native;
        let native = self
            .backend
            .init_resource_view(ViewTarget::Buffer(native_parent), desc)
            .map_err(|err| {
                error!("Backend resource view creation failed: {err}");
                GalError::from(err)
            })?;
        self.buffers
            .get_mut(buffer)
            .expect("buffer resolved above")
            .view_count += 1;
        Ok(self.resource_views.insert(GalResourceView {
            desc: *desc,
            native,
            parent: ViewParent::Buffer(buffer),
        }))
    }

    /// Returns (lazily creating) the whole-texture resource view.
    pub fn default_resource_view(
        &mut self,
        texture: TextureHandle,
    ) -> Result<ResourceViewHandle, GalError> {
        let existing = self
            .textures
            .get(texture)
            .ok_or(GalError::InvalidHandle {
                resource: "texture",
            })?
            .default_resource_view;
        if !existing.is_invalidated() {
            return Ok(existing);
        }
        let view = self.create_resource_view(texture, &ResourceViewDesc::default())?;
        self.textures
            .get_mut(texture)
            .expect("texture resolved above")
            .default_resource_view = view;
        Ok(view)
    }

    /// Resolves a resource view handle.
    pub fn resource_view(&self, handle: ResourceViewHandle) -> Option<&GalResourceView> {
        self.resource_views.get(handle)
    }

    /// Destroys a resource view.
    pub fn destroy_resource_view(&mut self, handle: ResourceViewHandle) {
        let Some(view) = self.resource_views.remove(handle) else {
            warn!("destroy_resource_view called with a stale handle.");
            return;
        };
        self.release_view_parent(view.parent);
        self.defer_destroy(DeadObject::ResourceView(view.native));
    }

    /// Creates a render target view over a texture.
    pub fn create_render_target_view(
        &mut self,
        texture: TextureHandle,
        desc: &RenderTargetViewDesc,
    ) -> Result<RenderTargetViewHandle, GalError> {
        let entry = self.textures.get(texture).ok_or(GalError::InvalidHandle {
            resource: "texture",
        })?;
        let attachment_usage = if entry.desc.format.is_depth() {
            TextureUsage::DEPTH_STENCIL
        } else {
            TextureUsage::RENDER_TARGET
        };
        if !entry.desc.usage.contains(attachment_usage) {
            let err = GalError::InvalidDescriptor {
                resource: "render target view",
                reason: format!(
                    "texture was not created with {attachment_usage:?} usage"
                ),
            };
            error!("Render target view creation failed: {err}");
            return Err(err);
        }
        let native_parent = entry.native;
        let native = self
            .backend
            .init_render_target_view(native_parent, desc)
            .map_err(|err| {
                error!("Backend render target view creation failed: {err}");
                GalError::from(err)
            })?;
        self.textures
            .get_mut(texture)
            .expect("texture resolved above")
            .view_count += 1;
        Ok(self.render_target_views.insert(GalRenderTargetView {
            desc: *desc,
            native,
            texture,
        }))
    }

    /// Returns (lazily creating) the whole-texture render target view.
    pub fn default_render_target_view(
        &mut self,
        texture: TextureHandle,
    ) -> Result<RenderTargetViewHandle, GalError> {
        let existing = self
            .textures
            .get(texture)
            .ok_or(GalError::InvalidHandle {
                resource: "texture",
            })?
            .default_render_target_view;
        if !existing.is_invalidated() {
            return Ok(existing);
        }
        let view = self.create_render_target_view(texture, &RenderTargetViewDesc::default())?;
        self.textures
            .get_mut(texture)
            .expect("texture resolved above")
            .default_render_target_view = view;
        Ok(view)
    }

    /// Resolves a render target view handle.
    pub fn render_target_view(
        &self,
        handle: RenderTargetViewHandle,
    ) -> Option<&GalRenderTargetView> {
        self.render_target_views.get(handle)
    }

    /// Destroys a render target view.
    pub fn destroy_render_target_view(&mut self, handle: RenderTargetViewHandle) {
        let Some(view) = self.render_target_views.remove(handle) else {
            warn!("destroy_render_target_view called with a stale handle.");
            return;
        };
        self.release_view_parent(ViewParent::Texture(view.texture));
        self.defer_destroy(DeadObject::RenderTargetView(view.native));
    }

    /// Creates an unordered access view over a texture.
    pub fn create_unordered_access_view(
        &mut self,
        texture: TextureHandle,
        desc: &UnorderedAccessViewDesc,
    ) -> Result<UnorderedAccessViewHandle, GalError> {
        let entry = self.textures.get(texture).ok_or(GalError::InvalidHandle {
            resource: "texture",
        })?;
        if !entry.desc.usage.contains(TextureUsage::UNORDERED_ACCESS) {
            let err = GalError::InvalidDescriptor {
                resource: "unordered access view",
                reason: "texture was not created with UNORDERED_ACCESS usage".into(),
            };
            error!("Unordered access view creation failed: {err}");
            return Err(err);
        }
        let native_parent = entry.native;
        let native = self
            .backend
            .init_unordered_access_view(ViewTarget::Texture(native_parent), desc)
            .map_err(|err| {
                error!("Backend unordered access view creation failed: {err}");
                GalError::from(err)
            })?;
        self.textures
            .get_mut(texture)
            .expect("texture resolved above")
            .view_count += 1;
        Ok(self.unordered_access_views.insert(GalUnorderedAccessView {
            desc: *desc,
            native,
            parent: ViewParent::Texture(texture),
        }))
    }

    /// Resolves an unordered access view handle.
    pub fn unordered_access_view(
        &self,
        handle: UnorderedAccessViewHandle,
    ) -> Option<&GalUnorderedAccessView> {
        self.unordered_access_views.get(handle)
    }

    /// Destroys an unordered access view.
    pub fn destroy_unordered_access_view(&mut self, handle: UnorderedAccessViewHandle) {
        let Some(view) = self.unordered_access_views.remove(handle) else {
            warn!("destroy_unordered_access_view called with a stale handle.");
            return;
        };
        self.release_view_parent(view.parent);
        self.defer_destroy(DeadObject::UnorderedAccessView(view.native));
    }

    fn release_view_parent(&mut self, parent: ViewParent) {
        match parent {
            ViewParent::Texture(texture) => {
                if let Some(entry) = self.textures.get_mut(texture) {
                    entry.view_count = entry.view_count.saturating_sub(1);
                }
            }
            ViewParent::Buffer(buffer) => {
                if let Some(entry) = self.buffers.get_mut(buffer) {
                    entry.view_count = entry.view_count.saturating_sub(1);
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Creates a GPU query.
    pub fn create_query(&mut self, desc: &QueryDesc) -> Result<QueryHandle, GalError> {
        let native = self.backend.init_query(desc).map_err(|err| {
            error!("Backend query creation failed: {err}");
            GalError::from(err)
        })?;
        Ok(self.queries.insert(GalQuery { desc: *desc, native }))
    }

    /// Resolves a query handle.
    pub fn query(&self, handle: QueryHandle) -> Option<&GalQuery> {
        self.queries.get(handle)
    }

    /// Reads a query result, `Ok(None)` while it is still in flight.
    pub fn query_result(&mut self, handle: QueryHandle) -> Result<Option<u64>, GalError> {
        let query = self.queries.get(handle).ok_or(GalError::InvalidHandle {
            resource: "query",
        })?;
        let native = query.native;
        Ok(self.backend.query_result(native)?)
    }

    /// Destroys a query.
    pub fn destroy_query(&mut self, handle: QueryHandle) {
        if let Some(query) = self.queries.remove(handle) {
            self.defer_destroy(DeadObject::Query(query.native));
        } else {
            warn!("destroy_query called with a stale handle.");
        }
    }

    // -----------------------------------------------------------------
    // Swap chains
    // -----------------------------------------------------------------

    /// Creates a swap chain and its backbuffer texture.
    pub fn create_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<SwapChainHandle, GalError> {
        let SwapChainInit {
            swap_chain,
            backbuffer_desc,
            backbuffer,
        } = self.backend.init_swap_chain(desc).map_err(|err| {
            error!("Backend swap chain creation failed: {err}");
            GalError::from(err)
        })?;
        let backbuffer = self.textures.insert(GalTexture {
            desc: backbuffer_desc,
            native: backbuffer,
            view_count: 0,
            default_resource_view: Handle::INVALID,
            default_render_target_view: Handle::INVALID,
            is_backbuffer: true,
        });
        Ok(self.swap_chains.insert(GalSwapChain {
            desc: *desc,
            native: swap_chain,
            backbuffer,
        }))
    }

    /// Resolves a swap chain handle.
    pub fn swap_chain(&self, handle: SwapChainHandle) -> Option<&GalSwapChain> {
        self.swap_chains.get(handle)
    }

    /// Acquires the next backbuffer of a swap chain and returns the texture
    /// handle to render into this frame.
    pub fn acquire_next_render_target(
        &mut self,
        handle: SwapChainHandle,
    ) -> Result<TextureHandle, GalError> {
        let chain = self.swap_chains.get(handle).ok_or(GalError::InvalidHandle {
            resource: "swap chain",
        })?;
        let native_chain = chain.native;
        let backbuffer = chain.backbuffer;
        let native_texture = self.backend.acquire_next_render_target(native_chain)?;
        if let Some(texture) = self.textures.get_mut(backbuffer) {
            texture.native = native_texture;
        }
        Ok(backbuffer)
    }

    /// Presents the currently acquired backbuffer of a swap chain.
    pub fn present_render_target(&mut self, handle: SwapChainHandle) {
        let Some(chain) = self.swap_chains.get(handle) else {
            warn!("present_render_target called with a stale handle.");
            return;
        };
        let native = chain.native;
        self.backend.present_render_target(native);
    }

    /// Destroys a swap chain and its backbuffer texture.
    pub fn destroy_swap_chain(&mut self, handle: SwapChainHandle) {
        let Some(chain) = self.swap_chains.remove(handle) else {
            warn!("destroy_swap_chain called with a stale handle.");
            return;
        };
        self.destroy_texture(chain.backbuffer);
        self.defer_destroy(DeadObject::SwapChain(chain.native));
    }

    // -----------------------------------------------------------------
    // Handle resolution for the command encoder
    // -----------------------------------------------------------------

    pub(crate) fn native_shader(&self, handle: ShaderHandle) -> Option<NativeId> {
        self.shaders.get(handle).map(|s| s.native)
    }
    pub(crate) fn native_buffer(&self, handle: BufferHandle) -> Option<NativeId> {
        self.buffers.get(handle).map(|b| b.native)
    }
    pub(crate) fn native_texture(&self, handle: TextureHandle) -> Option<NativeId> {
        self.textures.get(handle).map(|t| t.native)
    }
    pub(crate) fn native_resource_view(&self, handle: ResourceViewHandle) -> Option<NativeId> {
        self.resource_views.get(handle).map(|v| v.native)
    }
    pub(crate) fn native_render_target_view(
        &self,
        handle: RenderTargetViewHandle,
    ) -> Option<NativeId> {
        self.render_target_views.get(handle).map(|v| v.native)
    }
    pub(crate) fn native_unordered_access_view(
        &self,
        handle: UnorderedAccessViewHandle,
    ) -> Option<NativeId> {
        self.unordered_access_views.get(handle).map(|v| v.native)
    }
    pub(crate) fn native_blend_state(&self, handle: BlendStateHandle) -> Option<NativeId> {
        self.blend_states.get(handle).map(|s| s.native)
    }
    pub(crate) fn native_depth_stencil_state(
        &self,
        handle: DepthStencilStateHandle,
    ) -> Option<NativeId> {
        self.depth_stencil_states.get(handle).map(|s| s.native)
    }
    pub(crate) fn native_rasterizer_state(
        &self,
        handle: RasterizerStateHandle,
    ) -> Option<NativeId> {
        self.rasterizer_states.get(handle).map(|s| s.native)
    }
    pub(crate) fn native_sampler_state(&self, handle: SamplerStateHandle) -> Option<NativeId> {
        self.sampler_states.get(handle).map(|s| s.native)
    }
    pub(crate) fn native_query(&self, handle: QueryHandle) -> Option<NativeId> {
        self.queries.get(handle).map(|q| q.native)
    }

    /// The render-target extent of a texture (used by render scopes to
    /// validate attachment sizes).
    pub(crate) fn texture_extent(&self, handle: TextureHandle) -> Option<Extent3D> {
        self.textures.get(handle).map(|t| t.desc.size)
    }

    // -----------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------

    /// Waits for the GPU, then destroys every remaining resource. Called
    /// automatically on drop.
    pub fn shutdown(&mut self) {
        if self.shutdown_done {
            return;
        }
        self.shutdown_done = true;
        let _ = self.event_tx.try_send(GalDeviceEvent::BeforeShutdown);
        self.backend.wait_idle();

        // Views go first so the dangling-view bookkeeping never trips.
        for view in self.resource_views.drain_all() {
            self.backend.deinit_resource_view(view.native);
        }
        for view in self.render_target_views.drain_all() {
            self.backend.deinit_render_target_view(view.native);
        }
        for view in self.unordered_access_views.drain_all() {
            self.backend.deinit_unordered_access_view(view.native);
        }
        for chain in self.swap_chains.drain_all() {
            self.backend.deinit_swap_chain(chain.native);
        }
        for texture in self.textures.drain_all() {
            if !texture.is_backbuffer {
                self.backend.deinit_texture(texture.native);
            }
        }
        for buffer in self.buffers.drain_all() {
            self.backend.deinit_buffer(buffer.native);
        }
        for shader in self.shaders.drain_all() {
            self.backend.deinit_shader(shader.native);
        }
        for state in self.blend_states.drain_all() {
            self.backend.deinit_blend_state(state.native);
        }
        for state in self.depth_stencil_states.drain_all() {
            self.backend.deinit_depth_stencil_state(state.native);
        }
        for state in self.rasterizer_states.drain_all() {
            self.backend.deinit_rasterizer_state(state.native);
        }
        for state in self.sampler_states.drain_all() {
            self.backend.deinit_sampler_state(state.native);
        }
        for query in self.queries.drain_all() {
            self.backend.deinit_query(query.native);
        }
        self.blend_dedup.clear();
        self.depth_stencil_dedup.clear();
        self.rasterizer_dedup.clear();
        self.sampler_dedup.clear();
        self.reclaim_dead(u64::MAX);
    }

    fn defer_destroy(&mut self, object: DeadObject) {
        self.dead_objects.push((self.frame_index, object));
    }
}

impl Drop for GalDevice {
    fn drop(&mut self) {
        self.shutdown();
    }
}
