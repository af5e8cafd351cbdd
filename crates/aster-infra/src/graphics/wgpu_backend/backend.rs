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

//! The wgpu [`GalBackend`] implementation.
//!
//! Native objects live in maps shared with the recorders (which need them
//! at replay time); state objects have no wgpu equivalent and are kept as
//! descriptors that the recorder's pipeline cache folds into concrete
//! `wgpu::RenderPipeline`s at draw time.

use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use aster_core::gal::{
    AdapterDeviceType, AdapterInfo, BackendError, BlendStateDesc, BufferDesc, CommandRecorder,
    DepthStencilStateDesc, DeviceCapabilities, DeviceCreationConfig, GalBackend,
    GraphicsBackendType, NativeId, QueryDesc, QueryKind, RasterizerStateDesc,
    RenderTargetViewDesc, ResourceViewDesc, SamplerStateDesc, ShaderDesc, ShaderStageDesc,
    SwapChainDesc, SwapChainInit, TextureDesc, TextureFormat, TextureInitData,
    UnorderedAccessViewDesc, ViewTarget,
};
use aster_core::math::Extent3D;

use super::context::WgpuGraphicsContext;
use super::conversions::{from_wgpu_texture_format, IntoWgpu};
use super::recorder::WgpuRecorder;

#[derive(Debug)]
pub(crate) struct WgpuTextureEntry {
    pub texture: Arc<wgpu::Texture>,
    pub size: Extent3D,
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
}

#[derive(Debug)]
pub(crate) enum WgpuViewEntry {
    /// A view over a texture, with the owning texture's native id.
    Texture {
        view: Arc<wgpu::TextureView>,
        texture: u64,
    },
    /// A logical view over a buffer (wgpu binds buffers directly).
    Buffer { buffer: u64 },
}

#[derive(Debug)]
pub(crate) struct WgpuShaderEntry {
    pub vertex: Option<(wgpu::ShaderModule, String)>,
    pub pixel: Option<(wgpu::ShaderModule, String)>,
    pub compute: Option<(wgpu::ShaderModule, String)>,
}

/// Everything the recorders need to resolve native ids at replay time.
#[derive(Debug, Default)]
pub(crate) struct WgpuResources {
    pub textures: HashMap<u64, WgpuTextureEntry>,
    pub buffers: HashMap<u64, Arc<wgpu::Buffer>>,
    pub views: HashMap<u64, WgpuViewEntry>,
    pub samplers: HashMap<u64, Arc<wgpu::Sampler>>,
    pub shaders: HashMap<u64, Arc<WgpuShaderEntry>>,
    pub blend_states: HashMap<u64, BlendStateDesc>,
    pub depth_stencil_states: HashMap<u64, DepthStencilStateDesc>,
    pub rasterizer_states: HashMap<u64, RasterizerStateDesc>,
    pub queries: HashMap<u64, wgpu::QuerySet>,
}

/// State shared between the backend and its recorders.
#[derive(Debug)]
pub(crate) struct WgpuShared {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub resources: Mutex<WgpuResources>,
    pub render_pipelines: Mutex<HashMap<u64, Option<Arc<wgpu::RenderPipeline>>>>,
    pub compute_pipelines: Mutex<HashMap<u64, Option<Arc<wgpu::ComputePipeline>>>>,
}

#[derive(Debug)]
struct SurfaceEntry {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    current: Option<wgpu::SurfaceTexture>,
    backbuffer_id: u64,
}

/// The wgpu backend. One native API (Vulkan/D3D12/Metal/GL) is selected at
/// init time through the caller's preference list.
#[derive(Debug)]
pub struct WgpuBackend {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    adapter_info: wgpu::AdapterInfo,
    features: wgpu::Features,
    limits: wgpu::Limits,
    shared: Arc<WgpuShared>,
    surfaces: HashMap<u64, SurfaceEntry>,
    next_id: u64,
    frame_index: u64,
    /// Highest frame index whose submitted GPU work has completed.
    retired: Arc<Mutex<u64>>,
}

impl WgpuBackend {
    /// Initializes wgpu and wraps it in the backend interface.
    pub fn new(config: &DeviceCreationConfig) -> Result<Self, BackendError> {
        let context = WgpuGraphicsContext::new(config).map_err(|err| {
            BackendError::NativeCallFailed {
                operation: "wgpu initialization".to_string(),
                details: err.to_string(),
            }
        })?;
        let WgpuGraphicsContext {
            instance,
            adapter,
            device,
            queue,
            adapter_info,
            features,
            limits,
        } = context;
        info!("wgpu backend ready on \"{}\".", adapter_info.name);
        Ok(Self {
            instance,
            adapter,
            adapter_info,
            features,
            limits,
            shared: Arc::new(WgpuShared {
                device,
                queue,
                resources: Mutex::new(WgpuResources::default()),
                render_pipelines: Mutex::new(HashMap::new()),
                compute_pipelines: Mutex::new(HashMap::new()),
            }),
            surfaces: HashMap::new(),
            next_id: 1,
            frame_index: 0,
            retired: Arc::new(Mutex::new(0)),
        })
    }

    fn allocate(&mut self) -> NativeId {
        let id = self.next_id;
        self.next_id += 1;
        NativeId(id)
    }

    fn resources(&self) -> std::sync::MutexGuard<'_, WgpuResources> {
        self.shared.resources.lock().expect("resource mutex poisoned")
    }

    fn create_shader_module(
        &self,
        stage: &ShaderStageDesc,
        label: &str,
    ) -> Result<(wgpu::ShaderModule, String), BackendError> {
        // Bytecode reaching this backend must be WGSL text; cross-compiled
        // blobs belong to the (out-of-scope) shader pipeline.
        let source = std::str::from_utf8(&stage.bytecode).map_err(|_| {
            BackendError::NativeCallFailed {
                operation: "create_shader_module".to_string(),
                details: format!("'{label}' bytecode is not WGSL text"),
            }
        })?;
        let module = self
            .shared
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        Ok((module, stage.entry_point.clone()))
    }
}

impl GalBackend for WgpuBackend {
    fn backend_type(&self) -> GraphicsBackendType {
        match self.adapter_info.backend {
            wgpu::Backend::Vulkan => GraphicsBackendType::Vulkan,
            wgpu::Backend::Metal => GraphicsBackendType::Metal,
            wgpu::Backend::Dx12 => GraphicsBackendType::Dx12,
            wgpu::Backend::Gl => GraphicsBackendType::OpenGL,
            _ => GraphicsBackendType::Unknown,
        }
    }

    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities {
            // wgpu resources are created through thread-safe handles.
            multithreaded_resource_creation: true,
            max_texture_dimension_2d: self.limits.max_texture_dimension_2d,
            max_texture_array_layers: self.limits.max_texture_array_layers,
            max_constant_buffer_size: u64::from(self.limits.max_uniform_buffer_binding_size),
            compute_shaders: true,
            timestamp_queries: self.features.contains(wgpu::Features::TIMESTAMP_QUERY),
            indirect_execution: true,
            ..DeviceCapabilities::default()
        }
    }

    fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            name: self.adapter_info.name.clone(),
            backend: self.backend_type(),
            device_type: match self.adapter_info.device_type {
                wgpu::DeviceType::IntegratedGpu => AdapterDeviceType::IntegratedGpu,
                wgpu::DeviceType::DiscreteGpu => AdapterDeviceType::DiscreteGpu,
                wgpu::DeviceType::VirtualGpu => AdapterDeviceType::VirtualGpu,
                wgpu::DeviceType::Cpu => AdapterDeviceType::Cpu,
                wgpu::DeviceType::Other => AdapterDeviceType::Unknown,
            },
            vendor_id: self.adapter_info.vendor,
            driver_info: self.adapter_info.driver_info.clone(),
        }
    }

    fn init_texture(
        &mut self,
        desc: &TextureDesc,
        initial_data: &[TextureInitData<'_>],
    ) -> Result<NativeId, BackendError> {
        let format = desc.format.into_wgpu();
        let texture = self.shared.device.create_texture(&wgpu::TextureDescriptor {
            label: None,
            size: desc.size.into_wgpu(),
            mip_level_count: desc.mip_level_count,
            sample_count: desc.sample_count.into_wgpu(),
            dimension: desc.texture_type.into_wgpu(),
            format,
            usage: desc.usage.into_wgpu() | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, data) in initial_data.iter().enumerate() {
            let mip_extent = Extent3D {
                width: (desc.size.width >> mip_level).max(1),
                height: (desc.size.height >> mip_level).max(1),
                depth_or_array_layers: desc.size.depth_or_array_layers,
            };
            self.shared.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data.data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(data.bytes_per_row),
                    rows_per_image: Some(mip_extent.height),
                },
                mip_extent.into_wgpu(),
            );
        }

        let id = self.allocate();
        self.resources().textures.insert(
            id.0,
            WgpuTextureEntry {
                texture: Arc::new(texture),
                size: desc.size,
                format,
                sample_count: desc.sample_count.as_u32(),
            },
        );
        Ok(id)
    }

    fn deinit_texture(&mut self, texture: NativeId) {
        self.resources().textures.remove(&texture.0);
    }

    fn init_buffer(
        &mut self,
        desc: &BufferDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<NativeId, BackendError> {
        let buffer = self.shared.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size: desc.size,
            usage: desc.usage.into_wgpu() | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if let Some(data) = initial_data {
            self.shared.queue.write_buffer(&buffer, 0, data);
        }
        let id = self.allocate();
        self.resources().buffers.insert(id.0, Arc::new(buffer));
        Ok(id)
    }

    fn deinit_buffer(&mut self, buffer: NativeId) {
        self.resources().buffers.remove(&buffer.0);
    }

    fn init_shader(&mut self, desc: &ShaderDesc) -> Result<NativeId, BackendError> {
        let vertex = desc
            .vertex
            .as_ref()
            .map(|stage| self.create_shader_module(stage, &desc.debug_name))
            .transpose()?;
        let pixel = desc
            .pixel
            .as_ref()
            .map(|stage| self.create_shader_module(stage, &desc.debug_name))
            .transpose()?;
        let compute = desc
            .compute
            .as_ref()
            .map(|stage| self.create_shader_module(stage, &desc.debug_name))
            .transpose()?;

        let id = self.allocate();
        self.resources().shaders.insert(
            id.0,
            Arc::new(WgpuShaderEntry {
                vertex,
                pixel,
                compute,
            }),
        );
        Ok(id)
    }

    fn deinit_shader(&mut self, shader: NativeId) {
        self.resources().shaders.remove(&shader.0);
        // Pipelines built from this shader die with it.
        self.shared
            .render_pipelines
            .lock()
            .expect("pipeline mutex poisoned")
            .clear();
        self.shared
            .compute_pipelines
            .lock()
            .expect("pipeline mutex poisoned")
            .remove(&shader.0);
    }

    fn init_blend_state(&mut self, desc: &BlendStateDesc) -> Result<NativeId, BackendError> {
        let id = self.allocate();
        self.resources().blend_states.insert(id.0, desc.clone());
        Ok(id)
    }

    fn deinit_blend_state(&mut self, state: NativeId) {
        self.resources().blend_states.remove(&state.0);
    }

    fn init_depth_stencil_state(
        &mut self,
        desc: &DepthStencilStateDesc,
    ) -> Result<NativeId, BackendError> {
        let id = self.allocate();
        self.resources().depth_stencil_states.insert(id.0, *desc);
        Ok(id)
    }

    fn deinit_depth_stencil_state(&mut self, state: NativeId) {
        self.resources().depth_stencil_states.remove(&state.0);
    }

    fn init_rasterizer_state(
        &mut self,
        desc: &RasterizerStateDesc,
    ) -> Result<NativeId, BackendError> {
        let id = self.allocate();
        self.resources().rasterizer_states.insert(id.0, *desc);
        Ok(id)
    }

    fn deinit_rasterizer_state(&mut self, state: NativeId) {
        self.resources().rasterizer_states.remove(&state.0);
    }

    fn init_sampler_state(&mut self, desc: &SamplerStateDesc) -> Result<NativeId, BackendError> {
        let sampler = self.shared.device.create_sampler(&wgpu::SamplerDescriptor {
            label: None,
            address_mode_u: desc.address_u.into_wgpu(),
            address_mode_v: desc.address_v.into_wgpu(),
            address_mode_w: desc.address_w.into_wgpu(),
            mag_filter: desc.mag_filter.into_wgpu(),
            min_filter: desc.min_filter.into_wgpu(),
            mipmap_filter: desc.mip_filter.into_wgpu(),
            lod_min_clamp: desc.lod_min,
            lod_max_clamp: desc.lod_max,
            compare: desc.compare.map(IntoWgpu::into_wgpu),
            anisotropy_clamp: desc.max_anisotropy,
            border_color: None,
        });
        let id = self.allocate();
        self.resources().samplers.insert(id.0, Arc::new(sampler));
        Ok(id)
    }

    fn deinit_sampler_state(&mut self, state: NativeId) {
        self.resources().samplers.remove(&state.0);
    }

    fn init_resource_view(
        &mut self,
        target: ViewTarget,
        desc: &ResourceViewDesc,
    ) -> Result<NativeId, BackendError> {
        let id = self.allocate();
        match target {
            ViewTarget::Texture(texture_id) => {
                let view = {
                    let resources = self.resources();
                    let entry = resources.textures.get(&texture_id.0).ok_or_else(|| {
                        BackendError::NativeCallFailed {
                            operation: "init_resource_view".to_string(),
                            details: "unknown native texture".to_string(),
                        }
                    })?;
                    entry.texture.create_view(&wgpu::TextureViewDescriptor {
                        label: None,
                        format: desc.format.map(IntoWgpu::into_wgpu),
                        base_mip_level: desc.base_mip_level,
                        mip_level_count: (desc.mip_level_count > 0)
                            .then_some(desc.mip_level_count),
                        base_array_layer: desc.base_array_layer,
                        array_layer_count: (desc.array_layer_count > 0)
                            .then_some(desc.array_layer_count),
                        ..wgpu::TextureViewDescriptor::default()
                    })
                };
                self.resources().views.insert(
                    id.0,
                    WgpuViewEntry::Texture {
                        view: Arc::new(view),
                        texture: texture_id.0,
                    },
                );
            }
            ViewTarget::Buffer(buffer_id) => {
                self.resources()
                    .views
                    .insert(id.0, WgpuViewEntry::Buffer { buffer: buffer_id.0 });
            }
        }
        Ok(id)
    }

    fn deinit_resource_view(&mut self, view: NativeId) {
        self.resources().views.remove(&view.0);
    }

    fn init_render_target_view(
        &mut self,
        texture: NativeId,
        desc: &RenderTargetViewDesc,
    ) -> Result<NativeId, BackendError> {
        let view = {
            let resources = self.resources();
            let entry = resources.textures.get(&texture.0).ok_or_else(|| {
                BackendError::NativeCallFailed {
                    operation: "init_render_target_view".to_string(),
                    details: "unknown native texture".to_string(),
                }
            })?;
            entry.texture.create_view(&wgpu::TextureViewDescriptor {
                label: None,
                format: desc.format.map(IntoWgpu::into_wgpu),
                base_mip_level: desc.mip_level,
                mip_level_count: Some(1),
                base_array_layer: desc.array_layer,
                array_layer_count: Some(1),
                ..wgpu::TextureViewDescriptor::default()
            })
        };
        let id = self.allocate();
        self.resources().views.insert(
            id.0,
            WgpuViewEntry::Texture {
                view: Arc::new(view),
                texture: texture.0,
            },
        );
        Ok(id)
    }

    fn deinit_render_target_view(&mut self, view: NativeId) {
        self.resources().views.remove(&view.0);
    }

    fn init_unordered_access_view(
        &mut self,
        target: ViewTarget,
        desc: &UnorderedAccessViewDesc,
    ) -> Result<NativeId, BackendError> {
        self.init_resource_view(
            target,
            &ResourceViewDesc {
                format: desc.format,
                base_mip_level: desc.mip_level,
                mip_level_count: 1,
                base_array_layer: desc.base_array_layer,
                array_layer_count: desc.array_layer_count,
            },
        )
    }

    fn deinit_unordered_access_view(&mut self, view: NativeId) {
        self.resources().views.remove(&view.0);
    }

    fn init_query(&mut self, desc: &QueryDesc) -> Result<NativeId, BackendError> {
        let query_type = match desc.kind {
            QueryKind::Occlusion | QueryKind::OcclusionPredicate => wgpu::QueryType::Occlusion,
            QueryKind::Timestamp => {
                if !self.features.contains(wgpu::Features::TIMESTAMP_QUERY) {
                    return Err(BackendError::Unsupported(
                        "timestamp queries are not available on this adapter".to_string(),
                    ));
                }
                wgpu::QueryType::Timestamp
            }
        };
        let query_set = self.shared.device.create_query_set(&wgpu::QuerySetDescriptor {
            label: None,
            ty: query_type,
            count: 1,
        });
        let id = self.allocate();
        self.resources().queries.insert(id.0, query_set);
        Ok(id)
    }

    fn deinit_query(&mut self, query: NativeId) {
        self.resources().queries.remove(&query.0);
    }

    fn init_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<SwapChainInit, BackendError> {
        let target = wgpu::SurfaceTargetUnsafe::RawHandle {
            raw_display_handle: desc.display,
            raw_window_handle: desc.window,
        };
        let surface = unsafe { self.instance.create_surface_unsafe(target) }.map_err(|err| {
            BackendError::NativeCallFailed {
                operation: "create_surface".to_string(),
                details: err.to_string(),
            }
        })?;

        let caps = surface.get_capabilities(&self.adapter);
        let wanted = desc.format.into_wgpu();
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| *f == wanted)
            .or_else(|| caps.formats.iter().copied().find(|f| f.is_srgb()))
            .unwrap_or(caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: desc.width.max(1),
            height: desc.height.max(1),
            present_mode: desc.present_mode.into_wgpu(),
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&self.shared.device, &config);

        let swap_chain = self.allocate();
        let backbuffer = self.allocate();
        self.surfaces.insert(
            swap_chain.0,
            SurfaceEntry {
                surface,
                config,
                current: None,
                backbuffer_id: backbuffer.0,
            },
        );

        let gal_format = from_wgpu_texture_format(format).unwrap_or(TextureFormat::Bgra8UnormSrgb);
        Ok(SwapChainInit {
            swap_chain,
            backbuffer_desc: TextureDesc::render_target(desc.width, desc.height, gal_format),
            backbuffer,
        })
    }

    fn deinit_swap_chain(&mut self, swap_chain: NativeId) {
        if let Some(entry) = self.surfaces.remove(&swap_chain.0) {
            self.resources().textures.remove(&entry.backbuffer_id);
        }
    }

    fn acquire_next_render_target(
        &mut self,
        swap_chain: NativeId,
    ) -> Result<NativeId, BackendError> {
        let entry = self.surfaces.get_mut(&swap_chain.0).ok_or_else(|| {
            BackendError::NativeCallFailed {
                operation: "acquire_next_render_target".to_string(),
                details: "unknown swap chain".to_string(),
            }
        })?;
        let surface_texture = entry.surface.get_current_texture().map_err(|err| {
            BackendError::NativeCallFailed {
                operation: "get_current_texture".to_string(),
                details: err.to_string(),
            }
        })?;

        let backbuffer_id = entry.backbuffer_id;
        let texture = surface_texture.texture.clone();
        let size = Extent3D::new_2d(entry.config.width, entry.config.height);
        let format = entry.config.format;
        entry.current = Some(surface_texture);

        self.resources().textures.insert(
            backbuffer_id,
            WgpuTextureEntry {
                texture: Arc::new(texture),
                size,
                format,
                sample_count: 1,
            },
        );
        Ok(NativeId(backbuffer_id))
    }

    fn present_render_target(&mut self, swap_chain: NativeId) {
        match self.surfaces.get_mut(&swap_chain.0) {
            Some(entry) => match entry.current.take() {
                Some(surface_texture) => surface_texture.present(),
                None => warn!("present_render_target called without an acquired backbuffer."),
            },
            None => error!("present_render_target: unknown swap chain."),
        }
    }

    fn write_buffer(
        &mut self,
        buffer: NativeId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let resources = self.resources();
        let buffer = resources.buffers.get(&buffer.0).ok_or_else(|| {
            BackendError::NativeCallFailed {
                operation: "write_buffer".to_string(),
                details: "unknown native buffer".to_string(),
            }
        })?;
        self.shared.queue.write_buffer(buffer, offset, data);
        Ok(())
    }

    fn query_result(&mut self, _query: NativeId) -> Result<Option<u64>, BackendError> {
        // Query readback runs through a resolve buffer + map; until that
        // path is wired, results stay pending.
        Ok(None)
    }

    fn create_recorder(&mut self) -> Box<dyn CommandRecorder> {
        Box::new(WgpuRecorder::new(self.shared.clone()))
    }

    fn submit(&mut self, mut recorder: Box<dyn CommandRecorder>) {
        let Some(wgpu_recorder) = recorder.as_any().downcast_mut::<WgpuRecorder>() else {
            error!("submit received a foreign recorder; dropping it.");
            return;
        };
        let Some(encoder) = wgpu_recorder.take_encoder() else {
            return;
        };
        self.shared.queue.submit(std::iter::once(encoder.finish()));

        let retired = self.retired.clone();
        let frame = self.frame_index;
        self.shared
            .queue
            .on_submitted_work_done(Box::new(move || {
                let mut retired = retired.lock().expect("retired mutex poisoned");
                *retired = (*retired).max(frame);
            }));
    }

    fn begin_frame(&mut self, frame_index: u64) {
        self.frame_index = frame_index;
    }

    fn end_frame(&mut self) -> u64 {
        // Drive completion callbacks without blocking.
        if let Err(err) = self.shared.device.poll(wgpu::PollType::Poll) {
            warn!("Device poll failed: {err:?}");
        }
        *self.retired.lock().expect("retired mutex poisoned")
    }

    fn wait_idle(&mut self) {
        if let Err(err) = self.shared.device.poll(wgpu::PollType::wait_indefinitely()) {
            warn!("Device wait failed: {err:?}");
        }
        *self.retired.lock().expect("retired mutex poisoned") = self.frame_index;
    }
}
