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

//! The wgpu [`CommandRecorder`].
//!
//! `wgpu::RenderPass` mutably borrows its command encoder, which does not
//! fit streaming through a trait object, so scope contents are buffered as
//! ops and replayed in one native pass when the scope closes. Draw-time
//! pipeline state (shader + fixed-function descriptors + attachment
//! formats) is folded into concrete `wgpu::RenderPipeline`s through a
//! cache shared with the backend.

use log::{error, trace, warn};
use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use aster_core::gal::{
    BlendStateDesc, CommandRecorder, DepthStencilStateDesc, IndexFormat, NativeId,
    PrimitiveTopology, RasterizerStateDesc, RecordedRenderingSetup, ScissorRect, ShaderStage,
};
use aster_core::math::{Extent3D, LinearRgba, Origin3D, Viewport};

use super::backend::{WgpuShared, WgpuViewEntry};
use super::conversions::{color_target_state, IntoWgpu};

#[derive(Debug)]
enum RenderOp {
    Pipeline(Arc<wgpu::RenderPipeline>),
    BlendConstant([f64; 4]),
    StencilRef(u32),
    Viewport(Viewport),
    Scissor(ScissorRect),
    VertexBuffer(u32, Arc<wgpu::Buffer>, u64),
    IndexBuffer(Arc<wgpu::Buffer>, wgpu::IndexFormat, u64),
    Draw {
        vertices: std::ops::Range<u32>,
        instances: std::ops::Range<u32>,
    },
    DrawIndexed {
        indices: std::ops::Range<u32>,
        base_vertex: i32,
        instances: std::ops::Range<u32>,
    },
    DrawIndirect(Arc<wgpu::Buffer>, u64),
    PushMarker(String),
    PopMarker,
    InsertMarker(String),
}

#[derive(Debug)]
enum ComputeOp {
    Pipeline(Arc<wgpu::ComputePipeline>),
    Dispatch(u32, u32, u32),
    DispatchIndirect(Arc<wgpu::Buffer>, u64),
    PushMarker(String),
    PopMarker,
    InsertMarker(String),
}

#[derive(Debug)]
struct RenderScope {
    colors: Vec<(Arc<wgpu::TextureView>, Option<LinearRgba>, wgpu::TextureFormat)>,
    depth: Option<(
        Arc<wgpu::TextureView>,
        Option<f32>,
        Option<u8>,
        wgpu::TextureFormat,
    )>,
    sample_count: u32,
    ops: Vec<RenderOp>,
}

#[derive(Debug)]
struct ComputeScope {
    ops: Vec<ComputeOp>,
}

#[derive(Debug)]
enum Scope {
    Render(RenderScope),
    Compute(ComputeScope),
}

/// The fixed-function state a draw folds into its pipeline key.
#[derive(Debug, Default)]
struct BoundState {
    shader: Option<u64>,
    blend: Option<BlendStateDesc>,
    blend_factor: [f32; 4],
    depth_stencil: Option<DepthStencilStateDesc>,
    stencil_ref: u8,
    rasterizer: Option<RasterizerStateDesc>,
    topology: PrimitiveTopology,
    pipeline_dirty: bool,
}

#[derive(Debug)]
pub(crate) struct WgpuRecorder {
    shared: Arc<WgpuShared>,
    encoder: Option<wgpu::CommandEncoder>,
    scope: Option<Scope>,
    bound: BoundState,
    marker_depth: i32,
}

impl WgpuRecorder {
    pub(crate) fn new(shared: Arc<WgpuShared>) -> Self {
        let encoder = shared
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        Self {
            shared,
            encoder: Some(encoder),
            scope: None,
            bound: BoundState::default(),
            marker_depth: 0,
        }
    }

    pub(crate) fn take_encoder(&mut self) -> Option<wgpu::CommandEncoder> {
        debug_assert!(self.scope.is_none(), "encoder taken with an open scope");
        self.encoder.take()
    }

    fn encoder_mut(&mut self) -> &mut wgpu::CommandEncoder {
        self.encoder
            .as_mut()
            .expect("encoder only detaches at submit")
    }

    fn texture_view(&self, view: NativeId) -> Option<(Arc<wgpu::TextureView>, u64)> {
        let resources = self.shared.resources.lock().expect("resource mutex poisoned");
        match resources.views.get(&view.0) {
            Some(WgpuViewEntry::Texture { view, texture }) => Some((view.clone(), *texture)),
            _ => None,
        }
    }

    fn buffer(&self, buffer: NativeId) -> Option<Arc<wgpu::Buffer>> {
        let resources = self.shared.resources.lock().expect("resource mutex poisoned");
        resources.buffers.get(&buffer.0).cloned()
    }

    /// The pipeline-cache key: everything that feeds the wgpu pipeline.
    fn render_pipeline_key(&self, scope: &RenderScope) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.bound.shader.hash(&mut hasher);
        self.bound.blend.hash(&mut hasher);
        self.bound.depth_stencil.hash(&mut hasher);
        self.bound.rasterizer.hash(&mut hasher);
        self.bound.topology.hash(&mut hasher);
        scope.sample_count.hash(&mut hasher);
        for (_, _, format) in &scope.colors {
            format.hash(&mut hasher);
        }
        scope.depth.as_ref().map(|(_, _, _, f)| f).hash(&mut hasher);
        hasher.finish()
    }

    /// Resolves (building and caching on miss) the render pipeline for the
    /// current bound state. `None` is cached for unbuildable combinations
    /// so the error is logged once, not per draw.
    fn resolve_render_pipeline(&self, scope: &RenderScope) -> Option<Arc<wgpu::RenderPipeline>> {
        let key = self.render_pipeline_key(scope);
        if let Some(cached) = self
            .shared
            .render_pipelines
            .lock()
            .expect("pipeline mutex poisoned")
            .get(&key)
        {
            return cached.clone();
        }

        let built = self.build_render_pipeline(scope);
        self.shared
            .render_pipelines
            .lock()
            .expect("pipeline mutex poisoned")
            .insert(key, built.clone());
        built
    }

    fn build_render_pipeline(&self, scope: &RenderScope) -> Option<Arc<wgpu::RenderPipeline>> {
        let shader_id = self.bound.shader?;
        let shader = {
            let resources = self.shared.resources.lock().expect("resource mutex poisoned");
            resources.shaders.get(&shader_id).cloned()
        }?;
        let Some((vertex_module, vertex_entry)) = &shader.vertex else {
            error!("Draw with a shader that has no vertex stage; skipping.");
            return None;
        };

        let blend = self.bound.blend.clone().unwrap_or_default();
        let raster = self.bound.rasterizer.unwrap_or_default();

        let targets: Vec<Option<wgpu::ColorTargetState>> = scope
            .colors
            .iter()
            .enumerate()
            .map(|(slot, (_, _, format))| {
                let slot_blend = blend.render_targets.get(slot).copied().unwrap_or_default();
                Some(color_target_state(*format, &slot_blend))
            })
            .collect();

        let depth_stencil = scope.depth.as_ref().map(|(_, _, _, format)| {
            let desc = self.bound.depth_stencil.unwrap_or_default();
            wgpu::DepthStencilState {
                format: *format,
                depth_write_enabled: desc.depth_write,
                depth_compare: if desc.depth_test {
                    desc.depth_compare.into_wgpu()
                } else {
                    wgpu::CompareFunction::Always
                },
                stencil: wgpu::StencilState {
                    front: desc.front_face.into_wgpu(),
                    back: desc.back_face.into_wgpu(),
                    read_mask: desc.stencil_read_mask as u32,
                    write_mask: desc.stencil_write_mask as u32,
                },
                bias: wgpu::DepthBiasState {
                    constant: raster.depth_bias,
                    slope_scale: raster.depth_bias_slope_scale,
                    clamp: raster.depth_bias_clamp,
                },
            }
        });

        // Binding layouts come from shader reflection in the full shader
        // pipeline; this backend currently builds bindless-style pipelines
        // with an empty layout.
        let layout = self
            .shared
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: None,
                bind_group_layouts: &[],
                immediate_size: 0,
            });

        let fragment = shader.pixel.as_ref().map(|(module, entry)| wgpu::FragmentState {
            module,
            entry_point: Some(entry.as_str()),
            targets: &targets,
            compilation_options: Default::default(),
        });

        let pipeline = self
            .shared
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: None,
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: vertex_module,
                    entry_point: Some(vertex_entry.as_str()),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment,
                primitive: wgpu::PrimitiveState {
                    topology: self.bound.topology.into_wgpu(),
                    strip_index_format: None,
                    front_face: raster.front_face.into_wgpu(),
                    cull_mode: raster.cull_mode.into_wgpu(),
                    polygon_mode: raster.fill_mode.into_wgpu(),
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil,
                multisample: wgpu::MultisampleState {
                    count: scope.sample_count,
                    mask: !0,
                    alpha_to_coverage_enabled: blend.alpha_to_coverage,
                },
                multiview_mask: None,
                cache: None,
            });
        Some(Arc::new(pipeline))
    }

    fn resolve_compute_pipeline(&self) -> Option<Arc<wgpu::ComputePipeline>> {
        let shader_id = self.bound.shader?;
        if let Some(cached) = self
            .shared
            .compute_pipelines
            .lock()
            .expect("pipeline mutex poisoned")
            .get(&shader_id)
        {
            return cached.clone();
        }

        let built = (|| {
            let shader = {
                let resources = self.shared.resources.lock().expect("resource mutex poisoned");
                resources.shaders.get(&shader_id).cloned()
            }?;
            let Some((module, entry)) = &shader.compute else {
                error!("Dispatch with a shader that has no compute stage; skipping.");
                return None;
            };
            let layout = self
                .shared
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: None,
                    bind_group_layouts: &[],
                    immediate_size: 0,
                });
            Some(Arc::new(self.shared.device.create_compute_pipeline(
                &wgpu::ComputePipelineDescriptor {
                    label: None,
                    layout: Some(&layout),
                    module,
                    entry_point: Some(entry.as_str()),
                    compilation_options: Default::default(),
                    cache: None,
                },
            )))
        })();

        self.shared
            .compute_pipelines
            .lock()
            .expect("pipeline mutex poisoned")
            .insert(shader_id, built.clone());
        built
    }

    fn render_ops(&mut self) -> Option<&mut Vec<RenderOp>> {
        match &mut self.scope {
            Some(Scope::Render(scope)) => Some(&mut scope.ops),
            _ => None,
        }
    }

    fn push_draw_prelude(&mut self) -> bool {
        let Some(Scope::Render(scope)) = &self.scope else {
            warn!("Draw recorded outside a render scope; dropped.");
            return false;
        };
        if !self.bound.pipeline_dirty {
            return true;
        }
        let Some(pipeline) = self.resolve_render_pipeline(scope) else {
            return false;
        };
        let blend_factor = self.bound.blend_factor.map(f64::from);
        let stencil_ref = u32::from(self.bound.stencil_ref);
        if let Some(Scope::Render(scope)) = &mut self.scope {
            scope.ops.push(RenderOp::Pipeline(pipeline));
            scope.ops.push(RenderOp::BlendConstant(blend_factor));
            scope.ops.push(RenderOp::StencilRef(stencil_ref));
        }
        self.bound.pipeline_dirty = false;
        true
    }

    fn replay_render_scope(&mut self, scope: RenderScope) {
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> = scope
            .colors
            .iter()
            .map(|(view, clear, _)| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: match clear {
                            Some(color) => wgpu::LoadOp::Clear(wgpu::Color {
                                r: f64::from(color.r),
                                g: f64::from(color.g),
                                b: f64::from(color.b),
                                a: f64::from(color.a),
                            }),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();

        let depth_stencil_attachment =
            scope
                .depth
                .as_ref()
                .map(|(view, clear_depth, clear_stencil, format)| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: match clear_depth {
                                Some(depth) => wgpu::LoadOp::Clear(*depth),
                                None => wgpu::LoadOp::Load,
                            },
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: format.has_stencil_aspect().then(|| wgpu::Operations {
                            load: match clear_stencil {
                                Some(stencil) => wgpu::LoadOp::Clear(u32::from(*stencil)),
                                None => wgpu::LoadOp::Load,
                            },
                            store: wgpu::StoreOp::Store,
                        }),
                    }
                });

        let encoder = self
            .encoder
            .as_mut()
            .expect("encoder only detaches at submit");
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: None,
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for op in &scope.ops {
            match op {
                RenderOp::Pipeline(pipeline) => pass.set_pipeline(pipeline),
                RenderOp::BlendConstant(color) => pass.set_blend_constant(wgpu::Color {
                    r: color[0],
                    g: color[1],
                    b: color[2],
                    a: color[3],
                }),
                RenderOp::StencilRef(reference) => pass.set_stencil_reference(*reference),
                RenderOp::Viewport(viewport) => pass.set_viewport(
                    viewport.x,
                    viewport.y,
                    viewport.width.max(1.0),
                    viewport.height.max(1.0),
                    viewport.min_depth,
                    viewport.max_depth,
                ),
                RenderOp::Scissor(rect) => pass.set_scissor_rect(
                    rect.x.max(0) as u32,
                    rect.y.max(0) as u32,
                    rect.width,
                    rect.height,
                ),
                RenderOp::VertexBuffer(slot, buffer, offset) => {
                    pass.set_vertex_buffer(*slot, buffer.slice(*offset..));
                }
                RenderOp::IndexBuffer(buffer, format, offset) => {
                    pass.set_index_buffer(buffer.slice(*offset..), *format);
                }
                RenderOp::Draw { vertices, instances } => {
                    pass.draw(vertices.clone(), instances.clone());
                }
                RenderOp::DrawIndexed {
                    indices,
                    base_vertex,
                    instances,
                } => {
                    pass.draw_indexed(indices.clone(), *base_vertex, instances.clone());
                }
                RenderOp::DrawIndirect(buffer, offset) => pass.draw_indirect(buffer, *offset),
                RenderOp::PushMarker(label) => pass.push_debug_group(label),
                RenderOp::PopMarker => pass.pop_debug_group(),
                RenderOp::InsertMarker(label) => pass.insert_debug_marker(label),
            }
        }
    }

    fn replay_compute_scope(&mut self, scope: ComputeScope) {
        let encoder = self
            .encoder
            .as_mut()
            .expect("encoder only detaches at submit");
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: None,
            timestamp_writes: None,
        });
        for op in &scope.ops {
            match op {
                ComputeOp::Pipeline(pipeline) => pass.set_pipeline(pipeline),
                ComputeOp::Dispatch(x, y, z) => pass.dispatch_workgroups(*x, *y, *z),
                ComputeOp::DispatchIndirect(buffer, offset) => {
                    pass.dispatch_workgroups_indirect(buffer, *offset);
                }
                ComputeOp::PushMarker(label) => pass.push_debug_group(label),
                ComputeOp::PopMarker => pass.pop_debug_group(),
                ComputeOp::InsertMarker(label) => pass.insert_debug_marker(label),
            }
        }
    }
}

/// Stencil-aspect probe for the formats this GAL can produce.
trait HasStencil {
    fn has_stencil_aspect(&self) -> bool;
}

impl HasStencil for wgpu::TextureFormat {
    fn has_stencil_aspect(&self) -> bool {
        matches!(
            self,
            wgpu::TextureFormat::Depth24PlusStencil8 | wgpu::TextureFormat::Depth32FloatStencil8
        )
    }
}

impl CommandRecorder for WgpuRecorder {
    fn begin_rendering(&mut self, setup: &RecordedRenderingSetup) {
        debug_assert!(self.scope.is_none(), "scope already open");
        let mut colors = Vec::with_capacity(setup.color_targets.len());
        let mut sample_count = 1;
        for target in &setup.color_targets {
            let Some((view, texture_id)) = self.texture_view(target.view) else {
                error!("begin_rendering: color target view does not resolve; dropped.");
                continue;
            };
            let (format, samples) = {
                let resources = self.shared.resources.lock().expect("resource mutex poisoned");
                match resources.textures.get(&texture_id) {
                    Some(entry) => (entry.format, entry.sample_count),
                    None => (wgpu::TextureFormat::Rgba8Unorm, 1),
                }
            };
            sample_count = sample_count.max(samples);
            colors.push((view, target.clear, format));
        }
        let depth = setup.depth_target.as_ref().and_then(|target| {
            let (view, texture_id) = self.texture_view(target.view)?;
            let (format, samples) = {
                let resources = self.shared.resources.lock().expect("resource mutex poisoned");
                match resources.textures.get(&texture_id) {
                    Some(entry) => (entry.format, entry.sample_count),
                    None => (wgpu::TextureFormat::Depth24PlusStencil8, 1),
                }
            };
            sample_count = sample_count.max(samples);
            Some((view, target.clear_depth, target.clear_stencil, format))
        });

        self.bound = BoundState {
            pipeline_dirty: true,
            ..BoundState::default()
        };
        self.scope = Some(Scope::Render(RenderScope {
            colors,
            depth,
            sample_count,
            ops: Vec::new(),
        }));
    }

    fn end_rendering(&mut self) {
        match self.scope.take() {
            Some(Scope::Render(scope)) => self.replay_render_scope(scope),
            other => {
                debug_assert!(false, "end_rendering without a render scope: {other:?}");
            }
        }
    }

    fn begin_compute(&mut self) {
        debug_assert!(self.scope.is_none(), "scope already open");
        self.bound = BoundState {
            pipeline_dirty: true,
            ..BoundState::default()
        };
        self.scope = Some(Scope::Compute(ComputeScope { ops: Vec::new() }));
    }

    fn end_compute(&mut self) {
        match self.scope.take() {
            Some(Scope::Compute(scope)) => self.replay_compute_scope(scope),
            other => {
                debug_assert!(false, "end_compute without a compute scope: {other:?}");
            }
        }
    }

    fn push_marker(&mut self, label: &str) {
        self.marker_depth += 1;
        match &mut self.scope {
            Some(Scope::Render(scope)) => scope.ops.push(RenderOp::PushMarker(label.to_string())),
            Some(Scope::Compute(scope)) => {
                scope.ops.push(ComputeOp::PushMarker(label.to_string()))
            }
            None => self.encoder_mut().push_debug_group(label),
        }
    }

    fn pop_marker(&mut self) {
        self.marker_depth -= 1;
        debug_assert!(self.marker_depth >= 0, "pop_marker without matching push");
        match &mut self.scope {
            Some(Scope::Render(scope)) => scope.ops.push(RenderOp::PopMarker),
            Some(Scope::Compute(scope)) => scope.ops.push(ComputeOp::PopMarker),
            None => self.encoder_mut().pop_debug_group(),
        }
    }

    fn insert_event_marker(&mut self, label: &str) {
        match &mut self.scope {
            Some(Scope::Render(scope)) => scope.ops.push(RenderOp::InsertMarker(label.to_string())),
            Some(Scope::Compute(scope)) => {
                scope.ops.push(ComputeOp::InsertMarker(label.to_string()))
            }
            None => self.encoder_mut().insert_debug_marker(label),
        }
    }

    fn set_shader(&mut self, shader: NativeId) {
        self.bound.shader = Some(shader.0);
        self.bound.pipeline_dirty = true;
    }

    fn set_constant_buffer(&mut self, slot: u32, _buffer: Option<NativeId>) {
        // Resource binding requires shader-reflected layouts, which the
        // (out-of-scope) shader pipeline provides.
        trace!("wgpu recorder: constant buffer slot {slot} binding deferred to reflection.");
    }

    fn set_resource_view(&mut self, _stage: ShaderStage, slot: u32, _view: Option<NativeId>) {
        trace!("wgpu recorder: resource view slot {slot} binding deferred to reflection.");
    }

    fn set_sampler_state(&mut self, _stage: ShaderStage, slot: u32, _sampler: Option<NativeId>) {
        trace!("wgpu recorder: sampler slot {slot} binding deferred to reflection.");
    }

    fn set_unordered_access_view(&mut self, slot: u32, _view: Option<NativeId>) {
        trace!("wgpu recorder: UAV slot {slot} binding deferred to reflection.");
    }

    fn set_blend_state(&mut self, state: Option<NativeId>, blend_factor: [f32; 4]) {
        self.bound.blend = state.and_then(|id| {
            let resources = self.shared.resources.lock().expect("resource mutex poisoned");
            resources.blend_states.get(&id.0).cloned()
        });
        self.bound.blend_factor = blend_factor;
        self.bound.pipeline_dirty = true;
    }

    fn set_depth_stencil_state(&mut self, state: Option<NativeId>, stencil_ref: u8) {
        self.bound.depth_stencil = state.and_then(|id| {
            let resources = self.shared.resources.lock().expect("resource mutex poisoned");
            resources.depth_stencil_states.get(&id.0).copied()
        });
        self.bound.stencil_ref = stencil_ref;
        self.bound.pipeline_dirty = true;
    }

    fn set_rasterizer_state(&mut self, state: Option<NativeId>) {
        self.bound.rasterizer = state.and_then(|id| {
            let resources = self.shared.resources.lock().expect("resource mutex poisoned");
            resources.rasterizer_states.get(&id.0).copied()
        });
        self.bound.pipeline_dirty = true;
    }

    fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.bound.topology = topology;
        self.bound.pipeline_dirty = true;
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        if let Some(ops) = self.render_ops() {
            ops.push(RenderOp::Viewport(viewport));
        }
    }

    fn set_scissor_rect(&mut self, rect: ScissorRect) {
        if let Some(ops) = self.render_ops() {
            ops.push(RenderOp::Scissor(rect));
        }
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: NativeId, offset: u64) {
        let Some(buffer) = self.buffer(buffer) else {
            error!("set_vertex_buffer: unknown native buffer.");
            return;
        };
        if let Some(ops) = self.render_ops() {
            ops.push(RenderOp::VertexBuffer(slot, buffer, offset));
        }
    }

    fn set_index_buffer(&mut self, buffer: NativeId, format: IndexFormat, offset: u64) {
        let Some(buffer) = self.buffer(buffer) else {
            error!("set_index_buffer: unknown native buffer.");
            return;
        };
        let format = format.into_wgpu();
        if let Some(ops) = self.render_ops() {
            ops.push(RenderOp::IndexBuffer(buffer, format, offset));
        }
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) {
        if !self.push_draw_prelude() {
            return;
        }
        if let Some(ops) = self.render_ops() {
            ops.push(RenderOp::Draw {
                vertices: first_vertex..first_vertex + vertex_count,
                instances: 0..1,
            });
        }
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, base_vertex: i32) {
        if !self.push_draw_prelude() {
            return;
        }
        if let Some(ops) = self.render_ops() {
            ops.push(RenderOp::DrawIndexed {
                indices: first_index..first_index + index_count,
                base_vertex,
                instances: 0..1,
            });
        }
    }

    fn draw_instanced(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32) {
        if !self.push_draw_prelude() {
            return;
        }
        if let Some(ops) = self.render_ops() {
            ops.push(RenderOp::Draw {
                vertices: first_vertex..first_vertex + vertex_count,
                instances: 0..instance_count,
            });
        }
    }

    fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
    ) {
        if !self.push_draw_prelude() {
            return;
        }
        if let Some(ops) = self.render_ops() {
            ops.push(RenderOp::DrawIndexed {
                indices: first_index..first_index + index_count,
                base_vertex,
                instances: 0..instance_count,
            });
        }
    }

    fn draw_indirect(&mut self, args: NativeId, offset: u64) {
        let Some(buffer) = self.buffer(args) else {
            error!("draw_indirect: unknown native buffer.");
            return;
        };
        if !self.push_draw_prelude() {
            return;
        }
        if let Some(ops) = self.render_ops() {
            ops.push(RenderOp::DrawIndirect(buffer, offset));
        }
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        let Some(pipeline) = self.resolve_compute_pipeline() else {
            return;
        };
        match &mut self.scope {
            Some(Scope::Compute(scope)) => {
                if self.bound.pipeline_dirty {
                    scope.ops.push(ComputeOp::Pipeline(pipeline));
                    self.bound.pipeline_dirty = false;
                }
                scope.ops.push(ComputeOp::Dispatch(x, y, z));
            }
            _ => warn!("Dispatch recorded outside a compute scope; dropped."),
        }
    }

    fn dispatch_indirect(&mut self, args: NativeId, offset: u64) {
        let Some(buffer) = self.buffer(args) else {
            error!("dispatch_indirect: unknown native buffer.");
            return;
        };
        let Some(pipeline) = self.resolve_compute_pipeline() else {
            return;
        };
        match &mut self.scope {
            Some(Scope::Compute(scope)) => {
                if self.bound.pipeline_dirty {
                    scope.ops.push(ComputeOp::Pipeline(pipeline));
                    self.bound.pipeline_dirty = false;
                }
                scope.ops.push(ComputeOp::DispatchIndirect(buffer, offset));
            }
            _ => warn!("Dispatch recorded outside a compute scope; dropped."),
        }
    }

    fn update_buffer(&mut self, buffer: NativeId, offset: u64, data: &[u8]) {
        let Some(buffer) = self.buffer(buffer) else {
            error!("update_buffer: unknown native buffer.");
            return;
        };
        self.shared.queue.write_buffer(&buffer, offset, data);
    }

    fn copy_buffer(&mut self, dst: NativeId, src: NativeId) {
        let (Some(dst), Some(src)) = (self.buffer(dst), self.buffer(src)) else {
            error!("copy_buffer: unknown native buffer.");
            return;
        };
        let size = dst.size().min(src.size());
        self.encoder_mut().copy_buffer_to_buffer(&src, 0, &dst, 0, size);
    }

    fn copy_buffer_region(
        &mut self,
        dst: NativeId,
        dst_offset: u64,
        src: NativeId,
        src_offset: u64,
        byte_count: u64,
    ) {
        let (Some(dst), Some(src)) = (self.buffer(dst), self.buffer(src)) else {
            error!("copy_buffer_region: unknown native buffer.");
            return;
        };
        self.encoder_mut()
            .copy_buffer_to_buffer(&src, src_offset, &dst, dst_offset, byte_count);
    }

    fn copy_texture(&mut self, dst: NativeId, src: NativeId) {
        let (dst_texture, extent) = {
            let resources = self.shared.resources.lock().expect("resource mutex poisoned");
            let (Some(dst), Some(src)) = (
                resources.textures.get(&dst.0),
                resources.textures.get(&src.0),
            ) else {
                error!("copy_texture: unknown native texture.");
                return;
            };
            let extent = Extent3D {
                width: dst.size.width.min(src.size.width),
                height: dst.size.height.min(src.size.height),
                depth_or_array_layers: dst
                    .size
                    .depth_or_array_layers
                    .min(src.size.depth_or_array_layers),
            };
            ((dst.texture.clone(), src.texture.clone()), extent)
        };
        let (dst, src) = dst_texture;
        self.encoder_mut().copy_texture_to_texture(
            src.as_image_copy(),
            dst.as_image_copy(),
            extent.into_wgpu(),
        );
    }

    fn update_texture(
        &mut self,
        dst: NativeId,
        mip_level: u32,
        origin: Origin3D,
        extent: Extent3D,
        data: &[u8],
        bytes_per_row: u32,
    ) {
        let texture = {
            let resources = self.shared.resources.lock().expect("resource mutex poisoned");
            match resources.textures.get(&dst.0) {
                Some(entry) => entry.texture.clone(),
                None => {
                    error!("update_texture: unknown native texture.");
                    return;
                }
            }
        };
        self.shared.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level,
                origin: origin.into_wgpu(),
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(extent.height),
            },
            extent.into_wgpu(),
        );
    }

    fn resolve_texture(&mut self, _dst: NativeId, _src: NativeId) {
        // MSAA resolves ride the render-pass resolve_target; a standalone
        // resolve has no wgpu equivalent.
        warn!("resolve_texture outside a render scope is not supported by the wgpu backend.");
    }

    fn generate_mip_maps(&mut self, _view: NativeId) {
        warn!("generate_mip_maps requires the blit shader pipeline; skipped.");
    }

    fn clear_unordered_access_view_f32(&mut self, _view: NativeId, _values: [f32; 4]) {
        // Arbitrary-value fills need a tiny compute kernel (wgpu's own
        // clear only zeroes, behind CLEAR_TEXTURE).
        warn!("clear_unordered_access_view_f32 requires the fill kernel; skipped.");
    }

    fn clear_unordered_access_view_u32(&mut self, _view: NativeId, _values: [u32; 4]) {
        warn!("clear_unordered_access_view_u32 requires the fill kernel; skipped.");
    }

    fn begin_query(&mut self, _query: NativeId) {
        trace!("wgpu recorder: queries resolve through the profiler path; begin ignored.");
    }

    fn end_query(&mut self, _query: NativeId) {
        trace!("wgpu recorder: queries resolve through the profiler path; end ignored.");
    }

    fn flush(&mut self) {}

    fn as_any(&mut self) -> &mut dyn Any {
        self
    }
}
