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

//! The opaque forward pass.

use log::{error, trace};

use crate::gal::{
    BlendStateDesc, BlendStateHandle, ColorTargetSetup, DepthStencilStateDesc,
    DepthStencilStateHandle, DepthTargetSetup, GalDevice, RasterizerStateDesc,
    RasterizerStateHandle, RenderingSetup, ShaderHandle, ShaderStage, TextureDesc,
};
use crate::math::Viewport;
use crate::pipeline::connection::PassConnection;
use crate::pipeline::error::PipelineError;
use crate::pipeline::frame_data::{ClusteredLightsProvider, InstanceDataProvider};
use crate::pipeline::node::NodePins;
use crate::pipeline::pass::{RenderPipelinePass, RenderViewContext};
use crate::pipeline::render_data::DefaultRenderDataCategories;
use crate::pipeline::view::View;

/// Shades the lit opaque and masked categories into the color target,
/// testing against the pre-pass depth.
///
/// Both pins are pass-through and alias: the pass accumulates into the
/// incoming color target in place and reuses the incoming depth buffer
/// read-write for stencil, so no copy is ever justified here.
#[derive(Debug)]
pub struct OpaqueForwardPass {
    name: String,
    pins: NodePins,
    shader: ShaderHandle,
    blend_state: BlendStateHandle,
    depth_state: DepthStencilStateHandle,
    rasterizer_state: RasterizerStateHandle,
}

impl OpaqueForwardPass {
    /// Creates the pass.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pins: NodePins::builder()
                .pass_through("Color")
                .pass_through("DepthStencil")
                .build(),
            shader: ShaderHandle::INVALID,
            blend_state: BlendStateHandle::INVALID,
            depth_state: DepthStencilStateHandle::INVALID,
            rasterizer_state: RasterizerStateHandle::INVALID,
        }
    }

    /// Sets the forward shading shader. Without one the pass draws
    /// nothing, degrading visibly instead of crashing.
    pub fn with_shader(mut self, shader: ShaderHandle) -> Self {
        self.shader = shader;
        self
    }
}

impl RenderPipelinePass for OpaqueForwardPass {
    fn type_name(&self) -> &'static str {
        "OpaqueForwardPass"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn pins(&self) -> &NodePins {
        &self.pins
    }

    fn target_descriptions(
        &self,
        _view: &View,
        inputs: &[Option<&TextureDesc>],
        outputs: &mut [Option<TextureDesc>],
    ) -> Result<(), PipelineError> {
        // Pass-through pins forward the incoming description untouched.
        for pin_name in ["Color", "DepthStencil"] {
            let pin = self
                .pins
                .pin_by_name(pin_name)
                .expect("pins are declared in new()");
            let input_index = pin.input_index.expect("pass-through pin") as usize;
            let output_index = pin.output_index.expect("pass-through pin") as usize;
            match inputs[input_index] {
                Some(desc) => outputs[output_index] = Some(desc.clone()),
                None => {
                    return Err(PipelineError::MissingInput {
                        pass: self.name.clone(),
                        pin: pin_name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn init_pipeline_pass(
        &mut self,
        device: &mut GalDevice,
        _inputs: &[Option<&PassConnection>],
        _outputs: &[Option<&PassConnection>],
    ) -> Result<(), PipelineError> {
        if self.blend_state.is_invalidated() {
            self.blend_state = device.create_blend_state(&BlendStateDesc::default())?;
        }
        if self.depth_state.is_invalidated() {
            // The pre-pass already wrote depth; shading only tests it.
            self.depth_state =
                device.create_depth_stencil_state(&DepthStencilStateDesc::read_only())?;
        }
        if self.rasterizer_state.is_invalidated() {
            self.rasterizer_state =
                device.create_rasterizer_state(&RasterizerStateDesc::default())?;
        }
        Ok(())
    }

    fn deinit_pipeline_pass(&mut self, device: &mut GalDevice) {
        if !self.blend_state.is_invalidated() {
            device.destroy_blend_state(self.blend_state);
            self.blend_state = BlendStateHandle::INVALID;
        }
        if !self.depth_state.is_invalidated() {
            device.destroy_depth_stencil_state(self.depth_state);
            self.depth_state = DepthStencilStateHandle::INVALID;
        }
        if !self.rasterizer_state.is_invalidated() {
            device.destroy_rasterizer_state(self.rasterizer_state);
            self.rasterizer_state = RasterizerStateHandle::INVALID;
        }
    }

    fn execute(
        &mut self,
        ctx: &mut RenderViewContext<'_, '_>,
        inputs: &[Option<&PassConnection>],
        _outputs: &[Option<&PassConnection>],
    ) {
        let (Some(color), Some(depth)) = (inputs[0], inputs[1]) else {
            trace!("OpaqueForwardPass '{}' inputs are unconnected.", self.name);
            return;
        };

        // Per-frame derived data, memoized across all passes this frame.
        let instance_view = ctx
            .providers
            .get_data::<InstanceDataProvider>(ctx.gal_pass, ctx.view, ctx.extracted, ctx.frame_counter)
            .map(|data| data.view)
            .unwrap_or_default();
        let lights_view = ctx
            .providers
            .get_data::<ClusteredLightsProvider>(ctx.gal_pass, ctx.view, ctx.extracted, ctx.frame_counter)
            .map(|data| data.view)
            .unwrap_or_default();

        let device = ctx.gal_pass.device();
        let color_view = match device.default_render_target_view(color.texture) {
            Ok(view) => view,
            Err(err) => {
                error!("OpaqueForwardPass '{}': {err}", self.name);
                return;
            }
        };
        let depth_view = match device.default_render_target_view(depth.texture) {
            Ok(view) => view,
            Err(err) => {
                error!("OpaqueForwardPass '{}': {err}", self.name);
                return;
            }
        };

        let viewport = ctx.view.viewport();
        let setup = RenderingSetup {
            color_targets: vec![ColorTargetSetup {
                view: color_view,
                clear: None,
            }],
            depth_target: Some(DepthTargetSetup {
                view: depth_view,
                clear_depth: None,
                clear_stencil: None,
            }),
        };
        let mut encoder = ctx.gal_pass.begin_rendering(&setup, Some(&self.name));
        encoder.set_viewport(Viewport::from_size(viewport.width, viewport.height));
        encoder.set_blend_state(self.blend_state, [1.0; 4]);
        encoder.set_depth_stencil_state(self.depth_state, 0);
        encoder.set_rasterizer_state(self.rasterizer_state);

        if self.shader.is_invalidated() {
            trace!("OpaqueForwardPass '{}' has no shader bound; skipping draws.", self.name);
            return;
        }
        encoder.set_shader(self.shader);
        encoder.set_resource_view(ShaderStage::Vertex, 0, instance_view);
        encoder.set_resource_view(ShaderStage::Pixel, 1, lights_view);

        let mut instance_index = 0;
        for category in [
            DefaultRenderDataCategories::LIT_OPAQUE,
            DefaultRenderDataCategories::LIT_MASKED,
        ] {
            for data in ctx.extracted.batch(category) {
                encoder.draw_instanced(data.vertex_count, 1, 0);
                instance_index += 1;
            }
        }
        trace!(
            "OpaqueForwardPass '{}' drew {} instances.",
            self.name,
            instance_index
        );
    }
}
