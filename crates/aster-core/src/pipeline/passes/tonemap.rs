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

//! The tonemap pass: HDR color in, displayable LDR color out.

use log::{error, trace};

use crate::gal::{
    DepthStencilStateDesc, DepthStencilStateHandle, GalDevice, RenderingSetup, SamplerStateDesc,
    SamplerStateHandle, ShaderHandle, ShaderStage, TextureDesc, TextureFormat, TextureUsage,
};
use crate::math::Viewport;
use crate::pipeline::connection::PassConnection;
use crate::pipeline::error::PipelineError;
use crate::pipeline::node::NodePins;
use crate::pipeline::pass::{RenderPipelinePass, RenderViewContext};
use crate::pipeline::view::View;

/// Maps the HDR `Color` input to an LDR `Output` with a fullscreen
/// triangle.
#[derive(Debug)]
pub struct TonemapPass {
    name: String,
    pins: NodePins,
    output_format: TextureFormat,
    shader: ShaderHandle,
    sampler: SamplerStateHandle,
    depth_state: DepthStencilStateHandle,
}

impl TonemapPass {
    /// Creates the pass with an sRGB 8-bit output.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pins: NodePins::builder().input("Color").output("Output").build(),
            output_format: TextureFormat::Rgba8UnormSrgb,
            shader: ShaderHandle::INVALID,
            sampler: SamplerStateHandle::INVALID,
            depth_state: DepthStencilStateHandle::INVALID,
        }
    }

    /// Sets the output format.
    pub fn with_output_format(mut self, format: TextureFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Sets the tonemapping shader.
    pub fn with_shader(mut self, shader: ShaderHandle) -> Self {
        self.shader = shader;
        self
    }
}

impl RenderPipelinePass for TonemapPass {
    fn type_name(&self) -> &'static str {
        "TonemapPass"
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
        let Some(color) = inputs[0] else {
            return Err(PipelineError::MissingInput {
                pass: self.name.clone(),
                pin: "Color".to_string(),
            });
        };
        let mut desc = color.clone();
        desc.format = self.output_format;
        desc.sample_count = crate::gal::SampleCount::One;
        desc.usage = TextureUsage::RENDER_TARGET | TextureUsage::SHADER_RESOURCE;
        outputs[0] = Some(desc);
        Ok(())
    }

    fn init_pipeline_pass(
        &mut self,
        device: &mut GalDevice,
        _inputs: &[Option<&PassConnection>],
        _outputs: &[Option<&PassConnection>],
    ) -> Result<(), PipelineError> {
        if self.sampler.is_invalidated() {
            self.sampler = device.create_sampler_state(&SamplerStateDesc::default())?;
        }
        if self.depth_state.is_invalidated() {
            self.depth_state =
                device.create_depth_stencil_state(&DepthStencilStateDesc::disabled())?;
        }
        Ok(())
    }

    fn deinit_pipeline_pass(&mut self, device: &mut GalDevice) {
        if !self.sampler.is_invalidated() {
            device.destroy_sampler_state(self.sampler);
            self.sampler = SamplerStateHandle::INVALID;
        }
        if !self.depth_state.is_invalidated() {
            device.destroy_depth_stencil_state(self.depth_state);
            self.depth_state = DepthStencilStateHandle::INVALID;
        }
    }

    fn execute(
        &mut self,
        ctx: &mut RenderViewContext<'_, '_>,
        inputs: &[Option<&PassConnection>],
        outputs: &[Option<&PassConnection>],
    ) {
        let (Some(color), Some(output)) = (inputs[0], outputs[0]) else {
            trace!("TonemapPass '{}' is not fully connected.", self.name);
            return;
        };

        let device = ctx.gal_pass.device();
        let source_view = match device.default_resource_view(color.texture) {
            Ok(view) => view,
            Err(err) => {
                error!("TonemapPass '{}': {err}", self.name);
                return;
            }
        };
        let target_view = match device.default_render_target_view(output.texture) {
            Ok(view) => view,
            Err(err) => {
                error!("TonemapPass '{}': {err}", self.name);
                return;
            }
        };

        let viewport = ctx.view.viewport();
        let setup = RenderingSetup::single_color(target_view, None);
        let mut encoder = ctx.gal_pass.begin_rendering(&setup, Some(&self.name));
        encoder.set_viewport(Viewport::from_size(viewport.width, viewport.height));
        encoder.set_depth_stencil_state(self.depth_state, 0);

        if self.shader.is_invalidated() {
            trace!("TonemapPass '{}' has no shader bound; skipping.", self.name);
            return;
        }
        encoder.set_shader(self.shader);
        encoder.set_resource_view(ShaderStage::Pixel, 0, source_view);
        encoder.set_sampler_state(ShaderStage::Pixel, 0, self.sampler);
        // Fullscreen triangle.
        encoder.draw(3, 0);
    }
}
