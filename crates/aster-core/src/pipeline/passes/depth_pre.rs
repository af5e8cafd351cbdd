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

//! The depth pre-pass: lays down opaque depth before shading.

use log::trace;

use crate::gal::{
    DepthStencilStateDesc, DepthStencilStateHandle, DepthTargetSetup, GalDevice, RenderingSetup,
    ShaderHandle, TextureDesc, TextureFormat,
};
use crate::math::Viewport;
use crate::pipeline::connection::PassConnection;
use crate::pipeline::error::PipelineError;
use crate::pipeline::node::NodePins;
use crate::pipeline::pass::{RenderPipelinePass, RenderViewContext};
use crate::pipeline::render_data::DefaultRenderDataCategories;
use crate::pipeline::view::View;

/// Produces the scene depth buffer by drawing the lit opaque and masked
/// categories depth-only.
#[derive(Debug)]
pub struct DepthPrePass {
    name: String,
    pins: NodePins,
    format: TextureFormat,
    shader: ShaderHandle,
    depth_state: DepthStencilStateHandle,
}

impl DepthPrePass {
    /// Creates the pass with a D24S8 target.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pins: NodePins::builder().output("DepthStencil").build(),
            format: TextureFormat::Depth24PlusStencil8,
            shader: ShaderHandle::INVALID,
            depth_state: DepthStencilStateHandle::INVALID,
        }
    }

    /// Sets the depth target format.
    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the depth-only shader. Without one the pass clears but draws
    /// nothing, degrading visibly instead of crashing.
    pub fn with_shader(mut self, shader: ShaderHandle) -> Self {
        self.shader = shader;
        self
    }
}

impl RenderPipelinePass for DepthPrePass {
    fn type_name(&self) -> &'static str {
        "DepthPrePass"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn pins(&self) -> &NodePins {
        &self.pins
    }

    fn target_descriptions(
        &self,
        view: &View,
        _inputs: &[Option<&TextureDesc>],
        outputs: &mut [Option<TextureDesc>],
    ) -> Result<(), PipelineError> {
        let extent = view.viewport().extent();
        outputs[0] = Some(TextureDesc::render_target(
            extent.width,
            extent.height,
            self.format,
        ));
        Ok(())
    }

    fn init_pipeline_pass(
        &mut self,
        device: &mut GalDevice,
        _inputs: &[Option<&PassConnection>],
        _outputs: &[Option<&PassConnection>],
    ) -> Result<(), PipelineError> {
        if self.depth_state.is_invalidated() {
            self.depth_state = device.create_depth_stencil_state(&DepthStencilStateDesc::default())?;
        }
        Ok(())
    }

    fn deinit_pipeline_pass(&mut self, device: &mut GalDevice) {
        if !self.depth_state.is_invalidated() {
            device.destroy_depth_stencil_state(self.depth_state);
            self.depth_state = DepthStencilStateHandle::INVALID;
        }
    }

    fn execute(
        &mut self,
        ctx: &mut RenderViewContext<'_, '_>,
        _inputs: &[Option<&PassConnection>],
        outputs: &[Option<&PassConnection>],
    ) {
        let Some(output) = outputs[0] else {
            trace!("DepthPrePass '{}' output is unconnected.", self.name);
            return;
        };
        let depth_view = match ctx
            .gal_pass
            .device()
            .default_render_target_view(output.texture)
        {
            Ok(view) => view,
            Err(err) => {
                log::error!("DepthPrePass '{}': {err}", self.name);
                return;
            }
        };

        let viewport = ctx.view.viewport();
        let setup = RenderingSetup::default().with_depth(DepthTargetSetup {
            view: depth_view,
            clear_depth: Some(1.0),
            clear_stencil: Some(0),
        });
        let mut encoder = ctx.gal_pass.begin_rendering(&setup, Some(&self.name));
        encoder.set_viewport(Viewport::from_size(viewport.width, viewport.height));
        encoder.set_depth_stencil_state(self.depth_state, 0);

        if self.shader.is_invalidated() {
            trace!("DepthPrePass '{}' has no shader bound; clearing only.", self.name);
            return;
        }
        encoder.set_shader(self.shader);
        for category in [
            DefaultRenderDataCategories::LIT_OPAQUE,
            DefaultRenderDataCategories::LIT_MASKED,
        ] {
            for data in ctx.extracted.batch(category) {
                encoder.draw(data.vertex_count, 0);
            }
        }
    }
}
