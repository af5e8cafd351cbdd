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

//! A compute blur pass.

use log::{error, trace};

use crate::gal::{
    GalDevice, ShaderHandle, TextureDesc, TextureHandle, TextureUsage, UnorderedAccessViewDesc,
    UnorderedAccessViewHandle,
};
use crate::pipeline::connection::PassConnection;
use crate::pipeline::error::PipelineError;
use crate::pipeline::node::NodePins;
use crate::pipeline::pass::{RenderPipelinePass, RenderViewContext};
use crate::pipeline::view::View;

/// Workgroup edge length of the blur kernel.
const GROUP_SIZE: u32 = 8;

/// Blurs `Input` into `Output` with a compute kernel.
///
/// Uses distinct input/output pins rather than a pass-through: the kernel
/// reads a texel neighborhood, so source and destination can never alias.
#[derive(Debug)]
pub struct BlurPass {
    name: String,
    pins: NodePins,
    shader: ShaderHandle,
    cached_uav: Option<(TextureHandle, UnorderedAccessViewHandle)>,
}

impl BlurPass {
    /// Creates the pass.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pins: NodePins::builder().input("Input").output("Output").build(),
            shader: ShaderHandle::INVALID,
            cached_uav: None,
        }
    }

    /// Sets the blur compute shader.
    pub fn with_shader(mut self, shader: ShaderHandle) -> Self {
        self.shader = shader;
        self
    }

    fn output_uav(
        &mut self,
        device: &mut GalDevice,
        texture: TextureHandle,
    ) -> Option<UnorderedAccessViewHandle> {
        if let Some((cached_texture, view)) = self.cached_uav {
            if cached_texture == texture {
                return Some(view);
            }
            device.destroy_unordered_access_view(view);
            self.cached_uav = None;
        }
        match device.create_unordered_access_view(texture, &UnorderedAccessViewDesc::default()) {
            Ok(view) => {
                self.cached_uav = Some((texture, view));
                Some(view)
            }
            Err(err) => {
                error!("BlurPass '{}': {err}", self.name);
                None
            }
        }
    }
}

impl RenderPipelinePass for BlurPass {
    fn type_name(&self) -> &'static str {
        "BlurPass"
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
        let Some(input) = inputs[0] else {
            return Err(PipelineError::MissingInput {
                pass: self.name.clone(),
                pin: "Input".to_string(),
            });
        };
        let mut desc = input.clone();
        desc.usage = TextureUsage::UNORDERED_ACCESS | TextureUsage::SHADER_RESOURCE;
        outputs[0] = Some(desc);
        Ok(())
    }

    fn deinit_pipeline_pass(&mut self, device: &mut GalDevice) {
        if let Some((_, view)) = self.cached_uav.take() {
            device.destroy_unordered_access_view(view);
        }
    }

    fn execute(
        &mut self,
        ctx: &mut RenderViewContext<'_, '_>,
        inputs: &[Option<&PassConnection>],
        outputs: &[Option<&PassConnection>],
    ) {
        let (Some(input), Some(output)) = (inputs[0], outputs[0]) else {
            trace!("BlurPass '{}' is not fully connected.", self.name);
            return;
        };
        if self.shader.is_invalidated() {
            trace!("BlurPass '{}' has no shader bound; skipping.", self.name);
            return;
        }
        let extent = output.desc.size;
        if extent.is_empty() {
            // A zero-sized dispatch is asserted against in the encoder;
            // the skip belongs here at the call site.
            trace!("BlurPass '{}' target is empty; skipping dispatch.", self.name);
            return;
        }

        let device = ctx.gal_pass.device();
        let source_view = match device.default_resource_view(input.texture) {
            Ok(view) => view,
            Err(err) => {
                error!("BlurPass '{}': {err}", self.name);
                return;
            }
        };
        let output_texture = output.texture;
        let Some(target_uav) = self.output_uav(ctx.gal_pass.device(), output_texture) else {
            return;
        };

        let mut encoder = ctx.gal_pass.begin_compute(Some(&self.name));
        encoder.set_shader(self.shader);
        encoder.set_resource_view(0, source_view);
        encoder.set_unordered_access_view(0, target_uav);
        encoder.dispatch(
            extent.width.div_ceil(GROUP_SIZE),
            extent.height.div_ceil(GROUP_SIZE),
            1,
        );
    }
}
