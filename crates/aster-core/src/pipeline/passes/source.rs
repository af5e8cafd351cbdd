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

//! The source pass: injects a fresh render target into the graph.

use log::{error, trace};

use crate::gal::{DepthTargetSetup, RenderingSetup, SampleCount, TextureDesc, TextureFormat};
use crate::math::LinearRgba;
use crate::pipeline::connection::PassConnection;
use crate::pipeline::error::PipelineError;
use crate::pipeline::node::NodePins;
use crate::pipeline::pass::{RenderPipelinePass, RenderViewContext};
use crate::pipeline::view::View;

/// Produces a viewport-sized texture on its `Output` pin, optionally
/// clearing it.
///
/// The start node of most pipelines: downstream passes consume its output
/// description without caring whether the texture later turns out to be a
/// view target or a pooled transient.
#[derive(Debug)]
pub struct SourcePass {
    name: String,
    pins: NodePins,
    format: TextureFormat,
    sample_count: SampleCount,
    clear: Option<LinearRgba>,
}

impl SourcePass {
    /// Creates a source pass producing HDR color, cleared to transparent
    /// black.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pins: NodePins::builder().output("Output").build(),
            format: TextureFormat::Rgba16Float,
            sample_count: SampleCount::One,
            clear: Some(LinearRgba::TRANSPARENT),
        }
    }

    /// Sets the produced texture format.
    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the sample count.
    pub fn with_sample_count(mut self, sample_count: SampleCount) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Sets the clear color, or disables clearing with `None`.
    pub fn with_clear(mut self, clear: Option<LinearRgba>) -> Self {
        self.clear = clear;
        self
    }
}

impl RenderPipelinePass for SourcePass {
    fn type_name(&self) -> &'static str {
        "SourcePass"
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
        let mut desc = TextureDesc::render_target(extent.width, extent.height, self.format);
        desc.sample_count = self.sample_count;
        outputs[0] = Some(desc);
        Ok(())
    }

    fn execute(
        &mut self,
        ctx: &mut RenderViewContext<'_, '_>,
        _inputs: &[Option<&PassConnection>],
        outputs: &[Option<&PassConnection>],
    ) {
        let Some(clear) = self.clear else {
            return;
        };
        let Some(output) = outputs[0] else {
            trace!("SourcePass '{}' output is unconnected.", self.name);
            return;
        };

        let depth = output.desc.format.is_depth();
        let view = match ctx
            .gal_pass
            .device()
            .default_render_target_view(output.texture)
        {
            Ok(view) => view,
            Err(err) => {
                error!("SourcePass '{}' has no usable target view: {err}", self.name);
                return;
            }
        };
        let setup = if depth {
            RenderingSetup::default().with_depth(DepthTargetSetup {
                view,
                clear_depth: Some(1.0),
                clear_stencil: Some(0),
            })
        } else {
            RenderingSetup::single_color(view, Some(clear))
        };
        // Open and immediately close the scope: the load op does the work.
        let _encoder = ctx.gal_pass.begin_rendering(&setup, Some(&self.name));
    }
}
