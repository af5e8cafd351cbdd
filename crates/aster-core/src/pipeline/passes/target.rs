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

//! The target pass: binds pipeline outputs to the view's render targets.

use crate::gal::TextureDesc;
use crate::pipeline::connection::PassConnection;
use crate::pipeline::error::PipelineError;
use crate::pipeline::node::{NodePins, Pin};
use crate::pipeline::pass::{RenderPipelinePass, RenderViewContext};
use crate::pipeline::view::{RenderTargetSlot, View};

/// The terminal node of a pipeline.
///
/// Its input pins map one-to-one onto the view's render-target slots; the
/// pipeline rebind writes the view's current textures (usually swap-chain
/// backbuffers) into whatever connections end here. The pass itself
/// records nothing.
#[derive(Debug)]
pub struct TargetPass {
    name: String,
    pins: NodePins,
}

impl TargetPass {
    /// Creates a target pass with `Color0`, `Color1` and `DepthStencil`
    /// inputs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pins: NodePins::builder()
                .input("Color0")
                .input("Color1")
                .input("DepthStencil")
                .build(),
        }
    }
}

impl RenderPipelinePass for TargetPass {
    fn type_name(&self) -> &'static str {
        "TargetPass"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn pins(&self) -> &NodePins {
        &self.pins
    }

    fn target_binding(&self, pin: &Pin) -> Option<RenderTargetSlot> {
        match pin.name.as_str() {
            "Color0" => Some(RenderTargetSlot::Color(0)),
            "Color1" => Some(RenderTargetSlot::Color(1)),
            "DepthStencil" => Some(RenderTargetSlot::DepthStencil),
            _ => None,
        }
    }

    fn target_descriptions(
        &self,
        _view: &View,
        _inputs: &[Option<&TextureDesc>],
        _outputs: &mut [Option<TextureDesc>],
    ) -> Result<(), PipelineError> {
        // Terminal: no outputs to describe, and all inputs are optional.
        Ok(())
    }

    fn execute(
        &mut self,
        _ctx: &mut RenderViewContext<'_, '_>,
        _inputs: &[Option<&PassConnection>],
        _outputs: &[Option<&PassConnection>],
    ) {
    }
}
