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

//! The render pipeline pass trait.

use std::fmt;

use crate::gal::{GalDevice, Pass, TextureDesc};

use super::connection::PassConnection;
use super::error::PipelineError;
use super::frame_data::FrameDataProviderSet;
use super::node::{NodePins, Pin};
use super::render_data::ExtractedRenderData;
use super::view::{RenderTargetSlot, View};

/// How a pass treats the texture behind a pass-through pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassThroughAliasing {
    /// Input and output share one physical texture; the pass mutates in
    /// place.
    #[default]
    Alias,
    /// The output gets its own physical texture; the pass reads the input
    /// and writes the copy.
    Copy,
}

/// Everything a pass may touch while executing.
pub struct RenderViewContext<'a, 'd> {
    /// The open device pass scope to record into.
    pub gal_pass: &'a mut Pass<'d>,
    /// The view being rendered.
    pub view: &'a View,
    /// The extracted render data for this view and frame.
    pub extracted: &'a ExtractedRenderData,
    /// The pipeline's frame data providers.
    pub providers: &'a mut FrameDataProviderSet,
    /// The process-wide frame counter driving provider memoization.
    pub frame_counter: u64,
}

impl fmt::Debug for RenderViewContext<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderViewContext")
            .field("view", &self.view.name())
            .field("frame_counter", &self.frame_counter)
            .finish_non_exhaustive()
    }
}

/// One node of the render pipeline graph.
///
/// Implementations declare their pins at construction, answer description
/// queries during the rebuild, and record commands during execution. Within
/// `execute` a pass may read the connections of its declared inputs and
/// must write exactly through the connections of its declared outputs;
/// touching any other connection is outside the contract and unchecked.
pub trait RenderPipelinePass: fmt::Debug {
    /// The factory type name this pass serializes under.
    fn type_name(&self) -> &'static str;

    /// The instance name, unique within a pipeline.
    fn name(&self) -> &str;

    /// The declared pins.
    fn pins(&self) -> &NodePins;

    /// Aliasing policy for a pass-through pin. The default aliases; passes
    /// that resample or read neighborhoods override with
    /// [`PassThroughAliasing::Copy`].
    fn pass_through_aliasing(&self, _pin: &Pin) -> PassThroughAliasing {
        PassThroughAliasing::default()
    }

    /// Maps an input pin to a view render-target slot. Only terminal
    /// passes binding pipeline outputs to the view implement this.
    fn target_binding(&self, _pin: &Pin) -> Option<RenderTargetSlot> {
        None
    }

    /// Resolves the output texture descriptions from the connected input
    /// descriptions. Called once per rebuild, in dependency order: every
    /// connected input already carries the description its producer
    /// emitted. `inputs` and `outputs` are indexed by the pass's pin
    /// input/output indices; unconnected slots are `None`.
    ///
    /// A pass with an unconnected required input fails here with
    /// [`PipelineError::MissingInput`], aborting the rebuild.
    fn target_descriptions(
        &self,
        view: &View,
        inputs: &[Option<&TextureDesc>],
        outputs: &mut [Option<TextureDesc>],
    ) -> Result<(), PipelineError>;

    /// One-time setup after connections are resolved (state objects,
    /// static buffers). Default: nothing.
    fn init_pipeline_pass(
        &mut self,
        _device: &mut GalDevice,
        _inputs: &[Option<&PassConnection>],
        _outputs: &[Option<&PassConnection>],
    ) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Releases whatever [`init_pipeline_pass`](Self::init_pipeline_pass)
    /// created. Default: nothing.
    fn deinit_pipeline_pass(&mut self, _device: &mut GalDevice) {}

    /// Records this pass's work for one frame.
    fn execute(
        &mut self,
        ctx: &mut RenderViewContext<'_, '_>,
        inputs: &[Option<&PassConnection>],
        outputs: &[Option<&PassConnection>],
    );
}
