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

//! The resolved binding between pins and concrete textures.

use crate::gal::{TextureDesc, TextureHandle};

/// The resolved state of one pin-to-pin connection.
///
/// Produced during the pipeline rebuild: the description is filled by
/// [`target_descriptions`](crate::pipeline::RenderPipelinePass::target_descriptions)
/// resolution, the texture by transient-target allocation or view
/// render-target binding. Passes read these during `execute` for their
/// declared inputs and write through the ones for their declared outputs;
/// touching a connection a pass did not declare is outside the contract.
#[derive(Debug, Clone, Default)]
pub struct PassConnection {
    /// The resolved texture description.
    pub desc: TextureDesc,
    /// The concrete texture for this pipeline run; invalid until the
    /// rebuild (or, for view targets, the per-frame rebind) assigns it.
    pub texture: TextureHandle,
}
