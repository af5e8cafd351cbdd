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

//! The built-in render pipeline passes.

mod blur;
mod depth_pre;
mod forward;
mod source;
mod target;
mod tonemap;

pub use blur::BlurPass;
pub use depth_pre::DepthPrePass;
pub use forward::OpaqueForwardPass;
pub use source::SourcePass;
pub use target::TargetPass;
pub use tonemap::TonemapPass;
