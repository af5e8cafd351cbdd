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

//! The data-driven render pipeline graph.

pub mod connection;
pub mod error;
pub mod frame_data;
pub mod node;
pub mod pass;
pub mod passes;
pub mod render_data;
pub mod render_pipeline;
pub mod resource;
pub mod sorting;
pub mod transient;
pub mod view;

pub use connection::PassConnection;
pub use error::PipelineError;
pub use frame_data::{
    ClusterGridConfig, ClusteredLightsData, ClusteredLightsProvider, FrameDataProvider,
    FrameDataProviderSet, InstanceBufferData, InstanceDataProvider,
};
pub use node::{NodePins, Pin, PinKind};
pub use pass::{PassThroughAliasing, RenderPipelinePass, RenderViewContext};
pub use render_data::{
    render_data_type_hash, CategoryRegistry, DefaultRenderDataCategories, ExtractedRenderData,
    PointLightData, RenderData, RenderDataCategory, INVALID_RENDER_DATA_CATEGORY,
};
pub use render_pipeline::{PipelineState, RenderPipeline};
pub use resource::{
    ConnectionRecord, PassFactoryRegistry, PassRecord, RenderPipelineResourceDescriptor,
    RenderPipelineResourceLoader,
};
pub use sorting::{back_to_front_then_by_render_data, by_render_data_then_front_to_back};
pub use transient::TransientTargetPool;
pub use view::{Camera, RenderTargetSlot, RenderTargets, View, MAX_COLOR_TARGETS};
