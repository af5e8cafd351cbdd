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

//! The graphics abstraction layer: device, resources, command encoding.

pub mod backend;
pub mod capabilities;
pub mod descriptors;
pub mod device;
pub mod encoder;
pub mod error;
pub mod factory;
pub mod format;
pub mod handle;
pub mod headless;
pub mod init_context;
pub mod pass;
pub mod pool;

pub use backend::{
    CommandRecorder, GalBackend, NativeId, RecordedColorTarget, RecordedDepthTarget,
    RecordedRenderingSetup, ScissorRect, SwapChainInit, ViewTarget,
};
pub use capabilities::{
    AdapterDeviceType, AdapterInfo, DeviceCapabilities, GraphicsBackendType,
};
pub use descriptors::*;
pub use device::{
    BlendStateHandle, BufferHandle, DepthStencilStateHandle, GalDevice, GalDeviceEvent,
    QueryHandle, RasterizerStateHandle, RenderTargetViewHandle, ResourceViewHandle,
    SamplerStateHandle, ShaderHandle, SwapChainHandle, TextureHandle, UnorderedAccessViewHandle,
};
pub use encoder::{CommandEncoderState, ComputeCommandEncoder, RenderCommandEncoder};
pub use error::{BackendError, GalError};
pub use factory::{
    initialize_factory, shutdown_factory, with_factory, BackendCreatorFn, DeviceCreationConfig,
    DeviceFactory,
};
pub use format::{SampleCount, TextureFormat};
pub use handle::{Handle, HandleTable};
pub use init_context::InitContext;
pub use pass::{ColorTargetSetup, DepthTargetSetup, Pass, RenderingSetup};
pub use pool::ReclaimPool;
