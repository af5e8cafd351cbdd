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

//! Device capabilities and adapter information.

use super::format::TextureFormat;

/// A backend-agnostic representation of a graphics API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GraphicsBackendType {
    /// Vulkan.
    Vulkan,
    /// Apple Metal.
    Metal,
    /// Direct3D 12.
    Dx12,
    /// Direct3D 11.
    Dx11,
    /// OpenGL.
    OpenGL,
    /// A CPU-side headless backend (tests, CI).
    Headless,
    /// An unknown or unsupported backend.
    #[default]
    Unknown,
}

/// The physical type of a graphics adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AdapterDeviceType {
    /// A GPU integrated into the CPU.
    IntegratedGpu,
    /// A discrete, dedicated GPU.
    DiscreteGpu,
    /// A virtualized GPU.
    VirtualGpu,
    /// A software rasterizer.
    Cpu,
    /// Unknown device type.
    #[default]
    Unknown,
}

/// Information about the adapter a device was created on.
#[derive(Debug, Clone, Default)]
pub struct AdapterInfo {
    /// Human-readable adapter name.
    pub name: String,
    /// The native API in use.
    pub backend: GraphicsBackendType,
    /// The physical device type.
    pub device_type: AdapterDeviceType,
    /// PCI vendor id, `0` if unknown.
    pub vendor_id: u32,
    /// Driver description, if the backend exposes one.
    pub driver_info: String,
}

/// Feature and limit queries answered by a device.
///
/// Resource creation validates against these before the backend is asked to
/// allocate anything.
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    /// Whether resources may be created from threads other than the render
    /// thread (gates the [`InitContext`](crate::gal::InitContext) path).
    pub multithreaded_resource_creation: bool,
    /// Maximum width/height of a 2D texture.
    pub max_texture_dimension_2d: u32,
    /// Maximum depth/array-layer count.
    pub max_texture_array_layers: u32,
    /// Maximum constant buffer size in bytes.
    pub max_constant_buffer_size: u64,
    /// Whether compute shaders are available.
    pub compute_shaders: bool,
    /// Whether timestamp queries are available.
    pub timestamp_queries: bool,
    /// Whether indirect draw/dispatch is available.
    pub indirect_execution: bool,
    /// Texture formats usable as render targets.
    pub renderable_formats: Vec<TextureFormat>,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            multithreaded_resource_creation: false,
            max_texture_dimension_2d: 16384,
            max_texture_array_layers: 256,
            max_constant_buffer_size: 64 * 1024,
            compute_shaders: true,
            timestamp_queries: false,
            indirect_execution: true,
            renderable_formats: vec![
                TextureFormat::Rgba8Unorm,
                TextureFormat::Rgba8UnormSrgb,
                TextureFormat::Bgra8Unorm,
                TextureFormat::Bgra8UnormSrgb,
                TextureFormat::Rgba16Float,
                TextureFormat::Rg11b10Float,
                TextureFormat::Rgb10a2Unorm,
                TextureFormat::R32Float,
                TextureFormat::Depth16Unorm,
                TextureFormat::Depth24PlusStencil8,
                TextureFormat::Depth32Float,
            ],
        }
    }
}

impl DeviceCapabilities {
    /// Returns `true` if `format` can be used as a render target.
    pub fn supports_render_target_format(&self, format: TextureFormat) -> bool {
        self.renderable_formats.contains(&format)
    }
}
