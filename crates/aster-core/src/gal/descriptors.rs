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

//! Immutable creation descriptors for every GAL resource kind.
//!
//! Descriptors are plain data: the common device layer validates them, the
//! backend consumes them, and their hashes drive state-object dedup and
//! transient render-target aliasing.

use crate::aster_bitflags;
use crate::math::Extent3D;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::format::{SampleCount, TextureFormat};

/// Hashes a descriptor with the std hasher. Stable within one process,
/// which is all the dedup and aliasing caches need.
pub fn descriptor_hash<T: Hash>(desc: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    desc.hash(&mut hasher);
    hasher.finish()
}

// ---------------------------------------------------------------------------
// Textures
// ---------------------------------------------------------------------------

/// The shape of a texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureType {
    /// A two-dimensional texture.
    #[default]
    Texture2D,
    /// An array of 2D textures.
    Texture2DArray,
    /// A cubemap (six 2D faces).
    TextureCube,
    /// A three-dimensional (volumetric) texture.
    Texture3D,
}

aster_bitflags! {
    /// Allowed usages of a texture.
    pub struct TextureUsage: u32 {
        /// Source of copy operations.
        const COPY_SRC = 1 << 0;
        /// Destination of copy operations.
        const COPY_DST = 1 << 1;
        /// Sampled in shaders through a resource view.
        const SHADER_RESOURCE = 1 << 2;
        /// Written from shaders through an unordered access view.
        const UNORDERED_ACCESS = 1 << 3;
        /// Color attachment of a render pass.
        const RENDER_TARGET = 1 << 4;
        /// Depth/stencil attachment of a render pass.
        const DEPTH_STENCIL = 1 << 5;
    }
}

/// Creation descriptor for a texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    /// Dimensions (and array layers) of the texture.
    pub size: Extent3D,
    /// Texel format.
    pub format: TextureFormat,
    /// Texture shape.
    pub texture_type: TextureType,
    /// Number of mip levels.
    pub mip_level_count: u32,
    /// Samples per texel.
    pub sample_count: SampleCount,
    /// Allowed usages.
    pub usage: TextureUsage,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            size: Extent3D::default(),
            format: TextureFormat::default(),
            texture_type: TextureType::Texture2D,
            mip_level_count: 1,
            sample_count: SampleCount::One,
            usage: TextureUsage::SHADER_RESOURCE,
        }
    }
}

impl TextureDesc {
    /// A 2D render target of the given size and format.
    pub fn render_target(width: u32, height: u32, format: TextureFormat) -> Self {
        let attachment = if format.is_depth() {
            TextureUsage::DEPTH_STENCIL
        } else {
            TextureUsage::RENDER_TARGET
        };
        Self {
            size: Extent3D::new_2d(width, height),
            format,
            usage: attachment | TextureUsage::SHADER_RESOURCE,
            ..Self::default()
        }
    }

    /// The descriptor hash used for transient-target aliasing.
    pub fn calculate_hash(&self) -> u64 {
        descriptor_hash(self)
    }
}

/// One subresource worth of initial texture data.
#[derive(Debug, Clone)]
pub struct TextureInitData<'a> {
    /// Raw texel data for the subresource.
    pub data: &'a [u8],
    /// Bytes per row of texels.
    pub bytes_per_row: u32,
}

// ---------------------------------------------------------------------------
// Buffers
// ---------------------------------------------------------------------------

aster_bitflags! {
    /// Allowed usages of a buffer.
    pub struct BufferUsage: u32 {
        /// Source of copy operations.
        const COPY_SRC = 1 << 0;
        /// Destination of copy operations.
        const COPY_DST = 1 << 1;
        /// Bound as a vertex buffer.
        const VERTEX = 1 << 2;
        /// Bound as an index buffer.
        const INDEX = 1 << 3;
        /// Bound as a constant (uniform) buffer.
        const CONSTANT = 1 << 4;
        /// Read in shaders through a resource view.
        const SHADER_RESOURCE = 1 << 5;
        /// Written from shaders through an unordered access view.
        const UNORDERED_ACCESS = 1 << 6;
        /// Source of indirect draw/dispatch arguments.
        const INDIRECT = 1 << 7;
    }
}

/// Creation descriptor for a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    /// Size in bytes.
    pub size: u64,
    /// Allowed usages.
    pub usage: BufferUsage,
    /// Element stride for structured access, `0` for raw buffers.
    pub element_stride: u32,
    /// Whether the CPU updates this buffer frequently (backend hint).
    pub mutable: bool,
}

impl BufferDesc {
    /// A constant-buffer descriptor of `size` bytes.
    pub fn constant(size: u64) -> Self {
        Self {
            size,
            usage: BufferUsage::CONSTANT | BufferUsage::COPY_DST,
            element_stride: 0,
            mutable: true,
        }
    }

    /// A vertex-buffer descriptor.
    pub fn vertex(stride: u32, count: u32) -> Self {
        Self {
            size: stride as u64 * count as u64,
            usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
            element_stride: stride,
            mutable: false,
        }
    }

    /// An index-buffer descriptor.
    pub fn index(format: IndexFormat, count: u32) -> Self {
        let stride = match format {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        };
        Self {
            size: stride as u64 * count as u64,
            usage: BufferUsage::INDEX | BufferUsage::COPY_DST,
            element_stride: stride,
            mutable: false,
        }
    }
}

/// The data type of indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndexFormat {
    /// 16-bit unsigned indices.
    #[default]
    Uint16,
    /// 32-bit unsigned indices.
    Uint32,
}

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Isolated points.
    Points,
    /// Isolated line segments.
    Lines,
    /// Isolated triangles.
    #[default]
    Triangles,
    /// A connected triangle strip.
    TriangleStrip,
}

// ---------------------------------------------------------------------------
// Shaders
// ---------------------------------------------------------------------------

/// A shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Pixel (fragment) stage.
    Pixel,
    /// Compute stage.
    Compute,
}

/// The number of entries in [`ShaderStage`]; sizes per-stage binding arrays.
pub const SHADER_STAGE_COUNT: usize = 3;

impl ShaderStage {
    /// Index into per-stage binding arrays.
    pub const fn index(&self) -> usize {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Pixel => 1,
            ShaderStage::Compute => 2,
        }
    }
}

/// Compiled bytecode for one shader stage.
///
/// Bytecode is shared (`Arc`): several stages of one shader, or several
/// shader permutations, may reference the same blob.
#[derive(Debug, Clone)]
pub struct ShaderStageDesc {
    /// The compiled stage bytecode (backend-specific encoding).
    pub bytecode: Arc<[u8]>,
    /// The entry point symbol.
    pub entry_point: String,
}

/// Creation descriptor for a shader.
///
/// Either the vertex (+ optional pixel) stages or the compute stage must be
/// populated, never both.
#[derive(Debug, Clone, Default)]
pub struct ShaderDesc {
    /// Vertex stage, for graphics shaders.
    pub vertex: Option<ShaderStageDesc>,
    /// Pixel stage, for graphics shaders.
    pub pixel: Option<ShaderStageDesc>,
    /// Compute stage, for compute shaders.
    pub compute: Option<ShaderStageDesc>,
    /// Debug name.
    pub debug_name: String,
}

impl ShaderDesc {
    /// Returns `true` if the stage combination is usable.
    pub fn is_valid(&self) -> bool {
        match (&self.vertex, &self.compute) {
            (Some(_), None) => true,
            (None, Some(_)) => self.pixel.is_none(),
            _ => false,
        }
    }

    /// Returns `true` for compute shaders.
    pub fn is_compute(&self) -> bool {
        self.compute.is_some()
    }
}

// ---------------------------------------------------------------------------
// Fixed-function state objects
// ---------------------------------------------------------------------------

/// Depth/stencil comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompareFunction {
    /// Never passes.
    Never,
    /// Passes if the incoming value is less.
    #[default]
    Less,
    /// Passes on equality.
    Equal,
    /// Passes if less or equal.
    LessEqual,
    /// Passes if greater.
    Greater,
    /// Passes on inequality.
    NotEqual,
    /// Passes if greater or equal.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// Blend factor applied to source or destination color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendFactor {
    /// 0.
    Zero,
    /// 1.
    #[default]
    One,
    /// Source color.
    SrcColor,
    /// 1 - source color.
    InvSrcColor,
    /// Source alpha.
    SrcAlpha,
    /// 1 - source alpha.
    InvSrcAlpha,
    /// Destination color.
    DstColor,
    /// 1 - destination color.
    InvDstColor,
    /// Destination alpha.
    DstAlpha,
    /// 1 - destination alpha.
    InvDstAlpha,
}

/// Blend operation combining source and destination terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOperation {
    /// src + dst.
    #[default]
    Add,
    /// src - dst.
    Subtract,
    /// dst - src.
    ReverseSubtract,
    /// min(src, dst).
    Min,
    /// max(src, dst).
    Max,
}

/// Blending for a single render target slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetBlendDesc {
    /// Whether blending is enabled for this target.
    pub blend_enabled: bool,
    /// Source color factor.
    pub src_color: BlendFactor,
    /// Destination color factor.
    pub dst_color: BlendFactor,
    /// Color blend operation.
    pub color_op: BlendOperation,
    /// Source alpha factor.
    pub src_alpha: BlendFactor,
    /// Destination alpha factor.
    pub dst_alpha: BlendFactor,
    /// Alpha blend operation.
    pub alpha_op: BlendOperation,
    /// Bitmask of writable color channels (RGBA = 0b1111).
    pub write_mask: u8,
}

impl Default for RenderTargetBlendDesc {
    fn default() -> Self {
        Self {
            blend_enabled: false,
            src_color: BlendFactor::One,
            dst_color: BlendFactor::Zero,
            color_op: BlendOperation::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            alpha_op: BlendOperation::Add,
            write_mask: 0b1111,
        }
    }
}

/// Creation descriptor for a blend state (all render target slots).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BlendStateDesc {
    /// Per-render-target blend settings.
    pub render_targets: [RenderTargetBlendDesc; 8],
    /// Use the alpha channel of target 0 for alpha-to-coverage.
    pub alpha_to_coverage: bool,
}

impl BlendStateDesc {
    /// Standard "src-alpha over" blending on target 0.
    pub fn alpha_blended() -> Self {
        let mut desc = Self::default();
        desc.render_targets[0] = RenderTargetBlendDesc {
            blend_enabled: true,
            src_color: BlendFactor::SrcAlpha,
            dst_color: BlendFactor::InvSrcAlpha,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::InvSrcAlpha,
            ..RenderTargetBlendDesc::default()
        };
        desc
    }
}

/// Stencil operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOperation {
    /// Keep the current value.
    #[default]
    Keep,
    /// Set to zero.
    Zero,
    /// Replace with the reference value.
    Replace,
    /// Increment, clamping at max.
    IncrementClamp,
    /// Decrement, clamping at zero.
    DecrementClamp,
    /// Bitwise invert.
    Invert,
    /// Increment with wrap.
    IncrementWrap,
    /// Decrement with wrap.
    DecrementWrap,
}

/// Stencil behavior for one primitive face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StencilFaceDesc {
    /// Stencil comparison function.
    pub compare: CompareFunction,
    /// Operation on stencil-test failure.
    pub fail_op: StencilOperation,
    /// Operation on depth-test failure.
    pub depth_fail_op: StencilOperation,
    /// Operation when both tests pass.
    pub pass_op: StencilOperation,
}

/// Creation descriptor for a depth/stencil state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilStateDesc {
    /// Whether the depth test is enabled.
    pub depth_test: bool,
    /// Whether depth writes are enabled.
    pub depth_write: bool,
    /// Depth comparison function.
    pub depth_compare: CompareFunction,
    /// Whether the stencil test is enabled.
    pub stencil_test: bool,
    /// Stencil read mask.
    pub stencil_read_mask: u8,
    /// Stencil write mask.
    pub stencil_write_mask: u8,
    /// Front-face stencil behavior.
    pub front_face: StencilFaceDesc,
    /// Back-face stencil behavior.
    pub back_face: StencilFaceDesc,
}

impl Default for DepthStencilStateDesc {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            depth_compare: CompareFunction::Less,
            stencil_test: false,
            stencil_read_mask: 0xFF,
            stencil_write_mask: 0xFF,
            front_face: StencilFaceDesc::default(),
            back_face: StencilFaceDesc::default(),
        }
    }
}

impl DepthStencilStateDesc {
    /// Depth test without writes (e.g. transparent geometry after a
    /// depth pre-pass).
    pub fn read_only() -> Self {
        Self {
            depth_write: false,
            ..Self::default()
        }
    }

    /// Depth fully disabled (fullscreen post-processing).
    pub fn disabled() -> Self {
        Self {
            depth_test: false,
            depth_write: false,
            ..Self::default()
        }
    }
}

/// Which triangle faces are culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// Cull nothing.
    None,
    /// Cull front faces.
    Front,
    /// Cull back faces.
    #[default]
    Back,
}

/// Winding order that defines the front face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    /// Counter-clockwise is front.
    #[default]
    CounterClockwise,
    /// Clockwise is front.
    Clockwise,
}

/// How polygons are rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillMode {
    /// Filled polygons.
    #[default]
    Solid,
    /// Wireframe outlines.
    Wireframe,
}

/// Creation descriptor for a rasterizer state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizerStateDesc {
    /// Face culling mode.
    pub cull_mode: CullMode,
    /// Front-face winding.
    pub front_face: FrontFace,
    /// Fill mode.
    pub fill_mode: FillMode,
    /// Constant depth bias.
    pub depth_bias: i32,
    /// Slope-scaled depth bias.
    pub depth_bias_slope_scale: f32,
    /// Depth bias clamp.
    pub depth_bias_clamp: f32,
    /// Whether scissor testing is enabled.
    pub scissor_test: bool,
}

impl Default for RasterizerStateDesc {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            fill_mode: FillMode::Solid,
            depth_bias: 0,
            depth_bias_slope_scale: 0.0,
            depth_bias_clamp: 0.0,
            scissor_test: false,
        }
    }
}

impl Eq for RasterizerStateDesc {}

impl Hash for RasterizerStateDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cull_mode.hash(state);
        self.front_face.hash(state);
        self.fill_mode.hash(state);
        self.depth_bias.hash(state);
        self.depth_bias_slope_scale.to_bits().hash(state);
        self.depth_bias_clamp.to_bits().hash(state);
        self.scissor_test.hash(state);
    }
}

/// Texture addressing outside the `[0, 1]` coordinate range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Coordinates wrap around.
    Repeat,
    /// Coordinates clamp to the edge texel.
    #[default]
    ClampToEdge,
    /// Coordinates mirror at integer boundaries.
    MirrorRepeat,
}

/// Texel filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest-texel sampling.
    Nearest,
    /// Linear interpolation.
    #[default]
    Linear,
}

/// Creation descriptor for a sampler state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerStateDesc {
    /// Addressing for the U coordinate.
    pub address_u: AddressMode,
    /// Addressing for the V coordinate.
    pub address_v: AddressMode,
    /// Addressing for the W coordinate.
    pub address_w: AddressMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Mip-level filter.
    pub mip_filter: FilterMode,
    /// Minimum LOD clamp.
    pub lod_min: f32,
    /// Maximum LOD clamp.
    pub lod_max: f32,
    /// Comparison sampler function (shadow mapping), if any.
    pub compare: Option<CompareFunction>,
    /// Maximum anisotropy (1 disables anisotropic filtering).
    pub max_anisotropy: u16,
}

impl Default for SamplerStateDesc {
    fn default() -> Self {
        Self {
            address_u: AddressMode::ClampToEdge,
            address_v: AddressMode::ClampToEdge,
            address_w: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mip_filter: FilterMode::Linear,
            lod_min: 0.0,
            lod_max: f32::MAX,
            compare: None,
            max_anisotropy: 1,
        }
    }
}

impl Eq for SamplerStateDesc {}

impl Hash for SamplerStateDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address_u.hash(state);
        self.address_v.hash(state);
        self.address_w.hash(state);
        self.mag_filter.hash(state);
        self.min_filter.hash(state);
        self.mip_filter.hash(state);
        self.lod_min.to_bits().hash(state);
        self.lod_max.to_bits().hash(state);
        self.compare.hash(state);
        self.max_anisotropy.hash(state);
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Creation descriptor for a shader resource view over a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResourceViewDesc {
    /// Format override, or `None` for the resource's own format.
    pub format: Option<TextureFormat>,
    /// First visible mip level.
    pub base_mip_level: u32,
    /// Number of visible mip levels, `0` meaning "all remaining".
    pub mip_level_count: u32,
    /// First visible array layer.
    pub base_array_layer: u32,
    /// Number of visible array layers, `0` meaning "all remaining".
    pub array_layer_count: u32,
}

/// Creation descriptor for a render target view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderTargetViewDesc {
    /// Format override, or `None` for the resource's own format.
    pub format: Option<TextureFormat>,
    /// The rendered-to mip level.
    pub mip_level: u32,
    /// The rendered-to array layer.
    pub array_layer: u32,
}

/// Creation descriptor for an unordered access view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UnorderedAccessViewDesc {
    /// Format override, or `None` for the resource's own format.
    pub format: Option<TextureFormat>,
    /// The accessed mip level.
    pub mip_level: u32,
    /// First accessible array layer.
    pub base_array_layer: u32,
    /// Number of accessible array layers, `0` meaning "all remaining".
    pub array_layer_count: u32,
}

// ---------------------------------------------------------------------------
// Queries and swap chains
// ---------------------------------------------------------------------------

/// The kind of GPU query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryKind {
    /// Counts samples that pass depth/stencil testing.
    #[default]
    Occlusion,
    /// Binary "any samples passed" query.
    OcclusionPredicate,
    /// GPU timestamp.
    Timestamp,
}

/// Creation descriptor for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QueryDesc {
    /// The query kind.
    pub kind: QueryKind,
}

/// Swap-chain presentation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentMode {
    /// Present with vertical sync.
    #[default]
    VSync,
    /// Present immediately, tearing allowed.
    Immediate,
}

/// Creation descriptor for a swap chain.
///
/// Window and display handles come from the out-of-scope platform layer via
/// `raw-window-handle`.
#[derive(Debug, Clone, Copy)]
pub struct SwapChainDesc {
    /// The native window to present into.
    pub window: raw_window_handle::RawWindowHandle,
    /// The native display owning the window.
    pub display: raw_window_handle::RawDisplayHandle,
    /// Backbuffer width in pixels.
    pub width: u32,
    /// Backbuffer height in pixels.
    pub height: u32,
    /// Requested backbuffer format.
    pub format: TextureFormat,
    /// Presentation mode.
    pub present_mode: PresentMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_descriptors_hash_identically() {
        let a = TextureDesc::render_target(1920, 1080, TextureFormat::Rgba16Float);
        let b = TextureDesc::render_target(1920, 1080, TextureFormat::Rgba16Float);
        assert_eq!(a.calculate_hash(), b.calculate_hash());

        let c = TextureDesc::render_target(1280, 720, TextureFormat::Rgba16Float);
        assert_ne!(a.calculate_hash(), c.calculate_hash());
    }

    #[test]
    fn shader_desc_stage_validation() {
        let stage = ShaderStageDesc {
            bytecode: Arc::from(&[0u8, 1, 2][..]),
            entry_point: "main".into(),
        };
        let graphics = ShaderDesc {
            vertex: Some(stage.clone()),
            pixel: Some(stage.clone()),
            ..ShaderDesc::default()
        };
        assert!(graphics.is_valid());
        assert!(!graphics.is_compute());

        let compute = ShaderDesc {
            compute: Some(stage.clone()),
            ..ShaderDesc::default()
        };
        assert!(compute.is_valid());

        let both = ShaderDesc {
            vertex: Some(stage.clone()),
            compute: Some(stage),
            ..ShaderDesc::default()
        };
        assert!(!both.is_valid());

        assert!(!ShaderDesc::default().is_valid());
    }

    #[test]
    fn sampler_hash_distinguishes_lod() {
        let a = SamplerStateDesc::default();
        let b = SamplerStateDesc {
            lod_max: 4.0,
            ..SamplerStateDesc::default()
        };
        assert_ne!(descriptor_hash(&a), descriptor_hash(&b));
    }
}
