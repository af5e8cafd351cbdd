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

//! Texture formats and multisampling counts.

use serde::{Deserialize, Serialize};

/// The texel format of a texture.
///
/// A deliberately small, portable subset; every entry must be expressible
/// on all supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureFormat {
    /// 8-bit RGBA, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA, unsigned normalized, sRGB-encoded.
    Rgba8UnormSrgb,
    /// 8-bit BGRA, unsigned normalized (common swap-chain format).
    Bgra8Unorm,
    /// 8-bit BGRA, unsigned normalized, sRGB-encoded.
    Bgra8UnormSrgb,
    /// 16-bit-per-channel RGBA float (HDR intermediate targets).
    Rgba16Float,
    /// 32-bit-per-channel RGBA float.
    Rgba32Float,
    /// Single-channel 8-bit unsigned normalized.
    R8Unorm,
    /// Single-channel 16-bit float.
    R16Float,
    /// Single-channel 32-bit float.
    R32Float,
    /// Single-channel 32-bit unsigned integer.
    R32Uint,
    /// Two-channel 16-bit float.
    Rg16Float,
    /// Packed 10-10-10-2 unsigned normalized RGBA.
    Rgb10a2Unorm,
    /// Packed 11-11-10 float RGB.
    Rg11b10Float,
    /// 16-bit depth.
    Depth16Unorm,
    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
    /// 32-bit float depth.
    Depth32Float,
}

impl TextureFormat {
    /// Returns `true` for depth and depth/stencil formats.
    pub const fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16Unorm
                | TextureFormat::Depth24PlusStencil8
                | TextureFormat::Depth32Float
        )
    }

    /// Returns `true` if the format has a stencil aspect.
    pub const fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::Depth24PlusStencil8)
    }

    /// Bytes per texel for uncompressed formats.
    pub const fn bytes_per_texel(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm => 1,
            TextureFormat::R16Float | TextureFormat::Depth16Unorm => 2,
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Bgra8UnormSrgb
            | TextureFormat::R32Float
            | TextureFormat::R32Uint
            | TextureFormat::Rg16Float
            | TextureFormat::Rgb10a2Unorm
            | TextureFormat::Rg11b10Float
            | TextureFormat::Depth24PlusStencil8
            | TextureFormat::Depth32Float => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

/// The number of samples per texel of a multisampled texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SampleCount {
    /// No multisampling.
    #[default]
    One,
    /// 2x MSAA.
    Two,
    /// 4x MSAA.
    Four,
    /// 8x MSAA.
    Eight,
}

impl SampleCount {
    /// The sample count as a plain integer.
    pub const fn as_u32(&self) -> u32 {
        match self {
            SampleCount::One => 1,
            SampleCount::Two => 2,
            SampleCount::Four => 4,
            SampleCount::Eight => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_classification() {
        assert!(TextureFormat::Depth24PlusStencil8.is_depth());
        assert!(TextureFormat::Depth24PlusStencil8.has_stencil());
        assert!(TextureFormat::Depth32Float.is_depth());
        assert!(!TextureFormat::Depth32Float.has_stencil());
        assert!(!TextureFormat::Rgba16Float.is_depth());
    }
}
