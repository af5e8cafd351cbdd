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

//! Per-frame rendering statistics.

/// Counters accumulated over one frame of command recording.
///
/// The device accumulates these until [`clear`](RenderStats::clear) is
/// called, typically once per frame after the numbers have been read.
#[derive(Debug, Clone, Default)]
pub struct RenderStats {
    /// A sequential counter for rendered frames.
    pub frame_number: u64,
    /// The number of draw calls encoded for the frame.
    pub draw_calls: u32,
    /// The number of compute dispatches encoded for the frame.
    pub dispatch_calls: u32,
    /// State-setting calls that actually changed bound state.
    pub state_changes: u32,
    /// State-setting calls elided because the state was already bound.
    pub redundant_state_changes: u32,
    /// Render/compute encoder scopes opened this frame.
    pub encoder_scopes: u32,
}

impl RenderStats {
    /// Resets all counters except the frame number.
    pub fn clear(&mut self) {
        let frame_number = self.frame_number;
        *self = Self {
            frame_number,
            ..Self::default()
        };
    }
}
