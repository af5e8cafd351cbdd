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

//! The device pass scope and its encoder scope management.
//!
//! A [`Pass`] is obtained from [`GalDevice::begin_pass`] and closed by
//! dropping it. Within a pass, [`begin_rendering`](Pass::begin_rendering)
//! and [`begin_compute`](Pass::begin_compute) open exactly one encoder
//! scope at a time; the returned guard closes the scope (and pops its debug
//! marker) on drop, so markers stay balanced on every exit path. Opening a
//! second scope while one is active is a programmer error and panics.

use log::error;

use crate::math::{Extent3D, LinearRgba};

use super::backend::{
    CommandRecorder, RecordedColorTarget, RecordedDepthTarget, RecordedRenderingSetup,
};
use super::device::{GalDevice, RenderTargetViewHandle};
use super::encoder::{ComputeCommandEncoder, RenderCommandEncoder};

/// A color target binding for [`Pass::begin_rendering`].
#[derive(Debug, Clone, Copy)]
pub struct ColorTargetSetup {
    /// The render target view to bind.
    pub view: RenderTargetViewHandle,
    /// Clear color, or `None` to keep the existing contents.
    pub clear: Option<LinearRgba>,
}

/// A depth/stencil target binding for [`Pass::begin_rendering`].
#[derive(Debug, Clone, Copy)]
pub struct DepthTargetSetup {
    /// The depth/stencil view to bind.
    pub view: RenderTargetViewHandle,
    /// Depth clear value, or `None` to keep the existing contents.
    pub clear_depth: Option<f32>,
    /// Stencil clear value, or `None` to keep the existing contents.
    pub clear_stencil: Option<u8>,
}

/// The attachments of one render scope.
#[derive(Debug, Clone, Default)]
pub struct RenderingSetup {
    /// Color targets in slot order.
    pub color_targets: Vec<ColorTargetSetup>,
    /// The depth/stencil target, if any.
    pub depth_target: Option<DepthTargetSetup>,
}

impl RenderingSetup {
    /// A setup rendering into a single color target.
    pub fn single_color(view: RenderTargetViewHandle, clear: Option<LinearRgba>) -> Self {
        Self {
            color_targets: vec![ColorTargetSetup { view, clear }],
            depth_target: None,
        }
    }

    /// Adds a depth/stencil target.
    pub fn with_depth(mut self, setup: DepthTargetSetup) -> Self {
        self.depth_target = Some(setup);
        self
    }
}

/// The encoder scope state machine of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeState {
    /// No encoder scope is open.
    Invalid,
    /// A render encoder scope is open.
    Render,
    /// A compute encoder scope is open.
    Compute,
}

/// A device pass scope. See the module docs.
#[derive(Debug)]
pub struct Pass<'d> {
    pub(crate) device: &'d mut GalDevice,
    pub(crate) recorder: Option<Box<dyn CommandRecorder>>,
    pub(crate) state: super::encoder::CommandEncoderState,
    pub(crate) scope: ScopeState,
}

impl<'d> Pass<'d> {
    pub(crate) fn new(
        device: &'d mut GalDevice,
        mut recorder: Box<dyn CommandRecorder>,
        name: &str,
    ) -> Self {
        recorder.push_marker(name);
        Self {
            device,
            recorder: Some(recorder),
            state: super::encoder::CommandEncoderState::new(),
            scope: ScopeState::Invalid,
        }
    }

    pub(crate) fn recorder_mut(&mut self) -> &mut dyn CommandRecorder {
        self.recorder
            .as_deref_mut()
            .expect("recorder only detaches during drop")
    }

    /// The device this pass records against. Usable between encoder
    /// scopes, e.g. for frame-data providers creating buffers mid-frame.
    pub fn device(&mut self) -> &mut GalDevice {
        &mut *self.device
    }

    /// Opens a render encoder scope targeting `setup`.
    ///
    /// Panics if any encoder scope is already open on this pass. If
    /// `name` is given, a debug marker wraps the scope.
    pub fn begin_rendering(
        &mut self,
        setup: &RenderingSetup,
        name: Option<&str>,
    ) -> RenderCommandEncoder<'_, 'd> {
        assert!(
            self.scope == ScopeState::Invalid,
            "begin_rendering called while another encoder scope is open on this pass"
        );
        let recorded = self.resolve_setup(setup);
        self.scope = ScopeState::Render;
        // Encoder state does not survive scope boundaries; every binding
        // must go through the cache again.
        self.state.invalidate();
        self.device.stats.encoder_scopes += 1;

        let recorder = self.recorder_mut();
        recorder.begin_rendering(&recorded);
        if let Some(label) = name {
            recorder.push_marker(label);
        }
        RenderCommandEncoder::new(self, name.is_some())
    }

    /// Opens a compute encoder scope.
    ///
    /// Panics if any encoder scope is already open on this pass.
    pub fn begin_compute(&mut self, name: Option<&str>) -> ComputeCommandEncoder<'_, 'd> {
        assert!(
            self.scope == ScopeState::Invalid,
            "begin_compute called while another encoder scope is open on this pass"
        );
        self.scope = ScopeState::Compute;
        self.state.invalidate();
        self.device.stats.encoder_scopes += 1;

        let recorder = self.recorder_mut();
        recorder.begin_compute();
        if let Some(label) = name {
            recorder.push_marker(label);
        }
        ComputeCommandEncoder::new(self, name.is_some())
    }

    fn resolve_setup(&self, setup: &RenderingSetup) -> RecordedRenderingSetup {
        let mut recorded = RecordedRenderingSetup::default();
        let mut extent: Option<Extent3D> = None;

        let mut note_extent = |view_extent: Extent3D| match extent {
            None => extent = Some(view_extent),
            Some(current) if current != view_extent => {
                error!(
                    "Render scope attachments disagree on extent: {:?} vs {:?}",
                    current, view_extent
                );
            }
            _ => {}
        };

        for target in &setup.color_targets {
            match (
                self.device.native_render_target_view(target.view),
                self.device.render_target_view(target.view),
            ) {
                (Some(native), Some(view)) => {
                    if let Some(view_extent) = self.device.texture_extent(view.texture) {
                        note_extent(view_extent);
                    }
                    recorded.color_targets.push(RecordedColorTarget {
                        view: native,
                        clear: target.clear,
                    });
                }
                _ => error!("Render scope color target does not resolve, skipping it."),
            }
        }
        if let Some(depth) = &setup.depth_target {
            match (
                self.device.native_render_target_view(depth.view),
                self.device.render_target_view(depth.view),
            ) {
                (Some(native), Some(view)) => {
                    if let Some(view_extent) = self.device.texture_extent(view.texture) {
                        note_extent(view_extent);
                    }
                    recorded.depth_target = Some(RecordedDepthTarget {
                        view: native,
                        clear_depth: depth.clear_depth,
                        clear_stencil: depth.clear_stencil,
                    });
                }
                _ => error!("Render scope depth target does not resolve, skipping it."),
            }
        }

        recorded.extent = extent.unwrap_or_default();
        recorded
    }
}

impl Drop for Pass<'_> {
    fn drop(&mut self) {
        if self.scope != ScopeState::Invalid {
            // Unwinding past an open scope must not turn into a
            // panic-in-panic abort; outside unwinding it is misuse.
            self.device.pass_open = false;
            if std::thread::panicking() {
                return;
            }
            debug_assert!(false, "pass dropped with an open encoder scope");
        }
        if let Some(mut recorder) = self.recorder.take() {
            recorder.pop_marker();
            recorder.flush();
            self.device.submit_recorder(recorder);
        }
        self.device.pass_open = false;
    }
}
