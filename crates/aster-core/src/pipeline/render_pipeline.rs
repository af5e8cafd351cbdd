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

//! The render pipeline graph.
//!
//! A pipeline owns a set of passes wired through pins. A rebuild sorts the
//! passes topologically, resolves every connection's texture description in
//! dependency order, collapses pass-through chains into shared texture
//! usages, binds view render targets and allocates transient targets.
//! Execution then walks the sorted passes once per frame per view.

use log::{debug, error, warn};
use std::fmt::Write as _;

use crate::gal::{GalDevice, TextureDesc, TextureHandle};
use crate::graph::topological_sort;
use crate::math::Extent3D;

use super::connection::PassConnection;
use super::error::PipelineError;
use super::frame_data::FrameDataProviderSet;
use super::node::PinKind;
use super::pass::{PassThroughAliasing, RenderPipelinePass, RenderViewContext};
use super::render_data::ExtractedRenderData;
use super::transient::TransientTargetPool;
use super::view::{RenderTargetSlot, View};

/// The lifecycle state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Never rebuilt, or invalidated by a wiring change.
    #[default]
    Uninitialized,
    /// The last rebuild failed; rendering is a no-op until a successful
    /// rebuild.
    RebuildError,
    /// Ready to render.
    Initialized,
}

type ConnId = usize;

#[derive(Debug)]
struct Connection {
    source_pass: usize,
    source_output_index: u8,
    /// `(pass index, input index)` of every consumer.
    consumers: Vec<(usize, u8)>,
    conn: PassConnection,
}

#[derive(Debug, Default)]
struct ConnectionData {
    inputs: Vec<Option<ConnId>>,
    outputs: Vec<Option<ConnId>>,
}

/// Connections sharing one physical texture (a pass-through chain), with
/// the execution-order range over which the texture is alive.
#[derive(Debug)]
struct TextureUsageData {
    used_by: Vec<ConnId>,
    first_usage: u16,
    last_usage: u16,
    target_slot: Option<RenderTargetSlot>,
}

/// A named render pipeline: passes, wiring, transient targets, providers.
#[derive(Debug)]
pub struct RenderPipeline {
    name: String,
    passes: Vec<Box<dyn RenderPipelinePass>>,
    conn_data: Vec<ConnectionData>,
    connections: Vec<Option<Connection>>,
    execution_order: Vec<usize>,
    state: PipelineState,
    texture_usage: Vec<TextureUsageData>,
    conn_to_usage: Vec<usize>,
    pool: TransientTargetPool,
    acquired: Vec<(TextureDesc, TextureHandle)>,
    providers: FrameDataProviderSet,
    last_extent: Option<Extent3D>,
    last_render_frame: u64,
}

impl RenderPipeline {
    /// Creates an empty pipeline.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passes: Vec::new(),
            conn_data: Vec::new(),
            connections: Vec::new(),
            execution_order: Vec::new(),
            state: PipelineState::Uninitialized,
            texture_usage: Vec::new(),
            conn_to_usage: Vec::new(),
            pool: TransientTargetPool::new(),
            acquired: Vec::new(),
            providers: FrameDataProviderSet::new(),
            last_extent: None,
            last_render_frame: 0,
        }
    }

    /// The pipeline's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// The number of passes.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Adds a pass. Wiring is reset to `Uninitialized`.
    pub fn add_pass(&mut self, pass: Box<dyn RenderPipelinePass>) {
        if self.pass_index(pass.name()).is_ok() {
            warn!(
                "Pipeline '{}' already has a pass named '{}'; name-based lookups will find the first.",
                self.name,
                pass.name()
            );
        }
        let pins = pass.pins();
        self.conn_data.push(ConnectionData {
            inputs: vec![None; pins.input_count()],
            outputs: vec![None; pins.output_count()],
        });
        self.passes.push(pass);
        self.state = PipelineState::Uninitialized;
    }

    /// Finds a pass by name.
    pub fn pass_by_name(&self, name: &str) -> Option<&dyn RenderPipelinePass> {
        self.passes
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// The pass names in execution order (valid after a successful
    /// rebuild; insertion order before).
    pub fn ordered_pass_names(&self) -> Vec<&str> {
        if self.execution_order.len() == self.passes.len() {
            self.execution_order
                .iter()
                .map(|&i| self.passes[i].name())
                .collect()
        } else {
            self.passes.iter().map(|p| p.name()).collect()
        }
    }

    /// The frame data providers of this pipeline.
    pub fn providers_mut(&mut self) -> &mut FrameDataProviderSet {
        &mut self.providers
    }

    /// Total transient targets allocated over this pipeline's lifetime.
    pub fn transient_allocation_count(&self) -> usize {
        self.pool.allocation_count()
    }

    fn pass_index(&self, name: &str) -> Result<usize, PipelineError> {
        self.passes
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| PipelineError::UnknownPass(name.to_string()))
    }

    // -----------------------------------------------------------------
    // Wiring
    // -----------------------------------------------------------------

    /// Connects an output (or pass-through) pin to an input (or
    /// pass-through) pin. Resets the pipeline to `Uninitialized`.
    pub fn connect(
        &mut self,
        source_pass: &str,
        source_pin: &str,
        target_pass: &str,
        target_pin: &str,
    ) -> Result<(), PipelineError> {
        self.connect_impl(source_pass, source_pin, target_pass, target_pin)
            .inspect_err(|err| error!("Pipeline '{}': connect failed: {err}", self.name))
    }

    fn connect_impl(
        &mut self,
        source_pass: &str,
        source_pin: &str,
        target_pass: &str,
        target_pin: &str,
    ) -> Result<(), PipelineError> {
        let src_idx = self.pass_index(source_pass)?;
        let dst_idx = self.pass_index(target_pass)?;

        let src_output_index = {
            let pin = self.passes[src_idx]
                .pins()
                .pin_by_name(source_pin)
                .ok_or_else(|| PipelineError::UnknownPin {
                    pass: source_pass.to_string(),
                    pin: source_pin.to_string(),
                })?;
            pin.output_index.ok_or_else(|| PipelineError::NotAnOutputPin {
                pass: source_pass.to_string(),
                pin: source_pin.to_string(),
            })?
        };
        let dst_input_index = {
            let pin = self.passes[dst_idx]
                .pins()
                .pin_by_name(target_pin)
                .ok_or_else(|| PipelineError::UnknownPin {
                    pass: target_pass.to_string(),
                    pin: target_pin.to_string(),
                })?;
            pin.input_index.ok_or_else(|| PipelineError::NotAnInputPin {
                pass: target_pass.to_string(),
                pin: target_pin.to_string(),
            })?
        };

        if self.conn_data[dst_idx].inputs[dst_input_index as usize].is_some() {
            return Err(PipelineError::InputAlreadyConnected {
                pass: target_pass.to_string(),
                pin: target_pin.to_string(),
            });
        }

        // Several inputs may share one output's connection.
        let conn_id = match self.conn_data[src_idx].outputs[src_output_index as usize] {
            Some(existing) => existing,
            None => {
                let id = self.connections.len();
                self.connections.push(Some(Connection {
                    source_pass: src_idx,
                    source_output_index: src_output_index,
                    consumers: Vec::new(),
                    conn: PassConnection::default(),
                }));
                self.conn_data[src_idx].outputs[src_output_index as usize] = Some(id);
                id
            }
        };
        self.connections[conn_id]
            .as_mut()
            .expect("connection created above")
            .consumers
            .push((dst_idx, dst_input_index));
        self.conn_data[dst_idx].inputs[dst_input_index as usize] = Some(conn_id);

        self.state = PipelineState::Uninitialized;
        Ok(())
    }

    /// Removes the connection feeding `target_pin`. The source's
    /// connection disappears once its last consumer is gone.
    pub fn disconnect(&mut self, target_pass: &str, target_pin: &str) -> Result<(), PipelineError> {
        let dst_idx = self.pass_index(target_pass)?;
        let input_index = self.passes[dst_idx]
            .pins()
            .pin_by_name(target_pin)
            .and_then(|pin| pin.input_index)
            .ok_or_else(|| PipelineError::NotAnInputPin {
                pass: target_pass.to_string(),
                pin: target_pin.to_string(),
            })?;
        let Some(conn_id) = self.conn_data[dst_idx].inputs[input_index as usize].take() else {
            return Err(PipelineError::NotConnected {
                pass: target_pass.to_string(),
                pin: target_pin.to_string(),
            });
        };

        let remove_connection = {
            let connection = self.connections[conn_id]
                .as_mut()
                .expect("input slots only reference live connections");
            connection
                .consumers
                .retain(|&(pass, input)| !(pass == dst_idx && input == input_index));
            connection.consumers.is_empty()
        };
        if remove_connection {
            let connection = self.connections[conn_id]
                .take()
                .expect("connection resolved above");
            self.conn_data[connection.source_pass].outputs
                [connection.source_output_index as usize] = None;
        }

        self.state = PipelineState::Uninitialized;
        Ok(())
    }

    /// The resolved connection feeding an input pin.
    pub fn input_connection(&self, pass: &str, pin: &str) -> Option<&PassConnection> {
        let pass_idx = self.pass_index(pass).ok()?;
        let input_index = self.passes[pass_idx].pins().pin_by_name(pin)?.input_index?;
        let conn_id = self.conn_data[pass_idx].inputs[input_index as usize]?;
        self.connections[conn_id].as_ref().map(|c| &c.conn)
    }

    /// The resolved connection produced by an output pin.
    pub fn output_connection(&self, pass: &str, pin: &str) -> Option<&PassConnection> {
        let pass_idx = self.pass_index(pass).ok()?;
        let output_index = self.passes[pass_idx].pins().pin_by_name(pin)?.output_index?;
        let conn_id = self.conn_data[pass_idx].outputs[output_index as usize]?;
        self.connections[conn_id].as_ref().map(|c| &c.conn)
    }

    /// Every edge as `(from_pass, from_pin, to_pass, to_pin)`, sorted.
    pub fn edges(&self) -> Vec<(String, String, String, String)> {
        let mut edges = Vec::new();
        for connection in self.connections.iter().flatten() {
            let from_pass = self.passes[connection.source_pass].name().to_string();
            let from_pin = self.passes[connection.source_pass]
                .pins()
                .pin_by_output_index(connection.source_output_index)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            for &(consumer, input_index) in &connection.consumers {
                let to_pin = self.passes[consumer]
                    .pins()
                    .pin_by_input_index(input_index)
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                edges.push((
                    from_pass.clone(),
                    from_pin.clone(),
                    self.passes[consumer].name().to_string(),
                    to_pin,
                ));
            }
        }
        edges.sort();
        edges
    }

    // -----------------------------------------------------------------
    // Rebuild
    // -----------------------------------------------------------------

    /// Rebuilds the pipeline for `view`: sorts passes, resolves target
    /// descriptions, allocates transient targets, initializes passes.
    pub fn rebuild(&mut self, view: &View, device: &mut GalDevice) -> PipelineState {
        debug!("Rebuilding render pipeline '{}'", self.name);
        self.clear_graph_textures(device);

        match self.rebuild_internal(view, device) {
            Ok(()) => {
                self.last_extent = Some(view.viewport().extent());
                self.state = PipelineState::Initialized;
            }
            Err(err) => {
                error!("Render pipeline '{}' rebuild failed: {err}", self.name);
                self.clear_graph_textures(device);
                self.state = PipelineState::RebuildError;
            }
        }
        self.state
    }

    /// Rebuilds only when needed: on the first use, after wiring changes,
    /// or when the view's output size changed.
    pub fn ensure_rebuilt(&mut self, view: &View, device: &mut GalDevice) -> PipelineState {
        let extent = view.viewport().extent();
        if self.state == PipelineState::Initialized && self.last_extent == Some(extent) {
            return self.state;
        }
        self.rebuild(view, device)
    }

    fn rebuild_internal(
        &mut self,
        view: &View,
        device: &mut GalDevice,
    ) -> Result<(), PipelineError> {
        self.sort_passes()?;
        self.init_target_descriptions(view)?;
        self.create_target_usage(view, device)?;
        self.init_pipeline_passes(device)?;
        Ok(())
    }

    /// Returns transient targets to the pool and clears every connection's
    /// texture binding and usage data.
    fn clear_graph_textures(&mut self, _device: &mut GalDevice) {
        for (desc, texture) in self.acquired.drain(..) {
            self.pool.release(&desc, texture);
        }
        for connection in self.connections.iter_mut().flatten() {
            connection.conn.texture = TextureHandle::INVALID;
        }
        self.texture_usage.clear();
        self.conn_to_usage.clear();
    }

    /// Orders the passes so every producer precedes its consumers, and
    /// every plain reader of a connection precedes the pass that mutates
    /// it through a pass-through pin.
    fn sort_passes(&mut self) -> Result<(), PipelineError> {
        let mut edges: Vec<(usize, usize)> = Vec::new();
        for connection in self.connections.iter().flatten() {
            let mut pass_through_consumers: Vec<usize> = Vec::new();
            for &(consumer, input_index) in &connection.consumers {
                edges.push((connection.source_pass, consumer));
                let is_pass_through = self.passes[consumer]
                    .pins()
                    .pin_by_input_index(input_index)
                    .is_some_and(|pin| pin.kind == PinKind::PassThrough);
                if is_pass_through {
                    pass_through_consumers.push(consumer);
                }
            }
            if pass_through_consumers.len() > 1 {
                return Err(PipelineError::ConflictingPassThroughConsumers {
                    passes: pass_through_consumers
                        .iter()
                        .map(|&i| self.passes[i].name().to_string())
                        .collect(),
                });
            }
            if let Some(&pass_through) = pass_through_consumers.first() {
                for &(other, _) in &connection.consumers {
                    if other != pass_through {
                        edges.push((other, pass_through));
                    }
                }
            }
        }

        match topological_sort(self.passes.len(), edges) {
            Ok(order) => {
                self.execution_order = order;
                Ok(())
            }
            Err(cycle) => Err(PipelineError::CycleDetected {
                passes: cycle
                    .unsorted
                    .iter()
                    .map(|&i| self.passes[i].name().to_string())
                    .collect(),
            }),
        }
    }

    /// Asks every pass for its output descriptions, producers first, and
    /// copies them into the connections.
    fn init_target_descriptions(&mut self, view: &View) -> Result<(), PipelineError> {
        let order = self.execution_order.clone();
        for &pass_idx in &order {
            let input_descs: Vec<Option<TextureDesc>> = self.conn_data[pass_idx]
                .inputs
                .iter()
                .map(|slot| {
                    slot.and_then(|id| self.connections[id].as_ref())
                        .map(|c| c.conn.desc.clone())
                })
                .collect();
            let input_refs: Vec<Option<&TextureDesc>> =
                input_descs.iter().map(|d| d.as_ref()).collect();
            let mut outputs: Vec<Option<TextureDesc>> =
                vec![None; self.passes[pass_idx].pins().output_count()];

            self.passes[pass_idx]
                .target_descriptions(view, &input_refs, &mut outputs)
                .inspect_err(|err| {
                    error!(
                        "Pass '{}' could not resolve its render target descriptions: {err}",
                        self.passes[pass_idx].name()
                    );
                })?;

            for (output_index, slot) in self.conn_data[pass_idx].outputs.iter().enumerate() {
                let Some(conn_id) = *slot else { continue };
                match outputs[output_index].take() {
                    Some(desc) => {
                        self.connections[conn_id]
                            .as_mut()
                            .expect("output slots only reference live connections")
                            .conn
                            .desc = desc;
                    }
                    None => {
                        let pin = self.passes[pass_idx]
                            .pins()
                            .pin_by_output_index(output_index as u8)
                            .map(|p| p.name.clone())
                            .unwrap_or_default();
                        return Err(PipelineError::MissingOutputDescription {
                            pass: self.passes[pass_idx].name().to_string(),
                            pin,
                        });
                    }
                }
            }

            // Pass-through pins must forward their input description
            // unchanged.
            let pins = self.passes[pass_idx].pins().clone();
            for pin in pins.pins().iter().filter(|p| p.kind == PinKind::PassThrough) {
                let input_slot = pin
                    .input_index
                    .and_then(|i| self.conn_data[pass_idx].inputs[i as usize]);
                let output_slot = pin
                    .output_index
                    .and_then(|i| self.conn_data[pass_idx].outputs[i as usize]);
                if let (Some(input_id), Some(output_id)) = (input_slot, output_slot) {
                    let input_hash = self.connections[input_id]
                        .as_ref()
                        .map(|c| c.conn.desc.calculate_hash());
                    let output_hash = self.connections[output_id]
                        .as_ref()
                        .map(|c| c.conn.desc.calculate_hash());
                    if input_hash != output_hash {
                        return Err(PipelineError::PassThroughMismatch {
                            pass: self.passes[pass_idx].name().to_string(),
                            pin: pin.name.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Collapses pass-through chains into texture usages, binds the view's
    /// render targets and allocates transient targets for the rest.
    fn create_target_usage(
        &mut self,
        view: &View,
        device: &mut GalDevice,
    ) -> Result<(), PipelineError> {
        debug_assert!(self.texture_usage.is_empty());
        self.conn_to_usage = vec![usize::MAX; self.connections.len()];

        for (order_pos, &pass_idx) in self.execution_order.iter().enumerate() {
            for slot in &self.conn_data[pass_idx].inputs {
                if let Some(conn_id) = slot {
                    let usage_idx = self.conn_to_usage[*conn_id];
                    if usage_idx != usize::MAX {
                        self.texture_usage[usage_idx].last_usage = order_pos as u16;
                    }
                }
            }

            for output_index in 0..self.conn_data[pass_idx].outputs.len() {
                let Some(conn_id) = self.conn_data[pass_idx].outputs[output_index] else {
                    continue;
                };
                let pin = self.passes[pass_idx]
                    .pins()
                    .pin_by_output_index(output_index as u8)
                    .cloned();

                let mut joined_existing = false;
                if let Some(pin) = &pin {
                    let aliases = pin.kind == PinKind::PassThrough
                        && self.passes[pass_idx].pass_through_aliasing(pin)
                            == PassThroughAliasing::Alias;
                    if aliases {
                        if let Some(input_id) = pin
                            .input_index
                            .and_then(|i| self.conn_data[pass_idx].inputs[i as usize])
                        {
                            let usage_idx = self.conn_to_usage[input_id];
                            if usage_idx != usize::MAX {
                                self.texture_usage[usage_idx].used_by.push(conn_id);
                                self.texture_usage[usage_idx].last_usage = order_pos as u16;
                                self.conn_to_usage[conn_id] = usage_idx;
                                joined_existing = true;
                            }
                        }
                    }
                }
                if !joined_existing {
                    self.conn_to_usage[conn_id] = self.texture_usage.len();
                    self.texture_usage.push(TextureUsageData {
                        used_by: vec![conn_id],
                        first_usage: order_pos as u16,
                        last_usage: order_pos as u16,
                        target_slot: None,
                    });
                }
            }
        }

        // Bind the view's render targets wherever a terminal pass maps a
        // pin to a target slot.
        for &pass_idx in &self.execution_order {
            let pins = self.passes[pass_idx].pins().clone();
            for pin in pins.inputs() {
                let Some(slot) = self.passes[pass_idx].target_binding(pin) else {
                    continue;
                };
                let Some(conn_id) = pin
                    .input_index
                    .and_then(|i| self.conn_data[pass_idx].inputs[i as usize])
                else {
                    continue;
                };
                let usage_idx = self.conn_to_usage[conn_id];
                if usage_idx == usize::MAX {
                    continue;
                }
                let texture = view.render_targets().texture(slot);
                if texture.is_invalidated() {
                    // The view does not provide this target; the transient
                    // pool supplements it below.
                    warn!(
                        "View '{}' provides no texture for {:?}; using a pooled target.",
                        view.name(),
                        slot
                    );
                    continue;
                }
                self.texture_usage[usage_idx].target_slot = Some(slot);
                for &used in &self.texture_usage[usage_idx].used_by {
                    self.connections[used]
                        .as_mut()
                        .expect("usage data only references live connections")
                        .conn
                        .texture = texture;
                }
            }
        }

        // Everything else gets a transient target, reused across rebuilds
        // via the descriptor-hash pool.
        for usage_idx in 0..self.texture_usage.len() {
            if self.texture_usage[usage_idx].target_slot.is_some() {
                continue;
            }
            let first_conn = self.texture_usage[usage_idx].used_by[0];
            let desc = self.connections[first_conn]
                .as_ref()
                .expect("usage data only references live connections")
                .conn
                .desc
                .clone();
            let texture = self
                .pool
                .acquire(device, &desc)
                .map_err(PipelineError::TargetAllocation)?;
            self.acquired.push((desc, texture));
            for &used in &self.texture_usage[usage_idx].used_by {
                self.connections[used]
                    .as_mut()
                    .expect("usage data only references live connections")
                    .conn
                    .texture = texture;
            }
        }

        Ok(())
    }

    fn init_pipeline_passes(&mut self, device: &mut GalDevice) -> Result<(), PipelineError> {
        let order = self.execution_order.clone();
        for &pass_idx in &order {
            let data = &self.conn_data[pass_idx];
            let inputs: Vec<Option<&PassConnection>> = data
                .inputs
                .iter()
                .map(|slot| slot.and_then(|id| self.connections[id].as_ref()).map(|c| &c.conn))
                .collect();
            let outputs: Vec<Option<&PassConnection>> = data
                .outputs
                .iter()
                .map(|slot| slot.and_then(|id| self.connections[id].as_ref()).map(|c| &c.conn))
                .collect();
            self.passes[pass_idx]
                .init_pipeline_pass(device, &inputs, &outputs)
                .inspect_err(|err| {
                    error!(
                        "Pass '{}' failed to initialize: {err}",
                        self.passes[pass_idx].name()
                    );
                })?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------

    /// Executes the pipeline for one frame. A no-op returning `false`
    /// unless the pipeline is [`PipelineState::Initialized`]; callers
    /// degrade to the missing-pipeline placeholder instead of crashing.
    pub fn render(
        &mut self,
        view: &View,
        device: &mut GalDevice,
        extracted: &ExtractedRenderData,
    ) -> bool {
        if self.state != PipelineState::Initialized {
            warn!(
                "Render pipeline '{}' is in state {:?}; skipping render.",
                self.name, self.state
            );
            return false;
        }

        // The view's targets may point at freshly acquired backbuffers;
        // rebind them every frame.
        for usage_idx in 0..self.texture_usage.len() {
            let Some(slot) = self.texture_usage[usage_idx].target_slot else {
                continue;
            };
            let texture = view.render_targets().texture(slot);
            for &conn_id in &self.texture_usage[usage_idx].used_by {
                if let Some(connection) = self.connections[conn_id].as_mut() {
                    connection.conn.texture = texture;
                }
            }
        }

        let frame_counter = device.current_frame();
        let mut gal_pass = device.begin_pass(&self.name);

        let Self {
            passes,
            conn_data,
            connections,
            providers,
            execution_order,
            ..
        } = self;

        for &pass_idx in execution_order.iter() {
            let data = &conn_data[pass_idx];
            let inputs: Vec<Option<&PassConnection>> = data
                .inputs
                .iter()
                .map(|slot| slot.and_then(|id| connections[id].as_ref()).map(|c| &c.conn))
                .collect();
            let outputs: Vec<Option<&PassConnection>> = data
                .outputs
                .iter()
                .map(|slot| slot.and_then(|id| connections[id].as_ref()).map(|c| &c.conn))
                .collect();

            let mut ctx = RenderViewContext {
                gal_pass: &mut gal_pass,
                view,
                extracted,
                providers: &mut *providers,
                frame_counter,
            };
            passes[pass_idx].execute(&mut ctx, &inputs, &outputs);
        }

        drop(gal_pass);
        self.last_render_frame = frame_counter;
        true
    }

    /// Tears down pass resources and the transient pool. Call before the
    /// device goes away.
    pub fn destroy(&mut self, device: &mut GalDevice) {
        for pass in &mut self.passes {
            pass.deinit_pipeline_pass(device);
        }
        self.clear_graph_textures(device);
        self.pool.destroy_all(device);
        self.state = PipelineState::Uninitialized;
    }

    /// A plain-text dump of passes, pins and resolved targets, for
    /// debugging badly wired pipelines.
    pub fn connection_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "pipeline '{}' ({:?})", self.name, self.state);
        for (usage_idx, usage) in self.texture_usage.iter().enumerate() {
            let _ = writeln!(
                out,
                "  target {}: {} connection(s), live over passes {}..={}, bound to {:?}",
                usage_idx,
                usage.used_by.len(),
                usage.first_usage,
                usage.last_usage,
                usage.target_slot
            );
        }
        for &pass_idx in &self.execution_order {
            let pass = &self.passes[pass_idx];
            let _ = writeln!(out, "  pass '{}' [{}]", pass.name(), pass.type_name());
            for pin in pass.pins().pins() {
                let conn = match pin.kind {
                    PinKind::Input | PinKind::PassThrough => pin
                        .input_index
                        .and_then(|i| self.conn_data[pass_idx].inputs[i as usize]),
                    PinKind::Output => pin
                        .output_index
                        .and_then(|i| self.conn_data[pass_idx].outputs[i as usize]),
                };
                match conn.and_then(|id| self.connections[id].as_ref()) {
                    Some(connection) => {
                        let _ = writeln!(
                            out,
                            "    {:?} '{}': {}x{} {:?} -> {:?}",
                            pin.kind,
                            pin.name,
                            connection.conn.desc.size.width,
                            connection.conn.desc.size.height,
                            connection.conn.desc.format,
                            connection.conn.texture
                        );
                    }
                    None => {
                        let _ = writeln!(out, "    {:?} '{}': unconnected", pin.kind, pin.name);
                    }
                }
            }
        }
        out
    }
}
