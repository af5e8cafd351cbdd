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

//! Frame data providers: per-frame derived data, computed at most once per
//! frame per provider.
//!
//! A provider's `update_data` must be pure with respect to its inputs (the
//! extracted data and view): the memoization assumes calling it twice in
//! one frame would produce the same result, so only the first caller per
//! frame pays for the computation.

use bytemuck::{Pod, Zeroable};
use log::error;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::gal::{
    BufferDesc, BufferHandle, BufferUsage, Pass, ResourceViewDesc, ResourceViewHandle,
};
use crate::math::Mat4;

use super::render_data::{DefaultRenderDataCategories, ExtractedRenderData};
use super::view::View;

/// Per-view derived data recomputed lazily once per frame.
pub trait FrameDataProvider: fmt::Debug + 'static {
    /// The derived data type.
    type Data: 'static;

    /// Recomputes the data. Called at most once per frame regardless of
    /// how many passes ask. `pass` gives access to the device for buffer
    /// creation and uploads.
    fn update_data(
        &mut self,
        pass: &mut Pass<'_>,
        view: &View,
        extracted: &ExtractedRenderData,
    ) -> Self::Data;
}

struct Entry<P: FrameDataProvider> {
    provider: P,
    data: Option<P::Data>,
    last_update_frame: Option<u64>,
    update_count: u64,
}

/// The providers owned by one render pipeline, keyed by provider type.
#[derive(Default)]
pub struct FrameDataProviderSet {
    entries: HashMap<TypeId, Box<dyn Any>>,
}

impl fmt::Debug for FrameDataProviderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameDataProviderSet")
            .field("provider_count", &self.entries.len())
            .finish()
    }
}

impl FrameDataProviderSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider. One instance per provider type; re-inserting
    /// replaces the previous instance and drops its cached data.
    pub fn insert<P: FrameDataProvider>(&mut self, provider: P) {
        self.entries.insert(
            TypeId::of::<P>(),
            Box::new(Entry {
                provider,
                data: None,
                last_update_frame: None,
                update_count: 0,
            }),
        );
    }

    /// Returns the provider's data for `frame_counter`, recomputing it only
    /// if this frame has not been computed yet. `None` if no provider of
    /// type `P` was inserted.
    pub fn get_data<P: FrameDataProvider>(
        &mut self,
        pass: &mut Pass<'_>,
        view: &View,
        extracted: &ExtractedRenderData,
        frame_counter: u64,
    ) -> Option<&P::Data> {
        let entry = match self.entries.get_mut(&TypeId::of::<P>()) {
            Some(boxed) => boxed.downcast_mut::<Entry<P>>()?,
            None => {
                error!(
                    "Frame data provider {} was never inserted into the pipeline.",
                    std::any::type_name::<P>()
                );
                return None;
            }
        };
        if entry.last_update_frame != Some(frame_counter) {
            entry.data = Some(entry.provider.update_data(pass, view, extracted));
            entry.last_update_frame = Some(frame_counter);
            entry.update_count += 1;
        }
        entry.data.as_ref()
    }

    /// How often the provider of type `P` actually recomputed. Test hook
    /// for the once-per-frame guarantee.
    pub fn update_count<P: FrameDataProvider>(&self) -> u64 {
        self.entries
            .get(&TypeId::of::<P>())
            .and_then(|boxed| boxed.downcast_ref::<Entry<P>>())
            .map(|entry| entry.update_count)
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Clustered lights
// ---------------------------------------------------------------------------

/// The cluster grid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterGridConfig {
    /// Cluster size in screen pixels (clusters are square in screen
    /// space).
    pub tile_size: u32,
    /// Maximum lights accounted per cluster; excess lights are dropped
    /// with a log warning.
    pub max_lights_per_cluster: u32,
}

impl Default for ClusterGridConfig {
    fn default() -> Self {
        Self {
            tile_size: 16,
            max_lights_per_cluster: 128,
        }
    }
}

impl ClusterGridConfig {
    /// Cluster grid dimensions for a viewport size.
    pub fn grid_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        (
            width.div_ceil(self.tile_size),
            height.div_ceil(self.tile_size),
        )
    }
}

/// GPU layout of one point light.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuPointLight {
    /// World position (xyz) and radius (w).
    pub position_radius: [f32; 4],
    /// Linear color (rgb) and intensity (a).
    pub color_intensity: [f32; 4],
}

/// One cluster's slice of the light index list.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuClusterEntry {
    /// Offset into the light index list.
    pub offset: u32,
    /// Number of lights in this cluster.
    pub count: u32,
}

/// The per-frame output of [`ClusteredLightsProvider`].
#[derive(Debug, Clone)]
pub struct ClusteredLightsData {
    /// The grid configuration the binning used.
    pub config: ClusterGridConfig,
    /// Cluster grid dimensions (x, y).
    pub grid: (u32, u32),
    /// The GPU buffer holding lights, cluster table and index list,
    /// laid out in that order.
    pub buffer: BufferHandle,
    /// A shader resource view over [`buffer`](Self::buffer), owned by the
    /// provider.
    pub view: ResourceViewHandle,
    /// Number of lights uploaded.
    pub light_count: u32,
    /// Byte offset of the cluster table within the buffer.
    pub cluster_table_offset: u64,
    /// Byte offset of the light index list within the buffer.
    pub index_list_offset: u64,
}

/// Bins extracted point lights into a screen-space cluster grid and
/// uploads the result.
///
/// A CPU stand-in for the compute-shader culling of a full Forward+
/// renderer: the data layout matches what the lit passes consume, which is
/// what matters to the pipeline.
#[derive(Debug, Default)]
pub struct ClusteredLightsProvider {
    config: ClusterGridConfig,
    buffer: BufferHandle,
    view: ResourceViewHandle,
    buffer_capacity: u64,
}

impl ClusteredLightsProvider {
    /// Creates a provider with the given grid configuration.
    pub fn new(config: ClusterGridConfig) -> Self {
        Self {
            config,
            buffer: BufferHandle::INVALID,
            view: ResourceViewHandle::INVALID,
            buffer_capacity: 0,
        }
    }

    /// Conservative screen-space cluster range of a light. Uses the
    /// distance-scaled angular size of the light sphere; clusters outside
    /// the viewport are clamped away.
    fn cluster_range(
        &self,
        light: &super::render_data::PointLightData,
        view: &View,
        grid: (u32, u32),
    ) -> Option<(u32, u32, u32, u32)> {
        let camera = view.camera();
        let depth = camera.view_depth(light.position);
        if depth + light.radius < camera.near {
            return None;
        }
        let viewport = view.viewport();
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return None;
        }

        // Project the sphere's angular extent onto the viewport.
        let fov_y = self.config_fov(camera.fov_y_degrees);
        let half_height_at_depth = depth.max(camera.near) * (fov_y * 0.5).tan();
        let pixels_per_unit = (viewport.height * 0.5) / half_height_at_depth.max(1.0e-3);
        let radius_pixels = light.radius * pixels_per_unit;

        let to_light = light.position - camera.position;
        let right = camera.forward.cross(camera.up).normalize_or_zero();
        let x_units = to_light.dot(right);
        let y_units = to_light.dot(camera.up);
        let center_x = viewport.width * 0.5 + x_units * pixels_per_unit;
        let center_y = viewport.height * 0.5 - y_units * pixels_per_unit;

        let tile = self.config.tile_size as f32;
        let min_x = ((center_x - radius_pixels) / tile).floor().max(0.0) as u32;
        let min_y = ((center_y - radius_pixels) / tile).floor().max(0.0) as u32;
        let max_x = (((center_x + radius_pixels) / tile).ceil() as u32).min(grid.0);
        let max_y = (((center_y + radius_pixels) / tile).ceil() as u32).min(grid.1);
        if min_x >= max_x || min_y >= max_y {
            return None;
        }
        Some((min_x, min_y, max_x, max_y))
    }

    fn config_fov(&self, degrees: f32) -> f32 {
        degrees.to_radians()
    }
}

impl FrameDataProvider for ClusteredLightsProvider {
    type Data = ClusteredLightsData;

    fn update_data(
        &mut self,
        pass: &mut Pass<'_>,
        view: &View,
        extracted: &ExtractedRenderData,
    ) -> ClusteredLightsData {
        let extent = view.viewport().extent();
        let grid = self.config.grid_dimensions(extent.width.max(1), extent.height.max(1));
        let cluster_count = (grid.0 * grid.1) as usize;

        let lights: Vec<GpuPointLight> = extracted
            .lights()
            .iter()
            .map(|light| GpuPointLight {
                position_radius: [
                    light.position.x,
                    light.position.y,
                    light.position.z,
                    light.radius,
                ],
                color_intensity: [light.color.r, light.color.g, light.color.b, light.intensity],
            })
            .collect();

        let mut clusters = vec![Vec::new(); cluster_count];
        for (light_index, light) in extracted.lights().iter().enumerate() {
            let Some((min_x, min_y, max_x, max_y)) = self.cluster_range(light, view, grid) else {
                continue;
            };
            for y in min_y..max_y {
                for x in min_x..max_x {
                    let cluster = &mut clusters[(y * grid.0 + x) as usize];
                    if cluster.len() < self.config.max_lights_per_cluster as usize {
                        cluster.push(light_index as u32);
                    } else {
                        log::warn!(
                            "Cluster ({x},{y}) overflowed {} lights; dropping light {light_index}.",
                            self.config.max_lights_per_cluster
                        );
                    }
                }
            }
        }

        let mut table = Vec::with_capacity(cluster_count);
        let mut index_list: Vec<u32> = Vec::new();
        for cluster in &clusters {
            table.push(GpuClusterEntry {
                offset: index_list.len() as u32,
                count: cluster.len() as u32,
            });
            index_list.extend_from_slice(cluster);
        }

        let lights_bytes = bytemuck::cast_slice::<_, u8>(&lights);
        let table_bytes = bytemuck::cast_slice::<_, u8>(&table);
        let index_bytes = bytemuck::cast_slice::<_, u8>(&index_list);
        let cluster_table_offset = lights_bytes.len() as u64;
        let index_list_offset = cluster_table_offset + table_bytes.len() as u64;
        let total = (index_list_offset + index_bytes.len() as u64).max(16);

        let device = pass.device();
        if self.buffer.is_invalidated() || self.buffer_capacity < total {
            // The view must go before the buffer it targets.
            if !self.view.is_invalidated() {
                device.destroy_resource_view(self.view);
                self.view = ResourceViewHandle::INVALID;
            }
            if !self.buffer.is_invalidated() {
                device.destroy_buffer(self.buffer);
            }
            let desc = BufferDesc {
                size: total.next_power_of_two(),
                usage: BufferUsage::SHADER_RESOURCE | BufferUsage::COPY_DST,
                element_stride: 0,
                mutable: true,
            };
            match device.create_buffer(&desc, None) {
                Ok(buffer) => {
                    self.buffer = buffer;
                    self.buffer_capacity = desc.size;
                    match device.create_buffer_resource_view(buffer, &ResourceViewDesc::default())
                    {
                        Ok(view) => self.view = view,
                        Err(err) => error!("Clustered light view creation failed: {err}"),
                    }
                }
                Err(err) => {
                    error!("Clustered light buffer allocation failed: {err}");
                    self.buffer = BufferHandle::INVALID;
                    self.buffer_capacity = 0;
                }
            }
        }
        if !self.buffer.is_invalidated() {
            let _ = device.write_buffer(self.buffer, 0, lights_bytes);
            let _ = device.write_buffer(self.buffer, cluster_table_offset, table_bytes);
            let _ = device.write_buffer(self.buffer, index_list_offset, index_bytes);
        }

        ClusteredLightsData {
            config: self.config,
            grid,
            buffer: self.buffer,
            view: self.view,
            light_count: lights.len() as u32,
            cluster_table_offset,
            index_list_offset,
        }
    }
}

// ---------------------------------------------------------------------------
// Instance data
// ---------------------------------------------------------------------------

/// GPU layout of one instance transform.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuInstanceData {
    /// Object-to-world matrix, column-major.
    pub transform: [[f32; 4]; 4],
}

/// The per-frame output of [`InstanceDataProvider`].
#[derive(Debug, Clone)]
pub struct InstanceBufferData {
    /// The GPU buffer of [`GpuInstanceData`] entries.
    pub buffer: BufferHandle,
    /// A shader resource view over [`buffer`](Self::buffer), owned by the
    /// provider.
    pub view: ResourceViewHandle,
    /// Number of instances uploaded.
    pub instance_count: u32,
}

/// Gathers the transforms of the lit opaque/masked categories into one
/// instancing buffer.
#[derive(Debug, Default)]
pub struct InstanceDataProvider {
    buffer: BufferHandle,
    view: ResourceViewHandle,
    buffer_capacity: u64,
}

impl InstanceDataProvider {
    /// Creates the provider.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameDataProvider for InstanceDataProvider {
    type Data = InstanceBufferData;

    fn update_data(
        &mut self,
        pass: &mut Pass<'_>,
        _view: &View,
        extracted: &ExtractedRenderData,
    ) -> InstanceBufferData {
        let mut instances: Vec<GpuInstanceData> = Vec::new();
        for category in [
            DefaultRenderDataCategories::LIT_OPAQUE,
            DefaultRenderDataCategories::LIT_MASKED,
        ] {
            for data in extracted.batch(category) {
                let transform: Mat4 = data.transform;
                instances.push(GpuInstanceData {
                    transform: transform.to_cols_array_2d(),
                });
            }
        }

        let bytes = bytemuck::cast_slice::<_, u8>(&instances);
        let needed = (bytes.len() as u64).max(std::mem::size_of::<GpuInstanceData>() as u64);

        let device = pass.device();
        if self.buffer.is_invalidated() || self.buffer_capacity < needed {
            if !self.view.is_invalidated() {
                device.destroy_resource_view(self.view);
                self.view = ResourceViewHandle::INVALID;
            }
            if !self.buffer.is_invalidated() {
                device.destroy_buffer(self.buffer);
            }
            let desc = BufferDesc {
                size: needed.next_power_of_two(),
                usage: BufferUsage::SHADER_RESOURCE | BufferUsage::COPY_DST,
                element_stride: std::mem::size_of::<GpuInstanceData>() as u32,
                mutable: true,
            };
            match device.create_buffer(&desc, None) {
                Ok(buffer) => {
                    self.buffer = buffer;
                    self.buffer_capacity = desc.size;
                    match device.create_buffer_resource_view(buffer, &ResourceViewDesc::default())
                    {
                        Ok(view) => self.view = view,
                        Err(err) => error!("Instance view creation failed: {err}"),
                    }
                }
                Err(err) => {
                    error!("Instance buffer allocation failed: {err}");
                    self.buffer = BufferHandle::INVALID;
                    self.buffer_capacity = 0;
                }
            }
        }
        if !self.buffer.is_invalidated() && !bytes.is_empty() {
            let _ = device.write_buffer(self.buffer, 0, bytes);
        }

        InstanceBufferData {
            buffer: self.buffer,
            view: self.view,
            instance_count: instances.len() as u32,
        }
    }
}
