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

//! Frame data provider memoization and the shipped providers.

use aster_core::gal::headless::HeadlessBackend;
use aster_core::gal::{GalDevice, Pass};
use aster_core::math::{LinearRgba, Mat4, Vec3, Viewport};
use aster_core::pipeline::{
    render_data_type_hash, ClusterGridConfig, ClusteredLightsProvider, DefaultRenderDataCategories,
    ExtractedRenderData, FrameDataProvider, FrameDataProviderSet, InstanceDataProvider,
    PointLightData, RenderData, View,
};

fn headless_device() -> GalDevice {
    GalDevice::new(Box::new(HeadlessBackend::new()))
}

#[derive(Debug, Default)]
struct CountingProvider;

impl FrameDataProvider for CountingProvider {
    type Data = u32;

    fn update_data(
        &mut self,
        _pass: &mut Pass<'_>,
        _view: &View,
        _extracted: &ExtractedRenderData,
    ) -> u32 {
        7
    }
}

#[test]
fn providers_recompute_at_most_once_per_frame() {
    let mut device = headless_device();
    let view = View::new("View", Viewport::from_size(640.0, 480.0));
    let extracted = ExtractedRenderData::new();

    let mut providers = FrameDataProviderSet::new();
    providers.insert(CountingProvider);

    device.begin_frame();
    let frame = device.current_frame();
    {
        let mut pass = device.begin_pass("Frame");
        for _ in 0..5 {
            let data = providers
                .get_data::<CountingProvider>(&mut pass, &view, &extracted, frame)
                .copied();
            assert_eq!(data, Some(7));
        }
    }
    device.end_frame();
    assert_eq!(providers.update_count::<CountingProvider>(), 1);

    device.begin_frame();
    let frame = device.current_frame();
    {
        let mut pass = device.begin_pass("Frame");
        providers.get_data::<CountingProvider>(&mut pass, &view, &extracted, frame);
        providers.get_data::<CountingProvider>(&mut pass, &view, &extracted, frame);
    }
    device.end_frame();
    assert_eq!(providers.update_count::<CountingProvider>(), 2);
}

#[test]
fn missing_providers_return_none() {
    let mut device = headless_device();
    let view = View::new("View", Viewport::from_size(640.0, 480.0));
    let extracted = ExtractedRenderData::new();
    let mut providers = FrameDataProviderSet::new();

    device.begin_frame();
    let frame = device.current_frame();
    let mut pass = device.begin_pass("Frame");
    assert!(providers
        .get_data::<CountingProvider>(&mut pass, &view, &extracted, frame)
        .is_none());
}

#[test]
fn instance_provider_uploads_lit_batches() {
    let mut device = headless_device();
    let view = View::new("View", Viewport::from_size(640.0, 480.0));

    let mut extracted = ExtractedRenderData::new();
    for i in 0..3 {
        extracted.add(
            DefaultRenderDataCategories::LIT_OPAQUE,
            RenderData {
                transform: Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)),
                position: Vec3::new(i as f32, 0.0, 0.0),
                sorting_depth_offset: 0.0,
                sorting_key: i,
                type_hash: render_data_type_hash("MeshRenderData"),
                vertex_count: 3,
            },
        );
    }
    // Transparent data must not land in the instancing buffer.
    extracted.add(
        DefaultRenderDataCategories::LIT_TRANSPARENT,
        RenderData {
            transform: Mat4::IDENTITY,
            position: Vec3::ZERO,
            sorting_depth_offset: 0.0,
            sorting_key: 0,
            type_hash: render_data_type_hash("ParticleRenderData"),
            vertex_count: 3,
        },
    );

    let mut providers = FrameDataProviderSet::new();
    providers.insert(InstanceDataProvider::new());

    device.begin_frame();
    let frame = device.current_frame();
    {
        let mut pass = device.begin_pass("Frame");
        let data = providers
            .get_data::<InstanceDataProvider>(&mut pass, &view, &extracted, frame)
            .cloned()
            .unwrap();
        assert_eq!(data.instance_count, 3);
        assert!(!data.buffer.is_invalidated());
        assert!(!data.view.is_invalidated());
        assert!(pass.device().buffer(data.buffer).is_some());
    }
    device.end_frame();
}

#[test]
fn clustered_lights_cover_the_grid() {
    let mut device = headless_device();
    let mut view = View::new("View", Viewport::from_size(640.0, 480.0));
    view.camera_mut().position = Vec3::ZERO;
    view.camera_mut().forward = Vec3::NEG_Z;

    let mut extracted = ExtractedRenderData::new();
    extracted.add_light(PointLightData {
        position: Vec3::new(0.0, 0.0, -10.0),
        radius: 4.0,
        color: LinearRgba::new(1.0, 1.0, 1.0, 1.0),
        intensity: 1.0,
    });
    // Behind the camera: must be culled.
    extracted.add_light(PointLightData {
        position: Vec3::new(0.0, 0.0, 50.0),
        radius: 1.0,
        color: LinearRgba::new(1.0, 0.0, 0.0, 1.0),
        intensity: 1.0,
    });

    let config = ClusterGridConfig::default();
    let mut providers = FrameDataProviderSet::new();
    providers.insert(ClusteredLightsProvider::new(config));

    device.begin_frame();
    let frame = device.current_frame();
    {
        let mut pass = device.begin_pass("Frame");
        let data = providers
            .get_data::<ClusteredLightsProvider>(&mut pass, &view, &extracted, frame)
            .cloned()
            .unwrap();
        assert_eq!(data.light_count, 2);
        assert_eq!(data.grid, config.grid_dimensions(640, 480));
        assert!(!data.buffer.is_invalidated());
        assert!(!data.view.is_invalidated());
        // The cluster table sits behind the light array.
        assert!(data.cluster_table_offset > 0);
        assert!(data.index_list_offset >= data.cluster_table_offset);
    }
    device.end_frame();
}
