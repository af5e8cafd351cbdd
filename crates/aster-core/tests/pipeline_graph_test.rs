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

//! Render pipeline graph behavior: sorting, description resolution,
//! transient targets, execution and (de)serialization.

use std::sync::{Arc, Mutex};

use aster_core::gal::headless::HeadlessBackend;
use aster_core::gal::{
    GalDevice, ShaderDesc, ShaderStageDesc, TextureDesc, TextureFormat,
};
use aster_core::math::{LinearRgba, Mat4, Vec3, Viewport};
use aster_core::pipeline::passes::{
    DepthPrePass, OpaqueForwardPass, SourcePass, TargetPass, TonemapPass,
};
use aster_core::pipeline::{
    render_data_type_hash, ClusterGridConfig, ClusteredLightsProvider, ConnectionRecord,
    DefaultRenderDataCategories, ExtractedRenderData, InstanceDataProvider, NodePins,
    PassConnection, PassFactoryRegistry, PassRecord, PassThroughAliasing, PipelineError,
    PipelineState, PointLightData, RenderData, RenderPipeline, RenderPipelinePass,
    RenderPipelineResourceDescriptor, RenderPipelineResourceLoader, RenderTargetSlot,
    RenderViewContext, View,
};
use uuid::Uuid;

fn headless_device() -> GalDevice {
    let _ = env_logger::builder().is_test(true).try_init();
    GalDevice::new(Box::new(HeadlessBackend::new()))
}

fn view_1080p() -> View {
    View::new("TestView", Viewport::from_size(1920.0, 1080.0))
}

fn graphics_shader(device: &mut GalDevice, name: &str) -> aster_core::gal::ShaderHandle {
    let stage = ShaderStageDesc {
        bytecode: Arc::from(&[1u8, 2, 3][..]),
        entry_point: "main".to_string(),
    };
    device
        .create_shader(&ShaderDesc {
            vertex: Some(stage.clone()),
            pixel: Some(stage),
            compute: None,
            debug_name: name.to_string(),
        })
        .unwrap()
}

/// A configurable test pass that records its execution into a shared log.
#[derive(Debug)]
struct ProbePass {
    name: String,
    pins: NodePins,
    aliasing: PassThroughAliasing,
    log: Arc<Mutex<Vec<String>>>,
}

impl ProbePass {
    fn source(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Box<Self> {
        Box::new(Self {
            name: name.to_string(),
            pins: NodePins::builder().output("Out").build(),
            aliasing: PassThroughAliasing::Alias,
            log: log.clone(),
        })
    }

    fn transform(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Box<Self> {
        Box::new(Self {
            name: name.to_string(),
            pins: NodePins::builder().input("In").output("Out").build(),
            aliasing: PassThroughAliasing::Alias,
            log: log.clone(),
        })
    }

    fn pass_through(
        name: &str,
        log: &Arc<Mutex<Vec<String>>>,
        aliasing: PassThroughAliasing,
    ) -> Box<Self> {
        Box::new(Self {
            name: name.to_string(),
            pins: NodePins::builder().pass_through("PT").build(),
            aliasing,
            log: log.clone(),
        })
    }

    fn sink(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Box<Self> {
        Box::new(Self {
            name: name.to_string(),
            pins: NodePins::builder().input("In").build(),
            aliasing: PassThroughAliasing::Alias,
            log: log.clone(),
        })
    }
}

impl RenderPipelinePass for ProbePass {
    fn type_name(&self) -> &'static str {
        "ProbePass"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn pins(&self) -> &NodePins {
        &self.pins
    }

    fn pass_through_aliasing(&self, _pin: &aster_core::pipeline::Pin) -> PassThroughAliasing {
        self.aliasing
    }

    fn target_descriptions(
        &self,
        view: &View,
        inputs: &[Option<&TextureDesc>],
        outputs: &mut [Option<TextureDesc>],
    ) -> Result<(), PipelineError> {
        let extent = view.viewport().extent();
        for index in 0..outputs.len() {
            // Forward the first connected input, or produce a
            // viewport-sized color target.
            outputs[index] = Some(match inputs.iter().flatten().next() {
                Some(desc) => (*desc).clone(),
                None => TextureDesc::render_target(
                    extent.width,
                    extent.height,
                    TextureFormat::Rgba8Unorm,
                ),
            });
        }
        Ok(())
    }

    fn execute(
        &mut self,
        _ctx: &mut RenderViewContext<'_, '_>,
        _inputs: &[Option<&PassConnection>],
        _outputs: &[Option<&PassConnection>],
    ) {
        self.log.lock().unwrap().push(self.name.clone());
    }
}

fn render_once(pipeline: &mut RenderPipeline, view: &View, device: &mut GalDevice) -> bool {
    let extracted = ExtractedRenderData::new();
    device.begin_frame();
    let rendered = pipeline.render(view, device, &extracted);
    device.end_frame();
    rendered
}

#[test]
fn execution_order_is_topological() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut device = headless_device();
    let view = view_1080p();

    // Insert out of dependency order on purpose.
    let mut pipeline = RenderPipeline::new("Diamond");
    pipeline.add_pass(ProbePass::sink("Sink", &log));
    pipeline.add_pass(ProbePass::transform("Left", &log));
    pipeline.add_pass(ProbePass::transform("Right", &log));
    pipeline.add_pass(ProbePass::source("Root", &log));
    pipeline.add_pass(ProbePass::transform("Join", &log));

    pipeline.connect("Root", "Out", "Left", "In").unwrap();
    pipeline.connect("Root", "Out", "Right", "In").unwrap();
    pipeline.connect("Left", "Out", "Join", "In").unwrap();
    pipeline.connect("Join", "Out", "Sink", "In").unwrap();

    assert_eq!(pipeline.rebuild(&view, &mut device), PipelineState::Initialized);
    assert!(render_once(&mut pipeline, &view, &mut device));

    let order = log.lock().unwrap().clone();
    let position =
        |name: &str| order.iter().position(|n| n == name).expect("pass executed");
    assert_eq!(order.len(), 5);
    assert!(position("Root") < position("Left"));
    assert!(position("Root") < position("Right"));
    assert!(position("Left") < position("Join"));
    assert!(position("Join") < position("Sink"));

    pipeline.destroy(&mut device);
}

#[test]
fn readers_execute_before_the_pass_through_consumer() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut device = headless_device();
    let view = view_1080p();

    // The pass-through consumer is inserted first, so insertion order alone
    // would run it before the plain reader.
    let mut pipeline = RenderPipeline::new("PassThroughOrder");
    pipeline.add_pass(ProbePass::pass_through(
        "Mutator",
        &log,
        PassThroughAliasing::Alias,
    ));
    pipeline.add_pass(ProbePass::sink("Reader", &log));
    pipeline.add_pass(ProbePass::source("Root", &log));

    pipeline.connect("Root", "Out", "Mutator", "PT").unwrap();
    pipeline.connect("Root", "Out", "Reader", "In").unwrap();

    assert_eq!(pipeline.rebuild(&view, &mut device), PipelineState::Initialized);
    assert!(render_once(&mut pipeline, &view, &mut device));

    let order = log.lock().unwrap().clone();
    let position =
        |name: &str| order.iter().position(|n| n == name).expect("pass executed");
    assert!(position("Reader") < position("Mutator"));

    pipeline.destroy(&mut device);
}

#[test]
fn cycles_fail_the_rebuild() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut device = headless_device();
    let view = view_1080p();

    let mut pipeline = RenderPipeline::new("Cycle");
    pipeline.add_pass(ProbePass::pass_through("A", &log, PassThroughAliasing::Alias));
    pipeline.add_pass(ProbePass::pass_through("B", &log, PassThroughAliasing::Alias));
    pipeline.connect("A", "PT", "B", "PT").unwrap();
    pipeline.connect("B", "PT", "A", "PT").unwrap();

    assert_eq!(pipeline.rebuild(&view, &mut device), PipelineState::RebuildError);
    // Rendering a broken pipeline is a no-op, not a crash.
    assert!(!render_once(&mut pipeline, &view, &mut device));
    assert!(log.lock().unwrap().is_empty());

    pipeline.destroy(&mut device);
}

#[test]
fn aliasing_policy_controls_pass_through_textures() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut device = headless_device();
    let view = view_1080p();

    for (aliasing, expect_shared) in [
        (PassThroughAliasing::Alias, true),
        (PassThroughAliasing::Copy, false),
    ] {
        let mut pipeline = RenderPipeline::new("Aliasing");
        pipeline.add_pass(ProbePass::source("Root", &log));
        pipeline.add_pass(ProbePass::pass_through("Mutator", &log, aliasing));
        pipeline.connect("Root", "Out", "Mutator", "PT").unwrap();
        assert_eq!(pipeline.rebuild(&view, &mut device), PipelineState::Initialized);

        let input = pipeline.input_connection("Mutator", "PT").unwrap().texture;
        let output = pipeline.output_connection("Mutator", "PT").unwrap().texture;
        assert!(!input.is_invalidated());
        assert!(!output.is_invalidated());
        assert_eq!(input == output, expect_shared);

        pipeline.destroy(&mut device);
    }
}

#[test]
fn transient_targets_are_reused_across_rebuilds() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut device = headless_device();
    let mut view = view_1080p();

    let mut pipeline = RenderPipeline::new("Reuse");
    pipeline.add_pass(ProbePass::source("Root", &log));
    pipeline.add_pass(ProbePass::sink("Sink", &log));
    pipeline.connect("Root", "Out", "Sink", "In").unwrap();

    assert_eq!(pipeline.rebuild(&view, &mut device), PipelineState::Initialized);
    let allocations = pipeline.transient_allocation_count();
    assert!(allocations > 0);

    // Unchanged description: the pool must satisfy the rebuild.
    pipeline.rebuild(&view, &mut device);
    pipeline.rebuild(&view, &mut device);
    assert_eq!(pipeline.transient_allocation_count(), allocations);

    // A different output size is a different descriptor.
    view.set_viewport(Viewport::from_size(1280.0, 720.0));
    assert_eq!(
        pipeline.ensure_rebuilt(&view, &mut device),
        PipelineState::Initialized
    );
    assert!(pipeline.transient_allocation_count() > allocations);

    pipeline.destroy(&mut device);
}

#[test]
fn forward_chain_resolves_descriptions_and_order_at_1080p() {
    let mut device = headless_device();
    let mut view = view_1080p();

    // The view's final color target.
    let backbuffer = device
        .create_texture(
            &TextureDesc::render_target(1920, 1080, TextureFormat::Rgba8UnormSrgb),
            &[],
        )
        .unwrap();
    view.set_render_target(RenderTargetSlot::Color(0), backbuffer);
    view.camera_mut().position = Vec3::new(0.0, 2.0, 10.0);

    let depth_shader = graphics_shader(&mut device, "depth_only");
    let forward_shader = graphics_shader(&mut device, "forward");
    let tonemap_shader = graphics_shader(&mut device, "tonemap");

    let mut pipeline = RenderPipeline::new("Forward");
    pipeline.add_pass(Box::new(SourcePass::new("ColorSource")));
    pipeline.add_pass(Box::new(DepthPrePass::new("DepthPre").with_shader(depth_shader)));
    pipeline.add_pass(Box::new(
        OpaqueForwardPass::new("OpaqueForward").with_shader(forward_shader),
    ));
    pipeline.add_pass(Box::new(TonemapPass::new("Tonemap").with_shader(tonemap_shader)));
    pipeline.add_pass(Box::new(TargetPass::new("Target")));

    pipeline
        .connect("ColorSource", "Output", "OpaqueForward", "Color")
        .unwrap();
    pipeline
        .connect("DepthPre", "DepthStencil", "OpaqueForward", "DepthStencil")
        .unwrap();
    pipeline
        .connect("OpaqueForward", "Color", "Tonemap", "Color")
        .unwrap();
    pipeline
        .connect("Tonemap", "Output", "Target", "Color0")
        .unwrap();

    pipeline
        .providers_mut()
        .insert(InstanceDataProvider::new());
    pipeline
        .providers_mut()
        .insert(ClusteredLightsProvider::new(ClusterGridConfig::default()));

    assert_eq!(pipeline.rebuild(&view, &mut device), PipelineState::Initialized);

    // Every intermediate description resolves to the view size, formats
    // propagated through the pass-through pins.
    let hdr = pipeline.output_connection("ColorSource", "Output").unwrap();
    assert_eq!((hdr.desc.size.width, hdr.desc.size.height), (1920, 1080));
    assert_eq!(hdr.desc.format, TextureFormat::Rgba16Float);

    let depth = pipeline.output_connection("DepthPre", "DepthStencil").unwrap();
    assert_eq!((depth.desc.size.width, depth.desc.size.height), (1920, 1080));
    assert_eq!(depth.desc.format, TextureFormat::Depth24PlusStencil8);

    let forwarded = pipeline.input_connection("Tonemap", "Color").unwrap();
    assert_eq!(
        (forwarded.desc.size.width, forwarded.desc.size.height),
        (1920, 1080)
    );
    assert_eq!(forwarded.desc.format, TextureFormat::Rgba16Float);

    let ldr = pipeline.input_connection("Target", "Color0").unwrap();
    assert_eq!((ldr.desc.size.width, ldr.desc.size.height), (1920, 1080));
    assert_eq!(ldr.desc.format, TextureFormat::Rgba8UnormSrgb);
    // The target-pass binding resolves to the view's backbuffer.
    assert_eq!(ldr.texture, backbuffer);

    // The pass-through output aliases its input.
    let pt_in = pipeline.input_connection("OpaqueForward", "Color").unwrap().texture;
    let pt_out = pipeline.output_connection("OpaqueForward", "Color").unwrap().texture;
    assert_eq!(pt_in, pt_out);

    assert_eq!(
        pipeline.ordered_pass_names(),
        vec!["ColorSource", "DepthPre", "OpaqueForward", "Tonemap", "Target"]
    );

    // Render with some extracted data and verify work was recorded.
    let mut extracted = ExtractedRenderData::new();
    for i in 0..4 {
        extracted.add(
            DefaultRenderDataCategories::LIT_OPAQUE,
            RenderData {
                transform: Mat4::IDENTITY,
                position: Vec3::new(i as f32, 0.0, -5.0),
                sorting_depth_offset: 0.0,
                sorting_key: i,
                type_hash: render_data_type_hash("MeshRenderData"),
                vertex_count: 36,
            },
        );
    }
    extracted.add_light(PointLightData {
        position: Vec3::new(0.0, 3.0, -5.0),
        radius: 8.0,
        color: LinearRgba::new(1.0, 0.9, 0.8, 1.0),
        intensity: 2.0,
    });

    device.begin_frame();
    assert!(pipeline.render(&view, &mut device, &extracted));
    device.end_frame();

    let stats = device.stats();
    // 4 depth-pre draws, 4 forward draws, 1 tonemap triangle.
    assert_eq!(stats.draw_calls, 9);
    assert!(stats.encoder_scopes >= 4);

    pipeline.destroy(&mut device);
}

#[test]
fn unconnected_required_input_aborts_the_rebuild() {
    let mut device = headless_device();
    let view = view_1080p();

    let mut pipeline = RenderPipeline::new("Broken");
    pipeline.add_pass(Box::new(SourcePass::new("ColorSource")));
    pipeline.add_pass(Box::new(OpaqueForwardPass::new("OpaqueForward")));
    pipeline.add_pass(Box::new(TargetPass::new("Target")));
    // Color is wired, DepthStencil is not.
    pipeline
        .connect("ColorSource", "Output", "OpaqueForward", "Color")
        .unwrap();

    assert_eq!(pipeline.rebuild(&view, &mut device), PipelineState::RebuildError);
    assert!(!render_once(&mut pipeline, &view, &mut device));

    // The documented fallback keeps frames coming.
    let mut missing = RenderPipelineResourceLoader::create_missing_pipeline();
    assert_eq!(missing.rebuild(&view, &mut device), PipelineState::Initialized);
    assert!(render_once(&mut missing, &view, &mut device));

    missing.destroy(&mut device);
    pipeline.destroy(&mut device);
}

#[test]
fn wiring_errors_are_reported() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut pipeline = RenderPipeline::new("Errors");
    pipeline.add_pass(ProbePass::source("Root", &log));
    pipeline.add_pass(ProbePass::sink("Sink", &log));

    assert!(matches!(
        pipeline.connect("Nope", "Out", "Sink", "In"),
        Err(PipelineError::UnknownPass(_))
    ));
    assert!(matches!(
        pipeline.connect("Root", "Nope", "Sink", "In"),
        Err(PipelineError::UnknownPin { .. })
    ));
    assert!(matches!(
        pipeline.connect("Sink", "In", "Root", "Out"),
        Err(PipelineError::NotAnOutputPin { .. })
    ));
    pipeline.connect("Root", "Out", "Sink", "In").unwrap();
    assert!(matches!(
        pipeline.connect("Root", "Out", "Sink", "In"),
        Err(PipelineError::InputAlreadyConnected { .. })
    ));

    pipeline.disconnect("Sink", "In").unwrap();
    assert!(matches!(
        pipeline.disconnect("Sink", "In"),
        Err(PipelineError::NotConnected { .. })
    ));
    assert!(pipeline.edges().is_empty());
}

#[test]
fn descriptor_blob_round_trips() {
    let mut descriptor = forward_descriptor();
    // Config values must survive the binary blob too.
    descriptor.passes[3]
        .config
        .insert("output_format".to_string(), serde_json::json!("Rgba8Unorm"));
    let bytes = descriptor.to_bytes().unwrap();
    let decoded = RenderPipelineResourceDescriptor::from_bytes(&bytes).unwrap();
    assert_eq!(descriptor, decoded);
    assert_eq!(
        decoded.passes[3].config_value::<TextureFormat>("output_format"),
        Some(TextureFormat::Rgba8Unorm)
    );
}

#[test]
fn loaded_pipelines_reconstruct_the_pass_and_edge_graph() {
    let descriptor = forward_descriptor();
    let registry = PassFactoryRegistry::with_default_passes();
    let pipeline =
        RenderPipelineResourceLoader::create_render_pipeline(&descriptor, &registry).unwrap();

    assert_eq!(pipeline.pass_count(), descriptor.passes.len());
    let described = RenderPipelineResourceLoader::describe(&pipeline, descriptor.id);
    assert_eq!(described.passes.len(), descriptor.passes.len());
    for record in &descriptor.passes {
        let round_tripped = described
            .passes
            .iter()
            .find(|p| p.name == record.name)
            .expect("pass survived the round trip");
        assert_eq!(round_tripped.type_name, record.type_name);
    }

    let mut expected_edges = descriptor.connections.clone();
    expected_edges.sort();
    assert_eq!(described.connections, expected_edges);
}

#[test]
fn unknown_pass_types_fail_the_load() {
    let mut descriptor = forward_descriptor();
    descriptor.passes.push(PassRecord::new("HologramPass", "Hologram"));
    let registry = PassFactoryRegistry::with_default_passes();
    assert!(matches!(
        RenderPipelineResourceLoader::create_render_pipeline(&descriptor, &registry),
        Err(PipelineError::UnknownPassType(name)) if name == "HologramPass"
    ));
}

fn forward_descriptor() -> RenderPipelineResourceDescriptor {
    let edge = |from_pass: &str, from_pin: &str, to_pass: &str, to_pin: &str| ConnectionRecord {
        from_pass: from_pass.to_string(),
        from_pin: from_pin.to_string(),
        to_pass: to_pass.to_string(),
        to_pin: to_pin.to_string(),
    };
    RenderPipelineResourceDescriptor {
        name: "Forward".to_string(),
        id: Uuid::new_v5(&Uuid::NAMESPACE_OID, b"forward-pipeline"),
        passes: vec![
            PassRecord::new("SourcePass", "ColorSource"),
            PassRecord::new("DepthPrePass", "DepthPre"),
            PassRecord::new("OpaqueForwardPass", "OpaqueForward"),
            PassRecord::new("TonemapPass", "Tonemap"),
            PassRecord::new("TargetPass", "Target"),
        ],
        connections: vec![
            edge("ColorSource", "Output", "OpaqueForward", "Color"),
            edge("DepthPre", "DepthStencil", "OpaqueForward", "DepthStencil"),
            edge("OpaqueForward", "Color", "Tonemap", "Color"),
            edge("Tonemap", "Output", "Target", "Color0"),
        ],
    }
}
