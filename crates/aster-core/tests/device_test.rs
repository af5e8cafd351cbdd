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

//! Device-level behavior: handle lifetimes, deferred destruction, state
//! dedup, encoder scopes and redundant-state elimination, all on the
//! headless backend.

use aster_core::gal::headless::{HeadlessBackend, HeadlessProbe};
use aster_core::gal::{
    BlendStateDesc, BufferDesc, BufferUsage, GalDevice, ResourceViewDesc, SamplerStateDesc,
    ShaderDesc, ShaderStageDesc, TextureDesc, TextureFormat,
};
use std::sync::Arc;

fn headless_device() -> (GalDevice, HeadlessProbe) {
    let _ = env_logger::builder().is_test(true).try_init();
    let backend = HeadlessBackend::new();
    let probe = backend.probe();
    (GalDevice::new(Box::new(backend)), probe)
}

fn color_target_desc() -> TextureDesc {
    TextureDesc::render_target(256, 256, TextureFormat::Rgba8Unorm)
}

fn graphics_shader_desc() -> ShaderDesc {
    let stage = ShaderStageDesc {
        bytecode: Arc::from(&[0u8, 1, 2, 3][..]),
        entry_point: "main".to_string(),
    };
    ShaderDesc {
        vertex: Some(stage.clone()),
        pixel: Some(stage),
        compute: None,
        debug_name: "test_shader".to_string(),
    }
}

#[test]
fn created_handles_are_valid_until_destroyed() {
    let (mut device, _probe) = headless_device();
    let texture = device.create_texture(&color_target_desc(), &[]).unwrap();
    assert!(!texture.is_invalidated());
    assert!(device.texture(texture).is_some());

    device.destroy_texture(texture);
    assert!(device.texture(texture).is_none());
}

#[test]
fn stale_handles_do_not_resolve_reused_slots() {
    let (mut device, _probe) = headless_device();
    let first = device.create_texture(&color_target_desc(), &[]).unwrap();
    device.destroy_texture(first);

    // The slot may be reused; the old handle must not see the newcomer.
    let second = device.create_texture(&color_target_desc(), &[]).unwrap();
    assert!(device.texture(first).is_none());
    assert!(device.texture(second).is_some());
    if first.index() == second.index() {
        assert_ne!(first.generation(), second.generation());
    }
}

#[test]
fn destruction_is_deferred_until_frame_retirement() {
    let (mut device, probe) = headless_device();
    device.begin_frame();
    let texture = device.create_texture(&color_target_desc(), &[]).unwrap();
    assert_eq!(probe.snapshot().live_textures, 1);

    device.destroy_texture(texture);
    // The handle dies immediately, the native object does not.
    assert!(device.texture(texture).is_none());
    assert_eq!(probe.snapshot().live_textures, 1);
    assert_eq!(device.pending_destruction_count(), 1);

    // The headless backend retires a frame as soon as it ends.
    device.end_frame();
    assert_eq!(probe.snapshot().live_textures, 0);
    assert_eq!(device.pending_destruction_count(), 0);
}

#[test]
fn invalid_texture_descriptor_fails_without_touching_the_backend() {
    let (mut device, probe) = headless_device();
    let mut desc = color_target_desc();
    desc.size.width = 0;
    assert!(device.create_texture(&desc, &[]).is_err());

    let mut desc = color_target_desc();
    desc.size.width = device.capabilities().max_texture_dimension_2d + 1;
    assert!(device.create_texture(&desc, &[]).is_err());

    // Constant buffers are capped by the device limit.
    let big = BufferDesc {
        size: device.capabilities().max_constant_buffer_size + 1,
        usage: BufferUsage::CONSTANT,
        element_stride: 0,
        mutable: true,
    };
    assert!(device.create_buffer(&big, None).is_err());

    assert_eq!(probe.snapshot().live_textures, 0);
    assert_eq!(probe.snapshot().live_buffers, 0);
}

#[test]
fn state_objects_are_deduplicated_by_descriptor() {
    let (mut device, probe) = headless_device();
    let a = device.create_blend_state(&BlendStateDesc::default()).unwrap();
    let b = device.create_blend_state(&BlendStateDesc::default()).unwrap();
    assert_eq!(a, b);
    assert_eq!(probe.snapshot().live_states, 1);

    let different = device
        .create_blend_state(&BlendStateDesc::alpha_blended())
        .unwrap();
    assert_ne!(a, different);
    assert_eq!(probe.snapshot().live_states, 2);

    // Two references, so the first destroy keeps the object alive.
    device.destroy_blend_state(a);
    assert!(device.blend_state(b).is_some());
    device.destroy_blend_state(b);
    assert!(device.blend_state(b).is_none());

    let sampler_a = device
        .create_sampler_state(&SamplerStateDesc::default())
        .unwrap();
    let sampler_b = device
        .create_sampler_state(&SamplerStateDesc::default())
        .unwrap();
    assert_eq!(sampler_a, sampler_b);
}

#[test]
#[should_panic(expected = "live view")]
fn destroying_a_texture_with_live_views_asserts() {
    let (mut device, _probe) = headless_device();
    let texture = device.create_texture(&color_target_desc(), &[]).unwrap();
    let _view = device
        .create_resource_view(texture, &ResourceViewDesc::default())
        .unwrap();
    device.destroy_texture(texture);
}

#[test]
fn views_release_their_parent_on_destroy() {
    let (mut device, _probe) = headless_device();
    let texture = device.create_texture(&color_target_desc(), &[]).unwrap();
    let view = device
        .create_resource_view(texture, &ResourceViewDesc::default())
        .unwrap();
    device.destroy_resource_view(view);
    // No views left; destruction must not assert.
    device.destroy_texture(texture);
    assert!(device.texture(texture).is_none());
}

#[test]
fn default_views_are_cached_and_owned_by_the_texture() {
    let (mut device, _probe) = headless_device();
    let texture = device.create_texture(&color_target_desc(), &[]).unwrap();
    let a = device.default_resource_view(texture).unwrap();
    let b = device.default_resource_view(texture).unwrap();
    assert_eq!(a, b);
    let rtv = device.default_render_target_view(texture).unwrap();
    assert!(!rtv.is_invalidated());

    // The texture owns its default views and tears them down itself.
    device.destroy_texture(texture);
    assert!(device.resource_view(a).is_none());
    assert!(device.render_target_view(rtv).is_none());
}

#[test]
fn redundant_state_changes_are_elided() {
    let (mut device, _probe) = headless_device();
    let shader = device.create_shader(&graphics_shader_desc()).unwrap();
    let texture = device.create_texture(&color_target_desc(), &[]).unwrap();
    let rtv = device.default_render_target_view(texture).unwrap();

    device.begin_frame();
    {
        let mut pass = device.begin_pass("Probe");
        let setup = aster_core::gal::RenderingSetup::single_color(rtv, None);
        let mut encoder = pass.begin_rendering(&setup, Some("probe"));
        encoder.set_shader(shader);
        encoder.set_shader(shader);
        encoder.set_shader(shader);
        encoder.draw(3, 0);
    }
    device.end_frame();

    let stats = device.stats();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.state_changes, 1);
    assert_eq!(stats.redundant_state_changes, 2);
    assert_eq!(stats.encoder_scopes, 1);

    device.clear_stats();
    assert_eq!(device.stats().draw_calls, 0);
    assert_eq!(device.stats().redundant_state_changes, 0);
}

#[test]
fn sequential_encoder_scopes_are_allowed() {
    let (mut device, probe) = headless_device();
    let texture = device.create_texture(&color_target_desc(), &[]).unwrap();
    let rtv = device.default_render_target_view(texture).unwrap();

    device.begin_frame();
    {
        let mut pass = device.begin_pass("Frame");
        let setup = aster_core::gal::RenderingSetup::single_color(rtv, None);
        {
            let _render = pass.begin_rendering(&setup, Some("first"));
        }
        {
            let _compute = pass.begin_compute(Some("second"));
        }
        {
            let _render = pass.begin_rendering(&setup, None);
        }
    }
    device.end_frame();

    let counters = probe.snapshot();
    assert_eq!(counters.render_scopes, 2);
    assert_eq!(counters.compute_scopes, 1);
    assert_eq!(counters.submitted_recorders, 1);
}

#[test]
#[should_panic(expected = "Nested passes are not allowed")]
fn a_leaked_pass_scope_trips_the_nesting_assert() {
    let (mut device, _probe) = headless_device();
    device.begin_frame();
    // Forgetting the scope skips its drop, leaving the device convinced a
    // pass is still open, exactly the misuse the assert exists for.
    let pass = device.begin_pass("Leaked");
    std::mem::forget(pass);
    let _second = device.begin_pass("Second");
}

#[test]
#[should_panic(expected = "another encoder scope is open")]
fn nested_encoder_scopes_assert() {
    let (mut device, _probe) = headless_device();
    let texture = device.create_texture(&color_target_desc(), &[]).unwrap();
    let rtv = device.default_render_target_view(texture).unwrap();

    device.begin_frame();
    let mut pass = device.begin_pass("Nested");
    let setup = aster_core::gal::RenderingSetup::single_color(rtv, None);
    // Forgetting the guard leaves the render scope open; the state machine
    // must reject the second scope.
    let encoder = pass.begin_rendering(&setup, None);
    std::mem::forget(encoder);
    let _second = pass.begin_compute(None);
}

#[test]
#[should_panic(expected = "greater than zero")]
fn zero_sized_dispatch_asserts() {
    let (mut device, _probe) = headless_device();
    device.begin_frame();
    let mut pass = device.begin_pass("Compute");
    let mut encoder = pass.begin_compute(None);
    encoder.dispatch(0, 1, 1);
}

#[test]
fn write_buffer_validates_bounds() {
    let (mut device, _probe) = headless_device();
    let buffer = device
        .create_buffer(
            &BufferDesc {
                size: 16,
                usage: BufferUsage::SHADER_RESOURCE | BufferUsage::COPY_DST,
                element_stride: 0,
                mutable: true,
            },
            None,
        )
        .unwrap();
    assert!(device.write_buffer(buffer, 0, &[0u8; 16]).is_ok());
    assert!(device.write_buffer(buffer, 8, &[0u8; 16]).is_err());
}

#[test]
fn init_context_uploads_flush_at_frame_begin() {
    let (mut device, probe) = headless_device();
    assert!(device.capabilities().multithreaded_resource_creation);

    let texture = device.create_texture(&color_target_desc(), &[]).unwrap();
    let ctx = device.init_context();

    // Loader threads submit concurrently; the render thread flushes.
    let workers: Vec<_> = (0..3)
        .map(|_| {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                ctx.init_texture(
                    texture,
                    0,
                    aster_core::math::Origin3D::default(),
                    aster_core::math::Extent3D::new_2d(16, 16),
                    &[0u8; 1024],
                    64,
                );
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(ctx.pending_count(), 3);

    device.begin_frame();
    assert_eq!(ctx.pending_count(), 0);
    // The whole batch went through one recorder.
    assert_eq!(probe.snapshot().submitted_recorders, 1);
    device.end_frame();
}

#[test]
fn swap_chain_acquire_and_present() {
    use raw_window_handle::{
        RawDisplayHandle, RawWindowHandle, WebDisplayHandle, WebWindowHandle,
    };

    let (mut device, probe) = headless_device();
    let desc = aster_core::gal::SwapChainDesc {
        window: RawWindowHandle::Web(WebWindowHandle::new(1)),
        display: RawDisplayHandle::Web(WebDisplayHandle::new()),
        width: 800,
        height: 600,
        format: TextureFormat::Bgra8UnormSrgb,
        present_mode: aster_core::gal::PresentMode::VSync,
    };
    let swap_chain = device.create_swap_chain(&desc).unwrap();
    assert_eq!(probe.snapshot().live_swap_chains, 1);

    let backbuffer = device.acquire_next_render_target(swap_chain).unwrap();
    let texture = device.texture(backbuffer).unwrap();
    assert_eq!(texture.desc.size.width, 800);
    assert_eq!(texture.desc.size.height, 600);
    device.present_render_target(swap_chain);

    device.destroy_swap_chain(swap_chain);
    assert!(device.texture(backbuffer).is_none());
    assert_eq!(probe.snapshot().live_swap_chains, 0);
}

#[test]
fn frame_events_are_delivered() {
    use aster_core::gal::GalDeviceEvent;

    let (mut device, _probe) = headless_device();
    let events = device.events();
    let frame = device.begin_frame();
    device.end_frame();

    assert_eq!(events.try_recv(), Ok(GalDeviceEvent::FrameBegin(frame)));
    assert_eq!(events.try_recv(), Ok(GalDeviceEvent::FrameRetired(frame)));
}

#[test]
fn shutdown_releases_every_native_object() {
    let (mut device, probe) = headless_device();
    let texture = device.create_texture(&color_target_desc(), &[]).unwrap();
    let _view = device.default_resource_view(texture).unwrap();
    let _buffer = device
        .create_buffer(
            &BufferDesc {
                size: 64,
                usage: BufferUsage::VERTEX,
                element_stride: 16,
                mutable: false,
            },
            None,
        )
        .unwrap();
    let _shader = device.create_shader(&graphics_shader_desc()).unwrap();
    let _blend = device.create_blend_state(&BlendStateDesc::default()).unwrap();

    drop(device);

    let counters = probe.snapshot();
    assert_eq!(counters.live_textures, 0);
    assert_eq!(counters.live_buffers, 0);
    assert_eq!(counters.live_shaders, 0);
    assert_eq!(counters.live_states, 0);
    assert_eq!(counters.live_views, 0);
}
