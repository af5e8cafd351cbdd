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

//! wgpu instance/adapter/device initialization.

use anyhow::{anyhow, Result};
use aster_core::gal::{DeviceCreationConfig, GraphicsBackendType};
use log::{info, warn};
use wgpu::{Adapter, Features, Instance};

use super::conversions::backends_mask;

/// The core wgpu state objects: instance, adapter, logical device, queue.
///
/// Surface-free by construction: swap chains attach their own surfaces
/// later through the backend's swap-chain interface.
#[derive(Debug)]
pub struct WgpuGraphicsContext {
    pub instance: Instance,
    pub adapter: Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
    pub features: Features,
    pub limits: wgpu::Limits,
}

impl WgpuGraphicsContext {
    /// Initializes wgpu honoring the caller's backend preferences,
    /// blocking on the async adapter/device requests.
    pub fn new(config: &DeviceCreationConfig) -> Result<Self> {
        let backends = backends_mask(&config.preferred_backends);
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..wgpu::InstanceDescriptor::default()
        });

        let power_preference = if config.prefer_discrete_gpu {
            wgpu::PowerPreference::HighPerformance
        } else {
            wgpu::PowerPreference::LowPower
        };

        // Walk the preference list; the instance is already restricted to
        // the union, so the first responding adapter of a preferred API
        // wins.
        let adapter = pollster::block_on(Self::select_adapter(
            &instance,
            &config.preferred_backends,
            power_preference,
        ))?;

        let adapter_info = adapter.get_info();
        info!(
            "Using graphics adapter \"{}\" (backend: {:?})",
            adapter_info.name, adapter_info.backend
        );

        let wanted_features = Features::TIMESTAMP_QUERY;
        let features_to_enable = adapter.features() & wanted_features;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Aster Logical Device"),
            required_features: features_to_enable,
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::default(),
        }))
        .map_err(|e| anyhow!("Failed to create logical device: {e}"))?;

        device.on_uncaptured_error(std::sync::Arc::new(|e| {
            log::error!("WGPU uncaptured error: {e:?}");
        }));

        let features = device.features();
        let limits = device.limits();
        info!("Active device features: {features:?}");

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            adapter_info,
            features,
            limits,
        })
    }

    async fn select_adapter(
        instance: &Instance,
        preferred: &[GraphicsBackendType],
        power_preference: wgpu::PowerPreference,
    ) -> Result<Adapter> {
        match instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
        {
            Ok(adapter) => Ok(adapter),
            Err(err) => {
                warn!("No adapter for preferred backends {preferred:?}: {err}");
                Err(anyhow!("No suitable graphics adapter found: {err}"))
            }
        }
    }
}
