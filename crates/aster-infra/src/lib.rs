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

//! # Aster Infra
//!
//! Concrete backend implementations for the `aster-core` graphics
//! abstraction layer. Currently ships the `wgpu` backend, which fans out
//! to Vulkan, Direct3D 12 or Metal depending on platform and the caller's
//! backend preference list.

pub mod graphics;

use aster_core::gal::{DeviceFactory, GalBackend};

use crate::graphics::wgpu_backend::WgpuBackend;

/// The name the wgpu backend registers under in the device factory.
pub const WGPU_BACKEND_NAME: &str = "wgpu";

/// Registers this crate's backends with a device factory.
pub fn register_backends(factory: &mut DeviceFactory) {
    factory.register_creator(
        WGPU_BACKEND_NAME,
        "sm_6_0",
        "naga",
        Box::new(|config| {
            WgpuBackend::new(config).map(|backend| Box::new(backend) as Box<dyn GalBackend>)
        }),
    );
}
