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

//! The backend registry mapping backend names to device creators.
//!
//! A [`DeviceFactory`] is plain instance state; pass it through your own
//! context wherever possible. For code that genuinely needs a process-wide
//! registry (plugin loading), an explicit `initialize_factory` /
//! `shutdown_factory` lifecycle is provided; there is no lazily
//! initialized global.

use log::{error, warn};
use std::collections::HashMap;
use std::sync::Mutex;

use super::backend::GalBackend;
use super::capabilities::GraphicsBackendType;
use super::device::GalDevice;
use super::error::{BackendError, GalError};

/// Preferences handed to a backend creator function.
#[derive(Debug, Clone)]
pub struct DeviceCreationConfig {
    /// Native APIs to try, in order of preference. Backends that fan out
    /// over several APIs (wgpu) honor this list; single-API backends
    /// ignore it.
    pub preferred_backends: Vec<GraphicsBackendType>,
    /// Prefer discrete over integrated adapters.
    pub prefer_discrete_gpu: bool,
    /// Enable backend validation layers (development builds).
    pub enable_validation: bool,
}

impl Default for DeviceCreationConfig {
    fn default() -> Self {
        Self {
            preferred_backends: {
                #[cfg(target_os = "windows")]
                {
                    vec![
                        GraphicsBackendType::Vulkan,
                        GraphicsBackendType::Dx12,
                        GraphicsBackendType::Dx11,
                    ]
                }
                #[cfg(target_os = "macos")]
                {
                    vec![GraphicsBackendType::Metal, GraphicsBackendType::Vulkan]
                }
                #[cfg(not(any(target_os = "windows", target_os = "macos")))]
                {
                    vec![GraphicsBackendType::Vulkan, GraphicsBackendType::OpenGL]
                }
            },
            prefer_discrete_gpu: true,
            enable_validation: cfg!(debug_assertions),
        }
    }
}

/// A function constructing an initialized backend.
pub type BackendCreatorFn =
    Box<dyn Fn(&DeviceCreationConfig) -> Result<Box<dyn GalBackend>, BackendError> + Send + Sync>;

struct BackendRegistration {
    shader_model: String,
    shader_compiler: String,
    creator: BackendCreatorFn,
}

impl std::fmt::Debug for BackendRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistration")
            .field("shader_model", &self.shader_model)
            .field("shader_compiler", &self.shader_compiler)
            .finish_non_exhaustive()
    }
}

/// Registry of backend creators, keyed by backend name.
#[derive(Debug, Default)]
pub struct DeviceFactory {
    creators: HashMap<String, BackendRegistration>,
}

impl DeviceFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend creator under `name`, together with the shader
    /// model and shader compiler identifier the backend's pipeline uses.
    /// Re-registering a name replaces the previous creator.
    pub fn register_creator(
        &mut self,
        name: &str,
        shader_model: &str,
        shader_compiler: &str,
        creator: BackendCreatorFn,
    ) {
        if self
            .creators
            .insert(
                name.to_string(),
                BackendRegistration {
                    shader_model: shader_model.to_string(),
                    shader_compiler: shader_compiler.to_string(),
                    creator,
                },
            )
            .is_some()
        {
            warn!("Backend creator '{name}' was re-registered.");
        }
    }

    /// Removes a backend creator. Returns `false` if none was registered.
    pub fn unregister_creator(&mut self, name: &str) -> bool {
        self.creators.remove(name).is_some()
    }

    /// The registered backend names, sorted.
    pub fn registered_backends(&self) -> Vec<String> {
        let mut names: Vec<String> = self.creators.keys().cloned().collect();
        names.sort();
        names
    }

    /// The shader model string of a registered backend.
    pub fn shader_model(&self, name: &str) -> Option<&str> {
        self.creators.get(name).map(|r| r.shader_model.as_str())
    }

    /// The shader compiler identifier of a registered backend.
    pub fn shader_compiler(&self, name: &str) -> Option<&str> {
        self.creators.get(name).map(|r| r.shader_compiler.as_str())
    }

    /// Creates a device on the named backend.
    pub fn create_device(
        &self,
        name: &str,
        config: &DeviceCreationConfig,
    ) -> Result<GalDevice, GalError> {
        let registration = self.creators.get(name).ok_or_else(|| {
            error!("create_device: no backend named '{name}' is registered.");
            GalError::UnknownBackend(name.to_string())
        })?;
        let backend = (registration.creator)(config).map_err(|err| {
            error!("Backend '{name}' failed to initialize: {err}");
            GalError::from(err)
        })?;
        Ok(GalDevice::new(backend))
    }
}

static GLOBAL_FACTORY: Mutex<Option<DeviceFactory>> = Mutex::new(None);

/// Creates the process-wide factory. Call once at startup, before any
/// plugin registers a backend.
pub fn initialize_factory() {
    let mut guard = GLOBAL_FACTORY.lock().expect("factory mutex poisoned");
    if guard.is_some() {
        warn!("initialize_factory called twice; keeping the existing registry.");
        return;
    }
    *guard = Some(DeviceFactory::new());
}

/// Tears down the process-wide factory. Call once at shutdown.
pub fn shutdown_factory() {
    let mut guard = GLOBAL_FACTORY.lock().expect("factory mutex poisoned");
    if guard.take().is_none() {
        warn!("shutdown_factory called without a live registry.");
    }
}

/// Runs `f` against the process-wide factory. Returns `None` (with an
/// error log) when [`initialize_factory`] has not been called.
pub fn with_factory<R>(f: impl FnOnce(&mut DeviceFactory) -> R) -> Option<R> {
    let mut guard = GLOBAL_FACTORY.lock().expect("factory mutex poisoned");
    match guard.as_mut() {
        Some(factory) => Some(f(factory)),
        None => {
            error!("with_factory called outside the initialize/shutdown lifecycle.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gal::headless::HeadlessBackend;

    fn headless_creator() -> BackendCreatorFn {
        Box::new(|_config| Ok(Box::new(HeadlessBackend::new()) as Box<dyn GalBackend>))
    }

    #[test]
    fn create_device_through_registered_creator() {
        let mut factory = DeviceFactory::new();
        factory.register_creator("Headless", "sm_none", "none", headless_creator());

        assert_eq!(factory.registered_backends(), vec!["Headless".to_string()]);
        assert_eq!(factory.shader_model("Headless"), Some("sm_none"));

        let device = factory
            .create_device("Headless", &DeviceCreationConfig::default())
            .unwrap();
        assert!(device.capabilities().compute_shaders);
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let factory = DeviceFactory::new();
        let err = factory
            .create_device("Mystery", &DeviceCreationConfig::default())
            .unwrap_err();
        assert!(matches!(err, GalError::UnknownBackend(name) if name == "Mystery"));
    }

    #[test]
    fn unregister_removes_the_creator() {
        let mut factory = DeviceFactory::new();
        factory.register_creator("Headless", "sm_none", "none", headless_creator());
        assert!(factory.unregister_creator("Headless"));
        assert!(!factory.unregister_creator("Headless"));
        assert!(factory.registered_backends().is_empty());
    }
}
