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

//! Backend registration against the core device factory.

use aster_core::gal::DeviceFactory;
use aster_infra::{register_backends, WGPU_BACKEND_NAME};

#[test]
fn wgpu_backend_registers_in_the_factory() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut factory = DeviceFactory::new();
    register_backends(&mut factory);

    assert!(factory
        .registered_backends()
        .contains(&WGPU_BACKEND_NAME.to_string()));
    assert_eq!(factory.shader_model(WGPU_BACKEND_NAME), Some("sm_6_0"));
    assert_eq!(factory.shader_compiler(WGPU_BACKEND_NAME), Some("naga"));

    assert!(factory.unregister_creator(WGPU_BACKEND_NAME));
    assert!(factory.registered_backends().is_empty());
}
