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

//! Sort-key functions ordering render data within a pass.
//!
//! Both policies pack a 16-bit type hash, the caller's 32-bit sorting key
//! and a quantized camera distance into one 64-bit key. They are pure
//! functions of their arguments: identical inputs always produce identical
//! keys.

use super::render_data::RenderData;
use super::view::Camera;

/// The signature of a category sorting policy.
pub type SortingKeyFn = fn(&RenderData, u32, &Camera) -> u64;

/// Camera distance quantized to centimeter-ish steps and saturated to 16
/// bits.
fn quantized_distance(data: &RenderData, camera: &Camera) -> u64 {
    let distance = camera.distance_to(data.position) + data.sorting_depth_offset;
    let scaled = (distance * 100.0).round();
    if scaled <= 0.0 {
        0
    } else if scaled >= 65535.0 {
        0xFFFF
    } else {
        scaled as u64
    }
}

/// Groups by render-data type, then by the caller's sorting key, then
/// front to back. The policy for opaque categories: state changes dominate
/// the cost, so batching by type/material wins over perfect depth order,
/// with front-to-back as the tie-breaker for early-z.
pub fn by_render_data_then_front_to_back(
    data: &RenderData,
    sorting_key: u32,
    camera: &Camera,
) -> u64 {
    let type_hash = u64::from(data.type_hash);
    let sorting_key = u64::from(sorting_key);
    let distance = quantized_distance(data, camera);

    (type_hash << 48) | (sorting_key << 16) | (distance & 0xFFFF)
}

/// Orders back to front first, then by type and sorting key. The policy
/// for transparent categories, where blending makes depth order a
/// correctness requirement rather than an optimization.
pub fn back_to_front_then_by_render_data(
    data: &RenderData,
    sorting_key: u32,
    camera: &Camera,
) -> u64 {
    let inverted_distance = 0xFFFF - (quantized_distance(data, camera) & 0xFFFF);
    let type_hash = u64::from(data.type_hash);
    let sorting_key = u64::from(sorting_key);

    (inverted_distance << 48) | (type_hash << 32) | sorting_key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Mat4, Vec3};
    use crate::pipeline::render_data::render_data_type_hash;

    fn data_at(position: Vec3, type_name: &str, sorting_key: u32) -> RenderData {
        RenderData {
            transform: Mat4::IDENTITY,
            position,
            sorting_depth_offset: 0.0,
            sorting_key,
            type_hash: render_data_type_hash(type_name),
            vertex_count: 3,
        }
    }

    #[test]
    fn keys_are_deterministic() {
        let camera = Camera::default();
        let data = data_at(Vec3::new(0.0, 0.0, -25.0), "MeshRenderData", 42);

        let a = by_render_data_then_front_to_back(&data, data.sorting_key, &camera);
        let b = by_render_data_then_front_to_back(&data, data.sorting_key, &camera);
        assert_eq!(a, b);

        let c = back_to_front_then_by_render_data(&data, data.sorting_key, &camera);
        let d = back_to_front_then_by_render_data(&data, data.sorting_key, &camera);
        assert_eq!(c, d);
    }

    #[test]
    fn opaque_policy_groups_by_type_before_distance() {
        let camera = Camera::default();
        // Same type, different distances: near sorts first.
        let near = data_at(Vec3::new(0.0, 0.0, -1.0), "MeshRenderData", 7);
        let far = data_at(Vec3::new(0.0, 0.0, -300.0), "MeshRenderData", 7);
        assert!(
            by_render_data_then_front_to_back(&near, 7, &camera)
                < by_render_data_then_front_to_back(&far, 7, &camera)
        );

        // Different sorting keys dominate distance within one type.
        let key_low_far = data_at(Vec3::new(0.0, 0.0, -300.0), "MeshRenderData", 1);
        let key_high_near = data_at(Vec3::new(0.0, 0.0, -1.0), "MeshRenderData", 2);
        assert!(
            by_render_data_then_front_to_back(&key_low_far, 1, &camera)
                < by_render_data_then_front_to_back(&key_high_near, 2, &camera)
        );
    }

    #[test]
    fn transparent_policy_orders_back_to_front_first() {
        let camera = Camera::default();
        let near = data_at(Vec3::new(0.0, 0.0, -1.0), "MeshRenderData", 1);
        let far = data_at(Vec3::new(0.0, 0.0, -300.0), "ParticleRenderData", 99);
        // The far entry must draw first regardless of type or key.
        assert!(
            back_to_front_then_by_render_data(&far, 99, &camera)
                < back_to_front_then_by_render_data(&near, 1, &camera)
        );
    }

    #[test]
    fn distance_saturates_instead_of_wrapping() {
        let camera = Camera::default();
        let very_far = data_at(Vec3::new(0.0, 0.0, -1.0e7), "MeshRenderData", 0);
        let key = by_render_data_then_front_to_back(&very_far, 0, &camera);
        assert_eq!(key & 0xFFFF, 0xFFFF);

        let behind = RenderData {
            sorting_depth_offset: -1.0e7,
            ..data_at(Vec3::ZERO, "MeshRenderData", 0)
        };
        let key = by_render_data_then_front_to_back(&behind, 0, &camera);
        assert_eq!(key & 0xFFFF, 0);
    }
}
