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

//! Thread-safe batching of init-time texture uploads.
//!
//! Loader threads submit initial texture data concurrently; the batch is
//! collected under one mutex so the upload commands (and the transition
//! barriers the backend derives from them) never interleave between
//! threads. The render thread drains the batch at `begin_frame` and
//! records it through a single command recorder.

use std::sync::{Arc, Mutex};

use crate::math::{Extent3D, Origin3D};

use super::device::TextureHandle;

/// One batched texture upload.
#[derive(Debug)]
pub(crate) struct TextureUpload {
    pub texture: TextureHandle,
    pub mip_level: u32,
    pub origin: Origin3D,
    pub extent: Extent3D,
    pub data: Vec<u8>,
    pub bytes_per_row: u32,
}

/// A cloneable handle to the device's init-upload batch.
///
/// Cheap to clone and safe to use from any thread. Whether worker threads
/// may use it is gated by
/// [`DeviceCapabilities::multithreaded_resource_creation`](super::capabilities::DeviceCapabilities).
#[derive(Debug, Clone)]
pub struct InitContext {
    batch: Arc<Mutex<Vec<TextureUpload>>>,
}

impl InitContext {
    pub(crate) fn new() -> Self {
        Self {
            batch: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Schedules initial data for one texture subresource. The copy happens
    /// at the next frame begin on the render thread.
    pub fn init_texture(
        &self,
        texture: TextureHandle,
        mip_level: u32,
        origin: Origin3D,
        extent: Extent3D,
        data: &[u8],
        bytes_per_row: u32,
    ) {
        let mut batch = self.batch.lock().expect("init context mutex poisoned");
        batch.push(TextureUpload {
            texture,
            mip_level,
            origin,
            extent,
            data: data.to_vec(),
            bytes_per_row,
        });
    }

    /// The number of uploads waiting to be flushed.
    pub fn pending_count(&self) -> usize {
        self.batch.lock().expect("init context mutex poisoned").len()
    }

    pub(crate) fn take_batch(&self) -> Vec<TextureUpload> {
        let mut batch = self.batch.lock().expect("init context mutex poisoned");
        std::mem::take(&mut *batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn concurrent_submissions_all_land_in_one_batch() {
        let ctx = InitContext::new();
        let mut workers = Vec::new();
        for _ in 0..4 {
            let ctx = ctx.clone();
            workers.push(thread::spawn(move || {
                for _ in 0..25 {
                    ctx.init_texture(
                        TextureHandle::INVALID,
                        0,
                        Origin3D::default(),
                        Extent3D::new_2d(4, 4),
                        &[0u8; 64],
                        16,
                    );
                }
            }));
        }
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(ctx.pending_count(), 100);
        assert_eq!(ctx.take_batch().len(), 100);
        assert_eq!(ctx.pending_count(), 0);
    }
}
