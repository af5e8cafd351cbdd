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

//! A free-list pool with frame-deferred reclamation.
//!
//! Backends use this for fences, semaphores, staging buffers and similar
//! short-lived native objects: an object handed back mid-frame may still be
//! referenced by in-flight GPU work, so [`reclaim`](ReclaimPool::reclaim)
//! parks it against a frame index and [`retire`](ReclaimPool::retire) only
//! moves it to the free list once that frame provably finished.

/// A pool of reusable objects with deferred reclamation.
#[derive(Debug)]
pub struct ReclaimPool<T> {
    free: Vec<T>,
    pending: Vec<(u64, T)>,
    total_created: usize,
}

impl<T> ReclaimPool<T> {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self {
            free: Vec::new(),
            pending: Vec::new(),
            total_created: 0,
        }
    }

    /// Hands out a pooled object, calling `alloc` only when the free list
    /// is empty.
    pub fn request(&mut self, alloc: impl FnOnce() -> T) -> T {
        match self.free.pop() {
            Some(object) => object,
            None => {
                self.total_created += 1;
                alloc()
            }
        }
    }

    /// Parks an object until the given frame retires.
    pub fn reclaim(&mut self, object: T, frame: u64) {
        self.pending.push((frame, object));
    }

    /// Moves every object parked on `retired_frame` or earlier back onto
    /// the free list.
    pub fn retire(&mut self, retired_frame: u64) {
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].0 <= retired_frame {
                let (_, object) = self.pending.swap_remove(i);
                self.free.push(object);
            } else {
                i += 1;
            }
        }
    }

    /// Objects immediately available for reuse.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Objects parked awaiting frame retirement.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Total objects ever allocated through this pool.
    pub fn total_created(&self) -> usize {
        self.total_created
    }

    /// Drains every pooled object (free and pending) for destruction.
    pub fn drain(&mut self) -> Vec<T> {
        let mut all: Vec<T> = self.free.drain(..).collect();
        all.extend(self.pending.drain(..).map(|(_, object)| object));
        all
    }
}

impl<T> Default for ReclaimPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_allocates() {
        let mut pool = ReclaimPool::new();
        let fence = pool.request(|| 100u64);
        assert_eq!(fence, 100);
        assert_eq!(pool.total_created(), 1);
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn reclaimed_object_is_reused_after_retire() {
        let mut pool = ReclaimPool::new();
        let fence = pool.request(|| 7u64);

        pool.reclaim(fence, 3);
        assert_eq!(pool.pending_count(), 1);
        assert_eq!(pool.free_count(), 0);

        // Frame 2 retiring is not enough.
        pool.retire(2);
        assert_eq!(pool.free_count(), 0);

        pool.retire(3);
        assert_eq!(pool.pending_count(), 0);
        assert_eq!(pool.free_count(), 1);

        // The request must reuse the same native object, not allocate.
        let reused = pool.request(|| 999u64);
        assert_eq!(reused, 7);
        assert_eq!(pool.total_created(), 1);
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn drain_returns_everything() {
        let mut pool = ReclaimPool::new();
        let a = pool.request(|| 1u64);
        let b = pool.request(|| 2u64);
        pool.reclaim(a, 1);
        pool.free.push(b);
        let drained = pool.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(pool.free_count(), 0);
        assert_eq!(pool.pending_count(), 0);
    }
}
