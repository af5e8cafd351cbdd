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

//! # Aster Core
//!
//! Backend-agnostic graphics abstraction layer (GAL) and the data-driven
//! render pipeline graph built on top of it.
//!
//! The crate is split in two halves:
//!
//! - [`gal`]: device, resources, command encoders and the backend traits a
//!   concrete implementation (see `aster-infra`) has to provide. A
//!   [`gal::headless`] backend ships here so the whole stack runs without a
//!   GPU.
//! - [`pipeline`]: named render passes wired through typed pins into a
//!   per-view directed acyclic graph that resolves target descriptions,
//!   allocates transient render targets and executes passes in dependency
//!   order.

#![warn(missing_docs)]

pub mod gal;
pub mod graph;
pub mod math;
pub mod pipeline;
pub mod stats;
pub mod utils;

pub use stats::RenderStats;
