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


//! # Reliquary IO
//!
//! Everything between "give me the Mesh at this path" and a shared, populated
//! resource: the kind registry, the origin-keyed cache, the ordered loader and
//! writer chains, the load/unload state machine, and the [`ResourceManager`]
//! that ties them together behind a single lock.

pub mod cache;
pub mod codec;
pub mod fs;
pub mod kind;
pub mod manager;
pub mod metrics;
pub mod resource;
pub mod settings;

pub use cache::ResourceCache;
pub use codec::{CodecRegistry, ResourceLoader, ResourceWriter};
pub use fs::{MemoryFileSystem, StdFileSystem};
pub use kind::{KindFactory, ResourceKind, TypeRegistry};
pub use manager::ResourceManager;
pub use metrics::ResourceMetrics;
pub use resource::{downcast_target, LoadState, Resource, ResourceData, ResourceOrigin};
pub use settings::ResourceSettings;
