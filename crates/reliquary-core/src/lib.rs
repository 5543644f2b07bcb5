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


//! # Reliquary Core
//!
//! Foundational crate containing the identity table, type tags, and the
//! interface contracts shared by every resource-handling crate.
//!
//! Nothing in here knows how a resource is decoded or cached. The types are the
//! "common language" used by `reliquary-io` and by codec implementations:
//! - [`identity`]: recyclable, generation-checked identifiers for live objects.
//! - [`tag`]: interned resource kind names with O(1) comparison.
//! - [`referable`]: the capability every tracked object implements.
//! - [`stream`] and [`origin`]: the byte-source boundary (streams and path resolution).
//! - [`error`]: the error taxonomy of the resource layer.

#![warn(missing_docs)]

pub mod error;
pub mod identity;
pub mod origin;
pub mod referable;
pub mod stream;
pub mod tag;
pub mod telemetry;

pub use error::{ResourceError, ResourceResult};
pub use identity::{Identity, IdentityLease, IdentityRegistry, IdentityTable};
pub use origin::{OriginKey, PathResolver};
pub use referable::Referable;
pub use stream::{ByteStream, MemoryStream, SeekableStream};
pub use tag::TypeTag;
