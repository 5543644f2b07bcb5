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


//! Pluggable format handlers.
//!
//! Loaders recognize a byte stream by sniffing it and populate a resource
//! payload from it; writers serialize a payload for a given extension. Both
//! live in append-only chains inside [`CodecRegistry`], searched from the most
//! recently registered entry backwards so that application codecs override
//! built-in ones.

mod loader;
mod registry;
mod writer;

pub use loader::{run_loader, ResourceLoader};
pub use registry::CodecRegistry;
pub use writer::{normalize_extension, ResourceWriter};
