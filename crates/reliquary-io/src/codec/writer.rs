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


use crate::resource::ResourceData;
use reliquary_core::{ResourceResult, TypeTag};
use std::io::Write;

/// Serializes payloads of some kinds to some file extensions.
pub trait ResourceWriter: Send + Sync {
    /// A unique, human-readable name.
    fn name(&self) -> &str;

    /// Returns `true` if this writer can serialize `kind` to `extension`.
    ///
    /// `extension` is already normalized (lowercase, no leading dot).
    fn supports(&self, extension: &str, kind: TypeTag) -> bool;

    /// Serializes `source` into `sink`.
    fn write(&self, source: &dyn ResourceData, sink: &mut dyn Write) -> ResourceResult<()>;
}

/// Lowercases an extension and strips its leading dot.
pub fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(".PNG"), "png");
        assert_eq!(normalize_extension("obj"), "obj");
    }
}
