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


//! Where a resource's bytes come from.

use crate::error::ResourceResult;
use crate::stream::ByteStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// The normalized, absolute identity of a byte source, used as the cache key.
///
/// Two raw spellings of the same source must normalize to the same key. Only a
/// [`PathResolver`] produces keys for paths; streams may carry one of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OriginKey(String);

impl OriginKey {
    /// Wraps an already normalized origin string.
    pub fn new(normalized: impl Into<String>) -> Self {
        Self(normalized.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the lowercase extension of the last path component, without the dot.
    pub fn extension(&self) -> Option<String> {
        let file_name = self.0.rsplit(['/', '\\']).next()?;
        let (stem, extension) = file_name.rsplit_once('.')?;
        if stem.is_empty() || extension.is_empty() {
            return None;
        }
        Some(extension.to_ascii_lowercase())
    }
}

impl fmt::Display for OriginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OriginKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for OriginKey {
    fn from(normalized: String) -> Self {
        Self(normalized)
    }
}

/// The file-system boundary: turns raw paths into cache keys and open streams.
pub trait PathResolver: Send + Sync {
    /// Normalizes a raw path into its cache key.
    ///
    /// Returns `None` when the origin cannot be normalized (e.g. it is not a
    /// real path). Callers must then bypass the cache for that request.
    fn normalize(&self, raw: &str) -> Option<OriginKey>;

    /// Returns `true` if the path names an existing byte source.
    fn exists(&self, raw: &str) -> bool;

    /// Opens the byte source behind a path.
    fn open(&self, raw: &str) -> ResourceResult<Box<dyn ByteStream>>;

    /// Opens a sink that creates or replaces the byte source behind a path.
    ///
    /// The written bytes are committed when the sink is flushed. Implementations
    /// may replace the previous content as soon as the sink is created.
    fn create(&self, raw: &str) -> ResourceResult<Box<dyn Write + Send>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of_last_component() {
        assert_eq!(OriginKey::new("/data/a.IMG").extension().as_deref(), Some("img"));
        assert_eq!(OriginKey::new("dir.d/mesh.obj").extension().as_deref(), Some("obj"));
        assert_eq!(OriginKey::new("dir.d/README").extension(), None);
        assert_eq!(OriginKey::new("/home/.profile").extension(), None);
    }
}
