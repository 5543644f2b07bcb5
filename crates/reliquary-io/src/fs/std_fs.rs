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


use reliquary_core::{
    ByteStream, OriginKey, PathResolver, ResourceError, ResourceResult, SeekableStream,
};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A [`PathResolver`] backed by the local file system.
///
/// Paths are normalized by canonicalization, so every spelling of the same
/// existing file (relative, with `..`, through a symlink) maps to one key.
/// Paths that do not exist cannot be canonicalized and get no key.
#[derive(Debug, Clone, Default)]
pub struct StdFileSystem {
    root: Option<PathBuf>,
}

impl StdFileSystem {
    /// Resolves relative paths against the process working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn full_path(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl PathResolver for StdFileSystem {
    fn normalize(&self, raw: &str) -> Option<OriginKey> {
        let canonical = fs::canonicalize(self.full_path(raw)).ok()?;
        Some(OriginKey::new(canonical.to_string_lossy().into_owned()))
    }

    fn exists(&self, raw: &str) -> bool {
        self.full_path(raw).is_file()
    }

    fn open(&self, raw: &str) -> ResourceResult<Box<dyn ByteStream>> {
        let path = self.full_path(raw);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ResourceError::NotFound(raw.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let stream = SeekableStream::new(BufReader::new(file), self.normalize(raw))?;
        Ok(Box::new(stream))
    }

    fn create(&self, raw: &str) -> ResourceResult<Box<dyn Write + Send>> {
        let path = self.full_path(raw);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }
}
