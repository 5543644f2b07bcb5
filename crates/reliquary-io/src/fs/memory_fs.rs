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
    ByteStream, MemoryStream, OriginKey, PathResolver, ResourceError, ResourceResult,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, PoisonError, RwLock};

type FileMap = Arc<RwLock<HashMap<OriginKey, Vec<u8>>>>;

/// An in-process [`PathResolver`] holding files as byte buffers.
///
/// Paths are normalized lexically: separators are unified to `/`, `.` and
/// empty components are dropped, and `..` pops the previous component. A path
/// that climbs above the root cannot be normalized. Relative and absolute
/// spellings resolve against the same root, so `a/b` and `/a/b` are one file.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: FileMap,
}

impl MemoryFileSystem {
    /// Creates an empty file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `bytes` at `raw`, replacing any previous content.
    ///
    /// # Errors
    /// [`ResourceError::NotFound`] if the path cannot be normalized.
    pub fn insert(&self, raw: &str, bytes: impl Into<Vec<u8>>) -> ResourceResult<()> {
        let key = self.key(raw)?;
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, bytes.into());
        Ok(())
    }

    /// Removes the file at `raw`, returning its content.
    pub fn remove(&self, raw: &str) -> Option<Vec<u8>> {
        let key = self.normalize(raw)?;
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
    }

    /// Returns a copy of the file at `raw`.
    pub fn read(&self, raw: &str) -> Option<Vec<u8>> {
        let key = self.normalize(raw)?;
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.files.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no file is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(&self, raw: &str) -> ResourceResult<OriginKey> {
        self.normalize(raw)
            .ok_or_else(|| ResourceError::NotFound(raw.to_string()))
    }
}

impl PathResolver for MemoryFileSystem {
    fn normalize(&self, raw: &str) -> Option<OriginKey> {
        let mut components: Vec<&str> = Vec::new();
        for component in raw.split(['/', '\\']) {
            match component {
                "" | "." => {}
                ".." => {
                    components.pop()?;
                }
                name => components.push(name),
            }
        }
        if components.is_empty() {
            return None;
        }
        Some(OriginKey::new(format!("/{}", components.join("/"))))
    }

    fn exists(&self, raw: &str) -> bool {
        self.normalize(raw).is_some_and(|key| {
            self.files
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(&key)
        })
    }

    fn open(&self, raw: &str) -> ResourceResult<Box<dyn ByteStream>> {
        let key = self.key(raw)?;
        let bytes = self
            .files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(raw.to_string()))?;
        Ok(Box::new(MemoryStream::from_bytes(bytes, Some(key))))
    }

    fn create(&self, raw: &str) -> ResourceResult<Box<dyn Write + Send>> {
        Ok(Box::new(MemoryFile {
            key: self.key(raw)?,
            buffer: Vec::new(),
            files: Arc::clone(&self.files),
        }))
    }
}

/// A pending write into a [`MemoryFileSystem`]. Only flushing publishes it.
struct MemoryFile {
    key: OriginKey,
    buffer: Vec<u8>,
    files: FileMap,
}

impl Write for MemoryFile {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(self.key.clone(), self.buffer.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_normalization() {
        let fs = MemoryFileSystem::new();
        let key = fs.normalize("/assets/textures/brick.img").unwrap();

        for spelling in [
            "assets/textures/brick.img",
            "/assets//textures/./brick.img",
            "/assets/meshes/../textures/brick.img",
            "\\assets\\textures\\brick.img",
        ] {
            assert_eq!(fs.normalize(spelling).as_ref(), Some(&key), "{spelling}");
        }

        assert!(fs.normalize("/../escape.img").is_none());
        assert!(fs.normalize("/").is_none());
    }

    #[test]
    fn test_open_carries_the_normalized_origin() {
        let fs = MemoryFileSystem::new();
        fs.insert("a/b.img", vec![0x89, 1]).unwrap();

        assert!(fs.exists("/a/./b.img"));
        let mut stream = fs.open("a/../a/b.img").unwrap();
        assert_eq!(stream.origin().map(OriginKey::as_str), Some("/a/b.img"));
        assert_eq!(stream.read_to_end().unwrap(), vec![0x89, 1]);
    }

    #[test]
    fn test_missing_and_removed_files() {
        let fs = MemoryFileSystem::new();
        assert!(matches!(fs.open("/none"), Err(ResourceError::NotFound(_))));

        fs.insert("/tmp.bin", b"x".to_vec()).unwrap();
        assert_eq!(fs.remove("tmp.bin"), Some(b"x".to_vec()));
        assert!(!fs.exists("/tmp.bin"));
        assert!(fs.is_empty());
    }

    #[test]
    fn test_created_files_are_published_on_flush() {
        let fs = MemoryFileSystem::new();
        fs.insert("/out/save.txt", b"old".to_vec()).unwrap();
        {
            let mut sink = fs.create("/out/save.txt").unwrap();
            sink.write_all(b"partial").unwrap();
        }
        assert_eq!(fs.read("/out/save.txt"), Some(b"old".to_vec()), "Dropping must not publish");

        let mut sink = fs.create("/out/save.txt").unwrap();
        sink.write_all(b"hello ").unwrap();
        sink.write_all(b"world").unwrap();
        sink.flush().unwrap();
        assert_eq!(fs.read("out/save.txt"), Some(b"hello world".to_vec()));
    }
}
