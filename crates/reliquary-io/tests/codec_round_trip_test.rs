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


use anyhow::Result;
use reliquary_core::{ByteStream, Referable, ResourceError, ResourceResult, TypeTag};
use reliquary_io::{
    downcast_target, MemoryFileSystem, ResourceData, ResourceLoader, ResourceManager,
    ResourceWriter, StdFileSystem,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::io::Write;
use std::sync::Arc;
use tempfile::tempdir;

// --- Test Setup: a bincode-backed palette format ---
// "PAL1" followed by a bincode-encoded `Palette`.

const MAGIC: &[u8; 4] = b"PAL1";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Palette {
    name: String,
    colors: Vec<[u8; 4]>,
}

impl ResourceData for Palette {
    fn clear(&mut self) {
        *self = Palette::default();
    }

    fn duplicate(&self) -> Option<Box<dyn ResourceData>> {
        Some(Box::new(self.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct PaletteLoader;

impl ResourceLoader for PaletteLoader {
    fn name(&self) -> &str {
        "palette-bincode"
    }

    fn sniff(
        &self,
        stream: &mut dyn ByteStream,
        _requested: Option<TypeTag>,
    ) -> ResourceResult<Option<TypeTag>> {
        if stream.remaining() < MAGIC.len() as u64 {
            return Ok(None);
        }
        let magic = stream.read_exact(MAGIC.len())?;
        Ok((magic == MAGIC).then(|| TypeTag::new("Palette")))
    }

    fn populate(
        &self,
        stream: &mut dyn ByteStream,
        target: &mut dyn ResourceData,
    ) -> ResourceResult<()> {
        stream.read_exact(MAGIC.len())?;
        let body = stream.read_to_end()?;
        let (decoded, _): (Palette, usize) =
            bincode::serde::decode_from_slice(&body, bincode::config::standard())
                .map_err(|e| ResourceError::malformed(self.name(), e.to_string()))?;
        *downcast_target::<Palette>(target)? = decoded;
        Ok(())
    }
}

struct PaletteWriter;

impl ResourceWriter for PaletteWriter {
    fn name(&self) -> &str {
        "palette-bincode"
    }

    fn supports(&self, extension: &str, kind: TypeTag) -> bool {
        extension == "pal" && kind == TypeTag::new("Palette")
    }

    fn write(&self, source: &dyn ResourceData, sink: &mut dyn Write) -> ResourceResult<()> {
        let palette = source
            .as_any()
            .downcast_ref::<Palette>()
            .ok_or_else(|| ResourceError::type_mismatch("Palette", source.type_name()))?;
        let body = bincode::serde::encode_to_vec(palette, bincode::config::standard())
            .map_err(|e| ResourceError::malformed(self.name(), e.to_string()))?;
        sink.write_all(MAGIC)?;
        sink.write_all(&body)?;
        Ok(())
    }
}

/// Writes a fragment, then gives up.
struct TruncatingWriter;

impl ResourceWriter for TruncatingWriter {
    fn name(&self) -> &str {
        "palette-truncating"
    }

    fn supports(&self, extension: &str, kind: TypeTag) -> bool {
        extension == "bin" && kind == TypeTag::new("Palette")
    }

    fn write(&self, _source: &dyn ResourceData, sink: &mut dyn Write) -> ResourceResult<()> {
        sink.write_all(b"PART")?;
        Err(ResourceError::malformed(self.name(), "ran out of colors"))
    }
}

fn sunset() -> Palette {
    Palette {
        name: "sunset".to_string(),
        colors: vec![[255, 94, 77, 255], [255, 195, 113, 255], [46, 26, 71, 255]],
    }
}

fn palette_manager(resolver: Arc<dyn reliquary_core::PathResolver>) -> Result<ResourceManager> {
    let manager = ResourceManager::new(resolver);
    manager.register_kind_of::<Palette>("Palette")?;
    manager.register_loader(PaletteLoader)?;
    manager.register_writer(PaletteWriter)?;
    Ok(manager)
}

// ---

#[test]
fn test_round_trip_through_memory() -> Result<()> {
    let files = MemoryFileSystem::new();
    let manager = palette_manager(Arc::new(files.clone()))?;

    let original = manager.create("Palette")?;
    original.write_as::<Palette, _>(|p| *p = sunset())?;

    manager.save(&original, "/palettes/sunset.PAL")?;
    assert!(files.read("/palettes/sunset.PAL").is_some_and(|b| b.starts_with(MAGIC)));

    let loaded = manager.load_any("palettes/sunset.PAL")?;
    assert_eq!(loaded.kind(), TypeTag::new("Palette"));
    assert_ne!(loaded.identity(), original.identity());
    assert_eq!(loaded.read_as::<Palette, _>(|p| p.clone())?, sunset());
    Ok(())
}

#[test]
fn test_round_trip_on_disk() -> Result<()> {
    let dir = tempdir()?;
    let manager = palette_manager(Arc::new(StdFileSystem::with_root(dir.path())))?;

    let original = manager.create("Palette")?;
    original.write_as::<Palette, _>(|p| *p = sunset())?;
    manager.save(&original, "out/sunset.pal")?;
    assert!(dir.path().join("out/sunset.pal").is_file());

    let loaded = manager.load("Palette", "out/sunset.pal")?;
    let mut rewritten = Vec::new();
    manager.write(&loaded, ".pal", &mut rewritten)?;
    assert_eq!(rewritten, std::fs::read(dir.path().join("out/sunset.pal"))?);
    Ok(())
}

#[test]
fn test_write_loads_declared_resources_first() -> Result<()> {
    let files = MemoryFileSystem::new();
    let manager = palette_manager(Arc::new(files.clone()))?;
    let mut bytes = MAGIC.to_vec();
    bytes.extend(bincode::serde::encode_to_vec(sunset(), bincode::config::standard())?);
    files.insert("/a.pal", bytes.clone())?;

    let declared = manager.declare("Palette", "/a.pal")?;
    assert!(!declared.is_loaded());

    let mut out = Vec::new();
    manager.write(&declared, "pal", &mut out)?;
    assert!(declared.is_loaded());
    assert_eq!(out, bytes);
    Ok(())
}

#[test]
fn test_missing_writer() -> Result<()> {
    let files = MemoryFileSystem::new();
    let manager = palette_manager(Arc::new(files.clone()))?;
    let palette = manager.create("Palette")?;

    let err = manager.save(&palette, "/sunset.png").unwrap_err();
    assert!(matches!(err, ResourceError::NoWriterFound { ref extension, .. } if extension == "png"));

    let err = manager.save(&palette, "/sunset").unwrap_err();
    assert!(matches!(err, ResourceError::NoWriterFound { .. }));
    assert!(files.is_empty(), "Nothing is written without a writer");
    Ok(())
}

#[test]
fn test_corrupt_body_is_malformed() -> Result<()> {
    let files = MemoryFileSystem::new();
    let manager = palette_manager(Arc::new(files.clone()))?;
    files.insert("/broken.pal", b"PAL1\xff\xff\xff".to_vec())?;

    let err = manager.load("Palette", "/broken.pal").unwrap_err();
    assert!(matches!(
        err,
        ResourceError::MalformedInput { ref loader, .. } if loader == "palette-bincode"
    ));
    assert_eq!(manager.cached_count("Palette")?, 0);
    Ok(())
}

#[test]
fn test_failed_save_keeps_the_previous_file() -> Result<()> {
    let files = MemoryFileSystem::new();
    let manager = palette_manager(Arc::new(files.clone()))?;
    manager.register_writer(TruncatingWriter)?;
    files.insert("/keep.bin", b"GOOD-ORIGINAL".to_vec())?;

    let palette = manager.create("Palette")?;
    let err = manager.save(&palette, "/keep.bin").unwrap_err();
    assert!(matches!(err, ResourceError::MalformedInput { .. }));
    assert_eq!(files.read("/keep.bin"), Some(b"GOOD-ORIGINAL".to_vec()));

    let dir = tempdir()?;
    std::fs::write(dir.path().join("keep.bin"), b"GOOD-ORIGINAL")?;
    let manager = palette_manager(Arc::new(StdFileSystem::with_root(dir.path())))?;
    manager.register_writer(TruncatingWriter)?;

    let palette = manager.create("Palette")?;
    assert!(manager.save(&palette, "keep.bin").is_err());
    assert_eq!(std::fs::read(dir.path().join("keep.bin"))?, b"GOOD-ORIGINAL");
    Ok(())
}
