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


//! Loads, shares, edits, and saves a few tile maps through an in-memory file system.
//!
//! Pass a RON settings file as the first argument to override the defaults.

use anyhow::{Context, Result};
use reliquary_core::{ByteStream, Referable, ResourceError, ResourceResult, TypeTag};
use reliquary_io::{
    downcast_target, MemoryFileSystem, ResourceData, ResourceLoader, ResourceManager,
    ResourceSettings, ResourceWriter,
};
use reliquary_telemetry::{init_logging, MetricsRegistry};
use std::any::Any;
use std::io::Write;
use std::sync::Arc;

// --- A plain-text tile map: a "TILES" header line, then one line per row ---

const HEADER: &str = "TILES\n";

#[derive(Debug, Default, Clone)]
struct TileMap {
    rows: Vec<String>,
}

impl ResourceData for TileMap {
    fn clear(&mut self) {
        self.rows.clear();
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

struct TileMapCodec;

impl ResourceLoader for TileMapCodec {
    fn name(&self) -> &str {
        "tiles"
    }

    fn sniff(
        &self,
        stream: &mut dyn ByteStream,
        _requested: Option<TypeTag>,
    ) -> ResourceResult<Option<TypeTag>> {
        let header = stream.read_exact(HEADER.len())?;
        Ok((header == HEADER.as_bytes()).then(|| TypeTag::new("TileMap")))
    }

    fn populate(
        &self,
        stream: &mut dyn ByteStream,
        target: &mut dyn ResourceData,
    ) -> ResourceResult<()> {
        stream.read_exact(HEADER.len())?;
        let body = String::from_utf8(stream.read_to_end()?)
            .map_err(|e| ResourceError::malformed("tiles", e.to_string()))?;
        let rows: Vec<String> = body.lines().map(str::to_owned).collect();

        let width = rows.first().map_or(0, String::len);
        if rows.iter().any(|row| row.len() != width) {
            return Err(ResourceError::malformed("tiles", "rows differ in width"));
        }
        downcast_target::<TileMap>(target)?.rows = rows;
        Ok(())
    }
}

impl ResourceWriter for TileMapCodec {
    fn name(&self) -> &str {
        "tiles"
    }

    fn supports(&self, extension: &str, kind: TypeTag) -> bool {
        extension == "tiles" && kind == TypeTag::new("TileMap")
    }

    fn write(&self, source: &dyn ResourceData, sink: &mut dyn Write) -> ResourceResult<()> {
        let map = source
            .as_any()
            .downcast_ref::<TileMap>()
            .ok_or_else(|| ResourceError::type_mismatch("TileMap", source.type_name()))?;
        sink.write_all(HEADER.as_bytes())?;
        for row in &map.rows {
            writeln!(sink, "{row}")?;
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    init_logging("info");

    let settings = match std::env::args().nth(1) {
        Some(path) => ResourceSettings::load(&path)
            .with_context(|| format!("Failed to read settings from '{path}'"))?,
        None => ResourceSettings::default(),
    };

    let files = MemoryFileSystem::new();
    files.insert("maps/meadow.tiles", "TILES\n..##..\n.#..#.\n..##..\n")?;
    files.insert("maps/broken.tiles", "TILES\n....\n..\n")?;

    let metrics = MetricsRegistry::new();
    let manager = ResourceManager::with_settings(Arc::new(files.clone()), settings)
        .with_metrics(&metrics)?;
    manager.register_kind_of::<TileMap>("TileMap")?;
    manager.register_loader(TileMapCodec)?;
    manager.register_writer(TileMapCodec)?;

    // Two spellings of one origin share one instance.
    let meadow = manager.load("TileMap", "maps/meadow.tiles")?;
    let again = manager.load("TileMap", "/maps/./meadow.tiles")?;
    log::info!(
        "meadow is {} (shared: {})",
        meadow.identity(),
        Arc::ptr_eq(&meadow, &again)
    );

    if let Err(e) = manager.load("TileMap", "maps/broken.tiles") {
        log::warn!("As expected, the broken map was rejected: {e}");
    }

    // Edit a private copy and save it next to the original.
    let copy = manager.duplicate(&meadow)?;
    copy.write_as::<TileMap, _>(|map| map.rows.push("######".to_string()))?;
    manager.save(&copy, "maps/meadow_walled.tiles")?;
    let saved = files
        .read("maps/meadow_walled.tiles")
        .context("saved map is missing")?;
    log::info!("Saved copy:\n{}", String::from_utf8_lossy(&saved));

    for metric in metrics.namespace_metrics(&manager.settings().metrics_namespace) {
        log::info!("{} = {:?}", metric.id, metric.value);
    }
    log::info!("{} identities alive", manager.live_identities());
    Ok(())
}
