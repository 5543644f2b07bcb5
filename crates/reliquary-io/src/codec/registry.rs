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


use super::loader::ResourceLoader;
use super::writer::{normalize_extension, ResourceWriter};
use reliquary_core::{ByteStream, ResourceError, ResourceResult, TypeTag};
use std::sync::Arc;

/// The ordered loader and writer chains.
///
/// Both chains are append-only. Resolution walks them from the most recently
/// registered entry backwards and stops at the first match.
#[derive(Default)]
pub struct CodecRegistry {
    loaders: Vec<Arc<dyn ResourceLoader>>,
    writers: Vec<Arc<dyn ResourceWriter>>,
}

impl CodecRegistry {
    /// Creates empty chains.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a loader. It takes precedence over every loader registered before it.
    ///
    /// # Errors
    /// [`ResourceError::AlreadyExists`] if a loader with the same name is registered.
    pub fn register_loader(&mut self, loader: Arc<dyn ResourceLoader>) -> ResourceResult<()> {
        if self.loaders.iter().any(|l| l.name() == loader.name()) {
            return Err(ResourceError::AlreadyExists(format!("loader {}", loader.name())));
        }
        log::info!("Registered loader '{}'", loader.name());
        self.loaders.push(loader);
        Ok(())
    }

    /// Appends a writer. It takes precedence over every writer registered before it.
    ///
    /// # Errors
    /// [`ResourceError::AlreadyExists`] if a writer with the same name is registered.
    pub fn register_writer(&mut self, writer: Arc<dyn ResourceWriter>) -> ResourceResult<()> {
        if self.writers.iter().any(|w| w.name() == writer.name()) {
            return Err(ResourceError::AlreadyExists(format!("writer {}", writer.name())));
        }
        log::info!("Registered writer '{}'", writer.name());
        self.writers.push(writer);
        Ok(())
    }

    /// Finds the loader for a stream by sniffing it.
    ///
    /// Loaders are tried newest first. A loader whose sniff fails is treated as
    /// not matching; one that matches a kind other than `requested` is skipped.
    /// The stream cursor is put back after every attempt, so on return (match
    /// or not) it sits exactly where it was on entry.
    ///
    /// # Errors
    /// [`ResourceError::NoLoaderFound`] once the chain is exhausted, or an I/O
    /// error if the cursor cannot be restored.
    pub fn resolve_loader(
        &self,
        stream: &mut dyn ByteStream,
        requested: Option<TypeTag>,
    ) -> ResourceResult<(Arc<dyn ResourceLoader>, TypeTag)> {
        let start = stream.position();

        for loader in self.loaders.iter().rev() {
            let sniffed = loader.sniff(stream, requested);
            stream.seek_to(start)?;

            let kind = match sniffed {
                Ok(Some(kind)) => kind,
                Ok(None) => {
                    log::trace!("Loader '{}' declined the stream", loader.name());
                    continue;
                }
                Err(e) => {
                    log::warn!("Loader '{}' failed while sniffing: {e}", loader.name());
                    continue;
                }
            };

            match requested {
                Some(wanted) if wanted != kind => {
                    log::trace!(
                        "Loader '{}' recognized {kind}, but {wanted} was requested",
                        loader.name()
                    );
                }
                _ => {
                    log::debug!("Resolved loader '{}' for {kind}", loader.name());
                    return Ok((loader.clone(), kind));
                }
            }
        }

        Err(ResourceError::NoLoaderFound {
            origin: stream
                .origin()
                .map(|key| key.to_string())
                .unwrap_or_else(|| "<anonymous stream>".to_string()),
            requested,
        })
    }

    /// Finds the newest writer that supports `kind` and `extension`.
    ///
    /// # Errors
    /// [`ResourceError::NoWriterFound`] if no writer supports the pair.
    pub fn resolve_writer(
        &self,
        kind: TypeTag,
        extension: &str,
    ) -> ResourceResult<Arc<dyn ResourceWriter>> {
        let extension = normalize_extension(extension);
        self.writers
            .iter()
            .rev()
            .find(|writer| writer.supports(&extension, kind))
            .cloned()
            .ok_or(ResourceError::NoWriterFound { kind, extension })
    }

    /// Loader names in resolution order (newest first).
    pub fn loader_names(&self) -> Vec<String> {
        self.loaders.iter().rev().map(|l| l.name().to_string()).collect()
    }

    /// Writer names in resolution order (newest first).
    pub fn writer_names(&self) -> Vec<String> {
        self.writers.iter().rev().map(|w| w.name().to_string()).collect()
    }
}
