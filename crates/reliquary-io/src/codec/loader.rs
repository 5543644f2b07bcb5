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
use reliquary_core::{ByteStream, ResourceResult, TypeTag};

/// Recognizes and decodes one family of formats.
pub trait ResourceLoader: Send + Sync {
    /// A unique, human-readable name (e.g., "png").
    fn name(&self) -> &str;

    /// Inspects the stream and reports which kind it would produce, if any.
    ///
    /// `requested` is the kind the caller asked for, which a loader able to
    /// produce several kinds may use to pick one. An `Err` is treated by the
    /// registry as "no match". The registry restores the cursor after every
    /// call, so implementations may read freely.
    fn sniff(
        &self,
        stream: &mut dyn ByteStream,
        requested: Option<TypeTag>,
    ) -> ResourceResult<Option<TypeTag>>;

    /// Decodes the stream into `target`.
    ///
    /// Implementations must not commit partial state to `target` when they
    /// fail: validate first, then write. Malformed content is reported as
    /// [`ResourceError::MalformedInput`](reliquary_core::ResourceError::MalformedInput).
    fn populate(
        &self,
        stream: &mut dyn ByteStream,
        target: &mut dyn ResourceData,
    ) -> ResourceResult<()>;
}

/// Runs `loader.populate`, putting the stream cursor back where it was if it fails.
///
/// This keeps a failed attempt invisible to the caller, who may retry with a
/// different loader or surface the error.
pub fn run_loader(
    loader: &dyn ResourceLoader,
    stream: &mut dyn ByteStream,
    target: &mut dyn ResourceData,
) -> ResourceResult<()> {
    let start = stream.position();
    let result = loader.populate(stream, target);
    if let Err(e) = &result {
        log::debug!("Loader '{}' failed: {e}", loader.name());
        if let Err(seek_error) = stream.seek_to(start) {
            log::warn!(
                "Could not rewind stream after loader '{}' failed: {seek_error}",
                loader.name()
            );
        }
    }
    result
}
