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


//! The error taxonomy of the resource layer.

use crate::tag::TypeTag;

/// A specialized `Result` type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors raised by the kind registry, the codec registry, the cache, and the loaders.
///
/// The identity table never produces one of these: lookups report absence instead.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// A kind or codec with the same unique name has already been registered.
    #[error("'{0}' is already registered")]
    AlreadyExists(String),

    /// The operation referenced a resource kind that was never registered.
    #[error("resource kind '{0}' is not registered")]
    UnknownKind(TypeTag),

    /// Every registered loader declined the stream.
    #[error("no loader recognizes '{origin}'{}", describe_request(.requested))]
    NoLoaderFound {
        /// The origin of the stream, or a placeholder for anonymous streams.
        origin: String,
        /// The kind the caller asked for, if any.
        requested: Option<TypeTag>,
    },

    /// No registered writer supports the kind/extension pair.
    #[error("no writer can serialize '{kind}' resources to '.{extension}'")]
    NoWriterFound {
        /// The kind of the resource to serialize.
        kind: TypeTag,
        /// The normalized target extension.
        extension: String,
    },

    /// A loader recognized the format, but the content is corrupt.
    #[error("loader '{loader}' rejected the input: {detail}")]
    MalformedInput {
        /// The name of the loader that rejected the input.
        loader: String,
        /// The loader's own description of the problem.
        detail: String,
    },

    /// The payload of a resource of this kind cannot be duplicated.
    #[error("resources of kind '{0}' do not support cloning")]
    CloneNotSupported(TypeTag),

    /// The caller requested one kind (or payload type) and got another.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// What the caller asked for.
        expected: String,
        /// What was actually produced.
        found: String,
    },

    /// The path resolver could not locate the origin.
    #[error("origin '{0}' does not exist")]
    NotFound(String),

    /// A stream could not provide the requested number of bytes.
    #[error("short read: requested {requested} bytes, {available} available")]
    ShortRead {
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes left in the stream.
        available: usize,
    },

    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding shared state was poisoned by a panicking thread.
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),

    /// Configuration could not be parsed.
    #[error("invalid settings: {0}")]
    Settings(String),
}

impl ResourceError {
    /// Builds a [`ResourceError::MalformedInput`] for the given loader.
    pub fn malformed(loader: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedInput {
            loader: loader.into(),
            detail: detail.into(),
        }
    }

    /// Builds a [`ResourceError::TypeMismatch`].
    pub fn type_mismatch(expected: impl ToString, found: impl ToString) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

fn describe_request(requested: &Option<TypeTag>) -> String {
    match requested {
        Some(kind) => format!(" as '{kind}'"),
        None => String::new(),
    }
}
