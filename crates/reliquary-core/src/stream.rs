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


//! The byte-stream boundary consumed by loaders.

use crate::error::{ResourceError, ResourceResult};
use crate::origin::OriginKey;
use std::io::{Cursor, Read, Seek, SeekFrom};

/// A seekable source of bytes with a cursor.
///
/// Loaders read through this trait. The codec registry relies on
/// [`ByteStream::position`] and [`ByteStream::seek_to`] to put the cursor back
/// after every sniffing attempt.
pub trait ByteStream: Send {
    /// Current read position, in bytes from the start.
    fn position(&self) -> u64;

    /// Moves the read cursor to an absolute position.
    fn seek_to(&mut self, position: u64) -> ResourceResult<()>;

    /// Reads exactly `len` bytes.
    ///
    /// Fails with [`ResourceError::ShortRead`] without consuming anything if
    /// fewer bytes remain.
    fn read_exact(&mut self, len: usize) -> ResourceResult<Vec<u8>>;

    /// Total length of the stream in bytes.
    fn len(&self) -> u64;

    /// The normalized origin this stream was opened from, if known.
    fn origin(&self) -> Option<&OriginKey>;

    /// Returns `true` if the stream holds no bytes at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of bytes between the cursor and the end.
    fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position())
    }

    /// Reads everything from the cursor to the end.
    fn read_to_end(&mut self) -> ResourceResult<Vec<u8>> {
        let remaining = self.remaining() as usize;
        self.read_exact(remaining)
    }

    /// Reads `len` bytes and moves the cursor back to where it was.
    fn peek(&mut self, len: usize) -> ResourceResult<Vec<u8>> {
        let start = self.position();
        let bytes = self.read_exact(len);
        self.seek_to(start)?;
        bytes
    }
}

/// Adapts any `Read + Seek` source into a [`ByteStream`].
#[derive(Debug)]
pub struct SeekableStream<R> {
    reader: R,
    position: u64,
    len: u64,
    origin: Option<OriginKey>,
}

/// A stream over an owned byte buffer.
pub type MemoryStream = SeekableStream<Cursor<Vec<u8>>>;

impl<R: Read + Seek> SeekableStream<R> {
    /// Wraps a reader, keeping its current position as the stream's start position.
    pub fn new(mut reader: R, origin: Option<OriginKey>) -> ResourceResult<Self> {
        let position = reader.stream_position()?;
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(position))?;
        Ok(Self {
            reader,
            position,
            len,
            origin,
        })
    }

    /// Unwraps the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl SeekableStream<Cursor<Vec<u8>>> {
    /// Creates a stream over `bytes`, positioned at the start.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, origin: Option<OriginKey>) -> Self {
        let bytes = bytes.into();
        Self {
            len: bytes.len() as u64,
            reader: Cursor::new(bytes),
            position: 0,
            origin,
        }
    }
}

impl<R: Read + Seek + Send> ByteStream for SeekableStream<R> {
    fn position(&self) -> u64 {
        self.position
    }

    fn seek_to(&mut self, position: u64) -> ResourceResult<()> {
        self.position = self.reader.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    fn read_exact(&mut self, len: usize) -> ResourceResult<Vec<u8>> {
        let available = self.remaining() as usize;
        if len > available {
            return Err(ResourceError::ShortRead {
                requested: len,
                available,
            });
        }

        let mut buffer = vec![0; len];
        if let Err(e) = self.reader.read_exact(&mut buffer) {
            // Leave the cursor where the caller expects it.
            self.reader.seek(SeekFrom::Start(self.position))?;
            return Err(e.into());
        }
        self.position += len as u64;
        Ok(buffer)
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn origin(&self) -> Option<&OriginKey> {
        self.origin.as_ref()
    }
}
