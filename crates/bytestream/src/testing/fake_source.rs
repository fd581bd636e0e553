// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io;
use std::num::NonZero;

use crate::{Error, Result, Source};

/// A [`Source`] that reads from an in-memory byte vector.
///
/// Once all contents have been read, every further read fails with
/// [`Error::NoMessageAvailable`]. The builder can limit the size of each transfer to force
/// callers into multiple reads, and can inject a transport failure at a fixed offset.
///
/// This is for test and example purposes only and is not optimized for performance.
#[derive(Debug)]
pub struct FakeSource {
    contents: Vec<u8>,
    position: usize,

    // For testing purposes, we may choose to limit the read size and
    // thereby force the caller to do multiple read operations.
    max_read_size: Option<NonZero<usize>>,

    failure: Option<(usize, io::ErrorKind)>,
}

impl FakeSource {
    /// Starts building a new `FakeSource`.
    #[must_use]
    pub fn builder() -> FakeSourceBuilder {
        FakeSourceBuilder {
            contents: Vec::new(),
            max_read_size: None,
            failure: None,
        }
    }

    /// Creates a new `FakeSource` with the given contents and the default configuration.
    #[must_use]
    pub fn new(contents: Vec<u8>) -> Self {
        Self::builder().data(contents).build()
    }

    /// Number of bytes read from the source so far.
    #[must_use]
    pub fn bytes_read(&self) -> usize {
        self.position
    }

    /// The contents that have not been read yet.
    #[must_use]
    pub fn remaining(&self) -> &[u8] {
        &self.contents[self.position..]
    }
}

impl Source for FakeSource {
    #[cfg_attr(test, mutants::skip)] // Mutations easily lead to infinite loops, not worth the effort.
    fn read_bytes(&mut self, dest: &mut [u8]) -> Result<usize> {
        let mut available = self.contents.len() - self.position;

        if let Some((offset, kind)) = self.failure {
            if self.position >= offset {
                return Err(Error::from(io::Error::from(kind)));
            }

            available = available.min(offset - self.position);
        }

        if available == 0 {
            return Err(Error::NoMessageAvailable);
        }

        let len = available
            .min(dest.len())
            .min(self.max_read_size.map_or(usize::MAX, NonZero::get));

        dest[..len].copy_from_slice(&self.contents[self.position..self.position + len]);
        self.position += len;

        Ok(len)
    }
}

/// Creates an instance of [`FakeSource`].
///
/// Access through [`FakeSource::builder()`][FakeSource::builder].
#[derive(Debug)]
pub struct FakeSourceBuilder {
    contents: Vec<u8>,
    max_read_size: Option<NonZero<usize>>,
    failure: Option<(usize, io::ErrorKind)>,
}

impl FakeSourceBuilder {
    /// The bytes the source yields.
    ///
    /// Optional. Defaults to no contents, i.e. an exhausted source.
    #[must_use]
    pub fn data(mut self, contents: Vec<u8>) -> Self {
        self.contents = contents;
        self
    }

    /// The maximum number of bytes a single transfer returns. Zero means no limit.
    ///
    /// Optional. Defaults to no limit.
    #[must_use]
    pub fn max_read(mut self, len: usize) -> Self {
        self.max_read_size = NonZero::new(len);
        self
    }

    /// Makes every read fail with an error of `kind` once `offset` bytes have been read.
    #[must_use]
    pub fn fail_after(mut self, offset: usize, kind: io::ErrorKind) -> Self {
        self.failure = Some((offset, kind));
        self
    }

    /// Builds the `FakeSource` with the provided configuration.
    #[must_use]
    pub fn build(self) -> FakeSource {
        FakeSource {
            contents: self.contents,
            position: 0,
            max_read_size: self.max_read_size,
            failure: self.failure,
        }
    }
}
