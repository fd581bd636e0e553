// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::num::NonZero;

use crate::{Error, Result, Sink};

/// A [`Sink`] that collects all written data into itself.
///
/// The builder can limit the size of each transfer and the total number of bytes accepted.
/// Once the total limit is reached, every further write fails with [`Error::NoSpaceOnDevice`],
/// which simulates a sink that fails in the middle of a flush.
///
/// This is for test and example purposes only and is not optimized for performance.
#[derive(Debug, Default)]
pub struct FakeSink {
    written: Vec<u8>,
    flushes: usize,

    max_write_size: Option<NonZero<usize>>,
    limit: Option<usize>,
}

impl FakeSink {
    /// Starts building a new `FakeSink`.
    #[must_use]
    pub fn builder() -> FakeSinkBuilder {
        FakeSinkBuilder {
            max_write_size: None,
            limit: None,
        }
    }

    /// Creates a new `FakeSink` with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// References the bytes written into the sink so far.
    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Consumes the instance and returns the bytes that were written to it.
    #[must_use]
    pub fn into_written(self) -> Vec<u8> {
        self.written
    }

    /// Number of times the sink was flushed.
    #[must_use]
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl Sink for FakeSink {
    #[cfg_attr(test, mutants::skip)] // Mutations easily lead to infinite loops, not worth the effort.
    fn write_bytes(&mut self, src: &[u8]) -> Result<usize> {
        let room = self.limit.map_or(usize::MAX, |limit| limit.saturating_sub(self.written.len()));

        if room == 0 {
            return Err(Error::NoSpaceOnDevice);
        }

        let len = room
            .min(src.len())
            .min(self.max_write_size.map_or(usize::MAX, NonZero::get));

        self.written.extend_from_slice(&src[..len]);

        Ok(len)
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Creates an instance of [`FakeSink`].
///
/// Access through [`FakeSink::builder()`][FakeSink::builder].
#[derive(Debug)]
pub struct FakeSinkBuilder {
    max_write_size: Option<NonZero<usize>>,
    limit: Option<usize>,
}

impl FakeSinkBuilder {
    /// The maximum number of bytes a single transfer accepts. Zero means no limit.
    ///
    /// Optional. Defaults to no limit.
    #[must_use]
    pub fn max_write(mut self, len: usize) -> Self {
        self.max_write_size = NonZero::new(len);
        self
    }

    /// The total number of bytes the sink accepts before it reports that it is full.
    ///
    /// Optional. Defaults to no limit.
    #[must_use]
    pub fn limit(mut self, len: usize) -> Self {
        self.limit = Some(len);
        self
    }

    /// Builds the `FakeSink` with the provided configuration.
    #[must_use]
    pub fn build(self) -> FakeSink {
        FakeSink {
            written: Vec::new(),
            flushes: 0,
            max_write_size: self.max_write_size,
            limit: self.limit,
        }
    }
}
