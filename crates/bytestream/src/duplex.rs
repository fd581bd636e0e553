// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{BufferedInput, BufferedOutput, BufferedSink, BufferedSource, Result, Sink, Source};

/// A duplex buffer: one [`BufferedInput`] and one [`BufferedOutput`] with independent storage.
///
/// The two halves are linked separately, typically to the read and write side of the same
/// connection. The buffer forwards [`Source`] and [`BufferedSource`] calls to its input half and
/// [`Sink`] and [`BufferedSink`] calls to its output half, so it can be used anywhere either is
/// expected. [`split_mut()`][Self::split_mut] hands out both halves at once.
#[derive(Debug)]
pub struct Buffer<'a> {
    input: BufferedInput<'a>,
    output: BufferedOutput<'a>,
}

impl<'a> Buffer<'a> {
    /// Creates an unbound duplex buffer with [`DEFAULT_CAPACITY`][crate::DEFAULT_CAPACITY]
    /// bytes of storage in each direction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadAllocation`][crate::Error::BadAllocation] if the storage cannot be
    /// allocated.
    pub fn new() -> Result<Self> {
        Self::with_capacity(crate::DEFAULT_CAPACITY, crate::DEFAULT_CAPACITY)
    }

    /// Creates an unbound duplex buffer with the given capacity for each direction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadAllocation`][crate::Error::BadAllocation] if the storage cannot be
    /// allocated.
    pub fn with_capacity(input_capacity: usize, output_capacity: usize) -> Result<Self> {
        Ok(Self {
            input: BufferedInput::with_capacity(input_capacity)?,
            output: BufferedOutput::with_capacity(output_capacity)?,
        })
    }

    /// Combines two separately created halves, e.g. ones over caller-supplied memory.
    #[must_use]
    pub fn from_parts(input: BufferedInput<'a>, output: BufferedOutput<'a>) -> Self {
        Self { input, output }
    }

    /// Splits the buffer back into its halves, keeping their bindings and contents.
    #[must_use]
    pub fn into_parts(self) -> (BufferedInput<'a>, BufferedOutput<'a>) {
        (self.input, self.output)
    }

    /// Binds the input half to `source` and the output half to `sink`.
    pub fn bind(&mut self, source: &'a mut (dyn Source + 'a), sink: &'a mut (dyn Sink + 'a)) {
        self.input.bind(source);
        self.output.bind(sink);
    }

    /// The input half.
    #[must_use]
    pub fn input(&self) -> &BufferedInput<'a> {
        &self.input
    }

    /// The input half, mutably.
    pub fn input_mut(&mut self) -> &mut BufferedInput<'a> {
        &mut self.input
    }

    /// The output half.
    #[must_use]
    pub fn output(&self) -> &BufferedOutput<'a> {
        &self.output
    }

    /// The output half, mutably.
    pub fn output_mut(&mut self) -> &mut BufferedOutput<'a> {
        &mut self.output
    }

    /// Both halves at once, e.g. to [`pump()`][crate::pump] from one into the other.
    pub fn split_mut(&mut self) -> (&mut BufferedInput<'a>, &mut BufferedOutput<'a>) {
        (&mut self.input, &mut self.output)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // Trivial forwarders.
impl Source for Buffer<'_> {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn read_bytes(&mut self, dest: &mut [u8]) -> Result<usize> {
        self.input.read_bytes(dest)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // Trivial forwarders.
impl BufferedSource for Buffer<'_> {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn data_size(&self) -> usize {
        self.input.data_size()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn data(&self) -> &[u8] {
        self.input.data()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn advance_data(&mut self, len: usize) {
        self.input.advance_data(len);
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_some_more_data(&mut self, try_min: usize) -> Result<usize> {
        self.input.provide_some_more_data(try_min)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_some_data(&mut self, max: usize) -> Result<usize> {
        self.input.provide_some_data(max)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_data(&mut self, min: usize) -> Result<usize> {
        self.input.provide_data(min)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // Trivial forwarders.
impl Sink for Buffer<'_> {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn write_bytes(&mut self, src: &[u8]) -> Result<usize> {
        self.output.write_bytes(src)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn flush(&mut self) -> Result<()> {
        self.output.flush()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // Trivial forwarders.
impl BufferedSink for Buffer<'_> {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn space_size(&self) -> usize {
        self.output.space_size()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn space(&mut self) -> &mut [u8] {
        self.output.space()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn advance_space(&mut self, len: usize) {
        self.output.advance_space(len);
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_space(&mut self, min: usize) -> Result<usize> {
        self.output.provide_space(min)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_some_space(&mut self, max: usize) -> Result<usize> {
        self.output.provide_some_space(max)
    }
}
