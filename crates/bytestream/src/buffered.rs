// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{Result, Sink, Source};

/// A [`Source`] that exposes its buffered data as a contiguous window.
///
/// Callers inspect [`data()`][Self::data] in place, mark what they used via
/// [`advance_data()`][Self::advance_data] and ask for more via one of the three `provide`
/// policies:
///
/// | Method                                                       | Upstream pulls           | Returns                               |
/// |--------------------------------------------------------------|--------------------------|---------------------------------------|
/// | [`provide_some_data()`][Self::provide_some_data]             | only if window is empty  | `min(max, available)`                 |
/// | [`provide_some_more_data()`][Self::provide_some_more_data]   | at most one              | total available after the pull        |
/// | [`provide_data()`][Self::provide_data]                       | as many as needed        | total available, at least `min`       |
///
/// Implemented by [`BufferedInput`][crate::BufferedInput], which owns its storage, and by
/// [`TransformInput`][crate::TransformInput], which forwards to whatever it is bound to.
pub trait BufferedSource: Source {
    /// Number of bytes available without pulling from upstream.
    fn data_size(&self) -> usize;

    /// The available bytes. Valid until the next mutating call.
    fn data(&self) -> &[u8];

    /// Marks `len` bytes at the start of the window as consumed.
    ///
    /// # Panics
    ///
    /// Panics if `len` is greater than [`data_size()`][Self::data_size].
    fn advance_data(&mut self, len: usize);

    /// Makes room for `try_min` more bytes and performs at most one upstream pull.
    ///
    /// Returns the total number of available bytes, which may be less than requested if the
    /// upstream had less to give.
    ///
    /// # Errors
    ///
    /// Fails on transport failure, or on end of input when nothing was pulled and nothing was
    /// buffered before.
    fn provide_some_more_data(&mut self, try_min: usize) -> Result<usize>;

    /// Returns up to `max` available bytes, pulling from upstream only if none are available.
    ///
    /// # Errors
    ///
    /// Fails if the window is empty and the upstream pull fails.
    fn provide_some_data(&mut self, max: usize) -> Result<usize>;

    /// Pulls from upstream until at least `min` bytes are available.
    ///
    /// # Errors
    ///
    /// Fails if any upstream pull fails before `min` bytes are available, including on end
    /// of input.
    fn provide_data(&mut self, min: usize) -> Result<usize>;
}

/// A [`Sink`] that exposes its free space as a contiguous window producers write into.
///
/// Producers write into [`space()`][Self::space], commit what they wrote via
/// [`advance_space()`][Self::advance_space] and ask for more room via
/// [`provide_space()`][Self::provide_space] (guaranteed) or
/// [`provide_some_space()`][Self::provide_some_space] (partial).
pub trait BufferedSink: Sink {
    /// Number of bytes that can be produced without flushing or growing.
    fn space_size(&self) -> usize;

    /// The free space. Valid until the next mutating call.
    fn space(&mut self) -> &mut [u8];

    /// Commits `len` bytes at the start of the free space as produced.
    ///
    /// # Panics
    ///
    /// Panics if `len` is greater than [`space_size()`][Self::space_size].
    fn advance_space(&mut self, len: usize);

    /// Guarantees at least `min` bytes of contiguous free space, flushing and growing as needed.
    ///
    /// Returns the resulting free space size.
    ///
    /// # Errors
    ///
    /// Fails if pending data cannot be flushed or the storage cannot grow.
    fn provide_space(&mut self, min: usize) -> Result<usize>;

    /// Returns up to `max` bytes of free space, flushing or growing only if none is left.
    ///
    /// # Errors
    ///
    /// Fails if the window is full and pending data cannot be flushed.
    fn provide_some_space(&mut self, max: usize) -> Result<usize>;
}
