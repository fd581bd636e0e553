// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io;

use tracing::{Level, event};

use crate::storage::Storage;
use crate::{BufferedSource, Error, Result, Source, SourceLink};

/// A growable input buffer that pulls from one upstream [`Source`] on demand.
///
/// The buffer keeps its unconsumed bytes as a contiguous window that callers can inspect in
/// place via [`data()`][Self::data] and consume via [`advance_data()`][Self::advance_data].
/// When more bytes are needed, the buffer makes room behind the window (compacting in place or
/// growing to a multiple of its current capacity) and pulls into that room from upstream.
///
/// The upstream is borrowed for `'a` and can be swapped at any time with
/// [`bind()`][Self::bind]. A buffer that was never bound fails its first pull with
/// [`Error::Uninitialized`].
///
/// A `BufferedInput` is itself a [`Source`], so buffers can be stacked.
///
/// # Example
///
/// ```
/// use bytestream::{BufferedInput, Sink, pipe};
///
/// let (mut reader, mut writer) = pipe();
/// writer.write_all(b"hello, world").unwrap();
///
/// let mut input = BufferedInput::with_capacity(8).unwrap();
/// input.bind(&mut reader);
///
/// input.provide_data(5).unwrap();
/// assert_eq!(&input.data()[..5], b"hello");
/// input.advance_data(5);
/// ```
#[derive(Debug)]
pub struct BufferedInput<'a> {
    storage: Storage<'a>,

    // Unconsumed data is `storage[start..end]`.
    start: usize,
    end: usize,

    upstream: SourceLink<'a>,
}

impl<'a> BufferedInput<'a> {
    /// Creates an unbound buffer with [`DEFAULT_CAPACITY`][crate::DEFAULT_CAPACITY] bytes of
    /// storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadAllocation`] if the storage cannot be allocated.
    pub fn new() -> Result<Self> {
        Self::with_capacity(crate::DEFAULT_CAPACITY)
    }

    /// Creates an unbound buffer with `capacity` bytes of storage.
    ///
    /// A zero capacity is valid: the buffer allocates on first demand, sized to that demand.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadAllocation`] if the storage cannot be allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self::from_storage(Storage::with_capacity(capacity)?, 0))
    }

    /// Creates a buffer whose window is exactly the caller-supplied `data`.
    ///
    /// The buffer does not own or copy the memory and never grows. Once `data` is consumed
    /// the buffer behaves like an exhausted source, whether bound to an upstream or not.
    #[must_use]
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self::from_storage(Storage::Frozen(data), data.len())
    }

    fn from_storage(storage: Storage<'a>, end: usize) -> Self {
        Self {
            storage,
            start: 0,
            end,
            upstream: SourceLink::new(),
        }
    }

    /// Binds the buffer to `source`, replacing any previous upstream.
    ///
    /// Buffered data is retained; it is not affected by the change of upstream.
    pub fn bind(&mut self, source: &'a mut (dyn Source + 'a)) {
        self.upstream.bind(source);
    }

    /// Returns the buffer to the unbound state, handing back the previous upstream.
    pub fn unbind(&mut self) -> Option<&'a mut (dyn Source + 'a)> {
        self.upstream.unbind()
    }

    /// Whether the buffer is bound to an upstream source.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.upstream.is_bound()
    }

    /// Total size of the storage.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Number of bytes available without pulling from upstream.
    #[must_use]
    pub fn data_size(&self) -> usize {
        self.end - self.start
    }

    /// The available bytes. Valid until the next mutating call.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.storage.as_slice()[self.start..self.end]
    }

    /// Marks `len` bytes at the start of the window as consumed.
    ///
    /// # Panics
    ///
    /// Panics if `len` is greater than [`data_size()`][Self::data_size].
    pub fn advance_data(&mut self, len: usize) {
        assert!(
            len <= self.data_size(),
            "attempted to consume {len} bytes with only {} bytes available",
            self.data_size()
        );

        self.start += len;
    }

    /// Makes every byte that was consumed since the storage was last reshaped available again.
    ///
    /// Used when the buffer contents must be treated as freshly available, for example after
    /// the storage was filled through other means.
    pub fn reset_data(&mut self) {
        self.start = 0;
    }

    /// Makes room for `try_min` more bytes and performs at most one upstream pull.
    ///
    /// Returns the total number of available bytes. This may be less than
    /// `data_size() + try_min` if the upstream had less to give. A zero `try_min` returns the
    /// current size without any I/O.
    ///
    /// # Errors
    ///
    /// Fails on a transport failure or an unbound upstream. End of input is only reported if
    /// nothing was buffered before the call; otherwise the buffered bytes are returned.
    pub fn provide_some_more_data(&mut self, try_min: usize) -> Result<usize> {
        if try_min == 0 {
            return Ok(self.data_size());
        }

        match self.pull(try_min) {
            Ok(()) => Ok(self.data_size()),
            Err(e) if e.is_end_of_input() && self.data_size() != 0 => Ok(self.data_size()),
            Err(e) => Err(e),
        }
    }

    /// Returns up to `max` available bytes, pulling from upstream only if none are available.
    ///
    /// If `max` bytes are already buffered this returns `max` without I/O. If fewer are
    /// buffered, it returns that smaller amount without I/O and the caller decides whether to
    /// accept it.
    ///
    /// # Errors
    ///
    /// Fails if the window is empty and the upstream pull fails.
    pub fn provide_some_data(&mut self, max: usize) -> Result<usize> {
        if self.data_size() == 0 && max != 0 {
            self.pull(max)?;
        }

        Ok(self.data_size().min(max))
    }

    /// Pulls from upstream until at least `min` bytes are available.
    ///
    /// Returns the total number of available bytes.
    ///
    /// # Errors
    ///
    /// Fails if any upstream pull fails before `min` bytes are available, including on end of
    /// input. Bytes pulled before the failure stay buffered.
    pub fn provide_data(&mut self, min: usize) -> Result<usize> {
        while self.data_size() < min {
            self.pull(min - self.data_size())?;
        }

        Ok(self.data_size())
    }

    /// Ensures room for `required` more bytes behind the window, then pulls once.
    fn pull(&mut self, required: usize) -> Result<()> {
        if matches!(self.storage, Storage::Frozen(_)) {
            return Err(Error::NoMessageAvailable);
        }

        // Storage is left untouched when the pull cannot succeed.
        if !self.upstream.is_bound() {
            return Err(Error::Uninitialized);
        }

        (self.start, self.end) = self.storage.make_room(self.start, self.end, required)?;

        let spare = &mut self.storage.as_mut_slice().ok_or(Error::NoMessageAvailable)?[self.end..];
        let bytes_read = self.upstream.target().read_some(spare)?;

        event!(
            Level::TRACE,
            message = "pulled",
            bytes_read,
            requested = required,
            available = self.end - self.start + bytes_read
        );

        self.end += bytes_read;
        Ok(())
    }
}

impl Source for BufferedInput<'_> {
    /// Reads at most one buffer's worth, so large reads never grow the storage.
    fn read_bytes(&mut self, dest: &mut [u8]) -> Result<usize> {
        let max = match self.capacity() {
            0 => dest.len(),
            capacity => dest.len().min(capacity),
        };

        let len = self.provide_some_data(max)?;

        dest[..len].copy_from_slice(&self.data()[..len]);
        self.advance_data(len);

        Ok(len)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // Trivial forwarders.
impl BufferedSource for BufferedInput<'_> {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn data_size(&self) -> usize {
        self.data_size()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn data(&self) -> &[u8] {
        self.data()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn advance_data(&mut self, len: usize) {
        self.advance_data(len);
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_some_more_data(&mut self, try_min: usize) -> Result<usize> {
        self.provide_some_more_data(try_min)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_some_data(&mut self, max: usize) -> Result<usize> {
        self.provide_some_data(max)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_data(&mut self, min: usize) -> Result<usize> {
        self.provide_data(min)
    }
}

/// End of input reads as zero bytes, the way `std::io` reports it.
impl io::Read for BufferedInput<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read_some(buf) {
            Ok(len) => Ok(len),
            Err(Error::NoMessageAvailable) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl io::BufRead for BufferedInput<'_> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self.provide_some_data(self.capacity().max(1)) {
            Ok(_) | Err(Error::NoMessageAvailable) => Ok(self.data()),
            Err(e) => Err(e.into()),
        }
    }

    fn consume(&mut self, amt: usize) {
        self.advance_data(amt);
    }
}
