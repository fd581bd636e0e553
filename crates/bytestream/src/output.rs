// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io;

use tracing::{Level, event};

use crate::storage::Storage;
use crate::{BufferedSink, Result, Sink, SinkLink};

/// A growable output buffer that flushes into one downstream [`Sink`].
///
/// Producers write straight into the free space returned by [`space()`][Self::space] and
/// commit it with [`advance_space()`][Self::advance_space]. Committed bytes stay pending until
/// they are pushed downstream, either explicitly via [`flush()`][Self::flush] or implicitly when
/// a producer asks for more room than is free.
///
/// A failed flush keeps every byte the sink did not accept, so the flush can be retried after
/// the sink recovers or after the buffer is bound to a different sink.
///
/// Dropping a buffer with pending data makes one flush attempt. Its failure cannot be returned
/// and is reported as a `tracing` event at [`Level::ERROR`] instead; call
/// [`flush()`][Self::flush] before dropping to observe it.
///
/// # Example
///
/// ```
/// use bytestream::{BufferedOutput, Source, pipe};
///
/// let (mut reader, mut writer) = pipe();
///
/// {
///     let mut output = BufferedOutput::with_capacity(16).unwrap();
///     output.bind(&mut writer);
///
///     output.provide_space(5).unwrap();
///     output.space()[..5].copy_from_slice(b"hello");
///     output.advance_space(5);
///
///     output.flush().unwrap();
/// }
///
/// let mut received = [0_u8; 5];
/// reader.read_exact(&mut received).unwrap();
/// assert_eq!(&received, b"hello");
/// ```
#[derive(Debug)]
pub struct BufferedOutput<'a> {
    storage: Storage<'a>,

    // Pending data is `storage[start..end]`, free space is `storage[end..]`.
    start: usize,
    end: usize,

    downstream: SinkLink<'a>,
}

impl<'a> BufferedOutput<'a> {
    /// Creates an unbound buffer with [`DEFAULT_CAPACITY`][crate::DEFAULT_CAPACITY] bytes of
    /// storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadAllocation`][crate::Error::BadAllocation] if the storage cannot be allocated.
    pub fn new() -> Result<Self> {
        Self::with_capacity(crate::DEFAULT_CAPACITY)
    }

    /// Creates an unbound buffer with `capacity` bytes of storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadAllocation`][crate::Error::BadAllocation] if the storage cannot be allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self::from_storage(Storage::with_capacity(capacity)?))
    }

    /// Creates a buffer that produces into the caller-supplied `memory`.
    ///
    /// The buffer never grows: requests for more space than `memory` holds fail with
    /// [`Error::BadAllocation`][crate::Error::BadAllocation].
    #[must_use]
    pub fn from_slice_mut(memory: &'a mut [u8]) -> Self {
        Self::from_storage(Storage::Fixed(memory))
    }

    fn from_storage(storage: Storage<'a>) -> Self {
        Self {
            storage,
            start: 0,
            end: 0,
            downstream: SinkLink::new(),
        }
    }

    /// Binds the buffer to `sink`, replacing any previous downstream.
    ///
    /// Pending data is retained and goes to the new sink on the next flush.
    pub fn bind(&mut self, sink: &'a mut (dyn Sink + 'a)) {
        self.downstream.bind(sink);
    }

    /// Returns the buffer to the unbound state, handing back the previous downstream.
    pub fn unbind(&mut self) -> Option<&'a mut (dyn Sink + 'a)> {
        self.downstream.unbind()
    }

    /// Whether the buffer is bound to a downstream sink.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.downstream.is_bound()
    }

    /// Total size of the storage.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Number of bytes that can be produced without flushing or growing.
    #[must_use]
    pub fn space_size(&self) -> usize {
        self.capacity() - self.end
    }

    /// The free space. Valid until the next mutating call.
    pub fn space(&mut self) -> &mut [u8] {
        let end = self.end;

        match self.storage.as_mut_slice() {
            Some(bytes) => &mut bytes[end..],
            None => &mut [],
        }
    }

    /// Commits `len` bytes at the start of the free space as produced.
    ///
    /// # Panics
    ///
    /// Panics if `len` is greater than [`space_size()`][Self::space_size].
    pub fn advance_space(&mut self, len: usize) {
        assert!(
            len <= self.space_size(),
            "attempted to produce {len} bytes with only {} bytes of space",
            self.space_size()
        );

        self.end += len;
    }

    /// Number of produced bytes not yet pushed downstream.
    #[must_use]
    pub fn pending_size(&self) -> usize {
        self.end - self.start
    }

    /// The produced bytes not yet pushed downstream.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.storage.as_slice()[self.start..self.end]
    }

    /// Discards all pending data.
    pub fn reset_space(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    /// Guarantees at least `min` bytes of contiguous free space.
    ///
    /// If less is free, pending data is pushed downstream first and the storage only grows if
    /// that is still not enough. Returns the resulting free space size.
    ///
    /// # Errors
    ///
    /// Fails if pending data cannot be pushed or the storage cannot grow. Data the sink did not
    /// accept stays pending.
    pub fn provide_space(&mut self, min: usize) -> Result<usize> {
        if self.space_size() >= min {
            return Ok(self.space_size());
        }

        self.drain()?;
        self.make_room(min)?;

        Ok(self.space_size())
    }

    /// Returns up to `max` bytes of free space, flushing or growing only if none is left.
    ///
    /// # Errors
    ///
    /// Fails if the buffer is full and pending data cannot be pushed, or if a buffer without
    /// storage cannot allocate.
    pub fn provide_some_space(&mut self, max: usize) -> Result<usize> {
        if self.space_size() == 0 && max != 0 {
            self.drain()?;

            let required = match self.capacity() {
                0 => max,
                capacity => max.min(capacity),
            };

            self.make_room(required)?;
        }

        Ok(self.space_size().min(max))
    }

    /// Pushes all pending data downstream, then flushes the downstream sink itself.
    ///
    /// # Errors
    ///
    /// Fails if the sink does not accept all pending data or fails its own flush. Whatever
    /// the sink did accept is no longer pending, the rest is retained in order.
    pub fn flush(&mut self) -> Result<()> {
        self.drain()?;
        self.downstream.target().flush()
    }

    /// Pushes all pending data downstream without flushing the sink itself.
    fn drain(&mut self) -> Result<()> {
        if self.pending_size() == 0 {
            return Ok(());
        }

        let pending = &self.storage.as_slice()[self.start..self.end];

        match self.downstream.target().write_all(pending) {
            Ok(()) => {
                event!(Level::TRACE, message = "flushed", bytes_written = self.end - self.start);

                self.start = 0;
                self.end = 0;
                Ok(())
            }
            Err(incomplete) => {
                event!(
                    Level::DEBUG,
                    message = "partial flush",
                    bytes_written = incomplete.transferred,
                    bytes_retained = incomplete.remaining
                );

                self.start += incomplete.transferred;
                Err(incomplete.into_error())
            }
        }
    }

    fn make_room(&mut self, required: usize) -> Result<()> {
        (self.start, self.end) = self.storage.make_room(self.start, self.end, required)?;
        Ok(())
    }
}

impl Drop for BufferedOutput<'_> {
    fn drop(&mut self) {
        if self.pending_size() == 0 {
            return;
        }

        if let Err(e) = self.flush() {
            event!(
                Level::ERROR,
                message = "flush on drop failed",
                error = %e,
                bytes_lost = self.pending_size()
            );
        }
    }
}

impl Sink for BufferedOutput<'_> {
    fn write_bytes(&mut self, src: &[u8]) -> Result<usize> {
        let len = self.provide_some_space(src.len())?;

        self.space()[..len].copy_from_slice(&src[..len]);
        self.advance_space(len);

        Ok(len)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn flush(&mut self) -> Result<()> {
        self.flush()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // Trivial forwarders.
impl BufferedSink for BufferedOutput<'_> {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn space_size(&self) -> usize {
        self.space_size()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn space(&mut self) -> &mut [u8] {
        self.space()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn advance_space(&mut self, len: usize) {
        self.advance_space(len);
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_space(&mut self, min: usize) -> Result<usize> {
        self.provide_space(min)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_some_space(&mut self, max: usize) -> Result<usize> {
        self.provide_some_space(max)
    }
}

impl io::Write for BufferedOutput<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_some(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Self::flush(self).map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::testing::FakeSink;

    fn produce(output: &mut BufferedOutput<'_>, bytes: &[u8]) {
        output.provide_space(bytes.len()).unwrap();
        output.space()[..bytes.len()].copy_from_slice(bytes);
        output.advance_space(bytes.len());
    }

    #[test]
    fn smoke_test() {
        let mut sink = FakeSink::new();

        {
            let mut output = BufferedOutput::with_capacity(4).unwrap();
            output.bind(&mut sink);

            output.write_all(b"Hello, world!").unwrap();
            output.flush().unwrap();
        }

        assert_eq!(sink.written(), b"Hello, world!");
        assert_eq!(sink.flushes(), 1);
    }

    #[test]
    fn provide_space_flushes_pending_before_growing() {
        let mut sink = FakeSink::new();
        let mut output = BufferedOutput::with_capacity(16).unwrap();
        output.bind(&mut sink);

        produce(&mut output, b"0123456789");
        assert_eq!(output.space_size(), 6);

        assert_eq!(output.provide_space(10).unwrap(), 16);
        assert_eq!(output.pending_size(), 0);
        assert_eq!(output.capacity(), 16);

        produce(&mut output, b"abcdefghij");
        drop(output);

        assert_eq!(sink.written(), b"0123456789abcdefghij");
    }

    #[test]
    fn capacity_sixteen_scenario_flushes_exactly_first_write() {
        let mut sink = FakeSink::new();
        let mut output = BufferedOutput::with_capacity(16).unwrap();
        output.bind(&mut sink);

        produce(&mut output, b"first-ten!");
        output.provide_space(10).unwrap();
        output.unbind();

        drop(output);
        assert_eq!(sink.written(), b"first-ten!");
    }

    #[test]
    fn provide_space_grows_when_flushing_is_not_enough() {
        let mut sink = FakeSink::new();
        let mut output = BufferedOutput::with_capacity(16).unwrap();
        output.bind(&mut sink);

        assert_eq!(output.provide_space(40).unwrap(), 48);
        assert_eq!(output.capacity(), 48);
    }

    #[test]
    fn provide_space_without_shortage_does_no_io() {
        let mut output = BufferedOutput::with_capacity(16).unwrap();

        produce(&mut output, b"abc");

        assert_eq!(output.provide_space(13).unwrap(), 13);
        assert_eq!(output.pending(), b"abc");
        output.reset_space();
    }

    #[test]
    fn provide_some_space_returns_existing_space() {
        let mut output = BufferedOutput::with_capacity(16).unwrap();

        produce(&mut output, b"0123456789");

        assert_eq!(output.provide_some_space(100).unwrap(), 6);
        assert_eq!(output.provide_some_space(2).unwrap(), 2);
        assert_eq!(output.provide_some_space(0).unwrap(), 0);
        output.reset_space();
    }

    #[test]
    fn provide_some_space_flushes_only_when_full() {
        let mut sink = FakeSink::new();
        let mut output = BufferedOutput::with_capacity(8).unwrap();
        output.bind(&mut sink);

        produce(&mut output, b"abcdefgh");
        assert_eq!(output.space_size(), 0);

        assert_eq!(output.provide_some_space(100).unwrap(), 8);
        assert_eq!(output.capacity(), 8);
        assert_eq!(output.pending_size(), 0);
    }

    #[test]
    fn zero_capacity_allocates_on_demand() {
        let mut output = BufferedOutput::with_capacity(0).unwrap();

        assert_eq!(output.provide_some_space(5).unwrap(), 5);
        assert_eq!(output.capacity(), 5);
    }

    #[test]
    fn unbound_buffer_fails_without_touching_state() {
        let mut output = BufferedOutput::with_capacity(8).unwrap();

        produce(&mut output, b"abcdefgh");

        let e = output.provide_space(4).unwrap_err();
        assert!(matches!(e, Error::Uninitialized));
        assert_eq!(output.pending(), b"abcdefgh");
        assert_eq!(output.capacity(), 8);

        output.reset_space();
    }

    #[test]
    fn partial_flush_loses_no_data() {
        let total: Vec<u8> = (0..100).collect();
        let mut failing = FakeSink::builder().limit(37).max_write(10).build();
        let mut healthy = FakeSink::new();

        {
            let mut output = BufferedOutput::with_capacity(128).unwrap();
            output.bind(&mut failing);

            produce(&mut output, &total);

            let e = output.flush().unwrap_err();
            assert!(e.is_sink_closed());
            assert_eq!(output.pending_size(), 63);
            assert_eq!(output.pending(), &total[37..]);

            output.bind(&mut healthy);
            output.flush().unwrap();
            assert_eq!(output.pending_size(), 0);
        }

        assert_eq!(failing.written(), &total[..37]);
        assert_eq!(healthy.written(), &total[37..]);
    }

    #[test]
    fn flush_propagates_to_sink() {
        let mut sink = FakeSink::new();

        {
            let mut output = BufferedOutput::with_capacity(8).unwrap();
            output.bind(&mut sink);

            output.flush().unwrap();
            output.flush().unwrap();
            output.unbind();
        }

        assert_eq!(sink.flushes(), 2);
        assert!(sink.written().is_empty());
    }

    #[test]
    fn drop_flushes_pending_data() {
        let mut sink = FakeSink::new();

        {
            let mut output = BufferedOutput::with_capacity(8).unwrap();
            output.bind(&mut sink);
            produce(&mut output, b"tail");
        }

        assert_eq!(sink.written(), b"tail");
        assert_eq!(sink.flushes(), 1);
    }

    /// Collects formatted log lines for inspection.
    #[derive(Clone, Default)]
    struct LogCapture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl LogCapture {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes).lines().map(str::to_owned).collect()
        }
    }

    impl io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn drop_failure_is_reported_through_tracing() {
        let capture = LogCapture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_max_level(Level::TRACE)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut output = BufferedOutput::with_capacity(8).unwrap();
            produce(&mut output, b"lost");
            drop(output);
        });

        let lines = capture.lines();
        let errors: Vec<_> = lines.iter().filter(|line| line.contains("ERROR")).collect();
        assert_eq!(errors.len(), 1, "{lines:?}");
        assert!(errors[0].contains("flush on drop failed"), "{}", errors[0]);
        assert!(errors[0].contains("bytes_lost=4"), "{}", errors[0]);
    }

    #[test]
    fn unbound_empty_buffer_drops_quietly() {
        let output = BufferedOutput::with_capacity(8).unwrap();
        drop(output);
    }

    #[test]
    fn fixed_memory_cannot_grow() {
        let mut memory = [0_u8; 8];
        let mut output = BufferedOutput::from_slice_mut(&mut memory);

        assert_eq!(output.provide_space(8).unwrap(), 8);

        let e = output.provide_space(9).unwrap_err();
        assert!(matches!(e, Error::BadAllocation { .. }));
    }

    #[test]
    fn fixed_memory_receives_output() {
        let mut memory = [0_u8; 8];

        {
            let mut output = BufferedOutput::from_slice_mut(&mut memory);
            produce(&mut output, b"abc");
            assert_eq!(output.pending(), b"abc");
            output.reset_space();
        }

        assert_eq!(&memory[..3], b"abc");
    }

    #[test]
    #[should_panic]
    fn advance_past_space_panics() {
        let mut output = BufferedOutput::with_capacity(4).unwrap();
        output.advance_space(5);
    }

    #[test]
    fn stacked_buffers() {
        let mut sink = FakeSink::builder().max_write(3).build();

        {
            let mut inner = BufferedOutput::with_capacity(4).unwrap();
            inner.bind(&mut sink);

            let mut outer = BufferedOutput::with_capacity(16).unwrap();
            outer.bind(&mut inner);

            outer.write_all(&[7_u8; 50]).unwrap();
            outer.flush().unwrap();
        }

        assert_eq!(sink.written(), &[7_u8; 50][..]);
        assert_eq!(sink.flushes(), 1);
    }

    #[test]
    fn std_write() {
        use std::io::Write as _;

        let mut sink = FakeSink::new();

        {
            let mut output = BufferedOutput::with_capacity(4).unwrap();
            output.bind(&mut sink);

            write!(output, "{}-{}", 12, "abc").unwrap();
            io::Write::flush(&mut output).unwrap();
        }

        assert_eq!(sink.written(), b"12-abc");
    }
}
