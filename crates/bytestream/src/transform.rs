// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Layers that own no storage and forward the windowed contract to a bound buffer.
//!
//! A transform sits between a consumer and a buffer, so the consumer works directly on the
//! buffer's window. Combined with [`pump()`], a pipeline of filters moves bytes from one
//! buffered window straight into the next without intermediate copies.

use tracing::{Level, event};

use crate::{BufferedSink, BufferedSinkLink, BufferedSource, BufferedSourceLink, Error, Result, Sink, Source};

/// Forwards every window call to the [`BufferedSource`] it is bound to.
///
/// Unbound, it behaves like an exhausted window whose every pull fails with
/// [`Error::Uninitialized`][crate::Error::Uninitialized].
#[derive(Debug, Default)]
pub struct TransformInput<'a> {
    upstream: BufferedSourceLink<'a>,
}

impl<'a> TransformInput<'a> {
    /// Creates an unbound transform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the transform to `source`, replacing any previous upstream.
    pub fn bind(&mut self, source: &'a mut (dyn BufferedSource + 'a)) {
        self.upstream.bind(source);
    }

    /// Returns the transform to the unbound state, handing back the previous upstream.
    pub fn unbind(&mut self) -> Option<&'a mut (dyn BufferedSource + 'a)> {
        self.upstream.unbind()
    }

    /// Whether the transform is bound to an upstream buffer.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.upstream.is_bound()
    }
}

impl Source for TransformInput<'_> {
    fn read_bytes(&mut self, dest: &mut [u8]) -> Result<usize> {
        let len = self.provide_some_data(dest.len())?;

        dest[..len].copy_from_slice(&self.data()[..len]);
        self.advance_data(len);

        Ok(len)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // Trivial forwarders.
impl BufferedSource for TransformInput<'_> {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn data_size(&self) -> usize {
        self.upstream.target_ref().data_size()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn data(&self) -> &[u8] {
        self.upstream.target_ref().data()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn advance_data(&mut self, len: usize) {
        self.upstream.target().advance_data(len);
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_some_more_data(&mut self, try_min: usize) -> Result<usize> {
        self.upstream.target().provide_some_more_data(try_min)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_some_data(&mut self, max: usize) -> Result<usize> {
        self.upstream.target().provide_some_data(max)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_data(&mut self, min: usize) -> Result<usize> {
        self.upstream.target().provide_data(min)
    }
}

/// Forwards every window call to the [`BufferedSink`] it is bound to.
///
/// Unbound, it behaves like a full window whose every flush fails with
/// [`Error::Uninitialized`][crate::Error::Uninitialized].
#[derive(Debug, Default)]
pub struct TransformOutput<'a> {
    downstream: BufferedSinkLink<'a>,
}

impl<'a> TransformOutput<'a> {
    /// Creates an unbound transform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the transform to `sink`, replacing any previous downstream.
    pub fn bind(&mut self, sink: &'a mut (dyn BufferedSink + 'a)) {
        self.downstream.bind(sink);
    }

    /// Returns the transform to the unbound state, handing back the previous downstream.
    pub fn unbind(&mut self) -> Option<&'a mut (dyn BufferedSink + 'a)> {
        self.downstream.unbind()
    }

    /// Whether the transform is bound to a downstream buffer.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.downstream.is_bound()
    }
}

impl Sink for TransformOutput<'_> {
    fn write_bytes(&mut self, src: &[u8]) -> Result<usize> {
        let len = self.provide_some_space(src.len())?;

        self.space()[..len].copy_from_slice(&src[..len]);
        self.advance_space(len);

        Ok(len)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn flush(&mut self) -> Result<()> {
        self.downstream.target().flush()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // Trivial forwarders.
impl BufferedSink for TransformOutput<'_> {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn space_size(&self) -> usize {
        self.downstream.target_ref().space_size()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn space(&mut self) -> &mut [u8] {
        self.downstream.target().space()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn advance_space(&mut self, len: usize) {
        self.downstream.target().advance_space(len);
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_space(&mut self, min: usize) -> Result<usize> {
        self.downstream.target().provide_space(min)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn provide_some_space(&mut self, max: usize) -> Result<usize> {
        self.downstream.target().provide_some_space(max)
    }
}

/// What a [`Filter`] did with the windows it was given.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Progress {
    /// Bytes were consumed from the input window and produced into the output window.
    ///
    /// Reporting no bytes either way is the same as [`NeedInput`][Self::NeedInput].
    Advanced {
        /// Bytes consumed from the start of the input window.
        consumed: usize,

        /// Bytes produced at the start of the output window.
        produced: usize,
    },

    /// The input window ends with an incomplete unit of work.
    NeedInput,

    /// The output window is too small for the next unit of work.
    NeedOutput,
}

/// Converts bytes from one window into another.
///
/// Implemented for every `FnMut(&[u8], &mut [u8]) -> Progress`.
pub trait Filter {
    /// Reads from the start of `input` and writes to the start of `output`.
    fn apply(&mut self, input: &[u8], output: &mut [u8]) -> Progress;
}

impl<F> Filter for F
where
    F: FnMut(&[u8], &mut [u8]) -> Progress,
{
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn apply(&mut self, input: &[u8], output: &mut [u8]) -> Progress {
        self(input, output)
    }
}

/// Runs `filter` over everything `input` yields until it reaches end of input.
///
/// Bytes are consumed from the input window and produced directly into the output window.
/// The input is pulled from only when its window is empty or the filter asks for more, and the
/// output makes room only when the filter asks for it. Returns the total number of bytes
/// consumed. The output is not flushed.
///
/// # Errors
///
/// Fails with [`Error::NoMessageAvailable`] if the input ends in the middle of a unit of work;
/// the incomplete unit stays in the input window. Otherwise fails with the first error of
/// either side other than the input's end.
pub fn pump(input: &mut dyn BufferedSource, output: &mut dyn BufferedSink, filter: &mut dyn Filter) -> Result<usize> {
    let mut consumed_total = 0;
    let mut produced_total = 0;

    loop {
        if input.data_size() == 0 {
            match input.provide_some_more_data(1) {
                Ok(_) => {}
                Err(e) if e.is_end_of_input() => break,
                Err(e) => return Err(e),
            }
        }

        output.provide_some_space(input.data_size())?;

        match filter.apply(input.data(), output.space()) {
            Progress::Advanced { consumed, produced } if consumed != 0 || produced != 0 => {
                input.advance_data(consumed);
                output.advance_space(produced);

                consumed_total += consumed;
                produced_total += produced;
            }
            Progress::Advanced { .. } | Progress::NeedInput => {
                let buffered = input.data_size();

                if input.provide_some_more_data(1)? == buffered {
                    event!(Level::DEBUG, message = "input ends mid-unit", bytes_left = buffered);
                    return Err(Error::NoMessageAvailable);
                }
            }
            Progress::NeedOutput => {
                let wanted = output.space_size().max(input.data_size()) + 1;
                output.provide_space(wanted)?;
            }
        }
    }

    event!(Level::TRACE, message = "pumped", consumed = consumed_total, produced = produced_total);

    Ok(consumed_total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSink, FakeSource};
    use crate::{BufferedInput, BufferedOutput};

    fn uppercase(input: &[u8], output: &mut [u8]) -> Progress {
        let len = input.len().min(output.len());

        for (dest, byte) in output.iter_mut().zip(&input[..len]) {
            *dest = byte.to_ascii_uppercase();
        }

        Progress::Advanced {
            consumed: len,
            produced: len,
        }
    }

    /// Copies whole two-byte units only.
    fn pairs(input: &[u8], output: &mut [u8]) -> Progress {
        if input.len() < 2 {
            return Progress::NeedInput;
        }

        if output.len() < 2 {
            return Progress::NeedOutput;
        }

        let len = input.len().min(output.len()) / 2 * 2;
        output[..len].copy_from_slice(&input[..len]);

        Progress::Advanced {
            consumed: len,
            produced: len,
        }
    }

    #[test]
    fn transform_input_forwards_window() {
        let mut source = FakeSource::new(b"abcdef".to_vec());
        let mut buffer = BufferedInput::with_capacity(8).unwrap();
        buffer.bind(&mut source);

        let mut transform = TransformInput::new();
        transform.bind(&mut buffer);

        assert_eq!(transform.provide_data(4).unwrap(), 6);
        assert_eq!(transform.data(), b"abcdef");

        transform.advance_data(2);
        assert_eq!(transform.data_size(), 4);

        let mut dest = [0_u8; 4];
        transform.read_exact(&mut dest).unwrap();
        assert_eq!(&dest, b"cdef");
    }

    #[test]
    fn unbound_transform_input_fails_fast() {
        let mut transform = TransformInput::new();

        assert!(!transform.is_bound());
        assert_eq!(transform.data_size(), 0);
        assert!(matches!(transform.provide_some_data(1), Err(Error::Uninitialized)));
        assert!(matches!(transform.read_some(&mut [0_u8; 1]), Err(Error::Uninitialized)));
    }

    #[test]
    fn transform_output_forwards_window() {
        let mut sink = FakeSink::new();

        {
            let mut buffer = BufferedOutput::with_capacity(4).unwrap();
            buffer.bind(&mut sink);

            let mut transform = TransformOutput::new();
            transform.bind(&mut buffer);

            transform.provide_space(3).unwrap();
            transform.space()[..3].copy_from_slice(b"xyz");
            transform.advance_space(3);

            transform.write_all(b"0123456789").unwrap();
            transform.flush().unwrap();
            assert!(transform.unbind().is_some());
        }

        assert_eq!(sink.written(), b"xyz0123456789");
        assert_eq!(sink.flushes(), 1);
    }

    #[test]
    fn unbound_transform_output_fails_fast() {
        let mut transform = TransformOutput::new();

        assert_eq!(transform.space_size(), 0);
        assert!(transform.space().is_empty());
        assert!(matches!(transform.provide_space(1), Err(Error::Uninitialized)));
        assert!(matches!(transform.flush(), Err(Error::Uninitialized)));
    }

    #[test]
    fn pump_applies_filter_between_windows() {
        let mut source = FakeSource::builder().data(b"hello, pipeline".to_vec()).max_read(4).build();
        let mut sink = FakeSink::new();

        {
            let mut input = BufferedInput::with_capacity(8).unwrap();
            input.bind(&mut source);

            let mut output = BufferedOutput::with_capacity(8).unwrap();
            output.bind(&mut sink);

            let consumed = pump(&mut input, &mut output, &mut uppercase).unwrap();
            assert_eq!(consumed, 15);

            output.flush().unwrap();
        }

        assert_eq!(sink.written(), b"HELLO, PIPELINE");
    }

    #[test]
    fn pump_through_transforms() {
        let mut source = FakeSource::new(b"chained".to_vec());
        let mut sink = FakeSink::new();

        {
            let mut input = BufferedInput::with_capacity(3).unwrap();
            input.bind(&mut source);
            let mut transform_in = TransformInput::new();
            transform_in.bind(&mut input);

            let mut output = BufferedOutput::with_capacity(3).unwrap();
            output.bind(&mut sink);
            let mut transform_out = TransformOutput::new();
            transform_out.bind(&mut output);

            pump(&mut transform_in, &mut transform_out, &mut uppercase).unwrap();
            transform_out.flush().unwrap();
        }

        assert_eq!(sink.written(), b"CHAINED");
    }

    #[test]
    fn pump_grows_output_for_expanding_filter() {
        let mut source = FakeSource::new(b"ab".to_vec());
        let mut sink = FakeSink::new();

        // Every input byte becomes four output bytes.
        let mut widen = |input: &[u8], output: &mut [u8]| match input.first() {
            Some(_) if output.len() < 4 => Progress::NeedOutput,
            Some(&byte) => {
                output[..4].fill(byte);
                Progress::Advanced { consumed: 1, produced: 4 }
            }
            None => Progress::NeedInput,
        };

        {
            let mut input = BufferedInput::with_capacity(2).unwrap();
            input.bind(&mut source);

            let mut output = BufferedOutput::with_capacity(2).unwrap();
            output.bind(&mut sink);

            pump(&mut input, &mut output, &mut widen).unwrap();
            output.flush().unwrap();
        }

        assert_eq!(sink.written(), b"aaaabbbb");
    }

    #[test]
    fn pump_waits_for_whole_units() {
        let mut source = FakeSource::builder().data(b"abcdef".to_vec()).max_read(1).build();
        let mut sink = FakeSink::new();

        {
            let mut input = BufferedInput::with_capacity(4).unwrap();
            input.bind(&mut source);

            let mut output = BufferedOutput::with_capacity(4).unwrap();
            output.bind(&mut sink);

            assert_eq!(pump(&mut input, &mut output, &mut pairs).unwrap(), 6);

            assert_eq!(input.capacity(), 4);
            assert_eq!(output.capacity(), 4);
            output.flush().unwrap();
        }

        assert_eq!(sink.written(), b"abcdef");
    }

    #[test]
    fn pump_reports_truncated_unit() {
        let mut source = FakeSource::builder().data(b"abc".to_vec()).max_read(1).build();
        let mut sink = FakeSink::new();

        {
            let mut input = BufferedInput::with_capacity(4).unwrap();
            input.bind(&mut source);

            let mut output = BufferedOutput::with_capacity(4).unwrap();
            output.bind(&mut sink);

            let e = pump(&mut input, &mut output, &mut pairs).unwrap_err();

            assert!(matches!(e, Error::NoMessageAvailable));
            assert_eq!(input.data(), b"c");
            assert_eq!(output.pending(), b"ab");
            assert_eq!(output.capacity(), 4);
            output.flush().unwrap();
        }

        assert_eq!(sink.written(), b"ab");
    }

    #[test]
    fn idle_filter_is_treated_as_needing_input() {
        let mut source = FakeSource::new(b"xyz".to_vec());
        let mut output = BufferedOutput::with_capacity(4).unwrap();
        let mut input = BufferedInput::with_capacity(4).unwrap();
        input.bind(&mut source);

        let mut idle = |_input: &[u8], _output: &mut [u8]| Progress::Advanced { consumed: 0, produced: 0 };

        let e = pump(&mut input, &mut output, &mut idle).unwrap_err();

        assert!(matches!(e, Error::NoMessageAvailable));
        assert_eq!(input.data(), b"xyz");
        assert_eq!(output.capacity(), 4);
    }
}
