// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::num::NonZero;
use std::rc::Rc;

use crate::{Error, Result, Sink, Source};

#[derive(Debug)]
struct Shared {
    bytes: VecDeque<u8>,
    chunk_limit: Option<NonZero<usize>>,
}

impl Shared {
    fn chunk(&self, len: usize) -> usize {
        len.min(self.chunk_limit.map_or(usize::MAX, NonZero::get))
    }
}

/// Creates an in-memory pipe. Bytes written to the [`PipeWriter`] are read from the
/// [`PipeReader`] in the same order.
///
/// The pipe never blocks: reading from an empty pipe fails with
/// [`Error::NoMessageAvailable`], and writing after the reader is gone fails with
/// [`Error::NoSpaceOnDevice`].
///
/// # Example
///
/// ```
/// use bytestream::{Sink, Source, pipe};
///
/// let (mut reader, mut writer) = pipe();
/// writer.write_all(b"ping").unwrap();
///
/// let mut dest = [0_u8; 4];
/// reader.read_exact(&mut dest).unwrap();
/// assert_eq!(&dest, b"ping");
/// ```
#[must_use]
pub fn pipe() -> (PipeReader, PipeWriter) {
    new_pipe(None)
}

/// Creates an in-memory pipe whose every transfer moves at most `chunk_limit` bytes.
///
/// Used to exercise callers against sources and sinks that make partial progress.
#[must_use]
pub fn pipe_with_chunk_limit(chunk_limit: NonZero<usize>) -> (PipeReader, PipeWriter) {
    new_pipe(Some(chunk_limit))
}

fn new_pipe(chunk_limit: Option<NonZero<usize>>) -> (PipeReader, PipeWriter) {
    let shared = Rc::new(RefCell::new(Shared {
        bytes: VecDeque::new(),
        chunk_limit,
    }));

    (
        PipeReader {
            shared: Rc::clone(&shared),
        },
        PipeWriter { shared },
    )
}

/// The reading end of a [`pipe()`].
#[derive(Debug)]
pub struct PipeReader {
    shared: Rc<RefCell<Shared>>,
}

impl PipeReader {
    /// Number of bytes written but not yet read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.borrow().bytes.len()
    }

    /// Whether every written byte has been read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Source for PipeReader {
    fn read_bytes(&mut self, dest: &mut [u8]) -> Result<usize> {
        let mut shared = self.shared.borrow_mut();

        if shared.bytes.is_empty() {
            return Err(Error::NoMessageAvailable);
        }

        let len = shared.chunk(dest.len()).min(shared.bytes.len());

        for (slot, byte) in dest[..len].iter_mut().zip(shared.bytes.drain(..len)) {
            *slot = byte;
        }

        Ok(len)
    }
}

/// The writing end of a [`pipe()`].
#[derive(Debug)]
pub struct PipeWriter {
    shared: Rc<RefCell<Shared>>,
}

impl PipeWriter {
    /// Whether the reading end still exists.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        Rc::strong_count(&self.shared) > 1
    }
}

impl Sink for PipeWriter {
    fn write_bytes(&mut self, src: &[u8]) -> Result<usize> {
        if !self.is_connected() {
            return Err(Error::NoSpaceOnDevice);
        }

        let mut shared = self.shared.borrow_mut();
        let len = shared.chunk(src.len());
        shared.bytes.extend(&src[..len]);

        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_not_impl_any;

    use super::*;

    assert_not_impl_any!(PipeReader: Send, Sync);
    assert_not_impl_any!(PipeWriter: Send, Sync);

    #[test]
    fn bytes_arrive_in_order() {
        let (mut reader, mut writer) = pipe();

        writer.write_all(b"abc").unwrap();
        writer.write_all(b"def").unwrap();
        assert_eq!(reader.len(), 6);

        let mut dest = [0_u8; 6];
        reader.read_exact(&mut dest).unwrap();

        assert_eq!(&dest, b"abcdef");
        assert!(reader.is_empty());
    }

    #[test]
    fn empty_pipe_reports_end_of_input() {
        let (mut reader, _writer) = pipe();

        let e = reader.read_some(&mut [0_u8; 1]).unwrap_err();

        assert!(e.is_end_of_input());
    }

    #[test]
    fn writer_fails_once_reader_is_gone() {
        let (reader, mut writer) = pipe();
        assert!(writer.is_connected());

        drop(reader);

        assert!(!writer.is_connected());
        assert!(writer.write_some(b"x").unwrap_err().is_sink_closed());
    }

    #[test]
    fn chunk_limit_applies_to_both_ends() {
        let (mut reader, mut writer) = pipe_with_chunk_limit(NonZero::new(2).unwrap());

        assert_eq!(writer.write_some(b"abcde").unwrap(), 2);
        writer.write_all(b"cde").unwrap();

        let mut dest = [0_u8; 5];
        assert_eq!(reader.read_some(&mut dest).unwrap(), 2);
        assert_eq!(&dest[..2], b"ab");
    }
}
