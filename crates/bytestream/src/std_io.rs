// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::io;

use tracing::{Level, event};

use crate::{Error, Result, Sink, Source};

/// Adapts a [`std::io::Read`] into a [`Source`] and a [`std::io::Write`] into a [`Sink`].
///
/// The adapter translates the `std::io` conventions into the contract of this crate:
///
/// * A read that returns zero bytes into a non-empty buffer becomes
///   [`Error::NoMessageAvailable`].
/// * A write that accepts zero bytes of a non-empty buffer becomes [`Error::NoSpaceOnDevice`].
/// * [`io::ErrorKind::Interrupted`] becomes a zero-progress attempt, which the
///   `read_some`/`write_some` loops retry.
/// * Any other failure is carried as [`Error::Transport`].
///
/// # Example
///
/// ```
/// use bytestream::{BufferedInput, StdIo};
///
/// let mut file = StdIo::new(&b"line one\nline two\n"[..]);
///
/// let mut input = BufferedInput::with_capacity(64).unwrap();
/// input.bind(&mut file);
///
/// input.provide_data(9).unwrap();
/// assert!(input.data().starts_with(b"line one\n"));
/// ```
#[derive(Debug)]
pub struct StdIo<T> {
    inner: T,
}

impl<T> StdIo<T> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// The wrapped reader or writer.
    #[must_use]
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// The wrapped reader or writer, mutably.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Unwraps the adapter.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: io::Read + Debug> Source for StdIo<T> {
    fn read_bytes(&mut self, dest: &mut [u8]) -> Result<usize> {
        match self.inner.read(dest) {
            Ok(0) if !dest.is_empty() => Err(Error::NoMessageAvailable),
            Ok(bytes_read) => Ok(bytes_read),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                event!(Level::TRACE, message = "read interrupted");
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<T: io::Write + Debug> Sink for StdIo<T> {
    fn write_bytes(&mut self, src: &[u8]) -> Result<usize> {
        match self.inner.write(src) {
            Ok(0) if !src.is_empty() => Err(Error::NoSpaceOnDevice),
            Ok(bytes_written) => Ok(bytes_written),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                event!(Level::TRACE, message = "write interrupted");
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(Error::from)
    }
}

/// The standard input of the process as a [`Source`].
#[must_use]
pub fn stdin() -> StdIo<io::Stdin> {
    StdIo::new(io::stdin())
}

/// The standard output of the process as a [`Sink`].
#[must_use]
pub fn stdout() -> StdIo<io::Stdout> {
    StdIo::new(io::stdout())
}

/// The standard error of the process as a [`Sink`].
#[must_use]
pub fn stderr() -> StdIo<io::Stderr> {
    StdIo::new(io::stderr())
}
