// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io;

use thiserror::Error;

/// Any error that may arise when moving bytes through a [`Source`], a [`Sink`] or one of the
/// buffered layers stacked on top of them.
///
/// Two variants describe a clean end of the stream rather than a failure of the transport:
/// [`NoMessageAvailable`][Error::NoMessageAvailable] for a source that has nothing more to give
/// and [`NoSpaceOnDevice`][Error::NoSpaceOnDevice] for a sink that can accept nothing more.
/// Use [`is_end_of_input()`][Error::is_end_of_input] and [`is_sink_closed()`][Error::is_sink_closed]
/// to tell them apart from real failures.
///
/// # Thread safety
///
/// This type is thread-safe.
///
/// [`Source`]: crate::Source
/// [`Sink`]: crate::Sink
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The operation reached an unlinked stream. The stream was never bound to a collaborator
    /// or was explicitly unbound.
    #[error("stream is not linked to a source or sink")]
    Uninitialized,

    /// The buffer could not obtain the storage needed to satisfy a request, either because
    /// the allocator refused or because the buffer wraps caller-supplied memory that cannot grow.
    #[error("unable to allocate a buffer of {requested} bytes")]
    BadAllocation {
        /// The total buffer capacity that was requested.
        requested: usize,
    },

    /// The source is exhausted and no more bytes will be produced.
    #[error("no more data is available from the source")]
    NoMessageAvailable,

    /// The sink is closed or full and no more bytes will be accepted.
    #[error("no space is left in the sink")]
    NoSpaceOnDevice,

    /// We are forwarding a transport failure received from the standard library's I/O APIs.
    #[error(transparent)]
    Transport(io::Error),
}

impl Error {
    /// Whether this error signals the clean end of an input stream.
    #[must_use]
    pub const fn is_end_of_input(&self) -> bool {
        matches!(self, Self::NoMessageAvailable)
    }

    /// Whether this error signals a sink that accepts no more data.
    #[must_use]
    pub const fn is_sink_closed(&self) -> bool {
        matches!(self, Self::NoSpaceOnDevice)
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        match value.kind() {
            io::ErrorKind::UnexpectedEof => Self::NoMessageAvailable,
            io::ErrorKind::WriteZero => Self::NoSpaceOnDevice,
            _ => Self::Transport(value),
        }
    }
}

/// Represents a stream error as a standard I/O error.
/// This is often used when interoperating with code that expects standard I/O errors.
impl From<Error> for io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::Transport(error) => error,
            Error::NoMessageAvailable => Self::new(io::ErrorKind::UnexpectedEof, value),
            Error::NoSpaceOnDevice => Self::new(io::ErrorKind::WriteZero, value),
            Error::BadAllocation { .. } => Self::new(io::ErrorKind::OutOfMemory, value),
            Error::Uninitialized => Self::new(io::ErrorKind::NotConnected, value),
        }
    }
}

/// A specialized `Result` for stream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An exact-size transfer ([`read_exact()`] or [`write_all()`]) that stopped early.
///
/// Carries the number of bytes that did make it across and the number that did not, so the
/// caller can resume from `transferred` or account for exactly what was lost.
///
/// [`read_exact()`]: crate::Source::read_exact
/// [`write_all()`]: crate::Sink::write_all
#[derive(Debug, Error)]
#[error("transfer stopped after {transferred} bytes with {remaining} bytes remaining")]
pub struct Incomplete {
    /// The error that stopped the transfer.
    #[source]
    pub error: Error,

    /// Bytes transferred before the failure. This is also the offset of the untransferred
    /// region in the caller's buffer.
    pub transferred: usize,

    /// Bytes left untransferred.
    pub remaining: usize,
}

impl Incomplete {
    /// Discards the progress information and returns the underlying error.
    #[must_use]
    pub fn into_error(self) -> Error {
        self.error
    }
}

impl From<Incomplete> for Error {
    fn from(value: Incomplete) -> Self {
        value.error
    }
}
