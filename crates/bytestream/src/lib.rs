// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Buffered synchronous byte-stream I/O.
//!
//! The crate models byte producers that can be read from ([`Source`] trait) and byte consumers
//! that can be written to ([`Sink`] trait). Both traits are built around a single transfer
//! attempt that may make partial progress; the provided `read_some`/`write_some` and
//! `read_exact`/`write_all` methods turn that into a reliable contract. End of input and a
//! closed sink are reported as errors ([`Error::NoMessageAvailable`] and
//! [`Error::NoSpaceOnDevice`]), never as a zero-length transfer.
//!
//! On top of the raw contract sit the buffers:
//!
//! * [`BufferedInput`] pulls from one upstream [`Source`] into growable storage and exposes the
//!   unconsumed bytes as a contiguous window that can be parsed in place.
//! * [`BufferedOutput`] collects produced bytes in growable storage and pushes them into one
//!   downstream [`Sink`] when flushed or when it runs out of room.
//! * [`Buffer`] combines one of each into a duplex buffer.
//!
//! Buffers borrow their collaborators through a [`Link`]. An unbound link dispatches to a
//! zero-sized poisoned sentinel ([`Unreadable`] or [`Unwritable`]) so that an unbound buffer
//! fails fast with [`Error::Uninitialized`] instead of needing a null check.
//!
//! The windowed contract itself is captured by the [`BufferedSource`] and [`BufferedSink`]
//! traits. [`TransformInput`] and [`TransformOutput`] own no storage and forward that contract
//! to a bound buffer, and [`pump()`] runs a [`Filter`] from one window straight into another,
//! pulling input or making output room only when the filter reports [`Progress`] that needs it.
//!
//! Adapters connect the crate to the outside world: [`StdIo`] wraps any `std::io` reader or
//! writer, and [`pipe()`] creates an in-memory pipe.
//!
//! All operations are synchronous and single-threaded. Diagnostics are emitted as `tracing`
//! events; the crate never installs a subscriber.
//!
//! The `test-util` feature enables fake sources and sinks for testing code that produces or
//! consumes byte streams. These are in the `testing` module.
//!
//! # Example
//!
//! ```
//! use bytestream::{BufferedInput, BufferedOutput, Sink, pipe};
//!
//! let (mut reader, mut writer) = pipe();
//!
//! {
//!     let mut output = BufferedOutput::with_capacity(8).unwrap();
//!     output.bind(&mut writer);
//!     output.write_all(b"hello, stream").unwrap();
//!     output.flush().unwrap();
//! }
//!
//! let mut input = BufferedInput::with_capacity(8).unwrap();
//! input.bind(&mut reader);
//!
//! input.provide_data(13).unwrap();
//! assert_eq!(input.data(), b"hello, stream");
//! ```

mod buffered;
mod duplex;
mod error;
mod input;
mod link;
mod output;
mod pipe;
mod sentinel;
mod sink;
mod source;
mod std_io;
mod storage;
mod transform;

pub use buffered::{BufferedSink, BufferedSource};
pub use duplex::Buffer;
pub use error::{Error, Incomplete, Result};
pub use input::BufferedInput;
pub use link::{BufferedSinkLink, BufferedSourceLink, Detached, Link, SinkLink, SourceLink};
pub use output::BufferedOutput;
pub use pipe::{PipeReader, PipeWriter, pipe, pipe_with_chunk_limit};
pub use sentinel::{Unreadable, Unwritable};
pub use sink::Sink;
pub use source::Source;
pub use std_io::{StdIo, stderr, stdin, stdout};
pub use transform::{Filter, Progress, TransformInput, TransformOutput, pump};

#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod testing;

/// Storage size of buffers created without an explicit capacity.
pub const DEFAULT_CAPACITY: usize = 8192;
