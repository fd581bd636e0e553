// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::link::Detached;
use crate::{BufferedSink, BufferedSource, Error, Result, Sink, Source};

/// The poisoned source every unbound link dispatches to.
///
/// Every transfer fails with [`Error::Uninitialized`] and the data window is always empty.
/// The type is zero-sized and stateless, so every instance is the same immutable value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Unreadable;

/// The poisoned sink every unbound link dispatches to.
///
/// Every transfer and flush fails with [`Error::Uninitialized`] and the free space window is
/// always empty. The type is zero-sized and stateless, so every instance is the same
/// immutable value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Unwritable;

impl Source for Unreadable {
    fn read_bytes(&mut self, _dest: &mut [u8]) -> Result<usize> {
        Err(Error::Uninitialized)
    }
}

impl BufferedSource for Unreadable {
    fn data_size(&self) -> usize {
        0
    }

    fn data(&self) -> &[u8] {
        &[]
    }

    fn advance_data(&mut self, len: usize) {
        assert!(len == 0, "attempted to consume {len} bytes from an unlinked stream");
    }

    fn provide_some_more_data(&mut self, _try_min: usize) -> Result<usize> {
        Err(Error::Uninitialized)
    }

    fn provide_some_data(&mut self, _max: usize) -> Result<usize> {
        Err(Error::Uninitialized)
    }

    fn provide_data(&mut self, _min: usize) -> Result<usize> {
        Err(Error::Uninitialized)
    }
}

impl Sink for Unwritable {
    fn write_bytes(&mut self, _src: &[u8]) -> Result<usize> {
        Err(Error::Uninitialized)
    }

    fn flush(&mut self) -> Result<()> {
        Err(Error::Uninitialized)
    }
}

impl BufferedSink for Unwritable {
    fn space_size(&self) -> usize {
        0
    }

    fn space(&mut self) -> &mut [u8] {
        &mut []
    }

    fn advance_space(&mut self, len: usize) {
        assert!(len == 0, "attempted to produce {len} bytes into an unlinked stream");
    }

    fn provide_space(&mut self, _min: usize) -> Result<usize> {
        Err(Error::Uninitialized)
    }

    fn provide_some_space(&mut self, _max: usize) -> Result<usize> {
        Err(Error::Uninitialized)
    }
}

impl<'a> Detached<dyn Source + 'a> for Unreadable {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn as_target(&mut self) -> &mut (dyn Source + 'a) {
        self
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn as_target_ref(&self) -> &(dyn Source + 'a) {
        self
    }
}

impl<'a> Detached<dyn BufferedSource + 'a> for Unreadable {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn as_target(&mut self) -> &mut (dyn BufferedSource + 'a) {
        self
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn as_target_ref(&self) -> &(dyn BufferedSource + 'a) {
        self
    }
}

impl<'a> Detached<dyn Sink + 'a> for Unwritable {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn as_target(&mut self) -> &mut (dyn Sink + 'a) {
        self
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn as_target_ref(&self) -> &(dyn Sink + 'a) {
        self
    }
}

impl<'a> Detached<dyn BufferedSink + 'a> for Unwritable {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn as_target(&mut self) -> &mut (dyn BufferedSink + 'a) {
        self
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn as_target_ref(&self) -> &(dyn BufferedSink + 'a) {
        self
    }
}
