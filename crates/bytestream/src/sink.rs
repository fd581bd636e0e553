// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

use crate::{Incomplete, Result};

/// Allows for writing of bytes.
///
/// The mirror image of [`Source`][crate::Source]: implementations provide
/// [`write_bytes()`][Self::write_bytes], a single transfer attempt, and the provided methods
/// retry until progress ([`write_some()`][Self::write_some]) or until everything was accepted
/// ([`write_all()`][Self::write_all]).
///
/// A sink that is closed or full signals [`Error::NoSpaceOnDevice`][1].
///
/// [1]: crate::Error::NoSpaceOnDevice
pub trait Sink: Debug {
    /// Performs one transfer attempt from `src`.
    ///
    /// Returns the number of bytes taken from the start of `src`. `Ok(0)` means that no
    /// progress was made but the sink remains usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSpaceOnDevice`][1] if the sink accepts no more data and any other
    /// variant if the transfer failed.
    ///
    /// [1]: crate::Error::NoSpaceOnDevice
    fn write_bytes(&mut self, src: &[u8]) -> Result<usize>;

    /// Writes at least one and at most `src.len()` bytes.
    ///
    /// Zero-progress attempts are retried transparently. An empty `src` returns `Ok(0)`
    /// without touching the sink.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSpaceOnDevice`][1] if the sink accepts no more data and any other
    /// variant if the transfer failed.
    ///
    /// [1]: crate::Error::NoSpaceOnDevice
    fn write_some(&mut self, src: &[u8]) -> Result<usize> {
        if src.is_empty() {
            return Ok(0);
        }

        loop {
            let bytes_written = self.write_bytes(src)?;

            if bytes_written != 0 {
                return Ok(bytes_written);
            }
        }
    }

    /// Writes all of `src`.
    ///
    /// # Errors
    ///
    /// If the sink fails before all of `src` was accepted, the returned [`Incomplete`] carries
    /// the number of bytes that were written (which is also the offset of the unwritten region
    /// of `src`) and the number of bytes still pending.
    fn write_all(&mut self, src: &[u8]) -> std::result::Result<(), Incomplete> {
        let mut transferred = 0;

        while transferred < src.len() {
            match self.write_some(&src[transferred..]) {
                Ok(bytes_written) => transferred += bytes_written,
                Err(error) => {
                    return Err(Incomplete {
                        error,
                        transferred,
                        remaining: src.len() - transferred,
                    });
                }
            }
        }

        Ok(())
    }

    /// Pushes any internally buffered data to the next layer.
    ///
    /// Sinks that do not buffer have nothing to do here.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffered data could not be delivered.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn write_bytes(&mut self, src: &[u8]) -> Result<usize> {
        (**self).write_bytes(src)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn write_some(&mut self, src: &[u8]) -> Result<usize> {
        (**self).write_some(src)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
