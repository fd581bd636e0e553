// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

use crate::{Incomplete, Result};

/// Allows for reading of bytes.
///
/// Implementations provide [`read_bytes()`][Self::read_bytes], a single transfer attempt. The
/// provided methods build the caller-facing contract on top of it:
///
/// * [`read_some()`][Self::read_some] retries until at least one byte was transferred.
/// * [`read_exact()`][Self::read_exact] loops until the destination is completely filled.
///
/// # End of stream
///
/// A source that is permanently exhausted signals [`Error::NoMessageAvailable`][1] instead of
/// returning zero bytes. A transfer attempt that returns `Ok(0)` means only that no progress was
/// made this time (e.g. an interrupted system call) and the attempt should be repeated.
///
/// # Ownership
///
/// The methods on this trait accept `&mut self` and take an exclusive reference to the source
/// for the duration of the operation.
///
/// [1]: crate::Error::NoMessageAvailable
pub trait Source: Debug {
    /// Performs one transfer attempt into `dest`.
    ///
    /// Returns the number of bytes placed at the start of `dest`. `Ok(0)` means that no progress
    /// was made but the source remains usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoMessageAvailable`][1] if the source is exhausted and any other
    /// variant if the transfer failed.
    ///
    /// [1]: crate::Error::NoMessageAvailable
    fn read_bytes(&mut self, dest: &mut [u8]) -> Result<usize>;

    /// Reads at least one and at most `dest.len()` bytes.
    ///
    /// Zero-progress attempts are retried transparently. An empty `dest` returns `Ok(0)`
    /// without touching the source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoMessageAvailable`][1] if the source is exhausted and any other
    /// variant if the transfer failed.
    ///
    /// [1]: crate::Error::NoMessageAvailable
    fn read_some(&mut self, dest: &mut [u8]) -> Result<usize> {
        if dest.is_empty() {
            return Ok(0);
        }

        loop {
            let bytes_read = self.read_bytes(dest)?;

            if bytes_read != 0 {
                return Ok(bytes_read);
            }
        }
    }

    /// Fills `dest` completely.
    ///
    /// # Errors
    ///
    /// If the source fails before `dest` is full, the returned [`Incomplete`] carries the
    /// number of bytes that were read (which is also the offset of the unfilled region of
    /// `dest`) and the number of bytes still missing.
    fn read_exact(&mut self, dest: &mut [u8]) -> std::result::Result<(), Incomplete> {
        let mut transferred = 0;

        while transferred < dest.len() {
            match self.read_some(&mut dest[transferred..]) {
                Ok(bytes_read) => transferred += bytes_read,
                Err(error) => {
                    return Err(Incomplete {
                        error,
                        transferred,
                        remaining: dest.len() - transferred,
                    });
                }
            }
        }

        Ok(())
    }
}

impl<S: Source + ?Sized> Source for &mut S {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn read_bytes(&mut self, dest: &mut [u8]) -> Result<usize> {
        (**self).read_bytes(dest)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn read_some(&mut self, dest: &mut [u8]) -> Result<usize> {
        (**self).read_some(dest)
    }
}
