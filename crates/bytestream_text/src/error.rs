// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::str::Utf8Error;

use bytestream::Incomplete;

/// Any error that may arise when parsing or formatting text.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TextError {
    /// The underlying stream failed, ran out of input or was not linked.
    #[error(transparent)]
    Stream(#[from] bytestream::Error),

    /// The input does not start with the expected kind of token.
    #[error("expected {expected}")]
    InvalidArgument {
        /// What the parser was looking for.
        expected: &'static str,
    },

    /// A token exceeds the length limit, or a number does not fit in the requested type.
    #[error("value out of range (token limit {limit} bytes)")]
    OutOfRange {
        /// The token length limit in effect.
        limit: usize,
    },

    /// The input is not valid UTF-8.
    #[error(transparent)]
    InvalidUtf8(#[from] Utf8Error),
}

impl TextError {
    /// Whether this error signals the clean end of the input stream.
    #[must_use]
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, Self::Stream(e) if e.is_end_of_input())
    }
}

impl From<Incomplete> for TextError {
    fn from(value: Incomplete) -> Self {
        Self::Stream(value.into_error())
    }
}

/// A specialized `Result` for text operations.
pub type Result<T> = std::result::Result<T, TextError>;
