// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Borrow;
use std::hash::{Hash, Hasher};

/// Compares two strings, ignoring the case of ASCII letters.
#[must_use]
pub fn eq_ignore_ascii_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// A string key that hashes and compares without regard to the case of ASCII letters.
///
/// Useful for lookups of protocol keywords and header names parsed from text.
///
/// ```
/// use std::collections::HashMap;
///
/// use bytestream_text::CaseInsensitive;
///
/// let mut headers = HashMap::new();
/// headers.insert(CaseInsensitive("Content-Length"), 42);
///
/// assert_eq!(headers.get(&CaseInsensitive("content-length")), Some(&42));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct CaseInsensitive<S>(pub S);

impl<S: Borrow<str>> PartialEq for CaseInsensitive<S> {
    fn eq(&self, other: &Self) -> bool {
        eq_ignore_ascii_case(self.0.borrow(), other.0.borrow())
    }
}

impl<S: Borrow<str>> Eq for CaseInsensitive<S> {}

impl<S: Borrow<str>> Hash for CaseInsensitive<S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let text: &str = self.0.borrow();

        for byte in text.bytes() {
            state.write_u8(byte.to_ascii_uppercase());
        }

        // Length terminator, as `str` hashing does.
        state.write_u8(0xff);
    }
}
