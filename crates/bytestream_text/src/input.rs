// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::ffi::CString;
use std::str::{self, FromStr};

use bytestream::{BufferedSource, BufferedSourceLink, Error};
use num_traits::{Float, PrimInt};
use tracing::{Level, event};

use crate::{DEFAULT_TOKEN_LIMIT, FloatFormat, Result, TextError};

/// Parses text straight out of the window of a bound [`BufferedSource`].
///
/// Every parse method first makes sure the whole token is in the window, pulling more data
/// from upstream as needed, and consumes the token only if it parsed successfully. A failed
/// parse leaves the window untouched so the caller can inspect it or skip it.
///
/// A token is never allowed to grow beyond the length limit given at construction. This keeps
/// a stream of digits or a line without terminator from growing the upstream buffer without
/// bound; such input fails with [`TextError::OutOfRange`].
///
/// Running out of input before a token starts fails with
/// [`Error::NoMessageAvailable`][bytestream::Error::NoMessageAvailable]. Running out of input
/// in the middle of a token ends the token there.
#[derive(Debug)]
pub struct TextInput<'a> {
    upstream: BufferedSourceLink<'a>,
    limit: usize,
}

impl<'a> TextInput<'a> {
    /// Creates an unbound parser with a token limit of [`DEFAULT_TOKEN_LIMIT`] bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_TOKEN_LIMIT)
    }

    /// Creates an unbound parser that rejects tokens longer than `limit` bytes.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            upstream: BufferedSourceLink::new(),
            limit,
        }
    }

    /// Binds the parser to `source`, replacing any previous upstream.
    pub fn bind(&mut self, source: &'a mut (dyn BufferedSource + 'a)) {
        self.upstream.bind(source);
    }

    /// Returns the parser to the unbound state, handing back the previous upstream.
    pub fn unbind(&mut self) -> Option<&'a mut (dyn BufferedSource + 'a)> {
        self.upstream.unbind()
    }

    /// Whether the parser is bound to an upstream buffer.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn is_bound(&self) -> bool {
        self.upstream.is_bound()
    }

    /// The token length limit in bytes.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Parses an integer written in `radix`, with a leading `-` if `T` is signed.
    ///
    /// Digits above 9 are accepted in either case.
    ///
    /// # Errors
    ///
    /// Fails with [`TextError::InvalidArgument`] if the input does not start with a digit and
    /// with [`TextError::OutOfRange`] if the value does not fit in `T` or the token is too long.
    ///
    /// # Panics
    ///
    /// Panics if `radix` is not in the range `2..=36`.
    pub fn read_integer<T: PrimInt>(&mut self, radix: u32) -> Result<T> {
        assert!((2..=36).contains(&radix), "radix must be in 2..=36, got {radix}");

        let signed = T::min_value() < T::zero();
        let sign = usize::from(signed && self.peek(0)? == Some(b'-'));

        let digits = self.scan(sign, |byte| char::from(byte).to_digit(radix).is_some())?;

        if digits == 0 {
            return Err(self.missing("digits")?);
        }

        let len = sign + digits;
        let value = T::from_str_radix(self.token(len)?, radix).map_err(|_overflow| self.out_of_range())?;

        self.consume(len);
        Ok(value)
    }

    /// Parses a decimal floating-point number.
    ///
    /// Accepts an optional leading `-`, at least one integer digit, an optional fraction
    /// introduced by `.` and an optional exponent introduced by `e` or `E` with an optional
    /// sign. This covers everything Rust's `Display` and `LowerExp` produce for finite values.
    /// A `.` or exponent marker that is not followed by digits is not part of the number.
    ///
    /// # Errors
    ///
    /// Fails with [`TextError::InvalidArgument`] if the input does not start with a number and
    /// with [`TextError::OutOfRange`] if the value overflows `F` or the token is too long.
    pub fn read_float<F: Float + FromStr>(&mut self) -> Result<F> {
        self.read_decimal_float(true)
    }

    /// Parses a floating-point number written in the syntax of `format`.
    ///
    /// [`FloatFormat::Shortest`] and [`FloatFormat::Scientific`] accept what
    /// [`read_float()`][Self::read_float] accepts. [`FloatFormat::Fixed`] accepts no exponent, so
    /// an `e` after the digits is left in the window; the precision is not enforced.
    /// [`FloatFormat::Hex`] accepts an optional `-`, a `0x` or `0X` prefix, hexadecimal digits
    /// with an optional fraction and an optional binary exponent introduced by `p` or `P`.
    ///
    /// # Errors
    ///
    /// Fails with [`TextError::InvalidArgument`] if the input does not start with a number in
    /// that syntax and with [`TextError::OutOfRange`] if the value overflows `F` or the token
    /// is too long.
    pub fn read_float_with<F: Float + FromStr>(&mut self, format: FloatFormat) -> Result<F> {
        match format {
            FloatFormat::Shortest | FloatFormat::Scientific => self.read_decimal_float(true),
            FloatFormat::Fixed { .. } => self.read_decimal_float(false),
            FloatFormat::Hex => self.read_hex_float(),
        }
    }

    fn read_decimal_float<F: Float + FromStr>(&mut self, with_exponent: bool) -> Result<F> {
        let mut len = usize::from(self.peek(0)? == Some(b'-'));

        let integer_digits = self.scan(len, |byte| byte.is_ascii_digit())?;

        if integer_digits == 0 {
            return Err(self.missing("decimal digits")?);
        }

        len += integer_digits;

        if self.peek(len)? == Some(b'.') {
            let fraction_digits = self.scan(len + 1, |byte| byte.is_ascii_digit())?;

            if fraction_digits != 0 {
                len += 1 + fraction_digits;
            }
        }

        if with_exponent && matches!(self.peek(len)?, Some(b'e' | b'E')) {
            let mut exponent = len + 1;

            if matches!(self.peek(exponent)?, Some(b'-' | b'+')) {
                exponent += 1;
            }

            let exponent_digits = self.scan(exponent, |byte| byte.is_ascii_digit())?;

            if exponent_digits != 0 {
                len = exponent + exponent_digits;
            }
        }

        let value: F = self
            .token(len)?
            .parse()
            .map_err(|_malformed| TextError::InvalidArgument {
                expected: "floating-point number",
            })?;

        if value.is_infinite() {
            return Err(self.out_of_range());
        }

        self.consume(len);
        Ok(value)
    }

    fn read_hex_float<F: Float>(&mut self) -> Result<F> {
        let negative = self.peek(0)? == Some(b'-');
        let start = usize::from(negative) + 2;

        if self.peek(start - 2)? != Some(b'0') || !matches!(self.peek(start - 1)?, Some(b'x' | b'X')) {
            return Err(self.missing("hexadecimal floating-point number")?);
        }

        let integer_digits = self.scan(start, |byte| byte.is_ascii_hexdigit())?;
        let mut len = start + integer_digits;

        if self.peek(len)? == Some(b'.') {
            let fraction_digits = self.scan(len + 1, |byte| byte.is_ascii_hexdigit())?;

            if fraction_digits != 0 {
                len += 1 + fraction_digits;
            }
        }

        if len == start {
            return Err(TextError::InvalidArgument {
                expected: "hexadecimal digits",
            });
        }

        let digits_end = len;
        let mut binary_exponent = 0;

        if matches!(self.peek(len)?, Some(b'p' | b'P')) {
            let mut exponent = len + 1;

            if matches!(self.peek(exponent)?, Some(b'-' | b'+')) {
                exponent += 1;
            }

            let exponent_digits = self.scan(exponent, |byte| byte.is_ascii_digit())?;

            if exponent_digits != 0 {
                len = exponent + exponent_digits;
                binary_exponent = self.token(len)?[digits_end + 1..]
                    .parse::<i64>()
                    .map_err(|_overflow| self.out_of_range())?;
            }
        }

        let (mantissa, digit_exponent) = hex_mantissa(&self.data()[start..digits_end]);
        let magnitude = F::from(mantissa).ok_or_else(|| self.out_of_range())?;
        let value = scale_by_power_of_two(magnitude, binary_exponent.saturating_add(digit_exponent));

        if value.is_infinite() {
            return Err(self.out_of_range());
        }

        self.consume(len);
        Ok(if negative { -value } else { value })
    }

    /// Reads a NUL-terminated string and consumes the terminator.
    ///
    /// At the end of the input the remaining bytes are returned even without a terminator.
    ///
    /// # Errors
    ///
    /// Fails at end of input or if the string is longer than the token limit.
    pub fn read_c_string(&mut self) -> Result<CString> {
        let (len, consumed) = self.find(0)?;

        let text = CString::new(&self.data()[..len]).map_err(|_interior_nul| TextError::InvalidArgument {
            expected: "string without interior NUL",
        })?;

        self.consume(consumed);
        Ok(text)
    }

    /// Reads one line, without its `\n` terminator and a `\r` right before it.
    ///
    /// The last line of the input does not need a terminator. A lone `\r` at the very end of
    /// the input is kept.
    ///
    /// # Errors
    ///
    /// Fails at end of input, if the line is longer than the token limit or if it is not valid
    /// UTF-8.
    pub fn read_line(&mut self) -> Result<String> {
        let (mut len, consumed) = self.find(b'\n')?;

        if consumed > len && len > 0 && self.data()[len - 1] == b'\r' {
            len -= 1;
        }

        let line = str::from_utf8(&self.data()[..len])?.to_owned();

        self.consume(consumed);
        Ok(line)
    }

    /// Reads everything up to the next `delimiter` and consumes the delimiter too.
    ///
    /// At the end of the input the remaining bytes are returned even without a delimiter.
    ///
    /// # Errors
    ///
    /// Fails at end of input or if the token is longer than the token limit.
    pub fn read_until(&mut self, delimiter: u8) -> Result<Vec<u8>> {
        let (len, consumed) = self.find(delimiter)?;

        let token = self.data()[..len].to_vec();

        self.consume(consumed);
        Ok(token)
    }

    /// Reads one UTF-8 encoded character.
    ///
    /// # Errors
    ///
    /// Fails at end of input or if the input is not valid UTF-8.
    pub fn read_char(&mut self) -> Result<char> {
        let Some(first) = self.peek(0)? else {
            return Err(end_of_input());
        };

        let mut width = utf8_width(first);

        if self.peek(width - 1)?.is_none() {
            // Truncated; decoding what is there reports the error.
            width = self.data().len();
        }

        let character = str::from_utf8(&self.data()[..width])?
            .chars()
            .next()
            .ok_or(TextError::InvalidArgument { expected: "character" })?;

        self.consume(width);
        Ok(character)
    }

    /// Consumes ASCII whitespace and returns how many bytes were skipped.
    ///
    /// Reaching the end of the input is not an error here.
    ///
    /// # Errors
    ///
    /// Fails if the upstream fails.
    pub fn skip_whitespace(&mut self) -> Result<usize> {
        let mut skipped = 0;

        loop {
            let len = self.scan_unlimited(|byte| byte.is_ascii_whitespace())?;
            self.consume(len);
            skipped += len;

            if self.peek(0)?.is_none_or(|byte| !byte.is_ascii_whitespace()) {
                return Ok(skipped);
            }
        }
    }

    /// Returns the length of the token up to `delimiter` and how much to consume with it.
    fn find(&mut self, delimiter: u8) -> Result<(usize, usize)> {
        let len = self.scan(0, |byte| byte != delimiter)?;

        match self.peek(len)? {
            Some(_) => Ok((len, len + 1)),
            None if len == 0 => Err(end_of_input()),
            None => Ok((len, len)),
        }
    }

    /// The byte at `index` in the window, pulling from upstream until it is there.
    ///
    /// Returns `None` at end of input.
    fn peek(&mut self, index: usize) -> Result<Option<u8>> {
        let source = self.upstream.target();

        while source.data_size() <= index {
            let before = source.data_size();

            match source.provide_some_more_data(index + 1 - before) {
                Ok(available) if available > before => {}
                Ok(_) => return Ok(None),
                Err(e) if e.is_end_of_input() => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Some(source.data()[index]))
    }

    /// Counts the bytes from `start` on that satisfy `accept`, within the token limit.
    fn scan(&mut self, start: usize, mut accept: impl FnMut(u8) -> bool) -> Result<usize> {
        let mut index = start;

        while let Some(byte) = self.peek(index)? {
            if !accept(byte) {
                break;
            }

            index += 1;

            if index > self.limit {
                return Err(self.out_of_range());
            }
        }

        Ok(index - start)
    }

    /// Counts the accepted bytes at the start of the window, stopping at the token limit.
    fn scan_unlimited(&mut self, mut accept: impl FnMut(u8) -> bool) -> Result<usize> {
        let mut index = 0;

        while index < self.limit.max(1)
            && let Some(byte) = self.peek(index)?
        {
            if !accept(byte) {
                break;
            }

            index += 1;
        }

        Ok(index)
    }

    /// Explains why no token was found at the start of the window.
    fn missing(&mut self, expected: &'static str) -> Result<TextError> {
        Ok(match self.peek(0)? {
            None => end_of_input(),
            Some(_) => TextError::InvalidArgument { expected },
        })
    }

    fn token(&self, len: usize) -> Result<&str> {
        Ok(str::from_utf8(&self.data()[..len])?)
    }

    fn data(&self) -> &[u8] {
        self.upstream.target_ref().data()
    }

    fn consume(&mut self, len: usize) {
        self.upstream.target().advance_data(len);
    }

    fn out_of_range(&self) -> TextError {
        event!(Level::DEBUG, message = "token out of range", limit = self.limit);

        TextError::OutOfRange { limit: self.limit }
    }
}

impl Default for TextInput<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn end_of_input() -> TextError {
    TextError::Stream(Error::NoMessageAvailable)
}

/// Folds hexadecimal digits with an optional `.` into a mantissa and the power of two it is
/// scaled by. Digits beyond 60 bits of mantissa are truncated.
fn hex_mantissa(digits: &[u8]) -> (u64, i64) {
    let mut mantissa = 0_u64;
    let mut exponent = 0_i64;
    let mut in_fraction = false;

    for &byte in digits {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            _ => {
                in_fraction = true;
                continue;
            }
        };

        if mantissa >> 60 == 0 {
            mantissa = (mantissa << 4) | u64::from(digit);

            if in_fraction {
                exponent -= 4;
            }
        } else if !in_fraction {
            exponent += 4;
        }
    }

    (mantissa, exponent)
}

/// Computes `value * 2^exponent` in steps that keep every intermediate result in range.
fn scale_by_power_of_two<F: Float>(mut value: F, exponent: i64) -> F {
    const STEP: i32 = 32;

    // Beyond this no 64-bit mantissa stays finite and nonzero in any supported float type.
    let mut exponent = i32::try_from(exponent.clamp(-20_000, 20_000)).unwrap_or_default();
    let two = F::one() + F::one();

    while exponent >= STEP {
        value = value * two.powi(STEP);
        exponent -= STEP;
    }

    while exponent <= -STEP {
        value = value * two.powi(-STEP);
        exponent += STEP;
    }

    value * two.powi(exponent)
}

/// Length of the UTF-8 sequence introduced by `first`. Invalid lead bytes count as one byte.
fn utf8_width(first: u8) -> usize {
    match first {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}
