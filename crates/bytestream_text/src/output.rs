// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::ffi::CStr;
use std::fmt::{self, Display, LowerExp};

use bytestream::{BufferedSink, BufferedSinkLink, Error};
use num_traits::{Float, PrimInt};

use crate::{Result, TextError};

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// How [`TextOutput::write_float_with()`] renders a floating-point value and which syntax
/// [`TextInput::read_float_with()`][crate::TextInput::read_float_with] accepts.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum FloatFormat {
    /// The shortest decimal form that reads back to the same value, without exponent.
    #[default]
    Shortest,

    /// A decimal form with exactly `precision` fractional digits.
    Fixed {
        /// Number of digits after the decimal point.
        precision: usize,
    },

    /// The shortest mantissa that reads back to the same value, followed by an exponent,
    /// e.g. `1.5e-7`.
    Scientific,

    /// The exact binary value as a hexadecimal mantissa and a power of two, e.g. `0x3p-1`.
    Hex,
}

/// Formats text into the free space window of a bound [`BufferedSink`].
///
/// Numbers are produced as a single contiguous token in the window; strings and formatted
/// values go through [`Sink::write_all()`][bytestream::Sink::write_all] and may be split
/// across flushes of the downstream buffer. Nothing reaches the final destination until the
/// downstream buffer is flushed, see [`flush()`][Self::flush].
///
/// Everything written here reads back with [`TextInput`][crate::TextInput].
#[derive(Debug, Default)]
pub struct TextOutput<'a> {
    downstream: BufferedSinkLink<'a>,
}

impl<'a> TextOutput<'a> {
    /// Creates an unbound formatter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the formatter to `sink`, replacing any previous downstream.
    pub fn bind(&mut self, sink: &'a mut (dyn BufferedSink + 'a)) {
        self.downstream.bind(sink);
    }

    /// Returns the formatter to the unbound state, handing back the previous downstream.
    pub fn unbind(&mut self) -> Option<&'a mut (dyn BufferedSink + 'a)> {
        self.downstream.unbind()
    }

    /// Whether the formatter is bound to a downstream buffer.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn is_bound(&self) -> bool {
        self.downstream.is_bound()
    }

    /// Writes raw bytes.
    ///
    /// # Errors
    ///
    /// Fails if the downstream buffer cannot take all of `bytes`.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.downstream.target().write_all(bytes)?;
        Ok(())
    }

    /// Writes a string as UTF-8.
    ///
    /// # Errors
    ///
    /// Fails if the downstream buffer cannot take the whole string.
    pub fn write_str(&mut self, text: &str) -> Result<()> {
        self.write_bytes(text.as_bytes())
    }

    /// Writes one character as UTF-8.
    ///
    /// # Errors
    ///
    /// Fails if the downstream buffer has no room for the character.
    pub fn write_char(&mut self, character: char) -> Result<()> {
        self.produce(character.encode_utf8(&mut [0_u8; 4]).as_bytes())
    }

    /// Writes `true` or `false`.
    ///
    /// # Errors
    ///
    /// Fails if the downstream buffer has no room for the word.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.produce(if value { "true" } else { "false" }.as_bytes())
    }

    /// Writes an integer in `radix`, with a leading `-` if negative.
    ///
    /// Digits above 9 are written in lowercase.
    ///
    /// # Errors
    ///
    /// Fails if the downstream buffer has no room for the number.
    ///
    /// # Panics
    ///
    /// Panics if `radix` is not in the range `2..=36`.
    pub fn write_integer<T: PrimInt>(&mut self, value: T, radix: u32) -> Result<()> {
        assert!((2..=36).contains(&radix), "radix must be in 2..=36, got {radix}");

        let negative = value < T::zero();
        let magnitude = if negative {
            value.to_i128().map(i128::unsigned_abs)
        } else {
            value.to_u128()
        }
        .ok_or(TextError::InvalidArgument { expected: "128-bit integer" })?;

        // Room for 128 binary digits and a sign.
        let mut token = [0_u8; 129];
        let mut start = token.len();
        let mut rest = magnitude;
        let radix = u128::from(radix);

        loop {
            start -= 1;
            token[start] = digit(rest % radix);
            rest /= radix;

            if rest == 0 {
                break;
            }
        }

        if negative {
            start -= 1;
            token[start] = b'-';
        }

        self.produce(&token[start..])
    }

    /// Writes a floating-point value in [`FloatFormat::Shortest`] form.
    ///
    /// # Errors
    ///
    /// Fails if the downstream buffer cannot take the whole number.
    pub fn write_float<F: Float + Display + LowerExp>(&mut self, value: F) -> Result<()> {
        self.write_float_with(value, FloatFormat::Shortest)
    }

    /// Writes a floating-point value in the given form.
    ///
    /// Infinities and NaN are written the way `Display` writes them (`inf`, `NaN`) in every
    /// format, which [`TextInput::read_float()`][crate::TextInput::read_float] does not accept
    /// back.
    ///
    /// # Errors
    ///
    /// Fails if the downstream buffer cannot take the whole number.
    pub fn write_float_with<F: Float + Display + LowerExp>(&mut self, value: F, format: FloatFormat) -> Result<()> {
        match format {
            FloatFormat::Hex if value.is_finite() => self.write_hex_float(value),
            FloatFormat::Shortest | FloatFormat::Hex => self.write_fmt(format_args!("{value}")),
            FloatFormat::Fixed { precision } => self.write_fmt(format_args!("{value:.precision$}")),
            FloatFormat::Scientific => self.write_fmt(format_args!("{value:e}")),
        }
    }

    /// Writes the address of `pointer` in the `{:p}` form, e.g. `0x7ffd5e8c`.
    ///
    /// # Errors
    ///
    /// Fails if the downstream buffer cannot take the whole address.
    pub fn write_pointer<T: ?Sized>(&mut self, pointer: *const T) -> Result<()> {
        self.write_fmt(format_args!("{pointer:p}"))
    }

    /// Writes the bytes of `text` followed by its NUL terminator.
    ///
    /// # Errors
    ///
    /// Fails if the downstream buffer cannot take the whole string.
    pub fn write_c_str(&mut self, text: &CStr) -> Result<()> {
        self.write_bytes(text.to_bytes_with_nul())
    }

    /// Writes anything that implements [`Display`].
    ///
    /// # Errors
    ///
    /// Fails if the downstream buffer cannot take the whole text or if `value` fails to format.
    pub fn write_display(&mut self, value: &impl Display) -> Result<()> {
        self.write_fmt(format_args!("{value}"))
    }

    /// Writes pre-formatted arguments. This makes the formatter a target for [`write!`].
    ///
    /// # Errors
    ///
    /// Fails if the downstream buffer cannot take the whole text or if an argument fails to
    /// format.
    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<()> {
        let mut adapter = FmtAdapter {
            sink: self.downstream.target(),
            error: None,
        };

        match fmt::write(&mut adapter, args) {
            Ok(()) => Ok(()),
            Err(fmt::Error) => Err(adapter.error.map_or(
                TextError::InvalidArgument {
                    expected: "value that formats without error",
                },
                TextError::Stream,
            )),
        }
    }

    /// Flushes the downstream buffer and everything it is linked to.
    ///
    /// # Errors
    ///
    /// Fails if the downstream buffer cannot deliver its pending bytes.
    pub fn flush(&mut self) -> Result<()> {
        self.downstream.target().flush()?;
        Ok(())
    }

    /// Writes a finite `value` as `[-]0x<mantissa>p<exponent>` with the mantissa shifted odd.
    fn write_hex_float<F: Float>(&mut self, value: F) -> Result<()> {
        let (mut mantissa, exponent, sign) = value.integer_decode();
        let mut exponent = i32::from(exponent);

        if mantissa == 0 {
            exponent = 0;
        } else {
            let shift = mantissa.trailing_zeros();
            mantissa >>= shift;
            exponent += i32::try_from(shift).unwrap_or_default();
        }

        let sign = if sign < 0 { "-" } else { "" };
        self.write_fmt(format_args!("{sign}0x{mantissa:x}p{exponent}"))
    }

    /// Writes `token` contiguously into the free space window.
    fn produce(&mut self, token: &[u8]) -> Result<()> {
        let sink = self.downstream.target();

        sink.provide_space(token.len())?;
        sink.space()[..token.len()].copy_from_slice(token);
        sink.advance_space(token.len());

        Ok(())
    }
}

#[expect(clippy::cast_possible_truncation, reason = "callers pass a remainder below the radix")]
fn digit(value: u128) -> u8 {
    DIGITS[value as usize]
}

/// Bridges `core::fmt` into a sink, keeping the stream error `fmt::Error` cannot carry.
struct FmtAdapter<'s, 'a> {
    sink: &'s mut (dyn BufferedSink + 'a),
    error: Option<Error>,
}

impl fmt::Write for FmtAdapter<'_, '_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.sink.write_all(s.as_bytes()).map_err(|e| {
            self.error = Some(e.into_error());
            fmt::Error
        })
    }
}
