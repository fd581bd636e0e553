// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Text parsing and formatting on top of `bytestream` buffers.
//!
//! [`TextInput`] parses values straight out of the window of a bound
//! [`BufferedSource`][bytestream::BufferedSource] and [`TextOutput`] formats values straight into
//! the free space of a bound [`BufferedSink`][bytestream::BufferedSink]. Neither owns storage;
//! they are transforms over whatever buffer they are bound to, so the usual buffer sizing and
//! flushing rules apply.
//!
//! Numbers use the plain ASCII forms that Rust's own formatting produces: an optional `-`, digits
//! in the requested radix, and for floating-point numbers an optional fraction and exponent.
//! [`FloatFormat::Hex`] selects the exact `0x1.8p3` notation instead.
//!
//! # Example
//!
//! ```
//! use bytestream::{BufferedInput, BufferedOutput, pipe};
//! use bytestream_text::{TextInput, TextOutput};
//!
//! let (mut reader, mut writer) = pipe();
//!
//! {
//!     let mut buffer = BufferedOutput::with_capacity(64).unwrap();
//!     buffer.bind(&mut writer);
//!
//!     let mut text = TextOutput::new();
//!     text.bind(&mut buffer);
//!     text.write_integer(255_u8, 16).unwrap();
//!     text.write_char(' ').unwrap();
//!     text.write_float(2.5_f64).unwrap();
//!     text.write_str("\r\nend\n").unwrap();
//!     text.flush().unwrap();
//! }
//!
//! let mut buffer = BufferedInput::with_capacity(64).unwrap();
//! buffer.bind(&mut reader);
//!
//! let mut text = TextInput::new();
//! text.bind(&mut buffer);
//!
//! assert_eq!(text.read_integer::<u8>(16).unwrap(), 255);
//! assert_eq!(text.read_char().unwrap(), ' ');
//! assert_eq!(text.read_float::<f64>().unwrap(), 2.5);
//! assert_eq!(text.read_line().unwrap(), "");
//! assert_eq!(text.read_line().unwrap(), "end");
//! ```

mod case;
mod error;
mod input;
mod output;

pub use case::{CaseInsensitive, eq_ignore_ascii_case};
pub use error::{Result, TextError};
pub use input::TextInput;
pub use output::{FloatFormat, TextOutput};

/// Token length limit of a [`TextInput`] created without an explicit limit.
pub const DEFAULT_TOKEN_LIMIT: usize = 64 * 1024;
