// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Utilities for testing code that uses `bytestream` abstractions.

mod fake_sink;
mod fake_source;

pub use fake_sink::*;
pub use fake_source::*;
