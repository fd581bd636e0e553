// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(missing_docs, reason = "test code")]

//! Multi-stage pipelines built from buffers, transforms and filters.

use std::io::{BufRead, Cursor};

use bytestream::{
    Buffer, BufferedInput, BufferedOutput, BufferedSource, Error, Progress, Sink, Source, StdIo, TransformInput, TransformOutput,
    pipe, pump,
};

fn rot13(input: &[u8], output: &mut [u8]) -> Progress {
    let len = input.len().min(output.len());

    for (dest, &byte) in output.iter_mut().zip(&input[..len]) {
        *dest = match byte {
            b'a'..=b'z' => (byte - b'a' + 13) % 26 + b'a',
            b'A'..=b'Z' => (byte - b'A' + 13) % 26 + b'A',
            _ => byte,
        };
    }

    Progress::Advanced {
        consumed: len,
        produced: len,
    }
}

#[test]
fn two_filters_chained_through_a_pipe() {
    let text = b"The Quick Brown Fox Jumps Over The Lazy Dog".repeat(20);
    let mut file = StdIo::new(Cursor::new(text.clone()));
    let (mut reader, mut writer) = pipe();
    let mut result = Vec::new();

    {
        let mut first_in = BufferedInput::with_capacity(7).unwrap();
        first_in.bind(&mut file);
        let mut first_out = BufferedOutput::with_capacity(5).unwrap();
        first_out.bind(&mut writer);

        pump(&mut first_in, &mut first_out, &mut rot13).unwrap();
        first_out.flush().unwrap();
    }

    {
        let mut second_in = BufferedInput::with_capacity(11).unwrap();
        second_in.bind(&mut reader);
        let mut transform = TransformInput::new();
        transform.bind(&mut second_in);

        let mut sink = StdIo::new(&mut result);
        let mut second_out = BufferedOutput::with_capacity(13).unwrap();
        second_out.bind(&mut sink);

        pump(&mut transform, &mut second_out, &mut rot13).unwrap();
        second_out.flush().unwrap();
    }

    assert_eq!(result, text);
}

#[test]
fn transform_output_feeds_buffer_in_place() {
    let (mut reader, mut writer) = pipe();

    {
        let mut buffer = BufferedOutput::with_capacity(4).unwrap();
        buffer.bind(&mut writer);

        let mut transform = TransformOutput::new();
        transform.bind(&mut buffer);

        for word in ["alpha", "beta", "gamma"] {
            transform.write_all(word.as_bytes()).unwrap();
            transform.write_all(b" ").unwrap();
        }

        transform.flush().unwrap();
    }

    let mut received = [0_u8; 17];
    reader.read_exact(&mut received).unwrap();
    assert_eq!(&received, b"alpha beta gamma ");
}

#[test]
fn duplex_echo_server() {
    let mut request = StdIo::new(Cursor::new(b"PING 1\nPING 2\n".to_vec()));
    let (mut reader, mut writer) = pipe();

    {
        let mut connection = Buffer::with_capacity(4, 4).unwrap();
        connection.bind(&mut request, &mut writer);

        loop {
            match connection.input_mut().provide_some_more_data(1) {
                Err(e) if e.is_end_of_input() => break,
                result => {
                    result.unwrap();
                }
            }

            let Some(newline) = connection.data().iter().position(|&byte| byte == b'\n') else {
                continue;
            };

            let mut line = connection.data()[..=newline].to_vec();
            connection.advance_data(newline + 1);

            line[1] = b'O';
            connection.write_all(&line).unwrap();
        }

        Sink::flush(&mut connection).unwrap();
    }

    let mut input = BufferedInput::with_capacity(8).unwrap();
    input.bind(&mut reader);

    let lines: Vec<String> = input.lines().map(Result::unwrap).collect();
    assert_eq!(lines, ["PONG 1", "PONG 2"]);
}

#[test]
fn rebinding_after_failure_resumes_without_loss() {
    let (reader, mut dead) = pipe();
    drop(reader);

    let (mut reader, mut alive) = pipe();

    {
        let mut output = BufferedOutput::with_capacity(8).unwrap();
        output.bind(&mut dead);
        output.write_all(b"payload").unwrap();

        let e = output.flush().unwrap_err();
        assert!(matches!(e, Error::NoSpaceOnDevice));
        assert_eq!(output.pending(), b"payload");

        output.bind(&mut alive);
        output.flush().unwrap();
    }

    let mut received = [0_u8; 7];
    reader.read_exact(&mut received).unwrap();
    assert_eq!(&received, b"payload");
}

#[test]
fn unlinked_pipeline_fails_fast() {
    let mut input = BufferedInput::with_capacity(0).unwrap();
    let mut output = BufferedOutput::with_capacity(0).unwrap();

    let e = pump(&mut input, &mut output, &mut rot13).unwrap_err();

    assert!(matches!(e, Error::Uninitialized));
    assert_eq!(input.capacity(), 0);
}
