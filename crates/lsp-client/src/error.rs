//
// error.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// A message could not be serialized before being written to the wire.
    CannotSerialize(serde_json::Error),
    /// The payload of a framed message was not valid JSON-RPC.
    InvalidMessage(String, serde_json::Error),
    /// A response carried a result that does not match the request's schema.
    InvalidResponse(String, serde_json::Error),
    /// The header section of a frame was malformed.
    InvalidHeader(String),
    /// The header section did not include a `Content-Length` field.
    MissingContentLength,
    /// A frame advertised a payload larger than the transport allows.
    MessageTooLarge(usize, usize),
    /// The transport closed in the middle of a frame.
    UnexpectedEof,
    /// Reading from or writing to the transport failed.
    Io(std::io::Error),
    /// The server process could not be started.
    Spawn(String, std::io::Error),
    /// The server process was started without the expected stdio pipe.
    MissingStdio(&'static str),
    /// The server replied to a request with a JSON-RPC error.
    Server { code: i64, message: String },
    /// The connection went away while a request was in flight.
    Disconnected,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::CannotSerialize(err) => {
                write!(f, "Cannot serialize message: {err}")
            },
            Error::InvalidMessage(raw, err) => {
                write!(f, "Invalid JSON-RPC message: {err} (raw: {raw})")
            },
            Error::InvalidResponse(method, err) => {
                write!(f, "Response to '{method}' does not match schema: {err}")
            },
            Error::InvalidHeader(line) => {
                write!(f, "Malformed message header: '{line}'")
            },
            Error::MissingContentLength => {
                write!(f, "Message headers did not include Content-Length")
            },
            Error::MessageTooLarge(size, limit) => {
                write!(
                    f,
                    "Message of {size} bytes exceeds the {limit} byte limit"
                )
            },
            Error::UnexpectedEof => {
                write!(f, "Transport closed in the middle of a message")
            },
            Error::Io(err) => {
                write!(f, "Transport I/O failure: {err}")
            },
            Error::Spawn(program, err) => {
                write!(f, "Could not start language server '{program}': {err}")
            },
            Error::MissingStdio(pipe) => {
                write!(f, "Language server process has no {pipe} pipe")
            },
            Error::Server { code, message } => {
                write!(f, "Server error {code}: {message}")
            },
            Error::Disconnected => {
                write!(f, "Connection to the language server was lost")
            },
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
