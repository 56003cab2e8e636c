//
// lib.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

pub mod client;
pub mod error;
pub mod transport;
pub mod wire;

pub use client::Client;
pub use client::ServerSession;
pub use error::Error;
pub type Result<T> = std::result::Result<T, error::Error>;
