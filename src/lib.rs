// SPDX-License-Identifier: AGPL-3.0-or-later

//! An asynchronous client core for the Kinetic key-value storage
//! protocol: framing, HMAC/PIN authentication, a fixed-capacity pending
//! table, per-message-type operation builders, and a single-task
//! cooperative reactor.

pub mod cfg;
pub mod client;
pub mod codec;
pub mod error;
pub mod listener;
pub mod op;
pub mod pending;
pub mod proto;
pub mod session;
pub mod status;
pub mod transport;
pub mod worker;
