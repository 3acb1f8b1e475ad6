//! Frame codec (header + staged PDU read) and the HMAC/PIN auth engine.

// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod auth;
pub mod frame;
