//! Operation lifecycle: build (spec.md §4.D) -> send (§4.E) -> complete (§4.G).

// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod builder;
pub mod complete;
pub mod operation;
pub mod sender;

pub use operation::{
    CompletionResult, DeviceInfo, Entry, KeyRange, Operation, OperationKind, P2pNode, P2pPeer,
    P2pRequest, UserCallback,
};
