// SPDX-License-Identifier: AGPL-3.0-or-later

//! The in-flight `Operation` (spec.md §3) and the typed "out" handles its
//! builders populate on completion.

use std::sync::{Arc, Mutex};

use crate::{proto, status::Status};

/// A key/value entry shared between the caller and the builder/listener.
/// PUT/GET/GETNEXT/GETPREVIOUS/DELETE all operate on one of these.
#[derive(Debug, Clone, Default)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub new_version: Vec<u8>,
    pub db_version: Vec<u8>,
    pub tag: Vec<u8>,
    pub force: bool,
    pub metadata_only: bool,
}

/// A key range request and the keys it resolves to.
#[derive(Debug, Clone, Default)]
pub struct KeyRange {
    pub start_key: Vec<u8>,
    pub start_key_inclusive: bool,
    pub end_key: Vec<u8>,
    pub end_key_inclusive: bool,
    pub max_returned: i32,
    pub reverse: bool,
    pub keys: Vec<Vec<u8>>,
}

/// Device info returned by GETLOG, mirroring kinetic-c's
/// `KineticDeviceInfo` (SPEC_FULL.md §4.F "Supplemented from
/// original_source/").
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub utilizations: Vec<(String, f32)>,
    pub temperatures: Vec<(String, f32, f32)>,
    pub nominal_capacity_bytes: u64,
    pub portion_full: f32,
    pub vendor: String,
    pub model: String,
    pub serial_number: String,
    pub version: String,
}

/// One node of the peer-to-peer chained-operation tree (spec.md §4.D).
#[derive(Debug, Clone, Default)]
pub struct P2pNode {
    pub key: Vec<u8>,
    pub new_key: Vec<u8>,
    pub version: Vec<u8>,
    pub force: bool,
    pub chained: Option<Box<P2pNode>>,
    pub result_status: Option<Status>,
}

#[derive(Debug, Clone)]
pub struct P2pPeer {
    pub hostname: String,
    pub port: i32,
    pub tls: bool,
}

#[derive(Debug, Clone)]
pub struct P2pRequest {
    pub peer: P2pPeer,
    pub operations: Vec<P2pNode>,
}

/// The message-type-specific completion state each builder populates
/// (spec.md §4.D "Builder catalog").
#[derive(Clone)]
pub enum OperationKind {
    Noop,
    Put(Arc<Mutex<Entry>>),
    Get(Arc<Mutex<Entry>>),
    GetNext(Arc<Mutex<Entry>>),
    GetPrevious(Arc<Mutex<Entry>>),
    Delete(Arc<Mutex<Entry>>),
    Flush,
    GetKeyRange(Arc<Mutex<KeyRange>>),
    GetLog(Arc<Mutex<Option<DeviceInfo>>>),
    P2p(Arc<Mutex<P2pRequest>>),
    SetClusterVersion(i64),
    InstantSecureErase,
}

impl OperationKind {
    pub fn message_type(&self) -> proto::header::MessageType {
        use proto::header::MessageType as T;
        match self {
            OperationKind::Noop => T::Noop,
            OperationKind::Put(_) => T::Put,
            OperationKind::Get(_) => T::Get,
            OperationKind::GetNext(_) => T::Getnext,
            OperationKind::GetPrevious(_) => T::Getprevious,
            OperationKind::Delete(_) => T::Delete,
            OperationKind::Flush => T::Flushalldata,
            OperationKind::GetKeyRange(_) => T::Getkeyrange,
            OperationKind::GetLog(_) => T::Getlog,
            OperationKind::P2p(_) => T::Peer2peerpush,
            OperationKind::SetClusterVersion(_) => T::Setup,
            OperationKind::InstantSecureErase => T::Setup,
        }
    }

    pub fn uses_pin_auth(&self) -> bool {
        matches!(self, OperationKind::InstantSecureErase)
    }

    pub fn sends_value(&self) -> bool {
        matches!(self, OperationKind::Put(_))
    }

    /// True if the reply is expected to carry a value payload (spec.md
    /// §4.D table): GET-family unless `metadataOnly`.
    pub fn expects_value(&self) -> bool {
        match self {
            OperationKind::Get(e) | OperationKind::GetNext(e) | OperationKind::GetPrevious(e) => {
                !e.lock().expect("entry mutex poisoned").metadata_only
            },
            _ => false,
        }
    }
}

/// Final status delivered to a completion callback.
#[derive(Debug, Clone, Copy)]
pub struct CompletionResult {
    pub status: Status,
}

/// The user-supplied completion thunk (spec.md §3 "completion callback").
/// Invoked exactly once (spec.md §8 invariant).
pub type UserCallback = Box<dyn FnOnce(CompletionResult) + Send + 'static>;

/// One in-flight request (spec.md §3 "Operation").
pub struct Operation {
    /// Session-assigned, immutable, unique-within-session sequence
    /// number (spec.md §3 invariant).
    pub sequence: u64,
    pub kind: OperationKind,
    callback: Option<UserCallback>,
}

impl Operation {
    pub fn new(sequence: u64, kind: OperationKind, callback: UserCallback) -> Self {
        Self {
            sequence,
            kind,
            callback: Some(callback),
        }
    }

    #[cfg(test)]
    pub fn for_test(sequence: u64, kind: OperationKind) -> Self {
        Self::new(sequence, kind, Box::new(|_| {}))
    }

    /// Runs the user callback exactly once (spec.md §4.G). Panics if
    /// called twice; the listener/sender code is structured so that
    /// never happens (the operation is consumed on completion).
    pub fn complete(mut self, result: CompletionResult) {
        let cb = self
            .callback
            .take()
            .expect("operation completed more than once");
        cb(result);
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}
