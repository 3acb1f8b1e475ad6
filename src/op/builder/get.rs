// SPDX-License-Identifier: AGPL-3.0-or-later

//! GET / GETNEXT / GETPREVIOUS: fetch the value (or just metadata, when
//! `entry.metadata_only`) for the matching key (kinetic-c
//! `KineticOperation_BuildGet` / `BuildGetPrevious` / `BuildGetNext`).

use std::sync::{Arc, Mutex};

use crate::{
    error::BuildError,
    op::{Entry, OperationKind},
    proto,
    session::Session,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetKind {
    Exact,
    Next,
    Previous,
}

pub fn build(
    session: &Session,
    entry: Entry,
    get_kind: GetKind,
) -> Result<(proto::Message, u64, OperationKind), BuildError> {
    if entry.key.is_empty() {
        return Err(BuildError::InvalidOperation("key must not be empty"));
    }

    let key_value = proto::KeyValue {
        key: Some(entry.key.clone()),
        metadata_only: Some(entry.metadata_only),
        ..Default::default()
    };
    let shared = Arc::new(Mutex::new(entry));
    let kind = match get_kind {
        GetKind::Exact => OperationKind::Get(shared),
        GetKind::Next => OperationKind::GetNext(shared),
        GetKind::Previous => OperationKind::GetPrevious(shared),
    };
    let body = proto::Body {
        key_value: Some(key_value),
        ..Default::default()
    };
    let (message, sequence) = super::finish(session, Some(body), &kind);
    Ok((message, sequence, kind))
}
