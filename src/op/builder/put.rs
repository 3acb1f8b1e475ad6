// SPDX-License-Identifier: AGPL-3.0-or-later

//! PUT: writes `entry.value` under `entry.key`, carrying `newVersion` as
//! the version the entry will have once written (kinetic-c
//! `KineticOperation_BuildPut`). On success the listener rotates
//! `newVersion` into `dbVersion` (spec.md §4.D, see
//! [`crate::op::complete`]).

use std::sync::{Arc, Mutex};

use crate::{
    error::BuildError,
    op::{Entry, OperationKind},
    proto,
    session::Session,
};

pub fn build(
    session: &Session,
    entry: Entry,
) -> Result<(proto::Message, u64, OperationKind), BuildError> {
    if entry.key.is_empty() {
        return Err(BuildError::InvalidOperation("key must not be empty"));
    }

    let key_value = proto::KeyValue {
        key: Some(entry.key.clone()),
        new_version: Some(entry.new_version.clone()),
        db_version: Some(entry.db_version.clone()),
        force: Some(entry.force),
        synchronization: Some(proto::key_value::Synchronization::Writeback as i32),
        metadata_only: Some(false),
        tag: Some(entry.tag.clone()),
        ..Default::default()
    };
    let shared = Arc::new(Mutex::new(entry));
    let kind = OperationKind::Put(shared);
    let body = proto::Body {
        key_value: Some(key_value),
        ..Default::default()
    };
    let (message, sequence) = super::finish(session, Some(body), &kind);
    Ok((message, sequence, kind))
}
