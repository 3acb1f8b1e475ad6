// SPDX-License-Identifier: AGPL-3.0-or-later

//! DELETE: removes the entry at `entry.key`, honoring `force` the same
//! way PUT does (kinetic-c `KineticOperation_BuildDelete`).

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
        db_version: Some(entry.db_version.clone()),
        force: Some(entry.force),
        ..Default::default()
    };
    let shared = Arc::new(Mutex::new(entry));
    let kind = OperationKind::Delete(shared);
    let body = proto::Body {
        key_value: Some(key_value),
        ..Default::default()
    };
    let (message, sequence) = super::finish(session, Some(body), &kind);
    Ok((message, sequence, kind))
}
