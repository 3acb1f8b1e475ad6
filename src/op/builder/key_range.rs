// SPDX-License-Identifier: AGPL-3.0-or-later

//! GETKEYRANGE: lists up to `max_returned` keys between `start_key` and
//! `end_key` (kinetic-c `KineticOperation_BuildGetKeyRange`).

use std::sync::{Arc, Mutex};

use crate::{
    error::BuildError,
    op::{KeyRange, OperationKind},
    proto,
    session::Session,
};

pub fn build(
    session: &Session,
    range: KeyRange,
) -> Result<(proto::Message, u64, OperationKind), BuildError> {
    if range.max_returned <= 0 {
        return Err(BuildError::InvalidOperation("max_returned must be > 0"));
    }

    let wire_range = proto::Range {
        start_key: Some(range.start_key.clone()),
        start_key_inclusive: Some(range.start_key_inclusive),
        end_key: Some(range.end_key.clone()),
        end_key_inclusive: Some(range.end_key_inclusive),
        max_returned: Some(range.max_returned),
        reverse: Some(range.reverse),
        ..Default::default()
    };
    let shared = Arc::new(Mutex::new(range));
    let kind = OperationKind::GetKeyRange(shared);
    let body = proto::Body {
        range: Some(wire_range),
        ..Default::default()
    };
    let (message, sequence) = super::finish(session, Some(body), &kind);
    Ok((message, sequence, kind))
}
