// SPDX-License-Identifier: AGPL-3.0-or-later

//! FLUSHALLDATA: asks the device to flush any write-back-cached entries
//! to stable storage (kinetic-c `KineticOperation_BuildFlush`). No body.

use crate::{op::OperationKind, proto, session::Session};

pub fn build(session: &Session) -> (proto::Message, u64, OperationKind) {
    let kind = OperationKind::Flush;
    let (message, sequence) = super::finish(session, None, &kind);
    (message, sequence, kind)
}
