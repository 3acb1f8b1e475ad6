// SPDX-License-Identifier: AGPL-3.0-or-later

//! NOOP: a round trip with no body, used as a liveness probe.

use crate::{op::OperationKind, proto, session::Session};

pub fn build(session: &Session) -> (proto::Message, u64, OperationKind) {
    let kind = OperationKind::Noop;
    let (message, sequence) = super::finish(session, None, &kind);
    (message, sequence, kind)
}
