// SPDX-License-Identifier: AGPL-3.0-or-later

//! INSTANTSECUREERASE: the one operation authenticated with the device
//! PIN instead of HMAC (kinetic-c `KineticOperation_BuildInstantSecureErase`,
//! `KineticOperation_SendRequest`'s PIN-auth branch).

use crate::{op::OperationKind, proto, session::Session};

pub fn build(session: &Session) -> (proto::Message, u64, OperationKind) {
    let setup = proto::Setup {
        instant_secure_erase: Some(true),
        pin: Some(session.pin().to_vec()),
        ..Default::default()
    };
    let kind = OperationKind::InstantSecureErase;
    let body = proto::Body {
        setup: Some(setup),
        ..Default::default()
    };
    let (message, sequence) = super::finish(session, Some(body), &kind);
    (message, sequence, kind)
}
