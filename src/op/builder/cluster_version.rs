// SPDX-License-Identifier: AGPL-3.0-or-later

//! SETCLUSTERVERSION: advances the cluster version the device expects on
//! every subsequent header (kinetic-c treats this as a `Setup` body).

use crate::{op::OperationKind, proto, session::Session};

pub fn build(session: &Session, new_version: i64) -> (proto::Message, u64, OperationKind) {
    let setup = proto::Setup {
        new_cluster_version: Some(new_version),
        ..Default::default()
    };
    let kind = OperationKind::SetClusterVersion(new_version);
    let body = proto::Body {
        setup: Some(setup),
        ..Default::default()
    };
    let (message, sequence) = super::finish(session, Some(body), &kind);
    (message, sequence, kind)
}
