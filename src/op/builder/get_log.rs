// SPDX-License-Identifier: AGPL-3.0-or-later

//! GETLOG: asks the device for utilization/temperature/capacity/
//! configuration/statistics info (kinetic-c `KineticOperation_BuildGetLog`,
//! supplemented per SPEC_FULL.md §4.F with the typed [`crate::op::DeviceInfo`]
//! the reply is unpacked into).

use std::sync::{Arc, Mutex};

use crate::{op::OperationKind, proto, session::Session};

pub fn build(session: &Session) -> (proto::Message, u64, OperationKind) {
    let get_log = proto::GetLog {
        types: vec![
            proto::get_log::Type::Utilizations as i32,
            proto::get_log::Type::Temperatures as i32,
            proto::get_log::Type::Capacities as i32,
            proto::get_log::Type::Configuration as i32,
        ],
        ..Default::default()
    };
    let kind = OperationKind::GetLog(Arc::new(Mutex::new(None)));
    let body = proto::Body {
        get_log: Some(get_log),
        ..Default::default()
    };
    let (message, sequence) = super::finish(session, Some(body), &kind);
    (message, sequence, kind)
}
