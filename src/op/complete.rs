// SPDX-License-Identifier: AGPL-3.0-or-later

//! Completion dispatch (spec.md §4.G): copies whatever the reply carries
//! back into the operation's typed "out" handle, then invokes the user
//! callback exactly once. The pending-table slot has already been
//! released by the caller (the listener) before this runs, so a
//! callback that immediately submits another operation never deadlocks
//! or double-frees a slot.

use bytes::Bytes;

use crate::{
    op::{CompletionResult, Operation, OperationKind, P2pNode},
    proto,
    status::Status,
};

/// Finishes `op`: copies reply data per message type, then runs the
/// user callback with the final `status`.
pub fn dispatch(op: Operation, status: Status, command: &proto::Command, value: Bytes) {
    apply_reply(&op.kind, status, command, value);
    op.complete(CompletionResult { status });
}

fn apply_reply(kind: &OperationKind, status: Status, command: &proto::Command, value: Bytes) {
    let key_value = command.body.as_ref().and_then(|b| b.key_value.as_ref());

    match kind {
        OperationKind::Get(entry) | OperationKind::GetNext(entry) | OperationKind::GetPrevious(entry) => {
            if !status.is_success() {
                return;
            }
            let expects_value = kind.expects_value();
            let mut entry = entry.lock().expect("entry mutex poisoned");
            // `expects_value` mirrors the builder's `metadataOnly` flag
            // (spec.md §4.D step 4); a metadata-only request's reply
            // carries no value payload worth copying even if the device
            // sent trailing bytes.
            if expects_value && !value.is_empty() {
                entry.value = value.to_vec();
            }
            if let Some(kv) = key_value {
                if let Some(k) = &kv.key {
                    entry.key = k.clone();
                }
                if let Some(v) = &kv.db_version {
                    entry.db_version = v.clone();
                }
                if let Some(t) = &kv.tag {
                    entry.tag = t.clone();
                }
            }
        },

        // PUT rotation (spec.md §4.D): on SUCCESS, if the caller proposed a
        // `newVersion`, it becomes the entry's `dbVersion` and is cleared,
        // mirroring kinetic-c's `KineticOperation_PutCallback`.
        OperationKind::Put(entry) => {
            if !status.is_success() {
                return;
            }
            let mut entry = entry.lock().expect("entry mutex poisoned");
            if !entry.new_version.is_empty() {
                entry.db_version = std::mem::take(&mut entry.new_version);
            }
        },

        OperationKind::Delete(_) | OperationKind::Noop | OperationKind::Flush => {},

        OperationKind::GetKeyRange(range) => {
            if !status.is_success() {
                return;
            }
            if let Some(r) = command.body.as_ref().and_then(|b| b.range.as_ref()) {
                range.lock().expect("range mutex poisoned").keys = r.keys.clone();
            }
        },

        OperationKind::GetLog(slot) => {
            if !status.is_success() {
                return;
            }
            if let Some(log) = command.body.as_ref().and_then(|b| b.get_log.as_ref()) {
                *slot.lock().expect("device info mutex poisoned") = Some(device_info_from(log));
            }
        },

        OperationKind::P2p(request) => {
            if let Some(p2p) = command.body.as_ref().and_then(|b| b.p2p_operation.as_ref()) {
                let mut request = request.lock().expect("p2p mutex poisoned");
                for (node, wire) in request.operations.iter_mut().zip(p2p.operation.iter()) {
                    populate_p2p_status(node, wire);
                }
            }
        },

        OperationKind::SetClusterVersion(_) | OperationKind::InstantSecureErase => {},
    }
}

fn device_info_from(log: &proto::GetLog) -> crate::op::DeviceInfo {
    let mut info = crate::op::DeviceInfo::default();
    if let Some(u) = &log.utilization
        && let (Some(name), Some(value)) = (&u.name, u.value)
    {
        info.utilizations.push((name.clone(), value));
    }
    if let Some(t) = &log.temperature
        && let Some(name) = &t.name
    {
        info.temperatures
            .push((name.clone(), t.current.unwrap_or_default(), t.maximum.unwrap_or_default()));
    }
    if let Some(c) = &log.capacity {
        info.nominal_capacity_bytes = c.nominal_capacity_in_bytes.unwrap_or_default();
        info.portion_full = c.portion_full.unwrap_or_default();
    }
    if let Some(cfg) = &log.configuration {
        info.vendor = cfg.vendor.clone().unwrap_or_default();
        info.model = cfg.model.clone().unwrap_or_default();
        info.serial_number = cfg.serial_number.clone().unwrap_or_default();
        info.version = cfg.version.clone().unwrap_or_default();
    }
    info
}

/// Walks the reply tree recursively, assigning a per-leaf status
/// (kinetic-c's `populateP2PStatusCodes`).
fn populate_p2p_status(node: &mut P2pNode, wire: &proto::p2p_operation::Operation) {
    node.result_status = wire
        .status
        .as_ref()
        .and_then(|s| s.code)
        .and_then(|c| proto::status::StatusCode::try_from(c).ok())
        .map(Status::from_proto_code);

    if let (Some(child), Some(wire_child)) = (
        node.chained.as_deref_mut(),
        wire.p2pop.as_ref().and_then(|p| p.operation.first()),
    ) {
        populate_p2p_status(child, wire_child);
    }
}
