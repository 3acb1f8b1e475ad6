// SPDX-License-Identifier: AGPL-3.0-or-later

//! PEER2PEERPUSH: pushes a chain of key copies to another device
//! (kinetic-c `build_p2pOp`). Each [`crate::op::P2pNode`] may chain to one
//! more via `chained`, forming a linked list rather than kinetic-c's
//! n-ary tree; depth is capped at the session's configured
//! `Limits::p2p_depth_cap` either way.

use std::sync::{Arc, Mutex};

use crate::{
    error::BuildError,
    op::{OperationKind, P2pRequest},
    proto,
    session::Session,
};

/// kinetic-c rejects nesting at level 1000 (`build_p2pOp`'s
/// `if (nestingLevel == 1000)` check); the stale header comment saying
/// 10000 does not match the actual guard. Exposed as a configurable
/// `Limits::p2p_depth_cap` (default 1000) rather than hard-coded, per
/// spec.md §9's "MAX_PENDING_MESSAGES... may want this significantly
/// higher" note applied the same way to this cap.
fn wire_operation(
    node: &crate::op::P2pNode,
    depth: usize,
    depth_cap: usize,
) -> Result<proto::p2p_operation::Operation, BuildError> {
    if depth >= depth_cap {
        return Err(BuildError::P2pDepthExceeded);
    }
    let p2pop = node
        .chained
        .as_deref()
        .map(|child| {
            wire_operation(child, depth + 1, depth_cap).map(|op| proto::P2pOperation {
                operation: vec![op],
                ..Default::default()
            })
        })
        .transpose()?;

    Ok(proto::p2p_operation::Operation {
        key: Some(node.key.clone()),
        new_key: Some(node.new_key.clone()),
        version: Some(node.version.clone()),
        force: Some(node.force),
        p2pop,
        status: None,
    })
}

pub fn build(
    session: &Session,
    request: P2pRequest,
) -> Result<(proto::Message, u64, OperationKind), BuildError> {
    let depth_cap = session.p2p_depth_cap() as usize;
    let wire_ops = request
        .operations
        .iter()
        .map(|op| wire_operation(op, 0, depth_cap))
        .collect::<Result<Vec<_>, _>>()?;

    let p2p_operation = proto::P2pOperation {
        peer: Some(proto::p2p_operation::Peer {
            hostname: Some(request.peer.hostname.clone()),
            port: Some(request.peer.port),
            tls: Some(request.peer.tls),
        }),
        operation: wire_ops,
    };
    let shared = Arc::new(Mutex::new(request));
    let kind = OperationKind::P2p(shared);
    let body = proto::Body {
        p2p_operation: Some(p2p_operation),
        ..Default::default()
    };
    let (message, sequence) = super::finish(session, Some(body), &kind);
    Ok((message, sequence, kind))
}
