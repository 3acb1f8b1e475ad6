// SPDX-License-Identifier: AGPL-3.0-or-later

//! Client-visible completion status, per spec.md §6.
//!
//! `Status` is what every operation's completion callback ultimately
//! receives. It merges three sources: synchronous local failures (frame
//! too large, queue full), listener-observed failures (timeout, closed
//! connection), and device-reported status codes copied out of the
//! response `Command.status`.

use std::fmt;

use crate::proto;

/// Final outcome of an operation, delivered exactly once to its
/// completion callback (spec.md §3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Invalid,
    ConnClosed,
    BufferOverrun,
    OperationInvalid,
    OperationTimedOut,
    SessionOverloaded,
    OperationFailed,
    ProtoDecode,
    NotFound,
    VersionMismatch,
    PermissionDenied,
    ClusterVersionMismatch,
    InvalidRequest,
    ServiceBusy,
    Expired,
    NotAuthorized,
    InternalError,
}

impl Status {
    /// Human-readable description, exposed as a sibling helper to the
    /// raw status value (spec.md §6).
    pub fn describe(&self) -> &'static str {
        match self {
            Status::Success => "operation completed successfully",
            Status::Invalid => "invalid operation or argument",
            Status::ConnClosed => "connection was closed",
            Status::BufferOverrun => "message exceeds the maximum PDU size",
            Status::OperationInvalid => "operation could not be constructed",
            Status::OperationTimedOut => "operation timed out waiting for a response",
            Status::SessionOverloaded => "too many operations are in flight",
            Status::OperationFailed => "operation failed for an unspecified reason",
            Status::ProtoDecode => "failed to decode the response protobuf",
            Status::NotFound => "key not found",
            Status::VersionMismatch => "version precondition did not match",
            Status::PermissionDenied => "permission denied",
            Status::ClusterVersionMismatch => "cluster version mismatch",
            Status::InvalidRequest => "device rejected the request as invalid",
            Status::ServiceBusy => "device is busy, retry later",
            Status::Expired => "request expired before it could be serviced",
            Status::NotAuthorized => "identity is not authorized for this operation",
            Status::InternalError => "device reported an internal error",
        }
    }

    /// Maps a device-reported status code (from `Command.status.code`)
    /// onto the local status enum, 1:1, per spec.md §7 "Application"
    /// error kind.
    pub fn from_proto_code(code: proto::status::StatusCode) -> Self {
        use proto::status::StatusCode as C;
        match code {
            C::Success => Status::Success,
            C::NotFound => Status::NotFound,
            C::VersionMismatch => Status::VersionMismatch,
            C::PermissionDenied => Status::PermissionDenied,
            C::ClusterVersionMismatch => Status::ClusterVersionMismatch,
            C::InvalidRequest => Status::InvalidRequest,
            C::ServiceBusy => Status::ServiceBusy,
            C::Expired => Status::Expired,
            C::NotAuthorized => Status::NotAuthorized,
            C::InternalError => Status::InternalError,
            C::NotAttempted | C::InvalidStatusCode => Status::Invalid,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

impl std::error::Error for Status {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_device_not_found_to_not_found_not_success() {
        // Scenario 3 in spec.md §8: a device NOT_FOUND must surface as
        // NotFound, never as Success.
        let s = Status::from_proto_code(proto::status::StatusCode::NotFound);
        assert_eq!(s, Status::NotFound);
        assert!(!s.is_success());
    }

    #[test]
    fn every_status_has_a_description() {
        for s in [
            Status::Success,
            Status::Invalid,
            Status::ConnClosed,
            Status::BufferOverrun,
            Status::OperationInvalid,
            Status::OperationTimedOut,
            Status::SessionOverloaded,
            Status::OperationFailed,
            Status::ProtoDecode,
        ] {
            assert!(!s.describe().is_empty());
        }
    }
}
