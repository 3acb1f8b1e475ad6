// SPDX-License-Identifier: AGPL-3.0-or-later

//! HMAC-SHA1 and PIN authentication envelopes (spec.md §4.B, §6).
//!
//! The per-message auth mode is always selected by the operation builder
//! (§4.D), never decided here. This module only knows how to populate
//! (and verify) the envelope once told which kind is wanted.

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::proto;

type HmacSha1 = Hmac<Sha1>;

/// Computes the HMAC-SHA1 of `command_bytes` under `secret`.
pub fn compute_hmac(secret: &[u8], command_bytes: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC accepts a key of any size");
    mac.update(command_bytes);
    mac.finalize().into_bytes().to_vec()
}

/// Verifies a received HMAC against `command_bytes` under `secret`.
pub fn verify_hmac(secret: &[u8], command_bytes: &[u8], mac_bytes: &[u8]) -> bool {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC accepts a key of any size");
    mac.update(command_bytes);
    mac.verify_slice(mac_bytes).is_ok()
}

/// Populates `message.authType`/`hmacAuth` for an HMAC-authenticated
/// request, per kinetic-c's `KineticHMAC_Populate`.
pub fn apply_hmac_auth(message: &mut proto::Message, identity: i64, secret: &[u8]) {
    let command_bytes = message.command_bytes.clone().unwrap_or_default();
    let mac = compute_hmac(secret, &command_bytes);
    message.auth_type = Some(proto::message::AuthType::Hmacauth as i32);
    message.hmac_auth = Some(proto::HmaCauth {
        identity: Some(identity),
        hmac: Some(mac),
    });
    message.pin_auth = None;
}

/// Populates `message.authType`/`pinAuth` for a PIN-authenticated
/// request (currently only `InstantSecureErase`, spec.md §4.D).
///
/// Resolves the open question in spec.md §9: the envelope always
/// carries an explicit (possibly empty) PIN payload, and `hmacAuth` is
/// always cleared rather than left in some half-initialized state.
pub fn apply_pin_auth(message: &mut proto::Message, pin: &[u8]) {
    message.auth_type = Some(proto::message::AuthType::Pinauth as i32);
    message.pin_auth = Some(proto::PiNauth {
        pin: Some(pin.to_vec()),
    });
    message.hmac_auth = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_round_trips() {
        let secret = b"asdfasdf";
        let data = b"command bytes go here";
        let mac = compute_hmac(secret, data);
        assert!(verify_hmac(secret, data, &mac));
        assert!(!verify_hmac(secret, b"different bytes", &mac));
    }

    #[test]
    fn pin_auth_clears_hmac_envelope() {
        let mut msg = proto::Message::default();
        apply_hmac_auth(&mut msg, 1, b"secret");
        assert!(msg.hmac_auth.is_some());
        apply_pin_auth(&mut msg, b"1234");
        assert!(msg.hmac_auth.is_none());
        assert_eq!(msg.pin_auth.expect("pin auth set").pin.expect("pin set"), b"1234");
    }
}
