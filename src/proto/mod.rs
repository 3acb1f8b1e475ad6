//! Generated protobuf types backing the wire `Message`/`Command` envelope.
//!
//! The schema itself is an opaque encoder/decoder as far as the core is
//! concerned (see spec's non-goals); this module only exposes the
//! generated types and a couple of conversions the core needs at its
//! seams.

#![allow(clippy::all)]

include!(concat!(env!("OUT_DIR"), "/kinetic.proto.rs"));
