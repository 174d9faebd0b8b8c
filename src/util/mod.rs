//! # Utility Modules
//!
//! Common helpers used throughout the crate, currently limited to hex
//! encoding/decoding for debug logging of raw frames.

pub mod hex;

pub use hex::{decode_hex, encode_hex, format_hex_compact, pretty_hex};
