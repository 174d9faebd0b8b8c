//! # M-Bus Frame Primitives
//!
//! This module provides the checksum/address primitives, the
//! frame encoder (spec §4.2, [`encode`]), and the progressive frame decoder
//! state machine (spec §4.3, [`decode`]) whose [`decode::DecodedFrame`] is
//! the closed set of frame variants callers actually see.

pub mod decode;
pub mod encode;

use crate::error::ProtocolError;

/// A validated M-Bus bus address.
///
/// Wraps a `u8` so that "is this a normal primary address" or "is this
/// broadcast" reads as a named check instead of a bare numeric comparison
/// scattered through the session and encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(u8);

impl Address {
    /// Selected-secondary pseudo-address.
    pub const SELECTED_SECONDARY: Address = Address(crate::constants::MBUS_ADDRESS_SELECTED_SECONDARY);
    /// No-station placeholder.
    pub const NO_STATION: Address = Address(crate::constants::MBUS_ADDRESS_NO_STATION);
    /// Broadcast address; no reply is expected.
    pub const BROADCAST: Address = Address(crate::constants::MBUS_ADDRESS_BROADCAST);

    /// Wraps a raw byte as an address. Any value 0..=255 is accepted here;
    /// operations that require a reply reject broadcast/no-station via
    /// [`Address::require_addressable`].
    pub fn new(raw: u8) -> Self {
        Address(raw)
    }

    /// The raw wire byte.
    pub fn raw(self) -> u8 {
        self.0
    }

    /// A normal primary address in 1..=250.
    pub fn is_primary(self) -> bool {
        (crate::constants::MBUS_ADDRESS_PRIMARY_MIN..=crate::constants::MBUS_ADDRESS_PRIMARY_MAX)
            .contains(&self.0)
    }

    /// The broadcast address (255): no reply is ever sent.
    pub fn is_broadcast(self) -> bool {
        self == Address::BROADCAST
    }

    /// Rejects addresses that cannot receive a reply (broadcast or the
    /// no-station placeholder), for operations that require one.
    pub fn require_addressable(self) -> Result<Self, crate::error::MBusError> {
        if self == Address::BROADCAST || self == Address::NO_STATION {
            return Err(crate::error::MBusError::Caller(format!(
                "address {} cannot be used for an operation expecting a reply",
                self.0
            )));
        }
        Ok(self)
    }
}

impl From<u8> for Address {
    fn from(raw: u8) -> Self {
        Address(raw)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags::bitflags! {
    /// The set of frame kinds a decoder instance is willing to accept
    /// (spec §4.3 construction parameter `allowed_frame_kinds`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameKindSet: u8 {
        /// A single-byte acknowledgement (`0xE5`).
        const ACK = 0b001;
        /// A five-byte short/control frame.
        const SHORT_CONTROL = 0b010;
        /// A long frame with a CI field and payload.
        const LONG = 0b100;
    }
}

impl FrameKindSet {
    /// Only `Ack`: used while waiting for a `SND_NKE` reply.
    pub fn ack_only() -> Self {
        FrameKindSet::ACK
    }

    /// Only `Long`: used while waiting for a variable-data response, where
    /// an `Ack` would mean "no data" and is handled by the caller instead
    /// of the decoder.
    pub fn long_only() -> Self {
        FrameKindSet::LONG
    }

    /// `Ack` or `Long`: used for `REQ_UD2`, where an `Ack` legitimately
    /// signals end-of-sequence.
    pub fn ack_or_long() -> Self {
        FrameKindSet::ACK | FrameKindSet::LONG
    }
}

/// `checksum(bytes) = (sum of byte values) mod 256`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Validates a complete 5-byte short frame buffer in place.
pub fn validate_short(buf: &[u8]) -> Result<(), ProtocolError> {
    if buf.len() != 5 {
        return Err(ProtocolError::LengthMismatch(buf.len() as u8, 5));
    }
    if buf[0] != crate::constants::MBUS_FRAME_START_SHORT {
        return Err(ProtocolError::InvalidStartByte(buf[0]));
    }
    if buf[4] != crate::constants::MBUS_FRAME_STOP {
        return Err(ProtocolError::StopByteMissing(buf[4]));
    }
    let calculated = checksum(&buf[1..3]);
    if calculated != buf[3] {
        return Err(ProtocolError::ChecksumMismatch {
            expected: buf[3],
            calculated,
        });
    }
    Ok(())
}

/// Validates a complete long-frame buffer in place. `buf` must
/// span from the first `0x68` to the final `0x16` inclusive.
pub fn validate_long(buf: &[u8]) -> Result<(), ProtocolError> {
    if buf.len() < 9 {
        return Err(ProtocolError::LengthMismatch(buf.len() as u8, 9));
    }
    if buf[0] != crate::constants::MBUS_FRAME_START_LONG {
        return Err(ProtocolError::InvalidStartByte(buf[0]));
    }
    if buf[1] != buf[2] {
        return Err(ProtocolError::LengthMismatch(buf[1], buf[2]));
    }
    let l = buf[1];
    if buf[3] != crate::constants::MBUS_FRAME_START_LONG {
        return Err(ProtocolError::InvalidStartByte(buf[3]));
    }
    if buf.len() != l as usize + 6 {
        return Err(ProtocolError::LengthMismatch(buf.len() as u8, l.saturating_add(6)));
    }
    let last = buf.len() - 1;
    if buf[last] != crate::constants::MBUS_FRAME_STOP {
        return Err(ProtocolError::StopByteMissing(buf[last]));
    }
    let calculated = checksum(&buf[4..4 + l as usize]);
    if calculated != buf[4 + l as usize] {
        return Err(ProtocolError::ChecksumMismatch {
            expected: buf[4 + l as usize],
            calculated,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_modulo_256_sum() {
        assert_eq!(checksum(&[0x40, 0x05]), 0x45);
        assert_eq!(checksum(&[0xFF, 0xFF, 0x02]), 0x00);
    }

    #[test]
    fn validate_short_accepts_well_formed_frame() {
        let buf = [0x10, 0x40, 0x05, 0x45, 0x16];
        assert!(validate_short(&buf).is_ok());
    }

    #[test]
    fn validate_short_rejects_bad_checksum() {
        let buf = [0x10, 0x40, 0x05, 0x00, 0x16];
        assert_eq!(
            validate_short(&buf),
            Err(ProtocolError::ChecksumMismatch {
                expected: 0x00,
                calculated: 0x45
            })
        );
    }

    #[test]
    fn validate_short_rejects_missing_stop_byte() {
        let buf = [0x10, 0x40, 0x05, 0x45, 0x00];
        assert_eq!(validate_short(&buf), Err(ProtocolError::StopByteMissing(0x00)));
    }

    #[test]
    fn validate_long_accepts_empty_payload() {
        // L=3: C A CI only, no data bytes.
        let buf = [0x68, 0x03, 0x03, 0x68, 0x08, 0x01, 0x72, 0x7B, 0x16];
        assert!(validate_long(&buf).is_ok());
    }

    #[test]
    fn validate_long_rejects_length_field_mismatch() {
        let buf = [0x68, 0x03, 0x04, 0x68, 0x08, 0x01, 0x72, 0x7B, 0x16];
        assert_eq!(validate_long(&buf), Err(ProtocolError::LengthMismatch(0x03, 0x04)));
    }

    #[test]
    fn validate_long_near_max_length_does_not_panic_on_mismatch() {
        // L=255 (the maximum) but the buffer is short by one byte: must
        // report a tagged error, not overflow computing `l + 6`.
        let mut buf = vec![0x68, 255, 255, 0x68];
        buf.extend(std::iter::repeat(0u8).take(255));
        buf.push(0x16);
        assert_eq!(validate_long(&buf), Err(ProtocolError::LengthMismatch(buf.len() as u8, 255)));
    }

    #[test]
    fn address_addressability_rejects_broadcast_and_no_station() {
        assert!(Address::BROADCAST.require_addressable().is_err());
        assert!(Address::NO_STATION.require_addressable().is_err());
        assert!(Address::new(5).require_addressable().is_ok());
    }

    #[test]
    fn address_is_primary_bounds() {
        assert!(!Address::new(0).is_primary());
        assert!(Address::new(1).is_primary());
        assert!(Address::new(250).is_primary());
        assert!(!Address::new(251).is_primary());
    }
}
