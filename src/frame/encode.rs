//! Pure frame builders.
//!
//! Each function returns the bit-exact wire bytes for one request frame. None
//! of these functions track FCB state; the caller (the session) supplies
//! `fcb` for the primitives that carry it.

use super::{checksum, Address};
use crate::constants;
use crate::error::MBusError;

/// Maximum payload length `pack_long` can encode: `L` is one wire byte and
/// must also account for the 3 header bytes (C, A, CI).
const MAX_PAYLOAD_LEN: usize = 252;

fn short_frame(control: u8, address: u8) -> Vec<u8> {
    let mut buf = Vec::with_capacity(5);
    buf.push(constants::MBUS_FRAME_START_SHORT);
    buf.push(control);
    buf.push(address);
    buf.push(checksum(&[control, address]));
    buf.push(constants::MBUS_FRAME_STOP);
    buf
}

fn long_frame(control: u8, address: u8, ci: u8, payload: &[u8]) -> Result<Vec<u8>, MBusError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(MBusError::Caller(format!(
            "payload of {} bytes exceeds the {}-byte limit a single-byte length field can encode",
            payload.len(),
            MAX_PAYLOAD_LEN
        )));
    }
    let l = (3 + payload.len()) as u8;
    let mut buf = Vec::with_capacity(6 + payload.len());
    buf.push(constants::MBUS_FRAME_START_LONG);
    buf.push(l);
    buf.push(l);
    buf.push(constants::MBUS_FRAME_START_LONG);
    buf.push(control);
    buf.push(address);
    buf.push(ci);
    buf.extend_from_slice(payload);
    let mut body = vec![control, address, ci];
    body.extend_from_slice(payload);
    buf.push(checksum(&body));
    buf.push(constants::MBUS_FRAME_STOP);
    Ok(buf)
}

/// Sets the FCV/FCB bits on a base C-field opcode per EN 13757-2: bit 4 is
/// FCV, bit 5 is FCB.
fn apply_fcv_fcb(base: u8, fcv: bool, fcb: bool) -> u8 {
    let mut c = base;
    if fcv {
        c |= constants::MBUS_CONTROL_MASK_FCV;
    }
    if fcb {
        c |= constants::MBUS_CONTROL_MASK_FCB;
    }
    c
}

/// `SND_NKE`: application/link reset. No FCV/FCB.
pub fn snd_nke(address: Address) -> Result<Vec<u8>, MBusError> {
    let address = address.require_addressable()?;
    Ok(short_frame(constants::MBUS_CONTROL_MASK_SND_NKE, address.raw()))
}

/// `REQ_UD1`: class-1 (alarm) data request. No FCV/FCB, matching spec §3.
pub fn req_ud1(address: Address) -> Result<Vec<u8>, MBusError> {
    let address = address.require_addressable()?;
    Ok(short_frame(constants::MBUS_CONTROL_MASK_REQ_UD1, address.raw()))
}

/// `REQ_UD2`: class-2 (measurement) data request, with the FCB toggle that
/// drives multi-datagram retrieval.
pub fn req_ud2(address: Address, fcb: bool) -> Result<Vec<u8>, MBusError> {
    let address = address.require_addressable()?;
    let control = apply_fcv_fcb(constants::MBUS_CONTROL_MASK_REQ_UD2, true, fcb);
    Ok(short_frame(control, address.raw()))
}

/// `SND_UD`: send user data to a slave, as a long frame with FCV/FCB applied
/// to the base opcode.
pub fn snd_ud(address: Address, fcb: bool, ci: u8, payload: &[u8]) -> Result<Vec<u8>, MBusError> {
    let address = address.require_addressable()?;
    let control = apply_fcv_fcb(constants::MBUS_CONTROL_MASK_SND_UD, true, fcb);
    long_frame(control, address.raw(), ci, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snd_nke_matches_scenario_a() {
        // spec §8 Scenario A: address=5 -> `10 40 05 45 16`.
        assert_eq!(snd_nke(Address::new(5)).unwrap(), vec![0x10, 0x40, 0x05, 0x45, 0x16]);
    }

    #[test]
    fn req_ud2_encodes_fcv_and_fcb() {
        // spec §8 Scenario B: FCV=1, FCB=1 -> `10 7B 01 7C 16`.
        assert_eq!(req_ud2(Address::new(1), true).unwrap(), vec![0x10, 0x7B, 0x01, 0x7C, 0x16]);
        // Scenario C's second request begins `10 6B 01 ...` (FCB toggled to 0).
        assert_eq!(req_ud2(Address::new(1), false).unwrap()[..3], [0x10, 0x6B, 0x01]);
    }

    #[test]
    fn snd_ud_builds_long_frame_with_correct_length_and_checksum() {
        let frame = snd_ud(Address::new(1), true, 0x51, &[0xAA, 0xBB]).unwrap();
        assert_eq!(frame[0], 0x68);
        assert_eq!(frame[1], 5); // L = 3 + 2
        assert_eq!(frame[2], 5);
        assert_eq!(frame[3], 0x68);
        let last = frame.len() - 1;
        assert_eq!(frame[last], 0x16);
        let control = apply_fcv_fcb(constants::MBUS_CONTROL_MASK_SND_UD, true, true);
        let expected_checksum = checksum(&[control, 1, 0x51, 0xAA, 0xBB]);
        assert_eq!(frame[last - 1], expected_checksum);
    }

    #[test]
    fn snd_ud_rejects_payload_too_long() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        assert!(snd_ud(Address::new(1), false, 0x51, &payload).is_err());
    }

    #[test]
    fn rejects_broadcast_address() {
        assert!(snd_nke(Address::BROADCAST).is_err());
        assert!(req_ud2(Address::NO_STATION, true).is_err());
    }
}
