//! Progressive frame decoder.
//!
//! [`FrameDecoder`] is a pull-based state machine: the caller asks
//! [`FrameDecoder::bytes_needed`] for how many bytes to read next, hands them
//! to [`FrameDecoder::feed`], and repeats until [`FrameDecoder::is_done`].
//! Nothing in this module suspends or performs I/O; driving the machine from
//! a transport is the session's job (spec §4.5.1, §9 "Async/suspension").

use super::{checksum, Address, FrameKindSet};
use crate::error::{MBusError, ProtocolError};
use crate::payload::datagram::Datagram;

/// The payload of a completed [`DecodedFrame::Long`] frame: either a parsed
/// variable-data datagram (CI 0x72/0x7A) or opaque bytes for any other CI,
/// preserved verbatim per spec §3.
#[derive(Debug, Clone, PartialEq)]
pub enum LongPayload {
    /// CI indicated a variable data response; the DRH parser
    /// has already run over the payload.
    VariableData(Datagram),
    /// Any other CI: bytes are returned untouched.
    Opaque(Vec<u8>),
}

/// A frame the decoder has fully validated and, for variable-data
/// responses, resolved into records.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedFrame {
    /// A single acknowledgement byte.
    Ack,
    /// A five-byte short/control frame.
    ShortControl {
        /// The C-field.
        control: u8,
        /// The A-field.
        address: u8,
    },
    /// A long frame, with its payload resolved per CI.
    Long {
        /// The C-field.
        control: u8,
        /// The A-field.
        address: u8,
        /// The CI-field.
        ci: u8,
        /// The resolved payload.
        payload: LongPayload,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectFirst,
    ExpectShortRest,
    ExpectLengthPair,
    ExpectStart2,
    ExpectHeader,
    ExpectPayload,
    ExpectChecksum,
    ExpectStop,
    DoneAck,
    DoneLong,
    Error,
}

impl State {
    fn name(self) -> &'static str {
        match self {
            State::ExpectFirst => "expect_first",
            State::ExpectShortRest => "expect_short_rest",
            State::ExpectLengthPair => "expect_length_pair",
            State::ExpectStart2 => "expect_start2",
            State::ExpectHeader => "expect_header",
            State::ExpectPayload => "expect_payload",
            State::ExpectChecksum => "expect_checksum",
            State::ExpectStop => "expect_stop",
            State::DoneAck => "done_ack",
            State::DoneLong => "done_long",
            State::Error => "error",
        }
    }
}

/// Progressive decoder for one frame. A fresh instance is
/// created per response; the session holds no decoder state between
/// operations.
#[derive(Debug)]
pub struct FrameDecoder {
    state: State,
    expected_address: Option<Address>,
    allowed_frame_kinds: FrameKindSet,
    control: u8,
    address: u8,
    ci: u8,
    length: u8,
    payload: Vec<u8>,
}

impl FrameDecoder {
    /// Builds a decoder. `expected_address`, when set, is checked against
    /// the A-field of `ShortControl`/`Long` frames. `allowed_frame_kinds`
    /// restricts which frame kinds the first byte may introduce.
    pub fn new(expected_address: Option<Address>, allowed_frame_kinds: FrameKindSet) -> Self {
        FrameDecoder {
            state: State::ExpectFirst,
            expected_address,
            allowed_frame_kinds,
            control: 0,
            address: 0,
            ci: 0,
            length: 0,
            payload: Vec::new(),
        }
    }

    /// Name of the current state, for diagnostics (used by the session to
    /// tag [`MBusError::Timeout`]).
    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    /// How many bytes [`FrameDecoder::feed`] requires next. Zero only in a
    /// terminal state (done or errored).
    pub fn bytes_needed(&self) -> usize {
        match self.state {
            State::ExpectFirst => 1,
            State::ExpectShortRest => 4,
            State::ExpectLengthPair => 2,
            State::ExpectStart2 => 1,
            State::ExpectHeader => 3,
            State::ExpectPayload => self.length as usize - 3,
            State::ExpectChecksum => 1,
            State::ExpectStop => 1,
            State::DoneAck | State::DoneLong | State::Error => 0,
        }
    }

    /// True once a frame has been fully validated and is ready for
    /// [`FrameDecoder::take_frame`].
    pub fn is_done(&self) -> bool {
        matches!(self.state, State::DoneAck | State::DoneLong)
    }

    fn fail(&mut self, err: ProtocolError) -> Result<(), MBusError> {
        let err = MBusError::Protocol(err);
        self.state = State::Error;
        Err(err)
    }

    fn check_allowed(&mut self, kind: FrameKindSet) -> Result<(), MBusError> {
        if !self.allowed_frame_kinds.contains(kind) {
            return self.fail(ProtocolError::UnexpectedFrameKind);
        }
        Ok(())
    }

    fn check_address(&mut self, actual: u8) -> Result<(), MBusError> {
        if let Some(expected) = self.expected_address {
            if expected.raw() != actual {
                return self.fail(ProtocolError::AddressMismatch {
                    expected: expected.raw(),
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Feeds exactly `bytes_needed()` bytes, validating inline and
    /// advancing the state machine. Any validation failure
    /// moves the machine to a terminal error state and is returned; the
    /// caller must discard this decoder and retry from the request.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), MBusError> {
        let needed = self.bytes_needed();
        if chunk.len() != needed {
            return self.fail(ProtocolError::LengthMismatch(chunk.len() as u8, needed as u8));
        }

        match self.state {
            State::ExpectFirst => match chunk[0] {
                crate::constants::MBUS_FRAME_ACK => {
                    self.check_allowed(FrameKindSet::ACK)?;
                    self.state = State::DoneAck;
                    Ok(())
                }
                crate::constants::MBUS_FRAME_START_SHORT => {
                    self.check_allowed(FrameKindSet::SHORT_CONTROL)?;
                    self.state = State::ExpectShortRest;
                    Ok(())
                }
                crate::constants::MBUS_FRAME_START_LONG => {
                    self.check_allowed(FrameKindSet::LONG)?;
                    self.state = State::ExpectLengthPair;
                    Ok(())
                }
                other => self.fail(ProtocolError::InvalidStartByte(other)),
            },

            State::ExpectShortRest => {
                let (control, address, chk, stop) = (chunk[0], chunk[1], chunk[2], chunk[3]);
                if stop != crate::constants::MBUS_FRAME_STOP {
                    return self.fail(ProtocolError::StopByteMissing(stop));
                }
                let calculated = checksum(&[control, address]);
                if calculated != chk {
                    return self.fail(ProtocolError::ChecksumMismatch {
                        expected: chk,
                        calculated,
                    });
                }
                self.check_address(address)?;
                self.control = control;
                self.address = address;
                // Reuses `DoneLong`/`ci` as the completion marker for a
                // ShortControl frame rather than adding a fourth terminal
                // state; `take_frame` tells the two apart via `self.ci`.
                self.ci = SHORT_CONTROL_MARKER;
                self.state = State::DoneLong;
                Ok(())
            }

            State::ExpectLengthPair => {
                let (l1, l2) = (chunk[0], chunk[1]);
                if l1 != l2 {
                    return self.fail(ProtocolError::LengthMismatch(l1, l2));
                }
                if l1 < 3 {
                    return self.fail(ProtocolError::LengthMismatch(l1, 3));
                }
                self.length = l1;
                self.state = State::ExpectStart2;
                Ok(())
            }

            State::ExpectStart2 => {
                if chunk[0] != crate::constants::MBUS_FRAME_START_LONG {
                    return self.fail(ProtocolError::InvalidStartByte(chunk[0]));
                }
                self.state = State::ExpectHeader;
                Ok(())
            }

            State::ExpectHeader => {
                let (control, address, ci) = (chunk[0], chunk[1], chunk[2]);
                self.check_address(address)?;
                self.control = control;
                self.address = address;
                self.ci = ci;
                self.state = if self.length == 3 {
                    State::ExpectChecksum
                } else {
                    State::ExpectPayload
                };
                Ok(())
            }

            State::ExpectPayload => {
                self.payload = chunk.to_vec();
                self.state = State::ExpectChecksum;
                Ok(())
            }

            State::ExpectChecksum => {
                let mut body = vec![self.control, self.address, self.ci];
                body.extend_from_slice(&self.payload);
                let calculated = checksum(&body);
                if calculated != chunk[0] {
                    return self.fail(ProtocolError::ChecksumMismatch {
                        expected: chunk[0],
                        calculated,
                    });
                }
                self.state = State::ExpectStop;
                Ok(())
            }

            State::ExpectStop => {
                if chunk[0] != crate::constants::MBUS_FRAME_STOP {
                    return self.fail(ProtocolError::StopByteMissing(chunk[0]));
                }
                self.state = State::DoneLong;
                Ok(())
            }

            State::DoneAck | State::DoneLong | State::Error => {
                self.fail(ProtocolError::UnexpectedFrameKind)
            }
        }
    }

    /// Consumes the machine and returns the decoded frame. For a `Long`
    /// frame whose CI indicates a variable data response, the DRH parser
    /// runs now, *after* full-frame validation, so a bad
    /// payload can never mask a checksum failure.
    ///
    /// Legal only when [`FrameDecoder::is_done`] is true.
    pub fn take_frame(self) -> Result<DecodedFrame, MBusError> {
        match self.state {
            State::DoneAck => Ok(DecodedFrame::Ack),
            State::DoneLong if self.ci == SHORT_CONTROL_MARKER => Ok(DecodedFrame::ShortControl {
                control: self.control,
                address: self.address,
            }),
            State::DoneLong => {
                let payload = match self.ci {
                    crate::constants::MBUS_CI_RESP_VARIABLE_LONG
                    | crate::constants::MBUS_CI_RESP_VARIABLE_SHORT => {
                        let has_identification = self.ci == crate::constants::MBUS_CI_RESP_VARIABLE_LONG;
                        let datagram =
                            crate::payload::datagram::parse_datagram(&self.payload, has_identification)?;
                        LongPayload::VariableData(datagram)
                    }
                    _ => LongPayload::Opaque(self.payload),
                };
                Ok(DecodedFrame::Long {
                    control: self.control,
                    address: self.address,
                    ci: self.ci,
                    payload,
                })
            }
            _ => Err(MBusError::Caller(
                "take_frame called before the decoder reached a terminal state".to_string(),
            )),
        }
    }
}

/// Sentinel stored in `ci` to distinguish a completed `ShortControl` from a
/// completed `Long` frame, since both land in `State::DoneLong` internally
/// to avoid a third terminal state variant for what is, by the time
/// `take_frame` runs, just a tagged-union discriminant.
const SHORT_CONTROL_MARKER: u8 = 0xFF;

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(decoder: &mut FrameDecoder, bytes: &[u8]) -> Result<(), MBusError> {
        let mut offset = 0;
        while !decoder.is_done() {
            let n = decoder.bytes_needed();
            assert!(n > 0, "bytes_needed() must be > 0 while not done");
            decoder.feed(&bytes[offset..offset + n])?;
            offset += n;
        }
        assert_eq!(offset, bytes.len());
        Ok(())
    }

    #[test]
    fn decodes_ack() {
        let mut decoder = FrameDecoder::new(None, FrameKindSet::ack_only());
        feed_all(&mut decoder, &[0xE5]).unwrap();
        assert_eq!(decoder.take_frame().unwrap(), DecodedFrame::Ack);
    }

    #[test]
    fn decodes_short_control_frame() {
        let mut decoder = FrameDecoder::new(Some(Address::new(5)), FrameKindSet::SHORT_CONTROL);
        feed_all(&mut decoder, &[0x10, 0x40, 0x05, 0x45, 0x16]).unwrap();
        assert_eq!(
            decoder.take_frame().unwrap(),
            DecodedFrame::ShortControl {
                control: 0x40,
                address: 5
            }
        );
    }

    #[test]
    fn rejects_short_control_checksum_mismatch() {
        let mut decoder = FrameDecoder::new(None, FrameKindSet::SHORT_CONTROL);
        let err = feed_all(&mut decoder, &[0x10, 0x40, 0x05, 0x00, 0x16]).unwrap_err();
        assert_eq!(
            err,
            MBusError::Protocol(ProtocolError::ChecksumMismatch {
                expected: 0x00,
                calculated: 0x45
            })
        );
    }

    #[test]
    fn decodes_long_frame_with_empty_payload() {
        let mut decoder = FrameDecoder::new(None, FrameKindSet::LONG);
        // L=3: C A CI, CI=0x51 (not a recognised variable-data CI -> opaque).
        let frame = [0x68, 0x03, 0x03, 0x68, 0x08, 0x01, 0x51, 0x5A, 0x16];
        feed_all(&mut decoder, &frame).unwrap();
        match decoder.take_frame().unwrap() {
            DecodedFrame::Long { control, address, ci, payload } => {
                assert_eq!((control, address, ci), (0x08, 0x01, 0x51));
                assert_eq!(payload, LongPayload::Opaque(vec![]));
            }
            other => panic!("expected Long, got {:?}", other),
        }
    }

    #[test]
    fn rejects_address_mismatch() {
        let mut decoder = FrameDecoder::new(Some(Address::new(9)), FrameKindSet::SHORT_CONTROL);
        let err = feed_all(&mut decoder, &[0x10, 0x40, 0x05, 0x45, 0x16]).unwrap_err();
        assert_eq!(
            err,
            MBusError::Protocol(ProtocolError::AddressMismatch {
                expected: 9,
                actual: 5
            })
        );
    }

    #[test]
    fn rejects_frame_kind_not_allowed() {
        let mut decoder = FrameDecoder::new(None, FrameKindSet::ack_only());
        let err = decoder.feed(&[0x10]).unwrap_err();
        assert_eq!(err, MBusError::Protocol(ProtocolError::UnexpectedFrameKind));
    }

    #[test]
    fn rejects_length_field_below_minimum() {
        let mut decoder = FrameDecoder::new(None, FrameKindSet::LONG);
        decoder.feed(&[0x68]).unwrap();
        let err = decoder.feed(&[0x02, 0x02]).unwrap_err();
        assert_eq!(err, MBusError::Protocol(ProtocolError::LengthMismatch(0x02, 3)));
    }

    #[test]
    fn bytes_needed_is_never_zero_while_not_done() {
        let mut decoder = FrameDecoder::new(None, FrameKindSet::LONG);
        let frame = [0x68, 0x04, 0x04, 0x68, 0x08, 0x01, 0x51, 0xAA, 0x5A, 0x16];
        let mut offset = 0;
        while !decoder.is_done() {
            let n = decoder.bytes_needed();
            assert_ne!(n, 0);
            decoder.feed(&frame[offset..offset + n]).unwrap();
            offset += n;
        }
    }
}
