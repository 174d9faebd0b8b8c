//! # M-Bus Error Handling
//!
//! This module defines the closed error taxonomy used throughout the crate:
//! connection failures, timeouts, protocol-level decode failures, and
//! caller-argument errors. See the docs on [`MBusError`] for the retry
//! policy each variant implies at the session layer.

use thiserror::Error;

/// Top-level error type returned by every fallible operation in this crate.
///
/// The session orchestrator classifies these for retry purposes (see
/// [`crate::session::Session`]): [`MBusError::Connection`] and
/// [`MBusError::Caller`] are surfaced immediately, while
/// [`MBusError::Timeout`] and [`MBusError::Protocol`] are retried up to
/// `max_retries` times.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MBusError {
    /// The transport reported that the underlying connection is gone.
    /// Never retried by the session.
    #[error("transport disconnected: {0}")]
    Connection(String),

    /// `transport.read` returned an empty byte sequence while the decoder
    /// was still expecting bytes. Retried up to `max_retries`.
    #[error("timeout waiting for bytes in decoder state {state}")]
    Timeout {
        /// Human-readable name of the decoder state that was awaiting bytes.
        state: String,
    },

    /// A frame or payload failed one of the protocol invariants.
    /// Retried up to `max_retries`.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An invalid argument was passed to an encoder or session entry point
    /// (e.g. an out-of-range address, a payload too long to encode). Never
    /// retried: retrying would just resend the same invalid request.
    #[error("invalid argument: {0}")]
    Caller(String),
}

/// The closed set of protocol-level validation failures.
///
/// Each variant names the exact invariant that failed so a caller (or a
/// test) can assert on cause, not just "some parse error occurred".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The first byte of a frame was not one of `{0xE5, 0x10, 0x68}`.
    #[error("invalid start byte: 0x{0:02X}")]
    InvalidStartByte(u8),

    /// The two length bytes of a long frame's header did not match.
    #[error("length fields do not match: 0x{0:02X} vs 0x{1:02X}")]
    LengthMismatch(u8, u8),

    /// The computed checksum did not equal the checksum byte on the wire.
    #[error("checksum mismatch: expected 0x{expected:02X}, calculated 0x{calculated:02X}")]
    ChecksumMismatch {
        /// Checksum byte found on the wire.
        expected: u8,
        /// Checksum computed from the frame body.
        calculated: u8,
    },

    /// The final byte of a frame was not `0x16`.
    #[error("stop byte missing: got 0x{0:02X}")]
    StopByteMissing(u8),

    /// A frame of a kind not in the decoder's `allowed_frame_kinds` set
    /// was received.
    #[error("frame kind not permitted in this context")]
    UnexpectedFrameKind,

    /// The A-field of an incoming frame did not match the session's
    /// expected address.
    #[error("address mismatch: expected {expected}, got {actual}")]
    AddressMismatch {
        /// Address the decoder was constructed to expect.
        expected: u8,
        /// Address actually present on the wire.
        actual: u8,
    },

    /// A DIB's DIFE chain exceeded the 10-byte cap.
    #[error("DIFE chain exceeds the 10-byte cap")]
    DifeChainTooLong,

    /// A VIB's VIFE chain exceeded the 10-byte cap.
    #[error("VIFE chain exceeds the 10-byte cap")]
    VifeChainTooLong,

    /// No table entry (primary, nor either extension table) matched a VIF
    /// or VIFE code, even after following extension pointers.
    #[error("unknown VIF code 0x{code:02X} ({path})")]
    UnknownVif {
        /// The unresolved code.
        code: u8,
        /// Which table chain was being searched (e.g. "primary", "FB
        /// extension", "FD extension", "orthogonal") when the lookup
        /// failed; "dif" for a DIF=0x7F global-readout marker rejected
        /// outside a request.
        path: &'static str,
    },

    /// A record's declared data length extends past the end of the
    /// payload.
    #[error("declared data length extends past the end of the payload")]
    PayloadTruncated,

    /// A BCD nibble was not a decimal digit in a field that is not
    /// documented as error-bearing.
    #[error("invalid BCD nibble")]
    InvalidBcd,

    /// A decoded date or date-time field had an out-of-range component.
    #[error("invalid date/time field")]
    InvalidDateTime,

    /// A long frame's CI-field did not identify a variable-data response
    /// in a context that required one.
    #[error("unrecognised CI code: 0x{0:02X}")]
    UnknownCI(u8),
}

impl MBusError {
    /// True for errors the session should retry (timeouts and protocol
    /// errors); false for errors that must be surfaced immediately
    /// (connection loss, caller mistakes).
    pub fn is_retryable(&self) -> bool {
        matches!(self, MBusError::Timeout { .. } | MBusError::Protocol(_))
    }
}
