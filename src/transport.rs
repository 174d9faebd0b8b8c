//! The byte transport contract the core requires of its external
//! collaborator (spec §1 "Out of scope", §6 "External interfaces").
//!
//! No concrete serial/TCP/RFC2217 implementation ships in this crate — only
//! the trait the session orchestrator drives. A caller wires up its own
//! transport (serial port, TCP socket, tunnel) against this trait.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::MBusError;

/// A byte-oriented, half-duplex transport to a single M-Bus segment.
///
/// Implementations suspend inside [`Transport::write`] and [`Transport::read`]
/// and nowhere else; the session treats these as the only yield points in an
/// otherwise synchronous request/response cycle (spec §5 "Concurrency &
/// resource model").
#[async_trait]
pub trait Transport: Send {
    /// Writes `bytes` in full, suspending until flushed.
    ///
    /// Errors only on disconnect ([`MBusError::Connection`]); a transport
    /// that accepted fewer bytes than requested without erroring would
    /// violate this contract.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), MBusError>;

    /// Reads exactly `n` bytes, suspending up to `timeout`.
    ///
    /// Returns the `n` bytes on success, or an empty vector if `timeout`
    /// elapses before `n` bytes are available. Timeouts are the only way
    /// the core observes "no response"; it never measures wall-clock time
    /// itself (spec §5 "Timeouts"). Errors only on disconnect.
    async fn read(&mut self, n: usize, timeout: Duration) -> Result<Vec<u8>, MBusError>;

    /// Whether the underlying connection is still believed open.
    fn is_connected(&self) -> bool;
}
