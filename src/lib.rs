//! # mbus-core — M-Bus (Meter-Bus) primary-master framing and session core
//!
//! Implements the wire-level and application-layer machinery specified by
//! EN 13757-2/-3:2018 for a primary master talking to one or more slaves
//! over a half-duplex serial segment:
//!
//! - [`frame`]: checksum/address primitives, the frame encoder
//!   ([`frame::encode`]), and the progressive frame decoder
//!   ([`frame::decode`]).
//! - [`payload`]: DIB/VIB parsing and value decoding (the Data Record
//!   Header), assembled into [`payload::Datagram`]s of [`payload::Record`]s.
//! - [`session`]: the request/response orchestrator — retry, timeout, and
//!   FCB/FCV datagram-sequencing policy — built on top of [`transport`].
//! - [`transport`]: the byte-transport trait a caller implements; no
//!   concrete serial/TCP implementation ships here.
//!
//! Byte transport implementations, a user-facing device API, persisted
//! configuration, and a CLI are all out of scope for this crate — it is the
//! protocol core a caller's application builds on top of.
//!
//! ## Usage
//!
//! ```no_run
//! use mbus_core::frame::Address;
//! use mbus_core::session::{Session, SessionConfig};
//! use mbus_core::transport::Transport;
//! # use async_trait::async_trait;
//! # use std::time::Duration;
//! # use mbus_core::error::MBusError;
//! # struct MyTransport;
//! # #[async_trait]
//! # impl Transport for MyTransport {
//! #     async fn write(&mut self, _bytes: &[u8]) -> Result<(), MBusError> { Ok(()) }
//! #     async fn read(&mut self, _n: usize, _timeout: Duration) -> Result<Vec<u8>, MBusError> { Ok(vec![]) }
//! #     fn is_connected(&self) -> bool { true }
//! # }
//!
//! # async fn example() -> Result<(), MBusError> {
//! let session = Session::new(MyTransport, SessionConfig::default());
//! let result = session.read_records(Address::new(5)).await?;
//! for record in &result.records {
//!     println!("{} {}", record.unit, record.quantity);
//! }
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod error;
pub mod frame;
pub mod logging;
pub mod payload;
pub mod session;
pub mod transport;
pub mod util;

pub use error::{MBusError, ProtocolError};
pub use frame::decode::{DecodedFrame, FrameDecoder, LongPayload};
pub use frame::{Address, FrameKindSet};
pub use logging::init_logger;
pub use payload::{DecodedValue, Datagram, Identification, Record, Status};
pub use session::{ReadResult, Session, SessionConfig};
pub use transport::Transport;
