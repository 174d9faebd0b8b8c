//! A queued-bytes [`Transport`] mock for the crate's integration tests,
//! generalized from the teacher's `mbus::serial_mock::MockSerialPort`
//! (which mocks `AsyncRead`/`AsyncWrite` for a concrete serial port) to the
//! abstract `Transport` trait this core actually drives.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mbus_core::error::MBusError;
use mbus_core::transport::Transport;

/// Bytes queued for one `read` call: either a chunk to hand back, or a
/// timeout (empty read) or a simulated disconnect.
enum QueuedRead {
    Chunk(Vec<u8>),
    Timeout,
    Disconnect,
}

#[derive(Default)]
struct Shared {
    reads: Mutex<VecDeque<QueuedRead>>,
    writes: Mutex<Vec<Vec<u8>>>,
    connected: Mutex<bool>,
}

/// A [`Transport`] backed by a queue of canned responses, recording every
/// write for assertion. Cheaply [`Clone`]: clones share the same queue and
/// write log, so a test can keep a handle after moving one clone into a
/// [`mbus_core::session::Session`].
#[derive(Clone)]
pub struct MockTransport {
    shared: Arc<Shared>,
}

impl MockTransport {
    pub fn new() -> Self {
        let shared = Shared {
            reads: Mutex::new(VecDeque::new()),
            writes: Mutex::new(Vec::new()),
            connected: Mutex::new(true),
        };
        MockTransport { shared: Arc::new(shared) }
    }

    /// Queues a chunk to be handed back verbatim by the next `read` call
    /// (its length must match whatever the decoder asks for at that point).
    pub fn queue_chunk(&self, bytes: Vec<u8>) {
        self.shared.reads.lock().unwrap().push_back(QueuedRead::Chunk(bytes));
    }

    /// Queues a single-byte `Ack` response.
    pub fn queue_ack(&self) {
        self.queue_chunk(vec![0xE5]);
    }

    /// Queues a short/control frame, pre-split into the decoder's chunk
    /// sizes (1 byte, then 4).
    pub fn queue_short_frame(&self, control: u8, address: u8) {
        let checksum = control.wrapping_add(address);
        self.queue_chunk(vec![0x10]);
        self.queue_chunk(vec![control, address, checksum, 0x16]);
    }

    /// Queues a long frame (C/A/CI + payload), pre-split into the decoder's
    /// chunk sizes: 1, 2, 1, 3, payload.len(), 1, 1.
    pub fn queue_long_frame(&self, control: u8, address: u8, ci: u8, payload: &[u8]) {
        let l = (3 + payload.len()) as u8;
        let mut body = vec![control, address, ci];
        body.extend_from_slice(payload);
        let checksum = body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));

        self.queue_chunk(vec![0x68]);
        self.queue_chunk(vec![l, l]);
        self.queue_chunk(vec![0x68]);
        self.queue_chunk(vec![control, address, ci]);
        if !payload.is_empty() {
            self.queue_chunk(payload.to_vec());
        }
        self.queue_chunk(vec![checksum]);
        self.queue_chunk(vec![0x16]);
    }

    /// Queues a single empty read: the next `transport.read` call times out.
    pub fn queue_timeout(&self) {
        self.shared.reads.lock().unwrap().push_back(QueuedRead::Timeout);
    }

    /// Queues a simulated disconnect on the next `read` call.
    pub fn queue_disconnect(&self) {
        self.shared.reads.lock().unwrap().push_back(QueuedRead::Disconnect);
    }

    /// Every byte sequence written so far, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.shared.writes.lock().unwrap().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), MBusError> {
        if !*self.shared.connected.lock().unwrap() {
            return Err(MBusError::Connection("mock transport disconnected".into()));
        }
        self.shared.writes.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }

    async fn read(&mut self, n: usize, _timeout: Duration) -> Result<Vec<u8>, MBusError> {
        let queued = self.shared.reads.lock().unwrap().pop_front();
        match queued {
            Some(QueuedRead::Chunk(chunk)) => {
                assert_eq!(chunk.len(), n, "mock queued a chunk of the wrong size for this read");
                Ok(chunk)
            }
            Some(QueuedRead::Timeout) => Ok(Vec::new()),
            Some(QueuedRead::Disconnect) => {
                *self.shared.connected.lock().unwrap() = false;
                Err(MBusError::Connection("mock transport disconnected".into()))
            }
            // An exhausted queue behaves like a timeout rather than
            // panicking, so tests can under-specify trailing reads.
            None => Ok(Vec::new()),
        }
    }

    fn is_connected(&self) -> bool {
        *self.shared.connected.lock().unwrap()
    }
}
