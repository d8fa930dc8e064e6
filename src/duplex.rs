//! Byte duplex abstraction
//!
//! The connection core sits on top of any bidirectional byte transport:
//! plain TCP, a TLS session, or an in-memory pipe. The trait is the whole
//! contract; TLS setup and ALPN negotiation happen outside the core.

use std::collections::VecDeque;
use std::io;

/// A bidirectional byte transport.
///
/// The inbound side is a non-restartable byte sequence, finite on EOF
/// (`recv` returning 0). The outbound side accepts chunks and a close
/// signal; a send failing while the connection is live is a transport error.
pub trait Duplex {
    /// Read available inbound bytes into `buf`. Returns 0 on EOF.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `buf` to the outbound side.
    fn send(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Close the outbound side.
    fn close(&mut self) -> io::Result<()>;
}

/// In-memory duplex for tests and loopback use.
///
/// The inbound side is scripted by pushing peer bytes; everything the
/// connection sends accumulates on the outbound side for inspection.
#[derive(Debug, Default)]
pub struct MemoryDuplex {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    eof: bool,
    closed: bool,
}

impl MemoryDuplex {
    /// Create an empty duplex
    pub fn new() -> Self {
        Self::default()
    }

    /// Script bytes that the peer "sent" to us
    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Mark the inbound side as finished (peer EOF)
    pub fn set_eof(&mut self) {
        self.eof = true;
    }

    /// Take everything written outbound so far
    pub fn take_outbound(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }

    /// Whether the outbound side has been closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Unconsumed inbound bytes
    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }
}

impl Duplex for MemoryDuplex {
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.inbound.is_empty() {
            if self.eof {
                return Ok(0);
            }
            // A scripted duplex never blocks; running dry without EOF means
            // the test asked for more than it queued.
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "no scripted inbound bytes",
            ));
        }
        let n = buf.len().min(self.inbound.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.inbound.pop_front().expect("length checked");
        }
        Ok(n)
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "outbound side closed",
            ));
        }
        self.outbound.extend_from_slice(buf);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}
