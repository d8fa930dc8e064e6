//! HTTP/2 connection core
//!
//! This crate implements the connection state machine of an HTTP/2 endpoint:
//! the layer between a raw byte duplex and a set of per-stream message
//! queues. It enforces the framing, header-compression, flow-control, and
//! lifecycle rules of RFC 7540 and is symmetric - the same machinery drives
//! client and server connections, differing only in preface handling,
//! stream-ID parity, and whether server push is permitted.
//!
//! # Architecture
//!
//! - **Frame codec** ([`codec`], [`frames`]): all ten frame types, parsed
//!   and serialized against the negotiated `MAX_FRAME_SIZE`.
//! - **HPACK context** ([`hpack`]): one encoder/decoder pair per connection,
//!   fed every header block in wire order.
//! - **Flow control** ([`flow_control`]): connection and stream windows;
//!   the send side gates queued DATA, the receive side auto-replenishes.
//! - **Defragmentation** ([`defrag`]): HEADERS / PUSH_PROMISE +
//!   CONTINUATION reassembly.
//! - **Settings** ([`settings`]): the acknowledged and peer views, with the
//!   FIFO of in-flight local proposals.
//! - **Streams** ([`stream`]): per-stream RFC 7540 state machines and the
//!   registry that allocates IDs and routes frames.
//! - **Controller** ([`connection`]): owns all of the above and the
//!   dispatch, shutdown, and ping protocols.
//!
//! The TLS/TCP transport, ALPN, and HTTP semantics (methods, statuses,
//! routing) live outside this crate; the only transport contract is the
//! [`Duplex`] trait.
//!
//! # Example
//!
//! ```no_run
//! use h2core::{H2Connection, MemoryDuplex};
//! use bytes::Bytes;
//!
//! # fn main() -> Result<(), h2core::Error> {
//! let duplex = MemoryDuplex::new();
//! let mut conn = H2Connection::client(duplex)?;
//!
//! // Pump the peer's SETTINGS; the connection becomes operational.
//! conn.process_next_frame()?;
//!
//! let headers = vec![
//!     (Bytes::from_static(b":method"), Bytes::from_static(b"GET")),
//!     (Bytes::from_static(b":path"), Bytes::from_static(b"/")),
//!     (Bytes::from_static(b":scheme"), Bytes::from_static(b"https")),
//!     (Bytes::from_static(b":authority"), Bytes::from_static(b"example.com")),
//! ];
//! let stream = conn.open_stream(&headers, false)?;
//! conn.send_data(stream, Bytes::from_static(b"hello"), true)?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod connection;
pub mod defrag;
pub mod duplex;
pub mod error;
pub mod flow_control;
pub mod frames;
pub mod hpack;
pub mod ping;
pub mod settings;
pub mod stream;

pub use codec::FrameCodec;
pub use connection::{ClientOptions, ConnectionState, H2Connection, Role};
pub use defrag::HeaderDefragmenter;
pub use duplex::{Duplex, MemoryDuplex};
pub use error::{Error, ErrorCode, Result};
pub use flow_control::{ConnectionFlowControl, FlowControlWindow};
pub use frames::{Frame, FrameFlags, FrameType};
pub use hpack::{Header, HpackContext};
pub use ping::{PingId, PingState};
pub use settings::{Settings, SettingsBuilder, SettingsChangeId};
pub use stream::{H2Stream, StreamId, StreamMessage, StreamState};

/// HTTP/2 connection preface that must be sent by clients
///
/// From RFC 7540 Section 3.5:
/// "PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n"
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Default initial window size (65535 bytes)
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65535;

/// Default maximum frame size (16384 bytes)
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16384;

/// Default header table size (4096 bytes)
pub const DEFAULT_HEADER_TABLE_SIZE: u32 = 4096;

/// Maximum stream ID value (2^31 - 1)
pub const MAX_STREAM_ID: u32 = 0x7FFF_FFFF;

/// Stream ID 0 (connection-level)
pub const CONNECTION_STREAM_ID: u32 = 0;
