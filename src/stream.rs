//! Stream state machines and the stream registry
//!
//! Each stream runs the RFC 7540 Section 5.1 state machine, owns its
//! flow-control windows, and carries two queues: inbound messages for the
//! HTTP layer and outbound DATA waiting for window credit. The registry owns
//! all streams, allocates IDs with role-correct parity, and classifies
//! inbound stream IDs so the dispatcher can tell new, closed, and illegal
//! ones apart.

use super::error::{Error, ErrorCode, Result};
use super::flow_control::FlowControlWindow;
use super::frames::PrioritySpec;
use super::hpack::Header;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};

/// Stream ID type
pub type StreamId = u32;

/// Stream state as defined in RFC 7540 Section 5.1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No frames have been sent or received
    Idle,
    /// PUSH_PROMISE sent; we will open this stream
    ReservedLocal,
    /// PUSH_PROMISE received; the peer will open this stream
    ReservedRemote,
    /// Both sides may send
    Open,
    /// We have finished sending; the peer may still send
    HalfClosedLocal,
    /// The peer has finished sending; we may still send
    HalfClosedRemote,
    /// Terminal
    Closed,
}

impl StreamState {
    /// Check if stream can send data
    pub fn can_send(&self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedRemote)
    }

    /// Check if stream can receive data
    pub fn can_receive(&self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedLocal)
    }

    /// Check if stream is closed
    pub fn is_closed(&self) -> bool {
        matches!(self, StreamState::Closed)
    }
}

/// A message delivered to (or accepted from) the HTTP layer.
///
/// Every message carries an explicit end-stream flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    /// Initial header list
    Headers {
        headers: Vec<Header>,
        end_stream: bool,
    },
    /// Body bytes
    Data { data: Bytes, end_stream: bool },
    /// Trailing header list
    Trailers {
        headers: Vec<Header>,
        end_stream: bool,
    },
    /// Peer reset the stream
    Reset { error_code: ErrorCode },
}

/// Outbound DATA waiting for window credit
#[derive(Debug)]
struct PendingData {
    data: Bytes,
    end_stream: bool,
}

/// A single HTTP/2 stream
#[derive(Debug)]
pub struct H2Stream {
    id: StreamId,
    state: StreamState,
    send_window: FlowControlWindow,
    recv_window: FlowControlWindow,
    inbound: VecDeque<StreamMessage>,
    pending_out: VecDeque<PendingData>,
    headers_received: bool,
    priority: Option<PrioritySpec>,
}

impl H2Stream {
    /// Create a stream with windows seeded from the current settings views
    pub fn new(id: StreamId, send_size: u32, recv_size: u32) -> Self {
        H2Stream {
            id,
            state: StreamState::Idle,
            send_window: FlowControlWindow::with_initial_size(send_size),
            recv_window: FlowControlWindow::with_initial_size(recv_size),
            inbound: VecDeque::new(),
            pending_out: VecDeque::new(),
            headers_received: false,
            priority: None,
        }
    }

    /// Get stream ID
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Get stream state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Get send window
    pub fn send_window(&self) -> &FlowControlWindow {
        &self.send_window
    }

    /// Get recv window
    pub fn recv_window(&self) -> &FlowControlWindow {
        &self.recv_window
    }

    /// Stored priority, if the peer sent one
    pub fn priority(&self) -> Option<&PrioritySpec> {
        self.priority.as_ref()
    }

    /// Record peer-advised priority (acknowledged, not acted upon)
    pub fn set_priority(&mut self, priority: PrioritySpec) {
        self.priority = Some(priority);
    }

    /// Next inbound message for the HTTP layer
    pub fn next_message(&mut self) -> Option<StreamMessage> {
        self.inbound.pop_front()
    }

    /// Inbound messages waiting to be consumed
    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    /// Process an inbound header list (initial headers or trailers).
    pub fn recv_headers(&mut self, headers: Vec<Header>, end_stream: bool) -> Result<()> {
        match self.state {
            StreamState::Idle => {
                self.state = if end_stream {
                    StreamState::HalfClosedRemote
                } else {
                    StreamState::Open
                };
            }
            StreamState::ReservedRemote => {
                self.state = if end_stream {
                    StreamState::Closed
                } else {
                    StreamState::HalfClosedLocal
                };
            }
            StreamState::Open | StreamState::HalfClosedLocal => {
                if end_stream {
                    self.close_remote();
                }
            }
            _ => {
                return Err(Error::StreamClosed(self.id));
            }
        }

        let message = if self.headers_received {
            StreamMessage::Trailers {
                headers,
                end_stream,
            }
        } else {
            self.headers_received = true;
            StreamMessage::Headers {
                headers,
                end_stream,
            }
        };
        self.inbound.push_back(message);
        Ok(())
    }

    /// Process inbound DATA.
    ///
    /// `flow_len` is the wire payload length including padding; the stream
    /// receive window is charged with it before the data is queued.
    pub fn recv_data(&mut self, data: Bytes, flow_len: usize, end_stream: bool) -> Result<()> {
        if !self.state.can_receive() {
            return Err(Error::StreamClosed(self.id));
        }

        self.recv_window.charge(flow_len)?;
        self.inbound.push_back(StreamMessage::Data { data, end_stream });

        if end_stream {
            self.close_remote();
        }
        Ok(())
    }

    /// Deliver the request headers carried by a PUSH_PROMISE.
    ///
    /// Leaves the initial-headers marker unset: the peer's eventual response
    /// HEADERS on this stream still deliver as `Headers`, not `Trailers`.
    pub fn recv_push_promise(&mut self, headers: Vec<Header>) {
        self.inbound.push_back(StreamMessage::Headers {
            headers,
            end_stream: false,
        });
    }

    /// Process an inbound RST_STREAM.
    pub fn recv_reset(&mut self, error_code: ErrorCode) {
        self.inbound.push_back(StreamMessage::Reset { error_code });
        self.state = StreamState::Closed;
        self.pending_out.clear();
    }

    /// Add send credit from a stream-level WINDOW_UPDATE.
    pub fn recv_window_update(&mut self, increment: u32) -> Result<i64> {
        self.send_window.increase(increment)
    }

    /// Replenish the receive window if consumption crossed the threshold.
    pub fn replenish_recv(&mut self) -> Option<u32> {
        let initial = self.recv_window.initial_size() as i64;
        if self.recv_window.size() >= initial - initial / 2 {
            return None;
        }
        let increment = self.recv_window.deficit();
        if increment == 0 {
            return None;
        }
        self.recv_window
            .increase(increment)
            .expect("replenish within initial size");
        Some(increment)
    }

    /// Transition for locally sent headers.
    pub fn send_headers(&mut self, end_stream: bool) -> Result<()> {
        match self.state {
            StreamState::Idle => {
                self.state = if end_stream {
                    StreamState::HalfClosedLocal
                } else {
                    StreamState::Open
                };
            }
            StreamState::ReservedLocal => {
                self.state = StreamState::HalfClosedRemote;
            }
            StreamState::Open | StreamState::HalfClosedRemote => {
                if end_stream {
                    self.close_local();
                }
            }
            _ => {
                return Err(Error::StreamClosed(self.id));
            }
        }
        Ok(())
    }

    /// Queue outbound DATA; the connection drains it as windows allow.
    pub fn queue_data(&mut self, data: Bytes, end_stream: bool) -> Result<()> {
        if !self.state.can_send() {
            return Err(Error::StreamClosed(self.id));
        }
        self.pending_out.push_back(PendingData { data, end_stream });
        Ok(())
    }

    /// Whether outbound DATA is waiting for credit
    pub fn has_pending_out(&self) -> bool {
        !self.pending_out.is_empty()
    }

    /// Octets queued outbound
    pub fn pending_out_len(&self) -> usize {
        self.pending_out.iter().map(|p| p.data.len()).sum()
    }

    /// Carve the next outbound chunk of at most `max` octets.
    ///
    /// Spends the stream send window and returns the chunk with its
    /// end-stream flag (set only when the chunk exhausts a final queued
    /// message). Returns `None` when nothing can be sent.
    pub fn take_chunk(&mut self, max: usize) -> Result<Option<(Bytes, bool)>> {
        let budget = max.min(self.send_window.available());
        let front = match self.pending_out.front_mut() {
            Some(front) => front,
            None => return Ok(None),
        };
        // An empty DATA message (bare END_STREAM) costs no credit.
        if budget == 0 && !front.data.is_empty() {
            return Ok(None);
        }

        let take = front.data.len().min(budget);
        let chunk = front.data.split_to(take);
        let end_stream = if front.data.is_empty() {
            let end = front.end_stream;
            self.pending_out.pop_front();
            end
        } else {
            false
        };

        self.send_window.consume(chunk.len())?;
        if end_stream {
            self.close_local();
        }
        Ok(Some((chunk, end_stream)))
    }

    /// Close the stream outright (local RST or connection teardown).
    pub fn close(&mut self) {
        self.state = StreamState::Closed;
        self.pending_out.clear();
    }

    fn close_local(&mut self) {
        self.state = match self.state {
            StreamState::Open => StreamState::HalfClosedLocal,
            StreamState::HalfClosedRemote => StreamState::Closed,
            other => other,
        };
    }

    fn close_remote(&mut self) {
        self.state = match self.state {
            StreamState::Open => StreamState::HalfClosedRemote,
            StreamState::HalfClosedLocal => StreamState::Closed,
            other => other,
        };
    }
}

/// How an inbound stream ID relates to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamIdClass {
    /// Stream exists in the registry
    Existing,
    /// Peer-initiated ID above everything seen: may open a stream
    NewPeer,
    /// Was open once, now freed: closed
    ClosedGone,
    /// ID that nothing could legally have opened
    Idle,
}

/// Stream registry
///
/// Owns all streams of one connection.
#[derive(Debug)]
pub struct StreamManager {
    streams: HashMap<StreamId, H2Stream>,
    is_client: bool,
    /// Next stream ID we may allocate (client: odd, server: even)
    next_local_id: StreamId,
    /// Highest peer-initiated ID ever observed (for GOAWAY)
    highest_peer_id: StreamId,
    /// Peer's MAX_CONCURRENT_STREAMS, bounding local creation
    peer_max_concurrent: Option<u32>,
    /// Our advertised MAX_CONCURRENT_STREAMS, bounding peer creation
    local_max_concurrent: Option<u32>,
    /// Seed for new streams' send windows (peer INITIAL_WINDOW_SIZE)
    initial_send_window: u32,
    /// Seed for new streams' recv windows (our INITIAL_WINDOW_SIZE)
    initial_recv_window: u32,
}

impl StreamManager {
    /// Create a registry.
    ///
    /// `is_client` decides ID parity: clients allocate odd IDs, servers even.
    pub fn new(is_client: bool) -> Self {
        StreamManager {
            streams: HashMap::new(),
            is_client,
            next_local_id: if is_client { 1 } else { 2 },
            highest_peer_id: 0,
            peer_max_concurrent: None,
            local_max_concurrent: None,
            initial_send_window: crate::DEFAULT_INITIAL_WINDOW_SIZE,
            initial_recv_window: crate::DEFAULT_INITIAL_WINDOW_SIZE,
        }
    }

    /// Bound local stream creation (peer's advertisement)
    pub fn set_peer_max_concurrent(&mut self, max: Option<u32>) {
        self.peer_max_concurrent = max;
    }

    /// Bound peer stream creation (our advertisement)
    pub fn set_local_max_concurrent(&mut self, max: Option<u32>) {
        self.local_max_concurrent = max;
    }

    /// Seed for future streams' send windows
    pub fn set_initial_send_window(&mut self, size: u32) {
        self.initial_send_window = size;
    }

    /// Seed for future streams' recv windows
    pub fn set_initial_recv_window(&mut self, size: u32) {
        self.initial_recv_window = size;
    }

    /// Highest peer-initiated stream ID observed
    pub fn highest_peer_id(&self) -> StreamId {
        self.highest_peer_id
    }

    /// True when `id` has the parity of locally initiated streams
    pub fn is_local_id(&self, id: StreamId) -> bool {
        (id % 2 == 1) == self.is_client
    }

    /// Classify an inbound stream ID.
    ///
    /// `can_open` says whether the carrying frame is one that may create a
    /// stream (HEADERS from the peer).
    pub fn classify(&self, id: StreamId, can_open: bool) -> StreamIdClass {
        if self.streams.contains_key(&id) {
            return StreamIdClass::Existing;
        }
        if self.is_local_id(id) {
            // We never allocated it, or we did and it is gone.
            if id >= self.next_local_id {
                return StreamIdClass::Idle;
            }
            return StreamIdClass::ClosedGone;
        }
        if id > self.highest_peer_id {
            if can_open {
                return StreamIdClass::NewPeer;
            }
            return StreamIdClass::Idle;
        }
        StreamIdClass::ClosedGone
    }

    /// Allocate and open a locally initiated stream.
    pub fn open_local(&mut self) -> Result<StreamId> {
        if let Some(max) = self.peer_max_concurrent {
            if self.active_local_count() >= max as usize {
                return Err(Error::TooManyStreams);
            }
        }
        if self.next_local_id > 0x7FFF_FFFF {
            return Err(Error::InvalidStreamId(self.next_local_id));
        }

        let id = self.next_local_id;
        self.next_local_id += 2;
        self.streams.insert(
            id,
            H2Stream::new(id, self.initial_send_window, self.initial_recv_window),
        );
        Ok(id)
    }

    /// Open a peer-initiated stream.
    ///
    /// The caller has classified `id` as `NewPeer`. Exceeding our advertised
    /// concurrency bound refuses the stream rather than killing the
    /// connection.
    pub fn open_peer(&mut self, id: StreamId) -> Result<()> {
        // Even a refused ID is the highest we have seen.
        self.highest_peer_id = id;
        if let Some(max) = self.local_max_concurrent {
            if self.active_peer_count() >= max as usize {
                return Err(Error::RefusedStream(id));
            }
        }
        self.streams.insert(
            id,
            H2Stream::new(id, self.initial_send_window, self.initial_recv_window),
        );
        Ok(())
    }

    /// Record a peer-initiated ID observed but not opened (refused stream or
    /// push promise), so ordering checks keep working.
    pub fn note_peer_id(&mut self, id: StreamId) {
        if id > self.highest_peer_id {
            self.highest_peer_id = id;
        }
    }

    /// Reserve a peer-promised stream (client receiving PUSH_PROMISE).
    pub fn reserve_peer(&mut self, promised_id: StreamId) {
        let mut stream = H2Stream::new(
            promised_id,
            self.initial_send_window,
            self.initial_recv_window,
        );
        stream.state = StreamState::ReservedRemote;
        self.streams.insert(promised_id, stream);
    }

    /// Get a stream by ID
    pub fn get(&self, id: StreamId) -> Option<&H2Stream> {
        self.streams.get(&id)
    }

    /// Get a mutable stream by ID
    pub fn get_mut(&mut self, id: StreamId) -> Option<&mut H2Stream> {
        self.streams.get_mut(&id)
    }

    /// Apply a retroactive send-window delta to every open stream
    /// (peer INITIAL_WINDOW_SIZE change).
    pub fn apply_send_window_delta(&mut self, delta: i64) -> Result<()> {
        for stream in self.streams.values_mut() {
            if !stream.state().is_closed() {
                stream.send_window.apply_delta(delta)?;
            }
        }
        Ok(())
    }

    /// Apply a retroactive recv-window delta to every open stream
    /// (our INITIAL_WINDOW_SIZE change, acknowledged).
    pub fn apply_recv_window_delta(&mut self, delta: i64) -> Result<()> {
        for stream in self.streams.values_mut() {
            if !stream.state().is_closed() {
                stream.recv_window.apply_delta(delta)?;
            }
        }
        Ok(())
    }

    /// Stream IDs with queued outbound DATA, in ID order
    pub fn ids_with_pending_out(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self
            .streams
            .iter()
            .filter(|(_, s)| s.has_pending_out())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// All stream IDs currently in the registry
    pub fn ids(&self) -> Vec<StreamId> {
        self.streams.keys().copied().collect()
    }

    /// Number of non-closed streams
    pub fn active_count(&self) -> usize {
        self.streams
            .values()
            .filter(|s| !s.state().is_closed())
            .count()
    }

    fn active_local_count(&self) -> usize {
        self.streams
            .iter()
            .filter(|(id, s)| self.is_local_id(**id) && !s.state().is_closed())
            .count()
    }

    fn active_peer_count(&self) -> usize {
        self.streams
            .iter()
            .filter(|(id, s)| !self.is_local_id(**id) && !s.state().is_closed())
            .count()
    }

    /// Close every stream (connection teardown)
    pub fn close_all(&mut self) {
        for stream in self.streams.values_mut() {
            stream.close();
        }
    }

    /// Release terminal streams whose queues have drained.
    ///
    /// Their IDs stay burned: `classify` reports them as closed afterwards.
    pub fn reap_closed(&mut self) {
        self.streams.retain(|_, stream| {
            !(stream.state().is_closed() && stream.inbound_len() == 0 && !stream.has_pending_out())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_stream(id: StreamId) -> H2Stream {
        let mut stream = H2Stream::new(id, 65535, 65535);
        stream.send_headers(false).unwrap();
        stream
    }

    #[test]
    fn test_stream_state_transitions_send() {
        let mut stream = H2Stream::new(1, 65535, 65535);
        assert_eq!(stream.state(), StreamState::Idle);

        stream.send_headers(false).unwrap();
        assert_eq!(stream.state(), StreamState::Open);

        stream.queue_data(Bytes::from_static(b"hello"), true).unwrap();
        let (chunk, end) = stream.take_chunk(16384).unwrap().unwrap();
        assert_eq!(&chunk[..], b"hello");
        assert!(end);
        assert_eq!(stream.state(), StreamState::HalfClosedLocal);
    }

    #[test]
    fn test_stream_recv_headers_then_data() {
        let mut stream = H2Stream::new(1, 65535, 65535);

        stream.recv_headers(vec![], false).unwrap();
        assert_eq!(stream.state(), StreamState::Open);
        assert!(matches!(
            stream.next_message(),
            Some(StreamMessage::Headers { end_stream: false, .. })
        ));

        stream.recv_data(Bytes::from_static(b"body"), 4, true).unwrap();
        assert_eq!(stream.state(), StreamState::HalfClosedRemote);
        assert!(matches!(
            stream.next_message(),
            Some(StreamMessage::Data { end_stream: true, .. })
        ));
    }

    #[test]
    fn test_stream_trailers_after_headers() {
        let mut stream = H2Stream::new(1, 65535, 65535);
        stream.recv_headers(vec![], false).unwrap();
        stream.next_message();

        stream.recv_headers(vec![], true).unwrap();
        assert!(matches!(
            stream.next_message(),
            Some(StreamMessage::Trailers { end_stream: true, .. })
        ));
        assert_eq!(stream.state(), StreamState::HalfClosedRemote);
    }

    #[test]
    fn test_stream_data_in_wrong_state() {
        let mut stream = H2Stream::new(1, 65535, 65535);
        let err = stream
            .recv_data(Bytes::from_static(b"x"), 1, false)
            .unwrap_err();
        assert!(matches!(err, Error::StreamClosed(1)));
    }

    #[test]
    fn test_stream_recv_window_overrun() {
        let mut stream = H2Stream::new(1, 65535, 4);
        stream.recv_headers(vec![], false).unwrap();

        let err = stream
            .recv_data(Bytes::from_static(b"12345"), 5, false)
            .unwrap_err();
        assert!(matches!(err, Error::FlowControl(_)));
    }

    #[test]
    fn test_take_chunk_respects_window() {
        let mut stream = open_stream(1);
        stream.send_window.consume(65535 - 3).unwrap();

        stream.queue_data(Bytes::from_static(b"hello"), true).unwrap();
        let (chunk, end) = stream.take_chunk(16384).unwrap().unwrap();
        assert_eq!(&chunk[..], b"hel");
        assert!(!end);

        // Window exhausted: nothing more moves.
        assert!(stream.take_chunk(16384).unwrap().is_none());
        assert_eq!(stream.pending_out_len(), 2);

        stream.recv_window_update(10).unwrap();
        let (chunk, end) = stream.take_chunk(16384).unwrap().unwrap();
        assert_eq!(&chunk[..], b"lo");
        assert!(end);
        assert_eq!(stream.state(), StreamState::HalfClosedLocal);
    }

    #[test]
    fn test_empty_end_stream_chunk_needs_no_credit() {
        let mut stream = open_stream(1);
        stream.send_window.consume(65535).unwrap();

        stream.queue_data(Bytes::new(), true).unwrap();
        let (chunk, end) = stream.take_chunk(16384).unwrap().unwrap();
        assert!(chunk.is_empty());
        assert!(end);
    }

    #[test]
    fn test_stream_reset() {
        let mut stream = open_stream(1);
        stream.queue_data(Bytes::from_static(b"x"), false).unwrap();

        stream.recv_reset(ErrorCode::Cancel);
        assert_eq!(stream.state(), StreamState::Closed);
        assert!(!stream.has_pending_out());
        assert!(matches!(
            stream.next_message(),
            Some(StreamMessage::Reset { error_code: ErrorCode::Cancel })
        ));
    }

    #[test]
    fn test_manager_client_allocation() {
        let mut manager = StreamManager::new(true);
        assert_eq!(manager.open_local().unwrap(), 1);
        assert_eq!(manager.open_local().unwrap(), 3);
        assert_eq!(manager.open_local().unwrap(), 5);
        assert_eq!(manager.active_count(), 3);
    }

    #[test]
    fn test_manager_server_allocation() {
        let mut manager = StreamManager::new(false);
        assert_eq!(manager.open_local().unwrap(), 2);
        assert_eq!(manager.open_local().unwrap(), 4);
    }

    #[test]
    fn test_manager_peer_concurrency_bound() {
        let mut manager = StreamManager::new(true);
        manager.set_peer_max_concurrent(Some(2));

        manager.open_local().unwrap();
        manager.open_local().unwrap();
        assert!(matches!(manager.open_local(), Err(Error::TooManyStreams)));
    }

    #[test]
    fn test_manager_classify() {
        let mut manager = StreamManager::new(false); // server: peer ids are odd

        assert_eq!(manager.classify(1, true), StreamIdClass::NewPeer);
        assert_eq!(manager.classify(1, false), StreamIdClass::Idle);

        manager.open_peer(5).unwrap();
        manager.get_mut(5).unwrap().recv_headers(vec![], false).unwrap();
        assert_eq!(manager.classify(5, false), StreamIdClass::Existing);
        assert_eq!(manager.highest_peer_id(), 5);

        // Lower odd ID never opened: closed as far as ordering goes.
        assert_eq!(manager.classify(3, true), StreamIdClass::ClosedGone);

        // Even IDs are ours; none allocated yet.
        assert_eq!(manager.classify(2, false), StreamIdClass::Idle);
        let id = manager.open_local().unwrap();
        assert_eq!(manager.classify(id, false), StreamIdClass::Existing);
    }

    #[test]
    fn test_manager_refuses_peer_above_bound() {
        let mut manager = StreamManager::new(false);
        manager.set_local_max_concurrent(Some(1));

        manager.open_peer(1).unwrap();
        let err = manager.open_peer(3).unwrap_err();
        assert!(matches!(err, Error::RefusedStream(3)));
        // The refused ID still advances the high-water mark.
        assert_eq!(manager.highest_peer_id(), 3);
    }

    #[test]
    fn test_manager_send_window_delta_overflow() {
        let mut manager = StreamManager::new(true);
        manager.set_initial_send_window(0x7FFF_FFFF);
        manager.open_local().unwrap();

        assert!(manager.apply_send_window_delta(1).is_err());
    }

    #[test]
    fn test_manager_reap_closed() {
        let mut manager = StreamManager::new(true);
        let id = manager.open_local().unwrap();

        manager.get_mut(id).unwrap().close();
        manager.reap_closed();
        assert!(manager.get(id).is_none());
        // Freed, not idle: the ID stays burned.
        assert_eq!(manager.classify(id, false), StreamIdClass::ClosedGone);
    }
}
