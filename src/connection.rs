//! The connection controller
//!
//! One `H2Connection` owns everything mutable about an HTTP/2 connection:
//! the settings views, the HPACK tables, both connection windows, the stream
//! registry, the defragmenter and the pending pings. All of it is driven
//! from a single cooperative context - the caller pumps inbound frames with
//! [`H2Connection::process_next_frame`] and issues writes between pumps - so
//! no locking is needed within one connection.

use super::codec::FrameCodec;
use super::defrag::HeaderDefragmenter;
use super::duplex::Duplex;
use super::error::{Error, ErrorCode, Result};
use super::flow_control::ConnectionFlowControl;
use super::frames::{
    ContinuationFrame, DataFrame, Frame, GoawayFrame, HeadersFrame, PingFrame, PushPromiseFrame,
    RstStreamFrame, SettingsFrame, WindowUpdateFrame,
};
use super::hpack::{Header, HpackContext};
use super::ping::{PingHandler, PingId, PingState};
use super::settings::{Settings, SettingsChangeId, SettingsTracker};
use super::stream::{H2Stream, StreamId, StreamIdClass, StreamManager, StreamMessage};
use super::CONNECTION_PREFACE;
use bytes::Bytes;
use tracing::{debug, trace, warn};

/// Connection lifecycle state.
///
/// The sequence is monotonic; `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created; the peer's first SETTINGS has not arrived yet
    Initialized,
    /// Settings exchange underway or complete; streams may run
    Operational,
    /// GOAWAY sent or received; existing streams drain, no new ones
    Finishing,
    /// Dead. Frames are dropped, operations fail
    Terminated,
}

/// Connection role, fixed at construction.
///
/// Decides stream-ID parity (clients initiate odd IDs, servers even) and
/// which side emits the connection preface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Client construction options
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whether the server may push streams to us (SETTINGS_ENABLE_PUSH)
    pub allow_server_push: bool,
    /// Settings to propose in the initial SETTINGS frame
    pub settings: Settings,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            allow_server_push: true,
            settings: Settings::new(),
        }
    }
}

/// An HTTP/2 connection over a byte duplex.
pub struct H2Connection<D: Duplex> {
    role: Role,
    state: ConnectionState,
    duplex: D,
    hpack: HpackContext,
    defrag: HeaderDefragmenter,
    pings: PingHandler,
    settings: SettingsTracker,
    flow: ConnectionFlowControl,
    streams: StreamManager,
    /// Whether we accept PUSH_PROMISE (client role with push enabled)
    allow_push: bool,
    /// Server side: 24-octet preface not yet consumed from the inbound side
    preface_pending: bool,
    goaway_sent: bool,
    /// Last GOAWAY received from the peer, if any
    peer_goaway: Option<(StreamId, ErrorCode)>,
    /// Why the connection terminated, once it has
    termination: Option<ErrorCode>,
}

impl<D: Duplex> H2Connection<D> {
    /// Create a client connection with default options.
    ///
    /// Writes the 24-octet preface and the initial SETTINGS proposal before
    /// returning.
    pub fn client(duplex: D) -> Result<Self> {
        Self::client_with_options(duplex, ClientOptions::default())
    }

    /// Create a client connection.
    pub fn client_with_options(mut duplex: D, options: ClientOptions) -> Result<Self> {
        duplex.send(CONNECTION_PREFACE)?;

        let mut conn = Self::new(Role::Client, duplex, options.allow_server_push);
        let mut initial = options.settings;
        if !options.allow_server_push {
            initial.enable_push = Some(false);
        }
        conn.send_settings_proposal(initial)?;
        Ok(conn)
    }

    /// Create a server connection with an empty settings proposal.
    ///
    /// The client preface is consumed and validated from the inbound side
    /// before the first frame is processed; a mismatch terminates the
    /// connection with PROTOCOL_ERROR.
    pub fn server(duplex: D) -> Result<Self> {
        Self::server_with_settings(duplex, Settings::new())
    }

    /// Create a server connection proposing the given settings.
    pub fn server_with_settings(duplex: D, settings: Settings) -> Result<Self> {
        let mut conn = Self::new(Role::Server, duplex, false);
        conn.preface_pending = true;
        conn.send_settings_proposal(settings)?;
        Ok(conn)
    }

    fn new(role: Role, duplex: D, allow_push: bool) -> Self {
        H2Connection {
            role,
            state: ConnectionState::Initialized,
            duplex,
            hpack: HpackContext::new(),
            defrag: HeaderDefragmenter::new(),
            pings: PingHandler::new(),
            settings: SettingsTracker::new(),
            flow: ConnectionFlowControl::new(),
            streams: StreamManager::new(role == Role::Client),
            allow_push: allow_push && role == Role::Client,
            preface_pending: false,
            goaway_sent: false,
            peer_goaway: None,
            termination: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connection role
    pub fn role(&self) -> Role {
        self.role
    }

    /// Our advertisement as acknowledged by the peer
    pub fn acknowledged_settings(&self) -> &Settings {
        self.settings.acknowledged()
    }

    /// The peer's advertisement
    pub fn peer_settings(&self) -> &Settings {
        self.settings.peer()
    }

    /// Why the connection terminated, once it has
    pub fn termination_cause(&self) -> Option<ErrorCode> {
        self.termination
    }

    /// Last GOAWAY received from the peer (last-stream-id, error code)
    pub fn peer_goaway(&self) -> Option<(StreamId, ErrorCode)> {
        self.peer_goaway
    }

    /// Number of non-closed streams
    pub fn active_streams(&self) -> usize {
        self.streams.active_count()
    }

    /// Access a stream
    pub fn stream(&self, id: StreamId) -> Option<&H2Stream> {
        self.streams.get(id)
    }

    /// Access the underlying duplex
    pub fn duplex(&self) -> &D {
        &self.duplex
    }

    /// Mutable access to the underlying duplex
    pub fn duplex_mut(&mut self) -> &mut D {
        &mut self.duplex
    }

    // ---- inbound pump ------------------------------------------------

    /// Read and dispatch one inbound frame.
    ///
    /// Fatal conditions emit GOAWAY (unless the transport itself failed),
    /// move the connection to `Terminated`, and are returned to the caller.
    pub fn process_next_frame(&mut self) -> Result<()> {
        if self.state == ConnectionState::Terminated {
            return Err(Error::ConnectionClosed);
        }

        if self.preface_pending {
            if let Err(error) = self.consume_preface() {
                return self.fail(error);
            }
        }

        let max_frame_size = self.settings.acknowledged().get_max_frame_size();
        let frame = match FrameCodec::read_frame(&mut self.duplex, max_frame_size) {
            Ok(frame) => frame,
            Err(error) => return self.fail(error),
        };
        trace!(frame = frame.name(), stream = frame.stream_id(), "recv");

        match self.dispatch(frame) {
            Ok(()) => Ok(()),
            Err(error) => self.fail(error),
        }
    }

    fn consume_preface(&mut self) -> Result<()> {
        let mut buf = [0u8; 24];
        FrameCodec::read_exact(&mut self.duplex, &mut buf)?;
        if &buf[..] != CONNECTION_PREFACE {
            return Err(Error::MissingPreface);
        }
        self.preface_pending = false;
        debug!("client preface validated");
        Ok(())
    }

    /// Inbound dispatch. Returns errors for `fail` to classify.
    fn dispatch(&mut self, frame: Frame) -> Result<()> {
        if self.state == ConnectionState::Terminated {
            return Ok(());
        }

        if self.state == ConnectionState::Initialized {
            match &frame {
                Frame::Settings(s) if !s.ack => {
                    debug!(role = ?self.role, "connection operational");
                    self.state = ConnectionState::Operational;
                }
                other => {
                    return Err(Error::Protocol(format!(
                        "first frame must be SETTINGS, got {}",
                        other.name()
                    )));
                }
            }
        }

        // Reassemble split header blocks; while a block is open only a
        // matching CONTINUATION gets through.
        let frame = match self.defrag.absorb(frame)? {
            Some(frame) => frame,
            None => return Ok(()),
        };

        // Header blocks feed the shared decoder before any routing decision;
        // skipping one would desynchronize it from the peer's encoder.
        match frame {
            Frame::Headers(h) => {
                let headers = self.hpack.decode(&h.header_block)?;
                self.route_headers(h, headers)
            }
            Frame::PushPromise(p) => {
                let headers = self.hpack.decode(&p.header_block)?;
                self.route_push_promise(p, headers)
            }
            Frame::Settings(s) => self.on_settings(s),
            Frame::Ping(p) => self.on_ping(p),
            Frame::Goaway(g) => self.on_goaway(g),
            Frame::WindowUpdate(w) if w.stream_id == 0 => self.on_connection_window_update(w),
            Frame::WindowUpdate(w) => self.on_stream_window_update(w),
            Frame::Data(d) => self.on_data(d),
            Frame::RstStream(r) => self.on_rst_stream(r),
            Frame::Priority(p) => {
                if let Some(stream) = self.streams.get_mut(p.stream_id) {
                    stream.set_priority(p.priority);
                }
                Ok(())
            }
            // The defragmenter consumed or rejected every CONTINUATION.
            Frame::Continuation(c) => Err(Error::Protocol(format!(
                "unexpected CONTINUATION on stream {}",
                c.stream_id
            ))),
            Frame::Unknown { frame_type, .. } => {
                trace!(frame_type, "ignoring unknown frame type");
                Ok(())
            }
        }
    }

    /// Convert a dispatch error into connection teardown.
    fn fail(&mut self, error: Error) -> Result<()> {
        // Dispatch against an already-terminated connection is not an event.
        if matches!(error, Error::ConnectionClosed) {
            return Ok(());
        }

        let code = error.goaway_code();
        warn!(%error, code = %code, "connection failure");
        if !error.is_transport() {
            let _ = self.write_goaway(code);
        }
        self.termination = Some(code);
        self.enter_terminated();
        Err(error)
    }

    fn enter_terminated(&mut self) {
        self.state = ConnectionState::Terminated;
        self.pings.fail_all();
        self.settings.fail_pending();
        self.streams.close_all();
        let _ = self.duplex.close();
    }

    // ---- stream-0 handling -------------------------------------------

    fn on_settings(&mut self, frame: SettingsFrame) -> Result<()> {
        if frame.ack {
            let outcome = self.settings.on_ack();
            debug!(pending = self.settings.pending_len(), "settings acknowledged");

            // Our advertisement is now binding on the peer; retune the
            // receive-side machinery it governs.
            if let Some(size) = outcome.header_table_size {
                self.hpack.set_decoder_table_size(size);
            }
            let list_limit = self.settings.acknowledged().get_max_header_list_size();
            self.hpack.set_max_header_list_size(list_limit);
            self.defrag.set_max_block_size(list_limit);
            self.streams
                .set_local_max_concurrent(self.settings.acknowledged().get_max_concurrent_streams());
            self.streams
                .set_initial_recv_window(self.settings.acknowledged().get_initial_window_size());
            if let Some(delta) = outcome.initial_window_delta {
                self.streams.apply_recv_window_delta(delta)?;
            }
            return Ok(());
        }

        let outcome = self.settings.apply_peer(&frame.settings)?;

        // The ack must hit the wire before any frame that depends on the
        // new peer view being visible.
        self.send_frame(&Frame::Settings(SettingsFrame::ack()))?;

        self.streams
            .set_peer_max_concurrent(self.settings.peer().get_max_concurrent_streams());
        self.streams
            .set_initial_send_window(self.settings.peer().get_initial_window_size());
        if let Some(delta) = outcome.initial_window_delta {
            self.streams.apply_send_window_delta(delta)?;
            // A positive delta may unblock queued DATA.
            self.flush_pending_data()?;
        }
        Ok(())
    }

    fn on_ping(&mut self, frame: PingFrame) -> Result<()> {
        if frame.ack {
            let id = self.pings.on_ack(frame.data)?;
            debug!(?id, "ping acknowledged");
            Ok(())
        } else {
            // Echo immediately with the identical payload.
            self.send_frame(&Frame::Ping(PingFrame::ack(frame.data)))
        }
    }

    fn on_goaway(&mut self, frame: GoawayFrame) -> Result<()> {
        debug!(
            last_stream = frame.last_stream_id,
            code = %frame.error_code,
            "peer GOAWAY"
        );
        self.peer_goaway = Some((frame.last_stream_id, frame.error_code));
        // Passive finishing; no GOAWAY is emitted back.
        if self.state == ConnectionState::Operational {
            self.state = ConnectionState::Finishing;
        }
        Ok(())
    }

    fn on_connection_window_update(&mut self, frame: WindowUpdateFrame) -> Result<()> {
        self.flow.increase_send(frame.size_increment)?;
        self.flush_pending_data()
    }

    fn on_stream_window_update(&mut self, frame: WindowUpdateFrame) -> Result<()> {
        let id = frame.stream_id;
        match self.streams.classify(id, false) {
            StreamIdClass::Existing => {
                // Stream-scoped flow-control faults reset the stream, not
                // the connection (RFC 7540 Section 6.9).
                if frame.size_increment == 0 {
                    return self.send_rst(id, ErrorCode::ProtocolError);
                }
                let stream = self.streams.get_mut(id).expect("classified existing");
                if stream.recv_window_update(frame.size_increment).is_err() {
                    return self.send_rst(id, ErrorCode::FlowControlError);
                }
                self.flush_pending_data()
            }
            StreamIdClass::ClosedGone => Ok(()),
            _ => Err(Error::Protocol(format!(
                "WINDOW_UPDATE on idle stream {}",
                id
            ))),
        }
    }

    // ---- stream routing ----------------------------------------------

    fn on_data(&mut self, frame: DataFrame) -> Result<()> {
        let id = frame.stream_id;
        let flow_len = frame.flow_len();

        // Connection-level accounting covers every DATA octet, even on
        // streams we are about to reset.
        self.flow.charge_recv(flow_len)?;
        if let Some(increment) = self.flow.replenish_recv() {
            self.send_frame(&Frame::WindowUpdate(WindowUpdateFrame::new(0, increment)))?;
        }

        match self.streams.classify(id, false) {
            StreamIdClass::Existing => {
                let stream = self.streams.get_mut(id).expect("classified existing");
                match stream.recv_data(frame.data, flow_len, frame.end_stream) {
                    Ok(()) => {
                        if let Some(increment) = stream.replenish_recv() {
                            self.send_frame(&Frame::WindowUpdate(WindowUpdateFrame::new(
                                id, increment,
                            )))?;
                        }
                        Ok(())
                    }
                    Err(Error::StreamClosed(_)) => self.send_rst(id, ErrorCode::StreamClosed),
                    Err(Error::FlowControl(_)) => self.send_rst(id, ErrorCode::FlowControlError),
                    Err(other) => Err(other),
                }
            }
            StreamIdClass::ClosedGone => self.send_rst(id, ErrorCode::StreamClosed),
            _ => Err(Error::Protocol(format!("DATA on idle stream {}", id))),
        }
    }

    fn route_headers(&mut self, frame: HeadersFrame, headers: Vec<Header>) -> Result<()> {
        let id = frame.stream_id;
        match self.streams.classify(id, true) {
            StreamIdClass::Existing => {
                if let Some(priority) = frame.priority {
                    if let Some(stream) = self.streams.get_mut(id) {
                        stream.set_priority(priority);
                    }
                }
                let stream = self.streams.get_mut(id).expect("classified existing");
                match stream.recv_headers(headers, frame.end_stream) {
                    Ok(()) => Ok(()),
                    Err(Error::StreamClosed(_)) => self.send_rst(id, ErrorCode::StreamClosed),
                    Err(other) => Err(other),
                }
            }
            StreamIdClass::NewPeer => {
                if self.state == ConnectionState::Finishing {
                    // Refused, but still the highest ID we have seen.
                    self.streams.note_peer_id(id);
                    return self.send_rst(id, ErrorCode::RefusedStream);
                }
                match self.streams.open_peer(id) {
                    Ok(()) => {
                        let stream = self.streams.get_mut(id).expect("just opened");
                        if let Some(priority) = frame.priority {
                            stream.set_priority(priority);
                        }
                        stream.recv_headers(headers, frame.end_stream)
                    }
                    Err(Error::RefusedStream(_)) => self.send_rst(id, ErrorCode::RefusedStream),
                    Err(other) => Err(other),
                }
            }
            StreamIdClass::ClosedGone => self.send_rst(id, ErrorCode::StreamClosed),
            StreamIdClass::Idle => Err(Error::Protocol(format!(
                "HEADERS cannot open stream {} from the peer",
                id
            ))),
        }
    }

    fn route_push_promise(&mut self, frame: PushPromiseFrame, headers: Vec<Header>) -> Result<()> {
        if self.role == Role::Server {
            return Err(Error::Protocol(
                "server received PUSH_PROMISE".to_string(),
            ));
        }
        if !self.allow_push {
            return Err(Error::Protocol(
                "PUSH_PROMISE received with push disabled".to_string(),
            ));
        }

        // The promise rides an existing stream we can still receive on.
        match self.streams.get(frame.stream_id) {
            Some(stream) if stream.state().can_receive() => {}
            _ => {
                return Err(Error::Protocol(format!(
                    "PUSH_PROMISE on unavailable stream {}",
                    frame.stream_id
                )));
            }
        }

        let promised = frame.promised_stream_id;
        if self.streams.is_local_id(promised) || promised <= self.streams.highest_peer_id() {
            return Err(Error::InvalidStreamId(promised));
        }
        self.streams.note_peer_id(promised);

        if self.state == ConnectionState::Finishing {
            return self.send_rst(promised, ErrorCode::RefusedStream);
        }

        self.streams.reserve_peer(promised);
        self.streams
            .get_mut(promised)
            .expect("just reserved")
            .recv_push_promise(headers);
        Ok(())
    }

    fn on_rst_stream(&mut self, frame: RstStreamFrame) -> Result<()> {
        let id = frame.stream_id;
        match self.streams.classify(id, false) {
            StreamIdClass::Existing => {
                let stream = self.streams.get_mut(id).expect("classified existing");
                stream.recv_reset(frame.error_code);
                Ok(())
            }
            StreamIdClass::ClosedGone => Ok(()),
            _ => Err(Error::Protocol(format!(
                "RST_STREAM on idle stream {}",
                id
            ))),
        }
    }

    // ---- write side --------------------------------------------------

    /// Issue a PING and return a handle to await its acknowledgement.
    pub fn ping(&mut self) -> Result<PingId> {
        if self.state == ConnectionState::Terminated {
            return Err(Error::ConnectionClosed);
        }
        let (id, payload) = self.pings.begin()?;
        self.send_frame(&Frame::Ping(PingFrame::new(payload)))?;
        Ok(id)
    }

    /// Observable state of a ping issued with [`H2Connection::ping`]
    pub fn ping_state(&self, id: PingId) -> PingState {
        self.pings.state(id)
    }

    /// Propose a settings change; acknowledged once the peer's SETTINGS ack
    /// for it arrives.
    pub fn change_settings(&mut self, settings: Settings) -> Result<SettingsChangeId> {
        if self.state == ConnectionState::Terminated {
            return Err(Error::ConnectionClosed);
        }
        self.send_settings_proposal(settings)
    }

    /// Whether a proposed settings change has been acknowledged
    pub fn settings_change_acked(&self, id: SettingsChangeId) -> bool {
        self.settings.change_acked(id)
    }

    /// Open a locally initiated stream with an initial header list.
    pub fn open_stream(&mut self, headers: &[Header], end_stream: bool) -> Result<StreamId> {
        match self.state {
            ConnectionState::Operational => {}
            ConnectionState::Initialized => return Err(Error::NotReady),
            ConnectionState::Finishing => return Err(Error::ShuttingDown),
            ConnectionState::Terminated => return Err(Error::ConnectionClosed),
        }

        let id = self.streams.open_local()?;
        let block = self.hpack.encode(headers)?;
        self.streams
            .get_mut(id)
            .expect("just opened")
            .send_headers(end_stream)?;
        self.write_header_block(id, block, end_stream)?;
        debug!(stream = id, end_stream, "stream opened");
        Ok(id)
    }

    /// Send a header list (response or trailers) on an existing stream.
    pub fn send_headers(
        &mut self,
        id: StreamId,
        headers: &[Header],
        end_stream: bool,
    ) -> Result<()> {
        if self.state == ConnectionState::Terminated {
            return Err(Error::ConnectionClosed);
        }
        if self.streams.get(id).is_none() {
            return Err(Error::StreamNotFound(id));
        }

        let block = self.hpack.encode(headers)?;
        self.streams
            .get_mut(id)
            .expect("checked above")
            .send_headers(end_stream)?;
        self.write_header_block(id, block, end_stream)
    }

    /// Queue DATA on a stream; emitted as window credit allows.
    pub fn send_data(&mut self, id: StreamId, data: Bytes, end_stream: bool) -> Result<()> {
        if self.state == ConnectionState::Terminated {
            return Err(Error::ConnectionClosed);
        }
        let stream = self
            .streams
            .get_mut(id)
            .ok_or(Error::StreamNotFound(id))?;
        stream.queue_data(data, end_stream)?;
        self.flush_pending_data()
    }

    /// Consume the next inbound message on a stream.
    pub fn next_message(&mut self, id: StreamId) -> Option<StreamMessage> {
        let message = self.streams.get_mut(id)?.next_message();
        self.streams.reap_closed();
        message
    }

    /// Reset a stream with the given error code.
    pub fn reset_stream(&mut self, id: StreamId, code: ErrorCode) -> Result<()> {
        if self.state == ConnectionState::Terminated {
            return Err(Error::ConnectionClosed);
        }
        if self.streams.get(id).is_none() {
            return Err(Error::StreamNotFound(id));
        }
        self.send_rst(id, code)
    }

    /// Graceful shutdown: emit GOAWAY(NO_ERROR) and stop accepting streams.
    ///
    /// Existing streams run to completion; the caller closes the duplex once
    /// they have.
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Terminated => return Err(Error::ConnectionClosed),
            ConnectionState::Finishing => return Ok(()),
            _ => {}
        }
        debug!(last_stream = self.streams.highest_peer_id(), "finishing");
        self.state = ConnectionState::Finishing;
        self.write_goaway(ErrorCode::NoError)
    }

    /// Forceful shutdown. Infallible and idempotent.
    ///
    /// Emits GOAWAY if the wire is still usable, fails every pending ping
    /// and settings change, closes the duplex.
    pub fn terminate(&mut self) {
        if self.state == ConnectionState::Terminated {
            return;
        }
        debug!("terminating");
        if !self.goaway_sent {
            let _ = self.write_goaway(ErrorCode::NoError);
        }
        if self.termination.is_none() {
            self.termination = Some(ErrorCode::NoError);
        }
        self.enter_terminated();
    }

    // ---- internals ---------------------------------------------------

    fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        trace!(frame = frame.name(), stream = frame.stream_id(), "send");
        FrameCodec::write_frame(&mut self.duplex, frame)
    }

    fn send_settings_proposal(&mut self, settings: Settings) -> Result<SettingsChangeId> {
        let id = self.settings.propose(settings.clone())?;
        self.send_frame(&Frame::Settings(SettingsFrame::new(settings)))?;
        Ok(id)
    }

    fn write_goaway(&mut self, code: ErrorCode) -> Result<()> {
        let frame = GoawayFrame::new(self.streams.highest_peer_id(), code, Bytes::new());
        self.goaway_sent = true;
        self.send_frame(&Frame::Goaway(frame))
    }

    fn send_rst(&mut self, id: StreamId, code: ErrorCode) -> Result<()> {
        self.send_frame(&Frame::RstStream(RstStreamFrame {
            stream_id: id,
            error_code: code,
        }))?;
        if let Some(stream) = self.streams.get_mut(id) {
            stream.close();
        }
        self.streams.reap_closed();
        Ok(())
    }

    /// Emit a header block, fragmented against the peer's MAX_FRAME_SIZE
    /// into HEADERS + CONTINUATION when necessary.
    fn write_header_block(&mut self, id: StreamId, block: Bytes, end_stream: bool) -> Result<()> {
        let max = self.settings.peer().get_max_frame_size() as usize;

        if block.len() <= max {
            return self.send_frame(&Frame::Headers(HeadersFrame::new(
                id, block, end_stream, true,
            )));
        }

        let mut rest = block;
        let first = rest.split_to(max);
        self.send_frame(&Frame::Headers(HeadersFrame::new(
            id, first, end_stream, false,
        )))?;
        while !rest.is_empty() {
            let fragment = rest.split_to(rest.len().min(max));
            self.send_frame(&Frame::Continuation(ContinuationFrame {
                stream_id: id,
                header_block: fragment,
                end_headers: rest.is_empty(),
            }))?;
        }
        Ok(())
    }

    /// Drain queued outbound DATA as far as both windows and the peer's
    /// MAX_FRAME_SIZE allow.
    fn flush_pending_data(&mut self) -> Result<()> {
        let max_frame = self.settings.peer().get_max_frame_size() as usize;

        for id in self.streams.ids_with_pending_out() {
            loop {
                let budget = self.flow.send_available().min(max_frame);
                let stream = match self.streams.get_mut(id) {
                    Some(stream) => stream,
                    None => break,
                };
                let (chunk, end_stream) = match stream.take_chunk(budget)? {
                    Some(taken) => taken,
                    None => break,
                };
                self.flow.consume_send(chunk.len())?;
                self.send_frame(&Frame::Data(DataFrame::new(id, chunk, end_stream)))?;
                if end_stream {
                    break;
                }
            }
        }
        self.streams.reap_closed();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplex::MemoryDuplex;
    use crate::settings::SettingsBuilder;

    fn read_frames(bytes: Vec<u8>) -> Vec<Frame> {
        let mut duplex = MemoryDuplex::new();
        duplex.push_inbound(&bytes);
        duplex.set_eof();
        let mut frames = Vec::new();
        loop {
            match FrameCodec::read_frame(&mut duplex, 16_777_215) {
                Ok(frame) => frames.push(frame),
                Err(_) => break,
            }
        }
        frames
    }

    #[test]
    fn test_client_writes_preface_and_settings() {
        let mut conn = H2Connection::client(MemoryDuplex::new()).unwrap();
        let out = conn.duplex_mut().take_outbound();

        assert_eq!(&out[..24], CONNECTION_PREFACE);
        let frames = read_frames(out[24..].to_vec());
        assert_eq!(frames.len(), 1);
        assert!(matches!(&frames[0], Frame::Settings(s) if !s.ack));
    }

    #[test]
    fn test_client_push_disabled_advertised() {
        let options = ClientOptions {
            allow_server_push: false,
            settings: Settings::new(),
        };
        let mut conn = H2Connection::client_with_options(MemoryDuplex::new(), options).unwrap();
        let out = conn.duplex_mut().take_outbound();
        let frames = read_frames(out[24..].to_vec());
        match &frames[0] {
            Frame::Settings(s) => assert_eq!(s.settings.enable_push, Some(false)),
            other => panic!("expected SETTINGS, got {}", other.name()),
        }
    }

    #[test]
    fn test_first_frame_must_be_settings() {
        let mut conn = H2Connection::client(MemoryDuplex::new()).unwrap();
        conn.duplex_mut().take_outbound();

        let ping = FrameCodec::encode(&Frame::Ping(PingFrame::new([0; 8])));
        conn.duplex_mut().push_inbound(&ping);

        let err = conn.process_next_frame().unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert_eq!(conn.state(), ConnectionState::Terminated);
        assert_eq!(conn.termination_cause(), Some(ErrorCode::ProtocolError));

        let frames = read_frames(conn.duplex_mut().take_outbound());
        assert!(frames
            .iter()
            .any(|f| matches!(f, Frame::Goaway(g) if g.error_code == ErrorCode::ProtocolError)));
    }

    #[test]
    fn test_settings_exchange_reaches_operational() {
        let mut conn = H2Connection::client(MemoryDuplex::new()).unwrap();
        conn.duplex_mut().take_outbound();
        assert_eq!(conn.state(), ConnectionState::Initialized);

        let peer_settings = FrameCodec::encode(&Frame::Settings(SettingsFrame::new(
            SettingsBuilder::new().max_concurrent_streams(50).build().unwrap(),
        )));
        conn.duplex_mut().push_inbound(&peer_settings);
        conn.process_next_frame().unwrap();

        assert_eq!(conn.state(), ConnectionState::Operational);
        assert_eq!(conn.peer_settings().get_max_concurrent_streams(), Some(50));

        // Our ack went out.
        let frames = read_frames(conn.duplex_mut().take_outbound());
        assert!(matches!(&frames[0], Frame::Settings(s) if s.ack));
    }

    #[test]
    fn test_peer_ping_is_echoed() {
        let mut conn = operational_client();

        let ping = FrameCodec::encode(&Frame::Ping(PingFrame::new([7; 8])));
        conn.duplex_mut().push_inbound(&ping);
        conn.process_next_frame().unwrap();

        let frames = read_frames(conn.duplex_mut().take_outbound());
        assert!(matches!(
            &frames[0],
            Frame::Ping(p) if p.ack && p.data == [7; 8]
        ));
    }

    #[test]
    fn test_terminate_is_idempotent() {
        let mut conn = operational_client();
        let ping = conn.ping().unwrap();

        conn.terminate();
        assert_eq!(conn.state(), ConnectionState::Terminated);
        assert_eq!(conn.ping_state(ping), PingState::Failed);
        assert!(conn.duplex().is_closed());

        // Second call is a no-op, never an error.
        conn.terminate();
        assert_eq!(conn.termination_cause(), Some(ErrorCode::NoError));
    }

    /// Client driven through the settings exchange.
    fn operational_client() -> H2Connection<MemoryDuplex> {
        let mut conn = H2Connection::client(MemoryDuplex::new()).unwrap();
        let settings = FrameCodec::encode(&Frame::Settings(SettingsFrame::new(Settings::new())));
        let ack = FrameCodec::encode(&Frame::Settings(SettingsFrame::ack()));
        conn.duplex_mut().push_inbound(&settings);
        conn.duplex_mut().push_inbound(&ack);
        conn.process_next_frame().unwrap();
        conn.process_next_frame().unwrap();
        conn.duplex_mut().take_outbound();
        conn
    }
}
