//! Header defragmentation integration tests
//!
//! CONTINUATION reassembly driven through a full connection: split header
//! blocks must decode from the concatenated fragments, and anything
//! interleaved into an open block must kill the connection.

use bytes::Bytes;
use h2core::codec::FrameCodec;
use h2core::frames::*;
use h2core::settings::Settings;
use h2core::{
    ConnectionState, Error, ErrorCode, H2Connection, Header, HpackContext, MemoryDuplex,
    StreamMessage, CONNECTION_PREFACE,
};

fn encode(frame: &Frame) -> Vec<u8> {
    FrameCodec::encode(frame).to_vec()
}

fn frames_from(bytes: &[u8]) -> Vec<Frame> {
    let mut duplex = MemoryDuplex::new();
    duplex.push_inbound(bytes);
    duplex.set_eof();
    let mut frames = Vec::new();
    while let Ok(frame) = FrameCodec::read_frame(&mut duplex, 16_777_215) {
        frames.push(frame);
    }
    frames
}

fn operational_server() -> H2Connection<MemoryDuplex> {
    let mut conn = H2Connection::server(MemoryDuplex::new()).unwrap();
    conn.duplex_mut().push_inbound(CONNECTION_PREFACE);
    conn.duplex_mut()
        .push_inbound(&encode(&Frame::Settings(SettingsFrame::new(Settings::new()))));
    conn.process_next_frame().unwrap();
    conn.duplex_mut().take_outbound();
    conn
}

fn request_headers() -> Vec<Header> {
    vec![
        (Bytes::from_static(b":method"), Bytes::from_static(b"GET")),
        (Bytes::from_static(b":path"), Bytes::from_static(b"/split")),
        (Bytes::from_static(b":scheme"), Bytes::from_static(b"https")),
        (Bytes::from_static(b":authority"), Bytes::from_static(b"test")),
        (Bytes::from_static(b"x-extra"), Bytes::from_static(b"fragmented")),
    ]
}

#[test]
fn test_headers_plus_continuation_reassembled() {
    let mut conn = operational_server();

    // Encode one block with the peer's encoder and split it mid-block.
    let mut peer_hpack = HpackContext::new();
    let block = peer_hpack.encode(&request_headers()).unwrap();
    assert!(block.len() > 4);
    let first = block.slice(..3);
    let second = block.slice(3..);

    conn.duplex_mut()
        .push_inbound(&encode(&Frame::Headers(HeadersFrame::new(1, first, true, false))));
    conn.process_next_frame().unwrap();
    // Nothing delivered yet; the block is open.
    assert!(conn.next_message(1).is_none());

    conn.duplex_mut()
        .push_inbound(&encode(&Frame::Continuation(ContinuationFrame {
            stream_id: 1,
            header_block: second,
            end_headers: true,
        })));
    conn.process_next_frame().unwrap();

    // One message, decoded from the concatenation, END_STREAM preserved.
    match conn.next_message(1) {
        Some(StreamMessage::Headers { headers, end_stream }) => {
            assert_eq!(headers, request_headers());
            assert!(end_stream);
        }
        other => panic!("expected headers, got {:?}", other),
    }
}

#[test]
fn test_three_way_split_reassembled() {
    let mut conn = operational_server();

    let mut peer_hpack = HpackContext::new();
    let block = peer_hpack.encode(&request_headers()).unwrap();
    let (a, rest) = (block.slice(..2), block.slice(2..));
    let (b, c) = (rest.slice(..2), rest.slice(2..));

    conn.duplex_mut()
        .push_inbound(&encode(&Frame::Headers(HeadersFrame::new(1, a, false, false))));
    conn.duplex_mut()
        .push_inbound(&encode(&Frame::Continuation(ContinuationFrame {
            stream_id: 1,
            header_block: b,
            end_headers: false,
        })));
    conn.duplex_mut()
        .push_inbound(&encode(&Frame::Continuation(ContinuationFrame {
            stream_id: 1,
            header_block: c,
            end_headers: true,
        })));
    conn.process_next_frame().unwrap();
    conn.process_next_frame().unwrap();
    conn.process_next_frame().unwrap();

    match conn.next_message(1) {
        Some(StreamMessage::Headers { headers, end_stream }) => {
            assert_eq!(headers, request_headers());
            assert!(!end_stream);
        }
        other => panic!("expected headers, got {:?}", other),
    }
}

#[test]
fn test_interleaved_frame_kills_connection() {
    let mut conn = operational_server();

    let mut peer_hpack = HpackContext::new();
    let block = peer_hpack.encode(&request_headers()).unwrap();

    conn.duplex_mut().push_inbound(&encode(&Frame::Headers(HeadersFrame::new(
        1,
        block.slice(..3),
        false,
        false,
    ))));
    conn.process_next_frame().unwrap();

    // A PING while the block is open is a protocol violation.
    conn.duplex_mut()
        .push_inbound(&encode(&Frame::Ping(PingFrame::new([1; 8]))));
    let err = conn.process_next_frame().unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(conn.state(), ConnectionState::Terminated);

    let frames = frames_from(&conn.duplex_mut().take_outbound());
    assert!(frames
        .iter()
        .any(|f| matches!(f, Frame::Goaway(g) if g.error_code == ErrorCode::ProtocolError)));
}

#[test]
fn test_continuation_for_other_stream_kills_connection() {
    let mut conn = operational_server();

    let mut peer_hpack = HpackContext::new();
    let block = peer_hpack.encode(&request_headers()).unwrap();

    conn.duplex_mut().push_inbound(&encode(&Frame::Headers(HeadersFrame::new(
        1,
        block.slice(..3),
        false,
        false,
    ))));
    conn.process_next_frame().unwrap();

    conn.duplex_mut()
        .push_inbound(&encode(&Frame::Continuation(ContinuationFrame {
            stream_id: 3,
            header_block: block.slice(3..),
            end_headers: true,
        })));
    let err = conn.process_next_frame().unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(conn.state(), ConnectionState::Terminated);
}

#[test]
fn test_orphan_continuation_kills_connection() {
    let mut conn = operational_server();

    conn.duplex_mut()
        .push_inbound(&encode(&Frame::Continuation(ContinuationFrame {
            stream_id: 1,
            header_block: Bytes::from_static(&[0x82]),
            end_headers: true,
        })));
    let err = conn.process_next_frame().unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(conn.state(), ConnectionState::Terminated);
}

#[test]
fn test_outbound_header_block_fragmented_against_peer_max_frame() {
    // A header list too large for one frame leaves as HEADERS plus
    // CONTINUATIONs, END_HEADERS only on the last.
    let mut conn = H2Connection::client(MemoryDuplex::new()).unwrap();
    conn.duplex_mut()
        .push_inbound(&encode(&Frame::Settings(SettingsFrame::new(Settings::new()))));
    conn.process_next_frame().unwrap();
    conn.duplex_mut().take_outbound();

    let big_value = vec![b'v'; 40_000];
    let headers = vec![
        (Bytes::from_static(b":method"), Bytes::from_static(b"GET")),
        (Bytes::from_static(b":path"), Bytes::from_static(b"/")),
        (Bytes::from_static(b":scheme"), Bytes::from_static(b"https")),
        (Bytes::from_static(b":authority"), Bytes::from_static(b"test")),
        (Bytes::from_static(b"x-big"), Bytes::from(big_value)),
    ];
    conn.open_stream(&headers, true).unwrap();

    let frames = frames_from(&conn.duplex_mut().take_outbound());
    match &frames[0] {
        Frame::Headers(h) => {
            assert!(!h.end_headers);
            assert_eq!(h.header_block.len(), 16_384);
        }
        other => panic!("expected HEADERS, got {}", other.name()),
    }
    let continuations: Vec<&ContinuationFrame> = frames
        .iter()
        .filter_map(|f| match f {
            Frame::Continuation(c) => Some(c),
            _ => None,
        })
        .collect();
    assert!(!continuations.is_empty());
    assert!(continuations.iter().all(|c| c.header_block.len() <= 16_384));
    let (last, rest) = continuations.split_last().unwrap();
    assert!(last.end_headers);
    assert!(rest.iter().all(|c| !c.end_headers));

    // The peer can reassemble and decode the whole thing.
    let mut peer_hpack = HpackContext::new();
    let mut merged = Vec::new();
    match &frames[0] {
        Frame::Headers(h) => merged.extend_from_slice(&h.header_block),
        _ => unreachable!(),
    }
    for c in &continuations {
        merged.extend_from_slice(&c.header_block);
    }
    let decoded = peer_hpack.decode(&merged).unwrap();
    assert_eq!(decoded.len(), 5);
    assert_eq!(decoded[4].1.len(), 40_000);
}
