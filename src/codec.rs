//! HTTP/2 frame encoding and decoding
//!
//! The wire codec: the fixed 9-octet frame header plus per-type payload
//! rules from RFC 7540 Section 6. Reading enforces the frame-size bound we
//! advertised; splitting oversized outbound DATA or header blocks against
//! the peer's MAX_FRAME_SIZE is the connection's job, not the codec's.

use super::duplex::Duplex;
use super::error::{Error, ErrorCode, Result};
use super::frames::*;
use super::settings::Settings;
use bytes::{BufMut, Bytes, BytesMut};

/// HTTP/2 frame header size (9 bytes)
pub const FRAME_HEADER_SIZE: usize = 9;

/// Hard payload bound imposed by the 24-bit length field (16MB - 1)
pub const MAX_FRAME_PAYLOAD: usize = 0x00FF_FFFF;

/// Frame codec for encoding/decoding HTTP/2 frames
pub struct FrameCodec;

impl FrameCodec {
    /// Encode a frame header into a buffer
    pub fn encode_header(
        frame_type: u8,
        flags: FrameFlags,
        stream_id: u32,
        length: usize,
    ) -> [u8; FRAME_HEADER_SIZE] {
        let mut header = [0u8; FRAME_HEADER_SIZE];

        // Length (24 bits, big-endian)
        header[0] = ((length >> 16) & 0xFF) as u8;
        header[1] = ((length >> 8) & 0xFF) as u8;
        header[2] = (length & 0xFF) as u8;

        // Type (8 bits)
        header[3] = frame_type;

        // Flags (8 bits)
        header[4] = flags.as_u8();

        // Stream ID (31 bits, big-endian, reserved bit is 0)
        let stream_id = stream_id & 0x7FFF_FFFF;
        header[5] = ((stream_id >> 24) & 0xFF) as u8;
        header[6] = ((stream_id >> 16) & 0xFF) as u8;
        header[7] = ((stream_id >> 8) & 0xFF) as u8;
        header[8] = (stream_id & 0xFF) as u8;

        header
    }

    /// Decode a frame header from bytes
    ///
    /// Returns (raw type, flags, stream_id, payload length). The type stays
    /// raw so unknown frame types survive to the dispatcher, which ignores
    /// them.
    pub fn decode_header(bytes: &[u8; FRAME_HEADER_SIZE]) -> (u8, FrameFlags, u32, usize) {
        let length =
            ((bytes[0] as usize) << 16) | ((bytes[1] as usize) << 8) | (bytes[2] as usize);

        let frame_type = bytes[3];
        let flags = FrameFlags::from_u8(bytes[4]);

        // Stream ID (31 bits, reserved bit masked)
        let stream_id = ((bytes[5] as u32 & 0x7F) << 24)
            | ((bytes[6] as u32) << 16)
            | ((bytes[7] as u32) << 8)
            | (bytes[8] as u32);

        (frame_type, flags, stream_id, length)
    }

    /// Encode a typed frame to wire bytes
    pub fn encode(frame: &Frame) -> Bytes {
        match frame {
            Frame::Data(f) => Self::encode_data_frame(f),
            Frame::Headers(f) => Self::encode_headers_frame(f),
            Frame::Priority(f) => Self::encode_priority_frame(f),
            Frame::RstStream(f) => Self::encode_rst_stream_frame(f),
            Frame::Settings(f) => Self::encode_settings_frame(f),
            Frame::PushPromise(f) => Self::encode_push_promise_frame(f),
            Frame::Ping(f) => Self::encode_ping_frame(f),
            Frame::Goaway(f) => Self::encode_goaway_frame(f),
            Frame::WindowUpdate(f) => Self::encode_window_update_frame(f),
            Frame::Continuation(f) => Self::encode_continuation_frame(f),
            Frame::Unknown {
                frame_type,
                flags,
                stream_id,
                payload,
            } => {
                let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
                let header = Self::encode_header(
                    *frame_type,
                    FrameFlags::from_u8(*flags),
                    *stream_id,
                    payload.len(),
                );
                buf.put_slice(&header);
                buf.put_slice(payload);
                buf.freeze()
            }
        }
    }

    /// Encode a DATA frame
    pub fn encode_data_frame(frame: &DataFrame) -> Bytes {
        let mut buf = BytesMut::new();

        let mut payload_len = frame.data.len();
        let mut flags = FrameFlags::empty();

        if frame.end_stream {
            flags.set(FrameFlags::END_STREAM);
        }

        let padding_len = if let Some(pad_len) = frame.padding {
            flags.set(FrameFlags::PADDED);
            payload_len += 1 + pad_len as usize;
            pad_len
        } else {
            0
        };

        let header =
            Self::encode_header(FrameType::Data.as_u8(), flags, frame.stream_id, payload_len);
        buf.put_slice(&header);

        if frame.padding.is_some() {
            buf.put_u8(padding_len);
        }
        buf.put_slice(&frame.data);
        if padding_len > 0 {
            buf.put_bytes(0, padding_len as usize);
        }

        buf.freeze()
    }

    /// Encode a HEADERS frame
    pub fn encode_headers_frame(frame: &HeadersFrame) -> Bytes {
        let mut buf = BytesMut::new();

        let mut payload_len = frame.header_block.len();
        let mut flags = FrameFlags::empty();

        if frame.end_stream {
            flags.set(FrameFlags::END_STREAM);
        }
        if frame.end_headers {
            flags.set(FrameFlags::END_HEADERS);
        }

        if frame.priority.is_some() {
            flags.set(FrameFlags::PRIORITY);
            payload_len += 5;
        }

        let padding_len = if let Some(pad_len) = frame.padding {
            flags.set(FrameFlags::PADDED);
            payload_len += 1 + pad_len as usize;
            pad_len
        } else {
            0
        };

        let header =
            Self::encode_header(FrameType::Headers.as_u8(), flags, frame.stream_id, payload_len);
        buf.put_slice(&header);

        if frame.padding.is_some() {
            buf.put_u8(padding_len);
        }

        if let Some(priority) = &frame.priority {
            let mut dep = priority.stream_dependency & 0x7FFF_FFFF;
            if priority.exclusive {
                dep |= 0x8000_0000;
            }
            buf.put_u32(dep);
            buf.put_u8(priority.weight);
        }

        buf.put_slice(&frame.header_block);

        if padding_len > 0 {
            buf.put_bytes(0, padding_len as usize);
        }

        buf.freeze()
    }

    /// Encode a PRIORITY frame
    pub fn encode_priority_frame(frame: &PriorityFrame) -> Bytes {
        let mut buf = BytesMut::new();

        let header =
            Self::encode_header(FrameType::Priority.as_u8(), FrameFlags::empty(), frame.stream_id, 5);
        buf.put_slice(&header);

        let mut dep = frame.priority.stream_dependency & 0x7FFF_FFFF;
        if frame.priority.exclusive {
            dep |= 0x8000_0000;
        }
        buf.put_u32(dep);
        buf.put_u8(frame.priority.weight);

        buf.freeze()
    }

    /// Encode a RST_STREAM frame
    pub fn encode_rst_stream_frame(frame: &RstStreamFrame) -> Bytes {
        let mut buf = BytesMut::new();

        let header = Self::encode_header(
            FrameType::RstStream.as_u8(),
            FrameFlags::empty(),
            frame.stream_id,
            4,
        );
        buf.put_slice(&header);
        buf.put_u32(frame.error_code.as_u32());

        buf.freeze()
    }

    /// Encode a SETTINGS frame
    pub fn encode_settings_frame(frame: &SettingsFrame) -> Bytes {
        let mut buf = BytesMut::new();

        let flags = if frame.ack {
            FrameFlags::from_u8(FrameFlags::ACK)
        } else {
            FrameFlags::empty()
        };

        // Each parameter is 6 bytes (2 byte ID + 4 byte value); an ack
        // carries none.
        let mut params = BytesMut::new();
        if !frame.ack {
            let settings = &frame.settings;

            if let Some(val) = settings.header_table_size {
                params.put_u16(0x1);
                params.put_u32(val);
            }
            if let Some(val) = settings.enable_push {
                params.put_u16(0x2);
                params.put_u32(u32::from(val));
            }
            if let Some(val) = settings.max_concurrent_streams {
                params.put_u16(0x3);
                params.put_u32(val);
            }
            if let Some(val) = settings.initial_window_size {
                params.put_u16(0x4);
                params.put_u32(val);
            }
            if let Some(val) = settings.max_frame_size {
                params.put_u16(0x5);
                params.put_u32(val);
            }
            if let Some(val) = settings.max_header_list_size {
                params.put_u16(0x6);
                params.put_u32(val);
            }
        }

        // Stream ID must be 0 for SETTINGS.
        let header = Self::encode_header(FrameType::Settings.as_u8(), flags, 0, params.len());
        buf.put_slice(&header);
        buf.put_slice(&params);

        buf.freeze()
    }

    /// Encode a PUSH_PROMISE frame
    pub fn encode_push_promise_frame(frame: &PushPromiseFrame) -> Bytes {
        let mut buf = BytesMut::new();

        let mut payload_len = 4 + frame.header_block.len();
        let mut flags = FrameFlags::empty();

        if frame.end_headers {
            flags.set(FrameFlags::END_HEADERS);
        }

        let padding_len = if let Some(pad_len) = frame.padding {
            flags.set(FrameFlags::PADDED);
            payload_len += 1 + pad_len as usize;
            pad_len
        } else {
            0
        };

        let header = Self::encode_header(
            FrameType::PushPromise.as_u8(),
            flags,
            frame.stream_id,
            payload_len,
        );
        buf.put_slice(&header);

        if frame.padding.is_some() {
            buf.put_u8(padding_len);
        }
        buf.put_u32(frame.promised_stream_id & 0x7FFF_FFFF);
        buf.put_slice(&frame.header_block);
        if padding_len > 0 {
            buf.put_bytes(0, padding_len as usize);
        }

        buf.freeze()
    }

    /// Encode a PING frame
    pub fn encode_ping_frame(frame: &PingFrame) -> Bytes {
        let mut buf = BytesMut::new();

        let flags = if frame.ack {
            FrameFlags::from_u8(FrameFlags::ACK)
        } else {
            FrameFlags::empty()
        };

        // Stream ID must be 0 for PING; payload is always 8 bytes.
        let header = Self::encode_header(FrameType::Ping.as_u8(), flags, 0, 8);
        buf.put_slice(&header);
        buf.put_slice(&frame.data);

        buf.freeze()
    }

    /// Encode a GOAWAY frame
    pub fn encode_goaway_frame(frame: &GoawayFrame) -> Bytes {
        let mut buf = BytesMut::new();

        let payload_len = 8 + frame.debug_data.len();

        // Stream ID must be 0 for GOAWAY.
        let header =
            Self::encode_header(FrameType::Goaway.as_u8(), FrameFlags::empty(), 0, payload_len);
        buf.put_slice(&header);
        buf.put_u32(frame.last_stream_id & 0x7FFF_FFFF);
        buf.put_u32(frame.error_code.as_u32());
        buf.put_slice(&frame.debug_data);

        buf.freeze()
    }

    /// Encode a WINDOW_UPDATE frame
    pub fn encode_window_update_frame(frame: &WindowUpdateFrame) -> Bytes {
        let mut buf = BytesMut::new();

        let header = Self::encode_header(
            FrameType::WindowUpdate.as_u8(),
            FrameFlags::empty(),
            frame.stream_id,
            4,
        );
        buf.put_slice(&header);
        buf.put_u32(frame.size_increment & 0x7FFF_FFFF);

        buf.freeze()
    }

    /// Encode a CONTINUATION frame
    pub fn encode_continuation_frame(frame: &ContinuationFrame) -> Bytes {
        let mut buf = BytesMut::new();

        let mut flags = FrameFlags::empty();
        if frame.end_headers {
            flags.set(FrameFlags::END_HEADERS);
        }

        let header = Self::encode_header(
            FrameType::Continuation.as_u8(),
            flags,
            frame.stream_id,
            frame.header_block.len(),
        );
        buf.put_slice(&header);
        buf.put_slice(&frame.header_block);

        buf.freeze()
    }

    /// Decode a frame from its parsed header and payload.
    ///
    /// Performs the structural validation RFC 7540 ties to each type: fixed
    /// payload lengths, padding bounds, and the zero / non-zero stream-ID
    /// requirement. State-dependent legality is the dispatcher's business.
    pub fn decode(
        frame_type: u8,
        flags: FrameFlags,
        stream_id: u32,
        payload: Bytes,
    ) -> Result<Frame> {
        match FrameType::from_u8(frame_type) {
            Some(FrameType::Data) => {
                if stream_id == 0 {
                    return Err(Error::Protocol("DATA frame on stream 0".to_string()));
                }
                let (data, padding) = Self::strip_padding(&flags, payload, "DATA")?;
                Ok(Frame::Data(DataFrame {
                    stream_id,
                    data,
                    end_stream: flags.is_end_stream(),
                    padding,
                }))
            }
            Some(FrameType::Headers) => {
                if stream_id == 0 {
                    return Err(Error::Protocol("HEADERS frame on stream 0".to_string()));
                }
                let (mut rest, padding) = Self::strip_padding(&flags, payload, "HEADERS")?;
                let priority = if flags.is_priority() {
                    if rest.len() < 5 {
                        return Err(Error::FrameSize(
                            "HEADERS priority fields truncated".to_string(),
                        ));
                    }
                    let dep = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]);
                    let weight = rest[4];
                    rest = rest.slice(5..);
                    Some(PrioritySpec {
                        stream_dependency: dep & 0x7FFF_FFFF,
                        exclusive: dep & 0x8000_0000 != 0,
                        weight,
                    })
                } else {
                    None
                };
                Ok(Frame::Headers(HeadersFrame {
                    stream_id,
                    header_block: rest,
                    end_stream: flags.is_end_stream(),
                    end_headers: flags.is_end_headers(),
                    priority,
                    padding,
                }))
            }
            Some(FrameType::Priority) => {
                if stream_id == 0 {
                    return Err(Error::Protocol("PRIORITY frame on stream 0".to_string()));
                }
                if payload.len() != 5 {
                    return Err(Error::FrameSize(format!(
                        "PRIORITY payload must be 5 bytes, got {}",
                        payload.len()
                    )));
                }
                let dep = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
                Ok(Frame::Priority(PriorityFrame {
                    stream_id,
                    priority: PrioritySpec {
                        stream_dependency: dep & 0x7FFF_FFFF,
                        exclusive: dep & 0x8000_0000 != 0,
                        weight: payload[4],
                    },
                }))
            }
            Some(FrameType::RstStream) => {
                if stream_id == 0 {
                    return Err(Error::Protocol("RST_STREAM frame on stream 0".to_string()));
                }
                if payload.len() != 4 {
                    return Err(Error::FrameSize(format!(
                        "RST_STREAM payload must be 4 bytes, got {}",
                        payload.len()
                    )));
                }
                let code = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
                Ok(Frame::RstStream(RstStreamFrame {
                    stream_id,
                    // Unknown codes are treated as INTERNAL_ERROR (RFC 7540 §7).
                    error_code: ErrorCode::from_u32(code).unwrap_or(ErrorCode::InternalError),
                }))
            }
            Some(FrameType::Settings) => {
                if stream_id != 0 {
                    return Err(Error::Protocol(
                        "SETTINGS frame with non-zero stream ID".to_string(),
                    ));
                }
                if flags.is_ack() {
                    if !payload.is_empty() {
                        return Err(Error::FrameSize(
                            "SETTINGS ack with non-empty payload".to_string(),
                        ));
                    }
                    return Ok(Frame::Settings(SettingsFrame::ack()));
                }
                if payload.len() % 6 != 0 {
                    return Err(Error::FrameSize(format!(
                        "SETTINGS payload length {} not a multiple of 6",
                        payload.len()
                    )));
                }
                let mut settings = Settings::new();
                let mut pos = 0;
                while pos + 6 <= payload.len() {
                    let id = u16::from_be_bytes([payload[pos], payload[pos + 1]]);
                    let value = u32::from_be_bytes([
                        payload[pos + 2],
                        payload[pos + 3],
                        payload[pos + 4],
                        payload[pos + 5],
                    ]);
                    settings.apply_raw(id, value)?;
                    pos += 6;
                }
                Ok(Frame::Settings(SettingsFrame::new(settings)))
            }
            Some(FrameType::PushPromise) => {
                if stream_id == 0 {
                    return Err(Error::Protocol("PUSH_PROMISE frame on stream 0".to_string()));
                }
                let (rest, padding) = Self::strip_padding(&flags, payload, "PUSH_PROMISE")?;
                if rest.len() < 4 {
                    return Err(Error::FrameSize(
                        "PUSH_PROMISE missing promised stream ID".to_string(),
                    ));
                }
                let promised =
                    u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) & 0x7FFF_FFFF;
                Ok(Frame::PushPromise(PushPromiseFrame {
                    stream_id,
                    promised_stream_id: promised,
                    header_block: rest.slice(4..),
                    end_headers: flags.is_end_headers(),
                    padding,
                }))
            }
            Some(FrameType::Ping) => {
                if stream_id != 0 {
                    return Err(Error::Protocol(
                        "PING frame with non-zero stream ID".to_string(),
                    ));
                }
                if payload.len() != 8 {
                    return Err(Error::FrameSize(format!(
                        "PING payload must be 8 bytes, got {}",
                        payload.len()
                    )));
                }
                let mut data = [0u8; 8];
                data.copy_from_slice(&payload);
                Ok(Frame::Ping(PingFrame {
                    ack: flags.is_ack(),
                    data,
                }))
            }
            Some(FrameType::Goaway) => {
                if stream_id != 0 {
                    return Err(Error::Protocol(
                        "GOAWAY frame with non-zero stream ID".to_string(),
                    ));
                }
                if payload.len() < 8 {
                    return Err(Error::FrameSize(format!(
                        "GOAWAY payload must be at least 8 bytes, got {}",
                        payload.len()
                    )));
                }
                let last =
                    u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]])
                        & 0x7FFF_FFFF;
                let code = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
                Ok(Frame::Goaway(GoawayFrame {
                    last_stream_id: last,
                    error_code: ErrorCode::from_u32(code).unwrap_or(ErrorCode::InternalError),
                    debug_data: payload.slice(8..),
                }))
            }
            Some(FrameType::WindowUpdate) => {
                if payload.len() != 4 {
                    return Err(Error::FrameSize(format!(
                        "WINDOW_UPDATE payload must be 4 bytes, got {}",
                        payload.len()
                    )));
                }
                let increment =
                    u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]])
                        & 0x7FFF_FFFF;
                Ok(Frame::WindowUpdate(WindowUpdateFrame {
                    stream_id,
                    size_increment: increment,
                }))
            }
            Some(FrameType::Continuation) => {
                if stream_id == 0 {
                    return Err(Error::Protocol(
                        "CONTINUATION frame on stream 0".to_string(),
                    ));
                }
                Ok(Frame::Continuation(ContinuationFrame {
                    stream_id,
                    header_block: payload,
                    end_headers: flags.is_end_headers(),
                }))
            }
            None => Ok(Frame::Unknown {
                frame_type,
                flags: flags.as_u8(),
                stream_id,
                payload,
            }),
        }
    }

    /// Read one frame from the duplex.
    ///
    /// `max_frame_size` is our advertised MAX_FRAME_SIZE; a longer payload is
    /// a frame-size error. Transport failures (including EOF mid-frame)
    /// surface as `Error::Io`.
    pub fn read_frame<D: Duplex>(duplex: &mut D, max_frame_size: u32) -> Result<Frame> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        Self::read_exact(duplex, &mut header)?;

        let (frame_type, flags, stream_id, payload_len) = Self::decode_header(&header);

        if payload_len > max_frame_size as usize {
            return Err(Error::FrameSize(format!(
                "frame payload {} exceeds advertised MAX_FRAME_SIZE {}",
                payload_len, max_frame_size
            )));
        }

        let mut payload = vec![0u8; payload_len];
        if payload_len > 0 {
            Self::read_exact(duplex, &mut payload)?;
        }

        Self::decode(frame_type, flags, stream_id, Bytes::from(payload))
    }

    /// Encode and send a frame over the duplex.
    pub fn write_frame<D: Duplex>(duplex: &mut D, frame: &Frame) -> Result<()> {
        let encoded = Self::encode(frame);
        duplex.send(&encoded)?;
        Ok(())
    }

    /// Fill `buf` from the duplex; EOF before that is a transport error.
    pub fn read_exact<D: Duplex>(duplex: &mut D, buf: &mut [u8]) -> Result<()> {
        let mut read = 0;
        while read < buf.len() {
            let n = duplex.recv(&mut buf[read..])?;
            if n == 0 {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed mid-frame",
                )));
            }
            read += n;
        }
        Ok(())
    }

    fn strip_padding(
        flags: &FrameFlags,
        payload: Bytes,
        kind: &str,
    ) -> Result<(Bytes, Option<u8>)> {
        if !flags.is_padded() {
            return Ok((payload, None));
        }
        if payload.is_empty() {
            return Err(Error::FrameSize(format!(
                "{} padded frame with empty payload",
                kind
            )));
        }
        let pad_len = payload[0];
        if 1 + pad_len as usize > payload.len() {
            return Err(Error::Protocol(format!(
                "{} padding {} exceeds payload length {}",
                kind,
                pad_len,
                payload.len()
            )));
        }
        let data = payload.slice(1..payload.len() - pad_len as usize);
        Ok((data, Some(pad_len)))
    }
}
