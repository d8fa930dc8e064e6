//! Header block defragmentation
//!
//! A header block may be split across a HEADERS or PUSH_PROMISE frame and a
//! run of CONTINUATIONs. While a block is open, the only legal frame on the
//! wire is a CONTINUATION for the same stream (RFC 7540 Section 6.10); the
//! defragmenter enforces that and yields one synthetic frame carrying the
//! concatenated block.

use super::error::{Error, Result};
use super::frames::{Frame, HeadersFrame, PrioritySpec, PushPromiseFrame};
use bytes::BytesMut;

#[derive(Debug)]
enum PendingKind {
    Headers {
        end_stream: bool,
        priority: Option<PrioritySpec>,
    },
    PushPromise {
        promised_stream_id: u32,
    },
}

#[derive(Debug)]
struct Pending {
    stream_id: u32,
    kind: PendingKind,
    block: BytesMut,
}

/// Reassembles HEADERS / PUSH_PROMISE + CONTINUATION runs.
///
/// Holds at most one in-progress block, keyed by stream ID.
#[derive(Debug, Default)]
pub struct HeaderDefragmenter {
    pending: Option<Pending>,
    /// Bound on the accumulated block, from our MAX_HEADER_LIST_SIZE
    max_block_size: Option<u32>,
}

impl HeaderDefragmenter {
    /// Create an idle defragmenter
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the accumulated block size, when our advertisement is finite.
    pub fn set_max_block_size(&mut self, limit: Option<u32>) {
        self.max_block_size = limit;
    }

    /// Whether a header block is currently open
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Pass a frame through the defragmenter.
    ///
    /// Returns `Ok(Some(frame))` when the frame is complete (possibly
    /// merged), `Ok(None)` while a block is accumulating, and an error when
    /// the peer interleaves anything else into an open block.
    pub fn absorb(&mut self, frame: Frame) -> Result<Option<Frame>> {
        match self.pending.take() {
            None => match frame {
                Frame::Headers(ref h) if !h.end_headers => {
                    self.check_bound(h.header_block.len())?;
                    self.pending = Some(Pending {
                        stream_id: h.stream_id,
                        kind: PendingKind::Headers {
                            end_stream: h.end_stream,
                            priority: h.priority,
                        },
                        block: BytesMut::from(&h.header_block[..]),
                    });
                    Ok(None)
                }
                Frame::PushPromise(ref p) if !p.end_headers => {
                    self.check_bound(p.header_block.len())?;
                    self.pending = Some(Pending {
                        stream_id: p.stream_id,
                        kind: PendingKind::PushPromise {
                            promised_stream_id: p.promised_stream_id,
                        },
                        block: BytesMut::from(&p.header_block[..]),
                    });
                    Ok(None)
                }
                Frame::Continuation(c) => Err(Error::Protocol(format!(
                    "CONTINUATION on stream {} with no open header block",
                    c.stream_id
                ))),
                other => Ok(Some(other)),
            },
            Some(mut pending) => {
                let cont = match frame {
                    Frame::Continuation(c) if c.stream_id == pending.stream_id => c,
                    other => {
                        return Err(Error::Protocol(format!(
                            "{} frame on stream {} interleaved into open header block on stream {}",
                            other.name(),
                            other.stream_id(),
                            pending.stream_id
                        )));
                    }
                };

                pending.block.extend_from_slice(&cont.header_block);
                self.check_bound(pending.block.len())?;

                if !cont.end_headers {
                    self.pending = Some(pending);
                    return Ok(None);
                }

                let block = pending.block.freeze();
                let merged = match pending.kind {
                    PendingKind::Headers {
                        end_stream,
                        priority,
                    } => Frame::Headers(HeadersFrame {
                        stream_id: pending.stream_id,
                        header_block: block,
                        end_stream,
                        end_headers: true,
                        priority,
                        padding: None,
                    }),
                    PendingKind::PushPromise { promised_stream_id } => {
                        Frame::PushPromise(PushPromiseFrame {
                            stream_id: pending.stream_id,
                            promised_stream_id,
                            header_block: block,
                            end_headers: true,
                            padding: None,
                        })
                    }
                };
                Ok(Some(merged))
            }
        }
    }

    fn check_bound(&self, accumulated: usize) -> Result<()> {
        if let Some(limit) = self.max_block_size {
            if accumulated > limit as usize {
                return Err(Error::Protocol(format!(
                    "header block of {} octets exceeds advertised limit {}",
                    accumulated, limit
                )));
            }
        }
        Ok(())
    }
}
