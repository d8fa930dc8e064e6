//! Shared HPACK coding context
//!
//! One encoder and one decoder per connection, each with its own dynamic
//! table. The decoder must see every header block in receive order - even
//! blocks on streams we reset or ignore - or its table desynchronizes from
//! the peer's encoder, which is connection-fatal.

use super::error::{Error, Result};
use ::hpack::{Decoder, Encoder};
use bytes::Bytes;

/// A decoded header field
pub type Header = (Bytes, Bytes);

/// Per-header overhead charged against MAX_HEADER_LIST_SIZE (RFC 7540 §6.5.2)
const HEADER_OVERHEAD: usize = 32;

/// The connection's HPACK encoder/decoder pair.
pub struct HpackContext {
    encoder: Encoder<'static>,
    decoder: Decoder<'static>,
    /// Our advertised MAX_HEADER_LIST_SIZE, when finite
    max_header_list_size: Option<u32>,
}

impl HpackContext {
    /// Create a context with both dynamic tables at the RFC default (4096).
    pub fn new() -> Self {
        HpackContext {
            encoder: Encoder::new(),
            decoder: Decoder::new(),
            max_header_list_size: None,
        }
    }

    /// Encode a header list into a single contiguous block.
    ///
    /// Fragmenting the block against the peer's MAX_FRAME_SIZE is the
    /// writer's job.
    pub fn encode(&mut self, headers: &[Header]) -> Result<Bytes> {
        let tuples: Vec<(&[u8], &[u8])> = headers
            .iter()
            .map(|(name, value)| (name.as_ref(), value.as_ref()))
            .collect();

        let mut block = Vec::new();
        self.encoder
            .encode_into(tuples, &mut block)
            .map_err(|e| Error::Internal(format!("HPACK encode error: {}", e)))?;
        Ok(Bytes::from(block))
    }

    /// Decode a complete header block, mutating the dynamic table.
    pub fn decode(&mut self, block: &[u8]) -> Result<Vec<Header>> {
        let decoded = self
            .decoder
            .decode(block)
            .map_err(|e| Error::Compression(format!("HPACK decode error: {:?}", e)))?;

        if let Some(limit) = self.max_header_list_size {
            let size: usize = decoded
                .iter()
                .map(|(name, value)| name.len() + value.len() + HEADER_OVERHEAD)
                .sum();
            if size > limit as usize {
                return Err(Error::Protocol(format!(
                    "decoded header list of {} octets exceeds advertised limit {}",
                    size, limit
                )));
            }
        }

        Ok(decoded
            .into_iter()
            .map(|(name, value)| (Bytes::from(name), Bytes::from(value)))
            .collect())
    }

    /// Bound the decoder's dynamic table.
    ///
    /// Called when the peer acknowledges our HEADER_TABLE_SIZE proposal; the
    /// peer's encoder will shrink to this bound and our decoder follows.
    pub fn set_decoder_table_size(&mut self, size: u32) {
        self.decoder.set_max_table_size(size as usize);
    }

    /// Bound on the decoded header list we accept, when finite.
    pub fn set_max_header_list_size(&mut self, limit: Option<u32>) {
        self.max_header_list_size = limit;
    }
}

impl Default for HpackContext {
    fn default() -> Self {
        Self::new()
    }
}
