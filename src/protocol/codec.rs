use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::Error;

/// Bus frame codec
///
/// Splits a raw bus byte stream into whole frames. The frame length follows
/// from the opcode: bits 6..5 select 2, 4 or 6 bytes, and the `0xE0` group
/// carries its length in the second byte. Opcodes are the only bytes with
/// bit 7 set, which lets the decoder resynchronise after line noise.
#[derive(Clone, Default)]
pub struct LnCodec;

impl LnCodec {
    /// Creates a new frame codec
    pub fn new() -> Self {
        LnCodec
    }
}

/// Returns the frame length implied by an opcode and, for variable
/// length frames, the length byte
pub fn frame_len(opcode: u8, len_byte: Option<u8>) -> Option<usize> {
    match opcode & 0xE0 {
        0x80 => Some(2),
        0xA0 => Some(4),
        0xC0 => Some(6),
        0xE0 => len_byte.map(usize::from),
        _ => None,
    }
}

impl Decoder for LnCodec {
    type Item = Bytes;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            // Drop anything before the next opcode
            match src.iter().position(|b| b & 0x80 != 0) {
                Some(0) => {}
                Some(skip) => {
                    tracing::trace!(skip, "Discarding bytes before opcode");
                    src.advance(skip);
                }
                None => {
                    src.clear();
                    return Ok(None);
                }
            }

            let length = match frame_len(src[0], src.get(1).copied()) {
                Some(length) => length,
                // Variable length frame without its length byte yet
                None => return Ok(None),
            };

            if length < 2 {
                tracing::debug!(opcode = src[0], length, "Dropping frame with invalid length");
                src.advance(1);
                continue;
            }

            // A data byte with bit 7 set means the frame was cut short
            let available = src.len().min(length);
            if let Some(pos) = src[1..available].iter().position(|b| b & 0x80 != 0) {
                // The length byte of a variable frame never has bit 7 set
                tracing::debug!(opcode = src[0], "Truncated frame, resynchronising");
                src.advance(pos + 1);
                continue;
            }

            if src.len() < length {
                return Ok(None);
            }

            return Ok(Some(src.split_to(length).freeze()));
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if !buf.is_empty() {
                    tracing::debug!(remaining = buf.len(), "Discarding partial frame at end of stream");
                    buf.clear();
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<Bytes> for LnCodec {
    type Error = Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.is_empty() || item[0] & 0x80 == 0 {
            return Err(Error::protocol("Frame must start with an opcode"));
        }
        dst.reserve(item.len());
        dst.put(item);
        Ok(())
    }
}
