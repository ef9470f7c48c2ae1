//! Delimiter framing for syslog over streams
//!
//! Each message on a TCP, TLS or Unix stream connection is followed by the
//! configured delimiter. The decoder yields one frame per delimiter with a
//! trailing `\r` stripped, and resyncs on the next delimiter after a frame
//! grows past `max_frame_size` instead of buffering it.

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

#[cfg(test)]
#[path = "codec_test.rs"]
mod tests;

/// One decoded unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Frame contents without the delimiter
    Line(Bytes),
    /// Frame exceeded the limit and was dropped; carries the dropped size
    TooLong(usize),
}

/// Delimiter-framed codec
#[derive(Debug, Clone)]
pub struct SyslogCodec {
    delimiter: Bytes,
    max_frame_size: usize,
    /// Where the next delimiter search starts
    next_index: usize,
    /// Bytes thrown away from the current oversized frame
    discarded: Option<usize>,
}

impl SyslogCodec {
    /// Create a codec; an empty delimiter falls back to `\n`
    pub fn new(delimiter: &[u8], max_frame_size: usize) -> Self {
        let delimiter = if delimiter.is_empty() {
            Bytes::from_static(b"\n")
        } else {
            Bytes::copy_from_slice(delimiter)
        };

        Self {
            delimiter,
            max_frame_size,
            next_index: 0,
            discarded: None,
        }
    }

    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Payload followed by the delimiter
    pub fn frame(&self, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(payload.len() + self.delimiter.len());
        buf.put_slice(payload);
        buf.put_slice(&self.delimiter);
        buf.freeze()
    }

    fn find_delimiter(&self, haystack: &[u8]) -> Option<usize> {
        haystack
            .windows(self.delimiter.len())
            .position(|w| w == self.delimiter.as_ref())
    }
}

impl Decoder for SyslogCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        let dlen = self.delimiter.len();
        let start = self.next_index.min(src.len());

        match self.find_delimiter(&src[start..]) {
            Some(offset) => {
                let end = start + offset;
                self.next_index = 0;

                if let Some(dropped) = self.discarded.take() {
                    src.advance(end + dlen);
                    return Ok(Some(Frame::TooLong(dropped + end)));
                }

                if end > self.max_frame_size {
                    src.advance(end + dlen);
                    return Ok(Some(Frame::TooLong(end)));
                }

                let mut line = src.split_to(end);
                src.advance(dlen);
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                Ok(Some(Frame::Line(line.freeze())))
            }
            None => {
                // Keep a possible delimiter prefix at the tail
                let keep = dlen - 1;

                if self.discarded.is_some() || src.len() > self.max_frame_size + keep {
                    let drop = src.len().saturating_sub(keep);
                    src.advance(drop);
                    *self.discarded.get_or_insert(0) += drop;
                    self.next_index = 0;
                } else {
                    self.next_index = src.len().saturating_sub(keep);
                }
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        self.next_index = 0;
        if let Some(dropped) = self.discarded.take() {
            let rest = src.len();
            src.clear();
            return Ok(Some(Frame::TooLong(dropped + rest)));
        }

        if src.is_empty() {
            return Ok(None);
        }

        // Partial final frame with no delimiter
        let mut line = src.split();
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        if line.len() > self.max_frame_size {
            return Ok(Some(Frame::TooLong(line.len())));
        }
        Ok(Some(Frame::Line(line.freeze())))
    }
}

impl Encoder<&[u8]> for SyslogCodec {
    type Error = io::Error;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), io::Error> {
        dst.reserve(item.len() + self.delimiter.len());
        dst.put_slice(item);
        dst.put_slice(&self.delimiter);
        Ok(())
    }
}
