//! Positioned reader over a JPEG-family codestream.

use crate::error::{Error, Result};
use crate::jpeg_marker_code::{JpegMarkerCode, JPEG_MARKER_START_BYTE};

/// A reader for JPEG/JLS/J2K codestreams with big-endian field access.
pub struct JpegStreamReader<'a> {
    source: &'a [u8],
    position: usize,
}

impl<'a> JpegStreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.source.len().saturating_sub(self.position)
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        if self.position >= self.source.len() {
            return Err(Error::InvalidFormat("unexpected end of codestream".into()));
        }
        let val = self.source[self.position];
        self.position += 1;
        Ok(val)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b1 = self.read_byte()? as u16;
        let b2 = self.read_byte()? as u16;
        Ok((b1 << 8) | b2)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let hi = self.read_u16()? as u32;
        let lo = self.read_u16()? as u32;
        Ok((hi << 16) | lo)
    }

    pub fn read_marker(&mut self) -> Result<JpegMarkerCode> {
        if self.read_byte()? != JPEG_MARKER_START_BYTE {
            return Err(Error::InvalidFormat("JPEG marker start byte not found".into()));
        }
        JpegMarkerCode::try_from(self.read_byte()?)
    }

    pub fn advance(&mut self, count: usize) {
        self.position = (self.position + count).min(self.source.len());
    }

    /// Skip a marker segment whose two-byte length field (which includes
    /// itself) is next in the stream.
    pub fn skip_segment(&mut self) -> Result<()> {
        let length = self.read_u16()? as usize;
        if length < 2 {
            return Err(Error::InvalidFormat("invalid marker segment size".into()));
        }
        self.advance(length - 2);
        Ok(())
    }

    /// Scan forward for the next `FF xx` marker pair, consuming it.
    /// Returns `None` when the stream is exhausted first.
    pub fn scan_for_marker(&mut self, marker: JpegMarkerCode) -> Option<usize> {
        while self.position + 1 < self.source.len() {
            if self.source[self.position] == JPEG_MARKER_START_BYTE
                && self.source[self.position + 1] == marker as u8
            {
                self.position += 2;
                return Some(self.position);
            }
            self.position += 1;
        }
        None
    }
}
