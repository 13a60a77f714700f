//! Seekable output streams returned by decryption.

use std::io::{self, Cursor, Read, Seek, SeekFrom};

/// Result of decrypting a stream.
///
/// Documents without an envelope are handed back untouched as
/// [`DocumentStream::Passthrough`], rewound to offset 0. Decrypted documents
/// are serialised into a fresh in-memory buffer.
#[derive(Debug)]
pub enum DocumentStream<S> {
    /// The caller's own stream, unchanged and positioned at 0.
    Passthrough(S),
    /// A newly serialised document, positioned at 0.
    Rewritten(Cursor<Vec<u8>>),
}

impl<S> DocumentStream<S> {
    /// Whether the input was returned without modification.
    pub fn is_passthrough(&self) -> bool {
        matches!(self, DocumentStream::Passthrough(_))
    }
}

impl<S: Seek> DocumentStream<S> {
    /// Total length of the stream in bytes. The current position is preserved.
    pub fn len(&mut self) -> io::Result<u64> {
        match self {
            DocumentStream::Passthrough(s) => {
                let pos = s.stream_position()?;
                let end = s.seek(SeekFrom::End(0))?;
                s.seek(SeekFrom::Start(pos))?;
                Ok(end)
            }
            DocumentStream::Rewritten(c) => Ok(c.get_ref().len() as u64),
        }
    }

    pub fn is_empty(&mut self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<S: Read> DocumentStream<S> {
    /// Read the remainder of the stream into a byte vector.
    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        match self {
            DocumentStream::Passthrough(mut s) => {
                let mut buf = Vec::new();
                s.read_to_end(&mut buf)?;
                Ok(buf)
            }
            DocumentStream::Rewritten(c) => {
                let pos = c.position() as usize;
                let mut buf = c.into_inner();
                buf.drain(..pos.min(buf.len()));
                Ok(buf)
            }
        }
    }
}

impl<S: Read> Read for DocumentStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            DocumentStream::Passthrough(s) => s.read(buf),
            DocumentStream::Rewritten(c) => c.read(buf),
        }
    }
}

impl<S: Seek> Seek for DocumentStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            DocumentStream::Passthrough(s) => s.seek(pos),
            DocumentStream::Rewritten(c) => c.seek(pos),
        }
    }
}
