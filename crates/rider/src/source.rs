//! Chunk source — turns an input stream into bounded byte chunks.
//!
//! One read call produces at most one chunk, so chunk boundaries follow
//! whatever the underlying reader hands back. Chunks are never empty.

use std::num::NonZeroUsize;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::RelayError;

pub struct ChunkSource<R> {
    reader: R,
    buf: Vec<u8>,
    exhausted: bool,
}

impl<R: AsyncRead + Unpin> ChunkSource<R> {
    pub fn new(reader: R, chunk_size: NonZeroUsize) -> Self {
        Self {
            reader,
            buf: vec![0u8; chunk_size.get()],
            exhausted: false,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.buf.len()
    }

    /// Next chunk, or `None` once the input is exhausted.
    ///
    /// A read failure ends the sequence; bytes of the failed read are dropped.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, RelayError> {
        if self.exhausted {
            return Ok(None);
        }

        loop {
            match self.reader.read(&mut self.buf).await {
                Ok(0) => {
                    self.exhausted = true;
                    return Ok(None);
                }
                Ok(n) => return Ok(Some(Bytes::copy_from_slice(&self.buf[..n]))),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.exhausted = true;
                    return Err(RelayError::Read(e));
                }
            }
        }
    }
}
