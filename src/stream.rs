use crate::error::{ServerError, ServerResult};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Default capacity of the internal read buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// A buffered byte-level reader over an async byte source.
///
/// The buffer has a fixed capacity and a read cursor; it is refilled from
/// the underlying reader whenever it runs dry. End-of-stream during a refill
/// is reported as a `BadRequest` error because every read here happens while
/// more bytes are still required by the protocol.
pub struct ByteStream<R> {
    reader: R,
    buf: Box<[u8]>,
    pos: usize,
    len: usize,
}

impl<R: AsyncRead + Unpin> ByteStream<R> {
    /// Create a byte stream with the default buffer capacity
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a byte stream with the given buffer capacity
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader,
            buf: vec![0; capacity.max(1)].into_boxed_slice(),
            pos: 0,
            len: 0,
        }
    }

    /// Return the next byte, refilling the buffer when exhausted
    pub async fn next(&mut self) -> ServerResult<u8> {
        if self.pos == self.len {
            self.refill().await?;
        }

        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Return exactly `n` bytes, spanning as many refills as needed.
    ///
    /// `n` comes from untrusted input (a declared content-length), so the
    /// output buffer grows with the bytes that actually arrive instead of
    /// being pre-allocated from `n`.
    pub async fn next_n(&mut self, n: usize) -> ServerResult<Bytes> {
        let mut out = Vec::new();

        while out.len() < n {
            if self.pos == self.len {
                self.refill().await?;
            }

            let take = (n - out.len()).min(self.len - self.pos);
            out.extend_from_slice(&self.buf[self.pos..self.pos + take]);
            self.pos += take;
        }

        Ok(out.into())
    }

    /// Accumulate bytes until CRLF and return the content without the
    /// terminator. The terminator is detected through the previous byte
    /// rather than a buffer scan, since CRLF may straddle a refill boundary.
    pub async fn read_line(&mut self) -> ServerResult<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let byte = self.next().await?;
            if byte == b'\n' && line.last() == Some(&b'\r') {
                line.pop();
                return Ok(line);
            }
            line.push(byte);
        }
    }

    async fn refill(&mut self) -> ServerResult<()> {
        let n = self.reader.read(&mut self.buf).await?;
        if n == 0 {
            return Err(ServerError::BadRequest(
                "unexpected end of stream".to_string(),
            ));
        }

        self.pos = 0;
        self.len = n;
        Ok(())
    }
}
