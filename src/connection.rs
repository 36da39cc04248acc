use std::io;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Represents a TCP connection with a client.
///
/// Each connection is exclusively owned by the task processing it and
/// carries exactly one request/response exchange. The socket is closed when
/// the connection is dropped, so a cancelled task never leaks it.
pub struct Connection {
    stream: TcpStream,
    peer_addr: SocketAddr,
    id: usize,
}

impl Connection {
    /// Create a new connection from a TcpStream
    pub fn new(stream: TcpStream, peer_addr: SocketAddr, id: usize) -> io::Result<Self> {
        // Disable Nagle's algorithm; the single response is written in one shot
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            peer_addr,
            id,
        })
    }

    /// Write all bytes to the peer, suspending until fully flushed
    pub async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await
    }

    /// Shut down the write half, signalling the end of the response
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }

    /// Get the connection's peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get the connection's unique ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get a mutable reference to the underlying TcpStream
    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}
