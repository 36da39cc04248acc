use crate::connection::Connection;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;

/// The ConnectionAcceptor is responsible for accepting new TCP connections.
/// The listen socket is configured through socket2 so the backlog size from
/// the server configuration is applied verbatim; pending un-accepted
/// connections are bounded by that backlog only.
pub struct ConnectionAcceptor {
    listener: TcpListener,
    connection_count: AtomicUsize,
}

impl ConnectionAcceptor {
    /// Create a new connection acceptor bound to the specified address
    pub fn bind<A: ToSocketAddrs>(addr: A, backlog: u32) -> io::Result<Self> {
        let socket_addr = addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "No socket addresses found")
        })?;

        let socket = Self::create_socket(&socket_addr, backlog)?;
        let listener = TcpListener::from_std(socket.into())?;

        Ok(Self {
            listener,
            connection_count: AtomicUsize::new(0),
        })
    }

    /// Accept a new connection, suspending until one arrives
    pub async fn accept(&self) -> io::Result<Connection> {
        let (stream, addr) = self.listener.accept().await?;
        let id = self.connection_count.fetch_add(1, Ordering::Relaxed);

        Connection::new(stream, addr, id)
    }

    /// Get the local address this acceptor is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Create a properly configured listen socket
    fn create_socket(addr: &SocketAddr, backlog: u32) -> io::Result<Socket> {
        let domain = if addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };

        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

        // Tokio drives the listener, so the fd must be non-blocking
        socket.set_nonblocking(true)?;
        socket.set_reuse_address(true)?;

        let sock_addr = socket2::SockAddr::from(*addr);
        socket.bind(&sock_addr)?;
        socket.listen(backlog as i32)?;

        Ok(socket)
    }
}
