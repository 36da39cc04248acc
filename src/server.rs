use crate::acceptor::ConnectionAcceptor;
use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::{ServerError, ServerResult};
use crate::http::Response;
use crate::metrics::{MetricSample, MetricsHandle};
use crate::parser::parse_request;
use crate::router::Router;
use crate::stream::ByteStream;
use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// Upper bound on how long a finished request may wait for queue space in
/// the metrics pipeline.
const SAMPLE_PUSH_TIMEOUT: Duration = Duration::from_millis(100);

/// The server: one accept loop, an admission semaphore bounding concurrent
/// request processing, and one spawned task per accepted connection.
///
/// The router is taken by value at bind time, so no handler can be
/// registered once serving has started.
pub struct Server {
    config: ServerConfig,
    acceptor: ConnectionAcceptor,
    router: Arc<Router>,
    metrics: Option<MetricsHandle>,
}

impl Server {
    /// Bind the listen socket and prepare the server for `run`
    pub fn bind(config: ServerConfig, router: Router) -> ServerResult<Self> {
        let acceptor = ConnectionAcceptor::bind(config.socket_address(), config.backlog_size)?;

        Ok(Self {
            config,
            acceptor,
            router: Arc::new(router),
            metrics: None,
        })
    }

    /// Attach a handle to the batch metrics pipeline
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Get the local address the server is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.acceptor.local_addr()
    }

    /// Run the accept loop.
    ///
    /// A semaphore permit is acquired before each accept, so connections
    /// beyond `parallel_request_limit` wait for a permit instead of being
    /// rejected; the socket backlog is the only bound on un-accepted
    /// connections.
    pub async fn run(self) -> ServerResult<()> {
        let semaphore = Arc::new(Semaphore::new(self.config.parallel_request_limit));
        let request_timeout = self.config.request_timeout();
        let buffer_size = self.config.read_buffer_size;

        info!("server started on {}", self.acceptor.local_addr()?);

        loop {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                // The semaphore is never closed while the server runs
                Err(_) => return Ok(()),
            };

            let connection = match self.acceptor.accept().await {
                Ok(connection) => connection,
                Err(e) => {
                    warn!("failed to accept connection: {}", e);
                    continue;
                }
            };

            let accepted_at = Instant::now();
            let router = Arc::clone(&self.router);
            let metrics = self.metrics.clone();

            tokio::spawn(async move {
                // Held for the whole task; dropped on every exit path
                let _permit = permit;

                let id = connection.id();
                let peer = connection.peer_addr();
                let processing_started = Instant::now();

                if let Err(e) =
                    process_request(connection, &router, request_timeout, buffer_size).await
                {
                    warn!("connection {} from {} aborted: {}", id, peer, e);
                }

                if let Some(metrics) = metrics {
                    let processing_ms = processing_started.elapsed().as_secs_f64() * 1000.0;
                    let total_ms = accepted_at.elapsed().as_secs_f64() * 1000.0;
                    push_samples(&metrics, processing_ms, total_ms).await;
                }
            });
        }
    }
}

/// Process one connection: parse, route, handle and encode under the
/// request deadline, then unconditionally write the response and close.
///
/// Only an I/O failure leaves without a response; every protocol or
/// handler failure has already been mapped to a response by `dispatch`.
async fn process_request(
    mut connection: Connection,
    router: &Router,
    request_timeout: Duration,
    buffer_size: usize,
) -> ServerResult<()> {
    let response = {
        let mut stream = ByteStream::with_capacity(connection.stream_mut(), buffer_size);

        match timeout(request_timeout, dispatch(&mut stream, router)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(e),
            Err(_) => Response::request_timeout(),
        }
    };

    connection.write_all(&response.encode()).await?;
    connection.shutdown().await?;
    Ok(())
}

/// Parse and handle one request, mapping classified failures to responses.
///
/// This is the only place where BadRequest and handler failures are caught;
/// I/O errors pass through so cleanup can unwind.
async fn dispatch<R: tokio::io::AsyncRead + Unpin>(
    stream: &mut ByteStream<R>,
    router: &Router,
) -> ServerResult<Response> {
    let request = match parse_request(stream).await {
        Ok(request) => request,
        Err(ServerError::BadRequest(message)) => {
            error!("bad request: {}", message);
            return Ok(Response::bad_request(message));
        }
        Err(e) => return Err(e),
    };

    let handler = match router.lookup(&request.url, request.method) {
        Some(handler) => handler,
        None => return Ok(Response::not_found()),
    };

    match handler(request).await {
        Ok(response) => Ok(response),
        Err(e) => {
            error!("exception while processing request: {}", e);
            Ok(Response::server_error(e.to_string()))
        }
    }
}

/// Push the per-request timing samples, bounded by a short timeout so a
/// congested pipeline cannot hold the request task hostage.
async fn push_samples(metrics: &MetricsHandle, processing_ms: f64, total_ms: f64) {
    let push = async {
        metrics
            .record(MetricSample::new("processing_time", processing_ms))
            .await?;
        metrics.record(MetricSample::new("total_time", total_ms)).await
    };

    match timeout(SAMPLE_PUSH_TIMEOUT, push).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("dropping metric samples: {}", e),
        Err(_) => warn!("metrics queue full, dropping samples"),
    }
}
