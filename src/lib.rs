pub mod acceptor;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod metrics;
pub mod parser;
pub mod router;
pub mod server;
pub mod stream;

/// Re-exports of common components for easier access
pub use acceptor::ConnectionAcceptor;
pub use config::{MetricsConfig, ServerConfig};
pub use connection::Connection;
pub use error::{ServerError, ServerResult};
pub use http::{Header, Method, Request, Response, Status};
pub use metrics::{spawn_pipeline, MetricSample, MetricsHandle, MetricsSink};
pub use parser::parse_request;
pub use router::{HandlerFn, Router};
pub use server::Server;
pub use stream::ByteStream;
