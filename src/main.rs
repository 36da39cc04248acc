use futures::future::BoxFuture;
use futures::FutureExt;
use log::info;
use oneshot_http::{
    spawn_pipeline, MetricSample, MetricsSink, Response, Router, Server, ServerConfig,
    ServerResult,
};
use std::env;
use std::path::Path;
use std::sync::Arc;

/// A sink that reports each flushed batch through the log. Stands in for a
/// real time-series backend; the pipeline only needs `send`.
struct LoggingSink;

impl MetricsSink for LoggingSink {
    fn send(&self, batch: Vec<MetricSample>) -> BoxFuture<'static, ServerResult<()>> {
        async move {
            info!("metrics batch: {} samples", batch.len());
            Ok(())
        }
        .boxed()
    }
}

#[tokio::main]
async fn main() -> ServerResult<()> {
    env_logger::init();

    // Optional JSON config file as the first argument
    let args: Vec<String> = env::args().collect();
    let config = if args.len() > 1 && Path::new(&args[1]).exists() {
        ServerConfig::from_json_file(&args[1])?
    } else {
        ServerConfig::new()
    };

    let mut router = Router::new();
    router
        .get("/test", |_| async {
            Ok(Response::ok().with_body("test-result"))
        })
        .post("/echo", |request| async move {
            let mut response = Response::ok();
            if let Some(body) = request.body {
                response = response.with_body(body);
            }
            Ok(response)
        });

    let mut server = Server::bind(config.clone(), router)?;

    if env::var("ONESHOT_METRICS").is_ok() {
        let (handle, _task) = spawn_pipeline(Arc::new(LoggingSink), config.metrics.clone());
        server = server.with_metrics(handle);
    }

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal, stopping server");
            Ok(())
        }
    }
}
