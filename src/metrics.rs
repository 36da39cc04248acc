use crate::config::MetricsConfig;
use crate::error::{ServerError, ServerResult};
use futures::future::BoxFuture;
use log::{debug, error, warn};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// One timestamped measurement destined for the metrics sink
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
    pub tags: Vec<(String, String)>,
    pub timestamp: SystemTime,
}

impl MetricSample {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            tags: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }
}

/// The external sink batches are dispatched to. The pipeline requires
/// nothing from it beyond this one operation, which may fail.
pub trait MetricsSink: Send + Sync + 'static {
    fn send(&self, batch: Vec<MetricSample>) -> BoxFuture<'static, ServerResult<()>>;
}

/// Producer handle for the batch pipeline. Cloned into every request task.
#[derive(Clone)]
pub struct MetricsHandle {
    tx: mpsc::Sender<MetricSample>,
}

impl MetricsHandle {
    /// Enqueue one sample. Waits for queue space when the queue is full:
    /// bounded memory is traded for producer throughput here, so callers on
    /// the serving path wrap this in their own short timeout.
    pub async fn record(&self, sample: MetricSample) -> ServerResult<()> {
        self.tx
            .send(sample)
            .await
            .map_err(|_| ServerError::Metrics("batch pipeline has stopped".to_string()))
    }
}

/// Start the batch pipeline: a bounded sample queue drained by one
/// background task. Batches are cut whenever `batch_limit` samples have
/// accumulated or `flush_interval` has elapsed, whichever comes first, and
/// dispatched to the sink on their own task under `flush_timeout`. Sink
/// failures are logged and swallowed, never propagated to the serving path.
///
/// The task exits once every `MetricsHandle` is dropped and the queue has
/// drained.
pub fn spawn_pipeline(
    sink: Arc<dyn MetricsSink>,
    config: MetricsConfig,
) -> (MetricsHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
    let task = tokio::spawn(run_pipeline(rx, sink, config));

    (MetricsHandle { tx }, task)
}

async fn run_pipeline(
    mut rx: mpsc::Receiver<MetricSample>,
    sink: Arc<dyn MetricsSink>,
    config: MetricsConfig,
) {
    let interval = config.flush_interval();
    let flush_timeout = config.flush_timeout();

    loop {
        let (batch, closed) = collect_batch(&mut rx, config.batch_limit, interval).await;

        if !batch.is_empty() {
            dispatch_batch(Arc::clone(&sink), batch, flush_timeout);
        }

        if closed {
            debug!("metrics pipeline stopping, all producers dropped");
            return;
        }
    }
}

/// Accumulate samples until the batch limit is hit, the interval elapses,
/// or the channel closes. Returns the batch and whether the channel closed.
async fn collect_batch(
    rx: &mut mpsc::Receiver<MetricSample>,
    limit: usize,
    interval: Duration,
) -> (Vec<MetricSample>, bool) {
    let mut batch = Vec::new();
    let deadline = tokio::time::sleep(interval);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => return (batch, false),
            sample = rx.recv() => match sample {
                Some(sample) => {
                    batch.push(sample);
                    if batch.len() == limit {
                        return (batch, false);
                    }
                }
                None => return (batch, true),
            },
        }
    }
}

/// Send one batch on its own task so a slow sink stalls neither buffering
/// nor the next flush.
fn dispatch_batch(sink: Arc<dyn MetricsSink>, batch: Vec<MetricSample>, flush_timeout: Duration) {
    tokio::spawn(async move {
        debug!("sending {} metric samples", batch.len());

        match timeout(flush_timeout, sink.send(batch)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("can't send metrics: {}", e),
            Err(_) => warn!("metrics flush timed out"),
        }
    });
}
