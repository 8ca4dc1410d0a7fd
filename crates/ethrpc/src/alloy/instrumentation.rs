//! Transport layer that logs and measures every RPC request under the name of
//! the component that issued it (`wallet`, `chain_1`, ...).
use {
    alloy::{
        rpc::json_rpc::{RequestPacket, ResponsePacket},
        transports::TransportError,
    },
    std::{
        pin::Pin,
        sync::Arc,
        task::{Context, Poll},
    },
    tower::{Layer, Service},
};

pub(crate) struct RpcMetricsLayer {
    component: Arc<str>,
}

impl RpcMetricsLayer {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.into(),
        }
    }
}

impl<S> Layer<S> for RpcMetricsLayer {
    type Service = MeasuredTransport<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MeasuredTransport {
            inner,
            component: self.component.clone(),
            metrics: Metrics::get(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MeasuredTransport<S> {
    inner: S,
    component: Arc<str>,
    metrics: &'static Metrics,
}

impl<S> Service<RequestPacket> for MeasuredTransport<S>
where
    S: Service<RequestPacket, Response = ResponsePacket, Error = TransportError>,
    S::Future: Send + 'static,
{
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: RequestPacket) -> Self::Future {
        let methods: Vec<String> = req
            .requests()
            .iter()
            .map(|r| r.method().to_owned())
            .collect();
        let timers: Vec<_> = methods
            .iter()
            .map(|method| {
                tracing::trace!(component = %self.component, method, "executing request");
                self.metrics.on_request_start(&self.component, method)
            })
            .collect();

        let component = self.component.clone();
        let metrics = self.metrics;
        let fut = self.inner.call(req);
        Box::pin(async move {
            let res = fut.await;
            let outcome = match &res {
                Err(err) => {
                    tracing::debug!(%component, ?methods, ?err, "request failed");
                    Some(Outcome::TransportError)
                }
                Ok(response) if has_error_response(response) => Some(Outcome::ErrorResponse),
                Ok(_) => None,
            };
            if let Some(outcome) = outcome {
                for method in &methods {
                    metrics
                        .requests_failed
                        .with_label_values(&[&*component, method.as_str(), outcome.label()])
                        .inc();
                }
            }
            drop(timers);
            res
        })
    }
}

/// Whether any response carries a JSON-RPC error, reverted calls included.
fn has_error_response(response: &ResponsePacket) -> bool {
    match response {
        ResponsePacket::Single(response) => response.is_error(),
        ResponsePacket::Batch(responses) => responses.iter().any(|r| r.is_error()),
    }
}

#[derive(Clone, Copy, Debug)]
enum Outcome {
    TransportError,
    ErrorResponse,
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            Self::TransportError => "transport_error",
            Self::ErrorResponse => "error_response",
        }
    }
}

#[derive(prometheus_metric_storage::MetricStorage, Clone, Debug)]
#[metric(subsystem = "chain_rpc")]
struct Metrics {
    /// Number of inflight RPC requests.
    #[metric(labels("component", "method"))]
    requests_inflight: prometheus::IntGaugeVec,

    /// Number of completed RPC requests.
    #[metric(labels("component", "method"))]
    requests_complete: prometheus::IntCounterVec,

    /// Number of RPC requests that did not produce a result.
    #[metric(labels("component", "method", "outcome"))]
    requests_failed: prometheus::IntCounterVec,

    /// Execution time for each RPC request.
    #[metric(labels("component", "method"))]
    requests_duration_seconds: prometheus::HistogramVec,
}

impl Metrics {
    fn get() -> &'static Self {
        Self::instance(observe::metrics::get_storage_registry())
            .expect("unexpected error getting metrics instance")
    }

    #[must_use]
    fn on_request_start(&self, component: &str, method: &str) -> impl Drop + Send + use<> {
        let labels = [component, method];
        let requests_inflight = self.requests_inflight.with_label_values(&labels);
        let requests_complete = self.requests_complete.with_label_values(&labels);
        let timer = self
            .requests_duration_seconds
            .with_label_values(&labels)
            .start_timer();
        requests_inflight.inc();

        scopeguard::guard(timer, move |timer| {
            requests_inflight.dec();
            requests_complete.inc();
            timer.stop_and_record();
        })
    }
}
