use classifier::{Classifier, InferenceBackend};
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiMetrics {
    requests: Counter<u64>,
    duration: Histogram<f64>,
}

impl ApiMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];
        let duration = meter
            .f64_histogram("classification_duration_seconds")
            .with_description("Time to classify one upload (decode + preprocess + infer + interpret)")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build();
        let requests = meter
            .u64_counter("classification_requests_total")
            .with_description("Prediction requests by outcome")
            .build();

        Self { requests, duration }
    }

    pub fn record(&self, outcome: &'static str, elapsed_secs: Option<f64>) {
        self.requests.add(1, &[KeyValue::new("outcome", outcome)]);
        if let Some(elapsed) = elapsed_secs {
            self.duration.record(elapsed, &[]);
        }
    }
}

pub struct AppState<B: InferenceBackend> {
    pub classifier: Arc<Classifier<B>>,
    pub metrics: ApiMetrics,
}

impl<B: InferenceBackend> AppState<B> {
    pub fn new(classifier: Classifier<B>) -> Self {
        Self {
            classifier: Arc::new(classifier),
            metrics: ApiMetrics::new("soil-api"),
        }
    }
}

// A derive would demand `B: Clone`; only the Arc is cloned.
impl<B: InferenceBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            classifier: Arc::clone(&self.classifier),
            metrics: self.metrics.clone(),
        }
    }
}
